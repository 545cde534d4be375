use thiserror::Error;

/// Error type returned by factories, delegators and other collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result alias used throughout the service manager
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Core error type for service resolution
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Unable to resolve service \"{name}\" to a factory; are you certain you provided it during configuration?")]
    ServiceNotFound { name: String },

    #[error("Service with name \"{name}\" could not be created. Reason: {source}")]
    ServiceNotCreated {
        name: String,
        #[source]
        source: BoxError,
    },

    #[error("Plugin of type {actual} is invalid; must satisfy {expected}")]
    InvalidService { expected: String, actual: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigurationError),

    #[error("The container does not allow replacing or updating a service with existing instances; the following already exist in the container: {name}")]
    ModificationNotAllowed { name: String },

    #[error("Lock error on resource: {resource}")]
    LockError { resource: String },
}

impl ServiceError {
    /// Create a new service not found error
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::ServiceNotFound { name: name.into() }
    }

    /// Create a new service not created error, keeping the cause
    pub fn not_created(name: impl Into<String>, source: BoxError) -> Self {
        Self::ServiceNotCreated {
            name: name.into(),
            source,
        }
    }

    /// Create a new invalid service error
    pub fn invalid_service(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::InvalidService {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub(crate) fn lock(resource: impl Into<String>) -> Self {
        Self::LockError {
            resource: resource.into(),
        }
    }

    /// Wrap a collaborator failure for `name`.
    ///
    /// Errors that already are a `ServiceError` (a nested lookup that failed,
    /// for instance) are passed through untouched.
    pub(crate) fn from_creation(name: &str, error: BoxError) -> Self {
        match error.downcast::<ServiceError>() {
            Ok(inner) => *inner,
            Err(error) => Self::not_created(name, error),
        }
    }

    /// Check if the error is a service not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ServiceNotFound { .. })
    }

    /// Check if the error is a service not created error
    pub fn is_not_created(&self) -> bool {
        matches!(self, Self::ServiceNotCreated { .. })
    }

    /// Check if the error is an invalid service error
    pub fn is_invalid_service(&self) -> bool {
        matches!(self, Self::InvalidService { .. })
    }

    /// Check if the error is a configuration error
    pub fn is_invalid_configuration(&self) -> bool {
        matches!(self, Self::InvalidConfiguration(_))
    }
}

/// Problems detected while merging configuration into a container
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Cycles were detected within the provided aliases:\n\n{cycles}\n\nThe cycle was detected in the following alias map:\n\n{aliases}")]
    CyclicAlias { cycles: String, aliases: String },

    #[error("An invalid abstract factory was registered: \"{name}\" is not a known abstract factory")]
    UnknownAbstractFactory { name: String },

    #[error("An invalid initializer was registered: \"{name}\" is not a known initializer")]
    UnknownInitializer { name: String },

    #[error("An invalid delegator factory was registered: \"{name}\" is not a known delegator factory")]
    UnknownDelegator { name: String },

    #[error("Invalid directive for {table}[\"{key}\"]: {message}")]
    InvalidDirective {
        table: String,
        key: String,
        message: String,
    },

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConfigurationError {
    /// Create a new invalid directive error
    pub fn invalid_directive(
        table: impl Into<String>,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidDirective {
            table: table.into(),
            key: key.into(),
            message: message.into(),
        }
    }

    /// Check if the error reports an alias cycle
    pub fn is_cyclic_alias(&self) -> bool {
        matches!(self, Self::CyclicAlias { .. })
    }
}
