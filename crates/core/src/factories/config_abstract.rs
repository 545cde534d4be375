use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::container::instance::Instance;
use crate::container::traits::{AbstractFactory, Factory, Options, ServiceLocator};
use crate::errors::BoxError;

/// Key of the dependency map inside the `"config"` service
pub const CONFIG_SECTION: &str = "ConfigAbstractFactory";

const CONFIG_SERVICE: &str = "config";

type Constructor = dyn Fn(&[Instance]) -> Result<Instance, BoxError> + Send + Sync;

/// Errors raised while reading the dependency map
#[derive(Debug, Error)]
pub enum ConfigFactoryError {
    #[error("Cannot find a config value in the container")]
    MissingConfig,

    #[error("Config must be a JSON object")]
    ConfigNotObject,

    #[error("Cannot find a `ConfigAbstractFactory` key in the config")]
    MissingSection,

    #[error("Dependencies config for \"{name}\" must exist and be an array")]
    MissingDependencies { name: String },

    #[error("Service dependencies of \"{name}\" must be an array of strings, {given} given")]
    InvalidDependency { name: String, given: String },

    #[error("No constructor registered for \"{name}\"")]
    MissingConstructor { name: String },
}

/// Abstract factory wiring constructors from a dependency map in configuration
///
/// ```yaml
/// ConfigAbstractFactory:
///   user_service: [user_repository, config]
/// ```
///
/// Each listed dependency is fetched from the creation context in order and
/// handed to the constructor registered for the requested name.
#[derive(Clone, Default)]
pub struct ConfigAbstractFactory {
    constructors: HashMap<String, Arc<Constructor>>,
}

impl ConfigAbstractFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the constructor used for service `name`
    pub fn register<T, F>(mut self, name: impl Into<String>, constructor: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&[Instance]) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.constructors.insert(
            name.into(),
            Arc::new(move |dependencies: &[Instance]| constructor(dependencies).map(Instance::new)),
        );
        self
    }

    fn dependencies(
        container: &dyn ServiceLocator,
        name: &str,
    ) -> Result<Vec<String>, ConfigFactoryError> {
        if !container.has(CONFIG_SERVICE) {
            return Err(ConfigFactoryError::MissingConfig);
        }
        let config = container
            .get_as::<Value>(CONFIG_SERVICE)
            .map_err(|_| ConfigFactoryError::ConfigNotObject)?;
        let config = config.as_object().ok_or(ConfigFactoryError::ConfigNotObject)?;
        let section = config
            .get(CONFIG_SECTION)
            .ok_or(ConfigFactoryError::MissingSection)?;

        let listed = section
            .get(name)
            .and_then(Value::as_array)
            .ok_or_else(|| ConfigFactoryError::MissingDependencies {
                name: name.to_string(),
            })?;

        listed
            .iter()
            .map(|dependency| {
                dependency
                    .as_str()
                    .map(str::to_string)
                    .ok_or_else(|| ConfigFactoryError::InvalidDependency {
                        name: name.to_string(),
                        given: dependency.to_string(),
                    })
            })
            .collect()
    }
}

impl Factory for ConfigAbstractFactory {
    fn create(
        &self,
        container: &dyn ServiceLocator,
        requested_name: &str,
        _options: Option<&Options>,
    ) -> Result<Instance, BoxError> {
        let dependencies = Self::dependencies(container, requested_name)?;
        let constructor = self.constructors.get(requested_name).ok_or_else(|| {
            ConfigFactoryError::MissingConstructor {
                name: requested_name.to_string(),
            }
        })?;

        tracing::debug!(
            "Wiring '{}' from config with dependencies [{}]",
            requested_name,
            dependencies.join(", ")
        );

        let arguments = dependencies
            .iter()
            .map(|dependency| container.get(dependency))
            .collect::<Result<Vec<_>, _>>()?;
        constructor(&arguments)
    }
}

impl AbstractFactory for ConfigAbstractFactory {
    fn can_create(&self, container: &dyn ServiceLocator, requested_name: &str) -> bool {
        Self::dependencies(container, requested_name).is_ok()
    }
}

impl std::fmt::Debug for ConfigAbstractFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.constructors.keys().collect();
        names.sort();
        f.debug_struct("ConfigAbstractFactory")
            .field("constructors", &names)
            .finish()
    }
}
