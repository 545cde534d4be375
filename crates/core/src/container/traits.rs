//! Collaborator contracts of the service manager
//!
//! Factories, abstract factories, delegators and initializers all receive the
//! *creation context*: the locator they should use to pull in their own
//! dependencies. For a plain [`ServiceManager`](crate::ServiceManager) that is
//! the manager itself; for a plugin manager it is the application-wide parent.

use std::any::Any;
use std::sync::Arc;

use crate::container::instance::Instance;
use crate::errors::{BoxError, ServiceError, ServiceResult};

/// Construction options passed to `get_with`/`build_with`
pub type Options = serde_json::Map<String, serde_json::Value>;

/// Inner link of a delegator chain
pub type NextFn<'a> = dyn Fn() -> Result<Instance, BoxError> + 'a;

/// Read-side interface every container exposes to its collaborators
pub trait ServiceLocator: Send + Sync {
    /// Retrieve a service, using the shared instance when there is one
    fn get(&self, name: &str) -> ServiceResult<Instance>;

    /// Check if the locator can provide `name`. Never fails.
    fn has(&self, name: &str) -> bool;

    /// Create a fresh instance, bypassing the shared instance cache
    fn build(&self, name: &str, options: Option<&Options>) -> ServiceResult<Instance>;
}

impl dyn ServiceLocator + '_ {
    /// Retrieve a service and downcast it to `T`
    pub fn get_as<T: Any + Send + Sync>(&self, name: &str) -> ServiceResult<Arc<T>> {
        let instance = self.get(name)?;
        instance.downcast::<T>().ok_or_else(|| {
            ServiceError::invalid_service(std::any::type_name::<T>(), instance.type_name())
        })
    }
}

/// Produces a service instance for a requested name
pub trait Factory: Send + Sync {
    fn create(
        &self,
        container: &dyn ServiceLocator,
        requested_name: &str,
        options: Option<&Options>,
    ) -> Result<Instance, BoxError>;
}

/// Fallback factory consulted when no direct factory is registered
pub trait AbstractFactory: Factory {
    /// Whether this factory knows how to build `requested_name`
    fn can_create(&self, container: &dyn ServiceLocator, requested_name: &str) -> bool;
}

/// Wraps the creation of a service; `next` runs the inner link of the chain
pub trait DelegatorFactory: Send + Sync {
    fn create(
        &self,
        container: &dyn ServiceLocator,
        name: &str,
        next: &NextFn<'_>,
        options: Option<&Options>,
    ) -> Result<Instance, BoxError>;
}

/// Post-construction hook run on every freshly created instance
pub trait Initializer: Send + Sync {
    fn initialize(&self, container: &dyn ServiceLocator, instance: &Instance);
}

/// Adapter turning a closure into a [`Factory`]
pub struct FactoryFn<F>(F);

impl<F> FactoryFn<F>
where
    F: Fn(&dyn ServiceLocator, &str, Option<&Options>) -> Result<Instance, BoxError>
        + Send
        + Sync
        + 'static,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> Factory for FactoryFn<F>
where
    F: Fn(&dyn ServiceLocator, &str, Option<&Options>) -> Result<Instance, BoxError>
        + Send
        + Sync
        + 'static,
{
    fn create(
        &self,
        container: &dyn ServiceLocator,
        requested_name: &str,
        options: Option<&Options>,
    ) -> Result<Instance, BoxError> {
        (self.0)(container, requested_name, options)
    }
}

/// Adapter pairing a capability check with a creation closure
pub struct AbstractFactoryFn<C, F> {
    can_create: C,
    create: F,
}

impl<C, F> AbstractFactoryFn<C, F>
where
    C: Fn(&dyn ServiceLocator, &str) -> bool + Send + Sync + 'static,
    F: Fn(&dyn ServiceLocator, &str, Option<&Options>) -> Result<Instance, BoxError>
        + Send
        + Sync
        + 'static,
{
    pub fn new(can_create: C, create: F) -> Self {
        Self { can_create, create }
    }
}

impl<C, F> Factory for AbstractFactoryFn<C, F>
where
    C: Fn(&dyn ServiceLocator, &str) -> bool + Send + Sync + 'static,
    F: Fn(&dyn ServiceLocator, &str, Option<&Options>) -> Result<Instance, BoxError>
        + Send
        + Sync
        + 'static,
{
    fn create(
        &self,
        container: &dyn ServiceLocator,
        requested_name: &str,
        options: Option<&Options>,
    ) -> Result<Instance, BoxError> {
        (self.create)(container, requested_name, options)
    }
}

impl<C, F> AbstractFactory for AbstractFactoryFn<C, F>
where
    C: Fn(&dyn ServiceLocator, &str) -> bool + Send + Sync + 'static,
    F: Fn(&dyn ServiceLocator, &str, Option<&Options>) -> Result<Instance, BoxError>
        + Send
        + Sync
        + 'static,
{
    fn can_create(&self, container: &dyn ServiceLocator, requested_name: &str) -> bool {
        (self.can_create)(container, requested_name)
    }
}

/// Adapter turning a closure into a [`DelegatorFactory`]
pub struct DelegatorFn<F>(F);

impl<F> DelegatorFn<F>
where
    F: Fn(&dyn ServiceLocator, &str, &NextFn<'_>, Option<&Options>) -> Result<Instance, BoxError>
        + Send
        + Sync
        + 'static,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> DelegatorFactory for DelegatorFn<F>
where
    F: Fn(&dyn ServiceLocator, &str, &NextFn<'_>, Option<&Options>) -> Result<Instance, BoxError>
        + Send
        + Sync
        + 'static,
{
    fn create(
        &self,
        container: &dyn ServiceLocator,
        name: &str,
        next: &NextFn<'_>,
        options: Option<&Options>,
    ) -> Result<Instance, BoxError> {
        (self.0)(container, name, next, options)
    }
}

/// Adapter turning a closure into an [`Initializer`]
pub struct InitializerFn<F>(F);

impl<F> InitializerFn<F>
where
    F: Fn(&dyn ServiceLocator, &Instance) + Send + Sync + 'static,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> Initializer for InitializerFn<F>
where
    F: Fn(&dyn ServiceLocator, &Instance) + Send + Sync + 'static,
{
    fn initialize(&self, container: &dyn ServiceLocator, instance: &Instance) {
        (self.0)(container, instance)
    }
}
