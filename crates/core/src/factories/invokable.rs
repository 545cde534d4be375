use std::any::Any;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::container::instance::Instance;
use crate::container::traits::{Factory, Options, ServiceLocator};
use crate::errors::BoxError;

type Constructor<T> = dyn Fn(Option<&Options>) -> Result<T, BoxError> + Send + Sync;

/// Factory for types without container dependencies
///
/// The constructor only receives the construction options.
pub struct InvokableFactory<T> {
    constructor: Arc<Constructor<T>>,
}

impl<T: Any + Send + Sync> InvokableFactory<T> {
    pub fn new<F>(constructor: F) -> Self
    where
        F: Fn(Option<&Options>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self {
            constructor: Arc::new(constructor),
        }
    }

    /// Build `T` with [`Default`], ignoring options
    pub fn of() -> Self
    where
        T: Default,
    {
        Self::new(|_options| Ok(T::default()))
    }

    /// Build `T` by deserializing the options; no options yields `T::default()`
    pub fn from_options() -> Self
    where
        T: Default + DeserializeOwned,
    {
        Self::new(|options| match options {
            Some(options) => Ok(serde_json::from_value(Value::Object(options.clone()))?),
            None => Ok(T::default()),
        })
    }
}

impl<T> Clone for InvokableFactory<T> {
    fn clone(&self) -> Self {
        Self {
            constructor: Arc::clone(&self.constructor),
        }
    }
}

impl<T: Any + Send + Sync> Factory for InvokableFactory<T> {
    fn create(
        &self,
        _container: &dyn ServiceLocator,
        _requested_name: &str,
        options: Option<&Options>,
    ) -> Result<Instance, BoxError> {
        (self.constructor)(options).map(Instance::new)
    }
}

impl<T> std::fmt::Debug for InvokableFactory<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InvokableFactory<{}>", std::any::type_name::<T>())
    }
}
