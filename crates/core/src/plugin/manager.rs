use std::any::Any;
use std::sync::Arc;

use crate::config::service_config::ServiceConfig;
use crate::container::catalog::Catalog;
use crate::container::instance::Instance;
use crate::container::manager::ServiceManager;
use crate::container::traits::{Options, ServiceLocator};
use crate::errors::{ServiceError, ServiceResult};
use crate::plugin::capability::Capability;

/// Service manager whose every result must satisfy a [`Capability`]
///
/// Plugins are created through an inner [`ServiceManager`]; their
/// collaborators receive the parent locator as creation context, so a
/// plugin factory can pull application services while the plugin itself
/// stays private to this manager.
///
/// The parent is held as an owned `Arc<dyn ServiceLocator>`. A factory only
/// receives `&dyn ServiceLocator`, so it cannot construct a plugin manager
/// whose parent is the container invoking it. Build the plugin manager next
/// to the application container instead, and hand it to factories as a
/// pre-built service of a container derived with
/// [`ServiceManager::with_config`].
pub struct PluginManager {
    inner: ServiceManager,
    capability: Arc<dyn Capability>,
}

impl PluginManager {
    /// Create a plugin manager resolving dependencies from `parent`
    pub fn new<C: Capability + 'static>(
        parent: Arc<dyn ServiceLocator>,
        capability: C,
        config: ServiceConfig,
    ) -> ServiceResult<Self> {
        Self::with_catalog(parent, Arc::new(Catalog::new()), capability, config)
    }

    /// Like [`new`](Self::new), resolving named collaborators through `catalog`
    pub fn with_catalog<C: Capability + 'static>(
        parent: Arc<dyn ServiceLocator>,
        catalog: Arc<Catalog>,
        capability: C,
        config: ServiceConfig,
    ) -> ServiceResult<Self> {
        let capability: Arc<dyn Capability> = Arc::new(capability);
        validate_services(capability.as_ref(), &config)?;
        Ok(Self {
            inner: ServiceManager::with_creation_context(parent, catalog, config)?,
            capability,
        })
    }

    /// Create a plugin manager that is its own creation context
    pub fn standalone<C: Capability + 'static>(
        capability: C,
        config: ServiceConfig,
    ) -> ServiceResult<Self> {
        let capability: Arc<dyn Capability> = Arc::new(capability);
        validate_services(capability.as_ref(), &config)?;
        Ok(Self {
            inner: ServiceManager::new(config)?,
            capability,
        })
    }

    /// Check `instance` against the capability of this manager
    pub fn validate(&self, instance: &Instance) -> ServiceResult<()> {
        check(self.capability.as_ref(), instance)
    }

    pub fn get(&self, name: &str) -> ServiceResult<Instance> {
        self.validated(self.inner.get(name)?)
    }

    pub fn get_with(&self, name: &str, options: &Options) -> ServiceResult<Instance> {
        self.validated(self.inner.get_with(name, options)?)
    }

    /// Retrieve a plugin and downcast it to `T`
    pub fn get_as<T: Any + Send + Sync>(&self, name: &str) -> ServiceResult<Arc<T>> {
        let instance = self.get(name)?;
        instance.downcast::<T>().ok_or_else(|| {
            ServiceError::invalid_service(std::any::type_name::<T>(), instance.type_name())
        })
    }

    pub fn build(&self, name: &str) -> ServiceResult<Instance> {
        self.validated(self.inner.build(name)?)
    }

    pub fn build_with(&self, name: &str, options: &Options) -> ServiceResult<Instance> {
        self.validated(self.inner.build_with(name, options)?)
    }

    pub fn has(&self, name: &str) -> bool {
        self.inner.has(name)
    }

    pub fn contains(&self, name: &str, check_abstract_factories: bool) -> bool {
        self.inner.contains(name, check_abstract_factories)
    }

    /// Merge `config`, rejecting pre-built services that fail validation
    pub fn configure(&mut self, config: ServiceConfig) -> ServiceResult<&mut Self> {
        validate_services(self.capability.as_ref(), &config)?;
        self.inner.configure(config)?;
        Ok(self)
    }

    /// Derive an independent plugin manager with `config` merged in
    pub fn with_config(&self, config: ServiceConfig) -> ServiceResult<Self> {
        validate_services(self.capability.as_ref(), &config)?;
        Ok(Self {
            inner: self.inner.with_config(config)?,
            capability: Arc::clone(&self.capability),
        })
    }

    /// Description of the contract plugins must satisfy
    pub fn capability(&self) -> String {
        self.capability.describe()
    }

    pub fn inner(&self) -> &ServiceManager {
        &self.inner
    }

    fn validated(&self, instance: Instance) -> ServiceResult<Instance> {
        self.validate(&instance)?;
        Ok(instance)
    }
}

fn check(capability: &dyn Capability, instance: &Instance) -> ServiceResult<()> {
    if capability.accepts(instance) {
        return Ok(());
    }
    let expected = capability.describe();
    tracing::warn!(
        "Plugin of type {} rejected; must satisfy {}",
        instance.type_name(),
        expected
    );
    Err(ServiceError::invalid_service(expected, instance.type_name()))
}

fn validate_services(capability: &dyn Capability, config: &ServiceConfig) -> ServiceResult<()> {
    config
        .services
        .iter()
        .filter_map(|(_, directive)| directive.value())
        .try_for_each(|instance| check(capability, instance))
}

impl ServiceLocator for PluginManager {
    fn get(&self, name: &str) -> ServiceResult<Instance> {
        PluginManager::get(self, name)
    }

    fn has(&self, name: &str) -> bool {
        PluginManager::has(self, name)
    }

    fn build(&self, name: &str, options: Option<&Options>) -> ServiceResult<Instance> {
        let instance = ServiceLocator::build(&self.inner, name, options)?;
        self.validated(instance)
    }
}

impl std::fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginManager")
            .field("capability", &self.capability.describe())
            .field("inner", &self.inner)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::capability::{InstanceOf, Predicate};
    use serde_json::json;

    trait Filter: Send + Sync {
        fn apply(&self, input: &str) -> String;
    }

    struct Trim;

    impl Filter for Trim {
        fn apply(&self, input: &str) -> String {
            input.trim().to_string()
        }
    }

    struct Prefix(String);

    impl Filter for Prefix {
        fn apply(&self, input: &str) -> String {
            format!("{}{}", self.0, input)
        }
    }

    fn filter(value: impl Filter + 'static) -> Instance {
        let boxed: Box<dyn Filter> = Box::new(value);
        Instance::new(boxed)
    }

    fn parent() -> Arc<dyn ServiceLocator> {
        Arc::new(
            ServiceManager::new(
                ServiceConfig::new().service_value("config", json!({ "prefix": "> " })),
            )
            .unwrap(),
        )
    }

    fn filters() -> ServiceConfig {
        ServiceConfig::new()
            .factory_fn("trim", |_container, _name, _options| Ok(filter(Trim)))
            .factory_fn("prefix", |container, _name, _options| {
                let config = container.get_as::<serde_json::Value>("config")?;
                let prefix = config["prefix"].as_str().unwrap_or_default().to_string();
                Ok(filter(Prefix(prefix)))
            })
            .factory_fn("broken", |_container, _name, _options| Ok(Instance::new(42_u32)))
            .alias("strip", "trim")
    }

    #[test]
    fn test_plugins_resolve_dependencies_from_parent() {
        let plugins = PluginManager::new(parent(), InstanceOf::<Box<dyn Filter>>::new(), filters())
            .unwrap();

        let prefix = plugins.get_as::<Box<dyn Filter>>("prefix").unwrap();
        assert_eq!(prefix.apply("hi"), "> hi");

        let trim = plugins.get_as::<Box<dyn Filter>>("strip").unwrap();
        assert_eq!(trim.apply("  hi "), "hi");
        assert!(!plugins.has("config"));
    }

    #[test]
    fn test_invalid_plugin_is_rejected() {
        let plugins = PluginManager::new(parent(), InstanceOf::<Box<dyn Filter>>::new(), filters())
            .unwrap();

        let error = plugins.get("broken").unwrap_err();
        match error {
            ServiceError::InvalidService { expected, actual } => {
                assert!(expected.contains("Filter"));
                assert_eq!(actual, "u32");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(plugins.build("broken").unwrap_err().is_invalid_service());
    }

    #[test]
    fn test_prebuilt_services_are_validated_on_configure() {
        let error = PluginManager::standalone(
            InstanceOf::<Box<dyn Filter>>::new(),
            ServiceConfig::new().service_value("number", 1_u8),
        )
        .unwrap_err();
        assert!(error.is_invalid_service());

        let mut plugins =
            PluginManager::standalone(InstanceOf::<Box<dyn Filter>>::new(), ServiceConfig::new())
                .unwrap();
        assert!(plugins
            .configure(ServiceConfig::new().service_value("text", "nope"))
            .is_err());
        assert!(!plugins.has("text"));

        plugins
            .configure(ServiceConfig::new().service("trim", filter(Trim)))
            .unwrap();
        assert!(plugins.has("trim"));
    }

    #[test]
    fn test_with_config_keeps_capability() {
        let plugins = PluginManager::standalone(
            Predicate::new("an even number", |instance: &Instance| {
                instance.downcast_ref::<u32>().is_some_and(|n| n % 2 == 0)
            }),
            ServiceConfig::new().service_value("two", 2_u32),
        )
        .unwrap();

        let derived = plugins
            .with_config(ServiceConfig::new().factory_fn("three", |_c, _n, _o| {
                Ok(Instance::new(3_u32))
            }))
            .unwrap();

        assert!(derived.get("two").is_ok());
        assert!(derived.get("three").unwrap_err().is_invalid_service());
        assert!(!plugins.has("three"));
        assert_eq!(derived.capability(), "an even number");
    }
}
