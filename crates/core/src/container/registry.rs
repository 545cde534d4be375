use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::merge;
use crate::config::service_config::Entries;
use crate::container::catalog::{Catalog, ComponentRef};
use crate::container::instance::Instance;
use crate::container::traits::{AbstractFactory, Factory, Options, ServiceLocator};
use crate::errors::{BoxError, ServiceError, ServiceResult};

/// Creation strategy selected for a service name
#[derive(Clone)]
pub enum Strategy {
    /// Directly registered factory
    Factory(Arc<dyn Factory>),
    /// First abstract factory that accepted the name
    Abstract(Arc<dyn AbstractFactory>),
}

impl Strategy {
    pub fn create(
        &self,
        container: &dyn ServiceLocator,
        name: &str,
        options: Option<&Options>,
    ) -> Result<Instance, BoxError> {
        match self {
            Strategy::Factory(factory) => factory.create(container, name, options),
            Strategy::Abstract(factory) => factory.create(container, name, options),
        }
    }
}

impl std::fmt::Debug for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Factory(_) => write!(f, "Factory(<factory>)"),
            Strategy::Abstract(_) => write!(f, "Abstract(<abstract_factory>)"),
        }
    }
}

/// Maps service names to factories, with abstract factories as fallback
#[derive(Default)]
pub struct FactoryRegistry {
    factories: RwLock<HashMap<String, ComponentRef<dyn Factory>>>,
    abstract_factories: Vec<Arc<dyn AbstractFactory>>,
}

impl FactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the creation strategy for `name`
    ///
    /// Named factory references are instantiated through the catalog on first
    /// use and written back so later lookups reuse the same factory.
    pub fn get_factory(
        &self,
        catalog: &Catalog,
        container: &dyn ServiceLocator,
        name: &str,
    ) -> ServiceResult<Strategy> {
        let reference = {
            let factories = self
                .factories
                .read()
                .map_err(|_| ServiceError::lock("factories"))?;
            factories.get(name).cloned()
        };

        match reference {
            Some(ComponentRef::Resolved(factory)) => return Ok(Strategy::Factory(factory)),
            Some(ComponentRef::Named(key)) => match catalog.factory(&key) {
                Some(factory) => {
                    tracing::debug!("Instantiated factory '{}' for service '{}'", key, name);
                    self.memoize(name, &key, &factory)?;
                    return Ok(Strategy::Factory(factory));
                }
                None => {
                    tracing::warn!(
                        "Factory '{}' registered for service '{}' is not in the catalog; trying abstract factories",
                        key,
                        name
                    );
                }
            },
            None => {}
        }

        self.abstract_factories
            .iter()
            .find(|factory| factory.can_create(container, name))
            .map(|factory| Strategy::Abstract(Arc::clone(factory)))
            .ok_or_else(|| ServiceError::not_found(name))
    }

    fn memoize(&self, name: &str, key: &str, factory: &Arc<dyn Factory>) -> ServiceResult<()> {
        let mut factories = self
            .factories
            .write()
            .map_err(|_| ServiceError::lock("factories"))?;
        // Only replace the reference we resolved; a merge may have swapped it meanwhile.
        if let Some(entry) = factories.get_mut(name) {
            if matches!(&*entry, ComponentRef::Named(current) if current.as_str() == key) {
                *entry = ComponentRef::Resolved(Arc::clone(factory));
            }
        }
        Ok(())
    }

    /// Check for a directly registered factory
    pub fn has_factory(&self, name: &str) -> bool {
        self.factories
            .read()
            .map(|factories| factories.contains_key(name))
            .unwrap_or(false)
    }

    /// Check if any abstract factory accepts `name`
    pub fn can_create_abstract(&self, container: &dyn ServiceLocator, name: &str) -> bool {
        self.abstract_factories
            .iter()
            .any(|factory| factory.can_create(container, name))
    }

    /// Apply `factories` directives from a configuration merge
    pub fn merge(&mut self, entries: Entries<ComponentRef<dyn Factory>>) {
        let factories = self
            .factories
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        merge::apply_all(factories, entries);
    }

    pub fn add_abstract_factory(&mut self, factory: Arc<dyn AbstractFactory>) {
        self.abstract_factories.push(factory);
    }

    pub fn factory_count(&self) -> usize {
        self.factories
            .read()
            .map(|factories| factories.len())
            .unwrap_or(0)
    }

    pub fn abstract_factory_count(&self) -> usize {
        self.abstract_factories.len()
    }
}

impl Clone for FactoryRegistry {
    fn clone(&self) -> Self {
        let factories = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Self {
            factories: RwLock::new(factories),
            abstract_factories: self.abstract_factories.clone(),
        }
    }
}

impl std::fmt::Debug for FactoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactoryRegistry")
            .field("factories", &self.factory_count())
            .field("abstract_factories", &self.abstract_factories.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::merge::MergeDirective;
    use crate::container::traits::{AbstractFactoryFn, FactoryFn};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NullLocator;

    impl ServiceLocator for NullLocator {
        fn get(&self, name: &str) -> ServiceResult<Instance> {
            Err(ServiceError::not_found(name))
        }

        fn has(&self, _name: &str) -> bool {
            false
        }

        fn build(&self, name: &str, _options: Option<&Options>) -> ServiceResult<Instance> {
            Err(ServiceError::not_found(name))
        }
    }

    fn named(name: &str, key: &str) -> Entries<ComponentRef<dyn Factory>> {
        vec![(name.to_string(), MergeDirective::MergeInto(ComponentRef::named(key)))]
    }

    #[test]
    fn test_named_factory_is_instantiated_once() {
        let constructed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&constructed);

        let mut catalog = Catalog::new();
        catalog.register_factory("answer", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            FactoryFn::new(|_container, _name, _options| Ok(Instance::new(42_u32)))
        });

        let mut registry = FactoryRegistry::new();
        registry.merge(named("answer", "answer"));

        for _ in 0..3 {
            let strategy = registry.get_factory(&catalog, &NullLocator, "answer").unwrap();
            assert!(matches!(strategy, Strategy::Factory(_)));
            let instance = strategy.create(&NullLocator, "answer", None).unwrap();
            assert_eq!(*instance.downcast_ref::<u32>().unwrap(), 42);
        }

        assert_eq!(constructed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_abstract_factories_in_order() {
        let mut registry = FactoryRegistry::new();
        registry.add_abstract_factory(Arc::new(AbstractFactoryFn::new(
            |_container, name| name.starts_with("repo."),
            |_container, _name, _options| Ok(Instance::new("first")),
        )));
        registry.add_abstract_factory(Arc::new(AbstractFactoryFn::new(
            |_container, _name| true,
            |_container, _name, _options| Ok(Instance::new("second")),
        )));

        let catalog = Catalog::new();
        let strategy = registry.get_factory(&catalog, &NullLocator, "repo.users").unwrap();
        let instance = strategy.create(&NullLocator, "repo.users", None).unwrap();
        assert_eq!(*instance.downcast_ref::<&str>().unwrap(), "first");

        let strategy = registry.get_factory(&catalog, &NullLocator, "other").unwrap();
        let instance = strategy.create(&NullLocator, "other", None).unwrap();
        assert_eq!(*instance.downcast_ref::<&str>().unwrap(), "second");
        assert!(registry.can_create_abstract(&NullLocator, "anything"));
        assert!(!registry.has_factory("anything"));
    }

    #[test]
    fn test_unknown_named_factory_is_not_found() {
        let mut registry = FactoryRegistry::new();
        registry.merge(named("mailer", "missing"));

        assert!(registry.has_factory("mailer"));
        let error = registry
            .get_factory(&Catalog::new(), &NullLocator, "mailer")
            .unwrap_err();
        assert!(error.is_not_found());
    }
}
