use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::merge;
use crate::config::service_config::Entries;
use crate::container::catalog::{Catalog, ComponentRef};
use crate::container::instance::Instance;
use crate::container::traits::{DelegatorFactory, NextFn, Options, ServiceLocator};
use crate::errors::{BoxError, ConfigurationError, ServiceError};

/// Delegator chains registered per service name
#[derive(Default)]
pub struct DelegatorRegistry {
    delegators: RwLock<HashMap<String, Vec<ComponentRef<dyn DelegatorFactory>>>>,
}

impl DelegatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if `name` has at least one delegator
    pub fn has_delegators(&self, name: &str) -> bool {
        self.delegators
            .read()
            .map(|delegators| delegators.get(name).is_some_and(|chain| !chain.is_empty()))
            .unwrap_or(false)
    }

    /// Resolved delegator chain of `name`, in registration order
    ///
    /// Named delegators are instantiated through the catalog and memoized.
    pub fn chain_for(
        &self,
        catalog: &Catalog,
        name: &str,
    ) -> Result<Vec<Arc<dyn DelegatorFactory>>, BoxError> {
        let references = {
            let delegators = self
                .delegators
                .read()
                .map_err(|_| ServiceError::lock("delegators"))?;
            delegators.get(name).cloned().unwrap_or_default()
        };

        let mut chain = Vec::with_capacity(references.len());
        let mut instantiated = Vec::new();
        for (index, reference) in references.into_iter().enumerate() {
            match reference {
                ComponentRef::Resolved(delegator) => chain.push(delegator),
                ComponentRef::Named(key) => {
                    let delegator = catalog
                        .delegator(&key)
                        .ok_or_else(|| ConfigurationError::UnknownDelegator { name: key.clone() })?;
                    tracing::debug!("Instantiated delegator '{}' for service '{}'", key, name);
                    instantiated.push((index, key, Arc::clone(&delegator)));
                    chain.push(delegator);
                }
            }
        }

        if !instantiated.is_empty() {
            let mut delegators = self
                .delegators
                .write()
                .map_err(|_| ServiceError::lock("delegators"))?;
            if let Some(stored) = delegators.get_mut(name) {
                for (index, key, delegator) in instantiated {
                    if let Some(entry) = stored.get_mut(index) {
                        if matches!(&*entry, ComponentRef::Named(current) if *current == key) {
                            *entry = ComponentRef::Resolved(delegator);
                        }
                    }
                }
            }
        }

        Ok(chain)
    }

    /// Apply `delegators` directives from a configuration merge
    pub fn merge(&mut self, entries: Entries<Vec<ComponentRef<dyn DelegatorFactory>>>) {
        let delegators = self
            .delegators
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        merge::apply_all(delegators, entries);
    }

    pub fn len(&self) -> usize {
        self.delegators
            .read()
            .map(|delegators| delegators.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Clone for DelegatorRegistry {
    fn clone(&self) -> Self {
        let delegators = self
            .delegators
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Self {
            delegators: RwLock::new(delegators),
        }
    }
}

impl std::fmt::Debug for DelegatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelegatorRegistry")
            .field("services", &self.len())
            .finish()
    }
}

/// Fold a delegator chain around `base`
///
/// The first delegator wraps `base`, each following one wraps the previous
/// result, so the last registered delegator is the one invoked first.
pub fn compose<'a>(
    base: Box<NextFn<'a>>,
    chain: &'a [Arc<dyn DelegatorFactory>],
    container: &'a dyn ServiceLocator,
    name: &'a str,
    options: Option<&'a Options>,
) -> Box<NextFn<'a>> {
    chain
        .iter()
        .fold(base, |inner: Box<NextFn<'a>>, delegator| -> Box<NextFn<'a>> {
            Box::new(move || delegator.create(container, name, inner.as_ref(), options))
        })
}

/// Run `chain` around the base factory call and return the outermost result
pub fn run_chain<'a>(
    base: Box<NextFn<'a>>,
    chain: &'a [Arc<dyn DelegatorFactory>],
    container: &'a dyn ServiceLocator,
    name: &'a str,
    options: Option<&'a Options>,
) -> Result<Instance, BoxError> {
    compose(base, chain, container, name, options)()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::merge::MergeDirective;
    use crate::container::traits::DelegatorFn;
    use crate::errors::ServiceResult;
    use std::sync::Mutex;

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

    fn recording(label: &'static str, log: Arc<Mutex<Vec<String>>>) -> Arc<dyn DelegatorFactory> {
        Arc::new(DelegatorFn::new(move |_container, _name, next, _options| {
            log.lock().unwrap().push(format!("enter {label}"));
            let instance = next()?;
            log.lock().unwrap().push(format!("leave {label}"));
            Ok(instance)
        }))
    }

    #[test]
    fn test_last_delegator_is_outermost() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = vec![recording("d1", log.clone()), recording("d2", log.clone())];
        let base_log = log.clone();
        let base: Box<NextFn<'_>> = Box::new(move || {
            base_log.lock().unwrap().push("factory".to_string());
            Ok(Instance::new(()))
        });

        run_chain(base, &chain, &NullLocator, "svc", None).unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["enter d2", "enter d1", "factory", "leave d1", "leave d2"]
        );
    }

    #[test]
    fn test_delegator_can_skip_inner_chain() {
        let chain: Vec<Arc<dyn DelegatorFactory>> = vec![Arc::new(DelegatorFn::new(
            |_container, _name, _next, _options| Ok(Instance::new("replacement")),
        ))];
        let base: Box<NextFn<'_>> = Box::new(|| Err("base factory must not run".into()));

        let instance = run_chain(base, &chain, &NullLocator, "svc", None).unwrap();
        assert_eq!(*instance.downcast_ref::<&str>().unwrap(), "replacement");
    }

    #[test]
    fn test_named_delegators_resolve_and_report_unknown() {
        let mut catalog = Catalog::new();
        catalog.register_delegator("passthrough", || {
            DelegatorFn::new(|_container, _name, next, _options| next())
        });

        let mut registry = DelegatorRegistry::new();
        registry.merge(vec![
            (
                "svc".to_string(),
                MergeDirective::MergeInto(vec![ComponentRef::named("passthrough")]),
            ),
            (
                "broken".to_string(),
                MergeDirective::MergeInto(vec![ComponentRef::named("missing")]),
            ),
        ]);

        assert_eq!(registry.chain_for(&catalog, "svc").unwrap().len(), 1);
        assert!(registry.has_delegators("svc"));
        assert!(registry.chain_for(&catalog, "broken").is_err());
        assert!(registry.chain_for(&catalog, "none").unwrap().is_empty());
    }
}
