//! Integration tests for declarative configuration documents
//!
//! Documents name their collaborators; the catalog supplies constructors
//! for those names when the configuration is merged or first used.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use locator_core::{
    Catalog, ConfigAbstractFactory, DelegatorFn, FactoryFn, InitializerFn, Instance,
    InvokableFactory, ServiceConfig, ServiceManager,
};

#[derive(Debug, Default)]
struct Cache {
    entries: usize,
}

#[derive(Debug)]
struct TracedCache {
    inner: Arc<Cache>,
}

const APPLICATION: &str = r#"
services:
  config:
    cache:
      ttl: 60
    ConfigAbstractFactory:
      report: [config]
factories:
  cache: cache_factory
delegators:
  cache: [tracing_delegator]
initializers: [counting_initializer]
abstract_factories: [config_abstract]
aliases:
  store: cache
"#;

fn catalog(initialized: Arc<AtomicUsize>) -> Arc<Catalog> {
    let mut catalog = Catalog::new();
    catalog
        .register_factory("cache_factory", InvokableFactory::<Cache>::of)
        .register_delegator("tracing_delegator", || {
            DelegatorFn::new(|_container, _name, next, _options| {
                let inner = next()?
                    .downcast::<Cache>()
                    .ok_or("expected a cache")?;
                Ok(Instance::new(TracedCache { inner }))
            })
        })
        .register_initializer("counting_initializer", move || {
            let initialized = Arc::clone(&initialized);
            InitializerFn::new(move |_container, _instance| {
                initialized.fetch_add(1, Ordering::SeqCst);
            })
        })
        .register_abstract_factory("config_abstract", || {
            ConfigAbstractFactory::new().register("report", |dependencies: &[Instance]| {
                let config = dependencies[0]
                    .downcast::<serde_json::Value>()
                    .ok_or("config must be JSON")?;
                Ok(format!("cache ttl {}", config["cache"]["ttl"]))
            })
        });
    Arc::new(catalog)
}

#[test]
fn test_yaml_document_configures_manager() {
    let initialized = Arc::new(AtomicUsize::new(0));
    let manager = ServiceManager::with_catalog(
        catalog(Arc::clone(&initialized)),
        ServiceConfig::from_yaml(APPLICATION).unwrap(),
    )
    .unwrap();

    let cache = manager.get_as::<TracedCache>("store").unwrap();
    assert_eq!(cache.inner.entries, 0);
    assert!(Instance::ptr_eq(
        &manager.get("cache").unwrap(),
        &manager.get("store").unwrap()
    ));

    let report = manager.get_as::<String>("report").unwrap();
    assert_eq!(report.as_str(), "cache ttl 60");

    assert_eq!(initialized.load(Ordering::SeqCst), 2);
}

#[test]
fn test_overlay_document_removes_and_replaces() {
    let base = ServiceManager::with_catalog(
        catalog(Arc::new(AtomicUsize::new(0))),
        ServiceConfig::from_yaml(APPLICATION).unwrap(),
    )
    .unwrap();

    let overlay = ServiceConfig::from_json(
        r#"{
            "delegators": { "cache": "$remove" },
            "aliases": { "store": "$remove" },
            "services": { "config": { "$replace": { "cache": { "ttl": 5 } } } }
        }"#,
    )
    .unwrap();
    let derived = base.with_config(overlay).unwrap();

    assert!(derived.get_as::<Cache>("cache").is_ok());
    assert!(!derived.has("store"));
    assert!(!derived.contains("report", true));

    let config = derived.get_as::<serde_json::Value>("config").unwrap();
    assert_eq!(config["cache"]["ttl"], 5);
    assert!(base.has("store"));
}

#[test]
fn test_unknown_catalog_names() {
    let error = ServiceManager::new(
        ServiceConfig::from_yaml("initializers: [missing_initializer]").unwrap(),
    )
    .unwrap_err();
    assert!(error.is_invalid_configuration());

    let manager = ServiceManager::new(
        ServiceConfig::from_yaml("factories:\n  mailer: missing_factory\n").unwrap(),
    )
    .unwrap();
    assert!(manager.has("mailer"));
    assert!(manager.get("mailer").unwrap_err().is_not_found());

    let manager = ServiceManager::new(
        ServiceConfig::new()
            .factory("mailer", FactoryFn::new(|_c, _n, _o| Ok(Instance::new(()))))
            .merge(ServiceConfig::from_yaml("delegators:\n  mailer: [missing_delegator]\n").unwrap()),
    )
    .unwrap();
    assert!(manager.get("mailer").unwrap_err().is_not_created());
}
