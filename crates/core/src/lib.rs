//! String-keyed service manager
//!
//! Services are looked up by name and produced by factories, abstract
//! factories or pre-built instances. Aliases forward names (cycles are
//! rejected while configuring), delegators wrap creation, initializers run
//! on every fresh instance and shared instances are cached. Plugin managers
//! add a capability check on top of the same pipeline.

pub mod config;
pub mod container;
pub mod errors;
pub mod factories;
pub mod plugin;

// Re-export key types for convenience
pub use config::{ConfigDocument, Merge, MergeDirective, ServiceConfig, Table};
pub use container::{
    AbstractFactory, AbstractFactoryFn, Catalog, ComponentRef, DelegatorFactory, DelegatorFn,
    Factory, FactoryFn, Initializer, InitializerFn, Instance, NextFn, Options, ServiceLocator,
    ServiceManager,
};
pub use errors::{BoxError, ConfigurationError, ServiceError, ServiceResult};
pub use factories::{ConfigAbstractFactory, InvokableFactory};
pub use plugin::{Capability, InstanceOf, PluginManager, Predicate};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");

/// Get crate version
pub fn version() -> &'static str {
    VERSION
}

/// Get crate name
pub fn name() -> &'static str {
    CRATE_NAME
}
