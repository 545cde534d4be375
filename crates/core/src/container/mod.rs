pub mod aliases;
pub mod catalog;
pub mod delegators;
pub mod initializers;
pub mod instance;
pub mod manager;
pub mod registry;
pub mod store;
pub mod traits;

pub use aliases::AliasResolver;
pub use catalog::{Catalog, ComponentRef};
pub use delegators::DelegatorRegistry;
pub use initializers::InitializerPipeline;
pub use instance::Instance;
pub use manager::ServiceManager;
pub use registry::{FactoryRegistry, Strategy};
pub use store::{SharedStore, SharingPolicy};
pub use traits::{
    AbstractFactory, AbstractFactoryFn, DelegatorFactory, DelegatorFn, Factory, FactoryFn,
    Initializer, InitializerFn, NextFn, Options, ServiceLocator,
};
