pub mod capability;
pub mod manager;

pub use capability::{Capability, InstanceOf, Predicate};
pub use manager::PluginManager;
