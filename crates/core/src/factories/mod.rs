pub mod config_abstract;
pub mod invokable;

pub use config_abstract::{ConfigAbstractFactory, ConfigFactoryError, CONFIG_SECTION};
pub use invokable::InvokableFactory;
