pub mod core;

pub use self::core::{BoxError, ConfigurationError, ServiceError, ServiceResult};
