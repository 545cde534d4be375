pub mod document;
pub mod merge;
pub mod service_config;

pub use document::{ConfigDocument, DocumentEntry};
pub use merge::{Merge, MergeDirective};
pub use service_config::{Entries, ServiceConfig, Table};
