use std::sync::Arc;

use crate::container::catalog::{Catalog, ComponentRef};
use crate::container::instance::Instance;
use crate::container::traits::{Initializer, ServiceLocator};
use crate::errors::ConfigurationError;

/// Ordered post-construction hooks
#[derive(Clone, Default)]
pub struct InitializerPipeline {
    initializers: Vec<Arc<dyn Initializer>>,
}

impl InitializerPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `references` through the catalog, failing on the first
    /// unknown name
    pub(crate) fn resolve(
        catalog: &Catalog,
        references: Vec<ComponentRef<dyn Initializer>>,
    ) -> Result<Vec<Arc<dyn Initializer>>, ConfigurationError> {
        references
            .into_iter()
            .map(|reference| match reference {
                ComponentRef::Resolved(initializer) => Ok(initializer),
                ComponentRef::Named(name) => catalog
                    .initializer(&name)
                    .ok_or(ConfigurationError::UnknownInitializer { name }),
            })
            .collect()
    }

    pub(crate) fn append(&mut self, initializers: Vec<Arc<dyn Initializer>>) {
        self.initializers.extend(initializers);
    }

    /// Run every initializer on `instance`, in registration order
    pub fn run(&self, container: &dyn ServiceLocator, instance: &Instance) {
        for initializer in &self.initializers {
            initializer.initialize(container, instance);
        }
    }

    pub fn len(&self) -> usize {
        self.initializers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.initializers.is_empty()
    }
}

impl std::fmt::Debug for InitializerPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializerPipeline")
            .field("initializers", &self.initializers.len())
            .finish()
    }
}
