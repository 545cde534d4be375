use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::config::merge;
use crate::config::service_config::Entries;
use crate::container::instance::Instance;
use crate::errors::{ServiceError, ServiceResult};

/// Which names get their created instance cached
#[derive(Debug, Clone)]
pub struct SharingPolicy {
    shared: HashMap<String, bool>,
    shared_by_default: bool,
}

impl SharingPolicy {
    pub fn new(shared_by_default: bool) -> Self {
        Self {
            shared: HashMap::new(),
            shared_by_default,
        }
    }

    /// Whether a freshly created `name` should be cached
    pub fn should_share(&self, name: &str) -> bool {
        self.shared
            .get(name)
            .copied()
            .unwrap_or(self.shared_by_default)
    }

    pub fn shared_by_default(&self) -> bool {
        self.shared_by_default
    }

    pub fn set_shared_by_default(&mut self, shared: bool) {
        self.shared_by_default = shared;
    }

    pub fn merge(&mut self, entries: Entries<bool>) {
        merge::apply_all(&mut self.shared, entries);
    }
}

impl Default for SharingPolicy {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Shared instance cache of a container
#[derive(Debug, Default)]
pub struct SharedStore {
    instances: RwLock<HashMap<String, Instance>>,
}

impl SharedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached instance for `name`, if any
    pub fn get(&self, name: &str) -> ServiceResult<Option<Instance>> {
        let instances = self
            .instances
            .read()
            .map_err(|_| ServiceError::lock("shared_instances"))?;
        Ok(instances.get(name).cloned())
    }

    /// Cache `instance` unless `name` already holds one
    ///
    /// Returns the instance that ends up cached, so concurrent callers that
    /// each created a candidate all agree on the first one stored.
    pub fn get_or_insert(&self, name: &str, instance: Instance) -> ServiceResult<Instance> {
        let mut instances = self
            .instances
            .write()
            .map_err(|_| ServiceError::lock("shared_instances"))?;
        Ok(instances
            .entry(name.to_string())
            .or_insert(instance)
            .clone())
    }

    /// Check for a cached instance. A poisoned lock reads as "not cached".
    pub fn contains(&self, name: &str) -> bool {
        self.instances
            .read()
            .map(|instances| instances.contains_key(name))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.instances
            .read()
            .map(|instances| instances.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply `services` directives from a configuration merge
    pub fn merge(&mut self, entries: Entries<Instance>) {
        let instances = self
            .instances
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        merge::apply_all(instances, entries);
    }
}

impl Clone for SharedStore {
    fn clone(&self) -> Self {
        let instances = self
            .instances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Self {
            instances: RwLock::new(instances),
        }
    }
}
