use std::any::Any;
use std::sync::Arc;

use crate::config::merge::MergeDirective;
use crate::container::catalog::ComponentRef;
use crate::container::instance::Instance;
use crate::container::traits::{
    AbstractFactory, DelegatorFactory, DelegatorFn, Factory, FactoryFn, Initializer,
    InitializerFn, NextFn, Options, ServiceLocator,
};
use crate::errors::BoxError;

/// Ordered `(name, directive)` pairs of one configuration table
pub type Entries<T> = Vec<(String, MergeDirective<T>)>;

/// Keyed tables of a [`ServiceConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Services,
    Factories,
    Delegators,
    Aliases,
    Shared,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Services => "services",
            Table::Factories => "factories",
            Table::Delegators => "delegators",
            Table::Aliases => "aliases",
            Table::Shared => "shared",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration record merged into a service manager
///
/// Every keyed table is kept as an ordered list of merge directives, so
/// merging two records is a concatenation: applying `a.merge(b)` to a
/// container is the same as applying `a` and then `b`.
#[derive(Clone, Default)]
pub struct ServiceConfig {
    pub(crate) services: Entries<Instance>,
    pub(crate) factories: Entries<ComponentRef<dyn Factory>>,
    pub(crate) abstract_factories: Vec<ComponentRef<dyn AbstractFactory>>,
    pub(crate) delegators: Entries<Vec<ComponentRef<dyn DelegatorFactory>>>,
    pub(crate) initializers: Vec<ComponentRef<dyn Initializer>>,
    pub(crate) aliases: Entries<String>,
    pub(crate) shared: Entries<bool>,
    pub(crate) shared_by_default: Option<bool>,
}

impl ServiceConfig {
    /// Create an empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pre-built service instance
    pub fn service(mut self, name: impl Into<String>, instance: Instance) -> Self {
        self.services
            .push((name.into(), MergeDirective::MergeInto(instance)));
        self
    }

    /// Register a pre-built value, wrapping it in an [`Instance`]
    pub fn service_value<T: Any + Send + Sync>(self, name: impl Into<String>, value: T) -> Self {
        self.service(name, Instance::new(value))
    }

    /// Register a factory for `name`
    pub fn factory<F: Factory + 'static>(mut self, name: impl Into<String>, factory: F) -> Self {
        self.factories.push((
            name.into(),
            MergeDirective::MergeInto(ComponentRef::Resolved(Arc::new(factory))),
        ));
        self
    }

    /// Register a closure as the factory for `name`
    pub fn factory_fn<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&dyn ServiceLocator, &str, Option<&Options>) -> Result<Instance, BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.factory(name, FactoryFn::new(f))
    }

    /// Register a factory that is instantiated from the catalog on first use
    pub fn factory_named(mut self, name: impl Into<String>, key: impl Into<String>) -> Self {
        self.factories
            .push((name.into(), MergeDirective::MergeInto(ComponentRef::named(key))));
        self
    }

    /// Append an abstract factory
    pub fn abstract_factory<F: AbstractFactory + 'static>(mut self, factory: F) -> Self {
        self.abstract_factories
            .push(ComponentRef::Resolved(Arc::new(factory)));
        self
    }

    /// Append an abstract factory resolved from the catalog during the merge
    pub fn abstract_factory_named(mut self, key: impl Into<String>) -> Self {
        self.abstract_factories.push(ComponentRef::named(key));
        self
    }

    /// Append a delegator to the chain of `name`
    pub fn delegator<D: DelegatorFactory + 'static>(
        mut self,
        name: impl Into<String>,
        delegator: D,
    ) -> Self {
        self.delegators.push((
            name.into(),
            MergeDirective::MergeInto(vec![ComponentRef::Resolved(Arc::new(delegator))]),
        ));
        self
    }

    /// Append a closure delegator to the chain of `name`
    pub fn delegator_fn<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&dyn ServiceLocator, &str, &NextFn<'_>, Option<&Options>) -> Result<Instance, BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.delegator(name, DelegatorFn::new(f))
    }

    /// Append a catalog delegator to the chain of `name`
    pub fn delegator_named(mut self, name: impl Into<String>, key: impl Into<String>) -> Self {
        self.delegators
            .push((name.into(), MergeDirective::MergeInto(vec![ComponentRef::named(key)])));
        self
    }

    /// Replace the whole delegator chain of `name`
    pub fn replace_delegators(
        mut self,
        name: impl Into<String>,
        chain: Vec<ComponentRef<dyn DelegatorFactory>>,
    ) -> Self {
        self.delegators
            .push((name.into(), MergeDirective::Replace(chain)));
        self
    }

    /// Append an initializer
    pub fn initializer<I: Initializer + 'static>(mut self, initializer: I) -> Self {
        self.initializers
            .push(ComponentRef::Resolved(Arc::new(initializer)));
        self
    }

    /// Append a closure initializer
    pub fn initializer_fn<F>(self, f: F) -> Self
    where
        F: Fn(&dyn ServiceLocator, &Instance) + Send + Sync + 'static,
    {
        self.initializer(InitializerFn::new(f))
    }

    /// Append an initializer resolved from the catalog during the merge
    pub fn initializer_named(mut self, key: impl Into<String>) -> Self {
        self.initializers.push(ComponentRef::named(key));
        self
    }

    /// Forward lookups of `alias` to `target`
    pub fn alias(mut self, alias: impl Into<String>, target: impl Into<String>) -> Self {
        self.aliases
            .push((alias.into(), MergeDirective::MergeInto(target.into())));
        self
    }

    /// Override the sharing policy of `name`
    pub fn shared(mut self, name: impl Into<String>, shared: bool) -> Self {
        self.shared
            .push((name.into(), MergeDirective::MergeInto(shared)));
        self
    }

    /// Set the sharing policy for names without an explicit override
    pub fn shared_by_default(mut self, shared: bool) -> Self {
        self.shared_by_default = Some(shared);
        self
    }

    /// Delete `name` from `table` when this configuration is applied
    pub fn remove(mut self, table: Table, name: impl Into<String>) -> Self {
        let name = name.into();
        match table {
            Table::Services => self.services.push((name, MergeDirective::Remove)),
            Table::Factories => self.factories.push((name, MergeDirective::Remove)),
            Table::Delegators => self.delegators.push((name, MergeDirective::Remove)),
            Table::Aliases => self.aliases.push((name, MergeDirective::Remove)),
            Table::Shared => self.shared.push((name, MergeDirective::Remove)),
        }
        self
    }

    /// Layer `other` on top of this configuration
    pub fn merge(mut self, other: ServiceConfig) -> Self {
        self.services.extend(other.services);
        self.factories.extend(other.factories);
        self.abstract_factories.extend(other.abstract_factories);
        self.delegators.extend(other.delegators);
        self.initializers.extend(other.initializers);
        self.aliases.extend(other.aliases);
        self.shared.extend(other.shared);
        if other.shared_by_default.is_some() {
            self.shared_by_default = other.shared_by_default;
        }
        self
    }

    /// Check if the configuration carries no entries at all
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
            && self.factories.is_empty()
            && self.abstract_factories.is_empty()
            && self.delegators.is_empty()
            && self.initializers.is_empty()
            && self.aliases.is_empty()
            && self.shared.is_empty()
            && self.shared_by_default.is_none()
    }

    /// Names touched by the keyed tables, in declaration order
    pub(crate) fn touched_names(&self) -> impl Iterator<Item = &str> {
        self.services
            .iter()
            .map(|(name, _)| name.as_str())
            .chain(self.factories.iter().map(|(name, _)| name.as_str()))
            .chain(self.delegators.iter().map(|(name, _)| name.as_str()))
            .chain(self.aliases.iter().map(|(name, _)| name.as_str()))
            .chain(self.shared.iter().map(|(name, _)| name.as_str()))
    }
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("services", &self.services.len())
            .field("factories", &self.factories.len())
            .field("abstract_factories", &self.abstract_factories.len())
            .field("delegators", &self.delegators.len())
            .field("initializers", &self.initializers.len())
            .field("aliases", &self.aliases)
            .field("shared", &self.shared)
            .field("shared_by_default", &self.shared_by_default)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_concatenates_in_order() {
        let base = ServiceConfig::new()
            .alias("mail", "mailer")
            .shared("mailer", false)
            .shared_by_default(false);
        let overlay = ServiceConfig::new()
            .alias("mail", "smtp")
            .remove(Table::Shared, "mailer");

        let merged = base.merge(overlay);

        assert_eq!(
            merged.aliases,
            vec![
                ("mail".to_string(), MergeDirective::MergeInto("mailer".to_string())),
                ("mail".to_string(), MergeDirective::MergeInto("smtp".to_string())),
            ]
        );
        assert!(merged.shared[1].1.is_remove());
        assert_eq!(merged.shared_by_default, Some(false));
    }

    #[test]
    fn test_overlay_without_default_keeps_base_default() {
        let merged = ServiceConfig::new()
            .shared_by_default(false)
            .merge(ServiceConfig::new().alias("a", "b"));
        assert_eq!(merged.shared_by_default, Some(false));
    }

    #[test]
    fn test_touched_names() {
        let config = ServiceConfig::new()
            .service_value("config", 1_u8)
            .factory_fn("mailer", |_container, _name, _options| Ok(Instance::new(())))
            .alias("mail", "mailer");

        let names: Vec<&str> = config.touched_names().collect();
        assert_eq!(names, vec!["config", "mailer", "mail"]);
        assert!(!config.is_empty());
        assert!(ServiceConfig::new().is_empty());
    }
}
