//! Named constructors for collaborators that are referenced by name
//!
//! Configuration can point at a factory, delegator, abstract factory or
//! initializer by a string key instead of a ready value. The catalog maps
//! those keys to constructors so they can be instantiated on demand.

use std::collections::HashMap;
use std::sync::Arc;

use crate::container::traits::{AbstractFactory, DelegatorFactory, Factory, Initializer};

/// Reference to a collaborator, either ready to use or a catalog key
pub enum ComponentRef<T: ?Sized> {
    Resolved(Arc<T>),
    Named(String),
}

impl<T: ?Sized> ComponentRef<T> {
    /// Create a reference resolved later through the catalog
    pub fn named(name: impl Into<String>) -> Self {
        ComponentRef::Named(name.into())
    }

    /// Check if the reference still has to go through the catalog
    pub fn is_named(&self) -> bool {
        matches!(self, ComponentRef::Named(_))
    }
}

impl<T: ?Sized> Clone for ComponentRef<T> {
    fn clone(&self) -> Self {
        match self {
            ComponentRef::Resolved(value) => ComponentRef::Resolved(Arc::clone(value)),
            ComponentRef::Named(name) => ComponentRef::Named(name.clone()),
        }
    }
}

impl<T: ?Sized> std::fmt::Debug for ComponentRef<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComponentRef::Resolved(_) => f.debug_tuple("Resolved").field(&"<component>").finish(),
            ComponentRef::Named(name) => f.debug_tuple("Named").field(name).finish(),
        }
    }
}

type Constructor<T> = Arc<dyn Fn() -> Arc<T> + Send + Sync>;

/// Registry of named collaborator constructors
#[derive(Default, Clone)]
pub struct Catalog {
    factories: HashMap<String, Constructor<dyn Factory>>,
    abstract_factories: HashMap<String, Constructor<dyn AbstractFactory>>,
    delegators: HashMap<String, Constructor<dyn DelegatorFactory>>,
    initializers: HashMap<String, Constructor<dyn Initializer>>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory constructor under `name`
    pub fn register_factory<F, C>(&mut self, name: impl Into<String>, constructor: C) -> &mut Self
    where
        F: Factory + 'static,
        C: Fn() -> F + Send + Sync + 'static,
    {
        self.factories.insert(
            name.into(),
            Arc::new(move || Arc::new(constructor()) as Arc<dyn Factory>),
        );
        self
    }

    /// Register an abstract factory constructor under `name`
    pub fn register_abstract_factory<F, C>(
        &mut self,
        name: impl Into<String>,
        constructor: C,
    ) -> &mut Self
    where
        F: AbstractFactory + 'static,
        C: Fn() -> F + Send + Sync + 'static,
    {
        self.abstract_factories.insert(
            name.into(),
            Arc::new(move || Arc::new(constructor()) as Arc<dyn AbstractFactory>),
        );
        self
    }

    /// Register a delegator factory constructor under `name`
    pub fn register_delegator<F, C>(&mut self, name: impl Into<String>, constructor: C) -> &mut Self
    where
        F: DelegatorFactory + 'static,
        C: Fn() -> F + Send + Sync + 'static,
    {
        self.delegators.insert(
            name.into(),
            Arc::new(move || Arc::new(constructor()) as Arc<dyn DelegatorFactory>),
        );
        self
    }

    /// Register an initializer constructor under `name`
    pub fn register_initializer<F, C>(&mut self, name: impl Into<String>, constructor: C) -> &mut Self
    where
        F: Initializer + 'static,
        C: Fn() -> F + Send + Sync + 'static,
    {
        self.initializers.insert(
            name.into(),
            Arc::new(move || Arc::new(constructor()) as Arc<dyn Initializer>),
        );
        self
    }

    pub fn factory(&self, name: &str) -> Option<Arc<dyn Factory>> {
        self.factories.get(name).map(|constructor| constructor())
    }

    pub fn abstract_factory(&self, name: &str) -> Option<Arc<dyn AbstractFactory>> {
        self.abstract_factories.get(name).map(|constructor| constructor())
    }

    pub fn delegator(&self, name: &str) -> Option<Arc<dyn DelegatorFactory>> {
        self.delegators.get(name).map(|constructor| constructor())
    }

    pub fn initializer(&self, name: &str) -> Option<Arc<dyn Initializer>> {
        self.initializers.get(name).map(|constructor| constructor())
    }

    /// Total number of registered constructors
    pub fn len(&self) -> usize {
        self.factories.len()
            + self.abstract_factories.len()
            + self.delegators.len()
            + self.initializers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("factories", &self.factories.len())
            .field("abstract_factories", &self.abstract_factories.len())
            .field("delegators", &self.delegators.len())
            .field("initializers", &self.initializers.len())
            .finish()
    }
}
