use std::any::Any;
use std::sync::Arc;

use uuid::Uuid;

use crate::config::service_config::ServiceConfig;
use crate::container::aliases::AliasResolver;
use crate::container::catalog::{Catalog, ComponentRef};
use crate::container::delegators::{self, DelegatorRegistry};
use crate::container::initializers::InitializerPipeline;
use crate::container::instance::Instance;
use crate::container::registry::FactoryRegistry;
use crate::container::store::{SharedStore, SharingPolicy};
use crate::container::traits::{
    AbstractFactory, DelegatorFactory, Factory, Initializer, NextFn, Options, ServiceLocator,
};
use crate::errors::{BoxError, ConfigurationError, ServiceError, ServiceResult};

/// String-keyed service container
///
/// Configuration is merged through `&mut self` ([`configure`](Self::configure))
/// or into a derived copy ([`with_config`](Self::with_config)); resolution
/// (`get`, `build`, `has`) only needs `&self` and may run from several threads
/// once configuration is done.
pub struct ServiceManager {
    id: Uuid,
    catalog: Arc<Catalog>,
    factories: FactoryRegistry,
    delegators: DelegatorRegistry,
    initializers: InitializerPipeline,
    aliases: AliasResolver,
    store: SharedStore,
    sharing: SharingPolicy,
    allow_override: bool,
    /// Locator handed to collaborators; `None` means this manager itself
    creation_context: Option<Arc<dyn ServiceLocator>>,
}

impl ServiceManager {
    /// Create a manager with an empty catalog
    pub fn new(config: ServiceConfig) -> ServiceResult<Self> {
        Self::with_catalog(Arc::new(Catalog::new()), config)
    }

    /// Create a manager resolving named references through `catalog`
    pub fn with_catalog(catalog: Arc<Catalog>, config: ServiceConfig) -> ServiceResult<Self> {
        let mut manager = Self::empty(catalog, None);
        manager.configure(config)?;
        Ok(manager)
    }

    /// Create a manager whose collaborators resolve dependencies from `parent`
    pub fn with_creation_context(
        parent: Arc<dyn ServiceLocator>,
        catalog: Arc<Catalog>,
        config: ServiceConfig,
    ) -> ServiceResult<Self> {
        let mut manager = Self::empty(catalog, Some(parent));
        manager.configure(config)?;
        Ok(manager)
    }

    fn empty(catalog: Arc<Catalog>, creation_context: Option<Arc<dyn ServiceLocator>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            catalog,
            factories: FactoryRegistry::new(),
            delegators: DelegatorRegistry::new(),
            initializers: InitializerPipeline::new(),
            aliases: AliasResolver::new(),
            store: SharedStore::new(),
            sharing: SharingPolicy::default(),
            allow_override: true,
            creation_context,
        }
    }

    /// Unique id of this container instance
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Retrieve a service, returning the shared instance when one is cached
    pub fn get(&self, name: &str) -> ServiceResult<Instance> {
        self.fetch(name, None)
    }

    /// Retrieve a service built with `options`
    ///
    /// Non-empty options always produce a new instance that is not cached.
    pub fn get_with(&self, name: &str, options: &Options) -> ServiceResult<Instance> {
        self.fetch(name, non_empty(options))
    }

    /// Retrieve a service and downcast it to `T`
    pub fn get_as<T: Any + Send + Sync>(&self, name: &str) -> ServiceResult<Arc<T>> {
        let instance = self.get(name)?;
        instance.downcast::<T>().ok_or_else(|| {
            ServiceError::invalid_service(std::any::type_name::<T>(), instance.type_name())
        })
    }

    /// Create a new instance, never reading or writing the shared cache
    pub fn build(&self, name: &str) -> ServiceResult<Instance> {
        self.fresh(name, None)
    }

    /// Create a new instance with `options`, never touching the shared cache
    pub fn build_with(&self, name: &str, options: &Options) -> ServiceResult<Instance> {
        self.fresh(name, non_empty(options))
    }

    /// Check for a cached instance or a directly registered factory
    pub fn has(&self, name: &str) -> bool {
        self.contains(name, false)
    }

    /// Like [`has`](Self::has), optionally asking the abstract factories too
    pub fn contains(&self, name: &str, check_abstract_factories: bool) -> bool {
        if self.store.contains(name) {
            return true;
        }
        let name = self.aliases.resolve(name);
        if self.store.contains(name) || self.factories.has_factory(name) {
            return true;
        }
        check_abstract_factories && self.factories.can_create_abstract(self.context(), name)
    }

    /// Follow the alias chain of `name`
    pub fn resolve_alias<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.resolve(name)
    }

    /// Merge `config` into this manager
    ///
    /// Validation (catalog references, alias cycles, override permission)
    /// happens before anything is applied, so a failed merge leaves the
    /// manager untouched.
    pub fn configure(&mut self, config: ServiceConfig) -> ServiceResult<&mut Self> {
        if !self.allow_override {
            if let Some(name) = config
                .touched_names()
                .find(|name| self.store.contains(name))
            {
                return Err(ServiceError::ModificationNotAllowed {
                    name: name.to_string(),
                });
            }
        }

        let ServiceConfig {
            services,
            factories,
            abstract_factories,
            delegators,
            initializers,
            aliases,
            shared,
            shared_by_default,
        } = config;

        let abstract_factories = self.resolve_abstract_factories(abstract_factories)?;
        let initializers = InitializerPipeline::resolve(&self.catalog, initializers)?;
        self.aliases.merge(&aliases)?;

        tracing::debug!(
            "Configuring container {}: {} services, {} factories, {} abstract factories, {} delegators, {} initializers, {} aliases",
            self.id,
            services.len(),
            factories.len(),
            abstract_factories.len(),
            delegators.len(),
            initializers.len(),
            aliases.len()
        );

        self.store.merge(services);
        self.factories.merge(factories);
        for factory in abstract_factories {
            self.factories.add_abstract_factory(factory);
        }
        self.delegators.merge(delegators);
        self.initializers.append(initializers);
        self.sharing.merge(shared);
        if let Some(shared_by_default) = shared_by_default {
            self.sharing.set_shared_by_default(shared_by_default);
        }

        Ok(self)
    }

    /// Derive an independent manager with `config` merged in
    ///
    /// The derived manager starts from copies of this manager's tables and
    /// cached instances; this manager is left unchanged.
    pub fn with_config(&self, config: ServiceConfig) -> ServiceResult<Self> {
        let mut derived = self.clone();
        derived.configure(config)?;
        tracing::debug!("Derived container {} from {}", derived.id, self.id);
        Ok(derived)
    }

    /// Register a pre-built instance
    pub fn set_service(&mut self, name: impl Into<String>, instance: Instance) -> ServiceResult<()> {
        self.configure(ServiceConfig::new().service(name, instance))?;
        Ok(())
    }

    /// Register a factory
    pub fn set_factory<F: Factory + 'static>(
        &mut self,
        name: impl Into<String>,
        factory: F,
    ) -> ServiceResult<()> {
        self.configure(ServiceConfig::new().factory(name, factory))?;
        Ok(())
    }

    /// Register an alias
    pub fn set_alias(
        &mut self,
        alias: impl Into<String>,
        target: impl Into<String>,
    ) -> ServiceResult<()> {
        self.configure(ServiceConfig::new().alias(alias, target))?;
        Ok(())
    }

    /// Override the sharing policy of one service
    pub fn set_shared(&mut self, name: impl Into<String>, shared: bool) -> ServiceResult<()> {
        self.configure(ServiceConfig::new().shared(name, shared))?;
        Ok(())
    }

    /// Append an abstract factory
    pub fn add_abstract_factory<F: AbstractFactory + 'static>(&mut self, factory: F) -> ServiceResult<()> {
        self.configure(ServiceConfig::new().abstract_factory(factory))?;
        Ok(())
    }

    /// Append a delegator to the chain of `name`
    pub fn add_delegator<D: DelegatorFactory + 'static>(
        &mut self,
        name: impl Into<String>,
        delegator: D,
    ) -> ServiceResult<()> {
        self.configure(ServiceConfig::new().delegator(name, delegator))?;
        Ok(())
    }

    /// Append an initializer
    pub fn add_initializer<I: Initializer + 'static>(&mut self, initializer: I) -> ServiceResult<()> {
        self.configure(ServiceConfig::new().initializer(initializer))?;
        Ok(())
    }

    /// Allow or forbid reconfiguring names that already hold an instance
    pub fn set_allow_override(&mut self, allow: bool) {
        self.allow_override = allow;
    }

    pub fn allow_override(&self) -> bool {
        self.allow_override
    }

    pub fn shared_by_default(&self) -> bool {
        self.sharing.shared_by_default()
    }

    /// Number of cached (shared or pre-built) instances
    pub fn instance_count(&self) -> usize {
        self.store.len()
    }

    fn context(&self) -> &dyn ServiceLocator {
        match &self.creation_context {
            Some(parent) => parent.as_ref(),
            None => self,
        }
    }

    fn resolve_abstract_factories(
        &self,
        references: Vec<ComponentRef<dyn AbstractFactory>>,
    ) -> Result<Vec<Arc<dyn AbstractFactory>>, ConfigurationError> {
        references
            .into_iter()
            .map(|reference| match reference {
                ComponentRef::Resolved(factory) => Ok(factory),
                ComponentRef::Named(name) => self
                    .catalog
                    .abstract_factory(&name)
                    .ok_or(ConfigurationError::UnknownAbstractFactory { name }),
            })
            .collect()
    }

    /// Cached lookup followed by creation and the sharing policy
    ///
    /// The cache is consulted under the requested name before alias
    /// resolution, so an instance already held under that name keeps
    /// winning over an alias added later.
    fn fetch(&self, requested: &str, options: Option<&Options>) -> ServiceResult<Instance> {
        if options.is_none() {
            if let Some(instance) = self.store.get(requested)? {
                tracing::trace!("Container {} returned shared instance of '{}'", self.id, requested);
                return Ok(instance);
            }
        }

        let name = self.aliases.resolve(requested);
        if options.is_none() && name != requested {
            if let Some(instance) = self.store.get(name)? {
                tracing::trace!("Container {} returned shared instance of '{}'", self.id, name);
                return Ok(instance);
            }
        }

        let instance = self.create(name, options)?;

        if options.is_none() && self.sharing.should_share(name) {
            tracing::trace!("Container {} caching shared instance of '{}'", self.id, name);
            return self.store.get_or_insert(name, instance);
        }

        Ok(instance)
    }

    fn fresh(&self, name: &str, options: Option<&Options>) -> ServiceResult<Instance> {
        let name = self.aliases.resolve(name);
        self.create(name, options)
    }

    /// Run factory (through the delegator chain, if any) and initializers
    fn create(&self, name: &str, options: Option<&Options>) -> ServiceResult<Instance> {
        let context = self.context();

        let result = if self.delegators.has_delegators(name) {
            self.delegators
                .chain_for(&self.catalog, name)
                .and_then(|chain| {
                    let base: Box<NextFn<'_>> = Box::new(|| self.invoke_factory(context, name, options));
                    delegators::run_chain(base, &chain, context, name, options)
                })
        } else {
            self.invoke_factory(context, name, options)
        };

        let instance = result.map_err(|error| ServiceError::from_creation(name, error))?;
        self.initializers.run(context, &instance);
        Ok(instance)
    }

    fn invoke_factory(
        &self,
        context: &dyn ServiceLocator,
        name: &str,
        options: Option<&Options>,
    ) -> Result<Instance, BoxError> {
        let strategy = self.factories.get_factory(&self.catalog, context, name)?;
        strategy.create(context, name, options)
    }
}

fn non_empty(options: &Options) -> Option<&Options> {
    if options.is_empty() {
        None
    } else {
        Some(options)
    }
}

impl ServiceLocator for ServiceManager {
    fn get(&self, name: &str) -> ServiceResult<Instance> {
        self.fetch(name, None)
    }

    fn has(&self, name: &str) -> bool {
        self.contains(name, false)
    }

    fn build(&self, name: &str, options: Option<&Options>) -> ServiceResult<Instance> {
        self.fresh(name, options.and_then(non_empty))
    }
}

impl Clone for ServiceManager {
    /// Copies tables and cached instances into a manager with a fresh id
    fn clone(&self) -> Self {
        Self {
            id: Uuid::new_v4(),
            catalog: Arc::clone(&self.catalog),
            factories: self.factories.clone(),
            delegators: self.delegators.clone(),
            initializers: self.initializers.clone(),
            aliases: self.aliases.clone(),
            store: self.store.clone(),
            sharing: self.sharing.clone(),
            allow_override: self.allow_override,
            creation_context: self.creation_context.clone(),
        }
    }
}

impl Default for ServiceManager {
    fn default() -> Self {
        Self::empty(Arc::new(Catalog::new()), None)
    }
}

impl std::fmt::Debug for ServiceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceManager")
            .field("id", &self.id)
            .field("factories", &self.factories)
            .field("delegators", &self.delegators)
            .field("initializers", &self.initializers)
            .field("aliases", &self.aliases.len())
            .field("instances", &self.store.len())
            .field("sharing", &self.sharing)
            .field("allow_override", &self.allow_override)
            .field("has_parent_context", &self.creation_context.is_some())
            .finish()
    }
}
