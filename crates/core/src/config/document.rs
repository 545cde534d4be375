//! Declarative configuration documents
//!
//! A document describes a [`ServiceConfig`] in YAML or JSON. Collaborators
//! are referenced by their [`Catalog`](crate::Catalog) name, pre-built
//! services are plain JSON values. Any keyed entry may carry a directive
//! instead of a value:
//!
//! ```yaml
//! services:
//!   config:
//!     $replace: { db: { host: localhost } }
//! factories:
//!   mailer: smtp_mailer
//! aliases:
//!   mail: mailer
//!   legacy_mail: $remove
//! ```

use std::fmt;
use std::marker::PhantomData;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::config::merge::MergeDirective;
use crate::config::service_config::{Entries, ServiceConfig, Table};
use crate::container::catalog::ComponentRef;
use crate::container::instance::Instance;
use crate::errors::ConfigurationError;

/// Explicit directive written in place of a value
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub enum Directive<T> {
    #[serde(rename = "$replace")]
    Replace(T),
    #[serde(rename = "$remove")]
    Remove,
}

/// One keyed entry of a document table
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DocumentEntry<T> {
    Directive(Directive<T>),
    Value(T),
}

impl<T> From<DocumentEntry<T>> for MergeDirective<T> {
    fn from(entry: DocumentEntry<T>) -> Self {
        match entry {
            DocumentEntry::Value(value) => MergeDirective::MergeInto(value),
            DocumentEntry::Directive(Directive::Replace(value)) => MergeDirective::Replace(value),
            DocumentEntry::Directive(Directive::Remove) => MergeDirective::Remove,
        }
    }
}

/// Map that keeps the declaration order of its keys
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedTable<T>(pub Vec<(String, T)>);

impl<T> OrderedTable<T> {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T> Default for OrderedTable<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for OrderedTable<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TableVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for TableVisitor<T> {
            type Value = OrderedTable<T>;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a map keyed by service name")
            }

            fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
                Ok(OrderedTable::default())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, value)) = map.next_entry::<String, T>()? {
                    entries.push((key, value));
                }
                Ok(OrderedTable(entries))
            }
        }

        deserializer.deserialize_map(TableVisitor(PhantomData))
    }
}

/// Serializable description of a [`ServiceConfig`]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigDocument {
    pub services: OrderedTable<DocumentEntry<Value>>,
    pub factories: OrderedTable<DocumentEntry<String>>,
    pub abstract_factories: Vec<String>,
    pub delegators: OrderedTable<DocumentEntry<Vec<String>>>,
    pub initializers: Vec<String>,
    pub aliases: OrderedTable<DocumentEntry<String>>,
    pub shared: OrderedTable<DocumentEntry<bool>>,
    pub shared_by_default: Option<bool>,
}

impl ConfigDocument {
    pub fn from_yaml(source: &str) -> Result<Self, ConfigurationError> {
        Ok(serde_yaml::from_str(source)?)
    }

    pub fn from_json(source: &str) -> Result<Self, ConfigurationError> {
        Ok(serde_json::from_str(source)?)
    }

    /// Convert into a [`ServiceConfig`], keeping the document's entry order
    pub fn into_config(self) -> Result<ServiceConfig, ConfigurationError> {
        let services = convert(Table::Services, self.services, |value| Ok(Instance::new(value)))?;
        let factories = convert(Table::Factories, self.factories, |key| {
            catalog_key(Table::Factories, &key).map(|_| ComponentRef::named(key))
        })?;
        let delegators = convert(Table::Delegators, self.delegators, |keys| {
            keys.into_iter()
                .map(|key| catalog_key(Table::Delegators, &key).map(|_| ComponentRef::named(key)))
                .collect()
        })?;
        let aliases = convert(Table::Aliases, self.aliases, |target| {
            if target.is_empty() {
                Err("alias target must not be empty".to_string())
            } else {
                Ok(target)
            }
        })?;
        let shared = convert(Table::Shared, self.shared, Ok)?;

        tracing::debug!(
            "Loaded configuration document: {} services, {} factories, {} delegators, {} aliases",
            services.len(),
            factories.len(),
            delegators.len(),
            aliases.len()
        );

        Ok(ServiceConfig {
            services,
            factories,
            abstract_factories: self
                .abstract_factories
                .into_iter()
                .map(ComponentRef::named)
                .collect(),
            delegators,
            initializers: self.initializers.into_iter().map(ComponentRef::named).collect(),
            aliases,
            shared,
            shared_by_default: self.shared_by_default,
        })
    }
}

impl ServiceConfig {
    /// Parse a YAML document into a configuration record
    pub fn from_yaml(source: &str) -> Result<Self, ConfigurationError> {
        ConfigDocument::from_yaml(source)?.into_config()
    }

    /// Parse a JSON document into a configuration record
    pub fn from_json(source: &str) -> Result<Self, ConfigurationError> {
        ConfigDocument::from_json(source)?.into_config()
    }
}

fn catalog_key(table: Table, key: &str) -> Result<(), String> {
    if key.is_empty() {
        Err(format!("{table} entries must name a catalog component"))
    } else {
        Ok(())
    }
}

fn convert<S, T>(
    table: Table,
    entries: OrderedTable<DocumentEntry<S>>,
    mut map: impl FnMut(S) -> Result<T, String>,
) -> Result<Entries<T>, ConfigurationError> {
    entries
        .0
        .into_iter()
        .map(|(key, entry)| {
            if key.is_empty() {
                return Err(ConfigurationError::invalid_directive(
                    table.as_str(),
                    key,
                    "service name must not be empty",
                ));
            }
            let directive = match MergeDirective::from(entry) {
                MergeDirective::MergeInto(value) => map(value).map(MergeDirective::MergeInto),
                MergeDirective::Replace(value) => map(value).map(MergeDirective::Replace),
                MergeDirective::Remove => Ok(MergeDirective::Remove),
            };
            directive
                .map(|directive| (key.clone(), directive))
                .map_err(|message| ConfigurationError::invalid_directive(table.as_str(), key, message))
        })
        .collect()
}
