//! Merge directives applied when configuration is layered onto a container

use std::collections::HashMap;

use serde_json::Value;

use crate::container::catalog::ComponentRef;
use crate::container::instance::Instance;

/// What an incoming configuration entry does to the existing one
#[derive(Debug, Clone, PartialEq)]
pub enum MergeDirective<T> {
    /// Merge into the existing value (scalars override, lists append,
    /// nested maps merge key-for-key)
    MergeInto(T),
    /// Replace the existing value wholesale
    Replace(T),
    /// Delete the existing key
    Remove,
}

impl<T> MergeDirective<T> {
    /// Check if the directive removes its key
    pub fn is_remove(&self) -> bool {
        matches!(self, MergeDirective::Remove)
    }

    /// Borrow the carried value, if any
    pub fn value(&self) -> Option<&T> {
        match self {
            MergeDirective::MergeInto(value) | MergeDirective::Replace(value) => Some(value),
            MergeDirective::Remove => None,
        }
    }
}

/// Values that know how to absorb an incoming value of the same kind
pub trait Merge {
    fn merge(&mut self, incoming: Self);
}

impl<T> Merge for Vec<T> {
    fn merge(&mut self, incoming: Self) {
        self.extend(incoming);
    }
}

impl Merge for String {
    fn merge(&mut self, incoming: Self) {
        *self = incoming;
    }
}

impl Merge for bool {
    fn merge(&mut self, incoming: Self) {
        *self = incoming;
    }
}

impl Merge for Value {
    fn merge(&mut self, incoming: Self) {
        match (self, incoming) {
            (Value::Object(base), Value::Object(incoming)) => {
                for (key, value) in incoming {
                    match base.get_mut(&key) {
                        Some(existing) => existing.merge(value),
                        None => {
                            base.insert(key, value);
                        }
                    }
                }
            }
            (Value::Array(base), Value::Array(incoming)) => base.extend(incoming),
            (slot, incoming) => *slot = incoming,
        }
    }
}

impl<T: ?Sized> Merge for ComponentRef<T> {
    fn merge(&mut self, incoming: Self) {
        *self = incoming;
    }
}

/// JSON document services (such as `"config"`) are deep-merged; any other
/// instance is overridden.
impl Merge for Instance {
    fn merge(&mut self, incoming: Self) {
        let merged = match (self.downcast_ref::<Value>(), incoming.downcast_ref::<Value>()) {
            (Some(base), Some(patch)) => {
                let mut merged = base.clone();
                merged.merge(patch.clone());
                Some(merged)
            }
            _ => None,
        };
        *self = match merged {
            Some(value) => Instance::new(value),
            None => incoming,
        };
    }
}

/// Apply one directive to a keyed table
pub fn apply<V: Merge>(table: &mut HashMap<String, V>, key: String, directive: MergeDirective<V>) {
    match directive {
        MergeDirective::Remove => {
            table.remove(&key);
        }
        MergeDirective::Replace(value) => {
            table.insert(key, value);
        }
        MergeDirective::MergeInto(value) => match table.get_mut(&key) {
            Some(existing) => existing.merge(value),
            None => {
                table.insert(key, value);
            }
        },
    }
}

/// Apply a list of directives to a keyed table, in order
pub fn apply_all<V: Merge>(
    table: &mut HashMap<String, V>,
    entries: impl IntoIterator<Item = (String, MergeDirective<V>)>,
) {
    for (key, directive) in entries {
        apply(table, key, directive);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_merge_is_recursive() {
        let mut base = json!({
            "db": { "host": "localhost", "port": 5432 },
            "modules": ["core"],
        });
        base.merge(json!({
            "db": { "host": "db.internal" },
            "modules": ["auth"],
            "debug": true,
        }));

        assert_eq!(
            base,
            json!({
                "db": { "host": "db.internal", "port": 5432 },
                "modules": ["core", "auth"],
                "debug": true,
            })
        );
    }

    #[test]
    fn test_value_merge_scalar_overrides_structure() {
        let mut base = json!({ "cache": { "ttl": 60 } });
        base.merge(json!({ "cache": false }));
        assert_eq!(base, json!({ "cache": false }));
    }

    #[test]
    fn test_directives_on_table() {
        let mut table: HashMap<String, Vec<&str>> = HashMap::new();
        table.insert("mailer".to_string(), vec!["logging"]);
        table.insert("cache".to_string(), vec!["metrics"]);

        apply_all(
            &mut table,
            vec![
                ("mailer".to_string(), MergeDirective::MergeInto(vec!["retry"])),
                ("cache".to_string(), MergeDirective::Remove),
                ("queue".to_string(), MergeDirective::Replace(vec!["tracing"])),
            ],
        );

        assert_eq!(table["mailer"], vec!["logging", "retry"]);
        assert!(!table.contains_key("cache"));
        assert_eq!(table["queue"], vec!["tracing"]);

        apply(&mut table, "mailer".to_string(), MergeDirective::Replace(vec!["audit"]));
        assert_eq!(table["mailer"], vec!["audit"]);
    }

    #[test]
    fn test_json_instances_deep_merge() {
        let mut config = Instance::new(json!({ "db": { "host": "localhost" } }));
        config.merge(Instance::new(json!({ "db": { "port": 5432 } })));

        assert_eq!(
            config.downcast_ref::<Value>().unwrap(),
            &json!({ "db": { "host": "localhost", "port": 5432 } })
        );

        config.merge(Instance::new(7_u8));
        assert!(config.is::<u8>());
    }

    #[test]
    fn test_directive_accessors() {
        let directive = MergeDirective::Replace(true);
        assert_eq!(directive.value(), Some(&true));
        assert!(MergeDirective::<bool>::Remove.is_remove());
    }
}
