use std::collections::{BTreeSet, HashMap, HashSet};

use crate::config::merge::{self, MergeDirective};
use crate::config::service_config::Entries;
use crate::errors::ConfigurationError;

/// Path followed while walking an alias chain, used for cycle reporting
#[derive(Debug, Clone, Default)]
struct ResolutionPath {
    names: Vec<String>,
    positions: HashMap<String, usize>,
}

impl ResolutionPath {
    fn push(&mut self, name: &str) {
        self.positions.insert(name.to_string(), self.names.len());
        self.names.push(name.to_string());
    }

    /// The cycle closed by revisiting `name`, if it is already on the path
    fn cycle_at(&self, name: &str) -> Option<Vec<String>> {
        let start = *self.positions.get(name)?;
        let mut cycle = self.names[start..].to_vec();
        cycle.push(name.to_string());
        Some(cycle)
    }
}

/// Maps alias names to the canonical service names they forward to
#[derive(Debug, Clone, Default)]
pub struct AliasResolver {
    aliases: HashMap<String, String>,
}

impl AliasResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Follow the alias chain starting at `name` to its canonical name
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        let mut current = name;
        while let Some(target) = self.aliases.get(current) {
            current = target;
        }
        current
    }

    /// Check if `name` is a registered alias
    pub fn is_alias(&self, name: &str) -> bool {
        self.aliases.contains_key(name)
    }

    /// Number of registered aliases
    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// Apply alias directives, rejecting the whole batch if the result has a cycle
    pub fn merge(&mut self, entries: &Entries<String>) -> Result<(), ConfigurationError> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut staged = self.aliases.clone();
        merge::apply_all(&mut staged, entries.iter().cloned());

        let cycles = Self::detect_cycles(&staged, entries);
        if !cycles.is_empty() {
            return Err(ConfigurationError::CyclicAlias {
                cycles: cycles
                    .iter()
                    .map(|cycle| cycle.join(" -> "))
                    .collect::<Vec<_>>()
                    .join("\n"),
                aliases: Self::print_entries(entries),
            });
        }

        self.aliases = staged;
        Ok(())
    }

    /// Walk every alias chain, submitted aliases first, collecting distinct cycles
    fn detect_cycles(aliases: &HashMap<String, String>, submitted: &Entries<String>) -> Vec<Vec<String>> {
        let mut order: Vec<&str> = Vec::with_capacity(aliases.len());
        let mut queued = HashSet::new();
        for (name, _) in submitted {
            if aliases.contains_key(name) && queued.insert(name.as_str()) {
                order.push(name);
            }
        }
        let mut remaining: Vec<&str> = aliases
            .keys()
            .map(String::as_str)
            .filter(|name| !queued.contains(name))
            .collect();
        remaining.sort_unstable();
        order.extend(remaining);

        let mut cycles = Vec::new();
        let mut reported: HashSet<BTreeSet<String>> = HashSet::new();
        let mut acyclic: HashSet<&str> = HashSet::new();

        for start in order {
            let mut path = ResolutionPath::default();
            let mut current = start;
            loop {
                if acyclic.contains(current) {
                    break;
                }
                if let Some(cycle) = path.cycle_at(current) {
                    let members: BTreeSet<String> = cycle.iter().cloned().collect();
                    if reported.insert(members) {
                        cycles.push(cycle);
                    }
                    break;
                }
                path.push(current);
                match aliases.get(current) {
                    Some(target) => current = target,
                    None => {
                        for name in &path.names {
                            if let Some((key, _)) = aliases.get_key_value(name.as_str()) {
                                acyclic.insert(key.as_str());
                            }
                        }
                        break;
                    }
                }
            }
        }

        cycles
    }

    fn print_entries(entries: &Entries<String>) -> String {
        entries
            .iter()
            .map(|(alias, directive)| match directive {
                MergeDirective::MergeInto(target) | MergeDirective::Replace(target) => {
                    format!("\"{}\" => \"{}\"", alias, target)
                }
                MergeDirective::Remove => format!("\"{}\" => <removed>", alias),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(pairs: &[(&str, &str)]) -> Entries<String> {
        pairs
            .iter()
            .map(|(alias, target)| (alias.to_string(), MergeDirective::MergeInto(target.to_string())))
            .collect()
    }

    #[test]
    fn test_resolves_chains() {
        let mut resolver = AliasResolver::new();
        resolver
            .merge(&entries(&[("a", "b"), ("b", "c"), ("x", "c")]))
            .unwrap();

        assert_eq!(resolver.resolve("a"), "c");
        assert_eq!(resolver.resolve("b"), "c");
        assert_eq!(resolver.resolve("c"), "c");
        assert_eq!(resolver.resolve("unknown"), "unknown");
        assert!(resolver.is_alias("x"));
        assert!(!resolver.is_alias("c"));
    }

    #[test]
    fn test_two_node_cycle_reports_trace() {
        let mut resolver = AliasResolver::new();
        let error = resolver.merge(&entries(&[("b", "a"), ("a", "b")])).unwrap_err();

        assert!(error.is_cyclic_alias());
        let message = error.to_string();
        assert!(message.contains("b -> a -> b"), "{message}");
        assert!(message.contains("\"b\" => \"a\""));
        assert!(message.contains("\"a\" => \"b\""));
        assert!(!message.contains("a -> b -> a"));
        assert!(resolver.is_empty());
    }

    #[test]
    fn test_self_alias_is_a_cycle() {
        let mut resolver = AliasResolver::new();
        let error = resolver.merge(&entries(&[("loop", "loop")])).unwrap_err();
        assert!(error.to_string().contains("loop -> loop"));
    }

    #[test]
    fn test_cycle_closed_by_later_merge_is_rejected_atomically() {
        let mut resolver = AliasResolver::new();
        resolver.merge(&entries(&[("a", "b"), ("b", "c")])).unwrap();

        let error = resolver
            .merge(&entries(&[("z", "a"), ("c", "a")]))
            .unwrap_err();
        assert!(error.to_string().contains("a -> b -> c -> a"));

        assert_eq!(resolver.len(), 2);
        assert!(!resolver.is_alias("z"));
        assert_eq!(resolver.resolve("a"), "c");
    }

    #[test]
    fn test_remove_directive_breaks_chain() {
        let mut resolver = AliasResolver::new();
        resolver.merge(&entries(&[("a", "b"), ("b", "c")])).unwrap();
        resolver
            .merge(&vec![("b".to_string(), MergeDirective::Remove)])
            .unwrap();

        assert_eq!(resolver.resolve("a"), "b");
    }

    #[test]
    fn test_distinct_cycles_are_all_reported() {
        let mut resolver = AliasResolver::new();
        let error = resolver
            .merge(&entries(&[("a", "b"), ("b", "a"), ("x", "y"), ("y", "x")]))
            .unwrap_err();
        let message = error.to_string();

        assert!(message.contains("a -> b -> a"));
        assert!(message.contains("x -> y -> x"));
    }
}
