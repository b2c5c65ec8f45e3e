//! Registry mapping process names (current and deprecated) to definitions.
//!
//! Aliases resolve to the *same* definition object as the current name, so
//! callers may compare definitions by address.

use std::collections::BTreeMap;

use crate::definition::ProcessDefinition;
use crate::error::DefinitionError;
use crate::processes::{booking, inquiry, purchase};

/// Deprecated names still carried by older transactions.
pub const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("flex-default-process", booking::NAME),
    ("flex-hourly-default-process", booking::NAME),
    ("flex-product-default-process", purchase::NAME),
    ("flex-inquiry-process", inquiry::NAME),
];

#[derive(Debug, Clone, Default)]
pub struct ProcessRegistry {
    processes: BTreeMap<String, ProcessDefinition>,
    aliases: BTreeMap<String, String>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The three built-in processes and their deprecated aliases, validated.
    pub fn builtin() -> Result<Self, DefinitionError> {
        let mut registry = Self::new();
        registry.register(inquiry::definition()?)?;
        registry.register(booking::definition()?)?;
        registry.register(purchase::definition()?)?;
        for (alias, current) in BUILTIN_ALIASES {
            registry.alias(alias, current)?;
        }
        tracing::debug!(
            processes = registry.processes.len(),
            aliases = registry.aliases.len(),
            "built process registry"
        );
        Ok(registry)
    }

    /// Validate and register a definition under its own name.
    pub fn register(&mut self, definition: ProcessDefinition) -> Result<(), DefinitionError> {
        definition.validate()?;
        if self.processes.contains_key(&definition.name) || self.aliases.contains_key(&definition.name)
        {
            return Err(DefinitionError::DuplicateProcess {
                name: definition.name,
            });
        }
        self.processes.insert(definition.name.clone(), definition);
        Ok(())
    }

    /// Map `old` to the registered process `current`. `current` may itself be
    /// an alias; the mapping is stored against the process it resolves to.
    pub fn alias(&mut self, old: &str, current: &str) -> Result<(), DefinitionError> {
        if self.processes.contains_key(old) {
            return Err(DefinitionError::AliasShadowsProcess {
                alias: old.to_string(),
            });
        }
        let target = self
            .resolve_name(current)
            .ok_or_else(|| DefinitionError::UnknownAliasTarget {
                alias: old.to_string(),
                target: current.to_string(),
            })?
            .to_string();
        self.aliases.insert(old.to_string(), target);
        Ok(())
    }

    /// Canonical registered name for `name`, following aliases. A version
    /// suffix (`name/release-1`) is ignored.
    pub fn resolve_name(&self, name: &str) -> Option<&str> {
        let base = base_name(name);
        if let Some((key, _)) = self.processes.get_key_value(base) {
            return Some(key.as_str());
        }
        self.aliases.get(base).map(|target| target.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&ProcessDefinition> {
        let canonical = self.resolve_name(name)?;
        self.processes.get(canonical)
    }

    /// Registered process names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.processes.keys().map(|k| k.as_str())
    }

    /// `(alias, current)` pairs, sorted by alias.
    pub fn aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().map(|(a, c)| (a.as_str(), c.as_str()))
    }

    pub fn definitions(&self) -> impl Iterator<Item = &ProcessDefinition> {
        self.processes.values()
    }

    /// Check that every `(process, transition)` the client issues exists.
    pub fn validate_issued(&self, issued: &[(&str, &str)]) -> Result<(), DefinitionError> {
        for (process, transition) in issued {
            let definition =
                self.get(process)
                    .ok_or_else(|| DefinitionError::UnknownIssuedProcess {
                        process: process.to_string(),
                    })?;
            definition.transition(transition)?;
        }
        Ok(())
    }
}

/// Strip a version suffix: everything from the first `/`.
pub fn base_name(name: &str) -> &str {
    name.split_once('/').map_or(name, |(base, _)| base)
}
