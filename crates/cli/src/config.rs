//! `bazaar.toml`: per-app configuration.
//!
//! # Example
//!
//! ```toml
//! [fields]
//! listing = ["title", "description", "price", "publicData"]
//! user = ["profile"]
//!
//! [processes.aliases]
//! "legacy-booking-process" = "default-booking"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use bazaar_process::{DefinitionError, ProcessRegistry};
use bazaar_store::FieldAllowList;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Config {
    /// Attribute allow-lists keyed by resource type.
    #[serde(default)]
    pub fields: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub processes: ProcessesConfig,
}

/// `[processes]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ProcessesConfig {
    /// Extra deprecated-name mappings on top of the built-in ones.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

impl Config {
    /// Read and parse a config file. Returns a human-readable error on failure.
    pub(crate) fn load(path: &Path) -> Result<Config, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("could not read '{}': {}", path.display(), e))?;
        toml::from_str(&content).map_err(|e| format!("could not parse '{}': {}", path.display(), e))
    }

    /// `None` when no type is filtered.
    pub(crate) fn allow_list(&self) -> Option<FieldAllowList> {
        (!self.fields.is_empty()).then(|| FieldAllowList::from_config(&self.fields))
    }

    pub(crate) fn registry(&self) -> Result<ProcessRegistry, DefinitionError> {
        let mut registry = ProcessRegistry::builtin()?;
        for (alias, current) in &self.processes.aliases {
            registry.alias(alias, current)?;
        }
        Ok(registry)
    }
}
