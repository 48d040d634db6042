//! Options consumed by the extraction engine.
//!
//! The engine itself only sees an [`ExtractConfig`]; loading it from a YAML
//! or JSON file is a convenience for the command-line tool.

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ExtractConfig {
    /// Bare output types are nullable unless explicitly marked otherwise.
    pub nullable_by_default: bool,
    /// Mark fields that are only nullable because of `nullable_by_default`
    /// as semantically non-null.
    pub strict_semantic_nullability: bool,
    /// Require a discriminant on interface implementors as well as on union members.
    pub strict_discriminants: bool,
    /// Parameter type names identifying the field-metadata value.
    pub info_type_names: Vec<String>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            nullable_by_default: false,
            strict_semantic_nullability: false,
            strict_discriminants: true,
            info_type_names: vec!["ResolveInfo".to_string(), "GraphQLResolveInfo".to_string()],
        }
    }
}

impl ExtractConfig {
    /// Loads a configuration file; `.json` files are read as JSON, anything else as YAML.
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON config: {}", path.display()))?
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Invalid YAML config: {}", path.display()))?
        };

        debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    pub fn is_info_type(&self, name: &str) -> bool {
        self.info_type_names.iter().any(|candidate| candidate == name)
    }
}
