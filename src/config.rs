//! Pipeline configuration.
//!
//! Loaded from a toml file (path via `CHARTER_CONFIG` or passed explicitly);
//! every field has a default so a missing or partial file still yields a
//! working pipeline.

use crate::error::ResolveError;
use crate::logging::LoggingConfig;
use crate::plugin::{PluginRegistry, SecretRequirements, StaticPluginLoader};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Plugin names the registry is populated with at startup.
    #[serde(default = "default_plugins")]
    pub plugins: Vec<String>,

    /// Additions or overrides to the built-in secret requirement table,
    /// plugin name → required keys.
    #[serde(default)]
    pub secret_requirements: HashMap<String, Vec<String>>,
}

fn default_plugins() -> Vec<String> {
    vec![
        "telegram".to_string(),
        "discord".to_string(),
        "email".to_string(),
        "twitter".to_string(),
    ]
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            plugins: default_plugins(),
            secret_requirements: HashMap::new(),
        }
    }
}

impl PipelineConfig {
    /// Parse a config file.
    pub fn load(path: &Path) -> Result<Self, ResolveError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ResolveError::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            ResolveError::Config(format!("Failed to parse config {}: {}", path.display(), e))
        })
    }

    /// Load from `CHARTER_CONFIG` when set, defaults otherwise.
    pub fn load_default() -> Result<Self, ResolveError> {
        match std::env::var("CHARTER_CONFIG") {
            Ok(path) if !path.is_empty() => Self::load(Path::new(&path)),
            _ => Ok(Self::default()),
        }
    }

    /// Secret requirement table: built-in entries plus config overrides.
    pub fn secret_requirements(&self) -> SecretRequirements {
        let mut table = SecretRequirements::default();
        for (plugin, keys) in &self.secret_requirements {
            table = table.with_requirement(plugin.clone(), keys.iter().cloned());
        }
        table
    }

    /// Registry with an empty-capability loader per configured plugin name.
    pub fn build_registry(&self) -> PluginRegistry {
        let mut registry = PluginRegistry::new();
        for name in &self.plugins {
            registry.register(name.clone(), Arc::new(StaticPluginLoader::empty()));
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_include_channel_plugins() {
        let config = PipelineConfig::default();
        assert!(config.plugins.contains(&"telegram".to_string()));
        assert!(config.secret_requirements.is_empty());

        let registry = config.build_registry();
        assert_eq!(registry.len(), config.plugins.len());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "plugins = [\"telegram\"]").unwrap();
        writeln!(file, "[logging]").unwrap();
        writeln!(file, "level = \"debug\"").unwrap();

        let config = PipelineConfig::load(file.path()).unwrap();
        assert_eq!(config.plugins, vec!["telegram".to_string()]);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "text");
    }

    #[test]
    fn test_secret_requirement_overrides_extend_builtin_table() {
        let mut config = PipelineConfig::default();
        config
            .secret_requirements
            .insert("messaging".to_string(), vec!["BOT_TOKEN".to_string()]);

        let table = config.secret_requirements();
        assert_eq!(
            table.required_for("messaging"),
            Some(["BOT_TOKEN".to_string()].as_slice())
        );
        // Built-ins survive.
        assert!(table.required_for("telegram").is_some());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(PipelineConfig::load(Path::new("/nonexistent/charter.toml")).is_err());
    }
}
