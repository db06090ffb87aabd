//! Plugin registry and capability loader port.
//!
//! The registry is populated at process startup with a loader per known
//! plugin name. Loaders are late-bound and may fail on load (missing
//! downstream dependency, load error); those failures are absorbed per entry
//! by the resolver, never here.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Opaque capability bag a loader attaches to a resolved plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginCapabilities {
    #[serde(default)]
    pub clients: Vec<String>,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub services: Vec<String>,
}

/// Loader-side failure, caught at the resolution boundary.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("Plugin load failed: {0}")]
    LoadFailed(String),

    #[error("Missing downstream dependency: {0}")]
    MissingDependency(String),
}

/// Capability loader for one plugin name.
#[async_trait]
pub trait PluginLoader: Send + Sync {
    /// Load the plugin's capabilities, optionally specialized by the
    /// document's inline config.
    async fn load(&self, config: Option<&Value>) -> Result<PluginCapabilities, LoaderError>;
}

/// Registry of known plugin loaders keyed by name.
#[derive(Default)]
pub struct PluginRegistry {
    loaders: HashMap<String, Arc<dyn PluginLoader>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a loader for a plugin name, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, loader: Arc<dyn PluginLoader>) {
        self.loaders.insert(name.into(), loader);
    }

    /// Look up the loader for a name; `None` means the name is unknown.
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn PluginLoader>> {
        self.loaders.get(name).cloned()
    }

    /// Registered plugin names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.loaders.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }
}

/// Loader that always yields a fixed capability bag.
///
/// Used to populate the registry at startup from configuration and to
/// substitute fakes in tests, so resolution is testable without real module
/// loading.
pub struct StaticPluginLoader {
    capabilities: PluginCapabilities,
}

impl StaticPluginLoader {
    pub fn new(capabilities: PluginCapabilities) -> Self {
        Self { capabilities }
    }

    pub fn empty() -> Self {
        Self::new(PluginCapabilities::default())
    }
}

#[async_trait]
impl PluginLoader for StaticPluginLoader {
    async fn load(&self, _config: Option<&Value>) -> Result<PluginCapabilities, LoaderError> {
        Ok(self.capabilities.clone())
    }
}
