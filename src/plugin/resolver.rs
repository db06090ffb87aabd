//! Concurrent plugin resolution.
//!
//! Each declared entry is looked up against the registry concurrently; a
//! failed lookup or loader error drops that entry with a diagnostic and
//! never aborts sibling entries or the document. The resolved list is sorted
//! by name so a fixed input set always yields the same output set.

use crate::diagnostics::{Diagnostics, ReasonCode, Stage};
use crate::plugin::registry::{PluginCapabilities, PluginRegistry};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A plugin whose registry lookup succeeded, with capabilities attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPlugin {
    pub name: String,
    pub capabilities: PluginCapabilities,
}

/// One declared plugin entry after shape detection.
#[derive(Debug, Clone, PartialEq)]
struct PluginEntry {
    name: String,
    config: Option<Value>,
}

/// Parse raw entries into named entries, collapsing duplicate names.
///
/// Entries are bare name strings or objects carrying `name` plus optional
/// inline config. Duplicates resolve once, keeping the last-seen config.
fn parse_entries(raw: &[Value], diags: &mut Diagnostics) -> Vec<PluginEntry> {
    let mut entries: Vec<PluginEntry> = Vec::new();
    for item in raw {
        let parsed = match item {
            Value::String(name) if !name.trim().is_empty() => Some(PluginEntry {
                name: name.clone(),
                config: None,
            }),
            Value::Object(obj) => obj
                .get("name")
                .and_then(Value::as_str)
                .filter(|name| !name.trim().is_empty())
                .map(|name| PluginEntry {
                    name: name.to_string(),
                    config: obj.get("config").cloned(),
                }),
            _ => None,
        };

        match parsed {
            Some(entry) => {
                if let Some(existing) = entries.iter_mut().find(|e| e.name == entry.name) {
                    existing.config = entry.config;
                } else {
                    entries.push(entry);
                }
            }
            None => diags.warn(
                Stage::Plugins,
                ReasonCode::UnresolvedPlugin,
                format!("plugin entry has no usable name: {}", item),
            ),
        }
    }
    entries
}

/// Resolve declared plugin entries against the registry.
pub async fn resolve(
    registry: &PluginRegistry,
    raw_entries: &[Value],
    diags: &mut Diagnostics,
) -> Vec<ResolvedPlugin> {
    let entries = parse_entries(raw_entries, diags);

    let lookups = entries.into_iter().map(|entry| async move {
        match registry.lookup(&entry.name) {
            None => Err((entry.name, "unknown plugin name".to_string())),
            Some(loader) => match loader.load(entry.config.as_ref()).await {
                Ok(capabilities) => Ok(ResolvedPlugin {
                    name: entry.name,
                    capabilities,
                }),
                Err(e) => Err((entry.name, e.to_string())),
            },
        }
    });

    let mut resolved: Vec<ResolvedPlugin> = Vec::new();
    for outcome in join_all(lookups).await {
        match outcome {
            Ok(plugin) => resolved.push(plugin),
            Err((name, reason)) => diags.warn(
                Stage::Plugins,
                ReasonCode::UnresolvedPlugin,
                format!("plugin '{}' dropped: {}", name, reason),
            ),
        }
    }

    resolved.sort_by(|a, b| a.name.cmp(&b.name));
    resolved
}
