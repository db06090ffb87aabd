//! Secret requirement auditing.
//!
//! A requirement table maps plugin names to the secret keys they need at
//! runtime. The audit only checks key presence among the document's declared
//! dynamic secrets; values stay encrypted and untouched. Findings are
//! advisory: they never remove a plugin or fail resolution, they exist so
//! operators can spot agents that will be dead on a channel.

use crate::diagnostics::{Diagnostics, ReasonCode, Stage};
use crate::plugin::resolver::ResolvedPlugin;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One advisory finding: a resolved plugin requires a key the document does
/// not declare.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingSecretWarning {
    pub plugin: String,
    pub key: String,
}

/// Plugin name → required secret keys.
#[derive(Debug, Clone)]
pub struct SecretRequirements {
    table: HashMap<String, Vec<String>>,
}

impl SecretRequirements {
    /// Empty table; nothing gets audited.
    pub fn empty() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    /// Add or replace the requirement list for a plugin name.
    pub fn with_requirement(
        mut self,
        plugin: impl Into<String>,
        keys: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.table
            .insert(plugin.into(), keys.into_iter().map(Into::into).collect());
        self
    }

    /// Required keys for a plugin; `None` when the plugin has no entry.
    pub fn required_for(&self, plugin: &str) -> Option<&[String]> {
        self.table.get(plugin).map(Vec::as_slice)
    }

    /// Audit resolved plugins against the declared secret keys.
    ///
    /// One warning per absent key; plugins without a table entry produce
    /// nothing.
    pub fn audit(
        &self,
        resolved: &[ResolvedPlugin],
        declared_keys: &HashSet<String>,
        diags: &mut Diagnostics,
    ) -> Vec<MissingSecretWarning> {
        let mut warnings = Vec::new();
        for plugin in resolved {
            let Some(required) = self.required_for(&plugin.name) else {
                continue;
            };
            for key in required {
                if !declared_keys.contains(key) {
                    diags.warn(
                        Stage::Secrets,
                        ReasonCode::MissingSecret,
                        format!("plugin '{}' requires undeclared secret '{}'", plugin.name, key),
                    );
                    warnings.push(MissingSecretWarning {
                        plugin: plugin.name.clone(),
                        key: key.clone(),
                    });
                }
            }
        }
        warnings
    }
}

impl Default for SecretRequirements {
    /// Built-in table for the channel plugins shipped with the runtime.
    fn default() -> Self {
        Self::empty()
            .with_requirement("telegram", ["TELEGRAM_BOT_TOKEN"])
            .with_requirement("discord", ["DISCORD_API_TOKEN", "DISCORD_APPLICATION_ID"])
            .with_requirement(
                "email",
                ["EMAIL_OUTGOING_USER", "EMAIL_OUTGOING_PASS", "EMAIL_OUTGOING_SERVICE"],
            )
            .with_requirement("twitter", ["TWITTER_USERNAME", "TWITTER_PASSWORD"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::registry::PluginCapabilities;

    fn plugin(name: &str) -> ResolvedPlugin {
        ResolvedPlugin {
            name: name.to_string(),
            capabilities: PluginCapabilities::default(),
        }
    }

    #[test]
    fn test_absent_keys_warn_one_each() {
        let table = SecretRequirements::empty()
            .with_requirement("messaging", ["BOT_TOKEN", "API_SECRET"]);
        let declared: HashSet<String> = ["API_SECRET".to_string()].into();
        let mut diags = Diagnostics::new("doc");

        let warnings = table.audit(&[plugin("messaging")], &declared, &mut diags);

        assert_eq!(
            warnings,
            vec![MissingSecretWarning {
                plugin: "messaging".to_string(),
                key: "BOT_TOKEN".to_string()
            }]
        );
        assert_eq!(diags.count_of(ReasonCode::MissingSecret), 1);
    }

    #[test]
    fn test_plugin_without_table_entry_is_silent() {
        let table = SecretRequirements::empty();
        let mut diags = Diagnostics::new("doc");
        let warnings = table.audit(&[plugin("weather")], &HashSet::new(), &mut diags);

        assert!(warnings.is_empty());
        assert!(diags.is_empty());
    }

    #[test]
    fn test_declared_keys_satisfy_requirements() {
        let table = SecretRequirements::default();
        let declared: HashSet<String> = ["TELEGRAM_BOT_TOKEN".to_string()].into();
        let mut diags = Diagnostics::new("doc");

        let warnings = table.audit(&[plugin("telegram")], &declared, &mut diags);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_default_table_covers_channel_plugins() {
        let table = SecretRequirements::default();
        assert!(table.required_for("telegram").is_some());
        assert!(table.required_for("discord").is_some());
        assert!(table.required_for("email").is_some());
        assert!(table.required_for("weather").is_none());
    }
}
