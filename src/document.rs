//! Raw character document model.
//!
//! Documents are user-authored through a CMS, so every field is parsed
//! permissively: lists default to empty, shape-ambiguous fields stay as raw
//! JSON until the owning stage parses them with an explicit shape predicate.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Model provider an agent is pinned to. Unknown values fall back to the
/// default with a diagnostic; the field gates nothing in this subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModelProvider {
    #[default]
    #[serde(alias = "openai")]
    OpenAi,
    Anthropic,
    #[serde(alias = "llama-local")]
    LlamaLocal,
    Ollama,
}

impl ModelProvider {
    /// Parse a stored provider string, `None` when the value is unknown.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "openai" | "open_ai" => Some(ModelProvider::OpenAi),
            "anthropic" => Some(ModelProvider::Anthropic),
            "llama_local" | "llama-local" => Some(ModelProvider::LlamaLocal),
            "ollama" => Some(ModelProvider::Ollama),
            _ => None,
        }
    }
}

/// Style guidance lists carried through to the runtime untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Style {
    #[serde(default)]
    pub all: Vec<String>,
    #[serde(default)]
    pub chat: Vec<String>,
    #[serde(default)]
    pub post: Vec<String>,
}

/// Encrypted payload of a dynamic secret. Opaque here: this subsystem only
/// ever looks at key presence, never at the material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedValue {
    pub iv: String,
    pub ciphertext: String,
}

/// One declared dynamic secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicSecret {
    pub key: String,
    #[serde(default)]
    pub encrypted_value: Option<EncryptedValue>,
    #[serde(default)]
    pub hash: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Secrets {
    #[serde(default)]
    pub dynamic: Vec<DynamicSecret>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub secrets: Secrets,
    #[serde(default)]
    pub voice: Option<Value>,
    #[serde(default)]
    pub rag_knowledge: bool,
    #[serde(default)]
    pub email: Option<Value>,
}

/// Resolved owning account reference. Both identifiers are required; a
/// document whose owner cannot produce both is unassignable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerRef {
    pub account_id: String,
    pub external_auth_id: String,
}

/// A raw character document as stored by the content store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCharacterDocument {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default)]
    pub bio: Vec<String>,
    #[serde(default)]
    pub lore: Vec<String>,
    #[serde(default)]
    pub post_examples: Vec<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub adjectives: Vec<String>,
    /// Shape-ambiguous, parsed by the message-example normalizer.
    #[serde(default)]
    pub message_examples: Value,
    #[serde(default)]
    pub style: Style,
    #[serde(default)]
    pub model_provider: Option<String>,
    /// Bare name strings or `{name, config}` objects; parsed by the resolver.
    #[serde(default)]
    pub plugins: Vec<Value>,
    #[serde(default)]
    pub settings: Settings,
    /// Reference or directory items; parsed by the knowledge merger.
    #[serde(default)]
    pub knowledge: Vec<Value>,
    #[serde(default)]
    pub created_by: Option<Value>,
}

impl RawCharacterDocument {
    /// Resolve `createdBy` into an owner reference.
    ///
    /// The CMS stores owners either as an expanded account object or as a
    /// relationship wrapper around one. Both an account id and an
    /// external-auth identifier must be present; anything less is
    /// unresolvable and the document gets discarded upstream.
    pub fn resolve_owner(&self) -> Option<OwnerRef> {
        let raw = self.created_by.as_ref()?;
        // Relationship wrappers nest the account under "value".
        let account = match raw.get("value") {
            Some(inner) if inner.is_object() => inner,
            _ => raw,
        };
        let account_id = non_empty_str(account.get("id"))?;
        let external_auth_id = non_empty_str(account.get("externalAuthId"))
            .or_else(|| non_empty_str(account.get("sub")))?;
        Some(OwnerRef {
            account_id,
            external_auth_id,
        })
    }

    /// Declared dynamic secret keys, for the secret requirement audit.
    pub fn declared_secret_keys(&self) -> std::collections::HashSet<String> {
        self.settings
            .secrets
            .dynamic
            .iter()
            .map(|s| s.key.clone())
            .collect()
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    match value.and_then(Value::as_str) {
        Some(s) if !s.trim().is_empty() => Some(s.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_loose_document_parses_with_defaults() {
        let doc: RawCharacterDocument = serde_json::from_value(json!({
            "name": "Nova"
        }))
        .unwrap();

        assert_eq!(doc.name, "Nova");
        assert!(doc.id.is_none());
        assert!(doc.bio.is_empty());
        assert!(doc.plugins.is_empty());
        assert!(doc.settings.secrets.dynamic.is_empty());
        assert!(!doc.settings.rag_knowledge);
    }

    #[test]
    fn test_owner_resolution_from_expanded_account() {
        let doc: RawCharacterDocument = serde_json::from_value(json!({
            "name": "Nova",
            "createdBy": { "id": "acct-1", "externalAuthId": "auth0|abc" }
        }))
        .unwrap();

        let owner = doc.resolve_owner().unwrap();
        assert_eq!(owner.account_id, "acct-1");
        assert_eq!(owner.external_auth_id, "auth0|abc");
    }

    #[test]
    fn test_owner_resolution_from_relationship_wrapper() {
        let doc: RawCharacterDocument = serde_json::from_value(json!({
            "name": "Nova",
            "createdBy": {
                "relationTo": "accounts",
                "value": { "id": "acct-2", "sub": "google|xyz" }
            }
        }))
        .unwrap();

        let owner = doc.resolve_owner().unwrap();
        assert_eq!(owner.account_id, "acct-2");
        assert_eq!(owner.external_auth_id, "google|xyz");
    }

    #[test]
    fn test_owner_missing_external_auth_is_unresolvable() {
        let doc: RawCharacterDocument = serde_json::from_value(json!({
            "name": "Nova",
            "createdBy": { "id": "acct-3" }
        }))
        .unwrap();

        assert!(doc.resolve_owner().is_none());
    }

    #[test]
    fn test_owner_bare_string_is_unresolvable() {
        let doc: RawCharacterDocument = serde_json::from_value(json!({
            "name": "Nova",
            "createdBy": "acct-4"
        }))
        .unwrap();

        assert!(doc.resolve_owner().is_none());
    }

    #[test]
    fn test_declared_secret_keys() {
        let doc: RawCharacterDocument = serde_json::from_value(json!({
            "name": "Nova",
            "settings": {
                "secrets": {
                    "dynamic": [
                        { "key": "BOT_TOKEN", "hash": "abc" },
                        { "key": "SMTP_PASS",
                          "encryptedValue": { "iv": "00", "ciphertext": "ff" } }
                    ]
                }
            }
        }))
        .unwrap();

        let keys = doc.declared_secret_keys();
        assert!(keys.contains("BOT_TOKEN"));
        assert!(keys.contains("SMTP_PASS"));
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn test_model_provider_parse() {
        assert_eq!(ModelProvider::parse("anthropic"), Some(ModelProvider::Anthropic));
        assert_eq!(ModelProvider::parse("llama-local"), Some(ModelProvider::LlamaLocal));
        assert_eq!(ModelProvider::parse("bard"), None);
    }
}
