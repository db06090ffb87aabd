//! Knowledge list expansion and merging.
//!
//! A character declares knowledge as direct document references and directory
//! pointers. Two implicit directories are always appended: the shared pool
//! and an agent-private directory named after the agent. The merged list is
//! deduplicated by directory path with declared entries winning over
//! defaults; references are never deduplicated against directories.

use crate::diagnostics::{Diagnostics, ReasonCode, Stage};
use crate::types::SHARED_KNOWLEDGE_PATH;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Normalized knowledge entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KnowledgeEntry {
    /// Direct reference to a single knowledge document.
    Reference {
        #[serde(rename = "ref")]
        reference: String,
    },
    /// Pointer to a named pool of knowledge documents.
    Directory { path: String, shared: bool },
}

/// Parse one declared knowledge item into its tagged variant.
///
/// Accepts bare strings and `{ref}`/`{knowledge}` objects as references, and
/// `{directory, shared}` or already-normalized `{path, shared}` objects as
/// directories. `None` means the item is malformed.
fn parse_item(raw: &Value) -> Option<KnowledgeEntry> {
    if let Some(reference) = raw.as_str() {
        if !reference.trim().is_empty() {
            return Some(KnowledgeEntry::Reference {
                reference: reference.to_string(),
            });
        }
        return None;
    }

    let obj = raw.as_object()?;
    for key in ["ref", "knowledge"] {
        if let Some(reference) = obj.get(key).and_then(Value::as_str) {
            if !reference.trim().is_empty() {
                return Some(KnowledgeEntry::Reference {
                    reference: reference.to_string(),
                });
            }
        }
    }

    let path = obj
        .get("directory")
        .or_else(|| obj.get("path"))
        .and_then(Value::as_str)?;
    if path.trim().is_empty() {
        return None;
    }
    Some(KnowledgeEntry::Directory {
        path: path.to_string(),
        shared: obj.get("shared").and_then(Value::as_bool).unwrap_or(false),
    })
}

/// Expand and merge a character's declared knowledge list.
pub fn merge(declared: &[Value], agent_name: &str, diags: &mut Diagnostics) -> Vec<KnowledgeEntry> {
    let mut entries: Vec<KnowledgeEntry> = Vec::with_capacity(declared.len() + 2);
    for raw in declared {
        match parse_item(raw) {
            Some(entry) => entries.push(entry),
            None => diags.warn(
                Stage::Knowledge,
                ReasonCode::MalformedDirectoryItem,
                format!("knowledge item missing a usable directory or reference: {}", raw),
            ),
        }
    }

    // Implicit defaults come last so declared directories win the dedup.
    entries.push(KnowledgeEntry::Directory {
        path: SHARED_KNOWLEDGE_PATH.to_string(),
        shared: true,
    });
    entries.push(KnowledgeEntry::Directory {
        path: agent_name.to_lowercase(),
        shared: false,
    });

    dedup_directories(entries)
}

/// Keep the first directory entry per path; references pass through.
fn dedup_directories(entries: Vec<KnowledgeEntry>) -> Vec<KnowledgeEntry> {
    let mut seen_paths: HashSet<String> = HashSet::new();
    entries
        .into_iter()
        .filter(|entry| match entry {
            KnowledgeEntry::Reference { .. } => true,
            KnowledgeEntry::Directory { path, .. } => seen_paths.insert(path.clone()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn diags() -> Diagnostics {
        Diagnostics::new("doc")
    }

    fn directory_paths(entries: &[KnowledgeEntry]) -> Vec<&str> {
        entries
            .iter()
            .filter_map(|e| match e {
                KnowledgeEntry::Directory { path, .. } => Some(path.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_defaults_appended_for_empty_declaration() {
        let mut d = diags();
        let merged = merge(&[], "Nova", &mut d);

        assert_eq!(
            merged,
            vec![
                KnowledgeEntry::Directory {
                    path: "shared".to_string(),
                    shared: true
                },
                KnowledgeEntry::Directory {
                    path: "nova".to_string(),
                    shared: false
                },
            ]
        );
        assert!(d.is_empty());
    }

    #[test]
    fn test_declared_shared_directory_wins_over_default() {
        let mut d = diags();
        let merged = merge(&[json!({ "directory": "shared", "shared": true })], "Nova", &mut d);

        let paths = directory_paths(&merged);
        assert_eq!(paths, vec!["shared", "nova"]);
        // Exactly one shared entry: the declared one.
        assert_eq!(merged.iter().filter(|e| matches!(e, KnowledgeEntry::Directory { path, .. } if path == "shared")).count(), 1);
    }

    #[test]
    fn test_references_pass_through_and_never_dedup_against_directories() {
        let mut d = diags();
        let merged = merge(
            &[
                json!("doc-1"),
                json!({ "ref": "doc-1" }),
                json!({ "directory": "doc-1" }),
            ],
            "Nova",
            &mut d,
        );

        let refs = merged
            .iter()
            .filter(|e| matches!(e, KnowledgeEntry::Reference { .. }))
            .count();
        assert_eq!(refs, 2);
        assert!(directory_paths(&merged).contains(&"doc-1"));
    }

    #[test]
    fn test_malformed_directory_item_dropped_with_warning() {
        let mut d = diags();
        let merged = merge(
            &[json!({ "shared": true }), json!({ "directory": "  " })],
            "Nova",
            &mut d,
        );

        assert_eq!(directory_paths(&merged), vec!["shared", "nova"]);
        assert_eq!(d.count_of(ReasonCode::MalformedDirectoryItem), 2);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut d = diags();
        let once = merge(&[json!({ "directory": "docs", "shared": false })], "Nova", &mut d);

        let reraw: Vec<Value> = once.iter().map(|e| serde_json::to_value(e).unwrap()).collect();
        let twice = merge(&reraw, "Nova", &mut d);

        assert_eq!(once, twice);
        assert!(d.is_empty());
    }

    #[test]
    fn test_agent_name_is_lowercased_for_private_directory() {
        let mut d = diags();
        let merged = merge(&[], "NOVA Prime", &mut d);
        assert!(directory_paths(&merged).contains(&"nova prime"));
    }
}
