//! Core types for the agent configuration resolution pipeline.

/// StorageKey: stable per-document key assigned by the content store.
///
/// Used as the deterministic seed when a malformed document id has to be
/// repaired, so the same document always repairs to the same id.
pub type StorageKey = String;

/// Well-known path of the shared knowledge pool appended to every agent.
pub const SHARED_KNOWLEDGE_PATH: &str = "shared";
