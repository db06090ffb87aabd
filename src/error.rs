//! Error types for the resolution pipeline.
//!
//! Only batch-fatal and document-fatal conditions surface as `Err` values.
//! Everything repairable is absorbed into the diagnostics accumulator and
//! never crosses a stage boundary as an error.

use thiserror::Error;

/// Errors that alter control flow during a resolution run.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The content store query itself failed; the whole batch fails rather
    /// than returning a partial result.
    #[error("Content store error: {0}")]
    Store(String),

    /// A document claims a different id than the one previously committed
    /// for the same storage key. Document-fatal, never batch-fatal.
    #[error("Permanent id conflict for '{storage_key}': committed {committed}, claimed {claimed}")]
    PermanentConflict {
        storage_key: String,
        committed: uuid::Uuid,
        claimed: uuid::Uuid,
    },

    #[error("Config error: {0}")]
    Config(String),
}
