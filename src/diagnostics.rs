//! Diagnostics channel for non-fatal repairs, drops, and warnings.
//!
//! Stages never log inline and never throw for stage-local problems; they
//! record structured diagnostics into a per-document accumulator. The
//! orchestrator drains the accumulator onto the log after the document
//! settles, which keeps every stage a pure function for testing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

/// Pipeline stage that produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Identity,
    Examples,
    Knowledge,
    Plugins,
    Secrets,
    Assembly,
}

/// Severity of a non-fatal diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

/// Stable reason codes attached to every diagnostic record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReasonCode {
    /// Stored id missing or not UUID v4 shaped; repaired deterministically.
    MalformedId,
    /// messageExamples did not match the wrapped or flat shape.
    UnrecognizedExampleShape,
    /// A single message failed validation and was dropped from its conversation.
    DroppedMessage,
    /// Directory knowledge item missing its directory field.
    MalformedDirectoryItem,
    /// Plugin name failed registry lookup or its loader errored.
    UnresolvedPlugin,
    /// A resolved plugin requires a secret key the document does not declare.
    MissingSecret,
    /// modelProvider value outside the supported enum; default substituted.
    UnknownModelProvider,
    /// Two enabled documents in the batch share a name.
    DuplicateName,
    /// Document-fatal: createdBy missing or unresolvable.
    UnassignableOwner,
    /// Document-fatal: id differs from the previously committed identity.
    IdentityConflict,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::MalformedId => "malformed-id",
            ReasonCode::UnrecognizedExampleShape => "unrecognized-example-shape",
            ReasonCode::DroppedMessage => "dropped-message",
            ReasonCode::MalformedDirectoryItem => "malformed-directory-item",
            ReasonCode::UnresolvedPlugin => "unresolved-plugin",
            ReasonCode::MissingSecret => "missing-secret",
            ReasonCode::UnknownModelProvider => "unknown-model-provider",
            ReasonCode::DuplicateName => "duplicate-name",
            ReasonCode::UnassignableOwner => "unassignable-owner",
            ReasonCode::IdentityConflict => "identity-conflict",
        }
    }
}

/// One structured diagnostic record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Storage key of the document the diagnostic belongs to.
    pub storage_key: String,
    pub stage: Stage,
    pub severity: Severity,
    pub reason: ReasonCode,
    /// Human-readable detail, never parsed by consumers.
    pub detail: String,
    pub at: DateTime<Utc>,
}

/// Per-document diagnostics accumulator.
///
/// One collector is threaded through every stage of a document's resolution;
/// stages append, the orchestrator drains.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    storage_key: String,
    records: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new(storage_key: impl Into<String>) -> Self {
        Self {
            storage_key: storage_key.into(),
            records: Vec::new(),
        }
    }

    pub fn push(
        &mut self,
        stage: Stage,
        severity: Severity,
        reason: ReasonCode,
        detail: impl Into<String>,
    ) {
        self.records.push(Diagnostic {
            storage_key: self.storage_key.clone(),
            stage,
            severity,
            reason,
            detail: detail.into(),
            at: Utc::now(),
        });
    }

    pub fn warn(&mut self, stage: Stage, reason: ReasonCode, detail: impl Into<String>) {
        self.push(stage, Severity::Warning, reason, detail);
    }

    pub fn error(&mut self, stage: Stage, reason: ReasonCode, detail: impl Into<String>) {
        self.push(stage, Severity::Error, reason, detail);
    }

    pub fn records(&self) -> &[Diagnostic] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Diagnostic> {
        self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Count records carrying a specific reason code.
    pub fn count_of(&self, reason: ReasonCode) -> usize {
        self.records.iter().filter(|r| r.reason == reason).count()
    }

    /// Write every accumulated record to the structured log.
    pub fn emit(&self) {
        for record in &self.records {
            match record.severity {
                Severity::Warning => warn!(
                    storage_key = %record.storage_key,
                    stage = ?record.stage,
                    reason = record.reason.as_str(),
                    "{}",
                    record.detail
                ),
                Severity::Error => error!(
                    storage_key = %record.storage_key,
                    stage = ?record.stage,
                    reason = record.reason.as_str(),
                    "{}",
                    record.detail
                ),
            }
        }
    }
}
