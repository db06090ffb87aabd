//! Resolution orchestrator.
//!
//! Drives each raw document through the stage sequence
//! `Fetched → IdentityChecked → ExamplesNormalized → KnowledgeMerged →
//! PluginsResolved → SecretsAudited → Assembled | Discarded`.
//! Stage-local problems are absorbed into the document's diagnostics;
//! only structural prerequisite failures (unassignable owner, permanent id
//! conflict) discard a document, and only a content-store failure fails the
//! batch. Documents are independent: one discard never affects siblings.

use crate::diagnostics::{Diagnostic, Diagnostics, ReasonCode, Stage};
use crate::document::{DynamicSecret, ModelProvider, OwnerRef, Style};
use crate::error::ResolveError;
use crate::identity::{self, IdentityLedger};
use crate::knowledge::{self, KnowledgeEntry};
use crate::message::{self, Conversation};
use crate::plugin::{resolve, PluginRegistry, ResolvedPlugin, SecretRequirements};
use crate::store::{ContentStore, StoredDocument};
use crate::types::StorageKey;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Per-document resolution phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Fetched,
    IdentityChecked,
    ExamplesNormalized,
    KnowledgeMerged,
    PluginsResolved,
    SecretsAudited,
    Assembled,
    Discarded,
}

/// Why a document was excluded from the output batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardReason {
    /// `createdBy` missing or unresolvable.
    UnassignableOwner,
    /// Claimed id differs from the previously committed identity.
    IdentityConflict,
}

impl DiscardReason {
    fn reason_code(&self) -> ReasonCode {
        match self {
            DiscardReason::UnassignableOwner => ReasonCode::UnassignableOwner,
            DiscardReason::IdentityConflict => ReasonCode::IdentityConflict,
        }
    }
}

/// Fully validated, runtime-ready agent specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeAgentSpec {
    pub id: Uuid,
    pub name: String,
    pub username: Option<String>,
    pub system: Option<String>,
    pub bio: Vec<String>,
    pub lore: Vec<String>,
    pub post_examples: Vec<String>,
    pub topics: Vec<String>,
    pub adjectives: Vec<String>,
    pub style: Style,
    pub model_provider: ModelProvider,
    pub message_examples: Vec<Conversation>,
    pub plugins: Vec<ResolvedPlugin>,
    pub knowledge: Vec<KnowledgeEntry>,
    /// Secret descriptors, carried through opaque.
    pub secrets: Vec<DynamicSecret>,
    pub owner: OwnerRef,
}

/// A document that failed a structural prerequisite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscardedDocument {
    pub storage_key: StorageKey,
    pub reason: DiscardReason,
}

/// Result of one resolution run over a batch.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub specs: Vec<RuntimeAgentSpec>,
    pub discarded: Vec<DiscardedDocument>,
    /// Full diagnostic trail of the run, in processing order.
    pub diagnostics: Vec<Diagnostic>,
}

/// Processing record for a single document.
struct DocumentRecord {
    storage_key: StorageKey,
    outcome: Result<RuntimeAgentSpec, DiscardReason>,
    diagnostics: Diagnostics,
}

/// Drives batches of raw documents into runtime specs.
pub struct Orchestrator {
    registry: Arc<PluginRegistry>,
    requirements: SecretRequirements,
    ledger: IdentityLedger,
}

impl Orchestrator {
    pub fn new(registry: Arc<PluginRegistry>) -> Self {
        Self {
            registry,
            requirements: SecretRequirements::default(),
            ledger: IdentityLedger::new(),
        }
    }

    /// Replace the secret requirement table.
    pub fn with_requirements(mut self, requirements: SecretRequirements) -> Self {
        self.requirements = requirements;
        self
    }

    /// Ledger of committed identities, for seeding previously assigned ids.
    pub fn ledger(&self) -> &IdentityLedger {
        &self.ledger
    }

    /// Resolve one batch of enabled documents.
    ///
    /// Idempotent and stateless apart from the identity ledger: each run
    /// reads the current documents and produces fresh specs. A store failure
    /// fails the whole call; no partial batch is returned for it.
    pub async fn resolve_batch(&self, store: &dyn ContentStore) -> Result<BatchOutcome, ResolveError> {
        let documents = store.fetch_enabled().await?;
        let total = documents.len();

        let mut diagnostics = duplicate_name_scan(&documents);

        let records = join_all(documents.iter().map(|stored| self.resolve_document(stored))).await;

        let mut specs = Vec::new();
        let mut discarded = Vec::new();
        for record in records {
            record.diagnostics.emit();
            diagnostics.extend(record.diagnostics.into_records());
            match record.outcome {
                Ok(spec) => specs.push(spec),
                Err(reason) => discarded.push(DiscardedDocument {
                    storage_key: record.storage_key,
                    reason,
                }),
            }
        }

        info!(
            total,
            assembled = specs.len(),
            discarded = discarded.len(),
            "resolution batch complete"
        );
        Ok(BatchOutcome {
            specs,
            discarded,
            diagnostics,
        })
    }

    /// Resolve a single document through the stage sequence.
    async fn resolve_document(&self, stored: &StoredDocument) -> DocumentRecord {
        let key = stored.storage_key.as_str();
        let doc = &stored.document;
        let mut diags = Diagnostics::new(key);
        entered(key, Phase::Fetched);

        // Structural prerequisite: an unassignable document never becomes a
        // partial agent.
        let Some(owner) = doc.resolve_owner() else {
            return discard(
                stored,
                DiscardReason::UnassignableOwner,
                diags,
                "createdBy missing or unresolvable; document excluded".to_string(),
            );
        };

        let validated = identity::validate(doc.id.as_deref(), key, &mut diags);
        if let Err(conflict) = self.ledger.verify_or_commit(key, validated.id) {
            return discard(stored, DiscardReason::IdentityConflict, diags, conflict.to_string());
        }
        entered(key, Phase::IdentityChecked);

        let message_examples = message::normalize(&doc.message_examples, &mut diags);
        entered(key, Phase::ExamplesNormalized);

        let knowledge = knowledge::merge(&doc.knowledge, &doc.name, &mut diags);
        entered(key, Phase::KnowledgeMerged);

        let plugins = resolve(&self.registry, &doc.plugins, &mut diags).await;
        entered(key, Phase::PluginsResolved);

        self.requirements
            .audit(&plugins, &doc.declared_secret_keys(), &mut diags);
        entered(key, Phase::SecretsAudited);

        let model_provider = resolve_model_provider(doc.model_provider.as_deref(), &mut diags);

        let spec = RuntimeAgentSpec {
            id: validated.id,
            name: doc.name.clone(),
            username: doc.username.clone(),
            system: doc.system.clone(),
            bio: doc.bio.clone(),
            lore: doc.lore.clone(),
            post_examples: doc.post_examples.clone(),
            topics: doc.topics.clone(),
            adjectives: doc.adjectives.clone(),
            style: doc.style.clone(),
            model_provider,
            message_examples,
            plugins,
            knowledge,
            secrets: doc.settings.secrets.dynamic.clone(),
            owner,
        };
        entered(key, Phase::Assembled);

        DocumentRecord {
            storage_key: stored.storage_key.clone(),
            outcome: Ok(spec),
            diagnostics: diags,
        }
    }
}

fn entered(storage_key: &str, phase: Phase) {
    debug!(storage_key, phase = ?phase, "document phase");
}

/// Transition a document directly to `Discarded` with its reason recorded.
fn discard(
    stored: &StoredDocument,
    reason: DiscardReason,
    mut diags: Diagnostics,
    detail: String,
) -> DocumentRecord {
    let stage = match reason {
        DiscardReason::UnassignableOwner => Stage::Assembly,
        DiscardReason::IdentityConflict => Stage::Identity,
    };
    diags.error(stage, reason.reason_code(), detail);
    entered(stored.storage_key.as_str(), Phase::Discarded);
    DocumentRecord {
        storage_key: stored.storage_key.clone(),
        outcome: Err(reason),
        diagnostics: diags,
    }
}

fn resolve_model_provider(raw: Option<&str>, diags: &mut Diagnostics) -> ModelProvider {
    match raw {
        None => ModelProvider::default(),
        Some(value) => match ModelProvider::parse(value) {
            Some(provider) => provider,
            None => {
                diags.warn(
                    Stage::Assembly,
                    ReasonCode::UnknownModelProvider,
                    format!("unknown modelProvider '{}'; using default", value),
                );
                ModelProvider::default()
            }
        },
    }
}

/// Name uniqueness is owned by the content store layer; the batch only logs
/// collisions it can see for free.
fn duplicate_name_scan(documents: &[StoredDocument]) -> Vec<Diagnostic> {
    let mut first_seen: HashMap<&str, &str> = HashMap::new();
    let mut out = Vec::new();
    for stored in documents {
        let name = stored.document.name.as_str();
        match first_seen.get(name) {
            Some(original_key) => {
                let mut diags = Diagnostics::new(stored.storage_key.clone());
                diags.warn(
                    Stage::Assembly,
                    ReasonCode::DuplicateName,
                    format!("name '{}' already used by '{}'", name, original_key),
                );
                diags.emit();
                out.extend(diags.into_records());
            }
            None => {
                first_seen.insert(name, stored.storage_key.as_str());
            }
        }
    }
    out
}
