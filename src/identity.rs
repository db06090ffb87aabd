//! Identity validation and the committed-id ledger.
//!
//! Document ids must be UUID v4 shaped. A missing or malformed id is repaired
//! by deriving a UUID deterministically from the document's storage key, so
//! reprocessing the same broken document always yields the same id. Once an
//! id has been committed for a storage key it is immutable; a later document
//! claiming a different id is a permanent conflict.

use crate::diagnostics::{Diagnostics, ReasonCode, Stage};
use crate::error::ResolveError;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

/// Outcome of validating a stored id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedId {
    pub id: Uuid,
    /// True when the stored id was missing or malformed and had to be derived.
    pub repaired: bool,
}

/// Check whether a stored id string is UUID v4 shaped.
pub fn is_valid_id(raw: &str) -> bool {
    matches!(Uuid::try_parse(raw), Ok(id) if id.get_version_num() == 4)
}

/// Derive a stable UUID from a storage key.
///
/// Hashes the key with blake3 and feeds the first 16 bytes through the v4
/// builder, which stamps the version and variant bits. Same key, same id.
pub fn derive_id(storage_key: &str) -> Uuid {
    let digest = blake3::hash(storage_key.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest.as_bytes()[..16]);
    uuid::Builder::from_random_bytes(bytes).into_uuid()
}

/// Validate a stored id, repairing it from the storage key when needed.
///
/// A repair is recorded as an error-level diagnostic but never fails the
/// document.
pub fn validate(
    raw_id: Option<&str>,
    storage_key: &str,
    diags: &mut Diagnostics,
) -> ValidatedId {
    if let Some(raw) = raw_id {
        if is_valid_id(raw) {
            return ValidatedId {
                // Parse cannot fail after is_valid_id.
                id: Uuid::try_parse(raw).unwrap_or_else(|_| derive_id(storage_key)),
                repaired: false,
            };
        }
    }

    let repaired = derive_id(storage_key);
    diags.error(
        Stage::Identity,
        ReasonCode::MalformedId,
        match raw_id {
            Some(raw) => format!("stored id '{}' is not UUID v4; repaired to {}", raw, repaired),
            None => format!("stored id missing; repaired to {}", repaired),
        },
    );
    ValidatedId {
        id: repaired,
        repaired: true,
    }
}

/// Ledger of ids previously committed per storage key.
///
/// The orchestrator consults it before assembly: the first id seen for a key
/// is committed, any later mismatch is a permanent conflict. Shared across
/// concurrently resolving documents, hence the lock.
#[derive(Debug, Default)]
pub struct IdentityLedger {
    committed: RwLock<HashMap<String, Uuid>>,
}

impl IdentityLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the ledger with an already-committed identity.
    pub fn commit(&self, storage_key: &str, id: Uuid) {
        self.committed.write().insert(storage_key.to_string(), id);
    }

    /// Previously committed id for a key, if any.
    pub fn committed(&self, storage_key: &str) -> Option<Uuid> {
        self.committed.read().get(storage_key).copied()
    }

    /// Enforce id immutability for a storage key.
    ///
    /// Commits the id on first sight; on later sightings the claimed id must
    /// match what was committed or the document is in permanent conflict.
    pub fn verify_or_commit(&self, storage_key: &str, claimed: Uuid) -> Result<(), ResolveError> {
        let mut committed = self.committed.write();
        match committed.get(storage_key) {
            Some(existing) if *existing != claimed => Err(ResolveError::PermanentConflict {
                storage_key: storage_key.to_string(),
                committed: *existing,
                claimed,
            }),
            Some(_) => Ok(()),
            None => {
                committed.insert(storage_key.to_string(), claimed);
                Ok(())
            }
        }
    }
}
