//! Deterministic version identity.
//!
//! Every version carries two digests:
//! - `content_hash`: SHA-256 over the canonical payload. Used for no-op
//!   detection; identical payloads always hash the same.
//! - `version_id`: SHA-256 over the content id, the parent ids and the
//!   content hash. Reverting to an earlier payload therefore yields a new id
//!   and the lineage stays acyclic.

use crate::{Payload, Version};
use sha2::{Digest, Sha256};
use verso_types::{ContentId, VersionId};

/// Hex SHA-256 of the payload's canonical JSON.
#[must_use]
pub fn content_hash(payload: &Payload) -> String {
    hex::encode(Sha256::digest(payload.canonical_json().as_bytes()))
}

/// Derives the storage key of a version from its position in the lineage.
#[must_use]
pub fn version_id(content_id: &ContentId, parents: &[VersionId], content_hash: &str) -> VersionId {
    let mut hasher = Sha256::new();
    hasher.update(content_id.as_str().as_bytes());
    hasher.update([0u8]);
    for parent in parents {
        hasher.update(parent.as_str().as_bytes());
        hasher.update([0u8]);
    }
    hasher.update(content_hash.as_bytes());
    VersionId::from_digest(hex::encode(hasher.finalize()))
}

/// True iff committing `payload` on top of `head` would change nothing.
#[must_use]
pub fn is_no_op(head: Option<&Version>, payload: &Payload) -> bool {
    head.is_some_and(|h| h.content_hash == content_hash(payload))
}
