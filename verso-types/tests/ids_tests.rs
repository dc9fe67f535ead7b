use std::collections::HashSet;
use std::str::FromStr;
use verso_types::{ContentId, ReplicaId, VersionId};

// ── ContentId ────────────────────────────────────────────────────

#[test]
fn content_id_from_str_and_string() {
    let a = ContentId::from("page-42");
    let b = ContentId::new(String::from("page-42"));
    assert_eq!(a, b);
    assert_eq!(a.as_str(), "page-42");
    assert_eq!(a.to_string(), "page-42");
}

#[test]
fn content_id_serializes_transparently() {
    let id = ContentId::from("article/7");
    assert_eq!(serde_json::to_string(&id).unwrap(), "\"article/7\"");
}

// ── VersionId ────────────────────────────────────────────────────

const DIGEST: &str = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";

#[test]
fn version_id_parse_valid_digest() {
    let id = VersionId::parse(DIGEST).unwrap();
    assert_eq!(id.as_str(), DIGEST);
    assert_eq!(id.short(), "9f86d081884c");
}

#[test]
fn version_id_parse_normalizes_case() {
    let id = VersionId::parse(&DIGEST.to_uppercase()).unwrap();
    assert_eq!(id.as_str(), DIGEST);
}

#[test]
fn version_id_parse_rejects_garbage() {
    assert!(VersionId::parse("abc").is_err());
    assert!(VersionId::parse(&"z".repeat(64)).is_err());
    assert!(VersionId::from_str("").is_err());
}

// ── ReplicaId ────────────────────────────────────────────────────

#[test]
fn replica_id_new_is_unique() {
    let ids: HashSet<ReplicaId> = (0..100).map(|_| ReplicaId::new()).collect();
    assert_eq!(ids.len(), 100);
}

#[test]
fn replica_id_display_and_parse() {
    let id = ReplicaId::new();
    let parsed = ReplicaId::parse(&id.to_string()).unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn replica_id_from_uuid_roundtrip() {
    let uuid = uuid::Uuid::now_v7();
    assert_eq!(ReplicaId::from_uuid(uuid).as_uuid(), uuid);
}

#[test]
fn replica_id_parse_invalid() {
    let err = ReplicaId::parse("not-a-uuid").unwrap_err();
    assert!(matches!(err, verso_types::Error::InvalidUuid(_)));
    assert!(ReplicaId::from_str("").is_err());
}

#[test]
fn replica_id_from_str_trims_whitespace() {
    let id = ReplicaId::new();
    let padded = format!("  {id}\n");
    assert_eq!(ReplicaId::from_str(&padded).unwrap(), id);
}
