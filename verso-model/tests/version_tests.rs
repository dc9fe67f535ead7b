use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::BTreeMap;
use verso_model::{
    ContentItem, FieldStrategy, Lineage, MergeResolution, NewVersion, NoRisk, Payload,
    RiskAnalyzer, VersionKind,
};
use verso_model::{ApprovalState, identity};
use verso_types::{ContentId, HybridTimestamp};

fn new_version(lineage: Lineage, title: &str) -> NewVersion {
    NewVersion::new(
        ContentId::new("page-1"),
        lineage,
        Payload::from_value(json!({ "title": title })).unwrap(),
        "alice",
        HybridTimestamp::new(10, 0),
        VersionKind::Edit,
    )
}

// ── NewVersion ───────────────────────────────────────────────────

#[test]
fn new_version_computes_identity() {
    let v = new_version(Lineage::Root, "A");
    assert_eq!(v.content_hash, identity::content_hash(&v.payload));
    assert_eq!(
        v.version_id,
        identity::version_id(&v.content_id, &[], &v.content_hash)
    );
}

#[test]
fn into_version_keeps_fields() {
    let draft = new_version(Lineage::Root, "A");
    let id = draft.version_id.clone();
    let v = draft.into_version(7);
    assert_eq!(v.version_id, id);
    assert_eq!(v.sequence, 7);
    assert_eq!(v.author, "alice");
    assert!(v.parents().is_empty());
}

// ── Lineage ──────────────────────────────────────────────────────

#[test]
fn lineage_parents() {
    let a = new_version(Lineage::Root, "A").version_id;
    let b = new_version(Lineage::Root, "B").version_id;

    assert_eq!(Lineage::on_top_of(None), Lineage::Root);
    assert_eq!(Lineage::on_top_of(Some(&a)).parents(), &[a.clone()]);

    let merge = Lineage::Merge {
        parents: [a.clone(), b.clone()],
        resolution: MergeResolution::Manual,
    };
    assert!(merge.is_merge());
    assert_eq!(merge.parents(), &[a, b]);
}

#[test]
fn lineage_serde_shape() {
    let a = new_version(Lineage::Root, "A").version_id;
    let mut strategies = BTreeMap::new();
    strategies.insert("body".to_string(), FieldStrategy::Concat);
    let lineage = Lineage::Merge {
        parents: [a.clone(), a.clone()],
        resolution: MergeResolution::Automatic { strategies },
    };
    let value = serde_json::to_value(&lineage).unwrap();
    assert_eq!(value["type"], "merge");
    assert_eq!(value["resolution"]["mode"], "automatic");
    assert_eq!(value["resolution"]["strategies"]["body"], "concat");

    let back: Lineage = serde_json::from_value(value).unwrap();
    assert_eq!(back, lineage);
}

#[test]
fn version_kind_labels() {
    let a = new_version(Lineage::Root, "A").version_id;
    assert_eq!(VersionKind::Edit.label(), "edit");
    assert_eq!(VersionKind::Restore { source: a }.label(), "restore");
}

// ── ContentItem / RiskAnalyzer ───────────────────────────────────

#[test]
fn new_item_starts_in_draft_without_head() {
    let item = ContentItem::new(ContentId::new("x"), "article");
    assert_eq!(item.approval_state, ApprovalState::Draft);
    assert!(item.head_version_id.is_none());
    assert_eq!(item.content_type, "article");
}

#[test]
fn risk_analyzers() {
    let p = Payload::from_value(json!({"body": "fine"})).unwrap();
    assert_eq!(NoRisk.analyze(&p), 0.0);

    let closure = |p: &Payload| if p.contains("body") { 0.9 } else { 0.0 };
    assert_eq!(closure.analyze(&p), 0.9);
}
