use serde_json::{json, Value};
use std::sync::Arc;
use verso_engine::{
    field_ratio_change, hash_segment_change, AutoVersionScheduler, ChangeMetric, EngineConfig,
    EngineError,
};
use verso_model::{Lineage, NewVersion, NoRisk, Payload, RiskAnalyzer, Version, VersionKind};
use verso_types::{ContentId, HybridTimestamp};

fn payload(value: Value) -> Payload {
    Payload::from_value(value).unwrap()
}

fn head(value: Value) -> Version {
    NewVersion::new(
        ContentId::new("post"),
        Lineage::Root,
        payload(value),
        "alice",
        HybridTimestamp::new(1, 0),
        VersionKind::Edit,
    )
    .into_version(0)
}

/// A payload with `n` fields `f0..fn`, all zero.
fn wide(n: usize) -> Value {
    Value::Object((0..n).map(|i| (format!("f{i}"), json!(0))).collect())
}

fn field_ratio_scheduler() -> AutoVersionScheduler {
    let config = EngineConfig {
        change_metric: ChangeMetric::FieldRatio,
        ..EngineConfig::default()
    };
    AutoVersionScheduler::new(&config, Arc::new(NoRisk))
}

// ── hash segments ────────────────────────────────────────────────

#[test]
fn identical_digests_have_no_change() {
    assert_eq!(hash_segment_change("abcdef12", "abcdef12", 4), 0.0);
}

#[test]
fn segments_compare_by_position() {
    assert_eq!(hash_segment_change("aaaabbbb", "aaaacccc", 4), 50.0);
    assert_eq!(hash_segment_change("aaaabbbb", "bbbbaaaa", 4), 100.0);
}

#[test]
fn unequal_lengths_count_missing_segments_as_changed() {
    assert_eq!(hash_segment_change("aaaa", "aaaabbbb", 4), 50.0);
    assert_eq!(hash_segment_change("", "", 4), 0.0);
}

#[test]
fn zero_segment_length_is_treated_as_one() {
    assert_eq!(hash_segment_change("ab", "ac", 0), 50.0);
}

#[test]
fn no_head_is_a_full_change() {
    let scheduler = AutoVersionScheduler::default();
    let p = payload(json!({"title": "A"}));
    assert_eq!(scheduler.change_percent(None, &p), 100.0);
    assert!(scheduler.should_snapshot(None, &p));
}

#[test]
fn unchanged_payload_is_not_snapshotted() {
    let scheduler = AutoVersionScheduler::default();
    let head = head(json!({"title": "A"}));
    assert_eq!(scheduler.change_percent(Some(&head), &head.payload), 0.0);
    assert!(!scheduler.should_snapshot(Some(&head), &head.payload));
}

// ── field ratio ──────────────────────────────────────────────────

#[test]
fn field_ratio_counts_changed_fields() {
    let old = payload(json!({"a": 1, "b": 2}));
    assert_eq!(field_ratio_change(&old, &payload(json!({"a": 1, "b": 3}))), 50.0);
    assert_eq!(field_ratio_change(&old, &payload(json!({"a": 1}))), 50.0);
    assert_eq!(field_ratio_change(&Payload::new(), &Payload::new()), 0.0);
}

#[test]
fn snapshot_threshold_is_inclusive() {
    let scheduler = field_ratio_scheduler();

    // 1 of 20 fields is exactly 5%.
    let head20 = head(wide(20));
    let mut edit = head20.payload.clone();
    edit.insert("f0", json!(1));
    let decision = scheduler.evaluate(Some(&head20), &edit).unwrap();
    assert_eq!(decision.change_percent, 5.0);
    assert!(decision.snapshot);

    // 1 of 25 is below it.
    let head25 = head(wide(25));
    let mut edit = head25.payload.clone();
    edit.insert("f0", json!(1));
    let decision = scheduler.evaluate(Some(&head25), &edit).unwrap();
    assert_eq!(decision.change_percent, 4.0);
    assert!(!decision.snapshot);
}

// ── risk ─────────────────────────────────────────────────────────

fn scoring(score: f64) -> AutoVersionScheduler {
    let analyzer: Arc<dyn RiskAnalyzer> = Arc::new(move |_: &Payload| score);
    AutoVersionScheduler::new(&EngineConfig::default(), analyzer)
}

#[test]
fn risk_above_threshold_is_blocked() {
    let err = scoring(0.9)
        .check_risk(&payload(json!({"body": "spam"})))
        .unwrap_err();
    assert!(matches!(err, EngineError::HighRiskContent { score } if score == 0.9));
}

#[test]
fn risk_at_threshold_is_allowed() {
    assert_eq!(scoring(0.7).check_risk(&Payload::new()).unwrap(), 0.7);
}

#[test]
fn nan_risk_score_is_blocked() {
    let err = scoring(f64::NAN).check_risk(&Payload::new()).unwrap_err();
    assert!(matches!(err, EngineError::HighRiskContent { score } if score.is_nan()));
    assert!(scoring(f64::NAN).evaluate(None, &Payload::new()).is_err());
}

#[test]
fn assess_skips_the_risk_gate() {
    let decision = scoring(1.0).assess(None, &Payload::new());
    assert_eq!(decision.change_percent, 100.0);
    assert!(decision.snapshot);
}

#[test]
fn evaluate_checks_risk_before_anything_else() {
    let err = scoring(1.0).evaluate(None, &Payload::new()).unwrap_err();
    assert!(matches!(err, EngineError::HighRiskContent { .. }));
}

#[test]
fn analyzer_sees_the_payload() {
    let analyzer: Arc<dyn RiskAnalyzer> = Arc::new(|p: &Payload| {
        if p.get("body").and_then(Value::as_str) == Some("buy now") {
            1.0
        } else {
            0.0
        }
    });
    let scheduler = AutoVersionScheduler::new(&EngineConfig::default(), analyzer);
    assert!(scheduler.check_risk(&payload(json!({"body": "hello"}))).is_ok());
    assert!(scheduler.check_risk(&payload(json!({"body": "buy now"}))).is_err());
}
