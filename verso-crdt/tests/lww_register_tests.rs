use verso_crdt::LWWRegister;
use verso_types::{HybridTimestamp, ManualClock, ReplicaId};

#[test]
fn new_register_takes_clock_reading() {
    let clock = ManualClock::starting_at(500);
    let replica = ReplicaId::new();
    let reg = LWWRegister::new(42, &clock, replica);
    assert_eq!(*reg.value(), 42);
    assert_eq!(reg.timestamp(), HybridTimestamp::new(500, 0));
    assert_eq!(reg.replica(), replica);
}

#[test]
fn with_timestamp() {
    let replica = ReplicaId::new();
    let ts = HybridTimestamp::new(999, 5);
    let reg = LWWRegister::with_timestamp("hi", ts, replica);
    assert_eq!(*reg.value(), "hi");
    assert_eq!(reg.timestamp(), ts);
    assert_eq!(reg.replica(), replica);
}

#[test]
fn set_updates_value_and_timestamp() {
    let clock = ManualClock::starting_at(10);
    let replica = ReplicaId::new();
    let mut reg = LWWRegister::new(1, &clock, replica);
    let old_ts = reg.timestamp();
    reg.set(2, &clock, replica);
    assert_eq!(*reg.value(), 2);
    assert!(reg.timestamp() > old_ts);
}

#[test]
fn set_outruns_a_lagging_clock() {
    let replica = ReplicaId::new();
    let mut reg = LWWRegister::with_timestamp(1, HybridTimestamp::new(10_000, 3), replica);
    let clock = ManualClock::starting_at(5);
    reg.set(2, &clock, replica);
    assert_eq!(*reg.value(), 2);
    assert!(reg.timestamp() > HybridTimestamp::new(10_000, 3));
}

#[test]
fn set_updates_replica() {
    let clock = ManualClock::default();
    let r1 = ReplicaId::new();
    let r2 = ReplicaId::new();
    let mut reg = LWWRegister::new(1, &clock, r1);
    reg.set(2, &clock, r2);
    assert_eq!(reg.replica(), r2);
}

// ── set_with_timestamp ───────────────────────────────────────────

#[test]
fn set_with_timestamp_accepts_newer() {
    let replica = ReplicaId::new();
    let ts1 = HybridTimestamp::new(100, 0);
    let ts2 = HybridTimestamp::new(200, 0);
    let mut reg = LWWRegister::with_timestamp("old", ts1, replica);
    assert!(reg.set_with_timestamp("new", ts2, replica));
    assert_eq!(*reg.value(), "new");
    assert_eq!(reg.timestamp(), ts2);
}

#[test]
fn set_with_timestamp_rejects_older() {
    let replica = ReplicaId::new();
    let mut reg = LWWRegister::with_timestamp("keep", HybridTimestamp::new(200, 0), replica);
    assert!(!reg.set_with_timestamp("lose", HybridTimestamp::new(100, 0), replica));
    assert_eq!(*reg.value(), "keep");
}

#[test]
fn set_with_timestamp_tie_uses_replica_id() {
    let r1 = ReplicaId::new();
    let r2 = ReplicaId::new();
    let ts = HybridTimestamp::new(100, 0);
    let mut reg = LWWRegister::with_timestamp("a", ts, r1);
    let updated = reg.set_with_timestamp("b", ts, r2);
    assert_eq!(updated, r2 > r1);
}

#[test]
fn exact_stamp_tie_keeps_local() {
    let replica = ReplicaId::new();
    let ts = HybridTimestamp::new(100, 0);
    let mut reg = LWWRegister::with_timestamp("local", ts, replica);
    assert!(!reg.set_with_timestamp("echo", ts, replica));
    assert_eq!(*reg.value(), "local");
}

// ── Merge ────────────────────────────────────────────────────────

#[test]
fn merge_higher_timestamp_wins() {
    let mut r1 = LWWRegister::with_timestamp("old", HybridTimestamp::new(100, 0), ReplicaId::new());
    let r2 = LWWRegister::with_timestamp("new", HybridTimestamp::new(200, 0), ReplicaId::new());
    r1.merge(&r2);
    assert_eq!(*r1.value(), "new");
}

#[test]
fn merge_lower_timestamp_loses() {
    let mut r1 = LWWRegister::with_timestamp("keep", HybridTimestamp::new(200, 0), ReplicaId::new());
    let r2 = LWWRegister::with_timestamp("lose", HybridTimestamp::new(100, 0), ReplicaId::new());
    r1.merge(&r2);
    assert_eq!(*r1.value(), "keep");
}

#[test]
fn merge_tie_on_wall_time_resolved_by_logical() {
    let replica = ReplicaId::new();
    let mut r1 = LWWRegister::with_timestamp("first", HybridTimestamp::new(100, 0), replica);
    let r2 = LWWRegister::with_timestamp("second", HybridTimestamp::new(100, 1), replica);
    r1.merge(&r2);
    assert_eq!(*r1.value(), "second");
}

#[test]
fn tie_breaker_uses_replica_id() {
    let r1 = ReplicaId::new();
    let r2 = ReplicaId::new();
    let ts = HybridTimestamp::new(1000, 0);
    let a = LWWRegister::with_timestamp("r1", ts, r1);
    let b = LWWRegister::with_timestamp("r2", ts, r2);
    let expected = if r1 > r2 { "r1" } else { "r2" };
    assert_eq!(*a.merged(&b).value(), expected);
    assert_eq!(*b.merged(&a).value(), expected);
}

// ── PartialEq ────────────────────────────────────────────────────

#[test]
fn equality_includes_replica() {
    let ts = HybridTimestamp::new(100, 0);
    let a = LWWRegister::with_timestamp(42, ts, ReplicaId::new());
    let b = LWWRegister::with_timestamp(42, ts, ReplicaId::new());
    assert_ne!(a, b);
}

#[test]
fn inequality_different_value() {
    let replica = ReplicaId::new();
    let ts = HybridTimestamp::new(100, 0);
    let a = LWWRegister::with_timestamp(1, ts, replica);
    let b = LWWRegister::with_timestamp(2, ts, replica);
    assert_ne!(a, b);
}

// ── Serde ────────────────────────────────────────────────────────

#[test]
fn serialization_roundtrip() {
    let reg = LWWRegister::with_timestamp(
        "test value".to_string(),
        HybridTimestamp::new(7, 1),
        ReplicaId::new(),
    );
    let json = serde_json::to_string(&reg).unwrap();
    let parsed: LWWRegister<String> = serde_json::from_str(&json).unwrap();
    assert_eq!(reg, parsed);
}
