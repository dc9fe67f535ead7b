use pretty_assertions::assert_eq;
use verso_crdt::text_ot::{
    apply_all, diff, merge_text, transform, transform_sequences, Operation, OperationKind, OtError,
};

fn converge(base: &str, local: &Operation, remote: &Operation) -> (String, String) {
    let via_remote = apply_all(&remote.apply(base).unwrap(), &transform(local, remote)).unwrap();
    let via_local = apply_all(&local.apply(base).unwrap(), &transform(remote, local)).unwrap();
    (via_remote, via_local)
}

// ── apply ────────────────────────────────────────────────────────

#[test]
fn apply_insert_and_delete() {
    assert_eq!(Operation::insert(5, " world", "a").apply("hello").unwrap(), "hello world");
    assert_eq!(Operation::delete(1, "ell", "a").apply("hello").unwrap(), "ho");
}

#[test]
fn apply_counts_chars_not_bytes() {
    let out = Operation::insert(2, "ß", "a").apply("héllo").unwrap();
    assert_eq!(out, "héßllo");
    let out = Operation::delete(1, "é", "a").apply("héllo").unwrap();
    assert_eq!(out, "hllo");
}

#[test]
fn apply_rejects_out_of_bounds() {
    let err = Operation::insert(9, "x", "a").apply("abc").unwrap_err();
    assert_eq!(err, OtError::OutOfBounds { position: 9, len: 3 });
    let err = Operation::delete(2, "cde", "a").apply("abc").unwrap_err();
    assert!(matches!(err, OtError::OutOfBounds { .. }));
}

#[test]
fn apply_rejects_mismatched_delete() {
    let err = Operation::delete(0, "xy", "a").apply("abc").unwrap_err();
    assert!(matches!(err, OtError::Mismatch { position: 0, .. }));
}

// ── transform: insert / insert ───────────────────────────────────

#[test]
fn concurrent_inserts_at_same_position_order_by_origin() {
    let local = Operation::insert(2, "X", "alice");
    let remote = Operation::insert(2, "Y", "bob");
    let (a, b) = converge("hello", &local, &remote);
    assert_eq!(a, b);
    assert_eq!(a, "heXYllo");
}

#[test]
fn insert_before_remote_insert_is_unchanged() {
    let local = Operation::insert(1, "X", "a");
    let remote = Operation::insert(3, "Y", "b");
    assert_eq!(transform(&local, &remote), vec![local.clone()]);
    assert_eq!(transform(&remote, &local)[0].position, 4);
}

// ── transform: insert / delete ───────────────────────────────────

#[test]
fn insert_inside_remote_delete_moves_to_its_start() {
    let local = Operation::insert(3, "X", "a");
    let remote = Operation::delete(1, "ell", "b");
    let out = transform(&local, &remote);
    assert_eq!(out, vec![Operation::insert(1, "X", "a")]);
    let (a, b) = converge("hello", &local, &remote);
    assert_eq!(a, b);
    assert_eq!(a, "hXo");
}

#[test]
fn delete_spanning_remote_insert_is_split() {
    let local = Operation::delete(1, "ell", "a");
    let remote = Operation::insert(3, "XY", "b");
    let out = transform(&local, &remote);
    assert_eq!(
        out,
        vec![Operation::delete(1, "el", "a"), Operation::delete(3, "l", "a")]
    );
    let (a, b) = converge("hello", &local, &remote);
    assert_eq!(a, b);
    assert_eq!(a, "hXYo");
}

#[test]
fn insert_at_delete_end_survives() {
    let local = Operation::insert(4, "!", "a");
    let remote = Operation::delete(1, "ell", "b");
    let (a, b) = converge("hello", &local, &remote);
    assert_eq!(a, b);
    assert_eq!(a, "h!o");
}

// ── transform: delete / delete ───────────────────────────────────

#[test]
fn overlapping_deletes_remove_union_once() {
    let local = Operation::delete(1, "ell", "a");
    let remote = Operation::delete(2, "llo", "b");
    let (a, b) = converge("hello!", &local, &remote);
    assert_eq!(a, b);
    assert_eq!(a, "h!");
}

#[test]
fn identical_deletes_become_noop() {
    let local = Operation::delete(1, "ell", "a");
    let remote = Operation::delete(1, "ell", "b");
    assert!(transform(&local, &remote).is_empty());
    let (a, b) = converge("hello", &local, &remote);
    assert_eq!(a, "ho");
    assert_eq!(b, "ho");
}

#[test]
fn contained_delete_keeps_outer_remainder() {
    let local = Operation::delete(0, "hello", "a");
    let remote = Operation::delete(1, "ell", "b");
    assert_eq!(transform(&local, &remote), vec![Operation::delete(0, "ho", "a")]);
}

#[test]
fn noop_operations_vanish() {
    let empty = Operation::insert(0, "", "a");
    let other = Operation::delete(0, "he", "b");
    assert!(transform(&empty, &other).is_empty());
    assert_eq!(transform(&other, &empty), vec![other.clone()]);
}

// ── sequences ────────────────────────────────────────────────────

#[test]
fn sequences_converge() {
    let base = "the quick fox";
    let local = vec![
        Operation::insert(4, "very ", "a"),
        Operation::delete(15, "fox", "a"),
        Operation::insert(15, "dog", "a"),
    ];
    let remote = vec![Operation::delete(0, "the ", "b"), Operation::insert(9, "!", "b")];
    let (local_t, remote_t) = transform_sequences(&local, &remote);

    let via_remote = apply_all(&apply_all(base, &remote).unwrap(), &local_t).unwrap();
    let via_local = apply_all(&apply_all(base, &local).unwrap(), &remote_t).unwrap();
    assert_eq!(via_remote, via_local);
}

#[test]
fn empty_sequence_passes_other_through() {
    let ops = vec![Operation::insert(0, "x", "a")];
    let (l, r) = transform_sequences(&[], &ops);
    assert!(l.is_empty());
    assert_eq!(r, ops);
}

// ── diff / merge ─────────────────────────────────────────────────

#[test]
fn diff_is_minimal_replace() {
    let ops = diff("hello world", "hello brave world", "a");
    assert_eq!(ops, vec![Operation::insert(6, "brave ", "a")]);

    let ops = diff("abcdef", "abXYef", "a");
    assert_eq!(ops.len(), 2);
    assert_eq!(ops[0].kind, OperationKind::Delete);
    assert_eq!(ops[0].text, "cd");
    assert_eq!(ops[1].kind, OperationKind::Insert);
    assert_eq!(ops[1].text, "XY");
    assert_eq!(apply_all("abcdef", &ops).unwrap(), "abXYef");
}

#[test]
fn diff_of_equal_strings_is_empty() {
    assert!(diff("same", "same", "a").is_empty());
}

#[test]
fn diff_handles_repeated_chars() {
    let ops = diff("aaa", "aa", "a");
    assert_eq!(apply_all("aaa", &ops).unwrap(), "aa");
}

#[test]
fn merge_text_keeps_both_edits() {
    let merged = merge_text(
        "hello world",
        "hello brave world",
        "hello World",
        "alice",
        "bob",
    )
    .unwrap();
    assert_eq!(merged, "hello brave World");
}

#[test]
fn merge_text_with_one_side_unchanged() {
    let merged = merge_text("draft", "draft", "final draft", "a", "b").unwrap();
    assert_eq!(merged, "final draft");
}
