//! Operational transform over flat text.
//!
//! Concurrent edits to the same text field are expressed as [`Operation`]s
//! against a shared base string. [`transform`] rewrites a local operation so
//! it can be applied after a concurrent remote one, such that
//!
//! ```text
//! apply(apply(S, R), transform(L, R)) == apply(apply(S, L), transform(R, L))
//! ```
//!
//! Positions and lengths count chars (Unicode scalar values), never bytes.
//!
//! # Example
//!
//! ```
//! use verso_crdt::text_ot::{apply_all, transform, Operation};
//!
//! let base = "hello";
//! let local = Operation::insert(2, "X", "alice");
//! let remote = Operation::insert(2, "Y", "bob");
//!
//! let via_remote = apply_all(&remote.apply(base).unwrap(), &transform(&local, &remote)).unwrap();
//! let via_local = apply_all(&local.apply(base).unwrap(), &transform(&remote, &local)).unwrap();
//! assert_eq!(via_remote, via_local);
//! assert_eq!(via_local, "heXYllo");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for text operations.
pub type OtResult<T> = Result<T, OtError>;

/// Errors raised when an operation does not fit the text it is applied to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OtError {
    /// Position (or delete end) lies past the end of the text.
    #[error("position {position} out of bounds for text of length {len}")]
    OutOfBounds { position: usize, len: usize },

    /// A delete's recorded text does not match what is in the document.
    #[error("delete at {position} expected {expected:?} but found {found:?}")]
    Mismatch {
        position: usize,
        expected: String,
        found: String,
    },
}

/// Whether an operation adds or removes text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Insert,
    Delete,
}

/// A single text edit.
///
/// For a delete, `text` is the exact run being removed starting at
/// `position`; its length is the delete length.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Operation {
    pub kind: OperationKind,
    pub position: usize,
    pub text: String,
    /// Who produced the edit. Orders co-located concurrent inserts.
    pub origin_id: String,
}

impl Operation {
    /// An insert of `text` before char `position`.
    #[must_use]
    pub fn insert(position: usize, text: impl Into<String>, origin_id: impl Into<String>) -> Self {
        Self {
            kind: OperationKind::Insert,
            position,
            text: text.into(),
            origin_id: origin_id.into(),
        }
    }

    /// A delete of `text`, which must currently start at char `position`.
    #[must_use]
    pub fn delete(position: usize, text: impl Into<String>, origin_id: impl Into<String>) -> Self {
        Self {
            kind: OperationKind::Delete,
            position,
            text: text.into(),
            origin_id: origin_id.into(),
        }
    }

    /// Length of the affected run in chars.
    #[must_use]
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    /// An operation with empty text changes nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.text.is_empty()
    }

    fn end(&self) -> usize {
        self.position + self.len()
    }

    fn with_position(&self, position: usize) -> Self {
        Self {
            position,
            ..self.clone()
        }
    }

    fn with_span(&self, position: usize, text: String) -> Self {
        Self {
            kind: self.kind,
            position,
            text,
            origin_id: self.origin_id.clone(),
        }
    }

    /// Deterministic order for co-located inserts: lower origin first, then
    /// lower text. Fully identical inserts order neither way.
    fn precedes(&self, other: &Self) -> bool {
        (&self.origin_id, &self.text) < (&other.origin_id, &other.text)
    }

    /// Applies this operation to `text`, returning the edited string.
    pub fn apply(&self, text: &str) -> OtResult<String> {
        let len = text.chars().count();
        let start = byte_offset(text, self.position).ok_or(OtError::OutOfBounds {
            position: self.position,
            len,
        })?;

        match self.kind {
            OperationKind::Insert => {
                let mut out = String::with_capacity(text.len() + self.text.len());
                out.push_str(&text[..start]);
                out.push_str(&self.text);
                out.push_str(&text[start..]);
                Ok(out)
            }
            OperationKind::Delete => {
                let end = byte_offset(text, self.end()).ok_or(OtError::OutOfBounds {
                    position: self.end(),
                    len,
                })?;
                let found = &text[start..end];
                if found != self.text {
                    return Err(OtError::Mismatch {
                        position: self.position,
                        expected: self.text.clone(),
                        found: found.to_string(),
                    });
                }
                let mut out = String::with_capacity(text.len() - found.len());
                out.push_str(&text[..start]);
                out.push_str(&text[end..]);
                Ok(out)
            }
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.kind {
            OperationKind::Insert => "ins",
            OperationKind::Delete => "del",
        };
        write!(f, "{verb}@{}{:?}[{}]", self.position, self.text, self.origin_id)
    }
}

/// Byte offset of char index `idx`, or `None` if past the end.
fn byte_offset(s: &str, idx: usize) -> Option<usize> {
    s.char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(s.len()))
        .nth(idx)
}

/// Chars `[from, to)` of `s`.
fn char_slice(s: &str, from: usize, to: usize) -> String {
    s.chars().skip(from).take(to.saturating_sub(from)).collect()
}

/// Applies operations in order.
pub fn apply_all(text: &str, ops: &[Operation]) -> OtResult<String> {
    ops.iter()
        .try_fold(text.to_string(), |acc, op| op.apply(&acc))
}

/// Rewrites `local` so it applies after the concurrent `remote`.
///
/// Both operations must be expressed against the same base string. The
/// result is a sequence because a delete that spans a concurrent insert is
/// split around it, and a delete fully covered by the remote delete
/// disappears.
#[must_use]
pub fn transform(local: &Operation, remote: &Operation) -> Vec<Operation> {
    use OperationKind::{Delete, Insert};

    if local.is_noop() {
        return Vec::new();
    }
    if remote.is_noop() {
        return vec![local.clone()];
    }

    match (local.kind, remote.kind) {
        (Insert, Insert) => {
            let shift = local.position > remote.position
                || (local.position == remote.position && !local.precedes(remote));
            if shift {
                vec![local.with_position(local.position + remote.len())]
            } else {
                vec![local.clone()]
            }
        }
        (Insert, Delete) => {
            let (rs, re) = (remote.position, remote.end());
            if local.position <= rs {
                vec![local.clone()]
            } else if local.position >= re {
                vec![local.with_position(local.position - remote.len())]
            } else {
                // Inside the deleted run: survive at its start.
                vec![local.with_position(rs)]
            }
        }
        (Delete, Insert) => {
            let (ls, le) = (local.position, local.end());
            let at = remote.position;
            if at <= ls {
                vec![local.with_position(ls + remote.len())]
            } else if at >= le {
                vec![local.clone()]
            } else {
                // Keep the inserted text: delete either side of it.
                let cut = at - ls;
                let total = local.len();
                vec![
                    local.with_span(ls, char_slice(&local.text, 0, cut)),
                    local.with_span(ls + remote.len(), char_slice(&local.text, cut, total)),
                ]
            }
        }
        (Delete, Delete) => {
            let (ls, le) = (local.position, local.end());
            let (rs, re) = (remote.position, remote.end());
            if le <= rs {
                vec![local.clone()]
            } else if ls >= re {
                vec![local.with_position(ls - remote.len())]
            } else {
                // Overlap: only delete what the remote left behind.
                let mut kept = String::new();
                if ls < rs {
                    kept.push_str(&char_slice(&local.text, 0, rs - ls));
                }
                if le > re {
                    kept.push_str(&char_slice(&local.text, re - ls, le - ls));
                }
                if kept.is_empty() {
                    Vec::new()
                } else {
                    vec![local.with_span(ls.min(rs), kept)]
                }
            }
        }
    }
}

/// Transforms two concurrent operation sequences against each other.
///
/// Returns `(local', remote')` where `local'` applies after all of `remote`
/// and `remote'` applies after all of `local`.
#[must_use]
pub fn transform_sequences(
    local: &[Operation],
    remote: &[Operation],
) -> (Vec<Operation>, Vec<Operation>) {
    if local.is_empty() || remote.is_empty() {
        return (local.to_vec(), remote.to_vec());
    }

    if local.len() == 1 && remote.len() == 1 {
        return (
            transform(&local[0], &remote[0]),
            transform(&remote[0], &local[0]),
        );
    }

    if local.len() > 1 {
        let (head, remote_after_head) = transform_sequences(&local[..1], remote);
        let (tail, remote_after_all) = transform_sequences(&local[1..], &remote_after_head);
        let mut local_out = head;
        local_out.extend(tail);
        return (local_out, remote_after_all);
    }

    let (local_after_head, head) = transform_sequences(local, &remote[..1]);
    let (local_out, tail) = transform_sequences(&local_after_head, &remote[1..]);
    let mut remote_out = head;
    remote_out.extend(tail);
    (local_out, remote_out)
}

/// Derives the operations turning `old` into `new`.
///
/// Produces at most one delete followed by one insert, covering the span
/// between the common prefix and the common suffix.
#[must_use]
pub fn diff(old: &str, new: &str, origin_id: &str) -> Vec<Operation> {
    let old_chars: Vec<char> = old.chars().collect();
    let new_chars: Vec<char> = new.chars().collect();

    let prefix = old_chars
        .iter()
        .zip(&new_chars)
        .take_while(|(a, b)| a == b)
        .count();
    let max_suffix = old_chars.len().min(new_chars.len()) - prefix;
    let suffix = old_chars
        .iter()
        .rev()
        .zip(new_chars.iter().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a == b)
        .count();

    let removed: String = old_chars[prefix..old_chars.len() - suffix].iter().collect();
    let added: String = new_chars[prefix..new_chars.len() - suffix].iter().collect();

    let mut ops = Vec::with_capacity(2);
    if !removed.is_empty() {
        ops.push(Operation::delete(prefix, removed, origin_id));
    }
    if !added.is_empty() {
        ops.push(Operation::insert(prefix, added, origin_id));
    }
    ops
}

/// Three-way text merge.
///
/// Both `ours` and `theirs` descend from `ancestor`. Their edits are
/// transformed against each other and applied on top of `ours`, so neither
/// side's change is dropped.
pub fn merge_text(
    ancestor: &str,
    ours: &str,
    theirs: &str,
    our_origin: &str,
    their_origin: &str,
) -> OtResult<String> {
    let our_ops = diff(ancestor, ours, our_origin);
    let their_ops = diff(ancestor, theirs, their_origin);
    let (_, theirs_after_ours) = transform_sequences(&our_ops, &their_ops);
    apply_all(ours, &theirs_after_ours)
}
