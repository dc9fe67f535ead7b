//! Convergent merge primitives for Verso.
//!
//! - [`LWWRegister<T>`]: Last-Writer-Wins Register for single values
//! - [`LwwMap`]: one register per key, for scalar content state
//! - [`text_ot`]: operational transform for concurrent text edits
//!
//! Register and map merges satisfy:
//! - **Commutative**: merge(a, b) == merge(b, a)
//! - **Associative**: merge(merge(a, b), c) == merge(a, merge(b, c))
//! - **Idempotent**: merge(a, a) == a
//!
//! Text transforms satisfy the convergence property: applying either edit
//! first and then the other transformed against it yields the same string.

mod lww_map;
mod lww_register;
pub mod text_ot;

pub use lww_map::LwwMap;
pub use lww_register::LWWRegister;
pub use text_ot::{Operation, OperationKind, OtError, OtResult};
