//! Schema-less row model.
//!
//! # Responsibility
//! - Define the record shape shared by every repository operation.
//!
//! # Invariants
//! - Records carry scalar values only.

pub mod record;
