//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the data access contract for generic table records.
//! - Isolate SQLite query details from callers.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`Validation`, `Config`) in
//!   addition to driver errors.

pub mod record_repo;
