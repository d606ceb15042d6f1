//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository reads return `Ok(None)` for missing rows, never an error.
//! - Bad identifying keys are rejected before any SQL runs.
//! - Storage errors are wrapped without being rewritten.

pub mod catalog_repo;
pub mod comic_book_repo;
pub mod error;
mod readiness;
