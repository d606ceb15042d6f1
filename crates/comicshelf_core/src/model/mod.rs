//! Entity graph for the comic book catalog.
//!
//! # Responsibility
//! - Define the plain records persisted by the repository layer.
//! - Connect records through integer keys instead of live references.
//!
//! # Invariants
//! - An id of `0` means "not yet persisted"; storage assigns the real id.
//! - Related records (`series`, credit `artist`/`role`) are read-only
//!   snapshots filled by eager loading and are never written back.

pub mod catalog;
pub mod comic_book;
pub mod series;
