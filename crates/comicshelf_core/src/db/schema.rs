//! Catalog schema definition and bootstrap.
//!
//! # Invariants
//! - `(series_id, issue_number)` is backed by a unique index.
//! - Credits are owned by their comic book and cascade on delete.
//! - Series rows referenced by a comic book cannot be deleted.

use crate::db::DbResult;
use rusqlite::Connection;

const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Tables every catalog connection must expose, in dependency order.
pub const CATALOG_TABLES: &[&str] = &["series", "comic_books", "artists", "roles", "credits"];

/// Applies the catalog schema on the provided connection.
///
/// Safe to call repeatedly; existing tables and indexes are left untouched.
pub fn apply_schema(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
