//! Series/artist/role lookup repository.
//!
//! # Responsibility
//! - Persist the records that comic books and credits point at.
//! - Provide the ordered selection lists used by add/edit flows.
//!
//! # Invariants
//! - Titles and names are trimmed and must not be blank.
//! - Lists are deterministic: `title|name ASC, id ASC`.
//! - No delete path exists for series; referenced series stay put.

use crate::model::catalog::{Artist, ArtistId, Role, RoleId};
use crate::model::series::{Series, SeriesId};
use crate::repo::error::{RecordValidationError, RepoResult};
use crate::repo::readiness::ensure_table;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Repository interface for catalog lookup records.
pub trait CatalogRepository {
    /// Inserts one series and writes the assigned id back onto it.
    fn insert_series(&self, series: &mut Series) -> RepoResult<SeriesId>;
    /// Loads one series by id.
    fn get_series(&self, id: SeriesId) -> RepoResult<Option<Series>>;
    /// Lists all series by title.
    fn list_series(&self) -> RepoResult<Vec<Series>>;
    /// Inserts one artist and writes the assigned id back onto it.
    fn insert_artist(&self, artist: &mut Artist) -> RepoResult<ArtistId>;
    /// Lists all artists by name.
    fn list_artists(&self) -> RepoResult<Vec<Artist>>;
    /// Inserts one role and writes the assigned id back onto it.
    fn insert_role(&self, role: &mut Role) -> RepoResult<RoleId>;
    /// Lists all roles by name.
    fn list_roles(&self) -> RepoResult<Vec<Role>>;
}

/// SQLite-backed catalog lookup repository.
pub struct SqliteCatalogRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCatalogRepository<'conn> {
    /// Constructs a repository from a connection with the catalog schema.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table(conn, "series", &["id", "title"])?;
        ensure_table(conn, "artists", &["id", "name"])?;
        ensure_table(conn, "roles", &["id", "name"])?;
        Ok(Self { conn })
    }

    fn insert_named(&self, table: &str, column: &str, value: &str) -> RepoResult<i64> {
        self.conn.execute(
            &format!("INSERT INTO {table} ({column}) VALUES (?1);"),
            [value],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!("event=catalog_insert module=repo status=ok table={table} id={id}");
        Ok(id)
    }
}

impl CatalogRepository for SqliteCatalogRepository<'_> {
    fn insert_series(&self, series: &mut Series) -> RepoResult<SeriesId> {
        let title = required_name("series.title", &series.title)?;
        series.id = self.insert_named("series", "title", &title)?;
        series.title = title;
        Ok(series.id)
    }

    fn get_series(&self, id: SeriesId) -> RepoResult<Option<Series>> {
        let series = self
            .conn
            .query_row(
                "SELECT id, title FROM series WHERE id = ?1;",
                params![id],
                parse_series_row,
            )
            .optional()?;
        Ok(series)
    }

    fn list_series(&self) -> RepoResult<Vec<Series>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, title FROM series ORDER BY title ASC, id ASC;")?;
        let rows = stmt.query_map([], parse_series_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn insert_artist(&self, artist: &mut Artist) -> RepoResult<ArtistId> {
        let name = required_name("artist.name", &artist.name)?;
        artist.id = self.insert_named("artists", "name", &name)?;
        artist.name = name;
        Ok(artist.id)
    }

    fn list_artists(&self) -> RepoResult<Vec<Artist>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM artists ORDER BY name ASC, id ASC;")?;
        let rows = stmt.query_map([], |row| {
            Ok(Artist {
                id: row.get("id")?,
                name: row.get("name")?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn insert_role(&self, role: &mut Role) -> RepoResult<RoleId> {
        let name = required_name("role.name", &role.name)?;
        role.id = self.insert_named("roles", "name", &name)?;
        role.name = name;
        Ok(role.id)
    }

    fn list_roles(&self) -> RepoResult<Vec<Role>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM roles ORDER BY name ASC, id ASC;")?;
        let rows = stmt.query_map([], |row| {
            Ok(Role {
                id: row.get("id")?,
                name: row.get("name")?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn parse_series_row(row: &Row<'_>) -> rusqlite::Result<Series> {
    Ok(Series {
        id: row.get("id")?,
        title: row.get("title")?,
    })
}

fn required_name(field: &'static str, value: &str) -> Result<String, RecordValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RecordValidationError::BlankName { field });
    }
    Ok(trimmed.to_string())
}
