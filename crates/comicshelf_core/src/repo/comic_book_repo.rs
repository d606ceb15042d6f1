//! Comic book repository: eager-loading reads and a unit-of-work write path.
//!
//! # Responsibility
//! - Shape reads (which related records are materialized, in which order).
//! - Stage inserts/updates/patches/deletes and flush them in one transaction.
//! - Answer the `(series_id, issue_number)` availability question.
//!
//! # Invariants
//! - Listing order is `series.title ASC, issue_number ASC, id ASC`.
//! - Detail credits are ordered by `role.name ASC, credit.id ASC`.
//! - `commit` is all-or-nothing for everything staged since the last commit.
//! - Storage failures propagate unmodified and are never retried here.
//! - The repository does not re-check issue number availability on write;
//!   the storage unique index is the authoritative rejection.

use crate::model::catalog::{Artist, Role};
use crate::model::comic_book::{ComicBook, ComicBookId, Credit, CreditId};
use crate::model::series::{Series, SeriesId};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::readiness::ensure_table;
use log::{debug, error, info};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use std::time::Instant;

const COMIC_BOOK_SELECT_SQL: &str = "SELECT
    cb.id AS id,
    cb.series_id AS series_id,
    cb.issue_number AS issue_number,
    cb.description AS description,
    cb.published_on AS published_on,
    s.title AS series_title
FROM comic_books cb
LEFT JOIN series s ON s.id = cb.series_id";

/// Lifecycle of the changes held by one repository instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOfWorkState {
    /// Nothing staged and nothing committed yet.
    Idle,
    /// At least one change is staged.
    PendingChanges,
    /// The last commit succeeded.
    Committed,
    /// The last commit failed and was rolled back.
    Failed,
}

/// Related records to materialize when loading one comic book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComicBookLoad {
    pub series: bool,
    /// Credits with their artist and role.
    pub credits: bool,
}

impl ComicBookLoad {
    /// Only the comic book row.
    pub const BARE: Self = Self {
        series: false,
        credits: false,
    };
    /// Row plus its series.
    pub const WITH_SERIES: Self = Self {
        series: true,
        credits: false,
    };
    /// Row, series, and role-ordered credits.
    pub const DETAIL: Self = Self {
        series: true,
        credits: true,
    };
}

/// Sparse update: only `Some` fields are written.
///
/// Nullable columns use `Some(None)` to clear the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComicBookPatch {
    pub series_id: Option<SeriesId>,
    pub issue_number: Option<i64>,
    pub description: Option<Option<String>>,
    pub published_on: Option<Option<i64>>,
}

impl ComicBookPatch {
    pub fn is_empty(&self) -> bool {
        self.series_id.is_none()
            && self.issue_number.is_none()
            && self.description.is_none()
            && self.published_on.is_none()
    }

    /// Applies the patch to an in-memory copy.
    pub fn apply_to(&self, comic_book: &mut ComicBook) {
        if let Some(series_id) = self.series_id {
            comic_book.series_id = series_id;
        }
        if let Some(issue_number) = self.issue_number {
            comic_book.issue_number = issue_number;
        }
        if let Some(description) = &self.description {
            comic_book.description = description.clone();
        }
        if let Some(published_on) = self.published_on {
            comic_book.published_on = published_on;
        }
    }

    fn assignments(&self) -> (Vec<&'static str>, Vec<Value>) {
        let mut columns = Vec::new();
        let mut values = Vec::new();
        if let Some(series_id) = self.series_id {
            columns.push("series_id");
            values.push(Value::Integer(series_id));
        }
        if let Some(issue_number) = self.issue_number {
            columns.push("issue_number");
            values.push(Value::Integer(issue_number));
        }
        if let Some(description) = &self.description {
            columns.push("description");
            values.push(description.clone().map_or(Value::Null, Value::Text));
        }
        if let Some(published_on) = self.published_on {
            columns.push("published_on");
            values.push(published_on.map_or(Value::Null, Value::Integer));
        }
        (columns, values)
    }
}

/// Per-change result of a successful commit, in staging order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommittedChange {
    Inserted {
        comic_book_id: ComicBookId,
        /// Ids assigned to the previously unsaved credits, in list order.
        credit_ids: Vec<CreditId>,
    },
    Updated {
        comic_book_id: ComicBookId,
        credit_ids: Vec<CreditId>,
    },
    Patched {
        comic_book_id: ComicBookId,
    },
    Deleted {
        comic_book_id: ComicBookId,
    },
}

/// Summary returned by `commit`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitOutcome {
    pub changes: Vec<CommittedChange>,
}

#[derive(Debug, Clone)]
enum PendingChange {
    Insert(ComicBook),
    Update(ComicBook),
    Patch {
        id: ComicBookId,
        patch: ComicBookPatch,
    },
    Delete(ComicBook),
}

impl PendingChange {
    fn kind(&self) -> &'static str {
        match self {
            Self::Insert(_) => "insert",
            Self::Update(_) => "update",
            Self::Patch { .. } => "patch",
            Self::Delete(_) => "delete",
        }
    }
}

/// Repository interface for comic book reads and unit-of-work writes.
pub trait ComicBookRepository {
    /// Lists every comic book with its series, ordered for display.
    fn list_comic_books(&self) -> RepoResult<Vec<ComicBook>>;

    /// Loads one comic book with series and role-ordered credits.
    ///
    /// Absent or non-positive ids are rejected with `BadRequest` before
    /// storage is queried. A missing row yields `Ok(None)`.
    fn get_comic_book(&self, id: Option<ComicBookId>) -> RepoResult<Option<ComicBook>>;

    /// Loads one comic book materializing only what `load` asks for.
    fn get_comic_book_with(
        &self,
        id: ComicBookId,
        load: ComicBookLoad,
    ) -> RepoResult<Option<ComicBook>>;

    /// Returns whether another comic book already uses this series/issue pair.
    ///
    /// Pass `comic_book_id = 0` for unsaved comic books.
    fn is_issue_number_taken(
        &self,
        comic_book_id: ComicBookId,
        series_id: SeriesId,
        issue_number: i64,
    ) -> RepoResult<bool>;

    /// Stages an unsaved comic book and its unsaved credits for insertion.
    fn stage_insert(&mut self, comic_book: &ComicBook) -> RepoResult<()>;
    /// Stages a full-row overwrite plus insertion of unsaved credits.
    fn stage_update(&mut self, comic_book: &ComicBook) -> RepoResult<()>;
    /// Stages a targeted update of the patch's fields only.
    fn stage_patch(&mut self, id: ComicBookId, patch: &ComicBookPatch) -> RepoResult<()>;
    /// Stages removal of the row addressed by `id` and its credits.
    fn stage_delete(&mut self, id: ComicBookId) -> RepoResult<()>;
    /// Flushes all staged changes in a single transaction.
    fn commit(&mut self) -> RepoResult<CommitOutcome>;
    fn state(&self) -> UnitOfWorkState;
    fn pending_count(&self) -> usize;

    /// Inserts a comic book and commits.
    ///
    /// On success the assigned ids are written back onto `comic_book` and
    /// its previously unsaved credits.
    fn insert(&mut self, comic_book: &mut ComicBook) -> RepoResult<ComicBookId> {
        self.stage_insert(comic_book)?;
        let outcome = self.commit()?;
        let (comic_book_id, credit_ids) = outcome
            .changes
            .iter()
            .rev()
            .find_map(|change| match change {
                CommittedChange::Inserted {
                    comic_book_id,
                    credit_ids,
                } => Some((*comic_book_id, credit_ids.as_slice())),
                _ => None,
            })
            .ok_or_else(|| {
                RepoError::InvalidData("commit outcome has no inserted comic book".to_string())
            })?;
        assign_identities(comic_book, comic_book_id, credit_ids);
        Ok(comic_book_id)
    }

    /// Overwrites every scalar column of the addressed row and commits.
    ///
    /// Fields the caller never set are written as their defaults; callers
    /// must pass the complete desired field set. Use `apply_patch` for a
    /// targeted update.
    fn mark_for_update(&mut self, comic_book: &mut ComicBook) -> RepoResult<()> {
        self.stage_update(comic_book)?;
        let outcome = self.commit()?;
        let credit_ids = outcome
            .changes
            .iter()
            .rev()
            .find_map(|change| match change {
                CommittedChange::Updated {
                    comic_book_id,
                    credit_ids,
                } if *comic_book_id == comic_book.id => Some(credit_ids.as_slice()),
                _ => None,
            })
            .unwrap_or_default();
        let id = comic_book.id;
        assign_identities(comic_book, id, credit_ids);
        Ok(())
    }

    /// Writes only the patch's fields to the addressed row and commits.
    fn apply_patch(&mut self, id: ComicBookId, patch: &ComicBookPatch) -> RepoResult<()> {
        self.stage_patch(id, patch)?;
        self.commit()?;
        Ok(())
    }

    /// Deletes the addressed row without reading it first, and commits.
    ///
    /// A missing row surfaces as `RowNotAffected` at commit time.
    fn mark_for_delete(&mut self, id: ComicBookId) -> RepoResult<()> {
        self.stage_delete(id)?;
        self.commit()?;
        Ok(())
    }
}

/// SQLite-backed comic book repository over a caller-owned connection.
///
/// One instance models one unit of work; it is not meant to be shared.
pub struct SqliteComicBookRepository<'conn> {
    conn: &'conn Connection,
    pending: Vec<PendingChange>,
    state: UnitOfWorkState,
}

impl<'conn> SqliteComicBookRepository<'conn> {
    /// Constructs a repository from a connection with the catalog schema.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table(conn, "series", &["id", "title"])?;
        ensure_table(
            conn,
            "comic_books",
            &["id", "series_id", "issue_number", "description", "published_on"],
        )?;
        ensure_table(conn, "artists", &["id", "name"])?;
        ensure_table(conn, "roles", &["id", "name"])?;
        ensure_table(conn, "credits", &["id", "comic_book_id", "artist_id", "role_id"])?;
        Ok(Self {
            conn,
            pending: Vec::new(),
            state: UnitOfWorkState::Idle,
        })
    }

    fn stage(&mut self, change: PendingChange) {
        let kind = change.kind();
        self.pending.push(change);
        self.state = UnitOfWorkState::PendingChanges;
        debug!(
            "event=uow_stage module=repo status=ok kind={} pending={}",
            kind,
            self.pending.len()
        );
    }
}

impl ComicBookRepository for SqliteComicBookRepository<'_> {
    fn list_comic_books(&self) -> RepoResult<Vec<ComicBook>> {
        let mut stmt = self.conn.prepare(&format!(
            "{COMIC_BOOK_SELECT_SQL}
             ORDER BY s.title ASC, cb.issue_number ASC, cb.id ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut comic_books = Vec::new();
        while let Some(row) = rows.next()? {
            comic_books.push(parse_comic_book_row(row, true)?);
        }
        Ok(comic_books)
    }

    fn get_comic_book(&self, id: Option<ComicBookId>) -> RepoResult<Option<ComicBook>> {
        let id =
            id.ok_or_else(|| RepoError::BadRequest("comic book id is required".to_string()))?;
        self.get_comic_book_with(id, ComicBookLoad::DETAIL)
    }

    fn get_comic_book_with(
        &self,
        id: ComicBookId,
        load: ComicBookLoad,
    ) -> RepoResult<Option<ComicBook>> {
        ensure_persisted_id(id)?;

        let mut stmt = self.conn.prepare(&format!(
            "{COMIC_BOOK_SELECT_SQL}
             WHERE cb.id = ?1;"
        ))?;
        let mut rows = stmt.query(params![id])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };

        let mut comic_book = parse_comic_book_row(row, load.series)?;
        if load.credits {
            comic_book.credits = load_credits(self.conn, id)?;
        }
        Ok(Some(comic_book))
    }

    fn is_issue_number_taken(
        &self,
        comic_book_id: ComicBookId,
        series_id: SeriesId,
        issue_number: i64,
    ) -> RepoResult<bool> {
        let taken: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM comic_books
                WHERE id <> ?1
                  AND series_id = ?2
                  AND issue_number = ?3
            );",
            params![comic_book_id, series_id, issue_number],
            |row| row.get(0),
        )?;
        debug!(
            "event=issue_number_check module=repo status=ok series_id={} issue_number={} taken={}",
            series_id,
            issue_number,
            taken == 1
        );
        Ok(taken == 1)
    }

    fn stage_insert(&mut self, comic_book: &ComicBook) -> RepoResult<()> {
        if comic_book.id != 0 {
            return Err(RepoError::BadRequest(format!(
                "insert requires an unsaved comic book, got id {}",
                comic_book.id
            )));
        }
        self.stage(PendingChange::Insert(comic_book.clone()));
        Ok(())
    }

    fn stage_update(&mut self, comic_book: &ComicBook) -> RepoResult<()> {
        ensure_persisted_id(comic_book.id)?;
        self.stage(PendingChange::Update(comic_book.clone()));
        Ok(())
    }

    fn stage_patch(&mut self, id: ComicBookId, patch: &ComicBookPatch) -> RepoResult<()> {
        ensure_persisted_id(id)?;
        if patch.is_empty() {
            return Err(RepoError::BadRequest(format!(
                "patch for comic book {id} has no fields"
            )));
        }
        self.stage(PendingChange::Patch {
            id,
            patch: patch.clone(),
        });
        Ok(())
    }

    fn stage_delete(&mut self, id: ComicBookId) -> RepoResult<()> {
        ensure_persisted_id(id)?;
        self.stage(PendingChange::Delete(ComicBook::placeholder(id)));
        Ok(())
    }

    fn commit(&mut self) -> RepoResult<CommitOutcome> {
        if self.pending.is_empty() {
            return Ok(CommitOutcome::default());
        }

        let started_at = Instant::now();
        let changes = std::mem::take(&mut self.pending);
        match flush(self.conn, &changes) {
            Ok(outcome) => {
                self.state = UnitOfWorkState::Committed;
                info!(
                    "event=uow_commit module=repo status=ok changes={} duration_ms={}",
                    outcome.changes.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(outcome)
            }
            Err(err) => {
                self.state = UnitOfWorkState::Failed;
                error!(
                    "event=uow_commit module=repo status=error changes={} duration_ms={} error_code=commit_failed error={}",
                    changes.len(),
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    fn state(&self) -> UnitOfWorkState {
        self.state
    }

    fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

fn flush(conn: &Connection, changes: &[PendingChange]) -> RepoResult<CommitOutcome> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let mut outcome = CommitOutcome::default();

    for change in changes {
        let committed = match change {
            PendingChange::Insert(comic_book) => {
                tx.execute(
                    "INSERT INTO comic_books (
                        series_id,
                        issue_number,
                        description,
                        published_on
                    ) VALUES (?1, ?2, ?3, ?4);",
                    params![
                        comic_book.series_id,
                        comic_book.issue_number,
                        comic_book.description.as_deref(),
                        comic_book.published_on,
                    ],
                )?;
                let comic_book_id = tx.last_insert_rowid();
                let credit_ids = insert_unsaved_credits(&tx, comic_book_id, comic_book)?;
                CommittedChange::Inserted {
                    comic_book_id,
                    credit_ids,
                }
            }
            PendingChange::Update(comic_book) => {
                let changed = tx.execute(
                    "UPDATE comic_books
                     SET
                        series_id = ?2,
                        issue_number = ?3,
                        description = ?4,
                        published_on = ?5
                     WHERE id = ?1;",
                    params![
                        comic_book.id,
                        comic_book.series_id,
                        comic_book.issue_number,
                        comic_book.description.as_deref(),
                        comic_book.published_on,
                    ],
                )?;
                if changed == 0 {
                    return Err(RepoError::RowNotAffected {
                        operation: "update",
                        id: comic_book.id,
                    });
                }
                let credit_ids = insert_unsaved_credits(&tx, comic_book.id, comic_book)?;
                CommittedChange::Updated {
                    comic_book_id: comic_book.id,
                    credit_ids,
                }
            }
            PendingChange::Patch { id, patch } => {
                let (columns, mut values) = patch.assignments();
                let assignments = columns
                    .iter()
                    .map(|column| format!("{column} = ?"))
                    .collect::<Vec<_>>()
                    .join(", ");
                values.push(Value::Integer(*id));
                let changed = tx.execute(
                    &format!("UPDATE comic_books SET {assignments} WHERE id = ?;"),
                    params_from_iter(values),
                )?;
                if changed == 0 {
                    return Err(RepoError::RowNotAffected {
                        operation: "patch",
                        id: *id,
                    });
                }
                CommittedChange::Patched { comic_book_id: *id }
            }
            PendingChange::Delete(placeholder) => {
                tx.execute(
                    "DELETE FROM credits WHERE comic_book_id = ?1;",
                    params![placeholder.id],
                )?;
                let changed = tx.execute(
                    "DELETE FROM comic_books WHERE id = ?1;",
                    params![placeholder.id],
                )?;
                if changed == 0 {
                    return Err(RepoError::RowNotAffected {
                        operation: "delete",
                        id: placeholder.id,
                    });
                }
                CommittedChange::Deleted {
                    comic_book_id: placeholder.id,
                }
            }
        };
        outcome.changes.push(committed);
    }

    tx.commit()?;
    Ok(outcome)
}

fn insert_unsaved_credits(
    tx: &Transaction<'_>,
    comic_book_id: ComicBookId,
    comic_book: &ComicBook,
) -> RepoResult<Vec<CreditId>> {
    let mut credit_ids = Vec::new();
    for credit in comic_book.unsaved_credits() {
        tx.execute(
            "INSERT INTO credits (comic_book_id, artist_id, role_id) VALUES (?1, ?2, ?3);",
            params![comic_book_id, credit.artist_id, credit.role_id],
        )?;
        credit_ids.push(tx.last_insert_rowid());
    }
    Ok(credit_ids)
}

fn load_credits(conn: &Connection, comic_book_id: ComicBookId) -> RepoResult<Vec<Credit>> {
    let mut stmt = conn.prepare(
        "SELECT
            c.id AS id,
            c.comic_book_id AS comic_book_id,
            c.artist_id AS artist_id,
            c.role_id AS role_id,
            a.name AS artist_name,
            r.name AS role_name
         FROM credits c
         INNER JOIN artists a ON a.id = c.artist_id
         INNER JOIN roles r ON r.id = c.role_id
         WHERE c.comic_book_id = ?1
         ORDER BY r.name ASC, c.id ASC;",
    )?;
    let mut rows = stmt.query(params![comic_book_id])?;
    let mut credits = Vec::new();
    while let Some(row) = rows.next()? {
        let artist_id = row.get("artist_id")?;
        let role_id = row.get("role_id")?;
        credits.push(Credit {
            id: row.get("id")?,
            comic_book_id: row.get("comic_book_id")?,
            artist_id,
            role_id,
            artist: Some(Artist {
                id: artist_id,
                name: row.get("artist_name")?,
            }),
            role: Some(Role {
                id: role_id,
                name: row.get("role_name")?,
            }),
        });
    }
    Ok(credits)
}

fn parse_comic_book_row(row: &Row<'_>, with_series: bool) -> RepoResult<ComicBook> {
    let id: ComicBookId = row.get("id")?;
    let series_id: SeriesId = row.get("series_id")?;
    let series = if with_series {
        let title: Option<String> = row.get("series_title")?;
        let title = title.ok_or_else(|| {
            RepoError::InvalidData(format!(
                "comic book {id} references missing series {series_id}"
            ))
        })?;
        Some(Series {
            id: series_id,
            title,
        })
    } else {
        None
    };

    Ok(ComicBook {
        id,
        series_id,
        issue_number: row.get("issue_number")?,
        description: row.get("description")?,
        published_on: row.get("published_on")?,
        series,
        credits: Vec::new(),
    })
}

fn ensure_persisted_id(id: ComicBookId) -> RepoResult<()> {
    if id <= 0 {
        return Err(RepoError::BadRequest(format!(
            "comic book id must be positive, got {id}"
        )));
    }
    Ok(())
}

fn assign_identities(
    comic_book: &mut ComicBook,
    comic_book_id: ComicBookId,
    credit_ids: &[CreditId],
) {
    comic_book.id = comic_book_id;
    let unsaved = comic_book
        .credits
        .iter_mut()
        .filter(|credit| credit.id == 0);
    for (credit, credit_id) in unsaved.zip(credit_ids) {
        credit.id = *credit_id;
    }
    for credit in &mut comic_book.credits {
        credit.comic_book_id = comic_book_id;
    }
}
