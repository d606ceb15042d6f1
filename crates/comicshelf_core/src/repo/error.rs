//! Repository error taxonomy shared by all catalog repositories.

use crate::db::DbError;
use crate::model::comic_book::ComicBookId;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Record-level validation failure raised before any SQL mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordValidationError {
    /// A required display name (series title, artist/role name) is blank.
    BlankName { field: &'static str },
}

impl Display for RecordValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName { field } => write!(f, "{field} must not be blank"),
        }
    }
}

impl Error for RecordValidationError {}

/// Error for catalog persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Record failed validation; nothing was written.
    Validation(RecordValidationError),
    /// Identifying key is absent or malformed; storage was not touched.
    BadRequest(String),
    /// Storage failure, carried unmodified.
    Db(DbError),
    /// An update or delete addressed a row that does not exist.
    RowNotAffected {
        operation: &'static str,
        id: ComicBookId,
    },
    /// Connection does not expose a required catalog table.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data cannot be converted to a valid record.
    InvalidData(String),
}

impl RepoError {
    /// Whether this error is the storage unique-index rejection.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::Db(err) => {
                err.sqlite_extended_code() == Some(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE)
            }
            _ => false,
        }
    }

    /// Whether this error happened in storage (as opposed to caller input).
    pub fn is_storage_failure(&self) -> bool {
        matches!(self, Self::Db(_) | Self::RowNotAffected { .. })
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::BadRequest(message) => write!(f, "bad request: {message}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::RowNotAffected { operation, id } => {
                write!(f, "{operation} affected no row for comic book {id}")
            }
            Self::MissingRequiredTable(table) => {
                write!(f, "catalog repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "catalog repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted catalog data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RecordValidationError> for RepoError {
    fn from(value: RecordValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
