//! Comic book use-case service.
//!
//! # Responsibility
//! - Run the add/edit/patch/delete workflows over a comic book repository.
//! - Report issue number collisions as field-level validation failures.
//!
//! # Invariants
//! - The availability check runs before any write is staged.
//! - A storage unique-index rejection maps to the same field failure as the
//!   pre-check, since the pre-check is racy across units of work.
//! - Other storage failures are returned unchanged inside `ServiceError::Repo`.

use crate::model::catalog::{ArtistId, RoleId};
use crate::model::comic_book::{ComicBook, ComicBookId};
use crate::repo::comic_book_repo::{ComicBookLoad, ComicBookPatch, ComicBookRepository};
use crate::repo::error::RepoError;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

const ISSUE_NUMBER_TAKEN_MESSAGE: &str =
    "The provided Issue Number has already been entered for the selected Series.";

/// Comic book field a validation failure is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComicBookField {
    IssueNumber,
}

impl ComicBookField {
    /// Stable field key for presentation layers.
    pub fn key(self) -> &'static str {
        match self {
            Self::IssueNumber => "ComicBook.IssueNumber",
        }
    }
}

/// Business-rule failure attached to one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: ComicBookField,
    pub message: String,
}

impl FieldError {
    fn issue_number_taken() -> Self {
        Self {
            field: ComicBookField::IssueNumber,
            message: ISSUE_NUMBER_TAKEN_MESSAGE.to_string(),
        }
    }
}

/// Service error for comic book use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Business rule rejected the input; nothing was written.
    Validation(FieldError),
    /// Target comic book does not exist.
    NotFound(ComicBookId),
    /// Persistence-layer failure or bad input, unchanged.
    Repo(RepoError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{}: {}", err.field.key(), err.message),
            Self::NotFound(id) => write!(f, "comic book not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        if value.is_unique_violation() {
            return Self::Validation(FieldError::issue_number_taken());
        }
        Self::Repo(value)
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Comic book service facade over repository implementations.
pub struct ComicBookService<R: ComicBookRepository> {
    repo: R,
}

impl<R: ComicBookRepository> ComicBookService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Returns the underlying repository.
    pub fn into_inner(self) -> R {
        self.repo
    }

    /// Lists comic books ordered by series title and issue number.
    pub fn list(&self) -> ServiceResult<Vec<ComicBook>> {
        Ok(self.repo.list_comic_books()?)
    }

    /// Loads one comic book with series and role-ordered credits.
    pub fn detail(&self, id: Option<ComicBookId>) -> ServiceResult<ComicBook> {
        self.repo
            .get_comic_book(id)?
            .ok_or(ServiceError::NotFound(id.unwrap_or_default()))
    }

    /// Loads one comic book with its series for a delete confirmation.
    pub fn delete_preview(&self, id: ComicBookId) -> ServiceResult<ComicBook> {
        self.repo
            .get_comic_book_with(id, ComicBookLoad::WITH_SERIES)?
            .ok_or(ServiceError::NotFound(id))
    }

    /// Checks availability, attaches the first credit, and inserts.
    ///
    /// Returns the assigned id; `comic_book` carries it afterwards. On any
    /// failure `comic_book` is left exactly as the caller passed it.
    pub fn add(
        &mut self,
        comic_book: &mut ComicBook,
        artist_id: ArtistId,
        role_id: RoleId,
    ) -> ServiceResult<ComicBookId> {
        self.ensure_issue_number_available(comic_book)?;
        comic_book.add_credit(artist_id, role_id);
        let id = match self.repo.insert(comic_book) {
            Ok(id) => id,
            Err(err) => {
                comic_book.credits.pop();
                return Err(err.into());
            }
        };
        info!("event=comic_book_add module=service status=ok comic_book_id={id}");
        Ok(id)
    }

    /// Checks availability excluding itself, then overwrites the full row.
    pub fn edit(&mut self, comic_book: &mut ComicBook) -> ServiceResult<()> {
        self.ensure_issue_number_available(comic_book)?;
        self.repo.mark_for_update(comic_book)?;
        Ok(())
    }

    /// Applies a sparse patch after checking the patched pair's availability.
    pub fn patch(&mut self, id: ComicBookId, patch: &ComicBookPatch) -> ServiceResult<ComicBook> {
        let mut patched = self
            .repo
            .get_comic_book_with(id, ComicBookLoad::BARE)?
            .ok_or(ServiceError::NotFound(id))?;
        patch.apply_to(&mut patched);
        if patch.series_id.is_some() || patch.issue_number.is_some() {
            self.ensure_issue_number_available(&patched)?;
        }
        self.repo.apply_patch(id, patch)?;
        Ok(patched)
    }

    /// Deletes by id alone.
    ///
    /// A missing row is a storage failure (`RepoError::RowNotAffected`), not
    /// `NotFound`; no existence check runs first.
    pub fn delete(&mut self, id: ComicBookId) -> ServiceResult<()> {
        self.repo.mark_for_delete(id)?;
        Ok(())
    }

    fn ensure_issue_number_available(&self, comic_book: &ComicBook) -> ServiceResult<()> {
        if self.repo.is_issue_number_taken(
            comic_book.id,
            comic_book.series_id,
            comic_book.issue_number,
        )? {
            info!(
                "event=comic_book_validate module=service status=rejected field={} series_id={} issue_number={}",
                ComicBookField::IssueNumber.key(),
                comic_book.series_id,
                comic_book.issue_number
            );
            return Err(ServiceError::Validation(FieldError::issue_number_taken()));
        }
        Ok(())
    }
}
