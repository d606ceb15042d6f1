//! Comic book aggregate and its credits.
//!
//! # Responsibility
//! - Define the issue record owned by one series.
//! - Own the credit list (composition: a credit cannot outlive its issue).
//!
//! # Invariants
//! - `credits[i].comic_book_id` always equals the owning `ComicBook::id`
//!   once the repository has assigned identities.
//! - Duplicate credits (same artist and role) are allowed.

use crate::model::catalog::{Artist, ArtistId, Role, RoleId};
use crate::model::series::{Series, SeriesId};
use serde::{Deserialize, Serialize};

pub type ComicBookId = i64;
pub type CreditId = i64;

/// A single issue belonging to exactly one series.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComicBook {
    pub id: ComicBookId,
    pub series_id: SeriesId,
    /// Unique within the owning series.
    pub issue_number: i64,
    pub description: Option<String>,
    /// Unix epoch milliseconds.
    pub published_on: Option<i64>,
    /// Eager-loaded series snapshot. Ignored by writes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<Series>,
    #[serde(default)]
    pub credits: Vec<Credit>,
}

/// Join record attaching one artist and one role to one comic book.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credit {
    pub id: CreditId,
    pub comic_book_id: ComicBookId,
    pub artist_id: ArtistId,
    pub role_id: RoleId,
    /// Eager-loaded artist snapshot. Ignored by writes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<Artist>,
    /// Eager-loaded role snapshot. Ignored by writes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl ComicBook {
    /// Creates an unsaved comic book with no credits.
    pub fn new(series_id: SeriesId, issue_number: i64) -> Self {
        Self {
            series_id,
            issue_number,
            ..Self::default()
        }
    }

    /// Creates the minimal entity used to address a row by key alone.
    ///
    /// Every field except `id` keeps its default value.
    pub fn placeholder(id: ComicBookId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Appends a credit for `artist_id` in `role_id`.
    ///
    /// Nothing is persisted until the repository commits; unsaved credits
    /// keep `id == 0`.
    pub fn add_credit(&mut self, artist_id: ArtistId, role_id: RoleId) -> &mut Credit {
        self.credits.push(Credit {
            id: 0,
            comic_book_id: self.id,
            artist_id,
            role_id,
            artist: None,
            role: None,
        });
        let last = self.credits.len() - 1;
        &mut self.credits[last]
    }

    /// Iterates over credits that storage has not assigned an id to yet.
    pub fn unsaved_credits(&self) -> impl Iterator<Item = &Credit> {
        self.credits.iter().filter(|credit| credit.id == 0)
    }
}
