//! Series record.

use serde::{Deserialize, Serialize};

/// Storage identity of a series.
pub type SeriesId = i64;

/// A named collection of comic book issues.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Series {
    pub id: SeriesId,
    /// Display title. Must not be blank.
    pub title: String,
}

impl Series {
    /// Creates an unsaved series.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: 0,
            title: title.into(),
        }
    }
}
