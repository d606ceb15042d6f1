//! Core catalog logic for comicshelf.
//! This crate owns the entity graph and the only path to catalog storage.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{CatalogConfig, ConfigError, LoggingConfig};
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LoggingError,
};
pub use model::catalog::{Artist, ArtistId, Role, RoleId};
pub use model::comic_book::{ComicBook, ComicBookId, Credit, CreditId};
pub use model::series::{Series, SeriesId};
pub use repo::catalog_repo::{CatalogRepository, SqliteCatalogRepository};
pub use repo::comic_book_repo::{
    ComicBookLoad, ComicBookPatch, ComicBookRepository, CommitOutcome, CommittedChange,
    SqliteComicBookRepository, UnitOfWorkState,
};
pub use repo::error::{RecordValidationError, RepoError, RepoResult};
pub use service::comic_book_service::{
    ComicBookField, ComicBookService, FieldError, ServiceError, ServiceResult,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
