use comicshelf_core::{CatalogConfig, ComicBookRepository, ConfigError, SqliteComicBookRepository};
use std::fs;

#[test]
fn from_file_opens_configured_database() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("catalog.sqlite3");
    let config_path = dir.path().join("comicshelf.toml");
    fs::write(
        &config_path,
        format!("database_path = {:?}\n", db_path.display().to_string()),
    )
    .unwrap();

    let config = CatalogConfig::from_file(&config_path).unwrap();
    assert_eq!(config.database_path, db_path);

    let conn = config.open_database().unwrap();
    let repo = SqliteComicBookRepository::try_new(&conn).unwrap();
    assert!(repo.list_comic_books().unwrap().is_empty());
    assert!(db_path.exists());
}

#[test]
fn in_memory_config_opens_fresh_catalog() {
    let config = CatalogConfig::from_toml_str("database_path = \":memory:\"").unwrap();

    let conn = config.open_database().unwrap();
    assert!(SqliteComicBookRepository::try_new(&conn).is_ok());
}

#[test]
fn missing_config_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();

    let err = CatalogConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}
