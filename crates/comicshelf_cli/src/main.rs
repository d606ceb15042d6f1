//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `comicshelf_core` linkage without any presentation layer.
//! - With a config path argument, open the catalog and print its listing.
//!
//! Usage: `comicshelf_cli [config.toml]`

use comicshelf_core::{
    init_logging_from_config, CatalogConfig, ComicBookRepository, SqliteComicBookRepository,
};
use log::info;
use std::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("comicshelf_core ping={}", comicshelf_core::ping());
    println!("comicshelf_core version={}", comicshelf_core::core_version());

    let Some(config_path) = std::env::args().nth(1) else {
        return ExitCode::SUCCESS;
    };

    match print_catalog(&config_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn print_catalog(config_path: &str) -> Result<(), Box<dyn Error>> {
    let config = CatalogConfig::from_file(config_path)?;
    init_logging_from_config(&config)?;

    let conn = config.open_database()?;
    let repo = SqliteComicBookRepository::try_new(&conn)?;
    let comic_books = repo.list_comic_books()?;
    info!(
        "event=cli_list module=cli status=ok count={}",
        comic_books.len()
    );

    for comic_book in &comic_books {
        let title = comic_book
            .series
            .as_ref()
            .map_or("<unknown series>", |series| series.title.as_str());
        println!("{title} #{} (id={})", comic_book.issue_number, comic_book.id);
    }
    println!("total={}", comic_books.len());
    Ok(())
}
