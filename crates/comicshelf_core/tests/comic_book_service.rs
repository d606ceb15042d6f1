use comicshelf_core::db::open_db_in_memory;
use comicshelf_core::{
    Artist, ArtistId, CatalogRepository, ComicBook, ComicBookField, ComicBookId, ComicBookLoad,
    ComicBookPatch, ComicBookRepository, ComicBookService, CommitOutcome, RepoError, RepoResult,
    Role, RoleId, Series, SeriesId, ServiceError, SqliteCatalogRepository,
    SqliteComicBookRepository, UnitOfWorkState,
};
use rusqlite::Connection;

const ISSUE_NUMBER_TAKEN: &str =
    "The provided Issue Number has already been entered for the selected Series.";

#[test]
fn add_inserts_comic_book_with_first_credit() {
    let conn = open_db_in_memory().unwrap();
    let fixture = Fixture::new(&conn);
    let mut service = service(&conn);

    let mut comic_book = ComicBook::new(fixture.batman, 1);
    comic_book.description = Some("Origin".to_string());
    let id = service
        .add(&mut comic_book, fixture.artist, fixture.role)
        .unwrap();

    assert_eq!(comic_book.id, id);
    let detail = service.detail(Some(id)).unwrap();
    assert_eq!(detail.description.as_deref(), Some("Origin"));
    assert_eq!(detail.credits.len(), 1);
    assert_eq!(detail.credits[0].artist_id, fixture.artist);
    assert_eq!(detail.credits[0].role.as_ref().unwrap().name, "Writer");
}

#[test]
fn add_rejects_duplicate_issue_number_without_writing() {
    let conn = open_db_in_memory().unwrap();
    let fixture = Fixture::new(&conn);
    let mut service = service(&conn);

    service
        .add(
            &mut ComicBook::new(fixture.batman, 1),
            fixture.artist,
            fixture.role,
        )
        .unwrap();

    let mut duplicate = ComicBook::new(fixture.batman, 1);
    let err = service
        .add(&mut duplicate, fixture.artist, fixture.role)
        .unwrap_err();

    match err {
        ServiceError::Validation(field_error) => {
            assert_eq!(field_error.field, ComicBookField::IssueNumber);
            assert_eq!(field_error.message, ISSUE_NUMBER_TAKEN);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(duplicate.id, 0);
    assert!(duplicate.credits.is_empty());
    assert_eq!(service.list().unwrap().len(), 1);
}

#[test]
fn edit_of_unchanged_comic_book_does_not_collide_with_itself() {
    let conn = open_db_in_memory().unwrap();
    let fixture = Fixture::new(&conn);
    let mut service = service(&conn);

    let mut comic_book = ComicBook::new(fixture.batman, 3);
    let id = service
        .add(&mut comic_book, fixture.artist, fixture.role)
        .unwrap();

    let mut edited = service.detail(Some(id)).unwrap();
    edited.description = Some("Revised".to_string());
    service.edit(&mut edited).unwrap();

    let reloaded = service.detail(Some(id)).unwrap();
    assert_eq!(reloaded.issue_number, 3);
    assert_eq!(reloaded.description.as_deref(), Some("Revised"));
}

#[test]
fn edit_into_taken_issue_number_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let fixture = Fixture::new(&conn);
    let mut service = service(&conn);

    service
        .add(
            &mut ComicBook::new(fixture.batman, 1),
            fixture.artist,
            fixture.role,
        )
        .unwrap();
    let mut second = ComicBook::new(fixture.batman, 2);
    let second_id = service
        .add(&mut second, fixture.artist, fixture.role)
        .unwrap();

    let mut moved = service.detail(Some(second_id)).unwrap();
    moved.issue_number = 1;
    let err = service.edit(&mut moved).unwrap_err();

    assert!(matches!(err, ServiceError::Validation(_)));
    assert_eq!(service.detail(Some(second_id)).unwrap().issue_number, 2);
}

#[test]
fn patch_updates_only_supplied_fields_and_returns_result() {
    let conn = open_db_in_memory().unwrap();
    let fixture = Fixture::new(&conn);
    let mut service = service(&conn);

    let mut comic_book = ComicBook::new(fixture.batman, 1);
    comic_book.published_on = Some(1_234);
    let id = service
        .add(&mut comic_book, fixture.artist, fixture.role)
        .unwrap();

    let patch = ComicBookPatch {
        description: Some(Some("Patched".to_string())),
        ..ComicBookPatch::default()
    };
    let patched = service.patch(id, &patch).unwrap();

    assert_eq!(patched.description.as_deref(), Some("Patched"));
    assert_eq!(patched.published_on, Some(1_234));
    let reloaded = service.detail(Some(id)).unwrap();
    assert_eq!(reloaded.description.as_deref(), Some("Patched"));
    assert_eq!(reloaded.published_on, Some(1_234));
    assert_eq!(reloaded.credits.len(), 1);
}

#[test]
fn patch_into_taken_issue_number_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let fixture = Fixture::new(&conn);
    let mut service = service(&conn);

    service
        .add(
            &mut ComicBook::new(fixture.batman, 1),
            fixture.artist,
            fixture.role,
        )
        .unwrap();
    let mut second = ComicBook::new(fixture.batman, 2);
    let second_id = service
        .add(&mut second, fixture.artist, fixture.role)
        .unwrap();

    let patch = ComicBookPatch {
        issue_number: Some(1),
        ..ComicBookPatch::default()
    };
    assert!(matches!(
        service.patch(second_id, &patch),
        Err(ServiceError::Validation(_))
    ));
}

#[test]
fn patch_of_missing_comic_book_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let mut service = service(&conn);

    let patch = ComicBookPatch {
        issue_number: Some(9),
        ..ComicBookPatch::default()
    };
    assert!(matches!(
        service.patch(77, &patch),
        Err(ServiceError::NotFound(77))
    ));
}

#[test]
fn detail_distinguishes_missing_from_bad_request() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    assert!(matches!(
        service.detail(Some(5)),
        Err(ServiceError::NotFound(5))
    ));
    assert!(matches!(
        service.detail(None),
        Err(ServiceError::Repo(RepoError::BadRequest(_)))
    ));
}

#[test]
fn delete_preview_includes_series_and_delete_removes_row() {
    let conn = open_db_in_memory().unwrap();
    let fixture = Fixture::new(&conn);
    let mut service = service(&conn);

    let mut comic_book = ComicBook::new(fixture.batman, 1);
    let id = service
        .add(&mut comic_book, fixture.artist, fixture.role)
        .unwrap();

    let preview = service.delete_preview(id).unwrap();
    assert_eq!(preview.series.unwrap().title, "Batman");
    assert!(preview.credits.is_empty());

    service.delete(id).unwrap();
    assert!(matches!(
        service.detail(Some(id)),
        Err(ServiceError::NotFound(_))
    ));
}

#[test]
fn delete_of_missing_comic_book_surfaces_storage_failure() {
    let conn = open_db_in_memory().unwrap();
    let mut service = service(&conn);

    let err = service.delete(999).unwrap_err();
    match err {
        ServiceError::Repo(repo_error) => {
            assert!(matches!(
                repo_error,
                RepoError::RowNotAffected {
                    operation: "delete",
                    id: 999
                }
            ));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(service.into_inner().state(), UnitOfWorkState::Failed);
}

#[test]
fn unique_index_rejection_after_stale_precheck_maps_to_field_error() {
    let conn = open_db_in_memory().unwrap();
    let fixture = Fixture::new(&conn);
    let mut direct = SqliteComicBookRepository::try_new(&conn).unwrap();
    direct.insert(&mut ComicBook::new(fixture.batman, 1)).unwrap();

    let mut service = ComicBookService::new(StalePrecheckRepository(
        SqliteComicBookRepository::try_new(&conn).unwrap(),
    ));
    let mut comic_book = ComicBook::new(fixture.batman, 1);
    let err = service
        .add(&mut comic_book, fixture.artist, fixture.role)
        .unwrap_err();

    match err {
        ServiceError::Validation(field_error) => {
            assert_eq!(field_error.field, ComicBookField::IssueNumber);
            assert_eq!(field_error.message, ISSUE_NUMBER_TAKEN);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(comic_book.id, 0);
    assert!(comic_book.credits.is_empty());
    assert_eq!(count_rows(&conn, "comic_books"), 1);
    assert_eq!(count_rows(&conn, "credits"), 0);
}

#[test]
fn retrying_add_after_storage_failure_persists_a_single_credit() {
    let conn = open_db_in_memory().unwrap();
    let fixture = Fixture::new(&conn);
    let mut service = service(&conn);

    let mut comic_book = ComicBook::new(9999, 1);
    let err = service
        .add(&mut comic_book, fixture.artist, fixture.role)
        .unwrap_err();
    assert!(matches!(err, ServiceError::Repo(RepoError::Db(_))));
    assert_eq!(comic_book.id, 0);
    assert!(comic_book.credits.is_empty());

    comic_book.series_id = fixture.batman;
    let id = service
        .add(&mut comic_book, fixture.artist, fixture.role)
        .unwrap();

    assert_eq!(comic_book.credits.len(), 1);
    assert_eq!(service.detail(Some(id)).unwrap().credits.len(), 1);
    assert_eq!(count_rows(&conn, "credits"), 1);
}

struct Fixture {
    batman: SeriesId,
    artist: ArtistId,
    role: RoleId,
}

impl Fixture {
    fn new(conn: &Connection) -> Self {
        let catalog = SqliteCatalogRepository::try_new(conn).unwrap();
        Self {
            batman: catalog.insert_series(&mut Series::new("Batman")).unwrap(),
            artist: catalog.insert_artist(&mut Artist::new("Bob Kane")).unwrap(),
            role: catalog.insert_role(&mut Role::new("Writer")).unwrap(),
        }
    }
}

fn service(conn: &Connection) -> ComicBookService<SqliteComicBookRepository<'_>> {
    ComicBookService::new(SqliteComicBookRepository::try_new(conn).unwrap())
}

fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

/// Simulates a concurrent writer: the availability check always passes.
struct StalePrecheckRepository<'conn>(SqliteComicBookRepository<'conn>);

impl ComicBookRepository for StalePrecheckRepository<'_> {
    fn list_comic_books(&self) -> RepoResult<Vec<ComicBook>> {
        self.0.list_comic_books()
    }

    fn get_comic_book(&self, id: Option<ComicBookId>) -> RepoResult<Option<ComicBook>> {
        self.0.get_comic_book(id)
    }

    fn get_comic_book_with(
        &self,
        id: ComicBookId,
        load: ComicBookLoad,
    ) -> RepoResult<Option<ComicBook>> {
        self.0.get_comic_book_with(id, load)
    }

    fn is_issue_number_taken(
        &self,
        _id: ComicBookId,
        _series_id: SeriesId,
        _issue_number: i64,
    ) -> RepoResult<bool> {
        Ok(false)
    }

    fn stage_insert(&mut self, comic_book: &ComicBook) -> RepoResult<()> {
        self.0.stage_insert(comic_book)
    }

    fn stage_update(&mut self, comic_book: &ComicBook) -> RepoResult<()> {
        self.0.stage_update(comic_book)
    }

    fn stage_patch(&mut self, id: ComicBookId, patch: &ComicBookPatch) -> RepoResult<()> {
        self.0.stage_patch(id, patch)
    }

    fn stage_delete(&mut self, id: ComicBookId) -> RepoResult<()> {
        self.0.stage_delete(id)
    }

    fn commit(&mut self) -> RepoResult<CommitOutcome> {
        self.0.commit()
    }

    fn state(&self) -> UnitOfWorkState {
        self.0.state()
    }

    fn pending_count(&self) -> usize {
        self.0.pending_count()
    }
}
