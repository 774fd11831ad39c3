use movie_core::db::migrations::latest_version;
use movie_core::db::open_db_in_memory;
use movie_core::{
    EntityRepository, Movie, MovieValidationError, PageRequest, RepoError, SqliteMovieRepository,
};
use rusqlite::Connection;

fn inception() -> Movie {
    Movie::new("Inception", "Christopher Nolan", "Warner Bros.", 2010).with_cast([
        "Leonardo DiCaprio",
        "Joseph Gordon-Levitt",
        "Elliot Page",
    ])
}

fn numbered(n: i32) -> Movie {
    Movie::new(format!("Movie {n}"), "Director", "Studio", 2000 + n)
}

#[test]
fn save_assigns_id_and_find_by_id_roundtrips() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMovieRepository::try_new(&conn).unwrap();

    let movie = inception();
    let saved = repo.save(&movie).unwrap();
    assert_eq!(saved.movie_id, Some(1));

    let loaded = repo.find_by_id(1).unwrap().unwrap();
    assert_eq!(loaded, saved);
    assert_eq!(
        loaded.movie_cast,
        vec!["Leonardo DiCaprio", "Joseph Gordon-Levitt", "Elliot Page"]
    );
}

#[test]
fn save_find_delete_find_example() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMovieRepository::try_new(&conn).unwrap();

    let saved = repo
        .save(&Movie::new("Inception", "Christopher Nolan", "Syncopy", 2010))
        .unwrap();
    assert_eq!(saved.movie_id, Some(1));
    assert_eq!(repo.find_by_id(1).unwrap().unwrap().title, "Inception");

    repo.delete_by_id(1).unwrap();
    assert!(repo.find_by_id(1).unwrap().is_none());
}

#[test]
fn find_by_id_returns_none_for_absent_id() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMovieRepository::try_new(&conn).unwrap();

    assert!(repo.find_by_id(404).unwrap().is_none());
    assert!(!repo.exists_by_id(404).unwrap());
}

#[test]
fn saving_existing_id_overwrites_instead_of_duplicating() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMovieRepository::try_new(&conn).unwrap();

    let mut saved = repo.save(&inception()).unwrap();
    saved.title = "Inception (IMAX)".to_string();
    saved.movie_cast = vec!["Tom Hardy".to_string(), "Leonardo DiCaprio".to_string()];
    saved.poster = Some("inception.png".to_string());

    let updated = repo.save(&saved).unwrap();
    repo.save(&saved).unwrap();

    assert_eq!(updated.movie_id, saved.movie_id);
    assert_eq!(repo.count().unwrap(), 1);
    let loaded = repo.find_by_id(saved.movie_id.unwrap()).unwrap().unwrap();
    assert_eq!(loaded.title, "Inception (IMAX)");
    assert_eq!(loaded.movie_cast, vec!["Tom Hardy", "Leonardo DiCaprio"]);
    assert_eq!(loaded.poster.as_deref(), Some("inception.png"));
}

#[test]
fn save_with_unknown_caller_assigned_id_inserts_under_that_id() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMovieRepository::try_new(&conn).unwrap();

    let saved = repo.save(&inception().with_id(77)).unwrap();
    assert_eq!(saved.movie_id, Some(77));
    assert!(repo.exists_by_id(77).unwrap());

    let next = repo.save(&numbered(1)).unwrap();
    assert_eq!(next.movie_id, Some(78));
}

#[test]
fn count_matches_find_all_and_order_is_by_id() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMovieRepository::try_new(&conn).unwrap();

    repo.save(&numbered(3).with_id(30)).unwrap();
    repo.save(&numbered(1).with_id(10)).unwrap();
    repo.save(&numbered(2).with_id(20)).unwrap();

    let all = repo.find_all().unwrap();
    assert_eq!(repo.count().unwrap(), all.len() as u64);
    let ids: Vec<_> = all.iter().map(|m| m.movie_id.unwrap()).collect();
    assert_eq!(ids, vec![10, 20, 30]);
}

#[test]
fn delete_by_absent_id_is_noop() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMovieRepository::try_new(&conn).unwrap();
    repo.save(&inception()).unwrap();

    repo.delete_by_id(999).unwrap();
    assert_eq!(repo.count().unwrap(), 1);
}

#[test]
fn delete_removes_cast_rows() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMovieRepository::try_new(&conn).unwrap();
    let saved = repo.save(&inception()).unwrap();

    repo.delete(&saved).unwrap();
    repo.delete(&numbered(1)).unwrap();

    let cast_rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM movie_cast;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(cast_rows, 0);
    assert_eq!(repo.count().unwrap(), 0);
}

#[test]
fn validation_failure_blocks_writes() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMovieRepository::try_new(&conn).unwrap();

    let mut invalid = inception();
    invalid.release_year = 1700;
    let err = repo.save(&invalid).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(MovieValidationError::ReleaseYearOutOfRange(1700))
    ));

    let batch = vec![numbered(1), Movie::new(" ", "d", "s", 2000)];
    let err = repo.save_all(&batch).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(MovieValidationError::BlankField("title"))
    ));
    assert_eq!(repo.count().unwrap(), 0);
}

#[test]
fn save_all_and_find_all_by_id_keep_request_order() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMovieRepository::try_new(&conn).unwrap();

    let saved = repo
        .save_all(&[numbered(1), numbered(2), numbered(3)])
        .unwrap();
    let ids: Vec<_> = saved.iter().map(|m| m.movie_id.unwrap()).collect();
    assert_eq!(ids, vec![1, 2, 3]);

    let found = repo.find_all_by_id(&[3, 99, 1]).unwrap();
    let titles: Vec<_> = found.iter().map(|m| m.title.as_str()).collect();
    assert_eq!(titles, vec!["Movie 3", "Movie 1"]);
}

#[test]
fn delete_all_empties_store() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMovieRepository::try_new(&conn).unwrap();
    repo.save_all(&[inception(), numbered(1)]).unwrap();

    repo.delete_all().unwrap();
    assert_eq!(repo.count().unwrap(), 0);
    assert!(repo.find_all().unwrap().is_empty());
}

#[test]
fn find_page_returns_slice_and_totals() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMovieRepository::try_new(&conn).unwrap();
    let movies: Vec<_> = (1..=7)
        .map(|n| numbered(n).with_cast([format!("Actor {n}")]))
        .collect();
    repo.save_all(&movies).unwrap();

    let page = repo.find_page(PageRequest::new(1, 3)).unwrap();
    assert_eq!(page.total_elements, 7);
    assert_eq!(page.total_pages(), 3);
    let titles: Vec<_> = page.content.iter().map(|m| m.title.as_str()).collect();
    assert_eq!(titles, vec!["Movie 4", "Movie 5", "Movie 6"]);
    assert_eq!(page.content[0].movie_cast, vec!["Actor 4"]);
    assert!(page.has_next());

    let last = repo.find_page(PageRequest::new(2, 3)).unwrap();
    assert_eq!(last.number_of_elements(), 1);
    assert!(last.is_last());

    let beyond = repo.find_page(PageRequest::new(10, 3)).unwrap();
    assert!(beyond.is_empty());
    assert_eq!(beyond.total_elements, 7);
}

#[test]
fn caller_transaction_rolls_back_repository_writes() {
    let mut conn = open_db_in_memory().unwrap();

    {
        let tx = conn.transaction().unwrap();
        let repo = SqliteMovieRepository::try_new(&tx).unwrap();
        repo.save(&inception()).unwrap();
        repo.save(&numbered(1)).unwrap();
        assert_eq!(repo.count().unwrap(), 2);
        tx.rollback().unwrap();
    }

    let repo = SqliteMovieRepository::try_new(&conn).unwrap();
    assert_eq!(repo.count().unwrap(), 0);
}

fn install_failing_cast_trigger(conn: &Connection) {
    conn.execute_batch(
        "CREATE TRIGGER reject_cast_boom
         BEFORE INSERT ON movie_cast
         WHEN NEW.name = 'Boom'
         BEGIN
            SELECT RAISE(ABORT, 'boom');
         END;",
    )
    .unwrap();
}

fn table_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

#[test]
fn failed_save_inside_caller_transaction_leaves_nothing_to_commit() {
    let mut conn = open_db_in_memory().unwrap();
    install_failing_cast_trigger(&conn);

    {
        let tx = conn.transaction().unwrap();
        let repo = SqliteMovieRepository::try_new(&tx).unwrap();
        repo.save(&numbered(1)).unwrap();

        let err = repo
            .save(&numbered(2).with_cast(["Ok", "Boom"]))
            .unwrap_err();
        assert!(matches!(err, RepoError::ConstraintViolation(_)), "{err}");
        tx.commit().unwrap();
    }

    assert_eq!(table_rows(&conn, "movies"), 1);
    assert_eq!(table_rows(&conn, "movie_cast"), 0);
    let repo = SqliteMovieRepository::try_new(&conn).unwrap();
    assert_eq!(repo.find_all().unwrap()[0].title, "Movie 1");
}

#[test]
fn failed_save_in_autocommit_mode_rolls_back() {
    let conn = open_db_in_memory().unwrap();
    install_failing_cast_trigger(&conn);
    let repo = SqliteMovieRepository::try_new(&conn).unwrap();

    let err = repo
        .save(&numbered(1).with_cast(["Ok", "Boom"]))
        .unwrap_err();
    assert!(matches!(err, RepoError::ConstraintViolation(_)), "{err}");
    assert_eq!(table_rows(&conn, "movies"), 0);
    assert_eq!(table_rows(&conn, "movie_cast"), 0);
    assert!(conn.is_autocommit());
}

#[test]
fn reads_join_caller_transaction() {
    let mut conn = open_db_in_memory().unwrap();

    let tx = conn.transaction().unwrap();
    let repo = SqliteMovieRepository::try_new(&tx).unwrap();
    let saved = repo.save(&inception()).unwrap();

    let loaded = repo.find_by_id(saved.movie_id.unwrap()).unwrap().unwrap();
    assert_eq!(loaded, saved);
    assert!(!tx.is_autocommit());
    tx.commit().unwrap();

    let repo = SqliteMovieRepository::try_new(&conn).unwrap();
    let reloaded = repo.find_by_id(saved.movie_id.unwrap()).unwrap().unwrap();
    assert_eq!(reloaded.movie_cast, saved.movie_cast);
    assert!(conn.is_autocommit());
}

#[test]
fn read_path_rejects_invalid_persisted_rows() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMovieRepository::try_new(&conn).unwrap();
    conn.execute(
        "INSERT INTO movies (movie_id, title, director, studio, release_year, poster)
         VALUES (5, 'Heat', 'Michael Mann', 'Warner Bros.', 1995, '../heat.png');",
        [],
    )
    .unwrap();

    let err = repo.find_by_id(5).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)), "{err}");
}

#[test]
fn repository_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    match SqliteMovieRepository::try_new(&conn) {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert_eq!(expected_version, latest_version()),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn repository_rejects_connection_without_movies_table() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteMovieRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredTable("movies"))
    ));
}

#[test]
fn repository_rejects_connection_missing_required_column() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE movies (
            movie_id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            director TEXT NOT NULL,
            studio TEXT NOT NULL,
            release_year INTEGER NOT NULL,
            updated_at INTEGER NOT NULL DEFAULT 0
        );",
    )
    .unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteMovieRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredColumn {
            table: "movies",
            column: "poster"
        })
    ));
}
