//! SQLite-backed movie repository.
//!
//! # Responsibility
//! - Implement `EntityRepository<Movie, MovieId>` over `movies` + `movie_cast`.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Write paths call `Movie::validate()` before any SQL mutation.
//! - Every write is atomic: the repository opens an immediate transaction,
//!   or nests a savepoint when the caller already has one open.
//! - Multi-statement reads (row + cast) see one snapshot.
//! - Read paths reject invalid persisted rows instead of masking them.
//! - Cast rows keep their `position`, so billing order survives round-trips.

use crate::db::migrations::{latest_version, schema_version};
use crate::model::movie::{Movie, MovieId};
use crate::repo::entity_repo::{EntityRepository, RepoError, RepoResult};
use crate::repo::page::{Page, PageRequest};
use log::{debug, warn};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use std::collections::{HashMap, HashSet};

const WRITE_SAVEPOINT: &str = "movie_repo_write";

const MOVIE_SELECT_SQL: &str = "SELECT
    movie_id,
    title,
    director,
    studio,
    release_year,
    poster
FROM movies";

const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    (
        "movies",
        &[
            "movie_id",
            "title",
            "director",
            "studio",
            "release_year",
            "poster",
            "updated_at",
        ],
    ),
    ("movie_cast", &["movie_id", "position", "name"]),
];

/// SQLite movie repository borrowing a migrated connection.
///
/// The connection is the store session: pass a `Transaction` (it derefs to
/// `Connection`) to make several repository calls commit or roll back
/// together.
pub struct SqliteMovieRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMovieRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when the schema version is not current.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` when the schema
    ///   does not have the expected shape.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl EntityRepository<Movie, MovieId> for SqliteMovieRepository<'_> {
    fn save(&self, movie: &Movie) -> RepoResult<Movie> {
        movie.validate()?;
        with_write_scope(self.conn, |conn| write_movie(conn, movie))
    }

    fn find_by_id(&self, id: MovieId) -> RepoResult<Option<Movie>> {
        with_read_scope(self.conn, |conn| {
            let movies = query_movies(
                conn,
                &format!("{MOVIE_SELECT_SQL} WHERE movie_id = ?;"),
                vec![Value::Integer(id)],
            )?;
            let ids = std::slice::from_ref(&id);
            Ok(attach_cast(conn, movies, Some(ids))?.into_iter().next())
        })
    }

    fn find_all(&self) -> RepoResult<Vec<Movie>> {
        with_read_scope(self.conn, |conn| {
            let movies = query_movies(
                conn,
                &format!("{MOVIE_SELECT_SQL} ORDER BY movie_id ASC;"),
                Vec::new(),
            )?;
            attach_cast(conn, movies, None)
        })
    }

    fn find_page(&self, request: PageRequest) -> RepoResult<Page<Movie>> {
        with_read_scope(self.conn, |conn| {
            let total = count_movies(conn)?;
            let offset = i64::try_from(request.offset()).unwrap_or(i64::MAX);
            let movies = query_movies(
                conn,
                &format!("{MOVIE_SELECT_SQL} ORDER BY movie_id ASC LIMIT ? OFFSET ?;"),
                vec![
                    Value::Integer(i64::from(request.size())),
                    Value::Integer(offset),
                ],
            )?;
            let ids: Vec<MovieId> = movies.iter().filter_map(|m| m.movie_id).collect();
            let content = attach_cast(conn, movies, Some(ids.as_slice()))?;
            Ok(Page::new(content, request, total))
        })
    }

    fn delete_by_id(&self, id: MovieId) -> RepoResult<()> {
        let removed = with_write_scope(self.conn, |conn| {
            conn.execute("DELETE FROM movie_cast WHERE movie_id = ?1;", [id])?;
            Ok(conn.execute("DELETE FROM movies WHERE movie_id = ?1;", [id])?)
        })?;

        if removed == 0 {
            debug!("event=movie_delete module=repo status=noop movie_id={id}");
        }
        Ok(())
    }

    fn count(&self) -> RepoResult<u64> {
        count_movies(self.conn)
    }

    fn exists_by_id(&self, id: MovieId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM movies WHERE movie_id = ?1);",
            [id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn save_all(&self, movies: &[Movie]) -> RepoResult<Vec<Movie>> {
        for movie in movies {
            movie.validate()?;
        }
        with_write_scope(self.conn, |conn| {
            movies.iter().map(|movie| write_movie(conn, movie)).collect()
        })
    }

    fn delete_all(&self) -> RepoResult<()> {
        with_write_scope(self.conn, |conn| {
            conn.execute_batch("DELETE FROM movie_cast; DELETE FROM movies;")?;
            Ok(())
        })
    }
}

/// Runs a write atomically.
///
/// On an autocommit connection this opens an `IMMEDIATE` transaction so the
/// write lock is taken up front and waits out the busy timeout. Inside a
/// caller's transaction it nests a savepoint, so a failed write leaves
/// nothing behind for the caller to commit.
fn with_write_scope<T, F>(conn: &Connection, op: F) -> RepoResult<T>
where
    F: FnOnce(&Connection) -> RepoResult<T>,
{
    if conn.is_autocommit() {
        let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
        let result = op(&tx)?;
        tx.commit()?;
        return Ok(result);
    }

    conn.execute_batch(&format!("SAVEPOINT {WRITE_SAVEPOINT};"))?;
    match op(conn) {
        Ok(result) => {
            conn.execute_batch(&format!("RELEASE {WRITE_SAVEPOINT};"))?;
            Ok(result)
        }
        Err(err) => {
            let undo = format!("ROLLBACK TO {WRITE_SAVEPOINT}; RELEASE {WRITE_SAVEPOINT};");
            if let Err(undo_err) = conn.execute_batch(&undo) {
                warn!("event=movie_write module=repo status=error error_code=savepoint_rollback_failed error={undo_err}");
            }
            Err(err)
        }
    }
}

/// Runs multi-statement reads against one snapshot. Joins the caller's
/// transaction when there is one.
fn with_read_scope<T, F>(conn: &Connection, op: F) -> RepoResult<T>
where
    F: FnOnce(&Connection) -> RepoResult<T>,
{
    if !conn.is_autocommit() {
        return op(conn);
    }

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Deferred)?;
    let result = op(&tx)?;
    tx.commit()?;
    Ok(result)
}

fn write_movie(conn: &Connection, movie: &Movie) -> RepoResult<Movie> {
    let movie_id = match movie.movie_id {
        None => {
            conn.execute(
                "INSERT INTO movies (title, director, studio, release_year, poster)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    movie.title.as_str(),
                    movie.director.as_str(),
                    movie.studio.as_str(),
                    movie.release_year,
                    movie.poster.as_deref(),
                ],
            )?;
            conn.last_insert_rowid()
        }
        Some(id) => {
            conn.execute(
                "INSERT INTO movies (movie_id, title, director, studio, release_year, poster)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT (movie_id) DO UPDATE SET
                    title = excluded.title,
                    director = excluded.director,
                    studio = excluded.studio,
                    release_year = excluded.release_year,
                    poster = excluded.poster,
                    updated_at = (strftime('%s', 'now') * 1000);",
                params![
                    id,
                    movie.title.as_str(),
                    movie.director.as_str(),
                    movie.studio.as_str(),
                    movie.release_year,
                    movie.poster.as_deref(),
                ],
            )?;
            id
        }
    };

    replace_cast(conn, movie_id, &movie.movie_cast)?;

    let mut saved = movie.clone();
    saved.movie_id = Some(movie_id);
    Ok(saved)
}

fn replace_cast(conn: &Connection, movie_id: MovieId, cast: &[String]) -> RepoResult<()> {
    conn.execute("DELETE FROM movie_cast WHERE movie_id = ?1;", [movie_id])?;

    let mut insert = conn.prepare_cached(
        "INSERT INTO movie_cast (movie_id, position, name) VALUES (?1, ?2, ?3);",
    )?;
    for (position, name) in cast.iter().enumerate() {
        let position = i64::try_from(position).map_err(|_| {
            RepoError::InvalidData(format!("cast position {position} exceeds store range"))
        })?;
        insert.execute(params![movie_id, position, name.as_str()])?;
    }
    Ok(())
}

fn query_movies(conn: &Connection, sql: &str, bind_values: Vec<Value>) -> RepoResult<Vec<Movie>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut movies = Vec::new();
    while let Some(row) = rows.next()? {
        movies.push(parse_movie_row(row)?);
    }
    Ok(movies)
}

/// Fills `movie_cast` for every movie; `ids = None` loads the whole cast table.
fn attach_cast(
    conn: &Connection,
    movies: Vec<Movie>,
    ids: Option<&[MovieId]>,
) -> RepoResult<Vec<Movie>> {
    let mut cast = load_cast(conn, ids)?;
    movies
        .into_iter()
        .map(|mut movie| {
            if let Some(id) = movie.movie_id {
                movie.movie_cast = cast.remove(&id).unwrap_or_default();
            }
            check_persisted(movie)
        })
        .collect()
}

fn load_cast(
    conn: &Connection,
    ids: Option<&[MovieId]>,
) -> RepoResult<HashMap<MovieId, Vec<String>>> {
    let mut sql = String::from("SELECT movie_id, name FROM movie_cast");
    let mut bind_values: Vec<Value> = Vec::new();

    if let Some(ids) = ids {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        sql.push_str(&format!(" WHERE movie_id IN ({placeholders})"));
        bind_values.extend(ids.iter().map(|id| Value::Integer(*id)));
    }
    sql.push_str(" ORDER BY movie_id ASC, position ASC;");

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut cast: HashMap<MovieId, Vec<String>> = HashMap::new();
    while let Some(row) = rows.next()? {
        let movie_id: MovieId = row.get("movie_id")?;
        cast.entry(movie_id).or_default().push(row.get("name")?);
    }
    Ok(cast)
}

fn count_movies(conn: &Connection) -> RepoResult<u64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM movies;", [], |row| row.get(0))?;
    u64::try_from(count)
        .map_err(|_| RepoError::InvalidData(format!("negative movie count `{count}`")))
}

fn parse_movie_row(row: &Row<'_>) -> RepoResult<Movie> {
    let release_year_raw: i64 = row.get("release_year")?;
    let release_year = i32::try_from(release_year_raw).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid release year `{release_year_raw}` in movies.release_year"
        ))
    })?;

    Ok(Movie {
        movie_id: Some(row.get("movie_id")?),
        title: row.get("title")?,
        director: row.get("director")?,
        studio: row.get("studio")?,
        movie_cast: Vec::new(),
        release_year,
        poster: row.get("poster")?,
    })
}

fn check_persisted(movie: Movie) -> RepoResult<Movie> {
    movie.validate().map_err(|err| {
        RepoError::InvalidData(format!(
            "movie {} failed validation: {err}",
            movie.movie_id.unwrap_or_default()
        ))
    })?;
    Ok(movie)
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = schema_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &(table, columns) in REQUIRED_COLUMNS {
        let present = table_columns(conn, table)?;
        if present.is_empty() {
            return Err(RepoError::MissingRequiredTable(table));
        }
        if let Some(column) = columns
            .iter()
            .copied()
            .find(|column| !present.contains(*column))
        {
            return Err(RepoError::MissingRequiredColumn { table, column });
        }
    }

    Ok(())
}

fn table_columns(conn: &Connection, table: &str) -> RepoResult<HashSet<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>("name"))?
        .collect::<Result<HashSet<_>, _>>()?;
    Ok(names)
}
