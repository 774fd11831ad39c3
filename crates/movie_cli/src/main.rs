//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `movie_core` linkage and print a quick catalog summary.
//! - Keep output deterministic for local sanity checks.
//!
//! Usage: `movie_cli [DB_PATH]` (falls back to `MOVIE_DB_PATH`).
//! Set `MOVIE_LOG_DIR` to an absolute directory to enable file logging.

use movie_core::db::open_db;
use movie_core::{
    core_version, default_log_level, init_logging, MovieService, PageRequest,
    SqliteMovieRepository,
};
use std::process::ExitCode;

const DB_PATH_ENV: &str = "MOVIE_DB_PATH";
const LOG_DIR_ENV: &str = "MOVIE_LOG_DIR";
const SUMMARY_PAGE_SIZE: u32 = 10;

fn main() -> ExitCode {
    println!("movie_core version={}", core_version());

    if let Some(log_dir) = log_dir_from(std::env::var(LOG_DIR_ENV).ok()) {
        // The summary still runs without file logging.
        if let Err(err) = init_logging(default_log_level(), &log_dir) {
            eprintln!("warning: logging disabled: {err}");
        }
    }

    let Some(db_path) = std::env::args()
        .nth(1)
        .or_else(|| std::env::var(DB_PATH_ENV).ok())
    else {
        return ExitCode::SUCCESS;
    };

    match print_summary(&db_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn log_dir_from(value: Option<String>) -> Option<String> {
    value
        .map(|dir| dir.trim().to_string())
        .filter(|dir| !dir.is_empty())
}

fn print_summary(db_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let conn = open_db(db_path)?;
    let service = MovieService::new(SqliteMovieRepository::try_new(&conn)?);

    let page = service.list_movies(PageRequest::first(SUMMARY_PAGE_SIZE))?;
    println!("movies total={}", page.total_elements);
    for movie in &page.content {
        println!(
            "{}\t{}\t{}",
            movie.movie_id.unwrap_or_default(),
            movie.release_year,
            movie.title
        );
    }
    if page.has_next() {
        println!("... {} more", page.total_elements - page.content.len() as u64);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::log_dir_from;

    #[test]
    fn log_dir_requires_non_blank_value() {
        assert_eq!(log_dir_from(None), None);
        assert_eq!(log_dir_from(Some("   ".to_string())), None);
        assert_eq!(
            log_dir_from(Some(" /var/log/movies ".to_string())),
            Some("/var/log/movies".to_string())
        );
    }
}
