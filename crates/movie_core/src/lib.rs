//! Core persistence logic for the movie catalog.
//! This crate is the single source of truth for catalog invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod poster;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::entity::Entity;
pub use model::movie::{Movie, MovieId, MovieValidationError};
pub use poster::{PosterError, PosterStore};
pub use repo::entity_repo::{EntityRepository, RepoError, RepoResult};
pub use repo::movie_repo::SqliteMovieRepository;
pub use repo::page::{Page, PageRequest};
pub use service::movie_service::{parse_cast, MovieDraft, MovieService, ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
