//! Movie use-case service.
//!
//! # Responsibility
//! - Turn edit-form drafts into validated `Movie` writes.
//! - Coordinate poster uploads with the repository write.
//!
//! # Invariants
//! - Service APIs never bypass repository validation/persistence contracts.
//! - A replaced poster file is removed only after the new row is saved.
//! - Service layer remains storage-agnostic.

use crate::model::movie::{Movie, MovieId};
use crate::poster::{PosterError, PosterStore};
use crate::repo::entity_repo::{EntityRepository, RepoError};
use crate::repo::page::{Page, PageRequest};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug)]
pub enum ServiceError {
    Repo(RepoError),
    Poster(PosterError),
    /// A poster operation was requested but no `PosterStore` is configured.
    PosterStoreUnavailable,
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Poster(err) => write!(f, "{err}"),
            Self::PosterStoreUnavailable => write!(f, "no poster store configured"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Poster(err) => Some(err),
            Self::PosterStoreUnavailable => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<PosterError> for ServiceError {
    fn from(value: PosterError) -> Self {
        Self::Poster(value)
    }
}

/// Editable movie fields as submitted by a create/update form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieDraft {
    pub title: String,
    pub director: String,
    pub studio: String,
    pub movie_cast: Vec<String>,
    pub release_year: i32,
    /// Existing poster name to keep; ignored when a new upload is given.
    pub poster: Option<String>,
}

impl MovieDraft {
    fn into_movie(self, movie_id: Option<MovieId>) -> Movie {
        Movie {
            movie_id,
            title: self.title.trim().to_string(),
            director: self.director.trim().to_string(),
            studio: self.studio.trim().to_string(),
            movie_cast: self.movie_cast,
            release_year: self.release_year,
            poster: self.poster,
        }
    }
}

/// Splits a comma-separated cast field into trimmed, non-empty names.
pub fn parse_cast(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Use-case service over any movie repository.
pub struct MovieService<R: EntityRepository<Movie, MovieId>> {
    repo: R,
    posters: Option<PosterStore>,
}

impl<R: EntityRepository<Movie, MovieId>> MovieService<R> {
    /// Creates a service without poster support.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            posters: None,
        }
    }

    /// Creates a service that stores uploaded posters in `posters`.
    pub fn with_poster_store(repo: R, posters: PosterStore) -> Self {
        Self {
            repo,
            posters: Some(posters),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Creates a movie, storing `poster_upload` first when given.
    pub fn create_movie(
        &self,
        draft: MovieDraft,
        poster_upload: Option<&Path>,
    ) -> ServiceResult<Movie> {
        let mut movie = draft.into_movie(None);
        let uploaded = self.store_upload(poster_upload)?;
        if uploaded.is_some() {
            movie.poster = uploaded.clone();
        }

        let saved = match self.repo.save(&movie) {
            Ok(saved) => saved,
            Err(err) => {
                self.discard_poster(uploaded.as_deref());
                return Err(err.into());
            }
        };
        info!(
            "event=movie_create module=service status=ok movie_id={} cast_size={}",
            saved.movie_id.unwrap_or_default(),
            saved.movie_cast.len()
        );
        Ok(saved)
    }

    /// Replaces the editable fields of an existing movie.
    ///
    /// # Contract
    /// - Returns `RepoError::NotFound` when `movie_id` does not exist.
    /// - Without an upload and without `draft.poster`, the current poster is kept.
    /// - A poster replaced by an upload is deleted after the save succeeds.
    pub fn update_movie(
        &self,
        movie_id: MovieId,
        draft: MovieDraft,
        poster_upload: Option<&Path>,
    ) -> ServiceResult<Movie> {
        let existing = self
            .repo
            .find_by_id(movie_id)?
            .ok_or_else(|| RepoError::not_found("movie", movie_id))?;

        let mut movie = draft.into_movie(Some(movie_id));
        let uploaded = self.store_upload(poster_upload)?;
        match uploaded.as_ref() {
            Some(name) => movie.poster = Some(name.clone()),
            None if movie.poster.is_none() => movie.poster = existing.poster.clone(),
            None => {}
        }

        let saved = match self.repo.save(&movie) {
            Ok(saved) => saved,
            Err(err) => {
                self.discard_poster(uploaded.as_deref());
                return Err(err.into());
            }
        };

        if existing.poster != saved.poster {
            self.discard_poster(existing.poster.as_deref());
        }
        info!("event=movie_update module=service status=ok movie_id={movie_id}");
        Ok(saved)
    }

    pub fn get_movie(&self, movie_id: MovieId) -> ServiceResult<Option<Movie>> {
        Ok(self.repo.find_by_id(movie_id)?)
    }

    pub fn list_movies(&self, request: PageRequest) -> ServiceResult<Page<Movie>> {
        Ok(self.repo.find_page(request)?)
    }

    pub fn all_movies(&self) -> ServiceResult<Vec<Movie>> {
        Ok(self.repo.find_all()?)
    }

    pub fn count_movies(&self) -> ServiceResult<u64> {
        Ok(self.repo.count()?)
    }

    /// Deletes a movie and its poster file. Absent ids are a no-op.
    pub fn delete_movie(&self, movie_id: MovieId) -> ServiceResult<()> {
        let existing = self.repo.find_by_id(movie_id)?;
        self.repo.delete_by_id(movie_id)?;

        if let Some(movie) = existing {
            self.discard_poster(movie.poster.as_deref());
            info!("event=movie_delete module=service status=ok movie_id={movie_id}");
        }
        Ok(())
    }

    fn store_upload(&self, poster_upload: Option<&Path>) -> ServiceResult<Option<String>> {
        let Some(source) = poster_upload else {
            return Ok(None);
        };
        let posters = self
            .posters
            .as_ref()
            .ok_or(ServiceError::PosterStoreUnavailable)?;
        Ok(Some(posters.store(source)?))
    }

    fn discard_poster(&self, name: Option<&str>) {
        let (Some(posters), Some(name)) = (self.posters.as_ref(), name) else {
            return;
        };
        if let Err(err) = posters.remove(name) {
            warn!("event=poster_remove module=service status=error name={name} error={err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::parse_cast;

    #[test]
    fn parse_cast_trims_and_drops_empty_entries() {
        assert_eq!(
            parse_cast(" Leonardo DiCaprio, Elliot Page ,, ,Tom Hardy,"),
            vec!["Leonardo DiCaprio", "Elliot Page", "Tom Hardy"]
        );
        assert!(parse_cast(" , ").is_empty());
    }
}
