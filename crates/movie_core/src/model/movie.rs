//! Movie domain model.
//!
//! # Responsibility
//! - Define the canonical movie record persisted by the catalog.
//! - Validate field rules before any store write.
//!
//! # Invariants
//! - `movie_id` is `None` until the store assigns or accepts an identifier.
//! - `movie_cast` keeps caller order; entries are never blank.
//! - `poster`, when set, is a bare file name with an image extension.

use crate::model::entity::Entity;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Integer primary key of a movie row.
pub type MovieId = i64;

/// Earliest accepted release year (first surviving motion picture).
pub const MIN_RELEASE_YEAR: i32 = 1888;
/// Latest accepted release year, allowing announced titles.
pub const MAX_RELEASE_YEAR: i32 = 2100;

static POSTER_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[a-z0-9][a-z0-9._-]*\.(png|jpg|jpeg|gif|webp)$")
        .expect("valid poster name regex")
});

/// Returns whether `name` is an acceptable stored poster file name.
pub fn is_valid_poster_name(name: &str) -> bool {
    POSTER_NAME_RE.is_match(name)
}

/// Field rule violations detected by [`Movie::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MovieValidationError {
    NonPositiveId(MovieId),
    BlankField(&'static str),
    BlankCastMember { position: usize },
    ReleaseYearOutOfRange(i32),
    InvalidPosterName(String),
}

impl Display for MovieValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonPositiveId(id) => write!(f, "movie id must be positive, got {id}"),
            Self::BlankField(field) => write!(f, "movie {field} cannot be blank"),
            Self::BlankCastMember { position } => {
                write!(f, "movie cast member at position {position} cannot be blank")
            }
            Self::ReleaseYearOutOfRange(year) => write!(
                f,
                "release year {year} must be within {MIN_RELEASE_YEAR}..={MAX_RELEASE_YEAR}"
            ),
            Self::InvalidPosterName(name) => write!(f, "invalid poster file name `{name}`"),
        }
    }
}

impl Error for MovieValidationError {}

/// Catalog record for one movie.
///
/// Serialized with camelCase names to match the external movie DTO shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    /// Store identifier; `None` before the first save.
    pub movie_id: Option<MovieId>,
    pub title: String,
    pub director: String,
    pub studio: String,
    /// Billing order is preserved by the store.
    #[serde(default)]
    pub movie_cast: Vec<String>,
    pub release_year: i32,
    /// Stored poster file name, resolved through `PosterStore`.
    #[serde(default)]
    pub poster: Option<String>,
}

impl Movie {
    /// Creates an unsaved movie with an empty cast and no poster.
    pub fn new(
        title: impl Into<String>,
        director: impl Into<String>,
        studio: impl Into<String>,
        release_year: i32,
    ) -> Self {
        Self {
            movie_id: None,
            title: title.into(),
            director: director.into(),
            studio: studio.into(),
            movie_cast: Vec::new(),
            release_year,
            poster: None,
        }
    }

    /// Builder-style helper to set the cast list.
    pub fn with_cast<I, S>(mut self, cast: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.movie_cast = cast.into_iter().map(Into::into).collect();
        self
    }

    /// Builder-style helper to set a caller-assigned identifier.
    pub fn with_id(mut self, movie_id: MovieId) -> Self {
        self.movie_id = Some(movie_id);
        self
    }

    /// Checks every field rule. Called by repositories before writing.
    pub fn validate(&self) -> Result<(), MovieValidationError> {
        if let Some(id) = self.movie_id {
            if id <= 0 {
                return Err(MovieValidationError::NonPositiveId(id));
            }
        }

        for (field, value) in [
            ("title", &self.title),
            ("director", &self.director),
            ("studio", &self.studio),
        ] {
            if value.trim().is_empty() {
                return Err(MovieValidationError::BlankField(field));
            }
        }

        if let Some(position) = self.movie_cast.iter().position(|name| name.trim().is_empty()) {
            return Err(MovieValidationError::BlankCastMember { position });
        }

        if !(MIN_RELEASE_YEAR..=MAX_RELEASE_YEAR).contains(&self.release_year) {
            return Err(MovieValidationError::ReleaseYearOutOfRange(
                self.release_year,
            ));
        }

        if let Some(poster) = self.poster.as_deref() {
            if !is_valid_poster_name(poster) {
                return Err(MovieValidationError::InvalidPosterName(poster.to_string()));
            }
        }

        Ok(())
    }
}

impl Entity for Movie {
    type Id = MovieId;

    fn id(&self) -> Option<MovieId> {
        self.movie_id
    }
}

#[cfg(test)]
mod tests {
    use super::is_valid_poster_name;

    #[test]
    fn poster_name_accepts_images_and_rejects_paths() {
        assert!(is_valid_poster_name("inception.PNG"));
        assert!(is_valid_poster_name("3f2a-poster_v2.jpeg"));
        assert!(!is_valid_poster_name("../etc/passwd.png"));
        assert!(!is_valid_poster_name("dir/poster.png"));
        assert!(!is_valid_poster_name(".hidden.png"));
        assert!(!is_valid_poster_name("notes.txt"));
    }
}
