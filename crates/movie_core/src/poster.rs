//! File-system store for movie poster images.
//!
//! # Responsibility
//! - Copy uploaded poster files under collision-free generated names.
//! - Resolve stored names back to paths without escaping the poster directory.
//!
//! # Invariants
//! - Stored names are `<uuid-v4>.<lowercase extension>`.
//! - Only names accepted by `is_valid_poster_name` are ever joined to `dir`.

use crate::model::movie::is_valid_poster_name;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

pub type PosterResult<T> = Result<T, PosterError>;

#[derive(Debug)]
pub enum PosterError {
    UnsupportedExtension(PathBuf),
    InvalidName(String),
    Io { path: PathBuf, source: io::Error },
}

impl Display for PosterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedExtension(path) => write!(
                f,
                "unsupported poster file `{}`; expected one of {}",
                path.display(),
                SUPPORTED_EXTENSIONS.join("|")
            ),
            Self::InvalidName(name) => write!(f, "invalid poster name `{name}`"),
            Self::Io { path, source } => write!(f, "poster I/O failed at `{}`: {source}", path.display()),
        }
    }
}

impl Error for PosterError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Directory holding poster files referenced by `Movie::poster`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PosterStore {
    dir: PathBuf,
}

impl PosterStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copies `source` into the store and returns the generated file name.
    ///
    /// # Errors
    /// - `UnsupportedExtension` when `source` is not a known image type.
    /// - `Io` when the directory cannot be created or the copy fails.
    pub fn store(&self, source: &Path) -> PosterResult<String> {
        let extension = source
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .filter(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
            .ok_or_else(|| PosterError::UnsupportedExtension(source.to_path_buf()))?;

        std::fs::create_dir_all(&self.dir).map_err(|source| PosterError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let name = format!("{}.{extension}", Uuid::new_v4());
        let target = self.dir.join(&name);
        let bytes = std::fs::copy(source, &target).map_err(|err| PosterError::Io {
            path: source.to_path_buf(),
            source: err,
        })?;

        info!("event=poster_store module=poster status=ok name={name} bytes={bytes}");
        Ok(name)
    }

    /// Resolves a stored poster name to its path inside the store.
    pub fn path_of(&self, name: &str) -> PosterResult<PathBuf> {
        if !is_valid_poster_name(name) {
            return Err(PosterError::InvalidName(name.to_string()));
        }
        Ok(self.dir.join(name))
    }

    /// Deletes a stored poster. A file that is already gone is not an error.
    pub fn remove(&self, name: &str) -> PosterResult<()> {
        let path = self.path_of(name)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!("event=poster_remove module=poster status=ok name={name}");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                warn!("event=poster_remove module=poster status=missing name={name}");
                Ok(())
            }
            Err(source) => Err(PosterError::Io { path, source }),
        }
    }
}
