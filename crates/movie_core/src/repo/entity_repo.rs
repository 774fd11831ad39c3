//! Generic repository contract and repository error type.
//!
//! # Responsibility
//! - Define CRUD + pagination operations over any `Entity` type.
//! - Derive the convenience surface (`exists_by_id`, `save_all`, ...) from
//!   the required primitives so every store gets it for free.
//!
//! # Invariants
//! - Lookups report absence as `Ok(None)`, never as an error.
//! - `save` never duplicates an entity that already has an identifier.
//! - `delete_by_id` on an absent identifier is a no-op.

use crate::db::DbError;
use crate::model::entity::Entity;
use crate::model::movie::MovieValidationError;
use crate::repo::page::{Page, PageRequest};
use rusqlite::ErrorCode;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Entity rejected before any store write.
    Validation(MovieValidationError),
    /// Store unavailable or failed mid-operation.
    Db(DbError),
    /// A store constraint (uniqueness, check, foreign key) refused the write.
    ConstraintViolation(String),
    NotFound {
        entity: &'static str,
        id: String,
    },
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl RepoError {
    pub fn not_found(entity: &'static str, id: impl Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::ConstraintViolation(message) => write!(f, "constraint violation: {message}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}; open it through db::open_db"
            ),
            Self::MissingRequiredTable(table) => write!(f, "required table `{table}` is missing"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "required column `{table}.{column}` is missing")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MovieValidationError> for RepoError {
    fn from(value: MovieValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Sqlite(err) => Self::from(err),
            other => Self::Db(other),
        }
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(ref failure, ref message)
                if failure.code == ErrorCode::ConstraintViolation =>
            {
                let detail = message
                    .clone()
                    .unwrap_or_else(|| failure.to_string());
                Self::ConstraintViolation(detail)
            }
            other => Self::Db(DbError::Sqlite(other)),
        }
    }
}

/// Persistence operations for entities of type `T` keyed by `ID`.
///
/// Implementors provide the six primitives; the remaining methods are
/// expressed in terms of them and may be overridden when a store can do
/// better (a single statement, one transaction).
pub trait EntityRepository<T, ID>
where
    T: Entity<Id = ID>,
    ID: Copy,
{
    /// Inserts when `entity.id()` is `None`, otherwise updates or inserts
    /// under the caller-assigned id. Returns the persisted entity.
    fn save(&self, entity: &T) -> RepoResult<T>;

    fn find_by_id(&self, id: ID) -> RepoResult<Option<T>>;

    /// All entities in store-defined order.
    fn find_all(&self) -> RepoResult<Vec<T>>;

    fn find_page(&self, request: PageRequest) -> RepoResult<Page<T>>;

    /// Removes the entity if present.
    fn delete_by_id(&self, id: ID) -> RepoResult<()>;

    fn count(&self) -> RepoResult<u64>;

    fn exists_by_id(&self, id: ID) -> RepoResult<bool> {
        Ok(self.find_by_id(id)?.is_some())
    }

    /// Entities found for `ids`, in request order; missing ids are skipped.
    fn find_all_by_id(&self, ids: &[ID]) -> RepoResult<Vec<T>> {
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(entity) = self.find_by_id(*id)? {
                found.push(entity);
            }
        }
        Ok(found)
    }

    fn save_all(&self, entities: &[T]) -> RepoResult<Vec<T>> {
        entities.iter().map(|entity| self.save(entity)).collect()
    }

    /// Deletes by the entity's identifier; unsaved entities are ignored.
    fn delete(&self, entity: &T) -> RepoResult<()> {
        match entity.id() {
            Some(id) => self.delete_by_id(id),
            None => Ok(()),
        }
    }

    fn delete_all(&self) -> RepoResult<()> {
        for entity in self.find_all()? {
            self.delete(&entity)?;
        }
        Ok(())
    }
}
