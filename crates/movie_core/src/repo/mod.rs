//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the generic `EntityRepository` contract and pagination types.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Repository writes enforce `Movie::validate()` before persistence.
//! - Absence on lookup is `Ok(None)`; store failures are `RepoError::Db`.

pub mod entity_repo;
pub mod movie_repo;
pub mod page;
