//! Domain model for the movie catalog.
//!
//! # Responsibility
//! - Define the `Entity` contract that generic repositories are written against.
//! - Define the `Movie` record and its validation rules.
//!
//! # Invariants
//! - An entity without an identifier has never been persisted.
//! - Identifiers are unique within one store.

pub mod entity;
pub mod movie;
