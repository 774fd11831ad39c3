//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository and poster-store calls into use-case level APIs.
//! - Keep callers decoupled from storage details.

pub mod movie_service;
