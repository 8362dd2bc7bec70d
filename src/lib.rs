//! Admin content synchronization for a personal portfolio site.
//!
//! The crate keeps an in-memory view of every content collection in step
//! with a remote content API: it retries rate-limited calls, walks entity
//! drafts through multi-step forms, uploads media concurrently, and folds
//! server responses back into ordered lists.

pub mod application;
pub mod commands;
pub mod config;
pub mod domain;
pub mod infra;
