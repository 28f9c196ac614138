//! # studybuddy-store
//!
//! SQLite persistence for the StudyBuddy application.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for every domain
//! model: users, courses, profiles (with their course enrollment), derived
//! matches, messages, and reviews.  Schema invariants that back the matching
//! and review contracts (canonical-pair uniqueness, one review per ordered
//! user pair) live here as SQL constraints.

pub mod courses;
pub mod database;
pub mod matches;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod profiles;
pub mod reviews;
pub mod users;

mod error;
mod rows;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
