//! # studybuddy-shared
//!
//! Types shared by every StudyBuddy crate: strongly-typed identifiers for the
//! domain entities, the canonical-pair helper that keeps Match records
//! order-independent, and domain constants.

pub mod constants;
pub mod types;

pub use types::*;
