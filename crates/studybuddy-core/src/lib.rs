//! # studybuddy-core
//!
//! The matching and relationship-derivation engine for StudyBuddy.
//!
//! Three request-driven engines operate over the entity store:
//!
//! - [`matching`] turns many-to-many course enrollment into deduplicated,
//!   symmetric pairwise [`studybuddy_store::Match`] records.
//! - [`threads`] collapses a user's flat message log into per-partner
//!   conversation threads, marking received messages read on inbox view.
//! - [`reviews`] filters, sorts, paginates and aggregates the review table.
//!
//! [`messaging`] carries the message write workflows (send, read flips) that
//! feed the thread aggregator.
//!
//! All operations return structured [`CoreError`] kinds (never raw storage
//! errors), and none of them hold cross-request locks or block on another
//! user's action.

pub mod matching;
pub mod messaging;
pub mod reviews;
pub mod threads;

mod error;

pub use error::CoreError;
