//! Domain model structs persisted in the SQLite database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to the HTTP layer as structured response data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use studybuddy_shared::{canonical_pair, CourseId, MatchId, MessageId, ProfileId, ReviewId, UserId};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// An account identity.  Owned by the auth subsystem; the store only enforces
/// username/email uniqueness and never inspects the credential hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    /// Institutional email, syntactically validated upstream at signup.
    pub email: String,
    /// Opaque credential hash.  Never logged, never returned over HTTP.
    #[serde(skip_serializing)]
    pub credential_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: String, email: String, credential_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            username,
            email,
            credential_hash,
            created_at: now,
            updated_at: now,
        }
    }
}

// ---------------------------------------------------------------------------
// Course
// ---------------------------------------------------------------------------

/// Immutable reference data created by administrators.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Course {
    pub id: CourseId,
    /// Unique, stable identifier (e.g. "MATH101").
    pub code: String,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl Course {
    pub fn new(code: String, name: String, description: String) -> Self {
        Self {
            id: CourseId::new(),
            code,
            name,
            description,
            created_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// A study profile.  Exactly one per user, created lazily on first access.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub id: ProfileId,
    pub user_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub major: Option<String>,
    /// Free-text availability, e.g. "weekday evenings".
    pub availability: String,
    /// Free-text preferred study methods, e.g. "flashcards, group review".
    pub study_methods: String,
    /// Opaque reference to a stored avatar image.  The core never interprets it.
    pub avatar_ref: Option<String>,
    /// Cached mean of received review ratings, in [0, 5].  0 when unreviewed.
    pub rating: f64,
    /// Course enrollment set.  Mutated only via `save_profile`.
    pub courses: Vec<CourseId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// A blank profile for a user, as created on first access.
    pub fn empty(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: ProfileId::new(),
            user_id,
            first_name: String::new(),
            last_name: String::new(),
            bio: String::new(),
            major: None,
            availability: String::new(),
            study_methods: String::new(),
            avatar_ref: None,
            rating: 0.0,
            courses: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

// ---------------------------------------------------------------------------
// Match
// ---------------------------------------------------------------------------

/// A derived record asserting two profiles share enrollment in one course.
///
/// The pair is stored canonically (`profile_a < profile_b` under Uuid byte
/// order) so the same unordered pair is never stored twice under swapped
/// roles.  Match rows are derived by the matching engine and never edited.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Match {
    pub id: MatchId,
    pub profile_a: ProfileId,
    pub profile_b: ProfileId,
    pub course_id: CourseId,
    pub created_at: DateTime<Utc>,
}

impl Match {
    /// Build a match for an unordered profile pair, canonicalizing the order.
    pub fn between(a: ProfileId, b: ProfileId, course_id: CourseId) -> Self {
        let (profile_a, profile_b) = canonical_pair(a, b);
        Self {
            id: MatchId::new(),
            profile_a,
            profile_b,
            course_id,
            created_at: Utc::now(),
        }
    }

    /// The profile on the other side of the match from `mine`.
    pub fn partner_of(&self, mine: ProfileId) -> ProfileId {
        if self.profile_a == mine {
            self.profile_b
        } else {
            self.profile_a
        }
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A directed message between two users.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub sender: UserId,
    pub receiver: UserId,
    pub content: String,
    /// Unread by default; flips false -> true exactly once, on first view by
    /// the receiver.
    pub read: bool,
    /// Optional shallow reply chain to an earlier message.
    pub reply_to: Option<MessageId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Message {
    pub fn new(
        sender: UserId,
        receiver: UserId,
        content: String,
        reply_to: Option<MessageId>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: MessageId::new(),
            sender,
            receiver,
            content,
            read: false,
            reply_to,
            created_at: now,
            updated_at: now,
        }
    }
}

// ---------------------------------------------------------------------------
// Review
// ---------------------------------------------------------------------------

/// A one-time rating left by `reviewer` on `reviewed`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Review {
    pub id: ReviewId,
    pub reviewer: UserId,
    pub reviewed: UserId,
    /// Integer rating in 1..=5.
    pub rating: i64,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Review {
    pub fn new(reviewer: UserId, reviewed: UserId, rating: i64, comment: Option<String>) -> Self {
        Self {
            id: ReviewId::new(),
            reviewer,
            reviewed,
            rating,
            comment,
            created_at: Utc::now(),
        }
    }
}
