//! v001 -- Initial schema creation.
//!
//! Creates the core tables: `users`, `courses`, `profiles`,
//! `profile_courses`, `matches`, `messages`, and `reviews`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users (owned by the auth subsystem; referenced by everything else)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id              TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    username        TEXT NOT NULL UNIQUE,
    email           TEXT NOT NULL UNIQUE,        -- validated upstream at signup
    credential_hash TEXT NOT NULL,               -- opaque; hashing owned by auth
    created_at      TEXT NOT NULL,               -- ISO-8601 / RFC-3339
    updated_at      TEXT NOT NULL
);

-- ----------------------------------------------------------------
-- Courses (immutable reference data, admin-created)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS courses (
    id          TEXT PRIMARY KEY NOT NULL,       -- UUID v4
    code        TEXT NOT NULL UNIQUE,
    name        TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    created_at  TEXT NOT NULL
);

-- ----------------------------------------------------------------
-- Profiles (exactly one per user, created lazily)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS profiles (
    id         TEXT PRIMARY KEY NOT NULL,        -- UUID v4
    user_id    TEXT NOT NULL UNIQUE,             -- FK -> users(id)
    first_name TEXT NOT NULL DEFAULT '',
    last_name  TEXT NOT NULL DEFAULT '',
    bio        TEXT NOT NULL DEFAULT '',
    major      TEXT,
    availability  TEXT NOT NULL DEFAULT '',      -- free text, e.g. "weekday evenings"
    study_methods TEXT NOT NULL DEFAULT '',      -- free text, searchable
    avatar_ref TEXT,                             -- opaque reference, never interpreted
    rating     REAL NOT NULL DEFAULT 0,          -- cached mean of received reviews
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,

    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

-- ----------------------------------------------------------------
-- Enrollment (many-to-many profile <-> course)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS profile_courses (
    profile_id TEXT NOT NULL,                    -- FK -> profiles(id)
    course_id  TEXT NOT NULL,                    -- FK -> courses(id)

    PRIMARY KEY (profile_id, course_id),
    FOREIGN KEY (profile_id) REFERENCES profiles(id) ON DELETE CASCADE,
    FOREIGN KEY (course_id)  REFERENCES courses(id)  ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_profile_courses_course
    ON profile_courses(course_id);

-- ----------------------------------------------------------------
-- Matches (derived; canonical pair, profile_a < profile_b)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS matches (
    id         TEXT PRIMARY KEY NOT NULL,        -- UUID v4
    profile_a  TEXT NOT NULL,                    -- FK -> profiles(id), smaller id
    profile_b  TEXT NOT NULL,                    -- FK -> profiles(id), larger id
    course_id  TEXT NOT NULL,                    -- FK -> courses(id)
    created_at TEXT NOT NULL,

    UNIQUE (profile_a, profile_b, course_id),
    FOREIGN KEY (profile_a) REFERENCES profiles(id) ON DELETE CASCADE,
    FOREIGN KEY (profile_b) REFERENCES profiles(id) ON DELETE CASCADE,
    FOREIGN KEY (course_id) REFERENCES courses(id)  ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_matches_profile_a ON matches(profile_a);
CREATE INDEX IF NOT EXISTS idx_matches_profile_b ON matches(profile_b);

-- ----------------------------------------------------------------
-- Messages (directed sender -> receiver)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    id         TEXT PRIMARY KEY NOT NULL,        -- UUID v4
    sender     TEXT NOT NULL,                    -- FK -> users(id)
    receiver   TEXT NOT NULL,                    -- FK -> users(id)
    content    TEXT NOT NULL,
    read       INTEGER NOT NULL DEFAULT 0,       -- boolean 0/1
    reply_to   TEXT,                             -- nullable FK -> messages(id)
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,

    FOREIGN KEY (sender)   REFERENCES users(id)    ON DELETE CASCADE,
    FOREIGN KEY (receiver) REFERENCES users(id)    ON DELETE CASCADE,
    FOREIGN KEY (reply_to) REFERENCES messages(id) ON DELETE SET NULL
);

CREATE INDEX IF NOT EXISTS idx_messages_receiver_read
    ON messages(receiver, read);
CREATE INDEX IF NOT EXISTS idx_messages_sender ON messages(sender);

-- ----------------------------------------------------------------
-- Reviews (directed reviewer -> reviewed, at most one per ordered pair)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS reviews (
    id         TEXT PRIMARY KEY NOT NULL,        -- UUID v4
    reviewer   TEXT NOT NULL,                    -- FK -> users(id)
    reviewed   TEXT NOT NULL,                    -- FK -> users(id)
    rating     INTEGER NOT NULL,                 -- 1..=5, range checked in core
    comment    TEXT,
    created_at TEXT NOT NULL,

    UNIQUE (reviewer, reviewed),
    FOREIGN KEY (reviewer) REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (reviewed) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_reviews_reviewed ON reviews(reviewed);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
