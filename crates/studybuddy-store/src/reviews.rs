//! CRUD operations for [`Review`] records.
//!
//! The unique (reviewer, reviewed) constraint is the correctness backstop for
//! "a user may rate another exactly once": even two near-simultaneous
//! submissions end with a single stored row and a [`StoreError::Duplicate`]
//! for the loser.

use rusqlite::params;
use studybuddy_shared::{ReviewId, UserId};

use crate::database::Database;
use crate::error::{map_insert_error, Result, StoreError};
use crate::models::Review;
use crate::rows;

impl Database {
    /// Insert a new review.  A second review for the same ordered
    /// (reviewer, reviewed) pair surfaces as [`StoreError::Duplicate`].
    pub fn insert_review(&self, review: &Review) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO reviews (id, reviewer, reviewed, rating, comment, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    review.id.to_string(),
                    review.reviewer.to_string(),
                    review.reviewed.to_string(),
                    review.rating,
                    review.comment,
                    review.created_at.to_rfc3339(),
                ],
            )
            .map_err(map_insert_error)?;
        Ok(())
    }

    /// Whether `reviewer` has already reviewed `reviewed`.
    pub fn review_exists(&self, reviewer: UserId, reviewed: UserId) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM reviews WHERE reviewer = ?1 AND reviewed = ?2",
            params![reviewer.to_string(), reviewed.to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// The full review table, newest first.
    pub fn list_reviews(&self) -> Result<Vec<Review>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, reviewer, reviewed, rating, comment, created_at
             FROM reviews
             ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([], row_to_review)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Reviews received by one user, newest first.
    pub fn list_reviews_for_user(&self, reviewed: UserId) -> Result<Vec<Review>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, reviewer, reviewed, rating, comment, created_at
             FROM reviews
             WHERE reviewed = ?1
             ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map(params![reviewed.to_string()], row_to_review)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }
}

fn row_to_review(row: &rusqlite::Row<'_>) -> rusqlite::Result<Review> {
    let id_str: String = row.get(0)?;
    let reviewer_str: String = row.get(1)?;
    let reviewed_str: String = row.get(2)?;
    let rating: i64 = row.get(3)?;
    let comment: Option<String> = row.get(4)?;
    let created_str: String = row.get(5)?;

    Ok(Review {
        id: ReviewId(rows::uuid_col(0, &id_str)?),
        reviewer: UserId(rows::uuid_col(1, &reviewer_str)?),
        reviewed: UserId(rows::uuid_col(2, &reviewed_str)?),
        rating,
        comment,
        created_at: rows::timestamp_col(5, &created_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;

    fn user(db: &Database, name: &str) -> UserId {
        let u = User::new(name.into(), format!("{name}@school.edu"), "hash".into());
        db.create_user(&u).unwrap();
        u.id
    }

    #[test]
    fn second_review_for_same_pair_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");

        let original = Review::new(alice, bob, 5, Some("great partner".into()));
        db.insert_review(&original).unwrap();

        let err = db
            .insert_review(&Review::new(alice, bob, 1, None))
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate));

        // The original review is unchanged.
        let stored = db.list_reviews_for_user(bob).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].rating, 5);
    }

    #[test]
    fn reverse_direction_is_a_different_pair() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");

        db.insert_review(&Review::new(alice, bob, 4, None)).unwrap();
        db.insert_review(&Review::new(bob, alice, 3, None)).unwrap();

        assert!(db.review_exists(alice, bob).unwrap());
        assert!(db.review_exists(bob, alice).unwrap());
        assert_eq!(db.list_reviews().unwrap().len(), 2);
    }
}
