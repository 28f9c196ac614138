//! CRUD operations for derived [`Match`] records.
//!
//! Matches are write-once: the matching engine upserts them with
//! `INSERT OR IGNORE` against the unique (profile_a, profile_b, course)
//! triple, so re-derivation and concurrent derivations for overlapping
//! profiles collapse to a single stored row per key.

use rusqlite::params;
use studybuddy_shared::{CourseId, MatchId, ProfileId};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Match;
use crate::rows;

impl Database {
    /// Upsert a batch of canonically-ordered matches in one transaction.
    ///
    /// Returns only the matches that were actually inserted; rows whose key
    /// already existed are silently skipped.  If any statement fails the
    /// whole batch rolls back, so a derivation never persists partially.
    pub fn insert_matches(&mut self, candidates: &[Match]) -> Result<Vec<Match>> {
        let tx = self.conn_mut().transaction()?;

        let mut inserted = Vec::new();
        for m in candidates {
            debug_assert!(m.profile_a <= m.profile_b, "match pair not canonical");
            let affected = tx.execute(
                "INSERT OR IGNORE INTO matches (id, profile_a, profile_b, course_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    m.id.to_string(),
                    m.profile_a.to_string(),
                    m.profile_b.to_string(),
                    m.course_id.to_string(),
                    m.created_at.to_rfc3339(),
                ],
            )?;
            if affected > 0 {
                inserted.push(m.clone());
            }
        }

        tx.commit()?;
        Ok(inserted)
    }

    /// List every match involving the given profile, oldest first.
    pub fn list_matches_for_profile(&self, id: ProfileId) -> Result<Vec<Match>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, profile_a, profile_b, course_id, created_at
             FROM matches
             WHERE profile_a = ?1 OR profile_b = ?1
             ORDER BY created_at ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![id.to_string()], row_to_match)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }
}

fn row_to_match(row: &rusqlite::Row<'_>) -> rusqlite::Result<Match> {
    let id_str: String = row.get(0)?;
    let a_str: String = row.get(1)?;
    let b_str: String = row.get(2)?;
    let course_str: String = row.get(3)?;
    let created_str: String = row.get(4)?;

    Ok(Match {
        id: MatchId(rows::uuid_col(0, &id_str)?),
        profile_a: ProfileId(rows::uuid_col(1, &a_str)?),
        profile_b: ProfileId(rows::uuid_col(2, &b_str)?),
        course_id: CourseId(rows::uuid_col(3, &course_str)?),
        created_at: rows::timestamp_col(4, &created_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Course, Profile, User};
    use studybuddy_shared::UserId;

    fn profile(db: &mut Database) -> Profile {
        let name = format!("u{}", UserId::new());
        let u = User::new(name.clone(), format!("{name}@school.edu"), "hash".into());
        db.create_user(&u).unwrap();
        db.get_or_create_profile(u.id).unwrap()
    }

    #[test]
    fn second_insert_of_same_key_is_ignored() {
        let mut db = Database::open_in_memory().unwrap();
        let p1 = profile(&mut db);
        let p2 = profile(&mut db);
        let course = Course::new("MATH101".into(), "Calculus".into(), "".into());
        db.create_course(&course).unwrap();

        let first = Match::between(p1.id, p2.id, course.id);
        assert_eq!(db.insert_matches(&[first]).unwrap().len(), 1);

        // Same unordered pair, swapped argument order: canonicalization plus
        // the unique triple collapse it to the existing row.
        let second = Match::between(p2.id, p1.id, course.id);
        assert!(db.insert_matches(&[second]).unwrap().is_empty());

        assert_eq!(db.list_matches_for_profile(p1.id).unwrap().len(), 1);
    }

    #[test]
    fn listing_sees_the_match_from_both_sides() {
        let mut db = Database::open_in_memory().unwrap();
        let p1 = profile(&mut db);
        let p2 = profile(&mut db);
        let course = Course::new("CHEM301".into(), "Organic Chemistry".into(), "".into());
        db.create_course(&course).unwrap();

        db.insert_matches(&[Match::between(p1.id, p2.id, course.id)])
            .unwrap();

        let from_a = db.list_matches_for_profile(p1.id).unwrap();
        let from_b = db.list_matches_for_profile(p2.id).unwrap();
        assert_eq!(from_a, from_b);
        assert_eq!(from_a[0].partner_of(p1.id), p2.id);
        assert_eq!(from_a[0].partner_of(p2.id), p1.id);
    }
}
