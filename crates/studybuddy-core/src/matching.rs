//! The Match Deriver.
//!
//! Given a profile whose enrollment set was just persisted, derive one
//! [`Match`] per (unordered profile pair, shared course) against every other
//! profile in the store.  Derivation is idempotent and commutative: the
//! canonical pair ordering plus the unique (profile_a, profile_b, course)
//! constraint guarantee exactly one stored row per key regardless of which
//! side derives first, or how often.

use std::collections::HashMap;
use std::collections::HashSet;

use serde::Serialize;
use studybuddy_shared::{CourseId, ProfileId};
use studybuddy_store::{Course, Database, Match, Profile};

use crate::error::Result;

/// The courses two enrollment sets have in common.
pub fn shared_courses(mine: &HashSet<CourseId>, theirs: &[CourseId]) -> Vec<CourseId> {
    theirs.iter().filter(|c| mine.contains(c)).copied().collect()
}

/// Derive and upsert matches for a profile whose courses just changed.
///
/// Scans every other profile and intersects enrollment sets: O(profiles x
/// avg-courses-per-profile), a deliberate trade-off at classroom scale.  The
/// whole batch of candidate matches is written in one store transaction, so
/// a mid-scan failure aborts the derivation with no partial rows persisted.
///
/// Returns only the newly created matches.  A profile with zero courses
/// derives nothing, and existing matches are never retracted: matches are
/// append-only, even when a shared course is later dropped.
pub fn derive_matches(db: &mut Database, profile_id: ProfileId) -> Result<Vec<Match>> {
    let profile = db.get_profile(profile_id)?;
    let mine: HashSet<CourseId> = profile.courses.iter().copied().collect();

    if mine.is_empty() {
        tracing::debug!(profile = %profile_id, "no enrollment, nothing to derive");
        return Ok(Vec::new());
    }

    let mut candidates = Vec::new();
    for other in db.list_profiles_except(profile_id)? {
        for course_id in shared_courses(&mine, &other.courses) {
            candidates.push(Match::between(profile_id, other.id, course_id));
        }
    }

    let inserted = db.insert_matches(&candidates)?;
    tracing::info!(
        profile = %profile_id,
        candidates = candidates.len(),
        inserted = inserted.len(),
        "derived matches"
    );
    Ok(inserted)
}

/// A matched partner together with the courses shared with them.
#[derive(Debug, Clone, Serialize)]
pub struct Buddy {
    pub profile: Profile,
    pub courses: Vec<Course>,
}

/// Group a profile's matches by partner, each entry carrying the shared
/// courses.  Partners appear in order of their earliest match.
pub fn buddies(db: &Database, profile_id: ProfileId) -> Result<Vec<Buddy>> {
    // Also validates that the profile exists.
    db.get_profile(profile_id)?;

    let matches = db.list_matches_for_profile(profile_id)?;

    let mut order: Vec<ProfileId> = Vec::new();
    let mut by_partner: HashMap<ProfileId, Vec<CourseId>> = HashMap::new();
    for m in &matches {
        let partner = m.partner_of(profile_id);
        by_partner
            .entry(partner)
            .or_insert_with(|| {
                order.push(partner);
                Vec::new()
            })
            .push(m.course_id);
    }

    let mut result = Vec::with_capacity(order.len());
    for partner in order {
        let courses = by_partner
            .remove(&partner)
            .unwrap_or_default()
            .into_iter()
            .map(|id| db.get_course(id))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        result.push(Buddy {
            profile: db.get_profile(partner)?,
            courses,
        });
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use studybuddy_store::{Course, User};

    fn setup() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn profile_with_courses(db: &mut Database, name: &str, courses: &[CourseId]) -> Profile {
        let u = User::new(name.into(), format!("{name}@school.edu"), "hash".into());
        db.create_user(&u).unwrap();
        let mut profile = db.get_or_create_profile(u.id).unwrap();
        profile.courses = courses.to_vec();
        db.save_profile(&profile).unwrap();
        db.get_profile(profile.id).unwrap()
    }

    fn course(db: &Database, code: &str) -> Course {
        let c = Course::new(code.into(), code.into(), "".into());
        db.create_course(&c).unwrap();
        c
    }

    #[test]
    fn shared_enrollment_yields_one_match_per_course() {
        let mut db = setup();
        let math = course(&db, "MATH101");
        let phys = course(&db, "PHYS201");
        let chem = course(&db, "CHEM301");

        let a = profile_with_courses(&mut db, "a", &[math.id, phys.id]);
        let b = profile_with_courses(&mut db, "b", &[phys.id, chem.id]);

        let derived = derive_matches(&mut db, a.id).unwrap();
        assert_eq!(derived.len(), 1);
        assert_eq!(derived[0].course_id, phys.id);
        assert_eq!(derived[0].partner_of(a.id), b.id);
    }

    #[test]
    fn derivation_is_commutative() {
        let mut db = setup();
        let phys = course(&db, "PHYS201");
        let a = profile_with_courses(&mut db, "a", &[phys.id]);
        let b = profile_with_courses(&mut db, "b", &[phys.id]);

        // Derive from both sides, in both orders: still exactly one row.
        derive_matches(&mut db, a.id).unwrap();
        let second = derive_matches(&mut db, b.id).unwrap();
        assert!(second.is_empty());
        assert_eq!(db.list_matches_for_profile(a.id).unwrap().len(), 1);
    }

    #[test]
    fn derivation_is_idempotent() {
        let mut db = setup();
        let math = course(&db, "MATH101");
        let a = profile_with_courses(&mut db, "a", &[math.id]);
        let _b = profile_with_courses(&mut db, "b", &[math.id]);

        assert_eq!(derive_matches(&mut db, a.id).unwrap().len(), 1);
        assert!(derive_matches(&mut db, a.id).unwrap().is_empty());
        assert_eq!(db.list_matches_for_profile(a.id).unwrap().len(), 1);
    }

    #[test]
    fn empty_enrollment_derives_nothing_and_retracts_nothing() {
        let mut db = setup();
        let math = course(&db, "MATH101");
        let mut a = profile_with_courses(&mut db, "a", &[math.id]);
        let _b = profile_with_courses(&mut db, "b", &[math.id]);

        assert_eq!(derive_matches(&mut db, a.id).unwrap().len(), 1);

        // Dropping all courses derives nothing new and leaves the old match.
        a.courses.clear();
        db.save_profile(&a).unwrap();
        assert!(derive_matches(&mut db, a.id).unwrap().is_empty());
        assert_eq!(db.list_matches_for_profile(a.id).unwrap().len(), 1);
    }

    #[test]
    fn buddies_groups_matches_by_partner() {
        let mut db = setup();
        let math = course(&db, "MATH101");
        let phys = course(&db, "PHYS201");

        let a = profile_with_courses(&mut db, "a", &[math.id, phys.id]);
        let b = profile_with_courses(&mut db, "b", &[math.id, phys.id]);
        let c = profile_with_courses(&mut db, "c", &[phys.id]);

        derive_matches(&mut db, a.id).unwrap();

        let buddies = buddies(&db, a.id).unwrap();
        assert_eq!(buddies.len(), 2);

        let with_b = buddies.iter().find(|x| x.profile.id == b.id).unwrap();
        assert_eq!(with_b.courses.len(), 2);
        let with_c = buddies.iter().find(|x| x.profile.id == c.id).unwrap();
        assert_eq!(with_c.courses.len(), 1);
        assert_eq!(with_c.courses[0].code, "PHYS201");
    }
}
