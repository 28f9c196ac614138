//! CRUD operations for [`Profile`] records and their course enrollment.
//!
//! A profile's enrollment set lives in the `profile_courses` join table and is
//! only ever replaced wholesale by [`Database::save_profile`], inside one
//! transaction with the profile row itself.

use chrono::Utc;
use rusqlite::{params, Connection};
use studybuddy_shared::{CourseId, ProfileId, UserId};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Profile;
use crate::rows;

const PROFILE_COLUMNS: &str = "id, user_id, first_name, last_name, bio, major, \
     availability, study_methods, avatar_ref, rating, created_at, updated_at";

impl Database {
    /// Fetch the profile for a user, creating a blank one on first access.
    pub fn get_or_create_profile(&mut self, user_id: UserId) -> Result<Profile> {
        match self.get_profile_for_user(user_id) {
            Ok(profile) => Ok(profile),
            Err(StoreError::NotFound) => {
                // Surface a missing user as NotFound rather than a foreign
                // key failure from the insert.
                self.get_user(user_id)?;

                let profile = Profile::empty(user_id);
                self.conn().execute(
                    "INSERT INTO profiles
                         (id, user_id, first_name, last_name, bio, major,
                          availability, study_methods, avatar_ref, rating,
                          created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                    params![
                        profile.id.to_string(),
                        profile.user_id.to_string(),
                        profile.first_name,
                        profile.last_name,
                        profile.bio,
                        profile.major,
                        profile.availability,
                        profile.study_methods,
                        profile.avatar_ref,
                        profile.rating,
                        profile.created_at.to_rfc3339(),
                        profile.updated_at.to_rfc3339(),
                    ],
                )?;
                tracing::debug!(user = %user_id, profile = %profile.id, "created blank profile");
                Ok(profile)
            }
            Err(other) => Err(other),
        }
    }

    /// Fetch a single profile (with enrollment) by id.
    pub fn get_profile(&self, id: ProfileId) -> Result<Profile> {
        let mut profile = self
            .conn()
            .query_row(
                &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?1"),
                params![id.to_string()],
                row_to_profile,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })?;
        profile.courses = load_enrollment(self.conn(), profile.id)?;
        Ok(profile)
    }

    /// Fetch a single profile (with enrollment) by owning user.
    pub fn get_profile_for_user(&self, user_id: UserId) -> Result<Profile> {
        let mut profile = self
            .conn()
            .query_row(
                &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = ?1"),
                params![user_id.to_string()],
                row_to_profile,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })?;
        profile.courses = load_enrollment(self.conn(), profile.id)?;
        Ok(profile)
    }

    /// Persist a profile's fields and replace its enrollment set, atomically.
    ///
    /// The profile row and the `profile_courses` rows are written in a single
    /// transaction, so a reader never observes a half-replaced enrollment set.
    pub fn save_profile(&mut self, profile: &Profile) -> Result<()> {
        let tx = self.conn_mut().transaction()?;

        let affected = tx.execute(
            "UPDATE profiles
             SET first_name = ?2, last_name = ?3, bio = ?4, major = ?5,
                 availability = ?6, study_methods = ?7, avatar_ref = ?8,
                 updated_at = ?9
             WHERE id = ?1",
            params![
                profile.id.to_string(),
                profile.first_name,
                profile.last_name,
                profile.bio,
                profile.major,
                profile.availability,
                profile.study_methods,
                profile.avatar_ref,
                Utc::now().to_rfc3339(),
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }

        tx.execute(
            "DELETE FROM profile_courses WHERE profile_id = ?1",
            params![profile.id.to_string()],
        )?;
        for course_id in &profile.courses {
            tx.execute(
                "INSERT OR IGNORE INTO profile_courses (profile_id, course_id) VALUES (?1, ?2)",
                params![profile.id.to_string(), course_id.to_string()],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// List every profile, enrollment included, ordered by name.
    pub fn list_profiles(&self) -> Result<Vec<Profile>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles
             ORDER BY last_name ASC, first_name ASC"
        ))?;
        let rows = stmt.query_map([], row_to_profile)?;
        self.attach_enrollment(rows)
    }

    /// List every profile except the given one, enrollment included.
    ///
    /// Used by the matching engine's full scan.  One query per profile for the
    /// enrollment is fine at classroom scale; an indexed join would replace
    /// this if the store ever grew large.
    pub fn list_profiles_except(&self, id: ProfileId) -> Result<Vec<Profile>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id != ?1
             ORDER BY last_name ASC, first_name ASC"
        ))?;
        let rows = stmt.query_map(params![id.to_string()], row_to_profile)?;
        self.attach_enrollment(rows)
    }

    /// Text search over profiles: case-insensitive substring match against
    /// enrolled course names, study methods, bio, and the owning username.
    pub fn search_profiles(&self, query: &str) -> Result<Vec<Profile>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT DISTINCT p.{}
             FROM profiles p
             JOIN users u ON u.id = p.user_id
             LEFT JOIN profile_courses pc ON pc.profile_id = p.id
             LEFT JOIN courses c ON c.id = pc.course_id
             WHERE c.name LIKE '%' || ?1 || '%'
                OR p.study_methods LIKE '%' || ?1 || '%'
                OR p.bio LIKE '%' || ?1 || '%'
                OR u.username LIKE '%' || ?1 || '%'
             ORDER BY p.last_name ASC, p.first_name ASC",
            PROFILE_COLUMNS.replace(", ", ", p."),
        ))?;
        let rows = stmt.query_map(params![query], row_to_profile)?;
        self.attach_enrollment(rows)
    }

    /// Overwrite the cached mean rating on a profile.
    pub fn set_profile_rating(&self, id: ProfileId, rating: f64) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE profiles SET rating = ?2, updated_at = ?3 WHERE id = ?1",
            params![id.to_string(), rating, Utc::now().to_rfc3339()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    fn attach_enrollment<F>(&self, rows: rusqlite::MappedRows<'_, F>) -> Result<Vec<Profile>>
    where
        F: FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<Profile>,
    {
        let mut profiles = Vec::new();
        for row in rows {
            let mut profile = row?;
            profile.courses = load_enrollment(self.conn(), profile.id)?;
            profiles.push(profile);
        }
        Ok(profiles)
    }
}

fn load_enrollment(conn: &Connection, profile_id: ProfileId) -> Result<Vec<CourseId>> {
    let mut stmt = conn.prepare(
        "SELECT pc.course_id
         FROM profile_courses pc
         JOIN courses c ON c.id = pc.course_id
         WHERE pc.profile_id = ?1
         ORDER BY c.code ASC",
    )?;
    let rows = stmt.query_map(params![profile_id.to_string()], |row| {
        let id_str: String = row.get(0)?;
        Ok(CourseId(rows::uuid_col(0, &id_str)?))
    })?;
    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(StoreError::Sqlite)
}

fn row_to_profile(row: &rusqlite::Row<'_>) -> rusqlite::Result<Profile> {
    let id_str: String = row.get(0)?;
    let user_id_str: String = row.get(1)?;
    let first_name: String = row.get(2)?;
    let last_name: String = row.get(3)?;
    let bio: String = row.get(4)?;
    let major: Option<String> = row.get(5)?;
    let availability: String = row.get(6)?;
    let study_methods: String = row.get(7)?;
    let avatar_ref: Option<String> = row.get(8)?;
    let rating: f64 = row.get(9)?;
    let created_str: String = row.get(10)?;
    let updated_str: String = row.get(11)?;

    Ok(Profile {
        id: ProfileId(rows::uuid_col(0, &id_str)?),
        user_id: UserId(rows::uuid_col(1, &user_id_str)?),
        first_name,
        last_name,
        bio,
        major,
        availability,
        study_methods,
        avatar_ref,
        rating,
        courses: Vec::new(),
        created_at: rows::timestamp_col(10, &created_str)?,
        updated_at: rows::timestamp_col(11, &updated_str)?,
    })
}
