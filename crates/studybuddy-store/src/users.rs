//! CRUD operations for [`User`] records.

use rusqlite::params;
use studybuddy_shared::UserId;

use crate::database::Database;
use crate::error::{map_insert_error, Result, StoreError};
use crate::models::User;
use crate::rows;

impl Database {
    /// Insert a new user.  Duplicate usernames or emails surface as
    /// [`StoreError::Duplicate`].
    pub fn create_user(&self, user: &User) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO users (id, username, email, credential_hash, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    user.id.to_string(),
                    user.username,
                    user.email,
                    user.credential_hash,
                    user.created_at.to_rfc3339(),
                    user.updated_at.to_rfc3339(),
                ],
            )
            .map_err(map_insert_error)?;
        Ok(())
    }

    /// Fetch a single user by id.
    pub fn get_user(&self, id: UserId) -> Result<User> {
        self.conn()
            .query_row(
                "SELECT id, username, email, credential_hash, created_at, updated_at
                 FROM users WHERE id = ?1",
                params![id.to_string()],
                row_to_user,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Fetch a user by unique username.
    pub fn get_user_by_username(&self, username: &str) -> Result<User> {
        self.conn()
            .query_row(
                "SELECT id, username, email, credential_hash, created_at, updated_at
                 FROM users WHERE username = ?1",
                params![username],
                row_to_user,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let id_str: String = row.get(0)?;
    let username: String = row.get(1)?;
    let email: String = row.get(2)?;
    let credential_hash: String = row.get(3)?;
    let created_str: String = row.get(4)?;
    let updated_str: String = row.get(5)?;

    Ok(User {
        id: UserId(rows::uuid_col(0, &id_str)?),
        username,
        email,
        credential_hash,
        created_at: rows::timestamp_col(4, &created_str)?,
        updated_at: rows::timestamp_col(5, &updated_str)?,
    })
}
