//! Schema migrations, tracked via SQLite's `user_version` pragma.
//!
//! Every [`Database::new`](crate::Database::new) /
//! [`Database::open_at`](crate::Database::open_at) call replays whatever steps
//! the stored version is missing, so opening an older database upgrades it in
//! place.

pub mod v001_initial;

use rusqlite::Connection;

use crate::error::{Result, StoreError};

type MigrationFn = fn(&Connection) -> std::result::Result<(), rusqlite::Error>;

/// Ordered migration steps.  Append a `(version, name, up)` entry here when
/// the schema changes; versions must be contiguous and start at 1.
const MIGRATIONS: &[(u32, &str, MigrationFn)] = &[(1, "v001_initial", v001_initial::up)];

/// Bring the connection's schema up to the latest version.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let mut version: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    for (target, name, up) in MIGRATIONS {
        if version >= *target {
            continue;
        }
        tracing::info!(from = version, to = target, step = name, "applying schema migration");
        up(conn).map_err(|e| StoreError::Migration(format!("{name}: {e}")))?;
        conn.pragma_update(None, "user_version", target)?;
        version = *target;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_contiguous_from_one() {
        for (i, (version, _, _)) in MIGRATIONS.iter().enumerate() {
            assert_eq!(*version as usize, i + 1);
        }
    }

    #[test]
    fn rerunning_on_migrated_database_is_a_no_op() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let before: u32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        run_migrations(&conn).unwrap();
        let after: u32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(before, after);
        assert_eq!(after, MIGRATIONS.last().map(|(v, _, _)| *v).unwrap());
    }
}
