//! Column-conversion helpers shared by the per-entity row mappers.
//!
//! Identifiers and timestamps are stored as TEXT; these helpers turn parse
//! failures into `rusqlite::Error::FromSqlConversionFailure` so they surface
//! through the normal query error path.

use chrono::{DateTime, Utc};
use uuid::Uuid;

pub(crate) fn uuid_col(idx: usize, s: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub(crate) fn opt_uuid_col(idx: usize, s: Option<&str>) -> rusqlite::Result<Option<Uuid>> {
    s.map(|v| uuid_col(idx, v)).transpose()
}

pub(crate) fn timestamp_col(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}
