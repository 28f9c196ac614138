//! CRUD operations for [`Course`] records.
//!
//! Courses are immutable reference data created by administrators; there is
//! deliberately no update or end-user create path here.

use rusqlite::params;
use studybuddy_shared::CourseId;

use crate::database::Database;
use crate::error::{map_insert_error, Result, StoreError};
use crate::models::Course;
use crate::rows;

impl Database {
    /// Insert a new course.  A duplicate code surfaces as
    /// [`StoreError::Duplicate`].
    pub fn create_course(&self, course: &Course) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO courses (id, code, name, description, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    course.id.to_string(),
                    course.code,
                    course.name,
                    course.description,
                    course.created_at.to_rfc3339(),
                ],
            )
            .map_err(map_insert_error)?;
        Ok(())
    }

    /// Fetch a single course by id.
    pub fn get_course(&self, id: CourseId) -> Result<Course> {
        self.conn()
            .query_row(
                "SELECT id, code, name, description, created_at FROM courses WHERE id = ?1",
                params![id.to_string()],
                row_to_course,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Fetch a course by its unique code.
    pub fn get_course_by_code(&self, code: &str) -> Result<Course> {
        self.conn()
            .query_row(
                "SELECT id, code, name, description, created_at FROM courses WHERE code = ?1",
                params![code],
                row_to_course,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// List all courses, ordered by code.
    pub fn list_courses(&self) -> Result<Vec<Course>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, code, name, description, created_at FROM courses ORDER BY code ASC",
        )?;
        let rows = stmt.query_map([], row_to_course)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }
}

fn row_to_course(row: &rusqlite::Row<'_>) -> rusqlite::Result<Course> {
    let id_str: String = row.get(0)?;
    let code: String = row.get(1)?;
    let name: String = row.get(2)?;
    let description: String = row.get(3)?;
    let created_str: String = row.get(4)?;

    Ok(Course {
        id: CourseId(rows::uuid_col(0, &id_str)?),
        code,
        name,
        description,
        created_at: rows::timestamp_col(4, &created_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn courses_list_ordered_by_code() {
        let db = Database::open_in_memory().unwrap();
        db.create_course(&Course::new("PHYS201".into(), "Physics II".into(), "".into()))
            .unwrap();
        db.create_course(&Course::new("MATH101".into(), "Calculus".into(), "".into()))
            .unwrap();

        let codes: Vec<String> = db
            .list_courses()
            .unwrap()
            .into_iter()
            .map(|c| c.code)
            .collect();
        assert_eq!(codes, vec!["MATH101", "PHYS201"]);
    }

    #[test]
    fn duplicate_code_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.create_course(&Course::new("MATH101".into(), "Calculus".into(), "".into()))
            .unwrap();
        let err = db
            .create_course(&Course::new("MATH101".into(), "Calc again".into(), "".into()))
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate));
    }

    #[test]
    fn lookup_by_code() {
        let db = Database::open_in_memory().unwrap();
        let course = Course::new("CHEM301".into(), "Organic Chemistry".into(), "".into());
        db.create_course(&course).unwrap();
        assert_eq!(db.get_course_by_code("CHEM301").unwrap().id, course.id);
    }
}
