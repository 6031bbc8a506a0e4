use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::schema::SCHEMA;
use super::{
    ActivityStore, AuditLogStore, CourseStore, NotificationStore, ProgressStore, SemesterStore,
    Store, StudentStore,
};
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a guard to the underlying database connection.
    /// This allows consuming applications to execute custom SQL.
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn parse_optional_datetime(s: Option<String>) -> Option<DateTime<Utc>> {
    s.as_deref().map(parse_datetime)
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn format_optional_datetime(dt: Option<&DateTime<Utc>>) -> Option<String> {
    dt.map(format_datetime)
}

fn invalid_column(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn json_column<T: serde::de::DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| invalid_column(idx, e.to_string()))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::Corrupt(e.to_string()))
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

fn insert_result(result: rusqlite::Result<usize>) -> Result<()> {
    match result {
        Ok(_) => Ok(()),
        Err(e) if is_unique_violation(&e) => Err(Error::AlreadyExists),
        Err(e) => Err(Error::from(e)),
    }
}

const SEMESTER_COLUMNS: &str =
    "id, name, sort_order, is_active, requires_major_selection, created_at";

fn semester_from_row(row: &Row<'_>) -> rusqlite::Result<Semester> {
    Ok(Semester {
        id: row.get(0)?,
        name: row.get(1)?,
        order: row.get(2)?,
        is_active: row.get(3)?,
        requires_major_selection: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

const COURSE_COLUMNS: &str = "id, title, semester_id, sort_order, required_sessions, required_projects, is_active, created_at";

fn course_from_row(row: &Row<'_>) -> rusqlite::Result<Course> {
    Ok(Course {
        id: row.get(0)?,
        title: row.get(1)?,
        semester_id: row.get(2)?,
        order: row.get(3)?,
        required_sessions: row.get(4)?,
        required_projects: row.get(5)?,
        is_active: row.get(6)?,
        created_at: parse_datetime(&row.get::<_, String>(7)?),
    })
}

const STUDENT_COLUMNS: &str =
    "id, name, email, major_id, current_semester_id, created_at, updated_at";

fn student_from_row(row: &Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        major_id: row.get(3)?,
        current_semester_id: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        updated_at: parse_datetime(&row.get::<_, String>(6)?),
    })
}

const PROGRESS_COLUMNS: &str = "id, student_id, course_id, completed_sessions, projects_submitted, project_links, status, completed_at, approved_at, approved_by, rejection_reason, created_at, updated_at";

fn progress_from_row(row: &Row<'_>) -> rusqlite::Result<StudentProgress> {
    let status: String = row.get(6)?;
    let status = ProgressStatus::parse(&status)
        .ok_or_else(|| invalid_column(6, format!("unknown progress status '{status}'")))?;

    Ok(StudentProgress {
        id: row.get(0)?,
        student_id: row.get(1)?,
        course_id: row.get(2)?,
        completed_sessions: row.get(3)?,
        projects_submitted: row.get(4)?,
        project_links: json_column(row, 5)?,
        status,
        completed_at: parse_optional_datetime(row.get(7)?),
        approved_at: parse_optional_datetime(row.get(8)?),
        approved_by: row.get(9)?,
        rejection_reason: row.get(10)?,
        created_at: parse_datetime(&row.get::<_, String>(11)?),
        updated_at: parse_datetime(&row.get::<_, String>(12)?),
    })
}

fn fetch_progress(conn: &Connection, id: &str) -> Result<Option<StudentProgress>> {
    conn.query_row(
        &format!("SELECT {PROGRESS_COLUMNS} FROM student_progress WHERE id = ?1"),
        params![id],
        progress_from_row,
    )
    .optional()
    .map_err(Error::from)
}

const TRACKING_LOG_COLUMNS: &str =
    "id, student_id, course_id, action, previous_value, new_value, performed_by, performed_at";

fn tracking_log_from_row(row: &Row<'_>) -> rusqlite::Result<TrackingLog> {
    let action: String = row.get(3)?;
    let action = TrackingAction::parse(&action)
        .ok_or_else(|| invalid_column(3, format!("unknown tracking action '{action}'")))?;

    Ok(TrackingLog {
        id: row.get(0)?,
        student_id: row.get(1)?,
        course_id: row.get(2)?,
        action,
        previous_value: json_column(row, 4)?,
        new_value: json_column(row, 5)?,
        performed_by: row.get(6)?,
        performed_at: parse_datetime(&row.get::<_, String>(7)?),
    })
}

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, type, title, message, metadata, is_read, read_at, created_at";

fn notification_from_row(row: &Row<'_>) -> rusqlite::Result<Notification> {
    let kind: String = row.get(2)?;
    let notification_type = NotificationType::parse(&kind)
        .ok_or_else(|| invalid_column(2, format!("unknown notification type '{kind}'")))?;
    let metadata: BTreeMap<String, String> = json_column(row, 5)?;

    Ok(Notification {
        id: row.get(0)?,
        user_id: row.get(1)?,
        notification_type,
        title: row.get(3)?,
        message: row.get(4)?,
        metadata,
        is_read: row.get(6)?,
        read_at: parse_optional_datetime(row.get(7)?),
        created_at: parse_datetime(&row.get::<_, String>(8)?),
    })
}

/// Checks that `ordered_ids` is a permutation of `existing` with no duplicates.
fn check_reorder_ids(existing: &[String], ordered_ids: &[String]) -> Result<()> {
    let mut want: Vec<&str> = existing.iter().map(String::as_str).collect();
    let mut got: Vec<&str> = ordered_ids.iter().map(String::as_str).collect();
    want.sort_unstable();
    got.sort_unstable();
    if want != got {
        return Err(Error::BadRequest(
            "reorder must list every existing id exactly once".to_string(),
        ));
    }
    Ok(())
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }
}

impl SemesterStore for SqliteStore {
    fn create_semester(&self, semester: &Semester) -> Result<()> {
        insert_result(self.conn().execute(
            "INSERT INTO semesters (id, name, sort_order, is_active, requires_major_selection, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                semester.id,
                semester.name,
                semester.order,
                semester.is_active,
                semester.requires_major_selection,
                format_datetime(&semester.created_at),
            ],
        ))
    }

    fn get_semester(&self, id: &str) -> Result<Option<Semester>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {SEMESTER_COLUMNS} FROM semesters WHERE id = ?1"),
            params![id],
            semester_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_semesters_sorted(&self) -> Result<Vec<Semester>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {SEMESTER_COLUMNS} FROM semesters ORDER BY sort_order, id"
        ))?;
        let rows = stmt.query_map([], semester_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_semester(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM semesters WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn reorder_semesters(&self, ordered_ids: &[String]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let existing: Vec<String> = {
            let mut stmt = tx.prepare("SELECT id FROM semesters")?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            rows.collect::<std::result::Result<Vec<_>, _>>()?
        };
        check_reorder_ids(&existing, ordered_ids)?;

        for (order, id) in ordered_ids.iter().enumerate() {
            tx.execute(
                "UPDATE semesters SET sort_order = ?1 WHERE id = ?2",
                params![order as i64, id],
            )?;
        }

        tx.commit()?;
        Ok(())
    }
}

impl CourseStore for SqliteStore {
    fn create_course(&self, course: &Course) -> Result<()> {
        insert_result(self.conn().execute(
            "INSERT INTO courses (id, semester_id, title, sort_order, required_sessions, required_projects, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                course.id,
                course.semester_id,
                course.title,
                course.order,
                course.required_sessions,
                course.required_projects,
                course.is_active,
                format_datetime(&course.created_at),
            ],
        ))
    }

    fn get_course(&self, id: &str) -> Result<Option<Course>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = ?1"),
            params![id],
            course_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_courses_by_semester(&self, semester_id: &str) -> Result<Vec<Course>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE semester_id = ?1 ORDER BY sort_order, id"
        ))?;
        let rows = stmt.query_map(params![semester_id], course_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_course(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM courses WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn reorder_courses(&self, semester_id: &str, ordered_ids: &[String]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let existing: Vec<String> = {
            let mut stmt = tx.prepare("SELECT id FROM courses WHERE semester_id = ?1")?;
            let rows = stmt.query_map(params![semester_id], |row| row.get(0))?;
            rows.collect::<std::result::Result<Vec<_>, _>>()?
        };
        check_reorder_ids(&existing, ordered_ids)?;

        for (order, id) in ordered_ids.iter().enumerate() {
            tx.execute(
                "UPDATE courses SET sort_order = ?1 WHERE id = ?2",
                params![order as i64, id],
            )?;
        }

        tx.commit()?;
        Ok(())
    }
}

impl StudentStore for SqliteStore {
    fn create_student(&self, student: &Student) -> Result<()> {
        insert_result(self.conn().execute(
            "INSERT INTO students (id, name, email, major_id, current_semester_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                student.id,
                student.name,
                student.email,
                student.major_id,
                student.current_semester_id,
                format_datetime(&student.created_at),
                format_datetime(&student.updated_at),
            ],
        ))
    }

    fn get_student(&self, id: &str) -> Result<Option<Student>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {STUDENT_COLUMNS} FROM students WHERE id = ?1"),
            params![id],
            student_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn update_current_semester(&self, student_id: &str, semester_id: &str) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE students SET current_semester_id = ?1, updated_at = ?2 WHERE id = ?3",
            params![semester_id, format_datetime(&Utc::now()), student_id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }
}

impl ProgressStore for SqliteStore {
    fn create_progress(&self, progress: &StudentProgress) -> Result<()> {
        let links = to_json(&progress.project_links)?;
        insert_result(self.conn().execute(
            "INSERT INTO student_progress (id, student_id, course_id, completed_sessions, projects_submitted,
                 project_links, status, completed_at, approved_at, approved_by, rejection_reason, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                progress.id,
                progress.student_id,
                progress.course_id,
                progress.completed_sessions,
                progress.projects_submitted,
                links,
                progress.status.as_str(),
                format_optional_datetime(progress.completed_at.as_ref()),
                format_optional_datetime(progress.approved_at.as_ref()),
                progress.approved_by,
                progress.rejection_reason,
                format_datetime(&progress.created_at),
                format_datetime(&progress.updated_at),
            ],
        ))
    }

    fn get_progress(&self, id: &str) -> Result<Option<StudentProgress>> {
        fetch_progress(&self.conn(), id)
    }

    fn get_progress_by_student_and_course(
        &self,
        student_id: &str,
        course_id: &str,
    ) -> Result<Option<StudentProgress>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {PROGRESS_COLUMNS} FROM student_progress WHERE student_id = ?1 AND course_id = ?2"
            ),
            params![student_id, course_id],
            progress_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_student_progress(&self, student_id: &str) -> Result<Vec<StudentProgress>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROGRESS_COLUMNS} FROM student_progress WHERE student_id = ?1 ORDER BY created_at, id"
        ))?;
        let rows = stmt.query_map(params![student_id], progress_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_progress_fields(&self, id: &str, patch: &ProgressPatch) -> Result<StudentProgress> {
        let conn = self.conn();
        let mut progress = fetch_progress(&conn, id)?.ok_or(Error::NotFound)?;

        if let Some(sessions) = patch.completed_sessions {
            progress.completed_sessions = sessions;
        }
        if let Some(projects) = patch.projects_submitted {
            progress.projects_submitted = projects;
        }
        if let Some(links) = &patch.project_links {
            progress.project_links = links.clone();
        }
        progress.updated_at = Utc::now();

        conn.execute(
            "UPDATE student_progress
             SET completed_sessions = ?1, projects_submitted = ?2, project_links = ?3, updated_at = ?4
             WHERE id = ?5",
            params![
                progress.completed_sessions,
                progress.projects_submitted,
                to_json(&progress.project_links)?,
                format_datetime(&progress.updated_at),
                id,
            ],
        )?;

        Ok(progress)
    }

    fn transition_status(
        &self,
        id: &str,
        expected: ProgressStatus,
        update: &StatusUpdate,
    ) -> Result<Option<StudentProgress>> {
        let conn = self.conn();
        let rows = conn.execute(
            "UPDATE student_progress
             SET status = ?1, completed_at = ?2, approved_at = ?3, approved_by = ?4,
                 rejection_reason = ?5, updated_at = ?6
             WHERE id = ?7 AND status = ?8",
            params![
                update.status.as_str(),
                format_optional_datetime(update.completed_at.as_ref()),
                format_optional_datetime(update.approved_at.as_ref()),
                update.approved_by,
                update.rejection_reason,
                format_datetime(&Utc::now()),
                id,
                expected.as_str(),
            ],
        )?;

        let current = fetch_progress(&conn, id)?.ok_or(Error::NotFound)?;
        if rows == 0 {
            return Ok(None);
        }
        Ok(Some(current))
    }
}

impl AuditLogStore for SqliteStore {
    fn append_tracking_log(&self, entry: &TrackingLog) -> Result<()> {
        let previous = to_json(&entry.previous_value)?;
        let new = to_json(&entry.new_value)?;
        insert_result(self.conn().execute(
            "INSERT INTO tracking_logs (id, student_id, course_id, action, previous_value, new_value, performed_by, performed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                entry.id,
                entry.student_id,
                entry.course_id,
                entry.action.as_str(),
                previous,
                new,
                entry.performed_by,
                format_datetime(&entry.performed_at),
            ],
        ))
    }

    fn list_tracking_logs(&self, student_id: &str, course_id: &str) -> Result<Vec<TrackingLog>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TRACKING_LOG_COLUMNS} FROM tracking_logs
             WHERE student_id = ?1 AND course_id = ?2 ORDER BY performed_at, rowid"
        ))?;
        let rows = stmt.query_map(params![student_id, course_id], tracking_log_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }
}

impl NotificationStore for SqliteStore {
    fn create_notification(&self, notification: &Notification) -> Result<()> {
        let metadata = to_json(&notification.metadata)?;
        insert_result(self.conn().execute(
            "INSERT INTO notifications (id, user_id, type, title, message, metadata, is_read, read_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                notification.id,
                notification.user_id,
                notification.notification_type.as_str(),
                notification.title,
                notification.message,
                metadata,
                notification.is_read,
                format_optional_datetime(notification.read_at.as_ref()),
                format_datetime(&notification.created_at),
            ],
        ))
    }

    fn list_user_notifications(&self, user_id: &str) -> Result<Vec<Notification>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications
             WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt.query_map(params![user_id], notification_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn mark_notification_read(&self, id: &str) -> Result<Option<Notification>> {
        let conn = self.conn();
        conn.execute(
            "UPDATE notifications SET is_read = 1, read_at = COALESCE(read_at, ?1) WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        conn.query_row(
            &format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?1"),
            params![id],
            notification_from_row,
        )
        .optional()
        .map_err(Error::from)
    }
}

impl ActivityStore for SqliteStore {
    fn append_activity(&self, entry: &ActivityEntry) -> Result<()> {
        insert_result(self.conn().execute(
            "INSERT INTO activities (id, actor_id, action, target_id, description, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.id,
                entry.actor_id,
                entry.action,
                entry.target_id,
                entry.description,
                format_datetime(&entry.created_at),
            ],
        ))
    }

    fn list_recent_activity(&self, limit: i64) -> Result<Vec<ActivityEntry>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, actor_id, action, target_id, description, created_at
             FROM activities ORDER BY created_at DESC, rowid DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok(ActivityEntry {
                id: row.get(0)?,
                actor_id: row.get(1)?,
                action: row.get(2)?,
                target_id: row.get(3)?,
                description: row.get(4)?,
                created_at: parse_datetime(&row.get::<_, String>(5)?),
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }
}
