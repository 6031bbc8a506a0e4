mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Progress records, one per (student, course) pair.
pub trait ProgressStore: Send + Sync {
    fn create_progress(&self, progress: &StudentProgress) -> Result<()>;
    fn get_progress(&self, id: &str) -> Result<Option<StudentProgress>>;
    fn get_progress_by_student_and_course(
        &self,
        student_id: &str,
        course_id: &str,
    ) -> Result<Option<StudentProgress>>;
    fn list_student_progress(&self, student_id: &str) -> Result<Vec<StudentProgress>>;

    /// Applies `patch` to the editable fields and returns the updated record.
    fn update_progress_fields(&self, id: &str, patch: &ProgressPatch) -> Result<StudentProgress>;

    /// Writes `update` only if the record is currently in `expected`.
    ///
    /// Returns `None` when the record exists but its status no longer matches,
    /// and `Error::NotFound` when it does not exist.
    fn transition_status(
        &self,
        id: &str,
        expected: ProgressStatus,
        update: &StatusUpdate,
    ) -> Result<Option<StudentProgress>>;
}

pub trait CourseStore: Send + Sync {
    fn create_course(&self, course: &Course) -> Result<()>;
    fn get_course(&self, id: &str) -> Result<Option<Course>>;
    /// Courses of one semester, ascending by `order`.
    fn list_courses_by_semester(&self, semester_id: &str) -> Result<Vec<Course>>;
    fn delete_course(&self, id: &str) -> Result<bool>;
    /// Reassigns orders `0..N-1` following `ordered_ids`, which must be
    /// exactly the semester's course ids.
    fn reorder_courses(&self, semester_id: &str, ordered_ids: &[String]) -> Result<()>;
}

pub trait SemesterStore: Send + Sync {
    fn create_semester(&self, semester: &Semester) -> Result<()>;
    fn get_semester(&self, id: &str) -> Result<Option<Semester>>;
    /// All semesters, ascending by `order`.
    fn list_semesters_sorted(&self) -> Result<Vec<Semester>>;
    fn delete_semester(&self, id: &str) -> Result<bool>;
    fn reorder_semesters(&self, ordered_ids: &[String]) -> Result<()>;
}

pub trait StudentStore: Send + Sync {
    fn create_student(&self, student: &Student) -> Result<()>;
    fn get_student(&self, id: &str) -> Result<Option<Student>>;
    fn update_current_semester(&self, student_id: &str, semester_id: &str) -> Result<()>;
}

/// Append-only tracking log.
pub trait AuditLogStore: Send + Sync {
    fn append_tracking_log(&self, entry: &TrackingLog) -> Result<()>;
    fn list_tracking_logs(&self, student_id: &str, course_id: &str) -> Result<Vec<TrackingLog>>;
}

pub trait NotificationStore: Send + Sync {
    fn create_notification(&self, notification: &Notification) -> Result<()>;
    fn list_user_notifications(&self, user_id: &str) -> Result<Vec<Notification>>;
    fn mark_notification_read(&self, id: &str) -> Result<Option<Notification>>;
}

pub trait ActivityStore: Send + Sync {
    fn append_activity(&self, entry: &ActivityEntry) -> Result<()>;
    fn list_recent_activity(&self, limit: i64) -> Result<Vec<ActivityEntry>>;
}

/// Store defines the full database interface.
pub trait Store:
    ProgressStore
    + CourseStore
    + SemesterStore
    + StudentStore
    + AuditLogStore
    + NotificationStore
    + ActivityStore
{
    fn initialize(&self) -> Result<()>;
}
