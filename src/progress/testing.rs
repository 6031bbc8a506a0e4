use std::sync::Arc;

use chrono::Utc;
use tempfile::TempDir;

use super::Collaborators;
use crate::error::{Error, Result};
use crate::store::{
    ActivityStore, CourseStore, NotificationStore, ProgressStore, SemesterStore, SqliteStore,
    Store, StudentStore,
};
use crate::types::*;

fn backend_down() -> Error {
    Error::Io(std::io::Error::other("backend unavailable"))
}

pub struct FailingNotifications;

impl NotificationStore for FailingNotifications {
    fn create_notification(&self, _notification: &Notification) -> Result<()> {
        Err(backend_down())
    }

    fn list_user_notifications(&self, _user_id: &str) -> Result<Vec<Notification>> {
        Err(backend_down())
    }

    fn mark_notification_read(&self, _id: &str) -> Result<Option<Notification>> {
        Err(backend_down())
    }
}

pub struct FailingActivity;

impl ActivityStore for FailingActivity {
    fn append_activity(&self, _entry: &ActivityEntry) -> Result<()> {
        Err(backend_down())
    }

    fn list_recent_activity(&self, _limit: i64) -> Result<Vec<ActivityEntry>> {
        Err(backend_down())
    }
}

/// Progress store where another reviewer approves a pending record right
/// before each conditional status write lands.
pub struct ApprovedElsewhere {
    pub inner: Arc<SqliteStore>,
    pub other_admin: &'static str,
}

impl ProgressStore for ApprovedElsewhere {
    fn create_progress(&self, progress: &StudentProgress) -> Result<()> {
        self.inner.create_progress(progress)
    }

    fn get_progress(&self, id: &str) -> Result<Option<StudentProgress>> {
        self.inner.get_progress(id)
    }

    fn get_progress_by_student_and_course(
        &self,
        student_id: &str,
        course_id: &str,
    ) -> Result<Option<StudentProgress>> {
        self.inner
            .get_progress_by_student_and_course(student_id, course_id)
    }

    fn list_student_progress(&self, student_id: &str) -> Result<Vec<StudentProgress>> {
        self.inner.list_student_progress(student_id)
    }

    fn update_progress_fields(&self, id: &str, patch: &ProgressPatch) -> Result<StudentProgress> {
        self.inner.update_progress_fields(id, patch)
    }

    fn transition_status(
        &self,
        id: &str,
        expected: ProgressStatus,
        update: &StatusUpdate,
    ) -> Result<Option<StudentProgress>> {
        if expected == ProgressStatus::PendingApproval {
            self.inner.transition_status(
                id,
                ProgressStatus::PendingApproval,
                &StatusUpdate::approved(self.other_admin, Utc::now()),
            )?;
        }
        self.inner.transition_status(id, expected, update)
    }
}

pub fn progress_record(
    id: &str,
    student_id: &str,
    course_id: &str,
    status: ProgressStatus,
) -> StudentProgress {
    let now = Utc::now();
    StudentProgress {
        id: id.to_string(),
        student_id: student_id.to_string(),
        course_id: course_id.to_string(),
        completed_sessions: 0,
        projects_submitted: 0,
        project_links: Vec::new(),
        status,
        completed_at: (status == ProgressStatus::Completed).then_some(now),
        approved_at: None,
        approved_by: None,
        rejection_reason: None,
        created_at: now,
        updated_at: now,
    }
}

/// A temp-dir SQLite store wired up as every collaborator.
pub struct Fixture {
    _temp: TempDir,
    pub store: Arc<SqliteStore>,
    pub collab: Collaborators,
}

impl Fixture {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(SqliteStore::new(temp.path().join("test.db")).unwrap());
        store.initialize().unwrap();
        let collab = Collaborators::from_store(store.clone());
        Self {
            _temp: temp,
            store,
            collab,
        }
    }

    pub fn with_failing_notifications(mut self) -> Self {
        self.collab.notifications = Arc::new(FailingNotifications);
        self
    }

    pub fn with_failing_activity(mut self) -> Self {
        self.collab.activity = Arc::new(FailingActivity);
        self
    }

    pub fn with_concurrent_approval(mut self, other_admin: &'static str) -> Self {
        self.collab.progress = Arc::new(ApprovedElsewhere {
            inner: self.store.clone(),
            other_admin,
        });
        self
    }

    pub fn insert_semester(&self, semester: Semester) {
        self.store.create_semester(&semester).unwrap();
    }

    pub fn add_semester(&self, id: &str, order: i64) {
        self.insert_semester(Semester {
            id: id.to_string(),
            name: format!("Học kỳ {id}"),
            order,
            is_active: true,
            requires_major_selection: false,
            created_at: Utc::now(),
        });
    }

    pub fn insert_course(&self, course: Course) {
        self.store.create_course(&course).unwrap();
    }

    pub fn add_course(&self, id: &str, semester_id: &str, order: i64, sessions: i64, projects: i64) {
        self.insert_course(Course {
            id: id.to_string(),
            title: format!("Khóa {id}"),
            semester_id: semester_id.to_string(),
            order,
            required_sessions: sessions,
            required_projects: projects,
            is_active: true,
            created_at: Utc::now(),
        });
    }

    pub fn add_student(&self, id: &str) {
        let now = Utc::now();
        self.store
            .create_student(&Student {
                id: id.to_string(),
                name: format!("Học viên {id}"),
                email: None,
                major_id: None,
                current_semester_id: None,
                created_at: now,
                updated_at: now,
            })
            .unwrap();
    }

    pub fn add_progress(&self, id: &str, student_id: &str, course_id: &str, status: ProgressStatus) {
        self.store
            .create_progress(&progress_record(id, student_id, course_id, status))
            .unwrap();
    }

    pub fn insert_progress(&self, progress: StudentProgress) {
        self.store.create_progress(&progress).unwrap();
    }

    /// Two-course semester followed by a one-course semester, with the student
    /// enrolled in the first course.
    pub fn curriculum(&self) {
        self.add_semester("s-1", 0);
        self.add_semester("s-2", 1);
        self.add_course("c-1", "s-1", 0, 10, 2);
        self.add_course("c-2", "s-1", 1, 10, 2);
        self.add_course("c-3", "s-2", 0, 8, 1);
        self.add_student("stu-1");
    }
}
