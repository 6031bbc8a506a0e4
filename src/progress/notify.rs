use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::{DependencyFailure, SideEffect, best_effort};
use crate::store::NotificationStore;
use crate::types::{Course, Notification, NotificationType, Semester};

/// Notification content before it is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationDraft {
    pub user_id: String,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub metadata: BTreeMap<String, String>,
}

fn course_metadata(course: &Course) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("courseId".to_string(), course.id.clone()),
        ("courseName".to_string(), course.title.clone()),
    ])
}

pub fn course_completed(student_id: &str, course: &Course) -> NotificationDraft {
    NotificationDraft {
        user_id: student_id.to_string(),
        notification_type: NotificationType::CourseCompleted,
        title: "Hoàn thành khóa học".to_string(),
        message: format!(
            "Chúc mừng! Bạn đã hoàn thành khóa học \"{}\".",
            course.title
        ),
        metadata: course_metadata(course),
    }
}

pub fn course_rejected(student_id: &str, course: &Course, reason: &str) -> NotificationDraft {
    let mut metadata = course_metadata(course);
    metadata.insert("rejectionReason".to_string(), reason.to_string());

    NotificationDraft {
        user_id: student_id.to_string(),
        notification_type: NotificationType::CourseRejected,
        title: "Khóa học chưa được duyệt".to_string(),
        message: format!(
            "Kết quả khóa học \"{}\" chưa được duyệt. Lý do: {}",
            course.title, reason
        ),
        metadata,
    }
}

pub fn course_unlocked(student_id: &str, course: &Course) -> NotificationDraft {
    NotificationDraft {
        user_id: student_id.to_string(),
        notification_type: NotificationType::CourseUnlocked,
        title: "Mở khóa khóa học mới".to_string(),
        message: format!(
            "Khóa học \"{}\" đã được mở khóa. Bạn có thể bắt đầu học ngay.",
            course.title
        ),
        metadata: course_metadata(course),
    }
}

pub fn semester_unlocked(
    student_id: &str,
    semester: &Semester,
    first_course: Option<&Course>,
) -> NotificationDraft {
    let mut metadata = BTreeMap::from([
        ("semesterId".to_string(), semester.id.clone()),
        ("semesterName".to_string(), semester.name.clone()),
    ]);
    if let Some(course) = first_course {
        metadata.extend(course_metadata(course));
    }

    NotificationDraft {
        user_id: student_id.to_string(),
        notification_type: NotificationType::SemesterUnlocked,
        title: "Mở khóa học kỳ mới".to_string(),
        message: format!(
            "Chúc mừng! Học kỳ \"{}\" đã được mở khóa.",
            semester.name
        ),
        metadata,
    }
}

/// Persists notifications through the notification store.
#[derive(Clone)]
pub struct NotificationEmitter {
    store: Arc<dyn NotificationStore>,
}

impl NotificationEmitter {
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self { store }
    }

    /// Failures are logged and returned; the triggering operation still succeeds.
    pub fn dispatch(&self, draft: NotificationDraft) -> Result<Notification, DependencyFailure> {
        let notification = Notification {
            id: Uuid::new_v4().to_string(),
            user_id: draft.user_id,
            notification_type: draft.notification_type,
            title: draft.title,
            message: draft.message,
            metadata: draft.metadata,
            is_read: false,
            read_at: None,
            created_at: Utc::now(),
        };

        best_effort(
            SideEffect::Notification,
            self.store.create_notification(&notification),
        )?;
        Ok(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course() -> Course {
        Course {
            id: "c-1".to_string(),
            title: "Typography cơ bản".to_string(),
            semester_id: "s-1".to_string(),
            order: 0,
            required_sessions: 10,
            required_projects: 2,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn semester() -> Semester {
        Semester {
            id: "s-2".to_string(),
            name: "Học kỳ 2".to_string(),
            order: 1,
            is_active: true,
            requires_major_selection: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_completion_mentions_course() {
        let draft = course_completed("stu-1", &course());
        assert_eq!(draft.notification_type, NotificationType::CourseCompleted);
        assert_eq!(draft.user_id, "stu-1");
        assert!(!draft.title.is_empty());
        assert!(draft.message.contains("Typography cơ bản"));
        assert_eq!(draft.metadata.get("courseId").map(String::as_str), Some("c-1"));
    }

    #[test]
    fn test_rejection_carries_reason_verbatim() {
        let draft = course_rejected("stu-1", &course(), "Thiếu link Behance");
        assert!(draft.message.contains("Thiếu link Behance"));
        assert!(draft.message.contains("Typography cơ bản"));
        assert_eq!(
            draft.metadata.get("rejectionReason").map(String::as_str),
            Some("Thiếu link Behance")
        );
    }

    #[test]
    fn test_unlock_drafts_name_the_entity() {
        let draft = course_unlocked("stu-1", &course());
        assert_eq!(draft.notification_type, NotificationType::CourseUnlocked);
        assert!(draft.message.contains("Typography cơ bản"));

        let course = course();
        let draft = semester_unlocked("stu-1", &semester(), Some(&course));
        assert_eq!(draft.notification_type, NotificationType::SemesterUnlocked);
        assert!(!draft.title.is_empty());
        assert!(draft.message.contains("Học kỳ 2"));
        assert_eq!(draft.metadata.get("semesterId").map(String::as_str), Some("s-2"));
        assert_eq!(draft.metadata.get("courseId").map(String::as_str), Some("c-1"));
    }
}
