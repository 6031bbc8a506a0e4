use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{NotificationType, ProgressStatus, TrackingAction};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Semester {
    pub id: String,
    pub name: String,
    pub order: i64,
    pub is_active: bool,
    pub requires_major_selection: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub title: String,
    pub semester_id: String,
    pub order: i64,
    pub required_sessions: i64,
    pub required_projects: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Course {
    #[must_use]
    pub fn requirements(&self) -> Requirements {
        Requirements {
            required_sessions: self.required_sessions,
            required_projects: self.required_projects,
        }
    }
}

/// Completion thresholds a course defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirements {
    pub required_sessions: i64,
    pub required_projects: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_semester_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One record per (student, course) pair.
///
/// `completed_at` is set exactly when `status` is `completed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentProgress {
    pub id: String,
    pub student_id: String,
    pub course_id: String,
    pub completed_sessions: i64,
    pub projects_submitted: i64,
    pub project_links: Vec<String>,
    pub status: ProgressStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StudentProgress {
    /// True once any tracked field has moved off its initial value.
    #[must_use]
    pub fn has_activity(&self) -> bool {
        self.completed_sessions > 0 || self.projects_submitted > 0 || !self.project_links.is_empty()
    }
}

/// Partial update of the admin-editable progress fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_sessions: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projects_submitted: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_links: Option<Vec<String>>,
}

impl ProgressPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.completed_sessions.is_none()
            && self.projects_submitted.is_none()
            && self.project_links.is_none()
    }
}

/// Status write applied by a conditional transition.
///
/// Columns not named here are reset, so `completed_at`, approval and rejection
/// fields never outlive the status that set them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub status: ProgressStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
    pub rejection_reason: Option<String>,
}

impl StatusUpdate {
    #[must_use]
    pub fn to(status: ProgressStatus) -> Self {
        Self {
            status,
            completed_at: None,
            approved_at: None,
            approved_by: None,
            rejection_reason: None,
        }
    }

    #[must_use]
    pub fn approved(by: &str, at: DateTime<Utc>) -> Self {
        Self {
            status: ProgressStatus::Completed,
            completed_at: Some(at),
            approved_at: Some(at),
            approved_by: Some(by.to_string()),
            rejection_reason: None,
        }
    }

    #[must_use]
    pub fn rejected(reason: &str) -> Self {
        Self {
            rejection_reason: Some(reason.to_string()),
            ..Self::to(ProgressStatus::Rejected)
        }
    }
}

/// Append-only audit entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingLog {
    pub id: String,
    pub student_id: String,
    pub course_id: String,
    pub action: TrackingAction,
    pub previous_value: serde_json::Value,
    pub new_value: serde_json::Value,
    pub performed_by: String,
    pub performed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub is_read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Non-authoritative activity feed entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: String,
    pub actor_id: String,
    pub action: String,
    pub target_id: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}
