use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a student's progress on one course.
///
/// The main chain is `not_started -> in_progress -> pending_approval -> completed | rejected`.
/// `locked` sits outside the chain until the course is unlocked for the student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    Locked,
    NotStarted,
    InProgress,
    PendingApproval,
    Completed,
    Rejected,
}

impl ProgressStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Locked => "locked",
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::PendingApproval => "pending_approval",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<ProgressStatus> {
        match s {
            "locked" => Some(Self::Locked),
            "not_started" => Some(Self::NotStarted),
            "in_progress" => Some(Self::InProgress),
            "pending_approval" => Some(Self::PendingApproval),
            "completed" => Some(Self::Completed),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Field edits may only promote a record automatically from these states.
    #[must_use]
    pub const fn allows_auto_transition(self) -> bool {
        matches!(self, Self::NotStarted | Self::InProgress)
    }
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tag of a tracking log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingAction {
    UpdateSessions,
    UpdateProjects,
    AddProjectLink,
    RemoveProjectLink,
    Approve,
    Reject,
    UnlockCourse,
    UnlockSemester,
}

impl TrackingAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UpdateSessions => "update_sessions",
            Self::UpdateProjects => "update_projects",
            Self::AddProjectLink => "add_project_link",
            Self::RemoveProjectLink => "remove_project_link",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::UnlockCourse => "unlock_course",
            Self::UnlockSemester => "unlock_semester",
        }
    }

    pub fn parse(s: &str) -> Option<TrackingAction> {
        match s {
            "update_sessions" => Some(Self::UpdateSessions),
            "update_projects" => Some(Self::UpdateProjects),
            "add_project_link" => Some(Self::AddProjectLink),
            "remove_project_link" => Some(Self::RemoveProjectLink),
            "approve" => Some(Self::Approve),
            "reject" => Some(Self::Reject),
            "unlock_course" => Some(Self::UnlockCourse),
            "unlock_semester" => Some(Self::UnlockSemester),
            _ => None,
        }
    }
}

impl fmt::Display for TrackingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    CourseCompleted,
    CourseRejected,
    CourseUnlocked,
    SemesterUnlocked,
    LabVerificationApproved,
    LabVerificationRejected,
}

impl NotificationType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CourseCompleted => "course_completed",
            Self::CourseRejected => "course_rejected",
            Self::CourseUnlocked => "course_unlocked",
            Self::SemesterUnlocked => "semester_unlocked",
            Self::LabVerificationApproved => "lab_verification_approved",
            Self::LabVerificationRejected => "lab_verification_rejected",
        }
    }

    pub fn parse(s: &str) -> Option<NotificationType> {
        match s {
            "course_completed" => Some(Self::CourseCompleted),
            "course_rejected" => Some(Self::CourseRejected),
            "course_unlocked" => Some(Self::CourseUnlocked),
            "semester_unlocked" => Some(Self::SemesterUnlocked),
            "lab_verification_approved" => Some(Self::LabVerificationApproved),
            "lab_verification_rejected" => Some(Self::LabVerificationRejected),
            _ => None,
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
