//! Progress tracking for students moving through the semester/course curriculum.
//!
//! The pure pieces ([`pass_condition`], [`validation`], the ordering helpers in
//! [`unlock`]) carry the rules. The services ([`ProgressService`], [`UnlockEngine`],
//! [`BulkApprover`]) sequence store writes around those rules:
//! validate, commit the core mutation, then run best-effort side effects
//! (audit log, notification, unlock, activity feed) whose failures are
//! reported as [`DependencyFailure`]s instead of failing the call.

pub mod activity;
pub mod audit;
pub mod bulk;
pub mod notify;
pub mod pass_condition;
mod service;
pub mod unlock;
pub mod validation;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

pub use activity::ActivityLogger;
pub use audit::AuditLogger;
pub use bulk::{
    BulkApprover, BulkPassRequest, BulkPassResult, FixedPause, NoPause, Pacer, SinglePassResult,
};
pub use notify::NotificationEmitter;
pub use pass_condition::{PassCheck, check_pass_condition};
pub use service::{ApproveOutcome, ProgressService, RejectOutcome, UpdateOutcome};
pub use unlock::{CourseUnlock, UnlockEngine, UnlockOutcome, UnlockResult};

use crate::store::{
    ActivityStore, AuditLogStore, CourseStore, NotificationStore, ProgressStore, SemesterStore,
    Store, StudentStore,
};
use crate::types::ProgressStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Progress,
    Course,
    Semester,
    Student,
}

impl Entity {
    const fn not_found_message(self) -> &'static str {
        match self {
            Self::Progress => "Không tìm thấy tiến độ học viên",
            Self::Course => "Không tìm thấy khóa học",
            Self::Semester => "Không tìm thấy học kỳ",
            Self::Student => "Không tìm thấy học viên",
        }
    }
}

#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("{message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("{}", .entity.not_found_message())]
    NotFound { entity: Entity, id: String },

    #[error("{message}")]
    Precondition {
        current: ProgressStatus,
        message: String,
    },

    #[error(transparent)]
    Store(#[from] crate::error::Error),
}

impl ProgressError {
    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub(crate) fn not_found(entity: Entity, id: &str) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Guard failure for approve/reject on a record that is not awaiting review.
    pub(crate) fn not_pending(current: ProgressStatus) -> Self {
        let message = match current {
            ProgressStatus::Completed => "Khóa học đã được hoàn thành",
            _ => "Tiến độ không ở trạng thái chờ duyệt",
        };
        Self::Precondition {
            current,
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProgressError>;

/// Side effect that runs after the core mutation has been committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SideEffect {
    AuditLog,
    Notification,
    Unlock,
    Activity,
}

impl fmt::Display for SideEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AuditLog => "audit log",
            Self::Notification => "notification",
            Self::Unlock => "unlock",
            Self::Activity => "activity log",
        };
        f.write_str(name)
    }
}

/// A best-effort side effect that failed. Never turns the operation into an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyFailure {
    pub step: SideEffect,
    pub cause: String,
}

/// Runs the conversion every best-effort call site shares: log and keep going.
pub(crate) fn best_effort<T, E: fmt::Display>(
    step: SideEffect,
    result: std::result::Result<T, E>,
) -> std::result::Result<T, DependencyFailure> {
    result.map_err(|e| {
        tracing::warn!("{} failed, continuing: {}", step, e);
        DependencyFailure {
            step,
            cause: e.to_string(),
        }
    })
}

/// Store handles the services depend on, built once at startup.
#[derive(Clone)]
pub struct Collaborators {
    pub progress: Arc<dyn ProgressStore>,
    pub courses: Arc<dyn CourseStore>,
    pub semesters: Arc<dyn SemesterStore>,
    pub students: Arc<dyn StudentStore>,
    pub audit: Arc<dyn AuditLogStore>,
    pub notifications: Arc<dyn NotificationStore>,
    pub activity: Arc<dyn ActivityStore>,
}

impl Collaborators {
    /// Uses one backing store for every collaborator.
    pub fn from_store<S: Store + 'static>(store: Arc<S>) -> Self {
        Self {
            progress: store.clone(),
            courses: store.clone(),
            semesters: store.clone(),
            students: store.clone(),
            audit: store.clone(),
            notifications: store.clone(),
            activity: store,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing;
