use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use super::{DependencyFailure, SideEffect, best_effort};
use crate::store::AuditLogStore;
use crate::types::{TrackingAction, TrackingLog};

/// Writes append-only tracking log entries for state-changing actions.
#[derive(Clone)]
pub struct AuditLogger {
    store: Arc<dyn AuditLogStore>,
}

impl AuditLogger {
    pub fn new(store: Arc<dyn AuditLogStore>) -> Self {
        Self { store }
    }

    /// Appends one entry. Runs after the mutation it describes has committed,
    /// so a failed append is reported rather than propagated.
    pub fn record(
        &self,
        student_id: &str,
        course_id: &str,
        action: TrackingAction,
        previous_value: Value,
        new_value: Value,
        performed_by: &str,
    ) -> Result<TrackingLog, DependencyFailure> {
        let entry = TrackingLog {
            id: Uuid::new_v4().to_string(),
            student_id: student_id.to_string(),
            course_id: course_id.to_string(),
            action,
            previous_value,
            new_value,
            performed_by: performed_by.to_string(),
            performed_at: Utc::now(),
        };

        best_effort(SideEffect::AuditLog, self.store.append_tracking_log(&entry))?;
        Ok(entry)
    }
}
