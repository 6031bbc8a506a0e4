use serde::Serialize;

use crate::types::{Requirements, StudentProgress};

/// Outcome of checking a progress record against its course requirements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassCheck {
    pub can_pass: bool,
    /// One reason per unmet condition: sessions, then projects, then links.
    pub missing_conditions: Vec<String>,
}

/// Checks whether a student has met every completion requirement of a course.
///
/// A pass needs enough sessions, enough submitted projects, and at least one
/// project link.
pub fn check_pass_condition(progress: &StudentProgress, requirements: Requirements) -> PassCheck {
    check_counts(
        progress.completed_sessions,
        progress.projects_submitted,
        progress.project_links.len(),
        requirements,
    )
}

pub(crate) fn check_counts(
    completed_sessions: i64,
    projects_submitted: i64,
    link_count: usize,
    requirements: Requirements,
) -> PassCheck {
    let mut missing_conditions = Vec::new();

    if completed_sessions < requirements.required_sessions {
        let gap = requirements.required_sessions - completed_sessions;
        missing_conditions.push(format!("Cần hoàn thành thêm {gap} buổi học nữa"));
    }

    if projects_submitted < requirements.required_projects {
        let gap = requirements.required_projects - projects_submitted;
        missing_conditions.push(format!("Cần nộp thêm {gap} dự án nữa"));
    }

    if link_count == 0 {
        missing_conditions.push("Cần có ít nhất 1 link dự án".to_string());
    }

    PassCheck {
        can_pass: missing_conditions.is_empty(),
        missing_conditions,
    }
}
