use url::Url;

use super::{ProgressError, Result};

fn validate_count(field: &'static str, label: &str, value: i64, required: i64) -> Result<()> {
    if value < 0 || value > required {
        return Err(ProgressError::validation(
            field,
            format!("Số {label} phải nằm trong khoảng 0 đến {required}"),
        ));
    }
    Ok(())
}

/// Accepts `0..=required_sessions`.
pub fn validate_session_count(value: i64, required_sessions: i64) -> Result<()> {
    validate_count("completed_sessions", "buổi học", value, required_sessions)
}

/// Accepts `0..=required_projects`.
pub fn validate_project_count(value: i64, required_projects: i64) -> Result<()> {
    validate_count("projects_submitted", "dự án", value, required_projects)
}

/// Accepts absolute `http` or `https` URLs only. Returns the link with
/// surrounding whitespace removed, which is the form that gets stored.
pub fn validate_project_url(url: &str) -> Result<&str> {
    let invalid = || {
        ProgressError::validation(
            "project_links",
            "Link dự án phải là URL http hoặc https hợp lệ",
        )
    };

    let trimmed = url.trim();
    let parsed = Url::parse(trimmed).map_err(|_| invalid())?;
    match parsed.scheme() {
        "http" | "https" if parsed.host().is_some() => Ok(trimmed),
        _ => Err(invalid()),
    }
}

pub fn validate_rejection_reason(reason: &str) -> Result<&str> {
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        return Err(ProgressError::validation(
            "reason",
            "Vui lòng nhập lý do từ chối",
        ));
    }
    Ok(trimmed)
}
