use serde::{Deserialize, Serialize};

use crate::progress::PassCheck;
use crate::types::StudentProgress;

#[derive(Debug, Deserialize)]
pub struct CreateSemesterRequest {
    pub name: String,
    /// Appended after the last semester when omitted.
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub requires_major_selection: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateCourseRequest {
    pub title: String,
    pub semester_id: String,
    #[serde(default)]
    pub order: Option<i64>,
    pub required_sessions: i64,
    pub required_projects: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateStudentRequest {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub major_id: Option<String>,
    #[serde(default)]
    pub current_semester_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct BulkPassBody {
    pub progress_ids: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListCoursesParams {
    #[serde(default)]
    pub semester_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ActivityParams {
    #[serde(default)]
    pub limit: Option<i64>,
}

/// A progress record with its pass-condition evaluation.
#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    #[serde(flatten)]
    pub progress: StudentProgress,
    pub pass_check: PassCheck,
}

fn default_true() -> bool {
    true
}
