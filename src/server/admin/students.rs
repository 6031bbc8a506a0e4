use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::CreateStudentRequest;
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::validate_student_name;
use crate::types::Student;

const STUDENT_NOT_FOUND: &str = "Không tìm thấy học viên";

fn require_student(state: &AppState, id: &str) -> Result<Student, ApiError> {
    state
        .store
        .get_student(id)
        .api_err("Failed to get student")?
        .or_not_found(STUDENT_NOT_FOUND)
}

pub async fn create_student(
    RequireAdmin(admin_id): RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateStudentRequest>,
) -> impl IntoResponse {
    let name = validate_student_name(&req.name)?;

    if let Some(semester_id) = &req.current_semester_id {
        state
            .store
            .get_semester(semester_id)
            .api_err("Failed to get semester")?
            .or_not_found("Không tìm thấy học kỳ")?;
    }

    let now = Utc::now();
    let student = Student {
        id: Uuid::new_v4().to_string(),
        name,
        email: req.email.filter(|e| !e.trim().is_empty()),
        major_id: req.major_id.filter(|m| !m.trim().is_empty()),
        current_semester_id: req.current_semester_id,
        created_at: now,
        updated_at: now,
    };

    state
        .store
        .create_student(&student)
        .api_err("Failed to create student")?;

    tracing::info!("Student {} created by {}", student.id, admin_id);

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(student))))
}

pub async fn get_student(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let student = require_student(&state, &id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(student)))
}

pub async fn list_progress(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    require_student(&state, &id)?;

    let progress = state
        .store
        .list_student_progress(&id)
        .api_err("Failed to list progress")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(progress)))
}

pub async fn list_notifications(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    require_student(&state, &id)?;

    let notifications = state
        .store
        .list_user_notifications(&id)
        .api_err("Failed to list notifications")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(notifications)))
}

pub async fn mark_notification_read(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let notification = state
        .store
        .mark_notification_read(&id)
        .api_err("Failed to update notification")?
        .or_not_found("Không tìm thấy thông báo")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(notification)))
}

/// Opens a course for a student outside the automatic sequence.
///
/// Returns 201 when the course was opened by this call and 200 when it was
/// already available.
pub async fn unlock_course(
    RequireAdmin(admin_id): RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path((student_id, course_id)): Path<(String, String)>,
) -> impl IntoResponse {
    let unlock = state
        .service
        .unlock_engine()
        .unlock_course(&student_id, &course_id, &admin_id)?;

    let status = if unlock.newly_unlocked {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok::<_, ApiError>((status, Json(ApiResponse::success(unlock))))
}
