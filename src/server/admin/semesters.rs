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
use crate::server::dto::{CreateSemesterRequest, ReorderRequest};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::{validate_non_negative, validate_semester_name};
use crate::types::Semester;

const SEMESTER_NOT_FOUND: &str = "Không tìm thấy học kỳ";

pub async fn create_semester(
    RequireAdmin(admin_id): RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSemesterRequest>,
) -> impl IntoResponse {
    let name = validate_semester_name(&req.name)?;

    let order = match req.order {
        Some(order) => validate_non_negative(order, "Thứ tự")?,
        None => state
            .store
            .list_semesters_sorted()
            .api_err("Failed to list semesters")?
            .last()
            .map_or(0, |s| s.order + 1),
    };

    let semester = Semester {
        id: Uuid::new_v4().to_string(),
        name,
        order,
        is_active: req.is_active,
        requires_major_selection: req.requires_major_selection,
        created_at: Utc::now(),
    };

    state
        .store
        .create_semester(&semester)
        .api_err("Failed to create semester")?;

    tracing::info!("Semester {} created by {}", semester.id, admin_id);

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(semester))))
}

pub async fn list_semesters(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let semesters = state
        .store
        .list_semesters_sorted()
        .api_err("Failed to list semesters")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(semesters)))
}

pub async fn get_semester(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let semester = state
        .store
        .get_semester(&id)
        .api_err("Failed to get semester")?
        .or_not_found(SEMESTER_NOT_FOUND)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(semester)))
}

/// Removes the semester together with its courses and their progress records.
pub async fn delete_semester(
    RequireAdmin(admin_id): RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let deleted = state
        .store
        .delete_semester(&id)
        .api_err("Failed to delete semester")?;

    if !deleted {
        return Err(ApiError::not_found(SEMESTER_NOT_FOUND));
    }

    tracing::info!("Semester {} deleted by {}", id, admin_id);

    Ok(StatusCode::NO_CONTENT)
}

pub async fn reorder_semesters(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReorderRequest>,
) -> impl IntoResponse {
    state
        .store
        .reorder_semesters(&req.ids)
        .api_err("Failed to reorder semesters")?;

    let semesters = state
        .store
        .list_semesters_sorted()
        .api_err("Failed to list semesters")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(semesters)))
}
