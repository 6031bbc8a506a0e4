use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::auth::RequireAdmin;
use crate::progress::{BulkPassRequest, check_pass_condition};
use crate::server::AppState;
use crate::server::dto::{BulkPassBody, ProgressResponse, RejectRequest};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::types::ProgressPatch;

pub async fn get_progress(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let progress = state.service.get_progress(&id)?;
    let course = state
        .store
        .get_course(&progress.course_id)
        .api_err("Failed to get course")?
        .or_not_found("Không tìm thấy khóa học")?;

    let pass_check = check_pass_condition(&progress, course.requirements());

    Ok::<_, ApiError>(Json(ApiResponse::success(ProgressResponse {
        progress,
        pass_check,
    })))
}

pub async fn update_progress(
    RequireAdmin(admin_id): RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<ProgressPatch>,
) -> impl IntoResponse {
    let outcome = state.service.update_progress(&id, &patch, &admin_id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(outcome)))
}

pub async fn list_logs(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let progress = state.service.get_progress(&id)?;
    let logs = state
        .store
        .list_tracking_logs(&progress.student_id, &progress.course_id)
        .api_err("Failed to list tracking logs")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(logs)))
}

pub async fn approve(
    RequireAdmin(admin_id): RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let outcome = state.service.approve(&id, &admin_id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(outcome)))
}

pub async fn reject(
    RequireAdmin(admin_id): RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<RejectRequest>,
) -> impl IntoResponse {
    let outcome = state.service.reject(&id, &req.reason, &admin_id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(outcome)))
}

/// Runs on the blocking pool; the pacer may sleep between items.
pub async fn bulk_pass(
    RequireAdmin(admin_id): RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(body): Json<BulkPassBody>,
) -> impl IntoResponse {
    let request = BulkPassRequest {
        progress_ids: body.progress_ids,
        admin_id,
    };
    let approver = state.bulk.clone();

    let summary = tokio::task::spawn_blocking(move || approver.bulk_pass(&request))
        .await
        .map_err(|e| {
            tracing::error!("Bulk pass task failed: {}", e);
            ApiError::internal("Lỗi hệ thống, vui lòng thử lại")
        })??;

    Ok::<_, ApiError>(Json(ApiResponse::success(summary)))
}
