use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::ActivityParams;
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};

const DEFAULT_ACTIVITY_LIMIT: i64 = 50;
const MAX_ACTIVITY_LIMIT: i64 = 200;

pub async fn list_activity(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ActivityParams>,
) -> impl IntoResponse {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_ACTIVITY_LIMIT)
        .clamp(1, MAX_ACTIVITY_LIMIT);

    let entries = state
        .store
        .list_recent_activity(limit)
        .api_err("Failed to list activity")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(entries)))
}
