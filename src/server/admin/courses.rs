use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::{CreateCourseRequest, ListCoursesParams, ReorderRequest};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::{validate_course_title, validate_non_negative};
use crate::types::Course;

const COURSE_NOT_FOUND: &str = "Không tìm thấy khóa học";
const SEMESTER_NOT_FOUND: &str = "Không tìm thấy học kỳ";

pub async fn create_course(
    RequireAdmin(admin_id): RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateCourseRequest>,
) -> impl IntoResponse {
    let title = validate_course_title(&req.title)?;
    let required_sessions = validate_non_negative(req.required_sessions, "Số buổi học yêu cầu")?;
    let required_projects = validate_non_negative(req.required_projects, "Số dự án yêu cầu")?;

    state
        .store
        .get_semester(&req.semester_id)
        .api_err("Failed to get semester")?
        .or_not_found(SEMESTER_NOT_FOUND)?;

    let order = match req.order {
        Some(order) => validate_non_negative(order, "Thứ tự")?,
        None => state
            .store
            .list_courses_by_semester(&req.semester_id)
            .api_err("Failed to list courses")?
            .last()
            .map_or(0, |c| c.order + 1),
    };

    let course = Course {
        id: Uuid::new_v4().to_string(),
        title,
        semester_id: req.semester_id,
        order,
        required_sessions,
        required_projects,
        is_active: req.is_active,
        created_at: Utc::now(),
    };

    state
        .store
        .create_course(&course)
        .api_err("Failed to create course")?;

    tracing::info!(
        "Course {} created in semester {} by {}",
        course.id,
        course.semester_id,
        admin_id
    );

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(course))))
}

/// Courses of one semester, or of every semester in semester order.
pub async fn list_courses(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListCoursesParams>,
) -> impl IntoResponse {
    let courses = match params.semester_id {
        Some(semester_id) => state
            .store
            .list_courses_by_semester(&semester_id)
            .api_err("Failed to list courses")?,
        None => {
            let semesters = state
                .store
                .list_semesters_sorted()
                .api_err("Failed to list semesters")?;
            let mut courses = Vec::new();
            for semester in semesters {
                courses.extend(
                    state
                        .store
                        .list_courses_by_semester(&semester.id)
                        .api_err("Failed to list courses")?,
                );
            }
            courses
        }
    };

    Ok::<_, ApiError>(Json(ApiResponse::success(courses)))
}

pub async fn get_course(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let course = state
        .store
        .get_course(&id)
        .api_err("Failed to get course")?
        .or_not_found(COURSE_NOT_FOUND)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(course)))
}

/// Progress records and tracking logs of the course go with it.
pub async fn delete_course(
    RequireAdmin(admin_id): RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let deleted = state
        .store
        .delete_course(&id)
        .api_err("Failed to delete course")?;

    if !deleted {
        return Err(ApiError::not_found(COURSE_NOT_FOUND));
    }

    tracing::info!("Course {} deleted by {}", id, admin_id);

    Ok(StatusCode::NO_CONTENT)
}

pub async fn reorder_courses(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(semester_id): Path<String>,
    Json(req): Json<ReorderRequest>,
) -> impl IntoResponse {
    state
        .store
        .get_semester(&semester_id)
        .api_err("Failed to get semester")?
        .or_not_found(SEMESTER_NOT_FOUND)?;

    state
        .store
        .reorder_courses(&semester_id, &req.ids)
        .api_err("Failed to reorder courses")?;

    let courses = state
        .store
        .list_courses_by_semester(&semester_id)
        .api_err("Failed to list courses")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(courses)))
}
