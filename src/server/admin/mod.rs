mod activity;
mod courses;
mod progress;
mod semesters;
mod students;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::server::AppState;

pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        // Semester routes
        .route(
            "/semesters",
            post(semesters::create_semester).get(semesters::list_semesters),
        )
        .route("/semesters/order", put(semesters::reorder_semesters))
        .route(
            "/semesters/{id}",
            get(semesters::get_semester).delete(semesters::delete_semester),
        )
        .route(
            "/semesters/{id}/courses/order",
            put(courses::reorder_courses),
        )
        // Course routes
        .route(
            "/courses",
            post(courses::create_course).get(courses::list_courses),
        )
        .route(
            "/courses/{id}",
            get(courses::get_course).delete(courses::delete_course),
        )
        // Student routes
        .route("/students", post(students::create_student))
        .route("/students/{id}", get(students::get_student))
        .route("/students/{id}/progress", get(students::list_progress))
        .route(
            "/students/{id}/notifications",
            get(students::list_notifications),
        )
        .route(
            "/students/{id}/courses/{course_id}/unlock",
            post(students::unlock_course),
        )
        .route(
            "/notifications/{id}/read",
            post(students::mark_notification_read),
        )
        // Progress routes
        .route("/progress/bulk-pass", post(progress::bulk_pass))
        .route(
            "/progress/{id}",
            get(progress::get_progress).patch(progress::update_progress),
        )
        .route("/progress/{id}/logs", get(progress::list_logs))
        .route("/progress/{id}/approve", post(progress::approve))
        .route("/progress/{id}/reject", post(progress::reject))
        // Activity feed
        .route("/activity", get(activity::list_activity))
}
