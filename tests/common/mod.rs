#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use coursetrack::progress::NoPause;
use coursetrack::server::{AppState, create_router};
use coursetrack::store::{SqliteStore, Store};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub const ADMIN: &str = "admin-1";

/// A router over a fresh SQLite store in a temp directory.
pub struct TestApp {
    pub temp_dir: TempDir,
    pub store: Arc<SqliteStore>,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let store = Arc::new(
            SqliteStore::new(temp_dir.path().join("coursetrack.db")).expect("open database"),
        );
        store.initialize().expect("initialize database");

        let state = Arc::new(AppState::new(store.clone(), Arc::new(NoPause)));
        Self {
            temp_dir,
            store,
            router: create_router(state),
        }
    }

    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        admin: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(admin) = admin {
            builder = builder.header("x-admin-id", admin);
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).expect("build request"))
            .await
            .expect("router is infallible");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send("GET", uri, Some(ADMIN), None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send("POST", uri, Some(ADMIN), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send("PATCH", uri, Some(ADMIN), Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send("PUT", uri, Some(ADMIN), Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send("DELETE", uri, Some(ADMIN), None).await
    }

    pub async fn create_semester(&self, name: &str) -> String {
        let (status, body) = self
            .post("/api/v1/admin/semesters", serde_json::json!({ "name": name }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_str().expect("semester id").to_string()
    }

    pub async fn create_course(
        &self,
        semester_id: &str,
        title: &str,
        sessions: i64,
        projects: i64,
    ) -> String {
        let (status, body) = self
            .post(
                "/api/v1/admin/courses",
                serde_json::json!({
                    "title": title,
                    "semester_id": semester_id,
                    "required_sessions": sessions,
                    "required_projects": projects,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_str().expect("course id").to_string()
    }

    pub async fn create_student(&self, name: &str) -> String {
        let (status, body) = self
            .post("/api/v1/admin/students", serde_json::json!({ "name": name }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_str().expect("student id").to_string()
    }

    /// Unlocks the course and returns the progress record id.
    pub async fn unlock(&self, student_id: &str, course_id: &str) -> String {
        let (status, body) = self
            .post(
                &format!("/api/v1/admin/students/{student_id}/courses/{course_id}/unlock"),
                Value::Null,
            )
            .await;
        assert!(status.is_success(), "{status}: {body}");
        body["data"]["progress"]["id"]
            .as_str()
            .expect("progress id")
            .to_string()
    }
}
