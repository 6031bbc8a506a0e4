use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Router, routing::get};

use super::admin::admin_router;
use crate::progress::{BulkApprover, Collaborators, Pacer, ProgressService};
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub service: ProgressService,
    pub bulk: BulkApprover,
}

impl AppState {
    pub fn new<S: Store + 'static>(store: Arc<S>, pacer: Arc<dyn Pacer>) -> Self {
        Self::with_collaborators(store.clone(), Collaborators::from_store(store), pacer)
    }

    /// Wires the services to `collab` while CRUD routes keep using `store`.
    pub fn with_collaborators(
        store: Arc<dyn Store>,
        collab: Collaborators,
        pacer: Arc<dyn Pacer>,
    ) -> Self {
        let service = ProgressService::new(&collab);
        let bulk = BulkApprover::new(service.clone(), pacer);
        Self {
            store,
            service,
            bulk,
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1/admin", admin_router())
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
