//! # Coursetrack
//!
//! Admin backend for tracking students through a semester/course curriculum:
//! session and project progress, approval review, and automatic unlocking of
//! the next course or semester. Usable as a standalone binary and as a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! coursetrack = { version = "0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use coursetrack::progress::NoPause;
//! use coursetrack::server::{AppState, create_router};
//! use coursetrack::store::{SqliteStore, Store};
//!
//! let store = SqliteStore::new("./data/coursetrack.db").unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(Arc::new(store), Arc::new(NoPause)));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Builds the `coursetrack` binary. Disable with `default-features = false`.

pub mod auth;
pub mod config;
pub mod error;
pub mod progress;
pub mod server;
pub mod store;
pub mod types;
