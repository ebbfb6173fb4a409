//! leadgate-ingest library interface
//!
//! Exposes the pipeline, provider clients, store and router for the binary
//! and for integration testing.

pub mod api;
pub mod cli;
pub mod clients;
pub mod error;
pub mod pipeline;
pub mod store;

pub use crate::error::{IngestError, IngestErrorKind};
pub use crate::pipeline::LeadPipeline;

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Composed once at startup, shared by every request
    pub pipeline: Arc<LeadPipeline>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    pub store_table: Arc<str>,
    pub region: Arc<str>,
}

impl AppState {
    pub fn new(pipeline: LeadPipeline, store_table: &str, region: &str) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            startup_time: Utc::now(),
            store_table: Arc::from(store_table),
            region: Arc::from(region),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::lead_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
