//! HTTP API handlers for leadgate-ingest

pub mod health;
pub mod leads;

pub use health::health_routes;
pub use leads::lead_routes;
