//! # Leadgate Common Library
//!
//! Shared code for the lead ingestion service:
//! - Lead payload and persisted record model
//! - Validation verdict types produced by the provider clients
//! - Configuration loading
//! - Common error type

pub mod config;
pub mod error;
pub mod lead;
pub mod validation;

pub use error::{Error, Result};
pub use lead::{ConsentResponseRecord, FraudResponseRecord, LeadPayload, LeadRecord};
pub use validation::{AggregateFraudResult, ConsentResult, ValidationVerdict};
