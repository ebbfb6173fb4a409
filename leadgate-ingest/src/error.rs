//! Error types for leadgate-ingest
//!
//! [`IngestError`] is the pipeline's rejection taxonomy. Each variant carries
//! the structured detail the entry point reports to the caller; whether a
//! record was persisted before the error is part of the variant's meaning.

use serde_json::{json, Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::store::StoreError;

/// One fraud sub-check that did not pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FraudFailure {
    /// `ip`, `phone` or `email`
    pub check: &'static str,
    pub reasons: Vec<String>,
}

fn check_label(check: &str) -> &str {
    if check == "ip" { "IP" } else { check }
}

fn failed_check_list(failures: &[FraudFailure]) -> String {
    failures
        .iter()
        .map(|f| check_label(f.check))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Pipeline errors
#[derive(Debug, Error)]
pub enum IngestError {
    /// email, phone or ip_address absent; nothing was written
    #[error("Missing required fields: {}", .fields.join(", "))]
    MissingField { fields: Vec<&'static str> },

    /// phone or email already stored; nothing was written
    #[error("Duplicate lead found with {field}: {value}")]
    DuplicateLead { field: &'static str, value: String },

    /// Consent provider could not be asked; record persisted
    #[error("{message}")]
    ConsentCheckError {
        lead_id: Uuid,
        message: String,
        cert_id: Option<String>,
    },

    /// Consent provider said no; record persisted
    #[error("TrustedForm validation failed: {outcome} ({reason})")]
    ConsentRejected {
        lead_id: Uuid,
        outcome: String,
        reason: String,
    },

    /// One or more fraud sub-checks failed; record persisted
    #[error("IPQS validation failed: {}", failed_check_list(.failures))]
    FraudRejected {
        lead_id: Uuid,
        failures: Vec<FraudFailure>,
    },

    /// Duplicate lookup failed before any write
    #[error("Failed to check for duplicate leads: {0}")]
    StoreQueryFailure(#[source] StoreError),

    /// Record write failed; the submission is lost
    #[error("Failed to store lead: {0}")]
    StoreWriteFailure(#[source] StoreError),
}

/// Discriminant of [`IngestError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestErrorKind {
    MissingField,
    DuplicateLead,
    ConsentCheckError,
    ConsentRejected,
    FraudRejected,
    StoreQueryFailure,
    StoreWriteFailure,
}

impl IngestError {
    pub fn kind(&self) -> IngestErrorKind {
        match self {
            IngestError::MissingField { .. } => IngestErrorKind::MissingField,
            IngestError::DuplicateLead { .. } => IngestErrorKind::DuplicateLead,
            IngestError::ConsentCheckError { .. } => IngestErrorKind::ConsentCheckError,
            IngestError::ConsentRejected { .. } => IngestErrorKind::ConsentRejected,
            IngestError::FraudRejected { .. } => IngestErrorKind::FraudRejected,
            IngestError::StoreQueryFailure(_) => IngestErrorKind::StoreQueryFailure,
            IngestError::StoreWriteFailure(_) => IngestErrorKind::StoreWriteFailure,
        }
    }

    /// Id of the record persisted before this rejection, if one was
    pub fn lead_id(&self) -> Option<Uuid> {
        match self {
            IngestError::ConsentCheckError { lead_id, .. }
            | IngestError::ConsentRejected { lead_id, .. }
            | IngestError::FraudRejected { lead_id, .. } => Some(*lead_id),
            _ => None,
        }
    }

    /// Structured detail payload for the caller
    pub fn details(&self) -> Option<Value> {
        match self {
            IngestError::MissingField { fields } => Some(json!({ "missing": fields })),
            IngestError::DuplicateLead { field, .. } => Some(json!({ "field": field })),
            IngestError::ConsentCheckError { message, cert_id, .. } => Some(json!({
                "error": message,
                "cert_id": cert_id,
            })),
            IngestError::ConsentRejected { outcome, reason, .. } => Some(json!({
                "outcome": outcome,
                "reason": reason,
            })),
            IngestError::FraudRejected { failures, .. } => {
                let details: Map<String, Value> = failures
                    .iter()
                    .map(|f| (f.check.to_string(), json!(f.reasons)))
                    .collect();
                Some(Value::Object(details))
            }
            IngestError::StoreQueryFailure(_) | IngestError::StoreWriteFailure(_) => None,
        }
    }
}
