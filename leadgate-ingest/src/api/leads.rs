//! Lead endpoints
//!
//! `POST /lead` submits a lead through the pipeline; `GET /lead` lists every
//! stored lead, oldest first.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use leadgate_common::{LeadPayload, LeadRecord};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, warn};

use crate::error::IngestError;
use crate::AppState;

/// Caller-facing error for store failures; the cause is only logged
const STORE_FAILURE_MESSAGE: &str = "internal storage error";

/// Create-lead response body
#[derive(Debug, Serialize)]
pub struct CreateLeadResponse {
    pub result: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CreateLeadResponse {
    fn accepted(record: &LeadRecord) -> Self {
        Self {
            result: true,
            message: "lead accepted".to_string(),
            details: Some(json!({ "lead_id": record.id })),
            error: None,
        }
    }

    fn rejected(message: &str, details: Option<Value>, error: Option<String>) -> Self {
        Self {
            result: false,
            message: message.to_string(),
            details,
            error,
        }
    }
}

/// List-leads response body
#[derive(Debug, Serialize)]
pub struct ListLeadsResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<LeadRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Status code and body for a pipeline rejection
fn rejection_response(err: IngestError) -> (StatusCode, CreateLeadResponse) {
    let details = err.details();
    match err {
        IngestError::MissingField { .. } => (
            StatusCode::BAD_REQUEST,
            CreateLeadResponse::rejected("lead rejected", details, Some(err.to_string())),
        ),
        IngestError::DuplicateLead { .. } => (
            StatusCode::CONFLICT,
            CreateLeadResponse::rejected("duplicate lead rejected", details, None),
        ),
        IngestError::ConsentCheckError { .. } | IngestError::ConsentRejected { .. } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            CreateLeadResponse::rejected("TrustedForm validation failed", details, None),
        ),
        IngestError::FraudRejected { .. } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            CreateLeadResponse::rejected("IPQS validation failed", details, None),
        ),
        IngestError::StoreQueryFailure(_) | IngestError::StoreWriteFailure(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            CreateLeadResponse::rejected(
                "lead rejected",
                details,
                Some(STORE_FAILURE_MESSAGE.to_string()),
            ),
        ),
    }
}

/// POST /lead
pub async fn create_lead(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> (StatusCode, Json<CreateLeadResponse>) {
    let payload = match payload {
        Ok(Json(value)) => LeadPayload::from_value(value),
        Err(rejection) => {
            warn!(error = %rejection, "Malformed lead submission");
            let error = Some(rejection.body_text());
            let body = CreateLeadResponse::rejected("lead rejected", None, error);
            return (StatusCode::BAD_REQUEST, Json(body));
        }
    };

    match state.pipeline.create_lead(payload).await {
        Ok(record) => (
            StatusCode::CREATED,
            Json(CreateLeadResponse::accepted(&record)),
        ),
        Err(err) => {
            let (status, body) = rejection_response(err);
            (status, Json(body))
        }
    }
}

/// GET /lead
pub async fn list_leads(State(state): State<AppState>) -> (StatusCode, Json<ListLeadsResponse>) {
    match state.pipeline.list_leads().await {
        Ok(leads) => (
            StatusCode::OK,
            Json(ListLeadsResponse {
                success: true,
                message: "Leads retrieved successfully".to_string(),
                count: Some(leads.len()),
                data: Some(leads),
                error: None,
            }),
        ),
        Err(e) => {
            error!(error = %e, "Failed to retrieve leads");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ListLeadsResponse {
                    success: false,
                    message: "Failed to retrieve leads".to_string(),
                    count: None,
                    data: None,
                    error: Some(STORE_FAILURE_MESSAGE.to_string()),
                }),
            )
        }
    }
}

/// Build lead routes
pub fn lead_routes() -> Router<AppState> {
    Router::new().route("/lead", get(list_leads).post(create_lead))
}
