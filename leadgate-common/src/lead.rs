//! Lead payload and persisted lead record
//!
//! A [`LeadPayload`] is the untrusted, open-ended JSON object submitted by a
//! publisher. A [`LeadRecord`] is what the ingestion pipeline writes to the
//! store exactly once per non-duplicate submission.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::validation::{AggregateFraudResult, ConsentResult, ValidationVerdict};

/// Identity fields every submission must carry
pub const REQUIRED_FIELDS: [&str; 3] = ["email", "phone", "ip_address"];

/// Key of the optional wrapper object some publishers nest the lead under
const BODY_KEY: &str = "body";

/// Record fields computed by the pipeline. Same-named payload fields are
/// dropped from the pass-through attributes so the computed value wins.
pub const COMPUTED_RECORD_FIELDS: [&str; 19] = [
    "id",
    "timestamp",
    "created_at",
    "date",
    "time",
    "phone",
    "email",
    "ip_address",
    "trusted_form_cert_id",
    "pub_id",
    "passed_tf_check",
    "passed_phone_check",
    "passed_email_check",
    "passed_ip_check",
    "trustedform_response",
    "ipqs_response",
    "sellable",
    "sold",
    "cherry_picked",
];

/// Raw inbound lead submission
///
/// Only `email`, `phone` and `ip_address` have a required shape; everything
/// else is carried through to the record verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeadPayload(Map<String, Value>);

impl LeadPayload {
    /// Build a payload from any JSON value. Non-object values carry no fields.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self(fields),
            _ => Self::default(),
        }
    }

    /// Nested `body` object, if the publisher wrapped the lead
    fn body(&self) -> Option<&Map<String, Value>> {
        self.0.get(BODY_KEY).and_then(Value::as_object)
    }

    /// Look up a string field at the top level, then one level down in `body`.
    ///
    /// Empty strings and non-string values count as absent.
    pub fn field(&self, name: &str) -> Option<&str> {
        fn non_empty_str(value: Option<&Value>) -> Option<&str> {
            value.and_then(Value::as_str).filter(|s| !s.is_empty())
        }

        non_empty_str(self.0.get(name))
            .or_else(|| self.body().and_then(|body| non_empty_str(body.get(name))))
    }

    pub fn email(&self) -> Option<&str> {
        self.field("email")
    }

    pub fn phone(&self) -> Option<&str> {
        self.field("phone")
    }

    pub fn ip_address(&self) -> Option<&str> {
        self.field("ip_address")
    }

    pub fn trusted_form_cert_id(&self) -> Option<&str> {
        self.field("trusted_form_cert_id")
    }

    /// Required identity fields that are absent
    pub fn missing_required(&self) -> Vec<&'static str> {
        REQUIRED_FIELDS
            .into_iter()
            .filter(|name| self.field(name).is_none())
            .collect()
    }

    /// Fields copied into the record: the `body` object when present,
    /// otherwise the top level.
    pub fn record_data(&self) -> &Map<String, Value> {
        self.body().unwrap_or(&self.0)
    }
}

/// Stored form of the consent provider's answer
///
/// `error` distinguishes "the provider said no" (`None`) from "we could not
/// ask the provider" (`Some(message)`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsentResponseRecord {
    pub cert_id: Option<String>,
    pub outcome: String,
    pub reason: String,
    pub validated: bool,
    pub raw_response: Option<ConsentResult>,
    pub error: Option<String>,
}

impl ConsentResponseRecord {
    pub fn from_result(cert_id: Option<String>, result: &ConsentResult) -> Self {
        Self {
            cert_id,
            outcome: result.outcome.clone(),
            reason: result.reason.clone(),
            validated: result.is_success(),
            raw_response: Some(result.clone()),
            error: None,
        }
    }

    pub fn from_transport_error(cert_id: Option<String>, message: &str) -> Self {
        Self {
            cert_id,
            outcome: "error".to_string(),
            reason: message.to_string(),
            validated: false,
            raw_response: None,
            error: Some(message.to_string()),
        }
    }
}

/// Pass/fail summary of one fraud sub-check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckSummary {
    pub valid: bool,
    pub reasons: Vec<String>,
}

impl From<&ValidationVerdict> for CheckSummary {
    fn from(verdict: &ValidationVerdict) -> Self {
        Self {
            valid: verdict.valid,
            reasons: verdict.reasons.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudCheckResults {
    pub phone: CheckSummary,
    pub email: CheckSummary,
    pub ip: CheckSummary,
}

/// Stored form of the fraud provider's three responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudResponseRecord {
    pub phone: Value,
    pub email: Value,
    pub ip: Value,
    pub validated: bool,
    pub results: FraudCheckResults,
}

impl From<&AggregateFraudResult> for FraudResponseRecord {
    fn from(result: &AggregateFraudResult) -> Self {
        Self {
            phone: result.phone.raw_data.clone(),
            email: result.email.raw_data.clone(),
            ip: result.ip.raw_data.clone(),
            validated: result.validated,
            results: FraudCheckResults {
                phone: (&result.phone).into(),
                email: (&result.email).into(),
                ip: (&result.ip).into(),
            },
        }
    }
}

/// Persisted outcome of one ingestion attempt
///
/// Created once by the pipeline and never mutated afterwards. Later lifecycle
/// stages (selling, cherry-picking) own `sold` and `cherry_picked`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub date: String,
    pub time: String,
    pub phone: String,
    pub email: String,
    pub ip_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trusted_form_cert_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pub_id: Option<Value>,

    pub passed_tf_check: bool,
    pub passed_phone_check: bool,
    pub passed_email_check: bool,
    pub passed_ip_check: bool,

    pub trustedform_response: ConsentResponseRecord,
    pub ipqs_response: FraudResponseRecord,

    pub sellable: bool,
    pub sold: bool,
    pub cherry_picked: bool,

    /// Every other payload field, verbatim
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> LeadPayload {
        LeadPayload::from_value(value)
    }

    #[test]
    fn test_field_prefers_top_level() {
        let p = payload(json!({
            "email": "top@example.com",
            "body": { "email": "nested@example.com" }
        }));
        assert_eq!(p.email(), Some("top@example.com"));
    }

    #[test]
    fn test_field_falls_back_to_body() {
        let p = payload(json!({
            "body": { "email": "a@b.com", "phone": "5551234567", "ip_address": "1.2.3.4" }
        }));
        assert_eq!(p.email(), Some("a@b.com"));
        assert_eq!(p.phone(), Some("5551234567"));
        assert_eq!(p.ip_address(), Some("1.2.3.4"));
        assert!(p.missing_required().is_empty());
    }

    #[test]
    fn test_empty_and_non_string_fields_are_missing() {
        let p = payload(json!({ "email": "", "phone": 5551234567u64, "ip_address": "1.2.3.4" }));
        assert_eq!(p.missing_required(), vec!["email", "phone"]);
    }

    #[test]
    fn test_non_object_payload_has_no_fields() {
        let p = payload(json!(["email", "phone"]));
        assert_eq!(p.missing_required(), REQUIRED_FIELDS.to_vec());
    }

    #[test]
    fn test_record_data_uses_body_when_wrapped() {
        let p = payload(json!({ "source": "outer", "body": { "source": "inner" } }));
        assert_eq!(p.record_data().get("source"), Some(&json!("inner")));

        let flat = payload(json!({ "source": "outer" }));
        assert_eq!(flat.record_data().get("source"), Some(&json!("outer")));
    }

    #[test]
    fn test_consent_record_distinguishes_transport_error() {
        let rejected = ConsentResponseRecord::from_result(
            Some("cert-1".into()),
            &ConsentResult::new("failure", "phone mismatch"),
        );
        assert_eq!(rejected.outcome, "failure");
        assert!(rejected.error.is_none());
        assert!(rejected.raw_response.is_some());

        let unreachable =
            ConsentResponseRecord::from_transport_error(Some("cert-1".into()), "down");
        assert_eq!(unreachable.outcome, "error");
        assert_eq!(unreachable.error.as_deref(), Some("down"));
        assert!(!unreachable.validated);
        assert!(unreachable.raw_response.is_none());
    }

    #[test]
    fn test_record_flattens_attributes() {
        let fraud = AggregateFraudResult::check_failed();
        let now = Utc::now();
        let mut attributes = Map::new();
        attributes.insert("utm_source".into(), json!("google"));

        let record = LeadRecord {
            id: Uuid::new_v4(),
            timestamp: now,
            created_at: now,
            date: "2026-01-01".into(),
            time: "10:00:00".into(),
            phone: "5551234567".into(),
            email: "a@b.com".into(),
            ip_address: "1.2.3.4".into(),
            trusted_form_cert_id: None,
            pub_id: None,
            passed_tf_check: false,
            passed_phone_check: false,
            passed_email_check: false,
            passed_ip_check: false,
            trustedform_response: ConsentResponseRecord::from_transport_error(None, "down"),
            ipqs_response: (&fraud).into(),
            sellable: false,
            sold: false,
            cherry_picked: false,
            attributes,
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["utm_source"], "google");
        assert_eq!(value["trustedform_response"]["error"], "down");
        assert_eq!(
            value["ipqs_response"]["results"]["phone"]["reasons"],
            json!(["Validation failed"])
        );

        let back: LeadRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }
}
