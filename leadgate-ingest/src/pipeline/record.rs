//! Lead record assembly

use chrono::{DateTime, Utc};
use leadgate_common::lead::COMPUTED_RECORD_FIELDS;
use leadgate_common::{ConsentResponseRecord, LeadPayload, LeadRecord};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::ValidationOutcome;

/// Identity fields already extracted from the payload
#[derive(Debug, Clone, Copy)]
pub struct LeadIdentity<'a> {
    pub email: &'a str,
    pub phone: &'a str,
    pub ip_address: &'a str,
    pub cert_id: Option<&'a str>,
}

/// Non-empty string field from the record data
fn data_str<'a>(data: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    data.get(name)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// `pub_id` when present and non-empty, otherwise `sub_id`
fn publisher_id(data: &Map<String, Value>) -> Option<Value> {
    let present = |name: &str| {
        data.get(name)
            .filter(|v| !v.is_null() && v.as_str() != Some(""))
            .cloned()
    };
    present("pub_id").or_else(|| present("sub_id"))
}

/// Build the record persisted for one submission.
///
/// Pass-through attributes come from the record data with every computed
/// field name removed, so computed values always win.
pub fn assemble(
    payload: &LeadPayload,
    identity: LeadIdentity<'_>,
    validation: &ValidationOutcome,
    id: Uuid,
    now: DateTime<Utc>,
) -> LeadRecord {
    let data = payload.record_data();
    let fraud = &validation.fraud;
    let consent_passed = validation.consent.is_success();
    let cert_id = identity.cert_id.map(str::to_string);

    let trustedform_response = match &validation.consent_error {
        Some(message) => ConsentResponseRecord::from_transport_error(cert_id.clone(), message),
        None => ConsentResponseRecord::from_result(cert_id.clone(), &validation.consent),
    };

    let attributes: Map<String, Value> = data
        .iter()
        .filter(|(key, _)| !COMPUTED_RECORD_FIELDS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    LeadRecord {
        id,
        timestamp: now,
        created_at: now,
        date: data_str(data, "date")
            .map(str::to_string)
            .unwrap_or_else(|| now.format("%Y-%m-%d").to_string()),
        time: data_str(data, "time")
            .map(str::to_string)
            .unwrap_or_else(|| now.format("%H:%M:%S").to_string()),
        phone: identity.phone.to_string(),
        email: identity.email.to_string(),
        ip_address: identity.ip_address.to_string(),
        trusted_form_cert_id: cert_id,
        pub_id: publisher_id(data),
        passed_tf_check: consent_passed,
        passed_phone_check: fraud.phone.valid,
        passed_email_check: fraud.email.valid,
        passed_ip_check: fraud.ip.valid,
        trustedform_response,
        ipqs_response: fraud.into(),
        sellable: consent_passed && fraud.validated,
        sold: false,
        cherry_picked: false,
        attributes,
    }
}
