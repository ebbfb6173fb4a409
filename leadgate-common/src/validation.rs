//! Validation result types
//!
//! Produced by the fraud-signal and consent-certificate clients and consumed
//! by the ingestion pipeline when assembling a [`crate::LeadRecord`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reason recorded on every placeholder verdict when the fraud provider
/// could not be queried at all.
pub const VALIDATION_FAILED_REASON: &str = "Validation failed";

/// Outcome string that marks a consent certificate as valid.
pub const CONSENT_SUCCESS_OUTCOME: &str = "success";

/// Verdict for a single sub-check (ip, phone or email).
///
/// `reasons` is the ordered list of rule names that fired; the verdict is
/// valid exactly when that list is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    pub valid: bool,
    pub reasons: Vec<String>,
    /// Raw provider response, tagged with the sub-check type
    #[serde(rename = "rawData")]
    pub raw_data: Value,
}

impl ValidationVerdict {
    /// Build a verdict from the fired rules. Validity is derived, never passed.
    pub fn from_reasons(reasons: Vec<String>, raw_data: Value) -> Self {
        Self {
            valid: reasons.is_empty(),
            reasons,
            raw_data,
        }
    }

    /// Verdict used when the provider call itself failed
    pub fn check_failed() -> Self {
        Self::from_reasons(
            vec![VALIDATION_FAILED_REASON.to_string()],
            Value::Object(Default::default()),
        )
    }
}

/// Combined result of the three fraud sub-checks.
///
/// Either all three verdicts come from real provider responses, or all three
/// are the uniform [`ValidationVerdict::check_failed`] placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateFraudResult {
    pub validated: bool,
    pub ip: ValidationVerdict,
    pub phone: ValidationVerdict,
    pub email: ValidationVerdict,
}

impl AggregateFraudResult {
    pub fn new(ip: ValidationVerdict, phone: ValidationVerdict, email: ValidationVerdict) -> Self {
        Self {
            validated: ip.valid && phone.valid && email.valid,
            ip,
            phone,
            email,
        }
    }

    /// Uniform placeholder substituted when the fraud check failed at the
    /// transport level.
    pub fn check_failed() -> Self {
        Self::new(
            ValidationVerdict::check_failed(),
            ValidationVerdict::check_failed(),
            ValidationVerdict::check_failed(),
        )
    }

    /// Sub-checks that did not pass, in ip, phone, email order
    pub fn failed_checks(&self) -> Vec<(&'static str, &ValidationVerdict)> {
        [
            ("ip", &self.ip),
            ("phone", &self.phone),
            ("email", &self.email),
        ]
        .into_iter()
        .filter(|(_, verdict)| !verdict.valid)
        .collect()
    }
}

/// Consent certificate verdict as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentResult {
    #[serde(default)]
    pub outcome: String,
    #[serde(default)]
    pub reason: String,
}

impl ConsentResult {
    pub fn new(outcome: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            outcome: outcome.into(),
            reason: reason.into(),
        }
    }

    /// `outcome == "success"` is the sole success predicate
    pub fn is_success(&self) -> bool {
        self.outcome == CONSENT_SUCCESS_OUTCOME
    }

    /// Placeholder used when the consent provider could not be asked
    pub fn transport_failed(message: impl Into<String>) -> Self {
        Self::new("failed", message)
    }
}
