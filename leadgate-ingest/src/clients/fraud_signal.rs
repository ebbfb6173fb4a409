//! Fraud signal client (IPQualityScore)
//!
//! Three independent sub-checks, each a GET against
//! `{base}/{ip|phone|email}/{api_key}/{value}`. Each raw response is reduced
//! to a [`ValidationVerdict`] by a fixed rule table: the verdict is invalid
//! if any rule fires, and the fired rule names become its reasons.

use async_trait::async_trait;
use leadgate_common::{AggregateFraudResult, ValidationVerdict};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use super::{normalize_phone, provider_url, FraudSignalProvider, REQUEST_TIMEOUT, USER_AGENT};

/// Scores above this are treated as high risk on every channel
pub const FRAUD_SCORE_THRESHOLD: f64 = 75.0;

/// Fixed query parameters sent with every sub-check
const QUERY_PARAMS: [(&str, &str); 3] = [
    ("strictness", "1"),
    ("allow_public_access_points", "true"),
    ("lighter_penalties", "false"),
];

/// Which of the three sub-checks a request or error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    Ip,
    Phone,
    Email,
}

impl CheckKind {
    /// URL path segment and raw-data `type` tag
    pub fn as_str(self) -> &'static str {
        match self {
            CheckKind::Ip => "ip",
            CheckKind::Phone => "phone",
            CheckKind::Email => "email",
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CheckKind::Ip => "IP",
            CheckKind::Phone => "Phone",
            CheckKind::Email => "Email",
        };
        f.write_str(label)
    }
}

/// Fraud signal client errors
///
/// Every variant means the provider could not produce a verdict. A verdict
/// that fails the rule table is not an error.
#[derive(Debug, Error)]
pub enum FraudSignalError {
    #[error("IPQS {check} check failed: network error: {message}")]
    Network { check: CheckKind, message: String },

    #[error("IPQS {check} check failed: API error {status}: {body}")]
    Api {
        check: CheckKind,
        status: u16,
        body: String,
    },

    #[error("IPQS {check} check failed: parse error: {message}")]
    Parse { check: CheckKind, message: String },

    #[error("IPQS {check} check failed: {message}")]
    InvalidUrl { check: CheckKind, message: String },
}

/// Fields of the IP reputation response the rule table reads
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IpCheckResponse {
    pub success: bool,
    pub fraud_score: f64,
    pub proxy: bool,
    pub vpn: bool,
    pub tor: bool,
    pub active_vpn: bool,
    pub active_tor: bool,
    pub recent_abuse: bool,
    pub bot_status: bool,
}

impl IpCheckResponse {
    pub fn failed_rules(&self) -> Vec<String> {
        let rules = [
            (!self.success, "API request failed"),
            (self.fraud_score > FRAUD_SCORE_THRESHOLD, "High fraud score"),
            (self.proxy, "Proxy detected"),
            (self.vpn || self.active_vpn, "VPN detected"),
            (self.tor || self.active_tor, "TOR detected"),
            (self.recent_abuse, "Recent abuse detected"),
            (self.bot_status, "Bot detected"),
        ];
        fired(&rules)
    }
}

/// Fields of the phone validation response the rule table reads
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PhoneCheckResponse {
    pub success: bool,
    pub valid: bool,
    pub fraud_score: f64,
    pub recent_abuse: bool,
    #[serde(rename = "VOIP")]
    pub voip: bool,
    pub risky: bool,
    pub active: bool,
    pub spammer: bool,
    pub do_not_call: bool,
}

impl PhoneCheckResponse {
    pub fn failed_rules(&self) -> Vec<String> {
        let rules = [
            (!self.success, "API request failed"),
            (!self.valid, "Invalid phone number"),
            (self.fraud_score > FRAUD_SCORE_THRESHOLD, "High fraud score"),
            (self.recent_abuse, "Recent abuse detected"),
            (self.voip, "VOIP number"),
            (self.risky, "Risky number"),
            (!self.active, "Inactive number"),
            (self.spammer, "Known spammer"),
            (self.do_not_call, "On do-not-call list"),
        ];
        fired(&rules)
    }
}

/// Fields of the email validation response the rule table reads
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EmailCheckResponse {
    pub success: bool,
    pub valid: bool,
    pub disposable: bool,
    pub fraud_score: f64,
    pub dns_valid: bool,
    pub honeypot: bool,
    pub deliverability: String,
    pub frequent_complainer: bool,
    pub spam_trap_score: String,
    pub suspect: bool,
    pub recent_abuse: bool,
}

impl EmailCheckResponse {
    pub fn failed_rules(&self) -> Vec<String> {
        let rules = [
            (!self.success, "API request failed"),
            (!self.valid, "Invalid email"),
            (self.disposable, "Disposable email"),
            (self.fraud_score > FRAUD_SCORE_THRESHOLD, "High fraud score"),
            (!self.dns_valid, "Invalid DNS"),
            (self.honeypot, "Honeypot detected"),
            (
                matches!(self.deliverability.as_str(), "low" | "none"),
                "Low deliverability",
            ),
            (self.frequent_complainer, "Frequent complainer"),
            (self.spam_trap_score != "none", "Spam trap detected"),
            (self.suspect, "Suspect email"),
            (self.recent_abuse, "Recent abuse detected"),
        ];
        fired(&rules)
    }
}

fn fired(rules: &[(bool, &str)]) -> Vec<String> {
    rules
        .iter()
        .filter(|(hit, _)| *hit)
        .map(|(_, name)| name.to_string())
        .collect()
}

/// Apply the rule table for `check` to a raw provider response
pub fn evaluate(check: CheckKind, raw: Value) -> Result<ValidationVerdict, FraudSignalError> {
    let parse_error = |e: serde_json::Error| FraudSignalError::Parse {
        check,
        message: e.to_string(),
    };

    let reasons = match check {
        CheckKind::Ip => serde_json::from_value::<IpCheckResponse>(raw.clone())
            .map_err(parse_error)?
            .failed_rules(),
        CheckKind::Phone => serde_json::from_value::<PhoneCheckResponse>(raw.clone())
            .map_err(parse_error)?
            .failed_rules(),
        CheckKind::Email => serde_json::from_value::<EmailCheckResponse>(raw.clone())
            .map_err(parse_error)?
            .failed_rules(),
    };

    Ok(ValidationVerdict::from_reasons(reasons, tag_raw(raw, check)))
}

fn tag_raw(mut raw: Value, check: CheckKind) -> Value {
    if let Value::Object(fields) = &mut raw {
        fields.insert("type".to_string(), Value::from(check.as_str()));
    }
    raw
}

/// IPQualityScore API client
pub struct FraudSignalClient {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl FraudSignalClient {
    pub fn new(api_key: String, base_url: String) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http_client,
            api_key,
            base_url,
        })
    }

    /// Whether an API key is configured. Calls without one fail at the provider.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn fetch(&self, check: CheckKind, value: &str) -> Result<Value, FraudSignalError> {
        let url = provider_url(&self.base_url, &[check.as_str(), &self.api_key, value])
            .map_err(|message| FraudSignalError::InvalidUrl { check, message })?;

        // The URL embeds the API key, so only the check type is logged
        tracing::debug!(check = check.as_str(), "Querying fraud signal provider");

        let response = self
            .http_client
            .get(url)
            .query(&QUERY_PARAMS)
            .send()
            .await
            .map_err(|e| FraudSignalError::Network {
                check,
                message: e.without_url().to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FraudSignalError::Api {
                check,
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| FraudSignalError::Parse {
                check,
                message: e.without_url().to_string(),
            })
    }

    async fn check(
        &self,
        check: CheckKind,
        value: &str,
    ) -> Result<ValidationVerdict, FraudSignalError> {
        let raw = self.fetch(check, value).await?;
        let verdict = evaluate(check, raw)?;

        tracing::debug!(
            check = check.as_str(),
            valid = verdict.valid,
            reasons = ?verdict.reasons,
            "Fraud sub-check evaluated"
        );

        Ok(verdict)
    }

    pub async fn check_ip(&self, ip_address: &str) -> Result<ValidationVerdict, FraudSignalError> {
        self.check(CheckKind::Ip, ip_address).await
    }

    pub async fn check_phone(&self, phone: &str) -> Result<ValidationVerdict, FraudSignalError> {
        self.check(CheckKind::Phone, &normalize_phone(phone)).await
    }

    pub async fn check_email(&self, email: &str) -> Result<ValidationVerdict, FraudSignalError> {
        self.check(CheckKind::Email, email).await
    }
}

#[async_trait]
impl FraudSignalProvider for FraudSignalClient {
    async fn validate_all(
        &self,
        ip_address: &str,
        phone: &str,
        email: &str,
    ) -> Result<AggregateFraudResult, FraudSignalError> {
        // All three run to completion before any failure is reported
        let (ip, phone, email) = tokio::join!(
            self.check_ip(ip_address),
            self.check_phone(phone),
            self.check_email(email),
        );

        Ok(AggregateFraudResult::new(ip?, phone?, email?))
    }
}
