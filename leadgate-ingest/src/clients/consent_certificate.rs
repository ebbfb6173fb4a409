//! Consent certificate client (TrustedForm)
//!
//! `GET {base}/{cert_id}/validate?match_lead[phone]=...` with HTTP Basic
//! credentials. Success and many error bodies share the `{outcome, reason}`
//! shape; when an error response carries that shape it is the provider's own
//! verdict and is returned as `Ok`.

use async_trait::async_trait;
use leadgate_common::ConsentResult;
use serde_json::Value;
use thiserror::Error;

use super::{normalize_phone, provider_url, ConsentProvider, REQUEST_TIMEOUT, USER_AGENT};

/// Failures to obtain a consent verdict
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsentError {
    #[error("TrustedForm certificate not found. The certificate ID '{cert_id}' is invalid, malformed, or does not exist.")]
    NotFound { cert_id: String },

    #[error("TrustedForm authentication failed. Invalid API credentials.")]
    AuthFailure,

    #[error("TrustedForm access forbidden. Check API permissions.")]
    Forbidden,

    #[error("TrustedForm bad request. Invalid request parameters or malformed certificate ID.")]
    BadRequest,

    #[error("TrustedForm service error. The TrustedForm API is currently unavailable.")]
    ProviderUnavailable,

    #[error("TrustedForm validation failed: {status} - {message}")]
    Unknown { status: u16, message: String },
}

/// Parse a body as `{outcome, reason}` when both are non-empty strings
fn recognizable_verdict(body: &str) -> Option<ConsentResult> {
    let value: Value = serde_json::from_str(body).ok()?;
    let outcome = value.get("outcome")?.as_str().filter(|s| !s.is_empty())?;
    let reason = value.get("reason")?.as_str().filter(|s| !s.is_empty())?;
    Some(ConsentResult::new(outcome, reason))
}

/// Map a non-success response to a verdict or a classified error
pub fn classify_error_response(
    status: u16,
    body: &str,
    cert_id: &str,
) -> Result<ConsentResult, ConsentError> {
    if let Some(verdict) = recognizable_verdict(body) {
        return Ok(verdict);
    }

    Err(match status {
        404 => ConsentError::NotFound {
            cert_id: cert_id.to_string(),
        },
        401 => ConsentError::AuthFailure,
        403 => ConsentError::Forbidden,
        400 => ConsentError::BadRequest,
        500..=u16::MAX => ConsentError::ProviderUnavailable,
        _ => ConsentError::Unknown {
            status,
            message: reqwest::StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("unexpected response")
                .to_string(),
        },
    })
}

/// TrustedForm API client
pub struct ConsentCertificateClient {
    http_client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl ConsentCertificateClient {
    pub fn new(
        username: String,
        password: String,
        base_url: String,
    ) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http_client,
            base_url,
            username,
            password,
        })
    }

    pub fn is_configured(&self) -> bool {
        !self.password.is_empty()
    }
}

#[async_trait]
impl ConsentProvider for ConsentCertificateClient {
    async fn validate(
        &self,
        cert_id: Option<&str>,
        phone: &str,
    ) -> Result<ConsentResult, ConsentError> {
        let Some(cert_id) = cert_id.filter(|id| !id.is_empty()) else {
            tracing::warn!("No consent certificate id supplied");
            return Err(ConsentError::BadRequest);
        };

        let url = provider_url(&self.base_url, &[cert_id, "validate"]).map_err(|message| {
            tracing::error!(error = %message, "Consent provider URL is misconfigured");
            ConsentError::BadRequest
        })?;

        tracing::debug!(cert_id = %cert_id, "Validating consent certificate");

        let response = self
            .http_client
            .get(url)
            .basic_auth(&self.username, Some(&self.password))
            .query(&[("match_lead[phone]", normalize_phone(phone))])
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(cert_id = %cert_id, error = %e, "Consent provider unreachable");
                ConsentError::ProviderUnavailable
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.is_success() {
            return serde_json::from_str::<ConsentResult>(&body).map_err(|e| {
                tracing::warn!(cert_id = %cert_id, error = %e, "Unexpected consent provider body");
                ConsentError::Unknown {
                    status: status.as_u16(),
                    message: "unexpected response body".to_string(),
                }
            });
        }

        tracing::warn!(
            cert_id = %cert_id,
            status = status.as_u16(),
            "Consent provider returned an error response"
        );
        classify_error_response(status.as_u16(), &body, cert_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_with_verdict_shape_is_a_verdict() {
        let body = r#"{"outcome":"failure","reason":"Phone number does not match"}"#;
        let result = classify_error_response(422, body, "abc").unwrap();
        assert_eq!(
            result,
            ConsentResult::new("failure", "Phone number does not match")
        );
        assert!(!result.is_success());
    }

    #[test]
    fn test_status_taxonomy() {
        let classify = |status| classify_error_response(status, "", "abc");

        assert_eq!(
            classify(404),
            Err(ConsentError::NotFound {
                cert_id: "abc".to_string()
            })
        );
        assert_eq!(classify(401), Err(ConsentError::AuthFailure));
        assert_eq!(classify(403), Err(ConsentError::Forbidden));
        assert_eq!(classify(400), Err(ConsentError::BadRequest));
        assert_eq!(
            classify_error_response(503, "<html>down</html>", "abc"),
            Err(ConsentError::ProviderUnavailable)
        );
        assert_eq!(
            classify_error_response(429, "slow down", "abc"),
            Err(ConsentError::Unknown {
                status: 429,
                message: "Too Many Requests".to_string()
            })
        );
    }

    #[test]
    fn test_partial_verdict_shape_is_not_recognized() {
        // outcome without reason is not the provider's verdict shape
        let body = r#"{"outcome":"failure"}"#;
        let result = classify_error_response(403, body, "abc");
        assert_eq!(result, Err(ConsentError::Forbidden));

        let body = r#"{"outcome":"","reason":"x"}"#;
        let result = classify_error_response(400, body, "abc");
        assert_eq!(result, Err(ConsentError::BadRequest));
    }

    #[test]
    fn test_error_messages_are_human_readable() {
        let err = ConsentError::NotFound {
            cert_id: "xyz".to_string(),
        };
        assert!(err.to_string().contains("'xyz'"));

        let err = ConsentError::Unknown {
            status: 418,
            message: "I'm a teapot".into(),
        };
        assert_eq!(
            err.to_string(),
            "TrustedForm validation failed: 418 - I'm a teapot"
        );
    }

    #[tokio::test]
    async fn test_missing_certificate_id_fails_without_a_call() {
        // Unroutable base URL: any request would error as unavailable
        let client = ConsentCertificateClient::new(
            "API".to_string(),
            "secret".to_string(),
            "http://127.0.0.1:9".to_string(),
        )
        .unwrap();

        let missing = client.validate(None, "5551234567").await;
        assert_eq!(missing, Err(ConsentError::BadRequest));

        let empty = client.validate(Some(""), "5551234567").await;
        assert_eq!(empty, Err(ConsentError::BadRequest));
    }
}
