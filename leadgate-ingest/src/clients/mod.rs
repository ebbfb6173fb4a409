//! External validation provider clients
//!
//! Both providers are consumed as black boxes behind async traits so the
//! pipeline can hold `Arc<dyn ...>` and tests can substitute fakes.
//!
//! - [`FraudSignalClient`]: IP / phone / email risk scoring (IPQualityScore)
//! - [`ConsentCertificateClient`]: consent certificate validation (TrustedForm)

pub mod consent_certificate;
pub mod fraud_signal;

pub use consent_certificate::{ConsentCertificateClient, ConsentError};
pub use fraud_signal::{CheckKind, FraudSignalClient, FraudSignalError};

use async_trait::async_trait;
use leadgate_common::{AggregateFraudResult, ConsentResult};
use std::time::Duration;

/// User agent sent to both providers
pub(crate) const USER_AGENT: &str = concat!("leadgate/", env!("CARGO_PKG_VERSION"));

/// Bounded per-request network time; the pipeline adds no timeout of its own
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Risk scoring for the three identity signals of a lead
#[async_trait]
pub trait FraudSignalProvider: Send + Sync {
    /// Run the ip, phone and email sub-checks concurrently.
    ///
    /// Waits for all three to finish. If any provider call failed, that
    /// failure is returned instead of a partial result.
    async fn validate_all(
        &self,
        ip_address: &str,
        phone: &str,
        email: &str,
    ) -> Result<AggregateFraudResult, FraudSignalError>;
}

/// Consent certificate validation against the lead's phone number
#[async_trait]
pub trait ConsentProvider: Send + Sync {
    /// A provider that answers with its own negative verdict returns `Ok`;
    /// only failures to obtain a verdict are `Err`.
    async fn validate(
        &self,
        cert_id: Option<&str>,
        phone: &str,
    ) -> Result<ConsentResult, ConsentError>;
}

/// Normalize a phone number to `+1XXXXXXXXXX` unless it already carries an
/// explicit international prefix.
pub fn normalize_phone(phone: &str) -> String {
    if phone.starts_with('+') {
        phone.to_string()
    } else {
        let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
        format!("+1{}", digits)
    }
}

/// Append raw path segments to a provider base URL, percent-encoding each.
pub(crate) fn provider_url(base_url: &str, segments: &[&str]) -> Result<reqwest::Url, String> {
    let mut url = reqwest::Url::parse(base_url)
        .map_err(|e| format!("invalid base URL {:?}: {}", base_url, e))?;
    url.path_segments_mut()
        .map_err(|_| format!("base URL cannot take a path: {:?}", base_url))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_phone_adds_country_code() {
        assert_eq!(normalize_phone("5551234567"), "+15551234567");
        assert_eq!(normalize_phone("(555) 123-4567"), "+15551234567");
    }

    #[test]
    fn test_normalize_phone_keeps_international_prefix() {
        assert_eq!(normalize_phone("+445551234567"), "+445551234567");
    }

    #[test]
    fn test_provider_url_encodes_segments() {
        let segments = ["email", "key", "a b@c.com"];
        let url = provider_url("https://example.com/api/json/", &segments).unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.com/api/json/email/key/a%20b@c.com"
        );

        let url = provider_url("https://example.com", &["cert/../x", "validate"]).unwrap();
        assert_eq!(url.path(), "/cert%2F..%2Fx/validate");
    }

    #[test]
    fn test_provider_url_rejects_bad_base() {
        assert!(provider_url("not a url", &["ip"]).is_err());
        assert!(provider_url("mailto:someone@example.com", &["ip"]).is_err());
    }
}
