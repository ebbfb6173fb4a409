//! Lead ingestion pipeline
//!
//! One submission runs through these steps, in order:
//!
//! 1. Required identity fields (email, phone, ip_address) are present
//! 2. No stored lead shares the phone or the email
//! 3. Fraud and consent checks run concurrently; both are awaited
//! 4. The lead record is assembled from the payload and both results
//! 5. The record is written, whatever the validation outcome
//! 6. Only then is the outcome classified as accepted or rejected
//!
//! Steps 1 and 2 reject without writing. From step 3 on, provider failures
//! are absorbed into placeholder results so a record is always written.

mod record;

pub use record::{assemble, LeadIdentity};

use chrono::Utc;
use leadgate_common::{AggregateFraudResult, ConsentResult, LeadPayload, LeadRecord};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::clients::{ConsentProvider, FraudSignalProvider};
use crate::error::{FraudFailure, IngestError};
use crate::store::{LeadIndex, LeadStore, StoreError};

/// Results of the concurrent validation step, placeholders substituted
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    pub fraud: AggregateFraudResult,
    pub consent: ConsentResult,
    /// Set when the consent provider could not be asked at all
    pub consent_error: Option<String>,
}

/// Orchestrates validation and persistence of submitted leads
pub struct LeadPipeline {
    store: Arc<dyn LeadStore>,
    fraud: Arc<dyn FraudSignalProvider>,
    consent: Arc<dyn ConsentProvider>,
}

impl LeadPipeline {
    pub fn new(
        store: Arc<dyn LeadStore>,
        fraud: Arc<dyn FraudSignalProvider>,
        consent: Arc<dyn ConsentProvider>,
    ) -> Self {
        Self {
            store,
            fraud,
            consent,
        }
    }

    /// Validate, persist and classify one submission.
    ///
    /// `Ok` carries the stored record of an accepted lead. Consent and fraud
    /// rejections are returned after the record has been written; their
    /// error carries the stored lead id.
    pub async fn create_lead(&self, payload: LeadPayload) -> Result<LeadRecord, IngestError> {
        let (Some(email), Some(phone), Some(ip_address)) =
            (payload.email(), payload.phone(), payload.ip_address())
        else {
            let fields = payload.missing_required();
            warn!(missing = ?fields, "Lead rejected: missing required fields");
            return Err(IngestError::MissingField { fields });
        };
        let cert_id = payload.trusted_form_cert_id();

        self.check_duplicates(phone, email).await?;

        let validation = self.run_validations(ip_address, phone, email, cert_id).await;

        let identity = LeadIdentity {
            email,
            phone,
            ip_address,
            cert_id,
        };
        let record = assemble(&payload, identity, &validation, Uuid::new_v4(), Utc::now());

        self.store.put(&record).await.map_err(|e| {
            error!(lead_id = %record.id, error = %e, "Failed to store lead");
            IngestError::StoreWriteFailure(e)
        })?;
        info!(
            lead_id = %record.id,
            sellable = record.sellable,
            "Lead stored"
        );

        classify(record, validation, cert_id)
    }

    /// Every stored lead, oldest first
    pub async fn list_leads(&self) -> Result<Vec<LeadRecord>, StoreError> {
        let mut leads = self.store.scan_all().await?;
        leads.sort_by_key(|lead| lead.timestamp);
        debug!(count = leads.len(), "Leads retrieved");
        Ok(leads)
    }

    /// Phone is checked first; the first match wins
    async fn check_duplicates(&self, phone: &str, email: &str) -> Result<(), IngestError> {
        for (index, key) in [(LeadIndex::Phone, phone), (LeadIndex::Email, email)] {
            let matches = self.store.query_by_index(index, key).await.map_err(|e| {
                error!(index = %index, error = %e, "Duplicate lookup failed");
                IngestError::StoreQueryFailure(e)
            })?;

            if !matches.is_empty() {
                warn!(field = index.key_field(), "Lead rejected: duplicate");
                return Err(IngestError::DuplicateLead {
                    field: index.key_field(),
                    value: key.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Fan out to both providers and wait for both, whatever either returns
    async fn run_validations(
        &self,
        ip_address: &str,
        phone: &str,
        email: &str,
        cert_id: Option<&str>,
    ) -> ValidationOutcome {
        let (fraud, consent) = tokio::join!(
            self.fraud.validate_all(ip_address, phone, email),
            self.consent.validate(cert_id, phone),
        );

        let fraud = fraud.unwrap_or_else(|e| {
            warn!(error = %e, "Fraud check failed, recording placeholder verdicts");
            AggregateFraudResult::check_failed()
        });

        let (consent, consent_error) = match consent {
            Ok(result) => (result, None),
            Err(e) => {
                let message = e.to_string();
                warn!(error = %message, "Consent check failed, recording placeholder verdict");
                (
                    ConsentResult::transport_failed(message.clone()),
                    Some(message),
                )
            }
        };

        ValidationOutcome {
            fraud,
            consent,
            consent_error,
        }
    }
}

/// Map a stored record's validation outcome to acceptance or rejection.
///
/// Checked in order: consent provider unreachable, consent rejected, fraud
/// rejected. The first that applies decides.
fn classify(
    record: LeadRecord,
    validation: ValidationOutcome,
    cert_id: Option<&str>,
) -> Result<LeadRecord, IngestError> {
    let lead_id = record.id;

    if let Some(message) = validation.consent_error {
        return Err(IngestError::ConsentCheckError {
            lead_id,
            message,
            cert_id: cert_id.map(str::to_string),
        });
    }

    if !validation.consent.is_success() {
        info!(
            lead_id = %lead_id,
            outcome = %validation.consent.outcome,
            "Lead rejected by consent check"
        );
        return Err(IngestError::ConsentRejected {
            lead_id,
            outcome: validation.consent.outcome,
            reason: validation.consent.reason,
        });
    }

    if !validation.fraud.validated {
        let failures: Vec<FraudFailure> = validation
            .fraud
            .failed_checks()
            .into_iter()
            .map(|(check, verdict)| FraudFailure {
                check,
                reasons: verdict.reasons.clone(),
            })
            .collect();
        info!(lead_id = %lead_id, failed = failures.len(), "Lead rejected by fraud check");
        return Err(IngestError::FraudRejected { lead_id, failures });
    }

    info!(lead_id = %lead_id, "Lead accepted");
    Ok(record)
}
