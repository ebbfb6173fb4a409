//! Test helper utilities
//!
//! Shared fakes and payload builders for the leadgate-ingest integration tests

#![allow(dead_code)]

pub mod fakes;
pub mod payloads;

pub use fakes::{CountingStore, FakeConsent, FakeFraud};
pub use payloads::{clean_email, clean_ip, clean_phone, lead_payload, with};

use leadgate_ingest::LeadPipeline;
use std::sync::Arc;

/// Pipeline over the given fakes, keeping handles for assertions
pub fn pipeline(
    store: &Arc<CountingStore>,
    fraud: &Arc<FakeFraud>,
    consent: &Arc<FakeConsent>,
) -> LeadPipeline {
    LeadPipeline::new(store.clone(), fraud.clone(), consent.clone())
}
