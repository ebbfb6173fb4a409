//! Payload and provider-response builders

use leadgate_common::LeadPayload;
use serde_json::{json, Value};

pub fn lead_payload(phone: &str, email: &str) -> LeadPayload {
    LeadPayload::from_value(json!({
        "email": email,
        "phone": phone,
        "ip_address": "203.0.113.7",
        "trusted_form_cert_id": "0123456789abcdef",
        "first_name": "Ada",
        "utm_source": "newsletter",
    }))
}

pub fn clean_ip() -> Value {
    json!({
        "success": true, "fraud_score": 10, "proxy": false, "vpn": false, "tor": false,
        "active_vpn": false, "active_tor": false, "recent_abuse": false, "bot_status": false
    })
}

pub fn clean_phone() -> Value {
    json!({
        "success": true, "valid": true, "fraud_score": 10, "recent_abuse": false,
        "VOIP": false, "risky": false, "active": true, "spammer": false, "do_not_call": false
    })
}

pub fn clean_email() -> Value {
    json!({
        "success": true, "valid": true, "disposable": false, "fraud_score": 10,
        "dns_valid": true, "honeypot": false, "deliverability": "high",
        "frequent_complainer": false, "spam_trap_score": "none", "suspect": false,
        "recent_abuse": false
    })
}

pub fn with(mut base: Value, key: &str, value: Value) -> Value {
    base[key] = value;
    base
}
