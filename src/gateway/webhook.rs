//! Processor webhook authentication and payload parsing.
//!
//! The signature header has the form `t=<unix seconds>,v1=<hex>[,v1=<hex>...]`
//! where each `v1` is HMAC-SHA256 over `"<t>." + raw body` keyed by the
//! webhook secret.

use std::collections::HashMap;

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing timestamp in signature header")]
    MissingTimestamp,

    #[error("missing v1 signature in signature header")]
    MissingSignature,

    #[error("signature timestamp outside tolerance")]
    Expired,

    #[error("signature mismatch")]
    Mismatch,
}

pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), SignatureError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MissingTimestamp)?;
    if signatures.is_empty() {
        return Err(SignatureError::MissingSignature);
    }
    if (now - timestamp).abs() > tolerance_secs {
        return Err(SignatureError::Expired);
    }

    let matched = signatures.iter().any(|candidate| {
        let Ok(expected) = hex::decode(candidate) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
            return false;
        };
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac.verify_slice(&expected).is_ok()
    });

    if matched {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Build a header value the way the processor does; used by fakes and tests.
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!(
        "t={timestamp},v1={}",
        hex::encode(mac.finalize().into_bytes())
    )
}

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct CheckoutSessionObject {
    id: Option<String>,
    amount_total: Option<i64>,
    payment_intent: Option<String>,
    #[serde(default)]
    metadata: Option<HashMap<String, String>>,
}

/// What a completed checkout tells us about the order it paid for.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedCheckout {
    pub order_id: Uuid,
    pub user_id: Uuid,
    /// Minor units as reported by the processor.
    pub amount_paid: i64,
    pub external_payment_id: Option<String>,
}

impl WebhookEvent {
    pub fn parse(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    /// `None` when the event is not a completed checkout or lacks usable metadata.
    pub fn completed_checkout(&self) -> Option<CompletedCheckout> {
        if self.event_type != CHECKOUT_COMPLETED {
            return None;
        }
        let session: CheckoutSessionObject =
            serde_json::from_value(self.data.object.clone()).ok()?;
        let metadata = session.metadata.unwrap_or_default();
        let order_id = metadata.get("order_id")?.parse::<Uuid>().ok()?;
        let user_id = metadata.get("user_id")?.parse::<Uuid>().ok()?;

        Some(CompletedCheckout {
            order_id,
            user_id,
            amount_paid: session.amount_total.unwrap_or(0),
            external_payment_id: session.payment_intent.or(session.id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";
    const NOW: i64 = 1_700_000_000;

    #[test]
    fn signature_from_processor_verifies() {
        let body = br#"{"type":"checkout.session.completed"}"#;
        let header = sign_payload(body, SECRET, NOW);
        assert_eq!(verify_signature(body, &header, SECRET, 300, NOW + 10), Ok(()));
    }

    #[test]
    fn tampered_body_or_wrong_secret_is_rejected() {
        let body = br#"{"amount_total":999}"#;
        let header = sign_payload(body, SECRET, NOW);
        assert_eq!(
            verify_signature(br#"{"amount_total":1}"#, &header, SECRET, 300, NOW),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            verify_signature(body, &header, "whsec_other", 300, NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let body = b"{}";
        let header = sign_payload(body, SECRET, NOW);
        assert_eq!(
            verify_signature(body, &header, SECRET, 300, NOW + 301),
            Err(SignatureError::Expired)
        );
    }

    #[test]
    fn malformed_headers_are_rejected() {
        assert_eq!(
            verify_signature(b"{}", "v1=abcd", SECRET, 300, NOW),
            Err(SignatureError::MissingTimestamp)
        );
        assert_eq!(
            verify_signature(b"{}", &format!("t={NOW}"), SECRET, 300, NOW),
            Err(SignatureError::MissingSignature)
        );
        assert_eq!(
            verify_signature(b"{}", &format!("t={NOW},v1=not-hex"), SECRET, 300, NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn any_matching_v1_entry_is_accepted() {
        let body = b"{}";
        let good = sign_payload(body, SECRET, NOW);
        let good_sig = good.split_once(",v1=").map(|(_, s)| s).unwrap();
        let header = format!("t={NOW},v1={},v1={good_sig}", "00".repeat(32));
        assert_eq!(verify_signature(body, &header, SECRET, 300, NOW), Ok(()));
    }

    #[test]
    fn completed_checkout_reads_metadata_and_amount() {
        let order_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let body = serde_json::json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": { "object": {
                "id": "cs_test_1",
                "amount_total": 999,
                "payment_intent": "pi_123",
                "metadata": { "order_id": order_id.to_string(), "user_id": user_id.to_string() }
            }}
        });
        let event = WebhookEvent::parse(body.to_string().as_bytes()).unwrap();
        let completed = event.completed_checkout().unwrap();

        assert_eq!(completed.order_id, order_id);
        assert_eq!(completed.user_id, user_id);
        assert_eq!(completed.amount_paid, 999);
        assert_eq!(completed.external_payment_id.as_deref(), Some("pi_123"));
    }

    #[test]
    fn session_id_is_the_fallback_reference() {
        let body = serde_json::json!({
            "type": "checkout.session.completed",
            "data": { "object": {
                "id": "cs_test_2",
                "amount_total": 500,
                "payment_intent": null,
                "metadata": {
                    "order_id": Uuid::new_v4().to_string(),
                    "user_id": Uuid::new_v4().to_string()
                }
            }}
        });
        let event = WebhookEvent::parse(body.to_string().as_bytes()).unwrap();
        assert_eq!(
            event.completed_checkout().unwrap().external_payment_id.as_deref(),
            Some("cs_test_2")
        );
    }

    #[test]
    fn other_events_and_missing_metadata_are_not_checkouts() {
        let other = serde_json::json!({
            "type": "payment_intent.created",
            "data": { "object": {} }
        });
        let event = WebhookEvent::parse(other.to_string().as_bytes()).unwrap();
        assert!(event.completed_checkout().is_none());

        let no_meta = serde_json::json!({
            "type": "checkout.session.completed",
            "data": { "object": { "id": "cs_1", "amount_total": 100 } }
        });
        let event = WebhookEvent::parse(no_meta.to_string().as_bytes()).unwrap();
        assert!(event.completed_checkout().is_none());
    }
}
