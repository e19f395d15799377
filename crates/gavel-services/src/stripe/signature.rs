//! Stripe webhook signature verification
//!
//! Verifies the `Stripe-Signature` header: HMAC-SHA256 over
//! `"{timestamp}.{payload}"` with the endpoint secret, compared in constant
//! time against every `v1` candidate, with a freshness window on the
//! timestamp. An invalid signature rejects the delivery before anything is
//! logged.

use gavel_core::AppError;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

fn invalid(reason: &str) -> AppError {
    AppError::InvalidInput(format!("Invalid Stripe signature: {}", reason))
}

/// Verify a `Stripe-Signature` header against the raw request body.
///
/// `now_unix` is injected so the freshness window is testable with fixed
/// vectors; callers pass the current unix timestamp.
pub fn verify_stripe_signature(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    tolerance_secs: i64,
    now_unix: i64,
) -> Result<(), AppError> {
    if secret.is_empty() {
        return Err(AppError::Configuration(
            "Stripe webhook secret is not configured".to_string(),
        ));
    }

    let mut timestamp: Option<i64> = None;
    let mut candidates: Vec<&str> = Vec::new();

    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = value.parse().ok();
            }
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| invalid("missing timestamp"))?;
    if candidates.is_empty() {
        return Err(invalid("missing v1 signature"));
    }

    if (now_unix - timestamp).abs() > tolerance_secs {
        return Err(invalid("timestamp outside tolerance"));
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::Configuration("Invalid webhook secret".to_string()))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = mac.finalize().into_bytes();

    for candidate in candidates {
        if let Ok(candidate_bytes) = hex::decode(candidate) {
            if candidate_bytes.ct_eq(expected.as_slice()).into() {
                return Ok(());
            }
        }
    }

    Err(invalid("no matching v1 signature"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const TOLERANCE: i64 = 300;

    fn sign(payload: &[u8], timestamp: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_valid_signature_passes() {
        let payload = br#"{"id":"evt_1","type":"payment_intent.succeeded"}"#;
        let now = 1_700_000_000;
        let header = format!("t={},v1={}", now, sign(payload, now));
        assert!(verify_stripe_signature(payload, &header, SECRET, TOLERANCE, now).is_ok());
    }

    #[test]
    fn test_tampered_payload_fails() {
        let payload = br#"{"id":"evt_1"}"#;
        let now = 1_700_000_000;
        let header = format!("t={},v1={}", now, sign(payload, now));
        assert!(
            verify_stripe_signature(br#"{"id":"evt_2"}"#, &header, SECRET, TOLERANCE, now).is_err()
        );
    }

    #[test]
    fn test_wrong_secret_fails() {
        let payload = b"payload";
        let now = 1_700_000_000;
        let header = format!("t={},v1={}", now, sign(payload, now));
        assert!(verify_stripe_signature(payload, &header, "whsec_other", TOLERANCE, now).is_err());
    }

    #[test]
    fn test_stale_timestamp_fails() {
        let payload = b"payload";
        let signed_at = 1_700_000_000;
        let header = format!("t={},v1={}", signed_at, sign(payload, signed_at));
        let now = signed_at + TOLERANCE + 1;
        assert!(verify_stripe_signature(payload, &header, SECRET, TOLERANCE, now).is_err());
    }

    #[test]
    fn test_second_v1_candidate_accepted() {
        // Stripe sends multiple v1 entries during secret rotation.
        let payload = b"payload";
        let now = 1_700_000_000;
        let header = format!("t={},v1={},v1={}", now, "00".repeat(32), sign(payload, now));
        assert!(verify_stripe_signature(payload, &header, SECRET, TOLERANCE, now).is_ok());
    }

    #[test]
    fn test_missing_parts_fail() {
        let payload = b"payload";
        let now = 1_700_000_000;
        assert!(verify_stripe_signature(payload, "v1=abcd", SECRET, TOLERANCE, now).is_err());
        assert!(verify_stripe_signature(payload, "t=123", SECRET, TOLERANCE, now).is_err());
        assert!(verify_stripe_signature(payload, "", SECRET, TOLERANCE, now).is_err());
    }
}
