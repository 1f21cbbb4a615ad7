//! Billing webhook signature verification.
//!
//! HMAC-SHA256 over `"{timestamp}.{body}"` with constant-time comparison
//! and a freshness window to reject replayed deliveries.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::errors::WebhookError;
use super::event::BillingEvent;

/// Maximum allowed age for webhook deliveries (5 minutes).
const MAX_EVENT_AGE_SECS: i64 = 300;

/// Maximum tolerated clock skew for timestamps from the future (1 minute).
const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// Parsed components of the signature header.
///
/// Format: `t=<unix seconds>,v1=<hex hmac>`. Unknown keys are ignored for
/// forward compatibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub v1_signature: Vec<u8>,
}

impl SignatureHeader {
    pub fn parse(header: &str) -> Result<Self, WebhookError> {
        let mut timestamp: Option<i64> = None;
        let mut v1_signature: Option<Vec<u8>> = None;

        for part in header.split(',') {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| WebhookError::ParseError("invalid header format".to_string()))?;

            match key {
                "t" => {
                    timestamp = Some(value.parse().map_err(|_| {
                        WebhookError::ParseError("invalid timestamp".to_string())
                    })?);
                }
                "v1" => {
                    v1_signature = Some(hex::decode(value).map_err(|_| {
                        WebhookError::ParseError("invalid v1 signature hex".to_string())
                    })?);
                }
                _ => {}
            }
        }

        let timestamp =
            timestamp.ok_or_else(|| WebhookError::ParseError("missing timestamp".to_string()))?;
        let v1_signature = v1_signature
            .ok_or_else(|| WebhookError::ParseError("missing v1 signature".to_string()))?;

        Ok(SignatureHeader {
            timestamp,
            v1_signature,
        })
    }
}

/// Verifier for billing provider webhook signatures.
pub struct WebhookVerifier {
    secret: String,
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Verifies the delivery signature and parses the event envelope.
    ///
    /// # Errors
    ///
    /// - `InvalidSignature` - HMAC mismatch
    /// - `TimestampOutOfRange` - delivery older than the freshness window
    /// - `InvalidTimestamp` - timestamp too far in the future
    /// - `ParseError` - malformed header or JSON body
    pub fn verify_and_parse(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<BillingEvent, WebhookError> {
        let header = SignatureHeader::parse(signature_header)?;

        self.validate_timestamp(header.timestamp)?;

        let expected = self.compute_signature(header.timestamp, payload);
        if !constant_time_compare(&expected, &header.v1_signature) {
            return Err(WebhookError::InvalidSignature);
        }

        let event: BillingEvent = serde_json::from_slice(payload)
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;

        Ok(event)
    }

    fn validate_timestamp(&self, timestamp: i64) -> Result<(), WebhookError> {
        let now = chrono::Utc::now().timestamp();
        let age = now - timestamp;

        if age > MAX_EVENT_AGE_SECS {
            return Err(WebhookError::TimestampOutOfRange);
        }
        if age < -MAX_CLOCK_SKEW_SECS {
            return Err(WebhookError::InvalidTimestamp);
        }

        Ok(())
    }

    fn compute_signature(&self, timestamp: i64, payload: &[u8]) -> Vec<u8> {
        let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));

        let mut mac =
            Hmac::<Sha256>::new_from_slice(self.secret.as_bytes()).expect("HMAC accepts any key");
        mac.update(signed_payload.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

/// Constant-time byte comparison to avoid leaking signature prefixes
/// through timing.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Computes a valid signature header value for test fixtures.
#[cfg(test)]
pub fn sign_for_test(secret: &str, timestamp: i64, payload: &str) -> String {
    let signed_payload = format!("{}.{}", timestamp, payload);
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key");
    mac.update(signed_payload.as_bytes());
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}
