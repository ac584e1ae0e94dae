//! Slack request signature verification.
//!
//! See: <https://api.slack.com/authentication/verifying-requests-from-slack>

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use tracing::debug;

use super::error::SlackError;
use crate::middleware::constant_time_eq;

/// Header carrying the request timestamp.
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";

/// Header carrying the `v0=` signature.
pub const SIGNATURE_HEADER: &str = "x-slack-signature";

/// Maximum clock skew accepted, in seconds.
const MAX_SKEW_SECS: u64 = 300;

/// Verifies `X-Slack-Signature` against the app signing secret.
#[derive(Clone)]
pub struct SignatureVerifier {
    signing_secret: SecretString,
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("signing_secret", &"[REDACTED]")
            .finish()
    }
}

impl SignatureVerifier {
    /// Create a verifier for the given signing secret.
    #[must_use]
    pub const fn new(signing_secret: SecretString) -> Self {
        Self { signing_secret }
    }

    /// Verify a request against the current time.
    ///
    /// # Errors
    ///
    /// Returns [`SlackError::InvalidSignature`] if the timestamp is stale or
    /// the signature does not match.
    pub fn verify(&self, timestamp: &str, body: &str, signature: &str) -> Result<(), SlackError> {
        let now_secs = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|e| SlackError::InvalidSignature(e.to_string()))?
            .as_secs();

        let now = i64::try_from(now_secs)
            .map_err(|_| SlackError::InvalidSignature("System time overflow".to_string()))?;

        self.verify_at(now, timestamp, body, signature)
    }

    /// Verify a request against an explicit clock reading (unix seconds).
    ///
    /// # Errors
    ///
    /// Same as [`SignatureVerifier::verify`].
    pub fn verify_at(
        &self,
        now: i64,
        timestamp: &str,
        body: &str,
        signature: &str,
    ) -> Result<(), SlackError> {
        let ts: i64 = timestamp
            .trim()
            .parse()
            .map_err(|_| SlackError::InvalidSignature("Invalid timestamp".to_string()))?;

        if now.abs_diff(ts) > MAX_SKEW_SECS {
            return Err(SlackError::InvalidSignature(
                "Request timestamp too old".to_string(),
            ));
        }

        let expected = self.sign(timestamp.trim(), body)?;
        if !constant_time_eq(&expected, signature) {
            return Err(SlackError::InvalidSignature(
                "Signature mismatch".to_string(),
            ));
        }

        debug!("Slack signature verified");
        Ok(())
    }

    /// Compute the `v0=` signature for a timestamp and body.
    ///
    /// # Errors
    ///
    /// Returns error if the HMAC cannot be keyed.
    pub fn sign(&self, timestamp: &str, body: &str) -> Result<String, SlackError> {
        let mut mac =
            Hmac::<Sha256>::new_from_slice(self.signing_secret.expose_secret().as_bytes())
                .map_err(|e| SlackError::InvalidSignature(e.to_string()))?;
        mac.update(format!("v0:{timestamp}:{body}").as_bytes());
        Ok(format!("v0={}", hex::encode(mac.finalize().into_bytes())))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn verifier() -> SignatureVerifier {
        SignatureVerifier::new(SecretString::from("8f742231b10e8888abcd99yyyzzz85a5"))
    }

    #[test]
    fn test_valid_signature() {
        let verifier = verifier();
        let body = "payload=%7B%22type%22%3A%22block_actions%22%7D";
        let signature = verifier.sign("1700000000", body).unwrap();
        assert!(signature.starts_with("v0="));
        assert!(verifier.verify_at(NOW, "1700000000", body, &signature).is_ok());
    }

    #[test]
    fn test_signature_mismatch() {
        let result = verifier().verify_at(NOW, "1700000000", "body", "v0=invalid_signature_hash");
        assert!(matches!(result, Err(SlackError::InvalidSignature(_))));
    }

    #[test]
    fn test_tampered_body() {
        let verifier = verifier();
        let signature = verifier.sign("1700000000", "text=a").unwrap();
        assert!(
            verifier
                .verify_at(NOW, "1700000000", "text=b", &signature)
                .is_err()
        );
    }

    #[test]
    fn test_invalid_timestamp() {
        let result = verifier().verify_at(NOW, "not-a-number", "body", "v0=sig");
        assert!(matches!(result, Err(SlackError::InvalidSignature(_))));
    }

    #[test]
    fn test_stale_timestamp() {
        let verifier = verifier();
        let old = (NOW - 301).to_string();
        let signature = verifier.sign(&old, "body").unwrap();
        let result = verifier.verify_at(NOW, &old, "body", &signature);
        assert!(matches!(result, Err(SlackError::InvalidSignature(ref msg)) if msg.contains("too old")));
    }

    #[test]
    fn test_extreme_timestamps_rejected() {
        let verifier = verifier();
        for ts in [i64::MIN, i64::MAX, NOW + i64::MIN] {
            let result = verifier.verify_at(NOW, &ts.to_string(), "body", "v0=sig");
            assert!(
                matches!(result, Err(SlackError::InvalidSignature(ref msg)) if msg.contains("too old")),
                "timestamp {ts} accepted"
            );
        }
    }

    #[test]
    fn test_verify_uses_wall_clock() {
        let verifier = verifier();
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs()
            .to_string();
        let signature = verifier.sign(&now, "body").unwrap();
        assert!(verifier.verify(&now, "body", &signature).is_ok());
    }
}
