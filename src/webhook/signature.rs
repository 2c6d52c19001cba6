use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Check a delivery against the configured webhook secret.
///
/// Without a secret every delivery is accepted. With one, the
/// `X-Hub-Signature-256` header must be present and match.
pub fn verify_delivery(
    secret: Option<&str>,
    payload: &[u8],
    signature_header: Option<&str>,
) -> Result<()> {
    let Some(secret) = secret else {
        return Ok(());
    };

    let header = signature_header.ok_or_else(|| {
        AppError::WebhookVerification("Missing X-Hub-Signature-256 header".to_string())
    })?;
    verify_signature(secret, payload, header)
}

/// Verify a `sha256=<hex>` HMAC-SHA256 signature of `payload`.
pub fn verify_signature(secret: &str, payload: &[u8], signature_header: &str) -> Result<()> {
    let signature_hex = signature_header
        .strip_prefix("sha256=")
        .ok_or_else(|| AppError::WebhookVerification("Missing sha256= prefix".to_string()))?;

    let signature = hex::decode(signature_hex)
        .map_err(|e| AppError::WebhookVerification(format!("Invalid hex in signature: {e}")))?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::WebhookVerification(format!("Invalid HMAC key: {e}")))?;
    mac.update(payload);

    mac.verify_slice(&signature)
        .map_err(|_| AppError::WebhookVerification("Signature mismatch".to_string()))
}

/// `sha256=<hex>` header value for `payload`.
#[cfg(test)]
pub(crate) fn sign(secret: &str, payload: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(payload);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}
