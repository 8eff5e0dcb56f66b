use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Hex-encoded HMAC-SHA256 of `payload` under `secret`.
pub fn sign_payload(secret: &str, payload: &[u8]) -> Result<String, anyhow::Error> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow::anyhow!("Invalid key length: {}", e))?;
    mac.update(payload);

    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of a hex signature against `payload`.
pub fn verify_payload(secret: &str, payload: &[u8], signature: &str) -> bool {
    let Ok(expected) = sign_payload(secret, payload) else {
        return false;
    };

    let expected_bytes = expected.as_bytes();
    let signature_bytes = signature.trim().as_bytes();

    if expected_bytes.len() != signature_bytes.len() {
        return false;
    }

    expected_bytes.ct_eq(signature_bytes).into()
}
