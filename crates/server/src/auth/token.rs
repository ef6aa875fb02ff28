use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::{Rng, RngCore, thread_rng};
use sha2::{Digest, Sha256};

/// 32 random bytes, base64url without padding.
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; 32];
    thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Hex SHA-256 digest; the only form in which tokens and codes are stored.
pub fn digest(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

/// Six decimal digits, zero padded.
pub fn generate_otp_code() -> String {
    format!("{:06}", thread_rng().gen_range(0..1_000_000u32))
}
