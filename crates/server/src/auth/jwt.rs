use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use super::Claims;
use crate::error::AppError;

#[derive(Clone)]
pub struct JwtKeys {
    pub enc: EncodingKey,
    pub dec: DecodingKey,
}

impl JwtKeys {
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            enc: EncodingKey::from_secret(secret),
            dec: DecodingKey::from_secret(secret),
        }
    }
}

pub fn encode_token(keys: &JwtKeys, claims: &Claims) -> Result<String, AppError> {
    let mut header = Header::new(Algorithm::HS256);
    header.typ = Some("JWT".into());

    encode(&header, claims, &keys.enc)
        .map_err(|err| AppError::internal(format!("Token encoding failed: {err}")))
}

/// Verifies signature and, when `check_exp` is set, expiry with no leeway.
pub fn decode_token(
    keys: &JwtKeys,
    token: &str,
    check_exp: bool,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.validate_exp = check_exp;
    if !check_exp {
        validation.required_spec_claims.remove("exp");
    }
    decode::<Claims>(token, &keys.dec, &validation).map(|data| data.claims)
}

pub fn make_access_claims(
    admin_id: Uuid,
    email: &str,
    roles: Vec<String>,
    session_id: Uuid,
    ttl_secs: i64,
) -> Claims {
    let iat = Utc::now().timestamp();
    Claims {
        sub: admin_id.to_string(),
        email: email.to_string(),
        role: roles.first().cloned().unwrap_or_default(),
        roles,
        sid: session_id.to_string(),
        iat,
        exp: iat + ttl_secs,
    }
}
