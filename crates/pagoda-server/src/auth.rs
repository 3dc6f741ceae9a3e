//! Admin session tokens: a base64url JSON payload carrying an expiry,
//! signed with HMAC-SHA256. Stateless — validity is the signature plus
//! the clock, so there is nothing to store or revoke server-side.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

const TOKEN_VERSION_V1: &str = "v1";
const MAX_TOKEN_LEN: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum TokenErrorCode {
    InvalidFormat,
    UnsupportedVersion,
    InvalidSignature,
    InvalidPayload,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenError {
    pub code: TokenErrorCode,
    pub message: String,
}

impl TokenError {
    #[must_use]
    pub fn new(code: TokenErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for TokenError {}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    pub token_version: String,
    pub subject: String,
    pub expires_at: i64,
}

fn mac_for(secret: &[u8]) -> Result<HmacSha256, TokenError> {
    HmacSha256::new_from_slice(secret)
        .map_err(|e| TokenError::new(TokenErrorCode::InvalidPayload, e.to_string()))
}

/// Issues a token for `subject` valid for `ttl` from `now`. Returns
/// the token and its expiry instant.
pub fn issue_session_token(
    secret: &[u8],
    subject: &str,
    now: DateTime<Utc>,
    ttl: Duration,
) -> Result<(String, DateTime<Utc>), TokenError> {
    let expires_at = now + chrono::TimeDelta::seconds(ttl.as_secs() as i64);
    let claims = SessionClaims {
        token_version: TOKEN_VERSION_V1.to_string(),
        subject: subject.to_string(),
        expires_at: expires_at.timestamp(),
    };
    let payload_bytes = serde_json::to_vec(&claims)
        .map_err(|e| TokenError::new(TokenErrorCode::InvalidPayload, e.to_string()))?;
    let payload_part = URL_SAFE_NO_PAD.encode(&payload_bytes);
    let mut mac = mac_for(secret)?;
    mac.update(payload_part.as_bytes());
    let sig_part = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    Ok((format!("{payload_part}.{sig_part}"), expires_at))
}

/// Verifies signature and expiry; the signature check is constant-time
/// via the Mac verifier.
pub fn verify_session_token(
    secret: &[u8],
    token: &str,
    now: DateTime<Utc>,
) -> Result<SessionClaims, TokenError> {
    if token.is_empty() || token.len() > MAX_TOKEN_LEN {
        return Err(TokenError::new(
            TokenErrorCode::InvalidFormat,
            "token length out of bounds",
        ));
    }
    let (payload_part, sig_part) = token.split_once('.').ok_or_else(|| {
        TokenError::new(TokenErrorCode::InvalidFormat, "token must be payload.sig")
    })?;
    let sig = URL_SAFE_NO_PAD
        .decode(sig_part)
        .map_err(|e| TokenError::new(TokenErrorCode::InvalidFormat, e.to_string()))?;
    let mut mac = mac_for(secret)?;
    mac.update(payload_part.as_bytes());
    mac.verify_slice(&sig)
        .map_err(|_| TokenError::new(TokenErrorCode::InvalidSignature, "signature mismatch"))?;
    let payload_bytes = URL_SAFE_NO_PAD
        .decode(payload_part)
        .map_err(|e| TokenError::new(TokenErrorCode::InvalidPayload, e.to_string()))?;
    let claims: SessionClaims = serde_json::from_slice(&payload_bytes)
        .map_err(|e| TokenError::new(TokenErrorCode::InvalidPayload, e.to_string()))?;
    if claims.token_version != TOKEN_VERSION_V1 {
        return Err(TokenError::new(
            TokenErrorCode::UnsupportedVersion,
            format!("unsupported token version {}", claims.token_version),
        ));
    }
    if claims.expires_at <= now.timestamp() {
        return Err(TokenError::new(TokenErrorCode::Expired, "session expired"));
    }
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret";

    #[test]
    fn issued_tokens_round_trip() {
        let now = Utc::now();
        let (token, expires_at) =
            issue_session_token(SECRET, "admin", now, Duration::from_secs(60)).expect("issue");
        let claims = verify_session_token(SECRET, &token, now).expect("verify");
        assert_eq!(claims.subject, "admin");
        assert_eq!(claims.expires_at, expires_at.timestamp());
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let now = Utc::now();
        let (token, _) =
            issue_session_token(SECRET, "admin", now, Duration::from_secs(1)).expect("issue");
        let later = now + chrono::TimeDelta::seconds(5);
        let err = verify_session_token(SECRET, &token, later).unwrap_err();
        assert_eq!(err.code, TokenErrorCode::Expired);
    }

    #[test]
    fn tampered_payloads_fail_the_signature() {
        let now = Utc::now();
        let (token, _) =
            issue_session_token(SECRET, "admin", now, Duration::from_secs(60)).expect("issue");
        let (payload, sig) = token.split_once('.').expect("shape");
        let mut forged_payload = payload.to_string();
        forged_payload.push('A');
        let forged = format!("{forged_payload}.{sig}");
        let err = verify_session_token(SECRET, &forged, now).unwrap_err();
        assert_eq!(err.code, TokenErrorCode::InvalidSignature);
    }

    #[test]
    fn wrong_secret_fails() {
        let now = Utc::now();
        let (token, _) =
            issue_session_token(SECRET, "admin", now, Duration::from_secs(60)).expect("issue");
        let err = verify_session_token(b"other-secret", &token, now).unwrap_err();
        assert_eq!(err.code, TokenErrorCode::InvalidSignature);
    }
}
