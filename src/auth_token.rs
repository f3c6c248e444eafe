use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum AuthTokenError {
    #[error("auth token secret is too short (min {MIN_SECRET_LEN} bytes)")]
    SecretTooShort,

    #[error("invalid auth token format")]
    InvalidFormat,

    #[error("auth token signature is invalid")]
    InvalidSignature,

    #[error("auth token is expired")]
    Expired,

    #[error("failed to decode auth token payload")]
    PayloadDecode,

    #[error("failed to parse auth token payload")]
    PayloadParse,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthSessionClaims {
    pub admin_id: String,
    pub username: String,
    pub session_id: String,
    pub issued_at_ms: u64,
    pub expires_at_ms: u64,
}

impl AuthSessionClaims {
    pub fn is_expired(&self, reference_ms: u64) -> bool {
        reference_ms >= self.expires_at_ms
    }
}

/// Issues and verifies HMAC-SHA256 signed session tokens. The token carries
/// the admin identity alongside the cookie session id so non-browser clients
/// can authenticate programmatically.
#[derive(Clone)]
pub struct AuthTokenService {
    secret: Arc<[u8]>,
    ttl: Duration,
}

impl AuthTokenService {
    pub fn new(secret: Vec<u8>, ttl: Duration) -> Result<Self, AuthTokenError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(AuthTokenError::SecretTooShort);
        }

        Ok(Self {
            secret: Arc::<[u8]>::from(secret),
            ttl,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue_session_token(
        &self,
        admin_id: String,
        username: String,
        session_id: String,
        issued_at_ms: u64,
    ) -> Result<String, AuthTokenError> {
        let expires_at_ms = issued_at_ms.saturating_add(self.ttl.as_millis() as u64);
        let claims = AuthSessionClaims {
            admin_id,
            username,
            session_id,
            issued_at_ms,
            expires_at_ms,
        };
        self.issue(&claims)
    }

    pub fn issue(&self, claims: &AuthSessionClaims) -> Result<String, AuthTokenError> {
        let payload = serde_json::to_vec(claims).map_err(|_| AuthTokenError::PayloadParse)?;
        let payload_b64 = URL_SAFE_NO_PAD.encode(payload);
        let signature = self.sign(payload_b64.as_bytes())?;
        let signature_b64 = URL_SAFE_NO_PAD.encode(signature);
        Ok(format!("{payload_b64}.{signature_b64}"))
    }

    pub fn verify(
        &self,
        token: &str,
        reference_ms: u64,
    ) -> Result<AuthSessionClaims, AuthTokenError> {
        let (payload_b64, signature_b64) =
            token.split_once('.').ok_or(AuthTokenError::InvalidFormat)?;

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| AuthTokenError::InvalidFormat)?;

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|_| AuthTokenError::InvalidSignature)?;
        mac.update(payload_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AuthTokenError::InvalidSignature)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| AuthTokenError::PayloadDecode)?;

        let claims: AuthSessionClaims =
            serde_json::from_slice(&payload).map_err(|_| AuthTokenError::PayloadParse)?;

        if claims.session_id.is_empty() || claims.is_expired(reference_ms) {
            return Err(AuthTokenError::Expired);
        }

        Ok(claims)
    }

    fn sign(&self, bytes: &[u8]) -> Result<Vec<u8>, AuthTokenError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|_| AuthTokenError::InvalidSignature)?;
        mac.update(bytes);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> AuthTokenService {
        AuthTokenService::new(
            b"01234567890123456789012345678901".to_vec(),
            Duration::from_secs(30),
        )
        .expect("valid service")
    }

    #[test]
    fn issue_and_verify_roundtrip() {
        let service = test_service();
        let token = service
            .issue_session_token(
                "64f000000000000000000001".to_string(),
                "admin".to_string(),
                "session-1".to_string(),
                1_000,
            )
            .expect("issue token");

        let claims = service.verify(&token, 1_500).expect("verify token");
        assert_eq!(claims.username, "admin");
        assert_eq!(claims.session_id, "session-1");
    }

    #[test]
    fn rejects_tampered_token() {
        let service = test_service();
        let token = service
            .issue_session_token("id".to_string(), "admin".to_string(), "s".to_string(), 10)
            .expect("issue token");
        let (payload, signature) = token.split_once('.').expect("token split");
        let mut chars: Vec<char> = payload.chars().collect();
        chars[0] = if chars[0] == 'A' { 'B' } else { 'A' };
        let tampered_payload: String = chars.into_iter().collect();
        let tampered = format!("{tampered_payload}.{signature}");

        assert!(matches!(
            service.verify(&tampered, 20),
            Err(AuthTokenError::InvalidSignature)
        ));
    }

    #[test]
    fn rejects_expired_token() {
        let service = test_service();
        let token = service
            .issue_session_token(
                "id".to_string(),
                "admin".to_string(),
                "s".to_string(),
                1_000,
            )
            .expect("issue token");

        assert!(matches!(
            service.verify(&token, 35_000),
            Err(AuthTokenError::Expired)
        ));
    }

    #[test]
    fn rejects_short_secret() {
        assert!(matches!(
            AuthTokenService::new(b"short".to_vec(), Duration::from_secs(30)),
            Err(AuthTokenError::SecretTooShort)
        ));
    }
}
