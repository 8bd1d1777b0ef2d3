use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use crate::{config::JwtConfig, state::AppState};

use super::claims::{Claims, TokenPurpose};

/// Why a token was rejected. Callers must collapse both variants into one
/// generic unauthenticated response; the split exists for logs and tests.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("malformed token")]
    Malformed,
}

#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub reset_ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig {
            secret,
            issuer,
            audience,
            access_ttl_minutes,
            reset_ttl_minutes,
        } = state.config.jwt.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            audience,
            access_ttl: Duration::from_secs((access_ttl_minutes as u64) * 60),
            reset_ttl: Duration::from_secs((reset_ttl_minutes as u64) * 60),
        }
    }
}

impl JwtKeys {
    fn sign_with_purpose(
        &self,
        email: &str,
        purpose: TokenPurpose,
        ttl: Duration,
    ) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        let claims = Claims {
            sub: email.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            purpose,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(sub = %email, purpose = ?purpose, "jwt signed");
        Ok(token)
    }

    pub fn sign_access(&self, email: &str) -> anyhow::Result<String> {
        self.sign_with_purpose(email, TokenPurpose::Access, self.access_ttl)
    }

    pub fn sign_reset(&self, email: &str) -> anyhow::Result<String> {
        self.sign_with_purpose(email, TokenPurpose::PasswordReset, self.reset_ttl)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            }
        })?;
        debug!(sub = %data.claims.sub, purpose = ?data.claims.purpose, "jwt verified");
        Ok(data.claims)
    }

    /// Verify a token and require the password-reset purpose. A valid access
    /// token presented to the reset flow is rejected here.
    pub fn verify_reset(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = self.verify(token)?;
        if claims.purpose != TokenPurpose::PasswordReset {
            return Err(TokenError::Malformed);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::FromRef;

    fn make_keys() -> JwtKeys {
        let state = AppState::fake();
        JwtKeys::from_ref(&state)
    }

    #[tokio::test]
    async fn sign_and_verify_access_token() {
        let keys = make_keys();
        let token = keys.sign_access("alice@example.com").expect("sign access");
        let claims = keys.verify(&token).expect("verify token");
        assert_eq!(claims.sub, "alice@example.com");
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert_eq!(claims.purpose, TokenPurpose::Access);
    }

    #[tokio::test]
    async fn sign_and_verify_reset_token() {
        let keys = make_keys();
        let token = keys.sign_reset("alice@example.com").expect("sign reset");
        let claims = keys.verify_reset(&token).expect("verify reset");
        assert_eq!(claims.sub, "alice@example.com");
        assert_eq!(claims.purpose, TokenPurpose::PasswordReset);
    }

    #[tokio::test]
    async fn verify_reset_rejects_access_token() {
        let keys = make_keys();
        let token = keys.sign_access("alice@example.com").expect("sign access");
        let err = keys.verify_reset(&token).unwrap_err();
        assert_eq!(err, TokenError::Malformed);
    }

    #[tokio::test]
    async fn verify_rejects_expired_token_as_expired() {
        let keys = make_keys();
        let now = OffsetDateTime::now_utc().unix_timestamp() as usize;
        let claims = Claims {
            sub: "alice@example.com".into(),
            iat: now - 600,
            exp: now - 300,
            iss: keys.issuer.clone(),
            aud: keys.audience.clone(),
            purpose: TokenPurpose::Access,
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).expect("encode");
        let err = keys.verify(&token).unwrap_err();
        assert_eq!(err, TokenError::Expired);
    }

    #[tokio::test]
    async fn verify_rejects_tampered_token_as_malformed() {
        let keys = make_keys();
        let token = keys.sign_access("alice@example.com").expect("sign access");
        let mut tampered = token.clone();
        tampered.pop();
        let err = keys.verify(&tampered).unwrap_err();
        assert_eq!(err, TokenError::Malformed);

        let err = keys.verify("not-a-jwt").unwrap_err();
        assert_eq!(err, TokenError::Malformed);
    }

    #[tokio::test]
    async fn reset_token_wire_format_uses_type_claim() {
        let keys = make_keys();
        let token = keys.sign_reset("alice@example.com").expect("sign reset");
        let payload = base64_decode_payload(&token);
        assert!(payload.contains("\"type\":\"password_reset\""));

        let token = keys.sign_access("alice@example.com").expect("sign access");
        let payload = base64_decode_payload(&token);
        assert!(!payload.contains("\"type\""));
    }

    // Minimal base64url decoder for inspecting the JWT payload segment in
    // tests without pulling in a base64 dependency.
    fn base64_decode_payload(token: &str) -> String {
        let segment = token.split('.').nth(1).expect("payload segment");
        let table = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";
        let mut bits: u32 = 0;
        let mut nbits = 0;
        let mut out = Vec::new();
        for c in segment.chars() {
            let v = table.find(c).expect("base64url char") as u32;
            bits = (bits << 6) | v;
            nbits += 6;
            if nbits >= 8 {
                nbits -= 8;
                out.push(((bits >> nbits) & 0xff) as u8);
            }
        }
        String::from_utf8(out).expect("utf8 payload")
    }
}
