use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use crate::auth::claims::{Claims, SessionUser};
use crate::state::AppState;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("session credential expired")]
    Expired,
    #[error("invalid session credential")]
    Invalid,
}

/// Process-wide signing material for session credentials.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let secret = state.config.jwt.secret.as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: Duration::from_secs((state.config.jwt.ttl_days as u64) * 24 * 60 * 60),
        }
    }
}

impl JwtKeys {
    /// Sign a session credential embedding the user record, valid for the
    /// configured lifetime (7 days by default).
    pub fn sign(&self, user: SessionUser) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            user,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = claims.user.id, "session credential signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default()).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Invalid,
            },
        )?;
        debug!(user_id = data.claims.user.id, "session credential verified");
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo::Role;

    fn make_keys() -> JwtKeys {
        let state = AppState::fake();
        JwtKeys::from_ref(&state)
    }

    fn make_user() -> SessionUser {
        SessionUser {
            id: 42,
            email: "diner@example.com".into(),
            first_name: "Linh".into(),
            last_name: "Tran".into(),
            phone_number: "0123456789".into(),
            role: Role::User,
            is_verified: true,
            facebook_id: None,
        }
    }

    #[tokio::test]
    async fn sign_and_verify_roundtrip_preserves_user() {
        let keys = make_keys();
        let user = make_user();
        let token = keys.sign(user.clone()).expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.user, user);
    }

    #[tokio::test]
    async fn verify_rejects_expired_credential() {
        let keys = make_keys();
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            user: make_user(),
            iat: (now - TimeDuration::days(8)).unix_timestamp() as usize,
            exp: (now - TimeDuration::days(1)).unix_timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).expect("encode");
        assert_eq!(keys.verify(&token), Err(AuthError::Expired));
    }

    #[tokio::test]
    async fn verify_rejects_tampered_credential() {
        let keys = make_keys();
        let token = keys.sign(make_user()).expect("sign");
        let mut tampered = token.clone();
        tampered.pop();
        assert_eq!(keys.verify(&tampered), Err(AuthError::Invalid));
    }

    #[tokio::test]
    async fn verify_rejects_garbage() {
        let keys = make_keys();
        assert_eq!(keys.verify("not-a-jwt"), Err(AuthError::Invalid));
    }
}
