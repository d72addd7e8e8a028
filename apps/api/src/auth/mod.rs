//! Identity and the admin gate.
//!
//! The public site's original design compared the signed-in email against a
//! public environment variable in the browser, a UX convenience rather than a
//! security control. Here the server is the enforcement point: admin routes
//! require a Bearer session token, and the session email must match the
//! single allow-listed admin account. Sessions live in Redis with a TTL.

pub mod handlers;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use async_trait::async_trait;
use axum::http::{header::AUTHORIZATION, request::Parts};
use axum::extract::FromRequestParts;
use redis::AsyncCommands;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub email: String,
}

/// Session state changes, for anything watching sign-in/sign-out.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionEvent {
    SignedIn { email: String },
    SignedOut,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AppError>;
    async fn sign_out(&self, token: &str) -> Result<(), AppError>;
    async fn session(&self, token: &str) -> Result<Option<Session>, AppError>;
    fn watch(&self) -> broadcast::Receiver<SessionEvent>;
}

/// Redis-backed provider for the single admin account.
pub struct RedisIdentity {
    redis: redis::Client,
    admin_email: String,
    admin_password_hash: String,
    ttl_secs: u64,
    tx: broadcast::Sender<SessionEvent>,
}

impl RedisIdentity {
    pub fn new(
        redis: redis::Client,
        admin_email: &str,
        admin_password_hash: &str,
        ttl_secs: u64,
    ) -> Self {
        let (tx, _) = broadcast::channel(16);
        RedisIdentity {
            redis,
            admin_email: admin_email.to_string(),
            admin_password_hash: admin_password_hash.to_string(),
            ttl_secs,
            tx,
        }
    }

    fn session_key(token: &str) -> String {
        format!("session:{token}")
    }
}

#[async_trait]
impl IdentityProvider for RedisIdentity {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AppError> {
        // Same rejection for unknown email and bad password.
        if !verify_credentials(
            email,
            password,
            &self.admin_email,
            &self.admin_password_hash,
        ) {
            return Err(AppError::Unauthorized);
        }

        let token = Uuid::new_v4().simple().to_string();
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let _: () = conn
            .set_ex(Self::session_key(&token), email, self.ttl_secs)
            .await?;

        info!(email, "admin signed in");
        let _ = self.tx.send(SessionEvent::SignedIn {
            email: email.to_string(),
        });
        Ok(Session {
            token,
            email: email.to_string(),
        })
    }

    async fn sign_out(&self, token: &str) -> Result<(), AppError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let _: () = conn.del(Self::session_key(token)).await?;
        let _ = self.tx.send(SessionEvent::SignedOut);
        Ok(())
    }

    async fn session(&self, token: &str) -> Result<Option<Session>, AppError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let email: Option<String> = conn.get(Self::session_key(token)).await?;
        Ok(email.map(|email| Session {
            token: token.to_string(),
            email,
        }))
    }

    fn watch(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }
}

/// Constant-shape credential check against the allow-listed admin account.
pub fn verify_credentials(
    email: &str,
    password: &str,
    admin_email: &str,
    admin_password_hash: &str,
) -> bool {
    if email != admin_email {
        return false;
    }
    PasswordHash::new(admin_password_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Extractor for admin-gated routes: Bearer token → live session → allow-listed
/// email. Rejects with 401 for missing/expired sessions, 403 for a live
/// session that is not the admin.
pub struct AdminSession(pub Session);

#[async_trait]
impl FromRequestParts<AppState> for AdminSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(AppError::Unauthorized)?;

        let session = state
            .identity
            .session(token)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if session.email != state.config.admin_email {
            return Err(AppError::Forbidden);
        }
        Ok(AdminSession(session))
    }
}

#[cfg(test)]
mod tests {
    use argon2::password_hash::{rand_core::OsRng, SaltString};
    use argon2::PasswordHasher;

    use super::*;

    fn hash(password: &str) -> String {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_verify_credentials_accepts_the_admin() {
        let phc = hash("hunter2");
        assert!(verify_credentials(
            "admin@example.com",
            "hunter2",
            "admin@example.com",
            &phc
        ));
    }

    #[test]
    fn test_verify_credentials_rejects_wrong_password_and_email() {
        let phc = hash("hunter2");
        assert!(!verify_credentials(
            "admin@example.com",
            "wrong",
            "admin@example.com",
            &phc
        ));
        assert!(!verify_credentials(
            "visitor@example.com",
            "hunter2",
            "admin@example.com",
            &phc
        ));
    }

    #[test]
    fn test_verify_credentials_rejects_malformed_hash() {
        assert!(!verify_credentials(
            "admin@example.com",
            "hunter2",
            "admin@example.com",
            "not-a-phc-string"
        ));
    }
}
