//! Identity resolution.
//!
//! One constructed collaborator owns the "who is making this request"
//! decision: a valid session token wins, and when anonymous access mode is
//! enabled the configured demo identity is the explicit fallback. Handlers
//! never decide this inline.

use axum::http::HeaderMap;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use tracing::info;

use super::error::ApiError;
use crate::config::AuthConfig;
use crate::db::{Session, User};

/// Hash a token for storage/lookup; raw tokens are never persisted
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Extract the bearer token from request headers
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let auth_header = headers.get("Authorization").and_then(|h| h.to_str().ok())?;
    auth_header.strip_prefix("Bearer ").map(|t| t.to_string())
}

#[derive(Clone)]
pub struct IdentityResolver {
    auth: AuthConfig,
}

impl IdentityResolver {
    pub fn new(auth: AuthConfig) -> Self {
        Self { auth }
    }

    pub fn anonymous_mode(&self) -> bool {
        self.auth.anonymous_mode
    }

    /// Resolve the requesting user: session token first, demo identity as
    /// the anonymous-mode fallback, otherwise 401.
    pub async fn resolve(&self, pool: &SqlitePool, headers: &HeaderMap) -> Result<User, ApiError> {
        if let Some(token) = extract_token(headers) {
            return self.resolve_session(pool, &token).await;
        }

        if self.auth.anonymous_mode {
            return Ok(self.get_or_create_demo_user(pool).await?);
        }

        Err(ApiError::unauthorized("Authentication required"))
    }

    async fn resolve_session(&self, pool: &SqlitePool, token: &str) -> Result<User, ApiError> {
        let token_hash = hash_token(token);
        let session: Option<Session> = sqlx::query_as(
            "SELECT * FROM sessions WHERE token_hash = ? AND expires_at > datetime('now')",
        )
        .bind(&token_hash)
        .fetch_optional(pool)
        .await?;

        let session = session.ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))?;

        let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(&session.user_id)
            .fetch_optional(pool)
            .await?;

        user.ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))
    }

    /// Get or create the demo identity. The demo user has no credentials;
    /// it exists only so the app can run without signups.
    pub async fn get_or_create_demo_user(&self, pool: &SqlitePool) -> Result<User, sqlx::Error> {
        let existing: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
            .bind(&self.auth.demo_email)
            .fetch_optional(pool)
            .await?;

        if let Some(user) = existing {
            return Ok(user);
        }

        let id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO users (id, name, email, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&self.auth.demo_name)
        .bind(&self.auth.demo_email)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await?;

        info!(email = %self.auth.demo_email, "Created demo user");

        let user: User = sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(&id)
            .fetch_one(pool)
            .await?;

        Ok(user)
    }
}
