// Token revocation store (the logout blacklist).
// Decision: enum dispatch over Postgres/in-memory, matching the storage
// backend pattern used elsewhere in the workspace.
//
// Keys are SHA-256 hashes of the raw token (see `jwt::token_hash`). A hash
// present in the store must never authenticate, regardless of signature and
// expiry. Records become garbage once the token itself has expired and are
// removed by a periodic sweep, never per-request.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RevocationError {
    #[error("revocation store unavailable")]
    Store(#[from] sqlx::Error),
}

/// Revocation store backed by PostgreSQL (production) or memory (dev mode).
#[derive(Clone)]
pub enum RevocationStore {
    Postgres(PgPool),
    InMemory(Arc<InMemoryRevocations>),
}

/// In-memory revocation records for dev mode and tests.
#[derive(Default)]
pub struct InMemoryRevocations {
    /// token hash -> token expiry
    entries: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl RevocationStore {
    pub fn postgres(pool: PgPool) -> Self {
        Self::Postgres(pool)
    }

    pub fn in_memory() -> Self {
        Self::InMemory(Arc::new(InMemoryRevocations::default()))
    }

    /// Record a token as revoked until `expires_at`. Idempotent: revoking an
    /// already-revoked token is a no-op.
    pub async fn revoke(
        &self,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RevocationError> {
        match self {
            Self::Postgres(pool) => {
                sqlx::query(
                    r#"
                    INSERT INTO revoked_tokens (token_hash, expires_at)
                    VALUES ($1, $2)
                    ON CONFLICT (token_hash) DO NOTHING
                    "#,
                )
                .bind(token_hash)
                .bind(expires_at)
                .execute(pool)
                .await?;
                Ok(())
            }
            Self::InMemory(store) => {
                store
                    .entries
                    .write()
                    .entry(token_hash.to_string())
                    .or_insert(expires_at);
                Ok(())
            }
        }
    }

    /// Whether a token hash has been revoked. O(1) expected; callers bound
    /// this with a timeout and fail closed.
    pub async fn is_revoked(&self, token_hash: &str) -> Result<bool, RevocationError> {
        match self {
            Self::Postgres(pool) => {
                let revoked: bool = sqlx::query_scalar(
                    "SELECT EXISTS(SELECT 1 FROM revoked_tokens WHERE token_hash = $1)",
                )
                .bind(token_hash)
                .fetch_one(pool)
                .await?;
                Ok(revoked)
            }
            Self::InMemory(store) => Ok(store.entries.read().contains_key(token_hash)),
        }
    }

    /// Delete every record whose expiry is before `now`; returns how many
    /// were removed. Records with expiry at or after `now` are never touched.
    /// Safe to run concurrently with `revoke`/`is_revoked`.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<u64, RevocationError> {
        match self {
            Self::Postgres(pool) => {
                let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < $1")
                    .bind(now)
                    .execute(pool)
                    .await?;
                Ok(result.rows_affected())
            }
            Self::InMemory(store) => {
                let mut entries = store.entries.write();
                let before = entries.len();
                entries.retain(|_, expires_at| *expires_at >= now);
                Ok((before - entries.len()) as u64)
            }
        }
    }
}

/// Run `sweep` on a fixed interval, decoupled from request handling.
pub fn spawn_sweeper(store: RevocationStore, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match store.sweep(Utc::now()).await {
                Ok(0) => {}
                Ok(removed) => tracing::debug!(removed, "swept expired revocation records"),
                Err(e) => tracing::warn!(error = %e, "revocation sweep failed"),
            }
        }
    })
}
