// Storage backend abstraction.
// Decision: enum dispatch for simplicity over trait objects.

use anyhow::Result;
use sqlx::PgPool;
use std::sync::Arc;

use super::memory::InMemoryDatabase;
use super::models::{CreateUserRow, UserRow};
use super::repositories::Database;

/// Storage backend that can be either PostgreSQL or in-memory.
#[derive(Clone)]
pub enum StorageBackend {
    /// PostgreSQL database (production).
    Postgres(Database),
    /// In-memory database (dev mode).
    InMemory(Arc<InMemoryDatabase>),
}

impl StorageBackend {
    /// Create a PostgreSQL storage backend from a database URL.
    pub async fn postgres(database_url: &str) -> Result<Self> {
        let db = Database::from_url(database_url).await?;
        Ok(Self::Postgres(db))
    }

    /// Create an in-memory storage backend.
    pub fn in_memory() -> Self {
        Self::InMemory(Arc::new(InMemoryDatabase::new()))
    }

    /// Check if this is dev mode (in-memory).
    pub fn is_dev_mode(&self) -> bool {
        matches!(self, Self::InMemory(_))
    }

    /// The PostgreSQL pool when backed by PostgreSQL (shared with the
    /// revocation store so both live in the same database).
    pub fn pool(&self) -> Option<&PgPool> {
        match self {
            Self::Postgres(db) => Some(db.pool()),
            Self::InMemory(_) => None,
        }
    }

    pub async fn create_user(&self, input: CreateUserRow) -> Result<UserRow> {
        match self {
            Self::Postgres(db) => db.create_user(input).await,
            Self::InMemory(db) => db.create_user(input).await,
        }
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        match self {
            Self::Postgres(db) => db.get_user_by_email(email).await,
            Self::InMemory(db) => db.get_user_by_email(email).await,
        }
    }
}
