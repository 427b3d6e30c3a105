// In-memory user storage for dev mode and tests.
// Decision: parking_lot for thread-safe access; all data lost on restart.

use anyhow::{anyhow, Result};
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use super::models::{CreateUserRow, UserRow};

#[derive(Default)]
pub struct InMemoryDatabase {
    users: RwLock<HashMap<Uuid, UserRow>>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create_user(&self, input: CreateUserRow) -> Result<UserRow> {
        let mut users = self.users.write();
        if users.values().any(|u| u.email == input.email) {
            // Mirrors the unique constraint on users.email.
            return Err(anyhow!("email already registered: {}", input.email));
        }

        let now = Utc::now();
        let row = UserRow {
            id: Uuid::now_v7(),
            email: input.email,
            name: input.name,
            password_hash: input.password_hash,
            role: input.role,
            created_at: now,
            updated_at: now,
        };
        users.insert(row.id, row.clone());
        Ok(row)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        Ok(self
            .users
            .read()
            .values()
            .find(|u| u.email == email)
            .cloned())
    }
}
