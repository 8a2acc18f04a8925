//! User lookups for the auth gate
//!
//! Authentication proper is an external concern; this store only supports
//! the thin bearer-token gate (credential lookup at login, id lookup for
//! `/user`).

use chrono::Utc;
use common::SqliteClient;
use errors::Result;
use serde::Serialize;
use sqlx::Row;

/// Full user row; the credential never leaves this module's callers
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password: String,
}

/// User shape exposed over the API
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: i64,
    pub name: String,
    pub email: String,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
        }
    }
}

#[derive(Clone)]
pub struct UserStore {
    client: SqliteClient,
}

impl UserStore {
    pub fn new(client: SqliteClient) -> Self {
        Self { client }
    }

    pub async fn find(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, name, email, password FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.client.pool())
            .await?;
        Ok(row.map(|r| User {
            id: r.get("id"),
            name: r.get("name"),
            email: r.get("email"),
            password: r.get("password"),
        }))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, name, email, password FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(self.client.pool())
            .await?;
        Ok(row.map(|r| User {
            id: r.get("id"),
            name: r.get("name"),
            email: r.get("email"),
            password: r.get("password"),
        }))
    }

    /// Insert a user (seeding and tests)
    pub async fn create(&self, name: &str, email: &str, password: &str) -> Result<i64> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO users (name, email, password, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(name)
        .bind(email)
        .bind(password)
        .bind(now)
        .bind(now)
        .execute(self.client.pool())
        .await?;
        Ok(result.last_insert_rowid())
    }
}
