//! Account repository implementation.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};

use quill_core::{Account, AccountRepository, Error, NewAccount, Result};

/// PostgreSQL implementation of AccountRepository.
#[derive(Clone)]
pub struct PgAccountRepository {
    pool: Pool<Postgres>,
}

impl PgAccountRepository {
    /// Create a new PgAccountRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn map_account_row(row: sqlx::postgres::PgRow) -> Account {
    Account {
        id: row.get("id"),
        name: row.get("name"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
    }
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn create(&self, account: NewAccount) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO accounts (name, username, email, password_hash)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(&account.name)
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Error::DuplicateUsername(account.username.clone())
            }
            _ => Error::Database(e),
        })?;

        Ok(id)
    }

    async fn find_by_username(&self, username: &str) -> Result<Account> {
        let row = sqlx::query(
            "SELECT id, name, username, email, password_hash
             FROM accounts
             WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or_else(|| Error::NotFound(format!("account '{}'", username)))?;

        Ok(map_account_row(row))
    }

    async fn find_by_id(&self, id: i64) -> Result<Account> {
        let row = sqlx::query(
            "SELECT id, name, username, email, password_hash
             FROM accounts
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or_else(|| Error::NotFound(format!("account {}", id)))?;

        Ok(map_account_row(row))
    }
}
