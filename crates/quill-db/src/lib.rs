//! # quill-db
//!
//! PostgreSQL database layer for quill.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for accounts, notes, and tags
//! - Migration support (behind the `migrations` feature)
//!
//! ## Example
//!
//! ```rust,ignore
//! use quill_db::Database;
//! use quill_core::NoteRepository;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/quill").await?;
//!     let notes = db.notes.list_by_account(1).await?;
//!     println!("{} notes", notes.len());
//!     Ok(())
//! }
//! ```

pub mod accounts;
pub mod notes;
pub mod pool;
pub mod tags;

#[cfg(test)]
mod tests;

// Re-export core types
pub use quill_core::*;

// Re-export repository implementations
pub use accounts::PgAccountRepository;
pub use notes::PgNoteRepository;
pub use pool::{create_pool, create_pool_with_config, PoolConfig};
pub use tags::PgTagRepository;

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Account repository.
    pub accounts: PgAccountRepository,
    /// Note repository.
    pub notes: PgNoteRepository,
    /// Tag repository.
    pub tags: PgTagRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            accounts: PgAccountRepository::new(pool.clone()),
            notes: PgNoteRepository::new(pool.clone()),
            tags: PgTagRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}
