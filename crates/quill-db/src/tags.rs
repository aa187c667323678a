//! Tag repository implementation.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};

use quill_core::{Error, Result, Tag, TagRepository};

/// PostgreSQL implementation of TagRepository.
#[derive(Clone)]
pub struct PgTagRepository {
    pool: Pool<Postgres>,
}

impl PgTagRepository {
    /// Create a new PgTagRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn map_tag_row(row: sqlx::postgres::PgRow) -> Tag {
    Tag {
        id: row.get("id"),
        label: row.get("label"),
        color: row.get("color"),
    }
}

/// Map a unique-constraint violation on (account_id, label) to
/// DuplicateLabel so callers can pattern-match the lost-race case.
fn map_label_conflict(e: sqlx::Error, label: &str) -> Error {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            Error::DuplicateLabel(label.to_string())
        }
        _ => Error::Database(e),
    }
}

#[async_trait]
impl TagRepository for PgTagRepository {
    async fn create(&self, account_id: i64, label: &str, color: &str) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO tags (account_id, label, color)
             VALUES ($1, $2, $3)
             RETURNING id",
        )
        .bind(account_id)
        .bind(label)
        .bind(color)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_label_conflict(e, label))?;

        Ok(id)
    }

    async fn list_by_account(&self, account_id: i64) -> Result<Vec<Tag>> {
        let rows = sqlx::query(
            "SELECT id, label, color FROM tags WHERE account_id = $1 ORDER BY id",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(map_tag_row).collect())
    }

    async fn list_by_note(&self, account_id: i64, note_id: i64) -> Result<Vec<Tag>> {
        let rows = sqlx::query(
            "SELECT t.id, t.label, t.color
             FROM tags t
             JOIN note_tags nt ON nt.tag_id = t.id
             WHERE t.account_id = $1 AND nt.note_id = $2
             ORDER BY t.id",
        )
        .bind(account_id)
        .bind(note_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(map_tag_row).collect())
    }

    async fn get(&self, account_id: i64, tag_id: i64) -> Result<Tag> {
        let row = sqlx::query(
            "SELECT id, label, color FROM tags WHERE account_id = $1 AND id = $2",
        )
        .bind(account_id)
        .bind(tag_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or(Error::TagNotFound(tag_id))?;

        Ok(map_tag_row(row))
    }

    async fn update(&self, account_id: i64, tag_id: i64, tag: &Tag) -> Result<()> {
        sqlx::query("UPDATE tags SET label = $1, color = $2 WHERE account_id = $3 AND id = $4")
            .bind(&tag.label)
            .bind(&tag.color)
            .bind(account_id)
            .bind(tag_id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_label_conflict(e, &tag.label))?;

        Ok(())
    }

    async fn delete(&self, account_id: i64, tag_id: i64) -> Result<()> {
        // Relation rows cascade via foreign key.
        sqlx::query("DELETE FROM tags WHERE account_id = $1 AND id = $2")
            .bind(account_id)
            .bind(tag_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(())
    }

    async fn assign(&self, account_id: i64, tag_id: i64, note_id: i64) -> Result<()> {
        // Conflict-do-nothing keeps concurrent attaches of the same pair
        // idempotent.
        sqlx::query(
            "INSERT INTO note_tags (note_id, tag_id)
             SELECT $1, t.id FROM tags t WHERE t.id = $2 AND t.account_id = $3
             ON CONFLICT (note_id, tag_id) DO NOTHING",
        )
        .bind(note_id)
        .bind(tag_id)
        .bind(account_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(())
    }

    async fn remove(&self, account_id: i64, tag_id: i64, note_id: i64) -> Result<()> {
        sqlx::query(
            "DELETE FROM note_tags nt
             USING tags t
             WHERE nt.tag_id = t.id AND t.account_id = $1 AND nt.tag_id = $2 AND nt.note_id = $3",
        )
        .bind(account_id)
        .bind(tag_id)
        .bind(note_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(())
    }
}
