//! Note repository implementation.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};

use quill_core::{Error, Note, NoteRepository, Result};

/// PostgreSQL implementation of NoteRepository.
#[derive(Clone)]
pub struct PgNoteRepository {
    pool: Pool<Postgres>,
}

impl PgNoteRepository {
    /// Create a new PgNoteRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn map_note_row(row: sqlx::postgres::PgRow) -> Note {
    Note {
        id: row.get("id"),
        header: row.get("header"),
        body: String::new(),
        short_body: row.get("short_body"),
        color: row.get("color"),
        edited: row.get("edited"),
        tags: Vec::new(),
    }
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    async fn create(&self, account_id: i64, note: &Note) -> Result<i64> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let note_id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO notes (header, short_body, color, edited)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(&note.header)
        .bind(&note.short_body)
        .bind(&note.color)
        .bind(note.edited)
        .fetch_one(&mut *tx)
        .await
        .map_err(Error::Database)?;

        sqlx::query("INSERT INTO notes_body (id, body) VALUES ($1, $2)")
            .bind(note_id)
            .bind(&note.body)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        sqlx::query("INSERT INTO account_notes (account_id, note_id) VALUES ($1, $2)")
            .bind(account_id)
            .bind(note_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(note_id)
    }

    async fn list_by_account(&self, account_id: i64) -> Result<Vec<Note>> {
        let rows = sqlx::query(
            "SELECT n.id, n.header, n.short_body, n.color, n.edited
             FROM notes n
             JOIN account_notes an ON n.id = an.note_id
             WHERE an.account_id = $1
             ORDER BY n.id",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(map_note_row).collect())
    }

    async fn get(&self, account_id: i64, note_id: i64) -> Result<Note> {
        let row = sqlx::query(
            "SELECT n.id, n.header, n.short_body, n.color, n.edited
             FROM notes n
             JOIN account_notes an ON n.id = an.note_id
             WHERE an.account_id = $1 AND an.note_id = $2",
        )
        .bind(account_id)
        .bind(note_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or(Error::NoteNotFound(note_id))?;

        let mut note = map_note_row(row);

        note.body = sqlx::query_scalar::<_, String>("SELECT body FROM notes_body WHERE id = $1")
            .bind(note_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .unwrap_or_default();

        Ok(note)
    }

    async fn update(&self, account_id: i64, note: &Note) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query(
            "UPDATE notes SET header = $1, short_body = $2, color = $3, edited = $4
             FROM account_notes an
             WHERE notes.id = an.note_id AND an.note_id = $5 AND an.account_id = $6",
        )
        .bind(&note.header)
        .bind(&note.short_body)
        .bind(&note.color)
        .bind(note.edited)
        .bind(note.id)
        .bind(account_id)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        sqlx::query("UPDATE notes_body SET body = $2 WHERE id = $1")
            .bind(note.id)
            .bind(&note.body)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn delete(&self, account_id: i64, note_id: i64) -> Result<()> {
        // Body, ownership, and tag relation rows cascade via foreign keys.
        sqlx::query(
            "DELETE FROM notes
             USING account_notes an
             WHERE notes.id = an.note_id AND an.account_id = $1 AND an.note_id = $2",
        )
        .bind(account_id)
        .bind(note_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(())
    }
}
