//! Repository traits for quill's persistence ports.
//!
//! These traits define the interfaces that concrete store implementations
//! must satisfy. Services hold them as trait objects supplied via
//! constructor, enabling pluggable backends and test doubles.
//!
//! Every lookup that takes an `account_id` is ownership-checked: the store
//! filters by both the resource id and the account id in one step, and
//! reports the resource's NotFound variant when either mismatches.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Account, NewAccount, Note, Tag};

/// Repository for account rows.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Insert a new account. Fails with [`crate::Error::DuplicateUsername`]
    /// when the username is already taken.
    async fn create(&self, account: NewAccount) -> Result<i64>;

    /// Fetch an account by username.
    async fn find_by_username(&self, username: &str) -> Result<Account>;

    /// Fetch an account by id.
    async fn find_by_id(&self, id: i64) -> Result<Account>;
}

/// Repository for note rows and their account-ownership relation.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Insert a note, its body row, and the account-note relation in one
    /// transaction. Returns the new note id.
    async fn create(&self, account_id: i64, note: &Note) -> Result<i64>;

    /// List all notes owned by the account. Tags are not populated and
    /// bodies are left empty; use [`NoteRepository::get`] for the full
    /// record.
    async fn list_by_account(&self, account_id: i64) -> Result<Vec<Note>>;

    /// Ownership-checked single-note lookup, body included.
    async fn get(&self, account_id: i64, note_id: i64) -> Result<Note>;

    /// Update note fields and body in one transaction (ownership-checked).
    async fn update(&self, account_id: i64, note: &Note) -> Result<()>;

    /// Delete a note (ownership-checked). Body, ownership, and tag
    /// relation rows go with it.
    async fn delete(&self, account_id: i64, note_id: i64) -> Result<()>;
}

/// Repository for tag rows and the note-tag relation.
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Insert a tag scoped to the account. Fails with
    /// [`crate::Error::DuplicateLabel`] when the account already has a tag
    /// with this label.
    async fn create(&self, account_id: i64, label: &str, color: &str) -> Result<i64>;

    /// List every tag owned by the account.
    async fn list_by_account(&self, account_id: i64) -> Result<Vec<Tag>>;

    /// List the tags related to one of the account's notes.
    async fn list_by_note(&self, account_id: i64, note_id: i64) -> Result<Vec<Tag>>;

    /// Ownership-checked single-tag lookup.
    async fn get(&self, account_id: i64, tag_id: i64) -> Result<Tag>;

    /// Persist new label/color for a tag (ownership-checked). Surfaces
    /// [`crate::Error::DuplicateLabel`] when the new label collides.
    async fn update(&self, account_id: i64, tag_id: i64, tag: &Tag) -> Result<()>;

    /// Delete a tag row (ownership-checked). Relation rows cascade.
    async fn delete(&self, account_id: i64, tag_id: i64) -> Result<()>;

    /// Create a note-tag relation row. Idempotent: assigning an existing
    /// pair is a no-op.
    async fn assign(&self, account_id: i64, tag_id: i64, note_id: i64) -> Result<()>;

    /// Remove a note-tag relation row.
    async fn remove(&self, account_id: i64, tag_id: i64, note_id: i64) -> Result<()>;
}
