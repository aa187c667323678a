//! Core data models for quill.
//!
//! These types are shared across all quill crates and represent the core
//! domain entities: accounts, notes, and account-scoped tags.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::defaults::SHORT_BODY_LEN;

// =============================================================================
// ACCOUNT TYPES
// =============================================================================

/// A registered account. Owns its notes and tags exclusively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub username: String,
    pub email: String,
    /// Bcrypt hash. Never serialized in responses.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
}

/// Data needed to persist a new account (password already hashed).
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Registration payload.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Login payload.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Successful login response: a bearer token plus the account profile.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub name: String,
    pub username: String,
    pub email: String,
}

// =============================================================================
// NOTE TYPES
// =============================================================================

/// A note owned by exactly one account.
///
/// `short_body` is a derived preview, recomputed whenever `body` changes.
/// `tags` is populated at read time by joining through the note-tag
/// relation; it is never stored on the note row itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub header: String,
    #[serde(default)]
    pub body: String,
    #[serde(rename = "shortBody", default)]
    pub short_body: String,
    pub color: String,
    pub edited: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Note {
    /// Recompute the preview body from the full body.
    ///
    /// Truncates to [`SHORT_BODY_LEN`] characters; a body at or under the
    /// limit is copied verbatim.
    pub fn generate_short_body(&mut self) {
        self.short_body = if self.body.chars().count() <= SHORT_BODY_LEN {
            self.body.clone()
        } else {
            self.body.chars().take(SHORT_BODY_LEN).collect()
        };
    }

    /// Whether any of this note's tag labels contains `label`,
    /// case-insensitively.
    ///
    /// Substring containment, not equality: "test" matches a tag labeled
    /// "testing". Tag search and the detach liveness scan both rely on
    /// these semantics.
    pub fn has_specific_tag(&self, label: &str) -> bool {
        let needle = label.to_lowercase();
        self.tags
            .iter()
            .any(|t| t.label.to_lowercase().contains(&needle))
    }

    /// Whether the note matches every label in `labels`.
    ///
    /// Vacuously true for an empty slice.
    pub fn has_every_tag(&self, labels: &[String]) -> bool {
        labels.iter().all(|l| self.has_specific_tag(l))
    }
}

/// Payload for creating a note.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateNoteRequest {
    pub header: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub color: String,
}

/// Payload for a partial note update. Empty fields mean "leave unchanged";
/// whether `body` was present at all is carried separately by the caller.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateNoteRequest {
    #[serde(default)]
    pub header: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub color: String,
}

// =============================================================================
// TAG TYPES
// =============================================================================

/// An account-scoped label entity, unique by label within its account,
/// attachable to many notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub label: String,
    pub color: String,
}

/// Payload for attaching a tag to a note (creating it if the label is new
/// for the account).
#[derive(Debug, Clone, Deserialize)]
pub struct AttachTagRequest {
    pub label: String,
    #[serde(default)]
    pub color: String,
}

/// Payload for a partial tag update. Empty fields keep previous values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTagRequest {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub color: String,
}
