//! Note CRUD scoped to an account, with tag population and tag-based
//! filtering.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, trace};

use quill_core::{
    CreateNoteRequest, Note, NoteRepository, Result, TagRepository, DEFAULT_NOTE_COLOR,
};

/// Service for account-scoped note operations. Tag lookups are composed in
/// at read time through the tag repository.
#[derive(Clone)]
pub struct NoteService {
    notes: Arc<dyn NoteRepository>,
    tags: Arc<dyn TagRepository>,
}

impl NoteService {
    pub fn new(notes: Arc<dyn NoteRepository>, tags: Arc<dyn TagRepository>) -> Self {
        Self { notes, tags }
    }

    /// Create a note. The preview body is derived here; a missing color
    /// falls back to the default.
    pub async fn create(&self, account_id: i64, req: CreateNoteRequest) -> Result<i64> {
        let mut note = Note {
            id: 0,
            header: req.header,
            body: req.body,
            short_body: String::new(),
            color: if req.color.is_empty() {
                DEFAULT_NOTE_COLOR.to_string()
            } else {
                req.color
            },
            edited: Utc::now(),
            tags: Vec::new(),
        };
        note.generate_short_body();

        let id = self.notes.create(account_id, &note).await?;
        debug!(
            subsystem = "service",
            component = "note_service",
            op = "create",
            account_id,
            note_id = id,
            "Note created"
        );
        Ok(id)
    }

    /// List all of the account's notes, tags populated.
    pub async fn get_all(&self, account_id: i64) -> Result<Vec<Note>> {
        let mut notes = self.notes.list_by_account(account_id).await?;
        for note in &mut notes {
            note.tags = self.tags.list_by_note(account_id, note.id).await?;
        }
        Ok(notes)
    }

    /// Ownership-checked single-note fetch, tags populated.
    pub async fn get_one(&self, account_id: i64, note_id: i64) -> Result<Note> {
        let mut note = self.notes.get(account_id, note_id).await?;
        note.tags = self.tags.list_by_note(account_id, note_id).await?;
        Ok(note)
    }

    /// Partial update. Empty header or color means "keep previous"; when
    /// `need_body_update` is false the previous body and preview are kept
    /// verbatim regardless of the incoming note, so callers can distinguish
    /// "body omitted" from "body set to empty". The preview is recomputed
    /// only when the body actually changes.
    pub async fn update(&self, account_id: i64, mut note: Note, need_body_update: bool) -> Result<()> {
        let prev = self.notes.get(account_id, note.id).await?;

        if note.header.is_empty() {
            note.header = prev.header;
        }
        if note.color.is_empty() {
            note.color = prev.color;
        }
        if need_body_update {
            note.generate_short_body();
        } else {
            note.body = prev.body;
            note.short_body = prev.short_body;
        }
        note.edited = Utc::now();

        self.notes.update(account_id, &note).await
    }

    /// Ownership-checked delete.
    pub async fn delete(&self, account_id: i64, note_id: i64) -> Result<()> {
        self.notes.get(account_id, note_id).await?;
        self.notes.delete(account_id, note_id).await
    }

    /// Keep only the notes carrying every label in `labels`, where a label
    /// matches by case-insensitive substring against the note's tags. An
    /// empty list matches every note.
    pub async fn find_by_tags(&self, account_id: i64, labels: &[String]) -> Result<Vec<Note>> {
        let notes = self.get_all(account_id).await?;
        let matched: Vec<Note> = notes
            .into_iter()
            .filter(|n| n.has_every_tag(labels))
            .collect();

        trace!(
            subsystem = "service",
            component = "note_service",
            op = "find_by_tags",
            account_id,
            result_count = matched.len(),
            "Filtered notes by tags"
        );
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::mem::{MemNoteRepository, MemTagRepository};
    use quill_core::Error;

    fn service() -> (NoteService, Arc<MemTagRepository>) {
        let tags = Arc::new(MemTagRepository::default());
        let notes = Arc::new(MemNoteRepository::default());
        (NoteService::new(notes, tags.clone()), tags)
    }

    fn create_request(header: &str, body: &str, color: &str) -> CreateNoteRequest {
        CreateNoteRequest {
            header: header.to_string(),
            body: body.to_string(),
            color: color.to_string(),
        }
    }

    async fn attach(tags: &Arc<MemTagRepository>, account_id: i64, note_id: i64, label: &str) {
        let tag_id = tags.create(account_id, label, "").await.unwrap();
        tags.assign(account_id, tag_id, note_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_create_computes_short_body() {
        let (svc, _) = service();
        let long_body = "x".repeat(300);
        let id = svc.create(1, create_request("h", &long_body, "AABBCC")).await.unwrap();

        let note = svc.get_one(1, id).await.unwrap();
        assert_eq!(note.short_body.chars().count(), 255);
        assert_eq!(note.body, long_body);
    }

    #[tokio::test]
    async fn test_create_short_body_equals_body_when_short() {
        let (svc, _) = service();
        let id = svc.create(1, create_request("h", "milk", "AABBCC")).await.unwrap();

        let note = svc.get_one(1, id).await.unwrap();
        assert_eq!(note.short_body, "milk");
    }

    #[tokio::test]
    async fn test_create_defaults_color_when_empty() {
        let (svc, _) = service();
        let id = svc.create(1, create_request("h", "b", "")).await.unwrap();

        let note = svc.get_one(1, id).await.unwrap();
        assert_eq!(note.color, DEFAULT_NOTE_COLOR);
    }

    #[tokio::test]
    async fn test_update_empty_fields_keep_previous() {
        let (svc, _) = service();
        let id = svc
            .create(1, create_request("Groceries", "milk", "FFAAAA"))
            .await
            .unwrap();

        let incoming = Note {
            id,
            header: String::new(),
            body: String::new(),
            short_body: String::new(),
            color: String::new(),
            edited: Utc::now(),
            tags: Vec::new(),
        };
        svc.update(1, incoming, false).await.unwrap();

        let note = svc.get_one(1, id).await.unwrap();
        assert_eq!(note.header, "Groceries");
        assert_eq!(note.body, "milk");
        assert_eq!(note.short_body, "milk");
        assert_eq!(note.color, "FFAAAA");
    }

    #[tokio::test]
    async fn test_update_with_body_recomputes_short_body() {
        let (svc, _) = service();
        let id = svc.create(1, create_request("h", "milk", "FFAAAA")).await.unwrap();

        let incoming = Note {
            id,
            header: String::new(),
            body: "y".repeat(300),
            short_body: String::new(),
            color: String::new(),
            edited: Utc::now(),
            tags: Vec::new(),
        };
        svc.update(1, incoming, true).await.unwrap();

        let note = svc.get_one(1, id).await.unwrap();
        assert_eq!(note.body.chars().count(), 300);
        assert_eq!(note.short_body.chars().count(), 255);
        assert_eq!(note.header, "h");
    }

    #[tokio::test]
    async fn test_update_explicit_empty_body() {
        let (svc, _) = service();
        let id = svc.create(1, create_request("h", "milk", "FFAAAA")).await.unwrap();

        let incoming = Note {
            id,
            header: String::new(),
            body: String::new(),
            short_body: String::new(),
            color: String::new(),
            edited: Utc::now(),
            tags: Vec::new(),
        };
        svc.update(1, incoming, true).await.unwrap();

        let note = svc.get_one(1, id).await.unwrap();
        assert_eq!(note.body, "");
        assert_eq!(note.short_body, "");
    }

    #[tokio::test]
    async fn test_ownership_isolation() {
        let (svc, _) = service();
        let id = svc.create(1, create_request("h", "b", "c")).await.unwrap();

        let err = svc.get_one(2, id).await.unwrap_err();
        assert!(matches!(err, Error::NoteNotFound(_)));

        let err = svc.delete(2, id).await.unwrap_err();
        assert!(matches!(err, Error::NoteNotFound(_)));
    }

    #[tokio::test]
    async fn test_find_by_tags_requires_every_label() {
        let (svc, tags) = service();
        let both = svc.create(1, create_request("both", "b", "c")).await.unwrap();
        let one = svc.create(1, create_request("one", "b", "c")).await.unwrap();

        attach(&tags, 1, both, "work").await;
        attach(&tags, 1, both, "urgent").await;
        let work = tags.list_by_account(1).await.unwrap()[0].clone();
        tags.assign(1, work.id, one).await.unwrap();

        let found = svc
            .find_by_tags(1, &["work".to_string(), "urgent".to_string()])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, both);
    }

    #[tokio::test]
    async fn test_find_by_tags_substring_case_insensitive() {
        let (svc, tags) = service();
        let id = svc.create(1, create_request("h", "b", "c")).await.unwrap();
        attach(&tags, 1, id, "Testing").await;

        let found = svc.find_by_tags(1, &["test".to_string()]).await.unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_find_by_tags_empty_list_matches_all() {
        let (svc, _) = service();
        svc.create(1, create_request("a", "b", "c")).await.unwrap();
        svc.create(1, create_request("d", "e", "f")).await.unwrap();

        let found = svc.find_by_tags(1, &[]).await.unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn test_get_all_populates_tags() {
        let (svc, tags) = service();
        let id = svc.create(1, create_request("h", "b", "c")).await.unwrap();
        attach(&tags, 1, id, "work").await;

        let notes = svc.get_all(1).await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].tags.len(), 1);
        assert_eq!(notes[0].tags[0].label, "work");
    }
}
