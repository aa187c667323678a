//! Tag reconciliation: label dedup on attach, orphan collection on detach.
//!
//! Tag identity is deduplicated by exact label within an account. Attaching
//! a label that already exists reuses the one tag row and only adds a
//! relation; detaching a tag from its last remaining note deletes the tag
//! row entirely, so an orphaned tag never outlives the detach call that
//! orphaned it.

use std::sync::Arc;

use tracing::{debug, trace};

use quill_core::{
    AttachTagRequest, Error, NoteRepository, Result, Tag, TagRepository, UpdateTagRequest,
};

/// The tag reconciliation engine. Holds no state of its own; every decision
/// is made against what the repositories report within the current call.
#[derive(Clone)]
pub struct TagService {
    tags: Arc<dyn TagRepository>,
    notes: Arc<dyn NoteRepository>,
}

impl TagService {
    pub fn new(tags: Arc<dyn TagRepository>, notes: Arc<dyn NoteRepository>) -> Self {
        Self { tags, notes }
    }

    /// Attach a label to a note, creating the tag only when the label is
    /// new for the account.
    ///
    /// Returns the resolved tag and whether anything was newly created: a
    /// fresh tag or a fresh relation both report `true`; re-attaching a
    /// label already on this note mutates nothing and reports `false`.
    ///
    /// The label scan is exact and case-sensitive, unlike the substring
    /// matching used for search. When the create loses a race against a
    /// concurrent attach of the same label, the store reports the label as
    /// duplicate and the winner's row is reused.
    pub async fn attach_or_create(
        &self,
        account_id: i64,
        note_id: i64,
        req: AttachTagRequest,
    ) -> Result<(Tag, bool)> {
        self.notes.get(account_id, note_id).await?;

        let existing = self.tags.list_by_account(account_id).await?;
        if let Some(tag) = existing.into_iter().find(|t| t.label == req.label) {
            debug!(
                subsystem = "service",
                component = "tag_service",
                op = "attach_or_create",
                account_id,
                note_id,
                tag_id = tag.id,
                "Label already exists, reusing tag"
            );
            return self.attach_existing(account_id, note_id, tag).await;
        }

        match self.tags.create(account_id, &req.label, &req.color).await {
            Ok(id) => {
                self.tags.assign(account_id, id, note_id).await?;
                debug!(
                    subsystem = "service",
                    component = "tag_service",
                    op = "attach_or_create",
                    account_id,
                    note_id,
                    tag_id = id,
                    "Created tag and assigned to note"
                );
                Ok((
                    Tag {
                        id,
                        label: req.label,
                        color: req.color,
                    },
                    true,
                ))
            }
            Err(Error::DuplicateLabel(_)) => {
                // Lost the race: another request inserted this label between
                // our scan and our insert. Re-read and reuse the winner.
                let winner = self
                    .tags
                    .list_by_account(account_id)
                    .await?
                    .into_iter()
                    .find(|t| t.label == req.label)
                    .ok_or_else(|| {
                        Error::Internal(format!(
                            "tag '{}' reported duplicate but not found on re-read",
                            req.label
                        ))
                    })?;
                self.attach_existing(account_id, note_id, winner).await
            }
            Err(e) => Err(e),
        }
    }

    async fn attach_existing(
        &self,
        account_id: i64,
        note_id: i64,
        tag: Tag,
    ) -> Result<(Tag, bool)> {
        let on_note = self.tags.list_by_note(account_id, note_id).await?;
        if on_note.iter().any(|t| t.id == tag.id) {
            return Ok((tag, false));
        }

        self.tags.assign(account_id, tag.id, note_id).await?;
        Ok((tag, true))
    }

    /// List every tag owned by the account.
    pub async fn get_all(&self, account_id: i64) -> Result<Vec<Tag>> {
        self.tags.list_by_account(account_id).await
    }

    /// List the tags on one of the account's notes (empty when untagged).
    pub async fn get_all_by_note(&self, account_id: i64, note_id: i64) -> Result<Vec<Tag>> {
        self.notes.get(account_id, note_id).await?;
        self.tags.list_by_note(account_id, note_id).await
    }

    /// Ownership-checked single-tag fetch.
    pub async fn get_one(&self, account_id: i64, tag_id: i64) -> Result<Tag> {
        self.tags.get(account_id, tag_id).await
    }

    /// Partial update: empty fields keep previous values. The label
    /// uniqueness scan is not re-run here; the store's constraint rejects a
    /// collision and the duplicate-label error propagates to the caller.
    pub async fn update(&self, account_id: i64, tag_id: i64, req: UpdateTagRequest) -> Result<()> {
        let prev = self.tags.get(account_id, tag_id).await?;

        let merged = Tag {
            id: tag_id,
            label: if req.label.is_empty() {
                prev.label
            } else {
                req.label
            },
            color: if req.color.is_empty() {
                prev.color
            } else {
                req.color
            },
        };

        self.tags.update(account_id, tag_id, &merged).await
    }

    /// Delete a tag outright; its relation rows go with it.
    pub async fn delete(&self, account_id: i64, tag_id: i64) -> Result<()> {
        self.tags.get(account_id, tag_id).await?;
        self.tags.delete(account_id, tag_id).await
    }

    /// Detach a tag from a note, collecting the tag when this was its last
    /// reference.
    ///
    /// Detaching a tag that is not on the note is a no-op success. After
    /// the relation row is removed, the account's other notes are scanned
    /// (by label, with the same substring semantics as search); only when
    /// none of them still carries the tag is the tag row deleted.
    pub async fn detach(&self, account_id: i64, tag_id: i64, note_id: i64) -> Result<()> {
        let mut note = self.notes.get(account_id, note_id).await?;
        let tag = self.tags.get(account_id, tag_id).await?;

        note.tags = self.tags.list_by_note(account_id, note_id).await?;
        if !note.has_specific_tag(&tag.label) {
            trace!(
                subsystem = "service",
                component = "tag_service",
                op = "detach",
                account_id,
                note_id,
                tag_id,
                "Tag not on note, nothing to detach"
            );
            return Ok(());
        }

        self.tags.remove(account_id, tag_id, note_id).await?;

        // Orphan collection: the tag survives only while some other note
        // still references it.
        let others = self.notes.list_by_account(account_id).await?;
        for mut other in others {
            if other.id == note_id {
                continue;
            }
            other.tags = self.tags.list_by_note(account_id, other.id).await?;
            if other.has_specific_tag(&tag.label) {
                trace!(
                    subsystem = "service",
                    component = "tag_service",
                    op = "detach",
                    account_id,
                    note_id = other.id,
                    tag_id,
                    "Tag still referenced, keeping it"
                );
                return Ok(());
            }
        }

        debug!(
            subsystem = "service",
            component = "tag_service",
            op = "detach",
            account_id,
            tag_id,
            "Last reference removed, deleting tag"
        );
        self.tags.delete(account_id, tag_id).await
    }
}
