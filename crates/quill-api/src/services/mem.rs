//! In-memory repository doubles for service tests.
//!
//! These implement the same traits as the PostgreSQL repositories, with the
//! same error contract: ownership-checked lookups, DuplicateUsername /
//! DuplicateLabel on uniqueness violations, cascading relation cleanup on
//! tag delete. `MemTagRepository` can additionally simulate losing the
//! create race to a concurrent attach.

use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use quill_core::{
    Account, AccountRepository, Error, NewAccount, Note, NoteRepository, Result, Tag,
    TagRepository,
};

#[derive(Default)]
pub struct MemAccountRepository {
    accounts: Mutex<Vec<Account>>,
    next_id: AtomicI64,
}

#[async_trait]
impl AccountRepository for MemAccountRepository {
    async fn create(&self, account: NewAccount) -> Result<i64> {
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.iter().any(|a| a.username == account.username) {
            return Err(Error::DuplicateUsername(account.username));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        accounts.push(Account {
            id,
            name: account.name,
            username: account.username,
            email: account.email,
            password_hash: account.password_hash,
        });
        Ok(id)
    }

    async fn find_by_username(&self, username: &str) -> Result<Account> {
        self.accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.username == username)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("account '{}'", username)))
    }

    async fn find_by_id(&self, id: i64) -> Result<Account> {
        self.accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("account {}", id)))
    }
}

#[derive(Default)]
pub struct MemNoteRepository {
    notes: Mutex<Vec<(i64, Note)>>,
    next_id: AtomicI64,
}

#[async_trait]
impl NoteRepository for MemNoteRepository {
    async fn create(&self, account_id: i64, note: &Note) -> Result<i64> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let mut stored = note.clone();
        stored.id = id;
        stored.tags = Vec::new();
        self.notes.lock().unwrap().push((account_id, stored));
        Ok(id)
    }

    async fn list_by_account(&self, account_id: i64) -> Result<Vec<Note>> {
        Ok(self
            .notes
            .lock()
            .unwrap()
            .iter()
            .filter(|(owner, _)| *owner == account_id)
            .map(|(_, n)| n.clone())
            .collect())
    }

    async fn get(&self, account_id: i64, note_id: i64) -> Result<Note> {
        self.notes
            .lock()
            .unwrap()
            .iter()
            .find(|(owner, n)| *owner == account_id && n.id == note_id)
            .map(|(_, n)| n.clone())
            .ok_or(Error::NoteNotFound(note_id))
    }

    async fn update(&self, account_id: i64, note: &Note) -> Result<()> {
        let mut notes = self.notes.lock().unwrap();
        if let Some((_, stored)) = notes
            .iter_mut()
            .find(|(owner, n)| *owner == account_id && n.id == note.id)
        {
            let mut updated = note.clone();
            updated.tags = Vec::new();
            *stored = updated;
        }
        Ok(())
    }

    async fn delete(&self, account_id: i64, note_id: i64) -> Result<()> {
        self.notes
            .lock()
            .unwrap()
            .retain(|(owner, n)| !(*owner == account_id && n.id == note_id));
        Ok(())
    }
}

#[derive(Default)]
pub struct MemTagRepository {
    tags: Mutex<Vec<(i64, Tag)>>,
    relations: Mutex<HashSet<(i64, i64)>>, // (note_id, tag_id)
    next_id: AtomicI64,
    /// When set, the next `create` for this label behaves as if a
    /// concurrent request inserted the row first: the tag appears in the
    /// store and the call reports DuplicateLabel.
    race_label: Mutex<Option<(i64, String, String)>>,
}

impl MemTagRepository {
    /// Arrange for the next create of `label` under `account_id` to lose
    /// the race against a simulated concurrent attach.
    pub fn lose_create_race(&self, account_id: i64, label: &str, color: &str) {
        *self.race_label.lock().unwrap() =
            Some((account_id, label.to_string(), color.to_string()));
    }

    fn insert_tag(&self, account_id: i64, label: &str, color: &str) -> i64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.tags.lock().unwrap().push((
            account_id,
            Tag {
                id,
                label: label.to_string(),
                color: color.to_string(),
            },
        ));
        id
    }
}

#[async_trait]
impl TagRepository for MemTagRepository {
    async fn create(&self, account_id: i64, label: &str, color: &str) -> Result<i64> {
        let race = self.race_label.lock().unwrap().take();
        if let Some((race_account, race_label, race_color)) = race {
            if race_account == account_id && race_label == label {
                self.insert_tag(account_id, &race_label, &race_color);
                return Err(Error::DuplicateLabel(label.to_string()));
            }
        }

        if self
            .tags
            .lock()
            .unwrap()
            .iter()
            .any(|(owner, t)| *owner == account_id && t.label == label)
        {
            return Err(Error::DuplicateLabel(label.to_string()));
        }
        Ok(self.insert_tag(account_id, label, color))
    }

    async fn list_by_account(&self, account_id: i64) -> Result<Vec<Tag>> {
        Ok(self
            .tags
            .lock()
            .unwrap()
            .iter()
            .filter(|(owner, _)| *owner == account_id)
            .map(|(_, t)| t.clone())
            .collect())
    }

    async fn list_by_note(&self, account_id: i64, note_id: i64) -> Result<Vec<Tag>> {
        let relations = self.relations.lock().unwrap();
        Ok(self
            .tags
            .lock()
            .unwrap()
            .iter()
            .filter(|(owner, t)| *owner == account_id && relations.contains(&(note_id, t.id)))
            .map(|(_, t)| t.clone())
            .collect())
    }

    async fn get(&self, account_id: i64, tag_id: i64) -> Result<Tag> {
        self.tags
            .lock()
            .unwrap()
            .iter()
            .find(|(owner, t)| *owner == account_id && t.id == tag_id)
            .map(|(_, t)| t.clone())
            .ok_or(Error::TagNotFound(tag_id))
    }

    async fn update(&self, account_id: i64, tag_id: i64, tag: &Tag) -> Result<()> {
        let mut tags = self.tags.lock().unwrap();
        if tags
            .iter()
            .any(|(owner, t)| *owner == account_id && t.id != tag_id && t.label == tag.label)
        {
            return Err(Error::DuplicateLabel(tag.label.clone()));
        }
        if let Some((_, stored)) = tags
            .iter_mut()
            .find(|(owner, t)| *owner == account_id && t.id == tag_id)
        {
            stored.label = tag.label.clone();
            stored.color = tag.color.clone();
        }
        Ok(())
    }

    async fn delete(&self, account_id: i64, tag_id: i64) -> Result<()> {
        self.tags
            .lock()
            .unwrap()
            .retain(|(owner, t)| !(*owner == account_id && t.id == tag_id));
        // Emulates the relation foreign key cascade.
        self.relations
            .lock()
            .unwrap()
            .retain(|(_, tid)| *tid != tag_id);
        Ok(())
    }

    async fn assign(&self, _account_id: i64, tag_id: i64, note_id: i64) -> Result<()> {
        self.relations.lock().unwrap().insert((note_id, tag_id));
        Ok(())
    }

    async fn remove(&self, _account_id: i64, tag_id: i64, note_id: i64) -> Result<()> {
        self.relations.lock().unwrap().remove(&(note_id, tag_id));
        Ok(())
    }
}
