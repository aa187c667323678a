//! End-to-end flow over the full service stack (in-memory stores):
//! register an account, create notes, share a tag across them, then detach
//! until the tag is collected.

use std::sync::Arc;

use quill_core::{AttachTagRequest, CreateNoteRequest, Error, LoginRequest, RegisterRequest};

use crate::auth::{decode_token, AuthConfig};
use crate::services::mem::{MemAccountRepository, MemNoteRepository, MemTagRepository};
use crate::services::{AccountService, NoteService, TagService};

#[tokio::test]
async fn test_register_note_tag_detach_lifecycle() {
    let auth = AuthConfig::new("scenario-secret".to_string());
    let accounts = Arc::new(MemAccountRepository::default());
    let notes = Arc::new(MemNoteRepository::default());
    let tags = Arc::new(MemTagRepository::default());

    let account_service = AccountService::new(accounts, auth.clone());
    let note_service = NoteService::new(notes.clone(), tags.clone());
    let tag_service = TagService::new(tags, notes);

    // register and log in
    let account_id = account_service
        .register(RegisterRequest {
            name: "Ada".to_string(),
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "hunter22".to_string(),
        })
        .await
        .unwrap();
    let login = account_service
        .login(LoginRequest {
            username: "ada".to_string(),
            password: "hunter22".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(decode_token(&login.token, &auth).unwrap(), account_id);

    // create a note and tag it
    let first = note_service
        .create(
            account_id,
            CreateNoteRequest {
                header: "Groceries".to_string(),
                body: "milk".to_string(),
                color: "FFAAAA".to_string(),
            },
        )
        .await
        .unwrap();
    let (tag, created) = tag_service
        .attach_or_create(
            account_id,
            first,
            AttachTagRequest {
                label: "errand".to_string(),
                color: String::new(),
            },
        )
        .await
        .unwrap();
    assert!(created);

    // attach the same label to a second note: one tag row, two relations
    let second = note_service
        .create(
            account_id,
            CreateNoteRequest {
                header: "Pharmacy".to_string(),
                body: "aspirin".to_string(),
                color: "FFAAAA".to_string(),
            },
        )
        .await
        .unwrap();
    let (reused, created) = tag_service
        .attach_or_create(
            account_id,
            second,
            AttachTagRequest {
                label: "errand".to_string(),
                color: String::new(),
            },
        )
        .await
        .unwrap();
    assert!(created);
    assert_eq!(reused.id, tag.id);
    assert_eq!(tag_service.get_all(account_id).await.unwrap().len(), 1);

    let found = note_service
        .find_by_tags(account_id, &["errand".to_string()])
        .await
        .unwrap();
    assert_eq!(found.len(), 2);

    // detach from the first note: the tag survives on the second
    tag_service.detach(account_id, tag.id, first).await.unwrap();
    assert!(tag_service.get_one(account_id, tag.id).await.is_ok());
    assert_eq!(
        tag_service
            .get_all_by_note(account_id, second)
            .await
            .unwrap()
            .len(),
        1
    );

    // detach from the second note: last reference, tag is collected
    tag_service
        .detach(account_id, tag.id, second)
        .await
        .unwrap();
    let err = tag_service.get_one(account_id, tag.id).await.unwrap_err();
    assert!(matches!(err, Error::TagNotFound(_)));
}
