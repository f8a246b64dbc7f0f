//! Session-scoped note operations against the in-memory store.

use std::sync::Arc;

use notekeep_db::MemoryStore;
use notekeep_editor::{
    AutosaveConfig, Draft, Error, NoteService, SaveRequest, StaticSession, TracingNotifier, User,
};

fn user(id: &str) -> User {
    User {
        id: id.to_string(),
        email: format!("{id}@example.com"),
        name: Some(id.to_uppercase()),
    }
}

fn service(store: &MemoryStore, user_id: &str) -> NoteService {
    NoteService::in_memory(
        store.clone(),
        Arc::new(StaticSession::signed_in(user(user_id))),
        AutosaveConfig::default(),
    )
}

async fn create(service: &NoteService, owner: &str, title: &str, content: &str, tags: &[&str]) -> uuid::Uuid {
    service
        .gateway()
        .save(SaveRequest {
            identity: None,
            owner_id: owner.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            expected_version: None,
        })
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn test_list_notes_newest_first_and_owner_scoped() {
    let store = MemoryStore::new();
    let alice = service(&store, "alice");
    let bob = service(&store, "bob");

    let first = create(&alice, "alice", "First", "one", &["a"]).await;
    let second = create(&alice, "alice", "Second", "two", &[]).await;
    create(&bob, "bob", "Bob's", "three", &[]).await;

    let notes = alice.list_notes().await.unwrap();
    let ids: Vec<_> = notes.iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![second, first]);
    assert_eq!(notes[1].tags, vec!["a".to_string()]);

    assert_eq!(bob.list_notes().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_search_matches_every_term_case_insensitively() {
    let store = MemoryStore::new();
    let alice = service(&store, "alice");

    create(&alice, "alice", "Groceries", "Milk and eggs", &[]).await;
    create(&alice, "alice", "Recipes", "Eggs benedict", &[]).await;
    create(&alice, "alice", "Travel", "Pack bags", &[]).await;

    let hits = alice.search_notes("EGGS").await.unwrap();
    assert_eq!(hits.len(), 2);

    let hits = alice.search_notes("milk eggs").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "Groceries");

    let everything = alice.search_notes("   ").await.unwrap();
    assert_eq!(everything.len(), 3);
}

#[tokio::test]
async fn test_delete_is_owner_scoped_and_keeps_tags() {
    let store = MemoryStore::new();
    let alice = service(&store, "alice");
    let bob = service(&store, "bob");

    let id = create(&alice, "alice", "Doomed", "bye", &["work"]).await;

    let err = bob.delete_note(id).await.unwrap_err();
    assert!(matches!(err, Error::NoteNotFound(_)));

    alice.delete_note(id).await.unwrap();
    assert!(matches!(
        alice.get_note(id).await,
        Err(Error::NoteNotFound(_))
    ));

    let tags = alice.list_tags().await.unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].name, "work");
    assert_eq!(tags[0].note_count, 0);
}

#[tokio::test]
async fn test_list_tags_counts_notes() {
    let store = MemoryStore::new();
    let alice = service(&store, "alice");

    create(&alice, "alice", "One", "1", &["Work", "home"]).await;
    create(&alice, "alice", "Two", "2", &["work"]).await;

    let counts: Vec<(String, i64)> = alice
        .list_tags()
        .await
        .unwrap()
        .into_iter()
        .map(|t| (t.name, t.note_count))
        .collect();
    assert_eq!(
        counts,
        vec![("home".to_string(), 1), ("work".to_string(), 2)]
    );
}

#[tokio::test]
async fn test_signed_out_calls_are_unauthorized() {
    let store = MemoryStore::new();
    let service = NoteService::in_memory(
        store,
        Arc::new(StaticSession::signed_out()),
        AutosaveConfig::default(),
    );

    assert!(matches!(
        service.list_notes().await,
        Err(Error::Unauthorized(_))
    ));
    assert!(matches!(
        service.list_tags().await,
        Err(Error::Unauthorized(_))
    ));
}

#[tokio::test]
async fn test_edit_note_seeds_editor_from_storage() {
    let store = MemoryStore::new();
    let alice = service(&store, "alice");
    let id = create(&alice, "alice", "Seeded", "body", &["x"]).await;

    let editor = alice.edit_note(id, Arc::new(TracingNotifier)).await.unwrap();
    assert_eq!(
        editor.draft(),
        Draft {
            identity: Some(id),
            title: "Seeded".to_string(),
            content: "body".to_string(),
            tags: vec!["x".to_string()],
        }
    );
    editor.close().await;

    let bob = service(&store, "bob");
    assert!(bob.edit_note(id, Arc::new(TracingNotifier)).await.is_err());
}
