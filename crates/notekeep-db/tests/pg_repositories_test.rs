//! PostgreSQL repository integration tests.
//!
//! Require a reachable database (`DATABASE_URL` or the default test URL).
//! Run with `cargo test -p notekeep-db -- --ignored`.

use notekeep_db::test_fixtures::TestDatabase;
use notekeep_db::{CreateNoteRequest, Error, NoteRepository, TagRepository, UpdateNoteRequest};

async fn setup() -> (TestDatabase, String) {
    dotenvy::dotenv().ok();
    let test_db = TestDatabase::new().await;
    let owner = test_db.unique_owner();
    (test_db, owner)
}

fn note_req(owner: &str, title: &str, content: &str) -> CreateNoteRequest {
    CreateNoteRequest {
        owner_id: owner.to_string(),
        title: title.to_string(),
        content: content.to_string(),
    }
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_note_ownership_is_enforced() {
    let (test_db, owner) = setup().await;
    let other = test_db.unique_owner();
    let notes = &test_db.db.notes;

    let rev = notes
        .insert(note_req(&owner, "Mine", "Secret"))
        .await
        .expect("insert");

    assert!(notes.fetch_owned(rev.id, &other).await.unwrap().is_none());

    let err = notes
        .update_owned(UpdateNoteRequest {
            id: rev.id,
            owner_id: other.clone(),
            title: "Hijack".to_string(),
            content: "Hijack".to_string(),
            expected_version: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NoteNotFound(id) if id == rev.id));

    let err = notes.delete_owned(rev.id, &other).await.unwrap_err();
    assert!(err.is_not_found());

    test_db.cleanup_owner(&owner).await;
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_update_version_conflict() {
    let (test_db, owner) = setup().await;
    let notes = &test_db.db.notes;

    let rev = notes.insert(note_req(&owner, "T", "C")).await.unwrap();
    let update = |expected| UpdateNoteRequest {
        id: rev.id,
        owner_id: owner.clone(),
        title: "T2".to_string(),
        content: "C2".to_string(),
        expected_version: expected,
    };

    let v2 = notes.update_owned(update(Some(1))).await.unwrap();
    assert_eq!(v2.version, 2);

    let err = notes.update_owned(update(Some(1))).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Conflict {
            expected: 1,
            actual: 2,
            ..
        }
    ));

    // No expected version: last write wins
    let v3 = notes.update_owned(update(None)).await.unwrap();
    assert_eq!(v3.version, 3);

    test_db.cleanup_owner(&owner).await;
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_tag_unique_violation_maps_to_already_exists() {
    let (test_db, owner) = setup().await;
    let tags = &test_db.db.tags;

    tags.insert(&owner, "work").await.unwrap();
    let err = tags.insert(&owner, "work").await.unwrap_err();
    assert!(matches!(err, Error::AlreadyExists(_)));

    let found = tags
        .find_many(&owner, &["work".to_string(), "missing".to_string()])
        .await
        .unwrap();
    assert_eq!(found.len(), 1);

    test_db.cleanup_owner(&owner).await;
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_apply_associations_diff_and_listing() {
    let (test_db, owner) = setup().await;
    let db = &test_db.db;

    let rev = db.notes.insert(note_req(&owner, "T", "C")).await.unwrap();
    let draft = db.tags.insert(&owner, "draft").await.unwrap();
    let work = db.tags.insert(&owner, "work").await.unwrap();

    db.tags
        .apply_associations(rev.id, &[draft.id], &[])
        .await
        .unwrap();
    db.tags
        .apply_associations(rev.id, &[work.id, work.id], &[draft.id])
        .await
        .unwrap();

    let note = db.notes.fetch_owned(rev.id, &owner).await.unwrap().unwrap();
    assert_eq!(note.tags, vec!["work".to_string()]);

    let counts = db.tags.list_with_counts(&owner).await.unwrap();
    let by_name: Vec<(String, i64)> = counts.into_iter().map(|t| (t.name, t.note_count)).collect();
    assert_eq!(
        by_name,
        vec![("draft".to_string(), 0), ("work".to_string(), 1)]
    );

    test_db.cleanup_owner(&owner).await;
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_search_escapes_wildcards() {
    let (test_db, owner) = setup().await;
    let notes = &test_db.db.notes;

    notes
        .insert(note_req(&owner, "Budget", "Spent 100% of it"))
        .await
        .unwrap();
    notes
        .insert(note_req(&owner, "Other", "Spent 1000 coins"))
        .await
        .unwrap();

    let hits = notes.search(&owner, &["100%".to_string()]).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "Budget");

    test_db.cleanup_owner(&owner).await;
}
