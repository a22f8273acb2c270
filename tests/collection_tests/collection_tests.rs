//! Tests for Collection
//!
//! These tests verify:
//! - Insert metadata (_id, createdAt, updatedAt)
//! - insert_many fan-out and partial failure reporting
//! - Update merge rules and timestamp refresh
//! - Delete / count semantics
//! - Corrupt payloads fail operations instead of being skipped

use std::fs;
use std::sync::Arc;
use std::thread;

use atlasdoc::document::{CREATED_AT_KEY, ID_KEY, UPDATED_AT_KEY};
use atlasdoc::storage::{FileStorage, MemoryStorage, StorageEngine};
use atlasdoc::{codec, doc, AtlasError, Collection, Config, Database, Filter, Value};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_collection() -> (TempDir, Database, Collection) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .insert_parallelism(4)
        .build();
    let db = Database::open(config).unwrap();
    let users = db.collection("users");
    (temp_dir, db, users)
}

fn memory_collection(parallelism: usize) -> Collection {
    Collection::new("users", Arc::new(MemoryStorage::new()), parallelism)
}

// =============================================================================
// Insert Tests
// =============================================================================

#[test]
fn test_insert_assigns_metadata() {
    let (_temp, _db, users) = setup_temp_collection();

    let stored = users.insert(doc! { "name" => "alice", "age" => 30 }).unwrap();

    let id = stored.id().unwrap();
    assert!(!id.is_empty());
    assert_eq!(stored.get("name"), Some(&Value::from("alice")));
    assert_eq!(stored.get("age"), Some(&Value::Int(30)));
    assert!(stored.created_at().is_some());
    assert_eq!(stored.created_at(), stored.updated_at());
}

#[test]
fn test_insert_replaces_caller_metadata() {
    let (_temp, _db, users) = setup_temp_collection();

    let stored = users
        .insert(doc! {
            ID_KEY => "chosen-by-caller",
            CREATED_AT_KEY => "1970-01-01T00:00:00.000Z",
            "name" => "bob",
        })
        .unwrap();

    assert_ne!(stored.id(), Some("chosen-by-caller"));
    assert_ne!(stored.created_at(), Some("1970-01-01T00:00:00.000Z"));
    assert!(users.find_by_id("chosen-by-caller").unwrap().is_none());
}

#[test]
fn test_insert_ids_are_unique() {
    let users = memory_collection(1);

    let mut ids = std::collections::HashSet::new();
    for i in 0..200 {
        let stored = users.insert(doc! { "n" => i }).unwrap();
        assert!(ids.insert(stored.id().unwrap().to_string()));
    }
}

#[test]
fn test_find_by_id_returns_inserted_document() {
    let (_temp, _db, users) = setup_temp_collection();

    let stored = users
        .insert(doc! { "name" => "carol", "tags" => vec!["x", "y"], "nested" => doc! { "k" => 1.5 } })
        .unwrap();

    let found = users.find_by_id(stored.id().unwrap()).unwrap();

    assert_eq!(found, Some(stored));
}

#[test]
fn test_find_by_id_absent_is_none() {
    let (_temp, _db, users) = setup_temp_collection();

    assert_eq!(users.find_by_id("does-not-exist").unwrap(), None);
}

#[test]
fn test_insert_unsupported_value_persists_nothing() {
    let (_temp, _db, users) = setup_temp_collection();

    let err = users.insert(doc! { "bad" => f64::NAN }).unwrap_err();

    assert!(matches!(err, AtlasError::UnsupportedValue { .. }));
    assert_eq!(users.count(Filter::all()).unwrap(), 0);
}

#[test]
fn test_concurrent_inserts() {
    let (_temp, _db, users) = setup_temp_collection();

    let mut handles = vec![];
    for t in 0..4 {
        let users_clone = users.clone();
        handles.push(thread::spawn(move || {
            for i in 0..25 {
                users_clone.insert(doc! { "thread" => t, "i" => i }).unwrap();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(users.count(Filter::all()).unwrap(), 100);
    assert_eq!(users.count(doc! { "thread" => 2 }).unwrap(), 25);
}

// =============================================================================
// Insert Many Tests
// =============================================================================

#[test]
fn test_insert_many_preserves_input_order() {
    let (_temp, _db, users) = setup_temp_collection();

    let docs = (0..10).map(|i| doc! { "n" => i }).collect();
    let stored = users.insert_many(docs).unwrap();

    assert_eq!(stored.len(), 10);
    for (i, document) in stored.iter().enumerate() {
        assert_eq!(document.get("n"), Some(&Value::Int(i as i64)));
        assert!(document.id().is_some());
    }
    assert_eq!(users.count(Filter::all()).unwrap(), 10);
}

#[test]
fn test_insert_many_empty() {
    let (_temp, _db, users) = setup_temp_collection();

    assert!(users.insert_many(Vec::new()).unwrap().is_empty());
}

#[test]
fn test_insert_many_more_workers_than_documents() {
    let users = memory_collection(16);

    let stored = users
        .insert_many(vec![doc! { "n" => 1 }, doc! { "n" => 2 }])
        .unwrap();

    assert_eq!(stored.len(), 2);
    assert_eq!(users.count(Filter::all()).unwrap(), 2);
}

#[test]
fn test_insert_many_partial_failure_is_reported() {
    for parallelism in [1, 3] {
        let users = memory_collection(parallelism);

        let docs = vec![
            doc! { "n" => 0 },
            doc! { "n" => 1 },
            doc! { "n" => 2, "bad" => f64::INFINITY },
            doc! { "n" => 3 },
            doc! { "n" => 4, "bad" => f64::NAN },
        ];

        let err = users.insert_many(docs).unwrap_err();

        match err {
            AtlasError::PartialInsert {
                inserted,
                attempted,
                source,
            } => {
                assert_eq!(attempted, 5);
                let ns: Vec<_> = inserted.iter().map(|d| d.get("n").cloned()).collect();
                assert_eq!(
                    ns,
                    vec![Some(Value::Int(0)), Some(Value::Int(1)), Some(Value::Int(3))]
                );
                assert!(matches!(*source, AtlasError::UnsupportedValue { .. }));
            }
            other => panic!("Expected PartialInsert, got {:?}", other),
        }

        // No rollback of what was stored
        assert_eq!(users.count(Filter::all()).unwrap(), 3);
    }
}

#[test]
fn test_insert_many_total_failure_returns_first_error() {
    let users = memory_collection(2);

    let err = users
        .insert_many(vec![doc! { "a" => f64::NAN }, doc! { "b" => f64::NAN }])
        .unwrap_err();

    match err {
        AtlasError::UnsupportedValue { field, .. } => assert_eq!(field, "a"),
        other => panic!("Expected UnsupportedValue, got {:?}", other),
    }
}

// =============================================================================
// Update Tests
// =============================================================================

#[test]
fn test_update_merges_patch_fields() {
    let (_temp, _db, users) = setup_temp_collection();
    let stored = users
        .insert(doc! { "name" => "dave", "age" => 20, "city" => "Oslo" })
        .unwrap();

    let count = users
        .update(doc! { "name" => "dave" }, doc! { "age" => 21, "email" => "d@x.io" })
        .unwrap();

    assert_eq!(count, 1);
    let updated = users.find_by_id(stored.id().unwrap()).unwrap().unwrap();
    assert_eq!(updated.get("age"), Some(&Value::Int(21)));
    assert_eq!(updated.get("email"), Some(&Value::from("d@x.io")));
    assert_eq!(updated.get("city"), Some(&Value::from("Oslo")));
}

#[test]
fn test_update_never_changes_id_or_created_at() {
    let (_temp, _db, users) = setup_temp_collection();
    let stored = users.insert(doc! { "name" => "erin" }).unwrap();
    let id = stored.id().unwrap().to_string();

    users
        .update(
            Filter::by_id(&id),
            doc! {
                ID_KEY => "hijacked",
                CREATED_AT_KEY => "1970-01-01T00:00:00.000Z",
                UPDATED_AT_KEY => "1970-01-01T00:00:00.000Z",
            },
        )
        .unwrap();

    let updated = users.find_by_id(&id).unwrap().unwrap();
    assert_eq!(updated.id(), Some(id.as_str()));
    assert_eq!(updated.created_at(), stored.created_at());
    assert!(updated.updated_at().unwrap() >= stored.updated_at().unwrap());
    assert!(users.find_by_id("hijacked").unwrap().is_none());
}

#[test]
fn test_update_refreshes_updated_at() {
    let (_temp, _db, users) = setup_temp_collection();
    let stored = users.insert(doc! { "n" => 1 }).unwrap();

    thread::sleep(std::time::Duration::from_millis(5));
    users.update(Filter::by_id(stored.id().unwrap()), doc! { "n" => 2 }).unwrap();

    let updated = users.find_by_id(stored.id().unwrap()).unwrap().unwrap();
    assert!(updated.updated_at().unwrap() > stored.updated_at().unwrap());
}

#[test]
fn test_update_updated_at_never_moves_backwards() {
    let storage: Arc<dyn StorageEngine> = Arc::new(MemoryStorage::new());
    let users = Collection::new("users", Arc::clone(&storage), 1);

    // A document stamped in the future, e.g. by a host with a fast clock
    let future = "2999-01-01T00:00:00.000Z";
    let document = doc! { ID_KEY => "x1", CREATED_AT_KEY => future, UPDATED_AT_KEY => future };
    storage.write("users", "x1", &codec::encode(&document).unwrap()).unwrap();

    users.update_by_id("x1", doc! { "n" => 1 }).unwrap();

    let updated = users.find_by_id("x1").unwrap().unwrap();
    assert_eq!(updated.updated_at(), Some(future));
}

#[test]
fn test_update_counts_every_match() {
    let (_temp, _db, users) = setup_temp_collection();
    for i in 0..5 {
        users.insert(doc! { "group" => if i < 3 { "a" } else { "b" } }).unwrap();
    }

    assert_eq!(users.update(doc! { "group" => "a" }, doc! { "seen" => true }).unwrap(), 3);
    assert_eq!(users.count(doc! { "seen" => true }).unwrap(), 3);
    assert_eq!(users.update(doc! { "group" => "zzz" }, doc! { "seen" => true }).unwrap(), 0);
}

#[test]
fn test_update_with_unsupported_patch_changes_nothing() {
    let (_temp, _db, users) = setup_temp_collection();
    let stored = users.insert(doc! { "n" => 1 }).unwrap();

    let err = users.update(Filter::all(), doc! { "n" => f64::NAN }).unwrap_err();

    assert!(matches!(err, AtlasError::UnsupportedValue { .. }));
    assert_eq!(users.find_by_id(stored.id().unwrap()).unwrap(), Some(stored));
}

#[test]
fn test_update_one_touches_single_document() {
    let (_temp, _db, users) = setup_temp_collection();
    for _ in 0..3 {
        users.insert(doc! { "status" => "new" }).unwrap();
    }

    assert!(users.update_one(doc! { "status" => "new" }, doc! { "status" => "done" }).unwrap());

    assert_eq!(users.count(doc! { "status" => "new" }).unwrap(), 2);
    assert_eq!(users.count(doc! { "status" => "done" }).unwrap(), 1);
}

#[test]
fn test_update_one_without_match() {
    let (_temp, _db, users) = setup_temp_collection();

    assert!(!users.update_one(doc! { "status" => "new" }, doc! { "x" => 1 }).unwrap());
}

#[test]
fn test_update_by_id() {
    let (_temp, _db, users) = setup_temp_collection();
    let stored = users.insert(doc! { "name" => "fay" }).unwrap();

    assert!(users.update_by_id(stored.id().unwrap(), doc! { "name" => "faye" }).unwrap());
    assert!(!users.update_by_id("missing", doc! { "name" => "nobody" }).unwrap());

    let updated = users.find_by_id(stored.id().unwrap()).unwrap().unwrap();
    assert_eq!(updated.get("name"), Some(&Value::from("faye")));
}

// =============================================================================
// Delete / Count Tests
// =============================================================================

#[test]
fn test_delete_by_filter_returns_count() {
    let (_temp, _db, users) = setup_temp_collection();
    for i in 0..6 {
        users.insert(doc! { "even" => i % 2 == 0 }).unwrap();
    }

    assert_eq!(users.delete(doc! { "even" => true }).unwrap(), 3);
    assert_eq!(users.count(Filter::all()).unwrap(), 3);
    assert_eq!(users.count(doc! { "even" => true }).unwrap(), 0);
    assert_eq!(users.delete(doc! { "even" => true }).unwrap(), 0);
}

#[test]
fn test_delete_one_removes_single_match() {
    let (_temp, _db, users) = setup_temp_collection();
    for _ in 0..3 {
        users.insert(doc! { "kind" => "temp" }).unwrap();
    }

    assert!(users.delete_one(doc! { "kind" => "temp" }).unwrap());
    assert_eq!(users.count(doc! { "kind" => "temp" }).unwrap(), 2);
    assert!(!users.delete_one(doc! { "kind" => "other" }).unwrap());
}

#[test]
fn test_delete_by_id_then_find_by_id_is_none() {
    let (_temp, _db, users) = setup_temp_collection();
    let stored = users.insert(doc! { "name" => "gus" }).unwrap();
    let id = stored.id().unwrap();

    assert!(users.delete_by_id(id).unwrap());

    assert_eq!(users.find_by_id(id).unwrap(), None);
    assert!(!users.delete_by_id(id).unwrap());
}

#[test]
fn test_count_on_empty_collection() {
    let (_temp, _db, users) = setup_temp_collection();

    assert_eq!(users.count(Filter::all()).unwrap(), 0);
}

// =============================================================================
// Corruption Tests
// =============================================================================

#[test]
fn test_corrupt_file_fails_query_instead_of_being_skipped() {
    let (temp, _db, users) = setup_temp_collection();
    users.insert(doc! { "name" => "ok" }).unwrap();
    fs::write(temp.path().join("users").join("broken.doc"), b"\x05garbage").unwrap();

    assert!(matches!(users.find(Filter::all()).exec(), Err(AtlasError::CorruptPayload(_))));
    assert!(matches!(users.count(Filter::all()), Err(AtlasError::CorruptPayload(_))));
    assert!(matches!(users.delete(Filter::all()), Err(AtlasError::CorruptPayload(_))));
}

#[test]
fn test_corrupt_file_fails_find_by_id() {
    let (temp, _db, users) = setup_temp_collection();
    fs::create_dir_all(temp.path().join("users")).unwrap();
    fs::write(temp.path().join("users").join("broken.doc"), b"").unwrap();

    assert!(matches!(users.find_by_id("broken"), Err(AtlasError::CorruptPayload(_))));
}

#[test]
fn test_stored_document_without_id_is_corrupt() {
    let temp_dir = TempDir::new().unwrap();
    let storage = Arc::new(FileStorage::open(temp_dir.path(), "doc", atlasdoc::WriteMode::Direct).unwrap());
    let users = Collection::new("users", storage.clone(), 1);

    let payload = codec::encode(&doc! { "name" => "anonymous" }).unwrap();
    storage.write("users", "anon", &payload).unwrap();

    assert!(matches!(users.find_by_id("anon"), Err(AtlasError::CorruptPayload(_))));
    assert!(matches!(users.count(Filter::all()), Err(AtlasError::CorruptPayload(_))));
}
