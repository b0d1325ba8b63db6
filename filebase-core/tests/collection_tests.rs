//! Integration tests for FileCollection
//!
//! CRUD over one array of a document file, the hole-leaving removal,
//! the compact alternative and persistence across instances.

use filebase_core::{Collection, FileBaseError, FileCollection, Query, RemoveOptions};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Item {
    id: i64,
    v: String,
}

fn item(id: i64, v: &str) -> Item {
    Item { id, v: v.to_string() }
}

fn temp_path(temp: &TempDir, name: &str) -> PathBuf {
    temp.path().join(name)
}

fn write_file(path: &Path, value: Value) {
    std::fs::write(path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
}

/// Collection `items` over a file holding `{id:1,v:"x"}` and `{id:2,v:"y"}`
fn two_items(temp: &TempDir) -> FileCollection<Value> {
    let path = temp_path(temp, "items.json");
    write_file(
        &path,
        json!({"items": [{"id": 1, "v": "x"}, {"id": 2, "v": "y"}]}),
    );
    FileCollection::open("items", path)
}

// ========== FIND ==========

#[tokio::test]
async fn test_find_empty_query_returns_everything() {
    let temp = TempDir::new().unwrap();
    let items = two_items(&temp);

    let all = items.find(&Query::new()).await.unwrap();
    assert_eq!(all, vec![json!({"id": 1, "v": "x"}), json!({"id": 2, "v": "y"})]);
}

#[tokio::test]
async fn test_find_filters_by_every_field() {
    let temp = TempDir::new().unwrap();
    let items = two_items(&temp);

    let found = items.find(&Query::new().eq("v", "y")).await.unwrap();
    assert_eq!(found, vec![json!({"id": 2, "v": "y"})]);

    let none = items.find(&Query::new().eq("id", 1).eq("v", "y")).await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_find_one_is_first_match_or_none() {
    let temp = TempDir::new().unwrap();
    let items = two_items(&temp);

    assert_eq!(
        items.find_one(&Query::new()).await.unwrap(),
        Some(json!({"id": 1, "v": "x"}))
    );
    assert_eq!(items.find_one(&Query::new().eq("id", 42)).await.unwrap(), None);
}

#[tokio::test]
async fn test_find_wraps_records_into_models() {
    let temp = TempDir::new().unwrap();
    let path = temp_path(&temp, "items.json");
    write_file(&path, json!({"items": [{"id": 7, "v": "seven"}]}));

    let items: FileCollection<Item> = FileCollection::open("items", &path);
    let found = items.find_one(&Query::new().eq("id", 7)).await.unwrap();
    assert_eq!(found, Some(item(7, "seven")));
}

#[tokio::test]
async fn test_find_where_accepts_closures() {
    let temp = TempDir::new().unwrap();
    let items = two_items(&temp);

    let big = |record: &Value| record["id"].as_i64().map_or(false, |id| id > 1);
    let found = items.find_where(&big).await.unwrap();
    assert_eq!(found, vec![json!({"id": 2, "v": "y"})]);
}

// ========== ADD ==========

#[tokio::test]
async fn test_add_appends_in_order() {
    let temp = TempDir::new().unwrap();
    let path = temp_path(&temp, "items.json");
    write_file(&path, json!({"items": [{"id": 1, "v": "x"}]}));

    let items: FileCollection<Item> = FileCollection::open("items", &path);
    items.add(&[item(2, "a"), item(3, "b")]).await.unwrap();

    let all = items.find(&Query::new()).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[1..], [item(2, "a"), item(3, "b")]);
}

#[tokio::test]
async fn test_add_is_in_memory_only() {
    let temp = TempDir::new().unwrap();
    let path = temp_path(&temp, "items.json");
    write_file(&path, json!({"items": []}));

    let items: FileCollection<Item> = FileCollection::open("items", &path);
    items.add_one(&item(1, "x")).await.unwrap();

    let on_disk: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk, json!({"items": []}));
    assert_eq!(items.data().unwrap(), vec![json!({"id": 1, "v": "x"})]);
}

#[tokio::test]
async fn test_add_creates_missing_collection_key() {
    let temp = TempDir::new().unwrap();
    let path = temp_path(&temp, "doc.json");
    write_file(&path, json!({"other": [1]}));

    let tags: FileCollection<Value> = FileCollection::open("tags", &path);
    assert!(tags.find(&Query::new()).await.unwrap().is_empty());

    tags.add_one(&json!("rust")).await.unwrap();
    tags.save().await.unwrap();

    let on_disk: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk, json!({"other": [1], "tags": ["rust"]}));
}

// ========== REMOVE ==========

#[tokio::test]
async fn test_remove_one_leaves_a_hole() {
    let temp = TempDir::new().unwrap();
    let items = two_items(&temp);

    let removed = items
        .remove_one(&Query::new().eq("id", 1), RemoveOptions::default())
        .await
        .unwrap();
    assert!(removed);

    let data = items.data().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0], Value::Null);
    assert_eq!(data[1], json!({"id": 2, "v": "y"}));

    // The hole is still enumerated by an empty query
    assert_eq!(items.find(&Query::new()).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_remove_one_fills_only_the_first_match() {
    let temp = TempDir::new().unwrap();
    let path = temp_path(&temp, "items.json");
    write_file(&path, json!({"items": [{"k": 1}, {"k": 1}, {"k": 2}]}));
    let items: FileCollection<Value> = FileCollection::open("items", &path);

    assert!(items
        .remove_one(&Query::new().eq("k", 1), RemoveOptions::default())
        .await
        .unwrap());
    assert_eq!(
        items.data().unwrap(),
        vec![Value::Null, json!({"k": 1}), json!({"k": 2})]
    );
}

#[tokio::test]
async fn test_remove_replaces_every_match() {
    let temp = TempDir::new().unwrap();
    let path = temp_path(&temp, "items.json");
    write_file(
        &path,
        json!({"items": [{"k": 1}, {"k": 2}, {"k": 1}, {"k": 3}]}),
    );
    let items: FileCollection<Value> = FileCollection::open("items", &path);

    let touched = items
        .remove(&Query::new().eq("k", 1), RemoveOptions::replace_with(json!({"k": 0})))
        .await
        .unwrap();
    assert_eq!(touched, 2);
    assert_eq!(
        items.data().unwrap(),
        vec![json!({"k": 0}), json!({"k": 2}), json!({"k": 0}), json!({"k": 3})]
    );
}

#[tokio::test]
async fn test_remove_without_matches_is_noop() {
    let temp = TempDir::new().unwrap();
    let items = two_items(&temp);

    let touched = items
        .remove(&Query::new().eq("id", 99), RemoveOptions::default())
        .await
        .unwrap();
    assert_eq!(touched, 0);
    assert!(!items
        .remove_one(&Query::new().eq("id", 99), RemoveOptions::default())
        .await
        .unwrap());
    assert_eq!(items.data().unwrap().len(), 2);
}

#[tokio::test]
async fn test_compact_removal_shrinks_the_array() {
    let temp = TempDir::new().unwrap();
    let path = temp_path(&temp, "items.json");
    write_file(
        &path,
        json!({"items": [{"k": 1}, {"k": 2}, {"k": 1}]}),
    );
    let items: FileCollection<Value> = FileCollection::open("items", &path);

    assert!(items
        .remove_one(&Query::new().eq("k", 1), RemoveOptions::compact())
        .await
        .unwrap());
    assert_eq!(items.data().unwrap(), vec![json!({"k": 2}), json!({"k": 1})]);

    let touched = items
        .remove(&Query::new(), RemoveOptions::compact())
        .await
        .unwrap();
    assert_eq!(touched, 2);
    assert!(items.data().unwrap().is_empty());
}

#[tokio::test]
async fn test_typed_find_over_holes_needs_option_model() {
    let temp = TempDir::new().unwrap();
    let path = temp_path(&temp, "items.json");
    write_file(&path, json!({"items": [null, {"id": 2, "v": "y"}]}));

    let strict: FileCollection<Item> = FileCollection::open("items", &path);
    assert!(matches!(
        strict.find(&Query::new()).await,
        Err(FileBaseError::Model(_))
    ));
    // Holes never match a non-empty query
    assert_eq!(strict.find(&Query::new().eq("id", 2)).await.unwrap(), vec![item(2, "y")]);

    let lenient: FileCollection<Option<Item>> = FileCollection::attach("items", strict.file().clone());
    assert_eq!(
        lenient.find(&Query::new()).await.unwrap(),
        vec![None, Some(item(2, "y"))]
    );
}

// ========== UPDATE ==========

#[tokio::test]
async fn test_update_one_replaces_record() {
    let temp = TempDir::new().unwrap();
    let path = temp_path(&temp, "items.json");
    write_file(
        &path,
        json!({"items": [{"id": 1, "v": "x"}, {"id": 2, "v": "y"}]}),
    );
    let items: FileCollection<Item> = FileCollection::open("items", &path);

    let replacement = item(1, "changed");
    assert!(items
        .update_one(&Query::new().eq("id", 1), &replacement)
        .await
        .unwrap());

    assert_eq!(
        items.find_one(&Query::new().eq("id", 1)).await.unwrap(),
        Some(replacement)
    );
    assert_eq!(items.data().unwrap().len(), 2);
}

#[tokio::test]
async fn test_update_one_changes_only_the_first_match() {
    let temp = TempDir::new().unwrap();
    let path = temp_path(&temp, "items.json");
    write_file(
        &path,
        json!({"items": [{"id": 1, "v": "x"}, {"id": 1, "v": "y"}, {"id": 2, "v": "z"}]}),
    );
    let items: FileCollection<Item> = FileCollection::open("items", &path);

    assert!(items
        .update_one(&Query::new().eq("id", 1), &item(1, "changed"))
        .await
        .unwrap());
    assert_eq!(
        items.data().unwrap(),
        vec![
            json!({"id": 1, "v": "changed"}),
            json!({"id": 1, "v": "y"}),
            json!({"id": 2, "v": "z"}),
        ]
    );
}

#[tokio::test]
async fn test_update_replaces_all_matches() {
    let temp = TempDir::new().unwrap();
    let path = temp_path(&temp, "items.json");
    write_file(
        &path,
        json!({"items": [{"id": 1, "v": "x"}, {"id": 1, "v": "y"}, {"id": 2, "v": "z"}]}),
    );
    let items: FileCollection<Item> = FileCollection::open("items", &path);

    let touched = items
        .update(&Query::new().eq("id", 1), &item(1, "same"))
        .await
        .unwrap();
    assert_eq!(touched, 2);
    assert_eq!(
        items.find(&Query::new().eq("v", "same")).await.unwrap().len(),
        2
    );
}

// ========== LOADING & PERSISTENCE ==========

#[tokio::test]
async fn test_data_is_empty_before_first_access() {
    let temp = TempDir::new().unwrap();
    let items = two_items(&temp);

    assert!(items.data().unwrap().is_empty());
    items.find(&Query::new()).await.unwrap();
    assert_eq!(items.data().unwrap().len(), 2);
}

#[tokio::test]
async fn test_collection_never_reloads_implicitly() {
    let temp = TempDir::new().unwrap();
    let items = two_items(&temp);
    items.find(&Query::new()).await.unwrap();

    write_file(&temp_path(&temp, "items.json"), json!({"items": []}));
    assert_eq!(items.find(&Query::new()).await.unwrap().len(), 2);

    items.load().await.unwrap();
    assert!(items.find(&Query::new()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_save_then_fresh_instance_sees_same_data() {
    let temp = TempDir::new().unwrap();
    let path = temp_path(&temp, "users.json");

    let users: FileCollection<User> = FileCollection::open("users", &path);
    users
        .add(&[User { name: "a".into() }])
        .await
        .unwrap();
    users.save().await.unwrap();

    let fresh: FileCollection<User> = FileCollection::open("users", &path);
    assert_eq!(
        fresh.find(&Query::new()).await.unwrap(),
        vec![User { name: "a".into() }]
    );
    assert_eq!(fresh.data().unwrap(), users.data().unwrap());
}

#[test]
fn test_blocking_load_and_save() {
    let temp = TempDir::new().unwrap();
    let path = temp_path(&temp, "users.json");

    let users: FileCollection<User> = FileCollection::open("users", &path);
    users.load_sync().unwrap();
    assert!(path.is_file());

    users.file().write().records_mut("users").unwrap().push(json!({"name": "b"}));
    users.save_sync().unwrap();

    let on_disk: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk, json!({"users": [{"name": "b"}]}));
}

#[tokio::test]
async fn test_failed_load_is_reported_by_every_operation() {
    let temp = TempDir::new().unwrap();
    let path = temp_path(&temp, "items.json");
    std::fs::write(&path, "not json at all").unwrap();

    let items: FileCollection<Value> = FileCollection::open("items", &path);
    assert!(matches!(
        items.find(&Query::new()).await,
        Err(FileBaseError::Decode { .. })
    ));
    assert!(matches!(
        items.add_one(&json!({"id": 1})).await,
        Err(FileBaseError::LoadFailed { .. })
    ));
    assert!(items.data().unwrap().is_empty());
}

#[tokio::test]
async fn test_non_array_collection_is_rejected() {
    let temp = TempDir::new().unwrap();
    let path = temp_path(&temp, "items.json");
    write_file(&path, json!({"items": {"id": 1}}));

    let items: FileCollection<Value> = FileCollection::open("items", &path);
    assert!(matches!(
        items.find(&Query::new()).await,
        Err(FileBaseError::InvalidCollection { found: "object", .. })
    ));
}
