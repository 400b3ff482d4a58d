/// Dirty tracking across store merges
///
/// The cache-hit merge path must refresh the snapshot only for fields the
/// payload carried, so unrelated local edits survive a merge.
/// Run with: cargo test --test dirty_tracking_tests

mod common;

use common::fresh_store;
use graphstore::{Maybe, Value};
use serde_json::json;

#[tokio::test]
async fn test_merge_preserves_unrelated_local_edit() {
    let (store, _) = fresh_store();
    let scene = store
        .ingest(
            "Scene",
            json!({ "id": "s1", "title": "Original", "rating100": 70 }),
        )
        .unwrap();
    assert!(!scene.is_dirty());

    // Local edit to a field no payload will touch.
    scene.set("code", Maybe::Value("X".into())).unwrap();
    assert!(scene.is_dirty());

    // Merge arrives with a new title only.
    store
        .ingest("Scene", json!({ "id": "s1", "title": "Renamed" }))
        .unwrap();

    // The edit is still dirty with its pre-merge value; the merged field
    // is clean and holds the server value.
    let changed = scene.changed_fields();
    assert_eq!(changed.len(), 1);
    assert_eq!(changed.get("code"), Some(&Maybe::Value("X".into())));
    assert_eq!(
        scene.get("title").unwrap(),
        Maybe::Value(Value::String("Renamed".into()))
    );
}

#[tokio::test]
async fn test_merge_overwrites_conflicting_edit_server_wins() {
    let (store, _) = fresh_store();
    let scene = store
        .ingest("Scene", json!({ "id": "s1", "title": "Original" }))
        .unwrap();

    scene.set("title", Maybe::Value("Local".into())).unwrap();
    store
        .ingest("Scene", json!({ "id": "s1", "title": "Server" }))
        .unwrap();

    assert_eq!(
        scene.get("title").unwrap(),
        Maybe::Value(Value::String("Server".into()))
    );
    // Snapshot refreshed to the server value: nothing dirty.
    assert!(!scene.is_dirty());
}

#[tokio::test]
async fn test_merge_updates_received_fields() {
    let (store, _) = fresh_store();
    let scene = store
        .ingest("Scene", json!({ "id": "s1", "title": "A" }))
        .unwrap();
    assert!(scene.has_received("title"));
    assert!(!scene.has_received("details"));

    store
        .ingest("Scene", json!({ "id": "s1", "details": "more" }))
        .unwrap();
    assert!(scene.has_received("details"));
    assert!(scene.has_received("title"), "union, not replacement");
}

#[tokio::test]
async fn test_explicit_null_from_server_is_clean_null() {
    let (store, _) = fresh_store();
    let scene = store
        .ingest("Scene", json!({ "id": "s1", "rating100": 70 }))
        .unwrap();

    store
        .ingest("Scene", json!({ "id": "s1", "rating100": null }))
        .unwrap();
    assert_eq!(scene.get("rating100").unwrap(), Maybe::Null);
    assert!(!scene.is_dirty());
}

#[tokio::test]
async fn test_relationship_merge_snapshots_by_id() {
    let (store, _) = fresh_store();
    let scene = store
        .ingest(
            "Scene",
            json!({
                "id": "s1",
                "studio": { "id": "u1", "name": "Acme" }
            }),
        )
        .unwrap();
    assert!(!scene.is_dirty());

    // A merge that renames the studio leaves the scene clean: the scene
    // snapshots the relationship by id, not by the referent's content.
    store
        .ingest("Studio", json!({ "id": "u1", "name": "Renamed" }))
        .unwrap();
    assert!(!scene.is_dirty());

    // Re-pointing the relationship at another studio dirties it.
    let other = store
        .ingest("Studio", json!({ "id": "u2", "name": "Other" }))
        .unwrap();
    scene
        .set("studio", Maybe::Value(Value::Ref(other)))
        .unwrap();
    assert!(scene.is_dirty());
    assert!(scene.changed_fields().contains_key("studio"));
}
