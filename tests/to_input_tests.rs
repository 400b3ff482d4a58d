/// Mutation input and save lifecycle tests
///
/// The spec's decision table: Unset is never emitted, Null is emitted for
/// new entities and for dirty existing fields, unchanged values only for
/// new entities. Save chooses create vs update and adopts the server id.
/// Run with: cargo test --test to_input_tests

mod common;

use common::fresh_store;
use graphstore::{default_registry, Entity, InputKind, Maybe, StoreError, Value};
use serde_json::json;

#[tokio::test]
async fn test_minimal_update_emits_only_id_and_changed_field() {
    let (store, _) = fresh_store();
    let scene = store
        .ingest(
            "Scene",
            json!({ "id": "123", "title": "Original", "rating100": 70 }),
        )
        .unwrap();

    scene.set("title", Maybe::Value("Updated".into())).unwrap();
    let built = scene.to_input().unwrap();
    assert_eq!(built.kind, InputKind::Update);
    assert_eq!(
        built.input,
        json!({ "id": "123", "title": "Updated" })
    );
}

#[tokio::test]
async fn test_null_clears_field_unset_omits_it() {
    let (store, _) = fresh_store();
    let scene = store
        .ingest(
            "Scene",
            json!({ "id": "123", "rating100": 70, "details": "d" }),
        )
        .unwrap();

    scene.set("rating100", Maybe::Null).unwrap();
    scene.set("details", Maybe::Unset).unwrap();

    let built = scene.to_input().unwrap();
    assert_eq!(built.input, json!({ "id": "123", "rating100": null }));
}

#[tokio::test]
async fn test_new_entity_save_adopts_server_id() {
    let (store, transport) = fresh_store();
    let scene = Entity::new(
        store.registry().get("Scene").unwrap(),
        vec![("title", Maybe::Value("X".into()))],
    )
    .unwrap();
    assert_eq!(scene.id().len(), 32);
    assert!(scene.is_new());

    transport.push_response(json!({ "sceneCreate": { "id": "456" } }));
    store.save(&scene).await.unwrap();

    assert_eq!(scene.id(), "456");
    assert!(!scene.is_new());
    assert!(!scene.is_dirty());

    // Create input carried the title, no id.
    let calls = transport.calls();
    assert_eq!(calls[0].0, "sceneCreate");
    assert_eq!(calls[0].1, json!({ "input": { "title": "X" } }));

    // Saved entity joined the cache.
    assert!(Entity::ptr_eq(
        &scene,
        &store.cached("Scene", "456").unwrap()
    ));
}

#[tokio::test]
async fn test_clean_entity_save_skips_transport() {
    let (store, transport) = fresh_store();
    let scene = store
        .ingest("Scene", json!({ "id": "123", "title": "A" }))
        .unwrap();

    store.save(&scene).await.unwrap();
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn test_dirty_update_goes_through_update_operation() {
    let (store, transport) = fresh_store();
    let scene = store
        .ingest("Scene", json!({ "id": "123", "title": "A" }))
        .unwrap();
    scene.set("title", Maybe::Value("B".into())).unwrap();

    transport.push_response(json!({ "sceneUpdate": { "id": "123" } }));
    store.save(&scene).await.unwrap();

    assert!(!scene.is_dirty());
    let calls = transport.calls();
    assert_eq!(calls[0].0, "sceneUpdate");
    assert_eq!(calls[0].1, json!({ "input": { "id": "123", "title": "B" } }));
}

#[tokio::test]
async fn test_group_wrapper_input_carries_metadata() {
    let (store, transport) = fresh_store();
    let scene = store
        .ingest(
            "Scene",
            json!({
                "id": "123",
                "groups": [
                    { "group": { "id": "g1", "name": "Trilogy" }, "scene_index": 2 }
                ]
            }),
        )
        .unwrap();

    // Re-send the same list plus one more group.
    let g2 = store
        .ingest("Group", json!({ "id": "g2", "name": "Other" }))
        .unwrap();
    scene.add_related("groups", &g2).unwrap();

    transport.push_response(json!({ "sceneUpdate": { "id": "123" } }));
    store.save(&scene).await.unwrap();

    let calls = transport.calls();
    assert_eq!(
        calls[0].1,
        json!({
            "input": {
                "id": "123",
                "groups": [
                    { "group_id": "g1", "scene_index": 2 },
                    { "group_id": "g2" }
                ]
            }
        })
    );
}

#[tokio::test]
async fn test_delete_invalidates_cache_entry() {
    let (store, transport) = fresh_store();
    let scene = store
        .ingest("Scene", json!({ "id": "123", "title": "A" }))
        .unwrap();

    transport.push_response(json!({ "sceneDestroy": true }));
    store.delete(&scene).await.unwrap();

    assert!(store.cached("Scene", "123").is_none());
    assert_eq!(transport.calls()[0].0, "sceneDestroy");
}

#[tokio::test]
async fn test_delete_refuses_unsaved_entity() {
    let (store, transport) = fresh_store();
    let registry = default_registry().unwrap();
    let scene = Entity::new(registry.get("Scene").unwrap(), vec![]).unwrap();

    let err = store.delete(&scene).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidIdentifier(_)));
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn test_transport_failure_keeps_entity_dirty() {
    let (store, _) = fresh_store();
    let scene = store
        .ingest("Scene", json!({ "id": "123", "title": "A" }))
        .unwrap();
    scene.set("title", Maybe::Value("B".into())).unwrap();

    // No canned response: the stub fails the call.
    let err = store.save(&scene).await.unwrap_err();
    assert!(matches!(err, StoreError::Transport(_)));
    assert!(scene.is_dirty());
    assert_eq!(
        scene.get("title").unwrap(),
        Maybe::Value(Value::String("B".into()))
    );
}
