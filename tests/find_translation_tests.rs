/// Find DSL translation and pagination tests
///
/// Run with: cargo test --test find_translation_tests

mod common;

use common::fresh_store;
use futures::StreamExt;
use graphstore::{FindQuery, StoreError};
use serde_json::json;

fn scenes_page(ids: &[&str], count: usize) -> serde_json::Value {
    let scenes: Vec<_> = ids
        .iter()
        .map(|id| json!({ "id": id, "title": format!("scene {}", id) }))
        .collect();
    json!({ "findScenes": { "count": count, "scenes": scenes } })
}

#[tokio::test]
async fn test_find_translates_criteria_and_pagination() {
    let (store, transport) = fresh_store();
    transport.push_response(scenes_page(&["1"], 1));
    transport.push_response(scenes_page(&["1"], 1));

    let query = FindQuery::new()
        .arg("title__contains", json!("interview"))
        .arg("rating100__gte", json!(80))
        .arg("organized", json!(true))
        .arg("studio__null", json!(true));
    let scenes = store.find("Scene", &query).await.unwrap();
    assert_eq!(scenes.len(), 1);

    let calls = transport.calls();
    assert_eq!(calls[0].0, "findScenes");
    assert_eq!(
        calls[0].1,
        json!({
            "filter": { "page": 1, "per_page": 1 },
            "scene_filter": {
                "title": { "value": "interview", "modifier": "INCLUDES" },
                "rating100": { "value": 80, "modifier": "GREATER_THAN" },
                "organized": { "value": true, "modifier": "EQUALS" },
                "studio": { "value": "", "modifier": "IS_NULL" }
            }
        })
    );
    // Second call fetches the full page.
    assert_eq!(calls[1].1["filter"], json!({ "page": 1, "per_page": 1 }));
}

#[tokio::test]
async fn test_find_relation_criterion_becomes_list() {
    let (store, transport) = fresh_store();
    transport.push_response(scenes_page(&[], 0));

    let query = FindQuery::new().arg("tags__in", json!("42"));
    store.find("Scene", &query).await.unwrap();

    let calls = transport.calls();
    assert_eq!(
        calls[0].1["scene_filter"]["tags"],
        json!({ "value": ["42"], "modifier": "INCLUDES" })
    );
}

#[tokio::test]
async fn test_find_zero_matches_makes_single_probe() {
    let (store, transport) = fresh_store();
    transport.push_response(scenes_page(&[], 0));
    let scenes = store.find("Scene", &FindQuery::new()).await.unwrap();
    assert!(scenes.is_empty());
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test]
async fn test_find_over_limit_directs_to_find_iter() {
    let (store, transport) = fresh_store();
    transport.push_response(scenes_page(&["1"], 5000));
    let err = store.find("Scene", &FindQuery::new()).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::ResultLimit { count: 5000, limit: 1000 }
    ));
}

#[tokio::test]
async fn test_unknown_modifier_is_refused_before_transport() {
    let (store, transport) = fresh_store();
    let query = FindQuery::new().arg("title__startswith", json!("x"));
    let err = store.find("Scene", &query).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidFilter(_)));
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn test_find_one_returns_first_match() {
    let (store, transport) = fresh_store();
    transport.push_response(scenes_page(&["9"], 37));
    let scene = store
        .find_one("Scene", &FindQuery::new())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(scene.id(), "9");
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test]
async fn test_find_iter_pages_lazily_and_short_circuits() {
    let (store, transport) = fresh_store();
    transport.push_response(scenes_page(&["1", "2"], 5));
    transport.push_response(scenes_page(&["3", "4"], 5));
    transport.push_response(scenes_page(&["5"], 5));

    {
        let stream = store.find_iter("Scene", FindQuery::new(), 2);
        futures::pin_mut!(stream);

        // Consume three items: two pages fetched, the third page untouched.
        let mut ids = Vec::new();
        for _ in 0..3 {
            ids.push(stream.next().await.unwrap().unwrap().id());
        }
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(transport.call_count(), 2);
    }

    // Dropping the stream abandoned the rest.
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test]
async fn test_find_iter_stops_on_short_page() {
    let (store, transport) = fresh_store();
    transport.push_response(scenes_page(&["1", "2"], 3));
    transport.push_response(scenes_page(&["3"], 3));

    let stream = store.find_iter("Scene", FindQuery::new(), 2);
    futures::pin_mut!(stream);

    let mut ids = Vec::new();
    while let Some(item) = stream.next().await {
        ids.push(item.unwrap().id());
    }
    assert_eq!(ids, vec!["1", "2", "3"]);
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test]
async fn test_find_results_pass_through_identity_map() {
    let (store, transport) = fresh_store();
    let cached = store
        .ingest("Scene", json!({ "id": "1", "title": "already here" }))
        .unwrap();
    transport.push_response(scenes_page(&["1"], 1));
    transport.push_response(scenes_page(&["1"], 1));

    let scenes = store.find("Scene", &FindQuery::new()).await.unwrap();
    assert!(graphstore::Entity::ptr_eq(&scenes[0], &cached));
}
