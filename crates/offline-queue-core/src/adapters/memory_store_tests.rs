//! Tests for the in-memory document store

use super::*;
use serde_json::json;

fn collection(name: &str) -> CollectionName {
    CollectionName::new(name).unwrap()
}

#[tokio::test]
async fn test_put_then_get_returns_document() {
    let store = InMemoryDocumentStore::new();
    let queue = collection("queue");

    store.put(&queue, "queue_1", json!({ "id": 1 })).await.unwrap();

    let document = store.get(&queue, "queue_1").await.unwrap();
    assert_eq!(document, Some(json!({ "id": 1 })));
}

#[tokio::test]
async fn test_put_overwrites_same_key() {
    let store = InMemoryDocumentStore::new();
    let queue = collection("queue");

    store.put(&queue, "queue_1", json!({ "v": 1 })).await.unwrap();
    store.put(&queue, "queue_1", json!({ "v": 2 })).await.unwrap();

    assert_eq!(store.count(&queue).await.unwrap(), 1);
    assert_eq!(
        store.get(&queue, "queue_1").await.unwrap(),
        Some(json!({ "v": 2 }))
    );
}

#[tokio::test]
async fn test_collections_are_isolated() {
    let store = InMemoryDocumentStore::new();
    let payments = collection("payments");
    let prints = collection("prints");

    store.put(&payments, "queue_1", json!({})).await.unwrap();

    assert_eq!(store.count(&payments).await.unwrap(), 1);
    assert_eq!(store.count(&prints).await.unwrap(), 0);
    assert!(store.get(&prints, "queue_1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_reports_whether_document_existed() {
    let store = InMemoryDocumentStore::new();
    let queue = collection("queue");

    store.put(&queue, "queue_1", json!({})).await.unwrap();

    assert!(store.delete(&queue, "queue_1").await.unwrap());
    assert!(!store.delete(&queue, "queue_1").await.unwrap());
    assert!(!store.delete(&collection("other"), "queue_1").await.unwrap());
}

#[tokio::test]
async fn test_query_applies_ordering() {
    let store = InMemoryDocumentStore::new();
    let queue = collection("queue");

    store.put(&queue, "queue_1", json!({ "rank": 3 })).await.unwrap();
    store.put(&queue, "queue_2", json!({ "rank": 1 })).await.unwrap();

    let documents = store
        .query(&queue, &DocumentQuery::all().order_by("rank"))
        .await
        .unwrap();

    let keys: Vec<_> = documents.iter().map(|d| d.key.as_str()).collect();
    assert_eq!(keys, vec!["queue_2", "queue_1"]);
}

#[tokio::test]
async fn test_unavailable_store_fails_every_operation() {
    let store = InMemoryDocumentStore::new();
    let queue = collection("queue");
    store.put(&queue, "queue_1", json!({})).await.unwrap();

    store.set_unavailable(true);

    assert!(matches!(
        store.put(&queue, "queue_2", json!({})).await,
        Err(StorageError::Unavailable { .. })
    ));
    assert!(store.get(&queue, "queue_1").await.is_err());
    assert!(store.delete(&queue, "queue_1").await.is_err());
    assert!(store.query(&queue, &DocumentQuery::all()).await.is_err());
    assert!(store.count(&queue).await.is_err());
    assert!(!store.health_check().await.unwrap().healthy);

    store.set_unavailable(false);
    assert_eq!(store.count(&queue).await.unwrap(), 1);
}

#[tokio::test]
async fn test_rejects_invalid_keys() {
    let store = InMemoryDocumentStore::new();
    let result = store.put(&collection("queue"), "a/b", json!({})).await;
    assert!(matches!(result, Err(StorageError::InvalidKey { .. })));
}

#[tokio::test]
async fn test_keys_are_sorted() {
    let store = InMemoryDocumentStore::new();
    let queue = collection("queue");

    store.put(&queue, "queue_2", json!({})).await.unwrap();
    store.put(&queue, "queue_1", json!({})).await.unwrap();

    assert_eq!(
        store.keys(&queue).await.unwrap(),
        vec!["queue_1".to_string(), "queue_2".to_string()]
    );
    assert!(store.keys(&collection("empty")).await.unwrap().is_empty());
}
