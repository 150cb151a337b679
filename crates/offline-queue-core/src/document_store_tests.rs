//! Tests for the document store contract helpers

use super::*;
use serde_json::json;

fn doc(key: &str, document: serde_json::Value) -> StoredDocument {
    StoredDocument {
        key: key.to_string(),
        document,
    }
}

fn keys(documents: &[StoredDocument]) -> Vec<&str> {
    documents.iter().map(|d| d.key.as_str()).collect()
}

#[test]
fn test_query_without_order_sorts_by_key() {
    let documents = vec![doc("b", json!({})), doc("a", json!({})), doc("c", json!({}))];

    let result = DocumentQuery::all().apply(documents);

    assert_eq!(keys(&result), vec!["a", "b", "c"]);
}

#[test]
fn test_query_orders_by_string_property() {
    let documents = vec![
        doc("queue_1", json!({ "createdAt": "2024-01-03T00:00:00Z" })),
        doc("queue_2", json!({ "createdAt": "2024-01-01T00:00:00Z" })),
        doc("queue_3", json!({ "createdAt": "2024-01-02T00:00:00Z" })),
    ];

    let result = DocumentQuery::all().order_by("createdAt").apply(documents);

    assert_eq!(keys(&result), vec!["queue_2", "queue_3", "queue_1"]);
}

#[test]
fn test_query_orders_numbers_numerically() {
    let documents = vec![
        doc("x", json!({ "id": 10 })),
        doc("y", json!({ "id": 9 })),
        doc("z", json!({ "id": 100 })),
    ];

    let result = DocumentQuery::all().order_by("id").apply(documents);

    assert_eq!(keys(&result), vec!["y", "x", "z"]);
}

#[test]
fn test_query_places_missing_property_last() {
    let documents = vec![
        doc("a", json!({})),
        doc("b", json!({ "id": 2 })),
        doc("c", json!({ "id": 1 })),
    ];

    let result = DocumentQuery::all().order_by("id").apply(documents);

    assert_eq!(keys(&result), vec!["c", "b", "a"]);
}

#[test]
fn test_query_breaks_ties_by_key() {
    let documents = vec![
        doc("k2", json!({ "createdAt": "same" })),
        doc("k1", json!({ "createdAt": "same" })),
    ];

    let result = DocumentQuery::all().order_by("createdAt").apply(documents);

    assert_eq!(keys(&result), vec!["k1", "k2"]);
}

#[test]
fn test_query_limit_truncates_after_ordering() {
    let documents = vec![
        doc("a", json!({ "id": 3 })),
        doc("b", json!({ "id": 1 })),
        doc("c", json!({ "id": 2 })),
    ];

    let result = DocumentQuery::all().order_by("id").limit(2).apply(documents);

    assert_eq!(keys(&result), vec!["b", "c"]);
}

#[test]
fn test_validate_key() {
    assert!(validate_key("queue_12").is_ok());
    assert!(validate_key("").is_err());
    assert!(validate_key("../etc/passwd").is_err());
    assert!(validate_key("queue 1").is_err());
    assert!(validate_key(&"k".repeat(129)).is_err());
}

#[test]
fn test_storage_error_classification() {
    let io = StorageError::Io {
        operation: "write".to_string(),
        message: "disk full".to_string(),
    };
    let corrupted = StorageError::Corrupted {
        key: "queue_1".to_string(),
        message: "checksum mismatch".to_string(),
    };

    assert!(io.is_transient());
    assert!(!io.is_corrupted());
    assert!(!corrupted.is_transient());
    assert!(corrupted.is_corrupted());
    assert!(StorageError::Unavailable {
        message: "offline".to_string()
    }
    .is_transient());
    assert!(!StorageError::InvalidKey {
        key: "bad key".to_string()
    }
    .is_transient());
}
