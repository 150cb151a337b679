//! Tests for the offline-queue-core library module.

use super::*;

#[test]
fn test_item_id_rejects_values_below_minimum() {
    assert!(ItemId::new(1).is_ok());
    assert!(matches!(
        ItemId::new(0),
        Err(ValidationError::OutOfRange { .. })
    ));
    assert!(matches!(
        ItemId::new(-5),
        Err(ValidationError::OutOfRange { .. })
    ));
}

#[test]
fn test_item_id_storage_key_round_trip() {
    let id = ItemId::new(42).unwrap();
    assert_eq!(id.storage_key(), "queue_42");
    assert_eq!(ItemId::from_storage_key("queue_42").unwrap(), id);
}

#[test]
fn test_item_id_from_storage_key_rejects_foreign_keys() {
    assert!(ItemId::from_storage_key("42").is_err());
    assert!(ItemId::from_storage_key("queue_").is_err());
    assert!(ItemId::from_storage_key("queue_abc").is_err());
    assert!(ItemId::from_storage_key("queue_0").is_err());
}

#[test]
fn test_item_id_serializes_as_plain_integer() {
    let id = ItemId::new(9).unwrap();
    assert_eq!(serde_json::to_value(id).unwrap(), serde_json::json!(9));

    let parsed: ItemId = serde_json::from_value(serde_json::json!(9)).unwrap();
    assert_eq!(parsed, id);

    let rejected = serde_json::from_value::<ItemId>(serde_json::json!(0));
    assert!(rejected.is_err());
}

#[test]
fn test_collection_name_validation() {
    assert!(CollectionName::new("offline-queue").is_ok());
    assert!(CollectionName::new("payments_v2").is_ok());

    assert!(matches!(
        CollectionName::new(""),
        Err(ValidationError::Required { .. })
    ));
    assert!(matches!(
        CollectionName::new("a".repeat(65)),
        Err(ValidationError::TooLong { .. })
    ));
    assert!(matches!(
        CollectionName::new("../escape"),
        Err(ValidationError::InvalidCharacters { .. })
    ));
    assert!(matches!(
        CollectionName::new("9lives"),
        Err(ValidationError::InvalidFormat { .. })
    ));
}

#[test]
fn test_collection_name_deserialization_validates() {
    let ok: CollectionName = serde_json::from_str("\"print-jobs\"").unwrap();
    assert_eq!(ok.as_str(), "print-jobs");

    assert!(serde_json::from_str::<CollectionName>("\"bad name\"").is_err());
}

#[test]
fn test_timestamp_rfc3339_round_trip() {
    let ts = Timestamp::from_rfc3339("2024-03-01T10:15:30.250Z").unwrap();
    let reparsed = Timestamp::from_rfc3339(&ts.to_rfc3339()).unwrap();
    assert_eq!(ts, reparsed);

    assert!(Timestamp::from_rfc3339("yesterday").is_err());
}

#[test]
fn test_timestamp_ordering() {
    let earlier = Timestamp::from_rfc3339("2024-03-01T10:00:00Z").unwrap();
    let later = earlier.add_seconds(1);
    assert!(earlier < later);
}
