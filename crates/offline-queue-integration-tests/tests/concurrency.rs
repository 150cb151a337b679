//! Integration tests for concurrent access to a filesystem-backed queue
//!
//! These tests verify:
//! - Concurrent saves are all durable and none are lost
//! - Concurrent identifier generation never hands out duplicates
//! - The first-use recovery scan is shared by concurrent callers
//! - Mutations never interleave with each other

mod common;

use common::{id, QueueHome, Work};
use offline_queue_core::{OfflineQueue, QueuedItem};
use std::collections::HashSet;

/// Verify concurrent enqueues from many tasks are all persisted
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_enqueues_are_all_durable() {
    // Arrange
    let home = QueueHome::new();
    let queue = home.open().await;

    // Act
    let mut handles = Vec::new();
    for task in 0..8 {
        let queue = queue.clone();
        handles.push(tokio::spawn(async move {
            let mut ids = Vec::new();
            for n in 0..10 {
                let item = queue
                    .enqueue(Work::Transaction, format!("task-{}-item-{}", task, n))
                    .await
                    .expect("Enqueue should succeed");
                ids.push(item.id);
            }
            ids
        }));
    }

    let mut all_ids = HashSet::new();
    for handle in handles {
        for item_id in handle.await.expect("Task should not panic") {
            assert!(all_ids.insert(item_id), "Duplicate id {}", item_id);
        }
    }

    // Assert
    assert_eq!(all_ids.len(), 80);
    assert_eq!(queue.count().await, 80);

    let restarted = home.open().await;
    assert_eq!(restarted.list().await.len(), 80);
}

/// Verify concurrent first use of a restarted queue recovers once and stays unique
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_use_after_restart() {
    // Arrange
    let home = QueueHome::new();
    {
        let queue = home.open().await;
        queue
            .save(QueuedItem::new(id(500), Work::Payment, "existing"))
            .await
            .expect("Save should succeed");
    }
    let restarted = home.open().await;

    // Act
    let mut handles = Vec::new();
    for _ in 0..16 {
        let queue = restarted.clone();
        handles.push(tokio::spawn(async move {
            queue
                .generate_identifier()
                .await
                .expect("Identifier generation should succeed")
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        ids.insert(handle.await.expect("Task should not panic"));
    }

    // Assert
    assert_eq!(ids.len(), 16);
    assert!(ids.iter().all(|item_id| *item_id > id(500)));
}

/// Verify concurrent updates of one item leave a consistent document
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_updates_leave_consistent_item() {
    let home = QueueHome::new();
    let queue = home.open().await;
    let item = queue
        .enqueue(Work::Payment, "{\"amount\":10}".to_string())
        .await
        .expect("Enqueue should succeed");

    let mut handles = Vec::new();
    for attempts in 1..=12u32 {
        let queue = queue.clone();
        let mut copy = item.clone();
        copy.attempts = attempts;
        handles.push(tokio::spawn(async move { queue.update(&copy).await }));
    }
    for handle in handles {
        assert!(handle.await.expect("Task should not panic"));
    }

    let stored = queue.get(item.id).await.expect("Item should still exist");
    assert_eq!(stored.payload, item.payload);
    assert_eq!(stored.created_at, item.created_at);
    assert!((1..=12).contains(&stored.attempts));
}

/// Verify saves racing a clear either land after it or are removed by it
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_clear_racing_saves_never_leaves_partial_items() {
    let home = QueueHome::new();
    let queue = home.open().await;
    for _ in 0..10 {
        queue
            .enqueue(Work::PrintJob, "before".to_string())
            .await
            .expect("Enqueue should succeed");
    }

    let saver = {
        let queue = queue.clone();
        tokio::spawn(async move {
            let mut saved = Vec::new();
            for _ in 0..10 {
                saved.push(
                    queue
                        .enqueue(Work::PrintJob, "during".to_string())
                        .await
                        .expect("Enqueue should succeed")
                        .id,
                );
            }
            saved
        })
    };
    let clearer = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.clear().await.expect("Clear should succeed") })
    };

    saver.await.expect("Task should not panic");
    let removed = clearer.await.expect("Task should not panic");

    let remaining = queue.list().await;
    assert!(removed >= 10);
    assert_eq!(remaining.len() + removed, 20);
    assert!(remaining.iter().all(|item| item.payload == "during"));
    assert_eq!(queue.count().await, remaining.len());
}
