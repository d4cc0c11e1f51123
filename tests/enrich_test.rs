// Integration tests for the enrichment fanout: concurrency bound, batch
// barrier, per-item failure tolerance, and settle notification.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use taskboard_client::report::enrich::{enrich_in_batches, EnrichedCollection, Enrichment};

#[tokio::test]
async fn test_in_flight_lookups_never_exceed_batch_size() {
    let items: Vec<u64> = (1..=12).collect();
    let collection = EnrichedCollection::new(items.iter().copied());

    let in_flight = Arc::new(AtomicUsize::new(0));
    let max_in_flight = Arc::new(AtomicUsize::new(0));

    enrich_in_batches(
        &items,
        5,
        &collection,
        |id| *id,
        |id| {
            let in_flight = in_flight.clone();
            let max_in_flight = max_in_flight.clone();
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_in_flight.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, anyhow::Error>(id * 10)
            }
        },
    )
    .await;

    // Full batches saturate the bound; nothing ever exceeds it.
    assert_eq!(max_in_flight.load(Ordering::SeqCst), 5);
    assert!(collection.is_settled());
    assert_eq!(collection.get(&12), Some(Enrichment::Resolved(120)));
}

#[tokio::test]
async fn test_next_batch_waits_for_previous_to_settle() {
    let items: Vec<u64> = (1..=7).collect();
    let collection = EnrichedCollection::new(items.iter().copied());

    let settled = Arc::new(AtomicUsize::new(0));
    let starts = Arc::new(Mutex::new(Vec::new()));

    enrich_in_batches(
        &items,
        5,
        &collection,
        |id| *id,
        |id| {
            let settled = settled.clone();
            let starts = starts.clone();
            async move {
                starts.lock().push((id, settled.load(Ordering::SeqCst)));
                // Vary completion order within the batch.
                tokio::time::sleep(Duration::from_millis(10 + (id % 5) * 10)).await;
                settled.fetch_add(1, Ordering::SeqCst);
                Ok::<_, anyhow::Error>(id)
            }
        },
    )
    .await;

    let starts = starts.lock();
    assert_eq!(starts.len(), 7);
    for (id, settled_at_start) in starts.iter() {
        if *id <= 5 {
            // Batch one starts before any lookup has settled... it may
            // observe settles from its own batch-mates only.
            assert!(*settled_at_start < 5, "item {} started late", id);
        } else {
            // Batch two must not start until all of batch one settled.
            assert!(
                *settled_at_start >= 5,
                "item {} started before batch one settled",
                id
            );
        }
    }
}

#[tokio::test]
async fn test_partial_failure_marks_exactly_one_item() {
    let items: Vec<u64> = (1..=7).collect();
    let collection = EnrichedCollection::new(items.iter().copied());

    enrich_in_batches(
        &items,
        5,
        &collection,
        |id| *id,
        |id| async move {
            if id == 3 {
                anyhow::bail!("lookup failed for item 3");
            }
            Ok(id * 100)
        },
    )
    .await;

    assert!(collection.is_settled());
    assert_eq!(collection.get(&3), Some(Enrichment::Failed));
    for id in [1u64, 2, 4, 5, 6, 7] {
        assert_eq!(collection.get(&id), Some(Enrichment::Resolved(id * 100)));
    }

    let failures = collection
        .snapshot()
        .into_iter()
        .filter(|(_, entry)| matches!(entry, Enrichment::Failed))
        .count();
    assert_eq!(failures, 1);
}

#[tokio::test]
async fn test_wait_settled_observes_background_fanout() {
    let items: Vec<u64> = (1..=6).collect();
    let collection = Arc::new(EnrichedCollection::new(items.iter().copied()));

    let fanout_collection = collection.clone();
    tokio::spawn(async move {
        enrich_in_batches(
            &items,
            2,
            &fanout_collection,
            |id| *id,
            |id| async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok::<_, anyhow::Error>(id)
            },
        )
        .await;
    });

    tokio::time::timeout(Duration::from_secs(5), collection.wait_settled())
        .await
        .expect("fanout did not settle");
    assert!(collection.is_settled());
    assert_eq!(collection.pending(), 0);
}
