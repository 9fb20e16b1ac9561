mod common;

use common::{fast_orchestrator, history, orchestrator_with, test_config, FakeApi, RecordingStorage};
use scrobble_index::{
    HistoryIndex, HistoryStorage, ScrobbleIndexError, ScrobbleRecord, SyncPace, SyncSettings,
    SyncState,
};
use std::sync::Arc;

/// Unix seconds of the previous sync used by these tests.
const LAST_SYNC: u64 = 1_600_000_000;

/// An index last synced at `LAST_SYNC` holding one play from before it.
fn synced_index() -> HistoryIndex {
    let mut index = HistoryIndex::new();
    index.ingest(&ScrobbleRecord::new("Old", "Record", "Song", LAST_SYNC - 600));
    index.last_sync_timestamp = LAST_SYNC * 1000;
    index
}

/// `newer` plays after `LAST_SYNC`, then `older` plays at or before it.
fn remote_history(newer: usize, older: usize) -> Vec<ScrobbleRecord> {
    let mut records = history(newer, LAST_SYNC + newer as u64 * 60);
    records.extend(history(older, LAST_SYNC));
    records
}

#[test_log::test(tokio::test)]
async fn test_incremental_merges_only_newer_plays() {
    // 7 newer plays: page 1 all new, page 2 crosses the boundary
    let api = FakeApi::new(remote_history(7, 8));
    let storage = Arc::new(RecordingStorage::with_index(synced_index()));
    let orchestrator = fast_orchestrator(api.clone(), storage.clone()).await;

    orchestrator.start_incremental_sync().await.unwrap();

    assert_eq!(api.calls(), vec![1, 2]);
    let index = storage.load_history_index().await.unwrap().unwrap();
    assert_eq!(index.total_scrobbles, 1 + 7);
    assert!(index.last_sync_timestamp > LAST_SYNC * 1000);
    assert_eq!(index.oldest_scrobble_date, Some(LAST_SYNC - 600));
    // only the final merge is persisted
    assert_eq!(storage.save_count(), 1);

    let status = orchestrator.sync_status();
    assert_eq!(status.status, SyncState::Completed);
    assert_eq!(status.scrobbles_fetched, 7);
    assert_eq!(status.progress, 100);
}

#[test_log::test(tokio::test)]
async fn test_repeated_incremental_sync_does_not_duplicate() {
    let api = FakeApi::new(remote_history(3, 10));
    let storage = Arc::new(RecordingStorage::with_index(synced_index()));
    let orchestrator = fast_orchestrator(api.clone(), storage.clone()).await;

    orchestrator.start_incremental_sync().await.unwrap();
    let first = storage.load_history_index().await.unwrap().unwrap();
    assert_eq!(first.total_scrobbles, 4);

    // nothing new since the previous run: the boundary is on page 1
    orchestrator.start_incremental_sync().await.unwrap();
    let second = storage.load_history_index().await.unwrap().unwrap();
    assert_eq!(second.total_scrobbles, 4);
    assert_eq!(second.albums, first.albums);
    assert_eq!(api.calls(), vec![1, 1]);
}

#[test_log::test(tokio::test)]
async fn test_play_at_boundary_is_not_merged() {
    let api = FakeApi::new(vec![
        ScrobbleRecord::new("New", "Album", "A", LAST_SYNC + 1),
        ScrobbleRecord::new("Edge", "Album", "B", LAST_SYNC),
        ScrobbleRecord::new("Older", "Album", "C", LAST_SYNC - 1),
    ]);
    let storage = Arc::new(RecordingStorage::with_index(synced_index()));
    let orchestrator = fast_orchestrator(api, storage.clone()).await;

    orchestrator.start_incremental_sync().await.unwrap();

    let index = storage.load_history_index().await.unwrap().unwrap();
    assert!(index.get("New", "Album").is_some());
    assert!(index.get("Edge", "Album").is_none());
    assert!(index.get("Older", "Album").is_none());
}

#[test_log::test(tokio::test)]
async fn test_incremental_stops_at_page_cap() {
    let api = FakeApi::new(remote_history(20, 0));
    let storage = Arc::new(RecordingStorage::with_index(synced_index()));
    let config = test_config().with_incremental_page_cap(2);
    let orchestrator = orchestrator_with(api.clone(), storage.clone(), config, SyncPace::Fast).await;

    orchestrator.start_incremental_sync().await.unwrap();

    assert_eq!(api.calls(), vec![1, 2]);
    // merged data is kept even though the boundary was never found
    let index = storage.load_history_index().await.unwrap().unwrap();
    assert_eq!(index.total_scrobbles, 1 + 10);
    assert_eq!(orchestrator.sync_status().status, SyncState::Completed);
}

#[test_log::test(tokio::test)]
async fn test_incremental_stops_at_last_page() {
    let api = FakeApi::new(remote_history(7, 0));
    let storage = Arc::new(RecordingStorage::with_index(synced_index()));
    let orchestrator = fast_orchestrator(api.clone(), storage.clone()).await;

    orchestrator.start_incremental_sync().await.unwrap();

    assert_eq!(api.calls(), vec![1, 2]);
    let index = storage.load_history_index().await.unwrap().unwrap();
    assert_eq!(index.total_scrobbles, 8);
}

#[test_log::test(tokio::test)]
async fn test_incremental_fetch_failure_persists_nothing() {
    let api = FakeApi::new(remote_history(12, 5));
    api.fail_page(2);
    let storage = Arc::new(RecordingStorage::with_index(synced_index()));
    let orchestrator = fast_orchestrator(api.clone(), storage.clone()).await;

    let result = orchestrator.start_incremental_sync().await;

    assert!(matches!(result, Err(ScrobbleIndexError::Http(_))));
    assert_eq!(api.calls(), vec![1, 2]);
    assert_eq!(storage.save_count(), 0);
    let index = storage.load_history_index().await.unwrap().unwrap();
    assert_eq!(index, synced_index());
    assert_eq!(orchestrator.sync_status().status, SyncState::Error);
}

#[test_log::test(tokio::test)]
async fn test_incremental_without_index_runs_full_sync() {
    let api = FakeApi::new(history(12, LAST_SYNC));
    let storage = Arc::new(RecordingStorage::new());
    let orchestrator = fast_orchestrator(api.clone(), storage.clone()).await;

    orchestrator.start_incremental_sync().await.unwrap();

    assert_eq!(api.calls(), vec![1, 2, 3]);
    let index = storage.load_history_index().await.unwrap().unwrap();
    assert_eq!(index.total_scrobbles, 12);
}

#[test_log::test(tokio::test)]
async fn test_startup_sync_honours_settings() {
    let api = FakeApi::new(remote_history(2, 3));
    let storage = Arc::new(RecordingStorage::with_index(synced_index()));
    let orchestrator = fast_orchestrator(api.clone(), storage.clone()).await;

    // auto sync is off by default
    assert!(!orchestrator.run_startup_sync().await.unwrap());
    assert!(api.calls().is_empty());

    orchestrator
        .update_settings(SyncSettings {
            auto_sync_on_startup: true,
            sync_pace: SyncPace::Fast,
        })
        .await
        .unwrap();
    assert!(orchestrator.needs_sync().await);
    assert!(orchestrator.run_startup_sync().await.unwrap());
    assert_eq!(api.calls(), vec![1]);

    // freshly synced
    assert!(!orchestrator.needs_sync().await);
    assert!(!orchestrator.run_startup_sync().await.unwrap());
    assert_eq!(api.calls(), vec![1]);
}
