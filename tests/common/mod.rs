#![allow(dead_code)]
use async_trait::async_trait;
use scrobble_index::{
    Credentials, HistoryIndex, HistoryStorage, MemoryStorage, Result, RetryConfig, ScrobbleApi,
    ScrobbleIndexError, ScrobblePage, ScrobbleRecord, StaticCredentials, SyncConfig,
    SyncOrchestrator, SyncPace, SyncSettings,
};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Records per page used by the sync tests.
pub const PAGE_SIZE: u32 = 5;

#[derive(Default)]
struct FakeState {
    history: Vec<ScrobbleRecord>,
    now_playing: Option<ScrobbleRecord>,
    failing_pages: HashSet<u32>,
    rate_limited_once: HashSet<u32>,
    calls: Vec<u32>,
    latency: Duration,
}

/// Scripted remote history, newest first, paginated by the requested limit.
///
/// Clones share state so a test can keep a handle after moving the API into
/// the orchestrator.
#[derive(Clone, Default)]
pub struct FakeApi {
    state: Rc<RefCell<FakeState>>,
}

impl FakeApi {
    pub fn new(history: Vec<ScrobbleRecord>) -> Self {
        let api = Self::default();
        api.state.borrow_mut().history = history;
        api
    }

    pub fn set_history(&self, history: Vec<ScrobbleRecord>) {
        self.state.borrow_mut().history = history;
    }

    /// Prepend a "now playing" placeholder to page 1.
    pub fn with_now_playing(self, record: ScrobbleRecord) -> Self {
        self.state.borrow_mut().now_playing = Some(record);
        self
    }

    pub fn with_latency(self, latency: Duration) -> Self {
        self.state.borrow_mut().latency = latency;
        self
    }

    pub fn fail_page(&self, page: u32) {
        self.state.borrow_mut().failing_pages.insert(page);
    }

    pub fn rate_limit_once(&self, page: u32) {
        self.state.borrow_mut().rate_limited_once.insert(page);
    }

    /// Pages requested so far, in order.
    pub fn calls(&self) -> Vec<u32> {
        self.state.borrow().calls.clone()
    }
}

#[async_trait(?Send)]
impl ScrobbleApi for FakeApi {
    async fn recent_tracks_page(
        &self,
        _credentials: &Credentials,
        page: u32,
        limit: u32,
    ) -> Result<ScrobblePage> {
        let latency = {
            let mut state = self.state.borrow_mut();
            state.calls.push(page);
            state.latency
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.borrow_mut();
        if state.rate_limited_once.remove(&page) {
            return Err(ScrobbleIndexError::RateLimit { retry_after: 0 });
        }
        if state.failing_pages.contains(&page) {
            return Err(ScrobbleIndexError::Http("connection reset".to_string()));
        }

        let limit = limit as usize;
        let total = state.history.len();
        let start = (page as usize).saturating_sub(1) * limit;
        let mut tracks: Vec<ScrobbleRecord> =
            state.history.iter().skip(start).take(limit).cloned().collect();
        if page == 1 {
            if let Some(now_playing) = &state.now_playing {
                tracks.insert(0, now_playing.clone());
            }
        }

        Ok(ScrobblePage {
            tracks,
            page_number: page,
            total_pages: total.div_ceil(limit) as u32,
            total_scrobbles: total as u64,
        })
    }
}

/// `MemoryStorage` that keeps a copy of every saved index, can be told to
/// fail writes and can take its time writing.
#[derive(Default)]
pub struct RecordingStorage {
    inner: MemoryStorage,
    saves: Mutex<Vec<HistoryIndex>>,
    fail_saves: AtomicBool,
    save_latency: Duration,
}

impl RecordingStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_index(index: HistoryIndex) -> Self {
        Self {
            inner: MemoryStorage::with_index(index),
            ..Self::default()
        }
    }

    /// Every save sleeps for `latency` before it writes.
    pub fn with_save_latency(mut self, latency: Duration) -> Self {
        self.save_latency = latency;
        self
    }

    pub fn saves(&self) -> Vec<HistoryIndex> {
        self.saves.lock().unwrap().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().unwrap().len()
    }

    pub fn fail_saves(&self) {
        self.fail_saves.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl HistoryStorage for RecordingStorage {
    async fn load_history_index(&self) -> Result<Option<HistoryIndex>> {
        self.inner.load_history_index().await
    }

    async fn save_history_index(&self, index: &HistoryIndex) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(ScrobbleIndexError::Persistence("disk full".to_string()));
        }
        if !self.save_latency.is_zero() {
            tokio::time::sleep(self.save_latency).await;
        }
        self.saves.lock().unwrap().push(index.clone());
        self.inner.save_history_index(index).await
    }

    async fn clear_history_index(&self) -> Result<()> {
        self.inner.clear_history_index().await
    }

    async fn load_sync_settings(&self) -> Result<Option<SyncSettings>> {
        self.inner.load_sync_settings().await
    }

    async fn save_sync_settings(&self, settings: &SyncSettings) -> Result<()> {
        self.inner.save_sync_settings(settings).await
    }
}

pub type TestOrchestrator = SyncOrchestrator<FakeApi, RecordingStorage>;

/// Small pages and zero-second rate-limit backoff.
pub fn test_config() -> SyncConfig {
    SyncConfig::new()
        .with_page_size(PAGE_SIZE)
        .with_retry_config(RetryConfig::with_delays(0, 0))
}

pub async fn orchestrator_with(
    api: FakeApi,
    storage: Arc<RecordingStorage>,
    config: SyncConfig,
    pace: SyncPace,
) -> TestOrchestrator {
    storage
        .save_sync_settings(&SyncSettings {
            auto_sync_on_startup: false,
            sync_pace: pace,
        })
        .await
        .unwrap();
    SyncOrchestrator::new(
        api,
        storage,
        StaticCredentials::new("test-api-key", "test-user"),
        config,
    )
}

/// Fast-paced orchestrator with [`test_config`].
pub async fn fast_orchestrator(api: FakeApi, storage: Arc<RecordingStorage>) -> TestOrchestrator {
    orchestrator_with(api, storage, test_config(), SyncPace::Fast).await
}

/// `count` plays one minute apart, newest first, spread over a few albums.
pub fn history(count: usize, newest: u64) -> Vec<ScrobbleRecord> {
    (0..count)
        .map(|i| {
            ScrobbleRecord::new(
                &format!("Artist {}", i % 3),
                &format!("Album {}", i % 2),
                &format!("Track {i}"),
                newest - (i as u64) * 60,
            )
        })
        .collect()
}
