//! # Sync Orchestrator
//!
//! Drives full and incremental synchronization of the play history from the
//! remote service into the durable [`HistoryIndex`].
//!
//! A full sync walks every page newest-first, pacing requests according to
//! the persisted [`SyncPace`](crate::SyncPace) and checkpointing the index
//! every few pages. An incremental sync walks forward from page 1 until it
//! reaches records already covered by the last sync.
//!
//! Only one run is active at a time. Control calls (`pause_sync`,
//! `abort_sync`, `clear_index`) signal the active run through its
//! [`SyncToken`]; the run observes the signal at its next page boundary.

use crate::api::ScrobbleApi;
use crate::cancel::{ControlSignal, SyncToken};
use crate::config::SyncConfig;
use crate::credentials::{Credentials, CredentialsProvider};
use crate::events::{StatusBroadcaster, SyncStatusReceiver};
use crate::history::HistoryIndex;
use crate::reader::IndexReader;
use crate::retry::retry_with_backoff;
use crate::storage::HistoryStorage;
use crate::types::{ScrobblePage, SyncSettings, SyncState, SyncStatus};
use crate::{Result, ScrobbleIndexError};
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Unix milliseconds, wall clock.
fn now_millis() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}

/// The run currently allowed to write status and the index.
#[derive(Debug, Clone)]
struct ActiveRun {
    id: u64,
    token: SyncToken,
}

#[derive(Debug, Default)]
struct ControlState {
    active: Option<ActiveRun>,
    last_run_id: u64,
}

/// How a run that did not fail came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunOutcome {
    Completed,
    Paused,
    Aborted,
}

/// Counters for the status snapshots of one run.
#[derive(Debug)]
struct RunProgress {
    started: Instant,
    pages_done: u32,
    current_page: u32,
    total_pages: u32,
    scrobbles_fetched: u64,
    total_scrobbles: u64,
    last_sync_timestamp: Option<u64>,
}

impl RunProgress {
    fn new(last_sync_timestamp: Option<u64>) -> Self {
        Self {
            started: Instant::now(),
            pages_done: 0,
            current_page: 0,
            total_pages: 0,
            scrobbles_fetched: 0,
            total_scrobbles: 0,
            last_sync_timestamp,
        }
    }

    fn page_done(&mut self, page: u32, accepted: u64) {
        self.pages_done += 1;
        self.current_page = page;
        self.scrobbles_fetched += accepted;
    }

    /// Average time per page so far times the pages still to go.
    fn estimated_time_remaining(&self) -> Option<u64> {
        if self.pages_done == 0 {
            return None;
        }
        let remaining = self.total_pages.saturating_sub(self.current_page);
        let per_page = self.started.elapsed() / self.pages_done;
        Some((per_page * remaining).as_secs())
    }

    fn status(&self, state: SyncState) -> SyncStatus {
        let (progress, estimated_time_remaining) = match state {
            SyncState::Completed => (100, None),
            SyncState::Syncing => (
                SyncStatus::percent(self.current_page, self.total_pages),
                self.estimated_time_remaining(),
            ),
            _ => (SyncStatus::percent(self.current_page, self.total_pages), None),
        };
        SyncStatus {
            status: state,
            progress,
            current_page: self.current_page,
            total_pages: self.total_pages,
            scrobbles_fetched: self.scrobbles_fetched,
            total_scrobbles: self.total_scrobbles,
            estimated_time_remaining,
            last_sync_timestamp: self.last_sync_timestamp,
            error: None,
        }
    }
}

/// Synchronizes a user's scrobble history into the durable index.
///
/// # Examples
///
/// ```rust,no_run
/// use scrobble_index::{
///     EnvCredentials, FileStorage, LastFmApiClient, SyncConfig, SyncOrchestrator,
/// };
/// use std::sync::Arc;
///
/// # async fn example() -> scrobble_index::Result<()> {
/// let http_client = http_client::native::NativeClient::new();
/// let api = LastFmApiClient::new(Box::new(http_client));
/// let storage = Arc::new(FileStorage::default_location()?);
/// let orchestrator = SyncOrchestrator::new(api, storage, EnvCredentials, SyncConfig::default());
///
/// orchestrator.start_incremental_sync().await?;
/// let plays = orchestrator.reader().get_play_count("Radiohead", "Kid A").await;
/// println!("Kid A played {plays} times");
/// # Ok(())
/// # }
/// ```
pub struct SyncOrchestrator<A: ScrobbleApi, S: HistoryStorage> {
    api: A,
    storage: Arc<S>,
    credentials: Box<dyn CredentialsProvider>,
    reader: Arc<IndexReader<S>>,
    config: SyncConfig,
    events: StatusBroadcaster,
    control: Mutex<ControlState>,
    /// Held across every save and clear of the index.
    writes: tokio::sync::Mutex<()>,
}

impl<A: ScrobbleApi, S: HistoryStorage> SyncOrchestrator<A, S> {
    pub fn new(
        api: A,
        storage: Arc<S>,
        credentials: impl CredentialsProvider + 'static,
        config: SyncConfig,
    ) -> Self {
        let reader = Arc::new(IndexReader::new(storage.clone(), config.cache_ttl));
        Self {
            api,
            storage,
            credentials: Box::new(credentials),
            reader,
            config,
            events: StatusBroadcaster::new(),
            control: Mutex::new(ControlState::default()),
            writes: tokio::sync::Mutex::new(()),
        }
    }

    /// The read side sharing this orchestrator's store and cache.
    pub fn reader(&self) -> &Arc<IndexReader<S>> {
        &self.reader
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Latest status snapshot.
    pub fn sync_status(&self) -> SyncStatus {
        self.events.latest()
    }

    /// Status snapshots as they are emitted.
    pub fn subscribe(&self) -> SyncStatusReceiver {
        self.events.subscribe()
    }

    pub fn is_syncing(&self) -> bool {
        self.control().active.is_some()
    }

    fn control(&self) -> MutexGuard<'_, ControlState> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Emit `status` if its state is reachable from the current one. Callers
    /// hold the control lock.
    fn transition(&self, status: SyncStatus) -> Result<()> {
        let from = self.events.latest().status;
        let to = status.status;
        if !from.can_transition_to(to) {
            return Err(ScrobbleIndexError::InvalidTransition { from, to });
        }
        self.events.broadcast(status);
        Ok(())
    }

    // ========================================================================
    // Control API
    // ========================================================================

    /// Rebuild the index from scratch.
    ///
    /// Returns immediately without touching any state when a sync is already
    /// running.
    pub async fn start_full_sync(&self) -> Result<()> {
        let Some(run) = self.begin_run("full") else {
            return Ok(());
        };
        let result = self.run_full_sync(&run).await;
        self.end_run(&run, result)
    }

    /// Fetch plays newer than the last sync; falls back to a full sync when
    /// no index exists yet.
    pub async fn start_incremental_sync(&self) -> Result<()> {
        let Some(run) = self.begin_run("incremental") else {
            return Ok(());
        };
        let result = self.run_incremental_sync(&run).await;
        self.end_run(&run, result)
    }

    /// Ask the active run to pause at its next page boundary.
    pub fn pause_sync(&self) {
        match &self.control().active {
            Some(run) => {
                log::info!("Pausing sync");
                run.token.pause();
            }
            None => log::debug!("No sync in progress, nothing to pause"),
        }
    }

    /// Continue after a pause.
    ///
    /// This runs an incremental sync from the last persisted sync time; the
    /// page position of the paused run is not restored.
    pub async fn resume_sync(&self) -> Result<()> {
        let from = self.sync_status().status;
        if from != SyncState::Paused {
            return Err(ScrobbleIndexError::InvalidTransition {
                from,
                to: SyncState::Syncing,
            });
        }
        log::info!("Resuming sync");
        self.start_incremental_sync().await
    }

    /// Stop the active run without finalizing it; status returns to idle.
    pub fn abort_sync(&self) {
        match &self.control().active {
            Some(run) => {
                log::info!("Aborting sync");
                run.token.abort();
            }
            None => log::debug!("No sync in progress, nothing to abort"),
        }
    }

    /// Abort any active run, delete the persisted index and reset to idle.
    pub async fn clear_index(&self) -> Result<()> {
        let aborted = {
            let mut control = self.control();
            let aborted = control.active.take();
            self.transition(SyncStatus::default())?;
            aborted
        };
        if let Some(run) = aborted {
            log::info!("Aborting running sync to clear the index");
            run.token.abort();
        }

        // an in-flight save of the aborted run lands before the delete
        let _writes = self.writes.lock().await;
        self.storage.clear_history_index().await?;
        self.reader.invalidate_cache().await;
        log::info!("History index cleared");
        Ok(())
    }

    /// True when no index exists or the last sync is older than
    /// [`SyncConfig::stale_after`].
    pub async fn needs_sync(&self) -> bool {
        match self.reader.get_index().await {
            Ok(Some(index)) => {
                let age = now_millis().saturating_sub(index.last_sync_timestamp);
                u128::from(age) >= self.config.stale_after.as_millis()
            }
            Ok(None) => true,
            Err(e) => {
                log::warn!("Could not read history index, assuming a sync is needed: {e}");
                true
            }
        }
    }

    /// Persisted settings, or the defaults when none were saved.
    pub async fn settings(&self) -> Result<SyncSettings> {
        Ok(self.storage.load_sync_settings().await?.unwrap_or_default())
    }

    pub async fn update_settings(&self, settings: SyncSettings) -> Result<()> {
        self.storage.save_sync_settings(&settings).await?;
        log::info!(
            "Sync settings updated: auto sync on startup = {}, pace = {:?}",
            settings.auto_sync_on_startup,
            settings.sync_pace
        );
        Ok(())
    }

    /// Run an incremental sync if auto-sync is enabled and the index is
    /// stale. Returns whether a sync ran.
    pub async fn run_startup_sync(&self) -> Result<bool> {
        let settings = self.settings().await?;
        if !settings.auto_sync_on_startup {
            log::debug!("Auto sync on startup disabled");
            return Ok(false);
        }
        if !self.needs_sync().await {
            log::debug!("History index is fresh, skipping startup sync");
            return Ok(false);
        }
        log::info!("Running startup sync");
        self.start_incremental_sync().await?;
        Ok(true)
    }

    // ========================================================================
    // Run bookkeeping
    // ========================================================================

    /// Claim the single active-run slot. No await happens between the check
    /// and the claim.
    fn begin_run(&self, kind: &str) -> Option<ActiveRun> {
        let mut control = self.control();
        let starting = SyncStatus {
            status: SyncState::Syncing,
            last_sync_timestamp: self.events.latest().last_sync_timestamp,
            ..SyncStatus::default()
        };
        if let Err(e) = self.transition(starting) {
            log::info!("Ignoring {kind} sync request: {e}");
            return None;
        }

        control.last_run_id += 1;
        let run = ActiveRun {
            id: control.last_run_id,
            token: SyncToken::new(),
        };
        control.active = Some(run.clone());

        log::info!("Starting {kind} sync");
        Some(run)
    }

    /// Emit a status for `run` if it still owns the active slot.
    fn publish(&self, run: &ActiveRun, status: SyncStatus) {
        let control = self.control();
        if control.active.as_ref().map(|active| active.id) != Some(run.id) {
            return;
        }
        self.events.broadcast(status);
    }

    /// Release the active slot and emit the run's final status.
    fn finish(&self, run: &ActiveRun, status: SyncStatus) {
        let mut control = self.control();
        if control.active.as_ref().map(|active| active.id) != Some(run.id) {
            log::debug!("Sync run {} ended after being superseded", run.id);
            return;
        }
        control.active = None;
        if let Err(e) = self.transition(status) {
            log::warn!("Sync run {} could not record its final status: {e}", run.id);
        }
    }

    fn end_run(&self, run: &ActiveRun, result: Result<RunOutcome>) -> Result<()> {
        match result {
            Ok(RunOutcome::Completed) => {
                log::info!("Sync completed");
                Ok(())
            }
            Ok(RunOutcome::Paused) => {
                log::info!("Sync paused");
                Ok(())
            }
            Ok(RunOutcome::Aborted) => {
                log::info!("Sync aborted");
                let last_sync_timestamp = self.sync_status().last_sync_timestamp;
                self.finish(
                    run,
                    SyncStatus {
                        last_sync_timestamp,
                        ..SyncStatus::default()
                    },
                );
                Ok(())
            }
            Err(e) => {
                log::error!("Sync failed: {e}");
                let mut status = self.sync_status();
                status.status = SyncState::Error;
                status.estimated_time_remaining = None;
                status.error = Some(e.to_string());
                self.finish(run, status);
                Err(e)
            }
        }
    }

    /// Handle a pause or abort observed at a page boundary.
    fn interrupted(&self, run: &ActiveRun, progress: &RunProgress) -> Option<RunOutcome> {
        match run.token.stop_requested()? {
            ControlSignal::Abort => Some(RunOutcome::Aborted),
            ControlSignal::Pause => {
                self.finish(run, progress.status(SyncState::Paused));
                Some(RunOutcome::Paused)
            }
            ControlSignal::Run => None,
        }
    }

    /// Save `index` for `run`. Returns `false` without writing once the run
    /// has been aborted.
    async fn persist(&self, run: &ActiveRun, index: &HistoryIndex) -> Result<bool> {
        let _writes = self.writes.lock().await;
        if run.token.is_aborted() {
            log::debug!("Sync run {} aborted, not persisting", run.id);
            return Ok(false);
        }
        self.storage.save_history_index(index).await?;
        self.reader.invalidate_cache().await;
        log::debug!(
            "Persisted history index ({} albums, {} scrobbles)",
            index.album_count(),
            index.total_scrobbles
        );
        Ok(true)
    }

    async fn pacing_delay(&self) -> Duration {
        match self.storage.load_sync_settings().await {
            Ok(settings) => settings.unwrap_or_default().sync_pace.delay(),
            Err(e) => {
                log::warn!("Could not load sync settings, using default pace: {e}");
                SyncSettings::default().sync_pace.delay()
            }
        }
    }

    /// One page, retried on rate limiting. Backoff waits wake on pause/abort.
    async fn fetch_page(
        &self,
        run: &ActiveRun,
        credentials: &Credentials,
        page: u32,
    ) -> Result<ScrobblePage> {
        let api = &self.api;
        let token = &run.token;
        let limit = self.config.page_size;
        let retried = retry_with_backoff(
            &self.config.retry,
            "Recent tracks",
            move || api.recent_tracks_page(credentials, page, limit),
            move |delay| token.sleep(delay),
        )
        .await?;
        if retried.attempts_made > 0 {
            log::debug!(
                "Page {page} fetched after {} retries ({}s waiting)",
                retried.attempts_made,
                retried.total_retry_time
            );
        }
        Ok(retried.result)
    }

    // ========================================================================
    // Full sync
    // ========================================================================

    async fn run_full_sync(&self, run: &ActiveRun) -> Result<RunOutcome> {
        let credentials = self.credentials.credentials()?;
        let delay = self.pacing_delay().await;
        let mut progress = RunProgress::new(self.sync_status().last_sync_timestamp);

        // page 1 tells us how many pages there are
        let first = self.fetch_page(run, &credentials, 1).await?;
        if run.token.is_aborted() {
            return Ok(RunOutcome::Aborted);
        }

        let total_pages = first.total_pages.max(1);
        progress.total_pages = total_pages;
        progress.total_scrobbles = first.total_scrobbles;
        log::info!(
            "Full sync: {} scrobbles across {} pages",
            first.total_scrobbles,
            total_pages
        );

        let mut index = HistoryIndex::new();
        let accepted = index.ingest_all(&first.tracks);
        index.last_sync_timestamp = now_millis();
        if !self.persist(run, &index).await? {
            return Ok(RunOutcome::Aborted);
        }
        progress.last_sync_timestamp = Some(index.last_sync_timestamp);
        progress.page_done(1, accepted);
        self.publish(run, progress.status(SyncState::Syncing));

        for page in 2..=total_pages {
            if let Some(outcome) = self.interrupted(run, &progress) {
                return Ok(outcome);
            }
            if run.token.sleep(delay).await.is_err() {
                if let Some(outcome) = self.interrupted(run, &progress) {
                    return Ok(outcome);
                }
            }

            let accepted = match self.fetch_page(run, &credentials, page).await {
                Ok(fetched) => {
                    if run.token.is_aborted() {
                        return Ok(RunOutcome::Aborted);
                    }
                    index.ingest_all(&fetched.tracks)
                }
                Err(ScrobbleIndexError::Cancelled) => {
                    if let Some(outcome) = self.interrupted(run, &progress) {
                        return Ok(outcome);
                    }
                    0
                }
                Err(e) if e.is_fetch_error() => {
                    log::warn!("Failed to fetch page {page}/{total_pages}, skipping: {e}");
                    if run.token.is_aborted() {
                        return Ok(RunOutcome::Aborted);
                    }
                    0
                }
                Err(e) => return Err(e),
            };
            progress.page_done(page, accepted);

            if page % self.config.checkpoint_interval.max(1) == 0 {
                index.last_sync_timestamp = now_millis();
                if !self.persist(run, &index).await? {
                    return Ok(RunOutcome::Aborted);
                }
                progress.last_sync_timestamp = Some(index.last_sync_timestamp);
                log::info!("Checkpoint at page {page}/{total_pages}");
            }

            log::debug!(
                "Page {page}/{total_pages}: {accepted} scrobbles, {} albums so far",
                index.album_count()
            );
            self.publish(run, progress.status(SyncState::Syncing));
        }

        index.last_sync_timestamp = now_millis();
        if !self.persist(run, &index).await? {
            return Ok(RunOutcome::Aborted);
        }
        progress.last_sync_timestamp = Some(index.last_sync_timestamp);
        progress.current_page = total_pages;
        self.finish(run, progress.status(SyncState::Completed));
        log::info!(
            "Full sync indexed {} scrobbles into {} albums",
            index.total_scrobbles,
            index.album_count()
        );
        Ok(RunOutcome::Completed)
    }

    // ========================================================================
    // Incremental sync
    // ========================================================================

    async fn run_incremental_sync(&self, run: &ActiveRun) -> Result<RunOutcome> {
        let credentials = self.credentials.credentials()?;
        let Some(mut index) = self.storage.load_history_index().await? else {
            log::info!("No history index yet, running a full sync instead");
            return self.run_full_sync(run).await;
        };

        let last_sync_time = index.last_sync_timestamp / 1000;
        let cap = self.config.incremental_page_cap;
        let delay = self.pacing_delay().await;
        let mut progress = RunProgress::new(Some(index.last_sync_timestamp));
        log::info!("Incremental sync of plays newer than {last_sync_time}");

        let mut page = 1;
        loop {
            if let Some(outcome) = self.interrupted(run, &progress) {
                return Ok(outcome);
            }
            if page > 1 && run.token.sleep(delay).await.is_err() {
                if let Some(outcome) = self.interrupted(run, &progress) {
                    return Ok(outcome);
                }
            }

            // a skipped page could hold plays newer than the boundary
            let fetched = match self.fetch_page(run, &credentials, page).await {
                Ok(fetched) => fetched,
                Err(ScrobbleIndexError::Cancelled) => {
                    if let Some(outcome) = self.interrupted(run, &progress) {
                        return Ok(outcome);
                    }
                    continue;
                }
                Err(e) => return Err(e),
            };
            if run.token.is_aborted() {
                return Ok(RunOutcome::Aborted);
            }

            progress.total_pages = fetched.total_pages.min(cap);
            progress.total_scrobbles = fetched.total_scrobbles;
            let accepted = index.ingest_all(
                fetched
                    .tracks
                    .iter()
                    .filter(|record| record.valid_timestamp().is_some_and(|ts| ts > last_sync_time)),
            );
            progress.page_done(page, accepted);
            log::debug!("Incremental page {page}: {accepted} new scrobbles");

            let reached_boundary = fetched
                .oldest_timestamp()
                .is_some_and(|oldest| oldest <= last_sync_time);
            if reached_boundary || fetched.tracks.is_empty() || !fetched.has_next_page() {
                break;
            }
            if page >= cap {
                log::warn!(
                    "Incremental sync stopped after {cap} pages without reaching the last sync point"
                );
                break;
            }

            self.publish(run, progress.status(SyncState::Syncing));
            page += 1;
        }

        index.last_sync_timestamp = now_millis();
        if !self.persist(run, &index).await? {
            return Ok(RunOutcome::Aborted);
        }
        progress.last_sync_timestamp = Some(index.last_sync_timestamp);
        progress.total_pages = progress.current_page;
        self.finish(run, progress.status(SyncState::Completed));
        log::info!(
            "Incremental sync added {} scrobbles",
            progress.scrobbles_fetched
        );
        Ok(RunOutcome::Completed)
    }
}

impl<A: ScrobbleApi, S: HistoryStorage> std::fmt::Debug for SyncOrchestrator<A, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncOrchestrator")
            .field("config", &self.config)
            .field("status", &self.sync_status().status)
            .finish()
    }
}
