//! Data types shared by the sync pipeline and its consumers.
//!
//! This module contains the records fetched from the remote service, the
//! transient sync status broadcast by the orchestrator, and the persisted
//! sync preferences.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

// ================================================================================================
// REMOTE RECORDS
// ================================================================================================

/// A single entry from the user's recent tracks, as returned by the remote API.
///
/// Records are not validated at parse time. A "now playing" placeholder carries
/// `now_playing = true` and no timestamp; the ingestion rule in
/// [`HistoryIndex::ingest`](crate::HistoryIndex::ingest) decides what is kept.
///
/// # Examples
///
/// ```rust
/// use scrobble_index::ScrobbleRecord;
///
/// let record = ScrobbleRecord::new("Radiohead", "Kid A", "Idioteque", 1640995200);
/// assert!(record.is_valid());
/// assert!(!ScrobbleRecord::now_playing("Radiohead", "Kid A", "Idioteque").is_valid());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScrobbleRecord {
    /// The artist name
    pub artist: String,
    /// The album name (may be empty when the service has none)
    pub album: String,
    /// The track name
    pub name: String,
    /// Unix timestamp (seconds) of the scrobble, absent for "now playing"
    pub timestamp: Option<u64>,
    /// Whether this is the "currently playing" placeholder
    pub now_playing: bool,
}

impl ScrobbleRecord {
    /// Create a regular scrobble.
    pub fn new(artist: &str, album: &str, name: &str, timestamp: u64) -> Self {
        Self {
            artist: artist.to_string(),
            album: album.to_string(),
            name: name.to_string(),
            timestamp: Some(timestamp),
            now_playing: false,
        }
    }

    /// Create a "now playing" placeholder (no timestamp).
    pub fn now_playing(artist: &str, album: &str, name: &str) -> Self {
        Self {
            artist: artist.to_string(),
            album: album.to_string(),
            name: name.to_string(),
            timestamp: None,
            now_playing: true,
        }
    }

    /// Timestamp of an ingestible record, `None` for placeholders and zero timestamps.
    pub fn valid_timestamp(&self) -> Option<u64> {
        if self.now_playing {
            return None;
        }
        self.timestamp.filter(|ts| *ts > 0)
    }

    /// Whether the record passes the ingestion rule.
    pub fn is_valid(&self) -> bool {
        self.valid_timestamp().is_some()
            && !self.artist.trim().is_empty()
            && !self.album.trim().is_empty()
    }
}

impl fmt::Display for ScrobbleRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} [{}]", self.artist, self.name, self.album)
    }
}

/// One page of the user's recent tracks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrobblePage {
    /// The records on this page, newest first
    pub tracks: Vec<ScrobbleRecord>,
    /// Current page number (1-indexed)
    pub page_number: u32,
    /// Total number of pages reported by the service
    pub total_pages: u32,
    /// Total number of scrobbles reported by the service
    pub total_scrobbles: u64,
}

impl ScrobblePage {
    /// Whether more pages follow this one.
    pub fn has_next_page(&self) -> bool {
        self.page_number < self.total_pages
    }

    /// Oldest timestamp among the ingestible records of this page.
    pub fn oldest_timestamp(&self) -> Option<u64> {
        self.tracks
            .iter()
            .filter_map(ScrobbleRecord::valid_timestamp)
            .min()
    }
}

// ================================================================================================
// SYNC STATE
// ================================================================================================

/// Lifecycle state of the sync orchestrator.
///
/// ```text
/// idle ──► syncing ──► completed ─┐
///   ▲         │  ▲                │
///   │         ├──┼──► paused ─────┤ (any non-syncing state may start a new run)
///   │         │  │                │
///   │         └──┴──► error ──────┘
///   └──────────── clear / abort
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    #[default]
    Idle,
    Syncing,
    Paused,
    Completed,
    Error,
}

impl SyncState {
    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: SyncState) -> bool {
        use SyncState::*;
        match (self, next) {
            (Syncing, Syncing) => false,
            (_, Syncing) => true,
            (Syncing, Paused | Completed | Error | Idle) => true,
            // clear
            (_, Idle) => true,
            _ => false,
        }
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncState::Idle => "idle",
            SyncState::Syncing => "syncing",
            SyncState::Paused => "paused",
            SyncState::Completed => "completed",
            SyncState::Error => "error",
        };
        f.write_str(name)
    }
}

/// Progress snapshot broadcast by the orchestrator on every change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub status: SyncState,
    /// 0..=100
    pub progress: u8,
    pub current_page: u32,
    pub total_pages: u32,
    /// Records accepted into the index during the current run
    pub scrobbles_fetched: u64,
    /// Total scrobbles reported by the remote service
    pub total_scrobbles: u64,
    /// Seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_time_remaining: Option<u64>,
    /// Unix milliseconds of the last persisted sync
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync_timestamp: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncStatus {
    /// Percentage of `current` over `total`, clamped to 0..=100.
    pub fn percent(current: u32, total: u32) -> u8 {
        if total == 0 {
            return 0;
        }
        let pct = (u64::from(current) * 100) / u64::from(total);
        pct.min(100) as u8
    }
}

// ================================================================================================
// SETTINGS
// ================================================================================================

/// Delay between successive page requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SyncPace {
    Fast,
    #[default]
    Normal,
    Slow,
}

impl SyncPace {
    /// Pause inserted between two page requests.
    pub fn delay(self) -> Duration {
        match self {
            SyncPace::Fast => Duration::from_millis(334),
            SyncPace::Normal => Duration::from_millis(1000),
            SyncPace::Slow => Duration::from_millis(2000),
        }
    }
}

impl std::str::FromStr for SyncPace {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fast" => Ok(SyncPace::Fast),
            "normal" => Ok(SyncPace::Normal),
            "slow" => Ok(SyncPace::Slow),
            other => Err(format!("unknown sync pace '{other}' (expected fast, normal or slow)")),
        }
    }
}

/// Persisted user preferences for syncing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SyncSettings {
    #[serde(default)]
    pub auto_sync_on_startup: bool,
    #[serde(default)]
    pub sync_pace: SyncPace,
}
