//! # scrobble-index
//!
//! Builds a durable, queryable index of per-album play statistics from a
//! Last.fm scrobble history and resolves noisy album naming variants
//! ("Kid A [Explicit]", "Kid A (Deluxe Edition)") to one canonical record.
//!
//! - [`SyncOrchestrator`] runs full and incremental syncs with pacing,
//!   checkpointing and pause/abort control.
//! - [`IndexReader`] serves lookups, rankings and distributions from a
//!   TTL-cached snapshot of the index.
//! - [`normalize_key`] and [`fuzzy_normalize_key`] define album identity.

pub mod api;
pub mod cancel;
pub mod config;
pub mod credentials;
pub mod error;
pub mod events;
pub mod history;
pub mod normalize;
pub mod reader;
pub mod retry;
pub mod storage;
pub mod sync;
pub mod types;

pub use api::{parse_api_recent_tracks_response, LastFmApiClient, ScrobbleApi, LASTFM_API_BASE};
pub use cancel::{ControlSignal, SyncToken};
pub use config::{RetryConfig, SyncConfig};
pub use credentials::{Credentials, CredentialsProvider, EnvCredentials, StaticCredentials};
pub use error::ScrobbleIndexError;
pub use events::{StatusBroadcaster, SyncStatusReceiver};
pub use history::{
    lookup_album, AlbumHistoryEntry, AlbumLookup, FuzzyIndex, HistoryIndex, MatchType, Play,
};
pub use normalize::{fuzzy_normalize_key, normalize_key, split_key};
pub use reader::{
    AlbumListPage, AlbumQuery, AlbumSort, AlbumSummary, ArtistSummary, IndexReader, StorageStats,
};
pub use retry::{retry_with_backoff, RetryResult};
pub use storage::{FileStorage, HistoryStorage, MemoryStorage};
pub use sync::SyncOrchestrator;
pub use types::{
    ScrobblePage, ScrobbleRecord, SyncPace, SyncSettings, SyncState, SyncStatus,
};

#[cfg(feature = "mock")]
pub use api::MockScrobbleApi;

pub type Result<T> = std::result::Result<T, ScrobbleIndexError>;
