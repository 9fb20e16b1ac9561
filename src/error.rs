use crate::types::SyncState;
use thiserror::Error;

/// Error types for scrobble sync and index operations.
///
/// Only some of these abort a sync. A failed page fetch during a full sync
/// ([`Http`](Self::Http), [`Api`](Self::Api), [`RateLimit`](Self::RateLimit),
/// [`Parse`](Self::Parse)) is logged and the page is skipped. Configuration
/// and persistence failures are always surfaced to the caller.
///
/// # Error Handling Examples
///
/// ```rust,no_run
/// use scrobble_index::{MemoryStorage, ScrobbleIndexError, SyncOrchestrator};
/// # async fn run<A: scrobble_index::ScrobbleApi>(orchestrator: SyncOrchestrator<A, MemoryStorage>) {
/// match orchestrator.start_full_sync().await {
///     Ok(()) => println!("Sync finished"),
///     Err(ScrobbleIndexError::Configuration(msg)) => eprintln!("Fix your credentials: {msg}"),
///     Err(ScrobbleIndexError::Persistence(msg)) => eprintln!("Could not save index: {msg}"),
///     Err(e) => eprintln!("Sync failed: {e}"),
/// }
/// # }
/// ```
#[derive(Error, Debug)]
pub enum ScrobbleIndexError {
    /// Missing or empty API key / username.
    ///
    /// Raised before any page is fetched.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// HTTP/network related errors.
    ///
    /// This includes connection failures, timeouts, DNS errors, and other
    /// low-level networking issues.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Last.fm answered with an error document (`{"error": code, "message": ...}`).
    #[error("Last.fm API error {code}: {message}")]
    Api {
        /// Last.fm error code
        code: u32,
        /// Message returned by Last.fm
        message: String,
    },

    /// Rate limiting from Last.fm.
    ///
    /// The `retry_after` field indicates how many seconds to wait before
    /// the next request attempt.
    #[error("Rate limited, retry after {retry_after} seconds")]
    RateLimit {
        /// Number of seconds to wait before retrying
        retry_after: u64,
    },

    /// Failed to parse Last.fm's response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Reading or writing the durable store failed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// A control operation is not valid from the current sync state.
    #[error("Invalid sync transition from {from} to {to}")]
    InvalidTransition {
        /// State the orchestrator was in
        from: SyncState,
        /// State the caller asked for
        to: SyncState,
    },

    /// A cancellable wait was interrupted by pause or abort.
    #[error("Operation cancelled")]
    Cancelled,
}

impl ScrobbleIndexError {
    /// Whether this error came from fetching a remote page.
    ///
    /// Such errors are skipped by a full sync instead of failing the run.
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Api { .. } | Self::RateLimit { .. } | Self::Parse(_)
        )
    }
}
