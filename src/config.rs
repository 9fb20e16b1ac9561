use std::time::Duration;

/// Tuning knobs for the sync orchestrator and the read cache.
///
/// The defaults match the Last.fm recent-tracks API: 200 records per page,
/// a checkpoint every 10 pages, at most 50 pages of incremental catch-up.
///
/// # Examples
///
/// ```rust
/// use scrobble_index::SyncConfig;
/// use std::time::Duration;
///
/// let config = SyncConfig::new()
///     .with_checkpoint_interval(5)
///     .with_cache_ttl(Duration::from_secs(10))
///     .with_retries_disabled();
/// assert_eq!(config.checkpoint_interval, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Records requested per page
    pub page_size: u32,
    /// Persist the in-progress index every this many pages
    pub checkpoint_interval: u32,
    /// Maximum pages an incremental sync walks before giving up on the boundary
    pub incremental_page_cap: u32,
    /// How long the reader serves its cached index before reloading
    pub cache_ttl: Duration,
    /// Age of the last sync after which `needs_sync` reports true
    pub stale_after: Duration,
    /// Rate-limit retries for a single page fetch
    pub retry: RetryConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: 200,
            checkpoint_interval: 10,
            incremental_page_cap: 50,
            cache_ttl: Duration::from_secs(60),
            stale_after: Duration::from_secs(24 * 60 * 60),
            retry: RetryConfig::default(),
        }
    }
}

impl SyncConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_checkpoint_interval(mut self, pages: u32) -> Self {
        self.checkpoint_interval = pages.max(1);
        self
    }

    pub fn with_incremental_page_cap(mut self, pages: u32) -> Self {
        self.incremental_page_cap = pages.max(1);
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_retries_disabled(mut self) -> Self {
        self.retry = RetryConfig::disabled();
        self
    }
}

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (set to 0 to disable retries)
    pub max_retries: u32,
    /// Base delay for exponential backoff (in seconds)
    pub base_delay: u64,
    /// Maximum delay cap (in seconds)
    pub max_delay: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: 5,
            max_delay: 300, // 5 minutes
        }
    }
}

impl RetryConfig {
    /// Create a config with retries disabled
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Create a config with custom retry count
    pub fn with_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Create a config with custom delays
    pub fn with_delays(base_delay: u64, max_delay: u64) -> Self {
        Self {
            base_delay,
            max_delay,
            ..Default::default()
        }
    }
}
