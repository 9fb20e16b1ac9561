//! Read side of the play history.
//!
//! [`IndexReader`] keeps the last loaded [`HistoryIndex`] together with its
//! [`FuzzyIndex`] and serves every query from that snapshot until the TTL
//! runs out or the orchestrator invalidates it after a persist.

use crate::history::{lookup_album, AlbumHistoryEntry, AlbumLookup, FuzzyIndex, HistoryIndex};
use crate::normalize::split_key;
use crate::storage::HistoryStorage;
use crate::Result;
use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

const SECONDS_PER_DAY: u64 = 86_400;

#[derive(Clone)]
struct CachedIndex {
    index: Arc<HistoryIndex>,
    fuzzy: Arc<FuzzyIndex>,
    loaded_at: Instant,
}

/// Cached snapshot plus a counter bumped by every invalidation. A load only
/// lands in the cache if no invalidation happened while it was in flight.
#[derive(Default)]
struct CacheSlot {
    generation: u64,
    entry: Option<CachedIndex>,
}

/// TTL-bounded cache over the persisted history index.
///
/// Readers never mutate the index; a reload swaps the cached `Arc`s. Query
/// methods never fail: a store error is logged and reads as "no data".
///
/// # Examples
///
/// ```rust
/// use scrobble_index::{HistoryIndex, IndexReader, MemoryStorage, ScrobbleRecord};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let mut index = HistoryIndex::new();
/// index.ingest(&ScrobbleRecord::new("Radiohead", "Kid A", "Idioteque", 1_700_000_000));
///
/// let storage = Arc::new(MemoryStorage::with_index(index));
/// let reader = IndexReader::new(storage, Duration::from_secs(60));
/// assert_eq!(reader.get_play_count("Radiohead", "Kid A [Explicit]").await, 1);
/// assert!(!reader.has_been_played("Radiohead", "Amnesiac").await);
/// # });
/// ```
pub struct IndexReader<S: HistoryStorage> {
    storage: Arc<S>,
    ttl: Duration,
    cache: RwLock<CacheSlot>,
}

impl<S: HistoryStorage> IndexReader<S> {
    pub fn new(storage: Arc<S>, ttl: Duration) -> Self {
        Self {
            storage,
            ttl,
            cache: RwLock::new(CacheSlot::default()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Drop the cached snapshot; the next read reloads from the store.
    pub async fn invalidate_cache(&self) {
        let mut slot = self.cache.write().await;
        slot.generation = slot.generation.wrapping_add(1);
        slot.entry = None;
        log::debug!("History index cache invalidated");
    }

    /// The current index, or `None` when nothing has been synced yet.
    ///
    /// Within the TTL window repeated calls return the same `Arc`.
    pub async fn get_index(&self) -> Result<Option<Arc<HistoryIndex>>> {
        Ok(self.cached().await?.map(|cached| cached.index))
    }

    async fn cached(&self) -> Result<Option<CachedIndex>> {
        let generation = {
            let slot = self.cache.read().await;
            if let Some(cached) = &slot.entry {
                if cached.loaded_at.elapsed() < self.ttl {
                    return Ok(Some(cached.clone()));
                }
            }
            slot.generation
        };

        let loaded = self.storage.load_history_index().await?;
        let mut slot = self.cache.write().await;
        let superseded = slot.generation != generation;
        let Some(index) = loaded else {
            if !superseded {
                slot.entry = None;
            }
            return Ok(None);
        };
        let fuzzy = FuzzyIndex::build(&index);
        let cached = CachedIndex {
            index: Arc::new(index),
            fuzzy: Arc::new(fuzzy),
            loaded_at: Instant::now(),
        };
        if superseded {
            log::debug!("History index changed while loading, not caching this snapshot");
        } else {
            slot.entry = Some(cached.clone());
            log::debug!(
                "Loaded history index with {} albums",
                cached.index.album_count()
            );
        }
        Ok(Some(cached))
    }

    async fn snapshot(&self) -> Option<CachedIndex> {
        match self.cached().await {
            Ok(cached) => cached,
            Err(e) => {
                log::warn!("Failed to load history index: {e}");
                None
            }
        }
    }

    // ------------------------------------------------------------------
    // Album lookups
    // ------------------------------------------------------------------

    /// Exact-key lookup only.
    pub async fn get_album_history(&self, artist: &str, album: &str) -> Option<AlbumHistoryEntry> {
        self.snapshot()
            .await?
            .index
            .get(artist, album)
            .cloned()
    }

    /// Exact lookup, falling back to the aggregated fuzzy match.
    pub async fn get_album_history_fuzzy(&self, artist: &str, album: &str) -> AlbumLookup {
        match self.snapshot().await {
            Some(cached) => lookup_album(&cached.index, &cached.fuzzy, artist, album),
            None => AlbumLookup::none(),
        }
    }

    pub async fn get_last_played(&self, artist: &str, album: &str) -> Option<u64> {
        self.get_album_history_fuzzy(artist, album)
            .await
            .entry
            .map(|entry| entry.last_played)
    }

    pub async fn get_play_count(&self, artist: &str, album: &str) -> u64 {
        self.get_album_history_fuzzy(artist, album)
            .await
            .entry
            .map_or(0, |entry| entry.play_count)
    }

    pub async fn has_been_played(&self, artist: &str, album: &str) -> bool {
        self.get_album_history_fuzzy(artist, album).await.is_match()
    }

    /// Whole days since the album was last played, `None` if never.
    pub async fn days_since_played(&self, artist: &str, album: &str) -> Option<u64> {
        let last_played = self.get_last_played(artist, album).await?;
        Some(days_between(last_played, now_seconds()))
    }

    // ------------------------------------------------------------------
    // Aggregations
    // ------------------------------------------------------------------

    pub async fn get_top_albums(&self, limit: usize) -> Vec<AlbumSummary> {
        match self.snapshot().await {
            Some(cached) => top_albums(&cached.index, limit),
            None => Vec::new(),
        }
    }

    pub async fn get_unique_artists(&self) -> Vec<ArtistSummary> {
        match self.snapshot().await {
            Some(cached) => unique_artists(&cached.index),
            None => Vec::new(),
        }
    }

    pub async fn list_albums(&self, query: &AlbumQuery) -> AlbumListPage {
        match self.snapshot().await {
            Some(cached) => list_albums(&cached.index, query),
            None => AlbumListPage::empty(query),
        }
    }

    /// Plays per UTC hour of day, index 0 = midnight.
    pub async fn get_hourly_distribution(&self) -> [u64; 24] {
        match self.snapshot().await {
            Some(cached) => hourly_distribution(&cached.index),
            None => [0; 24],
        }
    }

    /// Plays per UTC weekday, index 0 = Sunday.
    pub async fn get_day_of_week_distribution(&self) -> [u64; 7] {
        match self.snapshot().await {
            Some(cached) => day_of_week_distribution(&cached.index),
            None => [0; 7],
        }
    }

    /// Plays per decade of the play date, keyed by the decade's first year.
    pub async fn get_decade_distribution(&self) -> BTreeMap<i32, u64> {
        match self.snapshot().await {
            Some(cached) => decade_distribution(&cached.index),
            None => BTreeMap::new(),
        }
    }

    pub async fn get_storage_stats(&self) -> StorageStats {
        match self.snapshot().await {
            Some(cached) => StorageStats::from_index(&cached.index),
            None => StorageStats::default(),
        }
    }
}

// ================================================================================================
// QUERY TYPES
// ================================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumSummary {
    pub key: String,
    pub artist: String,
    pub album: String,
    pub play_count: u64,
    pub last_played: u64,
}

impl AlbumSummary {
    fn new(key: &str, entry: &AlbumHistoryEntry) -> Self {
        let (artist, album) = split_key(key);
        Self {
            key: key.to_string(),
            artist: artist.to_string(),
            album: album.to_string(),
            play_count: entry.play_count,
            last_played: entry.last_played,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistSummary {
    pub artist: String,
    pub album_count: usize,
    pub play_count: u64,
    pub last_played: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum AlbumSort {
    #[default]
    PlayCount,
    LastPlayed,
    Artist,
    Album,
}

impl std::str::FromStr for AlbumSort {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "playcount" | "plays" => Ok(AlbumSort::PlayCount),
            "lastplayed" | "recent" => Ok(AlbumSort::LastPlayed),
            "artist" => Ok(AlbumSort::Artist),
            "album" => Ok(AlbumSort::Album),
            other => Err(format!("unknown sort field '{other}'")),
        }
    }
}

/// Paginated, searchable, sortable album listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumQuery {
    /// 1-indexed
    pub page: usize,
    pub per_page: usize,
    /// Case-insensitive substring matched against artist and album
    pub search: Option<String>,
    pub sort: AlbumSort,
    pub descending: bool,
}

impl Default for AlbumQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 50,
            search: None,
            sort: AlbumSort::PlayCount,
            descending: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumListPage {
    pub albums: Vec<AlbumSummary>,
    /// Albums matching the search, across all pages
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
}

impl AlbumListPage {
    fn empty(query: &AlbumQuery) -> Self {
        Self {
            albums: Vec::new(),
            total: 0,
            page: query.page.max(1),
            per_page: query.per_page.max(1),
            total_pages: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StorageStats {
    pub album_count: usize,
    pub total_scrobbles: u64,
    /// Play records kept across all albums
    pub stored_plays: u64,
    pub oldest_scrobble_date: Option<u64>,
    /// Unix milliseconds
    pub last_sync_timestamp: Option<u64>,
    /// Size of the serialized index document
    pub index_size_bytes: u64,
}

impl StorageStats {
    fn from_index(index: &HistoryIndex) -> Self {
        Self {
            album_count: index.album_count(),
            total_scrobbles: index.total_scrobbles,
            stored_plays: index.albums.values().map(|e| e.plays.len() as u64).sum(),
            oldest_scrobble_date: index.oldest_scrobble_date,
            last_sync_timestamp: Some(index.last_sync_timestamp).filter(|ts| *ts > 0),
            index_size_bytes: serde_json::to_vec(index).map_or(0, |json| json.len() as u64),
        }
    }
}

// ================================================================================================
// QUERIES
// ================================================================================================

fn now_seconds() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or(0)
}

fn days_between(then: u64, now: u64) -> u64 {
    now.saturating_sub(then) / SECONDS_PER_DAY
}

fn play_datetimes(index: &HistoryIndex) -> impl Iterator<Item = DateTime<Utc>> + '_ {
    index
        .albums
        .values()
        .flat_map(|entry| entry.plays.iter())
        .filter_map(|play| DateTime::from_timestamp(i64::try_from(play.timestamp).ok()?, 0))
}

fn top_albums(index: &HistoryIndex, limit: usize) -> Vec<AlbumSummary> {
    let mut albums: Vec<AlbumSummary> = index
        .albums
        .iter()
        .map(|(key, entry)| AlbumSummary::new(key, entry))
        .collect();
    albums.sort_by(|a, b| {
        b.play_count
            .cmp(&a.play_count)
            .then_with(|| b.last_played.cmp(&a.last_played))
            .then_with(|| a.key.cmp(&b.key))
    });
    albums.truncate(limit);
    albums
}

fn unique_artists(index: &HistoryIndex) -> Vec<ArtistSummary> {
    let mut by_artist: HashMap<&str, ArtistSummary> = HashMap::new();
    for (key, entry) in &index.albums {
        let (artist, _) = split_key(key);
        let summary = by_artist.entry(artist).or_insert_with(|| ArtistSummary {
            artist: artist.to_string(),
            album_count: 0,
            play_count: 0,
            last_played: 0,
        });
        summary.album_count += 1;
        summary.play_count += entry.play_count;
        summary.last_played = summary.last_played.max(entry.last_played);
    }

    let mut artists: Vec<ArtistSummary> = by_artist.into_values().collect();
    artists.sort_by(|a, b| {
        b.play_count
            .cmp(&a.play_count)
            .then_with(|| a.artist.cmp(&b.artist))
    });
    artists
}

fn list_albums(index: &HistoryIndex, query: &AlbumQuery) -> AlbumListPage {
    let needle = query
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    let mut albums: Vec<AlbumSummary> = index
        .albums
        .iter()
        .map(|(key, entry)| AlbumSummary::new(key, entry))
        .filter(|summary| match &needle {
            Some(needle) => summary.artist.contains(needle) || summary.album.contains(needle),
            None => true,
        })
        .collect();

    albums.sort_by(|a, b| {
        let ordering = match query.sort {
            AlbumSort::PlayCount => a.play_count.cmp(&b.play_count),
            AlbumSort::LastPlayed => a.last_played.cmp(&b.last_played),
            AlbumSort::Artist => a.artist.cmp(&b.artist).then_with(|| a.album.cmp(&b.album)),
            AlbumSort::Album => a.album.cmp(&b.album).then_with(|| a.artist.cmp(&b.artist)),
        };
        let ordering = if query.descending {
            ordering.reverse()
        } else {
            ordering
        };
        ordering.then_with(|| a.key.cmp(&b.key))
    });

    let page = query.page.max(1);
    let per_page = query.per_page.max(1);
    let total = albums.len();
    let albums = albums
        .into_iter()
        .skip((page - 1).saturating_mul(per_page))
        .take(per_page)
        .collect();

    AlbumListPage {
        albums,
        total,
        page,
        per_page,
        total_pages: total.div_ceil(per_page),
    }
}

fn hourly_distribution(index: &HistoryIndex) -> [u64; 24] {
    let mut hours = [0u64; 24];
    for dt in play_datetimes(index) {
        hours[dt.hour() as usize] += 1;
    }
    hours
}

fn day_of_week_distribution(index: &HistoryIndex) -> [u64; 7] {
    let mut days = [0u64; 7];
    for dt in play_datetimes(index) {
        days[dt.weekday().num_days_from_sunday() as usize] += 1;
    }
    days
}

fn decade_distribution(index: &HistoryIndex) -> BTreeMap<i32, u64> {
    let mut decades = BTreeMap::new();
    for dt in play_datetimes(index) {
        let year = dt.year();
        *decades.entry(year - year.rem_euclid(10)).or_insert(0) += 1;
    }
    decades
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::types::{ScrobbleRecord, SyncSettings};
    use async_trait::async_trait;

    /// Reads the stored index, then holds on to it for `latency` before
    /// returning it.
    struct SlowLoadStorage {
        inner: MemoryStorage,
        latency: Duration,
    }

    #[async_trait]
    impl HistoryStorage for SlowLoadStorage {
        async fn load_history_index(&self) -> Result<Option<HistoryIndex>> {
            let loaded = self.inner.load_history_index().await?;
            tokio::time::sleep(self.latency).await;
            Ok(loaded)
        }

        async fn save_history_index(&self, index: &HistoryIndex) -> Result<()> {
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

    // 2021-01-01T00:00:00Z, a Friday
    const NEW_YEAR_2021: u64 = 1_609_459_200;

    fn sample_index() -> HistoryIndex {
        let mut index = HistoryIndex::new();
        let records = [
            ScrobbleRecord::new("Radiohead", "Kid A", "Idioteque", NEW_YEAR_2021),
            ScrobbleRecord::new("Radiohead", "Kid A", "Optimistic", NEW_YEAR_2021 + 3_600),
            ScrobbleRecord::new("Radiohead", "Kid A", "Morning Bell", NEW_YEAR_2021 + 7_200),
            ScrobbleRecord::new("Radiohead", "Amnesiac", "Knives Out", NEW_YEAR_2021 + 86_400),
            ScrobbleRecord::new("Dr. Dog", "Be The Void", "Lonesome", 946_684_800), // 2000-01-01
            ScrobbleRecord::new("Dr. Dog", "Be The Void", "That Old Black Hole", 946_684_801),
        ];
        index.ingest_all(&records);
        index.last_sync_timestamp = 1_700_000_000_000;
        index
    }

    #[tokio::test]
    async fn test_get_index_returns_same_arc_within_ttl() {
        let storage = Arc::new(MemoryStorage::with_index(sample_index()));
        let reader = IndexReader::new(storage, Duration::from_secs(60));

        let first = reader.get_index().await.unwrap().unwrap();
        let second = reader.get_index().await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_invalidate_forces_reload_of_identical_data() {
        let storage = Arc::new(MemoryStorage::with_index(sample_index()));
        let reader = IndexReader::new(storage, Duration::from_secs(60));

        let first = reader.get_index().await.unwrap().unwrap();
        reader.invalidate_cache().await;
        let second = reader.get_index().await.unwrap().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
    }

    #[tokio::test]
    async fn test_load_overlapping_invalidation_is_not_cached() {
        let mut old = HistoryIndex::new();
        old.ingest(&ScrobbleRecord::new("Wilco", "Summerteeth", "Via Chicago", 1_700_000_000));
        let storage = Arc::new(SlowLoadStorage {
            inner: MemoryStorage::with_index(old.clone()),
            latency: Duration::from_millis(100),
        });
        let reader = IndexReader::new(storage.clone(), Duration::from_secs(60));

        let mut new = old.clone();
        new.ingest(&ScrobbleRecord::new("Wilco", "Summerteeth", "Shot in the Arm", 1_700_000_100));

        let (during, ()) = tokio::join!(reader.get_index(), async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            storage.save_history_index(&new).await.unwrap();
            reader.invalidate_cache().await;
        });

        // the overlapping call still answers with what it read
        assert_eq!(during.unwrap().unwrap().total_scrobbles, 1);
        let after = reader.get_index().await.unwrap().unwrap();
        assert_eq!(after.total_scrobbles, 2);
    }

    #[tokio::test]
    async fn test_expired_ttl_reloads() {
        let storage = Arc::new(MemoryStorage::with_index(sample_index()));
        let reader = IndexReader::new(storage, Duration::from_millis(10));

        let first = reader.get_index().await.unwrap().unwrap();
        tokio::time::sleep(Duration::from_millis(25)).await;
        let second = reader.get_index().await.unwrap().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_queries_on_missing_index_are_empty() {
        let reader = IndexReader::new(Arc::new(MemoryStorage::new()), Duration::from_secs(60));

        assert!(reader.get_index().await.unwrap().is_none());
        assert!(!reader.get_album_history_fuzzy("A", "B").await.is_match());
        assert_eq!(reader.get_play_count("A", "B").await, 0);
        assert_eq!(reader.days_since_played("A", "B").await, None);
        assert!(reader.get_top_albums(5).await.is_empty());
        assert_eq!(reader.get_hourly_distribution().await, [0; 24]);
        assert_eq!(reader.get_storage_stats().await, StorageStats::default());
        assert_eq!(reader.list_albums(&AlbumQuery::default()).await.total, 0);
    }

    #[tokio::test]
    async fn test_play_queries_use_fuzzy_lookup() {
        let storage = Arc::new(MemoryStorage::with_index(sample_index()));
        let reader = IndexReader::new(storage, Duration::from_secs(60));

        assert_eq!(reader.get_play_count("RADIOHEAD", "Kid A [Explicit]").await, 3);
        assert_eq!(
            reader.get_last_played("Radiohead", "Kid A").await,
            Some(NEW_YEAR_2021 + 7_200)
        );
        assert!(reader.has_been_played("Dr. Dog", "Be The Void (Deluxe)").await);
        assert!(!reader.has_been_played("Dr. Dog", "Fate").await);
        assert!(reader.get_album_history("Radiohead", "Kid A [Explicit]").await.is_none());
        assert!(reader.days_since_played("Radiohead", "Amnesiac").await.unwrap() > 365);
    }

    #[test]
    fn test_days_between() {
        assert_eq!(days_between(0, SECONDS_PER_DAY * 3 + 5), 3);
        assert_eq!(days_between(100, 50), 0);
    }

    #[test]
    fn test_top_albums_and_artists() {
        let index = sample_index();

        let top = top_albums(&index, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].key, "radiohead|kid a");
        assert_eq!(top[0].play_count, 3);
        assert_eq!(top[1].key, "dr. dog|be the void");

        let artists = unique_artists(&index);
        assert_eq!(artists.len(), 2);
        assert_eq!(artists[0].artist, "radiohead");
        assert_eq!(artists[0].album_count, 2);
        assert_eq!(artists[0].play_count, 4);
        assert_eq!(artists[0].last_played, NEW_YEAR_2021 + 86_400);
    }

    #[test]
    fn test_list_albums_search_sort_and_paginate() {
        let index = sample_index();

        let page = list_albums(
            &index,
            &AlbumQuery {
                search: Some("  RADIO ".into()),
                sort: AlbumSort::Album,
                descending: false,
                ..AlbumQuery::default()
            },
        );
        assert_eq!(page.total, 2);
        assert_eq!(page.albums[0].album, "amnesiac");
        assert_eq!(page.albums[1].album, "kid a");

        let second = list_albums(
            &index,
            &AlbumQuery {
                page: 2,
                per_page: 2,
                sort: AlbumSort::LastPlayed,
                descending: true,
                ..AlbumQuery::default()
            },
        );
        assert_eq!(second.total, 3);
        assert_eq!(second.total_pages, 2);
        assert_eq!(second.albums.len(), 1);
        assert_eq!(second.albums[0].key, "dr. dog|be the void");

        let beyond = list_albums(
            &index,
            &AlbumQuery {
                page: 9,
                ..AlbumQuery::default()
            },
        );
        assert!(beyond.albums.is_empty());
        assert_eq!(beyond.total, 3);
    }

    #[test]
    fn test_time_distributions() {
        let index = sample_index();

        let hours = hourly_distribution(&index);
        assert_eq!(hours[0], 4); // two 2021 midnights + two 2000 midnights
        assert_eq!(hours[1], 1);
        assert_eq!(hours[2], 1);

        let days = day_of_week_distribution(&index);
        assert_eq!(days[5], 3); // Friday 2021-01-01
        assert_eq!(days[6], 3); // Saturday 2021-01-02 and 2000-01-01
        assert_eq!(days.iter().sum::<u64>(), 6);

        let decades = decade_distribution(&index);
        assert_eq!(decades.get(&2000), Some(&2));
        assert_eq!(decades.get(&2020), Some(&4));
    }

    #[test]
    fn test_storage_stats() {
        let stats = StorageStats::from_index(&sample_index());
        assert_eq!(stats.album_count, 3);
        assert_eq!(stats.total_scrobbles, 6);
        assert_eq!(stats.stored_plays, 6);
        assert_eq!(stats.oldest_scrobble_date, Some(946_684_800));
        assert_eq!(stats.last_sync_timestamp, Some(1_700_000_000_000));
        assert!(stats.index_size_bytes > 0);
    }

    #[test]
    fn test_album_sort_parsing() {
        assert_eq!("play-count".parse::<AlbumSort>(), Ok(AlbumSort::PlayCount));
        assert_eq!("last_played".parse::<AlbumSort>(), Ok(AlbumSort::LastPlayed));
        assert!("rating".parse::<AlbumSort>().is_err());
    }
}
