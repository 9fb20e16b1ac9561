//! The persisted per-album play history and its derived fuzzy lookup table.

use crate::normalize::{fuzzy_normalize_key, normalize_key, split_key};
use crate::types::ScrobbleRecord;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A single recorded play of an album.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Play {
    /// Unix timestamp (seconds)
    pub timestamp: u64,
    /// Track name, when the service reported one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track: Option<String>,
}

/// Aggregated play statistics for one exact album key.
///
/// `last_played` is the largest play timestamp and `play_count` grows by one
/// per accepted record, so it matches `plays.len()` unless a consumer trims
/// `plays`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AlbumHistoryEntry {
    pub last_played: u64,
    pub play_count: u64,
    pub plays: Vec<Play>,
}

impl AlbumHistoryEntry {
    fn record(&mut self, timestamp: u64, track: Option<String>) {
        self.play_count += 1;
        self.last_played = self.last_played.max(timestamp);
        self.plays.push(Play { timestamp, track });
    }
}

/// The durable play history of one user, keyed by exact album key.
///
/// `oldest_scrobble_date` is persisted as `0` when unset. Records with a zero
/// timestamp are rejected at ingestion, so `0` never doubles as a real date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct HistoryIndex {
    /// Unix milliseconds of the last persisted sync
    #[serde(default)]
    pub last_sync_timestamp: u64,
    /// Number of records accepted into the index
    #[serde(default)]
    pub total_scrobbles: u64,
    /// Unix seconds of the oldest accepted record
    #[serde(default, with = "zero_as_none")]
    pub oldest_scrobble_date: Option<u64>,
    #[serde(default)]
    pub albums: BTreeMap<String, AlbumHistoryEntry>,
}

impl HistoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply the ingestion rule to one fetched record.
    ///
    /// Returns `false` when the record was skipped: "now playing"
    /// placeholders, and records missing artist, album or a non-zero
    /// timestamp. Skipped records are not counted.
    pub fn ingest(&mut self, record: &ScrobbleRecord) -> bool {
        if !record.is_valid() {
            log::trace!("Skipping malformed or now-playing record: {record}");
            return false;
        }
        let Some(timestamp) = record.valid_timestamp() else {
            return false;
        };

        let key = normalize_key(&record.artist, &record.album);
        let track = Some(record.name.trim())
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        self.albums.entry(key).or_default().record(timestamp, track);

        self.total_scrobbles += 1;
        self.oldest_scrobble_date = Some(match self.oldest_scrobble_date {
            Some(oldest) => oldest.min(timestamp),
            None => timestamp,
        });
        true
    }

    /// Ingest every record in order, returning how many were accepted.
    pub fn ingest_all<'a, I>(&mut self, records: I) -> u64
    where
        I: IntoIterator<Item = &'a ScrobbleRecord>,
    {
        records
            .into_iter()
            .filter(|record| self.ingest(record))
            .count() as u64
    }

    /// Entry stored under the exact key for `artist` / `album`.
    pub fn get(&self, artist: &str, album: &str) -> Option<&AlbumHistoryEntry> {
        self.albums.get(&normalize_key(artist, album))
    }

    pub fn album_count(&self) -> usize {
        self.albums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.albums.is_empty()
    }
}

/// Serde adapter persisting `None` as `0`.
mod zero_as_none {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.unwrap_or(0))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
        let raw = Option::<u64>::deserialize(deserializer)?;
        Ok(raw.filter(|ts| *ts > 0))
    }
}

// ================================================================================================
// FUZZY INDEX
// ================================================================================================

/// Fuzzy key → exact keys that collapse to it.
///
/// Derived from a [`HistoryIndex`] in one pass over its keys and never
/// persisted. Rebuilt whenever the index is reloaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FuzzyIndex {
    entries: HashMap<String, Vec<String>>,
}

impl FuzzyIndex {
    pub fn build(index: &HistoryIndex) -> Self {
        let mut entries: HashMap<String, Vec<String>> = HashMap::new();
        for exact_key in index.albums.keys() {
            let (artist, album) = split_key(exact_key);
            entries
                .entry(fuzzy_normalize_key(artist, album))
                .or_default()
                .push(exact_key.clone());
        }
        log::debug!(
            "Built fuzzy index: {} fuzzy keys over {} albums",
            entries.len(),
            index.albums.len()
        );
        Self { entries }
    }

    /// Exact keys grouped under `fuzzy_key`, empty when there are none.
    pub fn candidates(&self, fuzzy_key: &str) -> &[String] {
        self.entries
            .get(fuzzy_key)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// How an album lookup was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Exact,
    Fuzzy,
    None,
}

/// Result of [`lookup_album`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumLookup {
    pub match_type: MatchType,
    pub entry: Option<AlbumHistoryEntry>,
    pub matched_keys: Vec<String>,
}

impl AlbumLookup {
    pub fn none() -> Self {
        Self {
            match_type: MatchType::None,
            entry: None,
            matched_keys: Vec::new(),
        }
    }

    pub fn is_match(&self) -> bool {
        self.match_type != MatchType::None
    }
}

/// Resolve `artist` / `album` against the index.
///
/// An exact key hit always wins and is returned unaggregated. Otherwise every
/// exact key sharing the fuzzy key is merged: play counts summed, the latest
/// `last_played` kept, and plays concatenated newest first.
pub fn lookup_album(
    index: &HistoryIndex,
    fuzzy: &FuzzyIndex,
    artist: &str,
    album: &str,
) -> AlbumLookup {
    let exact_key = normalize_key(artist, album);
    if let Some(entry) = index.albums.get(&exact_key) {
        return AlbumLookup {
            match_type: MatchType::Exact,
            entry: Some(entry.clone()),
            matched_keys: vec![exact_key],
        };
    }

    let candidates = fuzzy.candidates(&fuzzy_normalize_key(artist, album));
    let matched: Vec<(&String, &AlbumHistoryEntry)> = candidates
        .iter()
        .filter_map(|key| index.albums.get(key).map(|entry| (key, entry)))
        .collect();
    if matched.is_empty() {
        return AlbumLookup::none();
    }

    let mut aggregated = AlbumHistoryEntry::default();
    for (_, entry) in &matched {
        aggregated.play_count += entry.play_count;
        aggregated.last_played = aggregated.last_played.max(entry.last_played);
        aggregated.plays.extend(entry.plays.iter().cloned());
    }
    aggregated
        .plays
        .sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    AlbumLookup {
        match_type: MatchType::Fuzzy,
        entry: Some(aggregated),
        matched_keys: matched.into_iter().map(|(key, _)| key.clone()).collect(),
    }
}
