use crate::credentials::Credentials;
use crate::types::{ScrobblePage, ScrobbleRecord};
use crate::{Result, ScrobbleIndexError};
use async_trait::async_trait;
use http_client::{HttpClient, Request};
use http_types::{Method, Url};
use serde::{Deserialize, Deserializer};
use std::sync::Arc;

pub const LASTFM_API_BASE: &str = "https://ws.audioscrobbler.com/2.0/";

/// Last.fm error code for "Rate Limit Exceeded".
const RATE_LIMIT_ERROR_CODE: u32 = 29;
/// Seconds to wait when Last.fm rate limits without saying for how long.
const DEFAULT_RETRY_AFTER: u64 = 10;

// =============================================================================
// ScrobbleApi trait and implementation
// =============================================================================

/// Paginated access to a user's scrobble history, newest first.
///
/// When the `mock` feature is enabled, `MockScrobbleApi` is generated with
/// `mockall`.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait(?Send)]
pub trait ScrobbleApi {
    /// Fetch one page (1-indexed) of `limit` records.
    async fn recent_tracks_page(
        &self,
        credentials: &Credentials,
        page: u32,
        limit: u32,
    ) -> Result<ScrobblePage>;
}

/// `user.getRecentTracks` over the Last.fm JSON API.
#[derive(Clone)]
pub struct LastFmApiClient {
    client: Arc<dyn HttpClient + Send + Sync>,
    base_url: String,
}

impl LastFmApiClient {
    pub fn new(client: Box<dyn HttpClient + Send + Sync>) -> Self {
        Self {
            client: Arc::from(client),
            base_url: LASTFM_API_BASE.to_string(),
        }
    }

    /// Point the client at another endpoint (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

fn recent_tracks_url(base_url: &str, credentials: &Credentials, page: u32, limit: u32) -> String {
    format!(
        "{}?method=user.getrecenttracks&user={}&api_key={}&format=json&page={}&limit={}",
        base_url,
        urlencoding::encode(&credentials.username),
        urlencoding::encode(&credentials.api_key),
        page,
        limit
    )
}

impl std::fmt::Debug for LastFmApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LastFmApiClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[async_trait(?Send)]
impl ScrobbleApi for LastFmApiClient {
    async fn recent_tracks_page(
        &self,
        credentials: &Credentials,
        page: u32,
        limit: u32,
    ) -> Result<ScrobblePage> {
        let url = recent_tracks_url(&self.base_url, credentials, page, limit);
        let url = url
            .parse::<Url>()
            .map_err(|e| ScrobbleIndexError::Http(format!("Invalid request URL: {e}")))?;

        let request_start = std::time::Instant::now();
        let request = Request::new(Method::Get, url);
        let mut response = self
            .client
            .send(request)
            .await
            .map_err(|e| ScrobbleIndexError::Http(e.to_string()))?;

        let status: u16 = response.status().into();
        log::debug!(
            "GET user.getrecenttracks page {page} -> {status} in {}ms",
            request_start.elapsed().as_millis()
        );

        let body = response
            .body_string()
            .await
            .map_err(|e| ScrobbleIndexError::Http(e.to_string()))?;

        if status == 429 {
            return Err(ScrobbleIndexError::RateLimit {
                retry_after: DEFAULT_RETRY_AFTER,
            });
        }
        if let Some(error) = parse_api_error(&body) {
            return Err(error);
        }
        if !(200..300).contains(&status) {
            return Err(ScrobbleIndexError::Http(format!(
                "Unexpected HTTP status {status}"
            )));
        }

        parse_api_recent_tracks_response(&body)
    }
}

// =============================================================================
// Response parsing
// =============================================================================

#[derive(Deserialize)]
struct ApiRecentTracksResponse {
    recenttracks: ApiRecentTracks,
}

#[derive(Deserialize)]
struct ApiRecentTracks {
    #[serde(default, deserialize_with = "one_or_many")]
    track: Vec<ApiTrack>,
    #[serde(rename = "@attr")]
    attr: ApiPaginationAttr,
}

#[derive(Deserialize)]
struct ApiTrack {
    #[serde(default)]
    name: String,
    #[serde(default)]
    artist: ApiTextField,
    #[serde(default)]
    album: ApiTextField,
    date: Option<ApiDate>,
    #[serde(rename = "@attr")]
    attr: Option<ApiTrackAttr>,
}

#[derive(Deserialize, Default)]
struct ApiTextField {
    #[serde(rename = "#text", default)]
    text: String,
}

#[derive(Deserialize)]
struct ApiDate {
    #[serde(deserialize_with = "lenient_u64")]
    uts: u64,
}

#[derive(Deserialize)]
struct ApiTrackAttr {
    nowplaying: Option<String>,
}

#[derive(Deserialize)]
struct ApiPaginationAttr {
    #[serde(default, deserialize_with = "lenient_u64")]
    page: u64,
    #[serde(rename = "totalPages", default, deserialize_with = "lenient_u64")]
    total_pages: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    total: u64,
}

#[derive(Deserialize)]
struct ApiErrorResponse {
    error: u32,
    #[serde(default)]
    message: String,
}

/// Last.fm returns a bare object instead of an array for single-track pages.
fn one_or_many<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        Many(Vec<T>),
        One(T),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(items) => items,
        OneOrMany::One(item) => vec![item],
    })
}

/// Numbers arrive as JSON strings ("1700000000") most of the time.
fn lenient_u64<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        Number(u64),
        Text(String),
    }

    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::Number(n) => Ok(n),
        StringOrNumber::Text(s) if s.trim().is_empty() => Ok(0),
        StringOrNumber::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn parse_api_error(body: &str) -> Option<ScrobbleIndexError> {
    let error: ApiErrorResponse = serde_json::from_str(body).ok()?;
    Some(if error.error == RATE_LIMIT_ERROR_CODE {
        ScrobbleIndexError::RateLimit {
            retry_after: DEFAULT_RETRY_AFTER,
        }
    } else {
        ScrobbleIndexError::Api {
            code: error.error,
            message: error.message,
        }
    })
}

/// Parse a `user.getRecentTracks` JSON document.
///
/// "Now playing" entries are kept (flagged, without timestamp); filtering
/// happens at ingestion.
pub fn parse_api_recent_tracks_response(json: &str) -> Result<ScrobblePage> {
    let response: ApiRecentTracksResponse =
        serde_json::from_str(json).map_err(|e| ScrobbleIndexError::Parse(e.to_string()))?;
    let recent = response.recenttracks;

    let tracks = recent
        .track
        .into_iter()
        .map(|t| {
            let now_playing = t
                .attr
                .as_ref()
                .and_then(|attr| attr.nowplaying.as_deref())
                == Some("true");
            ScrobbleRecord {
                artist: t.artist.text,
                album: t.album.text,
                name: t.name,
                timestamp: if now_playing {
                    None
                } else {
                    t.date.map(|d| d.uts)
                },
                now_playing,
            }
        })
        .collect();

    Ok(ScrobblePage {
        tracks,
        page_number: u32::try_from(recent.attr.page).unwrap_or(u32::MAX).max(1),
        total_pages: u32::try_from(recent.attr.total_pages).unwrap_or(u32::MAX),
        total_scrobbles: recent.attr.total,
    })
}
