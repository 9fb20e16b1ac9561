use chrono::{DateTime, Utc};
use scrobble_index::{
    EnvCredentials, FileStorage, IndexReader, LastFmApiClient, SyncConfig, SyncOrchestrator,
};
use std::path::PathBuf;
use std::sync::Arc;

pub type Orchestrator = SyncOrchestrator<LastFmApiClient, FileStorage>;

pub fn open_storage(data_dir: Option<PathBuf>) -> Result<Arc<FileStorage>, Box<dyn std::error::Error>> {
    let storage = match data_dir {
        Some(dir) => FileStorage::new(dir),
        None => FileStorage::default_location()?,
    };
    log::debug!("Using data directory {}", storage.dir().display());
    Ok(Arc::new(storage))
}

pub fn build_orchestrator(storage: Arc<FileStorage>) -> Orchestrator {
    let http_client = http_client::native::NativeClient::new();
    let api = LastFmApiClient::new(Box::new(http_client));
    SyncOrchestrator::new(api, storage, EnvCredentials, SyncConfig::default())
}

pub fn build_reader(storage: Arc<FileStorage>) -> IndexReader<FileStorage> {
    IndexReader::new(storage, SyncConfig::default().cache_ttl)
}

/// Format a Unix timestamp (seconds) as a UTC date plus a relative age
pub fn format_timestamp(timestamp: u64) -> String {
    let Some(date) = i64::try_from(timestamp)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
    else {
        return timestamp.to_string();
    };

    let ago = Utc::now().signed_duration_since(date).num_seconds();
    let relative = if ago < 0 {
        "in the future".to_string()
    } else if ago < 3600 {
        format!("{} minutes ago", ago / 60)
    } else if ago < 86400 {
        format!("{} hours ago", ago / 3600)
    } else {
        format!("{} days ago", ago / 86400)
    };
    format!("{} ({relative})", date.format("%Y-%m-%d %H:%M"))
}

/// Format a Unix timestamp in milliseconds
pub fn format_millis(millis: u64) -> String {
    format_timestamp(millis / 1000)
}
