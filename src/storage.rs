use crate::history::HistoryIndex;
use crate::types::SyncSettings;
use crate::{Result, ScrobbleIndexError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// File name of the history index document.
pub const HISTORY_INDEX_FILE: &str = "history_index.json";
/// File name of the sync settings document.
pub const SYNC_SETTINGS_FILE: &str = "sync_settings.json";

/// Durable home of the two documents this crate owns.
///
/// Absence is not an error: loads return `Ok(None)` when nothing was saved
/// yet. Failures map to [`ScrobbleIndexError::Persistence`].
#[async_trait]
pub trait HistoryStorage: Send + Sync {
    async fn load_history_index(&self) -> Result<Option<HistoryIndex>>;

    /// Replace the stored index wholesale.
    async fn save_history_index(&self, index: &HistoryIndex) -> Result<()>;

    async fn clear_history_index(&self) -> Result<()>;

    async fn load_sync_settings(&self) -> Result<Option<SyncSettings>>;

    async fn save_sync_settings(&self, settings: &SyncSettings) -> Result<()>;
}

/// JSON files in one directory.
///
/// The default location follows the XDG data directory:
/// `~/.local/share/scrobble-index/{history_index,sync_settings}.json`.
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash mid-write leaves the previous checkpoint intact.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Storage under the platform data directory.
    pub fn default_location() -> Result<Self> {
        let data_dir = dirs::data_dir().ok_or_else(|| {
            ScrobbleIndexError::Persistence("Cannot determine XDG data directory".to_string())
        })?;
        Ok(Self::new(data_dir.join("scrobble-index")))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn read_json<T: DeserializeOwned>(&self, file: &str) -> Result<Option<T>> {
        let path = self.dir.join(file);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ScrobbleIndexError::Persistence(format!(
                    "Failed to read {}: {e}",
                    path.display()
                )))
            }
        };
        let value = serde_json::from_str(&contents).map_err(|e| {
            ScrobbleIndexError::Persistence(format!("Failed to parse {}: {e}", path.display()))
        })?;
        log::debug!("Loaded {}", path.display());
        Ok(Some(value))
    }

    async fn write_json<T: Serialize + Sync>(&self, file: &str, value: &T) -> Result<()> {
        let path = self.dir.join(file);
        let tmp_path = self.dir.join(format!("{file}.tmp"));
        let persist = |e: std::io::Error| {
            ScrobbleIndexError::Persistence(format!("Failed to write {}: {e}", path.display()))
        };

        tokio::fs::create_dir_all(&self.dir).await.map_err(persist)?;
        let json = serde_json::to_vec(value).map_err(|e| {
            ScrobbleIndexError::Persistence(format!("Failed to serialize {file}: {e}"))
        })?;
        tokio::fs::write(&tmp_path, json).await.map_err(persist)?;
        tokio::fs::rename(&tmp_path, &path).await.map_err(persist)?;

        log::debug!("Saved {}", path.display());
        Ok(())
    }
}

#[async_trait]
impl HistoryStorage for FileStorage {
    async fn load_history_index(&self) -> Result<Option<HistoryIndex>> {
        self.read_json(HISTORY_INDEX_FILE).await
    }

    async fn save_history_index(&self, index: &HistoryIndex) -> Result<()> {
        self.write_json(HISTORY_INDEX_FILE, index).await
    }

    async fn clear_history_index(&self) -> Result<()> {
        let path = self.dir.join(HISTORY_INDEX_FILE);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                log::debug!("Removed {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ScrobbleIndexError::Persistence(format!(
                "Failed to remove {}: {e}",
                path.display()
            ))),
        }
    }

    async fn load_sync_settings(&self) -> Result<Option<SyncSettings>> {
        self.read_json(SYNC_SETTINGS_FILE).await
    }

    async fn save_sync_settings(&self, settings: &SyncSettings) -> Result<()> {
        self.write_json(SYNC_SETTINGS_FILE, settings).await
    }
}

/// In-memory storage implementation for testing
#[derive(Debug, Default)]
pub struct MemoryStorage {
    history_index: RwLock<Option<HistoryIndex>>,
    sync_settings: RwLock<Option<SyncSettings>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-populated with `index`.
    pub fn with_index(index: HistoryIndex) -> Self {
        Self {
            history_index: RwLock::new(Some(index)),
            sync_settings: RwLock::new(None),
        }
    }
}

#[async_trait]
impl HistoryStorage for MemoryStorage {
    async fn load_history_index(&self) -> Result<Option<HistoryIndex>> {
        Ok(self.history_index.read().await.clone())
    }

    async fn save_history_index(&self, index: &HistoryIndex) -> Result<()> {
        *self.history_index.write().await = Some(index.clone());
        Ok(())
    }

    async fn clear_history_index(&self) -> Result<()> {
        *self.history_index.write().await = None;
        Ok(())
    }

    async fn load_sync_settings(&self) -> Result<Option<SyncSettings>> {
        Ok(*self.sync_settings.read().await)
    }

    async fn save_sync_settings(&self, settings: &SyncSettings) -> Result<()> {
        *self.sync_settings.write().await = Some(*settings);
        Ok(())
    }
}
