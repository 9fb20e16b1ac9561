pub mod query;
pub mod sync;
pub mod utils;

use clap::{Subcommand, ValueEnum};
use scrobble_index::{AlbumSort, SyncPace};
use std::path::PathBuf;

#[derive(ValueEnum, Clone, Copy)]
pub enum DistributionKind {
    /// Plays per hour of day (UTC)
    Hours,
    /// Plays per day of week (UTC)
    Weekdays,
    /// Plays per decade
    Decades,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sync play history from Last.fm
    ///
    /// Requires LASTFM_API_KEY and LASTFM_USERNAME. Press Ctrl-C to pause;
    /// the next sync picks up everything newer than the last saved point.
    ///
    /// Usage examples:
    /// # Fetch plays since the last sync (full sync the first time)
    /// scrobble-index sync
    ///
    /// # Rebuild the whole index slowly
    /// scrobble-index sync --full --pace slow
    ///
    /// # Only sync if auto sync is enabled and the index is stale
    /// scrobble-index sync --startup
    Sync {
        /// Rebuild the index from scratch
        #[arg(long, conflicts_with = "startup")]
        full: bool,

        /// Run the startup check instead of syncing unconditionally
        #[arg(long)]
        startup: bool,

        /// Request pacing (fast, normal, slow); saved to settings
        #[arg(long)]
        pace: Option<SyncPace>,
    },

    /// Show index freshness and storage statistics
    Status,

    /// Look up an album's play history (exact, then fuzzy)
    ///
    /// Usage examples:
    /// scrobble-index lookup "Radiohead" "Kid A [Explicit]"
    Lookup {
        artist: String,
        album: String,

        /// Also list individual plays
        #[arg(long)]
        plays: bool,
    },

    /// Most played albums
    Top {
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Artists ranked by total plays
    Artists {
        /// Maximum number of artists to show (0 for no limit)
        #[arg(long, default_value = "0")]
        limit: usize,
    },

    /// Browse all albums
    Albums {
        #[arg(long, default_value = "1")]
        page: usize,

        #[arg(long, default_value = "50")]
        per_page: usize,

        /// Case-insensitive artist/album filter
        #[arg(long)]
        search: Option<String>,

        /// play-count, last-played, artist or album
        #[arg(long, default_value = "play-count")]
        sort: AlbumSort,

        /// Sort ascending instead of descending
        #[arg(long)]
        ascending: bool,
    },

    /// Play time distributions
    Distribution {
        #[arg(value_enum)]
        kind: DistributionKind,
    },

    /// Delete the local index
    Clear,

    /// Show or change sync settings
    Settings {
        /// Sync automatically when `sync --startup` runs
        #[arg(long)]
        auto_sync: Option<bool>,

        /// Request pacing (fast, normal, slow)
        #[arg(long)]
        pace: Option<SyncPace>,
    },
}

/// Execute the given command
pub async fn execute_command(
    command: Commands,
    data_dir: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let storage = utils::open_storage(data_dir)?;

    match command {
        Commands::Sync {
            full,
            startup,
            pace,
        } => sync::handle_sync(storage, full, startup, pace).await,
        Commands::Status => query::handle_status(storage).await,
        Commands::Lookup {
            artist,
            album,
            plays,
        } => query::handle_lookup(storage, &artist, &album, plays).await,
        Commands::Top { limit } => query::handle_top(storage, limit).await,
        Commands::Artists { limit } => query::handle_artists(storage, limit).await,
        Commands::Albums {
            page,
            per_page,
            search,
            sort,
            ascending,
        } => {
            let query = scrobble_index::AlbumQuery {
                page,
                per_page,
                search,
                sort,
                descending: !ascending,
            };
            query::handle_albums(storage, &query).await
        }
        Commands::Distribution { kind } => query::handle_distribution(storage, kind).await,
        Commands::Clear => sync::handle_clear(storage).await,
        Commands::Settings { auto_sync, pace } => {
            sync::handle_settings(storage, auto_sync, pace).await
        }
    }
}
