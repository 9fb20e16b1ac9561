use super::utils::{build_orchestrator, format_millis};
use scrobble_index::{FileStorage, HistoryStorage, SyncPace, SyncSettings, SyncState, SyncStatus};
use std::sync::Arc;

fn print_progress(status: &SyncStatus) {
    match status.status {
        SyncState::Syncing if status.total_pages > 0 => {
            let eta = status
                .estimated_time_remaining
                .map(|secs| format!(", ~{secs}s left"))
                .unwrap_or_default();
            println!(
                "🔄 Page {}/{} ({}%) {} scrobbles{eta}",
                status.current_page, status.total_pages, status.progress, status.scrobbles_fetched
            );
        }
        SyncState::Syncing => println!("🔄 Sync started"),
        SyncState::Paused => println!(
            "⏸️  Paused at page {}/{}; run `scrobble-index sync` to catch up",
            status.current_page, status.total_pages
        ),
        SyncState::Completed => println!(
            "✅ Sync completed: {} scrobbles fetched",
            status.scrobbles_fetched
        ),
        SyncState::Error => println!(
            "❌ Sync failed: {}",
            status.error.as_deref().unwrap_or("unknown error")
        ),
        SyncState::Idle => println!("⏹️  Sync stopped"),
    }
}

/// Handle the sync command
pub async fn handle_sync(
    storage: Arc<FileStorage>,
    full: bool,
    startup: bool,
    pace: Option<SyncPace>,
) -> Result<(), Box<dyn std::error::Error>> {
    let orchestrator = build_orchestrator(storage);

    if let Some(pace) = pace {
        let mut settings = orchestrator.settings().await?;
        settings.sync_pace = pace;
        orchestrator.update_settings(settings).await?;
    }

    let mut updates = orchestrator.subscribe();
    let sync = async {
        if startup {
            orchestrator.run_startup_sync().await.map(|ran| {
                if !ran {
                    println!("⏭️  No startup sync needed");
                }
            })
        } else if full {
            orchestrator.start_full_sync().await
        } else {
            orchestrator.start_incremental_sync().await
        }
    };
    tokio::pin!(sync);

    let result = loop {
        tokio::select! {
            result = &mut sync => break result,
            _ = tokio::signal::ctrl_c() => {
                println!("⏳ Pausing after the current page...");
                orchestrator.pause_sync();
            }
            Ok(status) = updates.recv() => print_progress(&status),
        }
    };

    // statuses emitted while the last page was finishing
    while let Ok(status) = updates.try_recv() {
        print_progress(&status);
    }

    result?;
    if let Some(last_sync) = orchestrator.sync_status().last_sync_timestamp {
        println!("📅 Last sync: {}", format_millis(last_sync));
    }
    Ok(())
}

/// Handle the clear command
pub async fn handle_clear(storage: Arc<FileStorage>) -> Result<(), Box<dyn std::error::Error>> {
    let orchestrator = build_orchestrator(storage);
    orchestrator.clear_index().await?;
    println!("🗑️  Local history index deleted");
    Ok(())
}

/// Handle the settings command
pub async fn handle_settings(
    storage: Arc<FileStorage>,
    auto_sync: Option<bool>,
    pace: Option<SyncPace>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut settings: SyncSettings = storage.load_sync_settings().await?.unwrap_or_default();

    if auto_sync.is_some() || pace.is_some() {
        if let Some(auto_sync) = auto_sync {
            settings.auto_sync_on_startup = auto_sync;
        }
        if let Some(pace) = pace {
            settings.sync_pace = pace;
        }
        storage.save_sync_settings(&settings).await?;
        println!("💾 Settings saved");
    }

    println!("Auto sync on startup: {}", settings.auto_sync_on_startup);
    println!(
        "Sync pace: {:?} ({}ms between pages)",
        settings.sync_pace,
        settings.sync_pace.delay().as_millis()
    );
    Ok(())
}
