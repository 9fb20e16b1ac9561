use super::utils::{build_orchestrator, build_reader, format_millis, format_timestamp};
use super::DistributionKind;
use scrobble_index::{AlbumQuery, FileStorage, MatchType};
use std::sync::Arc;

const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

fn bar(count: u64, max: u64) -> String {
    if max == 0 {
        return String::new();
    }
    "█".repeat(((count * 40) / max) as usize)
}

/// Handle the status command
pub async fn handle_status(storage: Arc<FileStorage>) -> Result<(), Box<dyn std::error::Error>> {
    let orchestrator = build_orchestrator(storage.clone());
    let stats = orchestrator.reader().get_storage_stats().await;

    println!("📁 Data directory: {}", storage.dir().display());
    if stats.album_count == 0 && stats.last_sync_timestamp.is_none() {
        println!("No history index yet. Run `scrobble-index sync` first.");
        return Ok(());
    }

    println!("Albums:            {}", stats.album_count);
    println!("Scrobbles:         {}", stats.total_scrobbles);
    println!("Stored plays:      {}", stats.stored_plays);
    if let Some(oldest) = stats.oldest_scrobble_date {
        println!("Oldest scrobble:   {}", format_timestamp(oldest));
    }
    if let Some(last_sync) = stats.last_sync_timestamp {
        println!("Last sync:         {}", format_millis(last_sync));
    }
    println!("Index size:        {} KiB", stats.index_size_bytes / 1024);
    println!(
        "Needs sync:        {}",
        if orchestrator.needs_sync().await { "yes" } else { "no" }
    );
    Ok(())
}

/// Handle the lookup command
pub async fn handle_lookup(
    storage: Arc<FileStorage>,
    artist: &str,
    album: &str,
    show_plays: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let reader = build_reader(storage);
    let lookup = reader.get_album_history_fuzzy(artist, album).await;

    let Some(entry) = lookup.entry else {
        println!("🔍 No plays found for {artist} - {album}");
        return Ok(());
    };

    let kind = match lookup.match_type {
        MatchType::Exact => "exact match",
        MatchType::Fuzzy => "fuzzy match",
        MatchType::None => "no match",
    };
    println!("🎵 {artist} - {album} ({kind})");
    if lookup.match_type == MatchType::Fuzzy {
        for key in &lookup.matched_keys {
            println!("   ↳ {key}");
        }
    }
    println!("Plays:        {}", entry.play_count);
    println!("Last played:  {}", format_timestamp(entry.last_played));

    if show_plays {
        for play in &entry.plays {
            println!(
                "  {}  {}",
                format_timestamp(play.timestamp),
                play.track.as_deref().unwrap_or("-")
            );
        }
    }
    Ok(())
}

/// Handle the top command
pub async fn handle_top(
    storage: Arc<FileStorage>,
    limit: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let reader = build_reader(storage);
    for (i, album) in reader.get_top_albums(limit).await.iter().enumerate() {
        println!(
            "{:>3}. {} - {} ({} plays)",
            i + 1,
            album.artist,
            album.album,
            album.play_count
        );
    }
    Ok(())
}

/// Handle the artists command
pub async fn handle_artists(
    storage: Arc<FileStorage>,
    limit: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let reader = build_reader(storage);
    let artists = reader.get_unique_artists().await;
    let shown = if limit == 0 { artists.len() } else { limit };

    for (i, artist) in artists.iter().take(shown).enumerate() {
        println!(
            "{:>4}. {} ({} plays across {} albums)",
            i + 1,
            artist.artist,
            artist.play_count,
            artist.album_count
        );
    }
    println!("{} artists total", artists.len());
    Ok(())
}

/// Handle the albums command
pub async fn handle_albums(
    storage: Arc<FileStorage>,
    query: &AlbumQuery,
) -> Result<(), Box<dyn std::error::Error>> {
    let reader = build_reader(storage);
    let page = reader.list_albums(query).await;

    for album in &page.albums {
        println!(
            "{} - {} | {} plays | last {}",
            album.artist,
            album.album,
            album.play_count,
            format_timestamp(album.last_played)
        );
    }
    println!(
        "Page {}/{} ({} albums)",
        page.page,
        page.total_pages.max(1),
        page.total
    );
    Ok(())
}

/// Handle the distribution command
pub async fn handle_distribution(
    storage: Arc<FileStorage>,
    kind: DistributionKind,
) -> Result<(), Box<dyn std::error::Error>> {
    let reader = build_reader(storage);

    let rows: Vec<(String, u64)> = match kind {
        DistributionKind::Hours => reader
            .get_hourly_distribution()
            .await
            .into_iter()
            .enumerate()
            .map(|(hour, count)| (format!("{hour:02}:00"), count))
            .collect(),
        DistributionKind::Weekdays => reader
            .get_day_of_week_distribution()
            .await
            .into_iter()
            .zip(WEEKDAYS)
            .map(|(count, day)| (day.to_string(), count))
            .collect(),
        DistributionKind::Decades => reader
            .get_decade_distribution()
            .await
            .into_iter()
            .map(|(decade, count)| (format!("{decade}s"), count))
            .collect(),
    };

    let max = rows.iter().map(|(_, count)| *count).max().unwrap_or(0);
    for (label, count) in &rows {
        println!("{label:>6} {count:>7} {}", bar(*count, max));
    }
    Ok(())
}
