//! Statistics generation from the music database
//!
//! This module provides functionality for extracting and displaying
//! database statistics and the summary of a scrape run.

use crate::crawler::RunSummary;
use crate::storage::{Storage, StorageResult, UrlKind};

/// Row counts of one URL table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UrlStatistics {
    pub total: u64,
    /// URLs whose last visit failed
    pub failed: u64,
}

/// Database statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseStatistics {
    pub artists: u64,
    pub albums: u64,
    pub songs: u64,
    pub songs_with_lyrics: u64,
    pub artist_urls: UrlStatistics,
    pub album_urls: UrlStatistics,
    pub song_urls: UrlStatistics,
}

/// Loads statistics from storage
pub fn load_statistics(storage: &dyn Storage) -> StorageResult<DatabaseStatistics> {
    let url_stats = |kind| -> StorageResult<UrlStatistics> {
        Ok(UrlStatistics {
            total: storage.count_urls(kind)?,
            failed: storage.count_failed_urls(kind)?,
        })
    };

    Ok(DatabaseStatistics {
        artists: storage.count_artists()?,
        albums: storage.count_albums()?,
        songs: storage.count_songs()?,
        songs_with_lyrics: storage.count_songs_with_lyrics()?,
        artist_urls: url_stats(UrlKind::Artist)?,
        album_urls: url_stats(UrlKind::Album)?,
        song_urls: url_stats(UrlKind::Song)?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &DatabaseStatistics) {
    println!("=== Music Database Statistics ===\n");

    println!("Records:");
    println!("  Artists: {}", stats.artists);
    println!("  Albums: {}", stats.albums);
    println!(
        "  Songs: {} ({} with lyrics, {:.1}%)",
        stats.songs,
        stats.songs_with_lyrics,
        percentage(stats.songs_with_lyrics, stats.songs)
    );
    println!();

    println!("Source URLs:");
    for (label, urls) in [
        ("Artist pages", stats.artist_urls),
        ("Album pages", stats.album_urls),
        ("Lyrics pages", stats.song_urls),
    ] {
        println!(
            "  {}: {} ({} failed on last visit)",
            label, urls.total, urls.failed
        );
    }
}

/// Prints the summary of a finished (or aborted) run
pub fn print_run_summary(summary: &RunSummary) {
    let title = if summary.simulated {
        "=== Scrape Summary (simulated) ==="
    } else {
        "=== Scrape Summary ==="
    };
    println!("{}\n", title);

    println!(
        "Targets: {} persisted, {} failed, {} skipped",
        summary.targets.persisted, summary.targets.failed, summary.targets.skipped
    );
    println!(
        "Songs:   {} persisted, {} failed, {} skipped",
        summary.songs.persisted, summary.songs.failed, summary.songs.skipped
    );
    println!(
        "Requests: {} over the network, {} from the web cache",
        summary.network_requests, summary.cache_hits
    );
    println!("Duration: {:.1}s", summary.duration.as_secs_f64());

    if !summary.failures.is_empty() {
        println!("\nFailures ({}):", summary.failures.len());
        for failure in &summary.failures {
            match failure.kind {
                Some(kind) => println!("  - [{}] {}: {}", kind, failure.target, failure.message),
                None => println!("  - {}: {}", failure.target, failure.message),
            }
        }
    }

    if summary.aborted {
        println!("\nRun aborted at the first failure (ignore_errors = false)");
    }
}

fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{SongRecord, SqliteStorage};

    #[test]
    fn test_load_statistics() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage
            .save_song(&SongRecord {
                title: "New Life".to_string(),
                artist: "Depeche Mode".to_string(),
                album: Some("Speak & Spell".to_string()),
                lyrics: Some("I stand still stepping on a shady street".to_string()),
                year: Some(1981),
            })
            .unwrap();
        storage
            .save_song(&SongRecord {
                title: "Martyr".to_string(),
                artist: "Depeche Mode".to_string(),
                album: None,
                lyrics: None,
                year: None,
            })
            .unwrap();
        storage
            .record_url(
                UrlKind::Song,
                "https://www.azlyrics.com/lyrics/depechemode/newlife.html",
                Some("New Life"),
                true,
            )
            .unwrap();
        storage
            .record_url(
                UrlKind::Song,
                "https://www.azlyrics.com/lyrics/depechemode/martyr.html",
                None,
                false,
            )
            .unwrap();

        let stats = load_statistics(&storage).unwrap();
        assert_eq!(stats.artists, 1);
        assert_eq!(stats.albums, 1);
        assert_eq!(stats.songs, 2);
        assert_eq!(stats.songs_with_lyrics, 1);
        assert_eq!(stats.song_urls, UrlStatistics { total: 2, failed: 1 });
        assert_eq!(stats.artist_urls, UrlStatistics::default());
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(1, 4), 25.0);
        assert_eq!(percentage(3, 0), 0.0);
    }
}
