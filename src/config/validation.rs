use crate::config::types::{AlbumTarget, ArtistTarget, Config, SongTarget};
use crate::ConfigError;
use std::time::Duration;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_general(config)?;
    validate_site(config)?;

    for entry in &config.songs_config.targets {
        validate_song_target(&entry.to_target())?;
    }
    for target in &config.albums_config.targets {
        validate_album_target(target)?;
    }
    for target in &config.artists_config.targets {
        validate_artist_target(target)?;
    }

    Ok(())
}

/// Validates paths, timings and budgets
fn validate_general(config: &Config) -> Result<(), ConfigError> {
    if config.db_filepath.trim().is_empty() {
        return Err(ConfigError::Validation(
            "db_filepath cannot be empty".to_string(),
        ));
    }

    if config.use_webcache && config.webcache_dirpath.trim().is_empty() {
        return Err(ConfigError::Validation(
            "webcache_dirpath cannot be empty when use_webcache is set".to_string(),
        ));
    }

    let timeout_ok = Duration::try_from_secs_f64(config.http_get_timeout)
        .map_or(false, |timeout| !timeout.is_zero());
    if !timeout_ok {
        return Err(ConfigError::Validation(format!(
            "http_get_timeout must be a finite number of seconds > 0, got {}",
            config.http_get_timeout
        )));
    }

    for (name, value) in [
        ("delay_between_requests", config.delay_between_requests),
        ("delay_interactive", config.delay_interactive),
    ] {
        // rejects negative, NaN, infinite and overflowing values
        if Duration::try_from_secs_f64(value).is_err() {
            return Err(ConfigError::Validation(format!(
                "{} must be a finite number of seconds >= 0, got {}",
                name, value
            )));
        }
    }

    if config.use_compute_cache && config.ram_size < 1 {
        return Err(ConfigError::Validation(format!(
            "ram_size must be >= 1 MB, got {}",
            config.ram_size
        )));
    }

    for name in config.headers.keys() {
        if name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "header names cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates the site endpoints
fn validate_site(config: &Config) -> Result<(), ConfigError> {
    for (name, value) in [
        ("base_url", &config.site.base_url),
        ("search_url", &config.site.search_url),
    ] {
        let url = parse_url(name, value)?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "{} must use http or https, got '{}'",
                name, value
            )));
        }
    }
    Ok(())
}

fn validate_song_target(target: &SongTarget) -> Result<(), ConfigError> {
    validate_identity("song", &target.title, target.url.as_deref())
}

fn validate_album_target(target: &AlbumTarget) -> Result<(), ConfigError> {
    validate_identity("album", &target.title, target.url.as_deref())?;
    validate_max_songs(&target.title, target.max_songs)
}

fn validate_artist_target(target: &ArtistTarget) -> Result<(), ConfigError> {
    validate_identity("artist", &target.name, target.url.as_deref())?;
    validate_max_songs(&target.name, target.max_songs)?;

    for year in [target.year_after, target.year_before].into_iter().flatten() {
        validate_year(&target.name, year)?;
    }

    if let (Some(after), Some(before)) = (target.year_after, target.year_before) {
        if after > before {
            return Err(ConfigError::Validation(format!(
                "Artist '{}': year_after ({}) must be <= year_before ({})",
                target.name, after, before
            )));
        }
    }

    Ok(())
}

/// A target needs either a non-empty name or a URL, and the URL must parse
fn validate_identity(kind: &str, name: &str, url: Option<&str>) -> Result<(), ConfigError> {
    match url {
        Some(url) => {
            parse_url(kind, url)?;
        }
        None if name.trim().is_empty() => {
            return Err(ConfigError::Validation(format!(
                "{} target needs a title/name or a url",
                kind
            )));
        }
        None => {}
    }
    Ok(())
}

fn validate_max_songs(name: &str, max_songs: Option<usize>) -> Result<(), ConfigError> {
    if max_songs == Some(0) {
        return Err(ConfigError::Validation(format!(
            "Target '{}': max_songs must be >= 1",
            name
        )));
    }
    Ok(())
}

/// Years are four-digit numbers
fn validate_year(name: &str, year: i32) -> Result<(), ConfigError> {
    if !(1000..=9999).contains(&year) {
        return Err(ConfigError::Validation(format!(
            "Artist '{}': year must have four digits, got {}",
            name, year
        )));
    }
    Ok(())
}

fn parse_url(name: &str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} URL '{}': {}", name, value, e)))
}
