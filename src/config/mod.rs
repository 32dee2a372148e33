//! Configuration module for Lyrics-Scraper
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use lyrics_scraper::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Targets: {}", config.target_count());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    expand_home, split_title_by_artist, AlbumTarget, AlbumsConfig, ArtistTarget, ArtistsConfig,
    Config, SiteConfig, SongEntry, SongTarget, SongsConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
