//! Output module for run summaries and database reports
//!
//! This module handles:
//! - Printing the summary of a scrape run
//! - Loading and printing music database statistics

pub mod stats;

pub use stats::{
    load_statistics, print_run_summary, print_statistics, DatabaseStatistics, UrlStatistics,
};
