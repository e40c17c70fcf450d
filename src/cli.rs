//! Command-line interface definitions for the event feed scraper.
//!
//! All arguments can be provided via command-line flags or environment variables.

use chrono::NaiveDateTime;
use clap::Parser;
use std::path::PathBuf;

/// Format accepted by `--now`.
pub const NOW_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Command-line arguments for the event feed scraper.
///
/// Anything not given here comes from the site profile, and anything the
/// profile omits falls back to the built-in store locator defaults.
///
/// # Examples
///
/// ```sh
/// # Scrape the default store page into ./feed.rss
/// event_feed
///
/// # Use a custom site profile and output path
/// event_feed -c stores/dragons-lair.yaml -o public/events.rss
///
/// # Replay a saved page with a pinned clock
/// event_feed -i snapshot.html --now 2025-06-01T09:00:00 --debug
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML site profile
    #[arg(short, long, env = "EVENT_FEED_CONFIG")]
    pub config: Option<PathBuf>,

    /// Listings page URL (overrides the profile)
    #[arg(short, long, env = "EVENT_FEED_URL")]
    pub url: Option<String>,

    /// Read a saved HTML snapshot instead of fetching the page
    #[arg(short, long, env = "EVENT_FEED_INPUT")]
    pub input: Option<PathBuf>,

    /// Where to write the RSS feed (overrides the profile)
    #[arg(short, long, env = "EVENT_FEED_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Pin the clock, as YYYY-MM-DDTHH:MM:SS local time
    #[arg(long, env = "EVENT_FEED_NOW", value_parser = parse_now)]
    pub now: Option<NaiveDateTime>,

    /// Write an empty feed when the page has no event containers
    #[arg(long, env = "EVENT_FEED_ALLOW_EMPTY")]
    pub allow_empty: bool,

    /// Verbose logging plus page class inventory and container previews
    #[arg(long, env = "EVENT_FEED_DEBUG")]
    pub debug: bool,
}

fn parse_now(raw: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(raw, NOW_FORMAT)
        .map_err(|e| format!("expected {NOW_FORMAT}: {e}"))
}
