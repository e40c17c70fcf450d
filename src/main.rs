//! # Event Feed
//!
//! Scrapes a game store's event listings page and publishes the upcoming
//! events as an RSS 2.0 feed.
//!
//! ## Features
//!
//! - Locates event fields through ordered fallback strategies (class, tag,
//!   attribute, text pattern), so small markup changes don't break the run
//! - Normalizes loose date fragments ("Fri", "Jun", "13th", "7:00 PM") into
//!   one timestamp, rolling late-year listings into the next year
//! - Skips casual-play events and anything outside the configured window
//! - Deduplicates events by a stable content hash used as the feed guid
//! - Site profiles in YAML; every key has a working default
//!
//! ## Usage
//!
//! ```sh
//! event_feed -o feed.rss
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Fetching**: Download the listings page (or read a saved snapshot)
//! 2. **Locating**: Find event containers, then each field inside them
//! 3. **Building**: Normalize dates, filter, and deduplicate records
//! 4. **Output**: Assemble feed entries and write the RSS document

use chrono::Utc;
use clap::Parser;
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod errors;
mod extract;
mod fetch;
mod models;
mod outputs;
mod page;
mod pipeline;
mod utils;

use cli::Cli;
use config::SiteConfig;
use errors::FetchFailure;
use fetch::{FileSource, HttpSource, PageSource, RetryFetch};
use outputs::{entries, rss};
use pipeline::{Clock, FixedClock, RunOutput, RunStats, SystemClock, Window};
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // Parse CLI first so --debug can pick the log level
    let args = Cli::parse();

    // --- Tracing init ---
    let filter = if args.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("event_feed starting up");
    debug!(?args, "Parsed CLI arguments");

    // ---- Load site profile ----
    let mut site = match &args.config {
        Some(path) => SiteConfig::load(path)?,
        None => {
            info!("No site profile given; using built-in defaults");
            SiteConfig::default()
        }
    };
    if let Some(url) = &args.url {
        site.url = url.clone();
    }
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&site.feed.output));

    let rules = site.compile()?;
    info!(
        url = %site.url,
        output = %output.display(),
        window_days = rules.window_days,
        tz_shift_hours = site.tz_shift_hours,
        "Site profile ready"
    );

    // Early check: ensure the feed directory is writable
    let output_dir = output.parent().unwrap_or(Path::new(""));
    if let Err(e) = ensure_writable_dir(output_dir).await {
        error!(
            path = %output_dir.display(),
            error = %e,
            "Feed directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    // ---- Fetch page ----
    let html = match &args.input {
        Some(path) => FileSource { path: path.clone() }.fetch().await?,
        None => {
            let source = HttpSource::new(site.url.clone(), &site.request)?;
            RetryFetch::new(source, site.request.max_retries, site.request.base_delay())
                .fetch()
                .await?
        }
    };

    // ---- Extract events ----
    let clock: Box<dyn Clock> = match args.now {
        Some(now) => Box::new(FixedClock(now)),
        None => Box::new(SystemClock),
    };
    let window = Window::from_clock(clock.as_ref(), rules.window_days);

    let RunOutput { records, stats } =
        match pipeline::run(&html, &site.url, &rules, window, args.debug) {
            Ok(output) => output,
            Err(FetchFailure::NoContainers { url }) if args.allow_empty => {
                warn!(%url, "No event containers found; writing an empty feed");
                RunOutput {
                    records: Vec::new(),
                    stats: RunStats::default(),
                }
            }
            Err(e) => {
                error!(error = %e, "Extraction failed; feed left untouched");
                return Err(e.into());
            }
        };

    // ---- Output ----
    let feed_entries = entries::assemble_all(&records);
    let channel = rss::Channel {
        title: site.feed.title.clone(),
        link: site.feed.link.clone().unwrap_or_else(|| site.url.clone()),
        description: site.feed.description.clone(),
        last_build: Utc::now(),
    };
    rss::write_feed(&output, &channel, &feed_entries).await?;

    info!(
        containers = stats.containers,
        skipped_no_name = stats.skipped_no_name,
        skipped_no_date = stats.skipped_no_date,
        bad_date = stats.bad_date,
        duplicates = stats.duplicates,
        "{stats}"
    );

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
