//! Batch processing: containers in, deduplicated in-window records out.
//!
//! The run is an explicit value threaded through three steps:
//!
//! 1. **Build**: each container goes through the [`EventRecordBuilder`]
//!    independently; failures become [`SkipReason`]s counted in [`RunStats`].
//! 2. **Filter**: records outside the [`Window`] are dropped.
//! 3. **Deduplicate**: the first record per stable id is kept.

use crate::config::Rules;
use crate::errors::{FetchFailure, SkipReason};
use crate::extract::builder::EventRecordBuilder;
use crate::extract::locator::Container;
use crate::models::EventRecord;
use crate::page::{Page, preview};
use chrono::{Duration, Local, NaiveDateTime, NaiveTime};
use itertools::Itertools;
use std::fmt;
use tracing::{debug, info, instrument};

/// Source of the current local time.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// The machine's local clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock pinned to one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Half-open acceptance interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Window {
    pub fn new(start: NaiveDateTime, days: i64) -> Self {
        Self {
            start,
            end: start + Duration::days(days),
        }
    }

    /// Window starting at midnight of the clock's current day.
    pub fn from_clock(clock: &dyn Clock, days: i64) -> Self {
        let start = clock.now().date().and_time(NaiveTime::MIN);
        Self::new(start, days)
    }

    pub fn contains(&self, when: NaiveDateTime) -> bool {
        self.start <= when && when < self.end
    }
}

/// Per-run counters, for the operator's summary.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub containers: usize,
    /// Containers with a name and a complete date.
    pub found: usize,
    pub added: usize,
    pub skipped_no_name: usize,
    pub skipped_casual: usize,
    pub skipped_no_date: usize,
    pub bad_date: usize,
    pub filtered_by_date: usize,
    pub duplicates: usize,
}

impl RunStats {
    pub fn record_skip(&mut self, reason: &SkipReason) {
        match reason {
            SkipReason::NoName => self.skipped_no_name += 1,
            SkipReason::CasualPlay { .. } => self.skipped_casual += 1,
            SkipReason::NoDate => self.skipped_no_date += 1,
            SkipReason::BadDate(_) => {
                self.found += 1;
                self.bad_date += 1;
            }
            SkipReason::OutOfWindow { .. } => {
                self.found += 1;
                self.filtered_by_date += 1;
            }
        }
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Found {} valid events, filtered {} by date, skipped {} casual play events, added {} to feed",
            self.found, self.filtered_by_date, self.skipped_casual, self.added
        )
    }
}

/// Output of a run: records ready for the feed, plus counters.
#[derive(Debug)]
pub struct RunOutput {
    pub records: Vec<EventRecord>,
    pub stats: RunStats,
}

/// Build, filter and deduplicate a batch of containers.
pub fn process_containers<C: Container>(
    containers: &[C],
    builder: &EventRecordBuilder,
    window: Window,
) -> RunOutput {
    let mut stats = RunStats {
        containers: containers.len(),
        ..RunStats::default()
    };

    let mut built = Vec::new();
    for (index, container) in containers.iter().enumerate() {
        match builder.build(container, window.start, window.end) {
            Ok(record) => {
                stats.found += 1;
                built.push(record);
            }
            Err(reason) => {
                debug!(index, %reason, "Skipped container");
                stats.record_skip(&reason);
            }
        }
    }

    let in_window: Vec<EventRecord> = built
        .into_iter()
        .filter(|record| window.contains(record.when))
        .collect();

    let before = in_window.len();
    let records = dedupe(in_window);
    stats.duplicates = before - records.len();
    stats.added = records.len();

    for record in &records {
        info!(name = %record.name, date = %record.when.format("%Y-%m-%d"), "Added event");
    }

    RunOutput { records, stats }
}

/// Keep the first record for each id, preserving order.
pub fn dedupe(records: Vec<EventRecord>) -> Vec<EventRecord> {
    records
        .into_iter()
        .unique_by(|record| record.id.clone())
        .collect()
}

/// Run the extraction core over one page of HTML.
///
/// Fails only when the page holds no event containers at all.
#[instrument(level = "info", skip_all, fields(url = %url))]
pub fn run(
    html: &str,
    url: &str,
    rules: &Rules,
    window: Window,
    debug_dump: bool,
) -> Result<RunOutput, FetchFailure> {
    let page = Page::parse(html);

    if debug_dump {
        let classes = page.class_inventory();
        debug!(count = classes.len(), ?classes, "Classes available in page");
    }

    let containers = page.containers(&rules.containers);
    if containers.is_empty() {
        return Err(FetchFailure::NoContainers {
            url: url.to_string(),
        });
    }
    info!(count = containers.len(), "Found event containers");

    if debug_dump {
        for (index, container) in containers.iter().take(3).enumerate() {
            debug!(index, html = %preview(container, 500), "Container structure");
        }
    }

    info!(
        start = %window.start.format("%Y-%m-%d"),
        end = %window.end.format("%Y-%m-%d"),
        "Filtering events by date window"
    );
    Ok(process_containers(&containers, &rules.builder, window))
}
