//! Data models for scraped events and their feed representation.
//!
//! This module defines the structures that flow through the pipeline, in
//! lifecycle order:
//! - [`Field`] / [`RawEventFields`]: text pulled out of one container
//! - [`EventRecord`]: a validated, normalized event inside the date window
//! - [`FeedEntry`]: the tuple handed to the RSS writer
//!
//! Each stage is built from the previous one and never refers back to it.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Format used for human-readable event times and for the stable id.
pub const WHEN_FORMAT: &str = "%A, %B %d, %I:%M %p";

/// One named attribute of an event listing.
///
/// The declaration order is the order fields are rendered in feed output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Field {
    #[serde(rename = "Store Name")]
    StoreName,
    #[serde(rename = "Event Name")]
    EventName,
    #[serde(rename = "Day of Week")]
    DayOfWeek,
    #[serde(rename = "Month")]
    Month,
    #[serde(rename = "Day")]
    Day,
    #[serde(rename = "Event Cost")]
    EventCost,
    #[serde(rename = "Event Time")]
    EventTime,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::StoreName,
        Field::EventName,
        Field::DayOfWeek,
        Field::Month,
        Field::Day,
        Field::EventCost,
        Field::EventTime,
    ];

    /// Human-readable label, as shown in the feed.
    pub fn label(self) -> &'static str {
        match self {
            Field::StoreName => "Store Name",
            Field::EventName => "Event Name",
            Field::DayOfWeek => "Day of Week",
            Field::Month => "Month",
            Field::Day => "Day",
            Field::EventCost => "Event Cost",
            Field::EventTime => "Event Time",
        }
    }

    /// Whether the field is already shown as the heading or the date line
    /// of an entry description.
    pub fn is_headline(self) -> bool {
        matches!(
            self,
            Field::EventName | Field::DayOfWeek | Field::Month | Field::Day | Field::EventTime
        )
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Extracted text per field for a single container.
///
/// Keys iterate in [`Field`] declaration order.
pub type RawEventFields = BTreeMap<Field, String>;

/// A validated event, normalized to the feed's canonical time.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    /// Content hash of name, cost and formatted time. Also the dedup key.
    pub id: String,
    pub name: String,
    /// Canonical, timezone-shifted instant.
    pub when: NaiveDateTime,
    pub cost: String,
    pub store: Option<String>,
    /// Page the event was scraped from, or its own page when one was linked.
    pub source_url: String,
    /// Every field as extracted, with defaults filled in.
    pub fields: RawEventFields,
}

impl EventRecord {
    /// `when` rendered the way it appears in descriptions and in the id.
    pub fn when_label(&self) -> String {
        self.when.format(WHEN_FORMAT).to_string()
    }
}

/// One RSS item, ready for the writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    /// HTML block shown by feed readers.
    pub description: String,
    /// Plain dump of every field.
    pub content: String,
    pub id: String,
}
