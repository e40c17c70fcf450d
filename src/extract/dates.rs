//! Date and time normalization for loosely formatted listings.
//!
//! Listing pages show an event's date as separate day-of-week, month and
//! day-of-month fragments with no year, plus an optional 12-hour time. This
//! module turns those fragments into a canonical [`NaiveDateTime`]:
//!
//! 1. A missing or malformed time falls back to [`DEFAULT_TIME`].
//! 2. The year is the reference year, bumped by one when the run happens in
//!    October or later and the event falls in January through March.
//! 3. A fixed offset (no daylight-saving rules) converts the site's local
//!    time to the feed's canonical time.

use crate::errors::DateError;
use chrono::{Datelike, Duration, Month, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Time assumed when a listing has none, or one that cannot be read.
pub const DEFAULT_TIME: &str = "12:00 PM";

static TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,2}):(\d{2})\s*([ap])\.?\s*m\b\.?").expect("valid time regex")
});

/// Raw date fragments for one event, as extracted from the page.
#[derive(Debug, Clone, Copy)]
pub struct DateParts<'a> {
    pub day_of_week: &'a str,
    pub month: &'a str,
    pub day: &'a str,
    pub time: Option<&'a str>,
}

/// Converts [`DateParts`] into canonical timestamps.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    offset: Duration,
}

impl Normalizer {
    /// `offset` is added to the site's local time to get canonical time.
    pub fn new(offset: Duration) -> Self {
        Self { offset }
    }

    pub fn from_hours(hours: i64) -> Self {
        Self::new(Duration::hours(hours))
    }

    /// Normalize one event date.
    ///
    /// `reference_year` is the year assumed for the listing, `now` is used
    /// only for the year-rollover rule.
    pub fn normalize(
        &self,
        parts: DateParts<'_>,
        reference_year: i32,
        now: NaiveDateTime,
    ) -> Result<NaiveDateTime, DateError> {
        let unparseable = || DateError::Unparseable {
            input: format!(
                "{}, {} {}, {} , {}",
                parts.day_of_week,
                parts.month,
                parts.day,
                reference_year,
                parts.time.unwrap_or(DEFAULT_TIME)
            ),
        };

        let weekday = parse_weekday(parts.day_of_week).ok_or_else(unparseable)?;
        let month = parse_month(parts.month).ok_or_else(unparseable)?;
        let day = parse_day(parts.day).ok_or_else(unparseable)?;

        let month_number = month.number_from_month();
        let year = if now.month() >= 10 && month_number <= 3 {
            reference_year + 1
        } else {
            reference_year
        };

        let date = NaiveDate::from_ymd_opt(year, month_number, day).ok_or_else(unparseable)?;

        let time = match parts.time.and_then(parse_time) {
            Some(time) => time,
            None => {
                debug!(time = ?parts.time, "Falling back to default event time");
                parse_time(DEFAULT_TIME).ok_or_else(unparseable)?
            }
        };

        if date.weekday() != weekday {
            debug!(%date, listed = %weekday, actual = %date.weekday(), "Listed weekday disagrees with date");
        }

        date.and_time(time)
            .checked_add_signed(self.offset)
            .ok_or_else(unparseable)
    }
}

static DAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d{1,2})(?:st|nd|rd|th)?\b").expect("valid day regex"));

fn words(s: &str) -> impl Iterator<Item = &str> {
    s.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty())
}

/// First full or three-letter weekday name in `s`, any case.
pub fn parse_weekday(s: &str) -> Option<Weekday> {
    words(s).find_map(|w| w.parse::<Weekday>().ok())
}

/// First full or three-letter month name in `s`, any case.
pub fn parse_month(s: &str) -> Option<Month> {
    words(s).find_map(|w| w.parse::<Month>().ok())
}

/// First standalone 1-2 digit number in `s`; ordinal suffixes are allowed.
pub fn parse_day(s: &str) -> Option<u32> {
    DAY_RE.captures(s)?[1].parse().ok()
}

/// First `h:mm am/pm` time in `s`, on a 12-hour clock.
pub fn parse_time(s: &str) -> Option<NaiveTime> {
    let caps = TIME_RE.captures(s)?;
    let canonical = format!(
        "{}:{} {}M",
        &caps[1],
        &caps[2],
        caps[3].to_ascii_uppercase()
    );
    NaiveTime::parse_from_str(&canonical, "%I:%M %p").ok()
}
