//! Turns one container into a validated [`EventRecord`] or a [`SkipReason`].

use crate::errors::SkipReason;
use crate::extract::dates::{DateParts, Normalizer, parse_time};
use crate::extract::locator::{Container, FieldSelector, locate};
use crate::models::{EventRecord, Field, RawEventFields, WHEN_FORMAT};
use chrono::{Datelike, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::debug;
use url::Url;

/// Weekday, optional comma, month name, day of month, anywhere in the text.
static COMPOSITE_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?P<dow>Monday|Tuesday|Wednesday|Thursday|Friday|Saturday|Sunday),?\s*(?P<month>January|February|March|April|May|June|July|August|September|October|November|December)\s*(?P<day>\d{1,2})\b",
    )
    .expect("valid composite date regex")
});

/// Extraction rules applied to every container of a run.
#[derive(Debug, Clone)]
pub struct EventRecordBuilder {
    /// One selector per [`Field`].
    pub selectors: Vec<FieldSelector>,
    /// Lowercase substrings that mark casual/open play.
    pub casual_terms: Vec<String>,
    pub normalizer: Normalizer,
    pub default_cost: String,
    /// Used when the time is missing or unreadable.
    pub default_time: String,
    pub page_url: Url,
    pub link_pattern: Option<Regex>,
}

impl EventRecordBuilder {
    /// Build a record from `container`.
    ///
    /// `now` is the start of the acceptance window and supplies the reference
    /// year; records at or after `window_end` are rejected.
    pub fn build<C: Container + ?Sized>(
        &self,
        container: &C,
        now: NaiveDateTime,
        window_end: NaiveDateTime,
    ) -> Result<EventRecord, SkipReason> {
        let mut fields = RawEventFields::new();

        let name = self
            .extract(container, Field::EventName)
            .ok_or(SkipReason::NoName)?;
        fields.insert(Field::EventName, name.clone());

        if self.is_casual(&name) {
            return Err(SkipReason::CasualPlay { name });
        }

        let store = self.extract(container, Field::StoreName);
        if let Some(store) = &store {
            fields.insert(Field::StoreName, store.clone());
        }

        for field in [Field::DayOfWeek, Field::Month, Field::Day] {
            if let Some(value) = self.extract(container, field) {
                fields.insert(field, value);
            }
        }
        if !has_date(&fields) {
            if let Some(caps) = COMPOSITE_DATE_RE.captures(&container.full_text()) {
                debug!(matched = &caps[0], "Recovered date from container text");
                fields.insert(Field::DayOfWeek, caps["dow"].to_string());
                fields.insert(Field::Month, caps["month"].to_string());
                fields.insert(Field::Day, caps["day"].to_string());
            }
        }
        if !has_date(&fields) {
            return Err(SkipReason::NoDate);
        }

        let cost = self
            .extract(container, Field::EventCost)
            .unwrap_or_else(|| self.default_cost.clone());
        fields.insert(Field::EventCost, cost.clone());

        let time = self
            .extract(container, Field::EventTime)
            .filter(|t| parse_time(t).is_some())
            .unwrap_or_else(|| self.default_time.clone());
        fields.insert(Field::EventTime, time.clone());

        let parts = DateParts {
            day_of_week: &fields[&Field::DayOfWeek],
            month: &fields[&Field::Month],
            day: &fields[&Field::Day],
            time: Some(time.as_str()),
        };
        let when = self.normalizer.normalize(parts, now.year(), now)?;

        if when < now || when >= window_end {
            return Err(SkipReason::OutOfWindow { when });
        }

        let when_label = when.format(WHEN_FORMAT).to_string();
        Ok(EventRecord {
            id: stable_id(&name, &cost, &when_label),
            source_url: self.event_link(container),
            name,
            when,
            cost,
            store,
            fields,
        })
    }

    fn extract<C: Container + ?Sized>(&self, container: &C, field: Field) -> Option<String> {
        self.selectors
            .iter()
            .find(|s| s.field == field)
            .and_then(|selector| locate(container, selector))
    }

    fn is_casual(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.casual_terms.iter().any(|term| name.contains(term.as_str()))
    }

    fn event_link<C: Container + ?Sized>(&self, container: &C) -> String {
        self.link_pattern
            .as_ref()
            .and_then(|pattern| {
                container
                    .links()
                    .into_iter()
                    .find(|href| pattern.is_match(href))
            })
            .and_then(|href| self.page_url.join(&href).ok())
            .unwrap_or_else(|| self.page_url.clone())
            .to_string()
    }
}

fn has_date(fields: &RawEventFields) -> bool {
    [Field::DayOfWeek, Field::Month, Field::Day]
        .iter()
        .all(|f| fields.contains_key(f))
}

/// Content hash identifying an event across runs.
pub fn stable_id(name: &str, cost: &str, when_label: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{name}-{cost}-{when_label}").as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::page::Page;
    use chrono::{Duration, NaiveDate};

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn build_first(html: &str, now: NaiveDateTime) -> Result<EventRecord, SkipReason> {
        build_first_with(SiteConfig::default(), html, now)
    }

    fn build_first_with(
        config: SiteConfig,
        html: &str,
        now: NaiveDateTime,
    ) -> Result<EventRecord, SkipReason> {
        let rules = config.compile().unwrap();
        let page = Page::parse(html);
        let containers = page.containers(&rules.containers);
        rules
            .builder
            .build(&containers[0], now, now + Duration::days(30))
    }

    const FNM: &str = r#"<div class="store-info">
        <div class="store-info__name">Dragon's Lair Games</div>
        <div class="row no-gutters">Friday Night Magic</div>
        <div class="dayOfWeek text-center">Friday</div>
        <div class="month text-center">June</div>
        <div class="dayOfMonth text-center">13</div>
        <div class="event-time">7:00 PM</div>
        <div class="event-fee">$5</div>
    </div>"#;

    #[test]
    fn test_builds_full_listing() {
        let record = build_first(FNM, at(2025, 6, 1)).unwrap();
        assert_eq!(record.name, "Friday Night Magic");
        assert_eq!(record.cost, "$5");
        assert_eq!(record.store.as_deref(), Some("Dragon's Lair Games"));
        assert_eq!(
            record.when,
            NaiveDate::from_ymd_opt(2025, 6, 13)
                .unwrap()
                .and_hms_opt(14, 0, 0)
                .unwrap()
        );
        assert_eq!(record.source_url, "https://locator.wizards.com/store/14936");
        assert_eq!(record.fields[&Field::EventTime], "7:00 PM");
        assert_eq!(record.fields.len(), 7);
        assert_eq!(
            record.id,
            stable_id("Friday Night Magic", "$5", "Friday, June 13, 02:00 PM")
        );
    }

    #[test]
    fn test_id_is_stable_across_builds() {
        let first = build_first(FNM, at(2025, 6, 1)).unwrap();
        let second = build_first(FNM, at(2025, 6, 1)).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.id.len(), 64);
    }

    #[test]
    fn test_missing_name_is_skipped() {
        let html = r#"<div class="store-info">
            <div class="dayOfWeek text-center">Friday</div>
            <div class="month text-center">June</div>
            <div class="dayOfMonth text-center">13</div>
        </div>"#;
        assert_eq!(build_first(html, at(2025, 6, 1)), Err(SkipReason::NoName));
    }

    #[test]
    fn test_casual_play_is_skipped_in_any_case() {
        for name in [
            "Casual Play",
            "Thursday casual MTG night",
            "OPEN PLAY - all formats",
            "Causal Play for any MTG format",
        ] {
            let html = FNM.replace("Friday Night Magic", name);
            let result = build_first(&html, at(2025, 6, 1));
            assert_eq!(
                result,
                Err(SkipReason::CasualPlay {
                    name: name.to_string()
                }),
                "{name}"
            );
        }
    }

    #[test]
    fn test_date_recovered_from_free_text() {
        let html = r#"<div class="store-info">
            <h4>Commander Night</h4>
            <p>Join us Saturday, July 12 for pods of four.</p>
        </div>"#;
        let record = build_first(html, at(2025, 7, 1)).unwrap();
        assert_eq!(record.fields[&Field::DayOfWeek], "Saturday");
        assert_eq!(record.fields[&Field::Month], "July");
        assert_eq!(record.fields[&Field::Day], "12");
        assert_eq!(record.when.date(), NaiveDate::from_ymd_opt(2025, 7, 12).unwrap());
    }

    #[test]
    fn test_ordinary_words_do_not_leak_into_date() {
        let html = r#"<div class="store-info">
            <h4>Two-Headed Giant</h4>
            <p>Teams may register at the counter. Saturday, July 12</p>
        </div>"#;
        let record = build_first(html, at(2025, 7, 1)).unwrap();
        assert_eq!(record.fields[&Field::Month], "July");
        assert_eq!(record.when.date(), NaiveDate::from_ymd_opt(2025, 7, 12).unwrap());
    }

    #[test]
    fn test_month_name_in_title_is_not_the_date() {
        let html = r#"<div class="store-info">
            <h4>March of the Machine Draft</h4>
            <p>Saturday, July 12</p>
        </div>"#;
        let record = build_first(html, at(2025, 7, 1)).unwrap();
        assert_eq!(record.name, "March of the Machine Draft");
        assert_eq!(record.fields[&Field::Month], "July");
        assert_eq!(record.fields[&Field::Day], "12");
        assert_eq!(record.when.date(), NaiveDate::from_ymd_opt(2025, 7, 12).unwrap());
    }

    #[test]
    fn test_partial_markup_date_completed_from_text() {
        let config = SiteConfig::default();

        let html = r#"<div class="store-info">
            <h4>Commander Night</h4>
            <div class="dayOfWeek text-center">Wednesday</div>
            <p>Wednesday,July 9 at 6:30 PM</p>
        </div>"#;
        let record = build_first_with(config, html, at(2025, 7, 1)).unwrap();
        assert_eq!(record.fields[&Field::Month], "July");
        assert_eq!(record.fields[&Field::Day], "9");
        assert_eq!(
            record.when,
            NaiveDate::from_ymd_opt(2025, 7, 9)
                .unwrap()
                .and_hms_opt(13, 30, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_incomplete_date_is_skipped() {
        let html = r#"<div class="store-info">
            <h4>Commander Night</h4>
            <p>Every week at the shop</p>
        </div>"#;
        assert_eq!(build_first(html, at(2025, 7, 1)), Err(SkipReason::NoDate));
    }

    #[test]
    fn test_defaults_for_cost_and_time() {
        let html = r#"<div class="store-info">
            <h4>Pauper League</h4>
            <div class="dayOfWeek text-center">Tuesday</div>
            <div class="month text-center">June</div>
            <div class="dayOfMonth text-center">10</div>
        </div>"#;
        let record = build_first(html, at(2025, 6, 1)).unwrap();
        assert_eq!(record.cost, "Not specified");
        assert_eq!(record.fields[&Field::EventTime], "12:00 PM");
        assert_eq!(record.when.time(), chrono::NaiveTime::from_hms_opt(7, 0, 0).unwrap());
        assert_eq!(record.store, None);
    }

    #[test]
    fn test_unreadable_time_is_replaced() {
        let html = FNM.replace("7:00 PM", "Evening");
        let record = build_first(&html, at(2025, 6, 1)).unwrap();
        assert_eq!(record.fields[&Field::EventTime], "12:00 PM");
    }

    #[test]
    fn test_invalid_date_is_bad_date() {
        let html = FNM.replace(">13<", ">31<");
        let result = build_first(&html, at(2025, 6, 1));
        assert!(matches!(result, Err(SkipReason::BadDate(_))), "{result:?}");
    }

    #[test]
    fn test_past_and_far_events_are_out_of_window() {
        let past = build_first(FNM, at(2025, 6, 20));
        assert!(matches!(past, Err(SkipReason::OutOfWindow { .. })));

        let far = build_first(FNM, at(2025, 5, 1));
        assert!(matches!(far, Err(SkipReason::OutOfWindow { .. })));
    }

    #[test]
    fn test_event_link_resolves_against_page() {
        let mut config = SiteConfig::default();
        config.link_pattern = Some("^/events/".to_string());

        let html = FNM.replace(
            r#"<div class="event-fee">$5</div>"#,
            r#"<div class="event-fee">$5</div><a href="/help">Help</a><a href="/events/991">More</a>"#,
        );
        let record = build_first_with(config, &html, at(2025, 6, 1)).unwrap();
        assert_eq!(record.source_url, "https://locator.wizards.com/events/991");
    }
}
