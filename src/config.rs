//! Site profiles: where to scrape, how to find events, how to publish them.
//!
//! A profile is a YAML document; every key is optional and falls back to the
//! built-in profile for the Wizards store locator. Markup conventions are
//! plain data, so supporting a site redesign means editing strategy lists:
//!
//! ```yaml
//! url: https://locator.wizards.com/store/14936
//! tz_shift_hours: -5
//! fields:
//!   event_name:
//!     - { by: class, value: "row no-gutters" }
//!     - { by: tag, value: h4 }
//!   event_cost:
//!     - { by: text, value: '(?i)\$\d+|\bfree\b' }
//! ```
//!
//! [`SiteConfig::compile`] turns a profile into immutable extraction rules
//! once, at start-up.

use crate::errors::ConfigError;
use crate::extract::builder::EventRecordBuilder;
use crate::extract::dates::{DEFAULT_TIME, Normalizer, parse_time};
use crate::extract::locator::{FieldSelector, Strategy};
use crate::models::Field;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

/// Upper bound on `window_days`, about ten years.
const MAX_WINDOW_DAYS: i64 = 3660;

/// One extraction strategy as written in a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum StrategySpec {
    Class(String),
    Tag(String),
    Attr { name: String, pattern: String },
    Text(String),
}

impl StrategySpec {
    fn class(value: &str) -> Self {
        Self::Class(value.to_string())
    }

    fn tag(value: &str) -> Self {
        Self::Tag(value.to_string())
    }

    fn attr(name: &str, pattern: &str) -> Self {
        Self::Attr {
            name: name.to_string(),
            pattern: pattern.to_string(),
        }
    }

    fn text(pattern: impl Into<String>) -> Self {
        Self::Text(pattern.into())
    }

    /// Validate and compile. `context` names the list in error messages.
    pub fn compile(&self, context: &str) -> Result<Strategy, ConfigError> {
        let regex = |pattern: &str| {
            Regex::new(pattern).map_err(|source| ConfigError::Pattern {
                field: context.to_string(),
                source,
            })
        };
        let non_empty = |value: &str, what: &str| {
            let value = value.trim();
            if value.is_empty() {
                Err(ConfigError::Field {
                    field: context.to_string(),
                    reason: format!("empty {what}"),
                })
            } else {
                Ok(value.to_string())
            }
        };

        Ok(match self {
            Self::Class(class) => Strategy::Class(non_empty(class, "class")?),
            Self::Tag(tag) => Strategy::Tag(non_empty(tag, "tag")?.to_ascii_lowercase()),
            Self::Attr { name, pattern } => Strategy::Attr {
                name: non_empty(name, "attribute name")?,
                pattern: regex(pattern)?,
            },
            Self::Text(pattern) => Strategy::Text(regex(pattern)?),
        })
    }
}

/// Strategy lists per field, tried in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldsConfig {
    pub store_name: Vec<StrategySpec>,
    pub event_name: Vec<StrategySpec>,
    pub day_of_week: Vec<StrategySpec>,
    pub month: Vec<StrategySpec>,
    pub day: Vec<StrategySpec>,
    pub event_cost: Vec<StrategySpec>,
    pub event_time: Vec<StrategySpec>,
}

impl FieldsConfig {
    pub fn get(&self, field: Field) -> &[StrategySpec] {
        match field {
            Field::StoreName => &self.store_name,
            Field::EventName => &self.event_name,
            Field::DayOfWeek => &self.day_of_week,
            Field::Month => &self.month,
            Field::Day => &self.day,
            Field::EventCost => &self.event_cost,
            Field::EventTime => &self.event_time,
        }
    }
}

impl Default for FieldsConfig {
    fn default() -> Self {
        Self {
            store_name: vec![
                StrategySpec::class("store-info__name"),
                StrategySpec::class("store-name"),
                StrategySpec::tag("h2"),
                StrategySpec::tag("h3"),
            ],
            event_name: vec![
                StrategySpec::class("row no-gutters"),
                StrategySpec::class("event-title"),
                StrategySpec::class("event-name"),
                StrategySpec::tag("h4"),
                StrategySpec::tag("h5"),
            ],
            day_of_week: vec![
                StrategySpec::class("dayOfWeek text-center"),
                StrategySpec::class("day-of-week"),
            ],
            month: vec![
                StrategySpec::class("month text-center"),
                StrategySpec::class("month"),
            ],
            day: vec![
                StrategySpec::class("dayOfMonth text-center"),
                StrategySpec::class("day-of-month"),
                StrategySpec::class("date"),
            ],
            event_cost: vec![
                StrategySpec::class("event-fee"),
                StrategySpec::class("price"),
                StrategySpec::class("cost"),
                StrategySpec::text(r"(?i)\$\d+(?:\.\d{2})?|\bfree\b"),
            ],
            event_time: vec![
                StrategySpec::class("event-time"),
                StrategySpec::class("time"),
                StrategySpec::text(r"(?i)\d{1,2}:\d{2}(?:\s*[AP]M)?"),
            ],
        }
    }
}

/// Channel metadata and output location for the generated feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub title: String,
    pub description: String,
    /// Channel link; the page URL when absent.
    pub link: Option<String>,
    pub output: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            title: "Event Feed".to_string(),
            description: "Feed of events".to_string(),
            link: None,
            output: "feed.rss".to_string(),
        }
    }
}

/// HTTP settings for the page fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
    pub max_retries: usize,
    pub base_delay_ms: u64,
}

impl RequestConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36".to_string(),
            timeout_secs: 30,
            max_retries: 3,
            base_delay_ms: 1000,
        }
    }
}

/// A complete site profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Listings page to scrape.
    pub url: String,
    pub feed: FeedConfig,
    /// Container strategies; the first that matches anything is used.
    pub containers: Vec<StrategySpec>,
    pub fields: FieldsConfig,
    /// Links inside a container matching this pattern become the entry link.
    pub link_pattern: Option<String>,
    /// Lowercase substrings marking casual/open play events.
    pub casual_terms: Vec<String>,
    /// Fixed shift from the site's displayed time to feed time.
    pub tz_shift_hours: i64,
    pub window_days: i64,
    pub default_cost: String,
    pub default_time: String,
    pub request: RequestConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            url: "https://locator.wizards.com/store/14936".to_string(),
            feed: FeedConfig::default(),
            containers: vec![
                StrategySpec::class("store-info"),
                StrategySpec::class("event-container"),
                StrategySpec::class("event-listing"),
                StrategySpec::attr("data-testid", "^event"),
                StrategySpec::attr("class", "(?i)event"),
            ],
            fields: FieldsConfig::default(),
            link_pattern: None,
            casual_terms: [
                "casual play",
                "causal play",
                "open play",
                "casual mtg",
                "play mtg",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            tz_shift_hours: -5,
            window_days: 30,
            default_cost: "Not specified".to_string(),
            default_time: DEFAULT_TIME.to_string(),
            request: RequestConfig::default(),
        }
    }
}

/// Compiled, immutable form of a [`SiteConfig`].
#[derive(Debug, Clone)]
pub struct Rules {
    pub containers: Vec<Strategy>,
    pub builder: EventRecordBuilder,
    pub window_days: i64,
}

impl SiteConfig {
    /// Load a profile from a YAML file.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_yaml(&raw)?;
        info!(url = %config.url, "Loaded site profile");
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Compile every strategy and pattern.
    pub fn compile(&self) -> Result<Rules, ConfigError> {
        let page_url = Url::parse(&self.url).map_err(|e| ConfigError::Field {
            field: "url".to_string(),
            reason: e.to_string(),
        })?;

        if !(1..=MAX_WINDOW_DAYS).contains(&self.window_days) {
            return Err(ConfigError::Field {
                field: "window_days".to_string(),
                reason: format!("must be between 1 and {MAX_WINDOW_DAYS}"),
            });
        }
        if !(-24..=24).contains(&self.tz_shift_hours) {
            return Err(ConfigError::Field {
                field: "tz_shift_hours".to_string(),
                reason: "must be within 24 hours".to_string(),
            });
        }
        if parse_time(&self.default_time).is_none() {
            return Err(ConfigError::Field {
                field: "default_time".to_string(),
                reason: format!("{:?} is not an h:mm AM/PM time", self.default_time),
            });
        }

        let mut casual_terms = Vec::with_capacity(self.casual_terms.len());
        for term in &self.casual_terms {
            let term = term.trim();
            if term.is_empty() {
                return Err(ConfigError::Field {
                    field: "casual_terms".to_string(),
                    reason: "empty term would match every event".to_string(),
                });
            }
            casual_terms.push(term.to_lowercase());
        }

        let containers = self
            .containers
            .iter()
            .map(|spec| spec.compile("containers"))
            .collect::<Result<Vec<_>, _>>()?;

        let selectors = Field::ALL
            .iter()
            .map(|&field| {
                let strategies = self
                    .fields
                    .get(field)
                    .iter()
                    .map(|spec| spec.compile(field.label()))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(FieldSelector::new(field, strategies))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let link_pattern = self
            .link_pattern
            .as_deref()
            .map(|p| {
                Regex::new(p).map_err(|source| ConfigError::Pattern {
                    field: "link_pattern".to_string(),
                    source,
                })
            })
            .transpose()?;

        let builder = EventRecordBuilder {
            selectors,
            casual_terms,
            normalizer: Normalizer::from_hours(self.tz_shift_hours),
            default_cost: self.default_cost.clone(),
            default_time: self.default_time.clone(),
            page_url,
            link_pattern,
        };

        Ok(Rules {
            containers,
            builder,
            window_days: self.window_days,
        })
    }
}
