//! Error types for the extraction pipeline and its collaborators.
//!
//! Two families are kept apart on purpose:
//!
//! - [`SkipReason`] and [`DateError`] are per-container outcomes. They are
//!   aggregated into run statistics and never abort a batch.
//! - [`FetchFailure`] and [`ConfigError`] are run-level failures surfaced to
//!   the operator.

use chrono::NaiveDateTime;
use thiserror::Error;

/// Why a date could not be turned into a timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
    /// Neither the supplied time nor the sentinel time produced a valid date.
    #[error("unparseable date {input:?}")]
    Unparseable { input: String },
}

/// Why a container did not become an event record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("no event name found")]
    NoName,

    #[error("casual play event {name:?}")]
    CasualPlay { name: String },

    #[error("no complete date found")]
    NoDate,

    #[error("bad date: {0}")]
    BadDate(#[from] DateError),

    #[error("event at {when} is outside the window")]
    OutOfWindow { when: NaiveDateTime },
}

/// Failure of the page-fetch collaborator. Fatal for a run.
#[derive(Debug, Error)]
pub enum FetchFailure {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("could not read page snapshot: {0}")]
    Io(#[from] std::io::Error),

    #[error("no event containers found on {url}")]
    NoContainers { url: String },
}

/// Problems loading or compiling a site profile.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid pattern for {field}: {source}")]
    Pattern {
        field: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid value for {field}: {reason}")]
    Field { field: String, reason: String },
}
