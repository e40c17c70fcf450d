//! Page fetching with exponential backoff retry logic.
//!
//! This is the network side of the page-fetch collaborator. The extraction
//! core only ever sees the HTML this module returns.
//!
//! # Architecture
//!
//! - [`PageSource`]: Core trait returning one page of HTML
//! - [`HttpSource`]: Fetches the listings page over HTTP with browser-like headers
//! - [`FileSource`]: Reads a saved snapshot (offline runs, reproducing bugs)
//! - [`RetryFetch`]: Decorator adding retries to any `PageSource`
//!
//! # Retry Strategy
//!
//! - Bounded number of retries (from the site profile)
//! - Exponential backoff from the base delay, capped at 30 seconds
//! - Random jitter (0-250ms) added to every delay

use crate::config::RequestConfig;
use crate::errors::FetchFailure;
use rand::{Rng, rng};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// Anything that can produce the HTML of the listings page.
pub trait PageSource {
    /// Fetch the page. Errors are final for this attempt.
    async fn fetch(&self) -> Result<String, FetchFailure>;
}

/// Fetches a page over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    url: String,
}

impl HttpSource {
    pub fn new(url: impl Into<String>, request: &RequestConfig) -> Result<Self, FetchFailure> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = reqwest::Client::builder()
            .user_agent(request.user_agent.clone())
            .default_headers(headers)
            .timeout(request.timeout())
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl PageSource for HttpSource {
    #[instrument(level = "info", skip_all, fields(url = %self.url))]
    async fn fetch(&self) -> Result<String, FetchFailure> {
        let t0 = Instant::now();
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        info!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched listings page"
        );
        Ok(body)
    }
}

/// Reads a page snapshot from disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    pub path: PathBuf,
}

impl PageSource for FileSource {
    #[instrument(level = "info", skip_all, fields(path = %self.path.display()))]
    async fn fetch(&self) -> Result<String, FetchFailure> {
        let body = tokio::fs::read_to_string(&self.path).await?;
        info!(bytes = body.len(), "Read page snapshot");
        Ok(body)
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`PageSource`].
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryFetch<T> {
    inner: T,
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T> RetryFetch<T>
where
    T: PageSource,
{
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> PageSource for RetryFetch<T>
where
    T: PageSource,
{
    #[instrument(level = "info", skip_all)]
    async fn fetch(&self) -> Result<String, FetchFailure> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.fetch().await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries || !is_retryable(&e) {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "fetch() giving up"
                        );
                        return Err(e);
                    }

                    let shift = u32::try_from(attempt - 1).unwrap_or(u32::MAX).min(16);
                    let delay = self
                        .base_delay
                        .saturating_mul(1 << shift)
                        .min(self.max_delay);
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "fetch() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// Server errors and transport failures are worth another try; a missing
/// snapshot or a 4xx answer is not.
fn is_retryable(err: &FetchFailure) -> bool {
    match err {
        FetchFailure::Request(_) => true,
        FetchFailure::Status { status, .. } => *status >= 500 || *status == 429,
        FetchFailure::Io(_) | FetchFailure::NoContainers { .. } => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Flaky {
        failures: usize,
        status: u16,
        calls: AtomicUsize,
    }

    impl Flaky {
        fn new(failures: usize, status: u16) -> Self {
            Self {
                failures,
                status,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl PageSource for Flaky {
        async fn fetch(&self) -> Result<String, FetchFailure> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(FetchFailure::Status {
                    url: "https://example.com".to_string(),
                    status: self.status,
                })
            } else {
                Ok("<html></html>".to_string())
            }
        }
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let fetcher = RetryFetch::new(Flaky::new(2, 503), 3, StdDuration::from_millis(1));
        let body = fetcher.fetch().await.unwrap();
        assert_eq!(body, "<html></html>");
        assert_eq!(fetcher.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let fetcher = RetryFetch::new(Flaky::new(10, 502), 2, StdDuration::from_millis(1));
        let err = fetcher.fetch().await.unwrap_err();
        assert!(matches!(err, FetchFailure::Status { status: 502, .. }));
        assert_eq!(fetcher.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let fetcher = RetryFetch::new(Flaky::new(10, 404), 5, StdDuration::from_millis(1));
        assert!(fetcher.fetch().await.is_err());
        assert_eq!(fetcher.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_file_source_reads_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(&path, "<div class=\"store-info\"></div>").unwrap();

        let body = FileSource { path }.fetch().await.unwrap();
        assert!(body.contains("store-info"));
    }

    #[tokio::test]
    async fn test_missing_snapshot_is_io_failure() {
        let source = FileSource {
            path: PathBuf::from("/nonexistent/page.html"),
        };
        assert!(matches!(source.fetch().await, Err(FetchFailure::Io(_))));
    }

    #[test]
    fn test_http_source_builds_with_defaults() {
        let source = HttpSource::new(
            "https://locator.wizards.com/store/14936",
            &RequestConfig::default(),
        );
        assert!(source.is_ok());
    }
}
