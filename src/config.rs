//! Per-source configuration.
//!
//! Each venue has a published rate ceiling; the pacing constants here keep
//! the scan under it. Configuration is immutable and injected at
//! construction, nothing reads process-wide state.

use std::time::Duration;

use crate::client::RetryPolicy;

/// Rate budget knobs for one source.
#[derive(Debug, Clone)]
pub struct Pacing {
    /// Maximum concurrent admitted detail fetches.
    pub concurrency_limit: usize,
    /// Work items drained per batch before the inter-batch pause.
    pub batch_size: usize,
    /// Listing page size requested from the venue.
    pub page_size: usize,
    /// Hard ceiling on listing pages per run.
    pub max_pages: usize,
    /// Pause between listing pages.
    pub page_delay: Duration,
    /// Pause after each drained batch.
    pub batch_delay: Duration,
    /// Hold on the admission slot after a detail fetch completes, so bursts
    /// are smoothed rather than released in lockstep.
    pub settle_delay: Duration,
}

#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub base_url: String,
    pub api_key: String,
    pub pacing: Pacing,
    pub retry: RetryPolicy,
    /// Per-attempt HTTP timeout.
    pub request_timeout: Duration,
    /// Optional run deadline: stops dispatching new work, lets admitted
    /// work finish.
    pub run_timeout: Option<Duration>,
}

impl SourceConfig {
    /// Opinion-style venue: 15 req/s published ceiling, so 10 concurrent
    /// with batches of 40 stays safely under it.
    pub fn opinion(api_key: impl Into<String>) -> Self {
        Self {
            base_url: "https://openapi.opinion.trade/openapi".to_string(),
            api_key: api_key.into(),
            pacing: Pacing {
                concurrency_limit: 10,
                batch_size: 40,
                page_size: 20,
                max_pages: 8,
                page_delay: Duration::from_millis(200),
                batch_delay: Duration::from_millis(250),
                settle_delay: Duration::from_millis(20),
            },
            retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(20),
            run_timeout: None,
        }
    }

    /// Predict-style venue: 240 req/min ceiling, roughly 4/s.
    pub fn predict(api_key: impl Into<String>) -> Self {
        Self {
            base_url: "https://api.predict.fun/v1".to_string(),
            api_key: api_key.into(),
            pacing: Pacing {
                concurrency_limit: 4,
                batch_size: 100,
                page_size: 100,
                max_pages: 8,
                page_delay: Duration::from_millis(100),
                batch_delay: Duration::from_millis(100),
                settle_delay: Duration::from_millis(100),
            },
            retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(20),
            run_timeout: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.pacing.max_pages = max_pages;
        self
    }

    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = Some(timeout);
        self
    }
}
