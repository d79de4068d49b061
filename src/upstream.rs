//! Client for the collaborator API that owns challenges, users and records.

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::cache::{Lookup, QueryCache, DEFAULT_MAX_ENTRIES};
use crate::models::{ChartData, LeaderboardEntry, TodayCount, UserWeeklyDetail};

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode upstream response: {0}")]
    Decode(String),

    #[error("{0}")]
    InvalidRequest(String),
}

impl UpstreamError {
    /// Transport failures and 5xx are worth another attempt; 4xx and bad bodies are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            UpstreamError::Request(e) => !e.is_decode(),
            UpstreamError::Status { status, .. } => *status >= 500,
            UpstreamError::Decode(_) | UpstreamError::InvalidRequest(_) => false,
        }
    }
}

/// How long each kind of response stays fresh, and how many responses are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub chart: Duration,
    pub detail: Duration,
    pub leaderboard: Duration,
    pub today_count: Duration,
    pub max_entries: usize,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            chart: Duration::from_secs(60),
            detail: Duration::from_secs(60),
            leaderboard: Duration::from_secs(30),
            today_count: Duration::from_secs(15),
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
        }
    }
}

impl RetryPolicy {
    /// Delay before the retry that follows failed attempt number `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T, UpstreamError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, UpstreamError>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt + 1 < attempts => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    "🔁 {} failed (attempt {}/{}): {}; retrying in {:?}",
                    what,
                    attempt + 1,
                    attempts,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!("❌ {} failed after {} attempt(s): {}", what, attempt + 1, e);
                return Err(e);
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: Client,
    base_url: Url,
    retry: RetryPolicy,
    freshness: CachePolicy,
    cache: QueryCache,
}

impl UpstreamClient {
    pub fn new(base_url: Url, retry: RetryPolicy, freshness: CachePolicy) -> Self {
        Self {
            http: Client::new(),
            base_url,
            retry,
            freshness,
            cache: QueryCache::with_capacity(freshness.max_entries),
        }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// `{base}/api/challenges/{challenge_id}/{resource}` with the id encoded as a single path segment.
    /// An empty `resource` gives the prefix shared by every endpoint of the challenge.
    pub fn endpoint(&self, challenge_id: &str, resource: &str) -> Result<Url, UpstreamError> {
        if matches!(challenge_id, "" | "." | "..") {
            return Err(UpstreamError::InvalidRequest(format!(
                "invalid challenge id {:?}",
                challenge_id
            )));
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| UpstreamError::InvalidRequest(format!("{} cannot take a path", self.base_url)))?
            .pop_if_empty()
            .extend(["api", "challenges", challenge_id, resource]);
        Ok(url)
    }

    /// Uncached GET with retry.
    pub async fn get_json(&self, url: &Url) -> Result<Value, UpstreamError> {
        let http = &self.http;
        with_retry(&self.retry, url.path(), || async move {
            let response = http.get(url.clone()).send().await?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(UpstreamError::Status {
                    status: status.as_u16(),
                    body,
                });
            }
            response
                .json::<Value>()
                .await
                .map_err(|e| UpstreamError::Decode(e.to_string()))
        })
        .await
    }

    /// GET through the query cache: fresh hits skip the network, stale hits are
    /// returned at once while one background refresh runs.
    pub async fn cached_json(&self, url: Url, freshness: Duration) -> Result<Value, UpstreamError> {
        let key = url.as_str().to_string();
        let (lookup, generation) = self.cache.lookup(&key, freshness).await;
        match lookup {
            Lookup::Fresh(value) => Ok(value),
            Lookup::Stale { value, refresh } => {
                if refresh {
                    let client = self.clone();
                    tokio::spawn(async move {
                        match client.get_json(&url).await {
                            Ok(fresh) => {
                                client.cache.store(&key, fresh, generation).await;
                            }
                            Err(e) => {
                                tracing::warn!("⚠️ background refresh of {} failed: {}", key, e);
                                client.cache.release(&key).await;
                            }
                        }
                    });
                }
                Ok(value)
            }
            Lookup::Missing => {
                let value = self.get_json(&url).await?;
                self.cache.store(&key, value.clone(), generation).await;
                Ok(value)
            }
        }
    }

    async fn cached<T: DeserializeOwned>(&self, url: Url, freshness: Duration) -> Result<T, UpstreamError> {
        let what = url.path().to_string();
        let value = self.cached_json(url, freshness).await?;
        serde_json::from_value(value).map_err(|e| UpstreamError::Decode(format!("{}: {}", what, e)))
    }

    pub async fn chart_data(&self, challenge_id: &str) -> Result<ChartData, UpstreamError> {
        let url = self.endpoint(challenge_id, "chart-data")?;
        self.cached(url, self.freshness.chart).await
    }

    pub async fn leaderboard(&self, challenge_id: &str) -> Result<Vec<LeaderboardEntry>, UpstreamError> {
        let url = self.endpoint(challenge_id, "leaderboard")?;
        self.cached(url, self.freshness.leaderboard).await
    }

    pub async fn today_count(&self, challenge_id: &str) -> Result<TodayCount, UpstreamError> {
        let url = self.endpoint(challenge_id, "today-count")?;
        self.cached(url, self.freshness.today_count).await
    }

    pub async fn weekly_detail(
        &self,
        challenge_id: &str,
        user_ids: &[String],
    ) -> Result<Vec<UserWeeklyDetail>, UpstreamError> {
        let mut url = self.endpoint(challenge_id, "weekly-detail")?;
        url.query_pairs_mut().append_pair("userIds", &user_ids.join(","));
        self.cached(url, self.freshness.detail).await
    }

    /// Forgets everything cached for one challenge.
    pub async fn invalidate_challenge(&self, challenge_id: &str) -> Result<usize, UpstreamError> {
        let prefix = self.endpoint(challenge_id, "")?;
        let cleared = self.cache.invalidate_prefix(prefix.as_str()).await;
        tracing::info!("🧹 invalidated {} cached responses for challenge {}", cleared, challenge_id);
        Ok(cleared)
    }
}
