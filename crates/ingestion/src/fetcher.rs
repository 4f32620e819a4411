//! Network reads with bounded retry and exponential backoff.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use metrics::counter;
use reqwest::Client;
use tracing::{debug, instrument, warn};

use dex_common::{FetchCause, FetchError, HttpResponse, HttpTransport, TransportError};

use crate::config::RetryPolicy;

/// Performs GETs through an [`HttpTransport`], retrying failed attempts.
///
/// A non-2xx status counts as a failed attempt, the same as a transport
/// error. Attempt `k` (1-based) is preceded by a wait of
/// `initial_delay * 2^(k-2)` for `k >= 2`.
#[derive(Clone)]
pub struct BackoffFetcher {
    transport: Arc<dyn HttpTransport>,
    policy: RetryPolicy,
}

impl BackoffFetcher {
    pub fn new(transport: Arc<dyn HttpTransport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Fetch `url` with the default policy, returning the response body.
    pub async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        self.fetch_with_policy(url, self.policy).await
    }

    #[instrument(skip(self, policy), fields(url = %url, max_retries = policy.max_retries))]
    pub async fn fetch_with_policy(
        &self,
        url: &str,
        policy: RetryPolicy,
    ) -> Result<Bytes, FetchError> {
        let mut attempts = 0;
        let mut delay = policy.initial_delay;

        loop {
            attempts += 1;

            let cause = match self.transport.get(url).await {
                Ok(response) if response.is_success() => {
                    debug!(attempts, bytes = response.body.len(), "Fetched");
                    return Ok(response.body);
                }
                Ok(response) => FetchCause::Status(response.status),
                Err(e) => FetchCause::Transport(e.to_string()),
            };

            if attempts > policy.max_retries {
                counter!("ingest_fetch_failures_total").increment(1);
                return Err(FetchError {
                    url: url.to_string(),
                    attempts,
                    cause,
                });
            }

            warn!(
                error = %cause,
                attempt = attempts,
                max_retries = policy.max_retries,
                delay_ms = delay.as_millis() as u64,
                "Fetch failed, retrying"
            );
            counter!("ingest_fetch_retries_total").increment(1);

            tokio::time::sleep(delay).await;

            delay = delay.saturating_mul(2);
        }
    }
}

/// [`HttpTransport`] over a shared reqwest client.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a client with a per-request timeout.
    pub fn new(request_timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("pokedex-ingester/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::new(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TransportError::new(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::new(format!("Failed to read body: {}", e)))?;

        Ok(HttpResponse::new(status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{Reply, ScriptedTransport};
    use tokio::time::Instant;

    const URL: &str = "http://api.test/item";

    fn fetcher(transport: &Arc<ScriptedTransport>, max_retries: u32, initial_ms: u64) -> BackoffFetcher {
        BackoffFetcher::new(
            transport.clone(),
            RetryPolicy::new(max_retries, Duration::from_millis(initial_ms)),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_failing_makes_four_attempts() {
        let transport = Arc::new(
            ScriptedTransport::new().route(URL, vec![Reply::transport_error("connection refused")]),
        );
        let fetcher = fetcher(&transport, 3, 100);

        let start = Instant::now();
        let err = fetcher.fetch(URL).await.unwrap_err();
        let elapsed = start.elapsed();

        assert_eq!(transport.total_calls(), 4);
        assert_eq!(err.attempts, 4);
        assert_eq!(err.url, URL);
        assert_eq!(err.cause, FetchCause::Transport("connection refused".to_string()));
        // 100 + 200 + 400
        assert!(elapsed >= Duration::from_millis(700));
        assert!(elapsed < Duration::from_millis(800));
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_third_attempt() {
        let transport = Arc::new(ScriptedTransport::new().route(
            URL,
            vec![
                Reply::transport_error("reset"),
                Reply::transport_error("reset"),
                Reply::json(r#"{"ok":true}"#),
            ],
        ));
        let fetcher = fetcher(&transport, 3, 100);

        let body = fetcher.fetch(URL).await.unwrap();

        assert_eq!(body, Bytes::from(r#"{"ok":true}"#));
        assert_eq!(transport.total_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_success_status_is_retried() {
        let transport = Arc::new(ScriptedTransport::new().route(
            URL,
            vec![Reply::status(503), Reply::status(404), Reply::json("{}")],
        ));
        let fetcher = fetcher(&transport, 3, 100);

        assert!(fetcher.fetch(URL).await.is_ok());
        assert_eq!(transport.total_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_final_status_is_reported() {
        let transport = Arc::new(ScriptedTransport::new().route(URL, vec![Reply::status(500)]));
        let fetcher = fetcher(&transport, 1, 10);

        let err = fetcher.fetch(URL).await.unwrap_err();
        assert_eq!(err.attempts, 2);
        assert_eq!(err.cause, FetchCause::Status(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_retry_count() {
        let transport = Arc::new(ScriptedTransport::new().route(URL, vec![Reply::status(502)]));
        let fetcher = fetcher(&transport, 3, 100);

        let policy = RetryPolicy::new(5, Duration::from_millis(10));
        let err = fetcher.fetch_with_policy(URL, policy).await.unwrap_err();

        assert_eq!(transport.total_calls(), 6);
        assert_eq!(err.attempts, 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retries_means_single_attempt() {
        let transport = Arc::new(ScriptedTransport::new().route(URL, vec![Reply::status(500)]));
        let fetcher = fetcher(&transport, 0, 100);

        let start = Instant::now();
        assert!(fetcher.fetch(URL).await.is_err());

        assert_eq!(transport.total_calls(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_attempt_after_success() {
        let transport = Arc::new(ScriptedTransport::new().route(URL, vec![Reply::json("{}")]));
        let fetcher = fetcher(&transport, 3, 100);

        fetcher.fetch(URL).await.unwrap();
        assert_eq!(transport.total_calls(), 1);
    }
}
