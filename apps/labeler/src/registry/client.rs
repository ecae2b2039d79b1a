//! Resilient fetch client: the single point of entry for dataset registry reads.
//!
//! Every request is time-bounded per attempt and retried with exponential backoff
//! plus jitter. Only 5xx, 408 and (optionally) 429 are retried; every other 4xx
//! fails on the first attempt without consuming the retry budget.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::registry::transport::HttpTransport;
use crate::registry::{
    DatasetInfo, DatasetRegistry, FetchError, PageRequest, PageResponse, MAX_PAGE_SIZE,
};

const BACKOFF_BASE_MS: u64 = 100;
/// Jitter adds up to this fraction of the base delay.
const JITTER_RATIO: f64 = 0.5;
/// Error bodies are truncated to this many chars before being carried in a `FetchError`.
const MAX_ERROR_BODY_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub max_attempts: u32,
    pub retry_on_429: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            retry_on_429: true,
        }
    }
}

/// `status >= 500 || status == 408 || (status == 429 && retry_on_429)`.
pub fn is_retriable_status(status: u16, retry_on_429: bool) -> bool {
    status >= 500 || status == 408 || (status == 429 && retry_on_429)
}

/// Base delay after the given 0-indexed attempt: `2^attempt * 100ms`.
pub fn backoff_base(attempt: u32) -> Duration {
    let multiplier = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    Duration::from_millis(BACKOFF_BASE_MS.saturating_mul(multiplier))
}

/// Base delay plus uniform jitter in `[0, 0.5 * base]`.
pub fn backoff_delay(attempt: u32) -> Duration {
    let base = backoff_base(attempt);
    let max_jitter = (base.as_millis() as f64 * JITTER_RATIO) as u64;
    let jitter = rand::rng().random_range(0..=max_jitter);
    base + Duration::from_millis(jitter)
}

#[derive(Clone)]
pub struct ResilientFetchClient {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    token: Option<String>,
    options: FetchOptions,
}

impl ResilientFetchClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        base_url: impl Into<String>,
        token: Option<String>,
        options: FetchOptions,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            options,
        }
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    fn rows_url(&self, request: &PageRequest) -> Result<Url, FetchError> {
        let length = request.length.min(MAX_PAGE_SIZE);
        let params = [
            ("dataset", request.dataset.clone()),
            ("config", request.subset.clone()),
            ("split", request.split.clone()),
            ("offset", request.offset.to_string()),
            ("length", length.to_string()),
        ];
        Url::parse_with_params(&format!("{}/rows", self.base_url), &params)
            .map_err(|e| FetchError::InvalidUrl(e.to_string()))
    }

    fn info_url(&self, dataset: &str) -> Result<Url, FetchError> {
        Url::parse_with_params(&format!("{}/info", self.base_url), &[("dataset", dataset)])
            .map_err(|e| FetchError::InvalidUrl(e.to_string()))
    }

    /// GETs `url` and decodes the body, retrying retriable failures.
    /// On exhaustion the last error seen is returned.
    async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, FetchError> {
        let max_attempts = self.options.max_attempts.max(1);
        let mut last_error: Option<FetchError> = None;

        for attempt in 0..max_attempts {
            match self.attempt(url).await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!("Registry request succeeded on attempt {}", attempt + 1);
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_retriable() => return Err(e),
                Err(e) => {
                    if attempt + 1 < max_attempts {
                        let delay = backoff_delay(attempt);
                        warn!(
                            "Registry attempt {}/{} failed ({}), retrying after {}ms...",
                            attempt + 1,
                            max_attempts,
                            e,
                            delay.as_millis()
                        );
                        tokio::time::sleep(delay).await;
                    } else {
                        warn!(
                            "Registry attempt {}/{} failed ({}), giving up",
                            attempt + 1,
                            max_attempts,
                            e
                        );
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| FetchError::Transport("no attempt was made".into())))
    }

    /// One time-bounded attempt. Dropping the transport future on timeout cancels it.
    async fn attempt<T: DeserializeOwned>(&self, url: &Url) -> Result<T, FetchError> {
        let call = self.transport.get(url.as_str(), self.token.as_deref());
        let reply = match tokio::time::timeout(self.options.timeout, call).await {
            Ok(reply) => reply?,
            Err(_) => return Err(FetchError::Timeout(self.options.timeout)),
        };

        if !(200..300).contains(&reply.status) {
            let message: String = reply.body.chars().take(MAX_ERROR_BODY_CHARS).collect();
            return Err(if is_retriable_status(reply.status, self.options.retry_on_429) {
                FetchError::RetriableStatus {
                    status: reply.status,
                    message,
                }
            } else {
                FetchError::NonRetriable {
                    status: reply.status,
                    message,
                }
            });
        }

        serde_json::from_str(&reply.body).map_err(|e| FetchError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl DatasetRegistry for ResilientFetchClient {
    async fn fetch_page(&self, request: &PageRequest) -> Result<PageResponse, FetchError> {
        let url = self.rows_url(request)?;
        self.get_json(&url).await
    }

    async fn dataset_info(
        &self,
        dataset: &str,
        subset: &str,
        split: &str,
    ) -> Result<DatasetInfo, FetchError> {
        let url = self.info_url(dataset)?;
        let body: serde_json::Value = self.get_json(&url).await?;
        let num_rows = body
            .get("dataset_info")
            .and_then(|info| info.get(subset))
            .and_then(|config| config.get("splits"))
            .and_then(|splits| splits.get(split))
            .and_then(|split| split.get("num_rows"))
            .and_then(|n| n.as_u64());

        Ok(DatasetInfo {
            dataset: dataset.to_string(),
            num_rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::transport::HttpReply;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    const PAGE_BODY: &str = r#"{"rows": [{"row_idx": 0, "row": {"text": "a"}}], "num_rows_total": 1, "num_rows_per_page": 100}"#;

    /// Replays a fixed script of replies; `None` entries hang until cancelled.
    struct ScriptedTransport {
        script: Mutex<VecDeque<Option<Result<HttpReply, FetchError>>>>,
        calls: AtomicUsize,
        urls: Mutex<Vec<String>>,
        bearers: Mutex<Vec<Option<String>>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Option<Result<HttpReply, FetchError>>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
                urls: Mutex::new(Vec::new()),
                bearers: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn get(&self, url: &str, bearer: Option<&str>) -> Result<HttpReply, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.urls.lock().unwrap().push(url.to_string());
            self.bearers.lock().unwrap().push(bearer.map(String::from));
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(Some(reply)) => reply,
                Some(None) => futures::future::pending().await,
                None => panic!("transport script exhausted"),
            }
        }
    }

    fn status(code: u16, body: &str) -> Option<Result<HttpReply, FetchError>> {
        Some(Ok(HttpReply {
            status: code,
            body: body.to_string(),
        }))
    }

    fn client(transport: Arc<ScriptedTransport>, options: FetchOptions) -> ResilientFetchClient {
        ResilientFetchClient::new(
            transport,
            "https://registry.test/",
            Some("secret".to_string()),
            options,
        )
    }

    fn request() -> PageRequest {
        PageRequest {
            dataset: "acme/resumes".to_string(),
            subset: "default".to_string(),
            split: "train".to_string(),
            offset: 200,
            length: 500,
        }
    }

    #[test]
    fn test_retriable_status_classification() {
        for s in 100u16..600 {
            for retry_on_429 in [true, false] {
                let expected = s >= 500 || s == 408 || (s == 429 && retry_on_429);
                assert_eq!(is_retriable_status(s, retry_on_429), expected, "status {s}");
            }
        }
    }

    #[test]
    fn test_backoff_base_is_strictly_increasing() {
        assert_eq!(backoff_base(0), Duration::from_millis(100));
        assert_eq!(backoff_base(1), Duration::from_millis(200));
        assert_eq!(backoff_base(2), Duration::from_millis(400));
        for a in 0..10 {
            assert!(backoff_base(a) < backoff_base(a + 1));
        }
    }

    #[test]
    fn test_backoff_jitter_stays_within_half_base() {
        for attempt in 0..5 {
            let base = backoff_base(attempt);
            for _ in 0..50 {
                let delay = backoff_delay(attempt);
                assert!(delay >= base);
                assert!(delay <= base + base / 2);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_two_server_errors() {
        let transport = ScriptedTransport::new(vec![
            status(503, "unavailable"),
            status(503, "unavailable"),
            status(200, PAGE_BODY),
        ]);
        let client = client(transport.clone(), FetchOptions::default());

        let started = Instant::now();
        let page = client.fetch_page(&request()).await.unwrap();
        let slept = started.elapsed();

        assert_eq!(page.rows.len(), 1);
        assert_eq!(transport.calls(), 3);
        // 100ms + 200ms base, each with up to 50% jitter.
        assert!(slept >= Duration::from_millis(300), "slept {slept:?}");
        assert!(slept <= Duration::from_millis(450), "slept {slept:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unauthorized_fails_immediately() {
        let transport = ScriptedTransport::new(vec![status(401, "bad token")]);
        let client = client(transport.clone(), FetchOptions::default());

        let started = Instant::now();
        let err = client.fetch_page(&request()).await.unwrap_err();

        assert!(matches!(err, FetchError::NonRetriable { status: 401, .. }));
        assert_eq!(transport.calls(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_not_retried_when_disabled() {
        let transport = ScriptedTransport::new(vec![status(429, "slow down")]);
        let options = FetchOptions {
            retry_on_429: false,
            ..FetchOptions::default()
        };
        let err = client(transport.clone(), options)
            .fetch_page(&request())
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::NonRetriable { status: 429, .. }));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_retried_without_sleep_after_final_attempt() {
        let transport = ScriptedTransport::new(vec![
            status(429, "slow down"),
            status(429, "slow down"),
            status(429, "slow down"),
        ]);
        let options = FetchOptions {
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            retry_on_429: true,
        };

        let started = Instant::now();
        let err = client(transport.clone(), options)
            .fetch_page(&request())
            .await
            .unwrap_err();
        let slept = started.elapsed();

        assert!(matches!(err, FetchError::RetriableStatus { status: 429, .. }));
        assert_eq!(transport.calls(), 3);
        // Two backoffs (100ms + 200ms, up to 50% jitter), none after the last call.
        assert!(slept >= Duration::from_millis(300), "slept {slept:?}");
        assert!(slept <= Duration::from_millis(450), "slept {slept:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_error() {
        let transport = ScriptedTransport::new(vec![
            status(503, "unavailable"),
            status(408, "request timeout"),
            status(502, "bad gateway"),
        ]);
        let err = client(transport.clone(), FetchOptions::default())
            .fetch_page(&request())
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::RetriableStatus { status: 502, .. }));
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_attempts_time_out_and_retry() {
        let transport = ScriptedTransport::new(vec![None, status(200, PAGE_BODY)]);
        let options = FetchOptions {
            timeout: Duration::from_secs(2),
            ..FetchOptions::default()
        };
        let page = client(transport.clone(), options)
            .fetch_page(&request())
            .await
            .unwrap();

        assert_eq!(page.num_rows_total, Some(1));
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_last_error_when_every_attempt_hangs() {
        let transport = ScriptedTransport::new(vec![None, None]);
        let options = FetchOptions {
            timeout: Duration::from_millis(500),
            max_attempts: 2,
            retry_on_429: true,
        };
        let err = client(transport.clone(), options)
            .fetch_page(&request())
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Timeout(_)));
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_body_is_retried() {
        let transport =
            ScriptedTransport::new(vec![status(200, "{\"rows\": [tru"), status(200, PAGE_BODY)]);
        let page = client(transport.clone(), FetchOptions::default())
            .fetch_page(&request())
            .await
            .unwrap();

        assert_eq!(page.rows.len(), 1);
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_errors_are_retried() {
        let transport = ScriptedTransport::new(vec![
            Some(Err(FetchError::Transport("connection reset".into()))),
            status(200, PAGE_BODY),
        ]);
        client(transport.clone(), FetchOptions::default())
            .fetch_page(&request())
            .await
            .unwrap();
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_rows_url_clamps_length_and_sends_token() {
        let transport = ScriptedTransport::new(vec![status(200, PAGE_BODY)]);
        client(transport.clone(), FetchOptions::default())
            .fetch_page(&request())
            .await
            .unwrap();

        let url = transport.urls.lock().unwrap()[0].clone();
        assert!(url.starts_with("https://registry.test/rows?"), "{url}");
        assert!(url.contains("dataset=acme%2Fresumes"), "{url}");
        assert!(url.contains("offset=200"));
        assert!(url.contains("length=100"));
        assert_eq!(
            transport.bearers.lock().unwrap()[0].as_deref(),
            Some("secret")
        );
    }

    #[tokio::test]
    async fn test_dataset_info_reads_split_row_count() {
        let body = r#"{"dataset_info": {"default": {"splits": {"train": {"num_rows": 2484}}}}}"#;
        let transport = ScriptedTransport::new(vec![status(200, body)]);
        let info = client(transport.clone(), FetchOptions::default())
            .dataset_info("acme/resumes", "default", "train")
            .await
            .unwrap();

        assert_eq!(info.num_rows, Some(2484));
        assert!(transport.urls.lock().unwrap()[0].contains("/info?dataset="));
    }
}
