//! HTTP client for the embeddings API
//!
//! Each request attempt waits for a limiter slot, then the response is classified:
//! 401 and 400 end the call, 429 waits for the provider's hint (or the computed
//! backoff), and every other failure is retried with exponential backoff.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client as ReqwestClient, StatusCode, header::RETRY_AFTER};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use super::cache::EmbeddingCache;
use super::error::EmbeddingError;
use super::limiter::RequestLimiter;
use super::retry::RetryPolicy;
use super::types::{EmbedOptions, EmbeddingRequest, EmbeddingResponse, ProviderErrorBody};
use super::Embedding;
use crate::config::EmbeddingConfig;

/// Characters of the prompt included in attempt logs
const PROMPT_PREVIEW_CHARS: usize = 50;

/// Why a single attempt did not produce a vector
enum Rejection {
    /// HTTP 429, with the provider's retry hint if it sent one
    Throttled { retry_after: Option<Duration> },
    Failed(EmbeddingError),
}

impl From<EmbeddingError> for Rejection {
    fn from(err: EmbeddingError) -> Self {
        Self::Failed(err)
    }
}

impl From<reqwest::Error> for Rejection {
    fn from(err: reqwest::Error) -> Self {
        Self::Failed(EmbeddingError::Http(err))
    }
}

/// Embedding client with caching, request spacing and retries
///
/// Cloning is cheap; clones share the cache and the limiter.
///
/// # Examples
///
/// ```no_run
/// use cinescope::config::EmbeddingConfig;
/// use cinescope::embedding::{EmbedOptions, EmbeddingClient};
///
/// # async fn run() -> Result<(), cinescope::embedding::EmbeddingError> {
/// let client = EmbeddingClient::new(EmbeddingConfig::builder().api_key("sk-...").build())?;
/// let vector = client.embed("a heist that goes wrong", &EmbedOptions::default()).await?;
/// assert_eq!(vector.len(), 512);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct EmbeddingClient {
    http: ReqwestClient,
    endpoint: Url,
    api_key: Option<String>,
    cache: Arc<EmbeddingCache>,
    limiter: RequestLimiter,
    retry: RetryPolicy,
}

impl EmbeddingClient {
    /// Create a client from explicit configuration
    pub fn new(config: EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let endpoint = Url::parse(&format!(
            "{}/v1/embeddings",
            config.base_url.trim_end_matches('/')
        ))
        .map_err(|e| EmbeddingError::Configuration(format!("Invalid base URL: {}", e)))?;

        let http = ReqwestClient::builder()
            .timeout(config.request_timeout)
            .build()?;

        let cache = match config.cache_capacity {
            Some(capacity) => EmbeddingCache::with_capacity_limit(capacity),
            None => EmbeddingCache::new(),
        };

        Ok(Self {
            http,
            endpoint,
            api_key: config.api_key.filter(|key| !key.trim().is_empty()),
            cache: Arc::new(cache),
            limiter: RequestLimiter::new(config.min_request_interval),
            retry: RetryPolicy {
                base_delay: config.retry_base_delay,
                max_delay: config.max_retry_delay,
                jitter: config.jitter,
                ..RetryPolicy::default()
            },
        })
    }

    /// Create a client from `OPENAI_API_KEY` / `OPENAI_BASE_URL`
    pub fn from_env() -> Result<Self, EmbeddingError> {
        Self::new(crate::config::Settings::from_env().embedding)
    }

    /// Full URL requests are sent to
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// The client's cache
    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }

    /// Discard every cached embedding
    pub fn clear_cache(&self) {
        self.cache.clear();
        info!("Embedding cache cleared");
    }

    /// Number of cached embeddings
    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    /// Generate the embedding for `prompt`
    ///
    /// Makes at most `options.max_retries + 1` attempts. A cache hit returns
    /// without waiting on the limiter.
    #[instrument(
        skip(self, prompt, options),
        fields(model = %options.model, dimensions = options.dimensions)
    )]
    pub async fn embed(
        &self,
        prompt: &str,
        options: &EmbedOptions,
    ) -> Result<Embedding, EmbeddingError> {
        if options.use_cache {
            if let Some(vector) = self.cache.get(prompt) {
                debug!("Using cached embedding for prompt");
                return Ok(vector);
            }
        }

        let api_key = self.api_key.as_deref().ok_or_else(|| {
            EmbeddingError::Configuration(
                "OPENAI_API_KEY environment variable is not set".to_string(),
            )
        })?;

        let policy = self.retry.with_max_retries(options.max_retries);
        let total = policy.total_attempts();
        let request = EmbeddingRequest {
            input: prompt,
            model: &options.model,
            dimensions: options.dimensions,
        };

        let mut attempt = 0;
        loop {
            self.limiter.acquire().await;

            debug!(
                "Embedding attempt {}/{} for prompt: {}...",
                attempt + 1,
                total,
                preview(prompt)
            );

            match self.send(api_key, &request).await {
                Ok(vector) => {
                    if options.use_cache {
                        self.cache.put(prompt, vector.clone());
                    }
                    info!(
                        "Successfully generated embedding with {} dimensions",
                        vector.len()
                    );
                    return Ok(vector);
                }
                Err(Rejection::Throttled { retry_after }) => {
                    let wait = policy.delay_for(attempt, retry_after);
                    warn!(
                        "Rate limited. Waiting {} ms before retry {}/{}",
                        wait.as_millis(),
                        attempt + 1,
                        total
                    );

                    if !policy.has_attempts_after(attempt) {
                        return Err(EmbeddingError::RateLimitExceeded { attempts: total });
                    }
                    tokio::time::sleep(wait).await;
                }
                Err(Rejection::Failed(err)) => {
                    if !err.is_retryable() {
                        return Err(err);
                    }

                    error!("Embedding attempt {} failed: {}", attempt + 1, err);

                    if !policy.has_attempts_after(attempt) {
                        return Err(EmbeddingError::Exhausted {
                            attempts: total,
                            source: Box::new(err),
                        });
                    }

                    let backoff = policy.backoff(attempt);
                    debug!("Waiting {} ms before next attempt", backoff.as_millis());
                    tokio::time::sleep(backoff).await;
                }
            }

            attempt += 1;
        }
    }

    /// Issue one request and classify the response
    async fn send(
        &self,
        api_key: &str,
        request: &EmbeddingRequest<'_>,
    ) -> Result<Embedding, Rejection> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(Rejection::Throttled { retry_after });
        }

        if status == StatusCode::UNAUTHORIZED {
            return Err(EmbeddingError::Authentication.into());
        }

        let body = response.text().await?;

        if status == StatusCode::BAD_REQUEST {
            let message = serde_json::from_str::<ProviderErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .and_then(|e| e.message)
                .unwrap_or_else(|| "Invalid request parameters".to_string());
            return Err(EmbeddingError::BadRequest(message).into());
        }

        if !status.is_success() {
            return Err(EmbeddingError::Provider {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        parse_embedding(&body).map_err(Rejection::from)
    }
}

impl std::fmt::Debug for EmbeddingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("has_api_key", &self.api_key.is_some())
            .field("cache_size", &self.cache.len())
            .field("limiter", &self.limiter)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Extract `data[0].embedding` from a successful response body
fn parse_embedding(body: &str) -> Result<Embedding, EmbeddingError> {
    let response: EmbeddingResponse = serde_json::from_str(body).map_err(|e| {
        EmbeddingError::MalformedResponse(format!("Failed to parse response: {}", e))
    })?;

    let first = response
        .data
        .and_then(|data| data.into_iter().next())
        .ok_or_else(|| {
            EmbeddingError::MalformedResponse("Invalid response structure".to_string())
        })?;

    first
        .embedding
        .ok_or_else(|| EmbeddingError::MalformedResponse("No embedding data received".to_string()))
}

fn preview(prompt: &str) -> String {
    prompt.chars().take(PROMPT_PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server, ServerGuard};
    use std::io::Write;
    use std::time::Instant;

    const PATH: &str = "/v1/embeddings";

    fn embedding_body(vector: &[f32]) -> String {
        serde_json::json!({
            "object": "list",
            "data": [{ "object": "embedding", "index": 0, "embedding": vector }],
            "model": "text-embedding-3-large",
            "usage": { "prompt_tokens": 4, "total_tokens": 4 }
        })
        .to_string()
    }

    fn test_config(server: &ServerGuard) -> EmbeddingConfig {
        EmbeddingConfig::builder()
            .api_key("sk-test")
            .base_url(server.url())
            .min_request_interval(Duration::ZERO)
            .retry_base_delay(Duration::from_millis(10))
            .build()
    }

    fn test_client(server: &ServerGuard) -> EmbeddingClient {
        EmbeddingClient::new(test_config(server)).unwrap()
    }

    #[tokio::test]
    async fn test_embed_success_sends_expected_request() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::Json(serde_json::json!({
                "input": "a space western",
                "model": "text-embedding-3-large",
                "dimensions": 512
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(embedding_body(&[0.1, 0.2, 0.3]))
            .expect(1)
            .create_async()
            .await;

        let client = test_client(&server);
        let vector = client
            .embed("a space western", &EmbedOptions::default())
            .await
            .unwrap();

        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_cache_hit_skips_network() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .with_status(200)
            .with_body(embedding_body(&[0.5, 0.25]))
            .expect(1)
            .create_async()
            .await;

        let client = test_client(&server);
        let options = EmbedOptions::default();

        let first = client.embed("romcom", &options).await.unwrap();
        let second = client.embed("romcom", &options).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(client.cache_size(), 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_cache_opt_out_always_requests() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .with_status(200)
            .with_body(embedding_body(&[1.0]))
            .expect(2)
            .create_async()
            .await;

        let client = test_client(&server);
        let options = EmbedOptions::default().with_cache(false);

        client.embed("thriller", &options).await.unwrap();
        client.embed("thriller", &options).await.unwrap();

        assert_eq!(client.cache_size(), 0);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_clear_cache_forces_new_request() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .with_status(200)
            .with_body(embedding_body(&[1.0]))
            .expect(2)
            .create_async()
            .await;

        let client = test_client(&server);
        let options = EmbedOptions::default();

        client.embed("western", &options).await.unwrap();
        client.clear_cache();
        assert_eq!(client.cache_size(), 0);
        client.embed("western", &options).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_independent_clients_do_not_share_cache() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .with_status(200)
            .with_body(embedding_body(&[1.0]))
            .expect(2)
            .create_async()
            .await;

        let first = test_client(&server);
        let second = test_client(&server);
        let shared = first.clone();

        first.embed("drama", &EmbedOptions::default()).await.unwrap();
        shared.embed("drama", &EmbedOptions::default()).await.unwrap();
        second.embed("drama", &EmbedOptions::default()).await.unwrap();

        assert_eq!(shared.cache_size(), 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_before_network() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .with_status(200)
            .with_body(embedding_body(&[1.0]))
            .expect(0)
            .create_async()
            .await;

        let config = EmbeddingConfig {
            api_key: None,
            ..test_config(&server)
        };
        let client = EmbeddingClient::new(config).unwrap();

        let result = client.embed("horror", &EmbedOptions::default()).await;
        assert!(matches!(result, Err(EmbeddingError::Configuration(_))));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unauthorized_is_not_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .with_status(401)
            .with_body("{\"error\": {\"message\": \"Incorrect API key provided\"}}")
            .expect(1)
            .create_async()
            .await;

        let client = test_client(&server);
        let result = client.embed("horror", &EmbedOptions::default()).await;

        assert!(matches!(result, Err(EmbeddingError::Authentication)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_bad_request_carries_provider_message() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .with_status(400)
            .with_body("{\"error\": {\"message\": \"dimensions must be at most 3072\", \"type\": \"invalid_request_error\", \"code\": null}}")
            .expect(1)
            .create_async()
            .await;

        let client = test_client(&server);
        let result = client
            .embed("musical", &EmbedOptions::default().with_dimensions(9000))
            .await;

        match result {
            Err(EmbeddingError::BadRequest(message)) => {
                assert_eq!(message, "dimensions must be at most 3072")
            }
            other => panic!("expected bad request, got {:?}", other),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_bad_request_without_message() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .with_status(400)
            .with_body("not json")
            .expect(1)
            .create_async()
            .await;

        let client = test_client(&server);
        let result = client.embed("musical", &EmbedOptions::default()).await;

        match result {
            Err(EmbeddingError::BadRequest(message)) => {
                assert_eq!(message, "Invalid request parameters")
            }
            other => panic!("expected bad request, got {:?}", other),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_errors_then_success() {
        let mut server = Server::new_async().await;

        let failures = server
            .mock("POST", PATH)
            .with_status(500)
            .with_body("internal error")
            .expect(2)
            .create_async()
            .await;

        let success = server
            .mock("POST", PATH)
            .with_status(200)
            .with_body(embedding_body(&[0.9, 0.8]))
            .expect(1)
            .create_async()
            .await;

        let client = test_client(&server);
        let vector = client
            .embed("war epic", &EmbedOptions::default().with_max_retries(3))
            .await
            .unwrap();

        assert_eq!(vector, vec![0.9, 0.8]);
        failures.assert_async().await;
        success.assert_async().await;
    }

    #[tokio::test]
    async fn test_provider_errors_exhaust_attempts() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .with_status(503)
            .with_body("unavailable")
            .expect(3)
            .create_async()
            .await;

        let client = test_client(&server);
        let result = client
            .embed("biopic", &EmbedOptions::default().with_max_retries(2))
            .await;

        match result {
            Err(EmbeddingError::Exhausted { attempts, source }) => {
                assert_eq!(attempts, 3);
                assert!(matches!(
                    *source,
                    EmbeddingError::Provider { status: 503, .. }
                ));
            }
            other => panic!("expected exhausted, got {:?}", other),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_malformed_response_is_retried() {
        let mut server = Server::new_async().await;

        let malformed = server
            .mock("POST", PATH)
            .with_status(200)
            .with_body("{\"data\": []}")
            .expect(1)
            .create_async()
            .await;

        let success = server
            .mock("POST", PATH)
            .with_status(200)
            .with_body(embedding_body(&[0.4]))
            .expect(1)
            .create_async()
            .await;

        let client = test_client(&server);
        let vector = client
            .embed("animated", &EmbedOptions::default())
            .await
            .unwrap();

        assert_eq!(vector, vec![0.4]);
        malformed.assert_async().await;
        success.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_embedding_field_exhausts() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .with_status(200)
            .with_body("{\"data\": [{\"index\": 0}]}")
            .expect(1)
            .create_async()
            .await;

        let client = test_client(&server);
        let result = client
            .embed("mystery", &EmbedOptions::default().with_max_retries(0))
            .await;

        match result {
            Err(err @ EmbeddingError::Exhausted { .. }) => {
                assert!(matches!(err.root(), EmbeddingError::MalformedResponse(_)));
            }
            other => panic!("expected exhausted, got {:?}", other),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rate_limit_retry_success() {
        let mut server = Server::new_async().await;

        let throttled = server
            .mock("POST", PATH)
            .with_status(429)
            .with_header("retry-after", "0")
            .with_body("{\"error\": {\"message\": \"Rate limit reached\"}}")
            .expect(1)
            .create_async()
            .await;

        let success = server
            .mock("POST", PATH)
            .with_status(200)
            .with_body(embedding_body(&[0.7]))
            .expect(1)
            .create_async()
            .await;

        let client = test_client(&server);
        let vector = client
            .embed("sports drama", &EmbedOptions::default())
            .await
            .unwrap();

        assert_eq!(vector, vec![0.7]);
        throttled.assert_async().await;
        success.assert_async().await;
    }

    #[tokio::test]
    async fn test_rate_limit_max_retries_exceeded() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .with_status(429)
            .with_body("{\"error\": {\"message\": \"Rate limit reached\"}}")
            .expect(2)
            .create_async()
            .await;

        let client = test_client(&server);
        let result = client
            .embed("sports drama", &EmbedOptions::default().with_max_retries(1))
            .await;

        assert!(matches!(
            result,
            Err(EmbeddingError::RateLimitExceeded { attempts: 2 })
        ));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_requests_are_spaced_by_limiter() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .with_status(200)
            .with_body(embedding_body(&[1.0]))
            .expect(3)
            .create_async()
            .await;

        let config = EmbeddingConfig {
            min_request_interval: Duration::from_millis(200),
            ..test_config(&server)
        };
        let client = EmbeddingClient::new(config).unwrap();

        let start = Instant::now();
        for prompt in ["one", "two", "three"] {
            client.embed(prompt, &EmbedOptions::default()).await.unwrap();
        }

        assert!(start.elapsed() >= Duration::from_millis(395));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_retries_wait_for_limiter() {
        let mut server = Server::new_async().await;
        let failures = server
            .mock("POST", PATH)
            .with_status(500)
            .with_body("internal error")
            .expect(2)
            .create_async()
            .await;
        let success = server
            .mock("POST", PATH)
            .with_status(200)
            .with_body(embedding_body(&[1.0]))
            .expect(1)
            .create_async()
            .await;

        let config = EmbeddingConfig {
            min_request_interval: Duration::from_millis(300),
            retry_base_delay: Duration::ZERO,
            ..test_config(&server)
        };
        let client = EmbeddingClient::new(config).unwrap();

        let start = Instant::now();
        client
            .embed("noir", &EmbedOptions::default())
            .await
            .unwrap();

        assert!(start.elapsed() >= Duration::from_millis(595));
        failures.assert_async().await;
        success.assert_async().await;
    }

    #[tokio::test]
    async fn test_retry_after_hint_overrides_backoff() {
        let mut server = Server::new_async().await;
        let throttled = server
            .mock("POST", PATH)
            .with_status(429)
            .with_header("retry-after", "1")
            .with_body("{\"error\": {\"message\": \"Rate limit reached\"}}")
            .expect(1)
            .create_async()
            .await;
        let success = server
            .mock("POST", PATH)
            .with_status(200)
            .with_body(embedding_body(&[0.3]))
            .expect(1)
            .create_async()
            .await;

        let client = test_client(&server);

        let start = Instant::now();
        let vector = client
            .embed("courtroom drama", &EmbedOptions::default())
            .await
            .unwrap();

        assert_eq!(vector, vec![0.3]);
        assert!(start.elapsed() >= Duration::from_millis(995));
        throttled.assert_async().await;
        success.assert_async().await;
    }

    #[tokio::test]
    async fn test_unauthorized_ignores_unreadable_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .with_status(401)
            .with_chunked_body(|w| {
                w.write_all(b"{\"error\":")?;
                std::thread::sleep(Duration::from_millis(50));
                Err(std::io::Error::other("connection reset"))
            })
            .expect(1)
            .create_async()
            .await;

        let client = test_client(&server);
        let result = client.embed("western", &EmbedOptions::default()).await;

        assert!(matches!(result, Err(EmbeddingError::Authentication)));
        mock.assert_async().await;
    }

    #[test]
    fn test_endpoint_from_base_url() {
        let config = EmbeddingConfig::builder()
            .base_url("http://localhost:8080/")
            .build();
        let client = EmbeddingClient::new(config).unwrap();

        assert_eq!(
            client.endpoint().as_str(),
            "http://localhost:8080/v1/embeddings"
        );
    }

    #[test]
    fn test_invalid_base_url_is_configuration_error() {
        let config = EmbeddingConfig::builder().base_url("not a url").build();

        assert!(matches!(
            EmbeddingClient::new(config),
            Err(EmbeddingError::Configuration(_))
        ));
    }

    #[test]
    fn test_preview_is_char_safe() {
        let prompt = "é".repeat(80);
        assert_eq!(preview(&prompt).chars().count(), 50);
        assert_eq!(preview("short"), "short");
    }
}
