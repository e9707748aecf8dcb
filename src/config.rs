//! # Configuration Module
//!
//! Environment-driven settings for the embedding client and the catalog, with builder
//! types for programmatic construction.
//!
//! ## Key Components
//!
//! - `EmbeddingConfig`: credentials, endpoint, request spacing and retry timing
//! - `CatalogConfig`: Data API endpoint, token, keyspace and collection
//! - `Settings`: both of the above, loaded from the process environment
//!
//! A missing embedding credential is not an error here. The client reports it as a
//! configuration error on the first uncached call, before touching the network.

use std::fmt;
use std::time::Duration;

/// Embeddings API key
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
/// Optional override of the embeddings API base URL
pub const OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";
/// Data API endpoint of the hosted database
pub const ASTRA_DB_API_ENDPOINT: &str = "ASTRA_DB_API_ENDPOINT";
/// Data API application token
pub const ASTRA_DB_APPLICATION_TOKEN: &str = "ASTRA_DB_APPLICATION_TOKEN";
/// Keyspace holding the collection
pub const ASTRA_DB_KEYSPACE: &str = "ASTRA_DB_KEYSPACE";
/// Collection name override
pub const CINESCOPE_COLLECTION: &str = "CINESCOPE_COLLECTION";
/// Collector endpoint; OTLP export is enabled when set
pub const OTEL_EXPORTER_OTLP_ENDPOINT: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";

/// Default embeddings API base URL
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
/// Default keyspace
pub const DEFAULT_KEYSPACE: &str = "default_keyspace";
/// Default collection
pub const DEFAULT_COLLECTION: &str = "movies";

/// Default timeout for HTTP requests in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Configuration for the embedding client
#[derive(Clone)]
pub struct EmbeddingConfig {
    /// API key sent as a bearer token
    pub api_key: Option<String>,

    /// Base URL of the embeddings API (without the `/v1/embeddings` path)
    pub base_url: String,

    /// Minimum spacing between two requests issued by the same client
    pub min_request_interval: Duration,

    /// Backoff before the second attempt; doubles for every further attempt
    pub retry_base_delay: Duration,

    /// Upper bound on computed backoff delays
    pub max_retry_delay: Option<Duration>,

    /// Randomize computed backoff delays by ±20%
    pub jitter: bool,

    /// Maximum number of cached prompts, unbounded when `None`
    pub cache_capacity: Option<usize>,

    /// Timeout applied to every HTTP request
    pub request_timeout: Duration,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            min_request_interval: Duration::from_millis(1000),
            retry_base_delay: Duration::from_secs(1),
            max_retry_delay: None,
            jitter: false,
            cache_capacity: None,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("min_request_interval", &self.min_request_interval)
            .field("retry_base_delay", &self.retry_base_delay)
            .field("max_retry_delay", &self.max_retry_delay)
            .field("jitter", &self.jitter)
            .field("cache_capacity", &self.cache_capacity)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl EmbeddingConfig {
    /// Create a new builder
    pub fn builder() -> EmbeddingConfigBuilder {
        EmbeddingConfigBuilder::new()
    }
}

/// Builder for EmbeddingConfig
#[derive(Debug, Default)]
pub struct EmbeddingConfigBuilder {
    config: EmbeddingConfig,
}

impl EmbeddingConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: EmbeddingConfig::default(),
        }
    }

    /// Set the API key
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config.api_key = Some(api_key.into());
        self
    }

    /// Set the base URL of the embeddings API
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    /// Set the minimum spacing between requests (zero disables spacing)
    pub fn min_request_interval(mut self, interval: Duration) -> Self {
        self.config.min_request_interval = interval;
        self
    }

    /// Set the base retry delay
    pub fn retry_base_delay(mut self, delay: Duration) -> Self {
        self.config.retry_base_delay = delay;
        self
    }

    /// Cap computed retry delays
    pub fn max_retry_delay(mut self, delay: Duration) -> Self {
        self.config.max_retry_delay = Some(delay);
        self
    }

    /// Enable or disable jitter on computed retry delays
    pub fn jitter(mut self, jitter: bool) -> Self {
        self.config.jitter = jitter;
        self
    }

    /// Bound the number of cached prompts
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache_capacity = Some(capacity);
        self
    }

    /// Set the HTTP request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Build the configuration
    pub fn build(self) -> EmbeddingConfig {
        self.config
    }
}

/// Configuration for the hosted catalog
#[derive(Clone)]
pub struct CatalogConfig {
    /// Data API endpoint, e.g. `https://<db-id>-<region>.apps.astra.datastax.com`
    pub endpoint: Option<String>,

    /// Application token
    pub token: Option<String>,

    /// Keyspace holding the collection
    pub keyspace: String,

    /// Collection name
    pub collection: String,

    /// Timeout applied to every HTTP request
    pub request_timeout: Duration,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            token: None,
            keyspace: DEFAULT_KEYSPACE.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl fmt::Debug for CatalogConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogConfig")
            .field("endpoint", &self.endpoint)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("keyspace", &self.keyspace)
            .field("collection", &self.collection)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl CatalogConfig {
    /// Create a new builder
    pub fn builder() -> CatalogConfigBuilder {
        CatalogConfigBuilder::new()
    }
}

/// Builder for CatalogConfig
#[derive(Debug, Default)]
pub struct CatalogConfigBuilder {
    config: CatalogConfig,
}

impl CatalogConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: CatalogConfig::default(),
        }
    }

    /// Set the Data API endpoint
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = Some(endpoint.into());
        self
    }

    /// Set the application token
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.config.token = Some(token.into());
        self
    }

    /// Set the keyspace
    pub fn keyspace(mut self, keyspace: impl Into<String>) -> Self {
        self.config.keyspace = keyspace.into();
        self
    }

    /// Set the collection
    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.config.collection = collection.into();
        self
    }

    /// Set the HTTP request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Build the configuration
    pub fn build(self) -> CatalogConfig {
        self.config
    }
}

/// Complete application settings
#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// Embedding client configuration
    pub embedding: EmbeddingConfig,

    /// Catalog configuration
    pub catalog: CatalogConfig,
}

impl Settings {
    /// Load settings from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary variable lookup
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let embedding = EmbeddingConfig {
            api_key: get(OPENAI_API_KEY),
            base_url: get(OPENAI_BASE_URL).unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            ..EmbeddingConfig::default()
        };

        let catalog = CatalogConfig {
            endpoint: get(ASTRA_DB_API_ENDPOINT),
            token: get(ASTRA_DB_APPLICATION_TOKEN),
            keyspace: get(ASTRA_DB_KEYSPACE).unwrap_or_else(|| DEFAULT_KEYSPACE.to_string()),
            collection: get(CINESCOPE_COLLECTION).unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            ..CatalogConfig::default()
        };

        Self { embedding, catalog }
    }
}
