//! Search-engine results page (SERP) client and enrichment step.
//!
//! [`SerpClient`] POSTs `{"q": query}` to a Serper-compatible endpoint and
//! returns the raw response body. The API key is injected through
//! [`SerpConfig`] when the client is built; nothing is read from the
//! environment at call time.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::env;
use std::time::Duration;

use crate::step::{EnrichmentStep, ExternalCall, Labeled};
use crate::row::Row;
use crate::{Error, Result};

/// Default search endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://google.serper.dev/search";
/// Default request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
/// Environment variable holding the API key.
pub const API_KEY_VAR: &str = "SERPAPI_API_KEY";
/// Environment variable overriding the endpoint.
pub const ENDPOINT_VAR: &str = "SERP_ENDPOINT";
/// Environment variable overriding the timeout.
pub const TIMEOUT_VAR: &str = "SERP_TIMEOUT_MS";

// .env is loaded at most once per process.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenvy::dotenv();
});

/// Connection settings for [`SerpClient`].
#[derive(Clone, Serialize, Deserialize)]
pub struct SerpConfig {
    /// Search endpoint URL.
    pub endpoint: String,
    /// Value sent in the `X-API-KEY` header.
    pub api_key: String,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl std::fmt::Debug for SerpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerpConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

impl SerpConfig {
    /// Settings for the default endpoint with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: api_key.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    /// Override the endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Override the request timeout.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Load settings from the process environment, reading `.env` first.
    ///
    /// `SERPAPI_API_KEY` is required; `SERP_ENDPOINT` and `SERP_TIMEOUT_MS`
    /// are optional.
    pub fn from_env() -> Result<Self> {
        Lazy::force(&DOTENV_LOADED);
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load settings through an arbitrary key/value lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup(API_KEY_VAR)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| Error::Config(format!("{API_KEY_VAR} is not set")))?;

        let mut config = Self::new(api_key);
        if let Some(endpoint) = lookup(ENDPOINT_VAR) {
            config.endpoint = endpoint;
        }
        if let Some(raw) = lookup(TIMEOUT_VAR) {
            config.timeout_ms = raw
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("{TIMEOUT_VAR} must be an integer, got '{raw}'")))?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Check that the settings are usable.
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(Error::Config("SERP endpoint must not be empty".to_string()));
        }
        if self.timeout_ms == 0 {
            return Err(Error::Config("SERP timeout_ms must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// HTTP client for the search endpoint.
#[derive(Debug, Clone)]
pub struct SerpClient {
    client: Client,
    config: SerpConfig,
}

impl SerpClient {
    /// Build a client whose requests time out after `config.timeout_ms`.
    pub fn new(config: SerpConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Build a client around a preconfigured `reqwest::Client`.
    ///
    /// The caller's client settings win; `config.timeout_ms` is not applied.
    pub fn with_http_client(config: SerpConfig, client: Client) -> Result<Self> {
        config.validate()?;
        Ok(Self { client, config })
    }

    /// The settings this client was built with.
    pub fn config(&self) -> &SerpConfig {
        &self.config
    }

    /// Run one search and return the response body text.
    pub async fn search(&self, query: &str) -> Result<String> {
        #[derive(Serialize)]
        struct SearchRequest<'a> {
            q: &'a str,
        }

        tracing::debug!(endpoint = %self.config.endpoint, query, "sending search request");

        let response = self
            .client
            .post(self.config.endpoint.as_str())
            .header("X-API-KEY", self.config.api_key.as_str())
            .json(&SearchRequest { q: query })
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(map_transport_error)?;

        if !status.is_success() {
            return Err(Error::Http(format!("status={status}, body={body}")));
        }
        Ok(body)
    }
}

fn map_transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(format!("search request timed out: {e}"))
    } else {
        Error::Http(format!("search request failed: {e}"))
    }
}

#[async_trait]
impl ExternalCall for SerpClient {
    async fn call(&self, input: String) -> Result<Value> {
        self.search(&input).await.map(Value::String)
    }

    fn label(&self) -> &str {
        "serp_search"
    }
}

/// An enrichment step backed by [`SerpClient`].
pub type SerpEnrichmentStep<D> = EnrichmentStep<SerpClient, D>;

/// Build a search enrichment step named `"serp"`.
///
/// Use [`EnrichmentStep::new`] directly for a different output field name.
pub fn serp_step<D>(derive_query: Labeled<D>, client: SerpClient) -> SerpEnrichmentStep<D>
where
    D: Fn(&Row) -> Result<String> + Send + Sync,
{
    EnrichmentStep::new("serp", derive_query, client)
}
