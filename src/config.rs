//! Client configuration.

use crate::context::IriExpansion;
use crate::logging::{DefaultLogger, Logger};
use crate::Error;
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;

fn default_update_endpoint_url() -> Option<String> {
    None
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_max_results() -> usize {
    1000
}

fn default_true() -> bool {
    true
}

fn default_cache_max_entries() -> usize {
    1000
}

fn default_cache_ttl_ms() -> u64 {
    300_000
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_false() -> bool {
    false
}

fn default_iri_expansion_mode() -> IriExpansion {
    IriExpansion::Concatenate
}

/// Configuration for a [`Client`](crate::client::Client).
///
/// Every field here is enumerated by the external interface; there are no
/// ambient environment reads inside the core. `Client::new` takes a
/// `ClientConfig` built directly by the caller, or via
/// [`ClientConfig::from_env`] as a convenience wrapper that is never called
/// internally.
///
/// # Examples
///
/// ```rust
/// use sparqlgrapher::config::ClientConfig;
/// use serde_json::json;
///
/// let config = ClientConfig::new(
///     json!({"@base": "http://example.org/"}),
///     "http://localhost:3030/ds/query".to_string(),
/// );
/// assert_eq!(config.timeout_ms(), 30_000);
/// ```
#[derive(Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// The JSON-LD context document, already parsed to `serde_json::Value`.
    context: serde_json::Value,

    /// URL of the SPARQL endpoint used for `query` (SELECT/CONSTRUCT).
    query_endpoint_url: String,

    /// URL of the SPARQL endpoint used for `update`. Defaults to
    /// `query_endpoint_url` when absent.
    #[serde(default = "default_update_endpoint_url")]
    update_endpoint_url: Option<String>,

    /// Per-call timeout, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    timeout_ms: u64,

    /// Maximum number of result bindings returned from a query.
    #[serde(default = "default_max_results")]
    max_results: usize,

    /// Whether caller-supplied SPARQL queries are run through the coarse
    /// forbidden-verb/shape validator before being sent to the endpoint.
    #[serde(default = "default_true")]
    validate_query: bool,

    /// Whether the result cache is consulted/populated at all.
    #[serde(default = "default_true")]
    cache_enabled: bool,

    /// Capacity of the result cache.
    #[serde(default = "default_cache_max_entries")]
    cache_max_entries: usize,

    /// Per-entry TTL of the result cache, in milliseconds.
    #[serde(default = "default_cache_ttl_ms")]
    cache_ttl_ms: u64,

    /// Number of retry attempts for transient endpoint errors (timeouts,
    /// 5xx responses).
    #[serde(default = "default_retry_attempts")]
    retry_attempts: u32,

    /// Delay between retry attempts, in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    retry_delay_ms: u64,

    /// Enables verbose debug logging from the compiler.
    #[serde(default = "default_false")]
    debug: bool,

    /// Selects how `expand_iri` resolves values that are not already
    /// absolute IRIs. Defaults to `Concatenate`, preserving the documented
    /// base+"/"+value behavior.
    #[serde(default = "default_iri_expansion_mode")]
    iri_expansion_mode: IriExpansion,

    /// Logging sink used by compilation. Not (de)serialized; a fresh
    /// config built from JSON/YAML always gets the default logger.
    #[serde(skip, default = "default_logger")]
    logger: Arc<dyn Logger>,
}

fn default_logger() -> Arc<dyn Logger> {
    Arc::new(DefaultLogger)
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("query_endpoint_url", &self.query_endpoint_url)
            .field("update_endpoint_url", &self.update_endpoint_url)
            .field("timeout_ms", &self.timeout_ms)
            .field("max_results", &self.max_results)
            .field("validate_query", &self.validate_query)
            .field("cache_enabled", &self.cache_enabled)
            .field("cache_max_entries", &self.cache_max_entries)
            .field("cache_ttl_ms", &self.cache_ttl_ms)
            .field("retry_attempts", &self.retry_attempts)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .field("debug", &self.debug)
            .field("iri_expansion_mode", &self.iri_expansion_mode)
            .finish()
    }
}

impl ClientConfig {
    /// Creates a new [`ClientConfig`] with every optional field defaulted,
    /// mirroring the defaults enumerated in the external interface.
    pub fn new(context: serde_json::Value, query_endpoint_url: String) -> ClientConfig {
        ClientConfig {
            context,
            query_endpoint_url,
            update_endpoint_url: default_update_endpoint_url(),
            timeout_ms: default_timeout_ms(),
            max_results: default_max_results(),
            validate_query: default_true(),
            cache_enabled: default_true(),
            cache_max_entries: default_cache_max_entries(),
            cache_ttl_ms: default_cache_ttl_ms(),
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            debug: default_false(),
            iri_expansion_mode: default_iri_expansion_mode(),
            logger: default_logger(),
        }
    }

    /// Convenience constructor reading `SG_CONTEXT` (a path to a JSON-LD
    /// context file), `SG_QUERY_ENDPOINT`, and optionally
    /// `SG_UPDATE_ENDPOINT` from the process environment. Never called
    /// internally; provided the same way `CypherEndpoint::from_env` is —
    /// as an opt-in convenience for callers that want one.
    pub fn from_env() -> Result<ClientConfig, Error> {
        let context_path =
            env::var("SG_CONTEXT").map_err(|_| Error::ValidationFailed {
                message: "SG_CONTEXT environment variable not set".to_string(),
            })?;
        let context_text = std::fs::read_to_string(&context_path).map_err(|e| {
            Error::ValidationFailed {
                message: format!("Failed to read SG_CONTEXT file '{}': {}", context_path, e),
            }
        })?;
        let context: serde_json::Value = serde_json::from_str(&context_text)?;

        let query_endpoint_url =
            env::var("SG_QUERY_ENDPOINT").map_err(|_| Error::ValidationFailed {
                message: "SG_QUERY_ENDPOINT environment variable not set".to_string(),
            })?;

        let mut config = ClientConfig::new(context, query_endpoint_url);
        if let Ok(update_url) = env::var("SG_UPDATE_ENDPOINT") {
            config.update_endpoint_url = Some(update_url);
        }
        Ok(config)
    }

    pub fn context(&self) -> &serde_json::Value {
        &self.context
    }

    pub fn query_endpoint_url(&self) -> &str {
        &self.query_endpoint_url
    }

    /// The update endpoint URL, falling back to `query_endpoint_url` when
    /// none was configured.
    pub fn update_endpoint_url(&self) -> &str {
        self.update_endpoint_url
            .as_deref()
            .unwrap_or(&self.query_endpoint_url)
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    pub fn validate_query(&self) -> bool {
        self.validate_query
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache_enabled
    }

    pub fn cache_max_entries(&self) -> usize {
        self.cache_max_entries
    }

    pub fn cache_ttl_ms(&self) -> u64 {
        self.cache_ttl_ms
    }

    pub fn retry_attempts(&self) -> u32 {
        self.retry_attempts
    }

    pub fn retry_delay_ms(&self) -> u64 {
        self.retry_delay_ms
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn iri_expansion_mode(&self) -> IriExpansion {
        self.iri_expansion_mode
    }

    pub fn logger(&self) -> Arc<dyn Logger> {
        self.logger.clone()
    }

    /// Replaces the logging sink. Tests use this to inject a
    /// [`CapturingLogger`](crate::logging::CapturingLogger).
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> ClientConfig {
        self.logger = logger;
        self
    }

    pub fn with_iri_expansion_mode(mut self, mode: IriExpansion) -> ClientConfig {
        self.iri_expansion_mode = mode;
        self
    }
}
