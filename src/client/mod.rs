//! The `Client` facade ties the context resolver, the mutation and query
//! compilers, the serializer, the endpoint driver, the result cache, and
//! the result shaper into one async entry point. This is the in-process
//! object an HTTP GraphQL server frame would call; the frame itself is
//! out of scope here.

use crate::cache::ResultCache;
use crate::compiler::mutation;
use crate::compiler::query::compile_query;
use crate::config::ClientConfig;
use crate::context::Context;
use crate::endpoint::{RequestOptions, SparqlEndpoint, SparqlHttpEndpoint, SparqlJsonResult};
use crate::logging::{Fields, Logger};
use crate::serialize::{serialize_select, serialize_update};
use crate::shape::shape_results;
use crate::validate::validate_query_text;
use crate::{ast, Error};
use serde_json::{json, Value as Json};
use std::convert::TryInto;
use std::sync::Arc;
use std::time::Duration;

/// The coarse query-text safety net is applied to the SPARQL this crate
/// itself generates, as defense in depth; it bounds the generated text
/// rather than a caller-supplied one, so the bound here is generous.
const GENERATED_QUERY_MAX_LEN: usize = 1_000_000;

/// Per-call overrides for a mutation, beyond what the GraphQL surface
/// exposes. Defaults to leaving dangling inverse triples after a delete
/// untouched (`deep_delete: false`); set it to also remove inbound
/// triples pointing at the deleted subject.
#[derive(Clone, Copy, Debug, Default)]
pub struct MutationOptions {
    pub deep_delete: bool,
}

/// Ties the compiler pipeline to a live (or injected, for tests) SPARQL
/// endpoint.
///
/// # Examples
///
/// ```rust,no_run
/// use sparqlgrapher::{Client, ClientConfig};
/// use serde_json::json;
///
/// # async fn run() -> Result<(), sparqlgrapher::Error> {
/// let config = ClientConfig::new(
///     json!({"@base": "http://example.org/", "@vocab": "http://example.org/"}),
///     "http://localhost:3030/ds/query".to_string(),
/// );
/// let client = Client::new(config)?;
/// let response = client.mutate(r#"mutation { createUser(input: {name: "Alice"}) { id } }"#).await;
/// assert!(response["data"]["mutate"]["success"].as_bool().is_some());
/// # Ok(())
/// # }
/// ```
pub struct Client {
    config: ClientConfig,
    context: Context,
    endpoint: Arc<dyn SparqlEndpoint>,
    cache: ResultCache,
}

impl Client {
    /// Builds a `Client` talking to the HTTP endpoints named in `config`.
    ///
    /// # Errors
    ///
    /// [`Error::ContextItemNotFound`] if `config.context()` is not a
    /// well-formed JSON-LD context object.
    pub fn new(config: ClientConfig) -> Result<Client, Error> {
        let endpoint = SparqlHttpEndpoint::new(
            config.query_endpoint_url().to_string(),
            config.update_endpoint_url().to_string(),
            config.timeout_ms(),
            config.max_results(),
        );
        Client::with_endpoint(config, Arc::new(endpoint))
    }

    /// Builds a `Client` against a caller-supplied [`SparqlEndpoint`],
    /// bypassing HTTP. Tests use this to inject a stub driver.
    pub fn with_endpoint(
        config: ClientConfig,
        endpoint: Arc<dyn SparqlEndpoint>,
    ) -> Result<Client, Error> {
        let context = Context::from_json(config.context())?;
        let cache = ResultCache::new(
            config.cache_max_entries(),
            Duration::from_millis(config.cache_ttl_ms()),
        );
        Ok(Client {
            config,
            context,
            endpoint,
            cache,
        })
    }

    /// Compiles and runs a read-only GraphQL query, returning `{data,
    /// errors?}`. `variables` is accepted for interface compatibility; a
    /// non-empty value fails with `UNSUPPORTED_FEATURE` since variable
    /// substitution is not implemented by the query compiler.
    #[tracing::instrument(skip(self, text, variables), fields(op = "query"))]
    pub async fn query(&self, text: &str, variables: Option<Json>) -> Json {
        match self.query_inner(text, variables).await {
            Ok(data) => json!({ "data": data }),
            Err(e) => {
                self.config
                    .logger()
                    .error(&format!("query failed: {}", e), &Fields::new());
                let wrapped = Error::QueryFailed {
                    source: Box::new(e),
                };
                json!({ "data": Json::Null, "errors": [error_envelope(&wrapped)] })
            }
        }
    }

    async fn query_inner(&self, text: &str, variables: Option<Json>) -> Result<Json, Error> {
        if let Some(vars) = &variables {
            let is_empty = match vars {
                Json::Null => true,
                Json::Object(m) => m.is_empty(),
                _ => false,
            };
            if !is_empty {
                return Err(Error::UnsupportedFeature {
                    message: "GraphQL variables in queries are not supported".to_string(),
                });
            }
        }

        self.config
            .logger()
            .debug("compiling query", &Fields::new());
        let compiled = compile_query(text, &self.context)?;
        let sparql = serialize_select(&compiled.project);
        if self.config.validate_query() {
            validate_query_text(&sparql, GENERATED_QUERY_MAX_LEN)?;
        }

        let result = if self.config.cache_enabled() {
            match self.cache.get(&sparql) {
                Some(cached) => cached,
                None => {
                    let fresh = self.run_query_with_retry(&sparql).await?;
                    self.cache.put(sparql.clone(), fresh.clone());
                    fresh
                }
            }
        } else {
            self.run_query_with_retry(&sparql).await?
        };

        let shaped = shape_results(&result, &compiled);
        let shaped_json: Vec<Json> = shaped
            .into_iter()
            .map(|v| v.try_into())
            .collect::<Result<Vec<Json>, Error>>()?;
        self.config
            .logger()
            .debug("query compiled and executed", &Fields::new());
        Ok(Json::Array(shaped_json))
    }

    async fn run_query_with_retry(&self, sparql: &str) -> Result<SparqlJsonResult, Error> {
        let options = RequestOptions {
            timeout_ms: Some(self.config.timeout_ms()),
            max_results: Some(self.config.max_results()),
        };
        let mut attempt = 0;
        loop {
            match self.endpoint.query(sparql, &options).await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_transient() && attempt < self.config.retry_attempts() => {
                    attempt += 1;
                    tokio::time::sleep(Duration::from_millis(self.config.retry_delay_ms())).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Compiles and runs a GraphQL mutation with the default behavior:
    /// `deep_delete: false`.
    pub async fn mutate(&self, text: &str) -> Json {
        self.mutate_with_options(text, MutationOptions::default())
            .await
    }

    /// As [`Client::mutate`], with [`MutationOptions`] controlling
    /// behavior beyond the GraphQL surface.
    #[tracing::instrument(skip(self, text), fields(op = "mutate"))]
    pub async fn mutate_with_options(&self, text: &str, options: MutationOptions) -> Json {
        match self.mutate_inner(text, options).await {
            Ok(()) => json!({ "data": { "mutate": { "success": true } } }),
            Err(e) => {
                self.config
                    .logger()
                    .error(&format!("mutation failed: {}", e), &Fields::new());
                let wrapped = Error::MutationFailed {
                    source: Box::new(e),
                };
                json!({
                    "data": { "mutate": { "success": false, "details": error_envelope(&wrapped) } },
                    "errors": [error_envelope(&wrapped)],
                })
            }
        }
    }

    async fn mutate_inner(&self, text: &str, options: MutationOptions) -> Result<(), Error> {
        self.config
            .logger()
            .debug("compiling mutation", &Fields::new());
        let parsed = ast::parse_mutation(text)?;
        let algebra = mutation::compile(
            &parsed,
            &self.context,
            self.config.iri_expansion_mode(),
            options.deep_delete,
        )?;
        let sparql = serialize_update(&algebra)?;

        let update_options = RequestOptions {
            timeout_ms: Some(self.config.timeout_ms()),
            max_results: None,
        };
        let mut attempt = 0;
        loop {
            match self.endpoint.update(&sparql, &update_options).await {
                Ok(_) => {
                    self.config
                        .logger()
                        .debug("mutation executed", &Fields::new());
                    return Ok(());
                }
                Err(e) if e.is_transient() && attempt < self.config.retry_attempts() => {
                    attempt += 1;
                    tokio::time::sleep(Duration::from_millis(self.config.retry_delay_ms())).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Builds the `{name, message, code, details?}` error envelope for an
/// error that has already reached the top of `query`/`mutate`.
fn error_envelope(e: &Error) -> Json {
    json!({
        "name": variant_name(e),
        "message": e.to_string(),
        "code": e.code(),
    })
}

fn variant_name(e: &Error) -> &'static str {
    match e {
        Error::ValidationFailed { .. } => "ValidationError",
        Error::ContextItemNotFound { .. } => "ContextError",
        Error::ConversionFailed { .. } => "ConversionError",
        Error::GraphqlParseFailed { .. } => "ConversionError",
        Error::UnsupportedFeature { .. } => "UnsupportedFeatureError",
        Error::UnsupportedOperation { .. } => "UnsupportedOperationError",
        Error::SerializationFailed { .. } => "ConversionError",
        Error::EndpointHttpStatus { .. } => "EndpointError",
        Error::InvalidResponseFormat { .. } => "EndpointError",
        Error::Timeout => "EndpointError",
        Error::EndpointTransport { .. } => "EndpointError",
        Error::EndpointUnknown { .. } => "EndpointError",
        Error::MutationFailed { .. } => "MutationError",
        Error::QueryFailed { .. } => "QueryError",
    }
}
