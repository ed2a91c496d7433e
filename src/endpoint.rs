//! SPARQL Endpoint Driver contract and its concrete HTTP implementation.
//!
//! The driver trait is the seam between compiled, serialized SPARQL text
//! and a live triple store: everything upstream of [`SparqlEndpoint`]
//! (context resolution, compilation, serialization) is store-agnostic.
//! [`SparqlHttpEndpoint`] is the one implementation this crate ships,
//! speaking the SPARQL 1.1 Protocol over HTTP.

use crate::Error;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Per-call overrides layered onto a driver's configured defaults. `None`
/// means "use the driver's default".
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
    pub timeout_ms: Option<u64>,
    pub max_results: Option<usize>,
}

fn effective_timeout_ms(default: u64, options: &RequestOptions) -> u64 {
    options.timeout_ms.unwrap_or(default)
}

fn effective_max_results(default: usize, options: &RequestOptions) -> usize {
    options.max_results.unwrap_or(default)
}

/// A materialized RDF term bound to a query variable, decoded from the
/// SPARQL 1.1 JSON Results Format.
#[derive(Clone, Debug, PartialEq)]
pub enum RdfTerm {
    NamedNode { iri: String },
    Literal {
        lexical: String,
        datatype: Option<String>,
        lang: Option<String>,
    },
    BlankNode { label: String },
}

/// One row of bindings: variable name to the term bound to it. A
/// variable absent from the map was unbound (optional-pattern miss) for
/// that row.
pub type Binding = HashMap<String, RdfTerm>;

/// A decoded SPARQL SELECT response.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SparqlJsonResult {
    pub variables: Vec<String>,
    pub bindings: Vec<Binding>,
}

/// The outcome of a SPARQL Update request. The endpoint either accepted
/// the update (`success: true`) or the driver never reached a 2xx
/// response, in which case `query`/`update` return `Err` instead.
#[derive(Clone, Debug)]
pub struct UpdateResult {
    pub success: bool,
    pub message: String,
}

#[derive(Deserialize)]
struct WireHead {
    vars: Vec<String>,
}

#[derive(Deserialize)]
struct WireResults {
    bindings: Vec<HashMap<String, WireTerm>>,
}

#[derive(Deserialize)]
struct WireResponse {
    head: WireHead,
    results: WireResults,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum WireTerm {
    Uri {
        value: String,
    },
    Literal {
        value: String,
        datatype: Option<String>,
        #[serde(rename = "xml:lang")]
        lang: Option<String>,
    },
    TypedLiteral {
        value: String,
        datatype: Option<String>,
    },
    Bnode {
        value: String,
    },
}

impl From<WireTerm> for RdfTerm {
    fn from(term: WireTerm) -> RdfTerm {
        match term {
            WireTerm::Uri { value } => RdfTerm::NamedNode { iri: value },
            WireTerm::Literal {
                value,
                datatype,
                lang,
            } => RdfTerm::Literal {
                lexical: value,
                datatype,
                lang,
            },
            WireTerm::TypedLiteral { value, datatype } => RdfTerm::Literal {
                lexical: value,
                datatype,
                lang: None,
            },
            WireTerm::Bnode { value } => RdfTerm::BlankNode { label: value },
        }
    }
}

fn parse_sparql_json_result(body: &str, max_results: usize) -> Result<SparqlJsonResult, Error> {
    let wire: WireResponse = serde_json::from_str(body)?;
    let mut bindings: Vec<Binding> = wire
        .results
        .bindings
        .into_iter()
        .map(|row| row.into_iter().map(|(k, v)| (k, v.into())).collect())
        .collect();
    if bindings.len() > max_results {
        bindings.truncate(max_results);
    }
    Ok(SparqlJsonResult {
        variables: wire.head.vars,
        bindings,
    })
}

/// The contract a SPARQL store driver implements: run a SELECT, run an
/// UPDATE. `sparql`/`update_text` are already-serialized, injection-safe
/// text produced by [`crate::serialize`] — the driver's only job is
/// transport and response-shape validation.
#[async_trait]
pub trait SparqlEndpoint: Send + Sync {
    async fn query(
        &self,
        sparql: &str,
        options: &RequestOptions,
    ) -> Result<SparqlJsonResult, Error>;

    async fn update(
        &self,
        update_text: &str,
        options: &RequestOptions,
    ) -> Result<UpdateResult, Error>;
}

fn env_string(name: &str) -> Result<String, Error> {
    std::env::var(name).map_err(|_| Error::EndpointUnknown {
        message: format!("Environment variable '{}' not found", name),
    })
}

/// The SPARQL 1.1 Protocol over HTTP: `query` POSTs with content-type
/// `application/sparql-query` and accepts `application/sparql-results+json`;
/// `update` POSTs with content-type `application/sparql-update`.
///
/// # Examples
///
/// ```rust,no_run
/// use sparqlgrapher::endpoint::SparqlHttpEndpoint;
///
/// let endpoint = SparqlHttpEndpoint::new(
///     "http://localhost:3030/ds/query".to_string(),
///     "http://localhost:3030/ds/update".to_string(),
///     30_000,
///     1_000,
/// );
/// ```
#[derive(Debug)]
pub struct SparqlHttpEndpoint {
    client: reqwest::Client,
    query_endpoint_url: String,
    update_endpoint_url: String,
    default_timeout_ms: u64,
    default_max_results: usize,
}

impl SparqlHttpEndpoint {
    pub fn new(
        query_endpoint_url: String,
        update_endpoint_url: String,
        default_timeout_ms: u64,
        default_max_results: usize,
    ) -> SparqlHttpEndpoint {
        SparqlHttpEndpoint {
            client: reqwest::Client::new(),
            query_endpoint_url,
            update_endpoint_url,
            default_timeout_ms,
            default_max_results,
        }
    }

    /// Reads `SG_QUERY_ENDPOINT` and, optionally, `SG_UPDATE_ENDPOINT`
    /// (falling back to the query endpoint when absent — most triple
    /// stores serve both roles from the same URL).
    ///
    /// # Errors
    ///
    /// [`Error::EndpointUnknown`] if `SG_QUERY_ENDPOINT` is not set.
    pub fn from_env() -> Result<SparqlHttpEndpoint, Error> {
        let query_endpoint_url = env_string("SG_QUERY_ENDPOINT")?;
        let update_endpoint_url =
            env_string("SG_UPDATE_ENDPOINT").unwrap_or_else(|_| query_endpoint_url.clone());
        Ok(SparqlHttpEndpoint::new(
            query_endpoint_url,
            update_endpoint_url,
            30_000,
            1_000,
        ))
    }
}

#[async_trait]
impl SparqlEndpoint for SparqlHttpEndpoint {
    #[tracing::instrument(skip(self, sparql, options), fields(endpoint = %self.query_endpoint_url))]
    async fn query(
        &self,
        sparql: &str,
        options: &RequestOptions,
    ) -> Result<SparqlJsonResult, Error> {
        let timeout_ms = effective_timeout_ms(self.default_timeout_ms, options);
        let max_results = effective_max_results(self.default_max_results, options);

        let response = self
            .client
            .post(&self.query_endpoint_url)
            .header(reqwest::header::CONTENT_TYPE, "application/sparql-query")
            .header(reqwest::header::ACCEPT, "application/sparql-results+json")
            .timeout(Duration::from_millis(timeout_ms))
            .body(sparql.to_string())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::EndpointHttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        parse_sparql_json_result(&body, max_results)
    }

    #[tracing::instrument(skip(self, update_text, options), fields(endpoint = %self.update_endpoint_url))]
    async fn update(
        &self,
        update_text: &str,
        options: &RequestOptions,
    ) -> Result<UpdateResult, Error> {
        let timeout_ms = effective_timeout_ms(self.default_timeout_ms, options);

        let response = self
            .client
            .post(&self.update_endpoint_url)
            .header(reqwest::header::CONTENT_TYPE, "application/sparql-update")
            .timeout(Duration::from_millis(timeout_ms))
            .body(update_text.to_string())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::EndpointHttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        Ok(UpdateResult {
            success: true,
            message: format!("SPARQL update accepted with status {}", status.as_u16()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{effective_max_results, effective_timeout_ms, parse_sparql_json_result, RdfTerm, RequestOptions};

    /// With no per-call override, the same configured default timeout
    /// is used on every call — no hidden jitter or backoff.
    #[test]
    fn timeout_defaults_are_deterministic() {
        let options = RequestOptions::default();
        assert_eq!(effective_timeout_ms(5_000, &options), 5_000);
        assert_eq!(effective_timeout_ms(5_000, &options), 5_000);
    }

    #[test]
    fn per_call_timeout_override_wins() {
        let options = RequestOptions {
            timeout_ms: Some(500),
            max_results: None,
        };
        assert_eq!(effective_timeout_ms(5_000, &options), 500);
    }

    #[test]
    fn max_results_truncates_bindings() {
        let body = serde_json::json!({
            "head": {"vars": ["id"]},
            "results": {"bindings": [
                {"id": {"type": "uri", "value": "http://example.org/1"}},
                {"id": {"type": "uri", "value": "http://example.org/2"}},
                {"id": {"type": "uri", "value": "http://example.org/3"}}
            ]}
        })
        .to_string();
        let result = parse_sparql_json_result(&body, 2).unwrap();
        assert_eq!(result.bindings.len(), 2);
        assert_eq!(effective_max_results(1000, &RequestOptions::default()), 1000);
    }

    #[test]
    fn decodes_uri_literal_and_bnode_terms() {
        let body = serde_json::json!({
            "head": {"vars": ["s", "age", "b"]},
            "results": {"bindings": [{
                "s": {"type": "uri", "value": "http://example.org/user1"},
                "age": {"type": "literal", "value": "30", "datatype": "http://www.w3.org/2001/XMLSchema#integer"},
                "b": {"type": "bnode", "value": "b0"}
            }]}
        })
        .to_string();
        let result = parse_sparql_json_result(&body, 1000).unwrap();
        let row = &result.bindings[0];
        assert_eq!(
            row["s"],
            RdfTerm::NamedNode {
                iri: "http://example.org/user1".to_string()
            }
        );
        assert_eq!(
            row["age"],
            RdfTerm::Literal {
                lexical: "30".to_string(),
                datatype: Some("http://www.w3.org/2001/XMLSchema#integer".to_string()),
                lang: None
            }
        );
        assert_eq!(
            row["b"],
            RdfTerm::BlankNode {
                label: "b0".to_string()
            }
        );
    }

    #[test]
    fn malformed_response_is_an_invalid_response_format_error() {
        let err = parse_sparql_json_result("{\"not\": \"sparql json\"}", 1000).unwrap_err();
        assert_eq!(err.code(), "INVALID_RESPONSE_FORMAT");
    }
}
