//! Shared fixtures for the black-box integration tests: a fixed JSON-LD
//! context and a capturing stub [`SparqlEndpoint`] so tests can assert on
//! the SPARQL text a compiled operation produces without a live triple
//! store.

use async_trait::async_trait;
use serde_json::json;
use sparqlgrapher::endpoint::{
    Binding, RdfTerm, RequestOptions, SparqlEndpoint, SparqlJsonResult, UpdateResult,
};
use sparqlgrapher::Error;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[allow(dead_code)]
pub fn sample_context() -> serde_json::Value {
    json!({
        "@base": "http://example.org/",
        "@vocab": "http://example.org/",
        "ex": "http://example.org/",
        "User": "ex:User",
        "Product": "ex:Product",
        "Review": "ex:Review",
        "name": "http://xmlns.com/foaf/0.1/name",
        "age": {"@id": "ex:age", "@type": "http://www.w3.org/2001/XMLSchema#integer"},
        "product": {"@id": "http://schema.org/itemReviewed", "@type": "@id"},
        "reviews": {"@id": "http://schema.org/review", "@type": "@id", "@container": "@set"},
        "rating": "ex:rating",
        "reviewer": "ex:reviewer"
    })
}

/// A [`SparqlEndpoint`] that records every SPARQL text it was asked to
/// run and returns a caller-supplied canned result, instead of talking
/// to a live store.
#[derive(Default)]
#[allow(dead_code)]
pub struct CapturingEndpoint {
    pub last_query: Mutex<Option<String>>,
    pub last_update: Mutex<Option<String>>,
    pub query_result: Mutex<Option<SparqlJsonResult>>,
    pub query_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
}

#[allow(dead_code)]
impl CapturingEndpoint {
    pub fn with_rows(rows: Vec<Binding>, variables: Vec<String>) -> CapturingEndpoint {
        CapturingEndpoint {
            last_query: Mutex::new(None),
            last_update: Mutex::new(None),
            query_result: Mutex::new(Some(SparqlJsonResult {
                variables,
                bindings: rows,
            })),
            query_calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
        }
    }

    pub fn query_call_count(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    pub fn last_query_text(&self) -> String {
        self.last_query.lock().unwrap().clone().unwrap_or_default()
    }

    pub fn last_update_text(&self) -> String {
        self.last_update
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_default()
    }
}

#[async_trait]
impl SparqlEndpoint for CapturingEndpoint {
    async fn query(
        &self,
        sparql: &str,
        _options: &RequestOptions,
    ) -> Result<SparqlJsonResult, Error> {
        *self.last_query.lock().unwrap() = Some(sparql.to_string());
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .query_result
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_default())
    }

    async fn update(
        &self,
        update_text: &str,
        _options: &RequestOptions,
    ) -> Result<UpdateResult, Error> {
        *self.last_update.lock().unwrap() = Some(update_text.to_string());
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        Ok(UpdateResult {
            success: true,
            message: "accepted".to_string(),
        })
    }
}

#[allow(dead_code)]
pub fn binding(pairs: &[(&str, RdfTerm)]) -> HashMap<String, RdfTerm> {
    pairs.iter().cloned().map(|(k, v)| (k.to_string(), v)).collect()
}

#[allow(dead_code)]
pub fn uri(s: &str) -> RdfTerm {
    RdfTerm::NamedNode { iri: s.to_string() }
}

#[allow(dead_code)]
pub fn literal(s: &str) -> RdfTerm {
    RdfTerm::Literal {
        lexical: s.to_string(),
        datatype: None,
        lang: None,
    }
}
