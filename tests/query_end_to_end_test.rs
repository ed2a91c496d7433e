//! Black-box query scenarios: compiling a GraphQL query through the
//! [`Client`] facade, running it against a capturing stub endpoint, and
//! checking the shaped result and the result cache.

mod setup;

use serde_json::json;
use setup::{binding, literal, sample_context, uri, CapturingEndpoint};
use sparqlgrapher::config::ClientConfig;
use sparqlgrapher::Client;
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn test_client(endpoint: Arc<CapturingEndpoint>) -> Client {
    let config = ClientConfig::new(
        sample_context(),
        "http://localhost:3030/ds/query".to_string(),
    );
    Client::with_endpoint(config, endpoint).unwrap()
}

/// A singular field surfaces as a scalar; a to-many relationship
/// surfaces as a list, even with a single bound row.
#[tokio::test]
async fn shapes_scalars_and_singular_vs_list_relationships() {
    let endpoint = Arc::new(CapturingEndpoint::with_rows(
        vec![binding(&[
            ("id", uri("http://example.org/user1")),
            ("name", literal("Alice")),
            ("reviews", uri("http://example.org/review1")),
            ("reviews_rating", literal("5")),
        ])],
        vec![
            "id".to_string(),
            "name".to_string(),
            "reviews".to_string(),
            "reviews_rating".to_string(),
        ],
    ));
    let client = test_client(endpoint.clone());

    let response = client
        .query("query { User { id name reviews { id rating } } }", None)
        .await;

    assert_eq!(response["data"][0]["name"], json!("Alice"));
    assert!(response["data"][0]["reviews"].is_array());
    assert_eq!(response["data"][0]["reviews"][0]["rating"], json!(5));

    let sent = endpoint.last_query_text();
    assert!(sent.starts_with("SELECT"));
    assert!(sent.contains("WHERE {"));
}

/// The `input` filter argument adds a bound triple pattern to the
/// generated SELECT rather than a client-side post-filter.
#[tokio::test]
async fn query_input_argument_becomes_a_where_pattern() {
    let endpoint = Arc::new(CapturingEndpoint::default());
    let client = test_client(endpoint.clone());

    client
        .query(r#"query { User(input: {name: "Alice"}) { id } }"#, None)
        .await;

    let sent = endpoint.last_query_text();
    assert!(sent.contains("<http://xmlns.com/foaf/0.1/name> \"Alice\""));
}

/// GraphQL variables are unsupported for queries, same as mutations.
#[tokio::test]
async fn query_with_variables_is_unsupported() {
    let endpoint = Arc::new(CapturingEndpoint::default());
    let client = test_client(endpoint.clone());

    let response = client
        .query("query { User { id } }", Some(json!({"x": 1})))
        .await;

    assert_eq!(response["errors"][0]["code"], json!("UNSUPPORTED_FEATURE"));
    assert!(endpoint.last_query.lock().unwrap().is_none());
}

/// A second identical query within the TTL is served from cache and
/// does not re-hit the endpoint.
#[tokio::test]
async fn repeated_identical_query_is_served_from_cache() {
    let endpoint = Arc::new(CapturingEndpoint::with_rows(
        vec![binding(&[
            ("id", uri("http://example.org/user1")),
            ("name", literal("Alice")),
        ])],
        vec!["id".to_string(), "name".to_string()],
    ));
    let client = test_client(endpoint.clone());

    client.query("query { User { id name } }", None).await;
    client.query("query { User { id name } }", None).await;
    let response = client.query("query { User { id name } }", None).await;

    assert_eq!(response["data"][0]["name"], json!("Alice"));
    assert_eq!(endpoint.query_call_count(), 1);
}
