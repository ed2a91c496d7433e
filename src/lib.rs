//! sparqlgrapher is a bidirectional compiler between GraphQL and SPARQL:
//! it turns GraphQL queries and mutations into SPARQL 1.1 algebra against
//! a JSON-LD context, runs that algebra against any SPARQL 1.1 endpoint,
//! and reshapes the results back into a GraphQL-shaped tree.
//!
//! The crate is organized leaf-first, mirroring the compiler's data flow:
//!
//! - [`context`] — the JSON-LD context resolver: term → IRI lookup,
//!   relationship detection, IRI expansion.
//! - [`validate`] — the IRI and input validator, which every compilation
//!   step runs through before algebra is built.
//! - [`ast`] — the GraphQL AST walker: parses and classifies mutation
//!   operations.
//! - [`algebra`] — the SPARQL algebra types both compilers build.
//! - [`compiler`] — the mutation compiler and query compiler.
//! - [`serialize`] — the algebra-to-SPARQL serializer.
//! - [`endpoint`] — the SPARQL endpoint driver contract and its HTTP
//!   implementation.
//! - [`shape`] — the result shaper.
//! - [`cache`], [`config`], [`logging`] — the ambient stack: result
//!   caching, client configuration, and pluggable logging.
//! - [`client`] — the `Client` facade tying the above into one async
//!   entry point.

pub use client::Client;
pub use config::ClientConfig;
pub use error::Error;

pub mod algebra;
pub mod ast;
pub mod cache;
pub mod client;
pub mod compiler;
pub mod config;
pub mod context;
pub mod endpoint;
mod error;
pub mod logging;
pub mod serialize;
pub mod shape;
pub mod validate;
pub mod value;
