//! The two halves of the bidirectional compiler: mutations compile to
//! SPARQL Update algebra, queries compile to SPARQL SELECT algebra.

pub mod mutation;
pub mod query;
