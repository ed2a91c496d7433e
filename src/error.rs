//! Provides the [`Error`] type for sparqlgrapher.
//!
//! # Examples
//!
//! ```rust
//! use sparqlgrapher::Error;
//!
//! let e = Error::ValidationFailed { message: "empty IRI".to_string() };
//! assert_eq!(e.code(), "VALIDATION_ERROR");
//! ```

use std::fmt::{Display, Formatter};

/// Error type for sparqlgrapher.
///
/// Each variant maps to one of the wire error codes described in the
/// crate's external interface (`CONVERSION_ERROR`, `VALIDATION_ERROR`, ...)
/// via [`Error::code`].
#[derive(Debug)]
pub enum Error {
    /// An IRI or mutation input value failed the validator. The `message`
    /// field carries a human-readable reason.
    ValidationFailed { message: String },

    /// A JSON-LD context lookup failed: a term has no mapping, or no
    /// `@vocab` fallback exists for a type name. The `name` field is the
    /// term or type name that could not be resolved.
    ContextItemNotFound { name: String },

    /// A GraphQL value kind has no corresponding SPARQL literal form, a
    /// mutation root field name does not start with `create`/`update`/
    /// `delete`, or an update attempted to modify `id`.
    ConversionFailed { message: String },

    /// The GraphQL operation text could not be parsed.
    GraphqlParseFailed { message: String },

    /// A mutation referenced a GraphQL variable. Variable substitution in
    /// mutations is unsupported; see the design notes on mutation compiler
    /// limitations.
    UnsupportedFeature { message: String },

    /// A query or mutation operation kind this compiler does not implement
    /// (e.g. `subscription`). The `operation` field names the offending
    /// operation kind.
    UnsupportedOperation { operation: String },

    /// The compiled algebra tree could not be serialized because an
    /// internal invariant was violated. This most likely indicates an
    /// internal bug.
    SerializationFailed { message: String },

    /// The SPARQL endpoint returned a non-2xx response. Carries the status
    /// code and a body excerpt.
    EndpointHttpStatus { status: u16, body: String },

    /// The SPARQL endpoint's response did not match the SPARQL 1.1 JSON
    /// Results Format.
    InvalidResponseFormat { message: String },

    /// A timeout elapsed before the endpoint responded.
    Timeout,

    /// A transport-level error occurred talking to the endpoint. Inspect
    /// the wrapped [`reqwest::Error`] for additional detail.
    EndpointTransport { source: reqwest::Error },

    /// A catch-all for an endpoint failure that does not fit the other
    /// variants.
    EndpointUnknown { message: String },

    /// A mutation failed; wraps the underlying cause so the error envelope
    /// returned to callers can carry both a `MUTATION_ERROR` code and the
    /// original `details`.
    MutationFailed { source: Box<Error> },

    /// As [`Error::MutationFailed`], but for the query path.
    QueryFailed { source: Box<Error> },
}

impl Error {
    /// Returns the wire error code for this variant.
    pub fn code(&self) -> &'static str {
        match self {
            Error::ValidationFailed { .. } => "VALIDATION_ERROR",
            Error::ContextItemNotFound { .. } => "CONTEXT_ERROR",
            Error::ConversionFailed { .. } => "CONVERSION_ERROR",
            Error::GraphqlParseFailed { .. } => "CONVERSION_ERROR",
            Error::UnsupportedFeature { .. } => "UNSUPPORTED_FEATURE",
            Error::UnsupportedOperation { .. } => "UNSUPPORTED_OPERATION",
            Error::SerializationFailed { .. } => "CONVERSION_ERROR",
            Error::EndpointHttpStatus { status, .. } => http_status_code(*status),
            Error::InvalidResponseFormat { .. } => "INVALID_RESPONSE_FORMAT",
            Error::Timeout => "TIMEOUT",
            Error::EndpointTransport { .. } => "ENDPOINT_ERROR",
            Error::EndpointUnknown { .. } => "ENDPOINT_ERROR",
            Error::MutationFailed { .. } => "MUTATION_ERROR",
            Error::QueryFailed { .. } => "QUERY_ERROR",
        }
    }

    /// `true` for endpoint failure classes a caller may retry (`Timeout`,
    /// and 5xx HTTP responses). Validation, context, and conversion errors
    /// are never transient.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Timeout => true,
            Error::EndpointHttpStatus { status, .. } => (500..600).contains(status),
            _ => false,
        }
    }
}

fn http_status_code(status: u16) -> &'static str {
    match status {
        400 => "HTTP_400",
        401 => "HTTP_401",
        403 => "HTTP_403",
        404 => "HTTP_404",
        409 => "HTTP_409",
        429 => "HTTP_429",
        500 => "HTTP_500",
        502 => "HTTP_502",
        503 => "HTTP_503",
        504 => "HTTP_504",
        _ => "ENDPOINT_ERROR",
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Error::ValidationFailed { message } => write!(f, "{}", message),
            Error::ContextItemNotFound { name } => {
                write!(f, "No mapping found in the JSON-LD context for '{}'", name)
            }
            Error::ConversionFailed { message } => write!(f, "{}", message),
            Error::GraphqlParseFailed { message } => {
                write!(f, "Failed to parse GraphQL operation. Source error: {}", message)
            }
            Error::UnsupportedFeature { message } => write!(f, "{}", message),
            Error::UnsupportedOperation { operation } => {
                write!(f, "Unsupported GraphQL operation: {}", operation)
            }
            Error::SerializationFailed { message } => write!(f, "{}", message),
            Error::EndpointHttpStatus { status, body } => write!(
                f,
                "SPARQL endpoint returned HTTP {}: {}",
                status,
                truncate(body, 256)
            ),
            Error::InvalidResponseFormat { message } => write!(
                f,
                "SPARQL endpoint response did not match the expected shape: {}",
                message
            ),
            Error::Timeout => {
                write!(f, "SPARQL endpoint did not respond within the configured timeout")
            }
            Error::EndpointTransport { source } => {
                write!(f, "Transport error talking to SPARQL endpoint. Source error: {}", source)
            }
            Error::EndpointUnknown { message } => write!(f, "{}", message),
            Error::MutationFailed { source } => write!(f, "Mutation failed: {}", source),
            Error::QueryFailed { source } => write!(f, "Query failed: {}", source),
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}...", &s[..max])
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::EndpointTransport { source } => Some(source),
            Error::MutationFailed { source } => Some(source.as_ref()),
            Error::QueryFailed { source } => Some(source.as_ref()),
            Error::ValidationFailed { message: _ } => None,
            Error::ContextItemNotFound { name: _ } => None,
            Error::ConversionFailed { message: _ } => None,
            Error::GraphqlParseFailed { message: _ } => None,
            Error::UnsupportedFeature { message: _ } => None,
            Error::UnsupportedOperation { operation: _ } => None,
            Error::SerializationFailed { message: _ } => None,
            Error::EndpointHttpStatus { status: _, body: _ } => None,
            Error::InvalidResponseFormat { message: _ } => None,
            Error::Timeout => None,
            Error::EndpointUnknown { message: _ } => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout
        } else {
            Error::EndpointTransport { source: e }
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::InvalidResponseFormat {
            message: e.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::ConversionFailed {
            message: format!("Failed to deserialize configuration. Source error: {}", e),
        }
    }
}

impl From<regex::Error> for Error {
    fn from(e: regex::Error) -> Self {
        Error::ValidationFailed {
            message: format!("Invalid validator pattern: {}", e),
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::ValidationFailed {
            message: format!("Invalid IRI: {}", e),
        }
    }
}

impl From<graphql_parser::query::ParseError> for Error {
    fn from(e: graphql_parser::query::ParseError) -> Self {
        Error::GraphqlParseFailed {
            message: e.to_string(),
        }
    }
}
