//! IRI & Input Validator.
//!
//! Guards every compilation step: IRIs are checked before they become
//! named nodes in algebra, mutation input objects are walked recursively
//! before any triple is built from them, and caller-supplied SPARQL query
//! text is checked by a coarse, non-parsing safety net before being sent
//! to the endpoint.

use crate::value::Value;
use crate::Error;
use regex::Regex;
use std::sync::OnceLock;

const MAX_INPUT_DEPTH: usize = 64;

const FORBIDDEN_QUERY_VERBS: &[&str] =
    &["DROP", "CREATE", "LOAD", "CLEAR", "DELETE", "INSERT", "UPDATE"];

static SCHEME_RE: OnceLock<Regex> = OnceLock::new();
static URN_RE: OnceLock<Regex> = OnceLock::new();

fn scheme_re() -> &'static Regex {
    SCHEME_RE.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").unwrap())
}

fn urn_re() -> &'static Regex {
    URN_RE.get_or_init(|| {
        Regex::new(r"^urn:[A-Za-z0-9][A-Za-z0-9\-]{0,31}:[A-Za-z0-9()+,\-.:=@;$_!*'%/?#]+$")
            .unwrap()
    })
}

const DISALLOWED_CHARS: &[char] = &['<', '>', '"', '{', '}', '|', '\\', '^', '`'];

/// Validates that `value` is a well-formed IRI per the scheme-specific
/// rules (`urn:`, `file:`, `http(s):`, others).
///
/// # Errors
///
/// Returns [`Error::ValidationFailed`] with a message describing the
/// failure reason. Never panics, never mutates `value`.
pub fn validate_iri(value: &str) -> Result<(), Error> {
    if value.trim().is_empty() {
        return Err(Error::ValidationFailed {
            message: "IRI must not be empty or all whitespace".to_string(),
        });
    }

    if value.chars().any(|c| c.is_control() || c == ' ' || DISALLOWED_CHARS.contains(&c)) {
        return Err(Error::ValidationFailed {
            message: format!("IRI '{}' contains illegal characters", value),
        });
    }

    if !scheme_re().is_match(value) {
        return Err(Error::ValidationFailed {
            message: format!("IRI '{}' does not start with a valid scheme", value),
        });
    }

    let scheme_end = value.find(':').expect("scheme_re guarantees a colon");
    let scheme = &value[..scheme_end];

    match scheme.to_ascii_lowercase().as_str() {
        "urn" => {
            if !urn_re().is_match(value) {
                return Err(Error::ValidationFailed {
                    message: format!("IRI '{}' is not a well-formed urn:<nid>:<nss>", value),
                });
            }
        }
        "file" => {
            if !value.starts_with("file:///") {
                return Err(Error::ValidationFailed {
                    message: format!("IRI '{}' must be of the form file:///...", value),
                });
            }
        }
        "http" | "https" => {
            let parsed = url::Url::parse(value)?;
            if parsed.host_str().map(|h| h.is_empty()).unwrap_or(true) {
                return Err(Error::ValidationFailed {
                    message: format!("IRI '{}' must have a non-empty host", value),
                });
            }
        }
        _ => {
            if value[scheme_end + 1..].starts_with("//") {
                return Err(Error::ValidationFailed {
                    message: format!(
                        "IRI '{}' uses authority form ('//') with an unsupported scheme '{}'",
                        value, scheme
                    ),
                });
            }
        }
    }

    Ok(())
}

/// Recursively validates a mutation input object: must be a non-null,
/// non-array mapping at the top level; any key whose name contains the
/// case-insensitive substring `id` and whose value is a string is
/// validated as an IRI; array values are validated element-wise.
pub fn validate_mutation_input(value: &Value) -> Result<(), Error> {
    match value {
        Value::Map(_) => validate_value_at_depth(value, 0),
        _ => Err(Error::ValidationFailed {
            message: "Mutation input must be a non-null object".to_string(),
        }),
    }
}

fn validate_value_at_depth(value: &Value, depth: usize) -> Result<(), Error> {
    if depth > MAX_INPUT_DEPTH {
        return Err(Error::ValidationFailed {
            message: "Mutation input exceeds maximum nesting depth".to_string(),
        });
    }

    match value {
        Value::Map(map) => {
            for (key, v) in map {
                if key.to_ascii_lowercase().contains("id") {
                    if let Value::String(s) = v {
                        validate_iri(s)?;
                    }
                }
                validate_value_at_depth(v, depth + 1)?;
            }
            Ok(())
        }
        Value::Array(items) => {
            for item in items {
                validate_value_at_depth(item, depth + 1)?;
            }
            Ok(())
        }
        Value::String(_) | Value::Int64(_) | Value::UInt64(_) | Value::Float64(_)
        | Value::Bool(_) | Value::Null => Ok(()),
    }
}

/// Blanks out `?variable` and `<iri>` tokens, leaving SPARQL keywords and
/// quoted literals untouched. The forbidden-verb scan runs over this
/// skeleton rather than the raw text, so a projected variable or IRI that
/// happens to contain a forbidden verb as a substring — `?updatedAt`,
/// `?createdAt`, `<http://example.org/uploadedBy>` — does not trip it.
/// Field/type names are never attacker-controlled in the generated SELECT
/// this validates (they come from the JSON-LD context), so this narrowing
/// does not weaken the check against its actual target: a forbidden verb
/// appearing as SPARQL syntax or inside a literal.
fn blank_variables_and_iris(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '?' | '$' => {
                out.push(' ');
                while matches!(chars.peek(), Some(nc) if nc.is_alphanumeric() || *nc == '_') {
                    chars.next();
                }
            }
            '<' => {
                out.push(' ');
                for nc in chars.by_ref() {
                    if nc == '>' {
                        break;
                    }
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// The coarse, non-parsing SPARQL query safety net. Applies to queries
/// only; mutations go through algebra, which is safe by construction.
pub fn validate_query_text(text: &str, max_len: usize) -> Result<(), Error> {
    if text.len() > max_len {
        return Err(Error::ValidationFailed {
            message: format!(
                "Query text exceeds the configured length bound of {} bytes",
                max_len
            ),
        });
    }

    let skeleton_upper = blank_variables_and_iris(text).to_ascii_uppercase();
    for verb in FORBIDDEN_QUERY_VERBS {
        if skeleton_upper.contains(verb) {
            return Err(Error::ValidationFailed {
                message: format!(
                    "Query text contains forbidden keyword '{}' (substring match, may be overcautious)",
                    verb
                ),
            });
        }
    }

    let upper = text.to_ascii_uppercase();
    let trimmed = text.trim_start();
    let starts_ok = trimmed.to_ascii_uppercase().starts_with("SELECT")
        || trimmed.to_ascii_uppercase().starts_with("CONSTRUCT");
    if !starts_ok {
        return Err(Error::ValidationFailed {
            message: "Query text must start with SELECT or CONSTRUCT".to_string(),
        });
    }
    if !upper.contains("WHERE") {
        return Err(Error::ValidationFailed {
            message: "Query text must contain a WHERE clause".to_string(),
        });
    }

    let mut depth = 0i64;
    for c in text.chars() {
        match c {
            '{' => depth += 1,
            '}' => depth -= 1,
            _ => {}
        }
        if depth < 0 {
            return Err(Error::ValidationFailed {
                message: "Query text has unbalanced braces".to_string(),
            });
        }
    }
    if depth != 0 {
        return Err(Error::ValidationFailed {
            message: "Query text has unbalanced braces".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{validate_iri, validate_mutation_input, validate_query_text};
    use crate::value::Value;
    use std::collections::HashMap;

    #[test]
    fn accepts_http_iri() {
        assert!(validate_iri("http://example.org/user1").is_ok());
    }

    #[test]
    fn accepts_urn_uuid() {
        assert!(validate_iri("urn:uuid:c1a8b9b0-7e3e-4f0b-9b0a-3b9b0a3b9b0a").is_ok());
    }

    #[test]
    fn rejects_empty() {
        assert!(validate_iri("   ").is_err());
    }

    #[test]
    fn rejects_disallowed_characters() {
        assert!(validate_iri("http://example.org/<evil>").is_err());
    }

    /// An injection attempt embedding a space and angle bracket must
    /// fail validation before any algebra is built.
    #[test]
    fn rejects_injection_attempt() {
        let bad = "ex:evil> } ; DROP ALL ; INSERT { <x> <y> <z";
        assert!(validate_iri(bad).is_err());
    }

    #[test]
    fn rejects_authority_form_on_unsupported_scheme() {
        assert!(validate_iri("mailto://example.org/x").is_err());
        assert!(validate_iri("mailto:a@b.com").is_ok());
    }

    #[test]
    fn rejects_http_without_host() {
        assert!(validate_iri("http:///path").is_err());
    }

    #[test]
    fn rejects_malformed_urn() {
        assert!(validate_iri("urn::nss").is_err());
    }

    #[test]
    fn requires_file_triple_slash() {
        assert!(validate_iri("file:///tmp/x").is_ok());
        assert!(validate_iri("file://host/tmp/x").is_err());
    }

    #[test]
    fn mutation_input_must_be_a_map() {
        assert!(validate_mutation_input(&Value::Null).is_err());
        assert!(validate_mutation_input(&Value::Array(vec![])).is_err());
    }

    #[test]
    fn validates_id_substring_keys_as_iris() {
        let mut m = HashMap::new();
        m.insert(
            "productId".to_string(),
            Value::String("not an iri".to_string()),
        );
        let input = Value::Map(m);
        assert!(validate_mutation_input(&input).is_err());
    }

    #[test]
    fn validates_array_elements() {
        let mut m = HashMap::new();
        m.insert(
            "tags".to_string(),
            Value::Array(vec![Value::String("fine".to_string())]),
        );
        let input = Value::Map(m);
        assert!(validate_mutation_input(&input).is_ok());
    }

    #[test]
    fn query_text_requires_select_or_construct() {
        assert!(validate_query_text("SELECT * WHERE { ?s ?p ?o }", 10_000).is_ok());
        assert!(validate_query_text("ASK WHERE { ?s ?p ?o }", 10_000).is_err());
    }

    #[test]
    fn query_text_rejects_forbidden_verbs_by_substring() {
        assert!(validate_query_text(
            "SELECT * WHERE { ?s ?p \"DROP the mic\" }",
            10_000
        )
        .is_err());
    }

    #[test]
    fn query_text_accepts_verb_substrings_in_variable_and_iri_tokens() {
        assert!(validate_query_text(
            "SELECT ?id ?updatedAt ?createdAt ?uploadedBy WHERE { ?id <http://example.org/uploadedBy> ?uploadedBy }",
            10_000
        )
        .is_ok());
    }

    #[test]
    fn query_text_rejects_unbalanced_braces() {
        assert!(validate_query_text("SELECT * WHERE { ?s ?p ?o", 10_000).is_err());
    }

    #[test]
    fn query_text_rejects_over_length_bound() {
        let long = format!("SELECT * WHERE {{ {} }}", "?s ?p ?o . ".repeat(100));
        assert!(validate_query_text(&long, 10).is_err());
    }
}
