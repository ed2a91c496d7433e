//! Algebra-to-SPARQL serializer.
//!
//! Deterministic, injection-safe textual SPARQL from algebra. No user
//! string ever reaches the output except through [`escape_literal`], and
//! IRIs are emitted verbatim as `<iri>` because the validator already
//! guarantees they contain none of `<`, `>`, or whitespace.

use crate::algebra::{Bgp, CompositeUpdate, DeleteInsert, Pattern, Project, Term};
use crate::Error;

/// Escapes `\`, `"`, `\n`, `\r`, `\t`, and other control characters per
/// the SPARQL 1.1 string literal grammar.
pub fn escape_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

fn serialize_literal(lexical: &str, datatype: Option<&str>) -> String {
    let escaped = escape_literal(lexical);
    match datatype {
        None | Some(XSD_STRING) => format!("\"{}\"", escaped),
        Some(dt) => format!("\"{}\"^^<{}>", escaped, dt),
    }
}

fn serialize_term(term: &Term) -> String {
    match term {
        Term::Iri(iri) => format!("<{}>", iri),
        Term::Variable(name) => format!("?{}", name),
        Term::Literal { lexical, datatype } => serialize_literal(lexical, datatype.as_deref()),
    }
}

fn serialize_pattern(pattern: &Pattern) -> String {
    let triple = format!(
        "{} {} {} .",
        serialize_term(&pattern.subject),
        serialize_term(&pattern.predicate),
        serialize_term(&pattern.object)
    );
    match &pattern.graph {
        Some(g) => format!("GRAPH {} {{ {} }}", serialize_term(g), triple),
        None => triple,
    }
}

fn serialize_bgp(bgp: &Bgp) -> String {
    bgp.patterns()
        .iter()
        .map(serialize_pattern)
        .collect::<Vec<_>>()
        .join(" ")
}

fn serialize_delete_insert(update: &DeleteInsert) -> Result<String, Error> {
    match (&update.delete, &update.insert, &update.where_clause) {
        (None, Some(insert), None) => Ok(format!("INSERT DATA {{ {} }}", serialize_bgp(insert))),
        (Some(delete), None, Some(where_clause)) => Ok(format!(
            "DELETE {{ {} }} WHERE {{ {} }}",
            serialize_bgp(delete),
            serialize_bgp(where_clause)
        )),
        (Some(delete), Some(insert), Some(where_clause)) => Ok(format!(
            "DELETE {{ {} }} INSERT {{ {} }} WHERE {{ {} }}",
            serialize_bgp(delete),
            serialize_bgp(insert),
            serialize_bgp(where_clause)
        )),
        _ => Err(Error::SerializationFailed {
            message: "DeleteInsert node has a combination of delete/insert/where that does not \
                      map to INSERT DATA, DELETE WHERE, or DELETE INSERT WHERE"
                .to_string(),
        }),
    }
}

/// Serializes a [`CompositeUpdate`] into a single SPARQL 1.1 Update
/// request body, with individual updates separated by `;`.
pub fn serialize_update(update: &CompositeUpdate) -> Result<String, Error> {
    update
        .0
        .iter()
        .map(serialize_delete_insert)
        .collect::<Result<Vec<_>, _>>()
        .map(|updates| updates.join(" ;\n"))
}

/// Serializes a [`Project`] into a SPARQL 1.1 SELECT query.
pub fn serialize_select(project: &Project) -> String {
    let vars = project
        .variables
        .iter()
        .map(|v| format!("?{}", v))
        .collect::<Vec<_>>()
        .join(" ");
    let limit = project
        .limit
        .map(|l| format!(" LIMIT {}", l))
        .unwrap_or_default();
    format!(
        "SELECT {} WHERE {{ {} }}{}",
        vars,
        serialize_bgp(&project.pattern),
        limit
    )
}

#[cfg(test)]
mod tests {
    use super::{escape_literal, serialize_select, serialize_update};
    use crate::algebra::{Bgp, CompositeUpdate, DeleteInsert, Pattern, Project, Term};

    /// A literal containing quotes and a newline escapes both, with no
    /// bare quote or newline surviving into the SPARQL text.
    #[test]
    fn escapes_quotes_and_newlines() {
        let escaped = escape_literal("Alice says \"Hello\" then newline\nhere");
        assert_eq!(escaped, "Alice says \\\"Hello\\\" then newline\\nhere");
        assert!(!escaped.contains('\n'));
    }

    /// Every one of the specified special characters is escaped.
    #[test]
    fn injection_safety_escapes_every_special_character() {
        let input = "a\"b\nc\rd\te\\f}g;h";
        let escaped = escape_literal(input);
        assert_eq!(escaped, "a\\\"b\\nc\\rd\\te\\\\f}g;h");
        assert!(!escaped.contains('\n') && !escaped.contains('\r') && !escaped.contains('\t'));
    }

    #[test]
    fn insert_data_shape_when_only_insert_present() {
        let update = CompositeUpdate::new(vec![DeleteInsert {
            insert: Some(Bgp::new(vec![Pattern::triple(
                Term::iri("http://example.org/s"),
                Term::iri("http://example.org/p"),
                Term::plain_literal("o".to_string()),
            )])),
            delete: None,
            where_clause: None,
        }]);
        let text = serialize_update(&update).unwrap();
        assert!(text.starts_with("INSERT DATA {"));
        assert!(text.contains("<http://example.org/s> <http://example.org/p> \"o\" ."));
    }

    #[test]
    fn delete_where_shape_when_insert_absent() {
        let pattern = Pattern::triple(
            Term::iri("http://example.org/s"),
            Term::variable("p"),
            Term::variable("o"),
        );
        let update = CompositeUpdate::new(vec![DeleteInsert {
            delete: Some(Bgp::new(vec![pattern.clone()])),
            insert: None,
            where_clause: Some(Bgp::new(vec![pattern])),
        }]);
        let text = serialize_update(&update).unwrap();
        assert!(text.starts_with("DELETE {"));
        assert!(text.contains("WHERE {"));
        assert!(!text.contains("INSERT {"));
    }

    #[test]
    fn delete_insert_where_shape_when_all_three_present() {
        let s = Term::iri("http://example.org/s");
        let update = CompositeUpdate::new(vec![DeleteInsert {
            delete: Some(Bgp::new(vec![Pattern::triple(
                s.clone(),
                Term::iri("http://example.org/name"),
                Term::variable("old_name"),
            )])),
            insert: Some(Bgp::new(vec![Pattern::triple(
                s.clone(),
                Term::iri("http://example.org/name"),
                Term::plain_literal("Alicia".to_string()),
            )])),
            where_clause: Some(Bgp::new(vec![Pattern::triple(
                s,
                Term::iri("http://example.org/name"),
                Term::variable("old_name"),
            )])),
        }]);
        let text = serialize_update(&update).unwrap();
        assert!(text.contains("DELETE {"));
        assert!(text.contains("INSERT {"));
        assert!(text.contains("WHERE {"));
    }

    #[test]
    fn composite_update_joins_with_semicolons() {
        let di = DeleteInsert {
            insert: Some(Bgp::new(vec![Pattern::triple(
                Term::iri("http://example.org/s"),
                Term::iri("http://example.org/p"),
                Term::plain_literal("o".to_string()),
            )])),
            delete: None,
            where_clause: None,
        };
        let update = CompositeUpdate::new(vec![di.clone(), di]);
        let text = serialize_update(&update).unwrap();
        assert_eq!(text.matches(" ;\n").count(), 1);
    }

    #[test]
    fn typed_literal_emits_datatype_suffix() {
        let update = CompositeUpdate::new(vec![DeleteInsert {
            insert: Some(Bgp::new(vec![Pattern::triple(
                Term::iri("http://example.org/s"),
                Term::iri("http://example.org/age"),
                Term::typed_literal(
                    "30".to_string(),
                    "http://www.w3.org/2001/XMLSchema#integer".to_string(),
                ),
            )])),
            delete: None,
            where_clause: None,
        }]);
        let text = serialize_update(&update).unwrap();
        assert!(text.contains("\"30\"^^<http://www.w3.org/2001/XMLSchema#integer>"));
    }

    #[test]
    fn select_projects_variables_and_limit() {
        let project = Project {
            variables: vec!["name".to_string()],
            pattern: Bgp::new(vec![Pattern::triple(
                Term::variable("s"),
                Term::iri("http://xmlns.com/foaf/0.1/name"),
                Term::variable("name"),
            )]),
            limit: Some(10),
        };
        let text = serialize_select(&project);
        assert!(text.starts_with("SELECT ?name WHERE {"));
        assert!(text.ends_with("LIMIT 10"));
    }
}
