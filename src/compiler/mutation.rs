//! Mutation compiler — the hardest subsystem.
//!
//! Turns a classified [`MutationAst`] into a [`CompositeUpdate`] algebra
//! tree: `INSERT DATA` for create, `DELETE ... INSERT ... WHERE` for
//! update, `DELETE ... WHERE` for delete. Subjects are either a
//! caller-supplied, context-expanded IRI, or a freshly skolemized
//! `urn:uuid:<v4>` — never a blank node, so that two independent stores
//! fed the same create mutation end up with the same subject identity.

use crate::algebra::{Bgp, CompositeUpdate, DeleteInsert, Pattern, Term};
use crate::ast::{MutationAst, OperationKind};
use crate::context::{Context, IriExpansion};
use crate::validate;
use crate::value::Value;
use crate::Error;
use std::collections::HashMap;
use std::convert::TryInto;
use uuid::Uuid;

const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

/// Compiles a classified mutation into algebra.
///
/// `deep_delete` controls whether a delete additionally removes inbound
/// (inverse) triples pointing at the subject; it has no effect on
/// create/update. Callers reach this through
/// [`Client::mutate`](crate::client::Client::mutate) /
/// [`Client::mutate_with_options`](crate::client::Client::mutate_with_options),
/// which default it to `false`.
pub fn compile(
    ast: &MutationAst,
    ctx: &Context,
    mode: IriExpansion,
    deep_delete: bool,
) -> Result<CompositeUpdate, Error> {
    match &ast.kind {
        OperationKind::Create { entity } => compile_create(entity, ast.input.clone(), ctx, mode),
        OperationKind::Update { entity, id } => {
            compile_update(entity, id, ast.input.clone(), ctx, mode)
        }
        OperationKind::Delete { id, .. } => compile_delete(id, ctx, mode, deep_delete),
    }
}

fn compile_create(
    entity: &str,
    input: Option<Value>,
    ctx: &Context,
    mode: IriExpansion,
) -> Result<CompositeUpdate, Error> {
    let input = input.ok_or_else(|| Error::ConversionFailed {
        message: "Create mutation requires an input object argument".to_string(),
    })?;
    validate::validate_mutation_input(&input)?;
    let map: HashMap<String, Value> = input.try_into()?;

    let subject = match map.get("id") {
        Some(Value::String(s)) => Term::iri(ctx.expand_iri(s, mode)),
        Some(_) => {
            return Err(Error::ConversionFailed {
                message: "'id' field must be a string".to_string(),
            })
        }
        None => Term::iri(format!("urn:uuid:{}", Uuid::new_v4())),
    };

    let mut patterns = vec![Pattern::triple(
        subject.clone(),
        Term::iri(RDF_TYPE),
        Term::iri(ctx.type_iri(entity)?),
    )];

    // HashMap does not preserve GraphQL's input-field order; field names
    // are sorted so that compiling the same input twice yields the same
    // pattern order, for determinism.
    let mut fields: Vec<(&String, &Value)> =
        map.iter().filter(|(k, _)| k.as_str() != "id").collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    for (field, value) in fields {
        let (object_term, relationship_name) = object_term_for_field(field, value, ctx, mode)?;
        let predicate_name = relationship_name.clone().unwrap_or_else(|| field.clone());
        let predicate = Term::iri(ctx.predicate_iri(&predicate_name)?);

        patterns.push(Pattern::triple(
            subject.clone(),
            predicate,
            object_term.clone(),
        ));

        if let Some(relationship_name) = &relationship_name {
            if let (Some(inverse_predicate), Term::Iri(object_iri)) =
                (ctx.inverse_of(relationship_name), &object_term)
            {
                patterns.push(Pattern::triple(
                    Term::iri(object_iri.clone()),
                    Term::iri(inverse_predicate),
                    subject.clone(),
                ));
            }
        }
    }

    Ok(CompositeUpdate::new(vec![DeleteInsert {
        insert: Some(Bgp::new(patterns)),
        delete: None,
        where_clause: None,
    }]))
}

fn compile_update(
    _entity: &str,
    id: &str,
    input: Option<Value>,
    ctx: &Context,
    mode: IriExpansion,
) -> Result<CompositeUpdate, Error> {
    validate::validate_iri(id)?;
    let input = input.ok_or_else(|| Error::ConversionFailed {
        message: "Update mutation requires an input object argument".to_string(),
    })?;
    validate::validate_mutation_input(&input)?;
    let map: HashMap<String, Value> = input.try_into()?;

    if map.contains_key("id") {
        return Err(Error::ConversionFailed {
            message: "Update mutation input must not modify 'id'".to_string(),
        });
    }
    if map.is_empty() {
        return Err(Error::ValidationFailed {
            message: "Update operation has no fields".to_string(),
        });
    }

    let subject = Term::iri(ctx.expand_iri(id, mode));
    let mut fields: Vec<(&String, &Value)> = map.iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    let mut deletes = Vec::with_capacity(fields.len());
    let mut inserts = Vec::with_capacity(fields.len());
    let mut wheres = Vec::with_capacity(fields.len());

    for (field, value) in fields {
        let predicate = Term::iri(ctx.predicate_iri(field)?);
        // Field names are unique within a GraphQL input object, so
        // old_<field> cannot collide with another field's variable.
        let old_var = Term::variable(format!("old_{}", field));
        let (object_term, _relationship_name) = object_term_for_field(field, value, ctx, mode)?;

        deletes.push(Pattern::triple(
            subject.clone(),
            predicate.clone(),
            old_var.clone(),
        ));
        inserts.push(Pattern::triple(subject.clone(), predicate.clone(), object_term));
        wheres.push(Pattern::triple(subject.clone(), predicate, old_var));
    }

    Ok(CompositeUpdate::new(vec![DeleteInsert {
        delete: Some(Bgp::new(deletes)),
        insert: Some(Bgp::new(inserts)),
        where_clause: Some(Bgp::new(wheres)),
    }]))
}

fn compile_delete(
    id: &str,
    ctx: &Context,
    mode: IriExpansion,
    deep_delete: bool,
) -> Result<CompositeUpdate, Error> {
    validate::validate_iri(id)?;
    let subject = Term::iri(ctx.expand_iri(id, mode));

    let pattern = Pattern::triple(subject.clone(), Term::variable("p_del"), Term::variable("o_del"));
    let mut updates = vec![DeleteInsert {
        delete: Some(Bgp::new(vec![pattern.clone()])),
        insert: None,
        where_clause: Some(Bgp::new(vec![pattern])),
    }];

    // Opt-in only: the base contract leaves triples pointing at the
    // deleted subject dangling. See Client::mutate_with_options.
    if deep_delete {
        let inverse_pattern =
            Pattern::triple(Term::variable("s_inv"), Term::variable("p_inv"), subject);
        updates.push(DeleteInsert {
            delete: Some(Bgp::new(vec![inverse_pattern.clone()])),
            insert: None,
            where_clause: Some(Bgp::new(vec![inverse_pattern])),
        });
    }

    Ok(CompositeUpdate::new(updates))
}

/// `Some(relationship_name)` when `field` names a relationship (either by
/// the `<name>Id` suffix convention or via the context's `@type: @id`
/// marker) and `value` is a string; `None` for plain literal fields.
fn relationship_name(field: &str, value: &Value, ctx: &Context) -> Option<String> {
    if !matches!(value, Value::String(_)) {
        return None;
    }
    if let Some(stripped) = field.strip_suffix("Id") {
        return Some(stripped.to_string());
    }
    if ctx.is_relationship(field) {
        return Some(field.to_string());
    }
    None
}

/// Builds the object term for `field → value`, along with the
/// relationship name when this is a relationship field (used by the
/// caller to look up an inverse predicate).
fn object_term_for_field(
    field: &str,
    value: &Value,
    ctx: &Context,
    mode: IriExpansion,
) -> Result<(Term, Option<String>), Error> {
    if let Some(relationship_name) = relationship_name(field, value, ctx) {
        let raw = match value {
            Value::String(s) => s,
            _ => unreachable!("relationship_name only returns Some for string values"),
        };
        let object_iri = ctx.expand_iri(raw, mode);
        validate::validate_iri(&object_iri)?;
        return Ok((Term::iri(object_iri), Some(relationship_name)));
    }

    Ok((literal_term(field, value, ctx)?, None))
}

pub(crate) fn literal_term(field: &str, value: &Value, ctx: &Context) -> Result<Term, Error> {
    if let Some(datatype) = ctx.literal_datatype_override(field) {
        return Ok(Term::typed_literal(value.lexical(), datatype));
    }
    match value {
        Value::String(s) => Ok(Term::plain_literal(s.clone())),
        Value::Null | Value::Array(_) | Value::Map(_) => Err(Error::ConversionFailed {
            message: format!(
                "GraphQL value kind for field '{}' has no SPARQL literal form",
                field
            ),
        }),
        _ => Ok(Term::typed_literal(
            value.lexical(),
            value
                .xsd_datatype()
                .expect("non-string, non-container Value always has an xsd datatype"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::compile;
    use crate::algebra::Term;
    use crate::ast::parse_mutation;
    use crate::context::{Context, IriExpansion};
    use serde_json::json;

    fn sample_context() -> Context {
        Context::from_json(&json!({
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
        }))
        .unwrap()
    }

    /// Create with an explicit id.
    #[test]
    fn create_with_explicit_id() {
        let ast = parse_mutation(
            r#"mutation { createUser(input: {id: "ex:user1", name: "Alice", age: 30}) { id } }"#,
        )
        .unwrap();
        let ctx = sample_context();
        let update = compile(&ast, &ctx, IriExpansion::Concatenate, false).unwrap();

        assert_eq!(update.0.len(), 1);
        let insert = update.0[0].insert.as_ref().unwrap();
        assert_eq!(insert.patterns().len(), 3);

        let subject = Term::iri("http://example.org/ex:user1");
        assert!(insert.patterns().iter().any(|p| p.subject == subject
            && p.predicate == Term::iri("http://www.w3.org/1999/02/22-rdf-syntax-ns#type")
            && p.object == Term::iri("http://example.org/User")));
        assert!(insert.patterns().iter().any(|p| p.subject == subject
            && p.predicate == Term::iri("http://xmlns.com/foaf/0.1/name")
            && p.object == Term::plain_literal("Alice".to_string())));
        assert!(insert.patterns().iter().any(|p| p.subject == subject
            && p.predicate == Term::iri("ex:age")
            && p.object
                == Term::typed_literal(
                    "30".to_string(),
                    "http://www.w3.org/2001/XMLSchema#integer".to_string()
                )));
    }

    /// Create with no id mints a urn:uuid: subject.
    #[test]
    fn create_with_auto_id() {
        let ast = parse_mutation(r#"mutation { createUser(input: {name: "Bob"}) { id } }"#).unwrap();
        let ctx = sample_context();
        let update = compile(&ast, &ctx, IriExpansion::Concatenate, false).unwrap();
        let insert = update.0[0].insert.as_ref().unwrap();
        assert_eq!(insert.patterns().len(), 2);

        let subject_pattern = &insert.patterns()[0];
        match &subject_pattern.subject {
            Term::Iri(iri) => assert!(iri.starts_with("urn:uuid:")),
            _ => panic!("expected an IRI subject"),
        }
    }

    /// Update deletes, inserts, and binds the same predicate per field.
    #[test]
    fn update_deletes_inserts_and_binds_same_predicate() {
        let ast = parse_mutation(
            r#"mutation { updateUser(id: "ex:user1", input: {name: "Alicia", age: 31}) { id } }"#,
        )
        .unwrap();
        let ctx = sample_context();
        let update = compile(&ast, &ctx, IriExpansion::Concatenate, false).unwrap();

        assert_eq!(update.0.len(), 1);
        let op = &update.0[0];
        let deletes = op.delete.as_ref().unwrap();
        let inserts = op.insert.as_ref().unwrap();
        let wheres = op.where_clause.as_ref().unwrap();
        assert_eq!(deletes.patterns().len(), 2);
        assert_eq!(inserts.patterns().len(), 2);
        assert_eq!(wheres.patterns().len(), 2);

        // Every delete variable also appears in where with the same predicate.
        for d in deletes.patterns() {
            assert!(wheres
                .patterns()
                .iter()
                .any(|w| w.subject == d.subject && w.predicate == d.predicate && w.object == d.object));
        }
    }

    /// Delete emits exactly one pattern, in both delete and where.
    #[test]
    fn delete_emits_single_pattern() {
        let ast = parse_mutation(r#"mutation { deleteUser(id: "ex:user1") }"#).unwrap();
        let ctx = sample_context();
        let update = compile(&ast, &ctx, IriExpansion::Concatenate, false).unwrap();

        assert_eq!(update.0.len(), 1);
        let op = &update.0[0];
        assert_eq!(op.delete.as_ref().unwrap().patterns().len(), 1);
        assert_eq!(op.where_clause.as_ref().unwrap().patterns().len(), 1);
        assert!(op.insert.is_none());
    }

    #[test]
    fn deep_delete_adds_a_second_update_for_inverse_triples() {
        let ast = parse_mutation(r#"mutation { deleteUser(id: "ex:user1") }"#).unwrap();
        let ctx = sample_context();
        let update = compile(&ast, &ctx, IriExpansion::Concatenate, true).unwrap();
        assert_eq!(update.0.len(), 2);
    }

    /// An IRI validation failure during compile surfaces before any
    /// algebra is returned.
    #[test]
    fn injection_attempt_is_rejected() {
        let ast = parse_mutation(
            r#"mutation { createProduct(input: { id: "ex:evil> } ; DROP ALL ; INSERT { <x> <y> <z", name: "x" }) { id } }"#,
        )
        .unwrap();
        let ctx = sample_context();
        let result = compile(&ast, &ctx, IriExpansion::Concatenate, false);
        assert!(result.is_err());
    }

    /// A relationship field with a paired inverse in the context emits
    /// both the forward and inverse triples.
    #[test]
    fn inverse_link_emission() {
        let ast = parse_mutation(
            r#"mutation { createReview(input: {productId: "ex:p1", rating: 5, reviewer: "a@b"}) { id } }"#,
        )
        .unwrap();
        let ctx = sample_context();
        let update = compile(&ast, &ctx, IriExpansion::Concatenate, false).unwrap();
        let insert = update.0[0].insert.as_ref().unwrap();

        let forward = insert.patterns().iter().find(|p| {
            p.predicate == Term::iri("http://schema.org/itemReviewed")
        });
        assert!(forward.is_some());
        let subject = forward.unwrap().subject.clone();
        let object = forward.unwrap().object.clone();

        let inverse = insert.patterns().iter().find(|p| {
            p.subject == object
                && p.predicate == Term::iri("http://schema.org/review")
                && p.object == subject
        });
        assert!(inverse.is_some());
    }

    /// Update with an empty input fails and builds no operation.
    #[test]
    fn empty_update_input_rejected() {
        let ast =
            parse_mutation(r#"mutation { updateUser(id: "ex:user1", input: {}) { id } }"#).unwrap();
        let ctx = sample_context();
        let result = compile(&ast, &ctx, IriExpansion::Concatenate, false);
        assert!(result.is_err());
    }

    /// An update input carrying an 'id' key fails with a conversion error.
    #[test]
    fn id_update_rejected() {
        let ast = parse_mutation(
            r#"mutation { updateUser(id: "ex:user1", input: {id: "ex:user2"}) { id } }"#,
        )
        .unwrap();
        let ctx = sample_context();
        let err = compile(&ast, &ctx, IriExpansion::Concatenate, false).unwrap_err();
        assert_eq!(err.code(), "CONVERSION_ERROR");
    }

    /// Every create emits exactly one rdf:type triple.
    #[test]
    fn type_triple_invariant() {
        let ast = parse_mutation(
            r#"mutation { createUser(input: {id: "ex:user1", name: "Alice"}) { id } }"#,
        )
        .unwrap();
        let ctx = sample_context();
        let update = compile(&ast, &ctx, IriExpansion::Concatenate, false).unwrap();
        let insert = update.0[0].insert.as_ref().unwrap();
        let type_triples: Vec<_> = insert
            .patterns()
            .iter()
            .filter(|p| p.predicate == Term::iri("http://www.w3.org/1999/02/22-rdf-syntax-ns#type"))
            .collect();
        assert_eq!(type_triples.len(), 1);
        assert_eq!(type_triples[0].object, Term::iri("http://example.org/User"));
    }

    /// Compiling the same mutation twice yields identical algebra
    /// (field order is sorted, so there is no HashMap-iteration flakiness).
    #[test]
    fn compilation_is_deterministic() {
        let text = r#"mutation { createUser(input: {id: "ex:user1", name: "Alice", age: 30}) { id } }"#;
        let ctx = sample_context();
        let a = compile(&parse_mutation(text).unwrap(), &ctx, IriExpansion::Concatenate, false).unwrap();
        let b = compile(&parse_mutation(text).unwrap(), &ctx, IriExpansion::Concatenate, false).unwrap();
        assert_eq!(a, b);
    }
}
