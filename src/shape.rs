//! Result shaper.
//!
//! Turns the flat rows of a [`SparqlJsonResult`] back into the nested
//! GraphQL-shaped tree the query's selection set described, grouping rows
//! by the IRI bound to each object's variable and using
//! [`CompiledQuery`]'s `singularize_map` to decide whether a field comes
//! out as one value or a list.

use crate::compiler::query::CompiledQuery;
use crate::endpoint::{Binding, RdfTerm, SparqlJsonResult};
use crate::value::Value;
use std::collections::HashMap;

const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
const XSD_DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";
const XSD_DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
const XSD_FLOAT: &str = "http://www.w3.org/2001/XMLSchema#float";
const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

/// Coerces a bound RDF term to a native [`Value`]. Named and blank nodes
/// become their IRI/label as a string. Literals with a recognized XSD
/// datatype are coerced to the matching native kind; an untyped or
/// `xsd:string` literal becomes a plain string; any other typed literal
/// is preserved as a `{lexical, datatype}` map rather than silently
/// losing its datatype.
fn term_to_value(term: &RdfTerm) -> Value {
    match term {
        RdfTerm::NamedNode { iri } => Value::String(iri.clone()),
        RdfTerm::BlankNode { label } => Value::String(label.clone()),
        RdfTerm::Literal {
            lexical,
            datatype,
            ..
        } => match datatype.as_deref() {
            None | Some(XSD_STRING) => Value::String(lexical.clone()),
            Some(XSD_INTEGER) => lexical
                .parse::<i64>()
                .map(Value::Int64)
                .unwrap_or_else(|_| Value::String(lexical.clone())),
            Some(XSD_BOOLEAN) => lexical
                .parse::<bool>()
                .map(Value::Bool)
                .unwrap_or_else(|_| Value::String(lexical.clone())),
            Some(XSD_DOUBLE) | Some(XSD_FLOAT) | Some(XSD_DECIMAL) => lexical
                .parse::<f64>()
                .map(Value::Float64)
                .unwrap_or_else(|_| Value::String(lexical.clone())),
            Some(dt) => {
                let mut m = HashMap::new();
                m.insert("lexical".to_string(), Value::String(lexical.clone()));
                m.insert("datatype".to_string(), Value::String(dt.to_string()));
                Value::Map(m)
            }
        },
    }
}

fn node_iri(binding: &Binding, var: &str) -> Option<String> {
    match binding.get(var) {
        Some(RdfTerm::NamedNode { iri }) => Some(iri.clone()),
        Some(RdfTerm::BlankNode { label }) => Some(label.clone()),
        _ => None,
    }
}

/// Groups `rows` by the IRI/label bound to `var`, preserving first-seen
/// order. Rows with `var` unbound are dropped from the group (an
/// optional-pattern miss, not a present-but-null value).
fn group_by_var<'a>(rows: &[&'a Binding], var: &str) -> Vec<(String, Vec<&'a Binding>)> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<&'a Binding>> = HashMap::new();
    for row in rows {
        if let Some(id) = node_iri(row, var) {
            groups.entry(id.clone()).or_insert_with(|| {
                order.push(id.clone());
                Vec::new()
            });
            groups.get_mut(&id).unwrap().push(row);
        }
    }
    order.into_iter().map(|id| (id.clone(), groups.remove(&id).unwrap())).collect()
}

fn build_object(var: &str, var_iri: &str, rows: &[&Binding], compiled: &CompiledQuery) -> Value {
    let mut fields: HashMap<String, Value> = HashMap::new();

    if compiled.id_exposed.contains(var) {
        fields.insert("id".to_string(), Value::String(var_iri.to_string()));
    }

    if let Some(scalars) = compiled.scalar_fields.get(var) {
        for (field_name, scalar_var) in scalars {
            let singular = compiled.singularize_map.get(scalar_var).copied().unwrap_or(true);
            let mut values: Vec<Value> = Vec::new();
            for row in rows {
                if let Some(term) = row.get(scalar_var) {
                    let v = term_to_value(term);
                    if !values.contains(&v) {
                        values.push(v);
                    }
                }
            }
            let value = if singular {
                values.into_iter().next().unwrap_or(Value::Null)
            } else {
                Value::Array(values)
            };
            fields.insert(field_name.clone(), value);
        }
    }

    if let Some(relationships) = compiled.relationship_fields.get(var) {
        for (field_name, child_var) in relationships {
            let singular = compiled.singularize_map.get(child_var).copied().unwrap_or(true);
            let groups = group_by_var(rows, child_var);
            let objects: Vec<Value> = groups
                .into_iter()
                .map(|(child_iri, child_rows)| {
                    build_object(child_var, &child_iri, &child_rows, compiled)
                })
                .collect();
            let value = if singular {
                objects.into_iter().next().unwrap_or(Value::Null)
            } else {
                Value::Array(objects)
            };
            fields.insert(field_name.clone(), value);
        }
    }

    Value::Map(fields)
}

/// Shapes a SPARQL SELECT result back into one GraphQL object per
/// distinct root subject, in the order the root subject was first bound.
pub fn shape_results(result: &SparqlJsonResult, compiled: &CompiledQuery) -> Vec<Value> {
    let rows: Vec<&Binding> = result.bindings.iter().collect();
    let groups = group_by_var(&rows, &compiled.root_var);
    groups
        .into_iter()
        .map(|(root_iri, root_rows)| build_object(&compiled.root_var, &root_iri, &root_rows, compiled))
        .collect()
}
