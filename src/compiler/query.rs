//! Query compiler.
//!
//! Compiles a read-only GraphQL query — whose root field name is the
//! entity's type name — into a [`Project`] algebra tree plus a
//! singularize map telling the result shaper which projected variables
//! represent a single value rather than a list.
//!
//! The root subject is always bound to the SPARQL variable `id`, so that
//! selecting the `id` field never needs a rename: it is simply the
//! subject variable already used to join every other selected field.

use crate::algebra::{Bgp, Pattern, Project, Term};
use crate::ast::gql_value_to_value;
use crate::compiler::mutation::literal_term;
use crate::context::Context;
use crate::value::Value;
use crate::Error;
use graphql_parser::query::{parse_query, Definition, Field, OperationDefinition, Selection};
use std::collections::{HashSet, HashMap};

const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

/// A compiled query: the SELECT algebra to run, a map from each projected
/// variable name to whether the result shaper should render it as a
/// single value (`true`) or a list (`false`), and enough structural
/// metadata for [`crate::shape`] to rebuild the selection's nesting
/// without re-parsing variable names.
#[derive(Clone, Debug)]
pub struct CompiledQuery {
    pub project: Project,
    pub singularize_map: HashMap<String, bool>,
    /// The SPARQL variable the root entity's subject is bound to (always
    /// `"id"`).
    pub root_var: String,
    /// `parent_var -> [(field_name, var)]` for every selected literal
    /// field, keyed by the variable its parent object is bound to.
    pub scalar_fields: HashMap<String, Vec<(String, String)>>,
    /// `parent_var -> [(field_name, child_var)]` for every selected
    /// relationship field.
    pub relationship_fields: HashMap<String, Vec<(String, String)>>,
    /// The set of variables whose object selected a bare `id` field.
    pub id_exposed: HashSet<String>,
}

/// Compiles `text` — a single-operation GraphQL query document whose
/// root field names an entity type — into algebra.
///
/// # Errors
///
/// - [`Error::GraphqlParseFailed`] if `text` is not syntactically valid.
/// - [`Error::UnsupportedOperation`] if the document's operation is a
///   mutation or subscription.
/// - [`Error::UnsupportedFeature`] if the operation declares variables.
/// - [`Error::ConversionFailed`] if the document has no root field, or
///   an argument cannot be converted to a filter value.
/// - [`Error::ContextItemNotFound`] if a selected or filtered field name,
///   or the root entity name, is not defined in `ctx`.
pub fn compile_query(text: &str, ctx: &Context) -> Result<CompiledQuery, Error> {
    let document = parse_query::<&str>(text)?;

    let operation = document
        .definitions
        .iter()
        .find_map(|def| match def {
            Definition::Operation(op) => Some(op),
            Definition::Fragment(_) => None,
        })
        .ok_or_else(|| Error::UnsupportedFeature {
            message: "Operation text contains no operation definition".to_string(),
        })?;

    let selection_set = match operation {
        OperationDefinition::SelectionSet(set) => set,
        OperationDefinition::Query(q) => {
            if !q.variable_definitions.is_empty() {
                return Err(Error::UnsupportedFeature {
                    message: "GraphQL variables in queries are not supported".to_string(),
                });
            }
            &q.selection_set
        }
        OperationDefinition::Mutation(_) => {
            return Err(Error::UnsupportedOperation {
                operation: "mutation".to_string(),
            })
        }
        OperationDefinition::Subscription(_) => {
            return Err(Error::UnsupportedOperation {
                operation: "subscription".to_string(),
            })
        }
    };

    let root = selection_set
        .items
        .iter()
        .find_map(|sel| match sel {
            Selection::Field(f) => Some(f),
            Selection::FragmentSpread(_) | Selection::InlineFragment(_) => None,
        })
        .ok_or_else(|| Error::ConversionFailed {
            message: "Query operation has no root field".to_string(),
        })?;

    let entity = root.name;
    let type_iri = ctx.type_iri(entity)?;

    let mut patterns = vec![Pattern::triple(
        Term::variable("id"),
        Term::iri(RDF_TYPE),
        Term::iri(type_iri),
    )];
    let mut variables: Vec<String> = Vec::new();
    let mut singularize_map: HashMap<String, bool> = HashMap::new();
    let mut scalar_fields: HashMap<String, Vec<(String, String)>> = HashMap::new();
    let mut relationship_fields: HashMap<String, Vec<(String, String)>> = HashMap::new();
    let mut id_exposed: HashSet<String> = HashSet::new();
    let mut limit: Option<usize> = None;

    for (arg_name, arg_value) in &root.arguments {
        if *arg_name == "limit" {
            if let graphql_parser::query::Value::Int(i) = arg_value {
                if let Some(n) = i.as_i64() {
                    limit = Some(n.max(0) as usize);
                }
            }
            continue;
        }
        if *arg_name != "input" {
            continue;
        }
        let filter = gql_value_to_value(arg_value)?;
        let map: HashMap<String, Value> = match filter {
            Value::Map(m) => m,
            _ => {
                return Err(Error::ConversionFailed {
                    message: "Query 'input' argument must be an object".to_string(),
                })
            }
        };
        let mut fields: Vec<(String, Value)> = map.into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));
        for (field_name, value) in fields {
            let predicate = ctx.predicate_iri(&field_name)?;
            let term = literal_term(&field_name, &value, ctx)?;
            patterns.push(Pattern::triple(
                Term::variable("id"),
                Term::iri(predicate),
                term,
            ));
        }
    }

    walk_selection(
        "id",
        "",
        false,
        &root.selection_set.items,
        ctx,
        &mut patterns,
        &mut variables,
        &mut singularize_map,
        &mut scalar_fields,
        &mut relationship_fields,
        &mut id_exposed,
    )?;

    Ok(CompiledQuery {
        project: Project {
            variables,
            pattern: Bgp::new(patterns),
            limit,
        },
        singularize_map,
        root_var: "id".to_string(),
        scalar_fields,
        relationship_fields,
        id_exposed,
    })
}

/// Walks a selection set, adding one triple pattern per selected scalar
/// or relationship field and recursing one hop into nested relationship
/// selections. `subject_var` is the SPARQL variable this selection's
/// fields hang off; `name_prefix` disambiguates nested variable names
/// (`""` at the root, `"<relationship>"` one hop in, and so on);
/// `is_list` records whether `subject_var` itself was reached through a
/// to-many relationship, which every scalar field read off it inherits.
#[allow(clippy::too_many_arguments)]
fn walk_selection(
    subject_var: &str,
    name_prefix: &str,
    is_list: bool,
    selections: &[Selection<&str>],
    ctx: &Context,
    patterns: &mut Vec<Pattern>,
    variables: &mut Vec<String>,
    singularize_map: &mut HashMap<String, bool>,
    scalar_fields: &mut HashMap<String, Vec<(String, String)>>,
    relationship_fields: &mut HashMap<String, Vec<(String, String)>>,
    id_exposed: &mut HashSet<String>,
) -> Result<(), Error> {
    for sel in selections {
        let field: &Field<&str> = match sel {
            Selection::Field(f) => f,
            Selection::FragmentSpread(_) | Selection::InlineFragment(_) => continue,
        };
        let name = field.name;

        if name == "id" {
            if !variables.iter().any(|v| v == subject_var) {
                variables.push(subject_var.to_string());
            }
            singularize_map.insert(subject_var.to_string(), !is_list);
            id_exposed.insert(subject_var.to_string());
            continue;
        }

        let var_name = if name_prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}_{}", name_prefix, name)
        };
        let predicate = ctx.predicate_iri(name)?;
        patterns.push(Pattern::triple(
            Term::variable(subject_var.to_string()),
            Term::iri(predicate),
            Term::variable(var_name.clone()),
        ));

        if ctx.is_relationship(name) {
            relationship_fields
                .entry(subject_var.to_string())
                .or_default()
                .push((name.to_string(), var_name.clone()));
            let child_is_list = ctx.is_container_set(name);
            if !field.selection_set.items.is_empty() {
                walk_selection(
                    &var_name,
                    &var_name,
                    child_is_list,
                    &field.selection_set.items,
                    ctx,
                    patterns,
                    variables,
                    singularize_map,
                    scalar_fields,
                    relationship_fields,
                    id_exposed,
                )?;
            } else {
                if !variables.iter().any(|v| v == &var_name) {
                    variables.push(var_name.clone());
                }
                singularize_map.insert(var_name, !child_is_list);
            }
        } else {
            scalar_fields
                .entry(subject_var.to_string())
                .or_default()
                .push((name.to_string(), var_name.clone()));
            if !variables.iter().any(|v| v == &var_name) {
                variables.push(var_name.clone());
            }
            singularize_map.insert(var_name, !is_list);
        }
    }
    Ok(())
}
