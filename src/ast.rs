//! GraphQL AST Walker.
//!
//! Parses a mutation string once, via `graphql-parser`, and reduces it to
//! the handful of facts the mutation compiler needs: which operation kind
//! is being invoked, on which entity, and with what `id`/`input`
//! arguments. The selection set on the mutation field is ignored here —
//! it only affects the shape the server layer returns, not compilation.

use crate::value::Value;
use crate::Error;
use graphql_parser::query::{parse_query, Definition, OperationDefinition, Selection, Value as GqlValue};
use std::collections::HashMap;

/// The operation a parsed mutation resolves to, derived from its root
/// field name's prefix.
#[derive(Clone, Debug, PartialEq)]
pub enum OperationKind {
    Create { entity: String },
    Update { entity: String, id: String },
    Delete { entity: String, id: String },
}

/// A parsed, classified mutation, ready for the mutation compiler.
#[derive(Clone, Debug)]
pub struct MutationAst {
    pub kind: OperationKind,
    pub input: Option<Value>,
}

/// Parses `text` as a GraphQL mutation operation and classifies it.
///
/// # Errors
///
/// - [`Error::GraphqlParseFailed`] if `text` is not syntactically valid
///   GraphQL.
/// - [`Error::UnsupportedFeature`] if the mutation declares or references
///   any GraphQL variable, or contains no mutation operation.
/// - [`Error::UnsupportedOperation`] if the document's operation is a
///   query or subscription rather than a mutation.
/// - [`Error::ConversionFailed`] if the root field name does not start
///   with `create`, `update`, or `delete`, or a required argument
///   (`id`) is missing for update/delete.
pub fn parse_mutation(text: &str) -> Result<MutationAst, Error> {
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

    let mutation = match operation {
        OperationDefinition::Mutation(m) => m,
        OperationDefinition::Query(_) | OperationDefinition::SelectionSet(_) => {
            return Err(Error::UnsupportedOperation {
                operation: "query".to_string(),
            })
        }
        OperationDefinition::Subscription(_) => {
            return Err(Error::UnsupportedOperation {
                operation: "subscription".to_string(),
            })
        }
    };

    if !mutation.variable_definitions.is_empty() {
        return Err(Error::UnsupportedFeature {
            message: "GraphQL variables in mutations are not supported".to_string(),
        });
    }

    let field = mutation
        .selection_set
        .items
        .iter()
        .find_map(|sel| match sel {
            Selection::Field(f) => Some(f),
            Selection::FragmentSpread(_) | Selection::InlineFragment(_) => None,
        })
        .ok_or_else(|| Error::ConversionFailed {
            message: "Mutation operation has no root field".to_string(),
        })?;

    let name = field.name;

    let mut arguments: HashMap<&str, Value> = HashMap::new();
    for (arg_name, arg_value) in &field.arguments {
        arguments.insert(arg_name, gql_value_to_value(arg_value)?);
    }

    let (prefix, entity) = if let Some(rest) = name.strip_prefix("create") {
        ("create", rest)
    } else if let Some(rest) = name.strip_prefix("update") {
        ("update", rest)
    } else if let Some(rest) = name.strip_prefix("delete") {
        ("delete", rest)
    } else {
        return Err(Error::ConversionFailed {
            message: format!(
                "Mutation root field '{}' does not start with create/update/delete",
                name
            ),
        });
    };

    if entity.is_empty() {
        return Err(Error::ConversionFailed {
            message: format!("Mutation root field '{}' names no entity", name),
        });
    }

    let input = arguments.remove("input");

    let id = |arguments: &HashMap<&str, Value>| -> Result<String, Error> {
        match arguments.get("id") {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(Error::ConversionFailed {
                message: "Argument 'id' must be a string".to_string(),
            }),
            None => Err(Error::ConversionFailed {
                message: "Mutation is missing the required 'id' argument".to_string(),
            }),
        }
    };

    let kind = match prefix {
        "create" => OperationKind::Create {
            entity: entity.to_string(),
        },
        "update" => OperationKind::Update {
            entity: entity.to_string(),
            id: id(&arguments)?,
        },
        "delete" => OperationKind::Delete {
            entity: entity.to_string(),
            id: id(&arguments)?,
        },
        _ => unreachable!(),
    };

    Ok(MutationAst { kind, input })
}

pub(crate) fn gql_value_to_value(v: &GqlValue<&str>) -> Result<Value, Error> {
    match v {
        GqlValue::Variable(_) => Err(Error::UnsupportedFeature {
            message: "GraphQL variables in mutations are not supported".to_string(),
        }),
        GqlValue::Int(i) => i
            .as_i64()
            .map(Value::Int64)
            .ok_or_else(|| Error::ConversionFailed {
                message: "Integer literal out of range".to_string(),
            }),
        GqlValue::Float(f) => Ok(Value::Float64(*f)),
        GqlValue::String(s) => Ok(Value::String(s.clone())),
        GqlValue::Boolean(b) => Ok(Value::Bool(*b)),
        GqlValue::Null => Ok(Value::Null),
        GqlValue::Enum(e) => Ok(Value::String((*e).to_string())),
        GqlValue::List(items) => Ok(Value::Array(
            items
                .iter()
                .map(gql_value_to_value)
                .collect::<Result<Vec<_>, _>>()?,
        )),
        GqlValue::Object(map) => {
            let mut out = HashMap::new();
            for (k, val) in map {
                out.insert((*k).to_string(), gql_value_to_value(val)?);
            }
            Ok(Value::Map(out))
        }
    }
}
