//! JSON-LD Context Resolver.
//!
//! Normalizes a raw JSON-LD context document into a lookup table mapping
//! short names to IRIs, datatype hints, and container hints, and answers
//! the handful of questions the mutation and query compilers need: what
//! IRI does a term expand to, is a term a relationship, what is its
//! inverse.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Selects how [`Context::expand_iri`] resolves a value that is not
/// already an absolute `http(s)://` IRI.
///
/// `Concatenate` preserves the source's observed behavior: the value is
/// appended to `@base` with a `/` separator even when the value itself
/// looks like a CURIE (`prefix:local`), producing IRIs such as
/// `http://example.org/ex:user1`. `Curie` is an opt-in mode that resolves
/// `prefix:local` against the context's own term table first.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum IriExpansion {
    Concatenate,
    Curie,
}

impl Default for IriExpansion {
    fn default() -> Self {
        IriExpansion::Concatenate
    }
}

#[derive(Clone, Debug)]
enum TermDefinition {
    /// A bare IRI string.
    Iri(String),
    /// A structured term definition: `@id`, optional `@type` (a datatype
    /// IRI, or the literal marker `@id` meaning "object-valued
    /// relationship"), and optional `@container` hint.
    Structured {
        id: String,
        type_: Option<String>,
        container: Option<String>,
    },
}

impl TermDefinition {
    fn id(&self) -> &str {
        match self {
            TermDefinition::Iri(iri) => iri,
            TermDefinition::Structured { id, .. } => id,
        }
    }

    fn is_relationship(&self) -> bool {
        matches!(
            self,
            TermDefinition::Structured { type_: Some(t), .. } if t == "@id"
        )
    }
}

/// A bidirectional table of common inverse-relationship name pairs, used
/// by [`Context::inverse_of`] when the context does not carry explicit
/// `@reverse` mappings.
const INVERSE_PAIRS: &[(&str, &str)] = &[
    ("product", "reviews"),
    ("author", "works"),
    ("parent", "children"),
    ("owner", "items"),
    ("reviewer", "reviews"),
];

/// A normalized JSON-LD context.
#[derive(Clone, Debug)]
pub struct Context {
    base: Option<String>,
    vocab: Option<String>,
    terms: HashMap<String, TermDefinition>,
}

impl Context {
    /// Builds a [`Context`] from a raw JSON-LD context document (the
    /// object form, not wrapped in `{"@context": ...}`).
    pub fn from_json(value: &serde_json::Value) -> Result<Context, Error> {
        let obj = value.as_object().ok_or_else(|| Error::ContextItemNotFound {
            name: "@context".to_string(),
        })?;

        let base = obj
            .get("@base")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());
        let vocab = obj
            .get("@vocab")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        let mut terms = HashMap::new();
        for (key, val) in obj {
            if key == "@base" || key == "@vocab" {
                continue;
            }
            let def = match val {
                serde_json::Value::String(s) => TermDefinition::Iri(s.clone()),
                serde_json::Value::Object(term_obj) => {
                    let id = term_obj
                        .get("@id")
                        .and_then(|v| v.as_str())
                        .ok_or_else(|| Error::ContextItemNotFound { name: key.clone() })?
                        .to_string();
                    let type_ = term_obj
                        .get("@type")
                        .and_then(|v| v.as_str())
                        .map(|s| s.to_string());
                    let container = term_obj
                        .get("@container")
                        .and_then(|v| v.as_str())
                        .map(|s| s.to_string());
                    TermDefinition::Structured {
                        id,
                        type_,
                        container,
                    }
                }
                _ => {
                    return Err(Error::ContextItemNotFound { name: key.clone() });
                }
            };
            terms.insert(key.clone(), def);
        }

        Ok(Context {
            base,
            vocab,
            terms,
        })
    }

    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    pub fn vocab(&self) -> Option<&str> {
        self.vocab.as_deref()
    }

    /// Looks up the term's predicate IRI, accepting either a bare IRI or a
    /// structured form with `@id`.
    pub fn predicate_iri(&self, name: &str) -> Result<String, Error> {
        self.terms
            .get(name)
            .map(|def| def.id().to_string())
            .ok_or_else(|| Error::ContextItemNotFound {
                name: name.to_string(),
            })
    }

    /// Looks up a type IRI by exact name, then by capitalized name, then
    /// falls back to `@vocab + name` if `@vocab` is present. A term defined
    /// as a CURIE (`"User": "ex:User"`) is resolved against the context's
    /// own prefix term, matching the already-fully-expanded `@vocab`
    /// fallback instead of leaking the unresolved CURIE into the algebra.
    pub fn type_iri(&self, name: &str) -> Result<String, Error> {
        if let Some(def) = self.terms.get(name) {
            return Ok(self.resolve_curie(def.id()));
        }

        let capitalized = capitalize(name);
        if let Some(def) = self.terms.get(&capitalized) {
            return Ok(self.resolve_curie(def.id()));
        }

        if let Some(vocab) = &self.vocab {
            return Ok(format!("{}{}", vocab, name));
        }

        Err(Error::ContextItemNotFound {
            name: name.to_string(),
        })
    }

    /// Resolves `value` as a CURIE (`prefix:local`) against the context's
    /// own prefix terms, if it looks like one and the prefix is known.
    /// Absolute `http(s)://` IRIs and unresolvable CURIEs pass through
    /// unchanged.
    fn resolve_curie(&self, value: &str) -> String {
        if value.starts_with("http://") || value.starts_with("https://") {
            return value.to_string();
        }

        if let Some((prefix, local)) = value.split_once(':') {
            if let Some(TermDefinition::Iri(prefix_iri)) = self.terms.get(prefix) {
                return format!("{}{}", prefix_iri, local);
            }
        }

        value.to_string()
    }

    /// Expands `value` to an absolute IRI per the configured
    /// [`IriExpansion`] mode.
    pub fn expand_iri(&self, value: &str, mode: IriExpansion) -> String {
        if value.starts_with("http://") || value.starts_with("https://") {
            return value.to_string();
        }

        if mode == IriExpansion::Curie {
            if let Some((prefix, local)) = value.split_once(':') {
                if let Some(TermDefinition::Iri(prefix_iri)) = self.terms.get(prefix) {
                    return format!("{}{}", prefix_iri, local);
                }
            }
        }

        if let Some(base) = &self.base {
            let trimmed = base.trim_end_matches('/');
            format!("{}/{}", trimmed, value)
        } else {
            value.to_string()
        }
    }

    /// `true` iff the term's structured form carries `@type: @id`, or,
    /// failing that, the name appears in a small heuristic list of common
    /// relationship names.
    pub fn is_relationship(&self, name: &str) -> bool {
        if let Some(def) = self.terms.get(name) {
            if def.is_relationship() {
                return true;
            }
        }
        matches!(
            name,
            "author" | "product" | "reviews" | "review" | "reviewer" | "parent" | "children" | "owner"
        )
    }

    /// `true` iff the term is defined with `@container: @set`.
    pub fn is_container_set(&self, name: &str) -> bool {
        matches!(
            self.terms.get(name),
            Some(TermDefinition::Structured { container: Some(c), .. }) if c == "@set"
        )
    }

    /// The datatype IRI an explicit `@type` on this term's structured
    /// form demands for literal values, overriding the inference from
    /// GraphQL value kind. `None` for relationship terms (`@type: @id`)
    /// and bare-IRI terms.
    pub fn literal_datatype_override(&self, name: &str) -> Option<String> {
        match self.terms.get(name) {
            Some(TermDefinition::Structured {
                type_: Some(t), ..
            }) if t != "@id" => Some(t.clone()),
            _ => None,
        }
    }

    /// Returns the predicate IRI of `name`'s inverse relationship, if the
    /// bidirectional common-pairs table names one and the context defines
    /// it.
    pub fn inverse_of(&self, name: &str) -> Option<String> {
        let inverse_name = INVERSE_PAIRS.iter().find_map(|(a, b)| {
            if *a == name {
                Some(*b)
            } else if *b == name {
                Some(*a)
            } else {
                None
            }
        })?;
        self.predicate_iri(inverse_name).ok()
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
