//! SPARQL algebra: the subset of SPARQL 1.1 constructs this compiler
//! builds and the serializer turns into text. An algebra tree is built
//! once per compilation and consumed exactly once by the serializer.

/// One position of a triple/quad pattern.
#[derive(Clone, Debug, PartialEq)]
pub enum Term {
    Iri(String),
    Variable(String),
    Literal {
        lexical: String,
        /// `None` means the plain-literal / `xsd:string` form.
        datatype: Option<String>,
    },
}

impl Term {
    pub fn iri(s: impl Into<String>) -> Term {
        Term::Iri(s.into())
    }

    pub fn variable(s: impl Into<String>) -> Term {
        Term::Variable(s.into())
    }

    pub fn plain_literal(s: impl Into<String>) -> Term {
        Term::Literal {
            lexical: s.into(),
            datatype: None,
        }
    }

    pub fn typed_literal(lexical: impl Into<String>, datatype: impl Into<String>) -> Term {
        Term::Literal {
            lexical: lexical.into(),
            datatype: Some(datatype.into()),
        }
    }
}

/// A triple (or quad, when `graph` is set) pattern.
#[derive(Clone, Debug, PartialEq)]
pub struct Pattern {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
    pub graph: Option<Term>,
}

impl Pattern {
    pub fn triple(subject: Term, predicate: Term, object: Term) -> Pattern {
        Pattern {
            subject,
            predicate,
            object,
            graph: None,
        }
    }
}

/// A Basic Graph Pattern: a conjunction of triple patterns.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Bgp(pub Vec<Pattern>);

impl Bgp {
    pub fn new(patterns: Vec<Pattern>) -> Bgp {
        Bgp(patterns)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.0
    }

    /// Every variable appearing in any pattern of this BGP.
    pub fn variables(&self) -> Vec<String> {
        let mut vars = Vec::new();
        for pattern in &self.0 {
            for term in [&pattern.subject, &pattern.predicate, &pattern.object] {
                if let Term::Variable(name) = term {
                    if !vars.contains(name) {
                        vars.push(name.clone());
                    }
                }
            }
        }
        vars
    }
}

/// A unified SPARQL 1.1 update node. Serializes to `INSERT DATA`,
/// `DELETE ... WHERE`, or `DELETE ... INSERT ... WHERE` depending on
/// which parts are present; see the serializer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeleteInsert {
    pub delete: Option<Bgp>,
    pub insert: Option<Bgp>,
    pub where_clause: Option<Bgp>,
}

/// A sequence of updates, serialized separated by `;`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompositeUpdate(pub Vec<DeleteInsert>);

impl CompositeUpdate {
    pub fn new(updates: Vec<DeleteInsert>) -> CompositeUpdate {
        CompositeUpdate(updates)
    }
}

/// A SPARQL SELECT: a projection of variables over a BGP, with an
/// optional result limit.
#[derive(Clone, Debug, PartialEq)]
pub struct Project {
    pub variables: Vec<String>,
    pub pattern: Bgp,
    pub limit: Option<usize>,
}
