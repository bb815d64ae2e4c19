//! Knowledge-graph access: fact model, SPARQL builder, and the store.
//!
//! Terms are oxigraph's validated `NamedNode`/`Literal` types, so every IRI
//! and literal that reaches a query string has been checked and is rendered
//! with proper escaping. Blank nodes and unbound variables are decided once,
//! at the store boundary, to be absent (`None`).

pub mod query;
pub mod store;

use std::collections::HashMap;
use std::fmt;

use oxigraph::model::{Literal, NamedNode, Term};

use crate::error::GraphError;

pub use store::SparqlStore;

/// Result type for graph operations.
pub type GraphResult<T> = std::result::Result<T, GraphError>;

/// Parse and validate an IRI.
pub fn iri(value: &str) -> GraphResult<NamedNode> {
    NamedNode::new(value).map_err(|e| GraphError::InvalidIri {
        iri: value.to_string(),
        message: e.to_string(),
    })
}

/// Object position of a fact: an IRI or a literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Object {
    Iri(NamedNode),
    Literal(Literal),
}

impl Object {
    /// Convert a store term. Blank nodes (and quoted triples) have no stable
    /// identity across stores and map to `None`.
    pub fn from_term(term: &Term) -> Option<Self> {
        match term {
            Term::NamedNode(n) => Some(Self::Iri(n.clone())),
            Term::Literal(l) => Some(Self::Literal(l.clone())),
            _ => None,
        }
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(Literal::new_simple_literal(value))
    }

    pub fn as_iri(&self) -> Option<&NamedNode> {
        match self {
            Self::Iri(n) => Some(n),
            Self::Literal(_) => None,
        }
    }

    /// The IRI string or the literal's lexical value.
    pub fn lexical(&self) -> &str {
        match self {
            Self::Iri(n) => n.as_str(),
            Self::Literal(l) => l.value(),
        }
    }
}

impl From<NamedNode> for Object {
    fn from(node: NamedNode) -> Self {
        Self::Iri(node)
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iri(n) => write!(f, "{n}"),
            Self::Literal(l) => write!(f, "{l}"),
        }
    }
}

/// A fact destined for a named graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fact {
    pub graph: NamedNode,
    pub subject: NamedNode,
    pub predicate: NamedNode,
    pub object: Object,
}

impl Fact {
    pub fn new(
        graph: NamedNode,
        subject: NamedNode,
        predicate: NamedNode,
        object: impl Into<Object>,
    ) -> Self {
        Self {
            graph,
            subject,
            predicate,
            object: object.into(),
        }
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}

/// One solution row. Unbound variables and blank nodes are absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    values: HashMap<String, Object>,
}

impl Bindings {
    pub fn insert(&mut self, var: impl Into<String>, value: Object) {
        self.values.insert(var.into(), value);
    }

    pub fn get(&self, var: &str) -> Option<&Object> {
        self.values.get(var)
    }

    pub fn iri(&self, var: &str) -> Option<&NamedNode> {
        self.get(var).and_then(Object::as_iri)
    }

    /// Lexical value of the binding, trimmed; empty strings count as absent.
    pub fn text(&self, var: &str) -> Option<&str> {
        self.get(var)
            .map(|o| o.lexical().trim())
            .filter(|s| !s.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
