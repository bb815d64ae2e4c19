//! SPARQL store backed by oxigraph.
//!
//! Serves two roles: the persistent knowledge graph (named graphs for the
//! registry, institution records, and provider facts), and throwaway
//! in-memory stores holding one dereferenced provider document each.
//! Every `update` runs in a single oxigraph transaction.

use std::io::Read;
use std::path::Path;

use oxigraph::io::{RdfFormat, RdfParser};
use oxigraph::model::NamedNode;
use oxigraph::sparql::QueryResults;
use oxigraph::store::Store;

use crate::error::GraphError;

use super::{Bindings, Fact, GraphResult, Object, query};

/// SPARQL-capable RDF store.
#[derive(Clone)]
pub struct SparqlStore {
    store: Store,
}

impl SparqlStore {
    /// Create a new in-memory store (no persistence).
    pub fn in_memory() -> GraphResult<Self> {
        let store = Store::new().map_err(|e| GraphError::Open {
            path: "<memory>".into(),
            message: e.to_string(),
        })?;
        Ok(Self { store })
    }

    /// Open or create a persistent store at the given path.
    pub fn open(path: &Path) -> GraphResult<Self> {
        std::fs::create_dir_all(path).map_err(|e| GraphError::Open {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let store = Store::open(path).map_err(|e| GraphError::Open {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { store })
    }

    /// Execute a SELECT query. Rows keep only IRI and literal bindings.
    pub fn select(&self, sparql: &str) -> GraphResult<Vec<Bindings>> {
        let results = self.store.query(sparql).map_err(|e| GraphError::Sparql {
            message: format!("SELECT failed: {e}"),
        })?;

        match results {
            QueryResults::Solutions(solutions) => {
                let mut rows = Vec::new();
                for solution in solutions {
                    let solution = solution.map_err(|e| GraphError::Sparql {
                        message: format!("solution error: {e}"),
                    })?;
                    let mut row = Bindings::default();
                    for (var, term) in solution.iter() {
                        if let Some(value) = Object::from_term(term) {
                            row.insert(var.as_str(), value);
                        }
                    }
                    rows.push(row);
                }
                Ok(rows)
            }
            _ => Err(GraphError::ResultShape {
                expected: "solutions from a SELECT query",
            }),
        }
    }

    /// Execute an ASK query.
    pub fn ask(&self, sparql: &str) -> GraphResult<bool> {
        let results = self.store.query(sparql).map_err(|e| GraphError::Sparql {
            message: format!("ASK failed: {e}"),
        })?;
        match results {
            QueryResults::Boolean(b) => Ok(b),
            _ => Err(GraphError::ResultShape {
                expected: "boolean from an ASK query",
            }),
        }
    }

    /// Execute a SPARQL update as one transaction.
    pub fn update(&self, sparql: &str) -> GraphResult<()> {
        self.store.update(sparql).map_err(|e| GraphError::Update {
            message: e.to_string(),
        })
    }

    /// Assert `facts` atomically. Returns how many were sent.
    pub fn insert_data(&self, facts: &[Fact]) -> GraphResult<usize> {
        if facts.is_empty() {
            return Ok(0);
        }
        let update = query::insert_data(facts);
        tracing::trace!(facts = facts.len(), %update, "insert data");
        self.update(&update)?;
        Ok(facts.len())
    }

    /// Parse an RDF document into `graph` (or the default graph).
    ///
    /// `base_iri` resolves relative IRIs, which RDF/XML responses often use.
    pub fn load(
        &self,
        format: RdfFormat,
        reader: impl Read,
        graph: Option<&NamedNode>,
        base_iri: Option<&str>,
    ) -> GraphResult<()> {
        let parse_err = |message: String| GraphError::Parse {
            format: format.name().to_string(),
            message,
        };
        let mut parser = RdfParser::from_format(format);
        if let Some(base) = base_iri {
            parser = parser
                .with_base_iri(base)
                .map_err(|e| parse_err(format!("invalid base IRI {base}: {e}")))?;
        }
        if let Some(graph) = graph {
            parser = parser.with_default_graph(graph.clone());
        }
        self.store
            .load_from_reader(parser, reader)
            .map_err(|e| parse_err(e.to_string()))
    }

    /// Total number of quads.
    pub fn len(&self) -> GraphResult<usize> {
        self.store.len().map_err(|e| GraphError::Sparql {
            message: format!("len failed: {e}"),
        })
    }

    pub fn is_empty(&self) -> GraphResult<bool> {
        self.len().map(|n| n == 0)
    }

    /// Number of `predicate` facts inside `graph`.
    pub fn count(&self, graph: &NamedNode, predicate: &NamedNode) -> GraphResult<usize> {
        let rows = self.select(&query::count_in_graph(graph, predicate))?;
        Ok(rows
            .first()
            .and_then(|row| row.text("count"))
            .and_then(|n| n.parse().ok())
            .unwrap_or(0))
    }
}

impl std::fmt::Debug for SparqlStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SparqlStore").finish()
    }
}

/// RDF format for a media type or a short name (`rdfxml`, `turtle`, `ntriples`, ...).
pub fn rdf_format(name_or_media_type: &str) -> Option<RdfFormat> {
    let media = name_or_media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if let Some(format) = RdfFormat::from_media_type(&media) {
        return Some(format);
    }
    match media.as_str() {
        "rdfxml" | "rdf/xml" | "xml" | "application/xml" | "text/xml" => Some(RdfFormat::RdfXml),
        "turtle" => Some(RdfFormat::Turtle),
        "ntriples" | "n-triples" => Some(RdfFormat::NTriples),
        "nquads" | "n-quads" => Some(RdfFormat::NQuads),
        "trig" => Some(RdfFormat::TriG),
        "n3" => Some(RdfFormat::N3),
        other => RdfFormat::from_extension(other),
    }
}
