//! SPARQL text builders.
//!
//! Values enter queries only as [`NamedNode`] or [`Object`], whose `Display`
//! output is valid, escaped SPARQL syntax. Variable names are fixed by the
//! builders themselves.

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

use oxigraph::model::NamedNode;

use super::{Fact, Object};

/// One position of a triple pattern.
#[derive(Debug, Clone, Copy)]
pub enum Slot<'a> {
    Var(&'static str),
    Iri(&'a NamedNode),
    Value(&'a Object),
}

impl fmt::Display for Slot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Var(name) => write!(f, "?{name}"),
            Slot::Iri(n) => write!(f, "{n}"),
            Slot::Value(o) => write!(f, "{o}"),
        }
    }
}

/// `ASK { GRAPH <g> { s p o } }`
pub fn ask_in_graph(graph: &NamedNode, s: Slot<'_>, p: Slot<'_>, o: Slot<'_>) -> String {
    format!("ASK {{ GRAPH {graph} {{ {s} {p} {o} }} }}")
}

/// `INSERT DATA` for all facts, grouped per named graph, in input order.
pub fn insert_data(facts: &[Fact]) -> String {
    let mut by_graph: BTreeMap<&str, Vec<&Fact>> = BTreeMap::new();
    for fact in facts {
        by_graph.entry(fact.graph.as_str()).or_default().push(fact);
    }

    let mut out = String::from("INSERT DATA {\n");
    for group in by_graph.values() {
        let graph = &group[0].graph;
        let _ = writeln!(out, "  GRAPH {graph} {{");
        for fact in group {
            let _ = writeln!(out, "    {fact}");
        }
        out.push_str("  }\n");
    }
    out.push('}');
    out
}

/// Local authors of the registry graph, ordered by IRI.
pub fn local_authors(graph: &NamedNode) -> String {
    format!(
        "SELECT ?subject ?fname ?lname ?provenance WHERE {{ GRAPH {graph} {{ \
         ?subject <{rdf_type}> <{person}> ; <{first}> ?fname ; <{last}> ?lname . \
         OPTIONAL {{ ?subject <{prov}> ?provenance }} }} }} ORDER BY ?subject",
        rdf_type = crate::vocab::RDF_TYPE,
        person = crate::vocab::FOAF_PERSON,
        first = crate::vocab::FOAF_FIRST_NAME,
        last = crate::vocab::FOAF_LAST_NAME,
        prov = crate::vocab::DCT_PROVENANCE,
    )
}

/// Keyword literals of an author: their own subjects plus the subjects of
/// publications they created.
pub fn author_keywords(graph: &NamedNode, author: &NamedNode) -> String {
    format!(
        "SELECT DISTINCT ?keyword WHERE {{ GRAPH {graph} {{ \
         {{ {author} <{subject}> ?keyword }} UNION \
         {{ ?publication <{creator}> {author} . ?publication <{subject}> ?keyword }} \
         FILTER(isLiteral(?keyword)) }} }} ORDER BY ?keyword",
        subject = crate::vocab::DCT_SUBJECT,
        creator = crate::vocab::DCT_CREATOR,
    )
}

/// Distinct literal values of `predicate` anywhere in `graph`.
pub fn literal_values(graph: &NamedNode, predicate: &NamedNode) -> String {
    format!(
        "SELECT DISTINCT ?value WHERE {{ GRAPH {graph} {{ ?s {predicate} ?value \
         FILTER(isLiteral(?value)) }} }} ORDER BY ?value"
    )
}

/// Number of `?s predicate ?o` facts in `graph`.
pub fn count_in_graph(graph: &NamedNode, predicate: &NamedNode) -> String {
    format!("SELECT (COUNT(*) AS ?count) WHERE {{ GRAPH {graph} {{ ?s {predicate} ?o }} }}")
}

// -- provider documents (default graph of a scratch store) ------------------

/// Distinct objects of `predicate`.
pub fn objects_of(predicate: &NamedNode) -> String {
    format!("SELECT DISTINCT ?object WHERE {{ ?subject {predicate} ?object }} ORDER BY ?object")
}

/// Given name and surname of a person resource.
pub fn person_names(person: &NamedNode, given: &NamedNode, surname: &NamedNode) -> String {
    format!(
        "SELECT ?given ?surname WHERE {{ \
         OPTIONAL {{ {person} {given} ?given }} \
         OPTIONAL {{ {person} {surname} ?surname }} }} LIMIT 1"
    )
}

/// Affiliation labels: the label of each affiliation resource, or the
/// affiliation itself when it is a literal.
pub fn affiliation_labels(person: &NamedNode, affiliation: &NamedNode, label: &NamedNode) -> String {
    format!(
        "SELECT DISTINCT ?label WHERE {{ \
         {{ {person} {affiliation} ?org . ?org {label} ?label }} UNION \
         {{ {person} {affiliation} ?label FILTER(isLiteral(?label)) }} }} ORDER BY ?label"
    )
}

/// Subjects carrying `title`, with the title text.
pub fn titled_subjects(title: &NamedNode) -> String {
    format!("SELECT ?subject ?title WHERE {{ ?subject {title} ?title }} ORDER BY ?subject ?title")
}

/// Every outgoing `(property, value)` of `subject`.
pub fn outgoing(subject: &NamedNode) -> String {
    format!("SELECT ?property ?value WHERE {{ {subject} ?property ?value }}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::iri;

    #[test]
    fn ask_renders_slots() {
        let g = iri("https://example.org/g").unwrap();
        let p = iri("https://example.org/p").unwrap();
        let o = Object::literal("x");
        let q = ask_in_graph(&g, Slot::Var("s"), Slot::Iri(&p), Slot::Value(&o));
        assert_eq!(
            q,
            "ASK { GRAPH <https://example.org/g> { ?s <https://example.org/p> \"x\" } }"
        );
    }

    #[test]
    fn insert_data_groups_by_graph() {
        let g1 = iri("https://example.org/g1").unwrap();
        let g2 = iri("https://example.org/g2").unwrap();
        let s = iri("https://example.org/s").unwrap();
        let p = iri("https://example.org/p").unwrap();
        let facts = vec![
            Fact::new(g1.clone(), s.clone(), p.clone(), Object::literal("a")),
            Fact::new(g2, s.clone(), p.clone(), Object::literal("b")),
            Fact::new(g1, s, p, Object::literal("c")),
        ];
        let q = insert_data(&facts);
        assert_eq!(q.matches("GRAPH").count(), 2);
        assert!(q.find("\"a\"").unwrap() < q.find("\"c\"").unwrap());
    }

    #[test]
    fn literal_injection_stays_inside_the_literal() {
        let g = iri("https://example.org/g").unwrap();
        let s = iri("https://example.org/s").unwrap();
        let p = iri("https://example.org/p").unwrap();
        let hostile = Object::literal("x\" } } ; DROP ALL ; INSERT DATA { <a> <b> \"c");
        let q = insert_data(&[Fact::new(g, s, p, hostile)]);
        // The only unescaped quote pair is the literal's own delimiters.
        assert!(q.contains("\\\" } }"));
    }
}
