//! Read-only views of the local registry graphs.
//!
//! Authors are loaded once per run into an immutable snapshot; workers only
//! ever see `&[LocalAuthor]`.

use oxigraph::model::NamedNode;

use crate::config::{GraphsConfig, MatchingConfig};
use crate::graph::{GraphResult, SparqlStore, iri, query};
use crate::vocab;

/// A researcher from the local registry.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalAuthor {
    pub uri: NamedNode,
    pub first_name: String,
    pub last_name: String,
    /// Topical keywords, sorted and distinct.
    pub keywords: Vec<String>,
    pub provenance: Option<String>,
}

impl LocalAuthor {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// All persons of the authors graph, with their keywords, ordered by IRI.
///
/// Persons missing either name are skipped with a warning.
pub fn load_local_authors(store: &SparqlStore, graphs: &GraphsConfig) -> GraphResult<Vec<LocalAuthor>> {
    let graph = iri(&graphs.authors)?;
    let rows = store.select(&query::local_authors(&graph))?;

    let mut authors: Vec<LocalAuthor> = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(uri) = row.iri("subject").cloned() else {
            continue;
        };
        // One row per name combination; keep the first.
        if authors.last().is_some_and(|a| a.uri == uri) {
            continue;
        }
        let (Some(first), Some(last)) = (row.text("fname"), row.text("lname")) else {
            tracing::warn!(author = %uri, "registry author without a usable name, skipping");
            continue;
        };
        let keywords = author_keywords(store, &graph, &uri)?;
        authors.push(LocalAuthor {
            first_name: first.to_string(),
            last_name: last.to_string(),
            provenance: row.text("provenance").map(str::to_string),
            keywords,
            uri,
        });
    }

    tracing::info!(authors = authors.len(), graph = %graph, "loaded local authors");
    Ok(authors)
}

fn author_keywords(store: &SparqlStore, graph: &NamedNode, author: &NamedNode) -> GraphResult<Vec<String>> {
    let rows = store.select(&query::author_keywords(graph, author))?;
    let mut keywords: Vec<String> = rows
        .iter()
        .filter_map(|r| r.text("keyword").map(str::to_string))
        .collect();
    keywords.sort();
    keywords.dedup();
    Ok(keywords)
}

/// Institution full names: those in the endpoints graph plus configured ones.
pub fn load_institutions(
    store: &SparqlStore,
    graphs: &GraphsConfig,
    matching: &MatchingConfig,
) -> GraphResult<Vec<String>> {
    let graph = iri(&graphs.endpoints)?;
    let full_name = iri(vocab::FULL_NAME)?;
    let mut names: Vec<String> = store
        .select(&query::literal_values(&graph, &full_name))?
        .iter()
        .filter_map(|r| r.text("value").map(str::to_string))
        .collect();

    for name in &matching.known_institutions {
        let name = name.trim();
        if !name.is_empty() && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use oxigraph::io::RdfFormat;

    use super::*;

    const REGISTRY: &str = r#"
@prefix foaf: <http://xmlns.com/foaf/0.1/> .
@prefix dct: <http://purl.org/dc/terms/> .
@prefix rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#> .

<https://registry.example/author/2> a foaf:Person ;
    foaf:firstName "Mauricio" ;
    foaf:lastName "Espinoza" .

<https://registry.example/author/1> a foaf:Person ;
    foaf:firstName "Victor Hugo" ;
    foaf:lastName "Saquicela Galarza" ;
    dct:provenance "https://registry.example/endpoint/ucuenca" ;
    dct:subject "semantic web" .

<https://registry.example/pub/1> dct:creator <https://registry.example/author/1> ;
    dct:subject "linked data" , "semantic web" .

<https://registry.example/author/3> a foaf:Person ;
    foaf:firstName "   " ;
    foaf:lastName "Nameless" .
"#;

    fn store() -> SparqlStore {
        let store = SparqlStore::in_memory().unwrap();
        let graphs = GraphsConfig::default();
        store
            .load(
                RdfFormat::Turtle,
                REGISTRY.as_bytes(),
                Some(&iri(&graphs.authors).unwrap()),
                None,
            )
            .unwrap();
        store
    }

    #[test]
    fn authors_are_ordered_with_keywords() {
        let authors = load_local_authors(&store(), &GraphsConfig::default()).unwrap();
        assert_eq!(authors.len(), 2);
        assert_eq!(authors[0].uri.as_str(), "https://registry.example/author/1");
        assert_eq!(authors[0].last_name, "Saquicela Galarza");
        assert_eq!(authors[0].keywords, vec!["linked data", "semantic web"]);
        assert_eq!(
            authors[0].provenance.as_deref(),
            Some("https://registry.example/endpoint/ucuenca")
        );
        assert!(authors[1].keywords.is_empty());
        assert_eq!(authors[1].provenance, None);
    }

    #[test]
    fn institutions_merge_graph_and_config() {
        let store = store();
        let graphs = GraphsConfig::default();
        store
            .load(
                RdfFormat::Turtle,
                r#"<https://registry.example/endpoint/ucuenca> <https://authlink.dev/ns#fullName> "Universidad de Cuenca" ."#
                    .as_bytes(),
                Some(&iri(&graphs.endpoints).unwrap()),
                None,
            )
            .unwrap();
        let matching = MatchingConfig {
            known_institutions: vec!["Universidad de Cuenca".into(), "ESPOL".into()],
            ..Default::default()
        };
        let names = load_institutions(&store, &graphs, &matching).unwrap();
        assert_eq!(names, vec!["Universidad de Cuenca", "ESPOL"]);
    }
}
