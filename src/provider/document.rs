//! A dereferenced provider response, parsed into a scratch RDF store.

use oxigraph::io::RdfFormat;
use oxigraph::model::NamedNode;

use crate::config::ProviderVocabulary;
use crate::graph::{GraphResult, Object, SparqlStore, iri, query};

/// An author record as the provider describes it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalAuthorRecord {
    pub uri: NamedNode,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub affiliations: Vec<String>,
}

/// Provider predicates, validated once.
#[derive(Debug, Clone)]
pub struct ProviderTerms {
    pub member: NamedNode,
    pub given_name: NamedNode,
    pub surname: NamedNode,
    pub affiliation: NamedNode,
    pub label: NamedNode,
    pub title: NamedNode,
}

impl ProviderTerms {
    pub fn from_vocabulary(vocab: &ProviderVocabulary) -> GraphResult<Self> {
        Ok(Self {
            member: iri(&vocab.member)?,
            given_name: iri(&vocab.given_name)?,
            surname: iri(&vocab.surname)?,
            affiliation: iri(&vocab.affiliation)?,
            label: iri(&vocab.label)?,
            title: iri(&vocab.title)?,
        })
    }
}

/// One provider response, queryable with SPARQL.
#[derive(Debug)]
pub struct ProviderDocument {
    store: SparqlStore,
}

impl ProviderDocument {
    /// Parse `body` in `format`, resolving relative IRIs against `base_iri`.
    pub fn parse(body: &[u8], format: RdfFormat, base_iri: &str) -> GraphResult<Self> {
        let store = SparqlStore::in_memory()?;
        store.load(format, body, None, Some(base_iri))?;
        Ok(Self { store })
    }

    /// Distinct `member` objects of the search result.
    pub fn members(&self, terms: &ProviderTerms) -> GraphResult<Vec<NamedNode>> {
        let rows = self.store.select(&query::objects_of(&terms.member))?;
        Ok(rows.iter().filter_map(|r| r.iri("object").cloned()).collect())
    }

    /// Names and affiliation labels of `author`.
    pub fn author_record(
        &self,
        author: &NamedNode,
        terms: &ProviderTerms,
    ) -> GraphResult<ExternalAuthorRecord> {
        let names = self
            .store
            .select(&query::person_names(author, &terms.given_name, &terms.surname))?;
        let row = names.first();
        let given_name = row.and_then(|r| r.text("given")).map(str::to_string);
        let family_name = row.and_then(|r| r.text("surname")).map(str::to_string);

        let affiliations = self
            .store
            .select(&query::affiliation_labels(author, &terms.affiliation, &terms.label))?
            .iter()
            .filter_map(|r| r.text("label").map(str::to_string))
            .collect();

        Ok(ExternalAuthorRecord {
            uri: author.clone(),
            given_name,
            family_name,
            affiliations,
        })
    }

    /// Publications in the response with their title text.
    ///
    /// A publication with several titles is reported once, titles joined.
    pub fn publications(&self, terms: &ProviderTerms) -> GraphResult<Vec<(NamedNode, String)>> {
        let rows = self.store.select(&query::titled_subjects(&terms.title))?;
        let mut out: Vec<(NamedNode, String)> = Vec::new();
        for row in &rows {
            let (Some(subject), Some(title)) = (row.iri("subject"), row.text("title")) else {
                continue;
            };
            match out.last_mut() {
                Some((last, text)) if last == subject => {
                    text.push(' ');
                    text.push_str(title);
                }
                _ => out.push((subject.clone(), title.to_string())),
            }
        }
        Ok(out)
    }

    /// Every outgoing `(property, value)` of `subject` in the response.
    pub fn outgoing(&self, subject: &NamedNode) -> GraphResult<Vec<(NamedNode, Object)>> {
        let rows = self.store.select(&query::outgoing(subject))?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let property = row.iri("property")?.clone();
                let value = row.get("value")?.clone();
                Some((property, value))
            })
            .collect())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Turtle shaped like a provider author search with one hit.
    pub(crate) const ONE_MEMBER: &str = r#"
@prefix foaf: <http://xmlns.com/foaf/0.1/> .
@prefix sv: <http://www.elsevier.com/xml/svapi/rdf/dtd/> .
@prefix skos: <http://www.w3.org/2004/02/skos/core#> .
@prefix dc: <http://purl.org/dc/elements/1.1/> .

<https://provider.example/search/1> foaf:member <https://provider.example/author/42> .
<https://provider.example/author/42> sv:givenName "Victor" ;
    sv:surname "Saquicela" ;
    sv:affiliation <https://provider.example/affiliation/7> .
<https://provider.example/affiliation/7> skos:prefLabel "Universidad de Cuenca, Ecuador" .
<https://provider.example/pub/1> dc:title "Semantic web services annotation" ;
    <http://purl.org/dc/terms/publisher> <https://provider.example/publisher/9> .
<https://provider.example/publisher/9> skos:prefLabel "IEEE" ;
    <https://provider.example/vocab/country> <https://provider.example/country/us> .
<https://provider.example/country/us> skos:prefLabel "United States" .
"#;

    fn terms() -> ProviderTerms {
        ProviderTerms::from_vocabulary(&ProviderVocabulary::default()).unwrap()
    }

    fn doc(ttl: &str) -> ProviderDocument {
        ProviderDocument::parse(ttl.as_bytes(), RdfFormat::Turtle, "https://provider.example/").unwrap()
    }

    #[test]
    fn single_member_and_record() {
        let d = doc(ONE_MEMBER);
        let members = d.members(&terms()).unwrap();
        assert_eq!(members.len(), 1);

        let record = d.author_record(&members[0], &terms()).unwrap();
        assert_eq!(record.given_name.as_deref(), Some("Victor"));
        assert_eq!(record.family_name.as_deref(), Some("Saquicela"));
        assert_eq!(record.affiliations, vec!["Universidad de Cuenca, Ecuador".to_string()]);
    }

    #[test]
    fn literal_affiliations_are_labels() {
        let d = doc(
            r#"<https://p.example/a> <http://www.elsevier.com/xml/svapi/rdf/dtd/affiliation> "ESPOL" ."#,
        );
        let record = d
            .author_record(&iri("https://p.example/a").unwrap(), &terms())
            .unwrap();
        assert_eq!(record.affiliations, vec!["ESPOL".to_string()]);
        assert_eq!(record.given_name, None);
    }

    #[test]
    fn publications_and_outgoing() {
        let d = doc(ONE_MEMBER);
        let pubs = d.publications(&terms()).unwrap();
        assert_eq!(pubs.len(), 1);
        assert_eq!(pubs[0].1, "Semantic web services annotation");

        let out = d.outgoing(&pubs[0].0).unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn relative_iris_resolve_against_base() {
        let d = doc("<author/1> <http://xmlns.com/foaf/0.1/member> <author/2> .");
        let members = d.members(&terms()).unwrap();
        assert_eq!(members[0].as_str(), "https://provider.example/author/2");
    }
}
