//! IRIs used by the reconciliation pipeline.

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

pub const OWL_SAME_AS: &str = "http://www.w3.org/2002/07/owl#sameAs";
/// Attempt markers: `<search-url> owl:oneOf <local-author>`.
pub const OWL_ONE_OF: &str = "http://www.w3.org/2002/07/owl#oneOf";

pub const FOAF_PERSON: &str = "http://xmlns.com/foaf/0.1/Person";
pub const FOAF_FIRST_NAME: &str = "http://xmlns.com/foaf/0.1/firstName";
pub const FOAF_LAST_NAME: &str = "http://xmlns.com/foaf/0.1/lastName";
pub const FOAF_MEMBER: &str = "http://xmlns.com/foaf/0.1/member";

pub const DCT_CONTRIBUTOR: &str = "http://purl.org/dc/terms/contributor";
pub const DCT_CREATOR: &str = "http://purl.org/dc/terms/creator";
pub const DCT_SUBJECT: &str = "http://purl.org/dc/terms/subject";
pub const DCT_PROVENANCE: &str = "http://purl.org/dc/terms/provenance";
pub const DC_TITLE: &str = "http://purl.org/dc/elements/1.1/title";

pub const SKOS_PREF_LABEL: &str = "http://www.w3.org/2004/02/skos/core#prefLabel";

pub const SCOPUS_GIVEN_NAME: &str = "http://www.elsevier.com/xml/svapi/rdf/dtd/givenName";
pub const SCOPUS_SURNAME: &str = "http://www.elsevier.com/xml/svapi/rdf/dtd/surname";
pub const SCOPUS_AFFILIATION: &str = "http://www.elsevier.com/xml/svapi/rdf/dtd/affiliation";

/// Namespace for authlink's own terms.
pub const AUTHLINK_NS: &str = "https://authlink.dev/ns#";
/// Processed marker: `<local-author> authlink:processedBy <provider-graph>`.
pub const PROCESSED_BY: &str = "https://authlink.dev/ns#processedBy";
/// Full institution name on endpoint records.
pub const FULL_NAME: &str = "https://authlink.dev/ns#fullName";

pub const DEFAULT_AUTHORS_GRAPH: &str = "https://authlink.dev/graph/authors";
pub const DEFAULT_ENDPOINTS_GRAPH: &str = "https://authlink.dev/graph/endpoints";
pub const DEFAULT_PROVIDER_GRAPH_BASE: &str = "https://authlink.dev/graph/provider";
