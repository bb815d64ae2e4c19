//! External bibliographic provider access.
//!
//! [`ProviderClient::search`] resolves one candidate query:
//!
//! 1. skip without a network call if the query was attempted in an earlier
//!    run (attempt marker `<query> owl:oneOf <author>` in the provider graph),
//! 2. dereference the query URL through a [`Dereferencer`],
//! 3. accept the result only if it has exactly one `member`,
//! 4. record the attempt marker once the provider answered. A usable
//!    candidate hands its marker back to the caller instead, to be committed
//!    together with the merge.
//!
//! Provider trouble never fails the author: it becomes "no usable match for
//! this variant" and the caller moves on to the next one.

pub mod document;
pub mod http;
pub mod query;

use oxigraph::io::RdfFormat;
use oxigraph::model::NamedNode;

use crate::config::{JobConfig, ProviderConfig};
use crate::error::{GraphError, ProviderError};
use crate::graph::query::{Slot, ask_in_graph};
use crate::graph::store::rdf_format;
use crate::graph::{Fact, SparqlStore, iri};
use crate::vocab;

use document::{ExternalAuthorRecord, ProviderDocument, ProviderTerms};
use query::CandidateQuery;

/// Result type for provider operations.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// A raw provider answer.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Resolves a URL to a linked-data document.
///
/// Implementations must bound the time a call can take.
pub trait Dereferencer: Send + Sync {
    fn dereference(&self, url: &str) -> ProviderResult<ProviderResponse>;
}

/// What one candidate query produced.
#[derive(Debug)]
pub enum SearchOutcome {
    /// Attempted in an earlier run; no network call was made.
    AlreadyAttempted,
    /// The provider failed in a way a later run may not repeat.
    Unavailable(ProviderError),
    /// The provider answered, but not with exactly one member.
    NoUsableCandidate { members: usize },
    /// Exactly one member. The attempt marker is not yet written.
    Candidate {
        document: ProviderDocument,
        record: ExternalAuthorRecord,
        attempt: Fact,
    },
}

/// Client for one configured provider.
pub struct ProviderClient {
    name: String,
    graph: NamedNode,
    default_format: RdfFormat,
    terms: ProviderTerms,
    one_of: NamedNode,
    dereferencer: Box<dyn Dereferencer>,
}

impl ProviderClient {
    pub fn new(config: &JobConfig, dereferencer: Box<dyn Dereferencer>) -> ProviderResult<Self> {
        let provider: &ProviderConfig = &config.provider;
        let default_format =
            rdf_format(&provider.default_format).ok_or_else(|| ProviderError::Malformed {
                url: provider.search_url.clone(),
                message: format!("unknown default_format `{}`", provider.default_format),
            })?;
        Ok(Self {
            name: provider.name.clone(),
            graph: iri(&config.provider_graph())?,
            default_format,
            terms: ProviderTerms::from_vocabulary(&provider.vocabulary)?,
            one_of: iri(vocab::OWL_ONE_OF)?,
            dereferencer,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Named graph holding this provider's facts and markers.
    pub fn graph(&self) -> &NamedNode {
        &self.graph
    }

    pub fn terms(&self) -> &ProviderTerms {
        &self.terms
    }

    /// The attempt marker for `query` on behalf of `author`.
    pub fn attempt_marker(&self, query: &CandidateQuery, author: &NamedNode) -> Result<Fact, GraphError> {
        Ok(Fact::new(
            self.graph.clone(),
            iri(&query.url)?,
            self.one_of.clone(),
            author.clone(),
        ))
    }

    /// Whether `query` was already attempted in an earlier run.
    pub fn already_attempted(&self, graph: &SparqlStore, query: &CandidateQuery) -> Result<bool, GraphError> {
        let subject = iri(&query.url)?;
        graph.ask(&ask_in_graph(
            &self.graph,
            Slot::Iri(&subject),
            Slot::Iri(&self.one_of),
            Slot::Var("author"),
        ))
    }

    /// Resolve one candidate query for `author`.
    ///
    /// Errors are graph-store failures only; provider failures are folded
    /// into [`SearchOutcome::Unavailable`] or `NoUsableCandidate`.
    pub fn search(
        &self,
        graph: &SparqlStore,
        author: &NamedNode,
        query: &CandidateQuery,
        process_all: bool,
    ) -> ProviderResult<SearchOutcome> {
        if !process_all && self.already_attempted(graph, query)? {
            tracing::debug!(url = %query.url, "query already attempted, skipping");
            return Ok(SearchOutcome::AlreadyAttempted);
        }

        let fetched = self
            .dereferencer
            .dereference(&query.url)
            .and_then(|response| {
                if (200..300).contains(&response.status) {
                    Ok(response)
                } else {
                    Err(ProviderError::Status {
                        url: query.url.clone(),
                        status: response.status,
                    })
                }
            });
        let response = match fetched {
            Ok(response) => response,
            Err(e) if e.is_transient() => {
                tracing::warn!(error = %e, provider = %self.name, "provider unavailable for variant");
                return Ok(SearchOutcome::Unavailable(e));
            }
            Err(e) => {
                tracing::warn!(error = %e, provider = %self.name, "provider rejected query");
                graph.insert_data(&[self.attempt_marker(query, author)?])?;
                return Ok(SearchOutcome::NoUsableCandidate { members: 0 });
            }
        };

        let format = response
            .content_type
            .as_deref()
            .and_then(rdf_format)
            .unwrap_or(self.default_format);
        let document = match ProviderDocument::parse(&response.body, format, &query.url) {
            Ok(doc) => doc,
            Err(e) => {
                let e = ProviderError::Malformed {
                    url: query.url.clone(),
                    message: e.to_string(),
                };
                tracing::warn!(error = %e, provider = %self.name, "unreadable provider response");
                return Ok(SearchOutcome::Unavailable(e));
            }
        };

        let attempt = self.attempt_marker(query, author)?;
        let members = document.members(&self.terms)?;
        if members.len() != 1 {
            graph.insert_data(&[attempt])?;
            tracing::info!(
                url = %query.url,
                members = members.len(),
                "search did not yield exactly one author"
            );
            return Ok(SearchOutcome::NoUsableCandidate {
                members: members.len(),
            });
        }

        let record = document.author_record(&members[0], &self.terms)?;
        Ok(SearchOutcome::Candidate {
            document,
            record,
            attempt,
        })
    }
}

impl std::fmt::Debug for ProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderClient")
            .field("name", &self.name)
            .field("graph", &self.graph)
            .finish()
    }
}
