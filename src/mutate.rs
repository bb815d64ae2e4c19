//! Transactional enrichment of the provider graph.
//!
//! A verified match is turned into an [`EnrichmentPlan`] first; nothing is
//! written until [`GraphMutator::commit`] sends the whole plan as a single
//! `INSERT DATA`. The plan carries the processed marker and the attempt
//! marker of the query that found the match, so a failure while planning or
//! committing (or an exit before the commit) leaves the graph exactly as it
//! was and the next run sends that query again.

use std::collections::HashSet;

use oxigraph::model::NamedNode;

use crate::error::{GraphError, MutationError};
use crate::graph::query::{Slot, ask_in_graph};
use crate::graph::{Fact, GraphResult, Object, SparqlStore, iri};
use crate::matching::RelevanceGate;
use crate::provider::document::{ExternalAuthorRecord, ProviderDocument, ProviderTerms};
use crate::registry::LocalAuthor;
use crate::vocab;

pub type MutationResult<T> = std::result::Result<T, MutationError>;

/// Facts to assert for one author, deduplicated, in assembly order.
#[derive(Debug, Clone)]
pub struct EnrichmentPlan {
    pub author: NamedNode,
    pub facts: Vec<Fact>,
    /// Publications that passed the relevance gate.
    pub publications: usize,
    /// Publications the gate filtered out.
    pub filtered: usize,
}

impl EnrichmentPlan {
    /// Add a marker fact to be committed with the enrichment.
    pub fn with_marker(mut self, fact: Fact) -> Self {
        if !self.facts.contains(&fact) {
            self.facts.push(fact);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

/// Ordered, duplicate-free fact accumulator.
#[derive(Default)]
struct FactSet {
    seen: HashSet<Fact>,
    facts: Vec<Fact>,
}

impl FactSet {
    fn push(&mut self, fact: Fact) {
        if self.seen.insert(fact.clone()) {
            self.facts.push(fact);
        }
    }
}

/// Builds and commits enrichment plans into one provider graph.
#[derive(Debug, Clone)]
pub struct GraphMutator {
    store: SparqlStore,
    graph: NamedNode,
    terms: ProviderTerms,
    same_as: NamedNode,
    contributor: NamedNode,
    processed_by: NamedNode,
    fact_limit: usize,
}

impl GraphMutator {
    pub fn new(store: SparqlStore, graph: NamedNode, terms: ProviderTerms) -> GraphResult<Self> {
        Ok(Self {
            store,
            graph,
            terms,
            same_as: iri(vocab::OWL_SAME_AS)?,
            contributor: iri(vocab::DCT_CONTRIBUTOR)?,
            processed_by: iri(vocab::PROCESSED_BY)?,
            fact_limit: usize::MAX,
        })
    }

    /// Refuse plans with more than `limit` facts.
    pub fn with_fact_limit(mut self, limit: usize) -> Self {
        self.fact_limit = limit;
        self
    }

    /// `<author> authlink:processedBy <provider-graph>`.
    pub fn processed_marker(&self, author: &NamedNode) -> Fact {
        Fact::new(
            self.graph.clone(),
            author.clone(),
            self.processed_by.clone(),
            self.graph.clone(),
        )
    }

    /// Whether `author` was completed against this provider in an earlier run.
    pub fn is_processed(&self, author: &NamedNode) -> GraphResult<bool> {
        self.store.ask(&ask_in_graph(
            &self.graph,
            Slot::Iri(author),
            Slot::Iri(&self.processed_by),
            Slot::Iri(&self.graph),
        ))
    }

    /// Record that `author` was handled without a merge.
    pub fn mark_processed(&self, author: &NamedNode) -> GraphResult<()> {
        self.store.insert_data(&[self.processed_marker(author)])?;
        Ok(())
    }

    /// Record a rejected candidate: its attempt marker and, when `processed`,
    /// the processed marker, in one update.
    pub fn record_rejection(&self, author: &NamedNode, attempt: Fact, processed: bool) -> GraphResult<()> {
        let mut facts = vec![attempt];
        if processed {
            facts.push(self.processed_marker(author));
        }
        self.store.insert_data(&facts)?;
        Ok(())
    }

    /// Assemble every fact to assert for a verified match.
    pub fn plan(
        &self,
        author: &LocalAuthor,
        record: &ExternalAuthorRecord,
        document: &ProviderDocument,
        gate: &RelevanceGate<'_>,
    ) -> MutationResult<EnrichmentPlan> {
        let plan = self
            .assemble(author, record, document, gate)
            .map_err(|source| MutationError::Assemble {
                author: author.uri.as_str().to_string(),
                source,
            })?;
        if plan.len() > self.fact_limit {
            return Err(MutationError::TooLarge {
                author: author.uri.as_str().to_string(),
                facts: plan.len(),
                limit: self.fact_limit,
            });
        }
        Ok(plan)
    }

    fn assemble(
        &self,
        author: &LocalAuthor,
        record: &ExternalAuthorRecord,
        document: &ProviderDocument,
        gate: &RelevanceGate<'_>,
    ) -> Result<EnrichmentPlan, GraphError> {
        let mut set = FactSet::default();
        let mut expanded: HashSet<NamedNode> = HashSet::new();
        let mut frontier: Vec<NamedNode> = Vec::new();

        set.push(Fact::new(
            self.graph.clone(),
            author.uri.clone(),
            self.same_as.clone(),
            record.uri.clone(),
        ));

        expanded.insert(record.uri.clone());
        self.copy_outgoing(document, &record.uri, &mut set, Some(&mut frontier))?;

        let mut publications = 0;
        let mut filtered = 0;
        for (publication, title) in document.publications(&self.terms)? {
            if !gate.admits(&title) {
                tracing::debug!(publication = %publication, "publication not related to author, skipping");
                filtered += 1;
                continue;
            }
            publications += 1;
            expanded.insert(publication.clone());
            self.copy_outgoing(document, &publication, &mut set, Some(&mut frontier))?;
            set.push(Fact::new(
                self.graph.clone(),
                publication,
                self.contributor.clone(),
                record.uri.clone(),
            ));
        }

        // One level only: facts added here do not feed the frontier.
        for resource in frontier {
            if expanded.insert(resource.clone()) {
                self.copy_outgoing(document, &resource, &mut set, None)?;
            }
        }

        set.push(self.processed_marker(&author.uri));

        Ok(EnrichmentPlan {
            author: author.uri.clone(),
            facts: set.facts,
            publications,
            filtered,
        })
    }

    fn copy_outgoing(
        &self,
        document: &ProviderDocument,
        subject: &NamedNode,
        set: &mut FactSet,
        mut frontier: Option<&mut Vec<NamedNode>>,
    ) -> Result<(), GraphError> {
        for (property, value) in document.outgoing(subject)? {
            if let (Some(frontier), Object::Iri(node)) = (frontier.as_deref_mut(), &value) {
                frontier.push(node.clone());
            }
            set.push(Fact::new(self.graph.clone(), subject.clone(), property, value));
        }
        Ok(())
    }

    /// Assert the whole plan in one transaction. Returns the fact count.
    pub fn commit(&self, plan: &EnrichmentPlan) -> MutationResult<usize> {
        self.store
            .insert_data(&plan.facts)
            .map_err(|source| MutationError::Commit {
                author: plan.author.as_str().to_string(),
                facts: plan.facts.len(),
                source,
            })
    }
}
