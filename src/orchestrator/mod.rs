//! Resumable batch reconciliation of local authors against one provider.
//!
//! Each author goes through:
//!
//! ```text
//! SkippedAlreadyProcessed
//!        ^
//!        | processed marker present
//! author +--> Searching --> Merging --> Done
//!                 |            |
//!                 v            v
//!           MatchRejected    Failed
//! ```
//!
//! A run can be interrupted between authors and restarted: processed
//! markers and per-query attempt markers in the provider graph make the next
//! run skip finished work without calling the provider again.

pub mod progress;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use serde::Serialize;

use crate::cache::DistanceCache;
use crate::config::JobConfig;
use crate::error::AuthlinkResult;
use crate::graph::SparqlStore;
use crate::matching::{CandidateMatcher, SemanticKeywordComparator};
use crate::mutate::GraphMutator;
use crate::provider::query::QueryVariantGenerator;
use crate::provider::{Dereferencer, ProviderClient, SearchOutcome};
use crate::registry::{self, LocalAuthor};

use progress::{LogProgress, ProgressSink, ProgressTracker};

/// Lifecycle of one author within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorState {
    SkippedAlreadyProcessed,
    Searching,
    MatchRejected,
    Merging,
    Done,
    Failed,
}

impl AuthorState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, AuthorState::Searching | AuthorState::Merging)
    }
}

impl fmt::Display for AuthorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuthorState::SkippedAlreadyProcessed => "skipped",
            AuthorState::Searching => "searching",
            AuthorState::MatchRejected => "rejected",
            AuthorState::Merging => "merging",
            AuthorState::Done => "done",
            AuthorState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// How the batch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Completed,
    /// Stopped on request; authors not started are picked up by the next run.
    Interrupted,
}

/// Terminal status of a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub provider: String,
    pub status: BatchStatus,
    pub total: usize,
    pub skipped: usize,
    pub rejected: usize,
    pub done: usize,
    pub failed: usize,
    /// Authors not started because the batch was interrupted.
    pub not_started: usize,
    pub facts_written: usize,
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self.status {
            BatchStatus::Completed => "completed",
            BatchStatus::Interrupted => "interrupted",
        };
        write!(
            f,
            "{}: {status} ({} authors: {} done, {} rejected, {} skipped, {} failed",
            self.provider, self.total, self.done, self.rejected, self.skipped, self.failed
        )?;
        if self.not_started > 0 {
            write!(f, ", {} not started", self.not_started)?;
        }
        write!(f, "; {} facts written)", self.facts_written)
    }
}

/// Per-state counters shared by workers.
#[derive(Debug, Default)]
struct Tally {
    skipped: AtomicUsize,
    rejected: AtomicUsize,
    done: AtomicUsize,
    failed: AtomicUsize,
    facts: AtomicUsize,
}

impl Tally {
    fn record(&self, state: AuthorState) {
        let counter = match state {
            AuthorState::SkippedAlreadyProcessed => &self.skipped,
            AuthorState::MatchRejected => &self.rejected,
            AuthorState::Done => &self.done,
            AuthorState::Failed => &self.failed,
            AuthorState::Searching | AuthorState::Merging => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn handled(&self) -> usize {
        self.skipped.load(Ordering::Relaxed)
            + self.rejected.load(Ordering::Relaxed)
            + self.done.load(Ordering::Relaxed)
            + self.failed.load(Ordering::Relaxed)
    }
}

/// Runs the reconciliation batch for the configured provider.
pub struct Reconciler {
    config: JobConfig,
    store: SparqlStore,
    client: ProviderClient,
    generator: QueryVariantGenerator,
    matcher: CandidateMatcher,
    comparator: SemanticKeywordComparator,
    mutator: GraphMutator,
    progress: Box<dyn ProgressSink>,
    stop: Arc<AtomicBool>,
}

impl Reconciler {
    /// Wire up a reconciler. Reads institution names from the store.
    pub fn new(
        config: JobConfig,
        store: SparqlStore,
        cache: Arc<DistanceCache>,
        dereferencer: Box<dyn Dereferencer>,
    ) -> AuthlinkResult<Self> {
        config.validate()?;
        let client = ProviderClient::new(&config, dereferencer)?;
        let generator = QueryVariantGenerator::new(&config.provider)?;
        let institutions = registry::load_institutions(&store, &config.graphs, &config.matching)?;
        tracing::debug!(institutions = institutions.len(), "known institutions loaded");
        let matcher = CandidateMatcher::new(&config.provider.country, institutions, &config.matching);
        let comparator = SemanticKeywordComparator::new(cache, config.matching.relatedness_threshold);
        let mutator = GraphMutator::new(store.clone(), client.graph().clone(), client.terms().clone())?
            .with_fact_limit(config.max_facts_per_author);

        Ok(Self {
            config,
            store,
            client,
            generator,
            matcher,
            comparator,
            mutator,
            progress: Box::new(LogProgress),
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn with_progress(mut self, sink: Box<dyn ProgressSink>) -> Self {
        self.progress = sink;
        self
    }

    /// Share a stop flag; once set, no new author is started.
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Run the batch over every local author.
    ///
    /// Fails only if the authors cannot be read; per-author errors are
    /// logged and counted.
    pub fn run(&self) -> AuthlinkResult<BatchReport> {
        let authors = registry::load_local_authors(&self.store, &self.config.graphs)?;
        let provider = self.client.name().to_string();
        let tracker = ProgressTracker::new(authors.len());
        let tally = Tally::default();

        tracing::info!(
            provider = %provider,
            authors = authors.len(),
            workers = self.config.workers,
            process_all = self.config.process_all_authors,
            semantic = self.config.semantic_analyzer,
            "starting reconciliation"
        );

        let step = |index: usize| {
            if self.stop.load(Ordering::SeqCst) {
                return;
            }
            let author = &authors[index];
            let state = self.reconcile_author(author, &tally);
            tally.record(state);
            let handled = tracker.advance_and_report(self.progress.as_ref(), &provider);
            tracing::info!(
                author = %author.uri,
                state = %state,
                "processed {handled} of {}",
                tracker.total()
            );
        };

        if self.config.workers > 1 {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.workers)
                .build()
            {
                Ok(pool) => pool.install(|| {
                    use rayon::prelude::*;
                    (0..authors.len()).into_par_iter().for_each(step);
                }),
                Err(e) => {
                    tracing::warn!(error = %e, "worker pool unavailable, running sequentially");
                    (0..authors.len()).for_each(step);
                }
            }
        } else {
            (0..authors.len()).for_each(step);
        }

        let handled = tally.handled();
        let status = if handled < authors.len() {
            BatchStatus::Interrupted
        } else {
            BatchStatus::Completed
        };
        let report = BatchReport {
            provider,
            status,
            total: authors.len(),
            skipped: tally.skipped.load(Ordering::Relaxed),
            rejected: tally.rejected.load(Ordering::Relaxed),
            done: tally.done.load(Ordering::Relaxed),
            failed: tally.failed.load(Ordering::Relaxed),
            not_started: authors.len() - handled,
            facts_written: tally.facts.load(Ordering::Relaxed),
        };
        tracing::info!(%report, "reconciliation finished");
        Ok(report)
    }

    /// Process one author to a terminal state. Never fails the batch.
    pub fn process_author(&self, author: &LocalAuthor) -> AuthorState {
        self.reconcile_author(author, &Tally::default())
    }

    fn reconcile_author(&self, author: &LocalAuthor, tally: &Tally) -> AuthorState {
        match self.try_reconcile(author, tally) {
            Ok(state) => state,
            Err(e) => {
                tracing::error!(author = %author.uri, error = %e, "author failed");
                AuthorState::Failed
            }
        }
    }

    fn try_reconcile(&self, author: &LocalAuthor, tally: &Tally) -> AuthlinkResult<AuthorState> {
        let process_all = self.config.process_all_authors;
        if !process_all && self.mutator.is_processed(&author.uri)? {
            tracing::debug!(author = %author.uri, "already processed, skipping");
            return Ok(AuthorState::SkippedAlreadyProcessed);
        }

        let state = AuthorState::Searching;
        tracing::debug!(author = %author.uri, name = %author.display_name(), %state, "author state");
        let mut transient = false;
        for query in self.generator.generate(&author.first_name, &author.last_name) {
            let (document, record, attempt) =
                match self.client.search(&self.store, &author.uri, &query, process_all)? {
                    SearchOutcome::Candidate {
                        document,
                        record,
                        attempt,
                    } => (document, record, attempt),
                    SearchOutcome::Unavailable(_) => {
                        transient = true;
                        continue;
                    }
                    SearchOutcome::AlreadyAttempted | SearchOutcome::NoUsableCandidate { .. } => continue,
                };

            let decision = self
                .matcher
                .decide(author, &record, self.config.semantic_analyzer);
            if !decision.accepted {
                tracing::info!(
                    author = %author.uri,
                    candidate = %record.uri,
                    evidence = ?decision.affiliation,
                    name_similarity = ?decision.name_similarity,
                    "candidate rejected"
                );
                self.mutator.record_rejection(&author.uri, attempt, !transient)?;
                return Ok(AuthorState::MatchRejected);
            }

            let state = AuthorState::Merging;
            tracing::debug!(author = %author.uri, candidate = %record.uri, %state, "author state");
            let gate = self
                .comparator
                .gate(self.config.semantic_analyzer, &author.keywords);
            let plan = self
                .mutator
                .plan(author, &record, &document, &gate)?
                .with_marker(attempt);
            let written = self.mutator.commit(&plan)?;
            tally.facts.fetch_add(written, Ordering::Relaxed);
            tracing::info!(
                author = %author.uri,
                candidate = %record.uri,
                facts = written,
                publications = plan.publications,
                filtered = plan.filtered,
                "author enriched"
            );
            return Ok(AuthorState::Done);
        }

        if transient {
            tracing::info!(author = %author.uri, "no match yet; provider unavailable for some variants");
        } else {
            tracing::info!(author = %author.uri, "no usable candidate");
            self.mutator.mark_processed(&author.uri)?;
        }
        Ok(AuthorState::MatchRejected)
    }
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("provider", &self.client.name())
            .field("workers", &self.config.workers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_display() {
        let report = BatchReport {
            provider: "Scopus".into(),
            status: BatchStatus::Interrupted,
            total: 10,
            skipped: 2,
            rejected: 3,
            done: 1,
            failed: 1,
            not_started: 3,
            facts_written: 42,
        };
        assert_eq!(
            report.to_string(),
            "Scopus: interrupted (10 authors: 1 done, 3 rejected, 2 skipped, 1 failed, 3 not started; 42 facts written)"
        );
    }

    #[test]
    fn report_serializes_snake_case() {
        let report = BatchReport {
            provider: "Scopus".into(),
            status: BatchStatus::Completed,
            total: 0,
            skipped: 0,
            rejected: 0,
            done: 0,
            failed: 0,
            not_started: 0,
            facts_written: 0,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "completed");
    }

    #[test]
    fn terminal_states() {
        assert!(AuthorState::Done.is_terminal());
        assert!(AuthorState::Failed.is_terminal());
        assert!(!AuthorState::Searching.is_terminal());
        assert!(!AuthorState::Merging.is_terminal());
    }
}
