//! Verification of a single provider candidate against a local author.
//!
//! - [`affiliation`]: country marker and institution-name checks
//! - [`semantic`]: keyword relatedness gate for publications
//! - [`keywords`]: keyword extraction used by the semantic gate

pub mod affiliation;
pub mod keywords;
pub mod semantic;

use serde::Serialize;

use crate::config::MatchingConfig;
use crate::provider::document::ExternalAuthorRecord;
use crate::registry::LocalAuthor;
use crate::similarity;

pub use affiliation::{AffiliationEvidence, AffiliationMatcher};
pub use semantic::{RelevanceGate, SemanticKeywordComparator};

/// Verdict on a candidate, with the evidence behind it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchDecision {
    pub accepted: bool,
    pub affiliation: AffiliationEvidence,
    /// Similarity of local and external names, when the provider gave any.
    pub name_similarity: Option<f64>,
    /// Whether publications will be filtered by keyword relatedness.
    pub semantic_gate: bool,
}

/// Combines the affiliation check with the optional name gate.
#[derive(Debug, Clone)]
pub struct CandidateMatcher {
    affiliation: AffiliationMatcher,
    require_affiliation: bool,
    min_name_similarity: Option<f64>,
}

impl CandidateMatcher {
    pub fn new(country: &str, institutions: Vec<String>, config: &MatchingConfig) -> Self {
        Self {
            affiliation: AffiliationMatcher::new(country, institutions, config.affiliation_threshold),
            require_affiliation: config.require_affiliation,
            min_name_similarity: config.min_name_similarity,
        }
    }

    pub fn decide(&self, author: &LocalAuthor, record: &ExternalAuthorRecord, semantic_gate: bool) -> MatchDecision {
        let affiliation = self.affiliation.evaluate(&record.affiliations);
        let name_similarity = match (&record.given_name, &record.family_name) {
            (None, None) => None,
            (given, family) => Some(similarity::name_similarity(
                (author.first_name.as_str(), author.last_name.as_str()),
                (given.as_deref().unwrap_or(""), family.as_deref().unwrap_or("")),
            )),
        };

        let name_ok = match (self.min_name_similarity, name_similarity) {
            (Some(min), Some(score)) => score >= min,
            _ => true,
        };
        let accepted = affiliation.accepted(self.require_affiliation) && name_ok;

        MatchDecision {
            accepted,
            affiliation,
            name_similarity,
            semantic_gate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::iri;

    fn author() -> LocalAuthor {
        LocalAuthor {
            uri: iri("https://registry.example/author/1").unwrap(),
            first_name: "Victor Hugo".into(),
            last_name: "Saquicela Galarza".into(),
            keywords: vec![],
            provenance: None,
        }
    }

    fn record(given: &str, family: &str, affiliations: &[&str]) -> ExternalAuthorRecord {
        ExternalAuthorRecord {
            uri: iri("https://provider.example/author/42").unwrap(),
            given_name: Some(given.into()),
            family_name: Some(family.into()),
            affiliations: affiliations.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn accepted_with_country_marker() {
        let matcher = CandidateMatcher::new("Ecuador", vec![], &MatchingConfig::default());
        let decision = matcher.decide(&author(), &record("Victor", "Saquicela", &["Universidad de Cuenca, Ecuador"]), true);
        assert!(decision.accepted);
        assert!(decision.semantic_gate);
        assert!(decision.name_similarity.is_some_and(|s| s > 0.5));
    }

    #[test]
    fn affiliation_mismatch_rejects() {
        let matcher = CandidateMatcher::new("Ecuador", vec!["Universidad de Cuenca".into()], &MatchingConfig::default());
        let decision = matcher.decide(&author(), &record("Victor", "Saquicela", &["University of Oxford"]), false);
        assert!(!decision.accepted);
        assert!(matches!(decision.affiliation, AffiliationEvidence::Rejected { .. }));
    }

    #[test]
    fn name_gate_applies_only_when_configured() {
        let strict = MatchingConfig {
            min_name_similarity: Some(0.95),
            ..Default::default()
        };
        let matcher = CandidateMatcher::new("Ecuador", vec![], &strict);
        let decision = matcher.decide(&author(), &record("Maria", "Lopez", &["Quito, Ecuador"]), false);
        assert!(!decision.accepted);

        let lenient = CandidateMatcher::new("Ecuador", vec![], &MatchingConfig::default());
        assert!(lenient.decide(&author(), &record("Maria", "Lopez", &["Quito, Ecuador"]), false).accepted);
    }

    #[test]
    fn nameless_record_has_no_name_evidence() {
        let matcher = CandidateMatcher::new("Ecuador", vec![], &MatchingConfig::default());
        let mut r = record("x", "y", &[]);
        r.given_name = None;
        r.family_name = None;
        let decision = matcher.decide(&author(), &r, false);
        assert_eq!(decision.name_similarity, None);
        assert!(decision.accepted);
    }
}
