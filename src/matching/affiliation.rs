//! Affiliation verification of a provider candidate.

use serde::Serialize;

use crate::similarity;

/// Why a candidate's affiliations were accepted or rejected.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AffiliationEvidence {
    /// A label names the configured country.
    CountryMarker { label: String },
    /// A label is close enough to a known institution.
    Institution {
        label: String,
        institution: String,
        score: f64,
    },
    /// The candidate has no affiliation labels at all.
    NoAffiliations,
    /// No label matched; the best score seen is kept for the logs.
    Rejected { best_score: f64 },
}

impl AffiliationEvidence {
    pub fn accepted(&self, require_affiliation: bool) -> bool {
        match self {
            AffiliationEvidence::CountryMarker { .. } | AffiliationEvidence::Institution { .. } => true,
            AffiliationEvidence::NoAffiliations => !require_affiliation,
            AffiliationEvidence::Rejected { .. } => false,
        }
    }
}

/// Compares affiliation labels against a country marker and known institutions.
#[derive(Debug, Clone)]
pub struct AffiliationMatcher {
    country: String,
    institutions: Vec<String>,
    threshold: f64,
}

impl AffiliationMatcher {
    pub fn new(country: impl Into<String>, institutions: Vec<String>, threshold: f64) -> Self {
        Self {
            country: country.into(),
            institutions,
            threshold,
        }
    }

    pub fn institutions(&self) -> &[String] {
        &self.institutions
    }

    /// Evaluate labels in order; the first accepting label wins.
    ///
    /// The country marker is matched literally (case and accents included);
    /// looser spellings are left to the institution similarity.
    pub fn evaluate(&self, labels: &[String]) -> AffiliationEvidence {
        if labels.is_empty() {
            return AffiliationEvidence::NoAffiliations;
        }

        let marker = self.country.trim();
        let mut best_score: f64 = 0.0;
        for label in labels {
            if !marker.is_empty() && label.contains(marker) {
                return AffiliationEvidence::CountryMarker {
                    label: label.clone(),
                };
            }
            for institution in &self.institutions {
                let score = similarity::blended(label, institution);
                if score > self.threshold {
                    return AffiliationEvidence::Institution {
                        label: label.clone(),
                        institution: institution.clone(),
                        score,
                    };
                }
                best_score = best_score.max(score);
            }
        }
        AffiliationEvidence::Rejected { best_score }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> AffiliationMatcher {
        AffiliationMatcher::new(
            "Ecuador",
            vec![
                "Universidad de Cuenca".into(),
                "Escuela Superior Politecnica del Litoral".into(),
            ],
            0.9,
        )
    }

    fn labels(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn country_marker_short_circuits() {
        let evidence = matcher().evaluate(&labels(&["Some Lab", "Universidad X, Quito, Ecuador"]));
        assert!(matches!(evidence, AffiliationEvidence::CountryMarker { ref label } if label.contains("Quito")));
        assert!(evidence.accepted(true));
    }

    #[test]
    fn country_marker_is_matched_literally() {
        let only_country = AffiliationMatcher::new("Ecuador", vec![], 0.9);
        assert!(matches!(
            only_country.evaluate(&labels(&["QUITO, ECUADOR"])),
            AffiliationEvidence::Rejected { .. }
        ));
        assert!(matches!(
            only_country.evaluate(&labels(&["Quito, ecuador"])),
            AffiliationEvidence::Rejected { .. }
        ));
        assert!(matches!(
            only_country.evaluate(&labels(&["Quito, Ecuador"])),
            AffiliationEvidence::CountryMarker { .. }
        ));
    }

    #[test]
    fn institution_similarity_accepts_above_threshold() {
        let evidence = matcher().evaluate(&labels(&["Universidad de Cuenca"]));
        match evidence {
            AffiliationEvidence::Institution { institution, score, .. } => {
                assert_eq!(institution, "Universidad de Cuenca");
                assert!(score > 0.9);
            }
            other => panic!("unexpected evidence: {other:?}"),
        }
    }

    #[test]
    fn accents_do_not_block_a_match() {
        let evidence = matcher().evaluate(&labels(&["Escuela Superior Politécnica del Litoral"]));
        assert!(matches!(evidence, AffiliationEvidence::Institution { .. }));
    }

    #[test]
    fn unrelated_affiliation_is_rejected() {
        let evidence = matcher().evaluate(&labels(&["Massachusetts Institute of Technology"]));
        assert!(matches!(evidence, AffiliationEvidence::Rejected { best_score } if best_score < 0.9));
        assert!(!evidence.accepted(false));
    }

    #[test]
    fn no_affiliations_depends_on_policy() {
        let evidence = matcher().evaluate(&[]);
        assert_eq!(evidence, AffiliationEvidence::NoAffiliations);
        assert!(evidence.accepted(false));
        assert!(!evidence.accepted(true));
    }
}
