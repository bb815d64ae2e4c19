//! Topical relatedness of provider publications to a local author.

use std::sync::Arc;

use crate::cache::DistanceCache;
use crate::similarity;

use super::keywords;

/// Keyword-pair comparison backed by the persistent distance cache.
#[derive(Debug, Clone)]
pub struct SemanticKeywordComparator {
    cache: Arc<DistanceCache>,
    threshold: f64,
}

impl SemanticKeywordComparator {
    pub fn new(cache: Arc<DistanceCache>, threshold: f64) -> Self {
        Self { cache, threshold }
    }

    /// The publication filter for one author.
    ///
    /// Author keyword phrases go through the same extraction as publication
    /// titles, so both sides are compared word by word.
    pub fn gate(&self, enabled: bool, author_keywords: &[String]) -> RelevanceGate<'_> {
        if !enabled {
            return RelevanceGate::AdmitAll;
        }
        let mut words: Vec<String> = Vec::new();
        for phrase in author_keywords {
            for word in keywords::extract_cached(&self.cache, phrase) {
                if !words.contains(&word) {
                    words.push(word);
                }
            }
        }
        RelevanceGate::Keywords {
            comparator: self,
            author_keywords: words,
        }
    }

    /// Cached `1 - similarity` of two keywords.
    pub fn distance(&self, a: &str, b: &str) -> f64 {
        self.cache
            .distance_or_insert_with(a, b, || 1.0 - similarity::blended(a, b))
    }

    /// Whether any keyword pair is more similar than the threshold.
    ///
    /// An empty side is never related.
    pub fn related(&self, author_keywords: &[String], publication_keywords: &[String]) -> bool {
        if author_keywords.is_empty() || publication_keywords.is_empty() {
            return false;
        }
        author_keywords.iter().any(|a| {
            publication_keywords
                .iter()
                .any(|b| 1.0 - self.distance(a, b) > self.threshold)
        })
    }

    pub fn cache(&self) -> &DistanceCache {
        &self.cache
    }
}

/// Decides which provider publications are merged for an author.
#[derive(Debug, Clone)]
pub enum RelevanceGate<'a> {
    /// Semantic analysis disabled: every publication is merged.
    AdmitAll,
    Keywords {
        comparator: &'a SemanticKeywordComparator,
        author_keywords: Vec<String>,
    },
}

impl RelevanceGate<'_> {
    pub fn admits(&self, text: &str) -> bool {
        match self {
            RelevanceGate::AdmitAll => true,
            RelevanceGate::Keywords {
                comparator,
                author_keywords,
            } => {
                let publication = keywords::extract_cached(comparator.cache(), text);
                comparator.related(author_keywords, &publication)
            }
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, RelevanceGate::Keywords { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comparator() -> SemanticKeywordComparator {
        SemanticKeywordComparator::new(Arc::new(DistanceCache::in_memory()), 0.8)
    }

    fn words(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn disabled_gate_admits_everything() {
        let c = comparator();
        let gate = c.gate(false, &[]);
        assert!(!gate.is_active());
        assert!(gate.admits("anything at all"));
        assert!(gate.admits(""));
    }

    #[test]
    fn related_publication_is_admitted() {
        let c = comparator();
        let author = words(&["semantic web", "ontologies"]);
        let gate = c.gate(true, &author);
        assert!(gate.admits("Ontologies for water quality monitoring"));
    }

    #[test]
    fn multi_word_author_keywords_match_title_words() {
        let c = comparator();
        let author = words(&["Semantic Web"]);
        assert!(c.gate(true, &author).admits("Semantic web services annotation"));
    }

    #[test]
    fn unrelated_publication_is_rejected() {
        let c = comparator();
        let author = words(&["semantic web"]);
        let gate = c.gate(true, &author);
        assert!(!gate.admits("Pediatric cardiology outcomes"));
    }

    #[test]
    fn empty_keyword_sets_are_not_related() {
        let c = comparator();
        assert!(!c.gate(true, &[]).admits("Semantic web services"));
        let author = words(&["semantic"]);
        assert!(!c.gate(true, &author).admits("of the and"));
    }

    #[test]
    fn distances_are_cached_symmetrically() {
        let c = comparator();
        let d = c.distance("ontology", "ontologies");
        assert_eq!(c.cache().distance("ontologies", "ontology"), Some(d));
        assert_eq!(c.distance("ontology", "ontology"), 0.0);
    }

    #[test]
    fn warm_cache_gives_same_answers() {
        let c = comparator();
        let author = words(&["linked data", "ontologies"]);
        let texts = ["Ontologies and linked data", "Tropical agriculture yields"];
        let cold: Vec<bool> = texts.iter().map(|t| c.gate(true, &author).admits(t)).collect();
        let warm: Vec<bool> = texts.iter().map(|t| c.gate(true, &author).admits(t)).collect();
        assert_eq!(cold, warm);
        assert_eq!(cold, vec![true, false]);
    }
}
