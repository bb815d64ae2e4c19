//! Keyword extraction from publication text.
//!
//! Tokens are accent-folded and lowercased; English and Spanish stopwords,
//! numbers, and tokens shorter than three characters are dropped. Results
//! are memoized in the cache's generic string store.

use crate::cache::DistanceCache;
use crate::similarity;

/// Prefix of memo keys holding extracted keywords.
const MEMO_PREFIX: &str = "kw:";

const STOPWORDS: &[&str] = &[
    // English
    "about", "after", "all", "also", "among", "and", "any", "are", "based", "been", "between",
    "both", "but", "can", "case", "for", "from", "has", "have", "how", "into", "its", "new",
    "not", "our", "over", "study", "than", "that", "the", "their", "these", "this", "through",
    "towards", "under", "using", "via", "was", "were", "what", "when", "which", "while", "with",
    "within", "without",
    // Spanish
    "al", "como", "con", "del", "desde", "entre", "esta", "este", "estos", "las", "los", "mas",
    "para", "por", "que", "sobre", "sus", "una", "uno", "unos", "unas",
];

fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(&token)
}

/// Distinct keywords of `text`, in order of first appearance.
pub fn extract(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for token in similarity::tokens(text) {
        if token.chars().count() < 3
            || token.chars().all(|c| c.is_ascii_digit())
            || is_stopword(&token)
        {
            continue;
        }
        if !out.contains(&token) {
            out.push(token);
        }
    }
    out
}

/// [`extract`], memoized in `cache`.
pub fn extract_cached(cache: &DistanceCache, text: &str) -> Vec<String> {
    let key = format!("{MEMO_PREFIX}{}", similarity::normalize(text));
    if let Some(stored) = cache.get(&key) {
        return stored
            .split('\n')
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect();
    }
    let keywords = extract(text);
    cache.put(key, keywords.join("\n"));
    keywords
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_stopwords_short_tokens_and_numbers() {
        let keywords = extract("A study of the Semantic Web in 2015: anotación semántica para la web");
        assert_eq!(keywords, vec!["semantic", "web", "anotacion", "semantica"]);
    }

    #[test]
    fn empty_text_has_no_keywords() {
        assert!(extract("").is_empty());
        assert!(extract("of the and").is_empty());
    }

    #[test]
    fn memoized_extraction_matches_direct() {
        let cache = DistanceCache::in_memory();
        let text = "Linked Data services for Ontology matching";
        let first = extract_cached(&cache, text);
        assert_eq!(first, extract(text));
        assert!(cache.get("kw:linked data services for ontology matching").is_some());
        assert_eq!(extract_cached(&cache, text), first);
    }

    #[test]
    fn memoized_empty_set_round_trips() {
        let cache = DistanceCache::in_memory();
        assert!(extract_cached(&cache, "on it").is_empty());
        assert!(extract_cached(&cache, "on it").is_empty());
    }
}
