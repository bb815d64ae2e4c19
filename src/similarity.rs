//! Lexical string similarity.
//!
//! The blended score averages a token-overlap cosine with a normalized
//! Levenshtein similarity, both computed on accent-folded lowercase text.
//! Scores are in `[0.0, 1.0]`; identical normalized strings score `1.0`.

use std::collections::HashMap;

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Lowercase, strip diacritics, and collapse non-alphanumerics to single spaces.
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalized tokens of `text`.
pub fn tokens(text: &str) -> Vec<String> {
    normalize(text)
        .split(' ')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Cosine similarity of the token frequency vectors.
pub fn token_cosine(a: &str, b: &str) -> f64 {
    let freq = |text: &str| {
        let mut map: HashMap<String, f64> = HashMap::new();
        for token in tokens(text) {
            *map.entry(token).or_default() += 1.0;
        }
        map
    };
    let fa = freq(a);
    let fb = freq(b);
    if fa.is_empty() || fb.is_empty() {
        return 0.0;
    }

    let dot: f64 = fa
        .iter()
        .filter_map(|(t, x)| fb.get(t).map(|y| x * y))
        .sum();
    let norm = |m: &HashMap<String, f64>| m.values().map(|v| v * v).sum::<f64>().sqrt();
    dot / (norm(&fa) * norm(&fb))
}

/// Edit distance in characters.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// `1 - levenshtein / max_len` on normalized text.
pub fn levenshtein_similarity(a: &str, b: &str) -> f64 {
    let a = normalize(a);
    let b = normalize(b);
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return if a == b { 1.0 } else { 0.0 };
    }
    1.0 - levenshtein(&a, &b) as f64 / max_len as f64
}

/// Average of [`token_cosine`] and [`levenshtein_similarity`].
pub fn blended(a: &str, b: &str) -> f64 {
    if normalize(a).is_empty() || normalize(b).is_empty() {
        return 0.0;
    }
    (token_cosine(a, b) + levenshtein_similarity(a, b)) / 2.0
}

/// Similarity of two people's names given as (first, last).
///
/// Compared in `last first` order so that swapped or abbreviated given
/// names weigh less than the family name.
pub fn name_similarity(local: (&str, &str), external: (&str, &str)) -> f64 {
    let l = format!("{} {}", local.1, local.0);
    let e = format!("{} {}", external.1, external.0);
    blended(&l, &e)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn normalize_folds_accents_and_punctuation() {
        assert_eq!(normalize("  Escuela Politécnica, del LITORAL "), "escuela politecnica del litoral");
        assert_eq!(normalize("---"), "");
    }

    #[test]
    fn levenshtein_known_values() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("same", "same"), 0);
    }

    #[test]
    fn identical_strings_score_one() {
        assert!(approx(blended("Universidad de Cuenca", "universidad de cuenca"), 1.0));
    }

    #[test]
    fn cosine_ignores_token_order() {
        assert!(approx(token_cosine("de cuenca universidad", "universidad de cuenca"), 1.0));
    }

    #[test]
    fn unrelated_strings_score_low() {
        let score = blended("Massachusetts Institute of Technology", "Universidad de Cuenca");
        assert!(score < 0.5, "score was {score}");
    }

    #[test]
    fn empty_input_scores_zero() {
        assert_eq!(blended("", "Universidad"), 0.0);
        assert_eq!(token_cosine("", ""), 0.0);
    }

    #[test]
    fn blended_is_symmetric() {
        let a = "Universidad Técnica Particular de Loja";
        let b = "Univ. Tecnica Particular Loja";
        assert!(approx(blended(a, b), blended(b, a)));
    }

    #[test]
    fn name_similarity_prefers_matching_family_name() {
        let same = name_similarity(("Victor", "Saquicela Galarza"), ("Victor Hugo", "Saquicela"));
        let other = name_similarity(("Victor", "Saquicela Galarza"), ("Maria", "Espinoza"));
        assert!(same > other);
    }
}
