//! Candidate search queries for one local author.
//!
//! Variants are ordered most specific first: the country-filtered query
//! keeps false positives down, the unfiltered ones widen recall only when it
//! fails. Output is deterministic for a given name.

use url::Url;

use crate::config::ProviderConfig;
use crate::error::ProviderError;

use super::ProviderResult;

/// A provider search URL and its position in the fallback order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateQuery {
    pub url: String,
    /// 0 is tried first.
    pub priority: usize,
    /// Whether the query restricts results to the configured country.
    pub affiliation_filtered: bool,
}

/// Builds the ordered search variants for an author name.
#[derive(Debug, Clone)]
pub struct QueryVariantGenerator {
    base: Url,
    api_key: Option<String>,
    http_accept: Option<String>,
    country: String,
}

impl QueryVariantGenerator {
    pub fn new(config: &ProviderConfig) -> ProviderResult<Self> {
        let base = Url::parse(&config.search_url).map_err(|e| ProviderError::SearchUrl {
            template: config.search_url.clone(),
            message: e.to_string(),
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ProviderError::SearchUrl {
                template: config.search_url.clone(),
                message: format!("unsupported scheme `{}`", base.scheme()),
            });
        }
        Ok(Self {
            base,
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            http_accept: config.http_accept.clone().filter(|a| !a.is_empty()),
            country: config.country.clone(),
        })
    }

    /// Ordered, non-empty, duplicate-free search variants.
    pub fn generate(&self, first_name: &str, last_name: &str) -> Vec<CandidateQuery> {
        let first_tokens: Vec<&str> = first_name.split_whitespace().collect();
        let last_tokens: Vec<&str> = last_name.split_whitespace().collect();

        let first = first_tokens.first().copied().unwrap_or(first_name.trim());
        let last = last_tokens.first().copied().unwrap_or(last_name.trim());
        let last_joined = if last_tokens.len() > 1 {
            format!("{} {}", last_tokens[0], last_tokens[1])
        } else {
            last.to_string()
        };

        let shapes = [
            (first, last.to_string(), true),
            (first, last_joined, false),
            (first, last.to_string(), false),
        ];

        let mut variants: Vec<CandidateQuery> = Vec::with_capacity(shapes.len());
        for (first, last, filtered) in shapes {
            let url = self.search_url(first, &last, filtered);
            if variants.iter().any(|v| v.url == url) {
                continue;
            }
            variants.push(CandidateQuery {
                url,
                priority: variants.len(),
                affiliation_filtered: filtered,
            });
        }
        variants
    }

    fn search_url(&self, first: &str, last: &str, filtered: bool) -> String {
        let mut expression = format!("authfirst({first})authlast({last})");
        if filtered {
            expression.push_str(&format!(" AND affil({})", self.country));
        }

        let mut url = self.base.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("query", &expression);
            if let Some(key) = &self.api_key {
                pairs.append_pair("apiKey", key);
            }
            if let Some(accept) = &self.http_accept {
                pairs.append_pair("httpAccept", accept);
            }
        }
        url.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator() -> QueryVariantGenerator {
        QueryVariantGenerator::new(&ProviderConfig {
            search_url: "https://api.example.org/search/author".into(),
            api_key: Some("k3y".into()),
            http_accept: None,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn three_variants_most_specific_first() {
        let variants = generator().generate("Victor Hugo", "Saquicela Galarza");
        assert_eq!(variants.len(), 3);
        assert!(variants[0].affiliation_filtered);
        assert!(variants[0].url.contains("authfirst%28Victor%29authlast%28Saquicela%29"));
        assert!(variants[0].url.contains("affil%28Ecuador%29"));
        assert!(variants[1].url.contains("authlast%28Saquicela+Galarza%29"));
        assert!(!variants[1].url.contains("affil"));
        assert!(variants[2].url.contains("authlast%28Saquicela%29"));
        assert!(!variants[2].url.contains("affil"));
        assert_eq!(
            variants.iter().map(|v| v.priority).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn single_token_last_name_collapses_duplicate() {
        let variants = generator().generate("Mauricio", "Espinoza");
        assert_eq!(variants.len(), 2);
        assert!(variants[0].affiliation_filtered);
        assert!(!variants[1].affiliation_filtered);
    }

    #[test]
    fn deterministic() {
        let g = generator();
        assert_eq!(g.generate("Ana María", "Pérez"), g.generate("Ana María", "Pérez"));
    }

    #[test]
    fn api_key_and_encoding() {
        let variants = generator().generate("José", "Ortíz");
        let url = &variants[0].url;
        assert!(url.starts_with("https://api.example.org/search/author?query="));
        assert!(url.ends_with("&apiKey=k3y"));
        assert!(!url.contains(' '));
    }

    #[test]
    fn non_http_search_url_is_rejected() {
        let err = QueryVariantGenerator::new(&ProviderConfig {
            search_url: "ftp://example.org/".into(),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, ProviderError::SearchUrl { .. }));
    }
}
