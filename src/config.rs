//! Job configuration, persisted as TOML.
//!
//! Loaded once at job start. Every field has a default so an empty file (or
//! no file) is a valid configuration. The two switches inherited from the
//! older properties files keep their camelCase spellings as aliases.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::vocab;

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Top-level configuration of a reconciliation job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Bypass the per-author and per-query idempotency skips.
    #[serde(alias = "processAllAuthors")]
    pub process_all_authors: bool,
    /// Gate publication facts on keyword relatedness.
    #[serde(alias = "semanticAnalyzer", alias = "semanticAnalizer")]
    pub semantic_analyzer: bool,
    /// Size of the author worker pool. `1` runs sequentially.
    pub workers: usize,
    /// Largest enrichment committed for one author; bigger ones fail the author.
    pub max_facts_per_author: usize,
    pub graphs: GraphsConfig,
    pub provider: ProviderConfig,
    pub matching: MatchingConfig,
    pub cache: CacheConfig,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            process_all_authors: false,
            semantic_analyzer: true,
            workers: 1,
            max_facts_per_author: 50_000,
            graphs: GraphsConfig::default(),
            provider: ProviderConfig::default(),
            matching: MatchingConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

/// Named graphs the job reads from and writes to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphsConfig {
    /// Local registry snapshot (authors, their keywords and publications).
    pub authors: String,
    /// Institution records carrying full names.
    pub endpoints: String,
    /// Provider graphs are `{provider_base}/{provider name without spaces}`.
    pub provider_base: String,
}

impl Default for GraphsConfig {
    fn default() -> Self {
        Self {
            authors: vocab::DEFAULT_AUTHORS_GRAPH.into(),
            endpoints: vocab::DEFAULT_ENDPOINTS_GRAPH.into(),
            provider_base: vocab::DEFAULT_PROVIDER_GRAPH_BASE.into(),
        }
    }
}

impl GraphsConfig {
    /// IRI of the named graph holding one provider's facts and markers.
    pub fn provider_graph(&self, provider_name: &str) -> String {
        let slug: String = provider_name.split_whitespace().collect();
        format!("{}/{slug}", self.provider_base.trim_end_matches('/'))
    }
}

/// External bibliographic provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Display name, also used for progress keys and the provider graph.
    pub name: String,
    /// Author search endpoint, without query parameters.
    pub search_url: String,
    pub api_key: Option<String>,
    /// Value of the `httpAccept` query parameter, if the provider wants one.
    pub http_accept: Option<String>,
    /// Country used both in the affiliation filter and as the affiliation marker.
    pub country: String,
    pub timeout_secs: u64,
    pub max_response_bytes: u64,
    /// RDF serialization assumed when the Content-Type is not an RDF media type.
    pub default_format: String,
    pub vocabulary: ProviderVocabulary,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: "Scopus".into(),
            search_url: "https://api.elsevier.com/content/search/author".into(),
            api_key: None,
            http_accept: Some("application/rdf+xml".into()),
            country: "Ecuador".into(),
            timeout_secs: 30,
            max_response_bytes: 8 * 1024 * 1024,
            default_format: "rdfxml".into(),
            vocabulary: ProviderVocabulary::default(),
        }
    }
}

/// Predicates the provider uses in its linked-data responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderVocabulary {
    pub member: String,
    pub given_name: String,
    pub surname: String,
    pub affiliation: String,
    pub label: String,
    pub title: String,
}

impl Default for ProviderVocabulary {
    fn default() -> Self {
        Self {
            member: vocab::FOAF_MEMBER.into(),
            given_name: vocab::SCOPUS_GIVEN_NAME.into(),
            surname: vocab::SCOPUS_SURNAME.into(),
            affiliation: vocab::SCOPUS_AFFILIATION.into(),
            label: vocab::SKOS_PREF_LABEL.into(),
            title: vocab::DC_TITLE.into(),
        }
    }
}

/// Thresholds and reference data for match verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Affiliation/institution similarity must be strictly greater than this.
    pub affiliation_threshold: f64,
    /// Keyword pair similarity must be strictly greater than this.
    pub relatedness_threshold: f64,
    /// Institution full names added to those read from the endpoints graph.
    pub known_institutions: Vec<String>,
    /// Reject candidates that carry no affiliation at all.
    pub require_affiliation: bool,
    /// When set, the local/external name similarity must reach this value.
    pub min_name_similarity: Option<f64>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            affiliation_threshold: 0.9,
            relatedness_threshold: 0.8,
            known_institutions: Vec::new(),
            require_affiliation: false,
            min_name_similarity: None,
        }
    }
}

/// Locations and maintenance policy of the two cache stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Generic string memo. `None` keeps it in memory only.
    pub memo_file: Option<PathBuf>,
    /// Pairwise distance memo. `None` keeps it in memory only.
    pub distance_file: Option<PathBuf>,
    /// Chance that closing the cache also compacts the files.
    pub compaction_probability: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            memo_file: None,
            distance_file: None,
            compaction_probability: 0.002,
        }
    }
}

impl JobConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Read {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.workers == 0 {
            return Err(ConfigError::Invalid {
                message: "`workers` must be at least 1.".into(),
            });
        }
        if self.max_facts_per_author == 0 {
            return Err(ConfigError::Invalid {
                message: "`max_facts_per_author` must be at least 1.".into(),
            });
        }
        if self.provider.name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "`provider.name` must not be empty.".into(),
            });
        }
        if self.provider.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                message: "`provider.timeout_secs` must be positive; an unbounded provider call can stall the batch.".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.cache.compaction_probability) {
            return Err(ConfigError::Invalid {
                message: "`cache.compaction_probability` must be within 0.0..=1.0.".into(),
            });
        }
        for (name, value) in [
            ("matching.affiliation_threshold", self.matching.affiliation_threshold),
            ("matching.relatedness_threshold", self.matching.relatedness_threshold),
            (
                "matching.min_name_similarity",
                self.matching.min_name_similarity.unwrap_or(0.0),
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid {
                    message: format!("`{name}` must be within 0.0..=1.0."),
                });
            }
        }
        Ok(())
    }

    /// Graph IRI for the configured provider.
    pub fn provider_graph(&self) -> String {
        self.graphs.provider_graph(&self.provider.name)
    }
}
