//! Rich diagnostic error types for authlink.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains. Per-query and per-author
//! failures are recovered inside the batch; these types mostly surface in logs
//! and at start-up.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for authlink.
#[derive(Debug, Error, Diagnostic)]
pub enum AuthlinkError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Mutation(#[from] MutationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Paths(#[from] crate::paths::PathError),
}

// ---------------------------------------------------------------------------
// Cache errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum CacheError {
    #[error("I/O error: {source}")]
    #[diagnostic(
        code(authlink::cache::io),
        help(
            "A filesystem operation failed. Check that the cache directory exists, \
             has correct permissions, and that the disk is not full."
        )
    )]
    Io {
        #[source]
        source: std::io::Error,
    },

    #[error("redb error on {path}: {message}")]
    #[diagnostic(
        code(authlink::cache::redb),
        help(
            "The cache database reported an error. The cache is only an optimization: \
             delete the file to start cold, match decisions will not change."
        )
    )]
    Redb { path: String, message: String },

    #[error("corrupt cache value for key \"{key}\"")]
    #[diagnostic(
        code(authlink::cache::corrupt),
        help("The stored bytes could not be decoded. Delete the cache file to rebuild it.")
    )]
    Corrupt { key: String },
}

// ---------------------------------------------------------------------------
// Graph errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error("failed to open graph store at {path}: {message}")]
    #[diagnostic(
        code(authlink::graph::open),
        help(
            "The oxigraph store could not be opened. Ensure the directory is writable \
             and not locked by another authlink process."
        )
    )]
    Open { path: String, message: String },

    #[error("SPARQL query error: {message}")]
    #[diagnostic(
        code(authlink::graph::sparql),
        help("The SPARQL query failed to parse or evaluate. Enable debug logging to see the query text.")
    )]
    Sparql { message: String },

    #[error("SPARQL update error: {message}")]
    #[diagnostic(
        code(authlink::graph::update),
        help("The INSERT DATA update was rejected. Nothing from this update was written.")
    )]
    Update { message: String },

    #[error("invalid IRI \"{iri}\": {message}")]
    #[diagnostic(
        code(authlink::graph::invalid_iri),
        help("IRIs must be absolute and must not contain spaces, quotes, or angle brackets.")
    )]
    InvalidIri { iri: String, message: String },

    #[error("invalid literal: {message}")]
    #[diagnostic(code(authlink::graph::invalid_literal))]
    InvalidLiteral { message: String },

    #[error("RDF parse error ({format}): {message}")]
    #[diagnostic(
        code(authlink::graph::parse),
        help("The document is not valid in the detected RDF serialization.")
    )]
    Parse { format: String, message: String },

    #[error("unexpected result shape: expected {expected}")]
    #[diagnostic(code(authlink::graph::result_shape))]
    ResultShape { expected: &'static str },
}

// ---------------------------------------------------------------------------
// Provider errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ProviderError {
    #[error("provider timed out after {timeout_secs}s: {url}")]
    #[diagnostic(
        code(authlink::provider::timeout),
        help("Raise `provider.timeout_secs` if the provider is slow but reachable.")
    )]
    Timeout { url: String, timeout_secs: u64 },

    #[error("provider returned HTTP {status} for {url}")]
    #[diagnostic(
        code(authlink::provider::status),
        help(
            "5xx, 408, 429 and rejected credentials (401, 403, 407) are retried on the \
             next run. Check `provider.api_key`. Other 4xx statuses usually mean the \
             search URL is wrong."
        )
    )]
    Status { url: String, status: u16 },

    #[error("transport error fetching {url}: {message}")]
    #[diagnostic(
        code(authlink::provider::transport),
        help("Check network connectivity and the `provider.search_url` setting.")
    )]
    Transport { url: String, message: String },

    #[error("malformed provider response from {url}: {message}")]
    #[diagnostic(
        code(authlink::provider::malformed),
        help(
            "The response could not be read as RDF. Check `provider.default_format` \
             and the Content-Type the provider sends."
        )
    )]
    Malformed { url: String, message: String },

    #[error("invalid search URL template \"{template}\": {message}")]
    #[diagnostic(
        code(authlink::provider::search_url),
        help("`provider.search_url` must be an absolute http(s) URL.")
    )]
    SearchUrl { template: String, message: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),
}

impl ProviderError {
    /// Whether a later attempt could plausibly succeed.
    ///
    /// Transient failures leave no attempt marker so the next run retries the
    /// variant. Terminal ones are recorded like a completed attempt.
    /// Rejected credentials (401, 403, 407) are transient: they say nothing
    /// about the query itself.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Transport { .. } | Self::Malformed { .. } => true,
            Self::Status { status, .. } => {
                *status >= 500 || matches!(*status, 401 | 403 | 407 | 408 | 429)
            }
            Self::SearchUrl { .. } | Self::Graph(_) => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Mutation errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum MutationError {
    #[error("failed to assemble enrichment facts for {author}: {source}")]
    #[diagnostic(
        code(authlink::mutate::assemble),
        help("Nothing was written for this author. It will be retried on the next run.")
    )]
    Assemble {
        author: String,
        #[source]
        source: GraphError,
    },

    #[error("enrichment for {author} has {facts} facts, over the limit of {limit}")]
    #[diagnostic(
        code(authlink::mutate::too_large),
        help(
            "Nothing was written for this author. Raise `max_facts_per_author` if the \
             provider response is legitimately this large."
        )
    )]
    TooLarge {
        author: String,
        facts: usize,
        limit: usize,
    },

    #[error("failed to commit {facts} facts for {author}: {source}")]
    #[diagnostic(
        code(authlink::mutate::commit),
        help("The transaction was discarded. The author will be retried on the next run.")
    )]
    Commit {
        author: String,
        facts: usize,
        #[source]
        source: GraphError,
    },
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(authlink::config::read),
        help("Ensure the config file exists, or omit --config to use defaults.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {message}")]
    #[diagnostic(
        code(authlink::config::parse),
        help("Check the TOML syntax and the option names in the config file.")
    )]
    Parse { path: String, message: String },

    #[error("invalid configuration: {message}")]
    #[diagnostic(code(authlink::config::invalid), help("{message}"))]
    Invalid { message: String },
}

/// Convenience alias for functions returning authlink results.
pub type AuthlinkResult<T> = std::result::Result<T, AuthlinkError>;
