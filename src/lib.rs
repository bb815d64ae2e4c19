// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # authlink
//!
//! Reconciles a local registry of researchers with an external bibliographic
//! provider and merges verified provider facts into a knowledge graph.
//!
//! ## Architecture
//!
//! - **Provider** (`provider`): search-variant generation, bounded HTTP
//!   dereferencing, provider RDF documents
//! - **Matching** (`matching`): affiliation, name and keyword-relatedness checks
//! - **Cache** (`cache`): persistent redb memo and symmetric distance stores
//! - **Mutation** (`mutate`): all-or-nothing enrichment of the provider graph
//! - **Orchestrator** (`orchestrator`): the resumable batch loop and progress
//! - **Graph** (`graph`): oxigraph-backed SPARQL store and query builders
//!
//! ## Library usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use authlink::cache::DistanceCache;
//! use authlink::config::JobConfig;
//! use authlink::graph::SparqlStore;
//! use authlink::orchestrator::Reconciler;
//! use authlink::provider::http::HttpDereferencer;
//!
//! let config = JobConfig::default();
//! let store = SparqlStore::open(std::path::Path::new("graph")).unwrap();
//! let report = DistanceCache::scoped(&config.cache, |cache| {
//!     let http = HttpDereferencer::new(&config.provider);
//!     Reconciler::new(config.clone(), store, Arc::clone(cache), Box::new(http))
//!         .and_then(|r| r.run())
//! })
//! .unwrap();
//! println!("{report}");
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod graph;
pub mod matching;
pub mod mutate;
pub mod orchestrator;
pub mod paths;
pub mod provider;
pub mod registry;
pub mod similarity;
pub mod vocab;
