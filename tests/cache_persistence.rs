//! Cache behaviour across process-like lifetimes (open, use, close, reopen).

use std::sync::Arc;

use authlink::cache::DistanceCache;
use authlink::config::CacheConfig;
use authlink::matching::SemanticKeywordComparator;
use authlink::matching::keywords;
use tempfile::TempDir;

fn config(dir: &TempDir, compaction_probability: f64) -> CacheConfig {
    CacheConfig {
        memo_file: Some(dir.path().join("data.redb")),
        distance_file: Some(dir.path().join("distance.redb")),
        compaction_probability,
    }
}

#[test]
fn scoped_cache_survives_restart() {
    let dir = TempDir::new().unwrap();
    let cfg = config(&dir, 0.0);

    let cold = DistanceCache::scoped(&cfg, |cache| {
        let comparator = SemanticKeywordComparator::new(Arc::clone(cache), 0.8);
        comparator.distance("ontologies", "ontology")
    });

    let cache = DistanceCache::open(&cfg).unwrap();
    assert_eq!(cache.distance("ontology", "ontologies"), Some(cold));
    let stats = cache.stats().unwrap();
    assert_eq!(stats.distance_persisted, 1);
    assert_eq!(stats.distance_pending, 0);
}

#[test]
fn keyword_memo_is_persisted() {
    let dir = TempDir::new().unwrap();
    let cfg = config(&dir, 0.0);
    let text = "Annotation of semantic web services";

    {
        let cache = DistanceCache::open(&cfg).unwrap();
        keywords::extract_cached(&cache, text);
        cache.close().unwrap();
    }

    let cache = DistanceCache::open(&cfg).unwrap();
    assert_eq!(cache.stats().unwrap().memo_persisted, 1);
    assert_eq!(keywords::extract_cached(&cache, text), keywords::extract(text));
}

#[test]
fn cold_and_warm_caches_agree() {
    let dir = TempDir::new().unwrap();
    let cfg = config(&dir, 0.0);
    let author = vec!["semantic web".to_string(), "ontologies".to_string()];
    let titles = [
        "Semantic web services annotation",
        "Ontology alignment in practice",
        "Pediatric cardiology outcomes",
    ];

    let decide = || {
        DistanceCache::scoped(&cfg, |cache| {
            let comparator = SemanticKeywordComparator::new(Arc::clone(cache), 0.8);
            let gate = comparator.gate(true, &author);
            titles.iter().map(|t| gate.admits(t)).collect::<Vec<_>>()
        })
    };

    let cold = decide();
    let warm = decide();
    assert_eq!(cold, warm);
}

#[test]
fn compaction_on_close_keeps_entries() {
    let dir = TempDir::new().unwrap();
    let cache = DistanceCache::open(&config(&dir, 1.0)).unwrap();
    cache.put_distance("a", "b", 0.5);
    let report = cache.close().unwrap();
    assert_eq!(report.flushed, 1);

    let cache = DistanceCache::open(&config(&dir, 0.0)).unwrap();
    assert_eq!(cache.distance("b", "a"), Some(0.5));
}

#[test]
fn unusable_location_degrades_but_serves() {
    let dir = TempDir::new().unwrap();
    // A directory where a file is expected.
    let blocked = dir.path().join("blocked");
    std::fs::create_dir_all(&blocked).unwrap();
    let cfg = CacheConfig {
        memo_file: Some(blocked.clone()),
        distance_file: Some(blocked),
        compaction_probability: 0.0,
    };

    assert!(DistanceCache::open(&cfg).is_err());

    let cache = DistanceCache::open_best_effort(&cfg);
    assert!(cache.is_degraded());
    cache.put_distance("x", "y", 0.25);
    assert_eq!(cache.distance("y", "x"), Some(0.25));
}
