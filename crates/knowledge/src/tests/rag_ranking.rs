//! Ranking behaviour of the in-memory index.

use super::normalize;
use crate::types::{Fragment, IndexEntry};
use crate::vector_index::{MemoryIndex, VectorIndex};
use std::path::PathBuf;

fn entry(path: &str, text: &str, vector: Vec<f32>) -> IndexEntry {
    IndexEntry {
        fragment: Fragment {
            source_path: PathBuf::from(path),
            position: 0,
            text: text.to_string(),
            char_start: 0,
            char_end: text.chars().count(),
        },
        vector,
    }
}

fn build(entries: Vec<IndexEntry>) -> MemoryIndex {
    let mut index = MemoryIndex::new();
    index.build(entries).unwrap();
    index
}

#[test]
fn test_relevant_query_returns_high_scores() {
    let index = build(vec![
        entry(
            "lang.py",
            "Rust is a systems programming language",
            normalize(&[1.0, 0.5, 0.2, 0.1]),
        ),
        entry(
            "cooking.py",
            "Cooking recipes for pasta",
            normalize(&[-0.3, -0.8, 0.4, -0.2]),
        ),
    ]);

    let results = index.search(&normalize(&[0.9, 0.4, 0.3, 0.1]), 5).unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].fragment.source_path, PathBuf::from("lang.py"));
    assert!(
        results[0].score > 0.9,
        "Relevant fragment should score above 0.9, got {}",
        results[0].score
    );
    assert!(results[0].score > results[1].score, "Scores should be ordered");
}

#[test]
fn test_negative_similarity_still_ranked() {
    let index = build(vec![entry(
        "opposite.py",
        "opposite",
        normalize(&[-1.0, 0.0, 0.0]),
    )]);

    let results = index.search(&normalize(&[1.0, 0.0, 0.0]), 4).unwrap();

    assert_eq!(results.len(), 1);
    assert!((results[0].score + 1.0).abs() < 1e-5);
}

#[test]
fn test_scores_are_ordered_descending() {
    let index = build(
        [
            [1.0, 0.0, 0.0],
            [0.7, 0.7, 0.0],
            [0.0, 1.0, 0.0],
            [0.5, 0.2, 0.8],
            [-1.0, 0.0, 0.0],
        ]
        .iter()
        .enumerate()
        .map(|(i, v)| entry(&format!("f{}.py", i), "x", normalize(v)))
        .collect(),
    );

    let results = index.search(&normalize(&[1.0, 0.1, 0.0]), 5).unwrap();

    assert_eq!(results.len(), 5);
    for pair in results.windows(2) {
        assert!(
            pair[0].score >= pair[1].score,
            "Scores not descending: {} < {}",
            pair[0].score,
            pair[1].score
        );
    }
    assert_eq!(results[0].fragment.source_path, PathBuf::from("f0.py"));
}

#[test]
fn test_empty_build_returns_no_results() {
    let index = build(Vec::new());
    let results = index.search(&[1.0, 0.0], 4).unwrap();
    assert!(results.is_empty(), "Empty index should return no results");
}

#[test]
fn test_top_k_limit_respected() {
    let index = build(
        (0..10)
            .map(|i| {
                entry(
                    &format!("f{}.py", i),
                    "x",
                    normalize(&[1.0, i as f32 * 0.1, 0.0]),
                )
            })
            .collect(),
    );

    let results = index.search(&normalize(&[1.0, 0.0, 0.0]), 3).unwrap();
    assert_eq!(results.len(), 3, "Should return exactly top_k results");

    let default_k = index.search(&normalize(&[1.0, 0.0, 0.0]), 4).unwrap();
    assert_eq!(default_k.len(), 4);
}

#[test]
fn test_self_similarity_over_all_entries() {
    let vectors: Vec<Vec<f32>> = (0..6)
        .map(|i| {
            let angle = i as f32 * 0.5;
            normalize(&[angle.cos(), angle.sin(), 0.1 * i as f32])
        })
        .collect();
    let index = build(
        vectors
            .iter()
            .enumerate()
            .map(|(i, v)| entry(&format!("f{}.py", i), "x", v.clone()))
            .collect(),
    );

    for (i, v) in vectors.iter().enumerate() {
        let results = index.search(v, vectors.len()).unwrap();
        assert_eq!(
            results[0].fragment.source_path,
            PathBuf::from(format!("f{}.py", i))
        );
    }
}
