//! Integration tests for the rank utilities, outlier filtering, set growth
//! and the clustering exports.

mod helpers;

use helpers::{fruit_entries, write_sparse_space};
use std::collections::HashSet;
use tempfile::TempDir;
use wordspace::cluster::{
    export_similarity_graph, export_vector_matrix, filter_outliers, grow_set,
};
use wordspace::rank::{highest_ranking_col, highest_ranking_sim, rank_col, rank_sim};
use wordspace::{WordSpace, WordspaceError};

fn sim_space() -> (TempDir, WordSpace) {
    let dir = TempDir::new().unwrap();
    write_sparse_space(dir.path(), &fruit_entries(), true);
    let space = WordSpace::open(dir.path(), true).unwrap();
    (dir, space)
}

#[test]
fn rank_in_similarity_list() {
    let (_dir, space) = sim_space();
    assert_eq!(rank_sim(&space, "apple", "banana").unwrap(), 1);
    assert_eq!(rank_sim(&space, "apple", "cherry").unwrap(), 2);
    // "car" is not in banana's similarity list
    assert_eq!(rank_sim(&space, "banana", "car").unwrap(), 0);
    assert_eq!(rank_sim(&space, "unknown", "apple").unwrap(), -1);
}

#[test]
fn rank_in_collocation_list() {
    let (_dir, space) = sim_space();
    let store = space.as_sparse().unwrap();
    // apple's strongest collocate is "fruit" (summed over relations)
    assert_eq!(rank_col(store, "apple", "fruit").unwrap(), 1);
    assert_eq!(rank_col(store, "apple", "red").unwrap(), 2);
    assert_eq!(rank_col(store, "apple", "yellow").unwrap(), 0);
    assert_eq!(rank_col(store, "unknown", "red").unwrap(), -1);
}

#[test]
fn highest_ranking_sim_uses_rank_products() {
    let (_dir, space) = sim_space();
    let words: HashSet<String> = ["banana".to_string()].into();
    let result = highest_ranking_sim(&space, &words).unwrap();
    // banana ranks 2nd for cherry (product 2); its 1st rank for apple gives
    // a product of 1, which is not kept
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].word, "cherry");
    assert_eq!(result[0].rank, 2);
}

#[test]
fn highest_ranking_col_uses_collocation_ranks() {
    let (_dir, space) = sim_space();
    let store = space.as_sparse().unwrap();
    let words: HashSet<String> = ["red".to_string()].into();
    let result = highest_ranking_col(store, &words).unwrap();
    // "red" ranks 2nd for apple and cherry and 2nd for car
    assert!(!result.is_empty());
    assert!(result.windows(2).all(|w| w[0].rank <= w[1].rank));
    for entry in &result {
        assert!(entry.rank > 1);
    }
}

#[test]
fn filter_outliers_drops_unconfirmed_words() {
    let (_dir, space) = sim_space();
    // apple's top 3: banana, cherry, car. banana and cherry confirm each
    // other; nothing lists car
    let filtered = filter_outliers(&space, "apple", 3).unwrap().unwrap();
    let words: Vec<&str> = filtered.iter().map(|s| s.word.as_str()).collect();
    assert_eq!(words, vec!["banana", "cherry"]);
    // scores survive unchanged, in the original order
    assert!((filtered[0].score - 0.8).abs() < 1e-6);
    assert!((filtered[1].score - 0.6).abs() < 1e-6);

    assert!(filter_outliers(&space, "unknown", 3).unwrap().is_none());
}

#[test]
fn filter_outliers_requires_sim_space() {
    let dir = TempDir::new().unwrap();
    write_sparse_space(dir.path(), &fruit_entries(), false);
    let space = WordSpace::open(dir.path(), false).unwrap();
    assert!(matches!(
        filter_outliers(&space, "apple", 3),
        Err(WordspaceError::WrongWordspaceType { .. })
    ));
}

#[test]
fn grow_set_excludes_the_inputs() {
    let (_dir, space) = sim_space();
    let grown = grow_set(&space, &["apple", "banana"], 3).unwrap();
    assert_eq!(grown, vec!["cherry".to_string()]);
}

#[test]
fn grow_set_with_unknown_inputs_is_empty() {
    let (_dir, space) = sim_space();
    assert!(grow_set(&space, &["unknown"], 3).unwrap().is_empty());
}

#[test]
fn similarity_graph_export() {
    let (_dir, space) = sim_space();
    let out = TempDir::new().unwrap();
    export_similarity_graph(&space, 3, 0.55, out.path()).unwrap();

    let labels = std::fs::read_to_string(out.path().join("rowLabels.dat")).unwrap();
    assert_eq!(labels.lines().collect::<Vec<_>>(), vec!["apple", "banana", "cherry"]);

    let graph = std::fs::read_to_string(out.path().join("sparseGraph.dat")).unwrap();
    let rows: Vec<&str> = graph.lines().collect();
    assert_eq!(rows.len(), 3);
    // apple: banana (id 2) at 0.8 and cherry (id 3) at 0.6; car is below
    // the threshold
    assert_eq!(rows[0], "2 0.8 3 0.6");
    // banana: apple (id 1) at 0.8; cherry falls below 0.55
    assert_eq!(rows[1], "1 0.8");
    assert_eq!(rows[2], "1 0.6");
}

#[test]
fn vector_matrix_export() {
    let (_dir, space) = sim_space();
    let out = TempDir::new().unwrap();
    export_vector_matrix(&space, &["apple", "banana", "unknown"], out.path()).unwrap();

    let labels = std::fs::read_to_string(out.path().join("rowLabels.dat")).unwrap();
    // the unknown word is skipped entirely
    assert_eq!(labels.lines().collect::<Vec<_>>(), vec!["apple", "banana"]);

    let matrix = std::fs::read_to_string(out.path().join("sparseMatrix.dat")).unwrap();
    let rows: Vec<&str> = matrix.lines().collect();
    assert_eq!(rows.len(), 2);
    // apple has four features, banana three; ids are space-separated pairs
    assert_eq!(rows[0].split_whitespace().count(), 8);
    assert_eq!(rows[1].split_whitespace().count(), 6);
}
