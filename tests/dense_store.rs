//! Integration tests for the dense matrix back-end.

mod helpers;

use helpers::{dense_col_space, dense_sim_space, royal_words};
use tempfile::TempDir;
use wordspace::{
    DenseStore, NOT_FOUND_SIMILARITY, SimilarityMeasure, WordSpace, WordspaceConfig,
    WordspaceError, WordspaceType,
};

#[test]
fn lookup_and_row_access() {
    let store = dense_col_space();
    let (words, vectors) = royal_words();
    for (id, word) in words.iter().enumerate() {
        assert_eq!(store.matrix_row_number(word), Some(id));
        assert_eq!(store.word_vector(id).unwrap(), vectors[id].as_slice());
        assert_eq!(store.get_word(id).unwrap(), *word);
    }
    assert_eq!(store.number_of_words(), 5);
    assert_eq!(store.dimensions(), 4);
    assert!(store.get_word(5).is_none());
    assert!(store.word_vector(5).is_none());
}

#[test]
fn unknown_words_are_guarded_against_hash_collisions() {
    let store = dense_col_space();
    // the perfect hash answers for any string; the id table must reject
    // words outside the vocabulary
    for oov in ["zebra", "kingdom", "quee", "", "völlig unbekannt"] {
        assert_eq!(store.matrix_row_number(oov), None, "{oov}");
        assert!(store.word_embedding(oov).is_none());
        assert_eq!(store.frequency(oov), 0);
    }
}

#[test]
fn embedding_for_known_word_aliases_the_row() {
    let store = dense_col_space();
    let embedding = store.word_embedding("king").unwrap();
    assert_eq!(embedding.as_ref(), &[1.0, 0.0, 1.0, 1.0]);
}

#[test]
fn frequency_by_word() {
    let store = dense_col_space();
    assert_eq!(store.frequency("king"), 100);
    assert_eq!(store.frequency("woman"), 450);
}

#[test]
fn similar_words_on_col_space_is_wrong_type() {
    let store = dense_col_space();
    assert!(matches!(
        store.similar_words("king").unwrap_err(),
        WordspaceError::WrongWordspaceType { .. }
    ));
}

#[test]
fn similar_words_stop_at_zero_similarity() {
    // one real neighbor, then a zero-terminated slot
    let (words, vectors) = royal_words();
    let dim = vectors[0].len();
    let matrix: Vec<f32> = vectors.into_iter().flatten().collect();
    let store = DenseStore::new(
        words,
        vec![1, 1, 1, 1, 1],
        matrix,
        dim,
        WordspaceConfig::default(),
    )
    .unwrap()
    .with_neighbors(
        vec![1, 0, 2, 0, 3, 0, 1, 0, 0, 0],
        vec![0.9, 0.0, 0.8, 0.0, 0.7, 0.0, 0.6, 0.0, 0.5, 0.0],
        2,
    )
    .unwrap();

    let similar = store.similar_words("king").unwrap().unwrap();
    assert_eq!(similar.len(), 1);
    assert_eq!(similar[0].word, "queen");
    assert!((similar[0].score - 0.9).abs() < 1e-6);
}

#[test]
fn sim_space_neighbors_are_sorted_and_valid() {
    let store = dense_sim_space(2);
    assert_eq!(store.wordspace_type(), WordspaceType::Sim);
    assert_eq!(store.number_of_similar_words(), 2);

    for id in 0..store.number_of_words() {
        let word = store.get_word(id).unwrap();
        let similar = store.similar_words(&word).unwrap().unwrap();
        assert!(similar.len() <= 2);
        assert!(similar.windows(2).all(|w| w[0].score >= w[1].score));
        for entry in &similar {
            // every neighbor id resolves to a vocabulary word
            assert!(store.matrix_row_number(&entry.word).is_some());
            assert!(entry.score > 0.0);
        }
    }
}

#[test]
fn second_order_similarity_uses_neighbor_ids() {
    let store = dense_sim_space(2);
    // king and woman both store {queen, man} as neighbors; king and man
    // store disjoint sets ({man, queen} vs {king, woman})
    let shared = store
        .second_order_similarity("king", "woman", SimilarityMeasure::Kolb)
        .unwrap();
    assert!(shared > 0.0);
    let disjoint = store
        .second_order_similarity("king", "man", SimilarityMeasure::Kolb)
        .unwrap();
    assert_eq!(disjoint, 0.0);
    assert_eq!(
        store
            .second_order_similarity("king", "unknown", SimilarityMeasure::Kolb)
            .unwrap(),
        NOT_FOUND_SIMILARITY
    );
}

#[test]
fn serialization_round_trip() {
    let store = dense_sim_space(2);
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("royal.ws");
    store.serialize_to(&path).unwrap();

    let restored = DenseStore::deserialize_from(&path).unwrap();
    // the number of similar words is restored from the matrix width
    assert_eq!(restored.number_of_similar_words(), 2);
    assert_eq!(restored.number_of_words(), store.number_of_words());
    assert_eq!(restored.dimensions(), store.dimensions());
    assert_eq!(restored.wordspace_type(), WordspaceType::Sim);
    assert_eq!(restored.config().vocabulary_size, 5);

    for id in 0..store.number_of_words() {
        assert_eq!(store.word_vector(id), restored.word_vector(id));
        assert_eq!(store.get_word(id), restored.get_word(id));
        let word = store.get_word(id).unwrap();
        assert_eq!(
            store.similar_words(&word).unwrap(),
            restored.similar_words(&word).unwrap()
        );
        assert_eq!(store.frequency(&word), restored.frequency(&word));
    }
}

#[test]
fn round_trip_with_literal_values() {
    // three words, four dimensions, two neighbors per word
    let store = DenseStore::new(
        vec!["eins".into(), "zwei".into(), "drei".into()],
        vec![3, 2, 1],
        vec![
            0.1, 0.2, 0.3, 0.4, //
            0.5, 0.6, 0.7, 0.8, //
            0.9, 1.0, 1.1, 1.2,
        ],
        4,
        WordspaceConfig::default(),
    )
    .unwrap()
    .with_neighbors(
        vec![1, 2, 0, 2, 0, 1],
        vec![0.9, 0.5, 0.9, 0.4, 0.5, 0.4],
        2,
    )
    .unwrap();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("literal.ws");
    store.serialize_to(&path).unwrap();
    let restored = DenseStore::deserialize_from(&path).unwrap();

    assert_eq!(restored.number_of_similar_words(), 2);
    assert_eq!(restored.word_vector(1).unwrap(), &[0.5, 0.6, 0.7, 0.8]);
    assert_eq!(restored.get_word(2).unwrap(), "drei");
    let similar = restored.similar_words("eins").unwrap().unwrap();
    assert_eq!(similar[0].word, "zwei");
    assert!((similar[0].score - 0.9).abs() < 1e-6);
}

#[test]
fn corrupt_image_is_fatal() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.ws");
    std::fs::write(&path, b"not a word space").unwrap();
    assert!(matches!(
        DenseStore::deserialize_from(&path),
        Err(WordspaceError::Serialization { .. })
    ));
}

#[test]
fn open_autodetects_file_as_dense() {
    let store = dense_sim_space(2);
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("royal.ws");
    store.serialize_to(&path).unwrap();

    let space = WordSpace::open(&path, false).unwrap();
    assert!(space.as_dense().is_some());
    assert_eq!(space.number_of_words(), 5);
    assert_eq!(space.frequency("queen").unwrap(), 80);
}

#[test]
fn word_vector_map_uses_column_ids() {
    let store = dense_col_space();
    let map = store.word_vector_map("king").unwrap();
    assert_eq!(map.len(), 4);
    assert_eq!(map["0"], 1.0);
    assert_eq!(map["3"], 1.0);
}

#[test]
fn collocations_rank_columns_by_value() {
    let store = dense_col_space();
    let collocations = store.collocations("apple").unwrap();
    assert_eq!(collocations.len(), 4);
    // the highest column value of apple is 0.1 in column 2
    assert_eq!(collocations[0].word, "2");
    assert!((collocations[0].score - 0.1).abs() < 1e-6);
}

#[test]
fn most_similar_scans_all_rows() {
    let store = dense_col_space();
    let king = store.matrix_row_number("king").unwrap();
    let similar = store.most_similar(king, 2).unwrap();
    assert_eq!(similar.len(), 2);
    assert_eq!(similar[0].word, "man");
}

#[test]
fn word_frequency_list_covers_the_vocabulary() {
    let store = dense_col_space();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("frequencies.txt");
    assert_eq!(store.word_frequency_list(&path).unwrap(), 5);
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.lines().any(|l| l == "king\t100"));
}

#[test]
fn subword_synthesis_for_oov_words() {
    let (words, vectors) = royal_words();
    let dim = vectors[0].len();
    let matrix: Vec<f32> = vectors.into_iter().flatten().collect();
    let store = DenseStore::new(
        words,
        vec![1; 5],
        matrix,
        dim,
        WordspaceConfig::default(),
    )
    .unwrap()
    .with_ngrams(
        vec!["<ki".into(), "kin".into(), "ing".into(), "ng>".into()],
        vec![
            0.1, 0.0, 0.0, 0.0, //
            0.0, 0.2, 0.0, 0.0, //
            0.0, 0.0, 0.3, 0.0, //
            0.0, 0.0, 0.0, 0.4,
        ],
        3,
        3,
    )
    .unwrap();

    // "kings" is OOV; its padded trigrams include <ki, kin, ing but not ng>
    let embedding = store.word_embedding("kings").unwrap();
    assert_eq!(embedding.as_ref(), &[0.1, 0.2, 0.3, 0.0]);

    // an OOV word with no matching n-gram gets the zero vector, which is
    // distinct from not-found
    let zero = store.word_embedding("xyz").unwrap();
    assert_eq!(zero.as_ref(), &[0.0, 0.0, 0.0, 0.0]);

    // known words are still served from the matrix
    assert_eq!(
        store.word_embedding("king").unwrap().as_ref(),
        &[1.0, 0.0, 1.0, 1.0]
    );
}

#[test]
fn handle_is_shareable_across_threads() {
    let store = dense_sim_space(2);
    let space = WordSpace::Dense(store);
    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..50 {
                    let similar = space.similar_words("king").unwrap().unwrap();
                    assert!(!similar.is_empty());
                }
            });
        }
    });
}
