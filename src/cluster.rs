//! 類似語集合の操作とクラスタリング用エクスポート
//!
//! Operations on sets of semantically similar words, and graph exports for
//! external clustering tools.

use crate::compose::{self, Composition};
use crate::debug_print;
use crate::error::WordspaceResult;
use crate::store::{WordAndScore, WordSpace};
use crate::vector::{SimilarityMeasure, SparseVector};
use std::collections::{HashMap, HashSet};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Take the `n` most similar words of `word` and keep only those that also
/// appear in the similarity list of at least one of the other similar
/// words. Original order and similarity values are preserved; the result
/// has at most `n` entries. Returns `None` when `word` is unknown. Only
/// works with word spaces of type SIM.
pub fn filter_outliers(
    space: &WordSpace,
    word: &str,
    n: usize,
) -> WordspaceResult<Option<Vec<WordAndScore>>> {
    space.require_sim("filter_outliers")?;

    let Some(similar) = space.similar_words(word)? else {
        return Ok(None);
    };
    let top: Vec<&WordAndScore> = similar.iter().take(n).collect();
    let top_words: HashSet<&str> = top.iter().map(|s| s.word.as_str()).collect();

    // a top word is confirmed when any other top word lists it as similar
    let mut confirmed: HashSet<String> = HashSet::new();
    for entry in &top {
        let Some(second_order) = space.similar_words(&entry.word)? else {
            continue;
        };
        for candidate in second_order {
            if top_words.contains(candidate.word.as_str()) {
                confirmed.insert(candidate.word);
            }
        }
    }

    Ok(Some(
        top.into_iter()
            .filter(|entry| confirmed.contains(&entry.word))
            .cloned()
            .collect(),
    ))
}

/// Grow a word set: compose the input word vectors by addition and return
/// the words nearest to the combined vector, excluding the inputs, at most
/// `n` of them. Only works with word spaces of type SIM.
pub fn grow_set(space: &WordSpace, input_set: &[&str], n: usize) -> WordspaceResult<Vec<String>> {
    space.require_sim("grow_set")?;

    let mut vectors: Vec<Option<SparseVector>> = Vec::new();
    let mut inputs: HashSet<&str> = HashSet::new();
    for word in input_set {
        let vector = space.word_vector(word)?;
        if vector.is_some() {
            vectors.push(vector);
        }
        inputs.insert(word);
    }
    let Some(combined) = compose::compose_sparse_list(&vectors, Composition::Addition) else {
        return Ok(Vec::new());
    };

    let similar =
        compose::similar_words_for_vector(&combined, space, SimilarityMeasure::Cosine, n)?;
    Ok(similar
        .into_iter()
        .filter(|s| !inputs.contains(s.word.as_str()))
        .map(|s| s.word)
        .collect())
}

/// Export the neighborhood graph of the first `n` vocabulary words as a
/// sparse graph file for external graph clustering.
///
/// Two files are created in `output_dir` (existing files are overwritten):
/// `sparseGraph.dat` with one line per word holding space-separated
/// `neighborId similarity` pairs, and `rowLabels.dat` with the word of each
/// row. Neighbor ids are 1-based row numbers in iteration order. Only edges
/// with a similarity of at least `min_sim` between words of the first `n`
/// are written; since neighbor lists are sorted, writing stops at the first
/// neighbor below the threshold or outside the exported set.
///
/// Run this against a word space loaded into memory. Only works with word
/// spaces of type SIM.
pub fn export_similarity_graph(
    space: &WordSpace,
    n: usize,
    min_sim: f32,
    output_dir: impl AsRef<Path>,
) -> WordspaceResult<()> {
    space.require_sim("export_similarity_graph")?;
    let output_dir = output_dir.as_ref();

    // first-n word to 1-based row id
    let words: Vec<String> = space.vocabulary_iter()?.take(n).collect();
    let row_ids: HashMap<&str, usize> = words
        .iter()
        .enumerate()
        .map(|(i, w)| (w.as_str(), i + 1))
        .collect();

    let mut graph = BufWriter::new(std::fs::File::create(output_dir.join("sparseGraph.dat"))?);
    let mut labels = BufWriter::new(std::fs::File::create(output_dir.join("rowLabels.dat"))?);

    let mut empty_rows = 0usize;
    let mut entries = 0usize;
    for word in &words {
        let neighbors = space.similar_words(word)?.unwrap_or_default();
        let mut first = true;
        for neighbor in &neighbors {
            // neighbor lists are sorted, everything after this is below too
            if neighbor.score < min_sim {
                break;
            }
            let Some(id) = row_ids.get(neighbor.word.as_str()) else {
                break;
            };
            if first {
                write!(graph, "{} {}", id, neighbor.score)?;
                first = false;
            } else {
                write!(graph, " {} {}", id, neighbor.score)?;
            }
            entries += 1;
        }
        writeln!(graph)?;
        writeln!(labels, "{word}")?;
        if first {
            empty_rows += 1;
        }
    }
    graph.flush()?;
    labels.flush()?;

    debug_print!(
        "similarity graph export: {} vertices, {entries} entries, {empty_rows} empty rows",
        words.len()
    );
    Ok(())
}

/// Export the sparse word vectors of `word_list` as a sparse matrix file
/// for external vector clustering.
///
/// Two files are created in `output_dir` (existing files are overwritten):
/// `sparseMatrix.dat` with one line per word holding space-separated
/// `featureId value` pairs, and `rowLabels.dat` with the word of each row.
/// Feature ids are assigned in first-use order across the whole export,
/// starting at 1. Unknown words are skipped.
///
/// Works with word spaces of any type; run it against a word space loaded
/// into memory.
pub fn export_vector_matrix(
    space: &WordSpace,
    word_list: &[&str],
    output_dir: impl AsRef<Path>,
) -> WordspaceResult<()> {
    let output_dir = output_dir.as_ref();
    let mut matrix = BufWriter::new(std::fs::File::create(output_dir.join("sparseMatrix.dat"))?);
    let mut labels = BufWriter::new(std::fs::File::create(output_dir.join("rowLabels.dat"))?);

    let mut feature_ids: HashMap<String, usize> = HashMap::new();
    let mut rows = 0usize;
    let mut entries = 0usize;
    let mut empty_rows = 0usize;
    for word in word_list {
        let Some(vector) = space.word_vector(word)? else {
            debug_print!("word '{word}' not found in index -- word ignored");
            continue;
        };
        if vector.is_empty() {
            empty_rows += 1;
        }
        let mut first = true;
        for (feature, value) in &vector {
            let next_id = feature_ids.len() + 1;
            let id = *feature_ids.entry(feature.clone()).or_insert(next_id);
            if first {
                write!(matrix, "{id} {value}")?;
                first = false;
            } else {
                write!(matrix, " {id} {value}")?;
            }
            entries += 1;
        }
        writeln!(matrix)?;
        writeln!(labels, "{word}")?;
        rows += 1;
    }
    matrix.flush()?;
    labels.flush()?;

    debug_print!(
        "sparse matrix export: {rows} rows, {} features, {entries} entries, {empty_rows} empty rows",
        feature_ids.len()
    );
    Ok(())
}
