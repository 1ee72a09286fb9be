//! 合成的分布意味論モジュール
//!
//! 構成語のベクトル合成による複数単語フレーズのベクトル計算、任意の
//! ベクトルに対する最近傍語彙探索（全探索および近傍グラフ探索）、
//! アナロジー（類推）の解決を提供します。
//!
//! Compositional distributional semantics.
//!
//! Support for computing vectors of multi-word phrases by composing the
//! vectors of the constituent words, for finding the nearest vocabulary
//! words to an arbitrary vector (exhaustively or by best-first search over
//! the stored neighborhood graph), and for solving analogies of the form
//! `a1 : b1 = a2 : b2`.
//!
//! Everything comes in two flavors, one per vector representation: sparse
//! feature maps for the inverted-index back-end and dense slices for the
//! matrix back-end.

use crate::debug_print;
use crate::error::{WordspaceError, WordspaceResult};
use crate::store::{DenseStore, WordAndScore, WordSpace, WordspaceType, sort_by_score_desc};
use crate::vector::{SimilarityMeasure, SparseVector, dense, sparse};
use rand::Rng;
use std::collections::VecDeque;

/// Number of candidates returned by the analogy solvers.
const ANALOGY_RESULTS: usize = 12;

/// Number of random start words drawn by the graph search.
const GRAPH_SEARCH_INIT_SET_SIZE: usize = 100;

/// ベクトル合成演算子
///
/// Vector composition operators.
///
/// `Combined` and `Dilation` carry their parameters; construct them with
/// [`Composition::combined`] and [`Composition::dilation`] for the standard
/// parameter values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Composition {
    /// Simple vector addition.
    Addition,
    /// Vector subtraction.
    Subtraction,
    /// Entry-wise multiplication.
    Multiplication,
    /// Choose per dimension the value with the highest absolute value
    /// (Forgues et al. 2014).
    Extrema,
    /// Parameterized combination of addition and multiplication,
    /// `a*u + b*v + c*(u*v)`, cf. equation (11) in Mitchell & Lapata 2008.
    Combined { a: f32, b: f32, c: f32 },
    /// Dilate vector `v` along the direction of `u`:
    /// `(u*u)v + (lambda-1)(u*v)u`, with `*` the dot product. Unlike the
    /// other operators this one is not symmetric. Only meaningful together
    /// with the cosine measure. See chapter 4 of Mitchell 2011.
    Dilation { lambda: f32 },
}

impl Composition {
    /// `Combined` with the Mitchell & Lapata 2008 verb-noun parameters
    /// `a = 0.95, b = 0, c = 0.05`.
    pub fn combined() -> Self {
        Self::Combined {
            a: 0.95,
            b: 0.0,
            c: 0.05,
        }
    }

    /// `Dilation` with the standard `lambda = 2.0`.
    pub fn dilation() -> Self {
        Self::Dilation { lambda: 2.0 }
    }
}

fn scaled(v: &SparseVector, factor: f32) -> SparseVector {
    let mut result = v.clone();
    sparse::scale(&mut result, factor);
    result
}

/// Compose two sparse word vectors.
pub fn compose_sparse(
    v1: &SparseVector,
    v2: &SparseVector,
    method: Composition,
) -> SparseVector {
    match method {
        Composition::Addition => sparse::add(v1, v2),
        Composition::Subtraction => sparse::sub(v1, v2),
        Composition::Multiplication => sparse::mul(v1, v2),
        Composition::Extrema => sparse::extrema(v1, v2),
        Composition::Combined { a, b, c } => {
            let product = scaled(&sparse::mul(v1, v2), c);
            sparse::add(&sparse::add(&scaled(v1, a), &scaled(v2, b)), &product)
        }
        Composition::Dilation { lambda } => {
            let uu = sparse::dot(v1, v1);
            let uv = sparse::dot(v1, v2);
            sparse::add(&scaled(v2, uu), &scaled(v1, (lambda - 1.0) * uv))
        }
    }
}

/// Compose two dense word vectors of equal length.
pub fn compose_dense(v1: &[f32], v2: &[f32], method: Composition) -> WordspaceResult<Vec<f32>> {
    match method {
        Composition::Addition => dense::add(v1, v2),
        Composition::Subtraction => dense::sub(v1, v2),
        Composition::Multiplication => dense::mul(v1, v2),
        Composition::Extrema => dense::extrema(v1, v2),
        Composition::Combined { a, b, c } => {
            let product = dense::scale(&dense::mul(v1, v2)?, c);
            dense::add(
                &dense::add(&dense::scale(v1, a), &dense::scale(v2, b))?,
                &product,
            )
        }
        Composition::Dilation { lambda } => {
            let uu = dense::dot(v1, v1)?;
            let uv = dense::dot(v1, v2)?;
            dense::add(
                &dense::scale(v2, uu),
                &dense::scale(v1, (lambda - 1.0) * uv),
            )
        }
    }
}

/// Vector rejection of `a` on `b`: `a - b * (a*b / b*b)`. Removes the
/// direction of `b` from `a`; use it for instance to strip one meaning from
/// an ambiguous word's vector.
pub fn vector_rejection_sparse(a: &SparseVector, b: &SparseVector) -> SparseVector {
    sparse::sub(a, &scaled(b, sparse::dot(a, b) / sparse::dot(b, b)))
}

/// Vector rejection of `a` on `b` for dense vectors.
pub fn vector_rejection_dense(a: &[f32], b: &[f32]) -> WordspaceResult<Vec<f32>> {
    dense::sub(a, &dense::scale(b, dense::dot(a, b)? / dense::dot(b, b)?))
}

/// Fold a list of sparse vectors with the composition operator. Returns
/// `None` when the list has fewer than two entries or either of the first
/// two is missing; missing entries after the first two are skipped.
pub fn compose_sparse_list(
    vectors: &[Option<SparseVector>],
    method: Composition,
) -> Option<SparseVector> {
    if vectors.len() < 2 {
        return None;
    }
    let (Some(first), Some(second)) = (&vectors[0], &vectors[1]) else {
        return None;
    };
    let mut composed = compose_sparse(first, second, method);
    for vector in &vectors[2..] {
        if let Some(vector) = vector {
            composed = compose_sparse(&composed, vector, method);
        }
    }
    Some(composed)
}

/// Fold a list of dense vectors with the composition operator; the same
/// skipping rules as [`compose_sparse_list`].
pub fn compose_dense_list(
    vectors: &[Option<Vec<f32>>],
    method: Composition,
) -> WordspaceResult<Option<Vec<f32>>> {
    if vectors.len() < 2 {
        return Ok(None);
    }
    let (Some(first), Some(second)) = (&vectors[0], &vectors[1]) else {
        return Ok(None);
    };
    let mut composed = compose_dense(first, second, method)?;
    for vector in &vectors[2..] {
        if let Some(vector) = vector {
            composed = compose_dense(&composed, vector, method)?;
        }
    }
    Ok(Some(composed))
}

/// Build a sparse vector for a whitespace-tokenized phrase by composing the
/// vectors of its tokens. A single-token phrase returns that token's vector.
pub fn phrase_vector_sparse(
    phrase: &str,
    space: &WordSpace,
    method: Composition,
) -> WordspaceResult<Option<SparseVector>> {
    let tokens: Vec<&str> = phrase.split_whitespace().collect();
    match tokens.len() {
        0 => Ok(None),
        1 => space.word_vector(tokens[0]),
        _ => {
            let mut vectors = Vec::with_capacity(tokens.len());
            for token in &tokens {
                vectors.push(space.word_vector(token)?);
            }
            Ok(compose_sparse_list(&vectors, method))
        }
    }
}

/// Build a dense vector for a whitespace-tokenized phrase by composing the
/// embeddings of its tokens. Unknown tokens fall back to subword synthesis
/// when the store carries n-grams.
pub fn phrase_vector_dense(
    phrase: &str,
    store: &DenseStore,
    method: Composition,
) -> WordspaceResult<Option<Vec<f32>>> {
    let tokens: Vec<&str> = phrase.split_whitespace().collect();
    match tokens.len() {
        0 => Ok(None),
        1 => Ok(store.word_embedding(tokens[0]).map(|v| v.into_owned())),
        _ => {
            let vectors: Vec<Option<Vec<f32>>> = tokens
                .iter()
                .map(|token| store.word_embedding(token).map(|v| v.into_owned()))
                .collect();
            compose_dense_list(&vectors, method)
        }
    }
}

/// Semantic similarity between two multi-word terms, phrases, sentences or
/// paragraphs, computed by composing the constituent word vectors and
/// comparing the two results. Returns `None` when no vector could be built
/// for either side.
///
/// The alignment-based methods in the text module can give more accurate
/// results for short texts because they weight words by corpus frequency.
pub fn compositional_similarity(
    text1: &str,
    text2: &str,
    method: Composition,
    measure: SimilarityMeasure,
    space: &WordSpace,
) -> WordspaceResult<Option<f64>> {
    match space {
        WordSpace::Sparse(_) => {
            let (Some(v1), Some(v2)) = (
                phrase_vector_sparse(text1.trim(), space, method)?,
                phrase_vector_sparse(text2.trim(), space, method)?,
            ) else {
                return Ok(None);
            };
            Ok(Some(measure.sparse(&v1, &v2)))
        }
        WordSpace::Dense(store) => {
            let (Some(v1), Some(v2)) = (
                phrase_vector_dense(text1.trim(), store, method)?,
                phrase_vector_dense(text2.trim(), store, method)?,
            ) else {
                return Ok(None);
            };
            Ok(Some(measure.dense(&v1, &v2)?))
        }
    }
}

/// Find the vocabulary words most similar to an arbitrary sparse vector by
/// scanning the whole vocabulary. Only words with positive similarity are
/// returned, highest first; `max_n == 0` returns all of them. Entries that
/// fail to read are skipped.
///
/// This is O(vocabulary) lookups and should only be run against word spaces
/// loaded into memory.
pub fn similar_words_for_vector(
    wordvector: &SparseVector,
    space: &WordSpace,
    measure: SimilarityMeasure,
    max_n: usize,
) -> WordspaceResult<Vec<WordAndScore>> {
    let mut result = Vec::new();
    for word in space.vocabulary_iter()? {
        let vector = match space.word_vector(&word) {
            Ok(Some(vector)) => vector,
            Ok(None) => continue,
            Err(e) => {
                debug_print!("similar_words_for_vector: skipping '{word}': {e}");
                continue;
            }
        };
        let sim = measure.sparse(wordvector, &vector) as f32;
        if sim > 0.0 {
            result.push(WordAndScore::new(word, sim));
        }
    }
    sort_by_score_desc(&mut result);
    if max_n > 0 {
        result.truncate(max_n);
    }
    Ok(result)
}

/// Find the vocabulary words most similar to an arbitrary embedding by
/// scanning all matrix rows. Only words with positive similarity are
/// returned, highest first; `max_n == 0` returns all of them.
pub fn similar_words_for_embedding(
    embedding: &[f32],
    store: &DenseStore,
    measure: SimilarityMeasure,
    max_n: usize,
) -> WordspaceResult<Vec<WordAndScore>> {
    let mut result = Vec::new();
    for id in 0..store.number_of_words() {
        let Some(row) = store.word_vector(id) else {
            break;
        };
        let sim = measure.dense(embedding, row)? as f32;
        if sim > 0.0 {
            if let Some(word) = store.get_word(id) {
                result.push(WordAndScore::new(word, sim));
            }
        }
    }
    sort_by_score_desc(&mut result);
    if max_n > 0 {
        result.truncate(max_n);
    }
    Ok(result)
}

/// Approximate nearest-neighbor search over the stored neighborhood graph
/// (Sugawara et al. 2016). Draws [`GRAPH_SEARCH_INIT_SET_SIZE`] random
/// words, keeps the one closest to the query as start word, then repeatedly
/// moves to the best of the current word's stored neighbors until no
/// neighbor improves on the current similarity. The result contains the
/// successive improvements, sorted by similarity, at most `n_max` entries
/// (`n_max == 0` for no limit).
///
/// Roughly an order of magnitude faster than the exhaustive scan; the true
/// nearest neighbor is found in most cases thanks to the small-world
/// structure of the neighborhood graph (Steyvers & Tenenbaum 2005). Only
/// works with word spaces of type SIM.
///
/// The traversal is deterministic for a fixed `rng` seed.
pub fn similar_words_graph_search<R: Rng>(
    wordvector: &SparseVector,
    space: &WordSpace,
    measure: SimilarityMeasure,
    n_max: usize,
    rng: &mut R,
) -> WordspaceResult<Vec<WordAndScore>> {
    space.require_sim("similar_words_graph_search")?;
    let vocabulary = space.number_of_words();
    if vocabulary == 0 {
        return Ok(Vec::new());
    }
    let max_n = space.number_of_similar_words();

    // Pick the best of a random start set.
    let mut start: Option<(String, f32)> = None;
    for _ in 0..GRAPH_SEARCH_INIT_SET_SIZE {
        let id = rng.random_range(0..vocabulary);
        let Some(word) = space.get_word(id)? else {
            continue;
        };
        let Some(vector) = space.word_vector(&word)? else {
            continue;
        };
        let sim = measure.sparse(&vector, wordvector) as f32;
        if start.as_ref().is_none_or(|(_, best)| sim > *best) {
            start = Some((word, sim));
        }
    }
    let Some((mut current, mut current_sim)) = start else {
        return Ok(Vec::new());
    };

    // Best-first walk.
    let mut improvements = Vec::new();
    loop {
        let Some(neighbors) = space.similar_words(&current)? else {
            break;
        };
        let mut step: Option<(String, f32)> = None;
        for neighbor in neighbors.iter().take(max_n) {
            let Some(vector) = space.word_vector(&neighbor.word)? else {
                continue;
            };
            let sim = measure.sparse(wordvector, &vector) as f32;
            if step.as_ref().is_none_or(|(_, best)| sim > *best) {
                step = Some((neighbor.word.clone(), sim));
            }
        }
        match step {
            Some((word, sim)) if sim > current_sim => {
                improvements.push(WordAndScore::new(word.clone(), sim));
                current = word;
                current_sim = sim;
            }
            _ => break,
        }
    }

    sort_by_score_desc(&mut improvements);
    if n_max > 0 {
        improvements.truncate(n_max);
    }
    Ok(improvements)
}

/// Graph-based approximate nearest-neighbor search for a dense query
/// vector; see [`similar_words_graph_search`].
pub fn similar_words_graph_search_embedding<R: Rng>(
    embedding: &[f32],
    store: &DenseStore,
    measure: SimilarityMeasure,
    n_max: usize,
    rng: &mut R,
) -> WordspaceResult<Vec<WordAndScore>> {
    if store.wordspace_type() != WordspaceType::Sim {
        return Err(WordspaceError::WrongWordspaceType {
            operation: "similar_words_graph_search_embedding",
            actual: store.wordspace_type(),
        });
    }
    let vocabulary = store.number_of_words();
    if vocabulary == 0 {
        return Ok(Vec::new());
    }
    let max_n = store.number_of_similar_words();

    let mut start: Option<(usize, f32)> = None;
    for _ in 0..GRAPH_SEARCH_INIT_SET_SIZE {
        let id = rng.random_range(0..vocabulary);
        let Some(vector) = store.word_vector(id) else {
            continue;
        };
        let sim = measure.dense(vector, embedding)? as f32;
        if start.as_ref().is_none_or(|(_, best)| sim > *best) {
            start = Some((id, sim));
        }
    }
    let Some((mut current, mut current_sim)) = start else {
        return Ok(Vec::new());
    };

    let mut improvements = Vec::new();
    loop {
        let mut step: Option<(usize, f32)> = None;
        for (neighbor, _) in store.neighbors_of(current).take(max_n) {
            let Some(vector) = store.word_vector(neighbor) else {
                continue;
            };
            let sim = measure.dense(embedding, vector)? as f32;
            if step.as_ref().is_none_or(|(_, best)| sim > *best) {
                step = Some((neighbor, sim));
            }
        }
        match step {
            Some((id, sim)) if sim > current_sim => {
                if let Some(word) = store.get_word(id) {
                    improvements.push(WordAndScore::new(word, sim));
                }
                current = id;
                current_sim = sim;
            }
            _ => break,
        }
    }

    sort_by_score_desc(&mut improvements);
    if n_max > 0 {
        improvements.truncate(n_max);
    }
    Ok(improvements)
}

/// Breadth-first search for the shortest path between two word ids in the
/// neighborhood graph. The returned path is in reverse order: the first
/// element is `to`, the last is `from`. Returns `None` when either id is
/// out of range or no path exists; for word spaces with at least 50 stored
/// neighbors per word, the neighborhood graph is connected in practice.
/// Only works with word spaces of type SIM.
pub fn find_shortest_path(
    store: &DenseStore,
    from: usize,
    to: usize,
) -> WordspaceResult<Option<Vec<usize>>> {
    if store.wordspace_type() != WordspaceType::Sim {
        return Err(WordspaceError::WrongWordspaceType {
            operation: "find_shortest_path",
            actual: store.wordspace_type(),
        });
    }
    let vocabulary = store.number_of_words();
    if from >= vocabulary || to >= vocabulary {
        return Ok(None);
    }

    let mut visited = vec![false; vocabulary];
    let mut back = vec![usize::MAX; vocabulary];
    let mut queue = VecDeque::new();
    visited[from] = true;
    queue.push_back(from);
    let mut found = from == to;
    'search: while let Some(current) = queue.pop_front() {
        for (neighbor, _) in store.neighbors_of(current) {
            if neighbor >= vocabulary || visited[neighbor] {
                continue;
            }
            visited[neighbor] = true;
            back[neighbor] = current;
            if neighbor == to {
                found = true;
                break 'search;
            }
            queue.push_back(neighbor);
        }
    }
    if !found {
        return Ok(None);
    }

    let mut path = vec![to];
    let mut step = to;
    while step != from {
        step = back[step];
        path.push(step);
    }
    Ok(Some(path))
}

/// [`find_shortest_path`] by surface words; returns the path as words.
pub fn find_shortest_path_words(
    store: &DenseStore,
    w1: &str,
    w2: &str,
) -> WordspaceResult<Option<Vec<String>>> {
    let (Some(id1), Some(id2)) = (store.matrix_row_number(w1), store.matrix_row_number(w2))
    else {
        return Ok(None);
    };
    let Some(ids) = find_shortest_path(store, id1, id2)? else {
        return Ok(None);
    };
    Ok(Some(
        ids.iter().filter_map(|id| store.get_word(*id)).collect(),
    ))
}

/// Solve the analogy `a1 : b1 = a2 : b2` for the missing word `a1` with the
/// offset method: the result candidates are the nearest words to
/// `v(b1) + v(a2) - v(b2)` by cosine, at most 12 of them.
///
/// Example: `solve_analogy("woman", "king", "man", &space)` ranks "queen"
/// near the top. Callers may want to filter `b1`, `a2` and `b2` out of the
/// result. Returns `None` when any of the three words is unknown.
///
/// The exhaustive nearest-neighbor scan makes this expensive; see
/// [`solve_analogy_approx`] for a faster approximation.
pub fn solve_analogy(
    b1: &str,
    a2: &str,
    b2: &str,
    space: &WordSpace,
) -> WordspaceResult<Option<Vec<WordAndScore>>> {
    match space {
        WordSpace::Sparse(_) => {
            let (Some(vb1), Some(va2), Some(vb2)) = (
                space.word_vector(b1)?,
                space.word_vector(a2)?,
                space.word_vector(b2)?,
            ) else {
                return Ok(None);
            };
            let target = sparse::add(&vb1, &sparse::sub(&va2, &vb2));
            similar_words_for_vector(&target, space, SimilarityMeasure::Cosine, ANALOGY_RESULTS)
                .map(Some)
        }
        WordSpace::Dense(store) => {
            let (Some(vb1), Some(va2), Some(vb2)) = (
                store.word_embedding(b1),
                store.word_embedding(a2),
                store.word_embedding(b2),
            ) else {
                return Ok(None);
            };
            let target = dense::add(&vb1, &dense::sub(&va2, &vb2)?)?;
            similar_words_for_embedding(&target, store, SimilarityMeasure::Cosine, ANALOGY_RESULTS)
                .map(Some)
        }
    }
}

/// Fast approximation of [`solve_analogy`] that finds the nearest words
/// with the graph search instead of the exhaustive scan. Only works with
/// word spaces of type SIM.
pub fn solve_analogy_approx<R: Rng>(
    b1: &str,
    a2: &str,
    b2: &str,
    space: &WordSpace,
    rng: &mut R,
) -> WordspaceResult<Option<Vec<WordAndScore>>> {
    match space {
        WordSpace::Sparse(_) => {
            let (Some(vb1), Some(va2), Some(vb2)) = (
                space.word_vector(b1)?,
                space.word_vector(a2)?,
                space.word_vector(b2)?,
            ) else {
                return Ok(None);
            };
            let target = sparse::add(&vb1, &sparse::sub(&va2, &vb2));
            similar_words_graph_search(
                &target,
                space,
                SimilarityMeasure::Cosine,
                ANALOGY_RESULTS,
                rng,
            )
            .map(Some)
        }
        WordSpace::Dense(store) => {
            let (Some(vb1), Some(va2), Some(vb2)) = (
                store.word_embedding(b1),
                store.word_embedding(a2),
                store.word_embedding(b2),
            ) else {
                return Ok(None);
            };
            let target = dense::add(&vb1, &dense::sub(&va2, &vb2)?)?;
            similar_words_graph_search_embedding(
                &target,
                store,
                SimilarityMeasure::Cosine,
                ANALOGY_RESULTS,
                rng,
            )
            .map(Some)
        }
    }
}

/// Average the offset vectors `v(a2) - v(b2)` over all `(a2, b2)` pairs.
/// Pairs with an unknown word are skipped; `None` when no pair survives.
pub fn average_offset_vector(
    pairs: &[(&str, &str)],
    store: &DenseStore,
) -> WordspaceResult<Option<Vec<f32>>> {
    let mut offsets = Vec::new();
    for (a2, b2) in pairs {
        let (Some(va2), Some(vb2)) = (store.word_embedding(a2), store.word_embedding(b2)) else {
            continue;
        };
        offsets.push(dense::sub(&va2, &vb2)?);
    }
    dense::average(&offsets)
}

/// Solve an analogy with an offset vector averaged over several `(a2, b2)`
/// pairs for more robust results than the single-pair [`solve_analogy`].
pub fn solve_analogy_average_offset(
    b1: &str,
    pairs: &[(&str, &str)],
    store: &DenseStore,
) -> WordspaceResult<Option<Vec<WordAndScore>>> {
    let Some(vb1) = store.word_embedding(b1) else {
        return Ok(None);
    };
    let Some(offset) = average_offset_vector(pairs, store)? else {
        return Ok(None);
    };
    let target = dense::add(&vb1, &offset)?;
    similar_words_for_embedding(&target, store, SimilarityMeasure::Cosine, ANALOGY_RESULTS)
        .map(Some)
}
