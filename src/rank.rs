//! ランクベースの類似度クエリモジュール
//!
//! Rank-based similarity queries.
//!
//! These operations use the rank a word occupies in the similarity or
//! collocation lists of other words, rather than raw similarity values. For
//! low frequency words the rank-product queries often give better results
//! than the plain nearest-neighbor lookups.

use crate::error::WordspaceResult;
use crate::store::{SparseStore, WordSpace};
use std::collections::HashSet;

/// A word with its rank product; lower means more similar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordAndRank {
    pub word: String,
    pub rank: u64,
}

fn sort_by_rank_asc(list: &mut [WordAndRank]) {
    list.sort_by_key(|entry| entry.rank);
}

/// Rank of `w2` in the similarity list of `w1`: 1 for the most similar
/// word, 0 when `w2` does not occur in the list, -1 when `w1` is unknown.
/// Only works with word spaces of type SIM.
pub fn rank_sim(space: &WordSpace, w1: &str, w2: &str) -> WordspaceResult<i64> {
    space.require_sim("rank_sim")?;
    let Some(similar) = space.similar_words(w1)? else {
        return Ok(-1);
    };
    Ok(similar
        .iter()
        .position(|entry| entry.word == w2)
        .map(|i| i as i64 + 1)
        .unwrap_or(0))
}

/// Rank of `w2` among the collocations of `w1`: 1 for the strongest
/// collocate, 0 when `w2` is not a collocate, -1 when `w1` is unknown.
/// Collocations only exist in the sparse back-end.
pub fn rank_col(store: &SparseStore, w1: &str, w2: &str) -> WordspaceResult<i64> {
    let Some(collocations) = store.collocations(w1)? else {
        return Ok(-1);
    };
    Ok(collocations
        .iter()
        .position(|entry| entry.word == w2)
        .map(|i| i as i64 + 1)
        .unwrap_or(0))
}

/// Find the vocabulary words in whose similarity lists the input `words`
/// rank highest.
///
/// For every vocabulary word `v` outside the input set, the score is the
/// product of the ranks at which the input words occur in `v`'s similarity
/// list; input words absent from the list are skipped. Only words with a
/// rank product greater than 1 are kept, sorted ascending (most similar
/// first).
///
/// This is O(vocabulary) similarity-list lookups; run it only against word
/// spaces loaded into memory. Only works with word spaces of type SIM.
pub fn highest_ranking_sim(
    space: &WordSpace,
    words: &HashSet<String>,
) -> WordspaceResult<Vec<WordAndRank>> {
    space.require_sim("highest_ranking_sim")?;

    let mut result = Vec::new();
    for v in space.vocabulary_iter()? {
        if words.contains(&v) {
            continue;
        }
        let mut rank_product = 1u64;
        for input_word in words {
            let r = rank_sim(space, &v, input_word)?;
            if r >= 1 {
                rank_product *= r as u64;
            }
        }
        if rank_product > 1 {
            result.push(WordAndRank {
                word: v,
                rank: rank_product,
            });
        }
    }
    sort_by_rank_asc(&mut result);
    Ok(result)
}

/// Like [`highest_ranking_sim`], but over collocation lists. Only available
/// on the sparse back-end; run it against a word space loaded into memory.
pub fn highest_ranking_col(
    store: &SparseStore,
    words: &HashSet<String>,
) -> WordspaceResult<Vec<WordAndRank>> {
    let mut result = Vec::new();
    for v in store.vocabulary_iter() {
        if words.contains(&v) {
            continue;
        }
        let mut rank_product = 1u64;
        for input_word in words {
            let r = rank_col(store, &v, input_word)?;
            if r >= 1 {
                rank_product *= r as u64;
            }
        }
        if rank_product > 1 {
            result.push(WordAndRank {
                word: v,
                rank: rank_product,
            });
        }
    }
    sort_by_rank_asc(&mut result);
    Ok(result)
}
