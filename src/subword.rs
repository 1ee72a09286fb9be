//! サブワードnグラムによる語彙外単語の埋め込み合成
//!
//! Out-of-vocabulary embedding synthesis from subword n-grams.
//!
//! Dense word spaces may store vectors for character n-grams alongside the
//! word embeddings. An unknown word then still gets an embedding: the sum of
//! the stored vectors of all n-grams of the padded word.

use crate::ngram;
use crate::store::DenseStore;

/// Compute an embedding for the out-of-vocabulary word `oov` as the sum of
/// its stored n-gram vectors.
///
/// The result is deterministic: when no n-gram of the padded word is present
/// in the store, the zero vector is returned, which is distinct from
/// not-found.
pub fn embedding_for_oov(oov: &str, store: &DenseStore) -> Vec<f32> {
    let mut sum = vec![0.0f32; store.dimensions()];
    let Some((min_n, max_n)) = store.ngram_range() else {
        return sum;
    };
    for ngram in ngram::extract_all_ngrams(oov, min_n, max_n) {
        if let Some(vector) = store.ngram_vector(&ngram) {
            for (s, x) in sum.iter_mut().zip(vector) {
                *s += x;
            }
        }
    }
    sum
}
