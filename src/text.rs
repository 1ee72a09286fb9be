//! 短文間の意味的類似度モジュール
//!
//! フレーズ、文、段落といった短いテキスト同士の意味的類似度を、単語の
//! アラインメントと逆コーパス頻度による重み付けで計算します。
//!
//! Short-text semantic similarity.
//!
//! Implements the alignment-based similarity of Jijkoun & De Rijke (2005),
//! "Recognizing Textual Entailment Using Lexical Similarity": every
//! hypothesis word is greedily aligned to its most similar text word, and
//! the alignment scores are combined weighted by inverse corpus frequency,
//! so that frequent words contribute less.

use crate::error::WordspaceResult;
use crate::store::WordSpace;
use crate::vector::SimilarityMeasure;

/// Word weight from the inverse corpus frequency, normalized into 0..1 with
/// the word space's frequency bounds. Rare words weigh close to 1.
fn weight(word: &str, space: &WordSpace) -> WordspaceResult<f32> {
    let freq = space.frequency(word)?;
    let token_count = space.token_count() as f32;
    let icf = freq as f32 / token_count;
    let icf_min = space.min_freq() as f32 / token_count;
    let icf_max = space.max_freq() as f32 / token_count;
    Ok(1.0 - (icf - icf_min) / (icf_max - icf_min))
}

/// Similarity of two single words: identical words (case-insensitive) score
/// 1.0, otherwise the word space similarity, with cosine linearly remapped
/// from -1..1 to 0..1.
fn word_sim(
    w1: &str,
    w2: &str,
    space: &WordSpace,
    measure: SimilarityMeasure,
) -> WordspaceResult<f32> {
    if w1.to_lowercase() == w2.to_lowercase() {
        return Ok(1.0);
    }
    let mut sim = space.semantic_similarity(w1, w2, measure)?;
    if measure == SimilarityMeasure::Cosine {
        sim = sim / 2.0 + 0.5;
    }
    Ok(sim)
}

/// Directed similarity: how well `hypothesis` is licensed by `text`.
///
/// Both inputs are tokenized on whitespace and filtered against the word
/// space's stopword list; if either side ends up empty the result is 0.
/// Every hypothesis word is aligned to the not-yet-consumed text word with
/// the highest [`word_sim`]; a word with no positive match contributes -1.
/// Contributions are weighted by inverse corpus frequency and the weighted
/// mean is returned.
pub fn directed_text_similarity(
    text: &str,
    hypothesis: &str,
    space: &WordSpace,
    measure: SimilarityMeasure,
) -> WordspaceResult<f32> {
    let stopwords = space.stopword_set();

    let mut text_words: Vec<&str> = text
        .split_whitespace()
        .filter(|w| !stopwords.contains(w))
        .collect();
    let hypothesis_words: Vec<&str> = hypothesis
        .split_whitespace()
        .filter(|w| !stopwords.contains(w))
        .collect();

    // maybe all words were stopwords
    if text_words.is_empty() || hypothesis_words.is_empty() {
        return Ok(0.0);
    }

    let mut total_sim = 0.0f32;
    let mut total_weight = 0.0f32;
    for h in &hypothesis_words {
        let mut max_sim = 0.0f32;
        let mut max_k: Option<usize> = None;
        for (k, t) in text_words.iter().enumerate() {
            let sim = word_sim(h, t, space, measure)?;
            if sim > max_sim {
                max_sim = sim;
                max_k = Some(k);
            }
        }
        match max_k {
            // each text word may only be aligned once
            Some(k) => {
                text_words.remove(k);
            }
            None => max_sim = -1.0,
        }
        let w = weight(h, space)?;
        total_sim += max_sim * w;
        total_weight += w;
    }
    Ok(total_sim / total_weight)
}

/// Symmetric short-text similarity: the mean of both directed similarities.
/// Use [`SimilarityMeasure::Cosine`] with word spaces imported from
/// embedding tools.
pub fn text_similarity(
    text1: &str,
    text2: &str,
    space: &WordSpace,
    measure: SimilarityMeasure,
) -> WordspaceResult<f32> {
    Ok((directed_text_similarity(text1, text2, space, measure)?
        + directed_text_similarity(text2, text1, space, measure)?)
        / 2.0)
}
