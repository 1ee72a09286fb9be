//! 単語空間ストレージバックエンドモジュール
//!
//! 単語空間の2種類のストレージレイアウト（転置インデックスと密行列）を
//! [`WordSpace`] ハンドルの背後に統合します。オープン後の単語空間は
//! 不変であり、ロックなしでスレッド間共有できます。
//!
//! Word space storage back-ends.
//!
//! A word space is opened read-only and never mutated afterwards, so a
//! handle can be shared across threads without locking. Two storage layouts
//! are supported behind the [`WordSpace`] handle:
//!
//! - [`SparseStore`]: an inverted index holding one document per vocabulary
//!   word, suited for very high-dimensional count vectors stored sparsely.
//! - [`DenseStore`]: a serialized row-major matrix image, suited for
//!   low-dimensional word embeddings, optionally with subword n-gram vectors
//!   and pre-computed neighbor matrices.
//!
//! [`WordSpace::open`] auto-detects the layout: a directory is a sparse
//! store, a file is a dense image.

pub mod dense;
pub mod sparse;

pub use dense::DenseStore;
pub use sparse::{SparseStore, WordRecord};

use crate::config::WordspaceConfig;
use crate::error::{WordspaceError, WordspaceResult};
use crate::vector::{SimilarityMeasure, SparseVector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Separator between a feature word and its relation identifier inside a
/// feature key. A codepoint from the Unicode private use area.
pub const RELATION_SEPARATOR: char = '\u{F8FF}';

/// Sentinel similarity returned when one of the queried words is not in the
/// vocabulary. Kept distinct from the `Option`-based not-found signalling of
/// the lookup queries for backward compatibility.
pub const NOT_FOUND_SIMILARITY: f32 = -2.0;

/// 単語空間のコンテンツタイプ
///
/// Word space content types.
///
/// `Col` spaces store a word vector per word; `Sim` spaces additionally
/// store a pre-computed list of the most similar words for each word.
/// Several operations only work on `Sim` spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WordspaceType {
    Col,
    Sim,
}

/// A word (or feature key) together with a similarity or significance score.
#[derive(Debug, Clone, PartialEq)]
pub struct WordAndScore {
    pub word: String,
    pub score: f32,
}

impl WordAndScore {
    pub fn new(word: impl Into<String>, score: f32) -> Self {
        Self {
            word: word.into(),
            score,
        }
    }
}

/// Sort a result list by score, highest first. The sort is stable: entries
/// tied on score keep their existing order.
pub(crate) fn sort_by_score_desc(list: &mut [WordAndScore]) {
    list.sort_by(|a, b| b.score.total_cmp(&a.score));
}

/// 単語空間ハンドル
///
/// A word space handle, dispatching to the storage back-end selected at open
/// time.
pub enum WordSpace {
    Sparse(SparseStore),
    Dense(DenseStore),
}

impl std::fmt::Debug for WordSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sparse(s) => f.debug_tuple("WordSpace::Sparse").field(s).finish(),
            Self::Dense(d) => f.debug_tuple("WordSpace::Dense").field(d).finish(),
        }
    }
}

impl WordSpace {
    /// Open the word space at `path`. A directory is opened as a sparse
    /// store (optionally mirrored into memory), a file is restored as a
    /// dense store (always fully resident).
    pub fn open(path: impl AsRef<Path>, load_into_memory: bool) -> WordspaceResult<Self> {
        let path = path.as_ref();
        if path.is_dir() {
            Ok(Self::Sparse(SparseStore::open(path, load_into_memory)?))
        } else {
            Ok(Self::Dense(DenseStore::deserialize_from(path)?))
        }
    }

    /// Open the word space at `path` fully resident: a sparse store is
    /// mirrored into memory, a dense store is restored as usual.
    pub fn load(path: impl AsRef<Path>) -> WordspaceResult<Self> {
        Self::open(path, true)
    }

    pub fn as_sparse(&self) -> Option<&SparseStore> {
        match self {
            Self::Sparse(s) => Some(s),
            Self::Dense(_) => None,
        }
    }

    pub fn as_dense(&self) -> Option<&DenseStore> {
        match self {
            Self::Sparse(_) => None,
            Self::Dense(d) => Some(d),
        }
    }

    pub fn wordspace_type(&self) -> WordspaceType {
        match self {
            Self::Sparse(s) => s.wordspace_type(),
            Self::Dense(d) => d.wordspace_type(),
        }
    }

    pub fn config(&self) -> &WordspaceConfig {
        match self {
            Self::Sparse(s) => s.config(),
            Self::Dense(d) => d.config(),
        }
    }

    /// Number of words in the vocabulary.
    pub fn number_of_words(&self) -> usize {
        match self {
            Self::Sparse(s) => s.number_of_words(),
            Self::Dense(d) => d.number_of_words(),
        }
    }

    /// Number of feature words. For dense spaces this equals the vector
    /// dimensionality; for sparse spaces it is only equal to the
    /// dimensionality if no positional or relational features were used.
    pub fn number_of_feature_words(&self) -> usize {
        self.config().number_feature_words.max(0) as usize
    }

    /// Number of similar words stored per word. Always 0 for spaces of type
    /// `Col`.
    pub fn number_of_similar_words(&self) -> usize {
        match self {
            Self::Sparse(s) => s.number_of_similar_words(),
            Self::Dense(d) => d.number_of_similar_words(),
        }
    }

    /// Size of the underlying corpus in tokens.
    pub fn token_count(&self) -> i64 {
        self.config().tokencount
    }

    /// Minimum corpus frequency of words in the word space.
    pub fn min_freq(&self) -> i32 {
        self.config().min_freq
    }

    /// Corpus frequency of the most frequent word that was not filtered out
    /// by the stopword list.
    pub fn max_freq(&self) -> i32 {
        self.config().max_freq
    }

    /// Stopwords used in word space creation.
    pub fn stopwords(&self) -> Vec<&str> {
        self.config().stopword_list()
    }

    /// Stopwords as a set for membership tests.
    pub fn stopword_set(&self) -> HashSet<&str> {
        self.config().stopword_set()
    }

    /// The measure that was used to build the pre-computed neighbor lists.
    pub fn similarity_measure(&self) -> SimilarityMeasure {
        self.config().similarity_measure
    }

    /// Corpus frequency of `word`, 0 if the word is unknown.
    pub fn frequency(&self, word: &str) -> WordspaceResult<u64> {
        match self {
            Self::Sparse(s) => s.frequency(word),
            Self::Dense(d) => Ok(d.frequency(word)),
        }
    }

    /// The word vector of `word` as a sparse feature map, or `None` if the
    /// word is unknown. For dense spaces the feature keys are column ids
    /// rendered as strings.
    pub fn word_vector(&self, word: &str) -> WordspaceResult<Option<SparseVector>> {
        match self {
            Self::Sparse(s) => s.word_vector(word),
            Self::Dense(d) => Ok(d.word_vector_map(word)),
        }
    }

    /// The second order word vector of `word`: its stored most similar words
    /// as features. Only available on spaces of type `Sim`.
    pub fn second_order_word_vector(&self, word: &str) -> WordspaceResult<Option<SparseVector>> {
        match self {
            Self::Sparse(s) => s.second_order_word_vector(word),
            Self::Dense(d) => d.second_order_word_vector(word),
        }
    }

    /// The stored most similar words for `word`, ordered by decreasing
    /// similarity, or `None` if the word is unknown. Only available on
    /// spaces of type `Sim`.
    pub fn similar_words(&self, word: &str) -> WordspaceResult<Option<Vec<WordAndScore>>> {
        match self {
            Self::Sparse(s) => s.similar_words(word),
            Self::Dense(d) => d.similar_words(word),
        }
    }

    /// Similarity between the word vectors of `w1` and `w2` under `measure`.
    /// Returns [`NOT_FOUND_SIMILARITY`] if either word is unknown.
    pub fn semantic_similarity(
        &self,
        w1: &str,
        w2: &str,
        measure: SimilarityMeasure,
    ) -> WordspaceResult<f32> {
        match self {
            Self::Sparse(s) => s.semantic_similarity(w1, w2, measure),
            Self::Dense(d) => d.semantic_similarity(w1, w2, measure),
        }
    }

    /// Similarity between the stored neighbor sets of `w1` and `w2` under
    /// `measure`. Only available on spaces of type `Sim`; returns
    /// [`NOT_FOUND_SIMILARITY`] if either word is unknown.
    pub fn second_order_similarity(
        &self,
        w1: &str,
        w2: &str,
        measure: SimilarityMeasure,
    ) -> WordspaceResult<f32> {
        match self {
            Self::Sparse(s) => s.second_order_similarity(w1, w2, measure),
            Self::Dense(d) => d.second_order_similarity(w1, w2, measure),
        }
    }

    /// The collocations of `word` with their significance values, highest
    /// first, or `None` if the word is unknown. Relation suffixes are
    /// stripped from the feature keys and significances of identical words
    /// are summed. For dense spaces (and sparse spaces built with id
    /// features) the returned keys are ids, not words.
    pub fn collocations(&self, word: &str) -> WordspaceResult<Option<Vec<WordAndScore>>> {
        match self {
            Self::Sparse(s) => s.collocations(word),
            Self::Dense(d) => Ok(d.collocations(word)),
        }
    }

    /// The `id`-th word of the vocabulary, or `None` if `id` is outside
    /// `0..number_of_words()`.
    pub fn get_word(&self, id: usize) -> WordspaceResult<Option<String>> {
        match self {
            Self::Sparse(s) => s.get_word(id),
            Self::Dense(d) => Ok(d.get_word(id)),
        }
    }

    /// Iterate over all words in the vocabulary. There is no defined
    /// ordering; entries that fail to read are skipped.
    pub fn vocabulary_iter(&self) -> WordspaceResult<VocabularyIter<'_>> {
        Ok(match self {
            Self::Sparse(s) => VocabularyIter::Sparse(s.vocabulary_iter()),
            Self::Dense(d) => VocabularyIter::Dense(d.vocabulary_iter()),
        })
    }

    /// Write a word-frequency list (`word<TAB>frequency`, one line per
    /// vocabulary entry, UTF-8, unsorted) to `output`. Entries that fail to
    /// read are skipped and excluded from the returned count.
    pub fn word_frequency_list(&self, output: impl AsRef<Path>) -> WordspaceResult<usize> {
        match self {
            Self::Sparse(s) => s.word_frequency_list(output.as_ref()),
            Self::Dense(d) => d.word_frequency_list(output.as_ref()),
        }
    }

    pub(crate) fn require_sim(&self, operation: &'static str) -> WordspaceResult<()> {
        if self.wordspace_type() != WordspaceType::Sim {
            return Err(WordspaceError::WrongWordspaceType {
                operation,
                actual: self.wordspace_type(),
            });
        }
        Ok(())
    }
}

/// Iterator over the vocabulary of a word space.
pub enum VocabularyIter<'a> {
    Sparse(sparse::SparseVocabularyIter),
    Dense(dense::DenseVocabularyIter<'a>),
}

impl Iterator for VocabularyIter<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        match self {
            Self::Sparse(it) => it.next(),
            Self::Dense(it) => it.next(),
        }
    }
}
