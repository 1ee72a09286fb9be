//! 密行列ストレージバックエンド
//!
//! 密な単語空間を行優先のf32行列として提供します。word2vecやfastTextの
//! ような低次元の単語埋め込み向けで、最小完全ハッシュによるO(1)の単語
//! 検索と、オプションのサブワードnグラム・近傍行列を備えます。
//!
//! Dense matrix storage back-end.
//!
//! A dense word space stores one embedding per vocabulary word in a
//! row-major `f32` matrix and is restored from a single serialized image.
//! Use it for low-dimensional word embeddings only; high-dimensional count
//! vectors belong in the sparse store.
//!
//! Word lookup goes through a minimal perfect hash. An MPH yields a slot for
//! *any* input string, so membership needs a second step: the slot's stored
//! row id must fall inside the matrix and the surface form stored for that
//! row must match the queried word. The same guarded scheme is used for the
//! optional subword n-gram block.
//!
//! Rows handed out by [`DenseStore::word_vector`] alias the underlying
//! matrix and must not be mutated by callers.

use crate::config::WordspaceConfig;
use crate::error::{WordspaceError, WordspaceResult};
use crate::store::{
    NOT_FOUND_SIMILARITY, WordAndScore, WordspaceType, sort_by_score_desc,
};
use crate::subword;
use crate::vector::{SimilarityMeasure, SparseVector};
use boomphf::Mphf;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Gamma parameter for minimal perfect hash construction.
const MPH_GAMMA: f64 = 1.7;

/// Optional subword n-gram block: one vector per character n-gram, looked up
/// with the same guarded MPH scheme as words.
#[derive(Serialize, Deserialize)]
struct NgramBlock {
    matrix: Vec<f32>,
    ngram2index: Mphf<String>,
    ngram_index2id: Vec<i32>,
    ngram_id2offset: Vec<u32>,
    offset2ngram: Vec<u8>,
    min_n: usize,
    max_n: usize,
}

/// メモリ常駐の密単語空間
///
/// In-memory dense word space.
#[derive(Serialize, Deserialize)]
pub struct DenseStore {
    /// Row-major embedding matrix, one row of `dim` values per word.
    matrix: Vec<f32>,
    dim: usize,
    /// Word id to corpus frequency.
    frequencies: Vec<u32>,
    word2index: Mphf<String>,
    /// MPH slot to row id; -1 marks an unused slot.
    word_index2id: Vec<i32>,
    /// Word id to offset into `offset2word`.
    word_id2offset: Vec<u32>,
    /// Concatenated word bytes; each word's UTF-8 bytes are preceded by a
    /// little-endian u16 length.
    offset2word: Vec<u8>,
    ngrams: Option<NgramBlock>,
    /// Row-major neighbor-id matrix, `number_of_similar_words` columns per
    /// word. Present only for spaces of type SIM.
    sim_matrix: Option<Vec<i32>>,
    /// Similarity values parallel to `sim_matrix`. The first zero value in a
    /// row terminates the valid prefix.
    sim_values: Option<Vec<f32>>,
    config: WordspaceConfig,
    wordspace_type: WordspaceType,
    number_of_similar_words: usize,
}

impl std::fmt::Debug for DenseStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DenseStore")
            .field("words", &self.number_of_words())
            .field("dim", &self.dim)
            .field("wordspace_type", &self.wordspace_type)
            .field("number_of_similar_words", &self.number_of_similar_words)
            .field("has_ngrams", &self.ngrams.is_some())
            .finish()
    }
}

impl DenseStore {
    /// Build a dense word space of type COL from its parts. `matrix` is
    /// row-major with `dim` values per word, parallel to `words` and
    /// `frequencies`. Neighbor and subword data are attached with
    /// [`with_neighbors`](Self::with_neighbors) and
    /// [`with_ngrams`](Self::with_ngrams).
    ///
    /// This constructor is meant for the offline builder and for tests; query
    /// code restores stores with [`deserialize_from`](Self::deserialize_from).
    pub fn new(
        words: Vec<String>,
        frequencies: Vec<u32>,
        matrix: Vec<f32>,
        dim: usize,
        mut config: WordspaceConfig,
    ) -> WordspaceResult<Self> {
        let vocabulary = words.len();
        if frequencies.len() != vocabulary {
            return Err(WordspaceError::CorruptIndex {
                reason: format!(
                    "frequency array has {} entries for {vocabulary} words",
                    frequencies.len()
                ),
            });
        }
        if matrix.len() != vocabulary * dim {
            return Err(WordspaceError::CorruptIndex {
                reason: format!(
                    "matrix has {} values, expected {vocabulary} x {dim}",
                    matrix.len()
                ),
            });
        }

        let (word2index, word_index2id) = build_lookup(&words)?;
        let (word_id2offset, offset2word) = build_string_table(&words)?;

        config.vocabulary_size = vocabulary as i32;
        config.number_feature_words = dim as i32;

        Ok(Self {
            matrix,
            dim,
            frequencies,
            word2index,
            word_index2id,
            word_id2offset,
            offset2word,
            ngrams: None,
            sim_matrix: None,
            sim_values: None,
            config,
            wordspace_type: WordspaceType::Col,
            number_of_similar_words: 0,
        })
    }

    /// Attach pre-computed neighbor matrices, turning the store into a SIM
    /// space. Both matrices are row-major with `n_sim` columns per word;
    /// rows are sorted by similarity descending and a zero similarity
    /// terminates the valid prefix.
    pub fn with_neighbors(
        mut self,
        sim_matrix: Vec<i32>,
        sim_values: Vec<f32>,
        n_sim: usize,
    ) -> WordspaceResult<Self> {
        let expected = self.number_of_words() * n_sim;
        if sim_matrix.len() != expected || sim_values.len() != expected {
            return Err(WordspaceError::CorruptIndex {
                reason: format!(
                    "neighbor matrices have {} / {} values, expected {expected}",
                    sim_matrix.len(),
                    sim_values.len()
                ),
            });
        }
        self.sim_matrix = Some(sim_matrix);
        self.sim_values = Some(sim_values);
        self.number_of_similar_words = n_sim;
        self.wordspace_type = WordspaceType::Sim;
        self.config.number_of_similar_words = n_sim as i32;
        self.config.dont_compute_2nd_order = false;
        Ok(self)
    }

    /// Attach subword n-gram vectors for OOV embedding synthesis. `matrix`
    /// is row-major with the store's dimensionality, parallel to `ngrams`.
    pub fn with_ngrams(
        mut self,
        ngrams: Vec<String>,
        matrix: Vec<f32>,
        min_n: usize,
        max_n: usize,
    ) -> WordspaceResult<Self> {
        if matrix.len() != ngrams.len() * self.dim {
            return Err(WordspaceError::CorruptIndex {
                reason: format!(
                    "n-gram matrix has {} values, expected {} x {}",
                    matrix.len(),
                    ngrams.len(),
                    self.dim
                ),
            });
        }
        let (ngram2index, ngram_index2id) = build_lookup(&ngrams)?;
        let (ngram_id2offset, offset2ngram) = build_string_table(&ngrams)?;
        self.config.number_of_ngrams = ngrams.len() as i32;
        self.ngrams = Some(NgramBlock {
            matrix,
            ngram2index,
            ngram_index2id,
            ngram_id2offset,
            offset2ngram,
            min_n,
            max_n,
        });
        Ok(self)
    }

    pub fn wordspace_type(&self) -> WordspaceType {
        self.wordspace_type
    }

    pub fn config(&self) -> &WordspaceConfig {
        &self.config
    }

    /// Vocabulary size (the number of matrix rows).
    pub fn number_of_words(&self) -> usize {
        self.word_id2offset.len()
    }

    /// Vector dimensionality.
    pub fn dimensions(&self) -> usize {
        self.dim
    }

    pub fn number_of_similar_words(&self) -> usize {
        self.number_of_similar_words
    }

    /// Minimum and maximum stored n-gram size, or `None` when the store has
    /// no subword block.
    pub fn ngram_range(&self) -> Option<(usize, usize)> {
        self.ngrams.as_ref().map(|b| (b.min_n, b.max_n))
    }

    /// The word's row number, or `None` if the word is not in the
    /// vocabulary. The returned id can be safely used with
    /// [`word_vector`](Self::word_vector).
    pub fn matrix_row_number(&self, word: &str) -> Option<usize> {
        let slot = self.word2index.try_hash(word)?;
        let id = *self.word_index2id.get(slot as usize)?;
        if id < 0 {
            return None;
        }
        let row = id as usize;
        // The MPH answers for any string; an id beyond the matrix means the
        // slot belongs to no vocabulary word.
        if (row + 1) * self.dim > self.matrix.len() {
            return None;
        }
        // A foreign word can still land on a used slot; the stored surface
        // form is the authoritative membership test.
        if read_string_table(&self.word_id2offset, &self.offset2word, row) != word {
            return None;
        }
        Some(row)
    }

    /// The embedding row for word id `id`. The slice aliases the matrix.
    pub fn word_vector(&self, id: usize) -> Option<&[f32]> {
        self.matrix.get(id * self.dim..(id + 1) * self.dim)
    }

    /// Row access for ids already verified to be in range.
    fn row(&self, id: usize) -> &[f32] {
        &self.matrix[id * self.dim..(id + 1) * self.dim]
    }

    /// The embedding for `word`. A known word borrows its matrix row. An
    /// unknown word is synthesized from its character n-grams when the store
    /// has a subword block (all zeroes when no n-gram matches, which is
    /// distinct from not-found); without subword data the result is `None`.
    pub fn word_embedding(&self, word: &str) -> Option<Cow<'_, [f32]>> {
        if let Some(row) = self.matrix_row_number(word) {
            return self.word_vector(row).map(Cow::Borrowed);
        }
        if self.ngrams.is_some() {
            return Some(Cow::Owned(subword::embedding_for_oov(word, self)));
        }
        None
    }

    /// The stored vector for a character n-gram, or `None` if the n-gram is
    /// unknown or the store has no subword block.
    pub fn ngram_vector(&self, ngram: &str) -> Option<&[f32]> {
        let block = self.ngrams.as_ref()?;
        let slot = block.ngram2index.try_hash(ngram)?;
        let id = *block.ngram_index2id.get(slot as usize)?;
        if id < 0 {
            return None;
        }
        let row = id as usize;
        if read_string_table(&block.ngram_id2offset, &block.offset2ngram, row) != ngram {
            return None;
        }
        block.matrix.get(row * self.dim..(row + 1) * self.dim)
    }

    /// Corpus frequency of `word`, 0 if unknown.
    pub fn frequency(&self, word: &str) -> u64 {
        match self.matrix_row_number(word) {
            Some(id) => self.frequencies[id] as u64,
            None => 0,
        }
    }

    /// The `id`-th word of the vocabulary, or `None` when out of range.
    pub fn get_word(&self, id: usize) -> Option<String> {
        if id >= self.number_of_words() {
            return None;
        }
        Some(self.id_to_word(id))
    }

    fn id_to_word(&self, id: usize) -> String {
        read_string_table(&self.word_id2offset, &self.offset2word, id).into_owned()
    }

    /// The stored neighbors of word id `id` with their similarities,
    /// stopping at the first zero similarity. Empty for COL spaces.
    pub fn neighbors_of(&self, id: usize) -> impl Iterator<Item = (usize, f32)> + '_ {
        let n = self.number_of_similar_words;
        let (ids, values) = match (&self.sim_matrix, &self.sim_values) {
            (Some(m), Some(v)) if n > 0 => (&m[id * n..(id + 1) * n], &v[id * n..(id + 1) * n]),
            _ => (&[][..], &[][..]),
        };
        ids.iter()
            .zip(values)
            .take_while(|(_, s)| **s > 0.0)
            .map(|(i, s)| (*i as usize, *s))
    }

    /// The stored most similar words for `word`, highest similarity first,
    /// or `None` if the word is unknown. SIM spaces only.
    pub fn similar_words(&self, word: &str) -> WordspaceResult<Option<Vec<WordAndScore>>> {
        self.require_sim("similar_words")?;
        let Some(id) = self.matrix_row_number(word) else {
            return Ok(None);
        };
        Ok(Some(
            self.neighbors_of(id)
                .map(|(neighbor, sim)| WordAndScore::new(self.id_to_word(neighbor), sim))
                .collect(),
        ))
    }

    /// Similarity of the embeddings of `w1` and `w2` under `measure`;
    /// [`NOT_FOUND_SIMILARITY`] if either word is unknown.
    pub fn semantic_similarity(
        &self,
        w1: &str,
        w2: &str,
        measure: SimilarityMeasure,
    ) -> WordspaceResult<f32> {
        let (Some(id1), Some(id2)) = (self.matrix_row_number(w1), self.matrix_row_number(w2))
        else {
            return Ok(NOT_FOUND_SIMILARITY);
        };
        Ok(measure.dense(self.row(id1), self.row(id2))? as f32)
    }

    /// Similarity of the stored neighbor sets of `w1` and `w2` under
    /// `measure`, computed on sparse vectors keyed by neighbor id;
    /// [`NOT_FOUND_SIMILARITY`] if either word is unknown. SIM spaces only.
    pub fn second_order_similarity(
        &self,
        w1: &str,
        w2: &str,
        measure: SimilarityMeasure,
    ) -> WordspaceResult<f32> {
        self.require_sim("second_order_similarity")?;
        let (Some(id1), Some(id2)) = (self.matrix_row_number(w1), self.matrix_row_number(w2))
        else {
            return Ok(NOT_FOUND_SIMILARITY);
        };
        let keyed_by_id = |id: usize| -> SparseVector {
            self.neighbors_of(id)
                .map(|(neighbor, sim)| (neighbor.to_string(), sim))
                .collect()
        };
        Ok(measure.sparse(&keyed_by_id(id1), &keyed_by_id(id2)) as f32)
    }

    /// The embedding of `word` as a sparse map with column ids as feature
    /// keys, or `None` if the word is unknown. For a dense vector use
    /// [`word_embedding`](Self::word_embedding) instead.
    pub fn word_vector_map(&self, word: &str) -> Option<SparseVector> {
        let id = self.matrix_row_number(word)?;
        let row = self.word_vector(id)?;
        Some(
            row.iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), *v))
                .collect(),
        )
    }

    /// The second order word vector of `word`: its stored neighbor words as
    /// features. SIM spaces only.
    pub fn second_order_word_vector(&self, word: &str) -> WordspaceResult<Option<SparseVector>> {
        self.require_sim("second_order_word_vector")?;
        let Some(id) = self.matrix_row_number(word) else {
            return Ok(None);
        };
        Ok(Some(
            self.neighbors_of(id)
                .map(|(neighbor, sim)| (self.id_to_word(neighbor), sim))
                .collect(),
        ))
    }

    /// The "collocations" of a dense word: its matrix columns as (column id,
    /// value) pairs, highest value first.
    pub fn collocations(&self, word: &str) -> Option<Vec<WordAndScore>> {
        let id = self.matrix_row_number(word)?;
        let row = self.word_vector(id)?;
        let mut result: Vec<WordAndScore> = row
            .iter()
            .enumerate()
            .map(|(i, v)| WordAndScore::new(i.to_string(), *v))
            .collect();
        sort_by_score_desc(&mut result);
        Some(result)
    }

    /// The `max` most similar words for word id `id` by cosine over all
    /// matrix rows. Only words with positive similarity are returned.
    pub fn most_similar(&self, id: usize, max: usize) -> WordspaceResult<Vec<WordAndScore>> {
        let Some(query) = self.word_vector(id) else {
            return Ok(Vec::new());
        };
        let mut result = Vec::new();
        for k in 0..self.number_of_words() {
            if k == id {
                continue;
            }
            let sim = SimilarityMeasure::Cosine.dense(query, self.row(k))? as f32;
            if sim <= 0.0 {
                continue;
            }
            result.push(WordAndScore::new(self.id_to_word(k), sim));
        }
        sort_by_score_desc(&mut result);
        result.truncate(max);
        Ok(result)
    }

    /// Iterate over all words of the vocabulary in id order.
    pub fn vocabulary_iter(&self) -> DenseVocabularyIter<'_> {
        DenseVocabularyIter { store: self, next: 0 }
    }

    /// Write the word-frequency list to `output`; returns the number of
    /// words written.
    pub fn word_frequency_list(&self, output: &Path) -> WordspaceResult<usize> {
        let mut writer = BufWriter::new(std::fs::File::create(output)?);
        for id in 0..self.number_of_words() {
            writeln!(writer, "{}\t{}", self.id_to_word(id), self.frequencies[id])?;
        }
        writer.flush()?;
        Ok(self.number_of_words())
    }

    /// Serialize the whole store into a single image file.
    pub fn serialize_to(&self, path: impl AsRef<Path>) -> WordspaceResult<()> {
        let bytes = bincode::serialize(self).map_err(|e| WordspaceError::Serialization {
            reason: e.to_string(),
        })?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Restore a store from a serialized image. Failure to deserialize is
    /// fatal for the open attempt. After restore, the number of similar
    /// words is taken from the width of the neighbor matrix.
    pub fn deserialize_from(path: impl AsRef<Path>) -> WordspaceResult<Self> {
        let bytes = std::fs::read(path)?;
        let mut store: DenseStore =
            bincode::deserialize(&bytes).map_err(|e| WordspaceError::Serialization {
                reason: e.to_string(),
            })?;
        if let Some(sim_matrix) = &store.sim_matrix {
            let words = store.number_of_words().max(1);
            store.number_of_similar_words = sim_matrix.len() / words;
        }
        Ok(store)
    }

    fn require_sim(&self, operation: &'static str) -> WordspaceResult<()> {
        if self.wordspace_type != WordspaceType::Sim {
            return Err(WordspaceError::WrongWordspaceType {
                operation,
                actual: self.wordspace_type,
            });
        }
        Ok(())
    }
}

/// Build the string table for a key list: per-id byte offsets into a
/// concatenated buffer in which every key's UTF-8 bytes are preceded by a
/// little-endian u16 length.
fn build_string_table(keys: &[String]) -> WordspaceResult<(Vec<u32>, Vec<u8>)> {
    let mut bytes = Vec::new();
    let mut id2offset = Vec::with_capacity(keys.len());
    for key in keys {
        let encoded = key.as_bytes();
        let len = u16::try_from(encoded.len()).map_err(|_| WordspaceError::CorruptIndex {
            reason: format!("key '{key}' exceeds the maximum stored length"),
        })?;
        id2offset.push(bytes.len() as u32);
        bytes.extend_from_slice(&len.to_le_bytes());
        bytes.extend_from_slice(encoded);
    }
    Ok((id2offset, bytes))
}

/// Read entry `id` back out of a string table.
fn read_string_table<'a>(id2offset: &[u32], bytes: &'a [u8], id: usize) -> std::borrow::Cow<'a, str> {
    let offset = id2offset[id] as usize;
    let len = u16::from_le_bytes([bytes[offset], bytes[offset + 1]]) as usize;
    String::from_utf8_lossy(&bytes[offset + 2..offset + 2 + len])
}

/// Build the guarded MPH lookup for a key list: the hash plus the
/// slot-to-id table initialized to -1 for unused slots.
fn build_lookup(keys: &[String]) -> WordspaceResult<(Mphf<String>, Vec<i32>)> {
    let mph = Mphf::new(MPH_GAMMA, keys);
    let mut index2id = vec![-1i32; keys.len()];
    for (id, key) in keys.iter().enumerate() {
        let slot = mph.hash(key) as usize;
        if slot >= index2id.len() {
            return Err(WordspaceError::CorruptIndex {
                reason: format!("perfect hash produced out-of-range slot for '{key}'"),
            });
        }
        index2id[slot] = id as i32;
    }
    Ok((mph, index2id))
}

/// Iterator over the words of a dense store, in id order.
pub struct DenseVocabularyIter<'a> {
    store: &'a DenseStore,
    next: usize,
}

impl Iterator for DenseVocabularyIter<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let word = self.store.get_word(self.next)?;
        self.next += 1;
        Some(word)
    }
}
