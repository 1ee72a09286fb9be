//! 転置インデックスストレージバックエンド
//!
//! 疎な単語空間をtantivyインデックスとして提供します。語彙の各単語が
//! 1つのドキュメントに対応し、次元削減なしの高次元カウントベクトルを
//! 疎行列として格納するのに適しています。
//!
//! Inverted-index storage back-end.
//!
//! A sparse word space is a directory holding a tantivy index with one
//! document per vocabulary word, plus a `disco.config` file. A document has
//! six fields:
//!
//! - `word`: the word itself. This is the only searchable field.
//! - `freq`: the word's corpus frequency. Stored only.
//! - `dsb`: the distributionally similar words as a single space-separated
//!   string, sorted by similarity (highest first). Empty for spaces of type
//!   COL. Stored only.
//! - `dsbSim`: the similarity values for `dsb`, space-separated and parallel
//!   to it. Stored only.
//! - `kol`: the feature keys of the word's sparse vector, space-separated.
//!   A feature key is a plain word, a word joined to a relation by
//!   [`RELATION_SEPARATOR`], or a pure integer id. Only features whose
//!   significance reached the builder's `minWeight` threshold are stored.
//! - `kolSig`: the significance values for `kol`, parallel to it.
//!
//! The queried word must be a single token; anything else is treated as
//! not-found. Clients must not mutate the index directory while a handle is
//! open.

use crate::config::WordspaceConfig;
use crate::debug_print;
use crate::error::{WordspaceError, WordspaceResult};
use crate::store::{
    NOT_FOUND_SIMILARITY, RELATION_SEPARATOR, WordAndScore, WordspaceType, sort_by_score_desc,
};
use crate::vector::{SimilarityMeasure, SparseVector};
use std::collections::HashMap;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tantivy::collector::TopDocs;
use tantivy::directory::RamDirectory;
use tantivy::query::TermQuery;
use tantivy::schema::{Field, IndexRecordOption, STORED, STRING, Schema, SchemaBuilder, Value};
use tantivy::{Directory, DocAddress, Index, IndexReader, ReloadPolicy, Searcher, TantivyDocument, Term};

/// Schema fields of a sparse word space document.
#[derive(Debug, Clone, Copy)]
pub struct WordFields {
    pub word: Field,
    pub freq: Field,
    pub dsb: Field,
    pub dsb_sim: Field,
    pub kol: Field,
    pub kol_sig: Field,
}

impl WordFields {
    /// Create the schema used by sparse word spaces. The offline builder and
    /// test fixtures create indexes with this schema; [`SparseStore::open`]
    /// resolves the fields from the existing index instead.
    pub fn build() -> (Schema, WordFields) {
        let mut builder = SchemaBuilder::default();

        // The word is the only indexed field; exact matching, no tokenization.
        let word = builder.add_text_field("word", STRING | STORED);
        let freq = builder.add_u64_field("freq", STORED);
        let dsb = builder.add_text_field("dsb", STORED);
        let dsb_sim = builder.add_text_field("dsbSim", STORED);
        let kol = builder.add_text_field("kol", STORED);
        let kol_sig = builder.add_text_field("kolSig", STORED);

        let schema = builder.build();
        let fields = WordFields {
            word,
            freq,
            dsb,
            dsb_sim,
            kol,
            kol_sig,
        };
        (schema, fields)
    }

    fn for_index(index: &Index) -> WordspaceResult<WordFields> {
        let schema = index.schema();
        let field = |name: &str| {
            schema
                .get_field(name)
                .map_err(|_| WordspaceError::CorruptIndex {
                    reason: format!("index schema is missing the '{name}' field"),
                })
        };
        Ok(WordFields {
            word: field("word")?,
            freq: field("freq")?,
            dsb: field("dsb")?,
            dsb_sim: field("dsbSim")?,
            kol: field("kol")?,
            kol_sig: field("kolSig")?,
        })
    }
}

/// The stored index entry of a single word.
#[derive(Debug, Clone)]
pub struct WordRecord {
    pub word: String,
    pub freq: u64,
    /// Feature keys of the sparse word vector.
    pub features: Vec<String>,
    /// Significance values parallel to `features`.
    pub significances: Vec<f32>,
    /// Distributionally similar words, highest similarity first. Empty for
    /// spaces of type COL.
    pub neighbor_words: Vec<String>,
    /// Similarity values parallel to `neighbor_words`.
    pub neighbor_similarities: Vec<f32>,
}

impl WordRecord {
    /// The word vector as a feature map.
    pub fn feature_vector(&self) -> SparseVector {
        self.features
            .iter()
            .zip(&self.significances)
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }

    /// The second order word vector: stored neighbors as features. A zero
    /// similarity terminates the stored prefix.
    pub fn neighbor_vector(&self) -> SparseVector {
        let mut v = SparseVector::new();
        for (word, sim) in self.neighbor_words.iter().zip(&self.neighbor_similarities) {
            if *sim <= 0.0 {
                break;
            }
            v.insert(word.clone(), *sim);
        }
        v
    }

    /// The stored neighbor list as ranked pairs, stopping at the first zero
    /// similarity.
    pub fn neighbors_ranked(&self) -> Vec<WordAndScore> {
        self.neighbor_words
            .iter()
            .zip(&self.neighbor_similarities)
            .take_while(|(_, sim)| **sim > 0.0)
            .map(|(word, sim)| WordAndScore::new(word.clone(), *sim))
            .collect()
    }

    /// Compare two records under `measure` on their feature vectors.
    pub fn similarity(&self, other: &WordRecord, measure: SimilarityMeasure) -> f64 {
        measure.sparse(&self.feature_vector(), &other.feature_vector())
    }
}

/// 転置インデックス単語空間ストア
///
/// Inverted-index word space store.
pub struct SparseStore {
    index_dir: PathBuf,
    config: WordspaceConfig,
    wordspace_type: WordspaceType,
    fields: WordFields,
    reader: IndexReader,
    resident: bool,
}

impl std::fmt::Debug for SparseStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SparseStore")
            .field("index_dir", &self.index_dir)
            .field("wordspace_type", &self.wordspace_type)
            .field("vocabulary_size", &self.config.vocabulary_size)
            .field("resident", &self.resident)
            .finish()
    }
}

impl SparseStore {
    /// Open the sparse word space in `dir`. The word space type is read from
    /// the `dontCompute2ndOrder` line of the config file. With
    /// `load_into_memory`, all index files are mirrored into a RAM directory
    /// and subsequent queries never touch disk; make sure enough memory is
    /// free, word spaces can be large.
    pub fn open(dir: impl AsRef<Path>, load_into_memory: bool) -> WordspaceResult<Self> {
        let dir = dir.as_ref();
        let config = WordspaceConfig::read(dir)?;
        let wordspace_type = if config.dont_compute_2nd_order {
            WordspaceType::Col
        } else {
            WordspaceType::Sim
        };

        let index = if load_into_memory {
            let ram = RamDirectory::create();
            for entry in std::fs::read_dir(dir)? {
                let entry = entry?;
                let path = entry.path();
                if !path.is_file() {
                    continue;
                }
                let data = std::fs::read(&path)?;
                ram.atomic_write(Path::new(&entry.file_name()), &data)?;
            }
            Index::open(ram)?
        } else {
            Index::open_in_dir(dir)?
        };

        let fields = WordFields::for_index(&index)?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        Ok(Self {
            index_dir: dir.to_path_buf(),
            config,
            wordspace_type,
            fields,
            reader,
            resident: load_into_memory,
        })
    }

    pub fn wordspace_type(&self) -> WordspaceType {
        self.wordspace_type
    }

    pub fn config(&self) -> &WordspaceConfig {
        &self.config
    }

    /// True when the index was mirrored into memory at open time.
    pub fn is_resident(&self) -> bool {
        self.resident
    }

    /// Vocabulary size as recorded in the config file.
    pub fn number_of_words(&self) -> usize {
        self.config.vocabulary_size.max(0) as usize
    }

    pub fn number_of_similar_words(&self) -> usize {
        match self.wordspace_type {
            WordspaceType::Col => 0,
            WordspaceType::Sim => self.config.number_of_similar_words.max(0) as usize,
        }
    }

    /// Number of documents actually present in the index.
    pub fn doc_count(&self) -> usize {
        self.reader.searcher().num_docs() as usize
    }

    /// Look up `word` in the index and return its stored record, or `None`
    /// if the word is unknown. The queried string must be a single token;
    /// strings that do not tokenize to exactly one word are treated as
    /// not-found.
    pub fn search(&self, word: &str) -> WordspaceResult<Option<WordRecord>> {
        let mut tokens = word.split_whitespace();
        let (Some(token), None) = (tokens.next(), tokens.next()) else {
            return Ok(None);
        };

        let searcher = self.reader.searcher();
        let query = TermQuery::new(
            Term::from_field_text(self.fields.word, token),
            IndexRecordOption::Basic,
        );
        let hits = searcher.search(&query, &TopDocs::with_limit(1))?;
        let Some((_, address)) = hits.first() else {
            return Ok(None);
        };
        let doc: TantivyDocument = searcher.doc(*address)?;
        self.record_from_doc(&doc).map(Some)
    }

    fn record_from_doc(&self, doc: &TantivyDocument) -> WordspaceResult<WordRecord> {
        let text = |field: Field| {
            doc.get_first(field)
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string()
        };
        let word = text(self.fields.word);
        let freq = doc
            .get_first(self.fields.freq)
            .and_then(|v| v.as_u64())
            .unwrap_or(0);

        let features: Vec<String> = text(self.fields.kol)
            .split_whitespace()
            .map(str::to_string)
            .collect();
        let significances = parse_floats(&text(self.fields.kol_sig), &word, "kolSig")?;
        if features.len() != significances.len() {
            return Err(WordspaceError::CorruptIndex {
                reason: format!(
                    "'kol' and 'kolSig' have different lengths ({} vs {}) for word '{word}'",
                    features.len(),
                    significances.len()
                ),
            });
        }

        let neighbor_words: Vec<String> = text(self.fields.dsb)
            .split_whitespace()
            .map(str::to_string)
            .collect();
        let mut neighbor_similarities = parse_floats(&text(self.fields.dsb_sim), &word, "dsbSim")?;
        // The stored width is an upper bound; pad the value list with the
        // terminating zeros if it is shorter than the word list.
        neighbor_similarities.resize(neighbor_words.len().max(neighbor_similarities.len()), 0.0);
        neighbor_similarities.truncate(neighbor_words.len());

        Ok(WordRecord {
            word,
            freq,
            features,
            significances,
            neighbor_words,
            neighbor_similarities,
        })
    }

    /// Corpus frequency of `word`, 0 if unknown.
    pub fn frequency(&self, word: &str) -> WordspaceResult<u64> {
        Ok(self.search(word)?.map(|r| r.freq).unwrap_or(0))
    }

    /// The stored most similar words for `word`, highest similarity first.
    /// The similarity values can differ from `semantic_similarity` results
    /// when another measure was used to build the word space; consult the
    /// config file.
    pub fn similar_words(&self, word: &str) -> WordspaceResult<Option<Vec<WordAndScore>>> {
        self.require_sim("similar_words")?;
        Ok(self.search(word)?.map(|r| r.neighbors_ranked()))
    }

    /// Similarity of the word vectors of `w1` and `w2` under `measure`;
    /// [`NOT_FOUND_SIMILARITY`] if either word is unknown. The KOLB measure
    /// must not be used with word spaces imported from embedding tools. To
    /// compare multi-word phrases, use the composition module instead.
    pub fn semantic_similarity(
        &self,
        w1: &str,
        w2: &str,
        measure: SimilarityMeasure,
    ) -> WordspaceResult<f32> {
        let (Some(r1), Some(r2)) = (self.search(w1)?, self.search(w2)?) else {
            return Ok(NOT_FOUND_SIMILARITY);
        };
        Ok(r1.similarity(&r2, measure) as f32)
    }

    /// Similarity of the stored neighbor sets of `w1` and `w2` under
    /// `measure`; [`NOT_FOUND_SIMILARITY`] if either word is unknown.
    pub fn second_order_similarity(
        &self,
        w1: &str,
        w2: &str,
        measure: SimilarityMeasure,
    ) -> WordspaceResult<f32> {
        self.require_sim("second_order_similarity")?;
        let (Some(r1), Some(r2)) = (self.search(w1)?, self.search(w2)?) else {
            return Ok(NOT_FOUND_SIMILARITY);
        };
        Ok(measure.sparse(&r1.neighbor_vector(), &r2.neighbor_vector()) as f32)
    }

    /// The word vector of `word` as a feature map, or `None` if unknown.
    pub fn word_vector(&self, word: &str) -> WordspaceResult<Option<SparseVector>> {
        Ok(self.search(word)?.map(|r| r.feature_vector()))
    }

    /// The second order word vector of `word`: its stored neighbors as
    /// features. Only available on spaces of type `Sim`.
    pub fn second_order_word_vector(&self, word: &str) -> WordspaceResult<Option<SparseVector>> {
        self.require_sim("second_order_word_vector")?;
        Ok(self.search(word)?.map(|r| r.neighbor_vector()))
    }

    /// The collocations of `word`, highest significance first, or `None` if
    /// the word is unknown. Relation suffixes are stripped from the feature
    /// keys and significances of identical words are summed; ties keep the
    /// order in which the features are stored.
    pub fn collocations(&self, word: &str) -> WordspaceResult<Option<Vec<WordAndScore>>> {
        let Some(record) = self.search(word)? else {
            return Ok(None);
        };

        let mut summed: Vec<WordAndScore> = Vec::new();
        let mut position: HashMap<String, usize> = HashMap::new();
        for (feature, sig) in record.features.iter().zip(&record.significances) {
            let key = match feature.rfind(RELATION_SEPARATOR) {
                Some(p) => &feature[..p],
                None => feature.as_str(),
            };
            match position.get(key) {
                Some(&i) => summed[i].score += sig,
                None => {
                    position.insert(key.to_string(), summed.len());
                    summed.push(WordAndScore::new(key, *sig));
                }
            }
        }
        sort_by_score_desc(&mut summed);
        Ok(Some(summed))
    }

    /// The collocational strength between `w1` and `w2`, summed over all
    /// relations in both directions; the greater of the two values. 0 if
    /// either word is unknown or never co-occurs with the other.
    pub fn collocational_value(&self, w1: &str, w2: &str) -> WordspaceResult<f32> {
        let lookup = |cols: Option<Vec<WordAndScore>>, other: &str| {
            cols.and_then(|cols| {
                cols.iter()
                    .find(|c| c.word == other)
                    .map(|c| c.score)
            })
            .unwrap_or(0.0)
        };
        let v1 = lookup(self.collocations(w1)?, w2);
        let v2 = lookup(self.collocations(w2)?, w1);
        Ok(v1.max(v2))
    }

    /// The `id`-th word of the vocabulary (dense document id in
    /// `0..doc_count()`), or `None` when out of range. Iteration order is the
    /// index's segment order and carries no meaning.
    pub fn get_word(&self, id: usize) -> WordspaceResult<Option<String>> {
        let searcher = self.reader.searcher();
        word_at(&searcher, self.fields.word, id as u64)
    }

    /// Iterate over all words in the index. Entries that fail to read are
    /// skipped.
    pub fn vocabulary_iter(&self) -> SparseVocabularyIter {
        let searcher = self.reader.searcher();
        let total = searcher.num_docs();
        SparseVocabularyIter {
            searcher,
            word_field: self.fields.word,
            next_ord: 0,
            total,
        }
    }

    /// Write the word-frequency list for all index entries to `output`.
    /// Defect entries are skipped and reported through the debug log; the
    /// returned count covers only the words actually written.
    pub fn word_frequency_list(&self, output: &Path) -> WordspaceResult<usize> {
        let searcher = self.reader.searcher();
        let total = searcher.num_docs();
        let mut writer = BufWriter::new(std::fs::File::create(output)?);

        let mut written = 0usize;
        let mut defect = 0usize;
        for ord in 0..total {
            let Some(address) = address_at(&searcher, ord) else {
                break;
            };
            let doc: TantivyDocument = match searcher.doc(address) {
                Ok(doc) => doc,
                Err(e) => {
                    defect += 1;
                    debug_print!("word_frequency_list: skipping entry {ord}: {e}");
                    continue;
                }
            };
            let Some(word) = doc.get_first(self.fields.word).and_then(|v| v.as_str()) else {
                defect += 1;
                continue;
            };
            let freq = doc
                .get_first(self.fields.freq)
                .and_then(|v| v.as_u64())
                .unwrap_or(0);
            writeln!(writer, "{word}\t{freq}")?;
            written += 1;
        }
        writer.flush()?;

        if defect > 0 {
            debug_print!(
                "word space '{}' has {defect} defect entries; {written} words written",
                self.index_dir.display()
            );
        }
        Ok(written)
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

/// Resolve an ordinal document number to a segment-local address.
fn address_at(searcher: &Searcher, ord: u64) -> Option<DocAddress> {
    let mut remaining = ord;
    for (segment_ord, segment) in searcher.segment_readers().iter().enumerate() {
        let docs = segment.num_docs() as u64;
        if remaining < docs {
            return Some(DocAddress::new(segment_ord as u32, remaining as u32));
        }
        remaining -= docs;
    }
    None
}

fn word_at(searcher: &Searcher, word_field: Field, ord: u64) -> WordspaceResult<Option<String>> {
    let Some(address) = address_at(searcher, ord) else {
        return Ok(None);
    };
    let doc: TantivyDocument = searcher.doc(address)?;
    Ok(doc
        .get_first(word_field)
        .and_then(|v| v.as_str())
        .map(str::to_string))
}

fn parse_floats(text: &str, word: &str, field: &str) -> WordspaceResult<Vec<f32>> {
    text.split_whitespace()
        .map(|v| {
            v.parse::<f32>().map_err(|e| WordspaceError::CorruptIndex {
                reason: format!("bad float '{v}' in field '{field}' of word '{word}': {e}"),
            })
        })
        .collect()
}

/// Iterator over the words of a sparse store. Entries that fail to read are
/// skipped.
pub struct SparseVocabularyIter {
    searcher: Searcher,
    word_field: Field,
    next_ord: u64,
    total: u64,
}

impl Iterator for SparseVocabularyIter {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        while self.next_ord < self.total {
            let ord = self.next_ord;
            self.next_ord += 1;
            match word_at(&self.searcher, self.word_field, ord) {
                Ok(Some(word)) => return Some(word),
                Ok(None) => return None,
                Err(e) => {
                    debug_print!("vocabulary iterator: skipping entry {ord}: {e}");
                }
            }
        }
        None
    }
}
