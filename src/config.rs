//! 単語空間メタデータモジュール
//!
//! このモジュールは、単語空間の構築時パラメータを記録する `disco.config`
//! プロパティファイルの読み書きを提供します。語彙サイズ、素性次元数、
//! コーパスのトークン数、頻度の上下限、ストップワードリストなどが
//! 含まれます。
//!
//! Word space metadata: the `disco.config` properties file.
//!
//! Every word space directory (sparse) or serialized image (dense) carries a
//! config record describing how the space was built: vocabulary size, feature
//! dimensionality, corpus token count, frequency bounds, stopword list, the
//! similarity measure used for the pre-computed neighbor lists, and so on.
//! The on-disk format is one `key=value` pair per line, UTF-8. Unknown keys
//! are ignored; missing optional keys revert to the documented defaults.

use crate::error::{WordspaceError, WordspaceResult};
use crate::vector::SimilarityMeasure;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

/// File name of the config record inside a word space directory.
pub const CONFIG_FILE_NAME: &str = "disco.config";

static GLOBAL_DEBUG: AtomicBool = AtomicBool::new(false);

/// Enable or disable debug output for the whole process.
pub fn set_global_debug(enabled: bool) {
    GLOBAL_DEBUG.store(enabled, Ordering::Relaxed);
}

/// Check if debug output is enabled, either programmatically or via the
/// `WORDSPACE_DEBUG` environment variable.
pub fn is_global_debug_enabled() -> bool {
    GLOBAL_DEBUG.load(Ordering::Relaxed) || std::env::var("WORDSPACE_DEBUG").is_ok()
}

/// Corpus input formats known to the offline builder.
///
/// `Lemmatized` input has three tab-separated columns per line
/// (wordform, POS tag, lemma); `Conll` is CoNLL-U dependency-parsed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileFormat {
    Tokenized,
    Lemmatized,
    Conll,
    Undefined,
}

impl FileFormat {
    /// Parse a file format name, accepting the spelling variants the builder
    /// accepts. Returns `None` for unknown names.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "tokenized" | "tokenised" => Some(Self::Tokenized),
            "lemmatized" | "lemmatised" => Some(Self::Lemmatized),
            "conll" | "connl" | "conll-u" | "connl-u" => Some(Self::Conll),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Tokenized => "TOKENIZED",
            Self::Lemmatized => "LEMMATIZED",
            Self::Conll => "CONLL",
            Self::Undefined => "UNDEFINED",
        }
    }
}

/// 単語空間の `disco.config` ファイルの解析結果
///
/// Parsed contents of a word space's `disco.config` file.
///
/// Fields default to the values the offline builder assumes when a key is
/// absent. The record is serialized into the dense word space image so a
/// deserialized dense store carries its config without a separate file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordspaceConfig {
    pub input_file_format: FileFormat,
    /// Lemmata instead of word forms for both index words and features.
    pub lemma: bool,
    /// Lemmata as features only. Defaults to `true` when the input format is
    /// `Lemmatized`.
    pub lemma_features: bool,
    /// Comma-separated list of sentence boundary marks.
    pub boundary_marks: String,
    pub stopword_file: String,
    /// Space-separated stopword list.
    pub stopwords: String,
    pub min_freq: i32,
    pub max_freq: i32,
    /// Corpus size N.
    pub tokencount: i64,
    pub vocabulary_size: i32,
    pub input_dir: String,
    pub output_dir: String,
    pub left_context: i32,
    pub right_context: i32,
    pub position: bool,
    pub opening_tag: String,
    pub closing_tag: String,
    pub word_by_document: bool,
    pub add_inverse_relations: bool,
    /// Number of feature words; equals the vector dimensionality for dense
    /// spaces.
    pub number_feature_words: i32,
    /// Neighbors stored per word; 0 for word spaces of type COL.
    pub number_of_similar_words: i32,
    /// Number of subword n-grams stored (dense only), 0 for none.
    pub number_of_ngrams: i32,
    pub weighting_method: String,
    pub min_weight: f32,
    /// Measure that was used to build the pre-computed neighbor lists.
    pub similarity_measure: SimilarityMeasure,
    /// `true` means no neighbor lists were computed, i.e. type COL.
    pub dont_compute_2nd_order: bool,
    pub existing_cooc_file: String,
    pub existing_weight_file: String,
    pub disco_version: i32,
    pub minimum_word_length: i32,
    pub maximum_word_length: i32,
    pub allowed_characters_word: String,
    pub minimum_feature_length: i32,
    pub maximum_feature_length: i32,
    pub allowed_characters_feature: String,
    pub find_multi_token_words: bool,
    pub multi_token_words_dictionary: String,
    pub token_annotator_map: String,
}

impl Default for WordspaceConfig {
    fn default() -> Self {
        Self {
            input_file_format: FileFormat::Undefined,
            lemma: false,
            lemma_features: false,
            boundary_marks: String::new(),
            stopword_file: String::new(),
            stopwords: String::new(),
            min_freq: 100,
            max_freq: -1,
            tokencount: -1,
            vocabulary_size: -1,
            input_dir: String::new(),
            output_dir: String::new(),
            left_context: 3,
            right_context: 3,
            position: true,
            opening_tag: String::new(),
            closing_tag: String::new(),
            word_by_document: false,
            add_inverse_relations: true,
            number_feature_words: 30000,
            number_of_similar_words: 0,
            number_of_ngrams: 0,
            weighting_method: "lin".to_string(),
            min_weight: 0.1,
            similarity_measure: SimilarityMeasure::Kolb,
            dont_compute_2nd_order: false,
            existing_cooc_file: String::new(),
            existing_weight_file: String::new(),
            disco_version: 2,
            minimum_word_length: 2,
            maximum_word_length: 31,
            allowed_characters_word: "\\.\\-'_".to_string(),
            minimum_feature_length: 2,
            maximum_feature_length: 31,
            allowed_characters_feature: "\\.\\-'_".to_string(),
            find_multi_token_words: false,
            multi_token_words_dictionary: String::new(),
            token_annotator_map: String::new(),
        }
    }
}

/// `Boolean.parseBoolean` semantics: anything but a case-insensitive "true"
/// is false.
fn parse_bool(value: &str) -> bool {
    value.eq_ignore_ascii_case("true")
}

impl WordspaceConfig {
    /// Read the config record from `path`, which may be the word space
    /// directory (the file `disco.config` inside it is read) or the config
    /// file itself.
    pub fn read(path: impl AsRef<Path>) -> WordspaceResult<Self> {
        let path = path.as_ref();
        let file = if path.is_dir() {
            path.join(CONFIG_FILE_NAME)
        } else {
            path.to_path_buf()
        };

        let corrupt = |reason: String| WordspaceError::CorruptConfig {
            path: file.clone(),
            reason,
        };

        let text = std::fs::read_to_string(&file)
            .map_err(|e| corrupt(format!("cannot read file: {e}")))?;

        let mut props: HashMap<&str, &str> = HashMap::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                props.insert(key.trim(), value.trim());
            }
        }

        let mut config = Self::default();

        // Every key is optional; a present but unparseable value is an error.
        fn get_i32(
            props: &HashMap<&str, &str>,
            key: &str,
            corrupt: &impl Fn(String) -> WordspaceError,
        ) -> WordspaceResult<Option<i32>> {
            match props.get(key).filter(|v| !v.is_empty()) {
                Some(v) => v
                    .parse::<i32>()
                    .map(Some)
                    .map_err(|e| corrupt(format!("invalid value for '{key}': {e}"))),
                None => Ok(None),
            }
        }

        if let Some(v) = props.get("inputFileFormat").filter(|v| !v.is_empty()) {
            config.input_file_format = FileFormat::parse(v)
                .ok_or_else(|| corrupt(format!("unknown inputFileFormat '{v}'")))?;
            if config.input_file_format == FileFormat::Lemmatized {
                config.lemma_features = true;
            }
        }
        if let Some(v) = props.get("lemma").filter(|v| !v.is_empty()) {
            config.lemma = parse_bool(v);
        }
        if let Some(v) = props.get("lemmaFeatures").filter(|v| !v.is_empty()) {
            config.lemma_features = parse_bool(v);
        }
        if let Some(v) = props.get("boundaryMarks").filter(|v| !v.is_empty()) {
            config.boundary_marks = v.to_string();
        }
        if let Some(v) = props.get("stopwordFile").filter(|v| !v.is_empty()) {
            config.stopword_file = v.to_string();
        }
        if let Some(v) = props.get("stopwords").filter(|v| !v.is_empty()) {
            config.stopwords = v.to_string();
        }
        if let Some(v) = get_i32(&props, "minFreq", &corrupt)? {
            config.min_freq = v;
        }
        if let Some(v) = get_i32(&props, "maxFreq", &corrupt)? {
            config.max_freq = v;
        }
        if let Some(v) = props.get("tokencount").filter(|v| !v.is_empty()) {
            config.tokencount = v
                .parse::<i64>()
                .map_err(|e| corrupt(format!("invalid value for 'tokencount': {e}")))?;
        }
        if let Some(v) = get_i32(&props, "vocabularySize", &corrupt)? {
            config.vocabulary_size = v;
        }
        if let Some(v) = props.get("inputDir").filter(|v| !v.is_empty()) {
            config.input_dir = v.to_string();
        }
        if let Some(v) = props.get("outputDir").filter(|v| !v.is_empty()) {
            config.output_dir = v.to_string();
        }
        if let Some(v) = get_i32(&props, "leftContext", &corrupt)? {
            config.left_context = v;
        }
        if let Some(v) = get_i32(&props, "rightContext", &corrupt)? {
            config.right_context = v;
        }
        if let Some(v) = props.get("position").filter(|v| !v.is_empty()) {
            config.position = parse_bool(v);
        }
        if let Some(v) = props.get("openingTag").filter(|v| !v.is_empty()) {
            config.opening_tag = v.to_string();
        }
        if let Some(v) = props.get("closingTag").filter(|v| !v.is_empty()) {
            config.closing_tag = v.to_string();
        }
        if let Some(v) = props.get("wordByDocument").filter(|v| !v.is_empty()) {
            config.word_by_document = parse_bool(v);
        }
        if let Some(v) = props.get("addInverseRelations").filter(|v| !v.is_empty()) {
            config.add_inverse_relations = parse_bool(v);
        }
        if let Some(v) = get_i32(&props, "numberFeatureWords", &corrupt)? {
            config.number_feature_words = v;
        }
        if let Some(v) = get_i32(&props, "numberOfSimilarWords", &corrupt)? {
            config.number_of_similar_words = v;
        }
        if let Some(v) = get_i32(&props, "numberOfNgrams", &corrupt)? {
            config.number_of_ngrams = v;
        }
        if let Some(v) = props.get("weightingMethod").filter(|v| !v.is_empty()) {
            config.weighting_method = v.to_string();
        }
        if let Some(v) = props.get("minWeight").filter(|v| !v.is_empty()) {
            config.min_weight = v
                .parse::<f32>()
                .map_err(|e| corrupt(format!("invalid value for 'minWeight': {e}")))?;
        }
        if let Some(v) = props.get("similarityMeasure").filter(|v| !v.is_empty()) {
            config.similarity_measure = SimilarityMeasure::parse(v)
                .ok_or_else(|| corrupt(format!("unknown similarityMeasure '{v}'")))?;
        }
        if let Some(v) = props.get("dontCompute2ndOrder").filter(|v| !v.is_empty()) {
            config.dont_compute_2nd_order = parse_bool(v);
        }
        if let Some(v) = props.get("existingCoocFile").filter(|v| !v.is_empty()) {
            config.existing_cooc_file = v.to_string();
        }
        if let Some(v) = props.get("existingWeightFile").filter(|v| !v.is_empty()) {
            config.existing_weight_file = v.to_string();
        }
        if let Some(v) = get_i32(&props, "discoVersion", &corrupt)? {
            config.disco_version = v;
        }
        if let Some(v) = get_i32(&props, "minimumWordLength", &corrupt)? {
            config.minimum_word_length = v;
        }
        if let Some(v) = get_i32(&props, "maximumWordLength", &corrupt)? {
            config.maximum_word_length = v;
        }
        if let Some(v) = props.get("allowedCharactersWord").filter(|v| !v.is_empty()) {
            config.allowed_characters_word = v.to_string();
        }
        if let Some(v) = get_i32(&props, "minimumFeatureLength", &corrupt)? {
            config.minimum_feature_length = v;
        }
        if let Some(v) = get_i32(&props, "maximumFeatureLength", &corrupt)? {
            config.maximum_feature_length = v;
        }
        if let Some(v) = props
            .get("allowedCharactersFeature")
            .filter(|v| !v.is_empty())
        {
            config.allowed_characters_feature = v.to_string();
        }
        if let Some(v) = props.get("findMultiTokenWords").filter(|v| !v.is_empty()) {
            config.find_multi_token_words = parse_bool(v);
        }
        if let Some(v) = props
            .get("multiTokenWordsDictionary")
            .filter(|v| !v.is_empty())
        {
            config.multi_token_words_dictionary = v.to_string();
        }
        if let Some(v) = props.get("tokenAnnotatorMap").filter(|v| !v.is_empty()) {
            config.token_annotator_map = v.to_string();
        }

        // Surrounding tags override the context window configuration.
        if !config.opening_tag.is_empty() && !config.closing_tag.is_empty() {
            config.position = false;
            config.left_context = -1;
            config.right_context = -1;
        }

        Ok(config)
    }

    /// Write the current values as a `disco.config` properties file. `path`
    /// may be a directory or the target file itself.
    pub fn write(&self, path: impl AsRef<Path>) -> WordspaceResult<()> {
        let path = path.as_ref();
        let file = if path.is_dir() {
            path.join(CONFIG_FILE_NAME)
        } else {
            path.to_path_buf()
        };

        let mut out = String::new();
        let mut kv = |key: &str, value: &str| {
            let _ = writeln!(out, "{key}={value}");
        };
        kv("inputFileFormat", self.input_file_format.as_str());
        kv("lemma", &self.lemma.to_string());
        kv("lemmaFeatures", &self.lemma_features.to_string());
        kv("boundaryMarks", &self.boundary_marks);
        kv("stopwordFile", &self.stopword_file);
        kv("stopwords", &self.stopwords);
        kv("minFreq", &self.min_freq.to_string());
        kv("maxFreq", &self.max_freq.to_string());
        kv("tokencount", &self.tokencount.to_string());
        kv("vocabularySize", &self.vocabulary_size.to_string());
        kv("inputDir", &self.input_dir);
        kv("outputDir", &self.output_dir);
        kv("leftContext", &self.left_context.to_string());
        kv("rightContext", &self.right_context.to_string());
        kv("position", &self.position.to_string());
        kv("openingTag", &self.opening_tag);
        kv("closingTag", &self.closing_tag);
        kv("wordByDocument", &self.word_by_document.to_string());
        kv(
            "addInverseRelations",
            &self.add_inverse_relations.to_string(),
        );
        kv(
            "numberFeatureWords",
            &self.number_feature_words.to_string(),
        );
        kv(
            "numberOfSimilarWords",
            &self.number_of_similar_words.to_string(),
        );
        kv("numberOfNgrams", &self.number_of_ngrams.to_string());
        kv("weightingMethod", &self.weighting_method);
        kv("minWeight", &self.min_weight.to_string());
        kv("similarityMeasure", self.similarity_measure.as_str());
        kv(
            "dontCompute2ndOrder",
            &self.dont_compute_2nd_order.to_string(),
        );
        kv("existingCoocFile", &self.existing_cooc_file);
        kv("existingWeightFile", &self.existing_weight_file);
        kv("discoVersion", &self.disco_version.to_string());
        kv("minimumWordLength", &self.minimum_word_length.to_string());
        kv("maximumWordLength", &self.maximum_word_length.to_string());
        kv("allowedCharactersWord", &self.allowed_characters_word);
        kv(
            "minimumFeatureLength",
            &self.minimum_feature_length.to_string(),
        );
        kv(
            "maximumFeatureLength",
            &self.maximum_feature_length.to_string(),
        );
        kv(
            "allowedCharactersFeature",
            &self.allowed_characters_feature,
        );
        kv(
            "findMultiTokenWords",
            &self.find_multi_token_words.to_string(),
        );
        kv(
            "multiTokenWordsDictionary",
            &self.multi_token_words_dictionary,
        );
        kv("tokenAnnotatorMap", &self.token_annotator_map);

        std::fs::write(&file, out)?;
        Ok(())
    }

    /// The stopword list as a slice of words.
    pub fn stopword_list(&self) -> Vec<&str> {
        self.stopwords.split_whitespace().collect()
    }

    /// The stopword list as a set for membership tests.
    pub fn stopword_set(&self) -> HashSet<&str> {
        self.stopwords.split_whitespace().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_builder_assumptions() {
        let config = WordspaceConfig::default();
        assert_eq!(config.min_freq, 100);
        assert_eq!(config.max_freq, -1);
        assert_eq!(config.number_feature_words, 30000);
        assert_eq!(config.number_of_similar_words, 0);
        assert_eq!(config.weighting_method, "lin");
        assert_eq!(config.similarity_measure, SimilarityMeasure::Kolb);
        assert!(!config.dont_compute_2nd_order);
    }

    #[test]
    fn read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let config = WordspaceConfig {
            vocabulary_size: 42,
            tokencount: 1_000_000,
            stopwords: "the a of".to_string(),
            number_of_similar_words: 10,
            similarity_measure: SimilarityMeasure::Cosine,
            ..Default::default()
        };
        config.write(dir.path()).unwrap();

        let read = WordspaceConfig::read(dir.path()).unwrap();
        assert_eq!(read.vocabulary_size, 42);
        assert_eq!(read.tokencount, 1_000_000);
        assert_eq!(read.stopwords, "the a of");
        assert_eq!(read.number_of_similar_words, 10);
        assert_eq!(read.similarity_measure, SimilarityMeasure::Cosine);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&file, "vocabularySize=7\nsomeFutureKey=xyz\n").unwrap();
        let config = WordspaceConfig::read(dir.path()).unwrap();
        assert_eq!(config.vocabulary_size, 7);
    }

    #[test]
    fn missing_file_is_corrupt_config() {
        let dir = tempfile::tempdir().unwrap();
        let err = WordspaceConfig::read(dir.path()).unwrap_err();
        assert_eq!(err.status_code(), "CORRUPT_CONFIG");
    }

    #[test]
    fn bad_number_is_corrupt_config() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&file, "vocabularySize=abc\n").unwrap();
        let err = WordspaceConfig::read(dir.path()).unwrap_err();
        assert_eq!(err.status_code(), "CORRUPT_CONFIG");
    }

    #[test]
    fn surrounding_tags_override_context_window() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&file, "openingTag=<doc>\nclosingTag=</doc>\n").unwrap();
        let config = WordspaceConfig::read(dir.path()).unwrap();
        assert!(!config.position);
        assert_eq!(config.left_context, -1);
        assert_eq!(config.right_context, -1);
    }

    #[test]
    fn stopword_set_membership() {
        let config = WordspaceConfig {
            stopwords: "the of and".to_string(),
            ..Default::default()
        };
        let set = config.stopword_set();
        assert!(set.contains("the"));
        assert!(!set.contains("word"));
    }
}
