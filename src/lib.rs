//! # wordspace
//!
//! wordspaceは、事前計算された分布的単語類似度データベース（単語空間）に
//! 対するクエリエンジンです。コーパス頻度、単語ベクトル、意味的に類似した
//! 単語、語間のベクトル類似度、フレーズの合成ベクトル、アナロジー、短文間
//! の類似度などのクエリに応答します。
//!
//! ## 主な機能
//!
//! - **2つのストレージバックエンド**: 転置インデックス（疎）と直列化行列（密）
//! - **類似度尺度**: コサイン類似度とKOLB（Dice系）尺度
//! - **ベクトル合成**: 加算、減算、乗算、EXTREMA、COMBINED、DILATION
//! - **近傍探索**: 全探索と近傍グラフ上のベストファースト探索
//!
//! A query engine for pre-computed distributional word-similarity databases
//! ("word spaces"). Given a word space produced offline, it answers queries
//! for corpus frequencies, word vectors, semantically similar words, vector
//! similarity between words, composed vectors for multi-word phrases,
//! analogies, and short-text similarity.
//!
//! ## Word space types
//!
//! There are two orthogonal type axes to keep in mind:
//!
//! - **Storage**: a word space is either a *sparse* inverted index (a
//!   directory; suited for high-dimensional count vectors) or a *dense*
//!   serialized matrix image (a single file; suited for low-dimensional word
//!   embeddings, optionally with subword n-grams).
//! - **Content**: a word space of type [`WordspaceType::Col`] stores a word
//!   vector per word; type [`WordspaceType::Sim`] additionally stores the
//!   pre-computed most similar words for each word. Several queries (stored
//!   neighbors, second-order similarity, graph search) require a SIM space.
//!
//! ## Usage
//!
//! ```no_run
//! use wordspace::{SimilarityMeasure, WordSpace};
//!
//! let space = WordSpace::open("path/to/wordspace", false)?;
//! let sim = space.semantic_similarity("house", "building", SimilarityMeasure::Kolb)?;
//! if sim == wordspace::NOT_FOUND_SIMILARITY {
//!     println!("one of the words is unknown");
//! } else {
//!     println!("similarity: {sim}");
//! }
//! # Ok::<(), wordspace::WordspaceError>(())
//! ```
//!
//! Once opened, a word space is immutable; a handle can be shared across
//! threads without locking.

/// デバッグ出力を行うマクロ
///
/// Write a message to stderr when debug output is enabled (either via
/// [`config::set_global_debug`] or the `WORDSPACE_DEBUG` environment
/// variable).
#[macro_export]
macro_rules! debug_print {
    ($($arg:tt)*) => {
        if $crate::config::is_global_debug_enabled() {
            eprintln!("DEBUG: {}", format!($($arg)*));
        }
    };
}

pub mod cluster;
pub mod compose;
pub mod config;
pub mod error;
pub mod ngram;
pub mod rank;
pub mod store;
pub mod subword;
pub mod text;
pub mod vector;

// Explicit exports for the common query surface
pub use config::WordspaceConfig;
pub use error::{ErrorContext, WordspaceError, WordspaceResult};
pub use store::{
    DenseStore, NOT_FOUND_SIMILARITY, RELATION_SEPARATOR, SparseStore, WordAndScore, WordRecord,
    WordSpace, WordspaceType,
};
pub use vector::{SimilarityMeasure, SparseVector};
