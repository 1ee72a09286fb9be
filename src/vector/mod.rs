//! ベクトル演算と類似度尺度モジュール
//!
//! Vector algebra and similarity measures.
//!
//! Word vectors come in two representations, matching the two storage
//! back-ends: dense vectors are `f32` slices of fixed length, sparse vectors
//! map feature keys to significance values. The algebra lives in
//! [`dense`] and [`sparse`]; [`SimilarityMeasure`] compares vectors of
//! either representation.

pub mod dense;
pub mod sparse;
mod similarity;

pub use similarity::SimilarityMeasure;

use std::collections::HashMap;

/// A sparse word vector: feature key to significance value.
///
/// A feature key is a plain word, a word joined to a relation identifier by
/// [`crate::store::RELATION_SEPARATOR`], or a pure integer id rendered as a
/// string.
pub type SparseVector = HashMap<String, f32>;
