//! ベクトル類似度尺度モジュール
//!
//! Vector similarity measures.
//!
//! Two measures are supported, selectable per query and recorded in the word
//! space config as the measure the neighbor lists were built with. Both have
//! an entry point for dense and for sparse vectors; the sparse back-end
//! additionally applies them directly to stored word records (see
//! `store::sparse`).

use crate::error::{WordspaceError, WordspaceResult};
use crate::vector::SparseVector;
use serde::{Deserialize, Serialize};

/// ベクトル比較に使用できる類似度尺度
///
/// Available measures for vector comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimilarityMeasure {
    /// Cosine similarity, range -1..1. Always use this measure with word
    /// spaces imported from word embedding tools.
    Cosine,
    /// The Dice-style measure from Kolb (NODALIDA '09), range 0..1. Not
    /// defined for vectors with negative components; do not use it with
    /// embedding-derived spaces.
    Kolb,
}

impl SimilarityMeasure {
    /// Parse a measure name case-insensitively. Returns `None` for unknown
    /// names.
    pub fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("cosine") {
            Some(Self::Cosine)
        } else if s.eq_ignore_ascii_case("kolb") {
            Some(Self::Kolb)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cosine => "COSINE",
            Self::Kolb => "KOLB",
        }
    }

    /// Compute the similarity between two dense vectors of equal length.
    pub fn dense(&self, v1: &[f32], v2: &[f32]) -> WordspaceResult<f64> {
        if v1.len() != v2.len() {
            return Err(WordspaceError::Shape {
                left: v1.len(),
                right: v2.len(),
            });
        }
        Ok(match self {
            Self::Cosine => {
                let mut norm1 = 0.0f32;
                let mut norm2 = 0.0f32;
                let mut num = 0.0f32;
                for (a, b) in v1.iter().zip(v2) {
                    norm1 += a * a;
                    norm2 += b * b;
                    num += a * b;
                }
                (num / (norm1 * norm2).sqrt()) as f64
            }
            Self::Kolb => {
                let mut denom = 0.0f32;
                let mut num = 0.0f32;
                for (a, b) in v1.iter().zip(v2) {
                    denom += a + b;
                    if *a > 0.0 && *b > 0.0 {
                        num += a + b;
                    }
                }
                (2.0 * num / denom) as f64
            }
        })
    }

    /// Compute the similarity between two sparse vectors. Features missing
    /// from one vector are treated as zero.
    pub fn sparse(&self, v1: &SparseVector, v2: &SparseVector) -> f64 {
        match self {
            Self::Cosine => {
                let mut norm1 = 0.0f32;
                let mut num = 0.0f32;
                for (k, a) in v1 {
                    norm1 += a * a;
                    if let Some(b) = v2.get(k) {
                        num += a * b;
                    }
                }
                let norm2: f32 = v2.values().map(|b| b * b).sum();
                (num / (norm1 * norm2).sqrt()) as f64
            }
            Self::Kolb => {
                let mut denom = 0.0f32;
                let mut num = 0.0f32;
                for (k, a) in v1 {
                    denom += a;
                    if let Some(b) = v2.get(k) {
                        num += a + b;
                    }
                }
                denom += v2.values().sum::<f32>();
                (2.0 * num / denom) as f64
            }
        }
    }
}
