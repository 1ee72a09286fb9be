//! エラー型定義モジュール
//!
//! このモジュールは、単語空間クエリエンジンで使用される構造化された
//! エラー型を提供します。`thiserror`クレートを使用して、より良い
//! エラーハンドリングと実用的なエラーメッセージを実現しています。
//!
//! Structured error types for the word space query engine.
//!
//! Absent words are not errors: lookups return `Option::None` for unknown
//! words, and the two similarity queries return the `-2.0` sentinel for
//! backward compatibility with existing callers. Everything else is a
//! [`WordspaceError`].

use crate::store::WordspaceType;
use std::path::PathBuf;
use thiserror::Error;

/// 単語空間操作のメインエラー型
///
/// Main error type for word space operations.
#[derive(Error, Debug)]
pub enum WordspaceError {
    /// A neighbor-requiring operation was called on a word space that does
    /// not store pre-computed neighbors.
    #[error(
        "'{operation}' requires a word space of type SIM, but this word space is of type {actual:?}"
    )]
    WrongWordspaceType {
        operation: &'static str,
        actual: WordspaceType,
    },

    /// The config file is missing, unreadable, or contains a value that
    /// cannot be parsed.
    #[error("corrupt config file '{path}': {reason}")]
    CorruptConfig { path: PathBuf, reason: String },

    /// The inverted index is unreadable or structurally invalid.
    #[error("corrupt word space index: {reason}")]
    CorruptIndex { reason: String },

    /// Index engine failure.
    #[error("index operation failed: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    /// Dense vectors of mismatched length were passed to a pairwise
    /// operation.
    #[error("dense vectors have different lengths ({left} vs {right})")]
    Shape { left: usize, right: usize },

    /// Underlying storage failure. Fatal for the current operation, not for
    /// the handle.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A serialized dense word space could not be written or restored.
    #[error("dense word space serialization failed: {reason}")]
    Serialization { reason: String },
}

impl WordspaceError {
    /// Stable status code for programmatic error handling.
    pub fn status_code(&self) -> &'static str {
        match self {
            Self::WrongWordspaceType { .. } => "WRONG_WORDSPACE_TYPE",
            Self::CorruptConfig { .. } => "CORRUPT_CONFIG",
            Self::CorruptIndex { .. } => "CORRUPT_INDEX",
            Self::Tantivy(_) => "INDEX_ERROR",
            Self::Shape { .. } => "SHAPE_MISMATCH",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization { .. } => "SERIALIZATION_ERROR",
        }
    }
}

/// Result alias used throughout the crate.
pub type WordspaceResult<T> = Result<T, WordspaceError>;

/// Helper trait to attach context to errors from other crates.
pub trait ErrorContext<T> {
    /// Add a context message to the error.
    fn context(self, msg: &str) -> WordspaceResult<T>;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, msg: &str) -> WordspaceResult<T> {
        self.map_err(|e| WordspaceError::CorruptIndex {
            reason: format!("{msg}: {e}"),
        })
    }
}
