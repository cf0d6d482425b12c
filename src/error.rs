//! Error types for the codec.
//!
//! Every failure the codec can report is a deterministic property of its input, so callers get
//! a distinct variant per cause and nothing is ever retried.

use thiserror::Error;

/// Result alias used throughout the codec.
pub type Result<T> = std::result::Result<T, HuffError>;

#[derive(Error, Debug)]
pub enum HuffError {
    /// There were no symbols to build a tree from.
    #[error("cannot build a Huffman tree from an empty alphabet")]
    EmptyAlphabet,

    /// The end-of-tree boundary marker never appears at a record boundary.
    #[error("boundary marker not found in {len}-byte stream")]
    MissingBoundary { len: usize },

    /// Tree records or the frame header are inconsistent.
    #[error("malformed tree: {reason}")]
    MalformedTree { reason: String },

    /// The payload ran out before decoding reached its end condition.
    #[error("compressed payload truncated after {bits_read} bits")]
    Truncated { bits_read: u64 },

    /// The input contains the byte that the marker format reserves for its terminator.
    #[error("input byte {byte:#04x} collides with the marker format's terminator")]
    SymbolCollision { byte: u8 },

    /// The tree needs more node ids than a single-byte record field can carry.
    #[error("tree has {nodes} nodes, marker format allows at most {max}")]
    TooManyNodes { nodes: usize, max: usize },

    #[error("frame header: {0}")]
    Header(#[from] bincode::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HuffError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        HuffError::MalformedTree {
            reason: reason.into(),
        }
    }
}
