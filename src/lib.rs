//! # huff
//!
//! Byte-oriented Huffman compression with a self-describing tree header.
//!
//! ```rust
//! let packed = huff::compress(b"aaab")?;
//! assert_eq!(huff::decompress(&packed)?, b"aaab");
//!
//! // the reference layout: byte records, boundary marker, terminator symbol
//! let marker = huff::compress_with(b"aaab", huff::Format::Marker)?;
//! assert_eq!(huff::decompress(&marker)?, b"aaab");
//! # Ok::<(), huff::HuffError>(())
//! ```

pub mod bits;
pub mod compress;
pub mod error;
pub mod files;
pub mod format;
pub mod model;
pub mod tree;

pub use compress::{Format, StreamInfo, compress, compress_with, decompress, inspect};
pub use error::{HuffError, Result};
pub use model::{FrequencyModel, Symbol};
pub use tree::{HuffmanTree, PathTable};
