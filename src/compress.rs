// compress.rs

use tracing::debug;

use crate::bits::{self, EndCondition};
use crate::error::{HuffError, Result};
use crate::format::{self, FrameHeader};
use crate::model::{self, FrequencyModel, TERMINATOR_CODE};
use crate::tree::HuffmanTree;

/// Wire layout of a compressed stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Length-prefixed frame with a bit count; handles any input.
    #[default]
    Framed,
    /// Byte records, boundary marker and terminator symbol. Limited to 128 distinct symbols
    /// and input without the terminator byte `0xDE`.
    Marker,
}

/// Compresses `data` into the default [`Format::Framed`] layout.
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    compress_with(data, Format::Framed)
}

pub fn compress_with(data: &[u8], format: Format) -> Result<Vec<u8>> {
    let out = match format {
        Format::Framed => compress_framed(data)?,
        Format::Marker => compress_marker(data)?,
    };
    debug!(?format, input = data.len(), output = out.len(), "compressed");
    Ok(out)
}

fn compress_framed(data: &[u8]) -> Result<Vec<u8>> {
    if data.is_empty() {
        let header = FrameHeader {
            records: Vec::new(),
            bit_len: 0,
        };
        return format::write_frame(&header, &[]);
    }

    let tree = HuffmanTree::from_model(&FrequencyModel::count(data, false))?;
    let packed = bits::pack(model::augmented(data, false), &tree.path_table())?;
    let header = FrameHeader {
        records: format::tree_records(&tree),
        bit_len: packed.bit_len,
    };
    format::write_frame(&header, &packed.bytes)
}

fn compress_marker(data: &[u8]) -> Result<Vec<u8>> {
    let terminator_byte = TERMINATOR_CODE as u8;
    if data.contains(&terminator_byte) {
        return Err(HuffError::SymbolCollision {
            byte: terminator_byte,
        });
    }

    let tree = HuffmanTree::from_model(&FrequencyModel::count(data, true))?;
    let mut out = format::serialize_marker(&tree)?;
    let packed = bits::pack(model::augmented(data, true), &tree.path_table())?;
    debug!(
        tree_bytes = out.len(),
        payload_bits = packed.bit_len,
        "packed marker stream"
    );
    out.extend_from_slice(&packed.bytes);
    Ok(out)
}

/// Restores the bytes of a stream produced by [`compress`] or [`compress_with`].
///
/// Streams starting with the frame magic are read as [`Format::Framed`], anything else as
/// [`Format::Marker`].
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let out = if format::is_frame(data) {
        let (header, payload) = format::read_frame(data)?;
        match header.tree()? {
            Some(tree) => bits::unpack(&tree, payload, EndCondition::BitCount(header.bit_len))?,
            None if header.bit_len == 0 && payload.is_empty() => Vec::new(),
            None => {
                return Err(HuffError::malformed(format!(
                    "frame has no tree but {} payload bits",
                    header.bit_len
                )));
            }
        }
    } else {
        let (tree, payload) = format::deserialize_marker(data)?;
        bits::unpack(&tree, payload, EndCondition::Terminator)?
    };
    debug!(input = data.len(), output = out.len(), "decompressed");
    Ok(out)
}

/// What a compressed stream holds, read without decoding the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    pub format: Format,
    pub nodes: usize,
    pub leaves: usize,
    pub header_bytes: usize,
    pub payload_bytes: usize,
    /// Stored payload length; only the framed layout records it.
    pub payload_bits: Option<u64>,
}

pub fn inspect(data: &[u8]) -> Result<StreamInfo> {
    if format::is_frame(data) {
        let (header, payload) = format::read_frame(data)?;
        let (nodes, leaves) = match header.tree()? {
            Some(tree) => (tree.len(), tree.leaf_count()),
            None => (0, 0),
        };
        Ok(StreamInfo {
            format: Format::Framed,
            nodes,
            leaves,
            header_bytes: data.len() - payload.len(),
            payload_bytes: payload.len(),
            payload_bits: Some(header.bit_len),
        })
    } else {
        let (tree, payload) = format::deserialize_marker(data)?;
        Ok(StreamInfo {
            format: Format::Marker,
            nodes: tree.len(),
            leaves: tree.leaf_count(),
            header_bytes: data.len() - payload.len(),
            payload_bytes: payload.len(),
            payload_bits: None,
        })
    }
}
