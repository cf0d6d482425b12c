//! Bit packing of symbol paths and the tree walk that reverses it.

use std::io::{self, Cursor};

use bitstream_io::{BigEndian, BitRead, BitReader, BitWrite, BitWriter};

use crate::error::{HuffError, Result};
use crate::model::Symbol;
use crate::tree::{HuffmanTree, NodeIndex, NodeKind, PathTable};

/// Bits produced by [`pack`]: MSB-first, low bits of the last byte zeroed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packed {
    pub bytes: Vec<u8>,
    pub bit_len: u64,
}

/// Appends the path of every symbol, in order, to a fresh byte buffer.
pub fn pack<I>(symbols: I, table: &PathTable) -> Result<Packed>
where
    I: IntoIterator<Item = Symbol>,
{
    let mut bytes = Vec::new();
    let mut bit_len = 0u64;
    {
        let mut writer = BitWriter::endian(&mut bytes, BigEndian);
        for symbol in symbols {
            let path = table.get(symbol).ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("symbol {symbol} has no path in the table"),
                )
            })?;
            for &bit in path {
                writer.write_bit(bit)?;
            }
            bit_len += path.len() as u64;
        }
        writer.byte_align()?;
    }
    Ok(Packed { bytes, bit_len })
}

/// When decoding stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndCondition {
    /// At the terminator leaf; everything after it is padding.
    Terminator,
    /// After exactly this many payload bits, which must end on a symbol boundary.
    BitCount(u64),
}

enum State {
    /// Cursor has not reached a leaf yet; the next bit moves it.
    Descending(NodeIndex),
    /// Cursor sits on a leaf whose path bits have all been consumed.
    AtLeaf(NodeIndex),
}

/// Walks `tree` along the bits of `payload`, emitting one byte per leaf reached.
///
/// Reaching a byte leaf sends the cursor back to the root without consuming a bit. A tree whose
/// root is itself a leaf spends one bit per symbol, matching the one-bit path it was encoded with.
pub fn unpack(tree: &HuffmanTree, payload: &[u8], end: EndCondition) -> Result<Vec<u8>> {
    let mut reader = BitReader::endian(Cursor::new(payload), BigEndian);
    let root = tree.root();
    let capacity = match end {
        EndCondition::BitCount(n) => n.min(payload.len() as u64 * 8) as usize,
        EndCondition::Terminator => payload.len() * 2,
    };
    let mut out = Vec::with_capacity(capacity);
    let mut bits_read = 0u64;
    let mut state = State::Descending(root);

    loop {
        state = match state {
            State::Descending(cursor) => {
                if let EndCondition::BitCount(limit) = end {
                    if bits_read == limit {
                        if cursor == root {
                            break;
                        }
                        return Err(HuffError::Truncated { bits_read });
                    }
                }
                let bit = match reader.read_bit() {
                    Ok(bit) => bit,
                    Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                        return Err(HuffError::Truncated { bits_read });
                    }
                    Err(e) => return Err(e.into()),
                };
                bits_read += 1;
                let next = match tree.node(cursor).kind {
                    NodeKind::Internal { left, right } => {
                        if bit {
                            right
                        } else {
                            left
                        }
                    }
                    NodeKind::Leaf(_) => cursor,
                };
                if tree.node(next).is_leaf() {
                    State::AtLeaf(next)
                } else {
                    State::Descending(next)
                }
            }
            State::AtLeaf(leaf) => match tree.node(leaf).symbol() {
                Some(Symbol::Byte(b)) => {
                    out.push(b);
                    State::Descending(root)
                }
                Some(Symbol::Terminator) if end == EndCondition::Terminator => break,
                _ => {
                    return Err(HuffError::malformed(format!(
                        "leaf {} carries no decodable symbol",
                        tree.node(leaf).id
                    )));
                }
            },
        };
    }

    Ok(out)
}
