//! Wire layouts for the serialized tree.
//!
//! Marker layout: `[N x (id, symbol, left, right) bytes][1,1,1,1,0,0,0,0][payload]`.
//!
//! Frame layout: `["HUF2"][u32 LE header length][bincode FrameHeader][payload]`. The header
//! carries full-width records and the payload length in bits, so it needs neither a boundary
//! marker nor a terminator symbol.

use std::collections::HashMap;
use std::io::Write;

use bincode::Options;
use serde::{Deserialize, Serialize};

use crate::error::{HuffError, Result};
use crate::model::{Symbol, TERMINATOR_CODE};
use crate::tree::{HuffmanTree, Node, NodeIndex, NodeKind};

/// Separates the marker layout's records from its payload.
pub const BOUNDARY_MARKER: [u8; 8] = [1, 1, 1, 1, 0, 0, 0, 0];

/// Bytes per record in the marker layout.
pub const RECORD_LEN: usize = 4;

/// Largest node id a one-byte field can hold.
pub const MAX_MARKER_NODES: usize = u8::MAX as usize;

pub const FRAME_MAGIC: [u8; 4] = *b"HUF2";

const MAX_HEADER_LEN: u64 = 1 << 20;

/// One node as stored on the wire. Child ids are 0 when absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeRecord {
    pub id: u32,
    pub symbol: u32,
    pub left: u32,
    pub right: u32,
}

/// Records for every node: left subtree, the node itself, then the right subtree.
pub fn tree_records(tree: &HuffmanTree) -> Vec<TreeRecord> {
    let mut records = Vec::with_capacity(tree.len());
    push_records(tree, tree.root(), &mut records);
    records
}

fn push_records(tree: &HuffmanTree, index: NodeIndex, records: &mut Vec<TreeRecord>) {
    let node = tree.node(index);
    match node.kind {
        NodeKind::Leaf(symbol) => records.push(TreeRecord {
            id: node.id,
            symbol: symbol.code_point(),
            left: 0,
            right: 0,
        }),
        NodeKind::Internal { left, right } => {
            push_records(tree, left, records);
            records.push(TreeRecord {
                id: node.id,
                symbol: 0,
                left: tree.node(left).id,
                right: tree.node(right).id,
            });
            push_records(tree, right, records);
        }
    }
}

/// Rebuilds a tree from records in any order, linking children by id.
///
/// `leaf_symbol` turns a leaf's stored symbol field back into a [`Symbol`].
pub fn tree_from_records<F>(records: &[TreeRecord], leaf_symbol: F) -> Result<HuffmanTree>
where
    F: Fn(u32) -> Result<Symbol>,
{
    if records.is_empty() {
        return Err(HuffError::malformed("no tree records"));
    }

    let mut by_id: HashMap<u32, NodeIndex> = HashMap::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        if record.id == 0 {
            return Err(HuffError::malformed("record with node id 0"));
        }
        if by_id.insert(record.id, index).is_some() {
            return Err(HuffError::malformed(format!("duplicate node id {}", record.id)));
        }
    }

    let lookup = |id: u32| {
        by_id
            .get(&id)
            .copied()
            .ok_or_else(|| HuffError::malformed(format!("child id {id} names no node")))
    };

    let mut referenced = vec![false; records.len()];
    let mut nodes = Vec::with_capacity(records.len());
    for record in records {
        let kind = match (record.left, record.right) {
            (0, 0) => NodeKind::Leaf(leaf_symbol(record.symbol)?),
            (0, _) | (_, 0) => {
                return Err(HuffError::malformed(format!(
                    "node {} has a single child",
                    record.id
                )));
            }
            (left, right) => {
                let (left, right) = (lookup(left)?, lookup(right)?);
                for child in [left, right] {
                    if std::mem::replace(&mut referenced[child], true) {
                        return Err(HuffError::malformed(format!(
                            "node {} has more than one parent",
                            records[child].id
                        )));
                    }
                }
                NodeKind::Internal { left, right }
            }
        };
        nodes.push(Node {
            id: record.id,
            weight: 0,
            kind,
        });
    }

    let mut roots = referenced.iter().enumerate().filter(|(_, r)| !**r);
    let root = match (roots.next(), roots.next()) {
        (Some((index, _)), None) => index,
        (None, _) => return Err(HuffError::malformed("every node is some node's child")),
        (Some(_), Some(_)) => return Err(HuffError::malformed("more than one root")),
    };

    let mut seen = 0;
    let mut stack = vec![root];
    while let Some(index) = stack.pop() {
        seen += 1;
        if let NodeKind::Internal { left, right } = nodes[index].kind {
            stack.push(left);
            stack.push(right);
        }
    }
    if seen != nodes.len() {
        return Err(HuffError::malformed("records contain a detached cycle"));
    }

    Ok(HuffmanTree::from_parts(nodes, root))
}

/// Writes `tree` as one-byte records followed by the boundary marker.
///
/// The output is always `4 * nodes + 8` bytes.
pub fn serialize_marker(tree: &HuffmanTree) -> Result<Vec<u8>> {
    if tree.len() > MAX_MARKER_NODES {
        return Err(HuffError::TooManyNodes {
            nodes: tree.len(),
            max: MAX_MARKER_NODES,
        });
    }
    let mut out = Vec::with_capacity(tree.len() * RECORD_LEN + BOUNDARY_MARKER.len());
    for record in tree_records(tree) {
        let symbol = u8::try_from(record.symbol).map_err(|_| {
            HuffError::malformed(format!("symbol {:#x} does not fit a byte", record.symbol))
        })?;
        // ids are bounded by the node count checked above
        out.extend_from_slice(&[
            record.id as u8,
            symbol,
            record.left as u8,
            record.right as u8,
        ]);
    }
    out.extend_from_slice(&BOUNDARY_MARKER);
    Ok(out)
}

/// Offset of the first byte of the boundary marker.
///
/// Only offsets on the record stride are candidates. No genuine record has id 0, so an aligned
/// match can never be two records, which makes the first aligned match the real boundary even
/// when the payload after it contains the pattern.
pub fn find_boundary(stream: &[u8]) -> Result<usize> {
    stream
        .windows(BOUNDARY_MARKER.len())
        .step_by(RECORD_LEN)
        .position(|window| window == BOUNDARY_MARKER)
        .map(|record| record * RECORD_LEN)
        .ok_or(HuffError::MissingBoundary { len: stream.len() })
}

/// Splits a marker-layout stream into its tree and payload.
pub fn deserialize_marker(stream: &[u8]) -> Result<(HuffmanTree, &[u8])> {
    let boundary = find_boundary(stream)?;
    let records: Vec<TreeRecord> = stream[..boundary]
        .chunks_exact(RECORD_LEN)
        .map(|r| TreeRecord {
            id: u32::from(r[0]),
            symbol: u32::from(r[1]),
            left: u32::from(r[2]),
            right: u32::from(r[3]),
        })
        .collect();
    let tree = tree_from_records(&records, |code| {
        Ok(match code {
            TERMINATOR_CODE => Symbol::Terminator,
            // records only hold one byte here
            byte => Symbol::Byte(byte as u8),
        })
    })?;
    Ok((tree, &stream[boundary + BOUNDARY_MARKER.len()..]))
}

/// Everything the frame layout stores ahead of the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameHeader {
    pub records: Vec<TreeRecord>,
    pub bit_len: u64,
}

impl FrameHeader {
    /// Rebuilds the tree, or `None` for the empty frame.
    pub fn tree(&self) -> Result<Option<HuffmanTree>> {
        if self.records.is_empty() {
            return Ok(None);
        }
        tree_from_records(&self.records, |code| {
            u8::try_from(code)
                .map(Symbol::Byte)
                .map_err(|_| HuffError::malformed(format!("leaf symbol {code:#x} is not a byte")))
        })
        .map(Some)
    }
}

fn header_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(MAX_HEADER_LEN)
}

pub fn is_frame(stream: &[u8]) -> bool {
    stream.starts_with(&FRAME_MAGIC)
}

pub fn write_frame(header: &FrameHeader, payload: &[u8]) -> Result<Vec<u8>> {
    let encoded = header_options().serialize(header)?;
    let mut out = Vec::with_capacity(FRAME_MAGIC.len() + 4 + encoded.len() + payload.len());
    out.write_all(&FRAME_MAGIC)?;
    out.write_all(&(encoded.len() as u32).to_le_bytes())?;
    out.write_all(&encoded)?;
    out.write_all(payload)?;
    Ok(out)
}

pub fn read_frame(stream: &[u8]) -> Result<(FrameHeader, &[u8])> {
    let rest = stream
        .strip_prefix(&FRAME_MAGIC)
        .ok_or_else(|| HuffError::malformed("missing frame magic"))?;
    let (len_bytes, rest) = rest
        .split_first_chunk::<4>()
        .ok_or_else(|| HuffError::malformed("frame header length cut short"))?;
    let header_len = u32::from_le_bytes(*len_bytes) as usize;
    if header_len > rest.len() {
        return Err(HuffError::malformed(format!(
            "frame header claims {header_len} bytes, {} available",
            rest.len()
        )));
    }
    let (encoded, payload) = rest.split_at(header_len);
    let header: FrameHeader = header_options().deserialize(encoded)?;
    Ok((header, payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FrequencyModel;

    fn tree_for(data: &[u8], terminator: bool) -> HuffmanTree {
        HuffmanTree::from_model(&FrequencyModel::count(data, terminator)).unwrap()
    }

    fn marker_leaf(code: u32) -> Result<Symbol> {
        Ok(match code {
            TERMINATOR_CODE => Symbol::Terminator,
            byte => Symbol::Byte(byte as u8),
        })
    }

    #[test]
    fn aaab_marker_bytes() {
        // in-order: b(2) node4 end(3) node5 a(1)
        let bytes = serialize_marker(&tree_for(b"aaab", true)).unwrap();
        assert_eq!(
            bytes,
            vec![
                2, b'b', 0, 0, //
                4, 0, 2, 3, //
                3, 0xDE, 0, 0, //
                5, 0, 4, 1, //
                1, b'a', 0, 0, //
                1, 1, 1, 1, 0, 0, 0, 0,
            ]
        );
    }

    #[test]
    fn marker_length_is_four_per_node_plus_eight() {
        let tree = tree_for(b"a longer sentence with spaces", true);
        let bytes = serialize_marker(&tree).unwrap();
        assert_eq!(bytes.len(), tree.len() * RECORD_LEN + BOUNDARY_MARKER.len());
        assert_eq!(find_boundary(&bytes).unwrap(), tree.len() * RECORD_LEN);
    }

    #[test]
    fn marker_round_trip_keeps_shape() {
        let tree = tree_for(b"abracadabra", true);
        let bytes = serialize_marker(&tree).unwrap();
        let (rebuilt, payload) = deserialize_marker(&bytes).unwrap();
        assert!(payload.is_empty());
        assert_eq!(rebuilt.node(rebuilt.root()).id, tree.node(tree.root()).id);
        assert_eq!(rebuilt.path_table(), tree.path_table());
    }

    #[test]
    fn too_many_nodes_for_byte_ids() {
        let data: Vec<u8> = (0u8..=200).collect();
        let err = serialize_marker(&tree_for(&data, true)).unwrap_err();
        assert!(matches!(err, HuffError::TooManyNodes { nodes: 403, max: 255 }));
    }

    #[test]
    fn boundary_ignores_pattern_in_payload() {
        let mut stream = serialize_marker(&tree_for(b"xyz", true)).unwrap();
        let boundary = stream.len() - BOUNDARY_MARKER.len();
        stream.extend_from_slice(&BOUNDARY_MARKER);
        stream.extend_from_slice(&BOUNDARY_MARKER);
        assert_eq!(find_boundary(&stream).unwrap(), boundary);
    }

    #[test]
    fn boundary_skips_unaligned_pattern() {
        // the pattern starts at offset 2, inside the first record
        let stream = [
            7, 9, 1, 1, //
            1, 1, 0, 0, //
            0, 0, 5, 5, //
            1, 1, 1, 1, 0, 0, 0, 0,
        ];
        assert_eq!(find_boundary(&stream).unwrap(), 12);
    }

    #[test]
    fn missing_boundary() {
        let err = find_boundary(&[1, 1, 1, 1, 0, 0, 0]).unwrap_err();
        assert!(matches!(err, HuffError::MissingBoundary { len: 7 }));
        let err = deserialize_marker(&[0, 1, 1, 1, 1, 0, 0, 0, 0]).unwrap_err();
        assert!(matches!(err, HuffError::MissingBoundary { .. }));
    }

    #[test]
    fn records_in_any_order_rebuild_the_same_tree() {
        let tree = tree_for(b"hello", false);
        let mut records = tree_records(&tree);
        records.reverse();
        let rebuilt = tree_from_records(&records, marker_leaf).unwrap();
        assert_eq!(rebuilt.path_table(), tree.path_table());
    }

    #[test]
    fn root_is_the_unreferenced_node() {
        let records = [
            TreeRecord { id: 3, symbol: 0, left: 1, right: 2 },
            TreeRecord { id: 1, symbol: u32::from(b'p'), left: 0, right: 0 },
            TreeRecord { id: 2, symbol: u32::from(b'q'), left: 0, right: 0 },
        ];
        let tree = tree_from_records(&records, marker_leaf).unwrap();
        assert_eq!(tree.root(), 0);
        assert_eq!(tree.node(tree.root()).id, 3);
    }

    #[test]
    fn inconsistent_records_are_rejected() {
        let leaf = |id| TreeRecord { id, symbol: 1, left: 0, right: 0 };
        let cases: Vec<Vec<TreeRecord>> = vec![
            vec![],
            vec![leaf(0)],
            vec![leaf(1), leaf(1)],
            vec![TreeRecord { id: 2, symbol: 0, left: 1, right: 9 }, leaf(1)],
            vec![TreeRecord { id: 2, symbol: 0, left: 1, right: 0 }, leaf(1)],
            vec![leaf(1), leaf(2)],
            vec![
                TreeRecord { id: 3, symbol: 0, left: 1, right: 1 },
                leaf(1),
            ],
            vec![
                TreeRecord { id: 3, symbol: 0, left: 1, right: 2 },
                leaf(1),
                leaf(2),
                TreeRecord { id: 4, symbol: 0, left: 5, right: 6 },
                TreeRecord { id: 5, symbol: 0, left: 4, right: 7 },
                leaf(6),
                leaf(7),
            ],
        ];
        for records in cases {
            let err = tree_from_records(&records, marker_leaf).unwrap_err();
            assert!(matches!(err, HuffError::MalformedTree { .. }), "{records:?}");
        }
    }

    #[test]
    fn frame_round_trip() {
        let tree = tree_for(b"frame me", false);
        let header = FrameHeader {
            records: tree_records(&tree),
            bit_len: 21,
        };
        let stream = write_frame(&header, &[0xAA, 0xBB, 0xC0]).unwrap();
        assert!(is_frame(&stream));
        let (read, payload) = read_frame(&stream).unwrap();
        assert_eq!(read, header);
        assert_eq!(payload, &[0xAA, 0xBB, 0xC0]);
        let rebuilt = read.tree().unwrap().unwrap();
        assert_eq!(rebuilt.path_table(), tree.path_table());
    }

    #[test]
    fn frame_keeps_wide_symbols_out() {
        let header = FrameHeader {
            records: vec![TreeRecord { id: 1, symbol: 0x3A9, left: 0, right: 0 }],
            bit_len: 1,
        };
        let err = header.tree().unwrap_err();
        assert!(matches!(err, HuffError::MalformedTree { .. }));
    }

    #[test]
    fn frame_header_length_is_checked() {
        let mut stream = FRAME_MAGIC.to_vec();
        stream.extend_from_slice(&100u32.to_le_bytes());
        stream.extend_from_slice(&[0; 10]);
        assert!(matches!(
            read_frame(&stream).unwrap_err(),
            HuffError::MalformedTree { .. }
        ));
        assert!(matches!(
            read_frame(b"HUF2\x01").unwrap_err(),
            HuffError::MalformedTree { .. }
        ));
        assert!(matches!(
            read_frame(b"nope").unwrap_err(),
            HuffError::MalformedTree { .. }
        ));
    }

    #[test]
    fn garbage_header_is_a_header_error() {
        let mut stream = FRAME_MAGIC.to_vec();
        stream.extend_from_slice(&3u32.to_le_bytes());
        stream.extend_from_slice(&[1, 2, 3]);
        assert!(matches!(read_frame(&stream).unwrap_err(), HuffError::Header(_)));
    }
}
