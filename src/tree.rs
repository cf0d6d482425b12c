use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use tracing::debug;

use crate::error::{HuffError, Result};
use crate::model::{FrequencyModel, Symbol};

/// Position of a node inside a [`HuffmanTree`]'s arena.
pub type NodeIndex = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Leaf(Symbol),
    Internal { left: NodeIndex, right: NodeIndex },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Unique, non-zero, assigned in creation order.
    pub id: u32,
    /// Sum of the leaf weights below. Zero for trees rebuilt from records.
    pub weight: u64,
    pub kind: NodeKind,
}

impl Node {
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    pub fn symbol(&self) -> Option<Symbol> {
        match self.kind {
            NodeKind::Leaf(symbol) => Some(symbol),
            NodeKind::Internal { .. } => None,
        }
    }
}

/// A forest member waiting to be merged.
///
/// Ordered so that `BinaryHeap` pops the lightest node first, with ties going to the
/// node created earliest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ForestEntry {
    weight: u64,
    id: u32,
    index: NodeIndex,
}

impl Ord for ForestEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .weight
            .cmp(&self.weight)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for ForestEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A full binary tree stored as an arena; children refer to arena positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanTree {
    nodes: Vec<Node>,
    root: NodeIndex,
}

impl HuffmanTree {
    /// Builds the tree for `model`: one leaf per symbol, then the two lightest forest members
    /// are merged (first popped on the left) until only the root is left.
    pub fn from_model(model: &FrequencyModel) -> Result<Self> {
        if model.is_empty() {
            return Err(HuffError::EmptyAlphabet);
        }

        let mut nodes: Vec<Node> = Vec::with_capacity(model.len() * 2 - 1);
        let mut forest = BinaryHeap::with_capacity(model.len());
        for &(symbol, weight) in model.entries() {
            let entry = ForestEntry {
                weight,
                id: next_id(&nodes),
                index: nodes.len(),
            };
            nodes.push(Node {
                id: entry.id,
                weight,
                kind: NodeKind::Leaf(symbol),
            });
            forest.push(entry);
        }

        while forest.len() > 1 {
            let (Some(left), Some(right)) = (forest.pop(), forest.pop()) else {
                unreachable!("forest holds at least two nodes");
            };
            let merged = ForestEntry {
                weight: left.weight + right.weight,
                id: next_id(&nodes),
                index: nodes.len(),
            };
            nodes.push(Node {
                id: merged.id,
                weight: merged.weight,
                kind: NodeKind::Internal {
                    left: left.index,
                    right: right.index,
                },
            });
            forest.push(merged);
        }

        let root = forest.pop().ok_or(HuffError::EmptyAlphabet)?.index;
        debug!(leaves = model.len(), nodes = nodes.len(), "built huffman tree");
        Ok(HuffmanTree { nodes, root })
    }

    /// Assembles a tree from parts already checked by the deserializer.
    pub(crate) fn from_parts(nodes: Vec<Node>, root: NodeIndex) -> Self {
        HuffmanTree { nodes, root }
    }

    pub fn root(&self) -> NodeIndex {
        self.root
    }

    pub fn node(&self, index: NodeIndex) -> &Node {
        &self.nodes[index]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Root-to-leaf path of every symbol.
    pub fn path_table(&self) -> PathTable {
        let mut paths = HashMap::new();
        if let NodeKind::Leaf(symbol) = self.nodes[self.root].kind {
            // A lone leaf still needs a bit to be addressable.
            paths.insert(symbol, vec![false]);
        } else {
            self.collect_paths(self.root, &mut Vec::new(), &mut paths);
        }
        PathTable { paths }
    }

    fn collect_paths(
        &self,
        index: NodeIndex,
        prefix: &mut Vec<bool>,
        paths: &mut HashMap<Symbol, Vec<bool>>,
    ) {
        match self.nodes[index].kind {
            NodeKind::Leaf(symbol) => {
                paths.insert(symbol, prefix.clone());
            }
            NodeKind::Internal { left, right } => {
                prefix.push(false);
                self.collect_paths(left, prefix, paths);
                prefix.pop();
                prefix.push(true);
                self.collect_paths(right, prefix, paths);
                prefix.pop();
            }
        }
    }
}

fn next_id(nodes: &[Node]) -> u32 {
    nodes.len() as u32 + 1
}

/// Symbol to bit path, `false` for left and `true` for right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTable {
    paths: HashMap<Symbol, Vec<bool>>,
}

impl PathTable {
    pub fn get(&self, symbol: Symbol) -> Option<&[bool]> {
        self.paths.get(&symbol).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Symbol, &[bool])> {
        self.paths.iter().map(|(&s, p)| (s, p.as_slice()))
    }
}
