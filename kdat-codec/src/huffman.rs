//! Huffman coding over LZSS token fields.
//!
//! Three prefix codes travel with every compressed payload: one over literal
//! bytes, one over match lengths (both 8-bit symbol spaces), and one over
//! match offsets (32-bit symbol space). The encoder transmits the raw
//! frequency tables and the decoder rebuilds identical trees from them, so
//! no tie-break rule needs to survive on the wire.
//!
//! Trees are arena-allocated: nodes live in a `Vec` and reference children
//! by index. The arena is discarded with the tree after each file.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use kdat_core::bitstream::BitReader;
use kdat_core::error::{KdatError, Result};

/// Longest code length the format can represent.
const MAX_CODE_LEN: u8 = 32;

/// Non-zero entry count above which the dense 8-bit table layout is smaller.
/// Sparse costs `2 + n * 5` bytes against a flat `256 * 4`.
const SPARSE_LIMIT_8: usize = 204;

/// A Huffman code: `len` significant bits of `bits`, MSB first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Code {
    /// The code bits, right-aligned.
    pub bits: u32,
    /// Code length in bits (1..=32).
    pub len: u8,
}

/// One arena node. Leaves carry a symbol; internal nodes carry children.
#[derive(Debug, Clone, Copy)]
struct Node<S> {
    symbol: Option<S>,
    children: Option<(usize, usize)>,
}

/// An arena-allocated Huffman tree over symbols of type `S`.
///
/// Built from `(symbol, frequency)` pairs by the classic two-least-frequent
/// merge. Equal frequencies break ties by insertion order, which keeps a
/// single run deterministic; encoder and decoder both build from the same
/// transmitted table, so they always agree.
#[derive(Debug)]
pub struct HuffmanTree<S> {
    nodes: Vec<Node<S>>,
    root: usize,
}

impl<S: Copy + Ord> HuffmanTree<S> {
    /// Build a tree from non-empty `(symbol, frequency)` pairs.
    ///
    /// Returns `None` for an empty input: no symbols means no code, and the
    /// caller guarantees nothing will be encoded against it. A single-symbol
    /// input gets a synthesised second leaf (`spare`, frequency 1) so the
    /// tree has depth one; `spare` must differ from the lone symbol.
    pub fn from_frequencies(pairs: &[(S, u32)], spare: S) -> Option<Self> {
        if pairs.is_empty() {
            return None;
        }

        let mut nodes: Vec<Node<S>> = Vec::with_capacity(pairs.len() * 2);
        let mut heap: BinaryHeap<Reverse<(u64, usize)>> = BinaryHeap::with_capacity(pairs.len());

        for &(symbol, freq) in pairs {
            let idx = nodes.len();
            nodes.push(Node {
                symbol: Some(symbol),
                children: None,
            });
            heap.push(Reverse((u64::from(freq), idx)));
        }

        if nodes.len() == 1 {
            debug_assert!(spare != pairs[0].0, "spare symbol must be distinct");
            let idx = nodes.len();
            nodes.push(Node {
                symbol: Some(spare),
                children: None,
            });
            heap.push(Reverse((1, idx)));
        }

        let root = loop {
            let Reverse((left_freq, left)) = match heap.pop() {
                Some(node) => node,
                None => return None,
            };
            let Reverse((right_freq, right)) = match heap.pop() {
                Some(node) => node,
                // Last node standing is the root.
                None => break left,
            };

            let idx = nodes.len();
            nodes.push(Node {
                symbol: None,
                children: Some((left, right)),
            });
            heap.push(Reverse((left_freq + right_freq, idx)));
        };

        Some(Self { nodes, root })
    }

    /// Assign codes by walking the tree: left edge `0`, right edge `1`.
    pub fn codes(&self) -> Result<BTreeMap<S, Code>> {
        let mut codes = BTreeMap::new();
        let mut stack = vec![(self.root, 0u32, 0u8)];

        while let Some((idx, bits, len)) = stack.pop() {
            let node = &self.nodes[idx];
            if let Some((left, right)) = node.children {
                if len >= MAX_CODE_LEN {
                    return Err(KdatError::overflow("Huffman code longer than 32 bits"));
                }
                stack.push((left, bits << 1, len + 1));
                stack.push((right, (bits << 1) | 1, len + 1));
            } else if let Some(symbol) = node.symbol {
                codes.insert(symbol, Code { bits, len });
            }
        }

        Ok(codes)
    }

    /// Decode one symbol by bit-guided traversal.
    ///
    /// End-of-stream before a leaf is reached is corruption.
    pub fn decode_symbol(&self, reader: &mut BitReader<'_>) -> Result<S> {
        let mut idx = self.root;
        loop {
            let node = &self.nodes[idx];
            match node.children {
                Some((left, right)) => {
                    let bit = reader.read_bit().map_err(|_| {
                        KdatError::corrupted("bit stream ended inside a Huffman code")
                    })?;
                    idx = if bit { right } else { left };
                }
                None => {
                    return node
                        .symbol
                        .ok_or_else(|| KdatError::corrupted("Huffman walk reached an empty leaf"));
                }
            }
        }
    }
}

/// Frequency table over an 8-bit symbol space, materialised as 256 slots.
///
/// Used for both literal bytes and match lengths. The wire layout is a
/// 1-byte mode flag followed by either a sparse `(symbol, frequency)` list
/// or all 256 frequencies, whichever is smaller.
#[derive(Debug, Clone)]
pub struct ByteFreqTable {
    counts: [u32; 256],
}

impl Default for ByteFreqTable {
    fn default() -> Self {
        Self { counts: [0; 256] }
    }
}

impl ByteFreqTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one occurrence of `symbol`.
    #[inline]
    pub fn record(&mut self, symbol: u8) {
        self.counts[symbol as usize] = self.counts[symbol as usize].saturating_add(1);
    }

    /// Present `(symbol, frequency)` pairs in ascending symbol order.
    pub fn pairs(&self) -> Vec<(u8, u32)> {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, &freq)| freq > 0)
            .map(|(sym, &freq)| (sym as u8, freq))
            .collect()
    }

    /// True when no symbol is present.
    pub fn is_empty(&self) -> bool {
        self.counts.iter().all(|&freq| freq == 0)
    }

    /// Build the decoding tree, or `None` when the table is empty.
    pub fn tree(&self) -> Option<HuffmanTree<u8>> {
        let pairs = self.pairs();
        let spare = if self.counts[0] == 0 { 0 } else { 1 };
        HuffmanTree::from_frequencies(&pairs, spare)
    }

    /// Build the code book, empty when the table is empty.
    pub fn codes(&self) -> Result<BTreeMap<u8, Code>> {
        match self.tree() {
            Some(tree) => tree.codes(),
            None => Ok(BTreeMap::new()),
        }
    }

    /// Serialise the table: mode flag, then sparse or dense layout.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        let pairs = self.pairs();
        let sparse = pairs.len() <= SPARSE_LIMIT_8;
        out.push(sparse as u8);

        if sparse {
            out.extend_from_slice(&(pairs.len() as u16).to_le_bytes());
            for (symbol, freq) in pairs {
                out.push(symbol);
                out.extend_from_slice(&freq.to_le_bytes());
            }
        } else {
            for freq in self.counts {
                out.extend_from_slice(&freq.to_le_bytes());
            }
        }
    }

    /// Deserialise a table written by [`ByteFreqTable::write_to`].
    pub fn read_from(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let mut table = Self::new();
        match cursor.read_u8()? {
            1 => {
                let non_zero = cursor.read_u16_le()? as usize;
                if non_zero > 256 {
                    return Err(KdatError::corrupted(format!(
                        "frequency table claims {non_zero} distinct 8-bit symbols"
                    )));
                }
                for _ in 0..non_zero {
                    let symbol = cursor.read_u8()?;
                    let freq = cursor.read_u32_le()?;
                    table.counts[symbol as usize] = freq;
                }
            }
            0 => {
                for slot in table.counts.iter_mut() {
                    *slot = cursor.read_u32_le()?;
                }
            }
            mode => {
                return Err(KdatError::corrupted(format!(
                    "unknown frequency table mode {mode}"
                )));
            }
        }
        Ok(table)
    }
}

/// Sparse frequency table over a 32-bit symbol space, used for match
/// offsets. Entries are kept in ascending symbol order so the rebuilt tree
/// is identical on both sides.
#[derive(Debug, Clone, Default)]
pub struct OffsetFreqTable {
    counts: BTreeMap<u32, u32>,
}

impl OffsetFreqTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one occurrence of `symbol`.
    pub fn record(&mut self, symbol: u32) {
        let slot = self.counts.entry(symbol).or_insert(0);
        *slot = slot.saturating_add(1);
    }

    /// Present `(symbol, frequency)` pairs in ascending symbol order.
    pub fn pairs(&self) -> Vec<(u32, u32)> {
        self.counts
            .iter()
            .filter(|(_, &freq)| freq > 0)
            .map(|(&sym, &freq)| (sym, freq))
            .collect()
    }

    /// True when no symbol is present.
    pub fn is_empty(&self) -> bool {
        self.counts.values().all(|&freq| freq == 0)
    }

    /// Build the decoding tree, or `None` when the table is empty.
    pub fn tree(&self) -> Option<HuffmanTree<u32>> {
        let pairs = self.pairs();
        // Offsets are always >= 1, so 0 is free for the synthesised leaf.
        HuffmanTree::from_frequencies(&pairs, 0)
    }

    /// Build the code book, empty when the table is empty.
    pub fn codes(&self) -> Result<BTreeMap<u32, Code>> {
        match self.tree() {
            Some(tree) => tree.codes(),
            None => Ok(BTreeMap::new()),
        }
    }

    /// Serialise: `u32` entry count, then `(u32 symbol, u32 frequency)`
    /// pairs, all little-endian. Always sparse.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        let pairs = self.pairs();
        out.extend_from_slice(&(pairs.len() as u32).to_le_bytes());
        for (symbol, freq) in pairs {
            out.extend_from_slice(&symbol.to_le_bytes());
            out.extend_from_slice(&freq.to_le_bytes());
        }
    }

    /// Deserialise a table written by [`OffsetFreqTable::write_to`].
    pub fn read_from(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let mut table = Self::new();
        let non_zero = cursor.read_u32_le()?;
        for _ in 0..non_zero {
            let symbol = cursor.read_u32_le()?;
            let freq = cursor.read_u32_le()?;
            if freq > 0 {
                table.counts.insert(symbol, freq);
            }
        }
        Ok(table)
    }
}

/// Bounds-checked forward cursor over a payload slice.
#[derive(Debug)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    /// Create a cursor at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| KdatError::unexpected_eof(n))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Read one byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    /// Read a little-endian `u16`.
    pub fn read_u16_le(&mut self) -> Result<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Read a little-endian `u32`.
    pub fn read_u32_le(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// The unread remainder of the slice.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }
}
