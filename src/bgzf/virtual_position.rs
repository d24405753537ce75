//! 64-bit virtual file offset (§3, §6.4).

use std::fmt;

/// `(block_offset: 48 bits) << 16 | (within_block_offset: 16 bits)`.
///
/// Ordering is the natural unsigned `u64` ordering, which already matches
/// the spec's "compared as unsigned 64-bit integers" rule — no custom
/// comparator is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct VirtualPosition(u64);

impl VirtualPosition {
    pub const MIN: Self = Self(0);
    pub const MAX: Self = Self(u64::MAX);

    #[inline]
    pub fn pack(block_offset: u64, within_block_offset: u16) -> Self {
        Self((block_offset << 16) | within_block_offset as u64)
    }

    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn as_raw(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn block_offset(self) -> u64 {
        self.0 >> 16
    }

    #[inline]
    pub fn within_block_offset(self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }

    /// Two virtual offsets fall in the same BGZF block iff their top 48
    /// bits (the compressed block offset) match.
    #[inline]
    pub fn is_same_block(self, other: Self) -> bool {
        self.block_offset() == other.block_offset()
    }

    /// True iff `other` falls in the same block as `self`, or in the block
    /// immediately following it. `known_block_offsets` must be the sorted,
    /// deduplicated sequence of compressed block offsets observed so far —
    /// adjacency can't be derived from the offsets alone since blocks vary
    /// in compressed size. Used by the binning-index builder's
    /// chunk-coalescing rule (§3).
    pub fn is_same_or_adjacent_block(self, other: Self, known_block_offsets: &[u64]) -> bool {
        if self.is_same_block(other) {
            return true;
        }
        match known_block_offsets.binary_search(&self.block_offset()) {
            Ok(i) => known_block_offsets.get(i + 1) == Some(&other.block_offset()),
            Err(_) => false,
        }
    }
}

impl fmt::Display for VirtualPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.block_offset(), self.within_block_offset())
    }
}

impl From<u64> for VirtualPosition {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<VirtualPosition> for u64 {
    fn from(vo: VirtualPosition) -> Self {
        vo.0
    }
}
