//! Per-reference linear index: one virtual offset per 16 kb window (§3, §4.E).

use crate::bgzf::VirtualPosition;

/// Dense, zero-indexed table of virtual offsets, one per 16 kb window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinearIndex(Vec<VirtualPosition>);

impl LinearIndex {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Rebuild a `LinearIndex` from entries already read back from a `.bai`
    /// file (already back-filled by whatever wrote them).
    pub fn from_entries(entries: Vec<VirtualPosition>) -> Self {
        Self(entries)
    }

    pub fn entries(&self) -> &[VirtualPosition] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Record `vo` as a candidate minimum for `window`, growing the table
    /// as needed and keeping the smaller of any existing entry (§4.E step 2:
    /// "if `linear[w] == 0 || chunk.begin < linear[w]`, set `linear[w] =
    /// chunk.begin`").
    pub fn set_min(&mut self, window: usize, vo: VirtualPosition) {
        if window >= self.0.len() {
            self.0.resize(window + 1, VirtualPosition::default());
        }
        let entry = &mut self.0[window];
        if *entry == VirtualPosition::default() || vo < *entry {
            *entry = vo;
        }
    }

    /// Back-fill zero entries (windows no record ever touched) with the
    /// nearest non-zero entry that follows them — any later chunk is a
    /// valid lower bound for a query starting in an empty window, since
    /// sorted input guarantees nothing appears before it. Index 0 is left
    /// untouched: it already means "start of file", the correct answer for
    /// a query before the first recorded offset (§3/§4.E/§8 scenario 6).
    pub fn back_fill(&mut self) {
        let mut next_seen = VirtualPosition::default();
        for entry in self.0.iter_mut().skip(1).rev() {
            if *entry == VirtualPosition::default() {
                *entry = next_seen;
            } else {
                next_seen = *entry;
            }
        }
    }
}
