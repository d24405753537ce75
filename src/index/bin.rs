//! `Bin` and `Chunk` (§3, §4.E step 1).

use crate::bgzf::VirtualPosition;
use super::reg2bin::METADATA_BIN;

/// A half-open virtual-offset span `[begin, end)` within the BGZF stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Chunk {
    begin: VirtualPosition,
    end: VirtualPosition,
}

impl Chunk {
    /// `begin <= end` holds for every genuine virtual-offset span; the
    /// metadata bin's second synthetic chunk packs `(aligned, unaligned)`
    /// counts into the same two fields and does not honor that ordering,
    /// so this constructor accepts either (§3, §4.F).
    pub fn new(begin: VirtualPosition, end: VirtualPosition) -> Self {
        Self { begin, end }
    }

    pub fn begin(&self) -> VirtualPosition {
        self.begin
    }

    pub fn end(&self) -> VirtualPosition {
        self.end
    }
}

/// One binning-index bin: a bin number and its maximally-coalesced chunk
/// list, kept sorted by `begin` (§3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bin {
    id: u32,
    chunks: Vec<Chunk>,
}

impl Bin {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            chunks: Vec::new(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn is_metadata_bin(&self) -> bool {
        self.id == METADATA_BIN
    }

    /// Append `chunk`, coalescing it into the current tail when its start
    /// falls in the same or adjacent block as the tail's end (§4.E step 1).
    /// `known_block_offsets` is the builder's record of compressed block
    /// boundaries actually observed so far, since adjacency can't be
    /// derived from the offsets alone (blocks vary in compressed size).
    pub fn add_chunk(&mut self, chunk: Chunk, known_block_offsets: &[u64]) {
        if let Some(last) = self.chunks.last_mut() {
            if last.end.is_same_or_adjacent_block(chunk.begin(), known_block_offsets) {
                if chunk.end() > last.end {
                    last.end = chunk.end();
                }
                return;
            }
        }
        self.chunks.push(chunk);
    }

    /// Build the metadata bin (37 450) from the two synthetic chunks §3
    /// requires: `(first_vo, last_vo)` and `(aligned_count,
    /// unaligned_count)` packed as virtual positions.
    pub fn metadata(first_vo: VirtualPosition, last_vo: VirtualPosition, aligned: u64, unaligned: u64) -> Self {
        Self {
            id: METADATA_BIN,
            chunks: vec![
                Chunk::new(first_vo, last_vo),
                Chunk::new(VirtualPosition::from_raw(aligned), VirtualPosition::from_raw(unaligned)),
            ],
        }
    }

    /// Rebuild a `Bin` read back from a `.bai` file: `chunks` is already
    /// sorted/coalesced, since the writer only ever wrote it that way.
    pub fn from_parts(id: u32, chunks: Vec<Chunk>) -> Self {
        Self { id, chunks }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vo(block: u64, within: u16) -> VirtualPosition {
        VirtualPosition::pack(block, within)
    }

    #[test]
    fn first_chunk_is_stored_verbatim() {
        let mut bin = Bin::new(4681);
        bin.add_chunk(Chunk::new(vo(0, 0), vo(0, 10)), &[]);
        assert_eq!(bin.chunks().len(), 1);
    }

    #[test]
    fn same_block_chunks_coalesce() {
        let mut bin = Bin::new(4681);
        bin.add_chunk(Chunk::new(vo(100, 0), vo(100, 50)), &[]);
        bin.add_chunk(Chunk::new(vo(100, 50), vo(100, 90)), &[]);
        assert_eq!(bin.chunks().len(), 1);
        assert_eq!(bin.chunks()[0].end(), vo(100, 90));
    }

    #[test]
    fn adjacent_block_chunks_coalesce() {
        let mut bin = Bin::new(4681);
        let known = [100u64, 101u64];
        bin.add_chunk(Chunk::new(vo(100, 0), vo(100, 65000)), &known);
        bin.add_chunk(Chunk::new(vo(101, 0), vo(101, 10)), &known);
        assert_eq!(bin.chunks().len(), 1);
    }

    #[test]
    fn non_adjacent_chunks_stay_distinct() {
        let mut bin = Bin::new(4681);
        bin.add_chunk(Chunk::new(vo(100, 0), vo(100, 10)), &[100, 500]);
        bin.add_chunk(Chunk::new(vo(500, 0), vo(500, 10)), &[100, 500]);
        assert_eq!(bin.chunks().len(), 2);
    }
}
