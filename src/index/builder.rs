//! Binning-index builder: per-reference accumulation plus the multi-reference
//! driver that owns one active reference at a time (§4.E).

use std::collections::HashMap;

use thiserror::Error;

use crate::bgzf::VirtualPosition;

use super::bin::{Bin, Chunk};
use super::linear::LinearIndex;
use super::reference::{MetaData, ReferenceIndex};
use super::reg2bin::window_for_position;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    #[error("feature submitted for reference {actual} while reference {expected} is active")]
    WrongReference { expected: usize, actual: usize },
}

/// Accumulates bins, the linear index, and the aligned/unaligned counters
/// for a single reference sequence as features stream in (§4.E).
#[derive(Debug)]
pub struct ReferenceIndexBuilder {
    bins: HashMap<u32, Bin>,
    linear: LinearIndex,
    aligned: u64,
    unaligned: u64,
    first_vo: Option<VirtualPosition>,
    last_vo: Option<VirtualPosition>,
    known_block_offsets: Vec<u64>,
}

impl ReferenceIndexBuilder {
    pub fn new() -> Self {
        Self {
            bins: HashMap::new(),
            linear: LinearIndex::new(),
            aligned: 0,
            unaligned: 0,
            first_vo: None,
            last_vo: None,
            known_block_offsets: Vec::new(),
        }
    }

    fn note_block_offset(&mut self, vo: VirtualPosition) {
        let offset = vo.block_offset();
        if let Err(i) = self.known_block_offsets.binary_search(&offset) {
            self.known_block_offsets.insert(i, offset);
        }
    }

    /// Process one feature with a known coordinate: `start`/`end` are
    /// 0-based half-open reference coordinates (the same interval passed to
    /// `reg2bin`), `bin_id` is the caller's already-computed
    /// `indexing_bin`, and `chunk` is the feature's virtual-offset span
    /// (§4.E `process_feature` steps 1-3).
    pub fn process_feature(&mut self, start: u32, end: u32, bin_id: u32, chunk: Chunk, mapped: bool) {
        self.note_block_offset(chunk.begin());
        self.note_block_offset(chunk.end());

        let bin = self.bins.entry(bin_id).or_insert_with(|| Bin::new(bin_id));
        bin.add_chunk(chunk, &self.known_block_offsets);

        let start_window = window_for_position(start + 1);
        let end_window = window_for_position(end.max(start + 1));
        for window in start_window..=end_window {
            self.linear.set_min(window, chunk.begin());
        }

        self.first_vo = Some(self.first_vo.map_or(chunk.begin(), |f| f.min(chunk.begin())));
        self.last_vo = Some(self.last_vo.map_or(chunk.end(), |l| l.max(chunk.end())));

        if mapped {
            self.aligned += 1;
        } else {
            self.unaligned += 1;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Back-fill the linear index, synthesize the metadata bin, and return
    /// the frozen content. `None` for a reference no feature ever touched
    /// (§3 "Empty reference is represented by `nil`"; §4.E
    /// `finalize_reference`).
    pub fn finalize(mut self) -> Option<ReferenceIndex> {
        if self.bins.is_empty() {
            return None;
        }

        self.linear.back_fill();

        let first_vo = self.first_vo.unwrap_or_default();
        let last_vo = self.last_vo.unwrap_or_default();

        let mut bins: Vec<Bin> = self.bins.into_values().collect();
        bins.sort_by_key(|b| b.id());
        bins.push(Bin::metadata(first_vo, last_vo, self.aligned, self.unaligned));

        Some(ReferenceIndex {
            bins,
            linear: self.linear,
            metadata: MetaData {
                aligned: self.aligned,
                unaligned: self.unaligned,
                first_vo,
                last_vo,
            },
        })
    }
}

impl Default for ReferenceIndexBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Empty,
    Active(usize),
}

/// Top-level multi-reference driver: owns exactly one active
/// [`ReferenceIndexBuilder`] at a time plus the finalized results collected
/// so far, implementing the `{empty -> active(ref k) -> finalized(ref k)}`
/// state machine (§4.E).
#[derive(Debug)]
pub struct BinningIndexBuilder {
    state: State,
    current: ReferenceIndexBuilder,
    finalized: Vec<Option<ReferenceIndex>>,
    no_coordinate_count: u64,
}

impl BinningIndexBuilder {
    pub fn new(reference_count: usize) -> Self {
        Self {
            state: State::Empty,
            current: ReferenceIndexBuilder::new(),
            finalized: Vec::with_capacity(reference_count),
            no_coordinate_count: 0,
        }
    }

    /// Submit one aligned feature belonging to `ref_id`, implicitly
    /// starting that reference if the builder is idle. A coordinate-sorted
    /// BAM advances `ref_id` forward as references change, so a forward
    /// move (`ref_id > current`) finalizes the current reference and
    /// starts the new one (§4.E `start_new_reference`/`finalize_reference`).
    /// Only a *backwards* move is the illegal transition: a feature for a
    /// reference already finalized is a fatal [`StateError::WrongReference`].
    pub fn process_feature(
        &mut self,
        ref_id: usize,
        start: u32,
        end: u32,
        bin_id: u32,
        chunk: Chunk,
        mapped: bool,
    ) -> Result<(), StateError> {
        match self.state {
            State::Empty => self.start_reference(ref_id),
            State::Active(current) if ref_id < current => {
                return Err(StateError::WrongReference {
                    expected: current,
                    actual: ref_id,
                });
            }
            State::Active(current) if ref_id > current => {
                self.finalize_current();
                self.start_reference(ref_id);
            }
            State::Active(_) => {}
        }
        self.current.process_feature(start, end, bin_id, chunk, mapped);
        Ok(())
    }

    /// Record a feature with no reference/coordinate at all (§4.E step 4).
    /// Not associated with any reference, so it never touches `state`.
    pub fn note_no_coordinate(&mut self) {
        self.no_coordinate_count += 1;
    }

    fn start_reference(&mut self, ref_id: usize) {
        while self.finalized.len() < ref_id {
            self.finalized.push(None);
        }
        self.state = State::Active(ref_id);
    }

    /// Finalize whichever reference is currently active, if any.
    pub fn finalize_current(&mut self) {
        if let State::Active(ref_id) = self.state {
            let finished = std::mem::take(&mut self.current).finalize();
            while self.finalized.len() < ref_id {
                self.finalized.push(None);
            }
            self.finalized.push(finished);
            self.state = State::Empty;
        }
    }

    /// Finalize the active reference (if any) and return the
    /// index-ordered, `None`-padded list of per-reference content together
    /// with the total no-coordinate count (§4.G `close`).
    pub fn finish(mut self, reference_count: usize) -> (Vec<Option<ReferenceIndex>>, u64) {
        self.finalize_current();
        while self.finalized.len() < reference_count {
            self.finalized.push(None);
        }
        (self.finalized, self.no_coordinate_count)
    }
}
