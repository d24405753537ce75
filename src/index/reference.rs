//! Finalized per-reference index content (§3 `BAMIndexContent`).

use crate::bgzf::VirtualPosition;

use super::bin::Bin;
use super::linear::LinearIndex;

/// The synthetic counters and span carried by the metadata bin (37 450):
/// `{aligned, unaligned, first_vo, last_vo}` (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetaData {
    pub aligned: u64,
    pub unaligned: u64,
    pub first_vo: VirtualPosition,
    pub last_vo: VirtualPosition,
}

/// Frozen, per-reference index state produced by
/// [`crate::index::builder::ReferenceIndexBuilder::finalize`]: the bin set
/// (including the synthetic metadata bin), the linear index, and the
/// metadata counters (duplicated out of the metadata bin for convenient
/// access) (§3 `BAMIndexContent`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceIndex {
    pub bins: Vec<Bin>,
    pub linear: LinearIndex,
    pub metadata: MetaData,
}

impl ReferenceIndex {
    pub fn bins(&self) -> &[Bin] {
        &self.bins
    }

    pub fn linear_index(&self) -> &LinearIndex {
        &self.linear
    }

    pub fn metadata(&self) -> &MetaData {
        &self.metadata
    }
}
