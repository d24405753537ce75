//! Hierarchical binning index (§3, §4.E) — the UCSC/BAM 6-level scheme (37 450
//! bins, one 16 kb-window linear index per reference) shared by the writer's
//! incremental builder and the `.bai` file codec in [`crate::bai`].

pub mod bin;
pub mod builder;
pub mod linear;
pub mod reference;
pub mod reg2bin;

pub use bin::{Bin, Chunk};
pub use builder::{BinningIndexBuilder, ReferenceIndexBuilder, StateError};
pub use linear::LinearIndex;
pub use reference::{MetaData, ReferenceIndex};
pub use reg2bin::{
    first_locus_in_bin, last_locus_in_bin, level_for_bin, level_size, reg2bin, region_to_bins,
    window_for_position, METADATA_BIN, UNMAPPED_BIN,
};
