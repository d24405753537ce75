//! BAI file codec: binary layout, read/write, and the region query
//! algorithm (§4.F, §6.2).

pub mod buffer;

use std::io::Write;

use thiserror::Error;

use crate::bgzf::VirtualPosition;
use crate::index::bin::{Bin, Chunk};
use crate::index::linear::LinearIndex;
use crate::index::reference::{MetaData, ReferenceIndex};
use crate::index::reg2bin::{region_to_bins, window_for_position, METADATA_BIN};

pub use buffer::ByteSource;

const MAGIC: &[u8; 4] = b"BAI\x01";

#[derive(Error, Debug)]
pub enum BaiError {
    #[error("not a BAI file (missing 'BAI\\1' magic)")]
    InvalidMagic,
    #[error("BAI file truncated")]
    Truncated,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn truncate_eof(e: std::io::Error) -> BaiError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        BaiError::Truncated
    } else {
        BaiError::Io(e)
    }
}

/// A fully parsed `.bai` file: per-reference bin/linear-index content
/// (`None` for references no feature ever touched) plus the trailing
/// no-coordinate count, absent when the file predates that field (§6.2).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Index {
    pub references: Vec<Option<ReferenceIndex>>,
    pub no_coordinate: Option<u64>,
}

impl Index {
    pub fn new(references: Vec<Option<ReferenceIndex>>, no_coordinate: Option<u64>) -> Self {
        Self { references, no_coordinate }
    }

    /// Chunks that may contain records overlapping the zero-based
    /// half-open region `[start, end)` on reference `ref_id` (§4.F query
    /// algorithm): `region_to_bins` narrows the candidate bins, the linear
    /// index's entry for `start`'s window gives a lower bound that prunes
    /// chunks known to end before any record of interest could begin, and
    /// the result is sorted and coalesced.
    ///
    /// Bins and chunks carry no per-record coordinates, so `contained`
    /// (fully-inside vs. merely-overlapping) can't be decided at this
    /// granularity — every chunk this returns is an overlap candidate.
    /// `contained` is threaded through to [`crate::reader::Reader::query`]
    /// instead, which applies it once records are actually decoded and
    /// their own start/end are known.
    pub fn query(&self, ref_id: usize, start: u32, end: u32, contained: bool) -> Vec<Chunk> {
        let _ = contained;
        let Some(Some(reference)) = self.references.get(ref_id) else {
            return Vec::new();
        };

        let candidate_bins = region_to_bins(start, end);
        let lower_bound = reference
            .linear_index()
            .entries()
            .get(window_for_position(start + 1))
            .copied()
            .unwrap_or_default();

        let mut chunks: Vec<Chunk> = reference
            .bins()
            .iter()
            .filter(|bin| !bin.is_metadata_bin() && candidate_bins.contains(&bin.id()))
            .flat_map(|bin| bin.chunks().iter().copied())
            .filter(|chunk| chunk.end() > lower_bound)
            .collect();

        chunks.sort();
        coalesce(chunks)
    }
}

/// Adjacent/overlapping chunks collapse into one, matching the bin
/// builder's own coalescing rule (§3) applied post hoc to a query result
/// gathered from multiple bins.
fn coalesce(chunks: Vec<Chunk>) -> Vec<Chunk> {
    let mut merged: Vec<Chunk> = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        if let Some(last) = merged.last_mut() {
            if chunk.begin() <= last.end() {
                if chunk.end() > last.end() {
                    *last = Chunk::new(last.begin(), chunk.end());
                }
                continue;
            }
        }
        merged.push(chunk);
    }
    merged
}

/// Write `index` in the exact `.bai` binary layout: magic, `n_ref`, then
/// per reference `{n_bin, {bin_id, n_chunk, {chunk_beg, chunk_end}}, n_intv,
/// {ioffset}}`, and finally the optional trailing `no_coordinate` count
/// (§4.F). An empty reference (`None`) writes `n_bin = 0, n_intv = 0`.
pub fn write<W: Write>(index: &Index, w: &mut W) -> Result<(), BaiError> {
    w.write_all(MAGIC)?;
    crate::binary::write_i32_le(w, index.references.len() as i32)?;

    for reference in &index.references {
        match reference {
            Some(r) => {
                crate::binary::write_i32_le(w, r.bins().len() as i32)?;
                for bin in r.bins() {
                    crate::binary::write_u32_le(w, bin.id())?;
                    crate::binary::write_i32_le(w, bin.chunks().len() as i32)?;
                    for chunk in bin.chunks() {
                        crate::binary::write_u64_le(w, chunk.begin().as_raw())?;
                        crate::binary::write_u64_le(w, chunk.end().as_raw())?;
                    }
                }
                crate::binary::write_i32_le(w, r.linear_index().len() as i32)?;
                for vo in r.linear_index().entries() {
                    crate::binary::write_u64_le(w, vo.as_raw())?;
                }
            }
            None => {
                crate::binary::write_i32_le(w, 0)?;
                crate::binary::write_i32_le(w, 0)?;
            }
        }
    }

    if let Some(no_coordinate) = index.no_coordinate {
        crate::binary::write_u64_le(w, no_coordinate)?;
    }

    Ok(())
}

/// Read a `.bai` file back from `src`. `u64` fields are read as two
/// little-endian `u32` halves rather than 8-byte values, since nothing in
/// the layout guarantees 8-byte alignment (§4.F) — the reason this
/// function takes a [`ByteSource`] rather than a generic `Read`.
pub fn read(src: &mut ByteSource) -> Result<Index, BaiError> {
    let mut magic = [0u8; 4];
    for slot in magic.iter_mut() {
        *slot = src.read_u8().map_err(truncate_eof)?;
    }
    if &magic != MAGIC {
        return Err(BaiError::InvalidMagic);
    }

    let n_ref = src.read_i32_le().map_err(truncate_eof)?.max(0) as usize;
    let mut references = Vec::with_capacity(n_ref);
    for _ in 0..n_ref {
        references.push(read_reference(src)?);
    }

    let no_coordinate = match src.read_u64_as_two_u32_le() {
        Ok(v) => Some(v),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => None,
        Err(e) => return Err(BaiError::Io(e)),
    };

    Ok(Index { references, no_coordinate })
}

fn read_reference(src: &mut ByteSource) -> Result<Option<ReferenceIndex>, BaiError> {
    let n_bin = src.read_i32_le().map_err(truncate_eof)?.max(0) as usize;
    let mut bins = Vec::with_capacity(n_bin);
    for _ in 0..n_bin {
        let bin_id = src.read_u32_le().map_err(truncate_eof)?;
        let n_chunk = src.read_i32_le().map_err(truncate_eof)?.max(0) as usize;
        let mut chunks = Vec::with_capacity(n_chunk);
        for _ in 0..n_chunk {
            let begin = VirtualPosition::from_raw(src.read_u64_as_two_u32_le().map_err(truncate_eof)?);
            let end = VirtualPosition::from_raw(src.read_u64_as_two_u32_le().map_err(truncate_eof)?);
            chunks.push(Chunk::new(begin, end));
        }
        bins.push(Bin::from_parts(bin_id, chunks));
    }

    let n_intv = src.read_i32_le().map_err(truncate_eof)?.max(0) as usize;
    let mut intervals = Vec::with_capacity(n_intv);
    for _ in 0..n_intv {
        intervals.push(VirtualPosition::from_raw(
            src.read_u64_as_two_u32_le().map_err(truncate_eof)?,
        ));
    }

    if n_bin == 0 && n_intv == 0 {
        return Ok(None);
    }

    let metadata = extract_metadata(&bins);
    Ok(Some(ReferenceIndex {
        bins,
        linear: LinearIndex::from_entries(intervals),
        metadata,
    }))
}

/// Recover the `MetaData` counters from the metadata bin's two synthetic
/// chunks (§3): `{first_vo, last_vo}` and `{aligned, unaligned}` packed as
/// virtual positions. Absent bin 37 450 (a hand-built or pre-metadata
/// index) yields all-zero metadata rather than an error.
fn extract_metadata(bins: &[Bin]) -> MetaData {
    bins.iter()
        .find(|b| b.id() == METADATA_BIN)
        .and_then(|b| match b.chunks() {
            [span, counts] => Some(MetaData {
                first_vo: span.begin(),
                last_vo: span.end(),
                aligned: counts.begin().as_raw(),
                unaligned: counts.end().as_raw(),
            }),
            _ => None,
        })
        .unwrap_or(MetaData {
            aligned: 0,
            unaligned: 0,
            first_vo: VirtualPosition::MIN,
            last_vo: VirtualPosition::MIN,
        })
}
