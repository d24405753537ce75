//! Reader + iterators (§9): parses the BAM magic header block and drives
//! the BGZF cursor for file-order, query, and unmapped-tail traversal,
//! generalizing the teacher's `archive::Archive` read-mode half over its
//! `io_stream::SixCyReader` single-forward-cursor pattern (both dropped
//! from this crate — see `DESIGN.md`).

use std::io::{Read, Seek};

use crate::bai::Index;
use crate::bgzf::{self, VirtualPosition};
use crate::error::{Error, Result};
use crate::header::SamHeader;
use crate::index::bin::Chunk;
use crate::record::codec;
use crate::record::Record;

pub struct Reader<R> {
    inner: bgzf::Reader<R>,
    header: SamHeader,
}

impl<R: Read + Seek> Reader<R> {
    /// Open a BAM stream: validate the `BAM\1` magic and parse the header
    /// block (§6.1, §6.6).
    pub fn new(inner: R) -> Result<Self> {
        let mut bgzf_reader = bgzf::Reader::new(inner);

        let mut magic = [0u8; 4];
        bgzf_reader.read_exact(&mut magic).map_err(Error::Bgzf)?;
        if &magic != b"BAM\x01" {
            return Err(Error::Bgzf(bgzf::BgzfError::InvalidHeader));
        }
        let header = SamHeader::read(&mut bgzf_reader)?;

        Ok(Self { inner: bgzf_reader, header })
    }

    pub fn header(&self) -> &SamHeader {
        &self.header
    }

    /// Lazy, finite, non-restartable file-order record iterator (§9).
    pub fn records(&mut self) -> RecordsIter<'_, R> {
        RecordsIter { reader: self, remaining_chunks: None }
    }

    /// Seek to `vo` and iterate file-order records from there (§9; used by
    /// [`Reader::query`] and [`Reader::unmapped`]).
    pub fn records_from(&mut self, vo: VirtualPosition) -> Result<RecordsIter<'_, R>> {
        self.inner.seek(vo).map_err(Error::Bgzf)?;
        Ok(RecordsIter { reader: self, remaining_chunks: None })
    }

    /// Drive a cursor over the BAI's coalesced chunk list for a region
    /// query, yielding only records that overlap `[start, end)` on
    /// `ref_id` (§9, §4.F). `contained` additionally requires the record
    /// to fall fully inside the region rather than merely overlap it — a
    /// per-record check the chunk/bin machinery can't make on its own.
    pub fn query(&mut self, bai: &Index, ref_id: usize, start: u32, end: u32, contained: bool) -> Result<QueryIter<'_, R>> {
        let chunks = bai.query(ref_id, start, end, contained);
        Ok(QueryIter {
            reader: self,
            chunks: chunks.into_iter(),
            current_end: None,
            ref_id,
            start,
            end,
            contained,
        })
    }

    /// Iterate the records the BAI recorded as having no coordinate,
    /// seeking to the metadata bin's stored span start (§4.F metadata
    /// bin, §9).
    pub fn unmapped(&mut self, bai: &Index) -> Result<RecordsIter<'_, R>> {
        let vo = bai
            .references
            .iter()
            .flatten()
            .map(|r| r.metadata().last_vo)
            .max()
            .unwrap_or_default();
        self.records_from(vo)
    }

    /// A clean end of stream and a truncated one both surface as
    /// `RecordCodecError::ShortRead`; this reader treats either as "no more
    /// records" rather than distinguishing them, matching how the BGZF EOF
    /// marker already signals a clean stop one layer down.
    fn next_record(&mut self) -> Result<Option<Record>> {
        match codec::decode(&mut self.inner) {
            Ok(rec) => Ok(Some(rec)),
            Err(codec::RecordCodecError::ShortRead) => Ok(None),
            Err(e) => Err(Error::RecordAtOffset {
                offset: self.inner.virtual_position().as_raw(),
                source: e,
            }),
        }
    }
}

/// Non-restartable file-order iterator over one [`Reader`] (§9).
pub struct RecordsIter<'a, R> {
    reader: &'a mut Reader<R>,
    remaining_chunks: Option<std::vec::IntoIter<Chunk>>,
}

impl<'a, R: Read + Seek> Iterator for RecordsIter<'a, R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.next_record().transpose()
    }
}

/// Iterator driving a BGZF cursor over a BAI-derived chunk list, advancing
/// to the next chunk when the current one is exhausted and filtering by
/// genomic overlap/containment once each record is decoded (§9, §4.F).
pub struct QueryIter<'a, R> {
    reader: &'a mut Reader<R>,
    chunks: std::vec::IntoIter<Chunk>,
    current_end: Option<VirtualPosition>,
    ref_id: usize,
    start: u32,
    end: u32,
    contained: bool,
}

impl<'a, R: Read + Seek> QueryIter<'a, R> {
    fn advance_chunk(&mut self) -> Result<bool> {
        match self.chunks.next() {
            Some(chunk) => {
                self.reader.inner.seek(chunk.begin()).map_err(Error::Bgzf)?;
                self.current_end = Some(chunk.end());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn matches(&self, rec: &Record) -> bool {
        if rec.reference_sequence_id != Some(self.ref_id) {
            return false;
        }
        let Some(start) = rec.alignment_start else { return false };
        let rec_start0 = start - 1;
        let rec_end0 = rec.alignment_end().unwrap_or(start);
        if self.contained {
            rec_start0 >= self.start && rec_end0 <= self.end
        } else {
            rec_start0 < self.end && rec_end0 > self.start
        }
    }
}

impl<'a, R: Read + Seek> Iterator for QueryIter<'a, R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current_end.is_none() {
                match self.advance_chunk() {
                    Ok(true) => {}
                    Ok(false) => return None,
                    Err(e) => return Some(Err(e)),
                }
            }

            if self.reader.inner.virtual_position() >= self.current_end.unwrap() {
                self.current_end = None;
                continue;
            }

            match self.reader.next_record() {
                Ok(Some(rec)) => {
                    if self.matches(&rec) {
                        return Some(Ok(rec));
                    }
                    continue;
                }
                Ok(None) => {
                    self.current_end = None;
                    continue;
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
