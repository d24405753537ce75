//! Writer orchestration (§4.G): wires the BGZF layer, the record codec, and
//! the binning-index builder behind one facade, generalizing the teacher's
//! `archive::Archive` write-mode half over its `io_stream::SixCyWriter`
//! (both modules dropped from this crate — see `DESIGN.md` — but their
//! single-facade-over-reader/writer shape is what this module keeps).

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use digest::Digest;
use flate2::Compression;
use md5::Md5;

use crate::bai::{self, Index};
use crate::bgzf;
use crate::config::WriterConfig;
use crate::error::{Error, Result};
use crate::header::SamHeader;
use crate::index::bin::Chunk;
use crate::index::builder::BinningIndexBuilder;
use crate::record::codec;
use crate::record::Record;

/// Tees every byte written through it into an MD5 hasher when
/// `create_md5` is set (§6.5), so the sidecar digest covers the exact
/// bytes landing in the BAM file — including the BGZF framing — without
/// a second read-back pass.
struct HashingSink<W> {
    inner: W,
    hasher: Option<Md5>,
}

impl<W: Write> Write for HashingSink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        if let Some(h) = &mut self.hasher {
            h.update(&buf[..n]);
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Write-mode facade over a BGZF-framed BAM stream. Builds a `.bai` index
/// alongside the BAM bytes when the header declares coordinate sort order
/// and [`WriterConfig::create_index`] is set (§4.G operation 1).
pub struct Writer<W: Write + Send + 'static> {
    inner: bgzf::Writer<HashingSink<W>>,
    index_builder: Option<BinningIndexBuilder>,
    reference_count: usize,
    bai_path: Option<PathBuf>,
    md5_path: Option<PathBuf>,
    md5_digest: Option<[u8; 16]>,
    closed: bool,
}

impl Writer<File> {
    /// Create (or truncate) `path` and write the BAM magic header block.
    /// When indexing, the sibling `.bai` path is derived by appending
    /// `.bai` to `path` (§4.G "sibling path, `.bai` suffix"); likewise a
    /// `.md5` sidecar when [`WriterConfig::create_md5`] is set (§6.5).
    pub fn create<P: AsRef<Path>>(path: P, header: SamHeader, opts: WriterConfig) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)?;
        let sibling = |suffix: &str| {
            let mut p = path.as_os_str().to_owned();
            p.push(suffix);
            PathBuf::from(p)
        };
        let bai_path = opts.create_index.then(|| sibling(".bai"));
        let md5_path = opts.create_md5.then(|| sibling(".md5"));
        Self::build(file, header, opts, bai_path, md5_path)
    }
}

impl<W: Write + Send + 'static> Writer<W> {
    /// Wrap an arbitrary `Write` sink. When indexing, the built [`Index`]
    /// is only returned from [`Writer::close`] — there is no path to write
    /// a sibling `.bai` file to; likewise the MD5 digest is only available
    /// through [`Writer::md5_digest`], never written to a sidecar.
    pub fn new(inner: W, header: SamHeader, opts: WriterConfig) -> Result<Self> {
        Self::build(inner, header, opts, None, None)
    }

    fn build(
        inner: W,
        header: SamHeader,
        opts: WriterConfig,
        bai_path: Option<PathBuf>,
        md5_path: Option<PathBuf>,
    ) -> Result<Self> {
        let reference_count = header.reference_sequences.len();
        let hashing = HashingSink {
            inner,
            hasher: opts.create_md5.then(Md5::new),
        };
        let level = Compression::new(opts.compression_level);
        let mut bgzf_writer = if opts.async_io {
            bgzf::Writer::with_async(hashing, level)
        } else {
            bgzf::Writer::with_level(hashing, level)
        };

        let mut magic_block = Vec::new();
        magic_block.extend_from_slice(b"BAM\x01");
        header.write(&mut magic_block)?;
        bgzf_writer.write_data(&magic_block)?;

        let index_builder = (opts.create_index && header.is_coordinate_sorted())
            .then(|| BinningIndexBuilder::new(reference_count));

        Ok(Self {
            inner: bgzf_writer,
            index_builder,
            reference_count,
            bai_path,
            md5_path,
            md5_digest: None,
            closed: false,
        })
    }

    /// Encode and append one record, capturing its virtual-offset span and
    /// submitting it to the index builder when indexing is active (§4.G
    /// operation 2).
    pub fn write_record(&mut self, rec: &Record) -> Result<()> {
        if self.closed {
            return Err(Error::Closed);
        }

        let start_vo = self.inner.virtual_position();
        codec::encode(rec, &mut self.inner).map_err(Error::RecordCodec)?;
        let end_vo = self.inner.virtual_position();

        if let Some(builder) = &mut self.index_builder {
            let result = match (rec.reference_sequence_id, rec.alignment_start) {
                (Some(ref_id), Some(start)) => {
                    let start0 = start - 1;
                    let end0 = rec.alignment_end().unwrap_or(start);
                    builder.process_feature(
                        ref_id,
                        start0,
                        end0,
                        rec.indexing_bin() as u32,
                        Chunk::new(start_vo, end_vo),
                        !rec.flags.is_unmapped(),
                    )
                }
                _ => {
                    builder.note_no_coordinate();
                    Ok(())
                }
            };
            if let Err(e) = result {
                self.delete_partial_index().ok();
                return Err(Error::IndexOnly(Box::new(Error::State(e))));
            }
        }

        Ok(())
    }

    /// Flush the BGZF terminator, finalize the MD5 digest (if enabled),
    /// and, if indexing, write the `.bai` file (§4.G `close`). Idempotent:
    /// a second call is a no-op (§4.G/§8).
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.inner.finish()?;

        if let Some(hasher) = self.inner.get_mut().hasher.take() {
            let digest: [u8; 16] = hasher.finalize().into();
            self.md5_digest = Some(digest);
            if let Some(path) = &self.md5_path {
                std::fs::write(path, format!("{}\n", hex::encode(digest)))?;
            }
        }

        if let Some(builder) = self.index_builder.take() {
            let (references, no_coordinate) = builder.finish(self.reference_count);
            let index = Index::new(references, Some(no_coordinate));
            if let Some(path) = &self.bai_path {
                let write_result = File::create(path).map_err(Error::Io).and_then(|mut f| {
                    bai::write(&index, &mut f).map_err(|e| Error::IndexOnly(Box::new(Error::Bai(e))))
                });
                if let Err(e) = write_result {
                    self.delete_partial_index().ok();
                    return Err(e);
                }
            }
        }

        Ok(())
    }

    /// The MD5 digest of every byte written, available once
    /// [`Writer::close`] has run with [`WriterConfig::create_md5`] set.
    pub fn md5_digest(&self) -> Option<[u8; 16]> {
        self.md5_digest
    }

    /// The underlying sink, for callers that need to inspect or reclaim it
    /// after [`Writer::close`] (mirrors [`bgzf::Writer::get_ref`]).
    pub fn get_ref(&self) -> &W {
        &self.inner.get_ref().inner
    }

    /// Remove the sibling `.bai` path, if any, left behind by a failed
    /// index build (§4.G failure semantics).
    pub fn delete_partial_index(&self) -> std::io::Result<()> {
        match &self.bai_path {
            Some(path) if path.exists() => std::fs::remove_file(path),
            _ => Ok(()),
        }
    }
}

impl<W: Write + Send + 'static> Drop for Writer<W> {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::ReferenceSequenceEntry;
    use crate::record::Flags;

    fn sorted_header() -> SamHeader {
        SamHeader::new(
            "@HD\tVN:1.6\tSO:coordinate\n@SQ\tSN:chr1\tLN:1000\n",
            vec![ReferenceSequenceEntry::new("chr1", 1000)],
        )
    }

    #[test]
    fn write_record_without_indexing_just_appends_bgzf_bytes() {
        let header = SamHeader::new("@HD\tVN:1.6\n", vec![]);
        let mut w = Writer::new(Vec::new(), header, WriterConfig::default()).unwrap();
        let rec = Record::new();
        w.write_record(&rec).unwrap();
        w.close().unwrap();
        assert!(!w.get_ref().is_empty());
    }

    #[test]
    fn second_close_is_a_no_op() {
        let header = SamHeader::new("@HD\tVN:1.6\n", vec![]);
        let mut w = Writer::new(Vec::new(), header, WriterConfig::default()).unwrap();
        w.close().unwrap();
        w.close().unwrap();
    }

    #[test]
    fn indexing_requires_coordinate_sort_order() {
        let header = SamHeader::new("@HD\tVN:1.6\tSO:unsorted\n", vec![ReferenceSequenceEntry::new("chr1", 1000)]);
        let opts = WriterConfig { create_index: true, ..Default::default() };
        let w = Writer::new(Vec::new(), header, opts).unwrap();
        assert!(w.index_builder.is_none());
    }

    #[test]
    fn mapped_record_builds_an_index_builder_entry() {
        let opts = WriterConfig { create_index: true, ..Default::default() };
        let mut w = Writer::new(Vec::new(), sorted_header(), opts).unwrap();

        let mut rec = Record::new();
        rec.flags = Flags::new(0);
        rec.reference_sequence_id = Some(0);
        rec.alignment_start = Some(100);
        w.write_record(&rec).unwrap();
        assert!(w.index_builder.is_some());
        w.close().unwrap();
    }

    #[test]
    fn create_md5_produces_a_stable_digest_over_the_written_bytes() {
        let opts = WriterConfig { create_md5: true, ..Default::default() };
        let header = SamHeader::new("@HD\tVN:1.6\n", vec![]);
        let mut w = Writer::new(Vec::new(), header, opts).unwrap();
        w.write_record(&Record::new()).unwrap();
        w.close().unwrap();

        let digest = w.md5_digest().expect("create_md5 set");
        let mut hasher = Md5::new();
        hasher.update(w.get_ref());
        let expected: [u8; 16] = hasher.finalize().into();
        assert_eq!(digest, expected);
    }

    #[test]
    fn async_io_writer_still_produces_readable_output() {
        let opts = WriterConfig { async_io: true, ..Default::default() };
        let header = SamHeader::new("@HD\tVN:1.6\n", vec![]);
        let mut w = Writer::new(Vec::new(), header, opts).unwrap();
        w.write_record(&Record::new()).unwrap();
        w.close().unwrap();
        assert!(!w.get_ref().is_empty());
    }
}
