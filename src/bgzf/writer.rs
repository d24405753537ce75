//! BGZF block writer (§4.A write operations).
//!
//! Grounded on the gzip-member framing used by `noodles-bgzf`'s writer
//! (header byte layout, `DeflateEncoder` + `Crc` usage, the literal
//! `EOF_MARKER` terminator) but restructured around an explicit staging
//! buffer and a `VirtualPosition`-returning `flush_block`, matching the
//! teacher's `encode_block`/`BlockHeader::write` two-step "build the
//! payload, then frame it" shape from its own `block.rs`.

use std::io::{self, Write};
use std::sync::mpsc;
use std::thread;

use byteorder::{LittleEndian, WriteBytesExt};
use flate2::{write::DeflateEncoder, Compression, Crc};

use super::{
    VirtualPosition, BLOCK_HEADER_SIZE, BLOCK_TRAILER_SIZE, CM_DEFLATE, EOF_MARKER, FLG_FEXTRA,
    GZIP_MAGIC, MAX_BLOCK_SIZE, MTIME_NONE, OS_UNKNOWN, SUBFIELD_SI1, SUBFIELD_SI2,
    SUBFIELD_SLEN, XFL_NONE, XLEN,
};

/// Where a framed block's bytes actually land (§6.5 `async_io`).
///
/// DEFLATE always happens on the submission thread — the compressed size
/// has to be known before `virtual_position()` can report the *next*
/// block's offset, so there is nothing to gain by moving compression
/// itself off-thread (§5: "`current_virtual_offset()` remains consistent
/// on the submission thread"). What `async_io` defers is the disk write
/// of an already-framed block: `Queued` hands the bytes to a channel
/// drained by one worker thread, so a slow sink never blocks the caller
/// between records.
enum Sink<W> {
    Direct(W),
    Queued {
        tx: mpsc::Sender<Vec<u8>>,
        worker: Option<thread::JoinHandle<io::Result<W>>>,
    },
}

/// Append-only BGZF stream writer.
///
/// `write` stages bytes in memory and transparently flushes a full block
/// when the 65 536-byte uncompressed cap would be exceeded. Callers that
/// need the virtual offset of the *next* byte to be written (e.g. the BAM
/// writer capturing `start_vo`/`end_vo` per record, §4.G) call
/// [`Writer::virtual_position`] before and after each logical write.
pub struct Writer<W> {
    sink: Sink<W>,
    staging: Vec<u8>,
    compressed_offset: u64,
    level: Compression,
}

impl<W: Write> Writer<W> {
    pub fn new(inner: W) -> Self {
        Self::with_level(inner, Compression::new(5))
    }

    pub fn with_level(inner: W, level: Compression) -> Self {
        Self {
            sink: Sink::Direct(inner),
            staging: Vec::with_capacity(MAX_BLOCK_SIZE),
            compressed_offset: 0,
            level,
        }
    }

    /// As [`Writer::with_level`], but framed blocks are handed to a
    /// background thread for the actual disk write instead of being
    /// written inline (§6.5 `async_io`, §5 "async-I/O shim... wraps a
    /// write queue but must preserve submission order"). The channel is
    /// FIFO and single-consumer, so ordering is automatic.
    pub fn with_async(inner: W, level: Compression) -> Self
    where
        W: Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<Vec<u8>>();
        let worker = thread::spawn(move || -> io::Result<W> {
            let mut inner = inner;
            for framed in rx {
                inner.write_all(&framed)?;
            }
            Ok(inner)
        });
        Self {
            sink: Sink::Queued { tx, worker: Some(worker) },
            staging: Vec::with_capacity(MAX_BLOCK_SIZE),
            compressed_offset: 0,
            level,
        }
    }

    /// Join the background worker (if any) and fold it back into a
    /// `Direct` sink, so [`Writer::get_ref`]/[`Writer::get_mut`] work
    /// uniformly after [`Writer::finish`] regardless of `async_io`.
    fn settle(&mut self) -> io::Result<()> {
        if let Sink::Queued { tx, worker } = &mut self.sink {
            if let Some(handle) = worker.take() {
                // Drop the sender so the worker's `for framed in rx` loop
                // ends, then block for it to hand the sink back.
                let (dummy_tx, _) = mpsc::channel();
                let old_tx = std::mem::replace(tx, dummy_tx);
                drop(old_tx);
                let inner = handle
                    .join()
                    .map_err(|_| io::Error::new(io::ErrorKind::Other, "BGZF writer thread panicked"))??;
                self.sink = Sink::Direct(inner);
            }
        }
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        match &self.sink {
            Sink::Direct(w) => w,
            Sink::Queued { .. } => panic!("get_ref() on an unsettled async BGZF writer; call finish() first"),
        }
    }

    pub fn get_mut(&mut self) -> &mut W {
        match &mut self.sink {
            Sink::Direct(w) => w,
            Sink::Queued { .. } => panic!("get_mut() on an unsettled async BGZF writer; call finish() first"),
        }
    }

    /// The virtual offset a reader would need to seek to in order to reach
    /// the next byte this writer will emit.
    pub fn virtual_position(&self) -> VirtualPosition {
        VirtualPosition::pack(self.compressed_offset, self.staging.len() as u16)
    }

    /// Append `buf` to the staging buffer, flushing a block whenever doing
    /// so would exceed [`super::MAX_BLOCK_SIZE`] uncompressed bytes (§4.A).
    pub fn write_data(&mut self, mut buf: &[u8]) -> io::Result<()> {
        while !buf.is_empty() {
            let room = MAX_BLOCK_SIZE - self.staging.len();
            let take = room.min(buf.len());
            self.staging.extend_from_slice(&buf[..take]);
            buf = &buf[take..];

            if self.staging.len() >= MAX_BLOCK_SIZE {
                self.flush_block()?;
            }
        }
        Ok(())
    }

    /// DEFLATE the staged bytes, frame them with the BGZF header/trailer,
    /// and advance the tracked compressed offset. A no-op when nothing is
    /// staged.
    pub fn flush_block(&mut self) -> io::Result<()> {
        if self.staging.is_empty() {
            return Ok(());
        }

        let mut crc = Crc::new();
        crc.update(&self.staging);

        let mut encoder = DeflateEncoder::new(Vec::new(), self.level);
        encoder.write_all(&self.staging)?;
        let compressed = encoder.finish()?;

        let mut framed = Vec::with_capacity(BLOCK_HEADER_SIZE + compressed.len() + BLOCK_TRAILER_SIZE);
        write_header(&mut framed, compressed.len())?;
        framed.extend_from_slice(&compressed);
        write_trailer(&mut framed, crc.sum(), crc.amount())?;

        self.compressed_offset += framed.len() as u64;
        self.emit(framed)?;
        self.staging.clear();
        Ok(())
    }

    fn emit(&mut self, framed: Vec<u8>) -> io::Result<()> {
        match &mut self.sink {
            Sink::Direct(w) => w.write_all(&framed),
            Sink::Queued { tx, .. } => tx
                .send(framed)
                .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "BGZF writer thread is gone")),
        }
    }

    /// Flush any pending block, emit the fixed BGZF end-of-file terminator
    /// block, and (when `async_io` is in use) wait for every queued block
    /// to actually reach the sink (§4.A `close`).
    pub fn finish(&mut self) -> io::Result<()> {
        self.flush_block()?;
        self.compressed_offset += EOF_MARKER.len() as u64;
        self.emit(EOF_MARKER.to_vec())?;
        self.settle()
    }
}

impl<W: Write> Write for Writer<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_data(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_block()
    }
}

fn write_header<W: Write>(w: &mut W, compressed_len: usize) -> io::Result<()> {
    w.write_all(&GZIP_MAGIC)?;
    w.write_u8(CM_DEFLATE)?;
    w.write_u8(FLG_FEXTRA)?;
    w.write_u32::<LittleEndian>(MTIME_NONE)?;
    w.write_u8(XFL_NONE)?;
    w.write_u8(OS_UNKNOWN)?;
    w.write_u16::<LittleEndian>(XLEN)?;

    w.write_u8(SUBFIELD_SI1)?;
    w.write_u8(SUBFIELD_SI2)?;
    w.write_u16::<LittleEndian>(SUBFIELD_SLEN)?;

    // BSIZE = total block length (header + payload + trailer) - 1.
    let bsize = (BLOCK_HEADER_SIZE + compressed_len + BLOCK_TRAILER_SIZE - 1) as u16;
    w.write_u16::<LittleEndian>(bsize)
}

fn write_trailer<W: Write>(w: &mut W, crc32: u32, isize: u32) -> io::Result<()> {
    w.write_u32::<LittleEndian>(crc32)?;
    w.write_u32::<LittleEndian>(isize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn staging_flushes_at_cap() {
        let mut w = Writer::new(Vec::new());
        let chunk = vec![b'x'; MAX_BLOCK_SIZE];
        w.write_data(&chunk).unwrap();
        // exactly hitting the cap should have flushed already.
        assert_eq!(w.staging.len(), 0);
        assert!(w.compressed_offset > 0);
    }

    #[test]
    fn finish_appends_eof_marker() {
        let mut w = Writer::new(Vec::new());
        w.write_data(b"hello bgzf").unwrap();
        w.finish().unwrap();

        let data = w.get_ref();
        let eof_start = data.len() - EOF_MARKER.len();
        assert_eq!(&data[eof_start..], EOF_MARKER);
    }

    #[test]
    fn virtual_position_advances_after_flush() {
        let mut w = Writer::new(Vec::new());
        let before = w.virtual_position();
        assert_eq!(before.block_offset(), 0);

        w.write_data(b"abc").unwrap();
        let mid = w.virtual_position();
        assert_eq!(mid.block_offset(), 0);
        assert_eq!(mid.within_block_offset(), 3);

        w.flush_block().unwrap();
        let after = w.virtual_position();
        assert!(after.block_offset() > 0);
        assert_eq!(after.within_block_offset(), 0);
    }

    #[test]
    fn written_block_round_trips_through_flate2() {
        let mut w = Writer::new(Vec::new());
        w.write_data(b"round trip me").unwrap();
        w.finish().unwrap();

        // Decode the single data block manually (skip the 18-byte header,
        // inflate until the declared compressed length, verify the CRC).
        let data = w.get_ref();
        let payload_start = BLOCK_HEADER_SIZE;
        // We don't know the exact compressed length without re-deriving
        // BSIZE, so just confirm the header's magic/subfield bytes.
        assert_eq!(&data[0..2], &GZIP_MAGIC);
        assert_eq!(data[12], SUBFIELD_SI1);
        assert_eq!(data[13], SUBFIELD_SI2);

        let mut decoder = flate2::read::DeflateDecoder::new(&data[payload_start..]);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"round trip me");
    }

    #[test]
    fn async_writer_preserves_submission_order_and_still_produces_a_valid_stream() {
        let mut w = Writer::with_async(Vec::new(), Compression::new(5));
        w.write_data(&vec![b'a'; MAX_BLOCK_SIZE]).unwrap();
        w.write_data(b"tail").unwrap();
        w.finish().unwrap();

        let data = w.get_ref();
        assert_eq!(&data[0..2], &GZIP_MAGIC);
        let eof_start = data.len() - EOF_MARKER.len();
        assert_eq!(&data[eof_start..], EOF_MARKER);
    }
}
