//! BGZF block reader (§4.A read operations).

use std::io::{self, Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};
use flate2::read::DeflateDecoder;
use flate2::Crc;

use super::{BgzfError, VirtualPosition, CM_DEFLATE, GZIP_MAGIC};

struct BlockHeader {
    /// Length of the DEFLATE payload.
    compressed_len: u64,
}

fn read_block_header<R: Read>(r: &mut R) -> io::Result<Option<BlockHeader>> {
    let mut magic = [0u8; 2];
    match r.read_exact(&mut magic) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }
    if magic != GZIP_MAGIC {
        return Err(io::Error::new(io::ErrorKind::InvalidData, BgzfError::InvalidHeader));
    }

    let cm = r.read_u8()?;
    if cm != CM_DEFLATE {
        return Err(io::Error::new(io::ErrorKind::InvalidData, BgzfError::InvalidHeader));
    }
    let _flg = r.read_u8()?;
    let _mtime = r.read_u32::<LittleEndian>()?;
    let _xfl = r.read_u8()?;
    let _os = r.read_u8()?;
    let xlen = r.read_u16::<LittleEndian>()?;

    let mut extra = vec![0u8; xlen as usize];
    r.read_exact(&mut extra)?;

    let mut bsize: Option<u16> = None;
    let mut i = 0usize;
    while i + 4 <= extra.len() {
        let si1 = extra[i];
        let si2 = extra[i + 1];
        let slen = u16::from_le_bytes([extra[i + 2], extra[i + 3]]) as usize;
        let data_start = i + 4;
        if si1 == b'B' && si2 == b'C' && slen == 2 && data_start + 2 <= extra.len() {
            bsize = Some(u16::from_le_bytes([extra[data_start], extra[data_start + 1]]));
        }
        i = data_start + slen;
    }

    let bsize = bsize.ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidData, BgzfError::InvalidHeader)
    })?;

    let header_len = (10 + 2 + xlen as usize) as u64;
    let total_block_len = bsize as u64 + 1;
    let trailer_len = 8u64;
    if total_block_len < header_len + trailer_len {
        return Err(io::Error::new(io::ErrorKind::InvalidData, BgzfError::InvalidHeader));
    }
    let compressed_len = total_block_len - header_len - trailer_len;

    Ok(Some(BlockHeader { compressed_len }))
}

/// Seekable BGZF stream reader. Caches one inflated block at a time.
pub struct Reader<R> {
    inner: R,
    buffer: Vec<u8>,
    buf_pos: usize,
    block_offset: u64,
}

impl<R: Read + Seek> Reader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
            buf_pos: 0,
            block_offset: 0,
        }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Virtual offset reflecting the position after the last successful
    /// `read` (§4.A).
    pub fn virtual_position(&self) -> VirtualPosition {
        VirtualPosition::pack(self.block_offset, self.buf_pos as u16)
    }

    /// Reposition to `vo`, inflating the target block into the cache and
    /// setting the cursor to `vo`'s within-block offset (§4.A `seek`).
    pub fn seek(&mut self, vo: VirtualPosition) -> Result<(), BgzfError> {
        self.inner
            .seek(SeekFrom::Start(vo.block_offset()))
            .map_err(BgzfError::Inflate)?;
        self.load_block()?;
        let within = vo.within_block_offset() as usize;
        if within > self.buffer.len() {
            return Err(BgzfError::Truncated);
        }
        self.buf_pos = within;
        self.block_offset = vo.block_offset();
        Ok(())
    }

    /// Fill `buf` from the cache, pulling the next block sequentially when
    /// exhausted (§4.A `read`). Returns `0` at the terminator/EOF.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, BgzfError> {
        if self.buf_pos >= self.buffer.len() {
            self.block_offset = self.current_stream_offset()?;
            let advanced = self.load_block()?;
            if !advanced {
                return Ok(0);
            }
        }
        let n = buf.len().min(self.buffer.len() - self.buf_pos);
        buf[..n].copy_from_slice(&self.buffer[self.buf_pos..self.buf_pos + n]);
        self.buf_pos += n;
        Ok(n)
    }

    pub fn read_exact(&mut self, mut buf: &mut [u8]) -> Result<(), BgzfError> {
        while !buf.is_empty() {
            let n = self.read(buf)?;
            if n == 0 {
                return Err(BgzfError::Truncated);
            }
            buf = &mut buf[n..];
        }
        Ok(())
    }

    fn current_stream_offset(&mut self) -> Result<u64, BgzfError> {
        self.inner.stream_position().map_err(BgzfError::Inflate)
    }

    /// Read and inflate the next block at the current stream position.
    /// Returns `false` at EOF or the terminator block.
    fn load_block(&mut self) -> Result<bool, BgzfError> {
        let header = match read_block_header(&mut self.inner).map_err(|e| {
            if e.kind() == io::ErrorKind::InvalidData {
                BgzfError::InvalidHeader
            } else {
                BgzfError::Inflate(e)
            }
        })? {
            Some(h) => h,
            None => {
                self.buffer.clear();
                self.buf_pos = 0;
                return Ok(false);
            }
        };

        let mut compressed = vec![0u8; header.compressed_len as usize];
        self.inner
            .read_exact(&mut compressed)
            .map_err(|_| BgzfError::Truncated)?;

        let expected_crc = self.inner.read_u32::<LittleEndian>().map_err(BgzfError::Inflate)?;
        let expected_isize = self.inner.read_u32::<LittleEndian>().map_err(BgzfError::Inflate)?;

        if header.compressed_len == 0 && expected_isize == 0 {
            // Terminator block.
            self.buffer.clear();
            self.buf_pos = 0;
            return Ok(false);
        }

        let mut decoder = DeflateDecoder::new(&compressed[..]);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).map_err(BgzfError::Inflate)?;

        if out.len() as u32 != expected_isize {
            return Err(BgzfError::SizeMismatch {
                expected: expected_isize,
                actual: out.len() as u32,
            });
        }

        let mut crc = Crc::new();
        crc.update(&out);
        if crc.sum() != expected_crc {
            return Err(BgzfError::ChecksumMismatch {
                expected: expected_crc,
                actual: crc.sum(),
            });
        }

        self.buffer = out;
        self.buf_pos = 0;
        Ok(true)
    }
}

/// Adapts [`Reader::read`]/[`Reader::read_exact`] to `std::io::Read` for
/// callers that decode through a generic `R: Read` (the record codec,
/// `SamHeader::read`), translating [`BgzfError`] into an `io::Error`.
impl<R: Read + Seek> Read for Reader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Reader::read(self, buf).map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }
}
