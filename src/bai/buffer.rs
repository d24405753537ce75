//! Byte-oriented random-access source behind BAI reads: a memory-mapped
//! file, a plain page-cached reader, or any other `Read + Seek` (§4.F, §9
//! "a small sum type... behind a five-method read interface — no
//! inheritance").
//!
//! `u64` values in a `.bai` file are not 8-byte-aligned (they follow a
//! 4-byte-aligned run of `u32`s), so [`ByteSource::read_u64_as_two_u32_le`]
//! reads them as two little-endian `u32` halves rather than casting an
//! unaligned pointer (§4.F).

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};

use memmap2::Mmap;

/// Any source this module's `Stream` variant can wrap.
pub trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

pub enum ByteSource {
    Mapped { mmap: Mmap, pos: usize },
    Paged(BufReader<File>),
    Stream(Box<dyn ReadSeek>),
}

impl ByteSource {
    pub fn mapped(file: &File) -> io::Result<Self> {
        let mmap = unsafe { Mmap::map(file)? };
        Ok(Self::Mapped { mmap, pos: 0 })
    }

    pub fn paged(file: File) -> Self {
        Self::Paged(BufReader::new(file))
    }

    pub fn stream<R: ReadSeek + 'static>(r: R) -> Self {
        Self::Stream(Box::new(r))
    }

    pub fn seek(&mut self, pos: u64) -> io::Result<()> {
        match self {
            Self::Mapped { mmap, pos: cursor } => {
                if pos as usize > mmap.len() {
                    return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "seek past end of mapping"));
                }
                *cursor = pos as usize;
                Ok(())
            }
            Self::Paged(r) => r.seek(SeekFrom::Start(pos)).map(|_| ()),
            Self::Stream(r) => r.seek(SeekFrom::Start(pos)).map(|_| ()),
        }
    }

    pub fn skip(&mut self, n: u64) -> io::Result<()> {
        match self {
            Self::Mapped { pos, .. } => {
                *pos += n as usize;
                Ok(())
            }
            Self::Paged(r) => r.seek(SeekFrom::Current(n as i64)).map(|_| ()),
            Self::Stream(r) => r.seek(SeekFrom::Current(n as i64)).map(|_| ()),
        }
    }

    pub fn read_u8(&mut self) -> io::Result<u8> {
        let mut buf = [0u8; 1];
        self.read_exact_into(&mut buf)?;
        Ok(buf[0])
    }

    pub fn read_u16_le(&mut self) -> io::Result<u16> {
        let mut buf = [0u8; 2];
        self.read_exact_into(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    pub fn read_u32_le(&mut self) -> io::Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact_into(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    pub fn read_i32_le(&mut self) -> io::Result<i32> {
        Ok(self.read_u32_le()? as i32)
    }

    /// Read a `u64` as two little-endian `u32` halves (§4.F).
    pub fn read_u64_as_two_u32_le(&mut self) -> io::Result<u64> {
        let lo = self.read_u32_le()? as u64;
        let hi = self.read_u32_le()? as u64;
        Ok(lo | (hi << 32))
    }

    fn read_exact_into(&mut self, buf: &mut [u8]) -> io::Result<()> {
        match self {
            Self::Mapped { mmap, pos } => {
                let end = *pos + buf.len();
                if end > mmap.len() {
                    return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "read past end of mapping"));
                }
                buf.copy_from_slice(&mmap[*pos..end]);
                *pos = end;
                Ok(())
            }
            Self::Paged(r) => r.read_exact(buf),
            Self::Stream(r) => r.read_exact(buf),
        }
    }
}
