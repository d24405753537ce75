//! BGZF (Block GZip Format) stream layer (§4.A).
//!
//! A BGZF file is a concatenation of ordinary gzip (DEFLATE) members, each
//! carrying a mandatory `BC` extra-field subfield that records the total
//! compressed block size (`BSIZE`). That subfield is what makes the stream
//! seekable: the 64-bit [`VirtualPosition`] pairs a compressed block offset
//! with an uncompressed in-block offset, so a seek never has to decompress
//! anything before the target block.
//!
//! Byte-level layout grounded on the reference gzip member shape used by
//! `noodles-bgzf` and `htslib`'s own `bgzf.c`: a 12-byte gzip header with
//! `FEXTRA` set, a 6-byte `BC` extra subfield, the DEFLATE payload, then an
//! 8-byte trailer (CRC32 + ISIZE).

mod reader;
mod virtual_position;
mod writer;

pub use reader::Reader;
pub use virtual_position::VirtualPosition;
pub use writer::Writer;

use thiserror::Error;

/// Maximum uncompressed bytes per BGZF block (§4.A).
pub const MAX_BLOCK_SIZE: usize = 65536;

pub(crate) const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
pub(crate) const CM_DEFLATE: u8 = 0x08;
pub(crate) const FLG_FEXTRA: u8 = 0x04;
pub(crate) const XFL_NONE: u8 = 0x00;
pub(crate) const OS_UNKNOWN: u8 = 0xff;
pub(crate) const MTIME_NONE: u32 = 0;
pub(crate) const XLEN: u16 = 6;
pub(crate) const SUBFIELD_SI1: u8 = b'B';
pub(crate) const SUBFIELD_SI2: u8 = b'C';
pub(crate) const SUBFIELD_SLEN: u16 = 2;

/// Fixed byte length of the gzip header through the `BC` subfield, before
/// the DEFLATE payload.
pub const BLOCK_HEADER_SIZE: usize = 18;
/// Byte length of the CRC32 + ISIZE trailer.
pub const BLOCK_TRAILER_SIZE: usize = 8;

/// The literal terminator block every well-formed BGZF stream ends with: an
/// empty DEFLATE payload, fixed per the SAM spec §4.1.2.
pub const EOF_MARKER: &[u8] = &[
    0x1f, 0x8b, 0x08, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0xff, 0x06, 0x00, 0x42, 0x43, 0x02, 0x00,
    0x1b, 0x00, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

#[derive(Error, Debug)]
pub enum BgzfError {
    #[error("invalid BGZF block header")]
    InvalidHeader,
    #[error("BGZF block CRC32 mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },
    #[error("BGZF block ISIZE mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: u32, actual: u32 },
    #[error("truncated BGZF stream")]
    Truncated,
    #[error("inflate failure: {0}")]
    Inflate(#[from] std::io::Error),
}
