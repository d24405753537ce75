//! Little-endian binary primitives shared by the record codec and the BAI
//! codec (§4.B). All multi-byte integers in BAM/BAI are little-endian; this
//! module is the only place that assumption is encoded.

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

pub fn read_i8<R: Read>(r: &mut R) -> io::Result<i8> {
    r.read_i8()
}

pub fn read_u8<R: Read>(r: &mut R) -> io::Result<u8> {
    r.read_u8()
}

pub fn read_i16_le<R: Read>(r: &mut R) -> io::Result<i16> {
    r.read_i16::<LittleEndian>()
}

pub fn read_u16_le<R: Read>(r: &mut R) -> io::Result<u16> {
    r.read_u16::<LittleEndian>()
}

pub fn read_i32_le<R: Read>(r: &mut R) -> io::Result<i32> {
    r.read_i32::<LittleEndian>()
}

pub fn read_u32_le<R: Read>(r: &mut R) -> io::Result<u32> {
    r.read_u32::<LittleEndian>()
}

pub fn read_i64_le<R: Read>(r: &mut R) -> io::Result<i64> {
    r.read_i64::<LittleEndian>()
}

pub fn read_u64_le<R: Read>(r: &mut R) -> io::Result<u64> {
    r.read_u64::<LittleEndian>()
}

pub fn read_f32_le<R: Read>(r: &mut R) -> io::Result<f32> {
    r.read_f32::<LittleEndian>()
}

pub fn write_i8<W: Write>(w: &mut W, v: i8) -> io::Result<()> {
    w.write_i8(v)
}

pub fn write_u8<W: Write>(w: &mut W, v: u8) -> io::Result<()> {
    w.write_u8(v)
}

pub fn write_i16_le<W: Write>(w: &mut W, v: i16) -> io::Result<()> {
    w.write_i16::<LittleEndian>(v)
}

pub fn write_u16_le<W: Write>(w: &mut W, v: u16) -> io::Result<()> {
    w.write_u16::<LittleEndian>(v)
}

pub fn write_i32_le<W: Write>(w: &mut W, v: i32) -> io::Result<()> {
    w.write_i32::<LittleEndian>(v)
}

pub fn write_u32_le<W: Write>(w: &mut W, v: u32) -> io::Result<()> {
    w.write_u32::<LittleEndian>(v)
}

pub fn write_i64_le<W: Write>(w: &mut W, v: i64) -> io::Result<()> {
    w.write_i64::<LittleEndian>(v)
}

pub fn write_u64_le<W: Write>(w: &mut W, v: u64) -> io::Result<()> {
    w.write_u64::<LittleEndian>(v)
}

pub fn write_f32_le<W: Write>(w: &mut W, v: f32) -> io::Result<()> {
    w.write_f32::<LittleEndian>(v)
}

/// Read a NUL-terminated ASCII string, including the trailing NUL in the
/// byte count consumed but not in the returned bytes.
pub fn read_cstring<R: Read>(r: &mut R, len_including_nul: usize) -> io::Result<Vec<u8>> {
    let mut buf = vec![0u8; len_including_nul];
    r.read_exact(&mut buf)?;
    if buf.last() == Some(&0) {
        buf.pop();
    }
    Ok(buf)
}

/// Write `bytes` followed by a single NUL terminator.
pub fn write_cstring<W: Write>(w: &mut W, bytes: &[u8]) -> io::Result<()> {
    w.write_all(bytes)?;
    w.write_u8(0)
}

/// Read a 4-byte length prefix followed by that many bytes of UTF-8 text.
pub fn read_len_prefixed_string<R: Read>(r: &mut R) -> io::Result<String> {
    let len = read_i32_le(r)?.max(0) as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Write a 4-byte length prefix followed by the UTF-8 bytes of `s`.
pub fn write_len_prefixed_string<W: Write>(w: &mut W, s: &str) -> io::Result<()> {
    write_i32_le(w, s.len() as i32)?;
    w.write_all(s.as_bytes())
}
