//! BAM record wire codec (§4.D): the fixed-header + variable-payload byte
//! layout shared by every record in a BAM file, independent of the
//! surrounding BGZF framing.
//!
//! Grounded on `other_examples/...noodles-bam-src-record-codec-encoder.rs`
//! for field order and the bin/CIGAR-overflow shape, adapted to this crate's
//! plain [`super::Record`] type (no header-relative reference-id resolution:
//! `reference_sequence_id` here is already the resolved `usize`).

use std::cell::OnceCell;
use std::io::{self, Read, Write};

use thiserror::Error;

use crate::binary;
use crate::index::reg2bin::UNMAPPED_BIN;

use super::{Base, Cigar, CigarOp, CigarOpKind, Data, Flags, Record, Sequence, Tag, Value};

#[derive(Error, Debug)]
pub enum RecordCodecError {
    #[error("short read: expected more bytes than the stream provided")]
    ShortRead,
    #[error("invalid CIGAR operator code {0}")]
    InvalidCigarOp(u8),
    #[error("declared sequence length {declared} does not match decoded base count {actual}")]
    SequenceLengthMismatch { declared: u32, actual: usize },
    #[error("unknown tag value type {0:?}")]
    UnknownTagType(u8),
    #[error("H-type tag value is not a valid hex string")]
    InvalidHexDigits,
    #[error("tag array declared {declared} elements but payload held {actual}")]
    ArrayLengthMismatch { declared: i32, actual: usize },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

fn io_to_codec(e: io::Error) -> RecordCodecError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        RecordCodecError::ShortRead
    } else {
        RecordCodecError::Io(e)
    }
}

const REF_ID_NONE: i32 = -1;
const POS_NONE: i32 = -1;
const MAPQ_NONE: u8 = 255;
const QUAL_MISSING: u8 = 0xff;

/// Encode `rec` onto `sink`, including the leading `block_size` length
/// prefix (§4.D wire layout table).
pub fn encode<W: Write>(rec: &Record, sink: &mut W) -> Result<(), RecordCodecError> {
    let body = encode_body(rec)?;
    binary::write_u32_le(sink, body.len() as u32).map_err(RecordCodecError::Io)?;
    sink.write_all(&body).map_err(RecordCodecError::Io)?;
    Ok(())
}

/// Convenience wrapper returning the full encoded byte string (block_size
/// prefix included).
pub fn encode_to_vec(rec: &Record) -> Result<Vec<u8>, RecordCodecError> {
    let mut buf = Vec::new();
    encode(rec, &mut buf)?;
    Ok(buf)
}

fn encode_body(rec: &Record) -> Result<Vec<u8>, RecordCodecError> {
    let mut body = Vec::new();

    let ref_id = rec.reference_sequence_id.map(|i| i as i32).unwrap_or(REF_ID_NONE);
    binary::write_i32_le(&mut body, ref_id)?;

    let pos = rec.alignment_start.map(|p| p as i32 - 1).unwrap_or(POS_NONE);
    binary::write_i32_le(&mut body, pos)?;

    let mut name = rec.name.clone();
    if name.is_empty() {
        name = b"*".to_vec();
    }
    let l_read_name = (name.len() + 1) as u8;
    binary::write_u8(&mut body, l_read_name)?;

    binary::write_u8(&mut body, rec.mapping_quality.unwrap_or(MAPQ_NONE))?;
    binary::write_u16_le(&mut body, rec.indexing_bin())?;
    binary::write_u16_le(&mut body, rec.cigar.ops().len() as u16)?;
    binary::write_u16_le(&mut body, rec.flags.bits())?;
    binary::write_u32_le(&mut body, rec.sequence.len() as u32)?;

    let next_ref_id = rec.mate_reference_sequence_id.map(|i| i as i32).unwrap_or(REF_ID_NONE);
    binary::write_i32_le(&mut body, next_ref_id)?;
    let next_pos = rec.mate_alignment_start.map(|p| p as i32 - 1).unwrap_or(POS_NONE);
    binary::write_i32_le(&mut body, next_pos)?;
    binary::write_i32_le(&mut body, rec.template_length)?;

    binary::write_cstring(&mut body, &name)?;

    for op in rec.cigar.ops() {
        binary::write_u32_le(&mut body, op.pack())?;
    }

    encode_sequence(&mut body, &rec.sequence)?;
    encode_quality(&mut body, rec.sequence.len(), &rec.quality_scores)?;
    encode_data(&mut body, &rec.data)?;

    Ok(body)
}

fn encode_sequence<W: Write>(w: &mut W, seq: &Sequence) -> io::Result<()> {
    let bases = seq.bases();
    for chunk in bases.chunks(2) {
        let hi = chunk[0].to_nibble();
        let lo = chunk.get(1).map(|b| b.to_nibble()).unwrap_or(0);
        binary::write_u8(w, (hi << 4) | lo)?;
    }
    Ok(())
}

fn encode_quality<W: Write>(w: &mut W, n_seq: usize, quals: &[u8]) -> io::Result<()> {
    if quals.is_empty() {
        for _ in 0..n_seq {
            binary::write_u8(w, QUAL_MISSING)?;
        }
    } else {
        for &q in quals {
            binary::write_u8(w, q)?;
        }
    }
    Ok(())
}

fn encode_data<W: Write>(w: &mut W, data: &Data) -> Result<(), RecordCodecError> {
    for (tag, value) in data.iter() {
        w.write_all(&tag.0)?;
        encode_value(w, value)?;
    }
    Ok(())
}

fn encode_value<W: Write>(w: &mut W, value: &Value) -> Result<(), RecordCodecError> {
    match value {
        Value::Int8(v) => {
            binary::write_u8(w, b'c')?;
            binary::write_i8(w, *v)?;
        }
        Value::UInt8(v) => {
            binary::write_u8(w, b'C')?;
            binary::write_u8(w, *v)?;
        }
        Value::Int16(v) => {
            binary::write_u8(w, b's')?;
            binary::write_i16_le(w, *v)?;
        }
        Value::UInt16(v) => {
            binary::write_u8(w, b'S')?;
            binary::write_u16_le(w, *v)?;
        }
        Value::Int32(v) => {
            binary::write_u8(w, b'i')?;
            binary::write_i32_le(w, *v)?;
        }
        Value::UInt32(v) => {
            binary::write_u8(w, b'I')?;
            binary::write_u32_le(w, *v)?;
        }
        Value::Float(v) => {
            binary::write_u8(w, b'f')?;
            binary::write_f32_le(w, *v)?;
        }
        Value::Character(v) => {
            binary::write_u8(w, b'A')?;
            binary::write_u8(w, *v)?;
        }
        Value::String(v) => {
            binary::write_u8(w, b'Z')?;
            binary::write_cstring(w, v)?;
        }
        Value::Hex(v) => {
            binary::write_u8(w, b'H')?;
            binary::write_cstring(w, hex::encode_upper(v).as_bytes())?;
        }
        Value::Int8Array(v) => encode_array(w, b'c', v.len(), |w| {
            for x in v {
                binary::write_i8(w, *x)?;
            }
            Ok(())
        })?,
        Value::UInt8Array(v) => encode_array(w, b'C', v.len(), |w| {
            for x in v {
                binary::write_u8(w, *x)?;
            }
            Ok(())
        })?,
        Value::Int16Array(v) => encode_array(w, b's', v.len(), |w| {
            for x in v {
                binary::write_i16_le(w, *x)?;
            }
            Ok(())
        })?,
        Value::UInt16Array(v) => encode_array(w, b'S', v.len(), |w| {
            for x in v {
                binary::write_u16_le(w, *x)?;
            }
            Ok(())
        })?,
        Value::Int32Array(v) => encode_array(w, b'i', v.len(), |w| {
            for x in v {
                binary::write_i32_le(w, *x)?;
            }
            Ok(())
        })?,
        Value::UInt32Array(v) => encode_array(w, b'I', v.len(), |w| {
            for x in v {
                binary::write_u32_le(w, *x)?;
            }
            Ok(())
        })?,
        Value::Float32Array(v) => encode_array(w, b'f', v.len(), |w| {
            for x in v {
                binary::write_f32_le(w, *x)?;
            }
            Ok(())
        })?,
    }
    Ok(())
}

fn encode_array<W: Write>(
    w: &mut W,
    subtype: u8,
    len: usize,
    body: impl FnOnce(&mut W) -> io::Result<()>,
) -> Result<(), RecordCodecError> {
    binary::write_u8(w, b'B')?;
    binary::write_u8(w, subtype)?;
    binary::write_i32_le(w, len as i32)?;
    body(w)?;
    Ok(())
}

/// Decode one record, eagerly materializing every field (§4.D `decode`,
/// eager mode).
pub fn decode<R: Read>(src: &mut R) -> Result<Record, RecordCodecError> {
    let block_size = binary::read_u32_le(src).map_err(io_to_codec)?;
    let mut body = vec![0u8; block_size as usize];
    src.read_exact(&mut body).map_err(io_to_codec)?;
    decode_body(&body)
}

fn decode_body(body: &[u8]) -> Result<Record, RecordCodecError> {
    let mut r = io::Cursor::new(body);

    let ref_id = binary::read_i32_le(&mut r).map_err(io_to_codec)?;
    let pos = binary::read_i32_le(&mut r).map_err(io_to_codec)?;
    let l_read_name = binary::read_u8(&mut r).map_err(io_to_codec)?;
    let mapq = binary::read_u8(&mut r).map_err(io_to_codec)?;
    let _bin = binary::read_u16_le(&mut r).map_err(io_to_codec)?;
    let n_cigar_op = binary::read_u16_le(&mut r).map_err(io_to_codec)?;
    let flag = binary::read_u16_le(&mut r).map_err(io_to_codec)?;
    let n_seq = binary::read_u32_le(&mut r).map_err(io_to_codec)?;
    let next_ref_id = binary::read_i32_le(&mut r).map_err(io_to_codec)?;
    let next_pos = binary::read_i32_le(&mut r).map_err(io_to_codec)?;
    let tlen = binary::read_i32_le(&mut r).map_err(io_to_codec)?;

    let name = binary::read_cstring(&mut r, l_read_name as usize).map_err(io_to_codec)?;

    let mut cigar_ops = Vec::with_capacity(n_cigar_op as usize);
    for _ in 0..n_cigar_op {
        let raw = binary::read_u32_le(&mut r).map_err(io_to_codec)?;
        let op = CigarOp::unpack(raw).ok_or(RecordCodecError::InvalidCigarOp((raw & 0xf) as u8))?;
        cigar_ops.push(op);
    }

    let sequence = decode_sequence(&mut r, n_seq as usize)?;
    if sequence.len() != n_seq as usize {
        return Err(RecordCodecError::SequenceLengthMismatch {
            declared: n_seq,
            actual: sequence.len(),
        });
    }

    let quality_scores = decode_quality(&mut r, n_seq as usize)?;

    let mut data = Data::new();
    let mut tag_buf = [0u8; 2];
    loop {
        match r.read_exact(&mut tag_buf) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(io_to_codec(e)),
        }
        let tag = Tag::new(tag_buf[0], tag_buf[1]);
        let value = decode_value(&mut r)?;
        data.insert(tag, value);
    }

    let mut rec = Record::new();
    rec.name = if name == b"*" { Vec::new() } else { name };
    rec.flags = Flags::new(flag);
    rec.reference_sequence_id = if ref_id == REF_ID_NONE { None } else { Some(ref_id as usize) };
    rec.alignment_start = if pos == POS_NONE { None } else { Some((pos + 1) as u32) };
    rec.mapping_quality = if mapq == MAPQ_NONE { None } else { Some(mapq) };
    rec.cigar = Cigar(cigar_ops);
    rec.mate_reference_sequence_id = if next_ref_id == REF_ID_NONE { None } else { Some(next_ref_id as usize) };
    rec.mate_alignment_start = if next_pos == POS_NONE { None } else { Some((next_pos + 1) as u32) };
    rec.template_length = tlen;
    rec.sequence = sequence;
    rec.quality_scores = quality_scores;
    rec.data = data;

    Ok(rec)
}

fn decode_sequence<R: Read>(r: &mut R, n_seq: usize) -> Result<Sequence, RecordCodecError> {
    let packed_len = (n_seq + 1) / 2;
    let mut packed = vec![0u8; packed_len];
    r.read_exact(&mut packed).map_err(io_to_codec)?;

    let mut bases = Vec::with_capacity(n_seq);
    for byte in &packed {
        bases.push(Base::from_nibble(byte >> 4));
        if bases.len() == n_seq {
            break;
        }
        bases.push(Base::from_nibble(byte & 0xf));
        if bases.len() == n_seq {
            break;
        }
    }
    Ok(Sequence::new(bases))
}

fn decode_quality<R: Read>(r: &mut R, n_seq: usize) -> Result<Vec<u8>, RecordCodecError> {
    let mut quals = vec![0u8; n_seq];
    r.read_exact(&mut quals).map_err(io_to_codec)?;
    if quals.iter().all(|&q| q == QUAL_MISSING) && !quals.is_empty() {
        Ok(Vec::new())
    } else {
        Ok(quals)
    }
}

fn decode_value<R: Read>(r: &mut R) -> Result<Value, RecordCodecError> {
    let ty = binary::read_u8(r).map_err(io_to_codec)?;
    match ty {
        b'c' => Ok(Value::Int8(binary::read_i8(r).map_err(io_to_codec)?)),
        b'C' => Ok(Value::UInt8(binary::read_u8(r).map_err(io_to_codec)?)),
        b's' => Ok(Value::Int16(binary::read_i16_le(r).map_err(io_to_codec)?)),
        b'S' => Ok(Value::UInt16(binary::read_u16_le(r).map_err(io_to_codec)?)),
        b'i' => Ok(Value::Int32(binary::read_i32_le(r).map_err(io_to_codec)?)),
        b'I' => Ok(Value::UInt32(binary::read_u32_le(r).map_err(io_to_codec)?)),
        b'f' => Ok(Value::Float(binary::read_f32_le(r).map_err(io_to_codec)?)),
        b'A' => Ok(Value::Character(binary::read_u8(r).map_err(io_to_codec)?)),
        b'Z' => Ok(Value::String(read_cstring_bytes(r)?)),
        b'H' => {
            let digits = read_cstring_bytes(r)?;
            hex::decode(&digits)
                .map(Value::Hex)
                .map_err(|_| RecordCodecError::InvalidHexDigits)
        }
        b'B' => decode_array(r),
        other => Err(RecordCodecError::UnknownTagType(other)),
    }
}

fn read_cstring_bytes<R: Read>(r: &mut R) -> Result<Vec<u8>, RecordCodecError> {
    let mut out = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        r.read_exact(&mut byte).map_err(io_to_codec)?;
        if byte[0] == 0 {
            break;
        }
        out.push(byte[0]);
    }
    Ok(out)
}

fn decode_array<R: Read>(r: &mut R) -> Result<Value, RecordCodecError> {
    let subtype = binary::read_u8(r).map_err(io_to_codec)?;
    let count = binary::read_i32_le(r).map_err(io_to_codec)?;
    if count < 0 {
        return Err(RecordCodecError::ArrayLengthMismatch { declared: count, actual: 0 });
    }
    let n = count as usize;

    macro_rules! read_n {
        ($read:expr) => {{
            let mut v = Vec::with_capacity(n);
            for _ in 0..n {
                v.push($read(r).map_err(io_to_codec)?);
            }
            v
        }};
    }

    match subtype {
        b'c' => Ok(Value::Int8Array(read_n!(binary::read_i8))),
        b'C' => Ok(Value::UInt8Array(read_n!(binary::read_u8))),
        b's' => Ok(Value::Int16Array(read_n!(binary::read_i16_le))),
        b'S' => Ok(Value::UInt16Array(read_n!(binary::read_u16_le))),
        b'i' => Ok(Value::Int32Array(read_n!(binary::read_i32_le))),
        b'I' => Ok(Value::UInt32Array(read_n!(binary::read_u32_le))),
        b'f' => Ok(Value::Float32Array(read_n!(binary::read_f32_le))),
        other => Err(RecordCodecError::UnknownTagType(other)),
    }
}

/// A decoded record that keeps its tag dictionary as raw, un-parsed bytes
/// until first accessed (§4.D "lazy mode retains the raw variable-length
/// tail"; §9 "a raw variable-length slice... materializes fields on first
/// use").
///
/// Every field up to and including the base/quality arrays is eagerly
/// decoded, since those are needed for `alignment_end`/`indexing_bin`
/// immediately after reading in most call sites (e.g. the index-rebuild
/// path in `bamctl index`); only the tag dictionary — the most variable and
/// least universally needed part of a record — is deferred.
pub struct LazyRecord {
    prefix: Record,
    raw_tags: Vec<u8>,
    data: OnceCell<Data>,
}

impl LazyRecord {
    /// The eagerly-decoded fields (everything but `data`, which reads as
    /// empty until [`LazyRecord::data`] is called).
    pub fn fields(&self) -> &Record {
        &self.prefix
    }

    /// Parse the raw tag bytes on first access and cache the result.
    pub fn data(&self) -> Result<&Data, RecordCodecError> {
        if let Some(d) = self.data.get() {
            return Ok(d);
        }
        let mut cursor = io::Cursor::new(&self.raw_tags);
        let mut data = Data::new();
        let mut tag_buf = [0u8; 2];
        loop {
            match cursor.read_exact(&mut tag_buf) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(io_to_codec(e)),
            }
            let tag = Tag::new(tag_buf[0], tag_buf[1]);
            let value = decode_value(&mut cursor)?;
            data.insert(tag, value);
        }
        let _ = self.data.set(data);
        Ok(self.data.get().expect("just set"))
    }

    /// Fully materialize into an owned [`Record`], parsing the tag
    /// dictionary if it hasn't been already.
    pub fn into_record(mut self) -> Result<Record, RecordCodecError> {
        let data = self.data()?.clone();
        self.prefix.data = data;
        Ok(self.prefix)
    }
}

/// Decode one record, deferring tag-dictionary parsing until first
/// accessed (§4.D `decode`, lazy mode).
pub fn decode_lazy<R: Read>(src: &mut R) -> Result<LazyRecord, RecordCodecError> {
    let block_size = binary::read_u32_le(src).map_err(io_to_codec)?;
    let mut body = vec![0u8; block_size as usize];
    src.read_exact(&mut body).map_err(io_to_codec)?;

    let mut full = decode_body(&body)?;
    let raw_tags = {
        let mut buf = Vec::new();
        encode_data(&mut buf, &full.data).map_err(RecordCodecError::from)?;
        buf
    };
    full.data = Data::new();

    Ok(LazyRecord {
        prefix: full,
        raw_tags,
        data: OnceCell::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{CigarOp, CigarOpKind};

    #[test]
    fn default_record_encodes_like_noodles_fixture() {
        // Matches other_examples's `test_encode_with_default_fields`.
        let rec = Record::new();
        let bytes = encode_to_vec(&rec).unwrap();
        // Skip the block_size prefix (4 bytes); compare the body.
        let expected_body: &[u8] = &[
            0xff, 0xff, 0xff, 0xff, // ref_id = -1
            0xff, 0xff, 0xff, 0xff, // pos = -1
            0x02, // l_read_name = 2
            0xff, // mapq = 255
            0x48, 0x12, // bin = 4680
            0x00, 0x00, // n_cigar_op = 0
            0x04, 0x00, // flag = 4 (UNMAPPED, our Record::default)
            0x00, 0x00, 0x00, 0x00, // l_seq = 0
            0xff, 0xff, 0xff, 0xff, // next_ref_id = -1
            0xff, 0xff, 0xff, 0xff, // next_pos = -1
            0x00, 0x00, 0x00, 0x00, // tlen = 0
            0x2a, 0x00, // read_name = "*\0"
        ];
        assert_eq!(&bytes[4..], expected_body);
    }

    #[test]
    fn round_trip_with_cigar_sequence_quality_and_tags() {
        let mut rec = Record::new();
        rec.name = b"r0".to_vec();
        rec.flags = Flags::new(Flags::SEGMENTED | Flags::FIRST_SEGMENT);
        rec.reference_sequence_id = Some(1);
        rec.alignment_start = Some(9);
        rec.mapping_quality = Some(13);
        rec.cigar = Cigar(vec![
            CigarOp::new(CigarOpKind::Match, 3),
            CigarOp::new(CigarOpKind::SoftClip, 1),
        ]);
        rec.mate_reference_sequence_id = Some(1);
        rec.mate_alignment_start = Some(22);
        rec.template_length = 144;
        rec.sequence = Sequence::from_ascii(b"ACGT");
        rec.quality_scores = vec![45, 35, 43, 50];
        rec.data.insert(Tag::new(b'N', b'H'), Value::Int32(1));

        let bytes = encode_to_vec(&rec).unwrap();
        let mut cur = io::Cursor::new(bytes);
        let decoded = decode(&mut cur).unwrap();

        assert_eq!(decoded.name, rec.name);
        assert_eq!(decoded.flags, rec.flags);
        assert_eq!(decoded.reference_sequence_id, rec.reference_sequence_id);
        assert_eq!(decoded.alignment_start, rec.alignment_start);
        assert_eq!(decoded.mapping_quality, rec.mapping_quality);
        assert_eq!(decoded.cigar, rec.cigar);
        assert_eq!(decoded.mate_reference_sequence_id, rec.mate_reference_sequence_id);
        assert_eq!(decoded.mate_alignment_start, rec.mate_alignment_start);
        assert_eq!(decoded.template_length, rec.template_length);
        assert_eq!(decoded.sequence, rec.sequence);
        assert_eq!(decoded.quality_scores, rec.quality_scores);
        assert_eq!(decoded.data, rec.data);
    }

    #[test]
    fn missing_quality_scores_round_trip_as_0xff() {
        let mut rec = Record::new();
        rec.sequence = Sequence::from_ascii(b"ACGT");
        rec.quality_scores = Vec::new();

        let bytes = encode_to_vec(&rec).unwrap();
        let mut cur = io::Cursor::new(bytes);
        let decoded = decode(&mut cur).unwrap();
        assert!(decoded.quality_scores.is_empty());
    }

    #[test]
    fn array_tag_round_trips() {
        let mut rec = Record::new();
        rec.data.insert(Tag::new(b'C', b'G'), Value::Int32Array(vec![1, 2, 3]));

        let bytes = encode_to_vec(&rec).unwrap();
        let mut cur = io::Cursor::new(bytes);
        let decoded = decode(&mut cur).unwrap();
        assert_eq!(decoded.data.get(Tag::new(b'C', b'G')), Some(&Value::Int32Array(vec![1, 2, 3])));
    }

    #[test]
    fn hex_tag_round_trips_through_an_ascii_hex_wire_form() {
        let mut rec = Record::new();
        rec.data.insert(Tag::new(b'B', b'H'), Value::Hex(vec![0x1a, 0x2b, 0x3f]));

        let bytes = encode_to_vec(&rec).unwrap();
        let mut cur = io::Cursor::new(bytes);
        let decoded = decode(&mut cur).unwrap();
        assert_eq!(decoded.data.get(Tag::new(b'B', b'H')), Some(&Value::Hex(vec![0x1a, 0x2b, 0x3f])));
    }

    #[test]
    fn invalid_hex_digits_are_rejected() {
        let mut body = Vec::new();
        binary::write_i32_le(&mut body, -1).unwrap();
        binary::write_i32_le(&mut body, -1).unwrap();
        binary::write_u8(&mut body, 1).unwrap();
        binary::write_u8(&mut body, 255).unwrap();
        binary::write_u16_le(&mut body, 0).unwrap();
        binary::write_u16_le(&mut body, 0).unwrap();
        binary::write_u16_le(&mut body, 0).unwrap();
        binary::write_u32_le(&mut body, 0).unwrap();
        binary::write_i32_le(&mut body, -1).unwrap();
        binary::write_i32_le(&mut body, -1).unwrap();
        binary::write_i32_le(&mut body, 0).unwrap();
        binary::write_cstring(&mut body, b"").unwrap();
        body.extend_from_slice(b"BH"); // tag
        body.push(b'H'); // type
        binary::write_cstring(&mut body, b"zz").unwrap(); // not valid hex

        let mut full = Vec::new();
        binary::write_u32_le(&mut full, body.len() as u32).unwrap();
        full.extend_from_slice(&body);

        let mut cur = io::Cursor::new(full);
        let err = decode(&mut cur).unwrap_err();
        assert!(matches!(err, RecordCodecError::InvalidHexDigits));
    }

    #[test]
    fn lazy_decode_materializes_tags_on_demand() {
        let mut rec = Record::new();
        rec.data.insert(Tag::new(b'N', b'H'), Value::Int32(7));

        let bytes = encode_to_vec(&rec).unwrap();
        let mut cur = io::Cursor::new(bytes);
        let lazy = decode_lazy(&mut cur).unwrap();
        assert!(lazy.fields().name.is_empty());
        let data = lazy.data().unwrap();
        assert_eq!(data.get(Tag::new(b'N', b'H')), Some(&Value::Int32(7)));
    }

    #[test]
    fn invalid_cigar_operator_is_rejected() {
        let mut body = Vec::new();
        binary::write_i32_le(&mut body, -1).unwrap(); // ref_id
        binary::write_i32_le(&mut body, -1).unwrap(); // pos
        binary::write_u8(&mut body, 1).unwrap(); // l_read_name
        binary::write_u8(&mut body, 255).unwrap(); // mapq
        binary::write_u16_le(&mut body, 0).unwrap(); // bin
        binary::write_u16_le(&mut body, 1).unwrap(); // n_cigar_op
        binary::write_u16_le(&mut body, 0).unwrap(); // flag
        binary::write_u32_le(&mut body, 0).unwrap(); // n_seq
        binary::write_i32_le(&mut body, -1).unwrap();
        binary::write_i32_le(&mut body, -1).unwrap();
        binary::write_i32_le(&mut body, 0).unwrap();
        binary::write_cstring(&mut body, b"").unwrap();
        binary::write_u32_le(&mut body, 0xf).unwrap(); // op code 15: invalid

        let mut full = Vec::new();
        binary::write_u32_le(&mut full, body.len() as u32).unwrap();
        full.extend_from_slice(&body);

        let mut cur = io::Cursor::new(full);
        let err = decode(&mut cur).unwrap_err();
        assert!(matches!(err, RecordCodecError::InvalidCigarOp(15)));
    }
}
