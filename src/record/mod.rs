//! In-memory alignment record model (§3, §4.C).

pub mod codec;

use std::cell::Cell;

use crate::index::reg2bin::{reg2bin, UNMAPPED_BIN};
use crate::validation::ValidationError;

/// Sentinel BAM reference-sequence index for an unmapped read or mate.
pub const NO_REFERENCE: i32 = -1;
/// BAM's on-wire sentinel for "no position" (`pos == -1`).
pub const NO_POSITION: i32 = -1;
/// `mapq == 255` means "mapping quality not available" (§3).
pub const MISSING_MAPPING_QUALITY: u8 = 255;
/// `qual == 0xFF` means "no quality scores" (§3, §4.D).
pub const MISSING_QUALITY: u8 = 0xff;

/// Alignment flag bits (§3 "flags (16 bit)").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flags(u16);

impl Flags {
    pub const SEGMENTED: u16 = 0x1;
    pub const PROPERLY_ALIGNED: u16 = 0x2;
    pub const UNMAPPED: u16 = 0x4;
    pub const MATE_UNMAPPED: u16 = 0x8;
    pub const REVERSE_COMPLEMENTED: u16 = 0x10;
    pub const MATE_REVERSE_COMPLEMENTED: u16 = 0x20;
    pub const FIRST_SEGMENT: u16 = 0x40;
    pub const LAST_SEGMENT: u16 = 0x80;
    pub const SECONDARY: u16 = 0x100;
    pub const QC_FAIL: u16 = 0x200;
    pub const DUPLICATE: u16 = 0x400;
    pub const SUPPLEMENTARY: u16 = 0x800;

    pub fn new(bits: u16) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn contains(self, bit: u16) -> bool {
        self.0 & bit != 0
    }

    pub fn set(&mut self, bit: u16, value: bool) {
        if value {
            self.0 |= bit;
        } else {
            self.0 &= !bit;
        }
    }

    pub fn is_unmapped(self) -> bool {
        self.contains(Self::UNMAPPED)
    }

    pub fn is_segmented(self) -> bool {
        self.contains(Self::SEGMENTED)
    }

    pub fn is_properly_aligned(self) -> bool {
        self.contains(Self::PROPERLY_ALIGNED)
    }
}

/// One CIGAR operator code (§4.D "CIGAR operator codes").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CigarOpKind {
    Match = 0,
    Insertion = 1,
    Deletion = 2,
    Skip = 3,
    SoftClip = 4,
    HardClip = 5,
    Padding = 6,
    SequenceMatch = 7,
    SequenceMismatch = 8,
}

impl CigarOpKind {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Match),
            1 => Some(Self::Insertion),
            2 => Some(Self::Deletion),
            3 => Some(Self::Skip),
            4 => Some(Self::SoftClip),
            5 => Some(Self::HardClip),
            6 => Some(Self::Padding),
            7 => Some(Self::SequenceMatch),
            8 => Some(Self::SequenceMismatch),
            _ => None,
        }
    }

    pub fn code(self) -> u32 {
        self as u32
    }

    /// Operators that advance a position along the reference sequence
    /// (`M,D,N,=,X`), used by alignment-end derivation (§4.C).
    pub fn consumes_reference(self) -> bool {
        matches!(
            self,
            Self::Match | Self::Deletion | Self::Skip | Self::SequenceMatch | Self::SequenceMismatch
        )
    }

    /// Operators that consume a base from the read sequence.
    pub fn consumes_read(self) -> bool {
        matches!(
            self,
            Self::Match
                | Self::Insertion
                | Self::SoftClip
                | Self::SequenceMatch
                | Self::SequenceMismatch
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CigarOp {
    pub kind: CigarOpKind,
    pub len: u32,
}

impl CigarOp {
    pub fn new(kind: CigarOpKind, len: u32) -> Self {
        Self { kind, len }
    }

    /// Pack into the wire representation: high 28 bits = length, low 4
    /// bits = op code (§4.D).
    pub fn pack(self) -> u32 {
        (self.len << 4) | self.kind.code()
    }

    pub fn unpack(raw: u32) -> Option<Self> {
        let kind = CigarOpKind::from_code(raw & 0xf)?;
        Some(Self { kind, len: raw >> 4 })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cigar(pub Vec<CigarOp>);

impl Cigar {
    pub fn ops(&self) -> &[CigarOp] {
        &self.0
    }

    /// Sum of reference-consuming operator lengths (§4.C alignment-end
    /// derivation).
    pub fn reference_len(&self) -> u32 {
        self.0
            .iter()
            .filter(|op| op.kind.consumes_reference())
            .map(|op| op.len)
            .sum()
    }

    pub fn read_len(&self) -> u32 {
        self.0
            .iter()
            .filter(|op| op.kind.consumes_read())
            .map(|op| op.len)
            .sum()
    }
}

/// Nucleotide base, 4-bit packed per §3 `=ACMGRSVTWYHKDBN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Base {
    Eq,
    A,
    C,
    M,
    G,
    R,
    S,
    V,
    T,
    W,
    Y,
    H,
    K,
    D,
    B,
    N,
}

const BASE_TABLE: [Base; 16] = [
    Base::Eq,
    Base::A,
    Base::C,
    Base::M,
    Base::G,
    Base::R,
    Base::S,
    Base::V,
    Base::T,
    Base::W,
    Base::Y,
    Base::H,
    Base::K,
    Base::D,
    Base::B,
    Base::N,
];

impl Base {
    pub fn from_nibble(nibble: u8) -> Self {
        BASE_TABLE[(nibble & 0xf) as usize]
    }

    pub fn to_nibble(self) -> u8 {
        BASE_TABLE.iter().position(|&b| b == self).unwrap() as u8
    }

    pub fn from_ascii(c: u8) -> Self {
        match c.to_ascii_uppercase() {
            b'=' => Self::Eq,
            b'A' => Self::A,
            b'C' => Self::C,
            b'M' => Self::M,
            b'G' => Self::G,
            b'R' => Self::R,
            b'S' => Self::S,
            b'V' => Self::V,
            b'T' => Self::T,
            b'W' => Self::W,
            b'Y' => Self::Y,
            b'H' => Self::H,
            b'K' => Self::K,
            b'D' => Self::D,
            b'B' => Self::B,
            _ => Self::N,
        }
    }

    pub fn to_ascii(self) -> u8 {
        b"=ACMGRSVTWYHKDBN"[self.to_nibble() as usize]
    }
}

/// 4-bit packed base sequence (§3, §4.D `seq`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sequence {
    bases: Vec<Base>,
}

impl Sequence {
    pub fn new(bases: Vec<Base>) -> Self {
        Self { bases }
    }

    pub fn from_ascii(s: &[u8]) -> Self {
        Self {
            bases: s.iter().map(|&c| Base::from_ascii(c)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.bases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    pub fn bases(&self) -> &[Base] {
        &self.bases
    }
}

/// 16-bit packed 2-character attribute tag (§4.C).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag(pub [u8; 2]);

impl Tag {
    pub fn new(a: u8, b: u8) -> Self {
        Self([a, b])
    }
}

/// Attribute value, a tagged sum over every BAM tag type (§4.C, §4.D).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Float(f32),
    String(Vec<u8>),
    Character(u8),
    /// Decoded bytes of a `H` tag; the wire form is the ASCII hex string
    /// these bytes hex-encode to (§4.D).
    Hex(Vec<u8>),
    Int8Array(Vec<i8>),
    UInt8Array(Vec<u8>),
    Int16Array(Vec<i16>),
    UInt16Array(Vec<u16>),
    Int32Array(Vec<i32>),
    UInt32Array(Vec<u32>),
    Float32Array(Vec<f32>),
}

/// Insertion-ordered tag/value dictionary. A `Vec`, not a map, because
/// §4.D requires tags to round-trip in the order they were read or set
/// (never reordered).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Data(pub Vec<(Tag, Value)>);

impl Data {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn get(&self, tag: Tag) -> Option<&Value> {
        self.0.iter().find(|(t, _)| *t == tag).map(|(_, v)| v)
    }

    /// Insert or, if the tag is already present, overwrite its value in
    /// place (preserving original insertion position).
    pub fn insert(&mut self, tag: Tag, value: Value) {
        if let Some(slot) = self.0.iter_mut().find(|(t, _)| *t == tag) {
            slot.1 = value;
        } else {
            self.0.push((tag, value));
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Tag, Value)> {
        self.0.iter()
    }
}

/// An alignment record (§3).
#[derive(Debug, Clone)]
pub struct Record {
    pub name: Vec<u8>,
    pub flags: Flags,
    pub reference_sequence_id: Option<usize>,
    /// 1-based alignment start; `None` encodes BAM's `pos == -1`.
    pub alignment_start: Option<u32>,
    /// `None` encodes `mapq == 255` ("not available").
    pub mapping_quality: Option<u8>,
    pub cigar: Cigar,
    pub mate_reference_sequence_id: Option<usize>,
    pub mate_alignment_start: Option<u32>,
    pub template_length: i32,
    pub sequence: Sequence,
    pub quality_scores: Vec<u8>,
    pub data: Data,
    bin: Cell<Option<u16>>,
}

impl Default for Record {
    fn default() -> Self {
        Self {
            name: Vec::new(),
            flags: Flags::new(Flags::UNMAPPED),
            reference_sequence_id: None,
            alignment_start: None,
            mapping_quality: None,
            cigar: Cigar::default(),
            mate_reference_sequence_id: None,
            mate_alignment_start: None,
            template_length: 0,
            sequence: Sequence::default(),
            quality_scores: Vec::new(),
            data: Data::default(),
            bin: Cell::new(None),
        }
    }
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invalidate the cached bin. Every setter goes through this so a
    /// field mutation can never leave a stale bin behind (§4.C).
    fn touch(&mut self) {
        self.bin.set(None);
    }

    pub fn set_alignment_start(&mut self, start: Option<u32>) {
        self.alignment_start = start;
        self.touch();
    }

    pub fn set_cigar(&mut self, cigar: Cigar) {
        self.cigar = cigar;
        self.touch();
    }

    pub fn set_flags(&mut self, flags: Flags) {
        self.flags = flags;
        self.touch();
    }

    /// `start + ref_len - 1` when the CIGAR consumes any reference bases,
    /// else just `start` (§4.C alignment-end derivation). `None` when the
    /// record has no coordinate.
    pub fn alignment_end(&self) -> Option<u32> {
        let start = self.alignment_start?;
        let ref_len = self.cigar.reference_len();
        if ref_len > 0 {
            Some(start + ref_len - 1)
        } else {
            Some(start)
        }
    }

    /// Computed bin per §6.3, cached until the next mutation (§4.C).
    pub fn indexing_bin(&self) -> u16 {
        if let Some(b) = self.bin.get() {
            return b;
        }
        let bin = match (self.alignment_start, self.alignment_end()) {
            (Some(start), Some(end)) => reg2bin(start - 1, end) as u16,
            _ => UNMAPPED_BIN,
        };
        self.bin.set(Some(bin));
        bin
    }

    /// Enumerated semantic validity issues (§4.C `is_valid`); empty means
    /// valid. `INVALID_MAPPING_QUALITY` (MAPQ ≥ 256) can't occur through
    /// this type since `mapping_quality` is already a `u8`; the check
    /// exists as a wire-decode concern instead (`RecordCodecError`).
    pub fn validate(&self) -> Vec<ValidationError> {
        self.validate_with_reference_length(None)
    }

    /// As [`Record::validate`], additionally checking
    /// `CIGAR_MAPS_OFF_REFERENCE` when the containing reference sequence's
    /// length is known.
    pub fn validate_with_reference_length(&self, reference_length: Option<u32>) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.flags.is_properly_aligned() && !self.flags.is_segmented() {
            errors.push(ValidationError::InvalidFlagProperPair);
        }
        match (self.alignment_start, self.reference_sequence_id) {
            (Some(_), None) | (None, Some(_)) => {
                errors.push(ValidationError::InvalidAlignmentStart);
            }
            _ => {}
        }
        if self.template_length.unsigned_abs() as u64 > (1 << 29) {
            errors.push(ValidationError::InvalidInsertSize);
        }
        if !self.quality_scores.is_empty() && self.quality_scores.len() != self.sequence.len() {
            errors.push(ValidationError::MismatchReadLengthAndQualsLength);
        }
        if let (Some(end), Some(ref_len)) = (self.alignment_end(), reference_length) {
            if end > ref_len {
                errors.push(ValidationError::CigarMapsOffReference);
            }
        }

        errors
    }
}

impl std::fmt::Display for CigarOpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let c = match self {
            Self::Match => 'M',
            Self::Insertion => 'I',
            Self::Deletion => 'D',
            Self::Skip => 'N',
            Self::SoftClip => 'S',
            Self::HardClip => 'H',
            Self::Padding => 'P',
            Self::SequenceMatch => '=',
            Self::SequenceMismatch => 'X',
        };
        write!(f, "{c}")
    }
}

impl std::fmt::Display for Cigar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return write!(f, "*");
        }
        for op in &self.0 {
            write!(f, "{}{}", op.len, op.kind)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.bases.is_empty() {
            return write!(f, "*");
        }
        for base in &self.bases {
            write!(f, "{}", base.to_ascii() as char)?;
        }
        Ok(())
    }
}

/// Renders the record as a tab-separated SAM-ish line (reference id and
/// mate id shown numerically, since this type has no sequence-dictionary
/// name lookup of its own — §4.G `bamctl view` resolves names from the
/// header separately).
impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = String::from_utf8_lossy(&self.name);
        let rname = self.reference_sequence_id.map_or("*".to_string(), |id| id.to_string());
        let pos = self.alignment_start.unwrap_or(0);
        let mapq = self.mapping_quality.unwrap_or(255);
        let rnext = self.mate_reference_sequence_id.map_or("*".to_string(), |id| id.to_string());
        let pnext = self.mate_alignment_start.unwrap_or(0);
        let qual = if self.quality_scores.is_empty() {
            "*".to_string()
        } else {
            self.quality_scores.iter().map(|q| (q + 33) as char).collect::<String>()
        };

        write!(
            f,
            "{name}\t{}\t{rname}\t{pos}\t{mapq}\t{}\t{rnext}\t{pnext}\t{}\t{}\t{qual}",
            self.flags.bits(),
            self.cigar,
            self.template_length,
            self.sequence,
        )
    }
}
