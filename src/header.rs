//! BAM-level framing of the SAM text header block (§6.6, §4.G operation 1).
//!
//! This module owns only the binary framing BAM wraps around the header:
//! a length-prefixed text blob followed by a binary sequence dictionary. It
//! does not parse SAM header syntax — that's the external *text SAM codec*
//! collaborator's job (§6.6) — beyond pulling the `@SQ` `SN`/`LN` pairs a
//! caller supplies directly, since the binning index needs reference
//! lengths to size its per-reference linear index.

use std::io::{self, Read, Write};

use crate::binary;

/// One `@SQ` entry: reference name and length, as BAM's binary sequence
/// dictionary carries them (§6.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSequenceEntry {
    pub name: String,
    pub length: usize,
}

impl ReferenceSequenceEntry {
    pub fn new(name: impl Into<String>, length: usize) -> Self {
        Self { name: name.into(), length }
    }
}

/// The opaque SAM text header plus the binary sequence dictionary BAM
/// stores alongside it (§6.6 `SamHeader`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SamHeader {
    pub text: String,
    pub reference_sequences: Vec<ReferenceSequenceEntry>,
}

impl SamHeader {
    pub fn new(text: impl Into<String>, reference_sequences: Vec<ReferenceSequenceEntry>) -> Self {
        Self { text: text.into(), reference_sequences }
    }

    pub fn reference_length(&self, ref_id: usize) -> Option<usize> {
        self.reference_sequences.get(ref_id).map(|r| r.length)
    }

    /// Write the `l_text`-prefixed text block followed by `n_ref` and each
    /// `{l_name, name, l_ref}` entry (§6.1).
    pub fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        binary::write_len_prefixed_string(w, &self.text)?;
        binary::write_i32_le(w, self.reference_sequences.len() as i32)?;
        for r in &self.reference_sequences {
            binary::write_i32_le(w, r.name.len() as i32 + 1)?;
            binary::write_cstring(w, r.name.as_bytes())?;
            binary::write_i32_le(w, r.length as i32)?;
        }
        Ok(())
    }

    /// Inverse of [`SamHeader::write`].
    pub fn read<R: Read>(r: &mut R) -> io::Result<Self> {
        let text = binary::read_len_prefixed_string(r)?;
        let n_ref = binary::read_i32_le(r)?.max(0) as usize;
        let mut reference_sequences = Vec::with_capacity(n_ref);
        for _ in 0..n_ref {
            let l_name = binary::read_i32_le(r)?.max(0) as usize;
            let name_bytes = binary::read_cstring(r, l_name)?;
            let name = String::from_utf8(name_bytes)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            let l_ref = binary::read_i32_le(r)?.max(0) as usize;
            reference_sequences.push(ReferenceSequenceEntry::new(name, l_ref));
        }
        Ok(Self { text, reference_sequences })
    }

    /// Whether the header declares BAM `SO:coordinate` sort order — the
    /// precondition for building a BAI during a write (§4.G operation 1,
    /// §6.5 `create_index`). Parsed out of the `@HD` line's `SO` field
    /// without a full SAM grammar, matching §6.6's stable-boundary rule.
    pub fn is_coordinate_sorted(&self) -> bool {
        self.text
            .lines()
            .find(|l| l.starts_with("@HD"))
            .map(|hd| hd.split('\t').any(|field| field == "SO:coordinate"))
            .unwrap_or(false)
    }
}
