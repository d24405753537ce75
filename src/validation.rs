//! Record semantic validity (§4.C `is_valid`) and the stringency reporter
//! that gates how a caller reacts to it (§6.6, §7).

use thiserror::Error;

use crate::error::Error;

/// One semantic issue a [`crate::record::Record`] can have, independent of
/// whether it decodes/encodes cleanly (§4.C).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("proper-pair flag set on a read that is not part of a pair")]
    InvalidFlagProperPair,
    #[error("mapping quality is not representable (must be < 256)")]
    InvalidMappingQuality,
    #[error("alignment start and reference sequence must both be set or both unset")]
    InvalidAlignmentStart,
    #[error("template length magnitude exceeds 2^29")]
    InvalidInsertSize,
    #[error("alignment end falls beyond the end of its reference sequence")]
    CigarMapsOffReference,
    #[error("quality scores length does not match the read length")]
    MismatchReadLengthAndQualsLength,
}

/// Reader/writer-configured reaction to a batch of [`ValidationError`]s
/// (§6.6, §9: "passed explicitly... not as process-wide state").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stringency {
    /// Validation failures abort the operation.
    Strict,
    /// Validation failures are logged and the operation continues.
    #[default]
    Lenient,
    /// Validation failures are dropped without any report.
    Silent,
}

/// Applies a [`Stringency`] policy to a batch of validation errors observed
/// while decoding or before encoding one record (§6.6).
#[derive(Debug, Clone, Copy, Default)]
pub struct Reporter {
    stringency: Stringency,
}

impl Reporter {
    pub fn new(stringency: Stringency) -> Self {
        Self { stringency }
    }

    pub fn stringency(&self) -> Stringency {
        self.stringency
    }

    /// `Strict` turns a non-empty error list into an `Err`; `Lenient` logs a
    /// warning per error and returns `Ok`; `Silent` returns `Ok` unconditionally.
    pub fn report(&self, errors: &[ValidationError]) -> Result<(), Error> {
        if errors.is_empty() {
            return Ok(());
        }
        match self.stringency {
            Stringency::Strict => Err(Error::Validation(errors.to_vec())),
            Stringency::Lenient => {
                for err in errors {
                    log::warn!("record validation: {err}");
                }
                Ok(())
            }
            Stringency::Silent => Ok(()),
        }
    }
}
