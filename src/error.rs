//! Crate-wide error type.
//!
//! Each subsystem (`bgzf`, `record::codec`, `index`, `bai`) defines its own
//! typed error enum; this type is the seam where the writer/reader
//! orchestration layers fold those into one value, attaching diagnostic
//! context (byte offset, reference index) per the propagation rules each
//! subsystem documents.

use std::io;

use thiserror::Error;

use crate::bai::BaiError;
use crate::bgzf::BgzfError;
use crate::index::StateError;
use crate::record::codec::RecordCodecError;
use crate::validation::ValidationError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("BGZF error: {0}")]
    Bgzf(#[from] BgzfError),

    #[error("record at byte offset {offset}: {source}")]
    RecordAtOffset {
        offset: u64,
        #[source]
        source: RecordCodecError,
    },

    #[error("record codec error: {0}")]
    RecordCodec(#[from] RecordCodecError),

    #[error("index error for reference {reference_index}: {source}")]
    IndexAtReference {
        reference_index: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("BAI error: {0}")]
    Bai(#[from] BaiError),

    #[error("illegal state transition: {0}")]
    State(#[from] StateError),

    #[error("validation failed: {0:?}")]
    Validation(Vec<ValidationError>),

    #[error("index-only failure (BAM stream already flushed): {0}")]
    IndexOnly(Box<Error>),

    #[error("no index is attached to this file")]
    NoIndex,

    #[error("index reference count does not match BAM sequence dictionary (index has {index_count}, header has {header_count})")]
    IndexSequenceMismatch {
        index_count: usize,
        header_count: usize,
    },

    #[error("operation attempted after close()")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
