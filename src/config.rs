//! Recognized configuration options (§6.5), passed explicitly into reader
//! and writer construction rather than held as process-wide state (§9).

use crate::validation::Stringency;

/// Default BGZF compression level (§6.5).
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 5;
/// Default I/O buffer size in bytes; `0` requests the implementation
/// default instead (§6.5).
pub const DEFAULT_BUFFER_SIZE: usize = 131_072;

#[derive(Debug, Clone)]
pub struct WriterConfig {
    pub compression_level: u32,
    pub create_index: bool,
    pub create_md5: bool,
    pub async_io: bool,
    pub buffer_size: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            create_index: false,
            create_md5: false,
            async_io: false,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl WriterConfig {
    pub fn resolved_buffer_size(&self) -> usize {
        if self.buffer_size == 0 {
            DEFAULT_BUFFER_SIZE
        } else {
            self.buffer_size
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReaderConfig {
    pub buffer_size: usize,
    pub validation_stringency: Stringency,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            validation_stringency: Stringency::default(),
        }
    }
}

impl ReaderConfig {
    pub fn resolved_buffer_size(&self) -> usize {
        if self.buffer_size == 0 {
            DEFAULT_BUFFER_SIZE
        } else {
            self.buffer_size
        }
    }
}
