//! Error types for reference table decoding

use thiserror::Error;

/// Result type for reference table operations
pub type Result<T> = std::result::Result<T, Error>;

/// Reference table error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Buffer ends before a required field
    #[error("Short input: needed {needed} more bytes, {available} available")]
    ShortInput { needed: usize, available: usize },

    /// Version byte outside the supported 5-7 range
    #[error("Unsupported reference table version: {0}")]
    UnsupportedVersion(i8),

    /// Entry count larger than the remaining buffer could encode
    #[error("Implausible entry count {count}: only {available} bytes remain")]
    ImplausibleEntryCount { count: u32, available: usize },

    /// Accumulated entry ids span a range too large to index
    #[error("Entry id range too large: {size} slots exceeds maximum {max}")]
    IdRangeTooLarge { size: u64, max: u32 },
}
