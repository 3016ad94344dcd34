//! Error types for envelope parsing and decompression

use thiserror::Error;

/// Result type for envelope operations
pub type Result<T> = std::result::Result<T, Error>;

/// Envelope error types
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Input ends before a required field or the declared payload
    #[error("Truncated container: expected {expected} bytes, got {actual}")]
    TruncatedData { expected: usize, actual: usize },

    /// Unknown compression tag byte
    #[error("Unknown compression kind: {0}")]
    UnknownCompressionKind(u8),

    /// Declared decompressed size exceeds the configured bound
    #[error("Refusing to decompress: declared size {size} exceeds maximum {max}")]
    DecompressedSizeExceeded { size: usize, max: usize },

    /// Gzip payload does not start with the 0x1F 0x8B magic
    #[error("Invalid gzip header: {0:#04x} {1:#04x} (expected 0x1f 0x8b)")]
    InvalidGzipHeader(u8, u8),

    /// Decompression failed
    #[error("Decompression failed: {0}")]
    DecompressionFailed(String),
}
