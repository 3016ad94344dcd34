//! JS5 compression envelope codec
//!
//! Every container in the JS5 cache is wrapped in a small envelope: a
//! one-byte compression tag, a big-endian compressed size, and (for
//! compressed containers) a big-endian decompressed size, followed by
//! the payload. This crate decodes that envelope and dispatches to the
//! matching decompressor.

pub mod decompress;
pub mod error;

pub use decompress::{CompressionKind, decompress, decompress_with_limit};
pub use error::{Error, Result};

/// Largest decompressed size accepted before a container is assumed to
/// be corrupt. Callers can override this per call with
/// [`decompress_with_limit`].
pub const DEFAULT_MAX_DECOMPRESSED_SIZE: usize = 15_000_000;
