//! JS5 reference table parsing
//!
//! Category 255 of a JS5 cache holds one reference table per category:
//! a versioned, flag-driven record listing every entry id in that
//! category together with its checksum, revision, and optional name
//! hash and whirlpool digest. This crate decodes those tables from
//! already-decompressed bytes, along with the forward-only byte cursor
//! the format requires (big-endian fixed-width fields plus the
//! 2-or-4-byte "smart" integer).

pub mod buffer;
pub mod error;
pub mod table;

pub use buffer::ByteCursor;
pub use error::{Error, Result};
pub use table::{MAX_TABLE_SIZE, ReferenceTable, decode_reference_table};
