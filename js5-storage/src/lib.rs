//! JS5 cache storage
//!
//! A JS5 cache is a single flat data file (`main_file_cache.dat2`)
//! divided into 520-byte sectors, plus one index file per category
//! (`main_file_cache.idx0` through `idx255`). An index maps entry ids
//! to a size and a starting sector; the entry's bytes are scattered
//! across a chain of sectors whose headers name the entry and its
//! chunk position, so a walk can detect any break in the chain.
//!
//! This crate reconstructs entries from that layout and composes the
//! result with [`js5_compression`] for decompression and
//! [`js5_reference`] for category 255's metadata tables. It is
//! strictly read-only.

pub mod error;
pub mod index;
pub mod sector;
pub mod store;
pub mod types;

pub use error::{CacheError, Result};
pub use index::Index;
pub use sector::{SECTOR_LEN, SectorHeader};
pub use store::CacheStore;
pub use types::{CacheConfig, IndexEntry, REFERENCE_CATEGORY};
