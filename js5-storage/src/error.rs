//! Error types for cache storage operations

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Index not loaded for category {0}")]
    IndexNotLoaded(u8),

    #[error("Entry {id} not found in category {category}")]
    EntryNotFound { category: u8, id: u32 },

    #[error("Entry {0} has no data")]
    EmptyEntry(u32),

    #[error(
        "Malformed sector chain for entry {id} at offset {position}: \
         header names entry {found_id} chunk {found_chunk}, expected chunk {expected_chunk}"
    )]
    MalformedSectorChain {
        id: u32,
        position: u64,
        expected_chunk: u16,
        found_id: u32,
        found_chunk: u16,
    },

    #[error("Compression error: {0}")]
    Compression(#[from] js5_compression::Error),

    #[error("Reference table error: {0}")]
    Reference(#[from] js5_reference::Error),
}

pub type Result<T> = std::result::Result<T, CacheError>;
