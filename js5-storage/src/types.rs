//! Common types used throughout the cache store

use std::path::PathBuf;

/// Category holding the reference tables for all other categories, by
/// convention of the client: entry `n` of category 255 is the
/// reference table describing category `n`.
pub const REFERENCE_CATEGORY: u8 = 255;

/// File name of the main data file inside the cache directory
pub const DATA_FILE_NAME: &str = "main_file_cache.dat2";

/// File name of a category's index file inside the cache directory
pub fn index_file_name(category: u8) -> String {
    format!("main_file_cache.idx{category}")
}

/// One logical cache entry as described by an index: its total
/// reconstructed length and the byte offset of its first sector in the
/// main data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// Entry id, implicit from the record's position in the index file
    pub id: u32,
    /// Total reconstructed byte length
    pub size: u32,
    /// Byte offset of the first sector (sector number x 520)
    pub offset: u64,
}

/// Configuration for a cache store
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Directory holding the data and index files
    pub data_path: PathBuf,
    /// Largest decompressed entry size accepted (default: 15,000,000)
    pub max_decompressed_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("cache"),
            max_decompressed_size: js5_compression::DEFAULT_MAX_DECOMPRESSED_SIZE,
        }
    }
}
