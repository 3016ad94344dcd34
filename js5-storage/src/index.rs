//! Index file parsing
//!
//! An index file is a flat array of 6-byte records: a 3-byte
//! big-endian size followed by a 3-byte big-endian sector number. The
//! record's position is the entry id. An [`Index`] is built wholesale
//! from the file's bytes and never mutated afterwards.

use tracing::trace;

use crate::sector::SECTOR_LEN;
use crate::types::IndexEntry;

/// Length of one index record on disk
pub const INDEX_ENTRY_LEN: usize = 6;

/// In-memory index for one category.
#[derive(Debug, Clone)]
pub struct Index {
    entries: Vec<IndexEntry>,
}

impl Index {
    /// Parse an index from the raw bytes of an index file.
    ///
    /// Sector numbers are converted to byte offsets here, so lookups
    /// hand back positions directly usable against the data file. A
    /// trailing partial record is ignored.
    pub fn parse(data: &[u8]) -> Self {
        let count = data.len() / INDEX_ENTRY_LEN;
        let mut entries = Vec::with_capacity(count);

        for id in 0..count {
            let b = &data[id * INDEX_ENTRY_LEN..(id + 1) * INDEX_ENTRY_LEN];
            let size = u32::from(b[0]) << 16 | u32::from(b[1]) << 8 | u32::from(b[2]);
            let sector = u64::from(b[3]) << 16 | u64::from(b[4]) << 8 | u64::from(b[5]);

            entries.push(IndexEntry {
                id: id as u32,
                size,
                offset: sector * SECTOR_LEN as u64,
            });
        }

        trace!("Parsed index with {} entries", entries.len());
        Self { entries }
    }

    /// Look up an entry by id.
    pub fn get(&self, id: u32) -> Option<&IndexEntry> {
        self.entries.get(id as usize)
    }

    /// Number of entries (including zero-size ones).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all entries in id order.
    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.iter()
    }
}
