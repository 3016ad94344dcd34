//! Main cache store implementation

use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use js5_reference::{ReferenceTable, decode_reference_table};

use crate::error::{CacheError, Result};
use crate::index::Index;
use crate::sector::{
    EXTENDED_HEADER_LEN, SECTOR_LEN, STANDARD_HEADER_LEN, SectorHeader,
};
use crate::types::{CacheConfig, DATA_FILE_NAME, IndexEntry, REFERENCE_CATEGORY, index_file_name};

/// Read-only store over a JS5 cache directory.
///
/// The data file handle is shared behind a mutex; every chain walk
/// seeks and reads under the lock, so concurrent requests are safe but
/// serialized. Category indices live in a sparse map, loaded on demand
/// and only ever replaced wholesale.
pub struct CacheStore {
    config: CacheConfig,
    data: Mutex<File>,
    indices: DashMap<u8, Arc<Index>>,
}

impl CacheStore {
    /// Open the cache described by `config`.
    ///
    /// Only the main data file is opened here; indices are loaded
    /// separately via [`load_index`](Self::load_index) or
    /// [`find_indices`](Self::find_indices).
    pub fn open(config: CacheConfig) -> Result<Self> {
        let data_path = config.data_path.join(DATA_FILE_NAME);
        let data = File::open(&data_path)?;

        info!("Opened cache data file {:?}", data_path);

        Ok(Self {
            config,
            data: Mutex::new(data),
            indices: DashMap::new(),
        })
    }

    /// Open the cache rooted at `root` with default configuration.
    pub fn open_path(root: impl AsRef<Path>) -> Result<Self> {
        Self::open(CacheConfig {
            data_path: root.as_ref().to_path_buf(),
            ..CacheConfig::default()
        })
    }

    /// The configuration this store was opened with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Load (or reload) the index for one category, replacing any
    /// previously loaded index wholesale. Returns the entry count.
    pub fn load_index(&self, category: u8) -> Result<usize> {
        let path = self.config.data_path.join(index_file_name(category));
        let data = std::fs::read(&path)?;
        let index = Index::parse(&data);
        let count = index.len();

        debug!("Loaded index for category {}: {} entries", category, count);

        self.indices.insert(category, Arc::new(index));
        Ok(count)
    }

    /// Probe all 256 categories and load every index file present.
    /// Missing files are skipped; unreadable ones are logged and
    /// skipped. Returns the number of indices loaded.
    pub fn find_indices(&self) -> usize {
        let mut loaded = 0;

        for category in 0..=u8::MAX {
            match self.load_index(category) {
                Ok(count) => {
                    trace!("Found index {}: {} entries", category, count);
                    loaded += 1;
                }
                Err(CacheError::Io(e)) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    warn!("Failed to load index for category {}: {}", category, e);
                }
            }
        }

        info!("Loaded {} category indices", loaded);
        loaded
    }

    /// The loaded index for `category`, if any.
    pub fn index(&self, category: u8) -> Option<Arc<Index>> {
        self.indices
            .get(&category)
            .map(|index| Arc::clone(index.value()))
    }

    /// Sorted ids of all loaded categories.
    pub fn categories(&self) -> Vec<u8> {
        let mut ids: Vec<u8> = self.indices.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        ids
    }

    /// Look up the index entry for `(category, id)`.
    pub fn entry(&self, category: u8, id: u32) -> Result<IndexEntry> {
        let index = self
            .indices
            .get(&category)
            .ok_or(CacheError::IndexNotLoaded(category))?;
        index
            .get(id)
            .copied()
            .ok_or(CacheError::EntryNotFound { category, id })
    }

    /// Read the raw (still enveloped) bytes of `(category, id)`.
    pub fn read_raw(&self, category: u8, id: u32) -> Result<Vec<u8>> {
        let entry = self.entry(category, id)?;
        self.read_raw_entry(&entry)
    }

    /// Reconstruct an entry's bytes by walking its sector chain.
    ///
    /// Every sector header must name the entry and the next chunk in
    /// sequence; any mismatch aborts the read with no partial data,
    /// since a truncated or misaligned entry is indistinguishable from
    /// corruption and must not reach the decompressor.
    pub fn read_raw_entry(&self, entry: &IndexEntry) -> Result<Vec<u8>> {
        if entry.size == 0 {
            return Err(CacheError::EmptyEntry(entry.id));
        }

        let extended = entry.id > 0xFFFF;
        let capacity = SectorHeader::payload_capacity(entry.id);

        let mut out = vec![0u8; entry.size as usize];
        let mut position = entry.offset;
        let mut written = 0usize;
        let mut chunk = 0u16;

        let mut file = self.data.lock();

        while written < out.len() {
            file.seek(SeekFrom::Start(position))?;

            let header = if extended {
                let mut buf = [0u8; EXTENDED_HEADER_LEN];
                file.read_exact(&mut buf)?;
                SectorHeader::parse_extended(&buf)
            } else {
                let mut buf = [0u8; STANDARD_HEADER_LEN];
                file.read_exact(&mut buf)?;
                SectorHeader::parse_standard(&buf)
            };

            if header.entry_id != entry.id || header.chunk != chunk {
                return Err(CacheError::MalformedSectorChain {
                    id: entry.id,
                    position,
                    expected_chunk: chunk,
                    found_id: header.entry_id,
                    found_chunk: header.chunk,
                });
            }

            let take = capacity.min(out.len() - written);
            file.read_exact(&mut out[written..written + take])?;

            trace!(
                "Read chunk {} of entry {}: {} bytes, next sector {}",
                chunk, entry.id, take, header.next_sector
            );

            position = header.next_sector * SECTOR_LEN as u64;
            chunk += 1;
            written += take;
        }

        Ok(out)
    }

    /// Read and decompress `(category, id)`.
    ///
    /// Either stage's failure is terminal: a failed chain walk returns
    /// no raw bytes, and a failed decompression returns nothing of the
    /// assembled input.
    pub fn read_decompressed(&self, category: u8, id: u32) -> Result<Vec<u8>> {
        let raw = self.read_raw(category, id)?;
        let (payload, kind) =
            js5_compression::decompress_with_limit(&raw, self.config.max_decompressed_size)?;

        debug!(
            "Entry {}/{}: {} raw bytes -> {} bytes ({:?})",
            category,
            id,
            raw.len(),
            payload.len(),
            kind
        );

        Ok(payload)
    }

    /// Decode the reference table describing `category`.
    ///
    /// Reference tables live in category 255, one entry per described
    /// category.
    pub fn read_reference_table(&self, category: u8) -> Result<ReferenceTable> {
        let data = self.read_decompressed(REFERENCE_CATEGORY, u32::from(category))?;
        Ok(decode_reference_table(&data)?)
    }
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("data_path", &self.config.data_path)
            .field("loaded_categories", &self.indices.len())
            .finish()
    }
}
