//! Store-level tests against synthetic cache directories
//!
//! Every test writes its own `main_file_cache.dat2` and index files
//! into a temp directory, so the chain walk, envelope handling, and
//! reference table composition are exercised end to end.

use std::fs;
use std::path::Path;

use js5_storage::{CacheConfig, CacheError, CacheStore, SECTOR_LEN};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

/// Builds a main data file sector by sector.
struct DataFileBuilder {
    bytes: Vec<u8>,
}

impl DataFileBuilder {
    fn new() -> Self {
        // Sector 0 is left unused so chains never start there.
        Self {
            bytes: vec![0u8; SECTOR_LEN],
        }
    }

    /// Append an entry's sector chain and return its starting sector
    /// number.
    fn add_entry(&mut self, category: u8, id: u32, payload: &[u8]) -> u32 {
        let header_len = if id > 0xFFFF { 10 } else { 8 };
        let capacity = SECTOR_LEN - header_len;
        let first_sector = (self.bytes.len() / SECTOR_LEN) as u32;
        let chunk_count = payload.len().div_ceil(capacity);

        for (chunk, data) in payload.chunks(capacity).enumerate() {
            let next_sector = if chunk + 1 == chunk_count {
                0
            } else {
                first_sector + chunk as u32 + 1
            };

            let mut sector = Vec::with_capacity(SECTOR_LEN);
            if id > 0xFFFF {
                sector.extend_from_slice(&id.to_be_bytes());
            } else {
                sector.extend_from_slice(&(id as u16).to_be_bytes());
            }
            sector.extend_from_slice(&(chunk as u16).to_be_bytes());
            sector.extend_from_slice(&next_sector.to_be_bytes()[1..4]);
            sector.push(category);
            sector.extend_from_slice(data);
            sector.resize(SECTOR_LEN, 0);

            self.bytes.extend_from_slice(&sector);
        }

        first_sector
    }

    fn write(&self, root: &Path) {
        fs::write(root.join("main_file_cache.dat2"), &self.bytes).unwrap();
    }
}

/// Write an index file where record `id` points at (`size`, `sector`)
/// and every earlier record is empty.
fn write_index(root: &Path, category: u8, entries: &[(u32, u32, u32)]) {
    let max_id = entries.iter().map(|&(id, _, _)| id).max().unwrap_or(0);
    let mut bytes = vec![0u8; (max_id as usize + 1) * 6];

    for &(id, size, sector) in entries {
        let record = &mut bytes[id as usize * 6..(id as usize + 1) * 6];
        record[0..3].copy_from_slice(&size.to_be_bytes()[1..4]);
        record[3..6].copy_from_slice(&sector.to_be_bytes()[1..4]);
    }

    fs::write(root.join(format!("main_file_cache.idx{category}")), bytes).unwrap();
}

/// Wrap `payload` in a kind-0 (uncompressed) envelope.
fn plain_envelope(payload: &[u8]) -> Vec<u8> {
    let mut data = vec![0u8];
    data.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    data.extend_from_slice(payload);
    data
}

/// Wrap `plaintext` in a kind-2 (gzip) envelope.
fn gzip_envelope(plaintext: &[u8]) -> Vec<u8> {
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(plaintext).unwrap();
    let member = encoder.finish().unwrap();

    let mut data = vec![2u8];
    data.extend_from_slice(&(member.len() as u32).to_be_bytes());
    data.extend_from_slice(&(plaintext.len() as u32).to_be_bytes());
    data.extend_from_slice(&member);
    data
}

fn patterned(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

#[test]
fn reads_entry_across_three_sectors() {
    let dir = TempDir::new().unwrap();
    let payload = patterned(1300); // 512 + 512 + 276

    let mut data = DataFileBuilder::new();
    let sector = data.add_entry(0, 5, &payload);
    data.write(dir.path());
    write_index(dir.path(), 0, &[(5, payload.len() as u32, sector)]);

    let store = CacheStore::open_path(dir.path()).unwrap();
    assert_eq!(store.load_index(0).unwrap(), 6);

    let raw = store.read_raw(0, 5).unwrap();
    assert_eq!(raw, payload);
}

#[test]
fn corrupted_chunk_sequence_aborts_the_read() {
    let dir = TempDir::new().unwrap();
    let payload = patterned(1300);

    let mut data = DataFileBuilder::new();
    let sector = data.add_entry(0, 5, &payload);
    // Flip the chunk field of the second sector in the chain.
    let offset = (sector as usize + 1) * SECTOR_LEN + 3;
    data.bytes[offset] ^= 0x01;
    data.write(dir.path());
    write_index(dir.path(), 0, &[(5, payload.len() as u32, sector)]);

    let store = CacheStore::open_path(dir.path()).unwrap();
    store.load_index(0).unwrap();

    let err = store.read_raw(0, 5).unwrap_err();
    assert!(
        matches!(
            err,
            CacheError::MalformedSectorChain {
                id: 5,
                expected_chunk: 1,
                ..
            }
        ),
        "unexpected error: {err:?}"
    );
}

#[test]
fn corrupted_entry_id_aborts_the_read() {
    let dir = TempDir::new().unwrap();
    let payload = patterned(700);

    let mut data = DataFileBuilder::new();
    let sector = data.add_entry(0, 5, &payload);
    // Flip the id field of the first sector.
    let offset = sector as usize * SECTOR_LEN + 1;
    data.bytes[offset] ^= 0xFF;
    data.write(dir.path());
    write_index(dir.path(), 0, &[(5, payload.len() as u32, sector)]);

    let store = CacheStore::open_path(dir.path()).unwrap();
    store.load_index(0).unwrap();

    let err = store.read_raw(0, 5).unwrap_err();
    assert!(
        matches!(err, CacheError::MalformedSectorChain { id: 5, found_id, .. } if found_id != 5),
        "unexpected error: {err:?}"
    );
}

#[test]
fn entries_above_u16_use_the_widened_header() {
    let dir = TempDir::new().unwrap();
    let id = 0x10000;
    let payload = patterned(900); // 510 + 390 with the 10-byte header

    let mut data = DataFileBuilder::new();
    let sector = data.add_entry(2, id, &payload);
    data.write(dir.path());
    write_index(dir.path(), 2, &[(id, payload.len() as u32, sector)]);

    let store = CacheStore::open_path(dir.path()).unwrap();
    store.load_index(2).unwrap();

    let raw = store.read_raw(2, id).unwrap();
    assert_eq!(raw, payload);
}

#[test]
fn corrupted_widened_header_aborts_the_read() {
    let dir = TempDir::new().unwrap();
    let id = 0x10000;
    let payload = patterned(900);

    // Flip the chunk field of the second sector. In the 10-byte header
    // the chunk sits at bytes 4..6, after the 4-byte id.
    let mut data = DataFileBuilder::new();
    let sector = data.add_entry(2, id, &payload);
    let offset = (sector as usize + 1) * SECTOR_LEN + 5;
    data.bytes[offset] ^= 0x01;
    data.write(dir.path());
    write_index(dir.path(), 2, &[(id, payload.len() as u32, sector)]);

    let store = CacheStore::open_path(dir.path()).unwrap();
    store.load_index(2).unwrap();

    let err = store.read_raw(2, id).unwrap_err();
    assert!(
        matches!(
            err,
            CacheError::MalformedSectorChain {
                id: 0x10000,
                expected_chunk: 1,
                found_chunk: 0,
                ..
            }
        ),
        "unexpected error: {err:?}"
    );

    // Same chain with a flipped id byte in the first sector instead.
    let mut data = DataFileBuilder::new();
    let sector = data.add_entry(2, id, &payload);
    let offset = sector as usize * SECTOR_LEN + 1;
    data.bytes[offset] ^= 0xFF;
    data.write(dir.path());
    write_index(dir.path(), 2, &[(id, payload.len() as u32, sector)]);

    let store = CacheStore::open_path(dir.path()).unwrap();
    store.load_index(2).unwrap();

    let err = store.read_raw(2, id).unwrap_err();
    assert!(
        matches!(
            err,
            CacheError::MalformedSectorChain { id: 0x10000, found_id, .. } if found_id != 0x10000
        ),
        "unexpected error: {err:?}"
    );
}

#[test]
fn read_decompressed_unwraps_the_envelope() {
    let dir = TempDir::new().unwrap();
    let plaintext = patterned(4000);
    let container = gzip_envelope(&plaintext);

    let mut data = DataFileBuilder::new();
    let sector = data.add_entry(0, 1, &container);
    data.write(dir.path());
    write_index(dir.path(), 0, &[(1, container.len() as u32, sector)]);

    let store = CacheStore::open_path(dir.path()).unwrap();
    store.load_index(0).unwrap();

    let result = store.read_decompressed(0, 1).unwrap();
    assert_eq!(result, plaintext);
}

#[test]
fn oversized_decompressed_claim_is_refused() {
    let dir = TempDir::new().unwrap();

    // A gzip envelope claiming a 20 MB decompressed size.
    let mut container = vec![2u8];
    container.extend_from_slice(&16u32.to_be_bytes());
    container.extend_from_slice(&20_000_000u32.to_be_bytes());
    container.extend_from_slice(&[0u8; 16]);

    let mut data = DataFileBuilder::new();
    let sector = data.add_entry(0, 0, &container);
    data.write(dir.path());
    write_index(dir.path(), 0, &[(0, container.len() as u32, sector)]);

    let store = CacheStore::open(CacheConfig {
        data_path: dir.path().to_path_buf(),
        ..CacheConfig::default()
    })
    .unwrap();
    store.load_index(0).unwrap();

    let err = store.read_decompressed(0, 0).unwrap_err();
    assert!(
        matches!(
            err,
            CacheError::Compression(js5_compression::Error::DecompressedSizeExceeded {
                size: 20_000_000,
                ..
            })
        ),
        "unexpected error: {err:?}"
    );
}

#[test]
fn zero_size_entries_are_a_caller_error() {
    let dir = TempDir::new().unwrap();

    let data = DataFileBuilder::new();
    data.write(dir.path());
    write_index(dir.path(), 0, &[(3, 0, 0)]);

    let store = CacheStore::open_path(dir.path()).unwrap();
    store.load_index(0).unwrap();

    assert!(matches!(
        store.read_raw(0, 3).unwrap_err(),
        CacheError::EmptyEntry(3)
    ));
}

#[test]
fn missing_index_and_missing_entry_are_distinct_errors() {
    let dir = TempDir::new().unwrap();

    let data = DataFileBuilder::new();
    data.write(dir.path());
    write_index(dir.path(), 0, &[(0, 0, 0)]);

    let store = CacheStore::open_path(dir.path()).unwrap();
    store.load_index(0).unwrap();

    assert!(matches!(
        store.read_raw(7, 0).unwrap_err(),
        CacheError::IndexNotLoaded(7)
    ));
    assert!(matches!(
        store.read_raw(0, 99).unwrap_err(),
        CacheError::EntryNotFound {
            category: 0,
            id: 99
        }
    ));
}

#[test]
fn find_indices_loads_every_present_category() {
    let dir = TempDir::new().unwrap();

    let data = DataFileBuilder::new();
    data.write(dir.path());
    write_index(dir.path(), 0, &[(0, 0, 0)]);
    write_index(dir.path(), 5, &[(0, 0, 0)]);
    write_index(dir.path(), 255, &[(0, 0, 0)]);

    let store = CacheStore::open_path(dir.path()).unwrap();
    assert_eq!(store.find_indices(), 3);
    assert_eq!(store.categories(), vec![0, 5, 255]);
    assert!(store.index(5).is_some());
    assert!(store.index(4).is_none());
}

#[test]
fn reference_tables_come_from_category_255() {
    let dir = TempDir::new().unwrap();

    // Version 6 table for category 2: ids 0 and 3, no optional fields.
    let mut table = vec![6u8];
    table.extend_from_slice(&77i32.to_be_bytes()); // revision
    table.push(0); // flags
    table.extend_from_slice(&2u16.to_be_bytes()); // entry count
    table.extend_from_slice(&0u16.to_be_bytes()); // delta to id 0
    table.extend_from_slice(&3u16.to_be_bytes()); // delta to id 3
    table.extend_from_slice(&0x1111_1111u32.to_be_bytes()); // crc of id 0
    table.extend_from_slice(&0x2222_2222u32.to_be_bytes()); // crc of id 3
    table.extend_from_slice(&10i32.to_be_bytes()); // version of id 0
    table.extend_from_slice(&20i32.to_be_bytes()); // version of id 3

    let container = plain_envelope(&table);

    let mut data = DataFileBuilder::new();
    let sector = data.add_entry(255, 2, &container);
    data.write(dir.path());
    write_index(dir.path(), 255, &[(2, container.len() as u32, sector)]);

    let store = CacheStore::open_path(dir.path()).unwrap();
    store.load_index(255).unwrap();

    let table = store.read_reference_table(2).unwrap();
    assert_eq!(table.version, 6);
    assert_eq!(table.revision, 77);
    assert_eq!(table.ids, vec![0, 3]);
    assert_eq!(table.size, 4);
    assert_eq!(table.crc(3), Some(0x2222_2222));
    assert_eq!(table.entry_version(0), Some(10));
    assert!(!table.contains(1));
}

#[test]
fn reloading_an_index_replaces_it_wholesale() {
    let dir = TempDir::new().unwrap();
    let payload = patterned(100);

    let mut data = DataFileBuilder::new();
    let sector = data.add_entry(0, 0, &payload);
    data.write(dir.path());
    write_index(dir.path(), 0, &[(0, payload.len() as u32, sector)]);

    let store = CacheStore::open_path(dir.path()).unwrap();
    assert_eq!(store.load_index(0).unwrap(), 1);

    // Grow the index on disk and reload; the store must see the new
    // entry set, not a merge.
    write_index(
        dir.path(),
        0,
        &[(0, payload.len() as u32, sector), (4, 0, 0)],
    );
    assert_eq!(store.load_index(0).unwrap(), 5);
    assert_eq!(store.index(0).unwrap().len(), 5);
}
