//! Reference table decoding
//!
//! Wire layout (all big-endian):
//!
//! ```text
//! version:      i8          (5, 6, or 7)
//! revision:     i32         (version >= 6 only)
//! flags:        u8          bit 0 = names, bit 1 = whirlpool,
//!                           bits 2/3 = reserved, padding only
//! entry_count:  smart | u16 (smart for version >= 7)
//! deltas:       entry_count * (smart | u16), accumulated into ids
//! names:        entry_count * i32   (flag bit 0)
//! crc32:        entry_count * i32
//! padding:      entry_count * i32   (flag bit 3)
//! whirlpool:    entry_count * 64    (flag bit 1)
//! padding:      entry_count * 2*i32 (flag bit 2)
//! versions:     entry_count * i32
//! ```
//!
//! The reserved flag bits have no decoded meaning upstream, but their
//! fields still occupy bytes and must be skipped field-exactly for the
//! rest of the record to line up.

use tracing::{debug, trace};

use crate::{ByteCursor, Error, Result};

/// Length of a whirlpool digest
pub const WHIRLPOOL_LEN: usize = 64;

/// Upper bound on `max(ids) + 1` accepted before a table is rejected
/// as corrupt. The sparse arrays are sized by the largest id, so
/// without a cap a single hostile 4-byte delta could claim a 31-bit id
/// and size them to gigabytes.
pub const MAX_TABLE_SIZE: u32 = 1 << 20;

/// Fewest bytes one entry can occupy after the count field: a 2-byte
/// delta plus the unconditional crc32 and version fields.
const MIN_ENTRY_BYTES: usize = 10;

/// Per-category metadata table: every entry id with its checksum and
/// revision, plus optional name hashes and whirlpool digests.
///
/// The sparse arrays are indexed by entry id and sized `max(ids) + 1`;
/// ids are not necessarily contiguous, so a `None` slot means "no such
/// id" rather than a missing field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceTable {
    /// Format version (5-7)
    pub version: i8,
    /// Table revision, 0 for version 5
    pub revision: i32,
    /// Entry ids in wire order (ascending by construction)
    pub ids: Vec<u32>,
    /// Sparse array length: `max(ids) + 1`, or 0 for an empty table
    pub size: u32,
    /// Name hashes by id, present when flag bit 0 is set
    pub names: Option<Vec<Option<i32>>>,
    /// CRC-32 checksums by id
    pub crc32: Vec<Option<u32>>,
    /// Whirlpool digests by id, present when flag bit 1 is set
    pub whirlpool: Option<Vec<Option<[u8; WHIRLPOOL_LEN]>>>,
    /// Entry revisions by id
    pub versions: Vec<Option<i32>>,
}

impl ReferenceTable {
    /// Number of entries in the table.
    pub fn entry_count(&self) -> usize {
        self.ids.len()
    }

    /// Whether `id` exists in this table.
    pub fn contains(&self, id: u32) -> bool {
        self.crc(id).is_some()
    }

    /// CRC-32 checksum for `id`, if the id exists.
    pub fn crc(&self, id: u32) -> Option<u32> {
        self.crc32.get(id as usize).copied().flatten()
    }

    /// Name hash for `id`, if the table carries names and the id exists.
    pub fn name_hash(&self, id: u32) -> Option<i32> {
        self.names.as_ref()?.get(id as usize).copied().flatten()
    }

    /// Whirlpool digest for `id`, if the table carries digests and the
    /// id exists.
    pub fn whirlpool(&self, id: u32) -> Option<&[u8; WHIRLPOOL_LEN]> {
        self.whirlpool.as_ref()?.get(id as usize)?.as_ref()
    }

    /// Revision for `id`, if the id exists.
    pub fn entry_version(&self, id: u32) -> Option<i32> {
        self.versions.get(id as usize).copied().flatten()
    }
}

/// Entry counts and id deltas widen from u16 to the smart encoding at
/// version 7.
fn read_count(cursor: &mut ByteCursor<'_>, version: i8) -> Result<u32> {
    if version >= 7 {
        cursor.read_smart()
    } else {
        Ok(u32::from(cursor.read_u16()?))
    }
}

/// Decode a reference table from decompressed bytes.
///
/// Only versions 5-7 are accepted; anything else fails without
/// returning a partial table.
pub fn decode_reference_table(data: &[u8]) -> Result<ReferenceTable> {
    let mut cursor = ByteCursor::new(data);

    let version = cursor.read_i8()?;
    if !(5..=7).contains(&version) {
        return Err(Error::UnsupportedVersion(version));
    }

    let revision = if version >= 6 { cursor.read_i32()? } else { 0 };

    let flags = cursor.read_u8()?;
    let has_names = flags & 0x01 != 0;
    let has_whirlpool = flags & 0x02 != 0;
    let unknown1 = flags & 0x04 != 0;
    let unknown2 = flags & 0x08 != 0;

    let entry_count = read_count(&mut cursor, version)?;

    // A count the remaining bytes cannot possibly encode is corruption;
    // rejecting it here keeps an untrusted field from driving the
    // allocations below.
    if entry_count as usize > cursor.remaining() / MIN_ENTRY_BYTES {
        return Err(Error::ImplausibleEntryCount {
            count: entry_count,
            available: cursor.remaining(),
        });
    }

    trace!(
        "Reference table: version={}, revision={}, flags={:#04x}, entries={}",
        version, revision, flags, entry_count
    );

    // Ids are delta-encoded against the previous id. Deltas are
    // unsigned, so the accumulator only grows; it is widened to u64 so
    // the cap check cannot itself overflow.
    let mut ids = Vec::with_capacity(entry_count as usize);
    let mut id = 0u64;
    let mut max = None;
    for _ in 0..entry_count {
        id += u64::from(read_count(&mut cursor, version)?);
        if id >= u64::from(MAX_TABLE_SIZE) {
            return Err(Error::IdRangeTooLarge {
                size: id + 1,
                max: MAX_TABLE_SIZE,
            });
        }
        ids.push(id as u32);
        max = Some(max.map_or(id, |m: u64| m.max(id)));
    }
    let size = max.map_or(0, |m| m as u32 + 1);

    let names = if has_names {
        let mut names = vec![None; size as usize];
        for &id in &ids {
            names[id as usize] = Some(cursor.read_i32()?);
        }
        Some(names)
    } else {
        None
    };

    let mut crc32 = vec![None; size as usize];
    for &id in &ids {
        crc32[id as usize] = Some(cursor.read_i32()? as u32);
    }

    // Reserved field, one i32 per entry. Meaning unknown upstream.
    if unknown2 {
        for _ in &ids {
            cursor.read_i32()?;
        }
    }

    let whirlpool = if has_whirlpool {
        let mut digests = vec![None; size as usize];
        for &id in &ids {
            let bytes = cursor.read_bytes(WHIRLPOOL_LEN)?;
            let mut digest = [0u8; WHIRLPOOL_LEN];
            digest.copy_from_slice(&bytes);
            digests[id as usize] = Some(digest);
        }
        Some(digests)
    } else {
        None
    };

    // Reserved field, two i32s per entry.
    if unknown1 {
        for _ in &ids {
            cursor.read_i32()?;
            cursor.read_i32()?;
        }
    }

    let mut versions = vec![None; size as usize];
    for &id in &ids {
        versions[id as usize] = Some(cursor.read_i32()?);
    }

    debug!(
        "Decoded reference table: version={}, {} entries, size={}, {} of {} bytes consumed",
        version,
        ids.len(),
        size,
        cursor.offset(),
        data.len()
    );

    Ok(ReferenceTable {
        version,
        revision,
        ids,
        size,
        names,
        crc32,
        whirlpool,
        versions,
    })
}
