//! Sector headers
//!
//! The data file is a concatenation of 520-byte sectors. Each sector
//! opens with a header naming the entry it belongs to, the chunk
//! position within that entry, the next sector in the chain, and the
//! owning category. Entries with ids above 0xFFFF use a widened header
//! whose id field is four bytes instead of two; the two forms are
//! decoded by separate paths over exactly-sized buffers.

use byteorder::{BigEndian, ByteOrder};

/// Fixed sector length in the main data file
pub const SECTOR_LEN: usize = 520;

/// Header length for entries with id <= 0xFFFF
pub const STANDARD_HEADER_LEN: usize = 8;

/// Header length for entries with id > 0xFFFF
pub const EXTENDED_HEADER_LEN: usize = 10;

/// Decoded sector header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorHeader {
    /// Id of the entry this sector belongs to
    pub entry_id: u32,
    /// Zero-based chunk position within the entry
    pub chunk: u16,
    /// Sector number of the next sector in the chain (0 at the end)
    pub next_sector: u64,
    /// Category the entry belongs to
    pub category: u8,
}

impl SectorHeader {
    /// Decode the 8-byte header form (u16 entry id).
    pub fn parse_standard(b: &[u8; STANDARD_HEADER_LEN]) -> Self {
        Self {
            entry_id: u32::from(BigEndian::read_u16(&b[0..2])),
            chunk: BigEndian::read_u16(&b[2..4]),
            next_sector: BigEndian::read_u24(&b[4..7]) as u64,
            category: b[7],
        }
    }

    /// Decode the 10-byte header form (u32 entry id).
    pub fn parse_extended(b: &[u8; EXTENDED_HEADER_LEN]) -> Self {
        Self {
            entry_id: BigEndian::read_u32(&b[0..4]),
            chunk: BigEndian::read_u16(&b[4..6]),
            next_sector: BigEndian::read_u24(&b[6..9]) as u64,
            category: b[9],
        }
    }

    /// Header length used by `entry_id`.
    pub fn header_len(entry_id: u32) -> usize {
        if entry_id > 0xFFFF {
            EXTENDED_HEADER_LEN
        } else {
            STANDARD_HEADER_LEN
        }
    }

    /// Payload bytes a single sector can carry for `entry_id`.
    pub fn payload_capacity(entry_id: u32) -> usize {
        SECTOR_LEN - Self::header_len(entry_id)
    }
}
