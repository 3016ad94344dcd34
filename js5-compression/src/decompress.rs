//! Envelope decoding and decompression dispatch

use byteorder::{BigEndian, ByteOrder};
use bzip2::read::BzDecoder;
use flate2::read::DeflateDecoder;
use std::io::Read;
use tracing::{debug, trace};

use crate::{DEFAULT_MAX_DECOMPRESSED_SIZE, Error, Result};

/// Bzip2 stream header stripped by the cache format. Always block size
/// 1 ('1'), so it can be synthesized without storing it.
const BZIP2_STREAM_HEADER: [u8; 4] = [b'B', b'Z', b'h', b'1'];

/// Length of a standard gzip member header
const GZIP_HEADER_LEN: usize = 10;

/// Trailer bytes skipped at the end of a stored gzip payload
const GZIP_TRAILER_LEN: usize = 4;

/// Compression kind tag stored in the first envelope byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CompressionKind {
    /// Payload is stored verbatim
    None = 0,
    /// Bzip2 with the stream header stripped
    Bzip2 = 1,
    /// Gzip, inflated from the raw DEFLATE stream inside the member
    Gzip = 2,
}

impl CompressionKind {
    /// Map a tag byte to a compression kind
    pub fn from_byte(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::Bzip2),
            2 => Some(Self::Gzip),
            _ => None,
        }
    }
}

/// Decompress a complete container with the default size bound.
pub fn decompress(data: &[u8]) -> Result<(Vec<u8>, CompressionKind)> {
    decompress_with_limit(data, DEFAULT_MAX_DECOMPRESSED_SIZE)
}

/// Decompress a complete container.
///
/// `max_decompressed_size` bounds the declared decompressed size; a
/// larger claim is rejected before any buffer is allocated, since a
/// corrupt or hostile size field would otherwise drive an unbounded
/// allocation.
pub fn decompress_with_limit(
    data: &[u8],
    max_decompressed_size: usize,
) -> Result<(Vec<u8>, CompressionKind)> {
    if data.len() < 5 {
        return Err(Error::TruncatedData {
            expected: 5,
            actual: data.len(),
        });
    }

    let kind = CompressionKind::from_byte(data[0]).ok_or(Error::UnknownCompressionKind(data[0]))?;
    let compressed_size = BigEndian::read_u32(&data[1..5]) as usize;

    trace!(
        "Container: kind={:?}, compressed_size={}, total={}",
        kind,
        compressed_size,
        data.len()
    );

    if kind == CompressionKind::None {
        let end = 5 + compressed_size;
        let payload = data.get(5..end).ok_or(Error::TruncatedData {
            expected: end,
            actual: data.len(),
        })?;
        return Ok((payload.to_vec(), kind));
    }

    if data.len() < 9 {
        return Err(Error::TruncatedData {
            expected: 9,
            actual: data.len(),
        });
    }

    let decompressed_size = BigEndian::read_u32(&data[5..9]) as usize;
    if decompressed_size > max_decompressed_size {
        return Err(Error::DecompressedSizeExceeded {
            size: decompressed_size,
            max: max_decompressed_size,
        });
    }

    let end = 9 + compressed_size;
    let payload = data.get(9..end).ok_or(Error::TruncatedData {
        expected: end,
        actual: data.len(),
    })?;

    // Only the two compressed kinds reach this point; kind 0 returned
    // its payload above.
    let result = if kind == CompressionKind::Bzip2 {
        decompress_bzip2(payload, decompressed_size)?
    } else {
        decompress_gzip(payload, decompressed_size)?
    };

    debug!(
        "Decompressed {:?} container: {} bytes -> {} bytes",
        kind,
        payload.len(),
        result.len()
    );

    Ok((result, kind))
}

/// Kind 1 - bzip2 with the stream header stripped.
///
/// The stored payload omits the 4-byte `BZh1` header and carries a
/// 2-byte trailer that is not part of the compressed stream, so both
/// have to be repaired before a standard decoder will accept it.
fn decompress_bzip2(payload: &[u8], decompressed_size: usize) -> Result<Vec<u8>> {
    if payload.len() < 2 {
        return Err(Error::TruncatedData {
            expected: 2,
            actual: payload.len(),
        });
    }

    let mut stream = Vec::with_capacity(BZIP2_STREAM_HEADER.len() + payload.len() - 2);
    stream.extend_from_slice(&BZIP2_STREAM_HEADER);
    stream.extend_from_slice(&payload[..payload.len() - 2]);

    let mut decoder = BzDecoder::new(stream.as_slice());
    let mut result = Vec::with_capacity(decompressed_size);
    decoder
        .read_to_end(&mut result)
        .map_err(|e| Error::DecompressionFailed(format!("bzip2 decompression failed: {e}")))?;

    Ok(result)
}

/// Kind 2 - gzip.
///
/// The gzip member header is validated and stripped along with the
/// trailer, and the inner DEFLATE stream is inflated raw. DEFLATE is
/// self-terminating, so the trailer bytes are never needed.
fn decompress_gzip(payload: &[u8], decompressed_size: usize) -> Result<Vec<u8>> {
    if payload.len() < GZIP_HEADER_LEN + GZIP_TRAILER_LEN {
        return Err(Error::TruncatedData {
            expected: GZIP_HEADER_LEN + GZIP_TRAILER_LEN,
            actual: payload.len(),
        });
    }

    if payload[0] != 0x1F || payload[1] != 0x8B {
        return Err(Error::InvalidGzipHeader(payload[0], payload[1]));
    }

    let deflate = &payload[GZIP_HEADER_LEN..payload.len() - GZIP_TRAILER_LEN];

    let mut decoder = DeflateDecoder::new(deflate);
    let mut result = Vec::with_capacity(decompressed_size);
    decoder
        .read_to_end(&mut result)
        .map_err(|e| Error::DecompressionFailed(format!("gzip decompression failed: {e}")))?;

    Ok(result)
}
