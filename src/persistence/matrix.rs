//! Binary vector matrix file.
//!
//! Layout, all little-endian:
//! `[magic "SSVF"][version: u32][dimension: u32][count: u32]`
//! `[count * dimension f32 values, row-major][crc32 of the values: u32]`
//!
//! Rows are written exactly as stored, so a reload yields bit-identical
//! vectors and never re-normalizes.

use crate::error::{Result, SearchError};
use crate::flat_index::FlatIndex;
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::Path;

const MAGIC: &[u8; 4] = b"SSVF";
pub const FORMAT_VERSION: u32 = 1;
const HEADER_SIZE: usize = 16;
const TRAILER_SIZE: usize = 4;

/// Stored rows must be within this distance of unit length.
const NORM_TOLERANCE: f32 = 1e-3;

/// Write the index matrix to `path` and fsync it.
pub fn write_matrix(path: &Path, index: &FlatIndex) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    writer.write_all(&encode_header(index.dimension(), index.len())?)?;

    let mut hasher = crc32fast::Hasher::new();
    for &value in index.matrix().iter() {
        let bytes = value.to_le_bytes();
        hasher.update(&bytes);
        writer.write_all(&bytes)?;
    }
    writer.write_all(&hasher.finalize().to_le_bytes())?;

    let file = writer
        .into_inner()
        .map_err(|e| SearchError::Io(e.into_error()))?;
    file.sync_all()?;
    Ok(())
}

/// Read a matrix file, memory-mapping it when possible.
pub fn read_matrix(path: &Path) -> Result<FlatIndex> {
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => SearchError::ArtifactMissing {
            path: path.to_path_buf(),
        },
        _ => SearchError::Io(e),
    })?;

    // Fall back to a plain read where mapping is unavailable.
    match unsafe { memmap2::Mmap::map(&file) } {
        Ok(mmap) => decode(&mmap, path),
        Err(_) => {
            let bytes = fs::read(path)?;
            decode(&bytes, path)
        }
    }
}

fn encode_header(dimension: usize, count: usize) -> Result<[u8; HEADER_SIZE]> {
    let dimension = u32::try_from(dimension)
        .map_err(|_| SearchError::InvalidArgument(format!("dimension {} too large", dimension)))?;
    let count = u32::try_from(count)
        .map_err(|_| SearchError::InvalidArgument(format!("row count {} too large", count)))?;

    let mut buf = [0u8; HEADER_SIZE];
    buf[0..4].copy_from_slice(MAGIC);
    buf[4..8].copy_from_slice(&FORMAT_VERSION.to_le_bytes());
    buf[8..12].copy_from_slice(&dimension.to_le_bytes());
    buf[12..16].copy_from_slice(&count.to_le_bytes());
    Ok(buf)
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(buf)
}

fn decode(bytes: &[u8], path: &Path) -> Result<FlatIndex> {
    if bytes.len() < HEADER_SIZE + TRAILER_SIZE {
        return Err(SearchError::corrupt(path, "file too small for header"));
    }
    if &bytes[0..4] != MAGIC {
        return Err(SearchError::corrupt(path, "bad magic"));
    }
    let version = read_u32(bytes, 4);
    if version != FORMAT_VERSION {
        return Err(SearchError::corrupt(
            path,
            format!("unsupported format version {}", version),
        ));
    }
    let dimension = read_u32(bytes, 8) as usize;
    let count = read_u32(bytes, 12) as usize;
    if dimension == 0 && count > 0 {
        return Err(SearchError::corrupt(
            path,
            format!("{} rows with dimension 0", count),
        ));
    }

    let data_len = count
        .checked_mul(dimension)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| SearchError::corrupt(path, "matrix size overflows"))?;
    let expected_len = HEADER_SIZE + data_len + TRAILER_SIZE;
    if bytes.len() != expected_len {
        return Err(SearchError::corrupt(
            path,
            format!("expected {} bytes, found {}", expected_len, bytes.len()),
        ));
    }

    let data = &bytes[HEADER_SIZE..HEADER_SIZE + data_len];
    let stored_crc = read_u32(bytes, HEADER_SIZE + data_len);
    if crc32fast::hash(data) != stored_crc {
        return Err(SearchError::corrupt(path, "checksum mismatch"));
    }

    let values: Vec<f32> = data
        .chunks_exact(4)
        .map(|chunk| {
            let mut buf = [0u8; 4];
            buf.copy_from_slice(chunk);
            f32::from_le_bytes(buf)
        })
        .collect();

    if dimension > 0 {
        for (row, chunk) in values.chunks_exact(dimension).enumerate() {
            let norm = crate::vector::l2_norm(chunk);
            if !norm.is_finite() || (norm - 1.0).abs() > NORM_TOLERANCE {
                return Err(SearchError::corrupt(
                    path,
                    format!("row {} is not unit length (norm {})", row, norm),
                ));
            }
        }
    }

    FlatIndex::from_normalized(count, dimension, values)
        .map_err(|e| SearchError::corrupt(path, e.to_string()))
}
