//! Memory-mapped frame store readers.
//!
//! A raw frame store is a small fixed header followed by little-endian
//! samples in row-major order:
//!
//! | offset | size        | field                                   |
//! |--------|-------------|-----------------------------------------|
//! | 0      | 8           | magic `FSFRAMES`                        |
//! | 8      | 1           | sample type (1 = u16, 2 = f32, 3 = f64) |
//! | 9      | 1           | number of axes                          |
//! | 10     | 6           | reserved (zero)                         |
//! | 16     | 8 per axis  | axis lengths, u64                       |
//!

use crate::{Error, Result};
use memmap2::Mmap;
use ndarray::{ArrayD, IxDyn};
use rayon::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Leading bytes of every raw frame store.
pub const FRAME_STORE_MAGIC: &[u8; 8] = b"FSFRAMES";
/// Size of the fixed part of the header.
pub const FIXED_HEADER_LEN: usize = 16;

/// Sample encoding of a frame store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleType {
    U16,
    F32,
    F64,
}

impl SampleType {
    /// On-disk type code.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            SampleType::U16 => 1,
            SampleType::F32 => 2,
            SampleType::F64 => 3,
        }
    }

    /// Parses an on-disk type code.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] for unknown codes.
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            1 => Ok(SampleType::U16),
            2 => Ok(SampleType::F32),
            3 => Ok(SampleType::F64),
            other => Err(Error::InvalidFormat(format!(
                "unknown sample type code {other}"
            ))),
        }
    }

    /// Bytes per sample.
    #[must_use]
    pub fn size(self) -> usize {
        match self {
            SampleType::U16 => 2,
            SampleType::F32 => 4,
            SampleType::F64 => 8,
        }
    }

    fn decode(self, chunk: &[u8]) -> f64 {
        match self {
            SampleType::U16 => f64::from(u16::from_le_bytes([chunk[0], chunk[1]])),
            SampleType::F32 => f64::from(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])),
            SampleType::F64 => {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(&chunk[..8]);
                f64::from_le_bytes(bytes)
            }
        }
    }
}

/// Parsed frame store header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameStoreHeader {
    pub sample_type: SampleType,
    pub shape: Vec<usize>,
}

impl FrameStoreHeader {
    /// Total header length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        FIXED_HEADER_LEN + 8 * self.shape.len()
    }

    /// Always false: a header has at least its fixed part.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Number of samples described by the shape.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] if the count overflows `usize`.
    pub fn sample_count(&self) -> Result<usize> {
        self.shape
            .iter()
            .try_fold(1usize, |count, &len| count.checked_mul(len))
            .ok_or_else(|| {
                Error::InvalidFormat(format!("shape {:?} is too large", self.shape))
            })
    }

    /// Number of payload bytes described by the shape and sample type.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] if the size overflows `usize`.
    pub fn payload_len(&self) -> Result<usize> {
        self.sample_count()?
            .checked_mul(self.sample_type.size())
            .ok_or_else(|| {
                Error::InvalidFormat(format!("shape {:?} is too large", self.shape))
            })
    }

    /// Parses the header at the start of `bytes`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] for a bad magic, unknown sample type,
    /// or truncated header.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < FIXED_HEADER_LEN || &bytes[..8] != FRAME_STORE_MAGIC {
            return Err(Error::InvalidFormat("not a frame store".to_string()));
        }
        let sample_type = SampleType::from_code(bytes[8])?;
        let ndim = usize::from(bytes[9]);
        let end = FIXED_HEADER_LEN + 8 * ndim;
        if bytes.len() < end {
            return Err(Error::InvalidFormat(format!(
                "truncated header: {ndim} axes need {end} bytes, file has {}",
                bytes.len()
            )));
        }
        let shape = bytes[FIXED_HEADER_LEN..end]
            .chunks_exact(8)
            .map(|chunk| {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(chunk);
                usize::try_from(u64::from_le_bytes(raw))
                    .map_err(|_| Error::InvalidFormat("axis length overflows usize".to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { sample_type, shape })
    }
}

/// A memory-mapped file reader.
///
/// Uses memmap2 to access file contents without reading the whole file up
/// front.
pub struct MappedFileReader {
    mmap: Arc<Mmap>,
    path: PathBuf,
}

impl MappedFileReader {
    /// Opens a file for memory-mapped reading.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or memory-mapped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        // SAFETY: The file is opened read-only and we assume it is not modified concurrently.
        // This is the standard safety contract for memory mapping.
        #[allow(unsafe_code)]
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self {
            mmap: Arc::new(mmap),
            path: path.as_ref().to_path_buf(),
        })
    }

    /// Returns the file contents as a byte slice.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap[..]
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    /// Returns true if the file is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// Path the reader was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Decodes a complete frame store held in memory.
///
/// # Errors
/// Returns [`Error::InvalidFormat`] if the header is bad or the payload size
/// does not match the shape.
pub fn decode_frames(bytes: &[u8]) -> Result<ArrayD<f64>> {
    let header = FrameStoreHeader::parse(bytes)?;
    let size = header.sample_type.size();
    let payload = &bytes[header.len()..];
    let expected = header.payload_len()?;
    if payload.len() != expected {
        return Err(Error::InvalidFormat(format!(
            "payload is {} bytes, shape {:?} needs {expected}",
            payload.len(),
            header.shape
        )));
    }

    let sample_type = header.sample_type;
    let samples: Vec<f64> = payload
        .par_chunks_exact(size)
        .map(|chunk| sample_type.decode(chunk))
        .collect();
    ArrayD::from_shape_vec(IxDyn(&header.shape), samples)
        .map_err(|e| Error::InvalidFormat(format!("shape {:?}: {e}", header.shape)))
}

/// Reads every frame of a raw frame store.
///
/// The file is mapped and decoded on each call; nothing is cached.
///
/// # Errors
/// Returns an error if the file cannot be mapped or is not a valid store.
pub fn read_frames<P: AsRef<Path>>(path: P) -> Result<ArrayD<f64>> {
    let reader = MappedFileReader::open(path)?;
    let frames = decode_frames(reader.as_bytes())?;
    log::debug!(
        "read {:?} frames from {}",
        frames.shape(),
        reader.path().display()
    );
    Ok(frames)
}
