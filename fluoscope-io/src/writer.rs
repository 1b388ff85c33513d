//! File writers for frame stores.

use crate::reader::{SampleType, FRAME_STORE_MAGIC};
use crate::{Error, Result};
use ndarray::ArrayD;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writer for raw frame stores.
///
/// Writes a frame stack with its shape header in the layout read by
/// [`crate::read_frames`].
pub struct FrameStoreWriter {
    writer: BufWriter<File>,
}

impl FrameStoreWriter {
    /// Creates a new file writer.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        Ok(Self { writer })
    }

    /// Writes `frames` with the given sample encoding.
    ///
    /// `u16` samples are rounded and clamped to `[0, 65535]`.
    ///
    /// # Errors
    /// Returns an error if the array has more than 255 axes or writing fails.
    pub fn write(&mut self, frames: &ArrayD<f64>, sample_type: SampleType) -> Result<()> {
        let ndim = u8::try_from(frames.ndim())
            .map_err(|_| Error::InvalidFormat(format!("{} axes is too many", frames.ndim())))?;
        self.writer.write_all(FRAME_STORE_MAGIC)?;
        self.writer.write_all(&[sample_type.code(), ndim, 0, 0, 0, 0, 0, 0])?;
        for &len in frames.shape() {
            let len = u64::try_from(len)
                .map_err(|_| Error::InvalidFormat(format!("axis length {len} overflows u64")))?;
            self.writer.write_all(&len.to_le_bytes())?;
        }

        for &value in frames.iter() {
            match sample_type {
                SampleType::U16 => {
                    self.writer.write_all(&to_u16(value).to_le_bytes())?;
                }
                SampleType::F32 => {
                    #[allow(clippy::cast_possible_truncation)]
                    let sample = value as f32;
                    self.writer.write_all(&sample.to_le_bytes())?;
                }
                SampleType::F64 => self.writer.write_all(&value.to_le_bytes())?,
            }
        }
        Ok(())
    }

    /// Flushes the writer.
    ///
    /// # Errors
    /// Returns an error if flushing fails.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_u16(value: f64) -> u16 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, f64::from(u16::MAX)) as u16
}

/// Writes a frame store in one call.
///
/// # Errors
/// See [`FrameStoreWriter::write`].
pub fn write_frames<P: AsRef<Path>>(
    path: P,
    frames: &ArrayD<f64>,
    sample_type: SampleType,
) -> Result<()> {
    let mut writer = FrameStoreWriter::create(path)?;
    writer.write(frames, sample_type)?;
    writer.flush()
}
