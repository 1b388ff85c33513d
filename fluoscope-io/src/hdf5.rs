//! HDF5 frame stacks.
//!
//! A stack is one n-dimensional `f64` dataset, normally `(frames, rows, cols)`.

use crate::{Error, Result};
use hdf5::types::VarLenUnicode;
use hdf5::{Dataset, File};
use ndarray::ArrayD;
use std::path::Path;
use std::str::FromStr;

/// Dataset name used when none is given.
pub const DEFAULT_DATASET: &str = "data";

/// Frame write configuration.
#[derive(Clone, Debug, Default)]
pub struct FrameWriteOptions {
    /// Deflate level, `None` for uncompressed.
    pub compression: Option<u8>,
    pub shuffle: bool,
    /// Stored as the `units` attribute when set.
    pub units: Option<String>,
}

/// Reads an entire frame stack.
///
/// # Errors
/// Returns an error if the file or dataset cannot be read, or if the dataset
/// has fewer than two axes.
pub fn read_frames_hdf5<P: AsRef<Path>>(path: P, dataset: &str) -> Result<ArrayD<f64>> {
    let file = File::open(path)?;
    let ds = file.dataset(dataset)?;
    if ds.ndim() < 2 {
        return Err(Error::InvalidFormat(format!(
            "dataset {dataset} has shape {:?}, expected at least 2 axes",
            ds.shape()
        )));
    }
    let frames = ds.read_dyn::<f64>()?;
    log::debug!("read {:?} from hdf5 dataset {dataset}", frames.shape());
    Ok(frames)
}

/// Writes a frame stack to a new file.
///
/// # Errors
/// Returns an error if the file cannot be created or HDF5 I/O fails.
pub fn write_frames_hdf5<P: AsRef<Path>>(
    path: P,
    dataset: &str,
    frames: &ArrayD<f64>,
    options: &FrameWriteOptions,
) -> Result<()> {
    let file = File::create(path)?;
    let mut builder = file.new_dataset::<f64>().shape(frames.shape().to_vec());
    if let Some(level) = options.compression {
        builder = builder.deflate(level);
    }
    if options.shuffle {
        builder = builder.shuffle();
    }
    let ds = builder.create(dataset)?;
    ds.write(frames)?;
    if let Some(units) = &options.units {
        set_dataset_units(&ds, units)?;
    }
    Ok(())
}

fn set_dataset_units(dataset: &Dataset, units: &str) -> Result<()> {
    let value = VarLenUnicode::from_str(units)
        .map_err(|e| Error::InvalidFormat(format!("invalid utf-8 attribute: {e}")))?;
    dataset
        .new_attr::<VarLenUnicode>()
        .create("units")?
        .write_scalar(&value)?;
    Ok(())
}
