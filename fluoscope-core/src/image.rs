//! Frame arithmetic: averaging, cropping and differencing detector images.

use crate::{Error, Result};
use ndarray::{s, Array2, ArrayD, Axis};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Averages a frame stack into a single image.
///
/// The last two axes are the image (rows, cols); every leading axis is folded
/// into the frame axis. A bare 2-D array is a single frame and averages to
/// itself.
///
/// # Errors
/// [`Error::InvalidShape`] for arrays with fewer than two axes and
/// [`Error::EmptyStream`] when there are no frames or the image is empty.
pub fn average_frames(stream: &str, frames: &ArrayD<f64>) -> Result<Array2<f64>> {
    let shape = frames.shape().to_vec();
    let [leading @ .., rows, cols] = shape.as_slice() else {
        return Err(Error::InvalidShape(frames.shape().to_vec()));
    };
    let (rows, cols) = (*rows, *cols);
    let count: usize = leading.iter().product();
    if count == 0 || rows == 0 || cols == 0 {
        return Err(Error::EmptyStream(stream.to_string()));
    }

    let stack = frames
        .to_shape((count, rows, cols))
        .map_err(|_| Error::InvalidShape(shape.clone()))?;
    let mean = stack
        .mean_axis(Axis(0))
        .ok_or_else(|| Error::EmptyStream(stream.to_string()))?;
    log::debug!("averaged {count} frame(s) of {stream} into {rows}x{cols}");
    Ok(mean)
}

/// A fixed rectangular pixel window: half-open row and column ranges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropWindow {
    pub rows: Range<usize>,
    pub cols: Range<usize>,
}

impl CropWindow {
    #[must_use]
    pub fn new(rows: Range<usize>, cols: Range<usize>) -> Self {
        Self { rows, cols }
    }

    /// Shape of the cropped image as `[rows, cols]`.
    #[must_use]
    pub fn shape(&self) -> [usize; 2] {
        [self.rows.len(), self.cols.len()]
    }

    /// Copies the window out of `image`.
    ///
    /// # Errors
    /// [`Error::CropOutOfBounds`] if the window does not fit inside `image`.
    pub fn crop(&self, image: &Array2<f64>) -> Result<Array2<f64>> {
        let (rows, cols) = image.dim();
        if self.rows.start > self.rows.end
            || self.cols.start > self.cols.end
            || self.rows.end > rows
            || self.cols.end > cols
        {
            return Err(Error::CropOutOfBounds {
                rows: self.rows.clone(),
                cols: self.cols.clone(),
                shape: [rows, cols],
            });
        }
        Ok(image
            .slice(s![self.rows.clone(), self.cols.clone()])
            .to_owned())
    }
}

/// Pixel-wise difference `b - a`.
///
/// # Errors
/// [`Error::ShapeMismatch`] if the images differ in shape.
pub fn difference(a: &Array2<f64>, b: &Array2<f64>) -> Result<Array2<f64>> {
    if a.shape() != b.shape() {
        return Err(Error::ShapeMismatch {
            left: a.shape().to_vec(),
            right: b.shape().to_vec(),
        });
    }
    Ok(b - a)
}
