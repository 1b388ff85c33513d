//! Error types for fluoscope-core.

use thiserror::Error;

/// Result type alias for fluoscope operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for fluoscope operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A configuration field required by an ROI index is absent.
    #[error("missing configuration field: {key}")]
    MissingField { key: String },

    /// A configuration field is present but is not a number.
    #[error("configuration field {key} is not numeric: {value}")]
    InvalidField { key: String, value: String },

    /// The start document lists no detectors.
    #[error("scan lists no detectors")]
    NoDetector,

    /// More than one detector is listed, so the camera cannot be inferred.
    #[error("cannot infer camera from {count} detectors ({names}); name it explicitly")]
    AmbiguousCamera { count: usize, names: String },

    /// The header has no event descriptor.
    #[error("scan has no event descriptors")]
    MissingDescriptor,

    /// The first descriptor carries no configuration for the device.
    #[error("no configuration recorded for device {0}")]
    MissingConfiguration(String),

    /// The named data stream does not exist.
    #[error("no data stream named {0}")]
    MissingStream(String),

    /// The frame source failed to read a stream.
    #[error("cannot read stream {stream}: {source}")]
    FrameSource {
        stream: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A data stream holds zero frames.
    #[error("data stream {0} holds no frames")]
    EmptyStream(String),

    /// Array shape cannot be interpreted as a frame stack.
    #[error("invalid frame shape {0:?}: expected at least (rows, cols)")]
    InvalidShape(Vec<usize>),

    /// Two images differ in shape.
    #[error("shape mismatch: {left:?} vs {right:?}")]
    ShapeMismatch { left: Vec<usize>, right: Vec<usize> },

    /// Crop window exceeds the image.
    #[error("crop rows {rows:?} cols {cols:?} exceed image shape {shape:?}")]
    CropOutOfBounds {
        rows: std::ops::Range<usize>,
        cols: std::ops::Range<usize>,
        shape: [usize; 2],
    },
}
