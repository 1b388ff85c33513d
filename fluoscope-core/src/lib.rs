//! fluoscope-core: Scan header model, ROI geometry and frame arithmetic.
//!
//! This crate provides the pieces of a fluorescent-screen source check that do
//! not depend on a display: reading ROI rectangles out of a scan's camera
//! configuration, and averaging, cropping and differencing camera frames.
//!

pub mod error;
pub mod header;
pub mod image;
pub mod roi;

pub use error::{Error, Result};
pub use header::{
    DeviceConfiguration, EventDescriptor, FrameSource, Header, HeaderDocuments, InMemoryFrames,
    StartDocument, StopDocument,
};
pub use image::{average_frames, difference, CropWindow};
pub use roi::{
    make_roi_descriptors, make_roi_descriptors_for, roi_field_key, RoiDescriptor, RoiField,
    RoiOffset,
};
