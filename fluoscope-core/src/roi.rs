//! ROI geometry derived from camera configuration.
//!
//! Each ROI index `i` of a camera is described by four configuration fields:
//! `<camera>_roi<i>_min_xyz_min_x`, `<camera>_roi<i>_min_xyz_min_y`,
//! `<camera>_roi<i>_size_x` and `<camera>_roi<i>_size_y`. The origin is shifted
//! by a caller-supplied offset so the rectangle lands in the coordinates of a
//! cropped image.

use crate::{Error, Header, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The four configuration fields consumed per ROI index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoiField {
    MinX,
    MinY,
    SizeX,
    SizeY,
}

impl RoiField {
    /// Field name suffix following `<camera>_roi<i>_`.
    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            RoiField::MinX => "min_xyz_min_x",
            RoiField::MinY => "min_xyz_min_y",
            RoiField::SizeX => "size_x",
            RoiField::SizeY => "size_y",
        }
    }
}

/// Builds the configuration key of one ROI field.
#[must_use]
pub fn roi_field_key(camera: &str, index: usize, field: RoiField) -> String {
    format!("{camera}_roi{index}_{}", field.suffix())
}

/// Offset subtracted from ROI origins (H1 for x, V1 for y).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RoiOffset {
    pub h1: f64,
    pub v1: f64,
}

impl RoiOffset {
    #[must_use]
    pub fn new(h1: f64, v1: f64) -> Self {
        Self { h1, v1 }
    }
}

/// Rectangle geometry of one ROI, in offset-adjusted pixel coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoiDescriptor {
    /// 1-based ROI index.
    pub index: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// `ROI<index>`.
    pub label: String,
}

/// Derives `count` ROI descriptors for the header's camera.
///
/// The camera is the header's single detector (see [`Header::camera`]).
///
/// # Errors
/// Returns [`Error::MissingField`] if any of the four fields of an index is
/// absent, [`Error::InvalidField`] if one is not numeric, and the header's
/// camera/configuration lookup errors.
pub fn make_roi_descriptors(
    count: usize,
    header: &Header,
    offset: RoiOffset,
) -> Result<Vec<RoiDescriptor>> {
    let camera = header.camera()?;
    make_roi_descriptors_for(camera, count, header, offset)
}

/// Derives `count` ROI descriptors for an explicitly named camera.
///
/// # Errors
/// See [`make_roi_descriptors`].
pub fn make_roi_descriptors_for(
    camera: &str,
    count: usize,
    header: &Header,
    offset: RoiOffset,
) -> Result<Vec<RoiDescriptor>> {
    let config = header.configuration(camera)?;
    let descriptors = (1..=count)
        .map(|index| descriptor_from_config(config, camera, index, offset))
        .collect::<Result<Vec<_>>>()?;
    log::debug!(
        "derived {} ROI(s) for {camera} with offset ({}, {})",
        descriptors.len(),
        offset.h1,
        offset.v1
    );
    Ok(descriptors)
}

fn descriptor_from_config(
    config: &Map<String, Value>,
    camera: &str,
    index: usize,
    offset: RoiOffset,
) -> Result<RoiDescriptor> {
    let field = |which| numeric_field(config, &roi_field_key(camera, index, which));
    Ok(RoiDescriptor {
        index,
        x: field(RoiField::MinX)? - offset.h1,
        y: field(RoiField::MinY)? - offset.v1,
        width: field(RoiField::SizeX)?,
        height: field(RoiField::SizeY)?,
        label: format!("ROI{index}"),
    })
}

fn numeric_field(config: &Map<String, Value>, key: &str) -> Result<f64> {
    let value = config.get(key).ok_or_else(|| Error::MissingField {
        key: key.to_string(),
    })?;
    value.as_f64().ok_or_else(|| Error::InvalidField {
        key: key.to_string(),
        value: value.to_string(),
    })
}
