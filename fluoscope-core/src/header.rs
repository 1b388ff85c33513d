//! Scan header model.
//!
//! A [`Header`] bundles the documents recorded for one completed scan (start,
//! event descriptors, stop) with a [`FrameSource`] that yields the raw image
//! frames for each named data stream. The header is read-only: nothing in this
//! workspace mutates or persists it.

use crate::{Error, Result};
use ndarray::ArrayD;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Metadata recorded when a scan starts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StartDocument {
    /// Unique identifier of the scan.
    pub uid: String,
    /// Human-facing scan number.
    #[serde(default)]
    pub scan_id: i64,
    /// Start time (seconds since the epoch).
    #[serde(default)]
    pub time: f64,
    #[serde(default)]
    pub plan_name: String,
    /// Detectors read during the scan, in plan order.
    #[serde(default)]
    pub detectors: Vec<String>,
    /// Any additional start metadata.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Configuration snapshot of one device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfiguration {
    /// Configuration values keyed by field name.
    #[serde(default)]
    pub data: Map<String, Value>,
}

/// Describes one event stream and the device configuration it was taken with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventDescriptor {
    /// Stream name (e.g. `primary`).
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub configuration: BTreeMap<String, DeviceConfiguration>,
}

/// Metadata recorded when a scan ends.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StopDocument {
    #[serde(default)]
    pub exit_status: String,
    #[serde(default)]
    pub num_events: BTreeMap<String, u64>,
    #[serde(default)]
    pub time: f64,
}

/// The documents of a scan without its frame data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeaderDocuments {
    pub start: StartDocument,
    #[serde(default)]
    pub descriptors: Vec<EventDescriptor>,
    #[serde(default)]
    pub stop: Option<StopDocument>,
}

/// Access to the raw frames of a scan's data streams.
///
/// Implementations must read afresh on every call; averaged images are
/// recomputed from these frames each time they are needed.
pub trait FrameSource: Send + Sync {
    /// Returns every frame of `stream`. The last two axes are (rows, cols).
    ///
    /// # Errors
    /// Returns [`Error::MissingStream`] if the stream does not exist, or a
    /// source-specific error if it cannot be read.
    fn frames(&self, stream: &str) -> Result<ArrayD<f64>>;

    /// Names of the streams this source can serve.
    fn streams(&self) -> Vec<String>;
}

/// Frame source backed by arrays held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFrames {
    streams: HashMap<String, ArrayD<f64>>,
}

impl InMemoryFrames {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a stream.
    #[must_use]
    pub fn with_stream(mut self, name: impl Into<String>, frames: ArrayD<f64>) -> Self {
        self.streams.insert(name.into(), frames);
        self
    }
}

impl FrameSource for InMemoryFrames {
    fn frames(&self, stream: &str) -> Result<ArrayD<f64>> {
        self.streams
            .get(stream)
            .cloned()
            .ok_or_else(|| Error::MissingStream(stream.to_string()))
    }

    fn streams(&self) -> Vec<String> {
        let mut names: Vec<String> = self.streams.keys().cloned().collect();
        names.sort();
        names
    }
}

/// One completed scan: its documents plus access to its frames.
pub struct Header {
    pub start: StartDocument,
    pub descriptors: Vec<EventDescriptor>,
    pub stop: Option<StopDocument>,
    frames: Box<dyn FrameSource>,
}

impl fmt::Debug for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Header")
            .field("uid", &self.start.uid)
            .field("scan_id", &self.start.scan_id)
            .field("detectors", &self.start.detectors)
            .field("descriptors", &self.descriptors.len())
            .finish_non_exhaustive()
    }
}

impl Header {
    /// Assembles a header from its documents and a frame source.
    pub fn new(documents: HeaderDocuments, frames: impl FrameSource + 'static) -> Self {
        Self {
            start: documents.start,
            descriptors: documents.descriptors,
            stop: documents.stop,
            frames: Box::new(frames),
        }
    }

    /// Returns the raw frames of a data stream.
    ///
    /// # Errors
    /// Propagates the frame source's error.
    pub fn data(&self, stream: &str) -> Result<ArrayD<f64>> {
        self.frames.frames(stream)
    }

    /// Names of the data streams available for this scan.
    #[must_use]
    pub fn streams(&self) -> Vec<String> {
        self.frames.streams()
    }

    /// Returns the camera name, which must be the only listed detector.
    ///
    /// # Errors
    /// [`Error::NoDetector`] if none is listed, [`Error::AmbiguousCamera`] if
    /// more than one is.
    pub fn camera(&self) -> Result<&str> {
        match self.start.detectors.as_slice() {
            [] => Err(Error::NoDetector),
            [camera] => Ok(camera.as_str()),
            many => Err(Error::AmbiguousCamera {
                count: many.len(),
                names: many.join(", "),
            }),
        }
    }

    /// Name of the image stream recorded by `camera`.
    #[must_use]
    pub fn image_stream(camera: &str) -> String {
        format!("{camera}_image")
    }

    /// Returns the configuration of `device` from the first descriptor.
    ///
    /// # Errors
    /// [`Error::MissingDescriptor`] or [`Error::MissingConfiguration`].
    pub fn configuration(&self, device: &str) -> Result<&Map<String, Value>> {
        let descriptor = self.descriptors.first().ok_or(Error::MissingDescriptor)?;
        descriptor
            .configuration
            .get(device)
            .map(|config| &config.data)
            .ok_or_else(|| Error::MissingConfiguration(device.to_string()))
    }
}
