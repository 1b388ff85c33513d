//! Display error types.

use thiserror::Error;

/// Result type for display operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Display error types.
#[derive(Error, Debug)]
pub enum Error {
    /// An overlay handle no longer refers to a live artist on this figure.
    #[error("stale overlay handle: {0}")]
    StaleHandle(String),

    /// Axes index outside the figure's panels.
    #[error("figure has {panels} panel(s), no axes {index}")]
    NoSuchAxes { index: usize, panels: usize },

    /// Invalid display configuration.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image encoding error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Core library error.
    #[error("core error: {0}")]
    CoreError(#[from] fluoscope_core::Error),
}
