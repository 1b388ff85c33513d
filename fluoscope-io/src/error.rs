//! I/O error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;

/// I/O error types.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid file format.
    #[error("invalid file format: {0}")]
    InvalidFormat(String),

    /// Header document could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HDF5 library error.
    #[cfg(feature = "hdf5")]
    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),

    /// Catalog root does not exist or is not a directory.
    #[error("catalog not found: {0}")]
    CatalogNotFound(PathBuf),

    /// Named catalog requested without a catalog directory configured.
    #[error("catalog {0} requested but {var} is not set", var = crate::catalog::CATALOG_DIR_ENV)]
    CatalogUnconfigured(String),

    /// No scan matches the reference.
    #[error("no scan matches {0}")]
    ScanNotFound(String),

    /// A uid prefix matches more than one scan.
    #[error("uid prefix {prefix} matches {count} scans")]
    AmbiguousUid { prefix: String, count: usize },

    /// Scan reference string cannot be parsed.
    #[error("invalid scan reference: {0:?}")]
    InvalidScanRef(String),
}
