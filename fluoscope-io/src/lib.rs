//! fluoscope-io: scan catalog and frame store I/O for fluoscope.
//!
//! Scans are looked up in a directory-backed [`Catalog`]; their image
//! streams are memory-mapped raw frame stores (or HDF5 stacks with the
//! `hdf5` feature) decoded on demand.
//!

pub mod catalog;
mod error;
#[cfg(feature = "hdf5")]
pub mod hdf5;
mod reader;
mod writer;

pub use catalog::{Catalog, CatalogEntry, DirectoryFrames, ScanRef, CATALOG_DIR_ENV};
pub use error::{Error, Result};
#[cfg(feature = "hdf5")]
pub use hdf5::{read_frames_hdf5, write_frames_hdf5, FrameWriteOptions};
pub use reader::{decode_frames, read_frames, FrameStoreHeader, MappedFileReader, SampleType};
pub use writer::{write_frames, FrameStoreWriter};
