//! Directory-backed scan catalog.
//!
//! Each scan lives in its own directory under the catalog root:
//!
//! ```text
//! <root>/<uid>/header.json       start, descriptors and stop documents
//! <root>/<uid>/<stream>.frames   raw frame store, one per stream
//! <root>/<uid>/<stream>.h5       HDF5 stack (dataset `data`), `hdf5` feature
//! ```

use crate::reader::{read_frames, SampleType};
use crate::writer::write_frames;
use crate::{Error, Result};
use fluoscope_core::{FrameSource, Header, HeaderDocuments};
use ndarray::ArrayD;
use rayon::prelude::*;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable holding the directory that contains named catalogs.
pub const CATALOG_DIR_ENV: &str = "FLUOSCOPE_CATALOG_DIR";
/// Header document file inside a scan directory.
pub const HEADER_FILE: &str = "header.json";
/// Extension of raw frame stores.
pub const FRAMES_EXTENSION: &str = "frames";
/// Extension of HDF5 frame stacks.
pub const HDF5_EXTENSION: &str = "h5";
/// Dataset read from HDF5 frame stacks.
pub const HDF5_DATASET: &str = "data";

/// How a scan is looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanRef {
    /// Human-facing scan number. If several scans share it, the newest wins.
    ScanId(i64),
    /// Position counted back from the newest scan; `Recent(1)` is the newest.
    Recent(usize),
    /// Unique identifier or an unambiguous prefix of one.
    Uid(String),
}

impl FromStr for ScanRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidScanRef(s.to_string()));
        }
        if let Ok(number) = s.parse::<i64>() {
            return if number < 0 {
                usize::try_from(number.unsigned_abs())
                    .map(ScanRef::Recent)
                    .map_err(|_| Error::InvalidScanRef(s.to_string()))
            } else {
                Ok(ScanRef::ScanId(number))
            };
        }
        if is_uid(s) {
            Ok(ScanRef::Uid(s.to_string()))
        } else {
            Err(Error::InvalidScanRef(s.to_string()))
        }
    }
}

impl fmt::Display for ScanRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanRef::ScanId(id) => write!(f, "scan {id}"),
            ScanRef::Recent(n) => write!(f, "-{n}"),
            ScanRef::Uid(uid) => write!(f, "uid {uid}"),
        }
    }
}

/// Summary of one scan found in the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub uid: String,
    pub scan_id: i64,
    pub time: f64,
    pub path: PathBuf,
}

/// A scan catalog rooted at a directory.
#[derive(Debug, Clone)]
pub struct Catalog {
    root: PathBuf,
}

impl Catalog {
    /// Opens the catalog at `root`.
    ///
    /// # Errors
    /// Returns [`Error::CatalogNotFound`] if `root` is not a directory.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(Error::CatalogNotFound(root));
        }
        Ok(Self { root })
    }

    /// Opens a named catalog under [`CATALOG_DIR_ENV`].
    ///
    /// # Errors
    /// Returns [`Error::CatalogUnconfigured`] if the variable is unset, or
    /// [`Error::CatalogNotFound`] if the catalog directory does not exist.
    pub fn named(name: &str) -> Result<Self> {
        let base = std::env::var_os(CATALOG_DIR_ENV)
            .ok_or_else(|| Error::CatalogUnconfigured(name.to_string()))?;
        Self::open(PathBuf::from(base).join(name))
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lists every scan, oldest first by start time.
    ///
    /// Directories without a readable header are skipped with a warning.
    ///
    /// # Errors
    /// Returns an error if the catalog root cannot be listed.
    pub fn entries(&self) -> Result<Vec<CatalogEntry>> {
        let dirs: Vec<PathBuf> = fs::read_dir(&self.root)?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.join(HEADER_FILE).is_file())
            .collect();

        let mut entries: Vec<CatalogEntry> = dirs
            .into_par_iter()
            .filter_map(|path| match read_documents(&path) {
                Ok(docs) => Some(CatalogEntry {
                    uid: docs.start.uid,
                    scan_id: docs.start.scan_id,
                    time: docs.start.time,
                    path,
                }),
                Err(err) => {
                    log::warn!("skipping {}: {err}", path.display());
                    None
                }
            })
            .collect();
        entries.sort_by(|a, b| a.time.total_cmp(&b.time).then_with(|| a.uid.cmp(&b.uid)));
        Ok(entries)
    }

    /// Resolves a scan reference to its catalog entry.
    ///
    /// # Errors
    /// Returns [`Error::ScanNotFound`] or [`Error::AmbiguousUid`].
    pub fn find(&self, scan: &ScanRef) -> Result<CatalogEntry> {
        let mut entries = self.entries()?;
        let not_found = || Error::ScanNotFound(scan.to_string());
        match scan {
            ScanRef::ScanId(id) => entries
                .into_iter()
                .rev()
                .find(|entry| entry.scan_id == *id)
                .ok_or_else(not_found),
            ScanRef::Recent(n) => {
                if *n == 0 || *n > entries.len() {
                    return Err(not_found());
                }
                Ok(entries.swap_remove(entries.len() - n))
            }
            ScanRef::Uid(prefix) => {
                let mut matches: Vec<CatalogEntry> = entries
                    .into_iter()
                    .filter(|entry| entry.uid.starts_with(prefix.as_str()))
                    .collect();
                match matches.len() {
                    0 => Err(not_found()),
                    1 => Ok(matches.remove(0)),
                    count => Err(Error::AmbiguousUid {
                        prefix: prefix.clone(),
                        count,
                    }),
                }
            }
        }
    }

    /// Loads the header of a scan.
    ///
    /// # Errors
    /// See [`Catalog::find`]; also fails if the header document is unreadable.
    pub fn get(&self, scan: &ScanRef) -> Result<Header> {
        let entry = self.find(scan)?;
        let documents = read_documents(&entry.path)?;
        log::info!(
            "loaded scan {} ({}) from {}",
            entry.scan_id,
            entry.uid,
            entry.path.display()
        );
        Ok(Header::new(documents, DirectoryFrames::new(entry.path)))
    }

    /// Writes a scan into the catalog as raw frame stores.
    ///
    /// Returns the new scan directory.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] if the uid or a stream name is not a
    /// plain file name (see [`is_uid`]), or an error if any file cannot be
    /// written.
    pub fn insert(
        &self,
        documents: &HeaderDocuments,
        streams: &[(&str, &ArrayD<f64>)],
        sample_type: SampleType,
    ) -> Result<PathBuf> {
        let uid = documents.start.uid.as_str();
        if !is_uid(uid) {
            return Err(Error::InvalidFormat(format!("unusable scan uid {uid:?}")));
        }
        if let Some((stream, _)) = streams.iter().find(|(name, _)| !is_stream_name(name)) {
            return Err(Error::InvalidFormat(format!("unusable stream name {stream:?}")));
        }
        let dir = self.root.join(uid);
        fs::create_dir_all(&dir)?;
        let file = fs::File::create(dir.join(HEADER_FILE))?;
        serde_json::to_writer_pretty(file, documents)?;
        for (stream, frames) in streams {
            write_frames(
                dir.join(format!("{stream}.{FRAMES_EXTENSION}")),
                frames,
                sample_type,
            )?;
        }
        log::debug!("inserted scan {uid} with {} stream(s)", streams.len());
        Ok(dir)
    }
}

/// True if `uid` names a scan directory: non-empty ASCII letters, digits
/// and `-`, the same set scan references accept.
#[must_use]
pub fn is_uid(uid: &str) -> bool {
    !uid.is_empty() && uid.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

fn is_stream_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn read_documents(dir: &Path) -> Result<HeaderDocuments> {
    let bytes = fs::read(dir.join(HEADER_FILE))?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Frame source reading stream files from one scan directory.
#[derive(Debug, Clone)]
pub struct DirectoryFrames {
    dir: PathBuf,
}

impl DirectoryFrames {
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn load(&self, stream: &str) -> Result<Option<ArrayD<f64>>> {
        let raw = self.dir.join(format!("{stream}.{FRAMES_EXTENSION}"));
        if raw.is_file() {
            return read_frames(raw).map(Some);
        }
        #[cfg(feature = "hdf5")]
        {
            let h5 = self.dir.join(format!("{stream}.{HDF5_EXTENSION}"));
            if h5.is_file() {
                return crate::hdf5::read_frames_hdf5(h5, HDF5_DATASET).map(Some);
            }
        }
        Ok(None)
    }
}

impl FrameSource for DirectoryFrames {
    fn frames(&self, stream: &str) -> fluoscope_core::Result<ArrayD<f64>> {
        match self.load(stream) {
            Ok(Some(frames)) => Ok(frames),
            Ok(None) => Err(fluoscope_core::Error::MissingStream(stream.to_string())),
            Err(err) => Err(fluoscope_core::Error::FrameSource {
                stream: stream.to_string(),
                source: Box::new(err),
            }),
        }
    }

    fn streams(&self) -> Vec<String> {
        let Ok(read_dir) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = read_dir
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| {
                        ext == FRAMES_EXTENSION || (cfg!(feature = "hdf5") && ext == HDF5_EXTENSION)
                    })
            })
            .filter_map(|path| path.file_stem()?.to_str().map(str::to_string))
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluoscope_core::StartDocument;
    use ndarray::Array3;
    use tempfile::tempdir;

    fn documents(uid: &str, scan_id: i64, time: f64) -> HeaderDocuments {
        HeaderDocuments {
            start: StartDocument {
                uid: uid.to_string(),
                scan_id,
                time,
                detectors: vec!["cam1".to_string()],
                ..StartDocument::default()
            },
            ..HeaderDocuments::default()
        }
    }

    fn catalog_with_scans() -> (tempfile::TempDir, Catalog) {
        let dir = tempdir().unwrap();
        let catalog = Catalog::open(dir.path()).unwrap();
        let frames = Array3::from_elem((2, 3, 4), 8000.0).into_dyn();
        for (uid, scan_id, time) in [
            ("3f2a1c00", 96650, 10.0),
            ("3f2b9900", 96651, 20.0),
            ("a0000000", 96650, 30.0),
        ] {
            catalog
                .insert(
                    &documents(uid, scan_id, time),
                    &[("cam1_image", &frames)],
                    SampleType::U16,
                )
                .unwrap();
        }
        (dir, catalog)
    }

    #[test]
    fn test_parse_scan_ref() {
        assert_eq!("96650".parse::<ScanRef>().unwrap(), ScanRef::ScanId(96650));
        assert_eq!("-1".parse::<ScanRef>().unwrap(), ScanRef::Recent(1));
        assert_eq!(
            "3f2a1c".parse::<ScanRef>().unwrap(),
            ScanRef::Uid("3f2a1c".to_string())
        );
        assert!(matches!(
            "".parse::<ScanRef>(),
            Err(Error::InvalidScanRef(_))
        ));
        assert!(matches!(
            "../x".parse::<ScanRef>(),
            Err(Error::InvalidScanRef(_))
        ));
    }

    #[test]
    fn test_entries_sorted_by_time() {
        let (_dir, catalog) = catalog_with_scans();
        let uids: Vec<String> = catalog
            .entries()
            .unwrap()
            .into_iter()
            .map(|e| e.uid)
            .collect();
        assert_eq!(uids, ["3f2a1c00", "3f2b9900", "a0000000"]);
    }

    #[test]
    fn test_find_by_scan_id_prefers_newest() {
        let (_dir, catalog) = catalog_with_scans();
        let entry = catalog.find(&ScanRef::ScanId(96650)).unwrap();
        assert_eq!(entry.uid, "a0000000");
        assert!(matches!(
            catalog.find(&ScanRef::ScanId(1)),
            Err(Error::ScanNotFound(_))
        ));
    }

    #[test]
    fn test_find_recent() {
        let (_dir, catalog) = catalog_with_scans();
        assert_eq!(catalog.find(&ScanRef::Recent(1)).unwrap().uid, "a0000000");
        assert_eq!(catalog.find(&ScanRef::Recent(3)).unwrap().uid, "3f2a1c00");
        assert!(catalog.find(&ScanRef::Recent(4)).is_err());
        assert!(catalog.find(&ScanRef::Recent(0)).is_err());
    }

    #[test]
    fn test_find_uid_prefix() {
        let (_dir, catalog) = catalog_with_scans();
        assert_eq!(
            catalog
                .find(&ScanRef::Uid("3f2b".to_string()))
                .unwrap()
                .scan_id,
            96651
        );
        assert!(matches!(
            catalog.find(&ScanRef::Uid("3f2".to_string())),
            Err(Error::AmbiguousUid { count: 2, .. })
        ));
    }

    #[test]
    fn test_get_reads_frames_lazily() {
        let (_dir, catalog) = catalog_with_scans();
        let header = catalog.get(&ScanRef::Recent(1)).unwrap();
        assert_eq!(header.camera().unwrap(), "cam1");
        assert_eq!(header.streams(), vec!["cam1_image".to_string()]);
        let frames = header.data("cam1_image").unwrap();
        assert_eq!(frames.shape(), &[2, 3, 4]);
        assert!(matches!(
            header.data("cam2_image"),
            Err(fluoscope_core::Error::MissingStream(_))
        ));
    }

    #[test]
    fn test_corrupt_store_surfaces_as_frame_source_error() {
        let (_dir, catalog) = catalog_with_scans();
        let entry = catalog.find(&ScanRef::Recent(1)).unwrap();
        fs::write(entry.path.join("cam1_image.frames"), b"garbage").unwrap();
        let header = catalog.get(&ScanRef::Recent(1)).unwrap();
        assert!(matches!(
            header.data("cam1_image"),
            Err(fluoscope_core::Error::FrameSource { .. })
        ));
    }

    #[test]
    fn test_insert_rejects_path_like_names() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("catalog");
        fs::create_dir(&root).unwrap();
        let catalog = Catalog::open(&root).unwrap();
        let frames = Array3::from_elem((1, 2, 2), 1.0).into_dyn();

        for uid in ["..", ".", "", "a/b", "a\\b", "x y"] {
            assert!(
                matches!(
                    catalog.insert(&documents(uid, 1, 1.0), &[], SampleType::U16),
                    Err(Error::InvalidFormat(_))
                ),
                "uid {uid:?} accepted"
            );
        }
        assert!(matches!(
            catalog.insert(
                &documents("c0ffee", 1, 1.0),
                &[("../cam1_image", &frames)],
                SampleType::U16
            ),
            Err(Error::InvalidFormat(_))
        ));
        assert!(!dir.path().join(HEADER_FILE).exists());
        assert!(!root.join(HEADER_FILE).exists());
        assert!(!root.join("c0ffee").exists());
        assert!(catalog.entries().unwrap().is_empty());
    }

    #[test]
    fn test_open_missing_root() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            Catalog::open(dir.path().join("nope")),
            Err(Error::CatalogNotFound(_))
        ));
    }
}
