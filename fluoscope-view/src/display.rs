//! Session display: where shown figures end up.
//!
//! [`Display::init`] is called once per session. In interactive mode every
//! figure is written the moment it is shown; in batch mode figures queue up
//! until [`Display::flush`].

use crate::raster::save_figure;
use crate::{Figure, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// How shown figures are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    /// Write each figure as soon as it is shown.
    #[default]
    Interactive,
    /// Hold figures until [`Display::flush`].
    Batch,
}

/// Output target for a plotting session.
#[derive(Debug)]
pub struct Display {
    mode: DisplayMode,
    output_dir: PathBuf,
    pending: Vec<(String, Figure)>,
    written: Vec<PathBuf>,
}

impl Display {
    /// Sets up the session display, creating `output_dir` if needed.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn init<P: AsRef<Path>>(mode: DisplayMode, output_dir: P) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        fs::create_dir_all(&output_dir)?;
        log::debug!("display ({mode:?}) writing to {}", output_dir.display());
        Ok(Self {
            mode,
            output_dir,
            pending: Vec::new(),
            written: Vec::new(),
        })
    }

    #[must_use]
    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Shows a figure under `name`.
    ///
    /// Returns the written PNG path in interactive mode and `None` when the
    /// figure was queued.
    ///
    /// # Errors
    /// Returns an error if writing the figure fails.
    pub fn show(&mut self, name: &str, figure: Figure) -> Result<Option<PathBuf>> {
        match self.mode {
            DisplayMode::Interactive => self.write(name, &figure).map(Some),
            DisplayMode::Batch => {
                self.pending.push((name.to_string(), figure));
                Ok(None)
            }
        }
    }

    /// Writes all queued figures, in the order they were shown.
    ///
    /// # Errors
    /// Returns an error on the first figure that cannot be written; figures
    /// after it stay queued.
    pub fn flush(&mut self) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::with_capacity(self.pending.len());
        while !self.pending.is_empty() {
            let (name, figure) = self.pending.remove(0);
            match self.write(&name, &figure) {
                Ok(path) => paths.push(path),
                Err(err) => {
                    self.pending.insert(0, (name, figure));
                    return Err(err);
                }
            }
        }
        Ok(paths)
    }

    /// Number of figures waiting for [`Display::flush`].
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Every PNG written so far.
    #[must_use]
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn write(&mut self, name: &str, figure: &Figure) -> Result<PathBuf> {
        let path = self
            .output_dir
            .join(format!("{}.png", sanitize_file_stem(name)));
        let path = save_figure(figure, &path)?;
        self.written.push(path.clone());
        Ok(path)
    }
}

impl Drop for Display {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            log::warn!(
                "dropping display with {} unflushed figure(s)",
                self.pending.len()
            );
        }
    }
}

fn sanitize_file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "figure".to_string()
    } else {
        stem
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FigureSize;
    use tempfile::tempdir;

    #[test]
    fn test_interactive_writes_immediately() {
        let dir = tempdir().unwrap();
        let mut display = Display::init(DisplayMode::Interactive, dir.path().join("out")).unwrap();
        let path = display
            .show("scan 96650", Figure::subplots(1, FigureSize::new(1.0, 1.0)))
            .unwrap()
            .unwrap();
        assert_eq!(path, dir.path().join("out").join("scan_96650.png"));
        assert!(path.exists());
        assert!(path.with_extension("json").exists());
        assert_eq!(display.written().len(), 1);
    }

    #[test]
    fn test_batch_waits_for_flush() {
        let dir = tempdir().unwrap();
        let mut display = Display::init(DisplayMode::Batch, dir.path()).unwrap();
        let fig = Figure::subplots(1, FigureSize::new(1.0, 1.0));
        assert!(display.show("first", fig.clone()).unwrap().is_none());
        assert!(display.show("second", fig).unwrap().is_none());
        assert_eq!(display.pending(), 2);
        assert!(!dir.path().join("first.png").exists());

        let paths = display.flush().unwrap();
        assert_eq!(paths.len(), 2);
        assert_eq!(display.pending(), 0);
        assert!(dir.path().join("second.png").exists());
    }

    #[test]
    fn test_sanitize_file_stem() {
        assert_eq!(sanitize_file_stem("compare 1/2"), "compare_1_2");
        assert_eq!(sanitize_file_stem(""), "figure");
    }
}
