//! Source-check display configuration.
//!
//! The defaults reproduce the fluorescent-screen camera setup: a fixed crop
//! around the beam spot, a fixed intensity window, four ROIs drawn as thin
//! aquamarine outlines. A JSON file may override any subset of fields.

use crate::raster::MAX_CANVAS_PIXELS;
use crate::{Color, Colormap, Error, FigureSize, Result, DEFAULT_DPI};
use fluoscope_core::{CropWindow, RoiOffset};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::ops::Range;
use std::path::Path;

/// Rows of the camera image kept by the source-check crop.
pub const FLUOSCREEN_ROWS: Range<usize> = 460..960;
/// Columns of the camera image kept by the source-check crop.
pub const FLUOSCREEN_COLS: Range<usize> = 1340..1490;
/// Lower intensity bound of the camera panels.
pub const FLUOSCREEN_VMIN: f64 = 7500.0;
/// Upper intensity bound of the camera panels.
pub const FLUOSCREEN_VMAX: f64 = 15_000.0;
/// Number of ROIs configured on the camera.
pub const DEFAULT_ROI_COUNT: usize = 4;
pub const DEFAULT_TITLE: &str = "Image with ROIs";
pub const DIFFERENCE_TITLE: &str = "Difference\n Observable X-angle Shift";
pub const SINGLE_FIGURE_SIZE: FigureSize = FigureSize {
    width_in: 5.0,
    height_in: 5.0,
};
pub const COMPARE_FIGURE_SIZE: FigureSize = FigureSize {
    width_in: 10.0,
    height_in: 3.0,
};
pub const COLORBAR_SHRINK: f64 = 0.3;

/// Intensity window mapped onto the colormap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntensityBounds {
    pub vmin: f64,
    pub vmax: f64,
}

impl Default for IntensityBounds {
    fn default() -> Self {
        Self {
            vmin: FLUOSCREEN_VMIN,
            vmax: FLUOSCREEN_VMAX,
        }
    }
}

/// Visual style of ROI rectangles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatchStyle {
    /// Line width in points.
    pub line_width: f64,
    pub edge_color: Color,
    pub fill: Option<Color>,
}

impl Default for PatchStyle {
    fn default() -> Self {
        Self {
            line_width: 1.0,
            edge_color: Color::AQUAMARINE,
            fill: None,
        }
    }
}

/// Which scan's ROI geometry decorates the difference panel of a comparison.
///
/// `Second` matches the historical source-check output. `First` is available
/// for when the two scans were taken with different ROI settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifferenceRois {
    First,
    #[default]
    Second,
}

/// Display configuration for source-check plots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceCheckConfig {
    pub crop: CropWindow,
    pub intensity: IntensityBounds,
    pub roi_count: usize,
    pub roi_style: PatchStyle,
    /// Palette of the single-image plot.
    pub single_colormap: Colormap,
    /// Palette of the two scan panels of a comparison.
    pub compare_colormap: Colormap,
    /// Palette of the difference panel.
    pub difference_colormap: Colormap,
    pub single_figure_size: FigureSize,
    pub compare_figure_size: FigureSize,
    pub colorbar_shrink: f64,
    pub dpi: f64,
    pub difference_rois: DifferenceRois,
}

impl Default for SourceCheckConfig {
    fn default() -> Self {
        Self {
            crop: CropWindow::new(FLUOSCREEN_ROWS, FLUOSCREEN_COLS),
            intensity: IntensityBounds::default(),
            roi_count: DEFAULT_ROI_COUNT,
            roi_style: PatchStyle::default(),
            single_colormap: Colormap::Jet,
            compare_colormap: Colormap::Viridis,
            difference_colormap: Colormap::Viridis,
            single_figure_size: SINGLE_FIGURE_SIZE,
            compare_figure_size: COMPARE_FIGURE_SIZE,
            colorbar_shrink: COLORBAR_SHRINK,
            dpi: DEFAULT_DPI,
            difference_rois: DifferenceRois::default(),
        }
    }
}

impl SourceCheckConfig {
    /// Load configuration from a JSON file. Missing fields keep their defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let config: Self = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON string. Missing fields keep their defaults.
    ///
    /// # Errors
    /// Returns an error if the string is not valid JSON or fails validation.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// ROI origin offset: the crop's first column and first row.
    #[must_use]
    pub fn roi_offset(&self) -> RoiOffset {
        #[allow(clippy::cast_precision_loss)]
        let (h1, v1) = (self.crop.cols.start as f64, self.crop.rows.start as f64);
        RoiOffset::new(h1, v1)
    }

    /// Checks that the configuration can be rendered.
    ///
    /// # Errors
    /// [`Error::ConfigError`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.crop.rows.is_empty() || self.crop.cols.is_empty() {
            return Err(Error::ConfigError(format!(
                "crop window rows {:?} cols {:?} is empty",
                self.crop.rows, self.crop.cols
            )));
        }
        if self.intensity.vmin >= self.intensity.vmax {
            return Err(Error::ConfigError(format!(
                "intensity bounds must satisfy vmin < vmax, got [{}, {}]",
                self.intensity.vmin, self.intensity.vmax
            )));
        }
        if !(self.colorbar_shrink > 0.0 && self.colorbar_shrink <= 1.0) {
            return Err(Error::ConfigError(format!(
                "colorbar shrink must be in (0, 1], got {}",
                self.colorbar_shrink
            )));
        }
        for (name, size) in [
            ("single_figure_size", self.single_figure_size),
            ("compare_figure_size", self.compare_figure_size),
        ] {
            if !(size.width_in > 0.0 && size.height_in > 0.0) {
                return Err(Error::ConfigError(format!(
                    "{name} must be positive, got {}x{}",
                    size.width_in, size.height_in
                )));
            }
        }
        if !(self.dpi > 0.0) {
            return Err(Error::ConfigError(format!("dpi must be positive, got {}", self.dpi)));
        }
        #[allow(clippy::cast_precision_loss)]
        let max_pixels = MAX_CANVAS_PIXELS as f64;
        for (name, size) in [
            ("single_figure_size", self.single_figure_size),
            ("compare_figure_size", self.compare_figure_size),
        ] {
            let pixels = (size.width_in * self.dpi).round() * (size.height_in * self.dpi).round();
            if !(pixels <= max_pixels) {
                return Err(Error::ConfigError(format!(
                    "{name} at {} dpi needs {pixels} pixels, limit is {MAX_CANVAS_PIXELS}",
                    self.dpi
                )));
            }
        }
        Ok(())
    }
}
