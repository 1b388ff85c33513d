//! fluoscope-view: Figure model, ROI overlays and rendering for source checks.
//!
//! This crate is the display side of a source check. It keeps a small figure
//! model (panels, images, colorbars, rectangle artists), draws and removes ROI
//! overlays through handles, rasterizes figures to PNG, and builds the two
//! source-check views on top of `fluoscope-core`.
//!

mod colormap;
pub mod config;
pub mod display;
mod error;
pub mod figure;
mod overlay;
pub mod raster;
pub mod source_check;
mod util;

pub use colormap::Colormap;
pub use config::{DifferenceRois, IntensityBounds, PatchStyle, SourceCheckConfig};
pub use display::{Display, DisplayMode};
pub use error::{Error, Result};
pub use figure::{
    Axes, Color, Figure, FigureSize, FigureSummary, Normalize, OverlayHandle, Rectangle,
    DEFAULT_DPI,
};
pub use overlay::{add_patches, draw_rois, remove_patches, roi_patches};
pub use raster::{render, save_figure, MAX_CANVAS_PIXELS};
pub use source_check::{averaged_image, compare_images, plot_img_with_roi};
