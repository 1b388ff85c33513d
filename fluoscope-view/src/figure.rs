//! Figure model: panels of images with rectangle overlays.
//!
//! A [`Figure`] is the display surface. Each of its [`Axes`] may show one
//! image layer, a colorbar and any number of rectangle artists. Adding a
//! rectangle returns an [`OverlayHandle`], the only way to remove it again.

use crate::{Colormap, Error, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_FIGURE_ID: AtomicU64 = AtomicU64::new(1);

/// Dots per inch used when no other resolution is requested.
pub const DEFAULT_DPI: f64 = 100.0;

/// An sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub [u8; 3]);

impl Color {
    pub const AQUAMARINE: Color = Color([127, 255, 212]);
    pub const BLACK: Color = Color([0, 0, 0]);
    pub const WHITE: Color = Color([255, 255, 255]);

    /// RGBA bytes with full opacity.
    #[must_use]
    pub fn to_rgba(self) -> [u8; 4] {
        let [r, g, b] = self.0;
        [r, g, b, 255]
    }
}

/// Figure size in inches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FigureSize {
    pub width_in: f64,
    pub height_in: f64,
}

impl FigureSize {
    #[must_use]
    pub fn new(width_in: f64, height_in: f64) -> Self {
        Self {
            width_in,
            height_in,
        }
    }
}

/// How image values map onto the colormap range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Normalize {
    /// Fixed intensity bounds; values outside are clamped.
    Fixed { vmin: f64, vmax: f64 },
    /// Bounds taken from the finite minimum and maximum of the data.
    Auto,
}

impl Normalize {
    /// Resolves the `(vmin, vmax)` bounds for `data`.
    #[must_use]
    pub fn resolve(&self, data: &Array2<f64>) -> (f64, f64) {
        match *self {
            Normalize::Fixed { vmin, vmax } => (vmin, vmax),
            Normalize::Auto => {
                let (min, max) = data
                    .iter()
                    .copied()
                    .filter(|v| v.is_finite())
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                        (lo.min(v), hi.max(v))
                    });
                if min.is_finite() {
                    (min, max)
                } else {
                    (0.0, 1.0)
                }
            }
        }
    }

    /// Maps `value` into [0, 1] (unclamped) given resolved bounds.
    #[must_use]
    pub fn scale(bounds: (f64, f64), value: f64) -> f64 {
        let (vmin, vmax) = bounds;
        if vmax > vmin {
            (value - vmin) / (vmax - vmin)
        } else {
            0.0
        }
    }
}

/// An image shown on an axes.
#[derive(Debug, Clone)]
pub struct ImageLayer {
    pub data: Array2<f64>,
    pub norm: Normalize,
    pub colormap: Colormap,
}

/// Colorbar legend attached to an axes' image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Colorbar {
    /// Fraction of the image height the bar occupies.
    pub shrink: f64,
}

/// A rectangle outline in image data coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Line width in points.
    pub line_width: f64,
    pub edge_color: Color,
    /// `None` leaves the interior unfilled.
    pub fill: Option<Color>,
    pub label: String,
}

/// Reference to a rectangle added to a figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverlayHandle {
    figure: u64,
    axes: usize,
    artist: u64,
}

impl OverlayHandle {
    /// Index of the axes the artist was added to.
    #[must_use]
    pub fn axes(&self) -> usize {
        self.axes
    }
}

impl fmt::Display for OverlayHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "figure {} axes {} artist {}",
            self.figure, self.axes, self.artist
        )
    }
}

/// One panel of a figure.
#[derive(Debug, Clone)]
pub struct Axes {
    image: Option<ImageLayer>,
    colorbar: Option<Colorbar>,
    title: String,
    axis_visible: bool,
    artists: Vec<(u64, Rectangle)>,
}

impl Default for Axes {
    fn default() -> Self {
        Self {
            image: None,
            colorbar: None,
            title: String::new(),
            axis_visible: true,
            artists: Vec::new(),
        }
    }
}

impl Axes {
    /// Shows `data` as an image, replacing any previous one.
    pub fn imshow(&mut self, data: Array2<f64>, norm: Normalize, colormap: Colormap) {
        self.image = Some(ImageLayer {
            data,
            norm,
            colormap,
        });
    }

    /// Attaches a colorbar legend.
    pub fn colorbar(&mut self, shrink: f64) {
        self.colorbar = Some(Colorbar { shrink });
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Hides ticks and frame.
    pub fn axis_off(&mut self) {
        self.axis_visible = false;
    }

    #[must_use]
    pub fn image(&self) -> Option<&ImageLayer> {
        self.image.as_ref()
    }

    #[must_use]
    pub fn colorbar_settings(&self) -> Option<Colorbar> {
        self.colorbar
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn axis_visible(&self) -> bool {
        self.axis_visible
    }

    /// Rectangles currently drawn, in insertion order.
    pub fn patches(&self) -> impl Iterator<Item = &Rectangle> {
        self.artists.iter().map(|(_, rect)| rect)
    }

    /// Number of artists currently drawn.
    #[must_use]
    pub fn artist_count(&self) -> usize {
        self.artists.len()
    }
}

/// A display surface made of side-by-side panels.
#[derive(Debug, Clone)]
pub struct Figure {
    id: u64,
    size: FigureSize,
    dpi: f64,
    axes: Vec<Axes>,
    next_artist: u64,
}

impl Figure {
    /// Creates a figure with `panels` axes laid out in one row.
    #[must_use]
    pub fn subplots(panels: usize, size: FigureSize) -> Self {
        Self {
            id: NEXT_FIGURE_ID.fetch_add(1, Ordering::Relaxed),
            size,
            dpi: DEFAULT_DPI,
            axes: vec![Axes::default(); panels],
            next_artist: 1,
        }
    }

    /// Sets the rendering resolution.
    #[must_use]
    pub fn with_dpi(mut self, dpi: f64) -> Self {
        self.dpi = dpi;
        self
    }

    #[must_use]
    pub fn size(&self) -> FigureSize {
        self.size
    }

    #[must_use]
    pub fn dpi(&self) -> f64 {
        self.dpi
    }

    #[must_use]
    pub fn panels(&self) -> &[Axes] {
        &self.axes
    }

    /// Returns the axes at `index`.
    ///
    /// # Errors
    /// [`Error::NoSuchAxes`] if the index is out of range.
    pub fn axes(&self, index: usize) -> Result<&Axes> {
        let panels = self.axes.len();
        self.axes
            .get(index)
            .ok_or(Error::NoSuchAxes { index, panels })
    }

    /// Returns the axes at `index` for modification.
    ///
    /// # Errors
    /// [`Error::NoSuchAxes`] if the index is out of range.
    pub fn axes_mut(&mut self, index: usize) -> Result<&mut Axes> {
        let panels = self.axes.len();
        self.axes
            .get_mut(index)
            .ok_or(Error::NoSuchAxes { index, panels })
    }

    /// Adds a rectangle to an axes.
    ///
    /// # Errors
    /// [`Error::NoSuchAxes`] if the index is out of range.
    pub fn add_patch(&mut self, axes: usize, rect: Rectangle) -> Result<OverlayHandle> {
        let artist = self.next_artist;
        self.axes_mut(axes)?.artists.push((artist, rect));
        self.next_artist += 1;
        Ok(OverlayHandle {
            figure: self.id,
            axes,
            artist,
        })
    }

    /// Removes the artist `handle` refers to.
    ///
    /// # Errors
    /// [`Error::StaleHandle`] if the artist was already removed or the handle
    /// belongs to another figure.
    pub fn remove(&mut self, handle: &OverlayHandle) -> Result<()> {
        let stale = || Error::StaleHandle(handle.to_string());
        if handle.figure != self.id {
            return Err(stale());
        }
        let axes = self.axes.get_mut(handle.axes).ok_or_else(stale)?;
        let position = axes
            .artists
            .iter()
            .position(|(id, _)| *id == handle.artist)
            .ok_or_else(stale)?;
        axes.artists.remove(position);
        Ok(())
    }

    /// Total number of artists across all panels.
    #[must_use]
    pub fn artist_count(&self) -> usize {
        self.axes.iter().map(Axes::artist_count).sum()
    }

    /// Serializable description of what the figure shows.
    #[must_use]
    pub fn summary(&self) -> FigureSummary {
        FigureSummary {
            size: self.size,
            dpi: self.dpi,
            panels: self
                .axes
                .iter()
                .map(|axes| PanelSummary {
                    title: axes.title.clone(),
                    axis_visible: axes.axis_visible,
                    image: axes.image.as_ref().map(|image| {
                        let (vmin, vmax) = image.norm.resolve(&image.data);
                        ImageSummary {
                            shape: [image.data.nrows(), image.data.ncols()],
                            norm: image.norm,
                            vmin,
                            vmax,
                            colormap: image.colormap,
                        }
                    }),
                    colorbar: axes.colorbar,
                    overlays: axes.patches().cloned().collect(),
                })
                .collect(),
        }
    }
}

/// Description of a figure, written beside rendered output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FigureSummary {
    pub size: FigureSize,
    pub dpi: f64,
    pub panels: Vec<PanelSummary>,
}

/// Description of one panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelSummary {
    pub title: String,
    pub axis_visible: bool,
    pub image: Option<ImageSummary>,
    pub colorbar: Option<Colorbar>,
    pub overlays: Vec<Rectangle>,
}

/// Description of a panel's image layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageSummary {
    pub shape: [usize; 2],
    pub norm: Normalize,
    /// Resolved lower bound.
    pub vmin: f64,
    /// Resolved upper bound.
    pub vmax: f64,
    pub colormap: Colormap,
}
