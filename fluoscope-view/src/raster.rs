//! Rasterizes figures to RGBA images.
//!
//! Panels sit side by side. Within a panel the image is stretched to fill its
//! box (no aspect lock) with the colorbar to its right. Image pixel `(r, c)`
//! covers data coordinates `[c - 0.5, c + 0.5] x [r - 0.5, r + 0.5]` with row 0
//! at the top, so rectangles given in pixel-index coordinates land on the
//! pixels they name. Titles are not drawn; they travel in the figure summary.

use crate::figure::{Axes, Normalize};
use crate::util::{f64_to_u32_clamped, f64_to_usize_bounded, u32_to_f64, usize_to_f64};
use crate::{Color, Error, Figure, Rectangle, Result};
use image::{Rgba, RgbaImage};
use rayon::prelude::*;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

// Panel box fractions of the panel cell.
const IMAGE_LEFT: f64 = 0.05;
const IMAGE_WIDTH: f64 = 0.72;
const IMAGE_TOP: f64 = 0.12;
const IMAGE_HEIGHT: f64 = 0.80;
const COLORBAR_GAP: f64 = 0.04;
const COLORBAR_WIDTH: f64 = 0.05;

const POINTS_PER_INCH: f64 = 72.0;

/// Largest canvas [`render`] will allocate, in pixels.
pub const MAX_CANVAS_PIXELS: usize = 1 << 26;

/// A pixel-aligned box on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    fn contains_row(&self, py: u32) -> bool {
        py >= self.y && py < self.y + self.height
    }

    fn right(&self) -> u32 {
        self.x + self.width
    }

    fn bottom(&self) -> u32 {
        self.y + self.height
    }

    fn is_border(&self, px: u32, py: u32) -> bool {
        px == self.x || py == self.y || px + 1 == self.right() || py + 1 == self.bottom()
    }
}

/// Where one panel's image and colorbar go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PanelLayout {
    pub image: PixelRect,
    pub colorbar: Option<PixelRect>,
}

/// Canvas size of a figure in pixels.
#[must_use]
pub fn pixel_size(figure: &Figure) -> (u32, u32) {
    let size = figure.size();
    let width = f64_to_u32_clamped((size.width_in * figure.dpi()).round(), u32::MAX).max(1);
    let height = f64_to_u32_clamped((size.height_in * figure.dpi()).round(), u32::MAX).max(1);
    (width, height)
}

pub(crate) fn layout_panels(figure: &Figure, width: u32, height: u32) -> Vec<PanelLayout> {
    let panels = figure.panels();
    let cell_width = u32_to_f64(width) / usize_to_f64(panels.len().max(1));
    let cell_height = u32_to_f64(height);
    let px = |v: f64| f64_to_u32_clamped(v.round(), u32::MAX);

    panels
        .iter()
        .enumerate()
        .map(|(i, axes)| {
            let cell_x = cell_width * usize_to_f64(i);
            let image = PixelRect {
                x: px(cell_x + IMAGE_LEFT * cell_width),
                y: px(IMAGE_TOP * cell_height),
                width: px(IMAGE_WIDTH * cell_width).max(1),
                height: px(IMAGE_HEIGHT * cell_height).max(1),
            };
            let colorbar = axes.colorbar_settings().map(|bar| {
                let bar_height = px(u32_to_f64(image.height) * bar.shrink).max(1);
                PixelRect {
                    x: image.right() + px(COLORBAR_GAP * cell_width),
                    y: image.y + (image.height - bar_height.min(image.height)) / 2,
                    width: px(COLORBAR_WIDTH * cell_width).max(1),
                    height: bar_height.min(image.height),
                }
            });
            PanelLayout { image, colorbar }
        })
        .collect()
}

struct PreparedPanel<'a> {
    axes: &'a Axes,
    layout: PanelLayout,
    bounds: Option<(f64, f64)>,
}

impl PreparedPanel<'_> {
    fn paint_row(&self, py: u32, row: &mut [u8]) {
        let frame = &self.layout.image;
        if frame.contains_row(py) {
            if let (Some(image), Some(bounds)) = (self.axes.image(), self.bounds) {
                let (rows, cols) = image.data.dim();
                let fy = (u32_to_f64(py - frame.y) + 0.5) / u32_to_f64(frame.height);
                if let Some(r) = f64_to_usize_bounded(fy * usize_to_f64(rows), rows) {
                    for px in frame.x..frame.right() {
                        let fx = (u32_to_f64(px - frame.x) + 0.5) / u32_to_f64(frame.width);
                        let Some(c) = f64_to_usize_bounded(fx * usize_to_f64(cols), cols) else {
                            continue;
                        };
                        let t = Normalize::scale(bounds, image.data[[r, c]]);
                        put(row, px, image.colormap.apply(t));
                    }
                }
            }
            if self.axes.axis_visible() {
                for px in frame.x..frame.right() {
                    if frame.is_border(px, py) {
                        put(row, px, Color::BLACK.to_rgba());
                    }
                }
            }
        }

        if let (Some(bar), Some(image)) = (self.layout.colorbar, self.axes.image()) {
            if bar.contains_row(py) {
                let t = 1.0 - (u32_to_f64(py - bar.y) + 0.5) / u32_to_f64(bar.height);
                let fill = image.colormap.apply(t);
                for px in bar.x..bar.right() {
                    let rgba = if bar.is_border(px, py) {
                        Color::BLACK.to_rgba()
                    } else {
                        fill
                    };
                    put(row, px, rgba);
                }
            }
        }
    }

    fn stroke_overlays(&self, canvas: &mut RgbaImage, dpi: f64) {
        let Some(image) = self.axes.image() else {
            return;
        };
        let (rows, cols) = image.data.dim();
        let frame = self.layout.image;
        let sx = u32_to_f64(frame.width) / usize_to_f64(cols);
        let sy = u32_to_f64(frame.height) / usize_to_f64(rows);
        let to_px = |x: f64| u32_to_f64(frame.x) + (x + 0.5) * sx;
        let to_py = |y: f64| u32_to_f64(frame.y) + (y + 0.5) * sy;

        for rect in self.axes.patches() {
            let left = to_px(rect.x.min(rect.x + rect.width));
            let right = to_px(rect.x.max(rect.x + rect.width));
            let top = to_py(rect.y.min(rect.y + rect.height));
            let bottom = to_py(rect.y.max(rect.y + rect.height));
            stroke_rect(canvas, frame, (left, top, right, bottom), rect, dpi);
        }
    }
}

fn put(row: &mut [u8], px: u32, rgba: [u8; 4]) {
    if rgba[3] == 0 {
        return;
    }
    let offset = px as usize * 4;
    if let Some(pixel) = row.get_mut(offset..offset + 4) {
        pixel.copy_from_slice(&rgba);
    }
}

/// Fills pixels of `[x0, x1) x [y0, y1)` clipped to `clip`.
fn fill_span(canvas: &mut RgbaImage, clip: PixelRect, span: (f64, f64, f64, f64), color: Rgba<u8>) {
    let (x0, y0, x1, y1) = span;
    let clamp_x = |v: f64| f64_to_u32_clamped(v.round(), u32::MAX).clamp(clip.x, clip.right());
    let clamp_y = |v: f64| f64_to_u32_clamped(v.round(), u32::MAX).clamp(clip.y, clip.bottom());
    for py in clamp_y(y0)..clamp_y(y1) {
        for px in clamp_x(x0)..clamp_x(x1) {
            canvas.put_pixel(px, py, color);
        }
    }
}

fn stroke_rect(
    canvas: &mut RgbaImage,
    clip: PixelRect,
    bounds: (f64, f64, f64, f64),
    rect: &Rectangle,
    dpi: f64,
) {
    let (left, top, right, bottom) = bounds;
    if let Some(fill) = rect.fill {
        fill_span(canvas, clip, bounds, Rgba(fill.to_rgba()));
    }
    let thickness = (rect.line_width * dpi / POINTS_PER_INCH).round().max(1.0);
    let half = thickness / 2.0;
    let edge = Rgba(rect.edge_color.to_rgba());
    // Top, bottom, left, right.
    fill_span(canvas, clip, (left - half, top - half, right + half, top + half), edge);
    fill_span(canvas, clip, (left - half, bottom - half, right + half, bottom + half), edge);
    fill_span(canvas, clip, (left - half, top - half, left + half, bottom + half), edge);
    fill_span(canvas, clip, (right - half, top - half, right + half, bottom + half), edge);
}

/// Renders a figure to an RGBA canvas on a white background.
///
/// # Errors
/// [`Error::ConfigError`] if the canvas would exceed [`MAX_CANVAS_PIXELS`]
/// or its buffer cannot be assembled.
pub fn render(figure: &Figure) -> Result<RgbaImage> {
    let (width, height) = pixel_size(figure);
    let stride = width as usize * 4;
    let len = (width as usize)
        .checked_mul(height as usize)
        .filter(|&count| count <= MAX_CANVAS_PIXELS)
        .map(|count| count * 4)
        .ok_or_else(|| {
            Error::ConfigError(format!(
                "{width}x{height} canvas exceeds {MAX_CANVAS_PIXELS} pixels"
            ))
        })?;
    let layouts = layout_panels(figure, width, height);
    let prepared: Vec<PreparedPanel<'_>> = figure
        .panels()
        .iter()
        .zip(layouts)
        .map(|(axes, layout)| PreparedPanel {
            axes,
            layout,
            bounds: axes.image().map(|image| image.norm.resolve(&image.data)),
        })
        .collect();

    let mut pixels = vec![255u8; len];
    pixels
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(py, row)| {
            let py = u32::try_from(py).unwrap_or(u32::MAX);
            for panel in &prepared {
                panel.paint_row(py, row);
            }
        });

    let mut canvas = RgbaImage::from_raw(width, height, pixels).ok_or_else(|| {
        Error::ConfigError(format!("cannot build a {width}x{height} canvas"))
    })?;
    for panel in &prepared {
        panel.stroke_overlays(&mut canvas, figure.dpi());
    }
    log::debug!(
        "rendered {} panel(s) into {width}x{height} pixels",
        prepared.len()
    );
    Ok(canvas)
}

/// Renders a figure and writes it as PNG, with its JSON summary beside it.
///
/// Returns the PNG path. The summary goes to the same path with a `.json`
/// extension.
///
/// # Errors
/// Returns an error if rendering, encoding or writing fails.
pub fn save_figure(figure: &Figure, path: &Path) -> Result<PathBuf> {
    let canvas = render(figure)?;
    canvas.save_with_format(path, image::ImageFormat::Png)?;

    let summary_path = path.with_extension("json");
    let writer = BufWriter::new(File::create(&summary_path)?);
    serde_json::to_writer_pretty(writer, &figure.summary())?;
    log::info!("wrote {}", path.display());
    Ok(path.to_path_buf())
}
