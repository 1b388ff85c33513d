//! Drawing ROI rectangles onto figure panels and taking them down again.

use crate::config::PatchStyle;
use crate::{Figure, OverlayHandle, Rectangle, Result};
use fluoscope_core::RoiDescriptor;

/// Builds one styled rectangle per ROI, in input order.
#[must_use]
pub fn roi_patches(rois: &[RoiDescriptor], style: &PatchStyle) -> Vec<Rectangle> {
    rois.iter()
        .map(|roi| Rectangle {
            x: roi.x,
            y: roi.y,
            width: roi.width,
            height: roi.height,
            line_width: style.line_width,
            edge_color: style.edge_color,
            fill: style.fill,
            label: roi.label.clone(),
        })
        .collect()
}

/// Adds rectangles to an axes and returns their handles in the same order.
///
/// # Errors
/// Returns an error if `axes` does not exist on the figure.
pub fn add_patches(
    figure: &mut Figure,
    axes: usize,
    patches: Vec<Rectangle>,
) -> Result<Vec<OverlayHandle>> {
    let handles = patches
        .into_iter()
        .map(|patch| figure.add_patch(axes, patch))
        .collect::<Result<Vec<_>>>()?;
    log::debug!("added {} overlay(s) to axes {axes}", handles.len());
    Ok(handles)
}

/// Draws ROI outlines on an axes.
///
/// # Errors
/// Returns an error if `axes` does not exist on the figure.
pub fn draw_rois(
    figure: &mut Figure,
    axes: usize,
    rois: &[RoiDescriptor],
    style: &PatchStyle,
) -> Result<Vec<OverlayHandle>> {
    add_patches(figure, axes, roi_patches(rois, style))
}

/// Removes previously added rectangles, in input order.
///
/// Removal stops at the first handle that is no longer live; handles before
/// it stay removed.
///
/// # Errors
/// [`crate::Error::StaleHandle`] for a handle that was already removed or
/// belongs to another figure.
pub fn remove_patches(figure: &mut Figure, handles: &[OverlayHandle]) -> Result<()> {
    for handle in handles {
        figure.remove(handle)?;
    }
    log::debug!("removed {} overlay(s)", handles.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Color, Error, FigureSize};

    fn rois(count: usize) -> Vec<RoiDescriptor> {
        (1..=count)
            .map(|index| RoiDescriptor {
                index,
                x: 10.0 * index as f64,
                y: 5.0,
                width: 8.0,
                height: 6.0,
                label: format!("ROI{index}"),
            })
            .collect()
    }

    #[test]
    fn test_patches_carry_style_and_label() {
        let style = PatchStyle::default();
        let patches = roi_patches(&rois(2), &style);
        assert_eq!(patches.len(), 2);
        assert_eq!(patches[1].x, 20.0);
        assert_eq!(patches[1].label, "ROI2");
        assert_eq!(patches[0].edge_color, Color::AQUAMARINE);
        assert_eq!(patches[0].line_width, 1.0);
        assert!(patches[0].fill.is_none());
    }

    #[test]
    fn test_render_then_teardown_restores_artist_count() {
        let mut fig = Figure::subplots(1, FigureSize::new(5.0, 5.0));
        let keep = draw_rois(&mut fig, 0, &rois(1), &PatchStyle::default()).unwrap();
        let before = fig.artist_count();

        let handles = draw_rois(&mut fig, 0, &rois(4), &PatchStyle::default()).unwrap();
        assert_eq!(handles.len(), 4);
        assert_eq!(fig.artist_count(), before + 4);

        remove_patches(&mut fig, &handles).unwrap();
        assert_eq!(fig.artist_count(), before);
        // The earlier overlay is untouched.
        let labels: Vec<_> = fig.axes(0).unwrap().patches().map(|p| p.label.clone()).collect();
        assert_eq!(labels, vec!["ROI1".to_string()]);
        assert_eq!(keep.len(), 1);
    }

    #[test]
    fn test_handles_follow_input_order() {
        let mut fig = Figure::subplots(1, FigureSize::new(5.0, 5.0));
        draw_rois(&mut fig, 0, &rois(3), &PatchStyle::default()).unwrap();
        let labels: Vec<_> = fig.axes(0).unwrap().patches().map(|p| p.label.clone()).collect();
        assert_eq!(labels, vec!["ROI1", "ROI2", "ROI3"]);
    }

    #[test]
    fn test_zero_rois_add_nothing() {
        let mut fig = Figure::subplots(1, FigureSize::new(5.0, 5.0));
        let handles = draw_rois(&mut fig, 0, &[], &PatchStyle::default()).unwrap();
        assert!(handles.is_empty());
        assert_eq!(fig.artist_count(), 0);
        remove_patches(&mut fig, &handles).unwrap();
    }

    #[test]
    fn test_teardown_twice_reports_stale_handle() {
        let mut fig = Figure::subplots(1, FigureSize::new(5.0, 5.0));
        let handles = draw_rois(&mut fig, 0, &rois(2), &PatchStyle::default()).unwrap();
        remove_patches(&mut fig, &handles).unwrap();
        assert!(matches!(
            remove_patches(&mut fig, &handles),
            Err(Error::StaleHandle(_))
        ));
    }
}
