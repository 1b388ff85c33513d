//! Fluorescent-screen source checks.
//!
//! [`plot_img_with_roi`] shows one scan's averaged camera image with its ROIs;
//! [`compare_images`] shows two scans side by side plus their difference.

use crate::config::{DifferenceRois, SourceCheckConfig, DEFAULT_TITLE, DIFFERENCE_TITLE};
use crate::figure::Normalize;
use crate::overlay::draw_rois;
use crate::{Colormap, Figure, FigureSize, OverlayHandle, Result};
use fluoscope_core::{average_frames, difference, make_roi_descriptors, Header};
use ndarray::Array2;

/// Averages every frame of `camera`'s image stream.
///
/// # Errors
/// Returns an error if the stream is missing, unreadable or empty.
pub fn averaged_image(header: &Header, camera: &str) -> Result<Array2<f64>> {
    let stream = Header::image_stream(camera);
    let frames = header.data(&stream)?;
    Ok(average_frames(&stream, &frames)?)
}

fn new_figure(panels: usize, size: FigureSize, config: &SourceCheckConfig) -> Figure {
    Figure::subplots(panels, size).with_dpi(config.dpi)
}

/// Puts a cropped image, its colorbar and the header's ROIs on one axes.
fn image_panel(
    figure: &mut Figure,
    axes: usize,
    image: &Array2<f64>,
    norm: Normalize,
    colormap: Colormap,
    rois_from: &Header,
    config: &SourceCheckConfig,
) -> Result<Vec<OverlayHandle>> {
    let cropped = config.crop.crop(image)?;
    {
        let panel = figure.axes_mut(axes)?;
        panel.imshow(cropped, norm, colormap);
        panel.colorbar(config.colorbar_shrink);
        panel.axis_off();
    }
    let rois = make_roi_descriptors(config.roi_count, rois_from, config.roi_offset())?;
    draw_rois(figure, axes, &rois, &config.roi_style)
}

fn fixed_norm(config: &SourceCheckConfig) -> Normalize {
    Normalize::Fixed {
        vmin: config.intensity.vmin,
        vmax: config.intensity.vmax,
    }
}

/// Plots the cropped, frame-averaged camera image of a scan with its ROIs.
///
/// Returns the figure and the ROI overlay handles so the caller can later
/// take the ROIs down with [`crate::remove_patches`].
///
/// # Errors
/// Returns an error if the camera cannot be resolved, the image stream is
/// missing or smaller than the crop, or an ROI field is missing.
pub fn plot_img_with_roi(
    header: &Header,
    title: Option<&str>,
    config: &SourceCheckConfig,
) -> Result<(Figure, Vec<OverlayHandle>)> {
    let camera = header.camera()?;
    let image = averaged_image(header, camera)?;

    let mut figure = new_figure(1, config.single_figure_size, config);
    let handles = image_panel(
        &mut figure,
        0,
        &image,
        fixed_norm(config),
        config.single_colormap,
        header,
        config,
    )?;
    figure
        .axes_mut(0)?
        .set_title(title.unwrap_or(DEFAULT_TITLE));
    log::debug!(
        "plotted scan {} ({}) with {} ROI(s)",
        header.start.scan_id,
        header.start.uid,
        handles.len()
    );
    Ok((figure, handles))
}

/// Compares the camera images of two scans.
///
/// Panels one and two show each scan's cropped average with its own ROIs;
/// panel three shows `second - first` over the same crop, auto-scaled, with
/// the ROIs chosen by [`SourceCheckConfig::difference_rois`]. Both images are
/// read from the stream of the first scan's camera.
///
/// # Errors
/// Returns an error if either image cannot be loaded or cropped, the images
/// differ in shape, or an ROI field is missing.
pub fn compare_images(
    first: &Header,
    second: &Header,
    config: &SourceCheckConfig,
) -> Result<Figure> {
    let camera = first.camera()?;
    let (first_image, second_image) = rayon::join(
        || averaged_image(first, camera),
        || averaged_image(second, camera),
    );
    let (first_image, second_image) = (first_image?, second_image?);

    let mut figure = new_figure(3, config.compare_figure_size, config);
    for (axes, (header, image)) in [(first, &first_image), (second, &second_image)]
        .into_iter()
        .enumerate()
    {
        image_panel(
            &mut figure,
            axes,
            image,
            fixed_norm(config),
            config.compare_colormap,
            header,
            config,
        )?;
        figure
            .axes_mut(axes)?
            .set_title(format!("Image {}", axes + 1));
    }

    let diff = difference(&first_image, &second_image)?;
    let rois_from = match config.difference_rois {
        DifferenceRois::First => first,
        DifferenceRois::Second => second,
    };
    image_panel(
        &mut figure,
        2,
        &diff,
        Normalize::Auto,
        config.difference_colormap,
        rois_from,
        config,
    )?;
    figure.axes_mut(2)?.set_title(DIFFERENCE_TITLE);
    log::debug!(
        "compared scans {} and {}",
        first.start.scan_id,
        second.start.scan_id
    );
    Ok(figure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{remove_patches, Error};
    use approx::assert_relative_eq;
    use fluoscope_core::header::{DeviceConfiguration, EventDescriptor, HeaderDocuments, StartDocument};
    use fluoscope_core::{roi_field_key, InMemoryFrames, RoiField};
    use ndarray::{s, Array3};
    use serde_json::{json, Map, Value};
    use std::collections::BTreeMap;

    const ROWS: usize = 1000;
    const COLS: usize = 1600;

    /// Camera configuration with four ROIs, the first shifted by `shift` px.
    fn roi_config(camera: &str, shift: i64) -> Map<String, Value> {
        let mut data = Map::new();
        for index in 1..=4_usize {
            let i = i64::try_from(index).unwrap();
            let fields = [
                (RoiField::MinX, json!(1340 + 10 * i + if index == 1 { shift } else { 0 })),
                (RoiField::MinY, json!(460 + 100 * i)),
                (RoiField::SizeX, json!(20)),
                (RoiField::SizeY, json!(30)),
            ];
            for (field, value) in fields {
                data.insert(roi_field_key(camera, index, field), value);
            }
        }
        data
    }

    fn scan(scan_id: i64, frames: Array3<f64>, shift: i64) -> Header {
        let camera = "fs_cam";
        let mut configuration = BTreeMap::new();
        configuration.insert(
            camera.to_string(),
            DeviceConfiguration {
                data: roi_config(camera, shift),
            },
        );
        let documents = HeaderDocuments {
            start: StartDocument {
                uid: format!("uid-{scan_id}"),
                scan_id,
                detectors: vec![camera.to_string()],
                ..StartDocument::default()
            },
            descriptors: vec![EventDescriptor {
                name: "primary".into(),
                configuration,
            }],
            stop: None,
        };
        let source = InMemoryFrames::new().with_stream("fs_cam_image", frames.into_dyn());
        Header::new(documents, source)
    }

    fn ramp_frames(count: usize, base: f64) -> Array3<f64> {
        Array3::from_shape_fn((count, ROWS, COLS), |(k, r, c)| {
            base + (k * 2) as f64 + r as f64 + c as f64 * 0.5
        })
    }

    #[test]
    fn test_single_plot_crops_and_overlays() {
        let header = scan(1, ramp_frames(3, 8000.0), 0);
        let config = SourceCheckConfig::default();
        let (figure, handles) = plot_img_with_roi(&header, None, &config).unwrap();

        assert_eq!(figure.panels().len(), 1);
        assert_eq!(handles.len(), 4);
        let axes = figure.axes(0).unwrap();
        assert_eq!(axes.title(), "Image with ROIs");
        assert!(!axes.axis_visible());
        assert_eq!(axes.colorbar_settings().unwrap().shrink, 0.3);

        let image = axes.image().unwrap();
        assert_eq!(image.data.dim(), (500, 150));
        assert_eq!(image.colormap, Colormap::Jet);
        assert_eq!(
            image.norm,
            Normalize::Fixed {
                vmin: 7500.0,
                vmax: 15_000.0
            }
        );
        // Mean over frames k = 0, 1, 2 adds 2; crop origin is (460, 1340).
        assert_relative_eq!(image.data[[0, 0]], 8000.0 + 2.0 + 460.0 + 670.0);

        let first = axes.patches().next().unwrap();
        assert_eq!((first.x, first.y), (10.0, 100.0));
        assert_eq!((first.width, first.height), (20.0, 30.0));
        assert_eq!(first.label, "ROI1");
    }

    #[test]
    fn test_single_plot_title_and_teardown() {
        let header = scan(2, ramp_frames(1, 9000.0), 0);
        let (mut figure, handles) =
            plot_img_with_roi(&header, Some("scan 2"), &SourceCheckConfig::default()).unwrap();
        assert_eq!(figure.axes(0).unwrap().title(), "scan 2");

        remove_patches(&mut figure, &handles).unwrap();
        assert_eq!(figure.artist_count(), 0);
    }

    #[test]
    fn test_crop_is_independent_of_image_content() {
        let config = SourceCheckConfig::default();
        for base in [0.0, 1.0e4, -50.0] {
            let header = scan(3, ramp_frames(2, base), 0);
            let (figure, _) = plot_img_with_roi(&header, None, &config).unwrap();
            let image = &figure.axes(0).unwrap().image().unwrap().data;
            assert_eq!(image.dim(), (500, 150));
            assert_relative_eq!(image[[499, 149]], base + 1.0 + 959.0 + 1489.0 * 0.5);
        }
    }

    #[test]
    fn test_image_smaller_than_crop() {
        let header = scan(4, Array3::zeros((2, 100, 100)), 0);
        let err = plot_img_with_roi(&header, None, &SourceCheckConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::CoreError(fluoscope_core::Error::CropOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_compare_panels_and_difference() {
        let first = scan(10, ramp_frames(2, 8000.0), 0);
        let mut shifted = ramp_frames(2, 8000.0);
        shifted.slice_mut(s![.., 600..700, 1400..1450]).mapv_inplace(|v| v + 250.0);
        let second = scan(11, shifted, 5);

        let figure = compare_images(&first, &second, &SourceCheckConfig::default()).unwrap();
        let panels = figure.panels();
        assert_eq!(panels.len(), 3);
        assert_eq!(panels[0].title(), "Image 1");
        assert_eq!(panels[1].title(), "Image 2");
        assert_eq!(panels[2].title(), "Difference\n Observable X-angle Shift");
        assert!(panels.iter().all(|axes| axes.artist_count() == 4));

        let diff = &panels[2].image().unwrap();
        assert_eq!(diff.norm, Normalize::Auto);
        assert_eq!(diff.data.dim(), (500, 150));
        // Crop origin (460, 1340): the bump covers rows 140..240, cols 60..110.
        assert_relative_eq!(diff.data[[150, 70]], 250.0);
        assert_relative_eq!(diff.data[[0, 0]], 0.0);

        let a = &panels[0].image().unwrap().data;
        let b = &panels[1].image().unwrap().data;
        assert_eq!(&(b - a), &diff.data);
    }

    #[test]
    fn test_compare_roi_geometry_per_panel() {
        let first = scan(20, ramp_frames(1, 8000.0), 0);
        let second = scan(21, ramp_frames(1, 8000.0), 7);
        let first_x = |axes: &crate::figure::Axes| axes.patches().next().unwrap().x;

        let figure = compare_images(&first, &second, &SourceCheckConfig::default()).unwrap();
        assert_eq!(first_x(figure.axes(0).unwrap()), 10.0);
        assert_eq!(first_x(figure.axes(1).unwrap()), 17.0);
        // The difference panel reuses the second scan's geometry by default.
        assert_eq!(first_x(figure.axes(2).unwrap()), 17.0);

        let config = SourceCheckConfig {
            difference_rois: DifferenceRois::First,
            ..SourceCheckConfig::default()
        };
        let figure = compare_images(&first, &second, &config).unwrap();
        assert_eq!(first_x(figure.axes(2).unwrap()), 10.0);
    }

    #[test]
    fn test_compare_shape_mismatch() {
        let first = scan(30, ramp_frames(1, 0.0), 0);
        let second = scan(31, Array3::zeros((1, ROWS, COLS + 10)), 0);
        let err = compare_images(&first, &second, &SourceCheckConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::CoreError(fluoscope_core::Error::ShapeMismatch { .. })
        ));
    }
}
