#![allow(clippy::uninlined_format_args)]
use approx::assert_relative_eq;
use fluoscope_core::{
    roi_field_key, CropWindow, DeviceConfiguration, EventDescriptor, HeaderDocuments, RoiField,
    StartDocument,
};
use fluoscope_io::{Catalog, SampleType, ScanRef};
use fluoscope_view::{
    compare_images, plot_img_with_roi, remove_patches, Display, DisplayMode, SourceCheckConfig,
};
use ndarray::{Array3, ArrayD};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use tempfile::tempdir;

const CAMERA: &str = "cam1";

/// ROIs at absolute (22 + shift, 15), (24 + shift, 20), ... each 4 x 6.
fn documents(uid: &str, scan_id: i64, time: f64, shift: i64) -> HeaderDocuments {
    let mut data = Map::new();
    for i in 1..=4_i64 {
        let index = usize::try_from(i).unwrap();
        let fields = [
            (RoiField::MinX, 20 + 2 * i + shift),
            (RoiField::MinY, 10 + 5 * i),
            (RoiField::SizeX, 4),
            (RoiField::SizeY, 6),
        ];
        for (field, value) in fields {
            data.insert(roi_field_key(CAMERA, index, field), json!(value));
        }
    }
    let mut configuration = BTreeMap::new();
    configuration.insert(CAMERA.to_string(), DeviceConfiguration { data });

    HeaderDocuments {
        start: StartDocument {
            uid: uid.to_string(),
            scan_id,
            time,
            plan_name: "count".to_string(),
            detectors: vec![CAMERA.to_string()],
            ..StartDocument::default()
        },
        descriptors: vec![EventDescriptor {
            name: "primary".to_string(),
            configuration,
        }],
        stop: None,
    }
}

fn frames(bump: f64) -> ArrayD<f64> {
    let mut frames = Array3::from_elem((2, 80, 64), 8000.0);
    frames[[0, 30, 40]] += bump;
    frames[[1, 30, 40]] += bump;
    frames.into_dyn()
}

fn small_config() -> SourceCheckConfig {
    SourceCheckConfig {
        crop: CropWindow::new(10..60, 20..50),
        ..SourceCheckConfig::default()
    }
}

fn catalog(root: &Path) -> Catalog {
    let catalog = Catalog::open(root).unwrap();
    let stream = format!("{CAMERA}_image");
    catalog
        .insert(
            &documents("aa11", 100, 1.0, 0),
            &[(stream.as_str(), &frames(0.0))],
            SampleType::U16,
        )
        .unwrap();
    catalog
        .insert(
            &documents("bb22", 101, 2.0, 3),
            &[(stream.as_str(), &frames(250.0))],
            SampleType::U16,
        )
        .unwrap();
    catalog
}

fn read_summary(png: &Path) -> Value {
    let text = std::fs::read_to_string(png.with_extension("json")).unwrap();
    serde_json::from_str(&text).unwrap()
}

#[test]
fn test_plot_from_catalog() {
    let dir = tempdir().unwrap();
    let catalog = catalog(dir.path());
    let header = catalog.get(&ScanRef::ScanId(100)).unwrap();

    let (figure, handles) = plot_img_with_roi(&header, None, &small_config()).unwrap();
    assert_eq!(handles.len(), 4);

    let mut display = Display::init(DisplayMode::Interactive, dir.path().join("out")).unwrap();
    let png = display.show("plot", figure).unwrap().unwrap();
    assert!(png.exists());

    let summary = read_summary(&png);
    let panel = &summary["panels"][0];
    assert_eq!(panel["title"], "Image with ROIs");
    assert_eq!(panel["axis_visible"], false);
    assert_eq!(panel["image"]["shape"], json!([50, 30]));
    assert_eq!(panel["image"]["colormap"], "jet");
    assert_relative_eq!(panel["image"]["vmin"].as_f64().unwrap(), 7500.0);
    assert_relative_eq!(panel["image"]["vmax"].as_f64().unwrap(), 15_000.0);

    let overlays = panel["overlays"].as_array().unwrap();
    assert_eq!(overlays.len(), 4);
    assert_relative_eq!(overlays[0]["x"].as_f64().unwrap(), 2.0);
    assert_relative_eq!(overlays[0]["y"].as_f64().unwrap(), 5.0);
    assert_eq!(overlays[3]["label"], "ROI4");
}

#[test]
fn test_plot_then_remove_rois() {
    let dir = tempdir().unwrap();
    let catalog = catalog(dir.path());
    let header = catalog.get(&ScanRef::Recent(2)).unwrap();

    let (mut figure, handles) =
        plot_img_with_roi(&header, Some("Screen"), &small_config()).unwrap();
    remove_patches(&mut figure, &handles).unwrap();

    let mut display = Display::init(DisplayMode::Batch, dir.path()).unwrap();
    assert!(display.show("cleared", figure).unwrap().is_none());
    let written = display.flush().unwrap();
    assert_eq!(written.len(), 1);

    let summary = read_summary(&written[0]);
    assert_eq!(summary["panels"][0]["title"], "Screen");
    assert!(summary["panels"][0]["overlays"]
        .as_array()
        .unwrap()
        .is_empty());
}

#[test]
fn test_compare_from_catalog() {
    let dir = tempdir().unwrap();
    let catalog = catalog(dir.path());
    let first = catalog.get(&ScanRef::Uid("aa".to_string())).unwrap();
    let second = catalog.get(&ScanRef::Recent(1)).unwrap();

    let figure = compare_images(&first, &second, &small_config()).unwrap();
    let summary = figure.summary();
    assert_eq!(summary.panels.len(), 3);
    assert_eq!(summary.panels[0].title, "Image 1");
    assert_eq!(summary.panels[1].title, "Image 2");
    assert_eq!(
        summary.panels[2].title,
        "Difference\n Observable X-angle Shift"
    );

    // Each image panel uses its own scan's ROIs; the difference uses the second's.
    assert_relative_eq!(summary.panels[0].overlays[0].x, 2.0);
    assert_relative_eq!(summary.panels[1].overlays[0].x, 5.0);
    assert_relative_eq!(summary.panels[2].overlays[0].x, 5.0);

    let diff = summary.panels[2].image.as_ref().unwrap();
    assert_eq!(diff.shape, [50, 30]);
    assert_relative_eq!(diff.vmin, 0.0);
    assert_relative_eq!(diff.vmax, 250.0);
}
