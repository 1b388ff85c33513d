//! fluoscope-cli: Command-line interface for fluoscope.
//!
//! Looks scans up in a catalog and renders the fluorescent-screen source
//! check figures to PNG.
#![allow(clippy::uninlined_format_args)]

use clap::{Parser, Subcommand};
use fluoscope_core::{make_roi_descriptors, make_roi_descriptors_for, Header, RoiOffset};
use fluoscope_io::{Catalog, ScanRef};
use fluoscope_view::{
    compare_images, plot_img_with_roi, remove_patches, Display, DisplayMode, SourceCheckConfig,
};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("catalog error: {0}")]
    Catalog(#[from] fluoscope_io::Error),

    #[error("core error: {0}")]
    Core(#[from] fluoscope_core::Error),

    #[error("display error: {0}")]
    View(#[from] fluoscope_view::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no catalog given: pass --catalog <dir> or --name <catalog>")]
    NoCatalog,
}

/// Fluorescent-screen source checks for beamline scans.
#[derive(Parser)]
#[command(name = "fluoscope")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Catalog root directory
    #[arg(long, global = true, conflicts_with = "name")]
    catalog: Option<PathBuf>,

    /// Named catalog under $FLUOSCOPE_CATALOG_DIR
    #[arg(long, global = true)]
    name: Option<String>,

    /// Display configuration (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory figures are written to
    #[arg(short, long, global = true, default_value = ".")]
    output: PathBuf,

    /// Queue figures and write them when the command finishes
    #[arg(long, global = true)]
    batch: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show start metadata, camera and streams of a scan
    Info {
        /// Scan id, negative offset (-1 = newest) or uid prefix
        #[arg(allow_negative_numbers = true)]
        scan: String,
    },

    /// Print the ROI descriptors of a scan as JSON
    Rois {
        #[arg(allow_negative_numbers = true)]
        scan: String,

        /// Number of ROIs
        #[arg(short = 'n', long, default_value = "4")]
        count: usize,

        /// Horizontal offset subtracted from each ROI's x
        #[arg(long, default_value = "0", allow_negative_numbers = true)]
        h1: f64,

        /// Vertical offset subtracted from each ROI's y
        #[arg(long, default_value = "0", allow_negative_numbers = true)]
        v1: f64,

        /// Camera name, for scans with several detectors
        #[arg(long)]
        camera: Option<String>,
    },

    /// Plot the averaged screen image with its ROIs
    Plot {
        #[arg(allow_negative_numbers = true)]
        scan: String,

        /// Figure title
        #[arg(long)]
        title: Option<String>,

        /// Remove the ROI outlines again before writing
        #[arg(long)]
        remove_rois: bool,
    },

    /// Plot two scans side by side with their difference
    Compare {
        #[arg(allow_negative_numbers = true)]
        first: String,

        #[arg(allow_negative_numbers = true)]
        second: String,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let catalog = open_catalog(&cli)?;
    let config = match &cli.config {
        Some(path) => SourceCheckConfig::from_file(path)?,
        None => SourceCheckConfig::default(),
    };

    match cli.command {
        Commands::Info { scan } => {
            let header = load(&catalog, &scan)?;
            print_info(&header);
        }

        Commands::Rois {
            scan,
            count,
            h1,
            v1,
            camera,
        } => {
            let header = load(&catalog, &scan)?;
            let offset = RoiOffset::new(h1, v1);
            let rois = match camera.as_deref() {
                Some(camera) => make_roi_descriptors_for(camera, count, &header, offset)?,
                None => make_roi_descriptors(count, &header, offset)?,
            };
            println!("{}", serde_json::to_string_pretty(&rois)?);
        }

        Commands::Plot {
            scan,
            title,
            remove_rois,
        } => {
            let header = load(&catalog, &scan)?;
            let (mut figure, handles) = plot_img_with_roi(&header, title.as_deref(), &config)?;
            if remove_rois {
                remove_patches(&mut figure, &handles)?;
                log::info!("removed {} ROI outline(s)", handles.len());
            }
            let name = format!("scan_{}_rois", header.start.scan_id);
            show(&cli.output, cli.batch, &name, figure)?;
        }

        Commands::Compare { first, second } => {
            let h1 = load(&catalog, &first)?;
            let h2 = load(&catalog, &second)?;
            let figure = compare_images(&h1, &h2, &config)?;
            let name = format!("compare_{}_{}", h1.start.scan_id, h2.start.scan_id);
            show(&cli.output, cli.batch, &name, figure)?;
        }
    }

    Ok(())
}

fn open_catalog(cli: &Cli) -> Result<Catalog> {
    match (&cli.catalog, &cli.name) {
        (Some(root), _) => Ok(Catalog::open(root)?),
        (None, Some(name)) => Ok(Catalog::named(name)?),
        (None, None) => Err(CliError::NoCatalog),
    }
}

fn load(catalog: &Catalog, scan: &str) -> Result<Header> {
    let scan: ScanRef = scan.parse()?;
    Ok(catalog.get(&scan)?)
}

fn show(output: &Path, batch: bool, name: &str, figure: fluoscope_view::Figure) -> Result<()> {
    let mode = if batch {
        DisplayMode::Batch
    } else {
        DisplayMode::Interactive
    };
    let mut display = Display::init(mode, output)?;
    if let Some(path) = display.show(name, figure)? {
        println!("Wrote {}", path.display());
    }
    for path in display.flush()? {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn print_info(header: &Header) {
    let start = &header.start;
    println!("Scan: {}", start.scan_id);
    println!("UID: {}", start.uid);
    println!("Plan: {}", start.plan_name);
    println!("Start time: {:.3}", start.time);
    println!("Detectors: {}", start.detectors.join(", "));
    match header.camera() {
        Ok(camera) => println!("Camera: {} (stream {})", camera, Header::image_stream(camera)),
        Err(err) => println!("Camera: unavailable ({err})"),
    }
    println!("Streams: {}", header.streams().join(", "));
    if let Some(stop) = &header.stop {
        println!("Exit status: {}", stop.exit_status);
        for (stream, events) in &stop.num_events {
            println!("  {}: {} event(s)", stream, events);
        }
    }
}
