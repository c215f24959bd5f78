//! `inspect` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use recorder::{DType, DatasetKind, Manifest, RecordingReader};

use crate::cli::InspectArgs;

/// Recording report for JSON output
#[derive(Serialize)]
struct InspectReport<'a> {
    path: String,
    manifest: &'a Manifest,
    shapes: Vec<DatasetShape>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    exported: Vec<String>,
}

#[derive(Serialize)]
struct DatasetShape {
    name: String,
    kind: DatasetKind,
    dtype: DType,
    shape: Vec<usize>,
}

/// Execute the `inspect` command
pub fn run_inspect(args: &InspectArgs) -> Result<()> {
    info!(recording = %args.recording.display(), "Inspecting recording");

    let mut reader = RecordingReader::open(&args.recording)
        .with_context(|| format!("Failed to open recording {}", args.recording.display()))?;

    let exported = match args.export_frame {
        Some(row) => {
            let out = args
                .out
                .clone()
                .unwrap_or_else(|| args.recording.join("frames"));
            let files = reader
                .export_frame_png(row, &out)
                .with_context(|| format!("Failed to export row {}", row))?;
            info!(row, files = files.len(), out = %out.display(), "Frame exported");
            files
                .iter()
                .map(|path| path.display().to_string())
                .collect()
        }
        None => Vec::new(),
    };

    let report = InspectReport {
        path: reader.path().display().to_string(),
        manifest: reader.manifest(),
        shapes: dataset_shapes(&reader),
        exported,
    };

    if args.json {
        let json =
            serde_json::to_string_pretty(&report).context("Failed to serialize recording report")?;
        println!("{}", json);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn dataset_shapes(reader: &RecordingReader) -> Vec<DatasetShape> {
    reader
        .datasets()
        .iter()
        .map(|spec| DatasetShape {
            name: spec.name.clone(),
            kind: spec.kind,
            dtype: spec.dtype,
            shape: spec.shape(reader.rows()),
        })
        .collect()
}

fn print_report(report: &InspectReport<'_>) {
    let manifest = report.manifest;
    let metadata = &manifest.metadata;

    println!("\n=== Recording: {} ===\n", report.path);
    println!("Created: {}", manifest.created_at);
    println!(
        "Status: {}",
        if manifest.closed {
            "closed"
        } else {
            "not closed (interrupted?)"
        }
    );
    println!("Rows: {} (capacity {})", manifest.rows, manifest.capacity);

    println!("\nMetadata:");
    println!(
        "  sensor: {}x{} {}",
        metadata.sensor_width, metadata.sensor_height, metadata.channels
    );
    println!(
        "  synchronization: {}",
        metadata.simulation_synchronization_type
    );
    println!("  fps: {}", metadata.fps);

    println!("\nDatasets ({}):", report.shapes.len());
    for shape in &report.shapes {
        println!(
            "  {:<18} {:?} {:?} {:?}",
            shape.name, shape.kind, shape.dtype, shape.shape
        );
    }

    if !report.exported.is_empty() {
        println!("\nExported:");
        for path in &report.exported {
            println!("  {}", path);
        }
    }

    println!();
}
