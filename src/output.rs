//! Output formatting and persistence for the cleaned trip table.
//!
//! Supports the CSV export, a gzip-compressed JSON snapshot for fast
//! reload, and printing the diagnostic summary.

use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::pipeline::types::{OUTPUT_COLUMNS, TripRecord};
use crate::stats::RideSummary;

pub const SNAPSHOT_SCHEMA_VERSION: u8 = 1;

/// On-disk snapshot of a cleaned table.
#[derive(Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub schema_version: u8,
    pub created_at: DateTime<Utc>,
    pub trips: Vec<TripRecord>,
}

/// Prints the diagnostic summary to stdout.
pub fn print_summary(summary: &RideSummary) {
    println!("{summary}");
}

/// Logs the diagnostic summary as JSON.
pub fn log_json(summary: &RideSummary) -> Result<()> {
    let json = serde_json::to_string(summary).map_err(PipelineError::Report)?;
    info!(summary = %json, "Summary");
    Ok(())
}

/// Writes `trips` as CSV to `path`, replacing any existing file.
///
/// The header row is always written, even for an empty table.
#[tracing::instrument(skip(path, trips), fields(path = %path.display(), rows = trips.len()))]
pub fn write_trips_csv(path: &Path, trips: &[TripRecord]) -> Result<()> {
    let file = File::create(path).map_err(|e| PipelineError::io("write", path, e))?;
    write_trips_to(file, path, trips)?;
    info!("CSV written");
    Ok(())
}

/// Writes `trips` as CSV to any writer; `path` is only used in errors.
pub fn write_trips_to<W: Write>(writer: W, path: &Path, trips: &[TripRecord]) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(writer);

    writer
        .write_record(OUTPUT_COLUMNS)
        .map_err(|e| PipelineError::csv("write", path, e))?;
    for trip in trips {
        writer
            .serialize(trip)
            .map_err(|e| PipelineError::csv("write", path, e))?;
    }
    writer.flush().map_err(|e| PipelineError::io("write", path, e))?;

    Ok(())
}

/// Writes a gzip-compressed JSON snapshot of `trips` to `path`.
#[tracing::instrument(skip(path, trips), fields(path = %path.display(), rows = trips.len()))]
pub fn write_snapshot(path: &Path, trips: &[TripRecord]) -> Result<()> {
    #[derive(Serialize)]
    struct SnapshotRef<'a> {
        schema_version: u8,
        created_at: DateTime<Utc>,
        trips: &'a [TripRecord],
    }

    let file = File::create(path).map_err(|e| PipelineError::io("write", path, e))?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());

    let snapshot = SnapshotRef {
        schema_version: SNAPSHOT_SCHEMA_VERSION,
        created_at: Utc::now(),
        trips,
    };
    serde_json::to_writer(&mut encoder, &snapshot).map_err(|e| PipelineError::Snapshot {
        stage: "write",
        path: path.display().to_string(),
        source: e,
    })?;

    let mut inner = encoder
        .finish()
        .map_err(|e| PipelineError::io("write", path, e))?;
    inner.flush().map_err(|e| PipelineError::io("write", path, e))?;

    info!("Snapshot written");
    Ok(())
}

/// Reloads a snapshot written by [`write_snapshot`].
#[tracing::instrument(skip(path), fields(path = %path.display()))]
pub fn read_snapshot(path: &Path) -> Result<Snapshot> {
    let file = File::open(path).map_err(|e| PipelineError::io("read", path, e))?;
    let decoder = GzDecoder::new(BufReader::new(file));

    let snapshot: Snapshot =
        serde_json::from_reader(decoder).map_err(|e| PipelineError::Snapshot {
            stage: "read",
            path: path.display().to_string(),
            source: e,
        })?;

    if snapshot.schema_version != SNAPSHOT_SCHEMA_VERSION {
        return Err(PipelineError::SnapshotVersion {
            path: path.display().to_string(),
            version: snapshot.schema_version,
        });
    }

    info!(rows = snapshot.trips.len(), "Snapshot loaded");
    Ok(snapshot)
}
