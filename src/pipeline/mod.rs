//! The cleaning pipeline: read -> normalize -> merge -> derive -> filter.
//!
//! Every stage consumes the whole table produced by the one before it and
//! returns a new table. Nothing is written until all stages succeed.

pub mod derive;
pub mod filter;
pub mod merge;
pub mod normalize;
pub mod types;

use std::path::Path;
use tracing::info;

use crate::config::{PipelineConfig, SchemaVariant, SourceSpec};
use crate::error::Result;
use crate::parser::{RawTripA, RawTripB, read_raw};
use crate::pipeline::derive::derive_fields;
use crate::pipeline::filter::{FilterReport, filter_valid};
use crate::pipeline::merge::merge;
use crate::pipeline::normalize::{Normalize, normalize_table};
use crate::pipeline::types::{CanonicalTrip, TripRecord, TripTable};

/// Final table plus the filter's bookkeeping.
#[derive(Debug)]
pub struct PipelineOutput {
    pub trips: TripTable<TripRecord>,
    pub report: FilterReport,
}

fn load<R: Normalize>(path: &Path) -> Result<TripTable<CanonicalTrip>> {
    let rows = read_raw::<R>(path)?;
    normalize_table(path, rows)
}

/// Reads one source file and maps it onto the canonical schema.
pub fn load_source(source: &SourceSpec) -> Result<TripTable<CanonicalTrip>> {
    match source.variant {
        SchemaVariant::A => load::<RawTripA>(&source.path),
        SchemaVariant::B => load::<RawTripB>(&source.path),
    }
}

/// Runs every stage over the configured sources.
///
/// # Errors
///
/// Any schema, vocabulary, or I/O failure in any source aborts the run
/// before a merged table exists.
#[tracing::instrument(skip(config), fields(sources = config.sources.len(), tz_policy = ?config.tz_policy))]
pub fn run(config: &PipelineConfig) -> Result<PipelineOutput> {
    config.validate()?;

    let tables = config
        .sources
        .iter()
        .map(load_source)
        .collect::<Result<Vec<_>>>()?;

    let merged = merge(tables)?;
    let derived = derive_fields(merged, config.tz_policy);
    let (trips, report) = filter_valid(derived);

    info!(rows = trips.len(), "Pipeline complete");
    Ok(PipelineOutput { trips, report })
}
