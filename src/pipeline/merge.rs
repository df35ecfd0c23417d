//! Concatenation of normalized source tables.

use tracing::info;

use crate::error::{PipelineError, Result};
use crate::pipeline::types::{CanonicalTrip, TripTable};

/// Appends `tables` in order into one table.
///
/// Every row is kept, duplicates included; a `ride_id` present in two
/// sources appears twice. Row order within each source is preserved.
///
/// # Errors
///
/// Returns [`PipelineError::NoSources`] when `tables` is empty.
#[tracing::instrument(skip(tables), fields(sources = tables.len()))]
pub fn merge(tables: Vec<TripTable<CanonicalTrip>>) -> Result<TripTable<CanonicalTrip>> {
    if tables.is_empty() {
        return Err(PipelineError::NoSources);
    }

    let total: usize = tables.iter().map(TripTable::len).sum();
    let mut sources = Vec::with_capacity(tables.len());
    let mut rows = Vec::with_capacity(total);

    for table in tables {
        info!(source = %table.source, rows = table.len(), "Appending source");
        sources.push(table.source);
        rows.extend(table.rows);
    }

    info!(rows = rows.len(), "Sources merged");
    Ok(TripTable::new(sources.join("+"), rows))
}
