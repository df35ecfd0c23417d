//! Validity filter: drops false starts, overlong rides, and rows missing
//! the fields every downstream consumer relies on.

use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

use crate::pipeline::types::{TripRecord, TripTable};

/// Rides at or below this many seconds are docking false starts.
pub const MIN_RIDE_SECONDS: f64 = 60.0;

/// Rides at or above this many seconds are treated as lost, stolen, or
/// pulled for maintenance.
pub const MAX_RIDE_SECONDS: f64 = 86_400.0;

/// The first rule a dropped row failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    MissingStart,
    MissingEnd,
    MissingUserType,
    MissingLength,
    TooShort,
    TooLong,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Rejection::MissingStart => "missing started_at",
            Rejection::MissingEnd => "missing ended_at",
            Rejection::MissingUserType => "missing member_casual",
            Rejection::MissingLength => "missing ride_length_sec",
            Rejection::TooShort => "ride too short",
            Rejection::TooLong => "ride too long",
        };
        f.write_str(label)
    }
}

/// Why a row would be dropped, or `None` if it survives.
pub fn rejection(trip: &TripRecord) -> Option<Rejection> {
    if trip.started_at.is_none() {
        return Some(Rejection::MissingStart);
    }
    if trip.ended_at.is_none() {
        return Some(Rejection::MissingEnd);
    }
    if trip.member_casual.is_none() {
        return Some(Rejection::MissingUserType);
    }
    let Some(secs) = trip.ride_length_sec else {
        return Some(Rejection::MissingLength);
    };
    if secs <= MIN_RIDE_SECONDS {
        return Some(Rejection::TooShort);
    }
    if secs >= MAX_RIDE_SECONDS {
        return Some(Rejection::TooLong);
    }
    None
}

pub fn is_valid(trip: &TripRecord) -> bool {
    rejection(trip).is_none()
}

/// Row counts in and out of the filter, with drops broken down by rule.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct FilterReport {
    pub input_rows: usize,
    pub kept_rows: usize,
    pub missing_start: usize,
    pub missing_end: usize,
    pub missing_user_type: usize,
    pub missing_length: usize,
    pub too_short: usize,
    pub too_long: usize,
}

impl FilterReport {
    fn record(&mut self, reason: Rejection) {
        match reason {
            Rejection::MissingStart => self.missing_start += 1,
            Rejection::MissingEnd => self.missing_end += 1,
            Rejection::MissingUserType => self.missing_user_type += 1,
            Rejection::MissingLength => self.missing_length += 1,
            Rejection::TooShort => self.too_short += 1,
            Rejection::TooLong => self.too_long += 1,
        }
    }

    pub fn dropped_rows(&self) -> usize {
        self.input_rows - self.kept_rows
    }
}

/// Keeps the rows passing every rule, in input order.
#[tracing::instrument(skip(table), fields(source = %table.source, rows = table.len()))]
pub fn filter_valid(table: TripTable<TripRecord>) -> (TripTable<TripRecord>, FilterReport) {
    let TripTable { source, rows } = table;
    let mut report = FilterReport {
        input_rows: rows.len(),
        ..Default::default()
    };

    let kept: Vec<TripRecord> = rows
        .into_iter()
        .filter(|trip| match rejection(trip) {
            Some(reason) => {
                debug!(ride_id = %trip.ride_id, %reason, "Row dropped");
                report.record(reason);
                false
            }
            None => true,
        })
        .collect();

    report.kept_rows = kept.len();
    info!(
        kept = report.kept_rows,
        dropped = report.dropped_rows(),
        missing_start = report.missing_start,
        missing_end = report.missing_end,
        missing_user_type = report.missing_user_type,
        missing_length = report.missing_length,
        too_short = report.too_short,
        too_long = report.too_long,
        "Validity filter applied"
    );

    (TripTable::new(source, kept), report)
}
