//! Time-derived fields: ride length and calendar attributes of the start.
//!
//! Unparseable timestamps never fail the run. They leave the dependent
//! fields empty and the validity filter drops the row later.

use chrono::{DateTime, Datelike, FixedOffset, Local, NaiveDateTime, TimeZone, Timelike, Utc};
use tracing::{info, warn};

use crate::config::TimezonePolicy;
use crate::pipeline::types::{CanonicalTrip, TripRecord, TripTable};

/// English weekday names, Sunday first.
pub const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// English month names, January first.
pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Zone-less layouts seen in trip exports, tried in order.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Layouts carrying an explicit offset, tried after RFC 3339.
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%#z"];

/// Parses a source timestamp.
///
/// Strings with an explicit offset keep it. Zone-less strings are placed
/// according to `policy`; under [`TimezonePolicy::AssumeLocal`] an
/// ambiguous wall time takes the earlier instant and a skipped one is
/// treated as unparseable.
pub fn parse_timestamp(raw: &str, policy: TimezonePolicy) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts);
    }
    if let Some(ts) = OFFSET_FORMATS
        .iter()
        .find_map(|f| DateTime::parse_from_str(raw, f).ok())
    {
        return Some(ts);
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())?;

    match policy {
        TimezonePolicy::AssumeUtc => Some(Utc.from_utc_datetime(&naive).into()),
        TimezonePolicy::AssumeLocal => Local
            .from_local_datetime(&naive)
            .earliest()
            .map(DateTime::<FixedOffset>::from),
    }
}

/// Signed seconds from `start` to `end`, with millisecond resolution.
pub fn ride_length_seconds(start: &DateTime<FixedOffset>, end: &DateTime<FixedOffset>) -> f64 {
    (*end - *start).num_milliseconds() as f64 / 1000.0
}

/// Day of week with Sunday = 1 through Saturday = 7.
pub fn day_of_week(ts: &DateTime<FixedOffset>) -> u8 {
    ts.weekday().num_days_from_sunday() as u8 + 1
}

pub fn day_name(ts: &DateTime<FixedOffset>) -> &'static str {
    DAY_NAMES[ts.weekday().num_days_from_sunday() as usize]
}

pub fn month_name(ts: &DateTime<FixedOffset>) -> &'static str {
    MONTH_NAMES[ts.month0() as usize]
}

/// Enriches one canonical trip. Calendar fields depend only on `started_at`;
/// ride length needs both timestamps.
pub fn derive_trip(trip: CanonicalTrip, policy: TimezonePolicy) -> TripRecord {
    let started_at = trip
        .started_at
        .as_deref()
        .and_then(|s| parse_timestamp(s, policy));
    let ended_at = trip
        .ended_at
        .as_deref()
        .and_then(|s| parse_timestamp(s, policy));

    let ride_length_sec = match (&started_at, &ended_at) {
        (Some(start), Some(end)) => Some(ride_length_seconds(start, end)),
        _ => None,
    };

    TripRecord {
        ride_id: trip.ride_id,
        start_station_name: trip.start_station_name,
        end_station_name: trip.end_station_name,
        member_casual: trip.member_casual,
        ride_length_sec,
        ride_length_min: ride_length_sec.map(|s| s / 60.0),
        day_of_week: started_at.as_ref().map(day_of_week),
        day_name: started_at.as_ref().map(|ts| day_name(ts).to_string()),
        start_hour: started_at.as_ref().map(|ts| ts.hour()),
        date: started_at.as_ref().map(|ts| ts.date_naive()),
        month: started_at.as_ref().map(|ts| month_name(ts).to_string()),
        started_at,
        ended_at,
    }
}

/// Derives fields for every row, preserving order.
#[tracing::instrument(skip(table), fields(source = %table.source, rows = table.len()))]
pub fn derive_fields(table: TripTable<CanonicalTrip>, policy: TimezonePolicy) -> TripTable<TripRecord> {
    let TripTable { source, rows } = table;

    let records: Vec<TripRecord> = rows
        .into_iter()
        .map(|trip| derive_trip(trip, policy))
        .collect();

    let unparsed = records
        .iter()
        .filter(|r| r.ride_length_sec.is_none())
        .count();
    if unparsed > 0 {
        warn!(unparsed, "Rows without a computable ride length");
    }

    info!(rows = records.len(), ?policy, "Fields derived");
    TripTable::new(source, records)
}
