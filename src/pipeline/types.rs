//! Record and table types passed between pipeline stages.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Columns of the canonical trip record, in output order.
pub const CANONICAL_COLUMNS: [&str; 6] = [
    "ride_id",
    "started_at",
    "ended_at",
    "start_station_name",
    "end_station_name",
    "member_casual",
];

/// Columns of the final cleaned table, in output order.
pub const OUTPUT_COLUMNS: [&str; 13] = [
    "ride_id",
    "started_at",
    "ended_at",
    "start_station_name",
    "end_station_name",
    "member_casual",
    "ride_length_sec",
    "ride_length_min",
    "day_of_week",
    "day_name",
    "start_hour",
    "date",
    "month",
];

/// Rider category in the canonical vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Member,
    Casual,
}

impl UserType {
    pub const ALL: [UserType; 2] = [UserType::Member, UserType::Casual];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Member => "member",
            UserType::Casual => "casual",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A trip after schema normalization. Timestamps are still the source text;
/// empty source fields are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalTrip {
    pub ride_id: String,
    pub started_at: Option<String>,
    pub ended_at: Option<String>,
    pub start_station_name: Option<String>,
    pub end_station_name: Option<String>,
    pub member_casual: Option<UserType>,
}

/// A canonical trip enriched with time-derived fields.
///
/// Field order is the column order of the cleaned CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRecord {
    pub ride_id: String,
    pub started_at: Option<DateTime<FixedOffset>>,
    pub ended_at: Option<DateTime<FixedOffset>>,
    pub start_station_name: Option<String>,
    pub end_station_name: Option<String>,
    pub member_casual: Option<UserType>,
    pub ride_length_sec: Option<f64>,
    pub ride_length_min: Option<f64>,
    pub day_of_week: Option<u8>,
    pub day_name: Option<String>,
    pub start_hour: Option<u32>,
    pub date: Option<NaiveDate>,
    pub month: Option<String>,
}

/// A batch of rows tagged with where they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct TripTable<T> {
    pub source: String,
    pub rows: Vec<T>,
}

impl<T> TripTable<T> {
    pub fn new(source: impl Into<String>, rows: Vec<T>) -> Self {
        Self {
            source: source.into(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
