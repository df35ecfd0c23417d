//! CSV reader for the raw trip logs.
//!
//! Each schema variant is a plain serde struct keyed by its source header
//! names. Headers are validated before any row is deserialized so a file
//! missing a mapped column fails without producing partial output.

use serde::de::{self, DeserializeOwned, Deserializer, Visitor};
use serde::Deserialize;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::SchemaVariant;
use crate::error::{PipelineError, Result};

/// A raw trip row in one of the known source layouts.
pub trait RawTrip: DeserializeOwned {
    const VARIANT: SchemaVariant;

    /// Source columns read by the column-correspondence table.
    const REQUIRED_COLUMNS: &'static [&'static str];

    /// Known source columns that normalization drops.
    const DROPPED_COLUMNS: &'static [&'static str];
}

/// Variant A row (`trip_id`, `start_time`, ... `usertype`, `gender`, `birthyear`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawTripA {
    pub trip_id: String,
    #[serde(default, deserialize_with = "timestamp_text")]
    pub start_time: Option<String>,
    #[serde(default, deserialize_with = "timestamp_text")]
    pub end_time: Option<String>,
    pub bikeid: Option<String>,
    pub tripduration: Option<String>,
    pub from_station_id: Option<String>,
    pub from_station_name: Option<String>,
    pub to_station_id: Option<String>,
    pub to_station_name: Option<String>,
    pub usertype: Option<String>,
    pub gender: Option<String>,
    pub birthyear: Option<String>,
}

impl RawTrip for RawTripA {
    const VARIANT: SchemaVariant = SchemaVariant::A;
    const REQUIRED_COLUMNS: &'static [&'static str] = &[
        "trip_id",
        "start_time",
        "end_time",
        "from_station_name",
        "to_station_name",
        "usertype",
    ];
    const DROPPED_COLUMNS: &'static [&'static str] = &[
        "bikeid",
        "tripduration",
        "from_station_id",
        "to_station_id",
        "gender",
        "birthyear",
    ];
}

/// Variant B row, already using canonical names for the kept columns.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawTripB {
    pub ride_id: String,
    pub rideable_type: Option<String>,
    #[serde(default, deserialize_with = "timestamp_text")]
    pub started_at: Option<String>,
    #[serde(default, deserialize_with = "timestamp_text")]
    pub ended_at: Option<String>,
    pub start_station_name: Option<String>,
    pub start_station_id: Option<String>,
    pub end_station_name: Option<String>,
    pub end_station_id: Option<String>,
    pub member_casual: Option<String>,
}

impl RawTrip for RawTripB {
    const VARIANT: SchemaVariant = SchemaVariant::B;
    const REQUIRED_COLUMNS: &'static [&'static str] = &[
        "ride_id",
        "started_at",
        "ended_at",
        "start_station_name",
        "end_station_name",
        "member_casual",
    ];
    const DROPPED_COLUMNS: &'static [&'static str] =
        &["rideable_type", "start_station_id", "end_station_id"];
}

/// Reads a timestamp cell as text. Empty cells and cells that are not
/// valid UTF-8 become `None`, leaving the row to the validity filter
/// instead of failing the whole file.
fn timestamp_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct TimestampText;

    impl Visitor<'_> for TimestampText {
        type Value = Option<String>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("timestamp text")
        }

        fn visit_str<E>(self, v: &str) -> std::result::Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok((!v.is_empty()).then(|| v.to_string()))
        }

        fn visit_bytes<E>(self, v: &[u8]) -> std::result::Result<Self::Value, E>
        where
            E: de::Error,
        {
            match std::str::from_utf8(v) {
                Ok(text) => self.visit_str(text),
                Err(e) => {
                    debug!(error = %e, "Undecodable timestamp cell");
                    Ok(None)
                }
            }
        }

        fn visit_none<E>(self) -> std::result::Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> std::result::Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_bytes(TimestampText)
}

/// Reads every row of the file at `path` as variant `R`.
///
/// # Errors
///
/// Fails if the file cannot be opened, lacks a required column, or contains
/// a malformed CSV row (including a row whose field count differs from the
/// header). Undecodable timestamp cells are not errors.
#[tracing::instrument(skip(path), fields(path = %path.display(), variant = %R::VARIANT))]
pub fn read_raw<R: RawTrip>(path: &Path) -> Result<Vec<R>> {
    let file = File::open(path).map_err(|e| PipelineError::io("read", path, e))?;
    read_raw_from(file, path)
}

/// Reads rows of variant `R` from any reader; `path` is only used in
/// errors and logs.
pub fn read_raw_from<R: RawTrip, T: Read>(reader: T, path: &Path) -> Result<Vec<R>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| PipelineError::csv("read", path, e))?
        .clone();
    check_headers::<R>(&headers, path)?;

    // byte records keep UTF-8 checks per field, so a bad timestamp cell
    // only affects its own row
    let byte_headers = rdr
        .byte_headers()
        .map_err(|e| PipelineError::csv("read", path, e))?
        .clone();

    let mut rows = Vec::new();
    for result in rdr.byte_records() {
        let record = result.map_err(|e| PipelineError::csv("read", path, e))?;
        let row: R = record
            .deserialize(Some(&byte_headers))
            .map_err(|e| PipelineError::csv("read", path, e))?;
        rows.push(row);
    }

    info!(rows = rows.len(), "Raw trips read");
    Ok(rows)
}

fn check_headers<R: RawTrip>(headers: &csv::StringRecord, path: &Path) -> Result<()> {
    let has = |name: &str| headers.iter().any(|h| h == name);

    if let Some(missing) = R::REQUIRED_COLUMNS.iter().find(|c| !has(**c)) {
        return Err(PipelineError::Schema {
            path: path.display().to_string(),
            column: missing.to_string(),
            variant: R::VARIANT,
        });
    }

    for column in R::DROPPED_COLUMNS.iter().filter(|c| !has(**c)) {
        warn!(column, "Unused source column absent");
    }

    debug!(columns = headers.len(), "Header check passed");
    Ok(())
}
