//! Schema normalization: maps each raw variant onto the canonical trip
//! record and recodes the rider category through the variant's vocabulary.

use std::path::Path;
use tracing::{debug, info};

use crate::config::SchemaVariant;
use crate::error::{PipelineError, Result};
use crate::parser::{RawTrip, RawTripA, RawTripB};
use crate::pipeline::types::{CanonicalTrip, TripTable, UserType};

/// Variant A labels. Every other non-empty label is a contract violation.
pub const VOCABULARY_A: &[(&str, UserType)] = &[
    ("Subscriber", UserType::Member),
    ("Customer", UserType::Casual),
];

/// Variant B already uses the canonical labels.
pub const VOCABULARY_B: &[(&str, UserType)] =
    &[("member", UserType::Member), ("casual", UserType::Casual)];

/// Source column -> canonical column, for variant A.
pub const COLUMN_MAP_A: [(&str, &str); 6] = [
    ("trip_id", "ride_id"),
    ("start_time", "started_at"),
    ("end_time", "ended_at"),
    ("from_station_name", "start_station_name"),
    ("to_station_name", "end_station_name"),
    ("usertype", "member_casual"),
];

/// Variant B's retained columns already carry canonical names.
pub const COLUMN_MAP_B: [(&str, &str); 6] = [
    ("ride_id", "ride_id"),
    ("started_at", "started_at"),
    ("ended_at", "ended_at"),
    ("start_station_name", "start_station_name"),
    ("end_station_name", "end_station_name"),
    ("member_casual", "member_casual"),
];

/// A raw row that can be rewritten as a [`CanonicalTrip`].
pub trait Normalize: RawTrip {
    const VOCABULARY: &'static [(&'static str, UserType)];

    /// Renames and selects fields. On an unknown category label, returns the
    /// offending label.
    fn normalize(self) -> std::result::Result<CanonicalTrip, String>;
}

/// Looks `label` up in `vocabulary`. Empty labels are missing, not unknown.
pub fn recode(
    vocabulary: &[(&str, UserType)],
    label: Option<&str>,
) -> std::result::Result<Option<UserType>, String> {
    let Some(label) = label.map(str::trim).filter(|l| !l.is_empty()) else {
        return Ok(None);
    };

    vocabulary
        .iter()
        .find(|(known, _)| *known == label)
        .map(|(_, user_type)| Some(*user_type))
        .ok_or_else(|| label.to_string())
}

impl Normalize for RawTripA {
    const VOCABULARY: &'static [(&'static str, UserType)] = VOCABULARY_A;

    fn normalize(self) -> std::result::Result<CanonicalTrip, String> {
        Ok(CanonicalTrip {
            member_casual: recode(Self::VOCABULARY, self.usertype.as_deref())?,
            ride_id: self.trip_id,
            started_at: self.start_time,
            ended_at: self.end_time,
            start_station_name: self.from_station_name,
            end_station_name: self.to_station_name,
        })
    }
}

impl Normalize for RawTripB {
    const VOCABULARY: &'static [(&'static str, UserType)] = VOCABULARY_B;

    fn normalize(self) -> std::result::Result<CanonicalTrip, String> {
        Ok(CanonicalTrip {
            member_casual: recode(Self::VOCABULARY, self.member_casual.as_deref())?,
            ride_id: self.ride_id,
            started_at: self.started_at,
            ended_at: self.ended_at,
            start_station_name: self.start_station_name,
            end_station_name: self.end_station_name,
        })
    }
}

/// Normalizes every row read from `path`, preserving order.
///
/// # Errors
///
/// The first row carrying an unknown category label aborts the whole file
/// with [`PipelineError::UnknownVocabulary`].
#[tracing::instrument(skip(path, rows), fields(path = %path.display(), variant = %R::VARIANT, rows = rows.len()))]
pub fn normalize_table<R: Normalize>(path: &Path, rows: Vec<R>) -> Result<TripTable<CanonicalTrip>> {
    let trips = rows
        .into_iter()
        .enumerate()
        .map(|(i, raw)| {
            raw.normalize()
                .map_err(|value| PipelineError::UnknownVocabulary {
                    path: path.display().to_string(),
                    row: i + 1,
                    value,
                    variant: R::VARIANT,
                })
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(mapping = ?column_map(R::VARIANT), "Columns mapped");
    info!(rows = trips.len(), "Source normalized");
    Ok(TripTable::new(path.display().to_string(), trips))
}

/// Column correspondence for `variant`, as (source, canonical) pairs.
pub fn column_map(variant: SchemaVariant) -> &'static [(&'static str, &'static str); 6] {
    match variant {
        SchemaVariant::A => &COLUMN_MAP_A,
        SchemaVariant::B => &COLUMN_MAP_B,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::CANONICAL_COLUMNS;

    fn raw_a(usertype: Option<&str>) -> RawTripA {
        RawTripA {
            trip_id: "A1".to_string(),
            start_time: Some("2019-01-01 08:00:00".to_string()),
            end_time: Some("2019-01-01 08:10:00".to_string()),
            bikeid: Some("2167".to_string()),
            tripduration: Some("600.0".to_string()),
            from_station_id: Some("199".to_string()),
            from_station_name: Some("X".to_string()),
            to_station_id: Some("84".to_string()),
            to_station_name: Some("Y".to_string()),
            usertype: usertype.map(str::to_string),
            gender: Some("Female".to_string()),
            birthyear: Some("1990".to_string()),
        }
    }

    fn raw_b(member_casual: Option<&str>) -> RawTripB {
        RawTripB {
            ride_id: "B1".to_string(),
            rideable_type: Some("docked_bike".to_string()),
            started_at: Some("2020-01-21 20:06:59".to_string()),
            ended_at: Some("2020-01-21 20:14:30".to_string()),
            start_station_name: Some("Western Ave & Leland Ave".to_string()),
            start_station_id: Some("239".to_string()),
            end_station_name: Some("Clark St & Leland Ave".to_string()),
            end_station_id: Some("326".to_string()),
            member_casual: member_casual.map(str::to_string),
        }
    }

    #[test]
    fn test_variant_a_renames_fields() {
        let trip = raw_a(Some("Subscriber")).normalize().unwrap();

        assert_eq!(trip.ride_id, "A1");
        assert_eq!(trip.started_at.as_deref(), Some("2019-01-01 08:00:00"));
        assert_eq!(trip.ended_at.as_deref(), Some("2019-01-01 08:10:00"));
        assert_eq!(trip.start_station_name.as_deref(), Some("X"));
        assert_eq!(trip.end_station_name.as_deref(), Some("Y"));
        assert_eq!(trip.member_casual, Some(UserType::Member));
    }

    #[test]
    fn test_variant_a_vocabulary() {
        assert_eq!(
            raw_a(Some("Subscriber")).normalize().unwrap().member_casual,
            Some(UserType::Member)
        );
        assert_eq!(
            raw_a(Some("Customer")).normalize().unwrap().member_casual,
            Some(UserType::Casual)
        );
    }

    #[test]
    fn test_variant_a_unknown_label_is_returned() {
        assert_eq!(
            raw_a(Some("Dependent")).normalize().unwrap_err(),
            "Dependent"
        );
        // canonical labels are not part of variant A's vocabulary
        assert_eq!(raw_a(Some("member")).normalize().unwrap_err(), "member");
    }

    #[test]
    fn test_missing_label_stays_missing() {
        assert_eq!(raw_a(None).normalize().unwrap().member_casual, None);
        assert_eq!(raw_b(Some("  ")).normalize().unwrap().member_casual, None);
    }

    #[test]
    fn test_variant_b_passthrough() {
        let trip = raw_b(Some("casual")).normalize().unwrap();

        assert_eq!(trip.ride_id, "B1");
        assert_eq!(trip.started_at.as_deref(), Some("2020-01-21 20:06:59"));
        assert_eq!(trip.end_station_name.as_deref(), Some("Clark St & Leland Ave"));
        assert_eq!(trip.member_casual, Some(UserType::Casual));
    }

    #[test]
    fn test_variant_b_rejects_foreign_vocabulary() {
        assert_eq!(raw_b(Some("Subscriber")).normalize().unwrap_err(), "Subscriber");
    }

    #[test]
    fn test_normalize_table_reports_row_and_value() {
        let rows = vec![raw_a(Some("Subscriber")), raw_a(Some("Customer")), raw_a(Some("Staff"))];
        let err = normalize_table(Path::new("trips_a.csv"), rows).unwrap_err();

        match err {
            PipelineError::UnknownVocabulary {
                path, row, value, ..
            } => {
                assert_eq!(path, "trips_a.csv");
                assert_eq!(row, 3);
                assert_eq!(value, "Staff");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_normalize_table_preserves_order() {
        let mut first = raw_a(Some("Customer"));
        first.trip_id = "first".to_string();
        let mut second = raw_a(Some("Subscriber"));
        second.trip_id = "second".to_string();

        let table = normalize_table(Path::new("trips_a.csv"), vec![first, second]).unwrap();

        let ids: Vec<_> = table.rows.iter().map(|t| t.ride_id.as_str()).collect();
        assert_eq!(ids, ["first", "second"]);
        assert_eq!(table.source, "trips_a.csv");
    }

    #[test]
    fn test_column_maps_target_canonical_columns() {
        for variant in [SchemaVariant::A, SchemaVariant::B] {
            let targets: Vec<_> = column_map(variant).iter().map(|(_, c)| *c).collect();
            assert_eq!(targets, CANONICAL_COLUMNS);
        }
        for (variant, required) in [
            (SchemaVariant::A, RawTripA::REQUIRED_COLUMNS),
            (SchemaVariant::B, RawTripB::REQUIRED_COLUMNS),
        ] {
            let sources: Vec<_> = column_map(variant).iter().map(|(s, _)| *s).collect();
            assert_eq!(sources, required);
        }
    }
}
