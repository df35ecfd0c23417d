use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::pipeline::types::{TripRecord, UserType};
use crate::utility::{mean, quantile};

/// Five-number summary plus mean.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct Distribution {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub mean: f64,
    pub q3: f64,
    pub max: f64,
}

impl Distribution {
    /// Returns `None` when there is nothing to describe.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        sorted.sort_by(f64::total_cmp);

        Some(Distribution {
            min: *sorted.first()?,
            q1: quantile(&sorted, 0.25)?,
            median: quantile(&sorted, 0.5)?,
            mean: mean(&sorted)?,
            q3: quantile(&sorted, 0.75)?,
            max: *sorted.last()?,
        })
    }
}

/// Diagnostic summary of the cleaned table.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct RideSummary {
    pub total_rows: usize,
    pub by_member_casual: BTreeMap<String, usize>,
    pub missing_member_casual: usize,
    pub ride_length_min: Option<Distribution>,
    pub negative_rides: usize,
}

impl RideSummary {
    pub fn from_trips(trips: &[TripRecord]) -> Self {
        let mut s = RideSummary {
            total_rows: trips.len(),
            by_member_casual: UserType::ALL
                .iter()
                .map(|t| (t.to_string(), 0))
                .collect(),
            ..Default::default()
        };

        let mut minutes = Vec::with_capacity(trips.len());

        for trip in trips {
            match trip.member_casual {
                Some(t) => *s.by_member_casual.entry(t.to_string()).or_default() += 1,
                None => s.missing_member_casual += 1,
            }

            if let Some(min) = trip.ride_length_min {
                minutes.push(min);
            }

            if trip.ride_length_sec.is_some_and(|secs| secs < 0.0) {
                s.negative_rides += 1;
            }
        }

        s.ride_length_min = Distribution::from_values(&minutes);
        s
    }

    pub fn count(&self, user_type: UserType) -> usize {
        self.by_member_casual
            .get(user_type.as_str())
            .copied()
            .unwrap_or(0)
    }
}

impl fmt::Display for RideSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "rows: {}", self.total_rows)?;
        writeln!(f, "member_casual:")?;
        for (label, count) in &self.by_member_casual {
            writeln!(f, "  {label:<8} {count}")?;
        }
        if self.missing_member_casual > 0 {
            writeln!(f, "  {:<8} {}", "<NA>", self.missing_member_casual)?;
        }

        writeln!(f, "ride_length_min:")?;
        match &self.ride_length_min {
            Some(d) => {
                writeln!(f, "  min     {:.3}", d.min)?;
                writeln!(f, "  q1      {:.3}", d.q1)?;
                writeln!(f, "  median  {:.3}", d.median)?;
                writeln!(f, "  mean    {:.3}", d.mean)?;
                writeln!(f, "  q3      {:.3}", d.q3)?;
                writeln!(f, "  max     {:.3}", d.max)?;
            }
            None => writeln!(f, "  (no rides)")?,
        }

        write!(f, "ride_length_sec < 0: {}", self.negative_rides)
    }
}
