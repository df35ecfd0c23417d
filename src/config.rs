//! Pipeline configuration: which file carries which schema variant, how
//! zone-less timestamps are interpreted, and where results are written.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{PipelineError, Result};

pub const DEFAULT_OUTPUT: &str = "all_trips_clean.csv";

/// The two raw trip-log layouts the pipeline understands.
///
/// Variant A is the older export (`trip_id`, `start_time`, `usertype` with
/// Subscriber/Customer labels). Variant B already uses the canonical column
/// names and the member/casual vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVariant {
    A,
    B,
}

impl fmt::Display for SchemaVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaVariant::A => write!(f, "A"),
            SchemaVariant::B => write!(f, "B"),
        }
    }
}

impl FromStr for SchemaVariant {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a" => Ok(SchemaVariant::A),
            "b" => Ok(SchemaVariant::B),
            other => Err(PipelineError::Config(format!(
                "unknown schema variant `{other}` (expected `a` or `b`)"
            ))),
        }
    }
}

/// How timestamps without an explicit offset are placed on the timeline.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum TimezonePolicy {
    /// Treat wall-clock strings as UTC.
    #[default]
    AssumeUtc,
    /// Resolve wall-clock strings through the host time zone.
    AssumeLocal,
}

/// One input file paired with the schema variant used to read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub variant: SchemaVariant,
    pub path: PathBuf,
}

impl FromStr for SourceSpec {
    type Err = PipelineError;

    /// Parses `VARIANT=PATH`, e.g. `a=data/Divvy_Trips_2019_Q1.csv`.
    fn from_str(s: &str) -> Result<Self> {
        let (variant, path) = s.split_once('=').ok_or_else(|| {
            PipelineError::Config(format!("source `{s}` must look like VARIANT=PATH"))
        })?;
        if path.trim().is_empty() {
            return Err(PipelineError::Config(format!("source `{s}` has an empty path")));
        }
        Ok(SourceSpec {
            variant: variant.parse()?,
            path: PathBuf::from(path.trim()),
        })
    }
}

/// Full settings for one `run` invocation.
///
/// Stored on disk as JSON:
/// ```json
/// {
///   "sources": [
///     { "variant": "a", "path": "Divvy_Trips_2019_Q1.csv" },
///     { "variant": "b", "path": "Divvy_Trips_2020_Q1.csv" }
///   ],
///   "tz_policy": "assume-utc",
///   "output": "all_trips_clean.csv",
///   "snapshot": "all_trips_clean.json.gz"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub sources: Vec<SourceSpec>,
    #[serde(default)]
    pub tz_policy: TimezonePolicy,
    #[serde(default = "default_output")]
    pub output: PathBuf,
    #[serde(default)]
    pub snapshot: Option<PathBuf>,
}

fn default_output() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT)
}

impl PipelineConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::io("config", std::path::Path::new(path), e))?;
        let config: PipelineConfig = serde_json::from_str(&content)
            .map_err(|e| PipelineError::Config(format!("{path}: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(PipelineError::Config(
                "at least one source is required".to_string(),
            ));
        }
        Ok(())
    }
}
