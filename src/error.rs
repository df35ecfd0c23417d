//! Fatal error taxonomy for the cleaning pipeline.
//!
//! Timestamp parse failures have no variant here: they are absorbed into
//! missing derived fields and removed by the validity filter.

use std::path::Path;
use thiserror::Error;

use crate::config::SchemaVariant;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("[read] {path}: missing column `{column}` required by schema variant {variant}")]
    Schema {
        path: String,
        column: String,
        variant: SchemaVariant,
    },

    #[error(
        "[normalize] {path}: row {row}: unknown user category `{value}` for schema variant {variant}"
    )]
    UnknownVocabulary {
        path: String,
        row: usize,
        value: String,
        variant: SchemaVariant,
    },

    #[error("[{stage}] {path}: {source}")]
    Io {
        stage: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("[{stage}] {path}: {source}")]
    Csv {
        stage: &'static str,
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("[{stage}] {path}: snapshot encoding failed: {source}")]
    Snapshot {
        stage: &'static str,
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("[read] {path}: unsupported snapshot schema version {version}")]
    SnapshotVersion { path: String, version: u8 },

    #[error("[report] summary encoding failed: {0}")]
    Report(#[source] serde_json::Error),

    #[error("[merge] no source tables to merge")]
    NoSources,

    #[error("[config] {0}")]
    Config(String),
}

impl PipelineError {
    pub fn io(stage: &'static str, path: &Path, source: std::io::Error) -> Self {
        PipelineError::Io {
            stage,
            path: path.display().to_string(),
            source,
        }
    }

    pub fn csv(stage: &'static str, path: &Path, source: csv::Error) -> Self {
        PipelineError::Csv {
            stage,
            path: path.display().to_string(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_names_stage_file_and_column() {
        let err = PipelineError::Schema {
            path: "trips_2019.csv".to_string(),
            column: "usertype".to_string(),
            variant: SchemaVariant::A,
        };
        let msg = err.to_string();
        assert!(msg.starts_with("[read]"));
        assert!(msg.contains("trips_2019.csv"));
        assert!(msg.contains("usertype"));
    }

    #[test]
    fn test_unknown_vocabulary_error_names_value() {
        let err = PipelineError::UnknownVocabulary {
            path: "trips_2019.csv".to_string(),
            row: 7,
            value: "Dependent".to_string(),
            variant: SchemaVariant::A,
        };
        let msg = err.to_string();
        assert!(msg.starts_with("[normalize]"));
        assert!(msg.contains("row 7"));
        assert!(msg.contains("Dependent"));
    }

    #[test]
    fn test_io_error_names_stage() {
        let err = PipelineError::io(
            "write",
            Path::new("out.csv"),
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.to_string(), "[write] out.csv: denied");
    }

    #[test]
    fn test_snapshot_version_error_names_read_stage() {
        let err = PipelineError::SnapshotVersion {
            path: "trips.json.gz".to_string(),
            version: 9,
        };
        assert_eq!(
            err.to_string(),
            "[read] trips.json.gz: unsupported snapshot schema version 9"
        );
    }

    #[test]
    fn test_report_error_is_not_a_snapshot_error() {
        let source = serde_json::from_str::<u8>("x").unwrap_err();
        let msg = PipelineError::Report(source).to_string();
        assert!(msg.starts_with("[report] summary encoding failed:"));
        assert!(!msg.contains("snapshot"));
    }
}
