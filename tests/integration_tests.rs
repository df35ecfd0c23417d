use bikeshare_clean::config::{PipelineConfig, SchemaVariant, SourceSpec, TimezonePolicy};
use bikeshare_clean::error::PipelineError;
use bikeshare_clean::output::{read_snapshot, write_snapshot, write_trips_csv};
use bikeshare_clean::pipeline::run;
use bikeshare_clean::pipeline::types::{OUTPUT_COLUMNS, UserType};
use bikeshare_clean::stats::RideSummary;
use std::env;
use std::fs;
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn temp_path(name: &str) -> PathBuf {
    env::temp_dir().join(name)
}

fn config(sources: Vec<SourceSpec>) -> PipelineConfig {
    PipelineConfig {
        sources,
        tz_policy: TimezonePolicy::AssumeUtc,
        output: temp_path("bikeshare_clean_it_unused.csv"),
        snapshot: None,
    }
}

fn both_fixtures() -> PipelineConfig {
    config(vec![
        SourceSpec {
            variant: SchemaVariant::A,
            path: fixture("trips_a.csv"),
        },
        SourceSpec {
            variant: SchemaVariant::B,
            path: fixture("trips_b.csv"),
        },
    ])
}

#[test]
fn test_full_pipeline() {
    let result = run(&both_fixtures()).expect("pipeline failed");

    let ids: Vec<_> = result
        .trips
        .rows
        .iter()
        .map(|t| t.ride_id.as_str())
        .collect();
    // source order is kept and the id shared by both files is not deduplicated
    assert_eq!(ids, ["A1", "A5", "B1", "A1"]);

    let report = &result.report;
    assert_eq!(report.input_rows, 10);
    assert_eq!(report.kept_rows, 4);
    assert_eq!(report.too_short, 2);
    assert_eq!(report.too_long, 1);
    assert_eq!(report.missing_start, 1);
    assert_eq!(report.missing_end, 1);
    assert_eq!(report.missing_user_type, 1);
}

#[test]
fn test_variant_a_scenario_row() {
    let result = run(&both_fixtures()).unwrap();
    let first = &result.trips.rows[0];

    assert_eq!(first.ride_id, "A1");
    assert_eq!(
        first.started_at.map(|t| t.to_rfc3339()).as_deref(),
        Some("2019-01-01T08:00:00+00:00")
    );
    assert_eq!(first.member_casual, Some(UserType::Member));
    assert_eq!(first.ride_length_sec, Some(600.0));
    assert_eq!(first.ride_length_min, Some(10.0));
    assert_eq!(first.start_hour, Some(8));
    assert_eq!(first.start_station_name.as_deref(), Some("Wabash Ave & Grand Ave"));
}

#[test]
fn test_survivors_are_valid() {
    let result = run(&both_fixtures()).unwrap();

    for trip in &result.trips.rows {
        let secs = trip.ride_length_sec.unwrap();
        assert!(secs > 60.0 && secs < 86_400.0);
        assert!(trip.started_at.is_some());
        assert!(trip.ended_at.is_some());
        assert!(trip.member_casual.is_some());
        assert!((trip.ride_length_min.unwrap() - secs / 60.0).abs() < 1e-9);
    }

    let summary = RideSummary::from_trips(&result.trips.rows);
    assert_eq!(summary.negative_rides, 0);
    assert_eq!(summary.count(UserType::Member), 2);
    assert_eq!(summary.count(UserType::Casual), 2);
}

#[test]
fn test_output_columns_for_any_variant_mix() {
    for sources in [
        vec![SourceSpec {
            variant: SchemaVariant::A,
            path: fixture("trips_a.csv"),
        }],
        vec![SourceSpec {
            variant: SchemaVariant::B,
            path: fixture("trips_b.csv"),
        }],
    ] {
        let result = run(&config(sources)).unwrap();
        let path = temp_path(&format!(
            "bikeshare_clean_it_columns_{}.csv",
            result.trips.rows[0].ride_id
        ));

        write_trips_csv(&path, &result.trips.rows).unwrap();

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        let headers: Vec<String> = rdr.headers().unwrap().iter().map(str::to_string).collect();
        assert_eq!(headers, OUTPUT_COLUMNS);
        assert_eq!(rdr.records().count(), result.trips.len());

        fs::remove_file(&path).unwrap();
    }
}

#[test]
fn test_snapshot_matches_pipeline_output() {
    let result = run(&both_fixtures()).unwrap();
    let path = temp_path("bikeshare_clean_it_snapshot.json.gz");

    write_snapshot(&path, &result.trips.rows).unwrap();
    let snapshot = read_snapshot(&path).unwrap();

    assert_eq!(snapshot.trips, result.trips.rows);

    fs::remove_file(&path).unwrap();
}

#[test]
fn test_unknown_vocabulary_aborts() {
    let path = temp_path("bikeshare_clean_it_bad_vocab.csv");
    fs::write(
        &path,
        "trip_id,start_time,end_time,from_station_name,to_station_name,usertype\n\
         1,2019-01-01 08:00:00,2019-01-01 08:10:00,X,Y,Subscriber\n\
         2,2019-01-01 08:00:00,2019-01-01 08:10:00,X,Y,Dependent\n",
    )
    .unwrap();

    let err = run(&config(vec![SourceSpec {
        variant: SchemaVariant::A,
        path: path.clone(),
    }]))
    .unwrap_err();

    match err {
        PipelineError::UnknownVocabulary { row, value, .. } => {
            assert_eq!(row, 2);
            assert_eq!(value, "Dependent");
        }
        other => panic!("unexpected error: {other}"),
    }

    fs::remove_file(&path).unwrap();
}

#[test]
fn test_wrong_variant_is_schema_error() {
    // a variant B file declared as variant A lacks `trip_id`
    let err = run(&config(vec![SourceSpec {
        variant: SchemaVariant::A,
        path: fixture("trips_b.csv"),
    }]))
    .unwrap_err();

    match err {
        PipelineError::Schema { column, .. } => assert_eq!(column, "trip_id"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_missing_input_file_names_path() {
    let err = run(&config(vec![SourceSpec {
        variant: SchemaVariant::B,
        path: PathBuf::from("/nonexistent/trips_b.csv"),
    }]))
    .unwrap_err();

    let msg = err.to_string();
    assert!(msg.starts_with("[read]"));
    assert!(msg.contains("/nonexistent/trips_b.csv"));
}

#[test]
fn test_no_sources_is_config_error() {
    let err = run(&config(vec![])).unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)));
}

#[test]
fn test_written_timestamps_use_z_for_utc() {
    let result = run(&both_fixtures()).unwrap();
    let path = temp_path("bikeshare_clean_it_timestamps.csv");

    write_trips_csv(&path, &result.trips.rows).unwrap();

    let mut rdr = csv::Reader::from_path(&path).unwrap();
    let first = rdr.records().next().unwrap().unwrap();
    assert_eq!(&first[0], "A1");
    assert_eq!(&first[1], "2019-01-01T08:00:00Z");
    assert_eq!(&first[2], "2019-01-01T08:10:00Z");

    fs::remove_file(&path).unwrap();
}

#[test]
fn test_undecodable_timestamp_drops_only_its_row() {
    let path = temp_path("bikeshare_clean_it_bad_bytes.csv");
    let mut content = b"ride_id,started_at,ended_at,start_station_name,end_station_name,member_casual\n\
        R1,2020-01-21 20:06:59,2020-01-21 20:14:30,X,Y,member\n\
        R2,2020-01-21 20:06:59,2020-01-21 20:"
        .to_vec();
    content.push(0xff);
    content.extend_from_slice(b"4:30,X,Y,casual\n");
    fs::write(&path, content).unwrap();

    let result = run(&config(vec![SourceSpec {
        variant: SchemaVariant::B,
        path: path.clone(),
    }]))
    .expect("a bad timestamp cell must not abort the run");

    let ids: Vec<_> = result.trips.rows.iter().map(|t| t.ride_id.as_str()).collect();
    assert_eq!(ids, ["R1"]);
    assert_eq!(result.report.input_rows, 2);
    assert_eq!(result.report.missing_end, 1);

    fs::remove_file(&path).unwrap();
}
