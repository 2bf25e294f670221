use std::io::Write;
use std::path::PathBuf;
use storm_season::cleaner::Cleaner;
use storm_season::config::{Config, StormFilter};
use storm_season::loader::Loader;
use storm_season::model::{StormCategory, WindThresholds};
use storm_season::query::StormTable;
use storm_season::report::SeasonReport;
use tempfile::NamedTempFile;

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/ibtracs_na_sample.csv")
}

fn load_table() -> StormTable {
    let (raw, _) = Loader::default().load_path(fixture_path()).expect("Load failed");
    let (cleaned, _) = Cleaner::default().clean(raw).expect("Clean failed");
    StormTable::new(cleaned)
}

/// Test the 2012 season report end to end
#[test]
fn test_2012_season_report() {
    let table = load_table();
    let report = SeasonReport::build(
        &table,
        2012,
        &WindThresholds::default(),
        &StormFilter::default(),
    )
    .expect("Report failed");

    assert_eq!(report.observations, 77);
    assert_eq!(report.storms, 19);
    assert_eq!(report.named_storms.len(), 19);
    assert_eq!(report.hurricanes.len(), 10);
    assert_eq!(report.major_hurricanes, vec!["MICHAEL", "SANDY"]);
    assert_eq!(report.bucket_counts[&StormCategory::Hurricane], 8);

    let strongest: Vec<&str> = report.strongest.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(strongest, vec!["MICHAEL", "SANDY"]);

    assert_eq!(report.deepest.len(), 1);
    assert_eq!(report.deepest[0].name, "SANDY");
    assert_eq!(report.deepest[0].min_pressure, Some(940));

    assert_eq!(report.first_formed.as_ref().unwrap().name, "ALBERTO");
    assert_eq!(report.last_dissipated.as_ref().unwrap().name, "SANDY");

    let (start, end) = report.span.expect("Season span missing");
    assert_eq!(start.format("%Y-%m-%d %H:%M").to_string(), "2012-05-19 00:00");
    assert_eq!(end.format("%Y-%m-%d %H:%M").to_string(), "2012-10-23 00:00");

    assert_eq!(report.named_per_year[&2012], 19);
    assert_eq!(report.hurricanes_per_year[&2011], 2);
    assert_eq!(report.average_hurricanes_per_year, Some(4.0));

    report.log();
}

/// Test the report honours the storm filter
#[test]
fn test_filtered_report() {
    let table = load_table();
    let filter = StormFilter {
        basins: vec![],
        names: vec!["S*".to_string(), "T*".to_string()],
    };

    let report = SeasonReport::build(&table, 2012, &WindThresholds::default(), &filter)
        .expect("Report failed");

    assert_eq!(report.storms, 2);
    assert_eq!(report.hurricanes, vec!["SANDY"]);
    assert_eq!(report.first_formed.unwrap().name, "SANDY");
}

/// Test a season with no data produces an empty report
#[test]
fn test_empty_season_report() {
    let table = load_table();
    let report = SeasonReport::build(
        &table,
        1995,
        &WindThresholds::default(),
        &StormFilter::default(),
    )
    .expect("Report failed");

    assert_eq!(report.storms, 0);
    assert!(report.named_storms.is_empty());
    assert!(report.strongest.is_empty());
    assert!(report.span.is_none());
    assert_eq!(report.named_per_year.len(), 3);
}

/// Test loading a config file from disk drives the pipeline
#[test]
fn test_config_file_pipeline() {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    write!(
        file,
        "dataset:\n  path: {}\ncleaning:\n  min_season: 2012\nreport:\n  season: 2012\n",
        fixture_path().display()
    )
    .unwrap();
    file.flush().unwrap();

    let config = Config::load(file.path()).expect("Config failed");
    let (raw, _) = Loader::new(config.dataset.skip_unit_row)
        .load_path(&config.dataset.path)
        .expect("Load failed");
    let (cleaned, _) = Cleaner::new(config.cleaning.min_season)
        .clean(raw)
        .expect("Clean failed");
    let table = StormTable::new(cleaned);

    let report = SeasonReport::build(
        &table,
        config.report.season,
        &config.thresholds,
        &config.report.filter,
    )
    .expect("Report failed");

    assert_eq!(table.len(), 77);
    assert_eq!(report.named_per_year.len(), 1);
    assert_eq!(report.average_named_per_year, Some(19.0));
}
