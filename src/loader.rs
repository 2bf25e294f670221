use crate::error::{AppError, Result};
use crate::model::{RawObservation, COLUMNS};
use csv::StringRecord;
use std::fmt::Display;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

// Positions of the fixed column subset
const SID: usize = 0;
const SEASON: usize = 1;
const NUMBER: usize = 2;
const BASIN: usize = 3;
const SUBBASIN: usize = 4;
const NAME: usize = 5;
const ISO_TIME: usize = 6;
const NATURE: usize = 7;
const LAT: usize = 8;
const LON: usize = 9;
const WMO_WIND: usize = 10;
const WMO_PRES: usize = 11;
const WMO_AGENCY: usize = 12;
const TRACK_TYPE: usize = 13;
const DIST2LAND: usize = 14;
const LANDFALL: usize = 15;

#[derive(Debug, Clone, Default)]
pub struct LoadStats {
    pub total_rows: usize,
    pub unit_rows_skipped: usize,
    pub observations: usize,
    pub missing_wind: usize,
    pub missing_pressure: usize,
}

pub struct Loader {
    skip_unit_row: bool,
}

impl Default for Loader {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Loader {
    pub fn new(skip_unit_row: bool) -> Self {
        Self { skip_unit_row }
    }

    /// Load a storm track CSV file from disk
    pub fn load_path<P: AsRef<Path>>(&self, path: P) -> Result<(Vec<RawObservation>, LoadStats)> {
        let path = path.as_ref();
        info!("Loading storm tracks from {}", path.display());

        let file = std::fs::File::open(path).map_err(|e| {
            AppError::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {}", path.display(), e),
            ))
        })?;
        self.load_reader(file)
    }

    pub fn load_str(&self, content: &str) -> Result<(Vec<RawObservation>, LoadStats)> {
        self.load_reader(content.as_bytes())
    }

    /// Load observations from any CSV source.
    ///
    /// The whole load fails on the first malformed row; nothing is returned
    /// partially.
    pub fn load_reader<R: Read>(&self, reader: R) -> Result<(Vec<RawObservation>, LoadStats)> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        check_headers(&headers)?;
        let expected = headers.len();

        let mut observations = Vec::new();
        let mut stats = LoadStats::default();

        for result in reader.records() {
            let record = result?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            stats.total_rows += 1;

            if record.len() != expected {
                return Err(AppError::MalformedRow {
                    line,
                    expected,
                    found: record.len(),
                });
            }

            if self.skip_unit_row && stats.total_rows == 1 {
                debug!("Skipping unit row at line {}", line);
                stats.unit_rows_skipped += 1;
                continue;
            }

            let obs = parse_record(&record, line)?;
            if obs.wind.is_none() {
                stats.missing_wind += 1;
            }
            if obs.pressure.is_none() {
                stats.missing_pressure += 1;
            }
            observations.push(obs);
        }

        stats.observations = observations.len();
        info!(
            "Loaded {} observations ({} rows read, {} without wind, {} without pressure)",
            stats.observations, stats.total_rows, stats.missing_wind, stats.missing_pressure
        );

        Ok((observations, stats))
    }
}

fn check_headers(headers: &StringRecord) -> Result<()> {
    if headers.len() < COLUMNS.len() {
        return Err(AppError::Parse(format!(
            "Expected at least {} header columns, got {}",
            COLUMNS.len(),
            headers.len()
        )));
    }

    for (idx, expected) in COLUMNS.iter().enumerate() {
        let found = headers.get(idx).unwrap_or("");
        if !found.eq_ignore_ascii_case(expected) {
            warn!(
                "Header column {} is '{}', expected '{}'; using it positionally",
                idx + 1,
                found,
                expected
            );
        }
    }

    Ok(())
}

fn parse_record(record: &StringRecord, line: u64) -> Result<RawObservation> {
    Ok(RawObservation {
        sid: required(record, SID, line)?.to_string(),
        season: parse_required(record, SEASON, line)?,
        number: parse_required(record, NUMBER, line)?,
        basin: required(record, BASIN, line)?.to_string(),
        subbasin: optional(record, SUBBASIN),
        name: required(record, NAME, line)?.to_string(),
        iso_time: required(record, ISO_TIME, line)?.to_string(),
        nature: optional(record, NATURE),
        lat: parse_coordinate(record, LAT, line)?,
        lon: parse_coordinate(record, LON, line)?,
        wind: parse_optional(record, WMO_WIND, line)?,
        pressure: parse_optional(record, WMO_PRES, line)?,
        agency: optional(record, WMO_AGENCY),
        track_type: optional(record, TRACK_TYPE),
        dist2land: parse_optional(record, DIST2LAND, line)?,
        landfall: parse_optional(record, LANDFALL, line)?,
        line,
    })
}

fn required<'r>(record: &'r StringRecord, idx: usize, line: u64) -> Result<&'r str> {
    match record.get(idx) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(AppError::Parse(format!(
            "Line {}: required column {} is empty",
            line, COLUMNS[idx]
        ))),
    }
}

/// Empty cells are missing; no other spelling is.
fn optional(record: &StringRecord, idx: usize) -> Option<String> {
    record
        .get(idx)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn parse_required<T>(record: &StringRecord, idx: usize, line: u64) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let value = required(record, idx, line)?;
    parse_value(value, idx, line)
}

/// `f64::from_str` accepts `NaN` and `inf`; a coordinate must be finite.
fn parse_coordinate(record: &StringRecord, idx: usize, line: u64) -> Result<f64> {
    let value: f64 = parse_required(record, idx, line)?;
    if !value.is_finite() {
        return Err(AppError::Parse(format!(
            "Line {}: {} must be a finite number, got '{}'",
            line,
            COLUMNS[idx],
            record.get(idx).unwrap_or("")
        )));
    }
    Ok(value)
}

fn parse_optional<T>(record: &StringRecord, idx: usize, line: u64) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match record.get(idx) {
        Some(value) if !value.is_empty() => parse_value(value, idx, line).map(Some),
        _ => Ok(None),
    }
}

fn parse_value<T>(value: &str, idx: usize, line: u64) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    value.parse::<T>().map_err(|e| {
        AppError::Parse(format!(
            "Line {}: failed to parse {} '{}': {}",
            line, COLUMNS[idx], value, e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "SID,SEASON,NUMBER,BASIN,SUBBASIN,NAME,ISO_TIME,NATURE,LAT,LON,WMO_WIND,WMO_PRES,WMO_AGENCY,TRACK_TYPE,DIST2LAND,LANDFALL";
    const UNITS: &str = " ,Year, , , , , , ,degrees_north,degrees_east,kts,mb, , ,km,km";

    #[test]
    fn test_load_skips_unit_row() {
        let content = format!(
            "{}\n{}\n\
             2012296N14283,2012,72,NA,CS,SANDY,2012-10-22 12:00:00,TS,13.5,-78.0,25,1006,hurdat_atl,main,370,370\n\
             2012296N14283,2012,72,NA,CS,SANDY,2012-10-22 18:00:00,TS,13.2,-78.5,30,1005,hurdat_atl,main,360,360\n",
            HEADER, UNITS
        );

        let (observations, stats) = Loader::default().load_str(&content).unwrap();
        assert_eq!(observations.len(), 2);
        assert_eq!(stats.unit_rows_skipped, 1);
        assert_eq!(stats.total_rows, 3);
        assert_eq!(observations[0].name, "SANDY");
        assert_eq!(observations[0].wind, Some(25));
        assert_eq!(observations[1].lat, 13.2);
    }

    #[test]
    fn test_empty_cells_are_missing_but_na_is_not() {
        let content = format!(
            "{}\n{}\n\
             1971001N10300,1971,1,NA,NA,NOT_NAMED,1971-06-01 00:00:00,DS,10.0,-60.0,,,,main,,\n",
            HEADER, UNITS
        );

        let (observations, stats) = Loader::default().load_str(&content).unwrap();
        let obs = &observations[0];
        assert_eq!(obs.basin, "NA");
        assert_eq!(obs.subbasin.as_deref(), Some("NA"));
        assert_eq!(obs.wind, None);
        assert_eq!(obs.pressure, None);
        assert_eq!(obs.agency, None);
        assert_eq!(obs.dist2land, None);
        assert_eq!(stats.missing_wind, 1);
        assert_eq!(stats.missing_pressure, 1);
    }

    #[test]
    fn test_wrong_column_count_fails_load() {
        let content = format!(
            "{}\n{}\n\
             2012296N14283,2012,72,NA,CS,SANDY,2012-10-22 12:00:00,TS,13.5,-78.0,25,1006,hurdat_atl,main,370,370\n\
             2012296N14283,2012,72,NA,CS,SANDY,2012-10-22 18:00:00,TS,13.2\n",
            HEADER, UNITS
        );

        match Loader::default().load_str(&content) {
            Err(AppError::MalformedRow {
                line,
                expected,
                found,
            }) => {
                assert_eq!(line, 4);
                assert_eq!(expected, 16);
                assert_eq!(found, 9);
            }
            other => panic!("Expected MalformedRow, got {:?}", other),
        }
    }

    #[test]
    fn test_negative_wind_rejected() {
        let content = format!(
            "{}\n{}\n\
             2012296N14283,2012,72,NA,CS,SANDY,2012-10-22 12:00:00,TS,13.5,-78.0,-5,1006,hurdat_atl,main,370,370\n",
            HEADER, UNITS
        );

        let err = Loader::default().load_str(&content).unwrap_err();
        assert!(err.to_string().contains("WMO_WIND"));
    }

    #[test]
    fn test_non_finite_coordinates_rejected() {
        for (lat, lon) in [("NaN", "-78.0"), ("13.5", "inf"), ("-inf", "-78.0")] {
            let content = format!(
                "{}\n{}\n\
                 2012296N14283,2012,72,NA,CS,SANDY,2012-10-22 12:00:00,TS,{},{},25,1006,hurdat_atl,main,370,370\n",
                HEADER, UNITS, lat, lon
            );

            let err = Loader::default().load_str(&content).unwrap_err();
            assert!(matches!(err, AppError::Parse(_)));
            assert!(err.to_string().contains("Line 3"), "{}", err);
            assert!(err.to_string().contains("finite"), "{}", err);
        }
    }

    #[test]
    fn test_missing_required_field() {
        let content = format!(
            "{}\n{}\n\
             2012296N14283,2012,72,NA,CS,,2012-10-22 12:00:00,TS,13.5,-78.0,25,1006,hurdat_atl,main,370,370\n",
            HEADER, UNITS
        );

        let err = Loader::default().load_str(&content).unwrap_err();
        assert!(err.to_string().contains("required column NAME"));
    }

    #[test]
    fn test_short_header_rejected() {
        let content = "SID,SEASON,NAME\nx,2012,SANDY\n";
        let result = Loader::default().load_str(content);
        assert!(matches!(result, Err(AppError::Parse(_))));
    }
}
