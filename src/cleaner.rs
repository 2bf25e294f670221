use crate::error::{AppError, Result};
use crate::model::{RawObservation, StormObservation};
use chrono::{Datelike, NaiveDateTime};
use tracing::{debug, info};

/// Default first season kept after cleaning
pub const DEFAULT_MIN_SEASON: i32 = 1970;

const TIMESTAMP_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// A row that can be turned into a cleaned observation.
///
/// Implemented for cleaned rows too, so cleaning a cleaned table is a no-op.
pub trait Clean {
    fn into_clean(self) -> Result<StormObservation>;
}

impl Clean for RawObservation {
    fn into_clean(self) -> Result<StormObservation> {
        let time = parse_timestamp(&self.iso_time).ok_or_else(|| AppError::Timestamp {
            line: self.line,
            sid: self.sid.clone(),
            value: self.iso_time.clone(),
        })?;

        Ok(StormObservation {
            sid: self.sid,
            season: self.season,
            number: self.number,
            basin: self.basin,
            subbasin: self.subbasin,
            name: self.name,
            time,
            month: time.month(),
            nature: self.nature,
            lat: self.lat,
            lon: self.lon,
            wind: self.wind,
            pressure: self.pressure,
            agency: self.agency,
            track_type: self.track_type,
            dist2land: self.dist2land,
            landfall: self.landfall,
            line: self.line,
        })
    }
}

impl Clean for StormObservation {
    fn into_clean(mut self) -> Result<StormObservation> {
        self.month = self.time.month();
        Ok(self)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CleanStats {
    pub input_rows: usize,
    pub dropped_before_cutoff: usize,
    pub retained: usize,
}

pub struct Cleaner {
    min_season: i32,
}

impl Default for Cleaner {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SEASON)
    }
}

impl Cleaner {
    pub fn new(min_season: i32) -> Self {
        Self { min_season }
    }

    pub fn min_season(&self) -> i32 {
        self.min_season
    }

    /// Parse timestamps, derive months and drop seasons before the cutoff.
    ///
    /// Every row's timestamp is parsed before any row is dropped, so a bad
    /// timestamp fails the clean even in a season that would be discarded.
    pub fn clean<T, I>(&self, rows: I) -> Result<(Vec<StormObservation>, CleanStats)>
    where
        T: Clean,
        I: IntoIterator<Item = T>,
    {
        let parsed = rows
            .into_iter()
            .map(Clean::into_clean)
            .collect::<Result<Vec<_>>>()?;

        let mut stats = CleanStats {
            input_rows: parsed.len(),
            ..CleanStats::default()
        };

        let cleaned: Vec<StormObservation> = parsed
            .into_iter()
            .filter(|obs| obs.season >= self.min_season)
            .collect();

        stats.retained = cleaned.len();
        stats.dropped_before_cutoff = stats.input_rows - stats.retained;

        debug!(
            "Dropped {} rows before season {}",
            stats.dropped_before_cutoff, self.min_season
        );
        info!("Cleaned table has {} observations", stats.retained);

        Ok((cleaned, stats))
    }
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value.trim(), format).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(season: i32, iso_time: &str) -> RawObservation {
        RawObservation {
            sid: "2012296N14283".to_string(),
            season,
            number: 72,
            basin: "NA".to_string(),
            subbasin: Some("CS".to_string()),
            name: "SANDY".to_string(),
            iso_time: iso_time.to_string(),
            nature: Some("TS".to_string()),
            lat: 13.5,
            lon: -78.0,
            wind: Some(25),
            pressure: Some(1006),
            agency: Some("hurdat_atl".to_string()),
            track_type: Some("main".to_string()),
            dist2land: Some(370),
            landfall: Some(370),
            line: 3,
        }
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = "2012-10-22 12:00:00";
        for value in ["2012-10-22 12:00:00", "2012-10-22T12:00:00", "2012-10-22 12:00"] {
            let parsed = parse_timestamp(value).unwrap();
            assert_eq!(parsed.format("%Y-%m-%d %H:%M:%S").to_string(), expected);
        }
        assert!(parse_timestamp("22/10/2012").is_none());
    }

    #[test]
    fn test_clean_derives_month_and_applies_cutoff() {
        let rows = vec![raw(1969, "1969-08-17 00:00:00"), raw(2012, "2012-10-22 12:00:00")];

        let (cleaned, stats) = Cleaner::default().clean(rows).unwrap();
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].month, 10);
        assert_eq!(stats.input_rows, 2);
        assert_eq!(stats.dropped_before_cutoff, 1);
        assert_eq!(stats.retained, 1);
    }

    #[test]
    fn test_bad_timestamp_fails_even_before_cutoff() {
        let rows = vec![raw(1950, "not a date"), raw(2012, "2012-10-22 12:00:00")];

        match Cleaner::default().clean(rows) {
            Err(AppError::Timestamp { line, sid, value }) => {
                assert_eq!(line, 3);
                assert_eq!(sid, "2012296N14283");
                assert_eq!(value, "not a date");
            }
            other => panic!("Expected Timestamp error, got {:?}", other),
        }
    }

    #[test]
    fn test_clean_twice_is_idempotent() {
        let rows = vec![raw(1969, "1969-08-17 00:00:00"), raw(2012, "2012-10-22 12:00:00")];
        let cleaner = Cleaner::default();

        let (once, _) = cleaner.clean(rows).unwrap();
        let (twice, stats) = cleaner.clean(once.clone()).unwrap();
        assert_eq!(once, twice);
        assert_eq!(stats.dropped_before_cutoff, 0);
    }
}
