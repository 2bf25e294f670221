use crate::error::{AppError, Result};
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// A storm position report as read from the CSV, timestamp still unparsed.
#[derive(Debug, Clone, PartialEq)]
pub struct RawObservation {
    pub sid: String,
    pub season: i32,
    pub number: i32,
    pub basin: String,
    pub subbasin: Option<String>,
    pub name: String,
    pub iso_time: String,
    pub nature: Option<String>,

    pub lat: f64,
    pub lon: f64,

    pub wind: Option<u16>,
    pub pressure: Option<u16>,

    pub agency: Option<String>,
    pub track_type: Option<String>,
    pub dist2land: Option<i32>,
    pub landfall: Option<i32>,

    /// Line in the source file, for diagnostics.
    pub line: u64,
}

/// A cleaned storm position report.
#[derive(Debug, Clone, PartialEq)]
pub struct StormObservation {
    pub sid: String,
    pub season: i32,
    pub number: i32,
    pub basin: String,
    pub subbasin: Option<String>,
    pub name: String,
    pub time: NaiveDateTime,
    pub month: u32,
    pub nature: Option<String>,

    pub lat: f64,
    pub lon: f64,

    pub wind: Option<u16>,
    pub pressure: Option<u16>,

    pub agency: Option<String>,
    pub track_type: Option<String>,
    pub dist2land: Option<i32>,
    pub landfall: Option<i32>,

    pub line: u64,
}

impl StormObservation {
    /// Value of a numeric column, `None` when the cell is missing.
    pub fn numeric(&self, column: NumericColumn) -> Option<f64> {
        match column {
            NumericColumn::Season => Some(self.season as f64),
            NumericColumn::Number => Some(self.number as f64),
            NumericColumn::Lat => Some(self.lat),
            NumericColumn::Lon => Some(self.lon),
            NumericColumn::Wind => self.wind.map(f64::from),
            NumericColumn::Pressure => self.pressure.map(f64::from),
            NumericColumn::Dist2Land => self.dist2land.map(f64::from),
            NumericColumn::Landfall => self.landfall.map(f64::from),
            NumericColumn::Month => Some(self.month as f64),
        }
    }
}

/// Columns that can be compared numerically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericColumn {
    Season,
    Number,
    Lat,
    Lon,
    Wind,
    Pressure,
    Dist2Land,
    Landfall,
    Month,
}

impl FromStr for NumericColumn {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let column = match s.to_ascii_lowercase().as_str() {
            "season" => NumericColumn::Season,
            "number" => NumericColumn::Number,
            "lat" => NumericColumn::Lat,
            "lon" => NumericColumn::Lon,
            "wind" | "wmo_wind" => NumericColumn::Wind,
            "pressure" | "wmo_pres" => NumericColumn::Pressure,
            "dist2land" => NumericColumn::Dist2Land,
            "landfall" => NumericColumn::Landfall,
            "month" => NumericColumn::Month,
            other => {
                let known = COLUMNS.iter().any(|c| c.eq_ignore_ascii_case(other));
                return Err(AppError::InvalidData(if known {
                    format!("Column '{}' is not numeric", s)
                } else {
                    format!("Unknown column '{}'", s)
                }));
            }
        };
        Ok(column)
    }
}

/// Fixed column layout of the input file, in file order.
pub const COLUMNS: [&str; 16] = [
    "SID",
    "SEASON",
    "NUMBER",
    "BASIN",
    "SUBBASIN",
    "NAME",
    "ISO_TIME",
    "NATURE",
    "LAT",
    "LON",
    "WMO_WIND",
    "WMO_PRES",
    "WMO_AGENCY",
    "TRACK_TYPE",
    "DIST2LAND",
    "LANDFALL",
];

/// Saffir-Simpson style intensity buckets, ordered by strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StormCategory {
    Depression,
    NamedStorm,
    Hurricane,
    MajorHurricane,
}

impl StormCategory {
    pub const ALL: [StormCategory; 4] = [
        StormCategory::Depression,
        StormCategory::NamedStorm,
        StormCategory::Hurricane,
        StormCategory::MajorHurricane,
    ];

    /// Classify a sustained wind speed. Lower bounds are inclusive.
    pub fn classify(wind_kt: f64, thresholds: &WindThresholds) -> Self {
        if wind_kt >= thresholds.major_hurricane {
            StormCategory::MajorHurricane
        } else if wind_kt >= thresholds.hurricane {
            StormCategory::Hurricane
        } else if wind_kt >= thresholds.named_storm {
            StormCategory::NamedStorm
        } else {
            StormCategory::Depression
        }
    }
}

impl fmt::Display for StormCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StormCategory::Depression => "depression",
            StormCategory::NamedStorm => "named storm",
            StormCategory::Hurricane => "hurricane",
            StormCategory::MajorHurricane => "major hurricane",
        };
        f.write_str(label)
    }
}

/// Wind speed cutoffs in knots.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct WindThresholds {
    #[serde(default = "default_named_storm")]
    pub named_storm: f64,
    #[serde(default = "default_hurricane")]
    pub hurricane: f64,
    #[serde(default = "default_major_hurricane")]
    pub major_hurricane: f64,
}

fn default_named_storm() -> f64 {
    33.89 // 39 mph
}

fn default_hurricane() -> f64 {
    64.30 // 74 mph
}

fn default_major_hurricane() -> f64 {
    96.46 // 111 mph
}

impl Default for WindThresholds {
    fn default() -> Self {
        Self {
            named_storm: default_named_storm(),
            hurricane: default_hurricane(),
            major_hurricane: default_major_hurricane(),
        }
    }
}

impl WindThresholds {
    /// Lower bound of a category, in knots.
    pub fn lower_bound(&self, category: StormCategory) -> f64 {
        match category {
            StormCategory::Depression => 0.0,
            StormCategory::NamedStorm => self.named_storm,
            StormCategory::Hurricane => self.hurricane,
            StormCategory::MajorHurricane => self.major_hurricane,
        }
    }
}

/// Per-season summary of how many storms reached each threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalAggregate {
    pub season: i32,
    pub storms: usize,
    pub named_storms: usize,
    pub hurricanes: usize,
    pub major_hurricanes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_inclusive_lower_bounds() {
        let t = WindThresholds::default();
        assert_eq!(StormCategory::classify(30.0, &t), StormCategory::Depression);
        assert_eq!(StormCategory::classify(33.89, &t), StormCategory::NamedStorm);
        assert_eq!(StormCategory::classify(64.30, &t), StormCategory::Hurricane);
        assert_eq!(StormCategory::classify(96.46, &t), StormCategory::MajorHurricane);
        assert_eq!(StormCategory::classify(64.0, &t), StormCategory::NamedStorm);
    }

    #[test]
    fn test_numeric_column_from_str() {
        assert_eq!("wind".parse::<NumericColumn>().unwrap(), NumericColumn::Wind);
        assert_eq!("WMO_PRES".parse::<NumericColumn>().unwrap(), NumericColumn::Pressure);

        let err = "name".parse::<NumericColumn>().unwrap_err();
        assert!(err.to_string().contains("not numeric"));

        let err = "ISO_TIME".parse::<NumericColumn>().unwrap_err();
        assert!(err.to_string().contains("not numeric"));

        let err = "gust".parse::<NumericColumn>().unwrap_err();
        assert!(err.to_string().contains("Unknown column"));
    }

    #[test]
    fn test_thresholds_deserialize_partial() {
        let yaml = "hurricane: 65.0\n";
        let t: WindThresholds = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(t.named_storm, 33.89);
        assert_eq!(t.hurricane, 65.0);
        assert_eq!(t.major_hurricane, 96.46);
    }
}
