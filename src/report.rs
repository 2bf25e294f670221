use crate::config::StormFilter;
use crate::error::Result;
use crate::model::{StormCategory, WindThresholds};
use crate::query::{average, extremum_by, Direction, Extreme, OrderBy, StormTable};
use crate::track::StormTrack;
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use tracing::info;

/// Lifetime figures of one storm.
#[derive(Debug, Clone, PartialEq)]
pub struct StormSummary {
    pub sid: String,
    pub name: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub max_wind: Option<u16>,
    pub min_pressure: Option<u16>,
}

impl From<&StormTrack<'_>> for StormSummary {
    fn from(track: &StormTrack<'_>) -> Self {
        Self {
            sid: track.sid().to_string(),
            name: track.name().to_string(),
            start: track.start(),
            end: track.end(),
            max_wind: track.max_wind(),
            min_pressure: track.min_pressure(),
        }
    }
}

/// Descriptive statistics for one season, plus cross-season context.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonReport {
    pub season: i32,
    pub observations: usize,
    pub storms: usize,
    pub named_storms: Vec<String>,
    pub hurricanes: Vec<String>,
    pub major_hurricanes: Vec<String>,
    /// Overlapping per-bucket counts, see `View::classify_by_wind_threshold`.
    pub bucket_counts: BTreeMap<StormCategory, usize>,
    pub strongest: Vec<StormSummary>,
    pub deepest: Vec<StormSummary>,
    pub first_formed: Option<StormSummary>,
    pub last_dissipated: Option<StormSummary>,
    pub span: Option<(NaiveDateTime, NaiveDateTime)>,
    pub storms_per_month: BTreeMap<u32, usize>,
    pub named_per_year: BTreeMap<i32, usize>,
    pub average_named_per_year: Option<f64>,
    pub hurricanes_per_year: BTreeMap<i32, usize>,
    pub average_hurricanes_per_year: Option<f64>,
}

impl SeasonReport {
    pub fn build(
        table: &StormTable,
        season: i32,
        thresholds: &WindThresholds,
        filter: &StormFilter,
    ) -> Result<Self> {
        let all = table.view().filter_storms(filter);
        let rows = all.filter_by_season(season);
        let tracks = rows.tracks()?;

        let names = |threshold: f64| -> Vec<String> {
            rows.storms_reaching(threshold)
                .into_iter()
                .map(|(_, name)| name.to_string())
                .collect()
        };

        let summaries = |picked: Vec<&StormTrack<'_>>| -> Vec<StormSummary> {
            picked.into_iter().map(StormSummary::from).collect()
        };

        let strongest = summaries(extremum_by(
            &tracks,
            |t| t.max_wind().map(f64::from),
            Extreme::Max,
        ));
        let deepest = summaries(extremum_by(
            &tracks,
            |t| t.min_pressure().map(f64::from),
            Extreme::Min,
        ));

        let track_of = |sid: &str| {
            tracks
                .iter()
                .find(|t| t.sid() == sid)
                .map(StormSummary::from)
        };
        let first_formed = rows
            .first_or_last(OrderBy::Time, Direction::Ascending)
            .and_then(|obs| track_of(&obs.sid));
        let last_dissipated = rows
            .first_or_last(OrderBy::Time, Direction::Descending)
            .and_then(|obs| track_of(&obs.sid));

        let span = first_formed
            .as_ref()
            .zip(last_dissipated.as_ref())
            .map(|(first, last)| (first.start, last.end));

        let named_storm = thresholds.named_storm;
        let hurricane = thresholds.hurricane;
        let named_per_year =
            all.per_year_count(|obs| obs.wind.is_some_and(|w| f64::from(w) >= named_storm));
        let hurricanes_per_year =
            all.per_year_count(|obs| obs.wind.is_some_and(|w| f64::from(w) >= hurricane));

        Ok(Self {
            season,
            observations: rows.len(),
            storms: rows.per_year_count(|_| true).values().sum(),
            named_storms: names(thresholds.named_storm),
            hurricanes: names(thresholds.hurricane),
            major_hurricanes: names(thresholds.major_hurricane),
            bucket_counts: rows.classify_by_wind_threshold(thresholds).counts(),
            strongest,
            deepest,
            first_formed,
            last_dissipated,
            span,
            storms_per_month: rows.monthly_counts(),
            average_named_per_year: average(&named_per_year),
            named_per_year,
            average_hurricanes_per_year: average(&hurricanes_per_year),
            hurricanes_per_year,
        })
    }

    /// Emit the report as log lines.
    pub fn log(&self) {
        info!(
            "Season {}: {} storms from {} observations",
            self.season, self.storms, self.observations
        );
        info!(
            "Named storms ({}): {}",
            self.named_storms.len(),
            self.named_storms.join(", ")
        );
        info!(
            "Hurricanes ({}): {}",
            self.hurricanes.len(),
            self.hurricanes.join(", ")
        );
        info!(
            "Major hurricanes ({}): {}",
            self.major_hurricanes.len(),
            self.major_hurricanes.join(", ")
        );

        for (category, count) in &self.bucket_counts {
            info!("Storms observed as {}: {}", category, count);
        }

        for storm in &self.strongest {
            info!(
                "Strongest: {} ({}) peaking at {} kt",
                storm.name,
                storm.sid,
                storm.max_wind.unwrap_or_default()
            );
        }
        for storm in &self.deepest {
            info!(
                "Deepest: {} ({}) at {} mb",
                storm.name,
                storm.sid,
                storm.min_pressure.unwrap_or_default()
            );
        }

        if let Some(storm) = &self.first_formed {
            info!("First to form: {} on {}", storm.name, storm.start);
        }
        if let Some(storm) = &self.last_dissipated {
            info!("Last to dissipate: {} on {}", storm.name, storm.end);
        }
        if let Some((start, end)) = self.span {
            info!("Season span: {} to {} ({} days)", start, end, (end - start).num_days());
        }

        for (month, count) in &self.storms_per_month {
            info!("Month {:02}: {} storms active", month, count);
        }

        if let Some(avg) = self.average_named_per_year {
            info!(
                "Average named storms per season over {} seasons: {:.2}",
                self.named_per_year.len(),
                avg
            );
        }
        if let Some(avg) = self.average_hurricanes_per_year {
            info!(
                "Average hurricanes per season over {} seasons: {:.2}",
                self.hurricanes_per_year.len(),
                avg
            );
        }
    }
}
