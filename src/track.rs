use crate::error::{AppError, Result};
use crate::model::{StormCategory, StormObservation, WindThresholds};
use chrono::{Duration, NaiveDateTime};

/// All observations of one storm, ordered by time.
#[derive(Debug, Clone)]
pub struct StormTrack<'a> {
    observations: Vec<&'a StormObservation>,
}

impl<'a> StormTrack<'a> {
    /// Build a track from one storm's observations.
    ///
    /// Fails on an empty set, mixed storm identifiers, or two observations
    /// at the same time.
    pub fn new(mut observations: Vec<&'a StormObservation>) -> Result<Self> {
        let Some(&first) = observations.first() else {
            return Err(AppError::InvalidData("Storm track has no observations".to_string()));
        };
        let sid = first.sid.as_str();

        if let Some(other) = observations.iter().find(|obs| obs.sid != sid) {
            return Err(AppError::InvalidData(format!(
                "Storm track {} contains an observation of {}",
                sid, other.sid
            )));
        }

        observations.sort_by_key(|obs| obs.time);

        if let Some(pair) = observations.windows(2).find(|pair| pair[0].time == pair[1].time) {
            return Err(AppError::InvalidData(format!(
                "Storm {} has two observations at {} (lines {} and {})",
                sid, pair[0].time, pair[0].line, pair[1].line
            )));
        }

        Ok(Self { observations })
    }

    pub fn sid(&self) -> &'a str {
        &self.first().sid
    }

    pub fn name(&self) -> &'a str {
        &self.first().name
    }

    pub fn season(&self) -> i32 {
        self.first().season
    }

    pub fn observations(&self) -> &[&'a StormObservation] {
        &self.observations
    }

    pub fn first(&self) -> &'a StormObservation {
        self.observations[0]
    }

    pub fn last(&self) -> &'a StormObservation {
        self.observations[self.observations.len() - 1]
    }

    pub fn start(&self) -> NaiveDateTime {
        self.first().time
    }

    pub fn end(&self) -> NaiveDateTime {
        self.last().time
    }

    pub fn duration(&self) -> Duration {
        self.end() - self.start()
    }

    pub fn max_wind(&self) -> Option<u16> {
        self.observations.iter().filter_map(|obs| obs.wind).max()
    }

    pub fn min_pressure(&self) -> Option<u16> {
        self.observations.iter().filter_map(|obs| obs.pressure).min()
    }

    /// Strongest category reached over the storm's lifetime.
    pub fn peak_category(&self, thresholds: &WindThresholds) -> Option<StormCategory> {
        self.max_wind()
            .map(|wind| StormCategory::classify(f64::from(wind), thresholds))
    }
}
