//! Filter and aggregate queries over a cleaned storm table.
//!
//! A [`StormTable`] owns the cleaned observations. Queries run against a
//! [`View`], a borrowed selection of rows that filters narrow down. Nothing
//! is cached: every aggregate is recomputed from the selected rows.

use crate::config::StormFilter;
use crate::error::Result;
use crate::model::{NumericColumn, SeasonalAggregate, StormCategory, StormObservation, WindThresholds};
use crate::track::StormTrack;
use chrono::{NaiveDate, NaiveDateTime};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashSet};

#[derive(Debug, Clone, Default)]
pub struct StormTable {
    observations: Vec<StormObservation>,
}

impl From<Vec<StormObservation>> for StormTable {
    fn from(observations: Vec<StormObservation>) -> Self {
        Self { observations }
    }
}

impl StormTable {
    pub fn new(observations: Vec<StormObservation>) -> Self {
        Self::from(observations)
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observations(&self) -> &[StormObservation] {
        &self.observations
    }

    /// A view over every row in the table.
    pub fn view(&self) -> View<'_> {
        View {
            rows: self.observations.iter().collect(),
        }
    }
}

/// How storms are told apart when grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupKey {
    /// Storm name within a season. Unnamed systems share one group.
    #[default]
    Name,
    /// Storm identifier.
    Sid,
}

impl GroupKey {
    fn key<'a>(&self, obs: &'a StormObservation) -> &'a str {
        match self {
            GroupKey::Name => &obs.name,
            GroupKey::Sid => &obs.sid,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extreme {
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderBy {
    Time,
    Column(NumericColumn),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Storms grouped by the intensity bucket(s) they were observed in.
///
/// A storm appears in every bucket any of its observations fell into, so
/// bucket counts overlap.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    buckets: BTreeMap<StormCategory, BTreeMap<(i32, String), usize>>,
}

impl Classification {
    /// Number of storms with at least one observation in the bucket.
    pub fn count(&self, category: StormCategory) -> usize {
        self.buckets.get(&category).map_or(0, BTreeMap::len)
    }

    /// Every bucket with its storm count, empty buckets included.
    pub fn counts(&self) -> BTreeMap<StormCategory, usize> {
        StormCategory::ALL
            .iter()
            .map(|&category| (category, self.count(category)))
            .collect()
    }

    /// Observation counts per `(season, storm)` within a bucket.
    pub fn storms(&self, category: StormCategory) -> impl Iterator<Item = (&(i32, String), &usize)> {
        self.buckets.get(&category).into_iter().flatten()
    }

    pub fn names(&self, category: StormCategory) -> Vec<&str> {
        self.storms(category)
            .map(|((_, name), _)| name.as_str())
            .collect()
    }
}

/// A borrowed selection of observations.
#[derive(Debug, Clone, Default)]
pub struct View<'a> {
    rows: Vec<&'a StormObservation>,
}

impl<'a> View<'a> {
    pub fn rows(&self) -> &[&'a StormObservation] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a StormObservation> + '_ {
        self.rows.iter().copied()
    }

    pub fn filter<F>(&self, pred: F) -> View<'a>
    where
        F: Fn(&StormObservation) -> bool,
    {
        View {
            rows: self.iter().filter(|obs| pred(*obs)).collect(),
        }
    }

    pub fn filter_by_season(&self, season: i32) -> View<'a> {
        self.filter(|obs| obs.season == season)
    }

    /// Rows observed between `start` and `end`, both days inclusive.
    pub fn filter_by_date_range(&self, start: NaiveDate, end: NaiveDate) -> View<'a> {
        self.filter(|obs| {
            let day = obs.time.date();
            day >= start && day <= end
        })
    }

    pub fn filter_by_month(&self, month: u32) -> View<'a> {
        self.filter(|obs| obs.month == month)
    }

    pub fn filter_storms(&self, filter: &StormFilter) -> View<'a> {
        if filter.is_empty() {
            return self.clone();
        }
        let matcher = filter.matcher();
        self.filter(|obs| matcher.matches(obs))
    }

    /// Seasons present in the view.
    pub fn seasons(&self) -> BTreeSet<i32> {
        self.iter().map(|obs| obs.season).collect()
    }

    pub fn classify_by_wind_threshold(&self, thresholds: &WindThresholds) -> Classification {
        self.classify_by_wind_threshold_by(thresholds, GroupKey::Name)
    }

    /// Bucket every observation with a known wind speed, grouped per storm
    /// and season. Rows without wind are ignored.
    pub fn classify_by_wind_threshold_by(
        &self,
        thresholds: &WindThresholds,
        key: GroupKey,
    ) -> Classification {
        let mut classification = Classification::default();

        for obs in self.iter() {
            let Some(wind) = obs.wind else { continue };
            let category = StormCategory::classify(f64::from(wind), thresholds);
            *classification
                .buckets
                .entry(category)
                .or_default()
                .entry((obs.season, key.key(obs).to_string()))
                .or_default() += 1;
        }

        classification
    }

    /// Distinct `(season, name)` storms with any wind at or above
    /// `threshold`, in order of first appearance.
    pub fn storms_reaching(&self, threshold: f64) -> Vec<(i32, &'a str)> {
        let mut seen = HashSet::new();
        self.iter()
            .filter(|obs| obs.wind.is_some_and(|w| f64::from(w) >= threshold))
            .map(|obs| (obs.season, obs.name.as_str()))
            .filter(|storm| seen.insert(*storm))
            .collect()
    }

    pub fn count_reaching(&self, threshold: f64) -> usize {
        self.storms_reaching(threshold).len()
    }

    /// All rows holding the minimum or maximum of `column`. Ties are kept and
    /// rows where the column is missing are skipped.
    pub fn extremum(&self, column: NumericColumn, extreme: Extreme) -> Vec<&'a StormObservation> {
        extremum_by(&self.rows, |obs| obs.numeric(column), extreme)
            .into_iter()
            .copied()
            .collect()
    }

    /// The first row when ordered by `order`. Rows with a missing key are
    /// skipped; among equal keys the earliest row in the view wins.
    pub fn first_or_last(&self, order: OrderBy, direction: Direction) -> Option<&'a StormObservation> {
        match order {
            OrderBy::Time => pick(&self.rows, |obs| Some(obs.time), NaiveDateTime::cmp, direction),
            OrderBy::Column(column) => pick(
                &self.rows,
                |obs| obs.numeric(column),
                f64::total_cmp,
                direction,
            ),
        }
    }

    /// Distinct storms per season with at least one row matching `pred`.
    ///
    /// Every season in the view gets an entry, zero when nothing matched.
    pub fn per_year_count<F>(&self, pred: F) -> BTreeMap<i32, usize>
    where
        F: Fn(&StormObservation) -> bool,
    {
        let mut storms: BTreeMap<i32, BTreeSet<&str>> = self
            .seasons()
            .into_iter()
            .map(|season| (season, BTreeSet::new()))
            .collect();

        for obs in self.iter().filter(|obs| pred(*obs)) {
            storms.entry(obs.season).or_default().insert(obs.name.as_str());
        }

        storms
            .into_iter()
            .map(|(season, names)| (season, names.len()))
            .collect()
    }

    /// Distinct storms active in each calendar month.
    pub fn monthly_counts(&self) -> BTreeMap<u32, usize> {
        let mut storms: BTreeMap<u32, BTreeSet<(i32, &str)>> = BTreeMap::new();
        for obs in self.iter() {
            storms
                .entry(obs.month)
                .or_default()
                .insert((obs.season, obs.name.as_str()));
        }
        storms
            .into_iter()
            .map(|(month, names)| (month, names.len()))
            .collect()
    }

    /// Group rows into time-ordered tracks, one per storm identifier.
    pub fn tracks(&self) -> Result<Vec<StormTrack<'a>>> {
        let mut by_sid: BTreeMap<&str, Vec<&'a StormObservation>> = BTreeMap::new();
        for obs in self.iter() {
            by_sid.entry(obs.sid.as_str()).or_default().push(obs);
        }

        by_sid.into_values().map(StormTrack::new).collect()
    }

    pub fn seasonal_aggregates(&self, thresholds: &WindThresholds) -> Vec<SeasonalAggregate> {
        self.seasons()
            .into_iter()
            .map(|season| {
                let rows = self.filter_by_season(season);
                let storms: BTreeSet<&str> = rows.iter().map(|obs| obs.name.as_str()).collect();
                SeasonalAggregate {
                    season,
                    storms: storms.len(),
                    named_storms: rows.count_reaching(thresholds.named_storm),
                    hurricanes: rows.count_reaching(thresholds.hurricane),
                    major_hurricanes: rows.count_reaching(thresholds.major_hurricane),
                }
            })
            .collect()
    }
}

/// Items sharing the smallest or largest key. Items without a key are
/// skipped.
pub fn extremum_by<T, F>(items: &[T], key: F, extreme: Extreme) -> Vec<&T>
where
    F: Fn(&T) -> Option<f64>,
{
    let target = items.iter().filter_map(&key).reduce(|best, value| {
        let keep_new = match extreme {
            Extreme::Min => value.total_cmp(&best) == Ordering::Less,
            Extreme::Max => value.total_cmp(&best) == Ordering::Greater,
        };
        if keep_new {
            value
        } else {
            best
        }
    });

    let Some(target) = target else {
        return Vec::new();
    };

    items
        .iter()
        .filter(|item| key(*item).is_some_and(|v| v.total_cmp(&target) == Ordering::Equal))
        .collect()
}

/// Mean of the mapped values, `None` when there are none.
pub fn average<K>(counts: &BTreeMap<K, usize>) -> Option<f64> {
    if counts.is_empty() {
        return None;
    }
    let total: usize = counts.values().sum();
    Some(total as f64 / counts.len() as f64)
}

fn pick<'a, K, F, C>(
    rows: &[&'a StormObservation],
    key: F,
    cmp: C,
    direction: Direction,
) -> Option<&'a StormObservation>
where
    F: Fn(&StormObservation) -> Option<K>,
    C: Fn(&K, &K) -> Ordering,
{
    let mut best: Option<(K, &'a StormObservation)> = None;

    for &obs in rows {
        let Some(value) = key(obs) else { continue };
        let better = match &best {
            None => true,
            Some((current, _)) => {
                let ord = cmp(&value, current);
                match direction {
                    Direction::Ascending => ord == Ordering::Less,
                    Direction::Descending => ord == Ordering::Greater,
                }
            }
        };
        if better {
            best = Some((value, obs));
        }
    }

    best.map(|(_, obs)| obs)
}
