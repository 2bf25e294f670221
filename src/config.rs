use crate::cleaner::DEFAULT_MIN_SEASON;
use crate::error::{AppError, Result};
use crate::model::{StormObservation, WindThresholds};
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};

/// Earliest season in the IBTrACS record
const FIRST_RECORDED_SEASON: i32 = 1842;
const LAST_SEASON: i32 = 2100;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub cleaning: CleaningConfig,
    #[serde(default)]
    pub thresholds: WindThresholds,
    pub report: ReportConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatasetConfig {
    pub path: PathBuf,
    #[serde(default = "default_skip_unit_row")]
    pub skip_unit_row: bool,
}

fn default_skip_unit_row() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct CleaningConfig {
    #[serde(default = "default_min_season", deserialize_with = "deserialize_year")]
    pub min_season: i32,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            min_season: default_min_season(),
        }
    }
}

fn default_min_season() -> i32 {
    DEFAULT_MIN_SEASON
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReportConfig {
    #[serde(deserialize_with = "deserialize_year")]
    pub season: i32,
    #[serde(default)]
    pub filter: StormFilter,
}

/// Custom deserializer that handles a year as both number and string
///
/// Accepts:
/// - `season: 2012` (number)
/// - `season: "2012"` (string that parses to number)
/// - `season: ${STORM_SEASON}` (env var substituted to either)
fn deserialize_year<'de, D>(deserializer: D) -> std::result::Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum YearValue {
        Number(i32),
        String(String),
    }

    match YearValue::deserialize(deserializer)? {
        YearValue::Number(n) => Ok(n),
        YearValue::String(s) => s
            .trim()
            .parse::<i32>()
            .map_err(|_| serde::de::Error::custom(format!("Invalid year: '{}'", s))),
    }
}

/// Restricts which storms a report looks at.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct StormFilter {
    /// Two-letter basin codes, e.g. `NA`, `EP`.
    #[serde(default)]
    pub basins: Vec<String>,
    /// Glob patterns matched against storm names, e.g. `S*`.
    #[serde(default)]
    pub names: Vec<String>,
}

impl StormFilter {
    pub fn is_empty(&self) -> bool {
        self.basins.is_empty() && self.names.is_empty()
    }

    /// Compile the name patterns once for matching many observations.
    ///
    /// Invalid patterns are rejected by `Config::validate`; here they are
    /// skipped.
    pub fn matcher(&self) -> StormMatcher<'_> {
        StormMatcher {
            basins: &self.basins,
            patterns: self
                .names
                .iter()
                .filter_map(|pattern| glob::Pattern::new(pattern).ok())
                .collect(),
            match_names: !self.names.is_empty(),
        }
    }

    /// An observation passes when it matches every configured criterion.
    pub fn matches(&self, obs: &StormObservation) -> bool {
        self.matcher().matches(obs)
    }
}

const NAME_MATCH: glob::MatchOptions = glob::MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// A [`StormFilter`] with its name patterns compiled.
#[derive(Debug, Clone)]
pub struct StormMatcher<'f> {
    basins: &'f [String],
    patterns: Vec<glob::Pattern>,
    match_names: bool,
}

impl StormMatcher<'_> {
    pub fn matches(&self, obs: &StormObservation) -> bool {
        if !self.basins.is_empty()
            && !self
                .basins
                .iter()
                .any(|basin| basin.eq_ignore_ascii_case(&obs.basin))
        {
            return false;
        }

        if self.match_names
            && !self
                .patterns
                .iter()
                .any(|pattern| pattern.matches_with(&obs.name, NAME_MATCH))
        {
            return false;
        }

        true
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| AppError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        // Substitute environment variables
        let expanded = expand_env_vars(content)?;

        let config: Config = serde_yaml::from_str(&expanded)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    ///
    /// Checks for:
    /// - Non-empty dataset path
    /// - Positive, strictly increasing wind thresholds
    /// - Seasons within the recorded range
    /// - Well-formed storm filters
    fn validate(&self) -> Result<()> {
        if self.dataset.path.as_os_str().is_empty() {
            return Err(AppError::Config("Dataset path cannot be empty".to_string()));
        }

        let t = &self.thresholds;
        if t.named_storm <= 0.0 {
            return Err(AppError::Config(format!(
                "Named storm threshold must be positive, got {}",
                t.named_storm
            )));
        }
        if !(t.named_storm < t.hurricane && t.hurricane < t.major_hurricane) {
            return Err(AppError::Config(format!(
                "Wind thresholds must be strictly increasing: named_storm={}, hurricane={}, major_hurricane={}",
                t.named_storm, t.hurricane, t.major_hurricane
            )));
        }

        let min_season = self.cleaning.min_season;
        if !(FIRST_RECORDED_SEASON..=LAST_SEASON).contains(&min_season) {
            return Err(AppError::Config(format!(
                "Cleaning min_season {} out of valid range ({}-{})",
                min_season, FIRST_RECORDED_SEASON, LAST_SEASON
            )));
        }

        if self.report.season < min_season {
            return Err(AppError::Config(format!(
                "Report season {} is before the cleaning cutoff {} and would always be empty",
                self.report.season, min_season
            )));
        }

        if self.report.season > LAST_SEASON {
            return Err(AppError::Config(format!(
                "Report season {} out of valid range",
                self.report.season
            )));
        }

        // Validate basin codes are 2 characters
        for basin in &self.report.filter.basins {
            if basin.len() != 2 {
                return Err(AppError::Config(format!(
                    "Basin code '{}' must be exactly 2 characters (e.g., 'NA', 'EP')",
                    basin
                )));
            }
        }

        for pattern in &self.report.filter.names {
            if let Err(e) = glob::Pattern::new(pattern) {
                return Err(AppError::Config(format!(
                    "Invalid storm name pattern '{}': {}",
                    pattern, e
                )));
            }
        }

        if self.dataset.skip_unit_row {
            tracing::debug!("Unit row after the header will be skipped");
        } else {
            tracing::warn!(
                "skip_unit_row is disabled; the file must not carry a unit row after the header"
            );
        }

        Ok(())
    }
}

fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = content.to_string();
    let re = regex_lite::Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| AppError::Config(format!("Invalid substitution pattern: {}", e)))?;

    let mut missing_vars = Vec::new();

    for cap in re.captures_iter(content) {
        let var_name = &cap[1];
        match std::env::var(var_name) {
            Ok(value) => {
                result = result.replace(&cap[0], &value);
            }
            Err(_) => {
                missing_vars.push(var_name.to_string());
            }
        }
    }

    if !missing_vars.is_empty() {
        return Err(AppError::Config(format!(
            "Missing required environment variable{}: {}\n\n\
             To fix this:\n\
             1. Create a .env file in the project root (copy .env.example)\n\
             2. Set the missing variable{}: export {}=<value>",
            if missing_vars.len() > 1 { "s" } else { "" },
            missing_vars.join(", "),
            if missing_vars.len() > 1 { "s" } else { "" },
            missing_vars[0],
        )));
    }

    Ok(result)
}
