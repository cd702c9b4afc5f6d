//! Run configuration loaded from a TOML file.
//!
//! Everything a run needs is in [`Config`]; it is passed explicitly into
//! each component, so the pipeline can be run repeatedly with different
//! parameters in one process.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use site_scout_scoring::ScoreError;
use site_scout_scoring_models::{ScoringOptions, Weights};
use site_scout_source_models::SourcesConfig;
use site_scout_zone_models::{RegionFilter, ZoneSourceConfig};

/// Config file used when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "site_scout.toml";

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// Config file path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`Config`].
    #[error("Failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("Invalid config: {message}")]
    Invalid {
        /// Description of what went wrong.
        message: String,
    },

    /// Weights or scoring options were rejected.
    #[error(transparent)]
    Scoring(#[from] ScoreError),
}

const fn default_top_n() -> usize {
    20
}

fn default_output() -> PathBuf {
    PathBuf::from("data/processed/top_sites.csv")
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("data/raw")
}

fn default_processed_dir() -> PathBuf {
    PathBuf::from("data/processed")
}

/// Full run configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    /// Number of zones in the ranked report.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    /// Ranked report path.
    #[serde(default = "default_output")]
    pub output: PathBuf,
    /// Where raw zone geometry downloads are cached.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    /// Where `fetch` writes the canonical CSV tables.
    #[serde(default = "default_processed_dir")]
    pub processed_dir: PathBuf,
    /// Region codes zones are restricted to.
    #[serde(default)]
    pub region: RegionFilter,
    /// Composite score weights.
    #[serde(default)]
    pub weights: Weights,
    /// Edge-case policies for the score engine.
    #[serde(default)]
    pub scoring: ScoringOptions,
    /// Zone polygon source.
    pub zones: ZoneSourceConfig,
    /// Adapter for each canonical table.
    pub sources: SourcesConfig,
}

impl Config {
    /// Reads and validates a config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file can't be read or parsed, or if
    /// validation fails.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&text)?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parses and validates config text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the text isn't a valid config or
    /// validation fails.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges that serde can't express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero `top_n` or malformed
    /// region codes, and [`ConfigError::Scoring`] for invalid weights or
    /// scoring options.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_n == 0 {
            return Err(ConfigError::Invalid {
                message: "top_n must be at least 1".to_string(),
            });
        }

        if let Some(code) = self
            .region
            .codes
            .iter()
            .find(|c| c.len() != 5 || !c.bytes().all(|b| b.is_ascii_digit()))
        {
            return Err(ConfigError::Invalid {
                message: format!(
                    "region code '{code}' must be a 5-digit state+county FIPS code"
                ),
            });
        }

        site_scout_scoring::validate_weights(&self.weights)?;
        site_scout_scoring::validate_options(&self.scoring)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use site_scout_scoring_models::IncompleteZonePolicy;
    use site_scout_source_models::{CompetitorAdapter, DemographicsAdapter};

    const MINIMAL: &str = r#"
        [zones]
        type = "geojson_file"
        path = "data/raw/block_groups.geojson"

        [sources.competitors]
        type = "csv"
        path = "data/processed/competitors.csv"

        [sources.demographics]
        type = "csv"
        path = "data/processed/demographics.csv"

        [sources.foot_traffic]
        type = "csv"
        path = "data/processed/foot_traffic.csv"
    "#;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = Config::parse(MINIMAL).unwrap();
        assert_eq!(config.top_n, 20);
        assert_eq!(config.output, PathBuf::from("data/processed/top_sites.csv"));
        assert_eq!(config.cache_dir, PathBuf::from("data/raw"));
        assert_eq!(config.processed_dir, PathBuf::from("data/processed"));
        assert!(config.region.codes.is_empty());
        assert_eq!(config.weights, Weights::default());
        assert_eq!(config.scoring, ScoringOptions::default());
        assert!(matches!(
            config.sources.competitors,
            CompetitorAdapter::Csv { .. }
        ));
    }

    #[test]
    fn full_config_parses() {
        let text = r#"
            top_n = 5
            output = "out/top.csv"

            [region]
            codes = ["48453"]

            [weights]
            population = 0.3
            foot_traffic = 0.3
            competition = 0.2
            income = 0.2

            [scoring]
            incomplete_zone = "drop"
            degenerate_value = 0.5

            [zones]
            type = "tigerweb"
            state_fips = "48"
            county_fips = "453"

            [sources.competitors]
            type = "overpass"
            area = "Austin"
            tags = { amenity = "cafe" }

            [sources.demographics]
            type = "census_acs"
            year = 2021
            state_fips = "48"
            county_fips = "453"

            [sources.foot_traffic]
            type = "csv"
            path = "ft.csv"
        "#;

        let config = Config::parse(text).unwrap();
        assert_eq!(config.top_n, 5);
        assert_eq!(config.region.codes, vec!["48453".to_string()]);
        assert!((config.weights.income - 0.2).abs() < 1e-12);
        assert_eq!(config.scoring.incomplete_zone, IncompleteZonePolicy::Drop);
        assert!(matches!(config.zones, ZoneSourceConfig::Tigerweb { .. }));
        assert!(matches!(
            config.sources.demographics,
            DemographicsAdapter::CensusAcs { year: 2021, .. }
        ));
    }

    #[test]
    fn bundled_config_is_valid() {
        let config = Config::parse(include_str!("../../../site_scout.toml")).unwrap();
        assert_eq!(config.region.codes, vec!["48453".to_string()]);
        assert!(matches!(
            config.sources.competitors,
            CompetitorAdapter::Overpass { .. }
        ));
    }

    #[test]
    fn rejects_weights_not_summing_to_one() {
        let text = format!(
            "{MINIMAL}\n[weights]\npopulation = 0.5\nfoot_traffic = 0.5\ncompetition = 0.5\n"
        );
        assert!(matches!(
            Config::parse(&text),
            Err(ConfigError::Scoring(ScoreError::InvalidWeights { .. }))
        ));
    }

    #[test]
    fn rejects_zero_top_n_and_bad_region_codes() {
        let zero = format!("top_n = 0\n{MINIMAL}");
        assert!(matches!(
            Config::parse(&zero),
            Err(ConfigError::Invalid { .. })
        ));

        let bad_region = format!("{MINIMAL}\n[region]\ncodes = [\"453\"]\n");
        assert!(matches!(
            Config::parse(&bad_region),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn rejects_unknown_adapter_type() {
        let text = MINIMAL.replace(
            "[sources.competitors]\n        type = \"csv\"",
            "[sources.competitors]\n        type = \"yelp\"",
        );
        assert_ne!(text, MINIMAL);
        assert!(matches!(Config::parse(&text), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Config::load(Path::new("/nonexistent/site_scout.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
