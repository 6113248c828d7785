//! Dashboard configuration.
//!
//! Read from an optional JSON file, then overridden by `HEALTHDASH_*`
//! environment variables. Every field has a default, so an empty object (or
//! no file at all) is a valid configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::chart::CorrelationGuard;
use crate::data::catalog::{Catalog, Dimension};
use crate::data::filter::FilterSelection;
use crate::data::model::{DimensionValue, Gender};
use crate::error::{DashError, Result};

pub const ENV_DATASET: &str = "HEALTHDASH_DATASET";
pub const ENV_TOP_N: &str = "HEALTHDASH_TOP_N";
pub const ENV_MIN_SAMPLES: &str = "HEALTHDASH_MIN_SAMPLES";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Dataset loaded at startup (`.csv`, `.parquet`, `.json`).
    pub dataset: Option<PathBuf>,

    /// Countries shown in the top-N bar chart.
    pub top_n: usize,

    /// Sample size and variance checks for correlations.
    pub correlation: CorrelationGuard,

    /// Fit a regression line on scatter plots.
    pub regression: bool,

    /// Age group applied when the view starts; `None` disables it.
    pub default_age_group: Option<String>,

    pub default_gender: Option<Gender>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            dataset: None,
            top_n: 10,
            correlation: CorrelationGuard::default(),
            regression: true,
            default_age_group: Some("Age-standardized".to_string()),
            default_gender: Some(Gender::Both),
        }
    }
}

impl DashboardConfig {
    /// Load from `path` (when given) and apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: DashboardConfig = serde_json::from_str(&text)?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// [`DashboardConfig::load`]).
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_DATASET).filter(|p| !p.trim().is_empty()) {
            self.dataset = Some(PathBuf::from(path));
        }
        if let Some(raw) = lookup(ENV_TOP_N) {
            self.top_n = parse_count(ENV_TOP_N, &raw)?;
        }
        if let Some(raw) = lookup(ENV_MIN_SAMPLES) {
            self.correlation.min_samples = parse_count(ENV_MIN_SAMPLES, &raw)?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_n == 0 {
            return Err(DashError::Config("top_n must be at least 1".into()));
        }
        let min_variance = self.correlation.min_variance;
        if min_variance.is_nan() || min_variance < 0.0 {
            return Err(DashError::Config(format!(
                "correlation.min_variance must be non-negative, got {}",
                self.correlation.min_variance
            )));
        }
        Ok(())
    }

    /// Starting filters: the default age group and gender, each applied only
    /// when the dataset actually holds that value.
    pub fn default_selection(&self, catalog: &Catalog) -> FilterSelection {
        let mut selection = FilterSelection::new();
        let defaults = [
            (
                Dimension::AgeGroup,
                self.default_age_group.clone().map(DimensionValue::from),
            ),
            (
                Dimension::Gender,
                self.default_gender.map(|g| DimensionValue::from(g.as_str())),
            ),
        ];
        for (dimension, value) in defaults {
            match value {
                Some(value) if catalog.contains(dimension, &value) => {
                    selection = selection.with_value(dimension, value);
                }
                Some(value) => {
                    log::debug!("default {dimension} {value} not in dataset, not applied");
                }
                None => {}
            }
        }
        selection
    }
}

fn parse_count(key: &str, raw: &str) -> Result<usize> {
    raw.trim()
        .parse()
        .map_err(|_| DashError::Config(format!("{key} must be a non-negative integer, got {raw:?}")))
}
