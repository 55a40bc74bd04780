use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: General,
    pub paths: Paths,
    pub synthetic_score: SyntheticScore,
    pub model: Model,
    pub report: Report,
    pub observability: Observability,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct General {
    pub log_level: String,
}

impl Default for General {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub input: String,
    pub scores_csv: String,
    pub chart: String,
    pub report: String,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            input: "data/transactions.json".to_string(),
            scores_csv: "outputs/wallet_scores.csv".to_string(),
            chart: "outputs/score_distribution.svg".to_string(),
            report: "analysis.md".to_string(),
        }
    }
}

/// Weights of the hand-built label the model is trained against.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct SyntheticScore {
    pub deposit_to_borrow_weight: f64,
    pub repay_ratio_weight: f64,
    pub unique_assets_weight: f64,
    pub liquidation_penalty: f64,
}

impl Default for SyntheticScore {
    fn default() -> Self {
        Self {
            deposit_to_borrow_weight: 0.3,
            repay_ratio_weight: 0.3,
            unique_assets_weight: 0.2,
            liquidation_penalty: 0.2,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Model {
    pub n_trees: usize,
    pub seed: u64,
    pub test_fraction: f64,
    pub min_samples_split: usize,
    pub max_depth: Option<usize>,
}

impl Default for Model {
    fn default() -> Self {
        Self {
            n_trees: 100,
            seed: 42,
            test_fraction: 0.2,
            min_samples_split: 2,
            max_depth: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Report {
    /// Wallets strictly below this score form the low cohort.
    pub low_score_threshold: f64,
    /// Wallets at or above this score form the high cohort.
    pub high_score_threshold: f64,
}

impl Default for Report {
    fn default() -> Self {
        Self {
            low_score_threshold: 200.0,
            high_score_threshold: 800.0,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Observability {
    /// When set, the Prometheus text snapshot of the run is written here.
    pub metrics_path: Option<String>,
}

impl Config {
    /// Reads `config/default.toml`, falling back to built-in defaults when the file is absent.
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content)
                .with_context(|| format!("invalid config file {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }
}

impl FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_toml_str(s)
    }
}
