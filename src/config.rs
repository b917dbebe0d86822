use std::time::Duration;
use std::{fs, path::PathBuf};

use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{ResolverSettings, RetryPolicy};

/// Investment amount bounds, enforced before the pipeline starts.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BudgetConfig {
    pub min: f64,
    pub max: f64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        BudgetConfig {
            min: 1_000.0,
            max: 100_000_000.0,
        }
    }
}

impl BudgetConfig {
    pub fn validate(&self, amount: f64) -> Result<()> {
        if !amount.is_finite() || amount <= 0.0 {
            bail!("investment amount must be a positive number");
        }
        if amount < self.min {
            bail!("investment amount ₹{amount:.2} is below the minimum ₹{:.2}", self.min);
        }
        if amount > self.max {
            bail!("investment amount ₹{amount:.2} exceeds the maximum ₹{:.2}", self.max);
        }
        Ok(())
    }
}

/// Price source endpoint and retry behavior.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FetchConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub backoff_ms: u64,
    pub backoff_cap_ms: u64,
    pub concurrency: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            base_url: "https://query1.finance.yahoo.com".to_string(),
            timeout_secs: 10,
            max_retries: 3,
            backoff_ms: 1_000,
            backoff_cap_ms: 8_000,
            concurrency: 8,
        }
    }
}

impl FetchConfig {
    pub fn resolver_settings(&self) -> ResolverSettings {
        ResolverSettings {
            timeout: Duration::from_secs(self.timeout_secs.max(1)),
            concurrency: self.concurrency.max(1),
            retry: RetryPolicy {
                max_retries: self.max_retries,
                backoff: Duration::from_millis(self.backoff_ms),
                backoff_cap: Duration::from_millis(self.backoff_cap_ms),
            },
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub budget: BudgetConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Default securities CSV, used when --securities is not passed.
    #[serde(default)]
    pub universe: Option<String>,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

fn default_output_dir() -> String {
    "data/output".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            budget: BudgetConfig::default(),
            fetch: FetchConfig::default(),
            universe: None,
            output_dir: default_output_dir(),
        }
    }
}

impl AppConfig {
    /// Loads the default config file, falling back to built-in defaults
    /// when none has been written yet.
    pub fn load_or_default() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config file found, using defaults");
            return Ok(AppConfig::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("in", "nidx", "nidx")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
