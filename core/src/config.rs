//! Runtime configuration: where the data lives and how to reach the model.
//!
//! Loaded from a JSON file (every field optional), then overlaid with
//! environment variables. Credentials normally come from the environment.

use crate::{
    error::{ReviewError, ReviewResult},
    gateway::{ANALYSIS_TEMPERATURE, CHAT_TEMPERATURE},
    types::RECENT_CLAIMS_LIMIT,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_DATABASE_PATH: &str = "data/processed/fraud_detection.db";
pub const DEFAULT_MODEL: &str = "openai/gpt-3.5-turbo";
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub base_url: String,
    /// Never written back out.
    #[serde(skip_serializing)]
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
    pub chat_temperature: f32,
    pub analysis_temperature: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key: String::new(),
            model: DEFAULT_MODEL.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            chat_temperature: CHAT_TEMPERATURE,
            analysis_temperature: ANALYSIS_TEMPERATURE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Maximum pipeline runs in flight at once. 1 means strictly sequential.
    pub concurrency: usize,
    pub top_cases_limit: usize,
    /// History rows pulled per provider and per patient.
    pub history_limit: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            top_cases_limit: 10,
            history_limit: RECENT_CLAIMS_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    pub database_path: String,
    pub model: ModelConfig,
    pub batch: BatchConfig,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            database_path: DEFAULT_DATABASE_PATH.into(),
            model: ModelConfig::default(),
            batch: BatchConfig::default(),
        }
    }
}

impl ReviewConfig {
    /// Load from a JSON file, then apply environment overrides.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let mut config: ReviewConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> ReviewResult<Self> {
        let mut config = ReviewConfig::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Overlay values from `lookup`, which is `std::env::var` outside tests.
    pub fn apply_env<F>(&mut self, lookup: F) -> ReviewResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("OPENROUTER_BASE_URL") {
            self.model.base_url = v;
        }
        if let Some(v) = lookup("OPENROUTER_API_KEY") {
            self.model.api_key = v;
        }
        if let Some(v) = lookup("DEFAULT_MODEL") {
            self.model.model = v;
        }
        if let Some(v) = lookup("CLAIMLENS_DB") {
            self.database_path = v;
        }
        if let Some(v) = lookup("CLAIMLENS_MODEL_TIMEOUT_SECS") {
            self.model.timeout_secs = v.trim().parse().map_err(|_| {
                ReviewError::Config(format!("CLAIMLENS_MODEL_TIMEOUT_SECS not a number: {v}"))
            })?;
        }
        if let Some(v) = lookup("CLAIMLENS_CONCURRENCY") {
            self.batch.concurrency = v.trim().parse().map_err(|_| {
                ReviewError::Config(format!("CLAIMLENS_CONCURRENCY not a number: {v}"))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> ReviewResult<()> {
        if self.database_path.trim().is_empty() {
            return Err(ReviewError::Config("database_path is empty".into()));
        }
        if self.model.base_url.trim().is_empty() {
            return Err(ReviewError::Config("model.base_url is empty".into()));
        }
        if self.model.model.trim().is_empty() {
            return Err(ReviewError::Config("model.model is empty".into()));
        }
        if self.model.timeout_secs == 0 {
            return Err(ReviewError::Config("model.timeout_secs must be > 0".into()));
        }
        for (name, t) in [
            ("chat_temperature", self.model.chat_temperature),
            ("analysis_temperature", self.model.analysis_temperature),
        ] {
            if !(0.0..=1.0).contains(&t) {
                return Err(ReviewError::Config(format!(
                    "model.{name} {t} outside [0, 1]"
                )));
            }
        }
        if self.batch.concurrency == 0 {
            return Err(ReviewError::Config("batch.concurrency must be >= 1".into()));
        }
        Ok(())
    }

    /// Configuration used by tests: a given database, sequential batches.
    pub fn default_test(database_path: &str) -> Self {
        Self {
            database_path: database_path.into(),
            model: ModelConfig {
                base_url: "http://127.0.0.1:9".into(),
                timeout_secs: 5,
                ..ModelConfig::default()
            },
            batch: BatchConfig::default(),
        }
    }
}
