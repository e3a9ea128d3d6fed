use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://geoadm.com/";
const DEFAULT_DB_PATH: &str = "data/geoadm.sqlite";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; GeoadmScraper/0.1)";

/// Defaults < `geoadm.toml` (optional) < `GEOADM_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub base_url: String,
    pub db_path: PathBuf,
    pub concurrency: usize,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Settings {
    pub fn load() -> Result<Self> {
        let settings: Settings = Config::builder()
            .set_default("base_url", DEFAULT_BASE_URL)?
            .set_default("db_path", DEFAULT_DB_PATH)?
            .set_default("concurrency", 4)?
            .set_default("user_agent", DEFAULT_USER_AGENT)?
            .set_default("timeout_secs", 30)?
            .add_source(File::with_name("geoadm").required(false))
            .add_source(Environment::with_prefix("GEOADM"))
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;
        Ok(settings.sanitized())
    }

    fn sanitized(mut self) -> Self {
        self.concurrency = self.concurrency.max(1);
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
