//! Configuration loader and path helpers.
//!
//! Uses Figment to merge compiled defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (`APP_PIPELINE__WORKERS=8`). Provides helpers to expand `~`
//! and `${VAR}` in configured paths.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::queue::Backoff;

/// Smallest heap budget tantivy accepts per indexing thread.
pub const MIN_WRITER_HEAP_BYTES: usize = 15_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub workers: usize,
    pub queue_cap: usize,
    pub backoff_initial_ms: u64,
    pub backoff_max_ms: u64,
    pub progress_log_initial: u64,
    pub progress_bar: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_cap: 10_000,
            backoff_initial_ms: 1,
            backoff_max_ms: 256,
            progress_log_initial: 1_000,
            progress_bar: false,
        }
    }
}

impl PipelineSettings {
    pub fn backoff(&self) -> Backoff {
        Backoff::from_millis(self.backoff_initial_ms, self.backoff_max_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterSettings {
    pub heap_size_bytes: usize,
    pub merge_factor: usize,
    pub max_buffered_docs: usize,
    /// 0 lets tantivy pick the indexing thread count.
    pub threads: usize,
}

impl Default for WriterSettings {
    fn default() -> Self {
        Self { heap_size_bytes: 50_000_000, merge_factor: 8, max_buffered_docs: 100_000, threads: 0 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub source_dir: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self { source_dir: "../dev_data/export".to_string() }
    }
}

impl DataSettings {
    pub fn source_path(&self) -> PathBuf {
        expand_path(&self.source_dir)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub pipeline: PipelineSettings,
    pub writer: WriterSettings,
    pub data: DataSettings,
}

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self::from_figment(figment);
        config.settings()?;
        tracing::debug!(env = %env_name, "configuration loaded");
        Ok(config)
    }

    /// Wraps an already assembled figment; defaults are not added.
    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    /// Compiled defaults only, no files or environment.
    pub fn defaults() -> Self {
        Self::from_figment(Figment::from(Serialized::defaults(Settings::default())))
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Typed view of every section, validated.
    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self.figment.extract().map_err(|e| Error::InvalidConfig(e.to_string()))?;
        validate(&settings)?;
        Ok(settings)
    }
}

pub fn validate(settings: &Settings) -> Result<()> {
    let p = &settings.pipeline;
    if p.workers == 0 {
        return Err(Error::InvalidConfig("pipeline.workers must be at least 1".into()));
    }
    if p.queue_cap == 0 {
        return Err(Error::InvalidConfig("pipeline.queue_cap must be at least 1".into()));
    }
    if p.backoff_initial_ms == 0 {
        return Err(Error::InvalidConfig("pipeline.backoff_initial_ms must be at least 1".into()));
    }
    if p.backoff_max_ms < p.backoff_initial_ms {
        return Err(Error::InvalidConfig(format!(
            "pipeline.backoff_max_ms ({}) is below backoff_initial_ms ({})",
            p.backoff_max_ms, p.backoff_initial_ms
        )));
    }
    let w = &settings.writer;
    if w.heap_size_bytes < MIN_WRITER_HEAP_BYTES {
        return Err(Error::InvalidConfig(format!(
            "writer.heap_size_bytes must be at least {MIN_WRITER_HEAP_BYTES}, got {}",
            w.heap_size_bytes
        )));
    }
    if w.threads > 0 && w.heap_size_bytes / w.threads < MIN_WRITER_HEAP_BYTES {
        return Err(Error::InvalidConfig(format!(
            "writer.heap_size_bytes ({}) split over {} threads is below {MIN_WRITER_HEAP_BYTES} per thread",
            w.heap_size_bytes, w.threads
        )));
    }
    if w.max_buffered_docs == 0 {
        return Err(Error::InvalidConfig("writer.max_buffered_docs must be at least 1".into()));
    }
    Ok(())
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
