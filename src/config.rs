use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub youtube: YoutubeConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

/// Tuning for the YouTube Data API client. The API key itself is read from
/// the `YOUTUBE_API_KEY` environment variable, never from the config file.
#[derive(Debug, Deserialize, Clone)]
pub struct YoutubeConfig {
    #[serde(default = "default_youtube_api_base")]
    pub api_base: String,
    /// Items fetched per trending-chart refresh.
    #[serde(default = "default_chart_size")]
    pub chart_size: u32,
    /// Items requested per keyword search.
    #[serde(default = "default_search_size")]
    pub search_size: u32,
    #[serde(default = "default_youtube_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            api_base: default_youtube_api_base(),
            chart_size: default_chart_size(),
            search_size: default_search_size(),
            timeout_secs: default_youtube_timeout_secs(),
        }
    }
}

fn default_youtube_api_base() -> String {
    "https://www.googleapis.com/youtube/v3".to_string()
}
fn default_chart_size() -> u32 {
    10
}
fn default_search_size() -> u32 {
    50
}
fn default_youtube_timeout_secs() -> u64 {
    10
}

/// Tuning for the annotation model. The key comes from `GEMINI_API_KEY`;
/// when it is absent the deterministic fallback annotation is used instead.
#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    #[serde(default = "default_model_api_base")]
    pub api_base: String,
    #[serde(default = "default_model_name")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_model_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_base: default_model_api_base(),
            model: default_model_name(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            timeout_secs: default_model_timeout_secs(),
        }
    }
}

fn default_model_api_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_model_name() -> String {
    "gemini-2.0-flash".to_string()
}
fn default_temperature() -> f64 {
    0.7
}
fn default_max_output_tokens() -> u32 {
    1024
}
fn default_model_timeout_secs() -> u64 {
    20
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// Trending-chart freshness window.
    #[serde(default = "default_trends_ttl_minutes")]
    pub trends_ttl_minutes: i64,
    /// Keyword-analysis freshness window.
    #[serde(default = "default_keyword_ttl_hours")]
    pub keyword_ttl_hours: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            trends_ttl_minutes: default_trends_ttl_minutes(),
            keyword_ttl_hours: default_keyword_ttl_hours(),
        }
    }
}

fn default_trends_ttl_minutes() -> i64 {
    30
}
fn default_keyword_ttl_hours() -> i64 {
    6
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetentionConfig {
    /// Raw trending records older than this are purged by the janitor.
    #[serde(default = "default_purge_after_days")]
    pub purge_after_days: i64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            purge_after_days: default_purge_after_days(),
        }
    }
}

fn default_purge_after_days() -> i64 {
    90
}

/// YouTube Data API key, required for all upstream fetches.
pub fn youtube_api_key() -> Option<String> {
    non_empty_env("YOUTUBE_API_KEY")
}

/// Annotation model key. Optional: absence selects the heuristic fallback.
pub fn model_api_key() -> Option<String> {
    non_empty_env("GEMINI_API_KEY")
}

/// Shared secret for the scheduled refresh trigger.
pub fn cron_secret() -> Option<String> {
    non_empty_env("CRON_SECRET")
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.youtube.chart_size == 0 || config.youtube.chart_size > 50 {
        anyhow::bail!("youtube.chart_size must be in 1..=50");
    }

    if config.youtube.search_size == 0 || config.youtube.search_size > 50 {
        anyhow::bail!("youtube.search_size must be in 1..=50");
    }

    if config.cache.trends_ttl_minutes < 1 {
        anyhow::bail!("cache.trends_ttl_minutes must be >= 1");
    }

    if config.cache.keyword_ttl_hours < 1 {
        anyhow::bail!("cache.keyword_ttl_hours must be >= 1");
    }

    if config.retention.purge_after_days < 1 {
        anyhow::bail!("retention.purge_after_days must be >= 1");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config: Config = toml::from_str(
            r#"
            [db]
            path = "./data/vibescope.sqlite"

            [server]
            bind = "127.0.0.1:8080"
            "#,
        )
        .unwrap();

        assert_eq!(config.youtube.chart_size, 10);
        assert_eq!(config.youtube.search_size, 50);
        assert_eq!(config.cache.trends_ttl_minutes, 30);
        assert_eq!(config.cache.keyword_ttl_hours, 6);
        assert_eq!(config.retention.purge_after_days, 90);
        assert_eq!(config.model.model, "gemini-2.0-flash");
    }
}
