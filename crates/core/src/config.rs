use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{Error, Result};
use crate::paths::Paths;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.0
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    /// Global cap on tool calls across all tasks in one run.
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
    /// Cap on tool calls per visit to a single task.
    #[serde(default = "default_max_steps_per_task")]
    pub max_steps_per_task: u32,
    #[serde(default = "default_llm_max_attempts")]
    pub llm_max_attempts: u32,
    #[serde(default = "default_llm_retry_delay_ms")]
    pub llm_retry_delay_ms: u64,
}

fn default_max_steps() -> u32 {
    20
}

fn default_max_steps_per_task() -> u32 {
    5
}

fn default_llm_max_attempts() -> u32 {
    3
}

fn default_llm_retry_delay_ms() -> u64 {
    500
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            max_steps_per_task: default_max_steps_per_task(),
            llm_max_attempts: default_llm_max_attempts(),
            llm_retry_delay_ms: default_llm_retry_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_cache_max_size")]
    pub max_size: usize,
    /// TTLs in seconds, per data category.
    #[serde(default = "default_ttl_realtime")]
    pub ttl_realtime: u64,
    #[serde(default = "default_ttl_financial")]
    pub ttl_financial: u64,
    #[serde(default = "default_ttl_historical")]
    pub ttl_historical: u64,
    #[serde(default = "default_ttl_analysis")]
    pub ttl_analysis: u64,
}

fn default_true() -> bool {
    true
}

fn default_cache_max_size() -> usize {
    1000
}

fn default_ttl_realtime() -> u64 {
    300
}

fn default_ttl_financial() -> u64 {
    3600
}

fn default_ttl_historical() -> u64 {
    86_400
}

fn default_ttl_analysis() -> u64 {
    86_400
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size: default_cache_max_size(),
            ttl_realtime: default_ttl_realtime(),
            ttl_financial: default_ttl_financial(),
            ttl_historical: default_ttl_historical(),
            ttl_analysis: default_ttl_analysis(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataConfig {
    /// Preferred realtime source for A-shares ("tencent" or "eastmoney").
    #[serde(default = "default_preferred_source")]
    pub preferred_source: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Last-resort prices used when every quote source fails.
    #[serde(default = "default_typical_prices")]
    pub typical_prices: HashMap<String, f64>,
    #[serde(default = "default_typical_price")]
    pub default_typical_price: f64,
}

fn default_preferred_source() -> String {
    "tencent".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_typical_prices() -> HashMap<String, f64> {
    let mut prices = HashMap::new();
    prices.insert("600519.SH".to_string(), 1600.0);
    prices.insert("000001.SZ".to_string(), 12.0);
    prices.insert("600036.SH".to_string(), 35.0);
    prices
}

fn default_typical_price() -> f64 {
    10.0
}

impl DataConfig {
    pub fn typical_price(&self, symbol: &str) -> f64 {
        self.typical_prices
            .get(symbol)
            .copied()
            .unwrap_or(self.default_typical_price)
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            preferred_source: default_preferred_source(),
            request_timeout_secs: default_request_timeout_secs(),
            typical_prices: default_typical_prices(),
            default_typical_price: default_typical_price(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8642
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = serde_json::from_str(&content)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn load_or_default(paths: &Paths) -> Result<Self> {
        let config_path = paths.config_file();
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            let mut config = Self::default();
            config.apply_env();
            Ok(config)
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Environment variables override the config file for secrets.
    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("DEEPSEEK_API_KEY") {
            if !key.is_empty() {
                self.llm.api_key = key;
            }
        }
        if let Ok(base) = std::env::var("DEEPSEEK_API_BASE") {
            if !base.is_empty() {
                self.llm.api_base = Some(base);
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.agent.max_steps == 0 {
            return Err(Error::Config("agent.maxSteps must be positive".into()));
        }
        if self.agent.max_steps_per_task == 0 {
            return Err(Error::Config(
                "agent.maxStepsPerTask must be positive".into(),
            ));
        }
        if self.cache.max_size == 0 {
            return Err(Error::Config("cache.maxSize must be positive".into()));
        }
        if self.data.request_timeout_secs == 0 {
            return Err(Error::Config(
                "data.requestTimeoutSecs must be positive".into(),
            ));
        }
        match self.data.preferred_source.as_str() {
            "tencent" | "eastmoney" => {}
            other => {
                return Err(Error::Config(format!(
                    "data.preferredSource must be 'tencent' or 'eastmoney', got '{}'",
                    other
                )))
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_budgets() {
        let config = Config::default();
        assert_eq!(config.agent.max_steps, 20);
        assert_eq!(config.agent.max_steps_per_task, 5);
        assert_eq!(config.agent.llm_max_attempts, 3);
    }

    #[test]
    fn test_default_cache_ttls() {
        let config = Config::default();
        assert_eq!(config.cache.ttl_realtime, 300);
        assert_eq!(config.cache.ttl_financial, 3600);
        assert_eq!(config.cache.ttl_analysis, 86_400);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"agent": {"maxSteps": 7}}"#).unwrap();
        assert_eq!(config.agent.max_steps, 7);
        assert_eq!(config.agent.max_steps_per_task, 5);
        assert_eq!(config.cache.max_size, 1000);
    }

    #[test]
    fn test_typical_price_fallback() {
        let config = Config::default();
        assert_eq!(config.data.typical_price("600519.SH"), 1600.0);
        assert_eq!(config.data.typical_price("999999.SZ"), 10.0);
    }

    #[test]
    fn test_invalid_preferred_source_rejected() {
        let mut config = Config::default();
        config.data.preferred_source = "bloomberg".into();
        assert!(config.validate().is_err());
    }
}
