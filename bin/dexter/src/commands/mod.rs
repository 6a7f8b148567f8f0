pub mod agent_cmd;
pub mod analyze;
pub mod batch_cmd;
pub mod cache_cmd;
pub mod config_cmd;
pub mod gateway;
pub mod onboard;
pub mod status;

use std::sync::Arc;

use dexter_agent::Agent;
use dexter_cache::CacheManager;
use dexter_core::{Config, Paths};
use dexter_datasources::DataSourceManager;
use dexter_providers::DeepSeekProvider;

/// Builds the fully wired agent from on-disk configuration. Shared by every
/// command that runs research.
pub fn build_agent() -> anyhow::Result<Arc<Agent>> {
    let paths = Paths::new();
    paths.ensure_dirs()?;
    let config = Arc::new(Config::load_or_default(&paths)?);

    if config.llm.api_key.is_empty() {
        anyhow::bail!(
            "No API key configured. Set DEEPSEEK_API_KEY or add llm.apiKey to {}",
            paths.config_file().display()
        );
    }

    let provider = Arc::new(DeepSeekProvider::from_config(&config.llm));
    let cache = Arc::new(CacheManager::new(&config.cache, &paths.cache_db()));
    let data = Arc::new(DataSourceManager::new(&config.data));
    Ok(Arc::new(Agent::new(config, provider, cache, data)))
}
