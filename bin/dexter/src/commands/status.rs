use dexter_cache::CacheManager;
use dexter_core::{Config, Paths};
use dexter_datasources::DataSourceManager;

pub async fn run() -> anyhow::Result<()> {
    let paths = Paths::new();

    println!("dexter status");
    println!("=============");
    println!();

    let config_path = paths.config_file();
    let config_exists = config_path.exists();
    println!(
        "Config:    {} {}",
        config_path.display(),
        if config_exists { "✓" } else { "✗ (not found)" }
    );
    println!(
        "Cache DB:  {} {}",
        paths.cache_db().display(),
        if paths.cache_db().exists() { "✓" } else { "✗ (not created yet)" }
    );

    if !config_exists {
        println!();
        println!("Run `dexter onboard` to initialize.");
        return Ok(());
    }

    let config = Config::load(&config_path)?;

    println!();
    println!("Model:     {}", config.llm.model);
    println!(
        "API key:   {}",
        if config.llm.api_key.is_empty() {
            "✗ not set (export DEEPSEEK_API_KEY)"
        } else {
            "✓ configured"
        }
    );
    println!("Budgets:   {} steps total, {} per task", config.agent.max_steps, config.agent.max_steps_per_task);

    println!();
    println!("Data sources:");
    let data = DataSourceManager::new(&config.data);
    let mut names = data.available_sources();
    names.sort();
    for name in names {
        let marker = if name == config.data.preferred_source {
            " (preferred for A-shares)"
        } else {
            ""
        };
        println!("  {}{}", name, marker);
    }

    let cache = CacheManager::new(&config.cache, &paths.cache_db());
    let stats = cache.stats();
    println!();
    println!("Cache:");
    println!("  enabled:        {}", config.cache.enabled);
    println!("  memory entries: {}", stats.memory_entries);
    match stats.disk_entries {
        Some(count) => println!("  disk entries:   {}", count),
        None => println!("  disk entries:   unavailable"),
    }

    Ok(())
}
