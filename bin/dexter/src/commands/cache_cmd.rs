use dexter_cache::CacheManager;
use dexter_core::{Config, Paths};

fn open_cache() -> anyhow::Result<CacheManager> {
    let paths = Paths::new();
    paths.ensure_dirs()?;
    let config = Config::load_or_default(&paths)?;
    Ok(CacheManager::new(&config.cache, &paths.cache_db()))
}

pub async fn stats() -> anyhow::Result<()> {
    let cache = open_cache()?;
    let stats = cache.stats();
    println!("Cache enabled:  {}", stats.enabled);
    println!("Memory entries: {}", stats.memory_entries);
    match stats.disk_entries {
        Some(count) => println!("Disk entries:   {}", count),
        None => println!("Disk entries:   unavailable"),
    }
    Ok(())
}

pub async fn clear() -> anyhow::Result<()> {
    let cache = open_cache()?;
    cache.clear();
    println!("Cache cleared.");
    Ok(())
}
