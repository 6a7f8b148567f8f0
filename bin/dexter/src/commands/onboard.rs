use dexter_core::{Config, Paths};

pub async fn run(force: bool) -> anyhow::Result<()> {
    let paths = Paths::new();
    paths.ensure_dirs()?;

    let config_path = paths.config_file();
    if config_path.exists() && !force {
        println!("Config already exists at {}", config_path.display());
        println!("Use `dexter onboard --force` to overwrite it.");
        return Ok(());
    }

    let config = Config::default();
    config.save(&config_path)?;

    println!("dexter initialized");
    println!();
    println!("  Config: {}", config_path.display());
    println!("  Cache:  {}", paths.cache_db().display());
    println!();
    println!("Next steps:");
    println!("  1. Set your DeepSeek API key:");
    println!("       export DEEPSEEK_API_KEY=sk-...");
    println!("     or edit llm.apiKey in the config file.");
    println!("  2. Run an analysis:");
    println!("       dexter analyze \"分析600519.SH\"");
    Ok(())
}
