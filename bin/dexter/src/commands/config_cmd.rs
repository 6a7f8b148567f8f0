use dexter_core::{Config, Paths};

pub async fn show() -> anyhow::Result<()> {
    let paths = Paths::new();
    let mut config = Config::load_or_default(&paths)?;
    // Never print the key itself.
    if !config.llm.api_key.is_empty() {
        config.llm.api_key = "<set>".to_string();
    }
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

pub async fn path() -> anyhow::Result<()> {
    println!("{}", Paths::new().config_file().display());
    Ok(())
}
