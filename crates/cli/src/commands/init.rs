//! `autoclaw init`: write the default configuration.

use autoclaw_config::AppConfig;
use std::path::Path;

use super::CliResult;

pub async fn run(config_path: &Path) -> CliResult {
    if config_path.exists() {
        println!("Config already exists at: {}", config_path.display());
        println!("Edit it manually or delete it and re-run init.");
        return Ok(());
    }

    if let Some(dir) = config_path.parent()
        && !dir.as_os_str().is_empty()
    {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(config_path, AppConfig::default_toml())?;

    println!("Created {}", config_path.display());
    println!("\nNext steps:");
    println!("  1. Add your API key to the file, or export AUTOCLAW_API_KEY");
    println!("  2. Run: autoclaw ask --agent assistant --message \"hello\"");
    Ok(())
}
