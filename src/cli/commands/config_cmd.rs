//! Configuration commands.

use contract_analyzer::config::Config;

/// Print the effective configuration as TOML with the API key redacted.
pub fn cmd_config_show(config: &Config) -> anyhow::Result<()> {
    match config.source_path {
        Some(ref path) => println!("# Loaded from {}", path.display()),
        None => println!("# No config file found; showing defaults and environment"),
    }
    print!("{}", config.redacted().to_toml()?);
    Ok(())
}
