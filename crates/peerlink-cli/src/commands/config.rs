//! Config command implementation.

use std::path::Path;

use anyhow::{Context, Result};

use peerlink_core::config::Config;

use super::{ConfigAction, ConfigArgs};

/// Run the config command.
pub fn run(args: ConfigArgs, config_path: Option<&Path>) -> Result<()> {
    let path = config_path.map_or_else(Config::config_path, Path::to_path_buf);

    match args.action {
        ConfigAction::Show => {
            let config = super::load_config(Some(&path))?;
            print!("{}", render(&config)?);
        }
        ConfigAction::Path => {
            println!("{}", path.display());
        }
        ConfigAction::Reset => {
            Config::default().save_to(&path)?;
            println!("Configuration reset to defaults: {}", path.display());
        }
    }

    Ok(())
}

fn render(config: &Config) -> Result<String> {
    toml::to_string_pretty(config).context("failed to render configuration")
}
