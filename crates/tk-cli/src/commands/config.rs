//! Config command implementations

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::output::{print_error, print_info, print_success, print_warning};
use tk_core::config::{self, ConfigFile, DesiredTunnel};

/// Show current configuration
pub fn config_show(config_path: Option<&PathBuf>) -> Result<()> {
    let path = config_path
        .cloned()
        .unwrap_or_else(config::default_config_path);

    if !path.exists() {
        print_warning(&format!("No configuration file found at {:?}", path));
        print_info("Run 'tunnelkit config init' to create one");
        return Ok(());
    }

    print_info(&format!("Configuration file: {:?}", path));
    println!();

    // Parse first so a broken file is reported rather than echoed
    let parsed: ConfigFile = config::load_config(&path)
        .with_context(|| format!("Failed to load config from {:?}", path))?;
    let content = toml::to_string_pretty(&parsed).context("Failed to render configuration")?;

    println!("{}", content);

    Ok(())
}

/// Initialize default configuration
pub fn config_init(config_path: Option<&PathBuf>, force: bool) -> Result<()> {
    let config_file = config_path
        .cloned()
        .unwrap_or_else(config::default_config_path);

    // Check if config already exists
    if config_file.exists() && !force {
        print_error(&format!("Config file already exists: {:?}", config_file));
        print_info("Use --force to overwrite");
        return Ok(());
    }

    let defaults = ConfigFile {
        tunnel: Some(DesiredTunnel::new(5000)),
        ..ConfigFile::default()
    };

    config::save_config(&config_file, &defaults)
        .with_context(|| format!("Failed to write config file: {:?}", config_file))?;

    print_success(&format!("Created configuration file: {:?}", config_file));

    Ok(())
}
