//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::Result;
use std::path::PathBuf;

/// Run the config command.
pub fn run_config(action: &ConfigAction, settings: &Settings) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let mut redacted = settings.clone();
            redacted.openai.api_key = redacted.openai.api_key.map(|_| "<redacted>".to_string());
            redacted.palm.api_key = redacted.palm.api_key.map(|_| "<redacted>".to_string());

            let toml_str = toml::to_string_pretty(&redacted)
                .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;
            println!("{}", toml_str);
        }

        ConfigAction::Init => {
            let config_path = Settings::default_config_path();
            if init_config(&config_path)? {
                Output::success(&format!("Created default config at {}", config_path.display()));
            } else {
                Output::warning(&format!("Config already exists at {}", config_path.display()));
            }
        }

        ConfigAction::Path => {
            println!("{}", Settings::default_config_path().display());
        }
    }

    Ok(())
}

/// Write default settings to `path` unless a file is already there.
///
/// Returns whether a file was written. Credentials are never written.
fn init_config(path: &PathBuf) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    Settings::default().save_to(path)?;
    Ok(true)
}
