//! Generate command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::palm::PalmClient;
use anyhow::Result;

/// Run the generate command.
pub async fn run_generate(prompt: &str, model: Option<&str>, settings: &Settings) -> Result<()> {
    let client = PalmClient::from_settings(settings)?;

    let spinner = Output::spinner("Waiting for PaLM...");
    let result = client.generate(prompt, model).await;
    spinner.finish_and_clear();

    match result {
        Ok(Some(text)) => println!("{}", text),
        Ok(None) => Output::warning("PaLM returned no candidates (the output may have been filtered)."),
        Err(e) => {
            Output::error(&format!("Generation failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
