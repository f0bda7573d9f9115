//! Complete command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::openai::OpenAiClient;
use anyhow::Result;

/// Run the complete command.
pub async fn run_complete(
    prompt: &str,
    model: Option<&str>,
    system: Option<&str>,
    settings: &Settings,
) -> Result<()> {
    let client = OpenAiClient::from_settings(settings)?;

    let spinner = Output::spinner("Waiting for OpenAI...");
    let result = client.complete_chat(prompt, model, system).await;
    spinner.finish_and_clear();

    match result {
        Ok(Some(answer)) => println!("{}", answer),
        Ok(None) => Output::warning("OpenAI returned no content."),
        Err(e) => {
            Output::error(&format!("Completion failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
