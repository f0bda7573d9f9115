//! Embed command implementation.

use crate::cli::{EmbedProvider, Output};
use crate::config::Settings;
use crate::openai::OpenAiClient;
use crate::palm::PalmClient;
use anyhow::{Context, Result};
use tokio::io::AsyncReadExt;

/// Run the embed command.
pub async fn run_embed(
    provider: EmbedProvider,
    input: Option<&str>,
    model: Option<&str>,
    workers: Option<usize>,
    settings: &Settings,
) -> Result<()> {
    let content = match input {
        Some(path) => {
            let path = Settings::expand_path(path);
            tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?
        }
        None => {
            let mut buf = String::new();
            tokio::io::stdin().read_to_string(&mut buf).await?;
            buf
        }
    };

    let texts = parse_lines(&content);
    if texts.is_empty() {
        Output::warning("No input texts.");
        println!("[]");
        return Ok(());
    }

    let rows = match provider {
        EmbedProvider::Openai => {
            OpenAiClient::from_settings(settings)?
                .embed_batch(&texts, model, workers)
                .await
        }
        EmbedProvider::Palm => {
            PalmClient::from_settings(settings)?
                .embed_batch(&texts, model, workers)
                .await
        }
    };

    match rows {
        Ok(rows) => {
            Output::success(&format!(
                "Embedded {} texts ({} dimensions)",
                rows.len(),
                rows.first().map(Vec::len).unwrap_or(0)
            ));
            println!("{}", serde_json::to_string(&rows)?);
        }
        Err(e) => {
            Output::error(&format!("Embedding failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}

/// One text per non-blank line.
fn parse_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}
