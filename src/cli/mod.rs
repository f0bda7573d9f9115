//! CLI module for Lexa.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand, ValueEnum};

/// Lexa - retrying OpenAI and PaLM calls from the command line
#[derive(Parser, Debug)]
#[command(name = "lexa")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Get an OpenAI chat completion for a prompt
    Complete {
        /// The prompt to send
        prompt: String,

        /// Chat model to use
        #[arg(short, long)]
        model: Option<String>,

        /// System message placed before the prompt
        #[arg(short, long)]
        system: Option<String>,
    },

    /// Generate text with PaLM
    Generate {
        /// The prompt to send
        prompt: String,

        /// Text model to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Embed one text per line and print a JSON matrix
    Embed {
        /// Provider to fetch embeddings from
        #[arg(short, long, value_enum, default_value = "openai")]
        provider: EmbedProvider,

        /// Input file with one text per line (stdin if not specified)
        #[arg(short, long)]
        input: Option<String>,

        /// Embedding model to use
        #[arg(short, long)]
        model: Option<String>,

        /// Maximum concurrent requests
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmbedProvider {
    Openai,
    Palm,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Write a default configuration file if none exists
    Init,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_embed() {
        let cli = Cli::parse_from(["lexa", "-vv", "embed", "-p", "palm", "-w", "8"]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Embed {
                provider,
                input,
                workers,
                ..
            } => {
                assert_eq!(provider, EmbedProvider::Palm);
                assert_eq!(input, None);
                assert_eq!(workers, Some(8));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_complete_with_system() {
        let cli = Cli::parse_from(["lexa", "complete", "hello", "-s", "Be brief."]);
        match cli.command {
            Commands::Complete { prompt, system, model } => {
                assert_eq!(prompt, "hello");
                assert_eq!(system.as_deref(), Some("Be brief."));
                assert_eq!(model, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
