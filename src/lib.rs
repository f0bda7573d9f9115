//! Lexa - retrying OpenAI and PaLM clients
//!
//! One internal interface to two LLM vendors, with randomized exponential
//! backoff around every call and concurrent, order-preserving batch embeddings.
//!
//! # Architecture
//!
//! - `config` - Credentials, default models, and retry budgets
//! - `retry` - Generic retry combinator with randomized exponential backoff
//! - `message` - Chat roles, messages, and conversation assembly
//! - `openai` - OpenAI chat completion client
//! - `palm` - PaLM text generation and embedding client
//! - `embedding` - Single-text `Embedder` trait and the concurrent `BatchEmbedder`
//!
//! # Example
//!
//! ```rust,no_run
//! use lexa::config::Settings;
//! use lexa::openai::OpenAiClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let client = OpenAiClient::from_settings(&settings)?;
//!
//!     let answer = client.complete_chat("Group these animals: otter, heron, trout", None, None).await?;
//!     println!("{}", answer.unwrap_or_default());
//!
//!     let texts = vec!["otter".to_string(), "heron".to_string()];
//!     let rows = client.embed_batch(&texts, None, None).await?;
//!     assert_eq!(rows.len(), texts.len());
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod message;
pub mod openai;
pub mod palm;
pub mod retry;

pub use error::{ApiError, Provider, Result};
