//! Embedding retrieval for OpenAI and PaLM.
//!
//! Each provider implements [`Embedder`] for a single text. [`BatchEmbedder`]
//! fans a list of texts out over a bounded number of concurrent requests and
//! returns one row per input, in input order.

mod batch;
mod openai;
mod palm;

pub use batch::BatchEmbedder;

use crate::error::{Provider, Result};
use async_trait::async_trait;

/// Single-text embedding call against one provider.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Fetch the embedding of one text with one request. Retrying is the caller's job.
    async fn embed(&self, text: &str, model: &str) -> Result<Vec<f32>>;

    /// The provider behind this embedder, used to type final errors.
    fn provider(&self) -> Provider;
}
