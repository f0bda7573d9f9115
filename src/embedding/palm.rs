//! PaLM embeddings implementation.

use super::{BatchEmbedder, Embedder};
use crate::error::{Provider, Result};
use crate::palm::PalmClient;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
impl Embedder for PalmClient {
    async fn embed(&self, text: &str, model: &str) -> Result<Vec<f32>> {
        self.embed_text(text, model).await
    }

    fn provider(&self) -> Provider {
        Provider::Palm
    }
}

impl PalmClient {
    /// Embed every text concurrently, one row per text in input order.
    pub async fn embed_batch(
        &self,
        texts: &[String],
        model: Option<&str>,
        workers: Option<usize>,
    ) -> Result<Vec<Vec<f32>>> {
        BatchEmbedder::new(Arc::new(self.clone()), workers.unwrap_or(self.max_workers))
            .with_retry(self.embedding_retry)
            .show_progress(self.show_progress)
            .embed_all(texts, model.unwrap_or(&self.embedding_model))
            .await
    }
}
