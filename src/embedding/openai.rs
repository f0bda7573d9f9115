//! OpenAI embeddings implementation.

use super::{BatchEmbedder, Embedder};
use crate::error::{ApiError, Provider, Result};
use crate::openai::OpenAiClient;
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::instrument;

#[async_trait]
impl Embedder for OpenAiClient {
    #[instrument(skip(self, text), fields(model = %model))]
    async fn embed(&self, text: &str, model: &str) -> Result<Vec<f32>> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(model)
            .input(EmbeddingInput::String(text.to_string()))
            .build()
            .map_err(|e| ApiError::InvalidInput(format!("Failed to build request: {}", e)))?;

        let response = self.client.embeddings().create(request).await?;

        response
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .filter(|embedding| !embedding.is_empty())
            .ok_or_else(|| ApiError::EmptyResponse("OpenAI returned no embedding".to_string()))
    }

    fn provider(&self) -> Provider {
        Provider::OpenAI
    }
}

impl OpenAiClient {
    /// Embed every text concurrently, one row per text in input order.
    ///
    /// `model` and `workers` fall back to the configured embedding model and worker count.
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
