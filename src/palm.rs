//! PaLM (Generative Language API) client for legacy text generation and embeddings.

use crate::config::Settings;
use crate::error::{ApiError, Provider, Result};
use crate::retry::RetryPolicy;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

/// Output token limit for text generation.
pub const MAX_OUTPUT_TOKENS: u32 = 1024;

/// Longest response body kept in a status error.
const MAX_ERROR_BODY: usize = 512;

/// Content categories the PaLM text API can filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmCategory {
    HarmCategoryDerogatory,
    HarmCategoryToxicity,
    HarmCategorySexual,
    HarmCategoryViolence,
    HarmCategoryDangerous,
    HarmCategoryMedical,
}

impl HarmCategory {
    pub const ALL: [HarmCategory; 6] = [
        HarmCategory::HarmCategoryDerogatory,
        HarmCategory::HarmCategoryToxicity,
        HarmCategory::HarmCategorySexual,
        HarmCategory::HarmCategoryViolence,
        HarmCategory::HarmCategoryDangerous,
        HarmCategory::HarmCategoryMedical,
    ];
}

/// Probability at or above which content is blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmBlockThreshold {
    BlockLowAndAbove,
    BlockMediumAndAbove,
    BlockOnlyHigh,
    BlockNone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: HarmCategory,
    pub threshold: HarmBlockThreshold,
}

/// Every category set to [`HarmBlockThreshold::BlockNone`].
pub fn permissive_safety_settings() -> Vec<SafetySetting> {
    HarmCategory::ALL
        .iter()
        .map(|&category| SafetySetting {
            category,
            threshold: HarmBlockThreshold::BlockNone,
        })
        .collect()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateTextRequest<'a> {
    prompt: TextPrompt<'a>,
    temperature: f32,
    candidate_count: u32,
    max_output_tokens: u32,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize)]
struct TextPrompt<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateTextResponse {
    #[serde(default)]
    candidates: Vec<TextCompletion>,
}

#[derive(Debug, Deserialize)]
struct TextCompletion {
    #[serde(default)]
    output: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbedTextRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedTextResponse {
    embedding: Option<EmbeddingValue>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValue {
    value: Vec<f32>,
}

/// PaLM client with retrying generation and embedding calls.
#[derive(Clone)]
pub struct PalmClient {
    http: Client,
    api_key: String,
    api_base: String,
    model: String,
    pub(crate) embedding_model: String,
    retry: RetryPolicy,
    pub(crate) embedding_retry: RetryPolicy,
    pub(crate) max_workers: usize,
    pub(crate) show_progress: bool,
}

impl PalmClient {
    /// Build a client from settings. Fails if no API key can be found.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let palm = &settings.palm;
        let api_key = palm.resolve_api_key()?;
        let http = Client::builder().timeout(palm.request_timeout()).build()?;

        Ok(Self {
            http,
            api_key,
            api_base: palm.api_base.trim_end_matches('/').to_string(),
            model: palm.model.clone(),
            embedding_model: palm.embedding_model.clone(),
            retry: settings.completion_retry(),
            embedding_retry: settings.embedding_retry(),
            max_workers: settings.embedding.max_workers,
            show_progress: settings.embedding.show_progress,
        })
    }

    /// Override the retry policy for generation calls.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Override the per-item retry policy for batch embeddings.
    pub fn with_embedding_retry(mut self, retry: RetryPolicy) -> Self {
        self.embedding_retry = retry;
        self
    }

    /// Enable or disable the batch embedding progress bar.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Generate text for a prompt with all safety filters disabled.
    ///
    /// Returns `None` when the API produced no candidate, e.g. when output was filtered.
    /// Once retries are exhausted the last failure comes back as [`ApiError::Palm`].
    #[instrument(skip(self, prompt), fields(model = model.unwrap_or(&self.model)))]
    pub async fn generate(&self, prompt: &str, model: Option<&str>) -> Result<Option<String>> {
        let url = self.method_url(model.unwrap_or(&self.model), "generateText");
        let body = GenerateTextRequest {
            prompt: TextPrompt { text: prompt },
            temperature: 0.0,
            candidate_count: 1,
            max_output_tokens: MAX_OUTPUT_TOKENS,
            safety_settings: permissive_safety_settings(),
        };

        self.retry
            .run_if(ApiError::is_retryable, |attempt| {
                let url = &url;
                let body = &body;
                async move {
                    match self.post::<_, GenerateTextResponse>(url, body).await {
                        Ok(response) => Ok(response
                            .candidates
                            .into_iter()
                            .next()
                            .and_then(|c| c.output)),
                        Err(e) => {
                            error!(attempt, "PaLM API error: {}", e);
                            info!("Prompt: {}", prompt);
                            Err(e)
                        }
                    }
                }
            })
            .await
            .map_err(|exhausted| {
                error!(attempts = exhausted.attempts, "PaLM retries exhausted");
                exhausted.last.into_provider(Provider::Palm)
            })
    }

    /// Fetch the embedding of a single text. One attempt, no retry.
    pub async fn embed_text(&self, text: &str, model: &str) -> Result<Vec<f32>> {
        let url = self.method_url(model, "embedText");
        let response: EmbedTextResponse = self.post(&url, &EmbedTextRequest { text }).await?;
        response
            .embedding
            .map(|e| e.value)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::EmptyResponse("PaLM returned no embedding".to_string()))
    }

    fn method_url(&self, model: &str, method: &str) -> String {
        format!("{}/{}:{}", self.api_base, qualify_model(model), method)
    }

    /// POST a JSON body. Transport errors drop the URL, which carries the API key.
    async fn post<B, R>(&self, url: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: serde::de::DeserializeOwned,
    {
        let response = self
            .http
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::Http(e.without_url()))?;

        if !response.status().is_success() {
            return Err(response_to_error(response).await);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Http(e.without_url()))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Model names are resources under `models/`; accept them with or without the prefix.
fn qualify_model(model: &str) -> String {
    if model.starts_with("models/") || model.starts_with("tunedModels/") {
        model.to_string()
    } else {
        format!("models/{}", model)
    }
}

async fn response_to_error(response: Response) -> ApiError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();

    let message = if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated]", &body[..end])
    } else {
        body
    };

    ApiError::Status { status, message }
}
