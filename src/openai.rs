//! OpenAI chat completion client.

use crate::config::Settings;
use crate::error::{ApiError, Provider, Result};
use crate::message::{build_conversation, ChatInput, Message, Role, DEFAULT_SYSTEM_MESSAGE};
use crate::retry::RetryPolicy;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequest, CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
};
use async_openai::{config::OpenAIConfig, Client};
use backoff::ExponentialBackoffBuilder;
use std::time::Duration;
use tracing::{error, info, instrument};

/// Output token limit for chat completions.
pub const MAX_COMPLETION_TOKENS: u32 = 2000;

/// Create an OpenAI client with the given credentials and request timeout.
///
/// The client's built-in rate-limit backoff is disabled: each request is a
/// single attempt and [`RetryPolicy`] decides whether to try again.
pub fn create_client(api_key: &str, api_base: &str, timeout: Duration) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder().timeout(timeout).build()?;

    let config = OpenAIConfig::new()
        .with_api_key(api_key)
        .with_api_base(api_base);

    let single_attempt = ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build();

    Ok(Client::with_config(config)
        .with_http_client(http_client)
        .with_backoff(single_attempt))
}

/// OpenAI client with retrying completion and embedding calls.
#[derive(Clone)]
pub struct OpenAiClient {
    pub(crate) client: Client<OpenAIConfig>,
    model: String,
    pub(crate) embedding_model: String,
    retry: RetryPolicy,
    pub(crate) embedding_retry: RetryPolicy,
    pub(crate) max_workers: usize,
    pub(crate) show_progress: bool,
}

impl OpenAiClient {
    /// Build a client from settings. Fails if no API key can be found.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let openai = &settings.openai;
        let api_key = openai.resolve_api_key()?;
        let client = create_client(&api_key, &openai.api_base, openai.request_timeout())?;

        Ok(Self {
            client,
            model: openai.model.clone(),
            embedding_model: openai.embedding_model.clone(),
            retry: settings.completion_retry(),
            embedding_retry: settings.embedding_retry(),
            max_workers: settings.embedding.max_workers,
            show_progress: settings.embedding.show_progress,
        })
    }

    /// Override the retry policy for completion calls.
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

    /// Send a conversation as-is and return the first choice's content.
    ///
    /// Every failed attempt is logged together with the messages that caused it.
    /// Once retries are exhausted the last failure comes back as [`ApiError::OpenAI`].
    #[instrument(skip(self, messages), fields(model = %model, messages = messages.len()))]
    pub async fn complete(&self, messages: &[Message], model: &str) -> Result<Option<String>> {
        let request = chat_request(messages, model)?;

        self.retry
            .run_if(ApiError::is_retryable, |attempt| {
                let request = request.clone();
                async move {
                    match self.client.chat().create(request).await {
                        Ok(response) => Ok(first_content(response)),
                        Err(e) => {
                            error!(attempt, "OpenAI API error: {}", e);
                            info!("Messages: {:?}", messages);
                            Err(ApiError::from(e))
                        }
                    }
                }
            })
            .await
            .map_err(|exhausted| {
                error!(attempts = exhausted.attempts, "OpenAI retries exhausted");
                exhausted.last.into_provider(Provider::OpenAI)
            })
    }

    /// Chat with a system message in front of a prompt or conversation.
    ///
    /// `model` falls back to the configured chat model and `system_message`
    /// to [`DEFAULT_SYSTEM_MESSAGE`].
    pub async fn complete_chat(
        &self,
        input: impl Into<ChatInput>,
        model: Option<&str>,
        system_message: Option<&str>,
    ) -> Result<Option<String>> {
        let messages = build_conversation(input, system_message.unwrap_or(DEFAULT_SYSTEM_MESSAGE));
        self.complete(&messages, model.unwrap_or(&self.model)).await
    }
}

fn chat_request(messages: &[Message], model: &str) -> Result<CreateChatCompletionRequest> {
    if messages.is_empty() {
        return Err(ApiError::InvalidInput("No messages to send".to_string()));
    }

    let messages = messages
        .iter()
        .map(to_request_message)
        .collect::<Result<Vec<_>>>()?;

    CreateChatCompletionRequestArgs::default()
        .model(model)
        .messages(messages)
        .max_tokens(MAX_COMPLETION_TOKENS)
        .temperature(0.0)
        .n(1)
        .build()
        .map_err(|e| ApiError::InvalidInput(e.to_string()))
}

fn to_request_message(message: &Message) -> Result<ChatCompletionRequestMessage> {
    let content = message.content.clone();
    let converted = match message.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(content)
            .build()
            .map_err(|e| ApiError::InvalidInput(e.to_string()))?
            .into(),
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(content)
            .build()
            .map_err(|e| ApiError::InvalidInput(e.to_string()))?
            .into(),
        Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(content)
            .build()
            .map_err(|e| ApiError::InvalidInput(e.to_string()))?
            .into(),
    };
    Ok(converted)
}

fn first_content(response: CreateChatCompletionResponse) -> Option<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
}
