use std::{sync::Arc, time::Duration};

use async_openai::{
    types::{ChatCompletionRequestUserMessage, CreateChatCompletionRequestArgs},
    Client,
};
use async_trait::async_trait;
use tokio::time::timeout;

use crate::error::AppError;

/// Narrow seam over single-turn text generation.
///
/// Both query translation and answer synthesis go through this trait, so the
/// retrieval pipeline can be exercised without network access.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Sends one stateless prompt to the named model and returns the trimmed
    /// completion text.
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, AppError>;
}

pub struct OpenAiChatModel {
    client: Arc<Client<async_openai::config::OpenAIConfig>>,
    call_timeout: Duration,
}

impl OpenAiChatModel {
    pub fn new(
        client: Arc<Client<async_openai::config::OpenAIConfig>>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            client,
            call_timeout,
        }
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, AppError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages([ChatCompletionRequestUserMessage::from(prompt).into()])
            .build()
            .map_err(|e| AppError::Generation(format!("Failed to build chat request: {e}")))?;

        let response = timeout(self.call_timeout, self.client.chat().create(request))
            .await
            .map_err(|_| AppError::Generation("Chat completion request timed out".into()))?
            .map_err(|e| AppError::Generation(format!("Chat completion failed: {e}")))?;

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_ref())
            .map(|content| content.trim().to_string())
            .ok_or(AppError::Generation(
                "No content found in chat completion response".into(),
            ))
    }
}
