//! services/api/src/adapters/chat_llm.rs
//!
//! This module contains the adapter for the assistant's chat LLM.
//! It implements the `ChatCompletionService` port from the `core` crate against any
//! OpenAI-compatible chat completion endpoint.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use attendance_core::{
    domain::{ChatMessage, ChatRole},
    ports::{ChatCompletionService, PortError, PortResult},
};
use std::future::Future;
use tracing::{info, warn};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ChatCompletionService`, falling back through a list
/// of models until one of them answers.
#[derive(Clone)]
pub struct OpenAiChatAdapter {
    client: Client<OpenAIConfig>,
    models: Vec<String>,
}

impl OpenAiChatAdapter {
    /// Creates a new `OpenAiChatAdapter`.
    pub fn new(client: Client<OpenAIConfig>, models: Vec<String>) -> Self {
        Self { client, models }
    }

    fn build_messages(
        system_prompt: &str,
        messages: &[ChatMessage],
    ) -> PortResult<Vec<ChatCompletionRequestMessage>> {
        let mut request_messages: Vec<ChatCompletionRequestMessage> =
            Vec::with_capacity(messages.len() + 1);
        request_messages.push(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system_prompt)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        );
        for message in messages {
            let built: ChatCompletionRequestMessage = match message.role {
                ChatRole::User => ChatCompletionRequestUserMessageArgs::default()
                    .content(message.content.as_str())
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?
                    .into(),
                ChatRole::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                    .content(message.content.as_str())
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?
                    .into(),
            };
            request_messages.push(built);
        }
        Ok(request_messages)
    }

    async fn complete_with_model(
        &self,
        model: &str,
        messages: Vec<ChatCompletionRequestMessage>,
    ) -> PortResult<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(messages)
            .temperature(0.3)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // Call the API and manually map the error if it occurs, which respects the orphan rule.
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| {
                PortError::Unexpected(format!("Model {} returned no text content", model))
            })
    }
}

/// Runs `attempt` for each model in order and returns the first success. When every
/// model fails, the last error is returned.
pub async fn first_successful_model<F, Fut>(models: &[String], mut attempt: F) -> PortResult<String>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = PortResult<String>>,
{
    let mut last_error = None;
    for model in models {
        match attempt(model.clone()).await {
            Ok(answer) => {
                info!(model = %model, "Chat completion succeeded");
                return Ok(answer);
            }
            Err(e) => {
                warn!(model = %model, error = %e, "Chat completion failed, trying next model");
                last_error = Some(e);
            }
        }
    }
    Err(last_error.unwrap_or_else(|| PortError::Unexpected("No chat models configured".to_string())))
}

//=========================================================================================
// `ChatCompletionService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ChatCompletionService for OpenAiChatAdapter {
    async fn complete(&self, system_prompt: &str, messages: &[ChatMessage]) -> PortResult<String> {
        let request_messages = Self::build_messages(system_prompt, messages)?;
        first_successful_model(&self.models, |model| {
            let request_messages = request_messages.clone();
            async move { self.complete_with_model(&model, request_messages).await }
        })
        .await
    }
}
