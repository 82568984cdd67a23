use std::env;
use std::sync::Arc;

use anyhow::Context;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_openai::{config::OpenAIConfig, Client as AsyncOpenAiClient};
use async_trait::async_trait;
use tracing::instrument;

use crate::chat::prompt::{ChatMessage, Role};

pub type SharedLlmClient = Arc<dyn LlmClient>;

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send the assembled message sequence and return the first reply's
    /// text. One attempt per call; the caller decides what a failure means.
    async fn complete(&self, messages: &[ChatMessage]) -> anyhow::Result<String>;
}

/// Offline stand-in that answers without a completion backend.
#[derive(Debug, Default, Clone)]
pub struct EchoLlmClient;

#[async_trait]
impl LlmClient for EchoLlmClient {
    async fn complete(&self, messages: &[ChatMessage]) -> anyhow::Result<String> {
        let question = messages
            .iter()
            .rev()
            .find(|message| message.role == Role::User)
            .map(|message| message.content.as_str())
            .unwrap_or_default();

        Ok(format!(
            "[offline assistant]\nI received: {question}\nSet OPENAI_API_KEY to get grounded answers."
        ))
    }
}

impl EchoLlmClient {
    pub fn shared() -> SharedLlmClient {
        Arc::new(Self)
    }
}

/// OpenAI-compatible completion gateway; works against OpenAI or any
/// HTTP-compatible backend via a base-url override.
pub struct OpenAiLlmClient {
    client: AsyncOpenAiClient<OpenAIConfig>,
    model: String,
}

impl OpenAiLlmClient {
    const DEFAULT_MODEL: &'static str = "gpt-4o-mini";
    const MODEL_VARS: [&'static str; 2] = ["ALUMNI_LLM_MODEL", "CHATBOT_MODEL"];

    pub fn shared_from_env() -> anyhow::Result<SharedLlmClient> {
        let client = Self::from_env()?;
        Ok(Arc::new(client))
    }

    fn from_env() -> anyhow::Result<Self> {
        let config = Self::build_config_from_env()?;
        let model = Self::MODEL_VARS
            .iter()
            .find_map(|key| env::var(key).ok())
            .unwrap_or_else(|| Self::DEFAULT_MODEL.to_string());

        Ok(Self {
            client: AsyncOpenAiClient::with_config(config),
            model,
        })
    }

    fn build_config_from_env() -> anyhow::Result<OpenAIConfig> {
        let api_key = env::var("OPENAI_API_KEY")
            .or_else(|_| env::var("ALUMNI_OPENAI_API_KEY"))
            .context("Set OPENAI_API_KEY (or ALUMNI_OPENAI_API_KEY) to use the completion service")?;

        let mut config = OpenAIConfig::new().with_api_key(api_key);

        if let Ok(base_url) =
            env::var("OPENAI_BASE_URL").or_else(|_| env::var("ALUMNI_OPENAI_BASE_URL"))
        {
            config = config.with_api_base(base_url);
        }

        Ok(config)
    }

    #[instrument(level = "debug", skip_all)]
    async fn chat(&self, messages: &[ChatMessage]) -> anyhow::Result<String> {
        let mut request_messages: Vec<ChatCompletionRequestMessage> =
            Vec::with_capacity(messages.len());
        for message in messages {
            let entry = match message.role {
                Role::System => ChatCompletionRequestSystemMessageArgs::default()
                    .content(message.content.as_str())
                    .build()?
                    .into(),
                Role::User => ChatCompletionRequestUserMessageArgs::default()
                    .content(message.content.as_str())
                    .build()?
                    .into(),
            };
            request_messages.push(entry);
        }

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(request_messages)
            .build()?;

        let response = self.client.chat().create(request).await?;
        let choice = response
            .choices
            .first()
            .context("Completion response did not contain any choices")?;

        Ok(choice.message.content.clone().unwrap_or_default())
    }
}

#[async_trait]
impl LlmClient for OpenAiLlmClient {
    async fn complete(&self, messages: &[ChatMessage]) -> anyhow::Result<String> {
        self.chat(messages).await
    }
}

/// Attempt to build the completion gateway, optionally falling back to the
/// echo client.
pub fn build_llm_client_from_env(default_to_echo: bool) -> anyhow::Result<SharedLlmClient> {
    match OpenAiLlmClient::shared_from_env() {
        Ok(client) => Ok(client),
        Err(err) if default_to_echo => {
            tracing::warn!(?err, "Falling back to EchoLlmClient");
            Ok(EchoLlmClient::shared())
        }
        Err(err) => Err(err),
    }
}
