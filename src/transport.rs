use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use std::time::{Duration, Instant};

#[cfg(test)]
use mockall::automock;

use crate::error::{Result, TarotError};
use crate::models::{ChatMessage, ChatRequest, ChatResponse, Choice};

/// Submit one chat completion to a language-model provider
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse>;
}

/// OpenAI chat-completions transport. Built once at startup and shared.
pub struct OpenAiTransport {
    client: Client<OpenAIConfig>,
}

impl OpenAiTransport {
    pub fn new(api_key: &str, project_id: &str, api_base: Option<&str>) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(TarotError::Config("OPENAI_API_KEY is required".to_string()));
        }
        if project_id.trim().is_empty() {
            return Err(TarotError::Config("PROJECT_ID is required".to_string()));
        }

        let mut config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_project_id(project_id);
        if let Some(base) = api_base {
            config = config.with_api_base(base.trim_end_matches('/'));
        }

        // A zero elapsed-time budget turns the client's rate-limit retries off.
        let no_retry = ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(Duration::ZERO))
            .build();

        Ok(Self {
            client: Client::with_config(config).with_backoff(no_retry),
        })
    }
}

fn to_openai_message(msg: &ChatMessage) -> Result<ChatCompletionRequestMessage> {
    let message = match msg.role.as_str() {
        "system" => ChatCompletionRequestSystemMessageArgs::default()
            .content(msg.content.as_str())
            .build()?
            .into(),
        _ => ChatCompletionRequestUserMessageArgs::default()
            .content(msg.content.as_str())
            .build()?
            .into(),
    };
    Ok(message)
}

#[async_trait]
impl Transport for OpenAiTransport {
    #[allow(deprecated)]
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse> {
        let messages = req
            .messages
            .iter()
            .map(to_openai_message)
            .collect::<Result<Vec<_>>>()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(req.model.as_str())
            .messages(messages)
            .temperature(req.temperature)
            .max_tokens(req.max_tokens)
            .build()?;

        let start_time = Instant::now();
        let response = self.client.chat().create(request).await?;
        tracing::debug!(
            model = %req.model,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            choices = response.choices.len(),
            "OpenAI chat completion returned"
        );

        let choices = response
            .choices
            .into_iter()
            .map(|choice| Choice {
                message: ChatMessage {
                    role: "assistant".to_string(),
                    content: choice.message.content.unwrap_or_default(),
                },
            })
            .collect();

        Ok(ChatResponse { choices })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_api_key() {
        let err = OpenAiTransport::new("", "proj", None).err().unwrap();
        assert!(matches!(err, TarotError::Config(ref m) if m.contains("OPENAI_API_KEY")));
    }

    #[test]
    fn test_new_requires_project_id() {
        let err = OpenAiTransport::new("sk-test", "  ", None).err().unwrap();
        assert!(matches!(err, TarotError::Config(ref m) if m.contains("PROJECT_ID")));
    }

    #[test]
    fn test_messages_map_by_role() {
        let system = to_openai_message(&ChatMessage::system("rules")).unwrap();
        let user = to_openai_message(&ChatMessage::user("question")).unwrap();
        assert!(matches!(system, ChatCompletionRequestMessage::System(_)));
        assert!(matches!(user, ChatCompletionRequestMessage::User(_)));

        // Only system and user messages are ever sent; anything else goes as user text.
        let other = ChatMessage {
            role: "assistant".to_string(),
            content: "earlier reply".to_string(),
        };
        let other = to_openai_message(&other).unwrap();
        assert!(matches!(other, ChatCompletionRequestMessage::User(_)));
    }
}
