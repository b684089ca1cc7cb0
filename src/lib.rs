pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod models;
pub mod normalizer;
pub mod prompt;
pub mod rate_limit;
pub mod server;
pub mod transport;
pub mod validation;

use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::gateway::ModelGateway;
use crate::models::{RawReadingRequest, ReadingRequest, ReadingResponse};
use crate::transport::{OpenAiTransport, Transport};
use crate::validation::InputValidator;

/// Reading pipeline: validate, build prompt, call the model, normalize.
///
/// Holds no per-request state, so one instance serves every request.
pub struct TarotService {
    validator: InputValidator,
    gateway: ModelGateway,
}

impl TarotService {
    /// Build the service with the OpenAI transport described by `cfg`.
    pub fn new(cfg: &Config) -> Result<Self> {
        let transport = OpenAiTransport::new(
            &cfg.openai.api_key,
            &cfg.openai.project_id,
            cfg.openai.api_base.as_deref(),
        )?;
        Ok(Self::with_transport(
            Arc::new(transport),
            cfg.openai.model.clone(),
        ))
    }

    pub fn with_transport(transport: Arc<dyn Transport>, model: String) -> Self {
        Self {
            validator: InputValidator::new(),
            gateway: ModelGateway::new(transport, model),
        }
    }

    /// Validate a raw body and produce a reading.
    pub async fn generate_reading(&self, raw: RawReadingRequest) -> Result<ReadingResponse> {
        let request = self.validator.validate_reading_request(raw)?;
        self.read(&request).await
    }

    /// Produce a reading for an already validated request.
    pub async fn read(&self, request: &ReadingRequest) -> Result<ReadingResponse> {
        tracing::info!(
            question_len = request.question.len(),
            model = %self.gateway.model(),
            "Generating tarot reading"
        );
        let prompt = prompt::build_prompt(request);
        let raw = self.gateway.complete(&prompt).await?;
        Ok(normalizer::normalize(&raw, &request.selected_cards))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TarotError;
    use crate::models::{Arcana, Card, ChatMessage, ChatRequest, ChatResponse, Choice};
    use crate::transport::MockTransport;

    fn raw_request(count: usize) -> RawReadingRequest {
        RawReadingRequest {
            question: Some("Will I find love?".to_string()),
            selected_cards: Some(
                (0..count as i64)
                    .map(|id| Card {
                        id,
                        name: format!("Card {id}"),
                        suit: None,
                        arcana: Arcana::Major,
                        description: format!("Meaning {id}"),
                    })
                    .collect(),
            ),
        }
    }

    fn reply(content: &str) -> ChatResponse {
        ChatResponse {
            choices: vec![Choice {
                message: ChatMessage {
                    role: "assistant".to_string(),
                    content: content.to_string(),
                },
            }],
        }
    }

    #[tokio::test]
    async fn test_validation_failure_skips_gateway() {
        let mut mock = MockTransport::new();
        mock.expect_chat().never();
        let service = TarotService::with_transport(Arc::new(mock), "gpt-4".to_string());

        let err = service.generate_reading(raw_request(2)).await.unwrap_err();
        assert!(matches!(err, TarotError::Validation(_)));
    }

    #[tokio::test]
    async fn test_prompt_reaches_transport() {
        let mut mock = MockTransport::new();
        mock.expect_chat()
            .withf(|req: &ChatRequest| {
                let prompt = &req.messages[1].content;
                prompt.contains("Will I find love?")
                    && prompt.contains("past: Card 0 - Meaning 0")
                    && prompt.contains("future: Card 2 - Meaning 2")
            })
            .times(1)
            .returning(|_| Ok(reply("Plain prose only.")));
        let service = TarotService::with_transport(Arc::new(mock), "gpt-4".to_string());

        let response = service.generate_reading(raw_request(3)).await.unwrap();
        assert_eq!(response.reading, "Plain prose only.");
        assert_eq!(response.cards[2].meaning, "Meaning 2");
    }

    #[tokio::test]
    async fn test_gateway_failure_short_circuits() {
        let mut mock = MockTransport::new();
        mock.expect_chat()
            .returning(|_| Err(TarotError::Gateway("quota exceeded".to_string())));
        let service = TarotService::with_transport(Arc::new(mock), "gpt-4".to_string());

        let err = service.generate_reading(raw_request(3)).await.unwrap_err();
        assert!(matches!(err, TarotError::Gateway(_)));
    }

    #[test]
    fn test_new_fails_without_credentials() {
        assert!(TarotService::new(&Config::default()).is_err());
    }
}
