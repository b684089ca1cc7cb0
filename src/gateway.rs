use std::sync::Arc;
use std::time::Instant;

use crate::error::{Result, TarotError};
use crate::models::{ChatMessage, ChatRequest};
use crate::prompt::SYSTEM_INSTRUCTION;
use crate::transport::Transport;

pub const DEFAULT_MODEL: &str = "gpt-4";
pub const TEMPERATURE: f32 = 0.7;
pub const MAX_TOKENS: u32 = 2000;

/// Sends a reading prompt to the provider and hands back the raw text.
///
/// One call per reading. Retrying is left to whoever calls the service.
pub struct ModelGateway {
    tx: Arc<dyn Transport>,
    model: String,
}

impl ModelGateway {
    pub fn new(tx: Arc<dyn Transport>, model: String) -> Self {
        Self { tx, model }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_for(&self, prompt: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::system(SYSTEM_INSTRUCTION), ChatMessage::user(prompt)],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        }
    }

    /// Text of the first completion choice. Blank or missing content is an error.
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let request = self.request_for(prompt);
        let start_time = Instant::now();

        let response = self.tx.chat(&request).await.map_err(|e| match e {
            TarotError::Gateway(_) => e,
            other => TarotError::Gateway(other.to_string()),
        })?;

        tracing::info!(
            model = %self.model,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Model gateway call finished"
        );

        match response.choices.into_iter().next() {
            Some(choice) if !choice.message.content.trim().is_empty() => Ok(choice.message.content),
            Some(_) => Err(TarotError::Gateway(
                "No response content received from provider".to_string(),
            )),
            None => Err(TarotError::Gateway(
                "Provider returned empty choices".to_string(),
            )),
        }
    }
}
