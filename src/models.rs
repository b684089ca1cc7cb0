use serde::{Deserialize, Serialize};
use std::fmt;

/// Tarot card category
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Arcana {
    Major,
    Minor,
}

/// A card as supplied by the caller. The service does not own a deck.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Card {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suit: Option<String>,
    pub arcana: Arcana,
    #[serde(default)]
    pub description: String,
}

/// Temporal role of a card, assigned by its index in the request
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Past,
    Present,
    Future,
}

impl Position {
    pub const ALL: [Position; 3] = [Position::Past, Position::Present, Position::Future];

    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Past => "past",
            Position::Present => "present",
            Position::Future => "future",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request body as it arrives over HTTP, before validation
#[derive(Debug, Deserialize, Default)]
pub struct RawReadingRequest {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default, rename = "selectedCards")]
    pub selected_cards: Option<Vec<Card>>,
}

/// A validated reading request: non-empty question and exactly three cards
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ReadingRequest {
    pub question: String,
    #[serde(rename = "selectedCards")]
    pub selected_cards: [Card; 3],
}

impl ReadingRequest {
    /// Cards paired with their fixed positions, in request order.
    pub fn positioned_cards(&self) -> impl Iterator<Item = (Position, &Card)> {
        Position::ALL.into_iter().zip(self.selected_cards.iter())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CardReading {
    pub name: String,
    pub position: Position,
    pub meaning: String,
}

/// Shape requested from the model and always returned to the caller
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ReadingResponse {
    pub reading: String,
    pub interpretation: String,
    pub advice: String,
    pub cards: [CardReading; 3],
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub timestamp: String,
}

// Chat completion message format
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

// Chat completion request format
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

// Chat completion response format
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ChatResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Choice {
    pub message: ChatMessage,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_card_deserializes_without_suit() {
        let card: Card = serde_json::from_value(json!({
            "id": 0,
            "name": "The Fool",
            "arcana": "major",
            "description": "New beginnings"
        }))
        .unwrap();
        assert_eq!(card.suit, None);
        assert_eq!(card.arcana, Arcana::Major);
    }

    #[test]
    fn test_card_rejects_unknown_arcana() {
        let res: Result<Card, _> = serde_json::from_value(json!({
            "id": 0,
            "name": "The Fool",
            "arcana": "middle",
            "description": "x"
        }));
        assert!(res.is_err());
    }

    #[test]
    fn test_raw_request_reads_camel_case_cards() {
        let raw: RawReadingRequest = serde_json::from_value(json!({
            "question": "Will I find love?",
            "selectedCards": []
        }))
        .unwrap();
        assert_eq!(raw.question.as_deref(), Some("Will I find love?"));
        assert_eq!(raw.selected_cards.map(|c| c.len()), Some(0));
    }

    #[test]
    fn test_reading_response_requires_three_cards() {
        let two = json!({
            "reading": "r",
            "interpretation": "i",
            "advice": "a",
            "cards": [
                {"name": "A", "position": "past", "meaning": "m"},
                {"name": "B", "position": "present", "meaning": "m"}
            ]
        });
        assert!(serde_json::from_value::<ReadingResponse>(two).is_err());
    }

    #[test]
    fn test_position_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Position::Future).unwrap(), json!("future"));
        assert_eq!(Position::Present.to_string(), "present");
    }
}
