//! Turns raw model text into a [`ReadingResponse`], falling back to a
//! paragraph-based reconstruction when the text is not the expected JSON.

use std::fmt;

use crate::models::{Card, CardReading, Position, ReadingResponse};

pub const FALLBACK_READING: &str = "A mystical reading reveals insights about your question.";
pub const FALLBACK_INTERPRETATION: &str = "The cards speak of transformation and growth.";
pub const FALLBACK_ADVICE: &str = "Trust your intuition and embrace the journey ahead.";
pub const FALLBACK_CARD_MEANING: &str = "This card holds significance for your journey.";

/// Why the strict parse was rejected. Never leaves this module as an error.
#[derive(Debug)]
pub struct ParseFailure(serde_json::Error);

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "model output is not a reading: {}", self.0)
    }
}

/// Strict attempt: the whole text must be a reading with all fields and three cards.
pub fn parse_strict(raw: &str) -> Result<ReadingResponse, ParseFailure> {
    serde_json::from_str(raw).map_err(ParseFailure)
}

/// Build a reading from plain prose.
///
/// Sections are separated by blank lines: first is the reading, second the
/// interpretation, third the advice. Card meanings come from the cards
/// themselves, not from the text.
///
/// Each section and card description is trimmed, so a whitespace-only
/// section or description counts as missing and gets its placeholder.
/// A plain split on blank lines would keep that whitespace verbatim.
pub fn fallback_reading(raw: &str, cards: &[Card; 3]) -> ReadingResponse {
    let text = raw.replace("\r\n", "\n");
    let mut sections = text.split("\n\n").map(str::trim);
    let mut next_or = |placeholder: &str| match sections.next() {
        Some(section) if !section.is_empty() => section.to_string(),
        _ => placeholder.to_string(),
    };

    let reading = next_or(FALLBACK_READING);
    let interpretation = next_or(FALLBACK_INTERPRETATION);
    let advice = next_or(FALLBACK_ADVICE);

    let cards = std::array::from_fn(|i| {
        let card = &cards[i];
        let meaning = if card.description.trim().is_empty() {
            FALLBACK_CARD_MEANING.to_string()
        } else {
            card.description.clone()
        };
        CardReading {
            name: card.name.clone(),
            position: Position::ALL[i],
            meaning,
        }
    });

    ReadingResponse {
        reading,
        interpretation,
        advice,
        cards,
    }
}

/// Parse-or-fallback. Always yields a well-formed reading.
pub fn normalize(raw: &str, cards: &[Card; 3]) -> ReadingResponse {
    match parse_strict(raw) {
        Ok(response) => response,
        Err(failure) => {
            tracing::warn!("{failure}; rebuilding reading from plain text");
            fallback_reading(raw, cards)
        }
    }
}
