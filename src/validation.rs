use crate::error::{Result, TarotError};
use crate::models::{Card, RawReadingRequest, ReadingRequest};

pub const MISSING_FIELDS_MESSAGE: &str =
    "Missing required fields: question and selectedCards are required";
pub const CARD_COUNT_MESSAGE: &str = "Exactly 3 cards must be selected for a tarot reading";

/// Number of cards in a past/present/future spread
pub const SPREAD_SIZE: usize = 3;

/// Checks request shape before any downstream work happens
#[derive(Debug, Default, Clone, Copy)]
pub struct InputValidator;

impl InputValidator {
    pub fn new() -> Self {
        Self
    }

    /// Turn a raw body into a [`ReadingRequest`].
    ///
    /// Missing or blank question and missing `selectedCards` are reported
    /// before the card count is looked at.
    pub fn validate_reading_request(&self, raw: RawReadingRequest) -> Result<ReadingRequest> {
        let question = raw.question.filter(|q| !q.trim().is_empty());
        let (Some(question), Some(cards)) = (question, raw.selected_cards) else {
            return Err(TarotError::Validation(MISSING_FIELDS_MESSAGE.to_string()));
        };

        let selected_cards: [Card; SPREAD_SIZE] = cards.try_into().map_err(|cards: Vec<Card>| {
            tracing::debug!("Rejected spread with {} cards", cards.len());
            TarotError::Validation(CARD_COUNT_MESSAGE.to_string())
        })?;

        Ok(ReadingRequest {
            question,
            selected_cards,
        })
    }
}
