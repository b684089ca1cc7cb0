use crate::models::{Card, Position, ReadingRequest};

/// System instruction sent with every reading
pub const SYSTEM_INSTRUCTION: &str =
    "You are a professional tarot reader. Always respond with valid JSON format as requested.";

const PREAMBLE: &str = "You are a professional tarot reader with deep knowledge of tarot symbolism and interpretation.";

const INSTRUCTIONS: &str = r#"Please provide a comprehensive tarot reading that includes:

1. A general reading that connects all three cards and addresses the question
2. A detailed interpretation of how the cards relate to each other
3. Practical advice based on the reading
4. Individual meanings for each card in their specific positions (past, present, future)

Format your response as a JSON object with the following structure:
{
  "reading": "General reading text",
  "interpretation": "Detailed interpretation text",
  "advice": "Practical advice text",
  "cards": [
    {
      "name": "Card name",
      "position": "past|present|future",
      "meaning": "Specific meaning for this position"
    }
  ]
}

Make the reading insightful, compassionate, and practical while maintaining the mystical nature of tarot."#;

/// `<position>: <name>( (<suit>))? - <description>`
pub fn card_line(position: Position, card: &Card) -> String {
    match &card.suit {
        Some(suit) => format!(
            "{position}: {} ({suit}) - {}",
            card.name, card.description
        ),
        None => format!("{position}: {} - {}", card.name, card.description),
    }
}

/// Build the user prompt for a validated request. Pure: same request, same text.
pub fn build_prompt(request: &ReadingRequest) -> String {
    let cards = request
        .positioned_cards()
        .map(|(position, card)| card_line(position, card))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{PREAMBLE}\n\nQuestion: \"{}\"\n\nSelected cards and their positions:\n{cards}\n\n{INSTRUCTIONS}",
        request.question
    )
}
