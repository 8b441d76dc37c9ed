use super::llm::{extract_json_array, CompletionModel};
use crate::error::StudyError;
use crate::models::Flashcard;
use tracing::warn;

const FLASHCARD_TEMPERATURE: f32 = 0.3;
const FLASHCARD_MAX_TOKENS: u32 = 1500;

/// Turns study material into concept/details flashcards. Items the model
/// malforms are dropped rather than failing the batch.
pub async fn generate_flashcards(
    model: &dyn CompletionModel,
    source_text: &str,
) -> Result<Vec<Flashcard>, StudyError> {
    let prompt = format!(
        "Create flashcards from the following study material. Respond with only a JSON array \
         where every item is an object with a \"concept\" field naming the idea and a \
         \"details\" field explaining it.\n\n{source_text}"
    );

    let reply = model
        .complete(&prompt, FLASHCARD_TEMPERATURE, FLASHCARD_MAX_TOKENS)
        .await?;

    parse_flashcards(&reply)
}

fn parse_flashcards(reply: &str) -> Result<Vec<Flashcard>, StudyError> {
    let items = match serde_json::from_str::<Vec<serde_json::Value>>(reply) {
        Ok(items) => items,
        Err(_) => {
            let extracted = extract_json_array(reply).ok_or_else(|| {
                StudyError::MalformedOutput("reply contains no JSON array".to_string())
            })?;

            serde_json::from_str::<Vec<serde_json::Value>>(extracted)
                .map_err(|error| StudyError::MalformedOutput(error.to_string()))?
        }
    };

    let mut cards = Vec::new();
    let mut dropped = 0usize;

    for item in items {
        match serde_json::from_value::<Flashcard>(item) {
            Ok(card) => cards.push(card),
            Err(_) => dropped += 1,
        }
    }

    if dropped > 0 {
        warn!(dropped, kept = cards.len(), "discarded malformed flashcards");
    }

    Ok(cards)
}
