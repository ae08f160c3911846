//! Flashcards produced by the generation service.
//!
//! The service replies with free text that should contain JSON, frequently
//! wrapped in Markdown code fences. [`parse_generated_cards`] strips the
//! fences and decodes the card list.

use serde::{Deserialize, Serialize};

/// A single front/back pair returned by the generation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedCard {
    pub front: String,
    pub back: String,
}

/// Errors from decoding a generation response.
#[derive(Debug, thiserror::Error)]
pub enum CardParseError {
    #[error("generation response is not valid card JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("generation response contained no cards")]
    Empty,
}

/// Accepted response shapes: `{"cards": [...]}` or a bare array.
#[derive(Deserialize)]
#[serde(untagged)]
enum CardsEnvelope {
    Wrapped { cards: Vec<GeneratedCard> },
    Bare(Vec<GeneratedCard>),
}

/// Remove an enclosing Markdown code fence (```` ``` ```` or ```` ```json ````)
/// and surrounding whitespace.
pub fn strip_code_fence(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```") {
        // Drop the info string (`json`, `JSON`, ...) up to the first newline.
        text = match rest.find('\n') {
            Some(newline) if rest[..newline].chars().all(|c| c.is_ascii_alphanumeric()) => {
                &rest[newline + 1..]
            }
            _ => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
        };
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Decode the raw generation text into cards.
///
/// An empty list is an error: nothing would be persisted and the file would
/// still be marked processed, preventing the user from retrying.
pub fn parse_generated_cards(raw: &str) -> Result<Vec<GeneratedCard>, CardParseError> {
    let cards = match serde_json::from_str::<CardsEnvelope>(strip_code_fence(raw))? {
        CardsEnvelope::Wrapped { cards } | CardsEnvelope::Bare(cards) => cards,
    };
    if cards.is_empty() {
        return Err(CardParseError::Empty);
    }
    Ok(cards)
}
