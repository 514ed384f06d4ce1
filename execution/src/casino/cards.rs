//! Shared playing-card helpers.
//!
//! Cards are encoded as `0..=51`, where:
//! - suit = card / 13 (0..=3)
//! - rank = card % 13 (0..=12)
//!
//! Rank 0 is the Ace.

use super::GameError;

/// Total cards in a standard deck.
pub const CARDS_PER_DECK: u8 = 52;

/// Ranks per suit.
pub const RANKS_PER_SUIT: u8 = 13;

const RANK_LABELS: [&str; 13] = [
    "A", "2", "3", "4", "5", "6", "7", "8", "9", "10", "J", "Q", "K",
];
const SUIT_LABELS: [&str; 4] = ["♠", "♥", "♦", "♣"];

/// Returns true if `card` is within `0..CARDS_PER_DECK`.
pub fn is_valid_card(card: u8) -> bool {
    card < CARDS_PER_DECK
}

/// Returns the 0-based rank (0..=12), where 0 is Ace.
pub fn card_rank(card: u8) -> u8 {
    card % RANKS_PER_SUIT
}

/// Returns the suit (0..=3).
pub fn card_suit(card: u8) -> u8 {
    card / RANKS_PER_SUIT
}

/// Blackjack value with the Ace counted as 1; face cards count 10.
pub fn blackjack_value(card: u8) -> u8 {
    let rank = card_rank(card) + 1;
    rank.min(10)
}

pub fn is_ace(card: u8) -> bool {
    card_rank(card) == 0
}

/// Short label such as `A♠` or `10♥`.
pub fn card_label(card: u8) -> String {
    if !is_valid_card(card) {
        return "??".to_string();
    }
    format!(
        "{}{}",
        RANK_LABELS[card_rank(card) as usize],
        SUIT_LABELS[card_suit(card) as usize]
    )
}

/// Take the next card off the top of an already shuffled deck.
pub fn deal(deck: &mut Vec<u8>) -> Result<u8, GameError> {
    let card = deck.pop().ok_or(GameError::DeckExhausted)?;
    if !is_valid_card(card) {
        return Err(GameError::InvalidState);
    }
    Ok(card)
}
