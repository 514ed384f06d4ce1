use serde::{Deserialize, Serialize};

use super::{CoinSide, PvpGame};
use crate::execution::{ChatId, UserId};

/// Blackjack hand lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlackjackStage {
    #[default]
    Betting,
    PlayerTurn,
    DealerTurn,
    Settled,
}

/// How a blackjack hand ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandOutcome {
    PlayerNatural,
    DealerNatural,
    BothNatural,
    PlayerBust,
    DealerBust,
    PlayerHigher,
    DealerHigher,
    Push,
    Surrender,
    Forfeit,
}

impl HandOutcome {
    pub fn describe(self) -> &'static str {
        match self {
            HandOutcome::PlayerNatural => "Blackjack!",
            HandOutcome::DealerNatural => "Dealer blackjack",
            HandOutcome::BothNatural => "Both blackjack, push",
            HandOutcome::PlayerBust => "Bust",
            HandOutcome::DealerBust => "Dealer busts",
            HandOutcome::PlayerHigher => "You win",
            HandOutcome::DealerHigher => "Dealer wins",
            HandOutcome::Push => "Push",
            HandOutcome::Surrender => "Surrendered",
            HandOutcome::Forfeit => "Forfeited (idle)",
        }
    }
}

/// An open blackjack hand. Persisted between button presses, one per user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlackjackHand {
    /// Unique per hand, so buttons from a finished hand cannot act on the next one.
    #[serde(default)]
    pub id: u64,
    pub user: UserId,
    pub chat: ChatId,
    /// Total stake at risk, doubled included.
    pub stake: u64,
    pub doubled: bool,
    pub player: Vec<u8>,
    pub dealer: Vec<u8>,
    /// Undealt cards; the next card is popped from the end.
    pub deck: Vec<u8>,
    pub stage: BlackjackStage,
    #[serde(default)]
    pub outcome: Option<HandOutcome>,
    pub started_at: u64,
    pub updated_at: u64,
}

impl BlackjackHand {
    pub fn new(id: u64, user: UserId, chat: ChatId, stake: u64, deck: Vec<u8>, now: u64) -> Self {
        Self {
            id,
            user,
            chat,
            stake,
            doubled: false,
            player: Vec::new(),
            dealer: Vec::new(),
            deck,
            stage: BlackjackStage::Betting,
            outcome: None,
            started_at: now,
            updated_at: now,
        }
    }

    pub fn is_stale(&self, now: u64, timeout_secs: u64) -> bool {
        now.saturating_sub(self.updated_at) >= timeout_secs
    }
}

/// An open PvP challenge occupying its chat's single session slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PvpSession {
    pub id: u64,
    pub chat: ChatId,
    pub opener: UserId,
    pub opener_name: String,
    pub game: PvpGame,
    pub stake: u64,
    /// Opener's call for coin flips.
    #[serde(default)]
    pub call: Option<CoinSide>,
    pub opened_at: u64,
}

impl PvpSession {
    pub fn expires_at(&self, timeout_secs: u64) -> u64 {
        self.opened_at.saturating_add(timeout_secs)
    }

    pub fn is_expired(&self, now: u64, timeout_secs: u64) -> bool {
        now >= self.expires_at(timeout_secs)
    }
}

/// A tip the sender has asked for but not yet confirmed. No money moves until it is confirmed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTip {
    pub id: u64,
    pub chat: ChatId,
    pub from: UserId,
    pub to: UserId,
    pub to_name: String,
    pub amount: u64,
    pub created_at: u64,
}

impl PendingTip {
    pub fn is_expired(&self, now: u64, timeout_secs: u64) -> bool {
        now >= self.created_at.saturating_add(timeout_secs)
    }
}
