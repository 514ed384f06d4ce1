use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

use super::{PendingTip, PvpSession, HISTORY_GAMES, HISTORY_TRANSACTIONS};
use crate::execution::{ChatId, UserId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit,
    Bet,
    Payout,
    HouseCut,
    Refund,
    Bonus,
    ReferralReward,
    Tip,
    Withdrawal,
    AdminAdjust,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransactionKind::Deposit => "deposit",
            TransactionKind::Bet => "bet",
            TransactionKind::Payout => "payout",
            TransactionKind::HouseCut => "house cut",
            TransactionKind::Refund => "refund",
            TransactionKind::Bonus => "bonus",
            TransactionKind::ReferralReward => "referral",
            TransactionKind::Tip => "tip",
            TransactionKind::Withdrawal => "withdrawal",
            TransactionKind::AdminAdjust => "adjustment",
        };
        f.write_str(label)
    }
}

/// Append-only audit row. Exactly one exists per balance mutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: u64,
    pub user: UserId,
    /// Signed change applied to the user's balance.
    pub amount: i64,
    pub kind: TransactionKind,
    pub description: String,
    pub timestamp: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Rejected,
}

/// A withdrawal request. The amount leaves the balance when requested and is refunded on
/// rejection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdrawal {
    pub id: u64,
    pub user: UserId,
    pub amount: u64,
    pub address: String,
    pub status: WithdrawalStatus,
    pub requested_at: u64,
    #[serde(default)]
    pub resolved_at: Option<u64>,
}

/// Recent activity kept per user for the history view.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserHistory {
    pub games: VecDeque<u64>,
    pub transactions: VecDeque<u64>,
}

impl UserHistory {
    pub fn push_game(&mut self, id: u64) {
        self.games.push_front(id);
        self.games.truncate(HISTORY_GAMES);
    }

    pub fn push_transaction(&mut self, id: u64) {
        self.transactions.push_front(id);
        self.transactions.truncate(HISTORY_TRANSACTIONS);
    }
}

/// Singleton holding house funds, id counters and chat-scoped sessions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalState {
    /// Signed because the operator can run the house below zero.
    pub house_balance: i64,
    pub next_transaction_id: u64,
    pub next_game_id: u64,
    pub next_withdrawal_id: u64,
    pub next_pvp_id: u64,
    #[serde(default = "first_id")]
    pub next_hand_id: u64,
    #[serde(default = "first_id")]
    pub next_tip_id: u64,
    /// At most one open PvP session per chat.
    #[serde(default)]
    pub pvp_sessions: BTreeMap<ChatId, PvpSession>,
    /// Sticker file ids keyed by result name.
    #[serde(default)]
    pub stickers: BTreeMap<String, String>,
    /// Runtime override of the configured PvP timeout.
    #[serde(default)]
    pub pvp_timeout_secs: Option<u64>,
    #[serde(default)]
    pub pending_withdrawals: Vec<u64>,
    /// Users with an open blackjack hand, so stale hands can be swept.
    #[serde(default)]
    pub open_blackjack: BTreeSet<UserId>,
    /// Tips awaiting their sender's confirmation, by tip id.
    #[serde(default)]
    pub pending_tips: BTreeMap<u64, PendingTip>,
}

fn first_id() -> u64 {
    1
}

impl GlobalState {
    pub fn new(house_balance: i64) -> Self {
        Self {
            house_balance,
            next_transaction_id: 1,
            next_game_id: 1,
            next_withdrawal_id: 1,
            next_pvp_id: 1,
            next_hand_id: 1,
            next_tip_id: 1,
            pvp_sessions: BTreeMap::new(),
            stickers: BTreeMap::new(),
            pvp_timeout_secs: None,
            pending_withdrawals: Vec::new(),
            open_blackjack: BTreeSet::new(),
            pending_tips: BTreeMap::new(),
        }
    }

    pub fn pvp_timeout(&self, configured: u64) -> u64 {
        self.pvp_timeout_secs.unwrap_or(configured)
    }

    /// Stakes held by open PvP challenges.
    pub fn escrow(&self) -> u64 {
        self.pvp_sessions.values().map(|session| session.stake).sum()
    }

    pub fn sticker(&self, key: &str) -> Option<&str> {
        self.stickers.get(key).map(String::as_str)
    }
}
