//! Storage keys, instructions and events exchanged with the execution layer.

use serde::{Deserialize, Serialize};

use crate::casino::{
    Achievement, BlackjackHand, CoinSide, GameRecord, GlobalState, Leaderboard,
    LeaderboardEntry, PendingTip, PredictGame, PvpDraw, PvpGame, PvpSession, RouletteBet, Stake,
    Transaction, User, UserHistory, Withdrawal,
};

/// Telegram user id.
pub type UserId = i64;
/// Telegram chat id.
pub type ChatId = i64;

/// The user an instruction acts on behalf of, and where it came from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user: UserId,
    pub name: String,
    pub handle: Option<String>,
    pub chat: ChatId,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Key {
    User(UserId),
    /// Lowercased Telegram handle without the `@`.
    Handle(String),
    UserHistory(UserId),
    Blackjack(UserId),
    Transaction(u64),
    Game(u64),
    Withdrawal(u64),
    GlobalState,
    Leaderboard,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::large_enum_variant)]
pub enum Value {
    User(User),
    Handle(UserId),
    UserHistory(UserHistory),
    Blackjack(BlackjackHand),
    Transaction(Transaction),
    Game(GameRecord),
    Withdrawal(Withdrawal),
    GlobalState(GlobalState),
    Leaderboard(Leaderboard),
}

/// Every state change the bot can request. One instruction executes as one atomic unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    Register { referrer: Option<UserId> },
    Balance,
    Stats,
    History,
    Leaderboard { page: usize },
    HouseBalance,
    Referral,

    // Moves act on the user's open hand. A `hand` id limits them to that hand.
    BlackjackDeal { stake: Stake },
    BlackjackHit { hand: Option<u64> },
    BlackjackStand { hand: Option<u64> },
    BlackjackDouble { hand: Option<u64> },
    BlackjackSurrender { hand: Option<u64> },

    Roulette { stake: Stake, bet: RouletteBet },
    Predict { stake: Stake, game: PredictGame, picks: Vec<u8> },

    PvpOpen { game: PvpGame, stake: Stake, call: Option<CoinSide> },
    /// `session` pins the accept to one challenge; without it the chat's open challenge is taken.
    PvpAccept { session: Option<u64>, stake: Option<Stake> },
    PvpCancel,

    ClaimBonus,
    ClaimReferral,
    /// Stage a tip. It moves nothing until the sender confirms it.
    TipRequest { recipient: UserId, amount: u64 },
    TipConfirm { id: u64 },
    TipCancel { id: u64 },
    Withdraw { amount: Stake, address: String },

    AdminDeposit { target: UserId, amount: u64 },
    AdminAdjust { target: UserId, amount: i64 },
    AdminSetBalance { target: UserId, balance: u64 },
    AdminPendingWithdrawals,
    AdminResolveWithdrawal { id: u64, approve: bool },
    AdminSaveSticker { key: String, file_id: String },
    AdminSetPvpTimeout { secs: u64 },
}

impl Instruction {
    pub fn is_admin(&self) -> bool {
        matches!(
            self,
            Instruction::AdminDeposit { .. }
                | Instruction::AdminAdjust { .. }
                | Instruction::AdminSetBalance { .. }
                | Instruction::AdminPendingWithdrawals
                | Instruction::AdminResolveWithdrawal { .. }
                | Instruction::AdminSaveSticker { .. }
                | Instruction::AdminSetPvpTimeout { .. }
        )
    }
}

/// Results reported back to the chat.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::large_enum_variant)]
pub enum Event {
    Welcome {
        user: User,
        new: bool,
        referrer: Option<String>,
    },
    Balance {
        user: User,
    },
    Stats {
        user: User,
        rank: Option<u32>,
    },
    History {
        user: User,
        games: Vec<GameRecord>,
        transactions: Vec<Transaction>,
    },
    Leaderboard {
        page: usize,
        pages: usize,
        entries: Vec<LeaderboardEntry>,
    },
    HouseBalance {
        balance: i64,
    },
    Referral {
        user: User,
    },

    /// Snapshot after every blackjack action. `payout` is set once the hand settles.
    Blackjack {
        hand: BlackjackHand,
        payout: Option<u64>,
        balance: u64,
    },
    BlackjackForfeited {
        hand: BlackjackHand,
    },
    Roulette {
        bet: RouletteBet,
        stake: u64,
        pocket: u8,
        payout: u64,
        balance: u64,
        sticker: Option<String>,
    },
    Predict {
        game: PredictGame,
        picks: Vec<u8>,
        stake: u64,
        roll: u8,
        payout: u64,
        balance: u64,
    },

    PvpOpened {
        session: PvpSession,
        expires_at: u64,
    },
    PvpResolved {
        session: PvpSession,
        acceptor: UserId,
        acceptor_name: String,
        matched: u64,
        draw: PvpDraw,
        winner: Option<UserId>,
        payout: u64,
        house_cut: u64,
        refunded: u64,
        /// Win then loss sticker, whichever are configured. Empty on a tie.
        stickers: Vec<String>,
    },
    PvpCancelled {
        session: PvpSession,
    },
    PvpExpired {
        session: PvpSession,
    },

    BonusClaimed {
        amount: u64,
        balance: u64,
    },
    ReferralClaimed {
        amount: u64,
        balance: u64,
    },
    TipRequested {
        tip: PendingTip,
    },
    TipCancelled {
        tip: PendingTip,
    },
    Tipped {
        from: UserId,
        from_name: String,
        to: UserId,
        to_name: String,
        amount: u64,
    },
    WithdrawalRequested {
        withdrawal: Withdrawal,
        balance: u64,
    },
    WithdrawalResolved {
        withdrawal: Withdrawal,
    },
    PendingWithdrawals {
        withdrawals: Vec<Withdrawal>,
    },
    DepositCredited {
        user: User,
        amount: u64,
    },
    BalanceAdjusted {
        user: User,
        delta: i64,
    },
    StickerSaved {
        key: String,
    },
    PvpTimeoutSet {
        secs: u64,
    },
    AchievementUnlocked {
        user: UserId,
        name: String,
        achievement: Achievement,
    },
}
