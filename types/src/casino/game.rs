use serde::{Deserialize, Serialize};
use std::fmt;

use super::{DICE_FACES, DOUBLE_ZERO, RED_NUMBERS};
use crate::execution::UserId;

/// Player-vs-player games. Roll games are decided by the higher roll.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PvpGame {
    Dice,
    Darts,
    Basketball,
    Soccer,
    Bowling,
    CoinFlip,
}

impl PvpGame {
    pub const ALL: [PvpGame; 6] = [
        PvpGame::Dice,
        PvpGame::Darts,
        PvpGame::Basketball,
        PvpGame::Soccer,
        PvpGame::Bowling,
        PvpGame::CoinFlip,
    ];

    /// Highest value a single roll can show, or `None` for a coin flip.
    pub fn max_roll(self) -> Option<u8> {
        match self {
            PvpGame::Dice | PvpGame::Darts | PvpGame::Bowling => Some(6),
            PvpGame::Basketball | PvpGame::Soccer => Some(5),
            PvpGame::CoinFlip => None,
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            PvpGame::Dice => "🎲",
            PvpGame::Darts => "🎯",
            PvpGame::Basketball => "🏀",
            PvpGame::Soccer => "⚽",
            PvpGame::Bowling => "🎳",
            PvpGame::CoinFlip => "🪙",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PvpGame::Dice => "dice",
            PvpGame::Darts => "darts",
            PvpGame::Basketball => "basketball",
            PvpGame::Soccer => "soccer",
            PvpGame::Bowling => "bowling",
            PvpGame::CoinFlip => "coinflip",
        }
    }
}

/// Prediction games played against the house.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictGame {
    Dice,
    Coin,
}

impl PredictGame {
    /// Number of equally likely outcomes.
    pub fn outcomes(self) -> u8 {
        match self {
            PredictGame::Dice => DICE_FACES,
            PredictGame::Coin => 2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoinSide {
    Heads,
    Tails,
}

impl CoinSide {
    pub fn opposite(self) -> Self {
        match self {
            CoinSide::Heads => CoinSide::Tails,
            CoinSide::Tails => CoinSide::Heads,
        }
    }

    /// Index used by the prediction engine (heads = 0).
    pub fn index(self) -> u8 {
        match self {
            CoinSide::Heads => 0,
            CoinSide::Tails => 1,
        }
    }

    pub fn from_index(index: u8) -> Self {
        if index == 0 {
            CoinSide::Heads
        } else {
            CoinSide::Tails
        }
    }
}

impl fmt::Display for CoinSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoinSide::Heads => write!(f, "heads"),
            CoinSide::Tails => write!(f, "tails"),
        }
    }
}

/// Roulette bet descriptor. Pockets are 0-36, with [`DOUBLE_ZERO`] standing for "00".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouletteBet {
    Straight(u8),
    Red,
    Black,
    Green,
    Odd,
    Even,
    Low,
    High,
    /// Dozen 1, 2 or 3.
    Dozen(u8),
}

impl RouletteBet {
    pub fn is_valid(&self, double_zero: bool) -> bool {
        match *self {
            RouletteBet::Straight(pocket) => {
                pocket <= 36 || (double_zero && pocket == DOUBLE_ZERO)
            }
            RouletteBet::Dozen(dozen) => (1..=3).contains(&dozen),
            _ => true,
        }
    }
}

impl fmt::Display for RouletteBet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouletteBet::Straight(pocket) => write!(f, "{}", pocket_label(*pocket)),
            RouletteBet::Red => write!(f, "red"),
            RouletteBet::Black => write!(f, "black"),
            RouletteBet::Green => write!(f, "green"),
            RouletteBet::Odd => write!(f, "odd"),
            RouletteBet::Even => write!(f, "even"),
            RouletteBet::Low => write!(f, "1-18"),
            RouletteBet::High => write!(f, "19-36"),
            RouletteBet::Dozen(dozen) => write!(f, "dozen {dozen}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PocketColor {
    Red,
    Black,
    Green,
}

impl fmt::Display for PocketColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PocketColor::Red => write!(f, "red"),
            PocketColor::Black => write!(f, "black"),
            PocketColor::Green => write!(f, "green"),
        }
    }
}

pub fn pocket_color(pocket: u8) -> PocketColor {
    if pocket == 0 || pocket == DOUBLE_ZERO {
        PocketColor::Green
    } else if RED_NUMBERS.contains(&pocket) {
        PocketColor::Red
    } else {
        PocketColor::Black
    }
}

pub fn pocket_label(pocket: u8) -> String {
    if pocket == DOUBLE_ZERO {
        "00".to_string()
    } else {
        pocket.to_string()
    }
}

/// What decided a PvP round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PvpDraw {
    Rolls { opener: u8, acceptor: u8 },
    Flip { call: CoinSide, result: CoinSide },
}

/// Requested stake, resolved against the live balance inside the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stake {
    Amount(u64),
    All,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameType {
    Blackjack,
    Roulette,
    Predict(PredictGame),
    Pvp(PvpGame),
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameType::Blackjack => write!(f, "blackjack"),
            GameType::Roulette => write!(f, "roulette"),
            GameType::Predict(PredictGame::Dice) => write!(f, "dice predict"),
            GameType::Predict(PredictGame::Coin) => write!(f, "coinflip"),
            GameType::Pvp(game) => write!(f, "{} pvp", game.name()),
        }
    }
}

/// Immutable record of a resolved round, written once per participant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: u64,
    pub user: UserId,
    pub game: GameType,
    pub stake: u64,
    /// Human readable outcome, e.g. "17 black" or "21 vs 19".
    pub outcome: String,
    /// Total returned to the user, stake included. Zero on a loss.
    pub payout: u64,
    #[serde(default)]
    pub opponent: Option<UserId>,
    pub timestamp: u64,
}

impl GameRecord {
    pub fn net(&self) -> i64 {
        self.payout as i64 - self.stake as i64
    }
}
