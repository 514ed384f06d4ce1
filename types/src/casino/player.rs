use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

use super::{HIGH_ROLLER_WAGERED, HOT_STREAK_WINS, MAX_NAME_LENGTH};
use crate::execution::UserId;

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum UserInvariantError {
    #[error("user name too long (len={len}, max={max})")]
    NameTooLong { len: usize, max: usize },
    #[error("best streak below current streak (best={best}, current={current})")]
    StreakOutOfOrder { best: u32, current: u32 },
    #[error("games won exceeds games played (won={won}, played={played})")]
    WinsExceedGames { won: u64, played: u64 },
}

/// Milestones unlocked by play.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Achievement {
    FirstWin = 1 << 0,
    HighRoller = 1 << 1,
    HotStreak = 1 << 2,
    Natural = 1 << 3,
    Jackpot = 1 << 4,
}

impl Achievement {
    pub const ALL: [Achievement; 5] = [
        Achievement::FirstWin,
        Achievement::HighRoller,
        Achievement::HotStreak,
        Achievement::Natural,
        Achievement::Jackpot,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Achievement::FirstWin => "First Win",
            Achievement::HighRoller => "High Roller",
            Achievement::HotStreak => "Hot Streak",
            Achievement::Natural => "Natural",
            Achievement::Jackpot => "Jackpot",
        }
    }
}

/// Bit set of unlocked achievements.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Achievements(u32);

impl Achievements {
    pub fn contains(&self, achievement: Achievement) -> bool {
        self.0 & achievement as u32 != 0
    }

    /// Returns true if the achievement was newly unlocked.
    pub fn insert(&mut self, achievement: Achievement) -> bool {
        let fresh = !self.contains(achievement);
        self.0 |= achievement as u32;
        fresh
    }

    pub fn iter(&self) -> impl Iterator<Item = Achievement> + '_ {
        Achievement::ALL
            .into_iter()
            .filter(move |achievement| self.contains(*achievement))
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// A chat participant and their running wagering stats.
///
/// Created on first interaction and never deleted. `balance` is only ever reduced through a
/// checked debit, so it cannot underflow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    #[serde(default)]
    pub handle: Option<String>,
    pub balance: u64,
    pub total_wagered: u64,
    pub wagered_since_withdrawal: u64,
    pub total_pnl: i64,
    pub games_played: u64,
    pub games_won: u64,
    pub win_streak: u32,
    pub best_win_streak: u32,
    #[serde(default)]
    pub referred_by: Option<UserId>,
    pub referral_count: u32,
    pub referral_earnings: u64,
    pub unclaimed_referral: u64,
    #[serde(default)]
    pub achievements: Achievements,
    pub created_at: u64,
}

impl User {
    pub fn new(id: UserId, name: &str, created_at: u64) -> Self {
        Self {
            id,
            name: truncate_name(name),
            handle: None,
            balance: 0,
            total_wagered: 0,
            wagered_since_withdrawal: 0,
            total_pnl: 0,
            games_played: 0,
            games_won: 0,
            win_streak: 0,
            best_win_streak: 0,
            referred_by: None,
            referral_count: 0,
            referral_earnings: 0,
            unclaimed_referral: 0,
            achievements: Achievements::default(),
            created_at,
        }
    }

    /// Record a settled round and return any achievements it unlocked.
    ///
    /// `returned` is everything credited back to the user for the round (stake included).
    pub fn record_round(&mut self, stake: u64, returned: u64) -> Vec<Achievement> {
        let mut unlocked = Vec::new();
        self.games_played = self.games_played.saturating_add(1);
        self.total_wagered = self.total_wagered.saturating_add(stake);
        self.wagered_since_withdrawal = self.wagered_since_withdrawal.saturating_add(stake);
        let pnl = returned as i128 - stake as i128;
        self.total_pnl = (self.total_pnl as i128 + pnl).clamp(i64::MIN as i128, i64::MAX as i128)
            as i64;

        if pnl > 0 {
            self.games_won = self.games_won.saturating_add(1);
            self.win_streak = self.win_streak.saturating_add(1);
            self.best_win_streak = self.best_win_streak.max(self.win_streak);
            if self.achievements.insert(Achievement::FirstWin) {
                unlocked.push(Achievement::FirstWin);
            }
            if self.win_streak >= HOT_STREAK_WINS && self.achievements.insert(Achievement::HotStreak)
            {
                unlocked.push(Achievement::HotStreak);
            }
        } else if pnl < 0 {
            self.win_streak = 0;
        }

        if self.total_wagered >= HIGH_ROLLER_WAGERED
            && self.achievements.insert(Achievement::HighRoller)
        {
            unlocked.push(Achievement::HighRoller);
        }
        unlocked
    }

    pub fn win_rate_bps(&self) -> u64 {
        if self.games_played == 0 {
            return 0;
        }
        self.games_won.saturating_mul(10_000) / self.games_played
    }

    pub fn validate_invariants(&self) -> Result<(), UserInvariantError> {
        if self.name.len() > MAX_NAME_LENGTH {
            return Err(UserInvariantError::NameTooLong {
                len: self.name.len(),
                max: MAX_NAME_LENGTH,
            });
        }
        if self.best_win_streak < self.win_streak {
            return Err(UserInvariantError::StreakOutOfOrder {
                best: self.best_win_streak,
                current: self.win_streak,
            });
        }
        if self.games_won > self.games_played {
            return Err(UserInvariantError::WinsExceedGames {
                won: self.games_won,
                played: self.games_played,
            });
        }
        Ok(())
    }
}

/// Clamp a display name to the stored maximum on a char boundary.
pub fn truncate_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.len() <= MAX_NAME_LENGTH {
        return trimmed.to_string();
    }
    let mut end = MAX_NAME_LENGTH;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    trimmed[..end].to_string()
}
