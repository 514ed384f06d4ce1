//! Casino rules supplied by the operator.
//!
//! Every payout rate and timeout the engines use lives here so operators can tune the house
//! without code changes. Missing keys fall back to the [`defaults`] functions.

use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

use crate::execution::UserId;
use crate::BPS_DENOMINATOR;

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be at most 10000 basis points: {value}")]
    InvalidBps { field: &'static str, value: u16 },
    #[error("{field} must be non-zero")]
    InvalidNonZero { field: &'static str },
    #[error("{field} is out of range: {value} (expected {min}..={max})")]
    OutOfRange {
        field: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },
    #[error("max_bet ({max}) is below min_bet ({min})")]
    BetLimits { min: u64, max: u64 },
}

/// Profit paid per unit staked, e.g. 3:2 for a natural.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ratio {
    pub numerator: u64,
    pub denominator: u64,
}

impl Ratio {
    pub const fn new(numerator: u64, denominator: u64) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Profit on `stake`, rounded down.
    pub fn profit(&self, stake: u64) -> u64 {
        if self.denominator == 0 {
            return 0;
        }
        ((stake as u128) * (self.numerator as u128) / (self.denominator as u128)) as u64
    }
}

/// How an acceptor's stake is matched against the opener's.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StakeMatching {
    /// The acceptor must stake exactly what the opener staked.
    #[default]
    Equal,
    /// Both sides play for the smaller stake and the excess is refunded.
    Proportional,
}

/// Total-return multipliers per roulette bet family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoulettePayouts {
    #[serde(default = "defaults::straight")]
    pub straight: u64,
    #[serde(default = "defaults::even_money")]
    pub color: u64,
    #[serde(default = "defaults::even_money")]
    pub parity: u64,
    #[serde(default = "defaults::even_money")]
    pub range: u64,
    #[serde(default = "defaults::green")]
    pub green: u64,
    #[serde(default = "defaults::dozen")]
    pub dozen: u64,
}

impl Default for RoulettePayouts {
    fn default() -> Self {
        Self {
            straight: defaults::straight(),
            color: defaults::even_money(),
            parity: defaults::even_money(),
            range: defaults::even_money(),
            green: defaults::green(),
            dozen: defaults::dozen(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouletteConfig {
    /// American wheel (0 and 00) when set, European otherwise.
    #[serde(default = "defaults::double_zero")]
    pub double_zero: bool,
    #[serde(default)]
    pub payouts: RoulettePayouts,
}

impl Default for RouletteConfig {
    fn default() -> Self {
        Self {
            double_zero: defaults::double_zero(),
            payouts: RoulettePayouts::default(),
        }
    }
}

impl RouletteConfig {
    pub fn pockets(&self) -> u8 {
        if self.double_zero {
            38
        } else {
            37
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CasinoConfig {
    #[serde(default = "defaults::house_cut_bps")]
    pub house_cut_bps: u16,
    #[serde(default)]
    pub stake_matching: StakeMatching,
    #[serde(default = "defaults::natural_pays")]
    pub blackjack_natural_pays: Ratio,
    #[serde(default = "defaults::win_pays")]
    pub blackjack_win_pays: Ratio,
    #[serde(default = "defaults::dealer_stands_on")]
    pub dealer_stands_on: u8,
    #[serde(default)]
    pub roulette: RouletteConfig,
    #[serde(default = "defaults::prediction_edge_bps")]
    pub prediction_edge_bps: u16,
    #[serde(default = "defaults::pvp_timeout_secs")]
    pub pvp_timeout_secs: u64,
    #[serde(default = "defaults::blackjack_timeout_secs")]
    pub blackjack_timeout_secs: u64,
    #[serde(default = "defaults::min_bet")]
    pub min_bet: u64,
    #[serde(default)]
    pub max_bet: Option<u64>,
    #[serde(default = "defaults::bonus_rate_bps")]
    pub bonus_rate_bps: u16,
    #[serde(default = "defaults::referral_rate_bps")]
    pub referral_rate_bps: u16,
    #[serde(default = "defaults::min_withdrawal")]
    pub min_withdrawal: u64,
    #[serde(default = "defaults::initial_house_balance")]
    pub initial_house_balance: i64,
    #[serde(default)]
    pub admins: Vec<UserId>,
}

impl Default for CasinoConfig {
    fn default() -> Self {
        Self {
            house_cut_bps: defaults::house_cut_bps(),
            stake_matching: StakeMatching::default(),
            blackjack_natural_pays: defaults::natural_pays(),
            blackjack_win_pays: defaults::win_pays(),
            dealer_stands_on: defaults::dealer_stands_on(),
            roulette: RouletteConfig::default(),
            prediction_edge_bps: defaults::prediction_edge_bps(),
            pvp_timeout_secs: defaults::pvp_timeout_secs(),
            blackjack_timeout_secs: defaults::blackjack_timeout_secs(),
            min_bet: defaults::min_bet(),
            max_bet: None,
            bonus_rate_bps: defaults::bonus_rate_bps(),
            referral_rate_bps: defaults::referral_rate_bps(),
            min_withdrawal: defaults::min_withdrawal(),
            initial_house_balance: defaults::initial_house_balance(),
            admins: Vec::new(),
        }
    }
}

impl CasinoConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_bps("house_cut_bps", self.house_cut_bps)?;
        ensure_bps("prediction_edge_bps", self.prediction_edge_bps)?;
        ensure_bps("bonus_rate_bps", self.bonus_rate_bps)?;
        ensure_bps("referral_rate_bps", self.referral_rate_bps)?;
        ensure_nonzero("blackjack_natural_pays.denominator", self.blackjack_natural_pays.denominator)?;
        ensure_nonzero("blackjack_win_pays.denominator", self.blackjack_win_pays.denominator)?;
        ensure_range("dealer_stands_on", self.dealer_stands_on as u64, 12, 21)?;

        let payouts = &self.roulette.payouts;
        for (field, value) in [
            ("roulette.payouts.straight", payouts.straight),
            ("roulette.payouts.color", payouts.color),
            ("roulette.payouts.parity", payouts.parity),
            ("roulette.payouts.range", payouts.range),
            ("roulette.payouts.green", payouts.green),
            ("roulette.payouts.dozen", payouts.dozen),
        ] {
            ensure_nonzero(field, value)?;
        }

        ensure_nonzero("pvp_timeout_secs", self.pvp_timeout_secs)?;
        ensure_nonzero("blackjack_timeout_secs", self.blackjack_timeout_secs)?;
        ensure_nonzero("min_bet", self.min_bet)?;
        if let Some(max) = self.max_bet {
            if max < self.min_bet {
                return Err(ConfigError::BetLimits {
                    min: self.min_bet,
                    max,
                });
            }
        }
        Ok(())
    }

    pub fn is_admin(&self, user: UserId) -> bool {
        self.admins.contains(&user)
    }
}

fn ensure_bps(field: &'static str, value: u16) -> Result<(), ConfigError> {
    if value as u64 > BPS_DENOMINATOR {
        return Err(ConfigError::InvalidBps { field, value });
    }
    Ok(())
}

fn ensure_nonzero(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidNonZero { field });
    }
    Ok(())
}

fn ensure_range(field: &'static str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

pub mod defaults {
    use super::Ratio;

    pub const fn house_cut_bps() -> u16 {
        250
    }

    pub const fn natural_pays() -> Ratio {
        Ratio::new(3, 2)
    }

    pub const fn win_pays() -> Ratio {
        Ratio::new(1, 1)
    }

    pub const fn dealer_stands_on() -> u8 {
        17
    }

    pub const fn double_zero() -> bool {
        true
    }

    pub const fn straight() -> u64 {
        36
    }

    pub const fn even_money() -> u64 {
        2
    }

    pub const fn green() -> u64 {
        14
    }

    pub const fn dozen() -> u64 {
        3
    }

    pub const fn prediction_edge_bps() -> u16 {
        250
    }

    pub const fn pvp_timeout_secs() -> u64 {
        300
    }

    pub const fn blackjack_timeout_secs() -> u64 {
        900
    }

    pub const fn min_bet() -> u64 {
        10
    }

    pub const fn bonus_rate_bps() -> u16 {
        100
    }

    pub const fn referral_rate_bps() -> u16 {
        50
    }

    pub const fn min_withdrawal() -> u64 {
        1_000
    }

    pub const fn initial_house_balance() -> i64 {
        1_000_000
    }
}
