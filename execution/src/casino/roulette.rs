//! Roulette game implementation.
//!
//! One spin per bet; there is no intermediate state. Pockets are 0-36 plus, on the American
//! wheel, [`DOUBLE_ZERO`] for "00". Both zero pockets lose every outside bet.
//!
//! Payouts are total-return multipliers from [`RoulettePayouts`]:
//! - Straight: 36x (35:1)
//! - Red/Black, Odd/Even, Low/High: 2x (1:1)
//! - Green (0 or 00): 14x
//! - Dozen: 3x (2:1)

use super::{GameError, GameResult, GameRng};
use antaria_types::casino::{
    pocket_color, PocketColor, RouletteBet, RouletteConfig, RoulettePayouts, DOUBLE_ZERO,
};

fn is_zero(pocket: u8) -> bool {
    pocket == 0 || pocket == DOUBLE_ZERO
}

/// Draw a pocket from the configured wheel.
pub fn spin(rng: &mut GameRng, wheel: &RouletteConfig) -> u8 {
    let index = rng.spin_roulette(wheel.pockets());
    // Index 37 only exists on the American wheel, where it is "00".
    if index == 37 {
        DOUBLE_ZERO
    } else {
        index
    }
}

/// Check if a bet wins for a given pocket.
pub fn bet_wins(bet: RouletteBet, pocket: u8) -> bool {
    if is_zero(pocket) {
        return match bet {
            RouletteBet::Straight(number) => number == pocket,
            RouletteBet::Green => true,
            _ => false,
        };
    }

    match bet {
        RouletteBet::Straight(number) => number == pocket,
        RouletteBet::Red => pocket_color(pocket) == PocketColor::Red,
        RouletteBet::Black => pocket_color(pocket) == PocketColor::Black,
        RouletteBet::Green => false,
        RouletteBet::Odd => pocket % 2 == 1,
        RouletteBet::Even => pocket % 2 == 0,
        RouletteBet::Low => (1..=18).contains(&pocket),
        RouletteBet::High => (19..=36).contains(&pocket),
        RouletteBet::Dozen(dozen) => (pocket - 1) / 12 + 1 == dozen,
    }
}

/// Total-return multiplier for a winning bet.
pub fn payout_multiplier(bet: RouletteBet, payouts: &RoulettePayouts) -> u64 {
    match bet {
        RouletteBet::Straight(_) => payouts.straight,
        RouletteBet::Red | RouletteBet::Black => payouts.color,
        RouletteBet::Odd | RouletteBet::Even => payouts.parity,
        RouletteBet::Low | RouletteBet::High => payouts.range,
        RouletteBet::Green => payouts.green,
        RouletteBet::Dozen(_) => payouts.dozen,
    }
}

/// Settle a bet against a known pocket. Pure: the same inputs always pay the same.
pub fn settle(bet: RouletteBet, stake: u64, pocket: u8, payouts: &RoulettePayouts) -> GameResult {
    if bet_wins(bet, pocket) {
        GameResult::Win(stake.saturating_mul(payout_multiplier(bet, payouts)))
    } else {
        GameResult::Loss
    }
}

/// Spin once and settle.
pub fn play(
    bet: RouletteBet,
    stake: u64,
    rng: &mut GameRng,
    wheel: &RouletteConfig,
) -> Result<(u8, GameResult), GameError> {
    if !bet.is_valid(wheel.double_zero) {
        return Err(GameError::InvalidPayload);
    }
    let pocket = spin(rng, wheel);
    Ok((pocket, settle(bet, stake, pocket, &wheel.payouts)))
}

/// Expected return per unit staked, e.g. 0.947 for red on an American wheel.
pub fn expected_return(bet: RouletteBet, wheel: &RouletteConfig) -> f64 {
    let pockets: Vec<u8> = if wheel.double_zero {
        (0..=36).chain(std::iter::once(DOUBLE_ZERO)).collect()
    } else {
        (0..=36).collect()
    };
    let winners = pockets.iter().filter(|&&p| bet_wins(bet, p)).count() as f64;
    winners * payout_multiplier(bet, &wheel.payouts) as f64 / pockets.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bet_wins_straight() {
        assert!(bet_wins(RouletteBet::Straight(17), 17));
        assert!(!bet_wins(RouletteBet::Straight(17), 18));
        assert!(bet_wins(RouletteBet::Straight(0), 0));
        assert!(bet_wins(RouletteBet::Straight(DOUBLE_ZERO), DOUBLE_ZERO));
        assert!(!bet_wins(RouletteBet::Straight(0), DOUBLE_ZERO));
    }

    #[test]
    fn test_bet_wins_colors() {
        assert!(bet_wins(RouletteBet::Red, 1));
        assert!(bet_wins(RouletteBet::Black, 2));
        assert!(!bet_wins(RouletteBet::Red, 2));
        assert!(!bet_wins(RouletteBet::Red, 0));
        assert!(!bet_wins(RouletteBet::Black, DOUBLE_ZERO));
        assert!(bet_wins(RouletteBet::Green, 0));
        assert!(bet_wins(RouletteBet::Green, DOUBLE_ZERO));
        assert!(!bet_wins(RouletteBet::Green, 5));
    }

    #[test]
    fn test_zero_loses_parity_and_range() {
        for pocket in [0, DOUBLE_ZERO] {
            for bet in [
                RouletteBet::Odd,
                RouletteBet::Even,
                RouletteBet::Low,
                RouletteBet::High,
                RouletteBet::Dozen(1),
            ] {
                assert!(!bet_wins(bet, pocket), "{bet:?} won on {pocket}");
            }
        }
    }

    #[test]
    fn test_bet_wins_ranges_and_dozens() {
        assert!(bet_wins(RouletteBet::Low, 18));
        assert!(!bet_wins(RouletteBet::Low, 19));
        assert!(bet_wins(RouletteBet::High, 36));
        assert!(bet_wins(RouletteBet::Even, 36));
        assert!(bet_wins(RouletteBet::Odd, 35));
        assert!(bet_wins(RouletteBet::Dozen(1), 12));
        assert!(bet_wins(RouletteBet::Dozen(2), 13));
        assert!(bet_wins(RouletteBet::Dozen(3), 36));
        assert!(!bet_wins(RouletteBet::Dozen(3), 24));
    }

    #[test]
    fn test_settle_is_pure() {
        let payouts = RoulettePayouts::default();
        assert_eq!(settle(RouletteBet::Red, 50, 1, &payouts), GameResult::Win(100));
        assert_eq!(settle(RouletteBet::Red, 50, 2, &payouts), GameResult::Loss);
        assert_eq!(
            settle(RouletteBet::Straight(7), 10, 7, &payouts),
            GameResult::Win(360)
        );
        assert_eq!(settle(RouletteBet::Green, 10, 0, &payouts), GameResult::Win(140));
        assert_eq!(settle(RouletteBet::Dozen(2), 10, 20, &payouts), GameResult::Win(30));
        for _ in 0..3 {
            assert_eq!(settle(RouletteBet::Red, 50, 1, &payouts), GameResult::Win(100));
        }
    }

    #[test]
    fn test_spin_covers_double_zero_only_on_american_wheel() {
        let american = RouletteConfig::default();
        let european = RouletteConfig {
            double_zero: false,
            ..RouletteConfig::default()
        };
        let mut rng = GameRng::from_seed(3);
        let mut saw_double_zero = false;
        for _ in 0..2_000 {
            let pocket = spin(&mut rng, &american);
            assert!(pocket <= 36 || pocket == DOUBLE_ZERO);
            saw_double_zero |= pocket == DOUBLE_ZERO;
            assert!(spin(&mut rng, &european) <= 36);
        }
        assert!(saw_double_zero);
    }

    #[test]
    fn test_invalid_bet_rejected_before_spin() {
        let european = RouletteConfig {
            double_zero: false,
            ..RouletteConfig::default()
        };
        let mut rng = GameRng::from_seed(1);
        let before = rng.clone();
        assert_eq!(
            play(RouletteBet::Straight(DOUBLE_ZERO), 10, &mut rng, &european),
            Err(GameError::InvalidPayload)
        );
        assert_eq!(
            play(RouletteBet::Dozen(4), 10, &mut rng, &RouletteConfig::default()),
            Err(GameError::InvalidPayload)
        );
        // No randomness consumed.
        let mut a = before;
        assert_eq!(a.next_bounded(255), rng.next_bounded(255));
    }

    #[test]
    fn test_expected_returns() {
        let wheel = RouletteConfig::default();
        assert!((expected_return(RouletteBet::Red, &wheel) - 36.0 / 38.0).abs() < 1e-9);
        assert!((expected_return(RouletteBet::Straight(5), &wheel) - 36.0 / 38.0).abs() < 1e-9);
        assert!((expected_return(RouletteBet::Green, &wheel) - 28.0 / 38.0).abs() < 1e-9);
    }

    #[test]
    fn test_seeded_spins_track_house_edge() {
        let wheel = RouletteConfig::default();
        let mut rng = GameRng::from_seed(2024);
        let stake = 100u64;
        let spins = 10_000u64;
        let mut returned = 0u64;
        for _ in 0..spins {
            let (_, result) = play(RouletteBet::Red, stake, &mut rng, &wheel).unwrap();
            returned += result.total_return(stake);
        }
        let ratio = returned as f64 / (stake * spins) as f64;
        let expected = expected_return(RouletteBet::Red, &wheel);
        // Std dev of the ratio is about 0.01 at 10k spins.
        assert!(
            (ratio - expected).abs() < 0.05,
            "empirical return {ratio} vs expected {expected}"
        );
    }
}
