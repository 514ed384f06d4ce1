//! Prediction games against the house.
//!
//! The player picks one or more outcomes of a single fair draw. A hit returns
//! `stake * outcomes / picks * (1 - edge)`, so every pick count carries the same house edge.
//! With the default 2.5% edge a coin call returns 1.95x and a single die face 5.85x.

use super::{GameError, GameResult, GameRng};
use antaria_types::casino::PredictGame;
use antaria_types::BPS_DENOMINATOR;

/// Check picks are in range, distinct, and leave at least one losing outcome.
///
/// Dice faces are 1-6; coin sides are 0 (heads) and 1 (tails).
pub fn validate_picks(game: PredictGame, picks: &[u8]) -> Result<(), GameError> {
    let outcomes = game.outcomes();
    if picks.is_empty() || picks.len() >= outcomes as usize {
        return Err(GameError::InvalidPayload);
    }
    let (low, high) = range(game);
    let mut seen = [false; 8];
    for &pick in picks {
        if pick < low || pick > high || seen[pick as usize] {
            return Err(GameError::InvalidPayload);
        }
        seen[pick as usize] = true;
    }
    Ok(())
}

fn range(game: PredictGame) -> (u8, u8) {
    match game {
        PredictGame::Dice => (1, game.outcomes()),
        PredictGame::Coin => (0, 1),
    }
}

/// Total return on a hit, rounded down.
pub fn payout(game: PredictGame, picks: usize, stake: u64, edge_bps: u16) -> u64 {
    if picks == 0 {
        return 0;
    }
    let keep = BPS_DENOMINATOR.saturating_sub(edge_bps as u64) as u128;
    let numerator = stake as u128 * game.outcomes() as u128 * keep;
    let denominator = picks as u128 * BPS_DENOMINATOR as u128;
    (numerator / denominator).min(u64::MAX as u128) as u64
}

/// Draw once and settle.
pub fn play(
    game: PredictGame,
    picks: &[u8],
    stake: u64,
    edge_bps: u16,
    rng: &mut GameRng,
) -> Result<(u8, GameResult), GameError> {
    validate_picks(game, picks)?;
    let roll = match game {
        PredictGame::Dice => rng.roll(game.outcomes()),
        PredictGame::Coin => rng.flip_coin().index(),
    };
    let result = if picks.contains(&roll) {
        GameResult::Win(payout(game, picks.len(), stake, edge_bps))
    } else {
        GameResult::Loss
    };
    Ok((roll, result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payout_multipliers() {
        assert_eq!(payout(PredictGame::Coin, 1, 100, 250), 195);
        assert_eq!(payout(PredictGame::Dice, 1, 100, 250), 585);
        assert_eq!(payout(PredictGame::Dice, 3, 100, 250), 195);
        assert_eq!(payout(PredictGame::Dice, 5, 100, 0), 120);
        assert_eq!(payout(PredictGame::Dice, 0, 100, 0), 0);
    }

    #[test]
    fn test_validate_picks() {
        assert!(validate_picks(PredictGame::Dice, &[1, 6]).is_ok());
        assert!(validate_picks(PredictGame::Coin, &[1]).is_ok());
        assert_eq!(
            validate_picks(PredictGame::Dice, &[]),
            Err(GameError::InvalidPayload)
        );
        assert_eq!(
            validate_picks(PredictGame::Dice, &[0]),
            Err(GameError::InvalidPayload)
        );
        assert_eq!(
            validate_picks(PredictGame::Dice, &[7]),
            Err(GameError::InvalidPayload)
        );
        assert_eq!(
            validate_picks(PredictGame::Dice, &[2, 2]),
            Err(GameError::InvalidPayload)
        );
        // Picking every face is a guaranteed win.
        assert_eq!(
            validate_picks(PredictGame::Dice, &[1, 2, 3, 4, 5, 6]),
            Err(GameError::InvalidPayload)
        );
        assert_eq!(
            validate_picks(PredictGame::Coin, &[0, 1]),
            Err(GameError::InvalidPayload)
        );
    }

    #[test]
    fn test_play_pays_only_on_hit() {
        let mut rng = GameRng::from_seed(11);
        for _ in 0..200 {
            let (roll, result) = play(PredictGame::Dice, &[2, 4], 100, 250, &mut rng).unwrap();
            assert!((1..=6).contains(&roll));
            if roll == 2 || roll == 4 {
                assert_eq!(result, GameResult::Win(292));
            } else {
                assert_eq!(result, GameResult::Loss);
            }
        }
    }

    #[test]
    fn test_seeded_coin_flips_track_edge() {
        let mut rng = GameRng::from_seed(99);
        let mut returned = 0u64;
        let rounds = 10_000u64;
        for _ in 0..rounds {
            let (_, result) = play(PredictGame::Coin, &[0], 100, 250, &mut rng).unwrap();
            returned += result.total_return(100);
        }
        let ratio = returned as f64 / (100 * rounds) as f64;
        assert!((ratio - 0.975).abs() < 0.05, "coin return {ratio}");
    }
}
