//! Player-vs-player resolution.
//!
//! Both players' stakes form the pot. A single draw decides the winner, who takes the pot less
//! the house cut. Roll games tie on equal rolls, refunding both sides with no cut.

use super::GameRng;
use antaria_types::apply_bps;
use antaria_types::casino::{CoinSide, PvpDraw, PvpGame, StakeMatching};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Winner {
    Opener,
    Acceptor,
    Tie,
}

/// How the acceptor's offer lines up with the opener's stake.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Matched {
    /// Stake each side plays for.
    pub amount: u64,
    /// Excess returned to the opener.
    pub opener_refund: u64,
    /// Amount the acceptor actually pays.
    pub acceptor_stake: u64,
}

/// Apply the configured matching rule. `None` means the offer is not acceptable.
pub fn match_stakes(rule: StakeMatching, opener: u64, offered: u64) -> Option<Matched> {
    if offered == 0 {
        return None;
    }
    match rule {
        StakeMatching::Equal => (offered == opener).then_some(Matched {
            amount: opener,
            opener_refund: 0,
            acceptor_stake: opener,
        }),
        StakeMatching::Proportional => {
            let amount = opener.min(offered);
            Some(Matched {
                amount,
                opener_refund: opener - amount,
                acceptor_stake: amount,
            })
        }
    }
}

/// Draw the round.
pub fn draw(game: PvpGame, call: Option<CoinSide>, rng: &mut GameRng) -> PvpDraw {
    match game.max_roll() {
        Some(max) => PvpDraw::Rolls {
            opener: rng.roll(max),
            acceptor: rng.roll(max),
        },
        None => PvpDraw::Flip {
            call: call.unwrap_or(CoinSide::Heads),
            result: rng.flip_coin(),
        },
    }
}

pub fn winner(draw: &PvpDraw) -> Winner {
    match *draw {
        PvpDraw::Rolls { opener, acceptor } if opener > acceptor => Winner::Opener,
        PvpDraw::Rolls { opener, acceptor } if opener < acceptor => Winner::Acceptor,
        PvpDraw::Rolls { .. } => Winner::Tie,
        PvpDraw::Flip { call, result } if call == result => Winner::Opener,
        PvpDraw::Flip { .. } => Winner::Acceptor,
    }
}

/// Split a pot into the winner's net payout and the house cut.
pub fn split_pot(pot: u64, house_cut_bps: u16) -> (u64, u64) {
    let cut = apply_bps(pot, house_cut_bps);
    (pot - cut, cut)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_matching() {
        assert_eq!(
            match_stakes(StakeMatching::Equal, 100, 100),
            Some(Matched {
                amount: 100,
                opener_refund: 0,
                acceptor_stake: 100
            })
        );
        assert_eq!(match_stakes(StakeMatching::Equal, 100, 99), None);
        assert_eq!(match_stakes(StakeMatching::Equal, 100, 0), None);
    }

    #[test]
    fn test_proportional_matching() {
        assert_eq!(
            match_stakes(StakeMatching::Proportional, 100, 40),
            Some(Matched {
                amount: 40,
                opener_refund: 60,
                acceptor_stake: 40
            })
        );
        assert_eq!(
            match_stakes(StakeMatching::Proportional, 100, 250),
            Some(Matched {
                amount: 100,
                opener_refund: 0,
                acceptor_stake: 100
            })
        );
    }

    #[test]
    fn test_winner() {
        assert_eq!(
            winner(&PvpDraw::Rolls {
                opener: 6,
                acceptor: 2
            }),
            Winner::Opener
        );
        assert_eq!(
            winner(&PvpDraw::Rolls {
                opener: 1,
                acceptor: 5
            }),
            Winner::Acceptor
        );
        assert_eq!(
            winner(&PvpDraw::Rolls {
                opener: 3,
                acceptor: 3
            }),
            Winner::Tie
        );
        assert_eq!(
            winner(&PvpDraw::Flip {
                call: CoinSide::Tails,
                result: CoinSide::Tails
            }),
            Winner::Opener
        );
        assert_eq!(
            winner(&PvpDraw::Flip {
                call: CoinSide::Tails,
                result: CoinSide::Heads
            }),
            Winner::Acceptor
        );
    }

    #[test]
    fn test_split_pot() {
        // 2.5% of a 200 pot leaves 195 for the winner.
        assert_eq!(split_pot(200, 250), (195, 5));
        assert_eq!(split_pot(39, 250), (39, 0));
        assert_eq!(split_pot(200, 0), (200, 0));
    }

    #[test]
    fn test_draw_respects_roll_range() {
        let mut rng = GameRng::from_seed(5);
        for _ in 0..500 {
            match draw(PvpGame::Basketball, None, &mut rng) {
                PvpDraw::Rolls { opener, acceptor } => {
                    assert!((1..=5).contains(&opener));
                    assert!((1..=5).contains(&acceptor));
                }
                other => panic!("unexpected draw {other:?}"),
            }
        }
        match draw(PvpGame::CoinFlip, Some(CoinSide::Tails), &mut rng) {
            PvpDraw::Flip { call, .. } => assert_eq!(call, CoinSide::Tails),
            other => panic!("unexpected draw {other:?}"),
        }
    }
}
