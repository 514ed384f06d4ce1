//! Blackjack game implementation.
//!
//! House rules:
//! - Single 52-card deck, shuffled per hand
//! - Dealer peeks: a natural on either side settles the hand at the deal
//! - Dealer draws until reaching `dealer_stands_on` (17 by default, soft totals included)
//! - Double on the first two cards only (exactly one more card)
//! - Late surrender on the first two cards returns half the stake
//! - No split, no insurance
//!
//! Stages:
//! Betting -> PlayerTurn -> DealerTurn -> Settled
//!
//! The ledger debits the stake before `deal` and the extra stake before `double`; everything here
//! only moves cards and reports the [`GameResult`].

use super::{cards, GameError, GameResult};
use antaria_types::casino::{BlackjackHand, BlackjackStage, CasinoConfig, HandOutcome, Ratio};

const BUST_THRESHOLD: u8 = 21;

/// Payout and dealer rules for a hand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rules {
    pub natural_pays: Ratio,
    pub win_pays: Ratio,
    pub dealer_stands_on: u8,
}

impl Default for Rules {
    fn default() -> Self {
        Self::from_config(&CasinoConfig::default())
    }
}

impl Rules {
    pub fn from_config(config: &CasinoConfig) -> Self {
        Self {
            natural_pays: config.blackjack_natural_pays,
            win_pays: config.blackjack_win_pays,
            dealer_stands_on: config.dealer_stands_on,
        }
    }
}

/// Total of a hand and whether an Ace is still counted as 11.
pub fn hand_value(cards: &[u8]) -> (u8, bool) {
    let mut total: u8 = 0;
    let mut aces = 0u8;
    for &card in cards {
        if cards::is_ace(card) {
            aces += 1;
            total = total.saturating_add(11);
        } else {
            total = total.saturating_add(cards::blackjack_value(card));
        }
    }

    // Drop aces from 11 to 1 while busting
    while total > BUST_THRESHOLD && aces > 0 {
        total -= 10;
        aces -= 1;
    }

    (total, aces > 0)
}

pub fn is_blackjack(cards: &[u8]) -> bool {
    cards.len() == 2 && hand_value(cards).0 == 21
}

/// True while the player may still double or surrender.
pub fn first_action(hand: &BlackjackHand) -> bool {
    hand.stage == BlackjackStage::PlayerTurn && hand.player.len() == 2 && !hand.doubled
}

/// Deal two cards each and settle immediately on a natural.
pub fn deal(hand: &mut BlackjackHand, rules: &Rules) -> Result<GameResult, GameError> {
    if hand.stage != BlackjackStage::Betting {
        return Err(GameError::InvalidMove);
    }
    if hand.deck.len() < 4 {
        return Err(GameError::DeckExhausted);
    }

    hand.player.push(cards::deal(&mut hand.deck)?);
    hand.dealer.push(cards::deal(&mut hand.deck)?);
    hand.player.push(cards::deal(&mut hand.deck)?);
    hand.dealer.push(cards::deal(&mut hand.deck)?);

    let player_natural = is_blackjack(&hand.player);
    let dealer_natural = is_blackjack(&hand.dealer);
    match (player_natural, dealer_natural) {
        (true, true) => Ok(settle(hand, HandOutcome::BothNatural, GameResult::Push)),
        (true, false) => {
            let total = hand.stake.saturating_add(rules.natural_pays.profit(hand.stake));
            Ok(settle(hand, HandOutcome::PlayerNatural, GameResult::Win(total)))
        }
        (false, true) => Ok(settle(hand, HandOutcome::DealerNatural, GameResult::Loss)),
        (false, false) => {
            hand.stage = BlackjackStage::PlayerTurn;
            Ok(GameResult::Continue)
        }
    }
}

pub fn hit(hand: &mut BlackjackHand, rules: &Rules) -> Result<GameResult, GameError> {
    ensure_player_turn(hand)?;
    hand.player.push(cards::deal(&mut hand.deck)?);

    let (total, _) = hand_value(&hand.player);
    if total > BUST_THRESHOLD {
        return Ok(settle(hand, HandOutcome::PlayerBust, GameResult::Loss));
    }
    if total == BUST_THRESHOLD {
        // Nothing left to gain from another card.
        return stand(hand, rules);
    }
    Ok(GameResult::Continue)
}

pub fn stand(hand: &mut BlackjackHand, rules: &Rules) -> Result<GameResult, GameError> {
    ensure_player_turn(hand)?;
    hand.stage = BlackjackStage::DealerTurn;
    play_dealer(hand, rules)
}

/// Double the stake, take exactly one card, then stand.
pub fn double(hand: &mut BlackjackHand, rules: &Rules) -> Result<GameResult, GameError> {
    ensure_player_turn(hand)?;
    if !first_action(hand) {
        return Err(GameError::InvalidMove);
    }
    hand.stake = hand.stake.checked_mul(2).ok_or(GameError::InvalidState)?;
    hand.doubled = true;
    hand.player.push(cards::deal(&mut hand.deck)?);

    if hand_value(&hand.player).0 > BUST_THRESHOLD {
        return Ok(settle(hand, HandOutcome::PlayerBust, GameResult::Loss));
    }
    hand.stage = BlackjackStage::DealerTurn;
    play_dealer(hand, rules)
}

pub fn surrender(hand: &mut BlackjackHand) -> Result<GameResult, GameError> {
    ensure_player_turn(hand)?;
    if !first_action(hand) {
        return Err(GameError::InvalidMove);
    }
    let refund = hand.stake / 2;
    Ok(settle(hand, HandOutcome::Surrender, GameResult::Partial(refund)))
}

/// Close an abandoned hand; the stake stays with the house.
pub fn forfeit(hand: &mut BlackjackHand) -> GameResult {
    settle(hand, HandOutcome::Forfeit, GameResult::Loss)
}

fn ensure_player_turn(hand: &BlackjackHand) -> Result<(), GameError> {
    match hand.stage {
        BlackjackStage::PlayerTurn => Ok(()),
        BlackjackStage::Settled => Err(GameError::GameAlreadyComplete),
        BlackjackStage::Betting | BlackjackStage::DealerTurn => Err(GameError::InvalidMove),
    }
}

fn play_dealer(hand: &mut BlackjackHand, rules: &Rules) -> Result<GameResult, GameError> {
    if hand.stage != BlackjackStage::DealerTurn {
        return Err(GameError::InvalidState);
    }
    while hand_value(&hand.dealer).0 < rules.dealer_stands_on {
        hand.dealer.push(cards::deal(&mut hand.deck)?);
    }

    let (player, _) = hand_value(&hand.player);
    let (dealer, _) = hand_value(&hand.dealer);
    let win = GameResult::Win(hand.stake.saturating_add(rules.win_pays.profit(hand.stake)));
    let (outcome, result) = if dealer > BUST_THRESHOLD {
        (HandOutcome::DealerBust, win)
    } else if player > dealer {
        (HandOutcome::PlayerHigher, win)
    } else if player < dealer {
        (HandOutcome::DealerHigher, GameResult::Loss)
    } else {
        (HandOutcome::Push, GameResult::Push)
    };
    Ok(settle(hand, outcome, result))
}

fn settle(hand: &mut BlackjackHand, outcome: HandOutcome, result: GameResult) -> GameResult {
    hand.stage = BlackjackStage::Settled;
    hand.outcome = Some(outcome);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::casino::GameRng;

    // Ranks as card codes in spades.
    const ACE: u8 = 0;
    const TWO: u8 = 1;
    const FIVE: u8 = 4;
    const SIX: u8 = 5;
    const SEVEN: u8 = 6;
    const EIGHT: u8 = 7;
    const NINE: u8 = 8;
    const TEN: u8 = 9;
    const KING: u8 = 12;

    /// Build a hand whose deal order is player, dealer, player, dealer, then `draws` in order.
    fn rigged(player: [u8; 2], dealer: [u8; 2], draws: &[u8]) -> BlackjackHand {
        let mut deck: Vec<u8> = draws.iter().rev().copied().collect();
        deck.extend([dealer[1], player[1], dealer[0], player[0]]);
        BlackjackHand::new(1, 1, 1, 100, deck, 0)
    }

    #[test]
    fn test_hand_value_soft_and_hard() {
        assert_eq!(hand_value(&[ACE, SIX]), (17, true));
        assert_eq!(hand_value(&[ACE, SIX, TEN]), (17, false));
        assert_eq!(hand_value(&[ACE, ACE]), (12, true));
        assert_eq!(hand_value(&[ACE, ACE, KING]), (12, false));
        assert_eq!(hand_value(&[KING, TEN, TWO]), (22, false));
        assert!(is_blackjack(&[ACE, KING]));
        assert!(!is_blackjack(&[SEVEN, SEVEN, SEVEN]));
    }

    #[test]
    fn test_natural_pays_three_to_two() {
        let mut hand = rigged([ACE, KING], [NINE, SEVEN], &[]);
        let result = deal(&mut hand, &Rules::default()).unwrap();
        assert_eq!(result, GameResult::Win(250));
        assert_eq!(hand.outcome, Some(HandOutcome::PlayerNatural));
        assert_eq!(hand.stage, BlackjackStage::Settled);
    }

    #[test]
    fn test_dealer_natural_and_double_natural() {
        let mut hand = rigged([NINE, SEVEN], [ACE, KING], &[]);
        assert_eq!(deal(&mut hand, &Rules::default()).unwrap(), GameResult::Loss);
        assert_eq!(hand.outcome, Some(HandOutcome::DealerNatural));

        let mut hand = rigged([ACE, TEN], [KING, ACE], &[]);
        assert_eq!(deal(&mut hand, &Rules::default()).unwrap(), GameResult::Push);
        assert_eq!(hand.outcome, Some(HandOutcome::BothNatural));
    }

    #[test]
    fn test_hit_to_bust_is_a_loss() {
        let mut hand = rigged([TEN, SIX], [NINE, SEVEN], &[KING]);
        let rules = Rules::default();
        assert_eq!(deal(&mut hand, &rules).unwrap(), GameResult::Continue);
        assert_eq!(hit(&mut hand, &rules).unwrap(), GameResult::Loss);
        assert_eq!(hand.outcome, Some(HandOutcome::PlayerBust));
        // Dealer never drew.
        assert_eq!(hand.dealer.len(), 2);
        assert_eq!(hit(&mut hand, &rules), Err(GameError::GameAlreadyComplete));
    }

    #[test]
    fn test_stand_dealer_draws_to_seventeen() {
        // Dealer 5+6 draws 2 (13), then 5 (18).
        let mut hand = rigged([TEN, NINE], [FIVE, SIX], &[TWO, FIVE]);
        let rules = Rules::default();
        deal(&mut hand, &rules).unwrap();
        assert_eq!(stand(&mut hand, &rules).unwrap(), GameResult::Win(200));
        assert_eq!(hand.dealer.len(), 4);
        assert_eq!(hand_value(&hand.dealer).0, 18);
        assert_eq!(hand.outcome, Some(HandOutcome::PlayerHigher));
    }

    #[test]
    fn test_push_returns_stake() {
        let mut hand = rigged([TEN, EIGHT], [NINE, NINE], &[]);
        let rules = Rules::default();
        deal(&mut hand, &rules).unwrap();
        assert_eq!(stand(&mut hand, &rules).unwrap(), GameResult::Push);
        assert_eq!(GameResult::Push.total_return(hand.stake), 100);
    }

    #[test]
    fn test_dealer_bust_pays_player() {
        let mut hand = rigged([TEN, TWO], [TEN, SIX], &[KING]);
        let rules = Rules::default();
        deal(&mut hand, &rules).unwrap();
        assert_eq!(stand(&mut hand, &rules).unwrap(), GameResult::Win(200));
        assert_eq!(hand.outcome, Some(HandOutcome::DealerBust));
    }

    #[test]
    fn test_double_takes_one_card_and_doubles_stake() {
        let mut hand = rigged([FIVE, SIX], [TEN, SEVEN], &[TEN]);
        let rules = Rules::default();
        deal(&mut hand, &rules).unwrap();
        assert!(first_action(&hand));
        assert_eq!(double(&mut hand, &rules).unwrap(), GameResult::Win(400));
        assert_eq!(hand.player.len(), 3);
        assert_eq!(hand.stake, 200);
        assert!(hand.doubled);
    }

    #[test]
    fn test_double_only_on_first_two_cards() {
        let mut hand = rigged([TWO, TWO], [TEN, SEVEN], &[TWO, TEN]);
        let rules = Rules::default();
        deal(&mut hand, &rules).unwrap();
        hit(&mut hand, &rules).unwrap();
        assert_eq!(double(&mut hand, &rules), Err(GameError::InvalidMove));
        assert_eq!(surrender(&mut hand), Err(GameError::InvalidMove));
        assert_eq!(hand.stake, 100);
    }

    #[test]
    fn test_surrender_returns_half() {
        let mut hand = rigged([TEN, SIX], [TEN, KING], &[]);
        let rules = Rules::default();
        deal(&mut hand, &rules).unwrap();
        assert_eq!(surrender(&mut hand).unwrap(), GameResult::Partial(50));
        assert_eq!(hand.outcome, Some(HandOutcome::Surrender));
    }

    #[test]
    fn test_hit_to_twenty_one_stands_automatically() {
        let mut hand = rigged([TEN, SIX], [TEN, SEVEN], &[FIVE]);
        let rules = Rules::default();
        deal(&mut hand, &rules).unwrap();
        assert_eq!(hit(&mut hand, &rules).unwrap(), GameResult::Win(200));
        assert_eq!(hand.stage, BlackjackStage::Settled);
    }

    #[test]
    fn test_dealer_always_stops_at_seventeen_or_more() {
        let rules = Rules::default();
        for seed in 0..500 {
            let mut rng = GameRng::from_seed(seed);
            let mut hand = BlackjackHand::new(1, 1, 1, 100, rng.create_deck(), 0);
            deal(&mut hand, &rules).unwrap();
            if hand.stage == BlackjackStage::Settled {
                continue;
            }
            stand(&mut hand, &rules).unwrap();
            let (dealer, _) = hand_value(&hand.dealer);
            assert!(dealer >= 17, "seed {seed}: dealer stopped at {dealer}");
            let (before_last, _) = hand_value(&hand.dealer[..hand.dealer.len() - 1]);
            if hand.dealer.len() > 2 {
                assert!(before_last < 17, "seed {seed}: dealer drew past 17");
            }
        }
    }

    #[test]
    fn test_seeded_hands_are_reproducible() {
        let rules = Rules::default();
        let play = |seed: u64| {
            let mut rng = GameRng::from_seed(seed);
            let mut hand = BlackjackHand::new(1, 1, 1, 100, rng.create_deck(), 0);
            let mut result = deal(&mut hand, &rules).unwrap();
            while result == GameResult::Continue {
                result = if hand_value(&hand.player).0 < 15 {
                    hit(&mut hand, &rules).unwrap()
                } else {
                    stand(&mut hand, &rules).unwrap()
                };
            }
            (hand, result)
        };
        for seed in 0..50 {
            assert_eq!(play(seed), play(seed));
        }
    }

    #[test]
    fn test_custom_rules() {
        let rules = Rules {
            natural_pays: Ratio::new(6, 5),
            win_pays: Ratio::new(1, 1),
            dealer_stands_on: 17,
        };
        let mut hand = rigged([ACE, KING], [NINE, SEVEN], &[]);
        assert_eq!(deal(&mut hand, &rules).unwrap(), GameResult::Win(220));
    }
}
