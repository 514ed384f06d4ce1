use super::super::*;
use crate::casino::blackjack::{self, hand_value, Rules};
use crate::casino::GameResult;
use antaria_types::casino::{BlackjackHand, BlackjackStage, HandOutcome};

impl<'a, S: State> Layer<'a, S> {
    async fn blackjack_hand(&self, user: UserId) -> Result<Option<BlackjackHand>, CasinoError> {
        Ok(match self.get(&Key::Blackjack(user)).await? {
            Some(Value::Blackjack(hand)) => Some(hand),
            _ => None,
        })
    }

    pub(in crate::layer) async fn handle_blackjack_deal(
        &mut self,
        actor: &Actor,
        stake: Stake,
    ) -> Result<Vec<Event>, CasinoError> {
        let mut events = self.expire_blackjack_hand(actor.user).await?;
        if self.blackjack_hand(actor.user).await?.is_some() {
            return Err(CasinoError::SessionAlreadyActive);
        }

        let balance = self.read_balance(actor.user).await?;
        let stake = self.resolve_stake(stake, balance)?;
        self.stake_to_house(actor.user, stake, "Blackjack bet").await?;

        let mut global = self.global().await?;
        let id = global.next_hand_id;
        global.next_hand_id += 1;
        self.put_global(global);

        let deck = self.rng.create_deck();
        let mut hand = BlackjackHand::new(id, actor.user, actor.chat, stake, deck, self.now);
        let rules = Rules::from_config(self.config);
        let result = blackjack::deal(&mut hand, &rules)?;
        events.extend(self.advance_hand(hand, result).await?);
        Ok(events)
    }

    pub(in crate::layer) async fn handle_blackjack_move(
        &mut self,
        actor: &Actor,
        instruction: &Instruction,
    ) -> Result<Vec<Event>, CasinoError> {
        let expired = self.expire_blackjack_hand(actor.user).await?;
        if !expired.is_empty() {
            return Ok(expired);
        }
        let requested = match instruction {
            Instruction::BlackjackHit { hand }
            | Instruction::BlackjackStand { hand }
            | Instruction::BlackjackDouble { hand }
            | Instruction::BlackjackSurrender { hand } => *hand,
            _ => None,
        };
        let mut hand = match self.blackjack_hand(actor.user).await? {
            Some(hand) if requested.map_or(true, |id| id == hand.id) => hand,
            _ => return Err(CasinoError::NoActiveSession),
        };

        let rules = Rules::from_config(self.config);
        let result = match instruction {
            Instruction::BlackjackHit { .. } => blackjack::hit(&mut hand, &rules)?,
            Instruction::BlackjackStand { .. } => blackjack::stand(&mut hand, &rules)?,
            Instruction::BlackjackDouble { .. } => {
                if !blackjack::first_action(&hand) {
                    return Err(CasinoError::InvalidMove(crate::casino::GameError::InvalidMove));
                }
                // Extra stake first, so a short balance aborts before any card moves.
                self.stake_to_house(actor.user, hand.stake, "Blackjack double")
                    .await?;
                blackjack::double(&mut hand, &rules)?
            }
            Instruction::BlackjackSurrender { .. } => blackjack::surrender(&mut hand)?,
            _ => return Err(CasinoError::InvalidMove(crate::casino::GameError::InvalidMove)),
        };
        hand.updated_at = self.now;
        self.advance_hand(hand, result).await
    }

    /// Persist an in-progress hand, or pay out and close a settled one.
    async fn advance_hand(
        &mut self,
        hand: BlackjackHand,
        result: GameResult,
    ) -> Result<Vec<Event>, CasinoError> {
        let user = hand.user;
        if !result.is_settled() {
            let balance = self.read_balance(user).await?;
            let mut global = self.global().await?;
            if global.open_blackjack.insert(user) {
                self.put_global(global);
            }
            self.stage(Key::Blackjack(user), Value::Blackjack(hand.clone()));
            return Ok(vec![Event::Blackjack {
                hand,
                payout: None,
                balance,
            }]);
        }

        let returned = result.total_return(hand.stake);
        if returned > 0 {
            self.pay_from_house(user, returned, TransactionKind::Payout, "Blackjack payout")
                .await?;
        }
        let mut events = self.close_hand(&hand, returned).await?;
        let balance = self.read_balance(user).await?;
        events.insert(
            0,
            Event::Blackjack {
                hand,
                payout: Some(returned),
                balance,
            },
        );
        Ok(events)
    }

    async fn close_hand(
        &mut self,
        hand: &BlackjackHand,
        returned: u64,
    ) -> Result<Vec<Event>, CasinoError> {
        self.stage_delete(Key::Blackjack(hand.user));
        let mut global = self.global().await?;
        if global.open_blackjack.remove(&hand.user) {
            self.put_global(global);
        }

        let outcome = hand.outcome.unwrap_or(HandOutcome::Forfeit);
        let bonus = (outcome == HandOutcome::PlayerNatural).then_some(Achievement::Natural);
        let descriptor = format!(
            "{} vs {}: {}",
            hand_value(&hand.player).0,
            hand_value(&hand.dealer).0,
            outcome.describe()
        );
        self.settle_round(
            hand.user,
            GameType::Blackjack,
            hand.stake,
            returned,
            descriptor,
            None,
            bonus,
        )
        .await
    }

    /// Forfeit the user's hand if it has been idle past the timeout.
    pub(in crate::layer) async fn expire_blackjack_hand(
        &mut self,
        user: UserId,
    ) -> Result<Vec<Event>, CasinoError> {
        let Some(mut hand) = self.blackjack_hand(user).await? else {
            return Ok(Vec::new());
        };
        if hand.stage == BlackjackStage::Settled
            || !hand.is_stale(self.now, self.config.blackjack_timeout_secs)
        {
            return Ok(Vec::new());
        }
        blackjack::forfeit(&mut hand);
        warn!(user, stake = hand.stake, "forfeited idle blackjack hand");
        let mut events = self.close_hand(&hand, 0).await?;
        events.insert(0, Event::BlackjackForfeited { hand });
        Ok(events)
    }
}
