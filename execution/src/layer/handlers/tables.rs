use super::super::*;
use crate::casino::{predict, roulette};
use antaria_types::casino::{
    pocket_color, pocket_label, CoinSide, PredictGame, RouletteBet, STICKER_LOSS, STICKER_WIN,
};

impl<'a, S: State> Layer<'a, S> {
    pub(in crate::layer) async fn handle_roulette(
        &mut self,
        actor: &Actor,
        stake: Stake,
        bet: RouletteBet,
    ) -> Result<Vec<Event>, CasinoError> {
        let config = self.config;
        let wheel = &config.roulette;
        if !bet.is_valid(wheel.double_zero) {
            return Err(CasinoError::invalid_bet(format!("{bet} is not on this wheel")));
        }
        let balance = self.read_balance(actor.user).await?;
        let stake = self.resolve_stake(stake, balance)?;
        self.stake_to_house(actor.user, stake, format!("Roulette {bet}"))
            .await?;

        let (pocket, result) = roulette::play(bet, stake, self.rng, wheel)?;
        let returned = result.total_return(stake);
        if returned > 0 {
            self.pay_from_house(actor.user, returned, TransactionKind::Payout, "Roulette payout")
                .await?;
        }

        let jackpot = matches!(bet, RouletteBet::Straight(_)) && returned > 0;
        let descriptor = format!("{} {}", pocket_label(pocket), pocket_color(pocket));
        let achievements = self
            .settle_round(
                actor.user,
                GameType::Roulette,
                stake,
                returned,
                descriptor,
                None,
                jackpot.then_some(Achievement::Jackpot),
            )
            .await?;

        // A pocket-specific sticker wins over the generic win/loss one.
        let global = self.global().await?;
        let fallback = if returned > 0 { STICKER_WIN } else { STICKER_LOSS };
        let sticker = global
            .sticker(&format!("roulette_{}", pocket_label(pocket)))
            .or_else(|| global.sticker(fallback))
            .map(str::to_string);

        let balance = self.read_balance(actor.user).await?;
        let mut events = vec![Event::Roulette {
            bet,
            stake,
            pocket,
            payout: returned,
            balance,
            sticker,
        }];
        events.extend(achievements);
        Ok(events)
    }

    pub(in crate::layer) async fn handle_predict(
        &mut self,
        actor: &Actor,
        stake: Stake,
        game: PredictGame,
        picks: &[u8],
    ) -> Result<Vec<Event>, CasinoError> {
        if predict::validate_picks(game, picks).is_err() {
            return Err(CasinoError::invalid_bet(match game {
                PredictGame::Dice => "pick between one and five distinct faces from 1 to 6",
                PredictGame::Coin => "pick heads or tails",
            }));
        }
        let balance = self.read_balance(actor.user).await?;
        let stake = self.resolve_stake(stake, balance)?;
        self.stake_to_house(actor.user, stake, format!("{} bet", GameType::Predict(game)))
            .await?;

        let (roll, result) =
            predict::play(game, picks, stake, self.config.prediction_edge_bps, self.rng)?;
        let returned = result.total_return(stake);
        if returned > 0 {
            self.pay_from_house(
                actor.user,
                returned,
                TransactionKind::Payout,
                format!("{} payout", GameType::Predict(game)),
            )
            .await?;
        }

        let descriptor = match game {
            PredictGame::Dice => format!("rolled {roll}"),
            PredictGame::Coin => format!("landed {}", CoinSide::from_index(roll)),
        };
        let achievements = self
            .settle_round(
                actor.user,
                GameType::Predict(game),
                stake,
                returned,
                descriptor,
                None,
                None,
            )
            .await?;

        let balance = self.read_balance(actor.user).await?;
        let mut events = vec![Event::Predict {
            game,
            picks: picks.to_vec(),
            stake,
            roll,
            payout: returned,
            balance,
        }];
        events.extend(achievements);
        Ok(events)
    }
}
