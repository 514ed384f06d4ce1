use super::super::*;
use crate::casino::pvp::{self, Winner};
use antaria_types::casino::{CoinSide, PvpDraw, PvpGame, PvpSession, STICKER_LOSS, STICKER_WIN};
use antaria_types::execution::ChatId;

// Open stakes sit in escrow on the session rather than with the house. They only reach the house
// as the cut when a round resolves.

impl<'a, S: State> Layer<'a, S> {
    /// Remove and refund the chat's challenge if it has timed out.
    pub(in crate::layer) async fn expire_pvp_session(
        &mut self,
        chat: ChatId,
    ) -> Result<Vec<Event>, CasinoError> {
        let mut global = self.global().await?;
        let timeout = global.pvp_timeout(self.config.pvp_timeout_secs);
        let expired = match global.pvp_sessions.get(&chat) {
            Some(session) if session.is_expired(self.now, timeout) => session.clone(),
            _ => return Ok(Vec::new()),
        };
        global.pvp_sessions.remove(&chat);
        self.put_global(global);

        self.credit(
            expired.opener,
            expired.stake,
            TransactionKind::Refund,
            format!("{} challenge expired", expired.game.name()),
        )
        .await?;
        info!(chat, id = expired.id, opener = expired.opener, "expired pvp challenge");
        Ok(vec![Event::PvpExpired { session: expired }])
    }

    pub(in crate::layer) async fn handle_pvp_open(
        &mut self,
        actor: &Actor,
        game: PvpGame,
        stake: Stake,
        call: Option<CoinSide>,
    ) -> Result<Vec<Event>, CasinoError> {
        let mut events = self.expire_pvp_session(actor.chat).await?;
        if self.global().await?.pvp_sessions.contains_key(&actor.chat) {
            return Err(CasinoError::SessionAlreadyActive);
        }
        let call = match (game, call) {
            (PvpGame::CoinFlip, None) => {
                return Err(CasinoError::invalid_bet("call heads or tails"));
            }
            (PvpGame::CoinFlip, call) => call,
            _ => None,
        };

        let balance = self.read_balance(actor.user).await?;
        let stake = self.resolve_stake(stake, balance)?;
        let opener = self
            .debit(
                actor.user,
                stake,
                TransactionKind::Bet,
                format!("{} challenge", game.name()),
            )
            .await?;

        // The debit advanced the transaction counter; reload before writing.
        let mut global = self.global().await?;
        let session = PvpSession {
            id: global.next_pvp_id,
            chat: actor.chat,
            opener: actor.user,
            opener_name: opener.name,
            game,
            stake,
            call,
            opened_at: self.now,
        };
        global.next_pvp_id += 1;
        let expires_at = session.expires_at(global.pvp_timeout(self.config.pvp_timeout_secs));
        global.pvp_sessions.insert(actor.chat, session.clone());
        self.put_global(global);
        info!(chat = actor.chat, id = session.id, opener = actor.user, stake, "opened pvp challenge");

        events.push(Event::PvpOpened {
            session,
            expires_at,
        });
        Ok(events)
    }

    pub(in crate::layer) async fn handle_pvp_accept(
        &mut self,
        actor: &Actor,
        session_id: Option<u64>,
        stake: Option<Stake>,
    ) -> Result<Vec<Event>, CasinoError> {
        let expired = self.expire_pvp_session(actor.chat).await?;
        if !expired.is_empty() {
            return Ok(expired);
        }
        let mut global = self.global().await?;
        let Some(session) = global.pvp_sessions.remove(&actor.chat) else {
            return Err(CasinoError::NoActiveSession);
        };
        // A button from an earlier challenge must not commit to the current one.
        if session_id.is_some_and(|id| id != session.id) {
            return Err(CasinoError::NoActiveSession);
        }
        if session.opener == actor.user {
            return Err(CasinoError::SelfAction);
        }
        self.put_global(global);

        let balance = self.read_balance(actor.user).await?;
        let offered = self.resolve_stake(stake.unwrap_or(Stake::Amount(session.stake)), balance)?;
        let Some(matched) = pvp::match_stakes(self.config.stake_matching, session.stake, offered)
        else {
            return Err(CasinoError::invalid_bet(format!(
                "this challenge needs a stake of exactly {}",
                format_amount(session.stake)
            )));
        };

        let game_name = session.game.name();
        let acceptor = self
            .debit(
                actor.user,
                matched.acceptor_stake,
                TransactionKind::Bet,
                format!("{game_name} challenge"),
            )
            .await?;
        if matched.opener_refund > 0 {
            self.credit(
                session.opener,
                matched.opener_refund,
                TransactionKind::Refund,
                format!("{game_name} unmatched stake"),
            )
            .await?;
        }

        let draw = pvp::draw(session.game, session.call, self.rng);
        let pot = matched.amount.saturating_mul(2);
        let (winner, payout, house_cut) = match pvp::winner(&draw) {
            Winner::Tie => {
                for player in [session.opener, actor.user] {
                    self.credit(
                        player,
                        matched.amount,
                        TransactionKind::Refund,
                        format!("{game_name} tie"),
                    )
                    .await?;
                }
                (None, 0, 0)
            }
            side => {
                let winner = if side == Winner::Opener {
                    session.opener
                } else {
                    actor.user
                };
                let (net, cut) = pvp::split_pot(pot, self.config.house_cut_bps);
                self.credit(winner, pot, TransactionKind::Payout, format!("{game_name} pot"))
                    .await?;
                self.debit(winner, cut, TransactionKind::HouseCut, "House cut")
                    .await?;
                self.adjust_house(cut as i64).await?;
                (Some(winner), net, cut)
            }
        };

        let descriptor = describe_draw(&draw);
        let mut achievements = Vec::new();
        for (player, opponent) in [(session.opener, actor.user), (actor.user, session.opener)] {
            let returned = match winner {
                None => matched.amount,
                Some(winner) if winner == player => payout,
                Some(_) => 0,
            };
            achievements.extend(
                self.settle_round(
                    player,
                    GameType::Pvp(session.game),
                    matched.amount,
                    returned,
                    descriptor.clone(),
                    Some(opponent),
                    None,
                )
                .await?,
            );
        }

        let stickers = if winner.is_some() {
            let global = self.global().await?;
            [STICKER_WIN, STICKER_LOSS]
                .into_iter()
                .filter_map(|key| global.sticker(key).map(str::to_string))
                .collect()
        } else {
            Vec::new()
        };
        info!(
            chat = actor.chat,
            id = session.id,
            ?winner,
            pot,
            house_cut,
            "resolved pvp challenge"
        );

        let mut events = vec![Event::PvpResolved {
            session,
            acceptor: actor.user,
            acceptor_name: acceptor.name,
            matched: matched.amount,
            draw,
            winner,
            payout,
            house_cut,
            refunded: matched.opener_refund,
            stickers,
        }];
        events.extend(achievements);
        Ok(events)
    }

    pub(in crate::layer) async fn handle_pvp_cancel(
        &mut self,
        actor: &Actor,
    ) -> Result<Vec<Event>, CasinoError> {
        let expired = self.expire_pvp_session(actor.chat).await?;
        if !expired.is_empty() {
            return Ok(expired);
        }
        let mut global = self.global().await?;
        let session = match global.pvp_sessions.get(&actor.chat) {
            Some(session) if session.opener == actor.user => session.clone(),
            Some(_) => return Err(CasinoError::Unauthorized),
            None => return Err(CasinoError::NoActiveSession),
        };
        global.pvp_sessions.remove(&actor.chat);
        self.put_global(global);

        self.credit(
            actor.user,
            session.stake,
            TransactionKind::Refund,
            format!("{} challenge cancelled", session.game.name()),
        )
        .await?;
        info!(chat = actor.chat, id = session.id, "cancelled pvp challenge");
        Ok(vec![Event::PvpCancelled { session }])
    }
}

fn describe_draw(draw: &PvpDraw) -> String {
    match draw {
        PvpDraw::Rolls { opener, acceptor } => format!("{opener} vs {acceptor}"),
        PvpDraw::Flip { call, result } => format!("called {call}, landed {result}"),
    }
}
