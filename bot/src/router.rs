//! Maps chat input onto ledger instructions and renders the outcome.
//!
//! The router owns the store and the game RNG. Input is handled strictly one update at a time,
//! so every instruction sees the state left by the previous one.

use antaria_execution::casino::GameRng;
use antaria_execution::state::resolve_handle;
use antaria_execution::{execute, sweep, CasinoError, State};
use antaria_types::casino::{CasinoConfig, PredictGame};
use antaria_types::execution::{Actor, ChatId, Event, Instruction, UserId};
use tracing::{debug, error, warn};

use crate::command::{BlackjackAction, Callback, Command, Recipient};
use crate::render::{escape, render_error, render_events, render_parse_error, Outgoing, HELP};

/// The message an incoming command replied to.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplyTarget {
    pub user: Option<UserId>,
    pub name: String,
    pub sticker: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Input {
    Text(String),
    Button { callback_id: String, data: String },
}

/// One update from the transport, reduced to what the router needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Incoming {
    pub user: UserId,
    pub name: String,
    pub handle: Option<String>,
    pub chat: ChatId,
    pub input: Input,
    pub reply_to: Option<ReplyTarget>,
}

pub struct Router<S: State> {
    store: S,
    config: CasinoConfig,
    rng: GameRng,
    deposit_instructions: String,
}

impl<S: State> Router<S> {
    pub fn new(store: S, config: CasinoConfig, rng: GameRng, deposit_instructions: String) -> Self {
        Self {
            store,
            config,
            rng,
            deposit_instructions,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub async fn handle(&mut self, incoming: Incoming, now: u64) -> Vec<Outgoing> {
        let actor = Actor {
            user: incoming.user,
            name: incoming.name,
            handle: incoming.handle,
            chat: incoming.chat,
        };
        match incoming.input {
            Input::Text(text) => {
                self.handle_text(&actor, &text, incoming.reply_to.as_ref(), now)
                    .await
            }
            Input::Button { callback_id, data } => {
                self.handle_button(&actor, callback_id, &data, now).await
            }
        }
    }

    /// Expire stale sessions and tell each affected chat.
    pub async fn sweep(&mut self, now: u64) -> Vec<Outgoing> {
        let events = match sweep(&mut self.store, &self.config, &mut self.rng, now).await {
            Ok(events) => events,
            Err(err) => {
                error!(error = ?err, "sweep failed");
                return Vec::new();
            }
        };

        // Achievements follow the event that triggered them, so they inherit its chat.
        let mut out = Vec::new();
        let mut start = 0;
        while start < events.len() {
            let (chat, owner) = match &events[start] {
                Event::PvpExpired { session } => (session.chat, session.opener),
                Event::BlackjackForfeited { hand } => (hand.chat, hand.user),
                _ => {
                    start += 1;
                    continue;
                }
            };
            let end = events[start + 1..]
                .iter()
                .position(|event| {
                    matches!(
                        event,
                        Event::PvpExpired { .. } | Event::BlackjackForfeited { .. }
                    )
                })
                .map_or(events.len(), |offset| start + 1 + offset);
            out.extend(render_events(&events[start..end], owner, chat, now));
            start = end;
        }
        out
    }

    async fn handle_text(
        &mut self,
        actor: &Actor,
        text: &str,
        reply_to: Option<&ReplyTarget>,
        now: u64,
    ) -> Vec<Outgoing> {
        let command = match Command::parse(text) {
            Ok(Some(command)) => command,
            Ok(None) => return Vec::new(),
            Err(err) => {
                debug!(user = actor.user, %err, "unparseable command");
                return vec![Outgoing::text(actor.chat, render_parse_error(&err))];
            }
        };
        debug!(user = actor.user, chat = actor.chat, ?command, "parsed command");

        let instruction = match command {
            Command::Help => return vec![Outgoing::text(actor.chat, HELP)],
            Command::Deposit => {
                return vec![Outgoing::text(
                    actor.chat,
                    escape(&self.deposit_instructions),
                )]
            }
            Command::Start { referrer } => Instruction::Register { referrer },
            Command::Balance => Instruction::Balance,
            Command::Stats => Instruction::Stats,
            Command::History => Instruction::History,
            Command::Leaderboard { page } => Instruction::Leaderboard {
                page: page.saturating_sub(1),
            },
            Command::HouseBalance => Instruction::HouseBalance,
            Command::Referral => Instruction::Referral,

            Command::Blackjack { stake } => Instruction::BlackjackDeal { stake },
            Command::Hit => Instruction::BlackjackHit { hand: None },
            Command::Stand => Instruction::BlackjackStand { hand: None },
            Command::Double => Instruction::BlackjackDouble { hand: None },
            Command::Surrender => Instruction::BlackjackSurrender { hand: None },

            Command::Roulette { stake, bet } => Instruction::Roulette { stake, bet },
            Command::PredictDice { stake, picks } => Instruction::Predict {
                stake,
                game: PredictGame::Dice,
                picks,
            },
            Command::Flip { stake, side } => Instruction::Predict {
                stake,
                game: PredictGame::Coin,
                picks: vec![side.index()],
            },

            Command::Challenge { game, stake, call } => Instruction::PvpOpen { game, stake, call },
            Command::Accept { stake } => Instruction::PvpAccept {
                session: None,
                stake,
            },
            Command::Cancel => Instruction::PvpCancel,

            Command::Bonus => Instruction::ClaimBonus,
            Command::ClaimReferral => Instruction::ClaimReferral,
            // Money only moves once the sender confirms the staged tip.
            Command::Tip { amount, recipient } => {
                match self.resolve(actor, &recipient, reply_to).await {
                    Ok((recipient, _)) => Instruction::TipRequest { recipient, amount },
                    Err(reply) => return vec![reply],
                }
            }
            Command::Withdraw { amount, address } => Instruction::Withdraw { amount, address },

            Command::ApproveDeposit { target, amount } => {
                match self.resolve(actor, &target, reply_to).await {
                    Ok((target, _)) => Instruction::AdminDeposit { target, amount },
                    Err(reply) => return vec![reply],
                }
            }
            Command::GiveBalance { target, amount } => {
                match self.resolve(actor, &target, reply_to).await {
                    Ok((target, _)) => Instruction::AdminAdjust { target, amount },
                    Err(reply) => return vec![reply],
                }
            }
            Command::SetBalance { target, balance } => {
                match self.resolve(actor, &target, reply_to).await {
                    Ok((target, _)) => Instruction::AdminSetBalance { target, balance },
                    Err(reply) => return vec![reply],
                }
            }
            Command::Withdrawals => Instruction::AdminPendingWithdrawals,
            Command::ResolveWithdrawal { id, approve } => {
                Instruction::AdminResolveWithdrawal { id, approve }
            }
            Command::SaveSticker { key } => {
                match reply_to.and_then(|target| target.sticker.clone()) {
                    Some(file_id) => Instruction::AdminSaveSticker { key, file_id },
                    None => {
                        return vec![Outgoing::text(
                            actor.chat,
                            "Reply to a sticker with /savesticker &lt;key&gt;.",
                        )]
                    }
                }
            }
            Command::SetTimeout { secs } => Instruction::AdminSetPvpTimeout { secs },
        };
        self.run(actor, instruction, now).await
    }

    async fn handle_button(
        &mut self,
        actor: &Actor,
        callback_id: String,
        data: &str,
        now: u64,
    ) -> Vec<Outgoing> {
        let answer = |text: Option<&str>| Outgoing::Answer {
            callback_id: callback_id.clone(),
            text: text.map(str::to_string),
        };
        let callback = match Callback::parse(data) {
            Ok(callback) => callback,
            Err(err) => {
                debug!(user = actor.user, data, %err, "unknown button");
                return vec![answer(Some("This button has expired."))];
            }
        };
        if let Some(owner) = callback.owner() {
            if owner != actor.user {
                return vec![answer(Some("Not your game!"))];
            }
        }
        debug!(user = actor.user, chat = actor.chat, ?callback, "button pressed");

        let instruction = match callback {
            Callback::Blackjack { hand, action, .. } => {
                let hand = Some(hand);
                match action {
                    BlackjackAction::Hit => Instruction::BlackjackHit { hand },
                    BlackjackAction::Stand => Instruction::BlackjackStand { hand },
                    BlackjackAction::Double => Instruction::BlackjackDouble { hand },
                    BlackjackAction::Surrender => Instruction::BlackjackSurrender { hand },
                }
            }
            Callback::Leaderboard { page, .. } => Instruction::Leaderboard { page },
            Callback::PvpAccept { session } => Instruction::PvpAccept {
                session: Some(session),
                stake: None,
            },
            Callback::PvpCancel { .. } => Instruction::PvpCancel,
            Callback::TipConfirm { tip, .. } => Instruction::TipConfirm { id: tip },
            Callback::TipCancel { tip, .. } => Instruction::TipCancel { id: tip },
        };
        let mut out = vec![answer(None)];
        out.extend(self.run(actor, instruction, now).await);
        out
    }

    async fn run(&mut self, actor: &Actor, instruction: Instruction, now: u64) -> Vec<Outgoing> {
        match execute(
            &mut self.store,
            &self.config,
            &mut self.rng,
            now,
            actor,
            &instruction,
        )
        .await
        {
            Ok(events) => render_events(&events, actor.user, actor.chat, now),
            Err(err) => {
                if err.is_user_error() {
                    warn!(user = actor.user, ?instruction, %err, "rejected instruction");
                } else {
                    error!(user = actor.user, ?instruction, error = ?err, "storage unavailable");
                }
                vec![Outgoing::text(actor.chat, render_error(&err))]
            }
        }
    }

    /// Resolve a tip or admin target to a user id and a display label.
    async fn resolve(
        &self,
        actor: &Actor,
        recipient: &Recipient,
        reply_to: Option<&ReplyTarget>,
    ) -> Result<(UserId, String), Outgoing> {
        match recipient {
            Recipient::Id(id) => Ok((*id, format!("user {id}"))),
            Recipient::Handle(handle) => match resolve_handle(&self.store, handle).await {
                Ok(Some(id)) => Ok((id, format!("@{}", escape(handle)))),
                Ok(None) => Err(Outgoing::text(
                    actor.chat,
                    format!("I don't know @{} yet.", escape(handle)),
                )),
                Err(err) => {
                    error!(user = actor.user, error = ?err, "storage unavailable");
                    Err(Outgoing::text(
                        actor.chat,
                        render_error(&CasinoError::StorageUnavailable(err)),
                    ))
                }
            },
            Recipient::Reply => match reply_to.and_then(|target| target.user.map(|id| (id, target))) {
                Some((id, target)) => Ok((id, escape(&target.name))),
                None => Err(Outgoing::text(
                    actor.chat,
                    "Reply to someone's message or name them with @handle.",
                )),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RETRY_LATER;
    use antaria_execution::mocks::{create_config, ADMIN};
    use antaria_execution::Memory;
    use antaria_types::casino::TransactionKind;

    const CHAT: ChatId = -500;

    fn router() -> Router<Memory> {
        Router::new(
            Memory::default(),
            create_config(),
            GameRng::from_seed(11),
            "Send funds to the operator.".into(),
        )
    }

    fn text(user: UserId, name: &str, body: &str) -> Incoming {
        Incoming {
            user,
            name: name.to_string(),
            handle: Some(name.to_lowercase()),
            chat: CHAT,
            input: Input::Text(body.to_string()),
            reply_to: None,
        }
    }

    fn press(user: UserId, name: &str, callback: &Callback) -> Incoming {
        Incoming {
            input: Input::Button {
                callback_id: "cb".to_string(),
                data: callback.encode(),
            },
            ..text(user, name, "")
        }
    }

    fn replying(mut incoming: Incoming, target: ReplyTarget) -> Incoming {
        incoming.reply_to = Some(target);
        incoming
    }

    fn messages(out: &[Outgoing]) -> Vec<&str> {
        out.iter()
            .filter_map(|outgoing| match outgoing {
                Outgoing::Message { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn balance(router: &Router<Memory>, user: UserId) -> u64 {
        router
            .store()
            .users()
            .into_iter()
            .find(|u| u.id == user)
            .map(|u| u.balance)
            .unwrap_or(0)
    }

    async fn fund(router: &mut Router<Memory>, user: UserId, name: &str, dollars: u64) {
        router.handle(text(user, name, "/start"), 1).await;
        let out = router
            .handle(
                text(ADMIN, "admin", &format!("/givebal {user} {dollars}")),
                1,
            )
            .await;
        assert!(messages(&out)[0].contains("adjusted by"), "{out:?}");
    }

    #[tokio::test]
    async fn test_start_and_balance() {
        let mut router = router();
        let out = router.handle(text(10, "Ada", "/start"), 1).await;
        assert!(messages(&out)[0].contains("Welcome, <b>Ada</b>!"));
        let out = router.handle(text(10, "Ada", "/bal@AntariaBot"), 2).await;
        assert!(messages(&out)[0].contains("$0.00"));
        assert!(router.handle(text(10, "Ada", "good luck all"), 3).await.is_empty());
    }

    #[tokio::test]
    async fn test_parse_and_ledger_errors_reply() {
        let mut router = router();
        let out = router.handle(text(10, "Ada", "/bj"), 1).await;
        assert_eq!(messages(&out), vec!["Usage: /bj &lt;amount&gt;"]);

        let out = router.handle(text(10, "Ada", "/bj 5"), 1).await;
        assert!(messages(&out)[0].starts_with("Insufficient funds"));

        let out = router.handle(text(10, "Ada", "/givebal 10 5"), 1).await;
        assert_eq!(messages(&out), vec!["You are not allowed to do that."]);
        assert_eq!(balance(&router, 10), 0);
    }

    #[tokio::test]
    async fn test_storage_failure_asks_to_retry() {
        let mut router = router();
        router.store_mut().set_unavailable(true);
        let out = router.handle(text(10, "Ada", "/bal"), 1).await;
        assert_eq!(messages(&out), vec![RETRY_LATER]);
    }

    #[tokio::test]
    async fn test_buttons_are_bound_to_their_owner() {
        let mut router = router();
        fund(&mut router, 10, "Ada", 100).await;
        let mut owner_button = None;
        for _ in 0..20 {
            let out = router.handle(text(10, "Ada", "/bj 10"), 2).await;
            let buttons = out.iter().find_map(|outgoing| match outgoing {
                Outgoing::Message { buttons, .. } if !buttons.is_empty() => Some(buttons.clone()),
                _ => None,
            });
            if let Some(buttons) = buttons {
                owner_button = Some(buttons[0][1].callback.clone());
                break;
            }
        }
        let stand = owner_button.expect("an open hand");
        let before = balance(&router, 10);

        let out = router.handle(press(11, "Bob", &stand), 3).await;
        assert_eq!(
            out,
            vec![Outgoing::Answer {
                callback_id: "cb".into(),
                text: Some("Not your game!".into())
            }]
        );
        assert_eq!(balance(&router, 10), before);

        let out = router.handle(press(10, "Ada", &stand), 3).await;
        assert!(matches!(out[0], Outgoing::Answer { text: None, .. }));
        assert!(messages(&out)[0].contains("Dealer:"));
        assert!(router.store().global().unwrap().open_blackjack.is_empty());
    }

    #[tokio::test]
    async fn test_tip_needs_confirmation() {
        let mut router = router();
        fund(&mut router, 10, "Ada", 50).await;
        router.handle(text(11, "Bob", "/start"), 1).await;

        let out = router.handle(text(10, "Ada", "/tip 5 @bob"), 2).await;
        let Outgoing::Message { text: prompt, buttons, .. } = &out[0] else {
            panic!("confirmation prompt");
        };
        assert_eq!(prompt, "Send $5.00 to Bob?");
        assert_eq!(balance(&router, 10), 5_000);

        let confirm = buttons[0][0].callback.clone();
        let out = router.handle(press(11, "Bob", &confirm), 3).await;
        assert_eq!(messages(&out).len(), 0);
        assert_eq!(balance(&router, 11), 0);

        let out = router.handle(press(10, "Ada", &confirm), 3).await;
        assert!(messages(&out)[0].contains("Ada tipped Bob"));
        assert_eq!(balance(&router, 10), 4_500);
        assert_eq!(balance(&router, 11), 500);
        let tips = router
            .store()
            .transactions()
            .into_iter()
            .filter(|tx| tx.kind == TransactionKind::Tip)
            .count();
        assert_eq!(tips, 2);

        // A replayed press finds nothing left to confirm.
        let out = router.handle(press(10, "Ada", &confirm), 4).await;
        assert_eq!(messages(&out), vec!["Nothing is waiting on that anymore."]);
        assert_eq!(balance(&router, 10), 4_500);
        assert_eq!(balance(&router, 11), 500);

        let out = router.handle(text(10, "Ada", "/tip 5 @nobody"), 4).await;
        assert_eq!(messages(&out), vec!["I don't know @nobody yet."]);
        let out = router.handle(text(10, "Ada", "/tip 5"), 4).await;
        assert!(messages(&out)[0].starts_with("Reply to someone's message"));
        let out = router.handle(text(10, "Ada", "/tip 5 @ada"), 4).await;
        assert_eq!(messages(&out), vec!["You cannot do that to yourself."]);
    }

    #[tokio::test]
    async fn test_cancelled_tip_cannot_be_confirmed() {
        let mut router = router();
        fund(&mut router, 10, "Ada", 50).await;
        router.handle(text(11, "Bob", "/start"), 1).await;

        let out = router.handle(text(10, "Ada", "/tip 5 @bob"), 2).await;
        let Outgoing::Message { buttons, .. } = &out[0] else {
            panic!("confirmation prompt");
        };
        let (confirm, cancel) = (buttons[0][0].callback.clone(), buttons[0][1].callback.clone());
        assert!(matches!(confirm, Callback::TipConfirm { .. }));

        let out = router.handle(press(10, "Ada", &cancel), 3).await;
        assert_eq!(messages(&out), vec!["Tip cancelled."]);

        for now in [4, 5] {
            let out = router.handle(press(10, "Ada", &confirm), now).await;
            assert_eq!(messages(&out), vec!["Nothing is waiting on that anymore."]);
            assert_eq!(balance(&router, 10), 5_000);
            assert_eq!(balance(&router, 11), 0);
        }
        assert!(router.store().global().unwrap().pending_tips.is_empty());
    }

    #[tokio::test]
    async fn test_admin_deposit_credits_user() {
        let mut router = router();
        router.handle(text(10, "Ada", "/start"), 1).await;

        let out = router.handle(text(10, "Ada", "/approvedeposit 10 25"), 2).await;
        assert_eq!(messages(&out), vec!["You are not allowed to do that."]);

        let out = router.handle(text(ADMIN, "admin", "/approvedeposit @ada 25"), 2).await;
        assert!(messages(&out)[0].contains("credited to Ada"), "{out:?}");
        assert_eq!(balance(&router, 10), 2_500);
        let deposits = router
            .store()
            .transactions()
            .into_iter()
            .filter(|tx| tx.kind == TransactionKind::Deposit)
            .count();
        assert_eq!(deposits, 1);
    }

    #[tokio::test]
    async fn test_admin_reply_targets_and_stickers() {
        let mut router = router();
        router.handle(text(10, "Ada", "/start"), 1).await;
        let target = ReplyTarget {
            user: Some(10),
            name: "Ada".into(),
            sticker: Some("STICKER-WIN".into()),
        };
        let out = router
            .handle(replying(text(ADMIN, "admin", "/setbal 20"), target.clone()), 2)
            .await;
        assert!(messages(&out)[0].contains("New balance: $20.00"));
        assert_eq!(balance(&router, 10), 2_000);

        for key in ["win", "loss"] {
            let out = router
                .handle(
                    replying(text(ADMIN, "admin", &format!("/savesticker {key}")), target.clone()),
                    2,
                )
                .await;
            assert!(messages(&out)[0].contains("Sticker saved"));
        }
        let out = router.handle(text(10, "Ada", "/roulette 1 red"), 3).await;
        assert!(out
            .iter()
            .any(|outgoing| matches!(outgoing, Outgoing::Sticker { file_id, .. } if file_id == "STICKER-WIN")));

        let out = router.handle(text(ADMIN, "admin", "/savesticker win"), 4).await;
        assert!(messages(&out)[0].starts_with("Reply to a sticker"));
    }

    #[tokio::test]
    async fn test_leaderboard_pages_are_one_based() {
        let mut router = router();
        fund(&mut router, 10, "Ada", 50).await;
        router.handle(text(10, "Ada", "/flip 1 heads"), 2).await;
        let out = router.handle(text(10, "Ada", "/lb 1"), 3).await;
        let text = messages(&out)[0];
        assert!(text.contains("page 1/1"));
        assert!(text.contains("1. Ada $1.00"));
    }

    #[tokio::test]
    async fn test_pvp_flow_and_sweep() {
        let mut router = router();
        fund(&mut router, 10, "Ada", 50).await;
        fund(&mut router, 11, "Bob", 50).await;

        let out = router.handle(text(10, "Ada", "/dice 10"), 100).await;
        let Outgoing::Message { buttons, .. } = &out[0] else {
            panic!("challenge message");
        };
        let accept = buttons[0][0].callback.clone();
        assert!(matches!(accept, Callback::PvpAccept { .. }));

        let out = router.handle(text(11, "Bob", "/dice 5"), 101).await;
        assert_eq!(messages(&out), vec!["A game is already running. Finish it first."]);

        let out = router.handle(press(11, "Bob", &accept), 102).await;
        assert!(messages(&out)[0].contains("<b>Ada</b> vs <b>Bob</b>"));

        // A fresh challenge nobody takes is refunded by the sweep.
        router.handle(text(11, "Bob", "/darts 10"), 200).await;
        let before = balance(&router, 11);
        assert!(router.sweep(201).await.is_empty());
        let out = router.sweep(200 + 300).await;
        assert_eq!(out.len(), 1);
        let Outgoing::Message { chat, text, .. } = &out[0] else {
            panic!("expiry message");
        };
        assert_eq!(*chat, CHAT);
        assert!(text.contains("expired"));
        assert_eq!(balance(&router, 11), before + 1_000);
        assert!(router.sweep(900).await.is_empty());
    }

    #[tokio::test]
    async fn test_stale_accept_button_does_not_join_new_challenge() {
        let mut router = router();
        fund(&mut router, 10, "Ada", 50).await;
        fund(&mut router, 11, "Bob", 50).await;

        let out = router.handle(text(10, "Ada", "/dice 1"), 100).await;
        let Outgoing::Message { buttons, .. } = &out[0] else {
            panic!("challenge message");
        };
        let stale = buttons[0][0].callback.clone();
        router.handle(text(10, "Ada", "/cancel"), 101).await;

        let out = router.handle(text(10, "Ada", "/dice 40"), 102).await;
        let Outgoing::Message { buttons, .. } = &out[0] else {
            panic!("challenge message");
        };
        let fresh = buttons[0][0].callback.clone();
        assert_ne!(stale, fresh);

        let out = router.handle(press(11, "Bob", &stale), 103).await;
        assert_eq!(messages(&out), vec!["Nothing is waiting on that anymore."]);
        assert_eq!(balance(&router, 11), 5_000);
        assert_eq!(router.store().global().unwrap().pvp_sessions.len(), 1);

        let out = router.handle(press(11, "Bob", &fresh), 104).await;
        assert!(messages(&out)[0].contains("<b>Ada</b> vs <b>Bob</b>"));
    }
}
