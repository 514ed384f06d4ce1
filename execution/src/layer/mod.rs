use anyhow::Result;
use antaria_types::casino::{
    Achievement, CasinoConfig, GameRecord, GameType, GlobalState, Leaderboard, Stake,
    Transaction, TransactionKind, User, UserHistory,
};
use antaria_types::execution::{Actor, Event, Instruction, Key, UserId, Value};
use antaria_types::{apply_bps, format_amount};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::casino::GameRng;
use crate::error::CasinoError;
use crate::state::{load_global, load_user, State, Status};

mod handlers;

/// Staged view over a [`State`] backend.
///
/// Reads fall through to the backend unless the key was already written here. Writes only land in
/// `pending` and reach the backend when the caller commits them.
pub struct Layer<'a, S: State> {
    state: &'a S,
    pending: BTreeMap<Key, Status>,

    config: &'a CasinoConfig,
    rng: &'a mut GameRng,
    now: u64,
}

/// Execute one instruction and commit its changes atomically.
pub async fn execute<S: State>(
    state: &mut S,
    config: &CasinoConfig,
    rng: &mut GameRng,
    now: u64,
    actor: &Actor,
    instruction: &Instruction,
) -> Result<Vec<Event>, CasinoError> {
    let (events, changes) = {
        let mut layer = Layer::new(state, config, rng, now);
        let events = layer.apply(actor, instruction).await?;
        (events, layer.commit())
    };
    state.apply(changes).await.map_err(CasinoError::StorageUnavailable)?;
    Ok(events)
}

/// Expire stale PvP challenges and blackjack hands, committing the refunds atomically.
pub async fn sweep<S: State>(
    state: &mut S,
    config: &CasinoConfig,
    rng: &mut GameRng,
    now: u64,
) -> Result<Vec<Event>, CasinoError> {
    let (events, changes) = {
        let mut layer = Layer::new(state, config, rng, now);
        let events = layer.sweep().await?;
        (events, layer.commit())
    };
    if !changes.is_empty() {
        state.apply(changes).await.map_err(CasinoError::StorageUnavailable)?;
    }
    Ok(events)
}

impl<'a, S: State> Layer<'a, S> {
    pub fn new(state: &'a S, config: &'a CasinoConfig, rng: &'a mut GameRng, now: u64) -> Self {
        Self {
            state,
            pending: BTreeMap::new(),

            config,
            rng,
            now,
        }
    }

    fn stage(&mut self, key: Key, value: Value) {
        self.pending.insert(key, Status::Update(value));
    }

    fn stage_delete(&mut self, key: Key) {
        self.pending.insert(key, Status::Delete);
    }

    pub fn commit(self) -> Vec<(Key, Status)> {
        self.pending.into_iter().collect()
    }

    pub async fn apply(
        &mut self,
        actor: &Actor,
        instruction: &Instruction,
    ) -> Result<Vec<Event>, CasinoError> {
        debug!(user = actor.user, chat = actor.chat, ?instruction, "applying instruction");
        if instruction.is_admin() && !self.config.is_admin(actor.user) {
            warn!(user = actor.user, ?instruction, "rejected admin instruction");
            return Err(CasinoError::Unauthorized);
        }
        let is_new = self.touch_user(actor).await?;

        match instruction {
            Instruction::Register { referrer } => self.handle_register(actor, is_new, *referrer).await,
            Instruction::Balance => self.handle_balance(actor).await,
            Instruction::Stats => self.handle_stats(actor).await,
            Instruction::History => self.handle_history(actor).await,
            Instruction::Leaderboard { page } => self.handle_leaderboard(*page).await,
            Instruction::HouseBalance => self.handle_house_balance().await,
            Instruction::Referral => self.handle_referral(actor).await,

            Instruction::BlackjackDeal { stake } => self.handle_blackjack_deal(actor, *stake).await,
            Instruction::BlackjackHit { .. }
            | Instruction::BlackjackStand { .. }
            | Instruction::BlackjackDouble { .. }
            | Instruction::BlackjackSurrender { .. } => {
                self.handle_blackjack_move(actor, instruction).await
            }

            Instruction::Roulette { stake, bet } => {
                self.handle_roulette(actor, *stake, *bet).await
            }
            Instruction::Predict { stake, game, picks } => {
                self.handle_predict(actor, *stake, *game, picks).await
            }

            Instruction::PvpOpen { game, stake, call } => {
                self.handle_pvp_open(actor, *game, *stake, *call).await
            }
            Instruction::PvpAccept { session, stake } => {
                self.handle_pvp_accept(actor, *session, *stake).await
            }
            Instruction::PvpCancel => self.handle_pvp_cancel(actor).await,

            Instruction::ClaimBonus => self.handle_claim_bonus(actor).await,
            Instruction::ClaimReferral => self.handle_claim_referral(actor).await,
            Instruction::TipRequest { recipient, amount } => {
                self.handle_tip_request(actor, *recipient, *amount).await
            }
            Instruction::TipConfirm { id } => self.handle_tip_confirm(actor, *id).await,
            Instruction::TipCancel { id } => self.handle_tip_cancel(actor, *id).await,
            Instruction::Withdraw { amount, address } => {
                self.handle_withdraw(actor, *amount, address).await
            }

            Instruction::AdminDeposit { target, amount } => {
                self.handle_admin_deposit(*target, *amount).await
            }
            Instruction::AdminAdjust { target, amount } => {
                self.handle_admin_adjust(*target, *amount).await
            }
            Instruction::AdminSetBalance { target, balance } => {
                self.handle_admin_set_balance(*target, *balance).await
            }
            Instruction::AdminPendingWithdrawals => self.handle_pending_withdrawals().await,
            Instruction::AdminResolveWithdrawal { id, approve } => {
                self.handle_resolve_withdrawal(*id, *approve).await
            }
            Instruction::AdminSaveSticker { key, file_id } => {
                self.handle_save_sticker(key, file_id).await
            }
            Instruction::AdminSetPvpTimeout { secs } => self.handle_set_pvp_timeout(*secs).await,
        }
    }

    pub async fn sweep(&mut self) -> Result<Vec<Event>, CasinoError> {
        let global = self.global().await?;
        let mut events = Vec::new();
        for chat in global.pvp_sessions.keys() {
            events.extend(self.expire_pvp_session(*chat).await?);
        }
        for user in global.open_blackjack.iter() {
            events.extend(self.expire_blackjack_hand(*user).await?);
        }
        self.prune_pending_tips().await?;
        if !events.is_empty() {
            info!(expired = events.len(), "swept stale sessions");
        }
        Ok(events)
    }

    // === Ledger primitives ===

    async fn global(&self) -> Result<GlobalState, CasinoError> {
        Ok(load_global(self, self.config.initial_house_balance).await?)
    }

    fn put_global(&mut self, global: GlobalState) {
        self.stage(Key::GlobalState, Value::GlobalState(global));
    }

    async fn user(&self, user: UserId) -> Result<User, CasinoError> {
        load_user(self, user).await?.ok_or(CasinoError::UserNotFound)
    }

    fn put_user(&mut self, user: User) {
        self.stage(Key::User(user.id), Value::User(user));
    }

    async fn history(&self, user: UserId) -> Result<UserHistory, CasinoError> {
        Ok(match self.get(&Key::UserHistory(user)).await? {
            Some(Value::UserHistory(history)) => history,
            _ => UserHistory::default(),
        })
    }

    /// Create the actor's user on first contact and keep name and handle current.
    ///
    /// Returns true if the user was just created.
    async fn touch_user(&mut self, actor: &Actor) -> Result<bool, CasinoError> {
        let name = antaria_types::casino::truncate_name(&actor.name);
        let handle = actor.handle.as_ref().map(|h| h.trim_start_matches('@').to_lowercase());
        let (mut user, is_new) = match load_user(self, actor.user).await? {
            Some(user) => (user, false),
            None => (User::new(actor.user, &name, self.now), true),
        };
        if !is_new && user.name == name && user.handle == handle {
            return Ok(false);
        }
        if let Some(old) = user.handle.as_ref().filter(|old| Some(*old) != handle.as_ref()) {
            self.stage_delete(Key::Handle(old.clone()));
        }
        if let Some(handle) = &handle {
            self.stage(Key::Handle(handle.clone()), Value::Handle(actor.user));
        }
        user.name = name;
        user.handle = handle;
        if is_new {
            info!(user = actor.user, name = %user.name, "registered user");
        }
        self.put_user(user);
        Ok(is_new)
    }

    /// Point-in-time balance read, including staged writes.
    pub async fn read_balance(&self, user: UserId) -> Result<u64, CasinoError> {
        Ok(self.user(user).await?.balance)
    }

    /// Remove funds, failing without side effects if the balance is short.
    pub async fn debit(
        &mut self,
        user: UserId,
        amount: u64,
        kind: TransactionKind,
        description: impl Into<String>,
    ) -> Result<User, CasinoError> {
        let mut account = self.user(user).await?;
        if amount == 0 {
            return Ok(account);
        }
        if account.balance < amount {
            return Err(CasinoError::InsufficientFunds {
                needed: amount,
                available: account.balance,
            });
        }
        let signed = i64::try_from(amount).map_err(|_| CasinoError::invalid_bet("amount too large"))?;
        account.balance -= amount;
        self.put_user(account.clone());
        self.append_transaction(user, -signed, kind, description.into())
            .await?;
        Ok(account)
    }

    /// Add funds. Always succeeds for an existing user.
    pub async fn credit(
        &mut self,
        user: UserId,
        amount: u64,
        kind: TransactionKind,
        description: impl Into<String>,
    ) -> Result<User, CasinoError> {
        let mut account = self.user(user).await?;
        if amount == 0 {
            return Ok(account);
        }
        let signed = i64::try_from(amount).map_err(|_| CasinoError::invalid_bet("amount too large"))?;
        account.balance = account
            .balance
            .checked_add(amount)
            .ok_or_else(|| CasinoError::invalid_bet("balance overflow"))?;
        self.put_user(account.clone());
        self.append_transaction(user, signed, kind, description.into())
            .await?;
        Ok(account)
    }

    async fn append_transaction(
        &mut self,
        user: UserId,
        amount: i64,
        kind: TransactionKind,
        description: String,
    ) -> Result<u64, CasinoError> {
        let mut global = self.global().await?;
        let id = global.next_transaction_id;
        global.next_transaction_id += 1;
        self.put_global(global);

        self.stage(
            Key::Transaction(id),
            Value::Transaction(Transaction {
                id,
                user,
                amount,
                kind,
                description,
                timestamp: self.now,
            }),
        );
        let mut history = self.history(user).await?;
        history.push_transaction(id);
        self.stage(Key::UserHistory(user), Value::UserHistory(history));
        Ok(id)
    }

    /// Move the house balance. It may go negative; the operator tops it up.
    async fn adjust_house(&mut self, delta: i64) -> Result<(), CasinoError> {
        if delta == 0 {
            return Ok(());
        }
        let mut global = self.global().await?;
        global.house_balance = global.house_balance.saturating_add(delta);
        if global.house_balance < 0 {
            warn!(house_balance = global.house_balance, delta, "house balance is negative");
        }
        self.put_global(global);
        Ok(())
    }

    /// Debit a stake that the house now holds.
    async fn stake_to_house(
        &mut self,
        user: UserId,
        amount: u64,
        description: impl Into<String>,
    ) -> Result<User, CasinoError> {
        let account = self
            .debit(user, amount, TransactionKind::Bet, description)
            .await?;
        self.adjust_house(amount as i64).await?;
        Ok(account)
    }

    /// Credit funds drawn from the house.
    async fn pay_from_house(
        &mut self,
        user: UserId,
        amount: u64,
        kind: TransactionKind,
        description: impl Into<String>,
    ) -> Result<User, CasinoError> {
        let account = self.credit(user, amount, kind, description).await?;
        self.adjust_house(-(amount as i64)).await?;
        Ok(account)
    }

    /// Turn a requested stake into cents and check the table limits.
    fn resolve_stake(&self, stake: Stake, balance: u64) -> Result<u64, CasinoError> {
        let amount = match stake {
            Stake::Amount(amount) => amount,
            Stake::All => balance,
        };
        if amount < self.config.min_bet {
            if stake == Stake::All {
                return Err(CasinoError::InsufficientFunds {
                    needed: self.config.min_bet,
                    available: balance,
                });
            }
            return Err(CasinoError::invalid_bet(format!(
                "minimum bet is {}",
                format_amount(self.config.min_bet)
            )));
        }
        if let Some(max) = self.config.max_bet {
            if amount > max {
                return Err(CasinoError::invalid_bet(format!(
                    "maximum bet is {}",
                    format_amount(max)
                )));
            }
        }
        Ok(amount)
    }

    /// Write the game record and fold a settled round into the user's stats.
    ///
    /// `returned` is everything credited back to the user for this round.
    #[allow(clippy::too_many_arguments)]
    async fn settle_round(
        &mut self,
        user: UserId,
        game: GameType,
        stake: u64,
        returned: u64,
        outcome: String,
        opponent: Option<UserId>,
        bonus: Option<Achievement>,
    ) -> Result<Vec<Event>, CasinoError> {
        let mut account = self.user(user).await?;
        let mut unlocked = account.record_round(stake, returned);
        if let Some(achievement) = bonus {
            if account.achievements.insert(achievement) {
                unlocked.push(achievement);
            }
        }
        self.put_user(account.clone());

        // Game record
        let mut global = self.global().await?;
        let id = global.next_game_id;
        global.next_game_id += 1;
        self.put_global(global);
        self.stage(
            Key::Game(id),
            Value::Game(GameRecord {
                id,
                user,
                game,
                stake,
                outcome: outcome.clone(),
                payout: returned,
                opponent,
                timestamp: self.now,
            }),
        );
        let mut history = self.history(user).await?;
        history.push_game(id);
        self.stage(Key::UserHistory(user), Value::UserHistory(history));

        // Leaderboard
        let mut leaderboard = match self.get(&Key::Leaderboard).await? {
            Some(Value::Leaderboard(leaderboard)) => leaderboard,
            _ => Leaderboard::default(),
        };
        leaderboard.update(user, account.name.clone(), account.total_wagered);
        self.stage(Key::Leaderboard, Value::Leaderboard(leaderboard));

        // Referral accrual, paid from the house on claim
        if let Some(referrer) = account.referred_by {
            let reward = apply_bps(stake, self.config.referral_rate_bps);
            if reward > 0 {
                if let Some(mut referrer) = load_user(self, referrer).await? {
                    referrer.unclaimed_referral = referrer.unclaimed_referral.saturating_add(reward);
                    self.put_user(referrer);
                }
            }
        }

        info!(user, %game, stake, returned, outcome = %outcome, "settled round");
        Ok(unlocked
            .into_iter()
            .map(|achievement| Event::AchievementUnlocked {
                user,
                name: account.name.clone(),
                achievement,
            })
            .collect())
    }
}

impl<'a, S: State> State for Layer<'a, S> {
    async fn get(&self, key: &Key) -> Result<Option<Value>> {
        Ok(match self.pending.get(key) {
            Some(Status::Update(value)) => Some(value.clone()),
            Some(Status::Delete) => None,
            None => self.state.get(key).await?,
        })
    }

    async fn insert(&mut self, key: Key, value: Value) -> Result<()> {
        self.stage(key, value);
        Ok(())
    }

    async fn delete(&mut self, key: &Key) -> Result<()> {
        self.stage_delete(key.clone());
        Ok(())
    }
}
