use super::super::*;
use antaria_types::casino::{PendingTip, Withdrawal, WithdrawalStatus, MIN_CLAIM, TIP_CONFIRM_SECS};

impl<'a, S: State> Layer<'a, S> {
    pub(in crate::layer) async fn handle_register(
        &mut self,
        actor: &Actor,
        is_new: bool,
        referrer: Option<UserId>,
    ) -> Result<Vec<Event>, CasinoError> {
        let mut user = self.user(actor.user).await?;
        let mut referrer_name = None;

        // A referral only sticks to a fresh account that has never played.
        if let Some(referrer_id) = referrer {
            if referrer_id != actor.user && user.referred_by.is_none() && user.games_played == 0 {
                if let Some(mut referrer) = load_user(self, referrer_id).await? {
                    referrer.referral_count = referrer.referral_count.saturating_add(1);
                    referrer_name = Some(referrer.name.clone());
                    info!(user = actor.user, referrer = referrer_id, "recorded referral");
                    self.put_user(referrer);
                    user.referred_by = Some(referrer_id);
                    self.put_user(user.clone());
                }
            }
        }

        Ok(vec![Event::Welcome {
            user,
            new: is_new,
            referrer: referrer_name,
        }])
    }

    pub(in crate::layer) async fn handle_balance(
        &mut self,
        actor: &Actor,
    ) -> Result<Vec<Event>, CasinoError> {
        let user = self.user(actor.user).await?;
        Ok(vec![Event::Balance { user }])
    }

    pub(in crate::layer) async fn handle_stats(
        &mut self,
        actor: &Actor,
    ) -> Result<Vec<Event>, CasinoError> {
        let user = self.user(actor.user).await?;
        let rank = match self.get(&Key::Leaderboard).await? {
            Some(Value::Leaderboard(leaderboard)) => leaderboard.rank_of(actor.user),
            _ => None,
        };
        Ok(vec![Event::Stats { user, rank }])
    }

    pub(in crate::layer) async fn handle_history(
        &mut self,
        actor: &Actor,
    ) -> Result<Vec<Event>, CasinoError> {
        let user = self.user(actor.user).await?;
        let history = self.history(actor.user).await?;

        let mut games = Vec::with_capacity(history.games.len());
        for id in &history.games {
            if let Some(Value::Game(game)) = self.get(&Key::Game(*id)).await? {
                games.push(game);
            }
        }
        let mut transactions = Vec::with_capacity(history.transactions.len());
        for id in &history.transactions {
            if let Some(Value::Transaction(tx)) = self.get(&Key::Transaction(*id)).await? {
                transactions.push(tx);
            }
        }
        Ok(vec![Event::History {
            user,
            games,
            transactions,
        }])
    }

    pub(in crate::layer) async fn handle_leaderboard(
        &mut self,
        page: usize,
    ) -> Result<Vec<Event>, CasinoError> {
        let leaderboard = match self.get(&Key::Leaderboard).await? {
            Some(Value::Leaderboard(leaderboard)) => leaderboard,
            _ => Leaderboard::default(),
        };
        let (page, entries) = leaderboard.page(page);
        Ok(vec![Event::Leaderboard {
            page,
            pages: leaderboard.pages(),
            entries: entries.to_vec(),
        }])
    }

    pub(in crate::layer) async fn handle_house_balance(
        &mut self,
    ) -> Result<Vec<Event>, CasinoError> {
        let global = self.global().await?;
        Ok(vec![Event::HouseBalance {
            balance: global.house_balance,
        }])
    }

    pub(in crate::layer) async fn handle_referral(
        &mut self,
        actor: &Actor,
    ) -> Result<Vec<Event>, CasinoError> {
        let user = self.user(actor.user).await?;
        Ok(vec![Event::Referral { user }])
    }

    pub(in crate::layer) async fn handle_claim_bonus(
        &mut self,
        actor: &Actor,
    ) -> Result<Vec<Event>, CasinoError> {
        let user = self.user(actor.user).await?;
        let amount = apply_bps(user.wagered_since_withdrawal, self.config.bonus_rate_bps);
        if amount < MIN_CLAIM {
            return Err(CasinoError::NothingToClaim);
        }

        let mut user = self
            .pay_from_house(actor.user, amount, TransactionKind::Bonus, "Wager bonus")
            .await?;
        user.wagered_since_withdrawal = 0;
        self.put_user(user.clone());
        info!(user = actor.user, amount, "claimed bonus");

        Ok(vec![Event::BonusClaimed {
            amount,
            balance: user.balance,
        }])
    }

    pub(in crate::layer) async fn handle_claim_referral(
        &mut self,
        actor: &Actor,
    ) -> Result<Vec<Event>, CasinoError> {
        let user = self.user(actor.user).await?;
        let amount = user.unclaimed_referral;
        if amount < MIN_CLAIM {
            return Err(CasinoError::NothingToClaim);
        }

        let mut user = self
            .pay_from_house(
                actor.user,
                amount,
                TransactionKind::ReferralReward,
                "Referral earnings",
            )
            .await?;
        user.unclaimed_referral = 0;
        user.referral_earnings = user.referral_earnings.saturating_add(amount);
        self.put_user(user.clone());
        info!(user = actor.user, amount, "claimed referral earnings");

        Ok(vec![Event::ReferralClaimed {
            amount,
            balance: user.balance,
        }])
    }

    pub(in crate::layer) async fn handle_tip_request(
        &mut self,
        actor: &Actor,
        recipient: UserId,
        amount: u64,
    ) -> Result<Vec<Event>, CasinoError> {
        if recipient == actor.user {
            return Err(CasinoError::SelfAction);
        }
        if amount == 0 {
            return Err(CasinoError::invalid_bet("tip must be positive"));
        }
        let to = self.user(recipient).await?;
        let available = self.read_balance(actor.user).await?;
        if available < amount {
            return Err(CasinoError::InsufficientFunds {
                needed: amount,
                available,
            });
        }

        let mut global = self.global().await?;
        let tip = PendingTip {
            id: global.next_tip_id,
            chat: actor.chat,
            from: actor.user,
            to: recipient,
            to_name: to.name,
            amount,
            created_at: self.now,
        };
        global.next_tip_id += 1;
        global.pending_tips.insert(tip.id, tip.clone());
        self.put_global(global);
        debug!(from = actor.user, to = recipient, amount, id = tip.id, "staged tip");
        Ok(vec![Event::TipRequested { tip }])
    }

    /// Take a pending tip out of the global state. It can only be taken once.
    async fn take_pending_tip(
        &mut self,
        actor: &Actor,
        id: u64,
    ) -> Result<PendingTip, CasinoError> {
        let mut global = self.global().await?;
        let tip = match global.pending_tips.get(&id) {
            Some(tip) if tip.from != actor.user => return Err(CasinoError::Unauthorized),
            Some(tip) if !tip.is_expired(self.now, TIP_CONFIRM_SECS) => tip.clone(),
            _ => return Err(CasinoError::NoActiveSession),
        };
        global.pending_tips.remove(&id);
        self.put_global(global);
        Ok(tip)
    }

    pub(in crate::layer) async fn handle_tip_confirm(
        &mut self,
        actor: &Actor,
        id: u64,
    ) -> Result<Vec<Event>, CasinoError> {
        let tip = self.take_pending_tip(actor, id).await?;
        let from = self
            .debit(
                tip.from,
                tip.amount,
                TransactionKind::Tip,
                format!("Tip to {}", tip.to_name),
            )
            .await?;
        let to = self
            .credit(
                tip.to,
                tip.amount,
                TransactionKind::Tip,
                format!("Tip from {}", from.name),
            )
            .await?;
        info!(from = tip.from, to = tip.to, amount = tip.amount, id, "tipped");

        Ok(vec![Event::Tipped {
            from: tip.from,
            from_name: from.name,
            to: tip.to,
            to_name: to.name,
            amount: tip.amount,
        }])
    }

    pub(in crate::layer) async fn handle_tip_cancel(
        &mut self,
        actor: &Actor,
        id: u64,
    ) -> Result<Vec<Event>, CasinoError> {
        let tip = self.take_pending_tip(actor, id).await?;
        debug!(from = tip.from, id, "cancelled tip");
        Ok(vec![Event::TipCancelled { tip }])
    }

    /// Drop tip prompts nobody answered in time.
    pub(in crate::layer) async fn prune_pending_tips(&mut self) -> Result<(), CasinoError> {
        let mut global = self.global().await?;
        let before = global.pending_tips.len();
        let now = self.now;
        global
            .pending_tips
            .retain(|_, tip| !tip.is_expired(now, TIP_CONFIRM_SECS));
        if global.pending_tips.len() != before {
            self.put_global(global);
        }
        Ok(())
    }

    pub(in crate::layer) async fn handle_withdraw(
        &mut self,
        actor: &Actor,
        amount: Stake,
        address: &str,
    ) -> Result<Vec<Event>, CasinoError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(CasinoError::invalid_bet("a payout address is required"));
        }
        let balance = self.read_balance(actor.user).await?;
        let amount = match amount {
            Stake::Amount(amount) => amount,
            Stake::All => balance,
        };
        if amount < self.config.min_withdrawal {
            return Err(CasinoError::invalid_bet(format!(
                "minimum withdrawal is {}",
                format_amount(self.config.min_withdrawal)
            )));
        }

        let mut user = self
            .debit(
                actor.user,
                amount,
                TransactionKind::Withdrawal,
                format!("Withdrawal to {address}"),
            )
            .await?;
        user.wagered_since_withdrawal = 0;
        self.put_user(user.clone());

        let mut global = self.global().await?;
        let id = global.next_withdrawal_id;
        global.next_withdrawal_id += 1;
        global.pending_withdrawals.push(id);
        self.put_global(global);

        let withdrawal = Withdrawal {
            id,
            user: actor.user,
            amount,
            address: address.to_string(),
            status: WithdrawalStatus::Pending,
            requested_at: self.now,
            resolved_at: None,
        };
        self.stage(Key::Withdrawal(id), Value::Withdrawal(withdrawal.clone()));
        info!(user = actor.user, id, amount, "withdrawal requested");

        Ok(vec![Event::WithdrawalRequested {
            withdrawal,
            balance: user.balance,
        }])
    }
}
