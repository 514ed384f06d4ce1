use super::super::*;
use antaria_types::casino::{WithdrawalStatus, MIN_PVP_TIMEOUT_SECS};

impl<'a, S: State> Layer<'a, S> {
    // Admin balance changes move money into or out of the system, never through the house.

    /// Credit an approved external deposit.
    pub(in crate::layer) async fn handle_admin_deposit(
        &mut self,
        target: UserId,
        amount: u64,
    ) -> Result<Vec<Event>, CasinoError> {
        if amount == 0 {
            return Err(CasinoError::invalid_bet("deposit must be positive"));
        }
        let user = self
            .credit(target, amount, TransactionKind::Deposit, "Deposit")
            .await?;
        info!(target, amount, "credited deposit");
        Ok(vec![Event::DepositCredited { user, amount }])
    }

    pub(in crate::layer) async fn handle_admin_adjust(
        &mut self,
        target: UserId,
        amount: i64,
    ) -> Result<Vec<Event>, CasinoError> {
        let magnitude = amount.unsigned_abs();
        let user = if amount >= 0 {
            self.credit(target, magnitude, TransactionKind::AdminAdjust, "Admin credit")
                .await?
        } else {
            self.debit(target, magnitude, TransactionKind::AdminAdjust, "Admin debit")
                .await?
        };
        info!(target, amount, "admin adjusted balance");
        Ok(vec![Event::BalanceAdjusted {
            user,
            delta: amount,
        }])
    }

    pub(in crate::layer) async fn handle_admin_set_balance(
        &mut self,
        target: UserId,
        balance: u64,
    ) -> Result<Vec<Event>, CasinoError> {
        let current = self.read_balance(target).await?;
        let delta = balance as i128 - current as i128;
        let delta = i64::try_from(delta).map_err(|_| CasinoError::invalid_bet("balance too large"))?;
        self.handle_admin_adjust(target, delta).await
    }

    pub(in crate::layer) async fn handle_pending_withdrawals(
        &mut self,
    ) -> Result<Vec<Event>, CasinoError> {
        let global = self.global().await?;
        let mut withdrawals = Vec::with_capacity(global.pending_withdrawals.len());
        for id in &global.pending_withdrawals {
            if let Some(Value::Withdrawal(withdrawal)) = self.get(&Key::Withdrawal(*id)).await? {
                withdrawals.push(withdrawal);
            }
        }
        Ok(vec![Event::PendingWithdrawals { withdrawals }])
    }

    pub(in crate::layer) async fn handle_resolve_withdrawal(
        &mut self,
        id: u64,
        approve: bool,
    ) -> Result<Vec<Event>, CasinoError> {
        let mut global = self.global().await?;
        let Some(position) = global.pending_withdrawals.iter().position(|w| *w == id) else {
            return Err(CasinoError::WithdrawalNotFound);
        };
        let mut withdrawal = match self.get(&Key::Withdrawal(id)).await? {
            Some(Value::Withdrawal(withdrawal)) if withdrawal.status == WithdrawalStatus::Pending => {
                withdrawal
            }
            _ => return Err(CasinoError::WithdrawalNotFound),
        };
        global.pending_withdrawals.remove(position);
        self.put_global(global);

        withdrawal.resolved_at = Some(self.now);
        if approve {
            withdrawal.status = WithdrawalStatus::Approved;
        } else {
            withdrawal.status = WithdrawalStatus::Rejected;
            self.credit(
                withdrawal.user,
                withdrawal.amount,
                TransactionKind::Refund,
                format!("Withdrawal #{id} rejected"),
            )
            .await?;
        }
        self.stage(Key::Withdrawal(id), Value::Withdrawal(withdrawal.clone()));
        info!(id, approve, amount = withdrawal.amount, "resolved withdrawal");

        Ok(vec![Event::WithdrawalResolved { withdrawal }])
    }

    pub(in crate::layer) async fn handle_save_sticker(
        &mut self,
        key: &str,
        file_id: &str,
    ) -> Result<Vec<Event>, CasinoError> {
        let key = key.trim().to_lowercase();
        if key.is_empty() || file_id.is_empty() {
            return Err(CasinoError::invalid_bet("sticker key and file are required"));
        }
        let mut global = self.global().await?;
        global.stickers.insert(key.clone(), file_id.to_string());
        self.put_global(global);
        Ok(vec![Event::StickerSaved { key }])
    }

    pub(in crate::layer) async fn handle_set_pvp_timeout(
        &mut self,
        secs: u64,
    ) -> Result<Vec<Event>, CasinoError> {
        if secs < MIN_PVP_TIMEOUT_SECS {
            return Err(CasinoError::invalid_bet(format!(
                "timeout must be at least {MIN_PVP_TIMEOUT_SECS} seconds"
            )));
        }
        let mut global = self.global().await?;
        global.pvp_timeout_secs = Some(secs);
        self.put_global(global);
        info!(secs, "set pvp timeout");
        Ok(vec![Event::PvpTimeoutSet { secs }])
    }
}
