use crate::casino::GameError;
use thiserror::Error;

/// Why an instruction was rejected. Any error discards the whole staged unit.
#[derive(Debug, Error)]
pub enum CasinoError {
    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: u64, available: u64 },
    #[error("a session is already active")]
    SessionAlreadyActive,
    #[error("invalid bet: {0}")]
    InvalidBet(String),
    #[error("storage unavailable")]
    StorageUnavailable(#[source] anyhow::Error),
    #[error("no active session")]
    NoActiveSession,
    #[error("invalid move: {0}")]
    InvalidMove(#[from] GameError),
    #[error("not authorized")]
    Unauthorized,
    #[error("user not found")]
    UserNotFound,
    #[error("cannot target yourself")]
    SelfAction,
    #[error("nothing to claim")]
    NothingToClaim,
    #[error("withdrawal not found or already resolved")]
    WithdrawalNotFound,
}

impl CasinoError {
    pub fn invalid_bet(reason: impl Into<String>) -> Self {
        CasinoError::InvalidBet(reason.into())
    }

    /// Errors the user caused, as opposed to infrastructure failures.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, CasinoError::StorageUnavailable(_))
    }
}

impl From<anyhow::Error> for CasinoError {
    fn from(err: anyhow::Error) -> Self {
        CasinoError::StorageUnavailable(err)
    }
}
