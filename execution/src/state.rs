use anyhow::Result;
use antaria_types::casino::{GlobalState, User};
use antaria_types::execution::{Key, UserId, Value};
use std::future::Future;

#[cfg(any(test, feature = "mocks"))]
use std::collections::HashMap;

/// Persistence boundary for the ledger.
///
/// Backends only need point reads and writes. [`State::apply`] is the commit point for a staged
/// [`crate::Layer`] and must be all-or-nothing; backends with real transactions override it.
pub trait State {
    fn get(&self, key: &Key) -> impl Future<Output = Result<Option<Value>>>;
    fn insert(&mut self, key: Key, value: Value) -> impl Future<Output = Result<()>>;
    fn delete(&mut self, key: &Key) -> impl Future<Output = Result<()>>;

    fn apply(&mut self, changes: Vec<(Key, Status)>) -> impl Future<Output = Result<()>> {
        async {
            for (key, status) in changes {
                match status {
                    Status::Update(value) => self.insert(key, value).await?,
                    Status::Delete => self.delete(&key).await?,
                }
            }
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "mocks"))]
#[derive(Default)]
pub struct Memory {
    state: HashMap<Key, Value>,
    unavailable: bool,
}

#[cfg(any(test, feature = "mocks"))]
impl Memory {
    /// Make every subsequent call fail, as an unreachable database would.
    pub fn set_unavailable(&mut self, unavailable: bool) {
        self.unavailable = unavailable;
    }

    pub fn users(&self) -> Vec<User> {
        let mut users: Vec<_> = self
            .state
            .values()
            .filter_map(|value| match value {
                Value::User(user) => Some(user.clone()),
                _ => None,
            })
            .collect();
        users.sort_by_key(|user| user.id);
        users
    }

    pub fn transactions(&self) -> Vec<antaria_types::casino::Transaction> {
        let mut transactions: Vec<_> = self
            .state
            .values()
            .filter_map(|value| match value {
                Value::Transaction(tx) => Some(tx.clone()),
                _ => None,
            })
            .collect();
        transactions.sort_by_key(|tx| tx.id);
        transactions
    }

    pub fn games(&self) -> Vec<antaria_types::casino::GameRecord> {
        let mut games: Vec<_> = self
            .state
            .values()
            .filter_map(|value| match value {
                Value::Game(game) => Some(game.clone()),
                _ => None,
            })
            .collect();
        games.sort_by_key(|game| game.id);
        games
    }

    pub fn global(&self) -> Option<GlobalState> {
        match self.state.get(&Key::GlobalState) {
            Some(Value::GlobalState(global)) => Some(global.clone()),
            _ => None,
        }
    }

    pub fn withdrawals(&self) -> Vec<antaria_types::casino::Withdrawal> {
        let mut withdrawals: Vec<_> = self
            .state
            .values()
            .filter_map(|value| match value {
                Value::Withdrawal(withdrawal) => Some(withdrawal.clone()),
                _ => None,
            })
            .collect();
        withdrawals.sort_by_key(|withdrawal| withdrawal.id);
        withdrawals
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.state.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    fn check(&self) -> Result<()> {
        if self.unavailable {
            anyhow::bail!("memory backend marked unavailable");
        }
        Ok(())
    }
}

#[cfg(any(test, feature = "mocks"))]
impl State for Memory {
    async fn get(&self, key: &Key) -> Result<Option<Value>> {
        self.check()?;
        Ok(self.state.get(key).cloned())
    }

    async fn insert(&mut self, key: Key, value: Value) -> Result<()> {
        self.check()?;
        self.state.insert(key, value);
        Ok(())
    }

    async fn delete(&mut self, key: &Key) -> Result<()> {
        self.check()?;
        self.state.remove(key);
        Ok(())
    }

    async fn apply(&mut self, changes: Vec<(Key, Status)>) -> Result<()> {
        self.check()?;
        for (key, status) in changes {
            match status {
                Status::Update(value) => {
                    self.state.insert(key, value);
                }
                Status::Delete => {
                    self.state.remove(&key);
                }
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[allow(clippy::large_enum_variant)]
pub enum Status {
    Update(Value),
    Delete,
}

pub async fn load_user<S: State>(state: &S, user: UserId) -> Result<Option<User>> {
    Ok(match state.get(&Key::User(user)).await? {
        Some(Value::User(user)) => Some(user),
        _ => None,
    })
}

pub async fn load_global<S: State>(state: &S, initial_house_balance: i64) -> Result<GlobalState> {
    Ok(match state.get(&Key::GlobalState).await? {
        Some(Value::GlobalState(global)) => global,
        _ => GlobalState::new(initial_house_balance),
    })
}

pub async fn resolve_handle<S: State>(state: &S, handle: &str) -> Result<Option<UserId>> {
    let handle = handle.trim_start_matches('@').to_lowercase();
    Ok(match state.get(&Key::Handle(handle)).await? {
        Some(Value::Handle(user)) => Some(user),
        _ => None,
    })
}
