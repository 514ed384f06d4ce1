//! Test fixtures for driving the ledger against an in-memory backend.

use crate::{casino::GameRng, execute, CasinoError, Memory};
use antaria_types::casino::CasinoConfig;
use antaria_types::execution::{Actor, ChatId, Event, Instruction, UserId};

/// User id granted admin rights by [`create_config`].
pub const ADMIN: UserId = 1;

/// Chat used by [`create_actor`].
pub const CHAT: ChatId = -100;

/// Default config with [`ADMIN`] as the only admin.
pub fn create_config() -> CasinoConfig {
    CasinoConfig {
        admins: vec![ADMIN],
        ..CasinoConfig::default()
    }
}

pub fn create_actor(user: UserId, name: &str) -> Actor {
    Actor {
        user,
        name: name.to_string(),
        handle: Some(name.to_lowercase()),
        chat: CHAT,
    }
}

pub fn create_rng(seed: u64) -> GameRng {
    GameRng::from_seed(seed)
}

/// Harness bundling a backend with its config, rng and a settable clock.
pub struct Casino {
    pub state: Memory,
    pub config: CasinoConfig,
    pub rng: GameRng,
    pub now: u64,
}

impl Casino {
    pub fn new(seed: u64) -> Self {
        Self::with_config(create_config(), seed)
    }

    pub fn with_config(config: CasinoConfig, seed: u64) -> Self {
        Self {
            state: Memory::default(),
            config,
            rng: create_rng(seed),
            now: 1_000,
        }
    }

    pub async fn run(
        &mut self,
        actor: &Actor,
        instruction: Instruction,
    ) -> Result<Vec<Event>, CasinoError> {
        execute(
            &mut self.state,
            &self.config,
            &mut self.rng,
            self.now,
            actor,
            &instruction,
        )
        .await
    }

    pub async fn sweep(&mut self) -> Result<Vec<Event>, CasinoError> {
        crate::sweep(&mut self.state, &self.config, &mut self.rng, self.now).await
    }

    /// Register `user` and fund it through an admin adjustment.
    pub async fn fund(&mut self, user: UserId, name: &str, amount: u64) -> Actor {
        let actor = create_actor(user, name);
        let admin = create_actor(ADMIN, "admin");
        self.run(&actor, Instruction::Register { referrer: None })
            .await
            .expect("register");
        if amount > 0 {
            self.run(
                &admin,
                Instruction::AdminAdjust {
                    target: user,
                    amount: amount as i64,
                },
            )
            .await
            .expect("fund");
        }
        actor
    }

    /// Request a tip and confirm it straight away.
    pub async fn tip(
        &mut self,
        from: &Actor,
        recipient: UserId,
        amount: u64,
    ) -> Result<Vec<Event>, CasinoError> {
        let events = self
            .run(from, Instruction::TipRequest { recipient, amount })
            .await?;
        let id = match events.first() {
            Some(Event::TipRequested { tip }) => tip.id,
            _ => return Ok(events),
        };
        self.run(from, Instruction::TipConfirm { id }).await
    }

    pub fn balance(&self, user: UserId) -> u64 {
        self.state
            .users()
            .into_iter()
            .find(|u| u.id == user)
            .map(|u| u.balance)
            .unwrap_or(0)
    }

    pub fn house(&self) -> i64 {
        self.state
            .global()
            .map(|global| global.house_balance)
            .unwrap_or(self.config.initial_house_balance)
    }

    /// Users, house and PvP escrow together. Constant across every game instruction.
    pub fn total_money(&self) -> i128 {
        let users: i128 = self.state.users().iter().map(|u| u.balance as i128).sum();
        let escrow = self.state.global().map(|g| g.escrow()).unwrap_or(0) as i128;
        users + self.house() as i128 + escrow
    }
}
