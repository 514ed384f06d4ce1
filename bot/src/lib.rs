//! Telegram front end for the antaria casino.
//!
//! The binary long-polls Telegram, turns each update into an [`router::Incoming`], and lets the
//! [`router::Router`] run it against the SQLite-backed ledger.

pub mod command;
pub mod config;
pub mod persistence;
pub mod render;
pub mod router;
pub mod telegram;

pub use config::{BotConfig, Config, ConfigError};
pub use persistence::SqliteStore;
pub use router::{Incoming, Input, ReplyTarget, Router};
