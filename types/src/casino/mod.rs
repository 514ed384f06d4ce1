//! Casino domain types.
//!
//! Defines the user, ledger, session and configuration state shared by the execution layer and
//! the bot.

mod config;
mod constants;
mod economy;
mod game;
mod leaderboard;
mod player;
mod session;

pub use config::*;
pub use constants::*;
pub use economy::*;
pub use game::*;
pub use leaderboard::*;
pub use player::*;
pub use session::*;

#[cfg(test)]
mod tests;
