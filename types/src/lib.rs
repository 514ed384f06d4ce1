//! Shared data model for the antaria casino bot.
//!
//! Everything here is plain serde data: the ledger entities persisted by the store, the
//! instructions the router hands to the execution layer, and the events it hands back.

pub mod casino;
pub mod execution;

pub use execution::{Actor, ChatId, Event, Instruction, Key, UserId, Value};

/// Number of basis points in one whole.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Apply a basis-point rate to an amount, rounding down.
pub fn apply_bps(amount: u64, bps: u16) -> u64 {
    ((amount as u128) * (bps as u128) / (BPS_DENOMINATOR as u128)) as u64
}

/// Render cents as dollars, e.g. `$1,234.05`.
pub fn format_amount(cents: u64) -> String {
    let dollars = (cents / 100).to_string();
    let mut grouped = String::with_capacity(dollars.len() + dollars.len() / 3);
    for (i, digit) in dollars.chars().enumerate() {
        if i > 0 && (dollars.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    format!("${grouped}.{:02}", cents % 100)
}

/// Signed variant of [`format_amount`].
pub fn format_signed(cents: i64) -> String {
    let magnitude = format_amount(cents.unsigned_abs());
    if cents < 0 {
        format!("-{magnitude}")
    } else {
        magnitude
    }
}
