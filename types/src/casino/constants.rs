/// Maximum stored length of a display name.
pub const MAX_NAME_LENGTH: usize = 64;

/// Games kept in a user's recent history.
pub const HISTORY_GAMES: usize = 15;

/// Transactions kept in a user's recent history.
pub const HISTORY_TRANSACTIONS: usize = 10;

/// Users kept on the wagering leaderboard.
pub const LEADERBOARD_SIZE: usize = 50;

/// Leaderboard entries rendered per page.
pub const LEADERBOARD_PAGE_SIZE: usize = 10;

/// Total wagered (cents) that unlocks the high roller achievement ($1,000).
pub const HIGH_ROLLER_WAGERED: u64 = 100_000;

/// Consecutive wins that unlock the hot streak achievement.
pub const HOT_STREAK_WINS: u32 = 5;

/// Lower bound for an admin-set PvP timeout.
pub const MIN_PVP_TIMEOUT_SECS: u64 = 10;

/// How long a tip prompt stays confirmable.
pub const TIP_CONFIRM_SECS: u64 = 300;

/// Smallest bonus or referral amount that can be claimed (one cent).
pub const MIN_CLAIM: u64 = 1;

/// Faces on a prediction die.
pub const DICE_FACES: u8 = 6;

/// Pocket number used for the American double zero.
pub const DOUBLE_ZERO: u8 = 37;

/// Red pockets on a standard wheel.
pub const RED_NUMBERS: [u8; 18] = [
    1, 3, 5, 7, 9, 12, 14, 16, 18, 19, 21, 23, 25, 27, 30, 32, 34, 36,
];

/// Sticker keys sent alongside results.
pub const STICKER_WIN: &str = "win";
pub const STICKER_LOSS: &str = "loss";
