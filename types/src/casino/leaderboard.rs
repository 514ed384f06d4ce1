use serde::{Deserialize, Serialize};

use super::{LEADERBOARD_PAGE_SIZE, LEADERBOARD_SIZE};
use crate::execution::UserId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user: UserId,
    pub name: String,
    pub total_wagered: u64,
    pub rank: u32,
}

/// Top users ranked by total wagered.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leaderboard {
    pub entries: Vec<LeaderboardEntry>,
}

impl Leaderboard {
    pub fn update(&mut self, user: UserId, name: String, total_wagered: u64) {
        // Remove existing entry for this user
        self.entries.retain(|e| e.user != user);

        // Ties keep the earlier entry ahead
        let position = self
            .entries
            .partition_point(|e| e.total_wagered >= total_wagered);
        if position < LEADERBOARD_SIZE {
            self.entries.insert(
                position,
                LeaderboardEntry {
                    user,
                    name,
                    total_wagered,
                    rank: 0,
                },
            );
        }

        self.entries.truncate(LEADERBOARD_SIZE);
        for (i, entry) in self.entries.iter_mut().enumerate() {
            entry.rank = (i + 1) as u32;
        }
    }

    /// Number of pages, never less than one.
    pub fn pages(&self) -> usize {
        self.entries.len().div_ceil(LEADERBOARD_PAGE_SIZE).max(1)
    }

    /// Zero-indexed page, clamped to the last page.
    pub fn page(&self, page: usize) -> (usize, &[LeaderboardEntry]) {
        let page = page.min(self.pages() - 1);
        let start = page * LEADERBOARD_PAGE_SIZE;
        let end = (start + LEADERBOARD_PAGE_SIZE).min(self.entries.len());
        (page, &self.entries[start.min(end)..end])
    }

    pub fn rank_of(&self, user: UserId) -> Option<u32> {
        self.entries.iter().find(|e| e.user == user).map(|e| e.rank)
    }
}
