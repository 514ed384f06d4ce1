use super::*;
use proptest::prelude::*;

#[test]
fn test_leaderboard_orders_and_reranks() {
    let mut leaderboard = Leaderboard::default();
    leaderboard.update(1, "alice".to_string(), 500);
    leaderboard.update(2, "bob".to_string(), 900);
    leaderboard.update(3, "carol".to_string(), 700);

    let order: Vec<_> = leaderboard.entries.iter().map(|e| e.user).collect();
    assert_eq!(order, vec![2, 3, 1]);
    let ranks: Vec<_> = leaderboard.entries.iter().map(|e| e.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3]);

    // Updating an existing user moves them without duplicating.
    leaderboard.update(1, "alice".to_string(), 1_000);
    assert_eq!(leaderboard.entries.len(), 3);
    assert_eq!(leaderboard.entries[0].user, 1);
    assert_eq!(leaderboard.rank_of(2), Some(2));
}

#[test]
fn test_leaderboard_truncates_and_pages() {
    let mut leaderboard = Leaderboard::default();
    for user in 0..(LEADERBOARD_SIZE as i64 + 5) {
        leaderboard.update(user, format!("user{user}"), (user as u64 + 1) * 10);
    }
    assert_eq!(leaderboard.entries.len(), LEADERBOARD_SIZE);
    assert_eq!(leaderboard.pages(), LEADERBOARD_SIZE / LEADERBOARD_PAGE_SIZE);

    // Lowest wagerers fell off.
    assert_eq!(leaderboard.rank_of(0), None);

    let (page, entries) = leaderboard.page(1);
    assert_eq!(page, 1);
    assert_eq!(entries.len(), LEADERBOARD_PAGE_SIZE);
    assert_eq!(entries[0].rank, 11);

    // Out-of-range pages clamp to the last page.
    let (page, _) = leaderboard.page(99);
    assert_eq!(page, leaderboard.pages() - 1);
}

#[test]
fn test_empty_leaderboard_has_one_page() {
    let leaderboard = Leaderboard::default();
    assert_eq!(leaderboard.pages(), 1);
    let (page, entries) = leaderboard.page(3);
    assert_eq!(page, 0);
    assert!(entries.is_empty());
}

#[test]
fn test_record_round_tracks_streaks_and_achievements() {
    let mut user = User::new(7, "dora", 0);

    let unlocked = user.record_round(100, 200);
    assert_eq!(unlocked, vec![Achievement::FirstWin]);
    assert_eq!(user.games_won, 1);
    assert_eq!(user.total_pnl, 100);

    for _ in 0..3 {
        assert!(user.record_round(100, 200).is_empty());
    }
    let unlocked = user.record_round(100, 200);
    assert_eq!(unlocked, vec![Achievement::HotStreak]);
    assert_eq!(user.best_win_streak, 5);

    // A push leaves the streak alone, a loss resets it.
    user.record_round(100, 100);
    assert_eq!(user.win_streak, 5);
    user.record_round(100, 0);
    assert_eq!(user.win_streak, 0);
    assert_eq!(user.best_win_streak, 5);
    assert_eq!(user.games_played, 7);
    assert_eq!(user.total_wagered, 700);
    assert!(user.validate_invariants().is_ok());
}

#[test]
fn test_high_roller_unlocks_once() {
    let mut user = User::new(1, "whale", 0);
    assert_eq!(
        user.record_round(HIGH_ROLLER_WAGERED, 0),
        vec![Achievement::HighRoller]
    );
    assert!(user.record_round(10, 0).is_empty());
    assert_eq!(user.achievements.len(), 1);
}

#[test]
fn test_achievements_iterate_in_declaration_order() {
    let mut achievements = Achievements::default();
    assert!(achievements.is_empty());
    assert!(achievements.insert(Achievement::Jackpot));
    assert!(achievements.insert(Achievement::FirstWin));
    assert!(!achievements.insert(Achievement::FirstWin));
    let all: Vec<_> = achievements.iter().collect();
    assert_eq!(all, vec![Achievement::FirstWin, Achievement::Jackpot]);
}

#[test]
fn test_truncate_name_respects_char_boundaries() {
    let long = "é".repeat(MAX_NAME_LENGTH);
    let truncated = truncate_name(&long);
    assert!(truncated.len() <= MAX_NAME_LENGTH);
    assert!(truncated.chars().all(|c| c == 'é'));
    assert_eq!(truncate_name("  bob  "), "bob");
}

#[test]
fn test_roulette_bet_validity() {
    assert!(RouletteBet::Straight(36).is_valid(true));
    assert!(RouletteBet::Straight(DOUBLE_ZERO).is_valid(true));
    assert!(!RouletteBet::Straight(DOUBLE_ZERO).is_valid(false));
    assert!(!RouletteBet::Straight(40).is_valid(true));
    assert!(RouletteBet::Dozen(3).is_valid(false));
    assert!(!RouletteBet::Dozen(0).is_valid(false));
}

#[test]
fn test_pocket_colors() {
    assert_eq!(pocket_color(0), PocketColor::Green);
    assert_eq!(pocket_color(DOUBLE_ZERO), PocketColor::Green);
    assert_eq!(pocket_color(1), PocketColor::Red);
    assert_eq!(pocket_color(2), PocketColor::Black);
    assert_eq!(pocket_label(DOUBLE_ZERO), "00");
}

#[test]
fn test_history_keeps_most_recent() {
    let mut history = UserHistory::default();
    for id in 1..=20 {
        history.push_game(id);
        history.push_transaction(id);
    }
    assert_eq!(history.games.len(), HISTORY_GAMES);
    assert_eq!(history.games.front(), Some(&20));
    assert_eq!(history.transactions.len(), HISTORY_TRANSACTIONS);
    assert_eq!(history.transactions.back(), Some(&11));
}

#[test]
fn test_pvp_session_expiry() {
    let session = PvpSession {
        id: 1,
        chat: -100,
        opener: 1,
        opener_name: "a".to_string(),
        game: PvpGame::Dice,
        stake: 100,
        call: None,
        opened_at: 1_000,
    };
    assert!(!session.is_expired(1_299, 300));
    assert!(session.is_expired(1_300, 300));
}

#[test]
fn test_ratio_profit() {
    assert_eq!(Ratio::new(3, 2).profit(100), 150);
    assert_eq!(Ratio::new(3, 2).profit(15), 22);
    assert_eq!(Ratio::new(1, 1).profit(15), 15);
    assert_eq!(Ratio::new(1, 0).profit(15), 0);
}

#[test]
fn test_default_config_is_valid() {
    let config = CasinoConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.roulette.pockets(), 38);
}

#[test]
fn test_config_yaml_fills_defaults() {
    let config: CasinoConfig = serde_yaml::from_str(
        "house_cut_bps: 500\nstake_matching: proportional\nroulette:\n  double_zero: false\nadmins: [42]\n",
    )
    .expect("parse config");
    assert_eq!(config.house_cut_bps, 500);
    assert_eq!(config.stake_matching, StakeMatching::Proportional);
    assert_eq!(config.roulette.pockets(), 37);
    assert_eq!(config.roulette.payouts.straight, 36);
    assert_eq!(config.pvp_timeout_secs, 300);
    assert!(config.is_admin(42));
    assert!(!config.is_admin(43));
}

#[test]
fn test_config_validation_errors() {
    let config = CasinoConfig {
        house_cut_bps: 10_001,
        ..CasinoConfig::default()
    };
    assert_eq!(
        config.validate(),
        Err(ConfigError::InvalidBps {
            field: "house_cut_bps",
            value: 10_001
        })
    );

    let config = CasinoConfig {
        dealer_stands_on: 22,
        ..CasinoConfig::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::OutOfRange {
            field: "dealer_stands_on",
            ..
        })
    ));

    let config = CasinoConfig {
        max_bet: Some(5),
        ..CasinoConfig::default()
    };
    assert_eq!(
        config.validate(),
        Err(ConfigError::BetLimits { min: 10, max: 5 })
    );

    let mut config = CasinoConfig::default();
    config.blackjack_natural_pays.denominator = 0;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidNonZero { .. })
    ));
}

#[test]
fn test_global_state_round_trips_through_json() {
    let mut global = GlobalState::new(1_000);
    global.pvp_sessions.insert(
        -42,
        PvpSession {
            id: 3,
            chat: -42,
            opener: 9,
            opener_name: "zed".to_string(),
            game: PvpGame::CoinFlip,
            stake: 250,
            call: Some(CoinSide::Tails),
            opened_at: 10,
        },
    );
    global.stickers.insert("win".to_string(), "file-id".to_string());
    let json = serde_json::to_string(&global).expect("encode");
    let decoded: GlobalState = serde_json::from_str(&json).expect("decode");
    assert_eq!(decoded, global);
}

proptest! {
    #[test]
    fn prop_leaderboard_stays_sorted(updates in proptest::collection::vec((0i64..80, 0u64..10_000), 0..200)) {
        let mut leaderboard = Leaderboard::default();
        for (user, wagered) in updates {
            leaderboard.update(user, format!("u{user}"), wagered);
        }
        prop_assert!(leaderboard.entries.len() <= LEADERBOARD_SIZE);
        for pair in leaderboard.entries.windows(2) {
            prop_assert!(pair[0].total_wagered >= pair[1].total_wagered);
            prop_assert_eq!(pair[0].rank + 1, pair[1].rank);
        }
    }
}
