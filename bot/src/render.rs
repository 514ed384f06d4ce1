//! Chat rendering for ledger events and errors.
//!
//! Output is Telegram HTML: every user supplied string goes through [`escape`].

use antaria_execution::casino::{blackjack, cards::card_label, GameError};
use antaria_execution::CasinoError;
use antaria_types::casino::{
    pocket_color, pocket_label, BlackjackHand, BlackjackStage, CoinSide, PocketColor, PredictGame,
    PvpDraw, PvpGame, PvpSession, WithdrawalStatus,
};
use antaria_types::execution::{ChatId, Event, UserId};
use antaria_types::{format_amount, format_signed};

use crate::command::{BlackjackAction, Callback, ParseError};

pub const HELP: &str = "<b>Antaria Casino</b>

<b>Account</b>
/balance, /stats, /history, /lb [page], /housebal
/deposit, /withdraw &lt;amount&gt; &lt;address&gt;
/bonus, /referral, /claim, /tip &lt;amount&gt; [@user]

<b>House games</b>
/bj &lt;amount&gt;  blackjack
/roulette &lt;amount&gt; &lt;red|black|green|odd|even|low|high|1st|2nd|3rd|0-36|00&gt;
/predict &lt;amount&gt; &lt;faces&gt;  dice prediction
/flip &lt;amount&gt; &lt;heads|tails&gt;

<b>PvP</b>
/dice, /darts, /bball, /soccer, /bowling &lt;amount&gt;
/duel &lt;amount&gt; &lt;heads|tails&gt;
/accept [amount], /cancel

Amounts are in dollars: 5, 2.50, $1,000 or all.";

pub const RETRY_LATER: &str = "Something went wrong on our side. Please retry later.";

/// An inline keyboard button.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Button {
    pub text: String,
    pub callback: Callback,
}

impl Button {
    pub fn new(text: &str, callback: Callback) -> Self {
        Self {
            text: text.to_string(),
            callback,
        }
    }
}

/// Transport agnostic reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outgoing {
    Message {
        chat: ChatId,
        text: String,
        buttons: Vec<Vec<Button>>,
    },
    Sticker {
        chat: ChatId,
        file_id: String,
    },
    Answer {
        callback_id: String,
        text: Option<String>,
    },
}

impl Outgoing {
    pub fn text(chat: ChatId, text: impl Into<String>) -> Self {
        Outgoing::Message {
            chat,
            text: text.into(),
            buttons: Vec::new(),
        }
    }
}

pub fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn percent(bps: u64) -> String {
    format!("{}.{:02}%", bps / 100, bps % 100)
}

fn card_list(cards: &[u8]) -> String {
    cards.iter().map(|card| card_label(*card)).collect::<Vec<_>>().join(" ")
}

fn color_emoji(pocket: u8) -> &'static str {
    match pocket_color(pocket) {
        PocketColor::Red => "🔴",
        PocketColor::Black => "⚫",
        PocketColor::Green => "🟢",
    }
}

fn game_title(game: PvpGame) -> String {
    format!("{} {}", game.emoji(), game.name())
}

/// Render a batch of events for `viewer`. Achievements are folded into the message before them.
pub fn render_events(events: &[Event], viewer: UserId, chat: ChatId, now: u64) -> Vec<Outgoing> {
    let mut out: Vec<Outgoing> = Vec::new();
    let mut stickers = Vec::new();
    for event in events {
        if let Event::AchievementUnlocked {
            name, achievement, ..
        } = event
        {
            let line = format!(
                "🏅 {} unlocked <b>{}</b>!",
                escape(name),
                achievement.title()
            );
            match out.last_mut() {
                Some(Outgoing::Message { text, .. }) => {
                    text.push_str("\n\n");
                    text.push_str(&line);
                }
                _ => out.push(Outgoing::text(chat, line)),
            }
            continue;
        }
        let (text, buttons) = render_event(event, viewer, now);
        out.push(Outgoing::Message {
            chat,
            text,
            buttons,
        });
        let files: Vec<&String> = match event {
            Event::Roulette { sticker, .. } => sticker.iter().collect(),
            Event::PvpResolved { stickers: files, .. } => files.iter().collect(),
            _ => Vec::new(),
        };
        stickers.extend(files.into_iter().map(|file_id| Outgoing::Sticker {
            chat,
            file_id: file_id.clone(),
        }));
    }
    out.extend(stickers);
    out
}

fn render_event(event: &Event, viewer: UserId, now: u64) -> (String, Vec<Vec<Button>>) {
    let mut buttons = Vec::new();
    let text = match event {
        Event::Welcome {
            user,
            new,
            referrer,
        } => {
            let mut text = if *new {
                format!("Welcome, <b>{}</b>!", escape(&user.name))
            } else {
                format!("Welcome back, <b>{}</b>!", escape(&user.name))
            };
            if let Some(referrer) = referrer {
                text.push_str(&format!("\nYou were referred by {}.", escape(referrer)));
            }
            text.push_str(&format!("\nBalance: <b>{}</b>\n\n{HELP}", format_amount(user.balance)));
            text
        }
        Event::Balance { user } => format!(
            "💰 {}, your balance is <b>{}</b>.",
            escape(&user.name),
            format_amount(user.balance)
        ),
        Event::Stats { user, rank } => {
            let mut text = format!(
                "📊 <b>{}</b>\nGames: {} played, {} won ({})\nWagered: {}\nProfit: {}\nBest streak: {}",
                escape(&user.name),
                user.games_played,
                user.games_won,
                percent(user.win_rate_bps()),
                format_amount(user.total_wagered),
                format_signed(user.total_pnl),
                user.best_win_streak,
            );
            if let Some(rank) = rank {
                text.push_str(&format!("\nLeaderboard rank: #{rank}"));
            }
            if !user.achievements.is_empty() {
                let titles: Vec<_> = user.achievements.iter().map(|a| a.title()).collect();
                text.push_str(&format!("\nAchievements: {}", titles.join(", ")));
            }
            text
        }
        Event::History {
            user,
            games,
            transactions,
        } => {
            let mut text = format!("📜 <b>{}</b>", escape(&user.name));
            if games.is_empty() && transactions.is_empty() {
                text.push_str("\nNo activity yet.");
            }
            if !games.is_empty() {
                text.push_str("\n\n<b>Recent games</b>");
                for game in games {
                    text.push_str(&format!(
                        "\n• {} {}: {} ({})",
                        game.game,
                        format_amount(game.stake),
                        escape(&game.outcome),
                        format_signed(game.net())
                    ));
                }
            }
            if !transactions.is_empty() {
                text.push_str("\n\n<b>Recent transactions</b>");
                for tx in transactions {
                    text.push_str(&format!(
                        "\n• {} {} {}",
                        format_signed(tx.amount),
                        tx.kind,
                        escape(&tx.description)
                    ));
                }
            }
            text
        }
        Event::Leaderboard {
            page,
            pages,
            entries,
        } => {
            let mut text = format!("🏆 <b>Leaderboard</b> (page {}/{pages})", page + 1);
            if entries.is_empty() {
                text.push_str("\nNobody has wagered yet.");
            }
            for entry in entries {
                text.push_str(&format!(
                    "\n{}. {} {}",
                    entry.rank,
                    escape(&entry.name),
                    format_amount(entry.total_wagered)
                ));
            }
            let mut row = Vec::new();
            if *page > 0 {
                row.push(Button::new(
                    "◀ Prev",
                    Callback::Leaderboard {
                        owner: viewer,
                        page: page - 1,
                    },
                ));
            }
            if page + 1 < *pages {
                row.push(Button::new(
                    "Next ▶",
                    Callback::Leaderboard {
                        owner: viewer,
                        page: page + 1,
                    },
                ));
            }
            if !row.is_empty() {
                buttons.push(row);
            }
            text
        }
        Event::HouseBalance { balance } => {
            format!("🏦 House balance: <b>{}</b>", format_signed(*balance))
        }
        Event::Referral { user } => format!(
            "🤝 Invite friends with <code>/start ref_{}</code>\nReferrals: {}\nEarned: {}\nUnclaimed: {} (use /claim)",
            user.id,
            user.referral_count,
            format_amount(user.referral_earnings),
            format_amount(user.unclaimed_referral)
        ),

        Event::Blackjack {
            hand,
            payout,
            balance,
        } => {
            if payout.is_none() {
                buttons = blackjack_buttons(hand);
            }
            render_blackjack(hand, *payout, *balance)
        }
        Event::BlackjackForfeited { hand } => format!(
            "⌛ Blackjack hand forfeited after inactivity. {} stake lost.",
            format_amount(hand.stake)
        ),
        Event::Roulette {
            bet,
            stake,
            pocket,
            payout,
            balance,
            ..
        } => {
            let result = if *payout > 0 {
                format!("You win <b>{}</b>!", format_amount(*payout))
            } else {
                "You lose.".to_string()
            };
            format!(
                "🎡 The ball lands on {} <b>{} {}</b>\n{} on {bet}. {result}\nBalance: {}",
                color_emoji(*pocket),
                pocket_label(*pocket),
                pocket_color(*pocket),
                format_amount(*stake),
                format_amount(*balance)
            )
        }
        Event::Predict {
            game,
            picks,
            stake,
            roll,
            payout,
            balance,
        } => {
            let (headline, called) = match game {
                PredictGame::Dice => (
                    format!("🎲 Rolled <b>{roll}</b>"),
                    picks
                        .iter()
                        .map(|face| face.to_string())
                        .collect::<Vec<_>>()
                        .join(", "),
                ),
                PredictGame::Coin => (
                    format!(
                        "🪙 Landed <b>{}</b>",
                        CoinSide::from_index(*roll)
                    ),
                    picks
                        .first()
                        .map(|pick| CoinSide::from_index(*pick).to_string())
                        .unwrap_or_default(),
                ),
            };
            let result = if *payout > 0 {
                format!("You win <b>{}</b>!", format_amount(*payout))
            } else {
                "You lose.".to_string()
            };
            format!(
                "{headline}\n{} on {called}. {result}\nBalance: {}",
                format_amount(*stake),
                format_amount(*balance)
            )
        }

        Event::PvpOpened {
            session,
            expires_at,
        } => {
            buttons.push(vec![
                Button::new("✅ Accept", Callback::PvpAccept { session: session.id }),
                Button::new(
                    "✖ Cancel",
                    Callback::PvpCancel {
                        owner: session.opener,
                    },
                ),
            ]);
            let call = session
                .call
                .map(|call| format!(" (calls {call})"))
                .unwrap_or_default();
            format!(
                "{} <b>{}</b> opens a {} challenge for <b>{}</b>{call}.\nExpires in {}s. Press accept or send /accept.",
                session.game.emoji(),
                escape(&session.opener_name),
                session.game.name(),
                format_amount(session.stake),
                expires_at.saturating_sub(now)
            )
        }
        Event::PvpResolved {
            session,
            acceptor,
            acceptor_name,
            matched,
            draw,
            winner,
            payout,
            house_cut,
            refunded,
            ..
        } => {
            let opener = escape(&session.opener_name);
            let acceptor_name = escape(acceptor_name);
            let mut text = format!(
                "{} <b>{opener}</b> vs <b>{acceptor_name}</b> for {} each\n",
                game_title(session.game),
                format_amount(*matched)
            );
            match draw {
                PvpDraw::Rolls { opener: a, acceptor: b } => {
                    text.push_str(&format!("{opener} rolled {a}, {acceptor_name} rolled {b}\n"))
                }
                PvpDraw::Flip { call, result } => text.push_str(&format!(
                    "{opener} called {call}, the coin landed {result}\n"
                )),
            }
            match winner {
                Some(winner) => {
                    let name = if *winner == *acceptor {
                        &acceptor_name
                    } else {
                        &opener
                    };
                    text.push_str(&format!(
                        "🏆 <b>{name}</b> wins {} (house cut {})",
                        format_amount(*payout),
                        format_amount(*house_cut)
                    ));
                }
                None => text.push_str("🤝 Tie. Both stakes refunded."),
            }
            if *refunded > 0 {
                text.push_str(&format!(
                    "\n{opener} got {} of unmatched stake back.",
                    format_amount(*refunded)
                ));
            }
            text
        }
        Event::PvpCancelled { session } => format!(
            "{} challenge cancelled. {} refunded to {}.",
            game_title(session.game),
            format_amount(session.stake),
            escape(&session.opener_name)
        ),
        Event::PvpExpired { session } => expired(session),

        Event::BonusClaimed { amount, balance } => format!(
            "🎁 Bonus of <b>{}</b> claimed. Balance: {}",
            format_amount(*amount),
            format_amount(*balance)
        ),
        Event::ReferralClaimed { amount, balance } => format!(
            "🤝 Referral earnings of <b>{}</b> claimed. Balance: {}",
            format_amount(*amount),
            format_amount(*balance)
        ),
        Event::TipRequested { tip } => {
            buttons.push(vec![
                Button::new(
                    "✅ Confirm",
                    Callback::TipConfirm {
                        owner: tip.from,
                        tip: tip.id,
                    },
                ),
                Button::new(
                    "✖ Cancel",
                    Callback::TipCancel {
                        owner: tip.from,
                        tip: tip.id,
                    },
                ),
            ]);
            format!(
                "Send {} to {}?",
                format_amount(tip.amount),
                escape(&tip.to_name)
            )
        }
        Event::TipCancelled { .. } => "Tip cancelled.".to_string(),
        Event::Tipped {
            from_name,
            to_name,
            amount,
            ..
        } => format!(
            "💸 {} tipped {} <b>{}</b>.",
            escape(from_name),
            escape(to_name),
            format_amount(*amount)
        ),
        Event::WithdrawalRequested {
            withdrawal,
            balance,
        } => format!(
            "🏧 Withdrawal #{} of <b>{}</b> to <code>{}</code> is pending review.\nBalance: {}",
            withdrawal.id,
            format_amount(withdrawal.amount),
            escape(&withdrawal.address),
            format_amount(*balance)
        ),
        Event::WithdrawalResolved { withdrawal } => {
            let verdict = match withdrawal.status {
                WithdrawalStatus::Approved => "approved",
                WithdrawalStatus::Rejected => "rejected and refunded",
                WithdrawalStatus::Pending => "pending",
            };
            format!(
                "Withdrawal #{} of {} {verdict}.",
                withdrawal.id,
                format_amount(withdrawal.amount)
            )
        }
        Event::PendingWithdrawals { withdrawals } => {
            if withdrawals.is_empty() {
                "No pending withdrawals.".to_string()
            } else {
                let mut text = "<b>Pending withdrawals</b>".to_string();
                for withdrawal in withdrawals {
                    text.push_str(&format!(
                        "\n#{} user {} {} to <code>{}</code>",
                        withdrawal.id,
                        withdrawal.user,
                        format_amount(withdrawal.amount),
                        escape(&withdrawal.address)
                    ));
                }
                text
            }
        }
        Event::DepositCredited { user, amount } => format!(
            "💰 Deposit of <b>{}</b> credited to {}. New balance: {}",
            format_amount(*amount),
            escape(&user.name),
            format_amount(user.balance)
        ),
        Event::BalanceAdjusted { user, delta } => format!(
            "{} adjusted by {}. New balance: {}",
            escape(&user.name),
            format_signed(*delta),
            format_amount(user.balance)
        ),
        Event::StickerSaved { key } => format!("Sticker saved as <code>{}</code>.", escape(key)),
        Event::PvpTimeoutSet { secs } => format!("PvP challenges now expire after {secs}s."),
        Event::AchievementUnlocked {
            name, achievement, ..
        } => format!("🏅 {} unlocked <b>{}</b>!", escape(name), achievement.title()),
    };
    (text, buttons)
}

fn expired(session: &PvpSession) -> String {
    format!(
        "⌛ {} challenge from {} expired. {} refunded.",
        game_title(session.game),
        escape(&session.opener_name),
        format_amount(session.stake)
    )
}

fn render_blackjack(hand: &BlackjackHand, payout: Option<u64>, balance: u64) -> String {
    let (player, soft) = blackjack::hand_value(&hand.player);
    let player_total = if soft && player < 21 {
        format!("soft {player}")
    } else {
        player.to_string()
    };
    // The hole card stays hidden while the player acts.
    let dealer = if hand.stage == BlackjackStage::PlayerTurn {
        format!(
            "{} 🂠",
            hand.dealer.first().map(|card| card_label(*card)).unwrap_or_default()
        )
    } else {
        format!(
            "{} ({})",
            card_list(&hand.dealer),
            blackjack::hand_value(&hand.dealer).0
        )
    };
    let mut text = format!(
        "🃏 Blackjack for {}{}\nDealer: {dealer}\nYou: {} ({player_total})",
        format_amount(hand.stake),
        if hand.doubled { " (doubled)" } else { "" },
        card_list(&hand.player)
    );
    match (payout, hand.outcome) {
        (Some(payout), Some(outcome)) => {
            text.push_str(&format!(
                "\n<b>{}</b>. Returned {}.\nBalance: {}",
                outcome.describe(),
                format_amount(payout),
                format_amount(balance)
            ));
        }
        (Some(payout), None) => {
            text.push_str(&format!(
                "\nReturned {}.\nBalance: {}",
                format_amount(payout),
                format_amount(balance)
            ));
        }
        (None, _) => {}
    }
    text
}

fn blackjack_buttons(hand: &BlackjackHand) -> Vec<Vec<Button>> {
    let (owner, id) = (hand.user, hand.id);
    let button = |text: &str, action| {
        Button::new(
            text,
            Callback::Blackjack {
                owner,
                hand: id,
                action,
            },
        )
    };
    let mut rows = vec![vec![
        button("Hit", BlackjackAction::Hit),
        button("Stand", BlackjackAction::Stand),
    ]];
    if blackjack::first_action(hand) {
        rows.push(vec![
            button("Double", BlackjackAction::Double),
            button("Surrender", BlackjackAction::Surrender),
        ]);
    }
    rows
}

/// Message for a rejected instruction. Storage failures get a generic retry note.
pub fn render_error(err: &CasinoError) -> String {
    match err {
        CasinoError::InsufficientFunds { needed, available } => format!(
            "Insufficient funds: you need {} but have {}.",
            format_amount(*needed),
            format_amount(*available)
        ),
        CasinoError::SessionAlreadyActive => {
            "A game is already running. Finish it first.".to_string()
        }
        CasinoError::InvalidBet(reason) => format!("Invalid bet: {}.", escape(reason)),
        CasinoError::StorageUnavailable(_) => RETRY_LATER.to_string(),
        CasinoError::NoActiveSession => "Nothing is waiting on that anymore.".to_string(),
        CasinoError::InvalidMove(GameError::InvalidMove) => {
            "That move is not allowed right now.".to_string()
        }
        CasinoError::InvalidMove(err) => format!("Invalid move: {err}."),
        CasinoError::Unauthorized => "You are not allowed to do that.".to_string(),
        CasinoError::UserNotFound => "That user has not played yet.".to_string(),
        CasinoError::SelfAction => "You cannot do that to yourself.".to_string(),
        CasinoError::NothingToClaim => "Nothing to claim yet.".to_string(),
        CasinoError::WithdrawalNotFound => {
            "No pending withdrawal with that id.".to_string()
        }
    }
}

pub fn render_parse_error(err: &ParseError) -> String {
    match err {
        ParseError::Usage(usage) => format!("Usage: {}", escape(usage)),
        ParseError::InvalidAmount(raw) => format!(
            "Invalid bet: {} is not an amount. Use dollars with at most two decimals.",
            escape(raw)
        ),
        ParseError::UnknownBet(raw) => format!("Invalid bet: unknown bet {}.", escape(raw)),
        ParseError::InvalidNumber(raw) => format!("{} is not a number.", escape(raw)),
        ParseError::MalformedCallback => "This button has expired.".to_string(),
    }
}
