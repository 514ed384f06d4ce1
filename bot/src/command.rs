//! Chat command and button payload parsing.
//!
//! Text commands map onto a closed [`Command`] enum and button presses onto [`Callback`]. Anything
//! that is not a slash command parses to `None` and is ignored.

use antaria_types::casino::{CoinSide, PvpGame, RouletteBet, Stake, DOUBLE_ZERO};
use antaria_types::execution::UserId;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("unknown bet: {0}")]
    UnknownBet(String),
    #[error("invalid number: {0}")]
    InvalidNumber(String),
    #[error("malformed button")]
    MalformedCallback,
}

/// Who a tip or admin command targets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Recipient {
    Id(UserId),
    Handle(String),
    /// The author of the message being replied to.
    Reply,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Start { referrer: Option<UserId> },
    Help,
    Balance,
    Stats,
    History,
    /// One-based page as typed by the user.
    Leaderboard { page: usize },
    HouseBalance,
    Referral,
    Deposit,

    Blackjack { stake: Stake },
    Hit,
    Stand,
    Double,
    Surrender,

    Roulette { stake: Stake, bet: RouletteBet },
    PredictDice { stake: Stake, picks: Vec<u8> },
    Flip { stake: Stake, side: CoinSide },

    Challenge { game: PvpGame, stake: Stake, call: Option<CoinSide> },
    Accept { stake: Option<Stake> },
    Cancel,

    Bonus,
    ClaimReferral,
    Tip { amount: u64, recipient: Recipient },
    Withdraw { amount: Stake, address: String },

    ApproveDeposit { target: Recipient, amount: u64 },
    GiveBalance { target: Recipient, amount: i64 },
    SetBalance { target: Recipient, balance: u64 },
    Withdrawals,
    ResolveWithdrawal { id: u64, approve: bool },
    SaveSticker { key: String },
    SetTimeout { secs: u64 },
}

impl Command {
    /// Parse a message. Returns `Ok(None)` for text that is not one of our commands.
    pub fn parse(text: &str) -> Result<Option<Self>, ParseError> {
        let mut words = text.split_whitespace();
        let Some(head) = words.next() else {
            return Ok(None);
        };
        let Some(name) = head.strip_prefix('/') else {
            return Ok(None);
        };
        // "/bj@SomeBot" in groups
        let name = name.split('@').next().unwrap_or_default().to_lowercase();
        let args: Vec<&str> = words.collect();

        let command = match name.as_str() {
            "start" => Command::Start {
                referrer: args
                    .first()
                    .and_then(|payload| payload.strip_prefix("ref_"))
                    .and_then(|id| id.parse().ok()),
            },
            "help" => Command::Help,
            "balance" | "bal" => Command::Balance,
            "stats" => Command::Stats,
            "history" => Command::History,
            "leaderboard" | "lb" | "global" => Command::Leaderboard {
                page: match args.first() {
                    Some(page) => parse_number::<usize>(page)?.max(1),
                    None => 1,
                },
            },
            "housebal" | "house" => Command::HouseBalance,
            "referral" | "ref" => Command::Referral,
            "deposit" => Command::Deposit,

            "blackjack" | "bj" => Command::Blackjack {
                stake: parse_amount(required(&args, 0, "/bj <amount>")?)?,
            },
            "hit" => Command::Hit,
            "stand" => Command::Stand,
            "double" => Command::Double,
            "surrender" => Command::Surrender,

            "roulette" | "roul" => {
                const USAGE: &str = "/roulette <amount> <red|black|green|odd|even|low|high|1st|2nd|3rd|0-36|00>";
                let first = required(&args, 0, USAGE)?;
                let second = required(&args, 1, USAGE)?;
                // Either order works: "/roulette 10 red" or "/roulette red 10".
                let (stake, bet) = match parse_amount(first) {
                    Ok(stake) => (stake, parse_roulette_bet(second)?),
                    Err(_) => (parse_amount(second)?, parse_roulette_bet(first)?),
                };
                Command::Roulette { stake, bet }
            }
            "predict" => {
                const USAGE: &str = "/predict <amount> <faces 1-6>";
                let stake = parse_amount(required(&args, 0, USAGE)?)?;
                let mut picks = Vec::new();
                for word in &args[1..] {
                    for face in word.split(',').filter(|face| !face.is_empty()) {
                        picks.push(parse_number::<u8>(face)?);
                    }
                }
                if picks.is_empty() {
                    return Err(ParseError::Usage(USAGE));
                }
                Command::PredictDice { stake, picks }
            }
            "flip" | "coinflip" => {
                const USAGE: &str = "/flip <amount> <heads|tails>";
                Command::Flip {
                    stake: parse_amount(required(&args, 0, USAGE)?)?,
                    side: parse_side(required(&args, 1, USAGE)?)?,
                }
            }

            "dice" => challenge(PvpGame::Dice, &args, "/dice <amount>")?,
            "darts" => challenge(PvpGame::Darts, &args, "/darts <amount>")?,
            "basketball" | "bball" => challenge(PvpGame::Basketball, &args, "/bball <amount>")?,
            "soccer" | "football" => challenge(PvpGame::Soccer, &args, "/soccer <amount>")?,
            "bowling" => challenge(PvpGame::Bowling, &args, "/bowling <amount>")?,
            "duel" => {
                const USAGE: &str = "/duel <amount> <heads|tails>";
                Command::Challenge {
                    game: PvpGame::CoinFlip,
                    stake: parse_amount(required(&args, 0, USAGE)?)?,
                    call: Some(parse_side(required(&args, 1, USAGE)?)?),
                }
            }
            "accept" => Command::Accept {
                stake: args.first().map(|amount| parse_amount(amount)).transpose()?,
            },
            "cancel" => Command::Cancel,

            "bonus" => Command::Bonus,
            "claim" => Command::ClaimReferral,
            "tip" => {
                const USAGE: &str = "/tip <amount> [@user] (or reply to their message)";
                let amount = parse_cents(required(&args, 0, USAGE)?)?;
                let recipient = match args.get(1) {
                    Some(target) => parse_recipient(target)?,
                    None => Recipient::Reply,
                };
                Command::Tip { amount, recipient }
            }
            "withdraw" => {
                const USAGE: &str = "/withdraw <amount> <address>";
                Command::Withdraw {
                    amount: parse_amount(required(&args, 0, USAGE)?)?,
                    address: required(&args, 1, USAGE)?.to_string(),
                }
            }

            "approvedeposit" | "deposited" => {
                const USAGE: &str =
                    "/approvedeposit <@user|id> <amount> (or reply with /approvedeposit <amount>)";
                let (target, amount) = targeted(&args, USAGE)?;
                Command::ApproveDeposit {
                    target,
                    amount: parse_cents(amount)?,
                }
            }
            "givebal" => {
                const USAGE: &str = "/givebal <@user|id> <amount> (or reply with /givebal <amount>)";
                let (target, amount) = targeted(&args, USAGE)?;
                Command::GiveBalance {
                    target,
                    amount: parse_signed_cents(amount)?,
                }
            }
            "setbal" => {
                const USAGE: &str = "/setbal <@user|id> <amount> (or reply with /setbal <amount>)";
                let (target, amount) = targeted(&args, USAGE)?;
                Command::SetBalance {
                    target,
                    balance: parse_cents(amount)?,
                }
            }
            "withdrawals" => Command::Withdrawals,
            "approve" => Command::ResolveWithdrawal {
                id: parse_number(required(&args, 0, "/approve <id>")?)?,
                approve: true,
            },
            "reject" => Command::ResolveWithdrawal {
                id: parse_number(required(&args, 0, "/reject <id>")?)?,
                approve: false,
            },
            "savesticker" => Command::SaveSticker {
                key: required(&args, 0, "/savesticker <key> (reply to a sticker)")?.to_lowercase(),
            },
            "settimeout" => Command::SetTimeout {
                secs: parse_number(required(&args, 0, "/settimeout <seconds>")?)?,
            },
            _ => return Ok(None),
        };
        Ok(Some(command))
    }
}

fn required<'a>(args: &[&'a str], index: usize, usage: &'static str) -> Result<&'a str, ParseError> {
    args.get(index).copied().ok_or(ParseError::Usage(usage))
}

fn challenge(game: PvpGame, args: &[&str], usage: &'static str) -> Result<Command, ParseError> {
    Ok(Command::Challenge {
        game,
        stake: parse_amount(required(args, 0, usage)?)?,
        call: None,
    })
}

/// `<target> <amount>`, or just `<amount>` when replying to the target.
fn targeted<'a>(
    args: &[&'a str],
    usage: &'static str,
) -> Result<(Recipient, &'a str), ParseError> {
    match args {
        [amount] => Ok((Recipient::Reply, *amount)),
        [target, amount, ..] => Ok((parse_recipient(target)?, *amount)),
        [] => Err(ParseError::Usage(usage)),
    }
}

fn parse_number<T: std::str::FromStr>(raw: &str) -> Result<T, ParseError> {
    raw.parse()
        .map_err(|_| ParseError::InvalidNumber(raw.to_string()))
}

pub fn parse_recipient(raw: &str) -> Result<Recipient, ParseError> {
    if let Some(handle) = raw.strip_prefix('@') {
        if handle.is_empty() {
            return Err(ParseError::Usage("@handle"));
        }
        return Ok(Recipient::Handle(handle.to_lowercase()));
    }
    Ok(Recipient::Id(parse_number(raw)?))
}

pub fn parse_side(raw: &str) -> Result<CoinSide, ParseError> {
    match raw.to_lowercase().as_str() {
        "heads" | "head" | "h" => Ok(CoinSide::Heads),
        "tails" | "tail" | "t" => Ok(CoinSide::Tails),
        _ => Err(ParseError::UnknownBet(raw.to_string())),
    }
}

pub fn parse_roulette_bet(raw: &str) -> Result<RouletteBet, ParseError> {
    let bet = match raw.to_lowercase().as_str() {
        "red" | "r" => RouletteBet::Red,
        "black" | "b" => RouletteBet::Black,
        "green" | "g" => RouletteBet::Green,
        "odd" => RouletteBet::Odd,
        "even" => RouletteBet::Even,
        "low" | "1-18" => RouletteBet::Low,
        "high" | "19-36" => RouletteBet::High,
        "1st" | "dozen1" | "1-12" => RouletteBet::Dozen(1),
        "2nd" | "dozen2" | "13-24" => RouletteBet::Dozen(2),
        "3rd" | "dozen3" | "25-36" => RouletteBet::Dozen(3),
        "00" => RouletteBet::Straight(DOUBLE_ZERO),
        other => match other.parse::<u8>() {
            Ok(pocket) if pocket <= 36 => RouletteBet::Straight(pocket),
            _ => return Err(ParseError::UnknownBet(raw.to_string())),
        },
    };
    Ok(bet)
}

/// Parse a stake: `12.50`, `$12.5`, `1,000` or `all`/`max`.
pub fn parse_amount(raw: &str) -> Result<Stake, ParseError> {
    match raw.to_lowercase().as_str() {
        "all" | "max" | "allin" => Ok(Stake::All),
        _ => parse_cents(raw).map(Stake::Amount),
    }
}

/// Parse a positive dollar amount into cents. At most two decimals.
pub fn parse_cents(raw: &str) -> Result<u64, ParseError> {
    let invalid = || ParseError::InvalidAmount(raw.to_string());
    let cleaned: String = raw
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    let (whole, fraction) = match cleaned.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (cleaned.as_str(), ""),
    };
    if (whole.is_empty() && fraction.is_empty())
        || fraction.len() > 2
        || !whole.chars().all(|c| c.is_ascii_digit())
        || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }
    let dollars: u64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };
    let cents: u64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<u64>().map_err(|_| invalid())? * 10,
        _ => fraction.parse().map_err(|_| invalid())?,
    };
    let total = dollars
        .checked_mul(100)
        .and_then(|total| total.checked_add(cents))
        .ok_or_else(invalid)?;
    if total == 0 {
        return Err(invalid());
    }
    Ok(total)
}

fn parse_signed_cents(raw: &str) -> Result<i64, ParseError> {
    let (negative, magnitude) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let cents = i64::try_from(parse_cents(magnitude)?)
        .map_err(|_| ParseError::InvalidAmount(raw.to_string()))?;
    Ok(if negative { -cents } else { cents })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlackjackAction {
    Hit,
    Stand,
    Double,
    Surrender,
}

impl BlackjackAction {
    fn as_str(self) -> &'static str {
        match self {
            BlackjackAction::Hit => "hit",
            BlackjackAction::Stand => "stand",
            BlackjackAction::Double => "double",
            BlackjackAction::Surrender => "surrender",
        }
    }
}

/// Inline button payloads. Buttons that belong to one player carry the owner's id, and buttons
/// that act on a hand, challenge or tip carry its id so they go stale with it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Callback {
    Blackjack { owner: UserId, hand: u64, action: BlackjackAction },
    /// Zero-based page.
    Leaderboard { owner: UserId, page: usize },
    PvpAccept { session: u64 },
    PvpCancel { owner: UserId },
    TipConfirm { owner: UserId, tip: u64 },
    TipCancel { owner: UserId, tip: u64 },
}

impl Callback {
    /// The only user allowed to press this button, if any.
    pub fn owner(&self) -> Option<UserId> {
        match self {
            Callback::Blackjack { owner, .. }
            | Callback::Leaderboard { owner, .. }
            | Callback::PvpCancel { owner }
            | Callback::TipConfirm { owner, .. }
            | Callback::TipCancel { owner, .. } => Some(*owner),
            Callback::PvpAccept { .. } => None,
        }
    }

    pub fn encode(&self) -> String {
        match self {
            Callback::Blackjack {
                owner,
                hand,
                action,
            } => format!("bj:{owner}:{hand}:{}", action.as_str()),
            Callback::Leaderboard { owner, page } => format!("lb:{owner}:{page}"),
            Callback::PvpAccept { session } => format!("pvp:accept:{session}"),
            Callback::PvpCancel { owner } => format!("pvpx:{owner}"),
            Callback::TipConfirm { owner, tip } => format!("tip:{owner}:{tip}"),
            Callback::TipCancel { owner, tip } => format!("tipx:{owner}:{tip}"),
        }
    }

    pub fn parse(data: &str) -> Result<Self, ParseError> {
        let parts: Vec<&str> = data.split(':').collect();
        fn id(raw: &str) -> Result<UserId, ParseError> {
            raw.parse().map_err(|_| ParseError::MalformedCallback)
        }
        fn seq(raw: &str) -> Result<u64, ParseError> {
            raw.parse().map_err(|_| ParseError::MalformedCallback)
        }
        let callback = match parts.as_slice() {
            ["bj", owner, hand, action] => Callback::Blackjack {
                owner: id(owner)?,
                hand: seq(hand)?,
                action: match *action {
                    "hit" => BlackjackAction::Hit,
                    "stand" => BlackjackAction::Stand,
                    "double" => BlackjackAction::Double,
                    "surrender" => BlackjackAction::Surrender,
                    _ => return Err(ParseError::MalformedCallback),
                },
            },
            ["lb", owner, page] => Callback::Leaderboard {
                owner: id(owner)?,
                page: page.parse().map_err(|_| ParseError::MalformedCallback)?,
            },
            ["pvp", "accept", session] => Callback::PvpAccept {
                session: seq(session)?,
            },
            ["pvpx", owner] => Callback::PvpCancel { owner: id(owner)? },
            ["tip", owner, tip] => Callback::TipConfirm {
                owner: id(owner)?,
                tip: seq(tip)?,
            },
            ["tipx", owner, tip] => Callback::TipCancel {
                owner: id(owner)?,
                tip: seq(tip)?,
            },
            _ => return Err(ParseError::MalformedCallback),
        };
        Ok(callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Command {
        Command::parse(text).unwrap().unwrap()
    }

    #[test]
    fn test_parse_amounts() {
        assert_eq!(parse_cents("12.50"), Ok(1_250));
        assert_eq!(parse_cents("$12.5"), Ok(1_250));
        assert_eq!(parse_cents("1,000"), Ok(100_000));
        assert_eq!(parse_cents(".05"), Ok(5));
        assert_eq!(parse_cents("7"), Ok(700));
        assert!(parse_cents("1.005").is_err());
        assert!(parse_cents("0").is_err());
        assert!(parse_cents("-5").is_err());
        assert!(parse_cents("abc").is_err());
        assert!(parse_cents("$").is_err());
        assert!(parse_cents("99999999999999999999").is_err());
        assert_eq!(parse_amount("ALL"), Ok(Stake::All));
        assert_eq!(parse_amount("max"), Ok(Stake::All));
        assert_eq!(parse_signed_cents("-2.5"), Ok(-250));
        assert_eq!(parse_signed_cents("+3"), Ok(300));
    }

    #[test]
    fn test_ignores_plain_text_and_unknown_commands() {
        assert_eq!(Command::parse("hello there"), Ok(None));
        assert_eq!(Command::parse(""), Ok(None));
        assert_eq!(Command::parse("/unknown 5"), Ok(None));
    }

    #[test]
    fn test_parse_account_commands() {
        assert_eq!(parse("/start ref_42"), Command::Start { referrer: Some(42) });
        assert_eq!(parse("/start hello"), Command::Start { referrer: None });
        assert_eq!(parse("/bal@AntariaBot"), Command::Balance);
        assert_eq!(parse("/lb"), Command::Leaderboard { page: 1 });
        assert_eq!(parse("/global 3"), Command::Leaderboard { page: 3 });
        assert_eq!(parse("/lb 0"), Command::Leaderboard { page: 1 });
    }

    #[test]
    fn test_parse_games() {
        assert_eq!(
            parse("/bj 10"),
            Command::Blackjack {
                stake: Stake::Amount(1_000)
            }
        );
        assert_eq!(
            parse("/roulette 5 red"),
            Command::Roulette {
                stake: Stake::Amount(500),
                bet: RouletteBet::Red
            }
        );
        assert_eq!(
            parse("/roulette 00 2.5"),
            Command::Roulette {
                stake: Stake::Amount(250),
                bet: RouletteBet::Straight(DOUBLE_ZERO)
            }
        );
        assert_eq!(
            parse("/roulette all 2nd"),
            Command::Roulette {
                stake: Stake::All,
                bet: RouletteBet::Dozen(2)
            }
        );
        assert_eq!(
            parse("/predict 1 2,4 6"),
            Command::PredictDice {
                stake: Stake::Amount(100),
                picks: vec![2, 4, 6]
            }
        );
        assert_eq!(
            parse("/flip 3 t"),
            Command::Flip {
                stake: Stake::Amount(300),
                side: CoinSide::Tails
            }
        );
        assert_eq!(
            Command::parse("/roulette 5 purple"),
            Err(ParseError::UnknownBet("purple".to_string()))
        );
        assert!(matches!(Command::parse("/bj"), Err(ParseError::Usage(_))));
        assert!(matches!(Command::parse("/predict 5"), Err(ParseError::Usage(_))));
    }

    #[test]
    fn test_parse_pvp() {
        assert_eq!(
            parse("/darts 20"),
            Command::Challenge {
                game: PvpGame::Darts,
                stake: Stake::Amount(2_000),
                call: None
            }
        );
        assert_eq!(
            parse("/duel 1 heads"),
            Command::Challenge {
                game: PvpGame::CoinFlip,
                stake: Stake::Amount(100),
                call: Some(CoinSide::Heads)
            }
        );
        assert_eq!(parse("/accept"), Command::Accept { stake: None });
        assert_eq!(
            parse("/accept 4"),
            Command::Accept {
                stake: Some(Stake::Amount(400))
            }
        );
    }

    #[test]
    fn test_parse_money_and_admin() {
        assert_eq!(
            parse("/tip 5 @Bob"),
            Command::Tip {
                amount: 500,
                recipient: Recipient::Handle("bob".to_string())
            }
        );
        assert_eq!(
            parse("/tip 5"),
            Command::Tip {
                amount: 500,
                recipient: Recipient::Reply
            }
        );
        assert_eq!(
            parse("/withdraw 20 bc1qaddress"),
            Command::Withdraw {
                amount: Stake::Amount(2_000),
                address: "bc1qaddress".to_string()
            }
        );
        assert_eq!(
            parse("/approvedeposit @Ada 25.50"),
            Command::ApproveDeposit {
                target: Recipient::Handle("ada".into()),
                amount: 2_550
            }
        );
        assert!(matches!(
            Command::parse("/approvedeposit @ada -5"),
            Err(ParseError::InvalidAmount(_))
        ));
        assert_eq!(
            parse("/givebal 77 -10"),
            Command::GiveBalance {
                target: Recipient::Id(77),
                amount: -1_000
            }
        );
        assert_eq!(
            parse("/setbal 50"),
            Command::SetBalance {
                target: Recipient::Reply,
                balance: 5_000
            }
        );
        assert_eq!(
            parse("/reject 3"),
            Command::ResolveWithdrawal { id: 3, approve: false }
        );
        assert_eq!(
            parse("/savesticker Roulette_7"),
            Command::SaveSticker {
                key: "roulette_7".to_string()
            }
        );
        assert!(matches!(Command::parse("/withdraw 20"), Err(ParseError::Usage(_))));
        assert!(matches!(
            Command::parse("/settimeout soon"),
            Err(ParseError::InvalidNumber(_))
        ));
    }

    #[test]
    fn test_callbacks() {
        for callback in [
            Callback::Blackjack {
                owner: 42,
                hand: 7,
                action: BlackjackAction::Double,
            },
            Callback::Leaderboard { owner: 42, page: 2 },
            Callback::PvpAccept { session: 3 },
            Callback::PvpCancel { owner: -7 },
            Callback::TipConfirm { owner: 42, tip: 5 },
            Callback::TipCancel { owner: 42, tip: 5 },
        ] {
            assert_eq!(Callback::parse(&callback.encode()), Ok(callback.clone()));
            assert!(callback.encode().len() <= 64);
        }
        assert_eq!(Callback::PvpAccept { session: 3 }.owner(), None);
        assert_eq!(Callback::TipCancel { owner: 9, tip: 1 }.owner(), Some(9));
        assert!(Callback::parse("bj:42:7:split").is_err());
        // Payloads from before buttons carried ids no longer parse.
        assert!(Callback::parse("pvp:accept").is_err());
        assert!(Callback::parse("bj:42:hit").is_err());
        assert!(Callback::parse("tip:42:43:500").is_err());
        assert!(Callback::parse("lb:x:1").is_err());
        assert!(Callback::parse("").is_err());
    }
}
