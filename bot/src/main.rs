use anyhow::{Context, Result};
use antaria_bot::render::{Button, Outgoing};
use antaria_bot::telegram::{
    InlineKeyboardButton, InlineKeyboardMarkup, Telegram, Update,
};
use antaria_bot::{BotConfig, Config, Incoming, Input, ReplyTarget, Router, SqliteStore};
use antaria_execution::casino::GameRng;
use antaria_execution::State;
use clap::Parser;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn, Level};

/// Pause after a failed poll before trying again.
const POLL_RETRY: Duration = Duration::from_secs(3);

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML config file. Built-in defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SQLite database path, overriding the config.
    #[arg(long)]
    database: Option<PathBuf>,

    /// Environment variable holding the bot token.
    #[arg(long, default_value = "TELEGRAM_BOT_TOKEN")]
    token_env: String,

    /// Fixed RNG seed for reproducible staging runs.
    #[arg(long)]
    seed: Option<u64>,
}

fn init_tracing(level: Level) {
    tracing_subscriber::fmt().with_max_level(level).init();
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(database) = &args.database {
        config.bot.database_path = database.clone();
    }
    config.validate().context("invalid config")?;
    Ok(config)
}

/// Reduce a Telegram update to router input. Updates from bots or without text are dropped.
fn to_incoming(update: Update) -> Option<Incoming> {
    if let Some(callback) = update.callback_query {
        let chat = callback.message.as_ref()?.chat.id;
        return Some(Incoming {
            user: callback.from.id,
            name: callback.from.display_name(),
            handle: callback.from.username.clone(),
            chat,
            input: Input::Button {
                callback_id: callback.id,
                data: callback.data?,
            },
            reply_to: None,
        });
    }

    let message = update.message?;
    let from = message.from.filter(|from| !from.is_bot)?;
    let text = message.text?;
    let reply_to = message.reply_to_message.map(|reply| ReplyTarget {
        user: reply
            .from
            .as_ref()
            .filter(|author| !author.is_bot)
            .map(|author| author.id),
        name: reply
            .from
            .as_ref()
            .map(|author| author.display_name())
            .unwrap_or_default(),
        sticker: reply.sticker.map(|sticker| sticker.file_id),
    });
    Some(Incoming {
        user: from.id,
        name: from.display_name(),
        handle: from.username.clone(),
        chat: message.chat.id,
        input: Input::Text(text),
        reply_to,
    })
}

fn keyboard(buttons: Vec<Vec<Button>>) -> Option<InlineKeyboardMarkup> {
    if buttons.is_empty() {
        return None;
    }
    Some(InlineKeyboardMarkup {
        inline_keyboard: buttons
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|button| InlineKeyboardButton {
                        text: button.text,
                        callback_data: button.callback.encode(),
                    })
                    .collect()
            })
            .collect(),
    })
}

/// Send one reply. Failures are logged and never stop the loop.
async fn deliver(telegram: &Telegram, outgoing: Outgoing) {
    let result = match outgoing {
        Outgoing::Message {
            chat,
            text,
            buttons,
        } => telegram
            .send_message(chat, &text, keyboard(buttons))
            .await
            .map(drop),
        Outgoing::Sticker { chat, file_id } => {
            telegram.send_sticker(chat, &file_id).await.map(drop)
        }
        Outgoing::Answer { callback_id, text } => telegram
            .answer_callback(&callback_id, text.as_deref())
            .await
            .map(drop),
    };
    if let Err(err) = result {
        warn!(error = %err, "failed to send reply");
    }
}

async fn run<S: State>(
    telegram: &Telegram,
    router: &mut Router<S>,
    config: &BotConfig,
) -> Result<()> {
    let poll = Duration::from_secs(config.poll_timeout_secs);
    let mut sweep = tokio::time::interval(Duration::from_secs(config.sweep_interval_secs));
    sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut offset: i64 = 0;

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("listen for shutdown")?;
                info!("shutting down");
                return Ok(());
            }
            _ = sweep.tick() => {
                for outgoing in router.sweep(unix_now()).await {
                    deliver(telegram, outgoing).await;
                }
            }
            updates = telegram.get_updates(offset, poll) => {
                let updates = match updates {
                    Ok(updates) => updates,
                    Err(err) => {
                        warn!(error = %err, "failed to poll updates");
                        tokio::time::sleep(POLL_RETRY).await;
                        continue;
                    }
                };
                // Strictly in order: each update sees the ledger the previous one left.
                for update in updates {
                    offset = offset.max(update.update_id + 1);
                    let Some(incoming) = to_incoming(update) else {
                        continue;
                    };
                    for outgoing in router.handle(incoming, unix_now()).await {
                        deliver(telegram, outgoing).await;
                    }
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse args
    let args = Args::parse();
    let config = load_config(&args)?;

    // Create logger
    init_tracing(config.log_level()?);

    // The token never touches config files or logs.
    let token = std::env::var(&args.token_env)
        .with_context(|| format!("missing bot token in ${}", args.token_env))?;
    let telegram = Telegram::new(&token, Duration::from_secs(config.bot.poll_timeout_secs))
        .context("create telegram client")?;
    drop(token);

    let store = SqliteStore::open(&config.bot.database_path)?;
    let rng = match args.seed {
        Some(seed) => {
            warn!(seed, "game rng is seeded, outcomes are predictable");
            GameRng::from_seed(seed)
        }
        None => GameRng::from_entropy(),
    };
    let mut router = Router::new(
        store,
        config.casino.clone(),
        rng,
        config.bot.deposit_instructions.clone(),
    );
    info!(
        database = %config.bot.database_path.display(),
        house_cut_bps = config.casino.house_cut_bps,
        "casino bot started"
    );

    run(&telegram, &mut router, &config.bot).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use antaria_bot::command::Callback;

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["antaria-bot"]);
        assert_eq!(args.token_env, "TELEGRAM_BOT_TOKEN");
        assert!(args.config.is_none());
        assert!(args.seed.is_none());

        let config = load_config(&args).unwrap();
        assert_eq!(config.bot.database_path, PathBuf::from("antaria.db"));
    }

    #[test]
    fn test_args_override_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot.yaml");
        std::fs::write(&path, "bot:\n  database_path: from-file.db\n").unwrap();
        let args = Args::parse_from([
            "antaria-bot",
            "--config",
            path.to_str().unwrap(),
            "--database",
            "override.db",
            "--token-env",
            "MY_TOKEN",
            "--seed",
            "7",
        ]);
        assert_eq!(args.token_env, "MY_TOKEN");
        assert_eq!(args.seed, Some(7));
        let config = load_config(&args).unwrap();
        assert_eq!(config.bot.database_path, PathBuf::from("override.db"));
    }

    #[test]
    fn test_to_incoming() {
        let update: Update = serde_json::from_str(
            r#"{"update_id": 1, "message": {
                "message_id": 2,
                "from": {"id": 42, "first_name": "Ada", "username": "ada_l"},
                "chat": {"id": -100},
                "text": "/tip 5",
                "reply_to_message": {"message_id": 1, "from": {"id": 43, "first_name": "Bob"}, "chat": {"id": -100}}
            }}"#,
        )
        .unwrap();
        let incoming = to_incoming(update).unwrap();
        assert_eq!(incoming.user, 42);
        assert_eq!(incoming.handle.as_deref(), Some("ada_l"));
        assert_eq!(incoming.input, Input::Text("/tip 5".into()));
        let reply = incoming.reply_to.unwrap();
        assert_eq!(reply.user, Some(43));
        assert_eq!(reply.name, "Bob");

        let update: Update = serde_json::from_str(
            r#"{"update_id": 2, "callback_query": {
                "id": "cb", "from": {"id": 42, "first_name": "Ada"},
                "message": {"message_id": 5, "chat": {"id": -100}}, "data": "pvp:accept:1"
            }}"#,
        )
        .unwrap();
        let incoming = to_incoming(update).unwrap();
        assert_eq!(
            incoming.input,
            Input::Button {
                callback_id: "cb".into(),
                data: "pvp:accept:1".into()
            }
        );

        let update: Update = serde_json::from_str(
            r#"{"update_id": 3, "message": {"message_id": 6, "from": {"id": 9, "is_bot": true, "first_name": "B"}, "chat": {"id": 1}, "text": "/bal"}}"#,
        )
        .unwrap();
        assert!(to_incoming(update).is_none());
    }

    #[test]
    fn test_keyboard_encodes_callbacks() {
        assert!(keyboard(Vec::new()).is_none());
        let markup = keyboard(vec![vec![Button::new("Accept", Callback::PvpAccept { session: 1 })]]).unwrap();
        assert_eq!(markup.inline_keyboard[0][0].callback_data, "pvp:accept:1");
    }
}
