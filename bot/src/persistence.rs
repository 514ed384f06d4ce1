//! SQLite backend for the ledger.
//!
//! Every entity is one row holding its JSON encoding plus the columns worth indexing. A staged
//! [`Layer`](antaria_execution::Layer) lands through [`State::apply`] inside a single SQLite
//! transaction, so a crash mid-round leaves either all of it or none of it.

use anyhow::{bail, Context, Result};
use antaria_execution::{State, Status};
use antaria_types::casino::WithdrawalStatus;
use antaria_types::execution::{Key, Value};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

const GLOBAL: &str = "global";
const LEADERBOARD: &str = "leaderboard";

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("open database {}", path.display()))?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA synchronous=NORMAL;
         CREATE TABLE IF NOT EXISTS users (
             id INTEGER PRIMARY KEY,
             balance INTEGER NOT NULL,
             total_wagered INTEGER NOT NULL,
             data TEXT NOT NULL
         );
         CREATE TABLE IF NOT EXISTS handles (
             handle TEXT PRIMARY KEY,
             user_id INTEGER NOT NULL
         );
         CREATE TABLE IF NOT EXISTS user_history (
             user_id INTEGER PRIMARY KEY,
             data TEXT NOT NULL
         );
         CREATE TABLE IF NOT EXISTS blackjack_hands (
             user_id INTEGER PRIMARY KEY,
             chat_id INTEGER NOT NULL,
             updated_at INTEGER NOT NULL,
             data TEXT NOT NULL
         );
         CREATE TABLE IF NOT EXISTS transactions (
             id INTEGER PRIMARY KEY,
             user_id INTEGER NOT NULL,
             amount INTEGER NOT NULL,
             kind TEXT NOT NULL,
             timestamp INTEGER NOT NULL,
             data TEXT NOT NULL
         );
         CREATE INDEX IF NOT EXISTS transactions_user ON transactions (user_id, id);
         CREATE TABLE IF NOT EXISTS games (
             id INTEGER PRIMARY KEY,
             user_id INTEGER NOT NULL,
             game TEXT NOT NULL,
             stake INTEGER NOT NULL,
             payout INTEGER NOT NULL,
             timestamp INTEGER NOT NULL,
             data TEXT NOT NULL
         );
         CREATE INDEX IF NOT EXISTS games_user ON games (user_id, id);
         CREATE TABLE IF NOT EXISTS withdrawals (
             id INTEGER PRIMARY KEY,
             user_id INTEGER NOT NULL,
             amount INTEGER NOT NULL,
             status TEXT NOT NULL,
             data TEXT NOT NULL
         );
         CREATE TABLE IF NOT EXISTS singletons (
             name TEXT PRIMARY KEY,
             data TEXT NOT NULL
         );",
    )
    .context("init ledger schema")?;
    Ok(())
}

/// SQLite integers are signed; ids and amounts must fit.
fn sql_int(value: u64) -> Result<i64> {
    i64::try_from(value).with_context(|| format!("{value} does not fit in an sqlite integer"))
}

fn status_label(status: WithdrawalStatus) -> &'static str {
    match status {
        WithdrawalStatus::Pending => "pending",
        WithdrawalStatus::Approved => "approved",
        WithdrawalStatus::Rejected => "rejected",
    }
}

fn encode<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).context("encode row")
}

fn read_json<T: DeserializeOwned>(
    conn: &Connection,
    sql: &str,
    param: impl rusqlite::ToSql,
) -> Result<Option<T>> {
    let raw: Option<String> = conn
        .query_row(sql, [param], |row| row.get(0))
        .optional()
        .with_context(|| format!("query: {sql}"))?;
    raw.map(|raw| serde_json::from_str(&raw).context("decode row"))
        .transpose()
}

fn read(conn: &Connection, key: &Key) -> Result<Option<Value>> {
    Ok(match key {
        Key::User(id) => {
            read_json(conn, "SELECT data FROM users WHERE id = ?1", id)?.map(Value::User)
        }
        Key::Handle(handle) => conn
            .query_row(
                "SELECT user_id FROM handles WHERE handle = ?1",
                [handle],
                |row| row.get(0),
            )
            .optional()
            .context("query handle")?
            .map(Value::Handle),
        Key::UserHistory(id) => {
            read_json(conn, "SELECT data FROM user_history WHERE user_id = ?1", id)?
                .map(Value::UserHistory)
        }
        Key::Blackjack(id) => {
            read_json(conn, "SELECT data FROM blackjack_hands WHERE user_id = ?1", id)?
                .map(Value::Blackjack)
        }
        Key::Transaction(id) => read_json(
            conn,
            "SELECT data FROM transactions WHERE id = ?1",
            sql_int(*id)?,
        )?
        .map(Value::Transaction),
        Key::Game(id) => {
            read_json(conn, "SELECT data FROM games WHERE id = ?1", sql_int(*id)?)?
                .map(Value::Game)
        }
        Key::Withdrawal(id) => read_json(
            conn,
            "SELECT data FROM withdrawals WHERE id = ?1",
            sql_int(*id)?,
        )?
        .map(Value::Withdrawal),
        Key::GlobalState => {
            read_json(conn, "SELECT data FROM singletons WHERE name = ?1", GLOBAL)?
                .map(Value::GlobalState)
        }
        Key::Leaderboard => {
            read_json(conn, "SELECT data FROM singletons WHERE name = ?1", LEADERBOARD)?
                .map(Value::Leaderboard)
        }
    })
}

fn write(conn: &Connection, key: &Key, value: &Value) -> Result<()> {
    match (key, value) {
        (Key::User(id), Value::User(user)) if *id == user.id => {
            conn.execute(
                "INSERT OR REPLACE INTO users (id, balance, total_wagered, data)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    id,
                    sql_int(user.balance)?,
                    sql_int(user.total_wagered)?,
                    encode(user)?
                ],
            )
            .context("write user")?;
        }
        (Key::Handle(handle), Value::Handle(user)) => {
            conn.execute(
                "INSERT OR REPLACE INTO handles (handle, user_id) VALUES (?1, ?2)",
                params![handle, user],
            )
            .context("write handle")?;
        }
        (Key::UserHistory(id), Value::UserHistory(history)) => {
            conn.execute(
                "INSERT OR REPLACE INTO user_history (user_id, data) VALUES (?1, ?2)",
                params![id, encode(history)?],
            )
            .context("write history")?;
        }
        (Key::Blackjack(id), Value::Blackjack(hand)) if *id == hand.user => {
            conn.execute(
                "INSERT OR REPLACE INTO blackjack_hands (user_id, chat_id, updated_at, data)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id, hand.chat, sql_int(hand.updated_at)?, encode(hand)?],
            )
            .context("write blackjack hand")?;
        }
        (Key::Transaction(id), Value::Transaction(tx)) if *id == tx.id => {
            // Plain INSERT: an existing id is a constraint violation.
            conn.execute(
                "INSERT INTO transactions (id, user_id, amount, kind, timestamp, data)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    sql_int(*id)?,
                    tx.user,
                    tx.amount,
                    tx.kind.to_string(),
                    sql_int(tx.timestamp)?,
                    encode(tx)?
                ],
            )
            .with_context(|| format!("append transaction {id}"))?;
        }
        (Key::Game(id), Value::Game(game)) if *id == game.id => {
            conn.execute(
                "INSERT INTO games (id, user_id, game, stake, payout, timestamp, data)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    sql_int(*id)?,
                    game.user,
                    game.game.to_string(),
                    sql_int(game.stake)?,
                    sql_int(game.payout)?,
                    sql_int(game.timestamp)?,
                    encode(game)?
                ],
            )
            .with_context(|| format!("append game {id}"))?;
        }
        (Key::Withdrawal(id), Value::Withdrawal(withdrawal)) if *id == withdrawal.id => {
            conn.execute(
                "INSERT OR REPLACE INTO withdrawals (id, user_id, amount, status, data)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    sql_int(*id)?,
                    withdrawal.user,
                    sql_int(withdrawal.amount)?,
                    status_label(withdrawal.status),
                    encode(withdrawal)?
                ],
            )
            .context("write withdrawal")?;
        }
        (Key::GlobalState, Value::GlobalState(global)) => {
            conn.execute(
                "INSERT OR REPLACE INTO singletons (name, data) VALUES (?1, ?2)",
                params![GLOBAL, encode(global)?],
            )
            .context("write global state")?;
        }
        (Key::Leaderboard, Value::Leaderboard(leaderboard)) => {
            conn.execute(
                "INSERT OR REPLACE INTO singletons (name, data) VALUES (?1, ?2)",
                params![LEADERBOARD, encode(leaderboard)?],
            )
            .context("write leaderboard")?;
        }
        (key, _) => bail!("value does not match key {key:?}"),
    }
    Ok(())
}

fn remove(conn: &Connection, key: &Key) -> Result<()> {
    let (sql, param): (&str, i64) = match key {
        Key::Handle(handle) => {
            conn.execute("DELETE FROM handles WHERE handle = ?1", [handle])
                .context("delete handle")?;
            return Ok(());
        }
        Key::Transaction(id) | Key::Game(id) => bail!("ledger row {id} is append-only"),
        Key::User(id) => ("DELETE FROM users WHERE id = ?1", *id),
        Key::UserHistory(id) => ("DELETE FROM user_history WHERE user_id = ?1", *id),
        Key::Blackjack(id) => ("DELETE FROM blackjack_hands WHERE user_id = ?1", *id),
        Key::Withdrawal(id) => ("DELETE FROM withdrawals WHERE id = ?1", sql_int(*id)?),
        Key::GlobalState | Key::Leaderboard => bail!("singleton {key:?} cannot be deleted"),
    };
    conn.execute(sql, [param])
        .with_context(|| format!("delete {key:?}"))?;
    Ok(())
}

impl State for SqliteStore {
    async fn get(&self, key: &Key) -> Result<Option<Value>> {
        read(&self.conn, key)
    }

    async fn insert(&mut self, key: Key, value: Value) -> Result<()> {
        write(&self.conn, &key, &value)
    }

    async fn delete(&mut self, key: &Key) -> Result<()> {
        remove(&self.conn, key)
    }

    async fn apply(&mut self, changes: Vec<(Key, Status)>) -> Result<()> {
        let tx = self.conn.transaction().context("begin transaction")?;
        for (key, status) in &changes {
            match status {
                Status::Update(value) => write(&tx, key, value)?,
                Status::Delete => remove(&tx, key)?,
            }
        }
        // Dropping `tx` on an early return rolls everything back.
        tx.commit().context("commit transaction")?;
        Ok(())
    }
}
