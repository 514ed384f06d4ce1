//! Minimal Telegram Bot API client.
//!
//! Only the handful of methods the bot needs: long-polled updates, messages with inline
//! keyboards, stickers and callback answers.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use url::Url;

const API_BASE: &str = "https://api.telegram.org";

/// Slack added to the HTTP timeout on top of the long-poll window.
const POLL_SLACK: Duration = Duration::from_secs(10);

/// Error type for Bot API calls.
///
/// Request URLs embed the bot token, so transport errors are stored with the URL stripped.
#[derive(Error, Debug)]
pub enum Error {
    #[error("http error: {0}")]
    Http(reqwest::Error),
    #[error("telegram error {code}: {description}")]
    Api { code: i64, description: String },
    #[error("unexpected response")]
    UnexpectedResponse,
    #[error("invalid bot token")]
    InvalidToken,
}

pub type Result<T> = std::result::Result<T, Error>;

fn http(err: reqwest::Error) -> Error {
    Error::Http(err.without_url())
}

#[derive(Clone, Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub reply_to_message: Option<Box<Message>>,
    #[serde(default)]
    pub sticker: Option<Sticker>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl User {
    pub fn display_name(&self) -> String {
        match &self.last_name {
            Some(last) => format!("{} {last}", self.first_name),
            None => self.first_name.clone(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Sticker {
    pub file_id: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Serialize)]
struct GetUpdates<'a> {
    offset: i64,
    timeout: u64,
    allowed_updates: &'a [&'a str],
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<InlineKeyboardMarkup>,
}

#[derive(Serialize)]
struct SendSticker<'a> {
    chat_id: i64,
    sticker: &'a str,
}

#[derive(Serialize)]
struct AnswerCallbackQuery<'a> {
    callback_query_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
}

#[derive(Clone)]
pub struct Telegram {
    http_client: reqwest::Client,
    base_url: Url,
}

impl fmt::Debug for Telegram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Telegram").finish_non_exhaustive()
    }
}

impl Telegram {
    pub fn new(token: &str, poll_timeout: Duration) -> Result<Self> {
        Self::with_base(API_BASE, token, poll_timeout)
    }

    pub fn with_base(base: &str, token: &str, poll_timeout: Duration) -> Result<Self> {
        if token.is_empty() || token.contains('/') || token.chars().any(char::is_whitespace) {
            return Err(Error::InvalidToken);
        }
        let base_url = Url::parse(&format!("{}/bot{token}/", base.trim_end_matches('/')))
            .map_err(|_| Error::InvalidToken)?;
        let http_client = reqwest::Client::builder()
            .timeout(poll_timeout + POLL_SLACK)
            .build()
            .map_err(http)?;
        Ok(Self {
            http_client,
            base_url,
        })
    }

    async fn call<P: Serialize, R: DeserializeOwned>(&self, method: &str, params: &P) -> Result<R> {
        let url = self
            .base_url
            .join(method)
            .map_err(|_| Error::UnexpectedResponse)?;
        let response: ApiResponse<R> = self
            .http_client
            .post(url)
            .json(params)
            .send()
            .await
            .map_err(http)?
            .json()
            .await
            .map_err(http)?;
        if !response.ok {
            return Err(Error::Api {
                code: response.error_code.unwrap_or_default(),
                description: response.description.unwrap_or_default(),
            });
        }
        response.result.ok_or(Error::UnexpectedResponse)
    }

    pub async fn get_updates(&self, offset: i64, timeout: Duration) -> Result<Vec<Update>> {
        self.call(
            "getUpdates",
            &GetUpdates {
                offset,
                timeout: timeout.as_secs(),
                allowed_updates: &["message", "callback_query"],
            },
        )
        .await
    }

    pub async fn send_message(
        &self,
        chat: i64,
        text: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<Message> {
        self.call(
            "sendMessage",
            &SendMessage {
                chat_id: chat,
                text,
                parse_mode: "HTML",
                disable_web_page_preview: true,
                reply_markup: keyboard,
            },
        )
        .await
    }

    pub async fn send_sticker(&self, chat: i64, file_id: &str) -> Result<Message> {
        self.call(
            "sendSticker",
            &SendSticker {
                chat_id: chat,
                sticker: file_id,
            },
        )
        .await
    }

    pub async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<bool> {
        self.call(
            "answerCallbackQuery",
            &AnswerCallbackQuery {
                callback_query_id: callback_id,
                text,
            },
        )
        .await
    }
}
