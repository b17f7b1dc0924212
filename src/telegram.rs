use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::TelegramConfig;

/// Chat identifier as Telegram accepts it: a numeric id or an `@channel` username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatId {
    Id(i64),
    Username(String),
}

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatId::Id(id) => write!(f, "{}", id),
            ChatId::Username(name) => write!(f, "{}", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub web_app: WebAppInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebAppInfo {
    pub url: String,
}

impl InlineKeyboardMarkup {
    /// A single row holding a single button that opens the web app at `url`.
    pub fn web_app_button(label: &str, url: &str) -> Self {
        Self {
            inline_keyboard: vec![vec![InlineKeyboardButton {
                text: label.to_string(),
                web_app: WebAppInfo {
                    url: url.to_string(),
                },
            }]],
        }
    }
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a ChatId,
    text: &'a str,
    parse_mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<&'a InlineKeyboardMarkup>,
}

/// Thin client over the Telegram Bot API HTTP interface.
#[derive(Clone)]
pub struct TelegramClient {
    client: reqwest::Client,
    api_url: String,
    token: String,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.bot_token.clone(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token, method)
    }

    /// Send an HTML-formatted message, optionally with an inline keyboard.
    pub async fn send_message(
        &self,
        chat_id: &ChatId,
        text: &str,
        markup: Option<&InlineKeyboardMarkup>,
    ) -> Result<Value> {
        let request = SendMessageRequest {
            chat_id,
            text,
            parse_mode: "HTML",
            reply_markup: markup,
        };

        debug!("Sending message to chat {}", chat_id);

        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&request)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("Failed to send request to Telegram")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("Telegram API error ({}): {}", status, error_body);
        }

        response
            .json()
            .await
            .map_err(reqwest::Error::without_url)
            .context("Failed to parse Telegram sendMessage response")
    }

    /// Register `url` as the bot's webhook. The platform's reply is returned as-is.
    pub async fn set_webhook(&self, url: &str) -> Result<Value> {
        if url.is_empty() {
            return Ok(json!({ "error": "URL parameter is required" }));
        }

        info!("Registering webhook: {}", url);

        let response = self
            .client
            .get(self.method_url("setWebhook"))
            .query(&[("url", url)])
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("Failed to send setWebhook request to Telegram")?;

        response
            .json()
            .await
            .map_err(reqwest::Error::without_url)
            .context("Failed to parse Telegram setWebhook response")
    }

    /// Current webhook registration, as reported by the platform.
    pub async fn webhook_info(&self) -> Result<Value> {
        let response = self
            .client
            .get(self.method_url("getWebhookInfo"))
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("Failed to send getWebhookInfo request to Telegram")?;

        response
            .json()
            .await
            .map_err(reqwest::Error::without_url)
            .context("Failed to parse Telegram getWebhookInfo response")
    }
}
