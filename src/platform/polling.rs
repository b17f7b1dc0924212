use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use teloxide::prelude::*;
use teloxide::update_listeners::Polling;
use tracing::{error, info, warn};

use crate::bot::AppState;
use crate::config::TelegramConfig;
use crate::platform::{InboundMessage, InboundUpdate};

/// How long a single `getUpdates` call may wait server-side for new updates.
const LONG_POLL_TIMEOUT: Duration = Duration::from_secs(10);

/// Run the bot with long polling instead of a webhook. Useful locally, where
/// Telegram cannot reach the machine.
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let bot = build_bot(&state.config.telegram)?;

    info!("Starting long-polling transport...");

    let listener = Polling::builder(bot.clone())
        .timeout(LONG_POLL_TIMEOUT)
        .delete_webhook()
        .await
        .build();

    let handler = Update::filter_message().endpoint(handle_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .default_handler(|upd| async move {
            warn!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("polling"))
        .enable_ctrlc_handler()
        .build()
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("polling listener"),
        )
        .await;

    Ok(())
}

/// Bot pointed at the configured API host. The HTTP timeout leaves room for
/// the long-poll wait on top of the regular request budget.
fn build_bot(config: &TelegramConfig) -> Result<Bot> {
    let api_url = reqwest::Url::parse(&config.api_url)
        .with_context(|| format!("Invalid Telegram API URL: {}", config.api_url))?;
    let client = reqwest::Client::builder()
        .timeout(config.request_timeout() + LONG_POLL_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")?;
    Ok(Bot::with_client(&config.bot_token, client).set_api_url(api_url))
}

async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let update = match to_inbound(&msg) {
        Ok(update) => update,
        Err(e) => {
            error!("Could not convert message {}: {:#}", msg.id.0, e);
            return Ok(());
        }
    };

    if let Err(e) = process(&state, &update).await {
        error!("Failed to handle message {} in chat {}: {:#}", msg.id.0, msg.chat.id.0, e);
    }

    Ok(())
}

/// Acknowledge data posted back by the web app, otherwise hand the update to
/// the command dispatcher.
async fn process(state: &AppState, update: &InboundUpdate) -> Result<()> {
    let message = match update.message.as_ref() {
        Some(message) => message,
        None => return Ok(()),
    };

    if let (Some(chat_id), Some(web_app_data)) = (message.chat_id(), &message.web_app_data) {
        info!("Web app data from chat {}", chat_id);
        let text = format!(
            "{}{}",
            state.config.webapp.data_received_text,
            escape_html(&web_app_data.data)
        );
        state.telegram.send_message(chat_id, &text, None).await?;
        return Ok(());
    }

    state.dispatcher.dispatch(update).await?;
    Ok(())
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Re-read a teloxide message through the same model the webhook decodes, so
/// both transports reach the dispatcher with identical input.
fn to_inbound(msg: &Message) -> Result<InboundUpdate> {
    let value = serde_json::to_value(msg).context("Failed to serialize message")?;
    let message: InboundMessage =
        serde_json::from_value(value).context("Failed to decode message")?;
    Ok(InboundUpdate {
        update_id: None,
        message: Some(message),
    })
}
