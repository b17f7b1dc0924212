use anyhow::Result;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::platform::InboundUpdate;
use crate::telegram::{InlineKeyboardMarkup, TelegramClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Menu,
}

/// Recognised command texts. Matching is exact: no trimming, no case folding,
/// no `/cmd@botname` or argument handling.
const COMMANDS: &[(&str, Command)] = &[("/start", Command::Start), ("/menu", Command::Menu)];

impl Command {
    pub fn parse(text: &str) -> Option<Self> {
        COMMANDS
            .iter()
            .find(|(name, _)| *name == text)
            .map(|(_, command)| *command)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Start => "/start",
            Command::Menu => "/menu",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Nothing to answer: no message, no text, or an unrecognised command.
    Ignored,
    Replied(Command),
}

/// Turns inbound updates into replies. Transport-agnostic: the webhook server
/// and the polling loop both feed it.
pub struct UpdateDispatcher {
    telegram: TelegramClient,
    keyboard: InlineKeyboardMarkup,
    start_text: String,
    menu_text: String,
}

impl UpdateDispatcher {
    pub fn new(config: &Config, telegram: TelegramClient) -> Self {
        Self {
            telegram,
            keyboard: InlineKeyboardMarkup::web_app_button(
                &config.webapp.button_text,
                &config.webapp.url,
            ),
            start_text: config.webapp.start_text.clone(),
            menu_text: config.webapp.menu_text.clone(),
        }
    }

    fn reply_text(&self, command: Command) -> &str {
        match command {
            Command::Start => self.start_text.as_str(),
            Command::Menu => self.menu_text.as_str(),
        }
    }

    /// Handle one update. Send failures are returned so the transport can log
    /// them and still acknowledge the update.
    pub async fn dispatch(&self, update: &InboundUpdate) -> Result<DispatchOutcome> {
        let message = match update.message.as_ref() {
            Some(message) => message,
            None => return Ok(DispatchOutcome::Ignored),
        };

        let text = match message.text.as_deref() {
            Some(text) => text,
            None => return Ok(DispatchOutcome::Ignored),
        };

        let chat_id = match message.chat_id() {
            Some(chat_id) => chat_id,
            None => {
                warn!("Message without chat id ignored (update {:?})", update.update_id);
                return Ok(DispatchOutcome::Ignored);
            }
        };

        let command = match Command::parse(text) {
            Some(command) => command,
            None => {
                debug!("No command in message from chat {}", chat_id);
                return Ok(DispatchOutcome::Ignored);
            }
        };

        info!("Command {} from chat {}", command.as_str(), chat_id);

        self.telegram
            .send_message(chat_id, self.reply_text(command), Some(&self.keyboard))
            .await?;

        Ok(DispatchOutcome::Replied(command))
    }
}

/// Process-wide state shared by the transports.
pub struct AppState {
    pub config: Config,
    pub telegram: TelegramClient,
    pub dispatcher: UpdateDispatcher,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let telegram = TelegramClient::new(&config.telegram)?;
        let dispatcher = UpdateDispatcher::new(&config, telegram.clone());
        Ok(Self {
            config,
            telegram,
            dispatcher,
        })
    }
}
