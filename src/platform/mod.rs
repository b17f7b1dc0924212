pub mod polling;
pub mod webhook;

use serde::Deserialize;

use crate::telegram::ChatId;

/// An update pushed (or polled) from Telegram.
///
/// Only the fields the bot reacts to are modelled; everything else in the
/// payload is ignored, and any of these may be absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundUpdate {
    #[serde(default)]
    pub update_id: Option<i64>,
    #[serde(default)]
    pub message: Option<InboundMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundMessage {
    #[serde(default)]
    pub chat: Option<InboundChat>,
    #[serde(default)]
    pub text: Option<String>,
    /// Payload the menu web app sent back through `Telegram.WebApp.sendData`.
    #[serde(default)]
    pub web_app_data: Option<InboundWebAppData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InboundWebAppData {
    pub data: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InboundChat {
    pub id: ChatId,
}

impl InboundMessage {
    pub fn chat_id(&self) -> Option<&ChatId> {
        self.chat.as_ref().map(|chat| &chat.id)
    }
}
