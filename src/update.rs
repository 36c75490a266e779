//! Inbound events and outbound messages
//!
//! Field names follow the Bot API JSON so payloads from `getUpdates`
//! decode directly and `OutgoingMessage` serialises to a `sendMessage` body.

use serde::{Deserialize, Serialize};

/// One inbound event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Press on an inline keyboard button
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// Kind of interaction an update carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    Callback,
    Message,
    Other,
}

impl Update {
    /// Build a text message update (handy for tests and demos)
    pub fn text_message(user_id: i64, text: impl Into<String>) -> Self {
        Self {
            update_id: 0,
            message: Some(Message {
                message_id: 0,
                from: Some(User::new(user_id)),
                chat: Chat { id: user_id },
                text: Some(text.into()),
            }),
            callback_query: None,
        }
    }

    /// Build a callback update as produced by an inline button press
    pub fn callback(user_id: i64, data: impl Into<String>) -> Self {
        Self {
            update_id: 0,
            message: None,
            callback_query: Some(CallbackQuery {
                id: format!("cb-{user_id}"),
                from: User::new(user_id),
                message: None,
                data: Some(data.into()),
            }),
        }
    }

    pub fn kind(&self) -> UpdateKind {
        if self.callback_query.is_some() {
            UpdateKind::Callback
        } else if self.message.is_some() {
            UpdateKind::Message
        } else {
            UpdateKind::Other
        }
    }

    /// Comparable text payload: callback data wins over message text
    pub fn text(&self) -> Option<&str> {
        match self.kind() {
            UpdateKind::Callback => self.callback_query.as_ref()?.data.as_deref(),
            UpdateKind::Message => self.message.as_ref()?.text.as_deref(),
            UpdateKind::Other => None,
        }
    }

    /// Identity of the sender, stringified for use as a session key
    pub fn user_id(&self) -> Option<String> {
        if let Some(query) = &self.callback_query {
            return Some(query.from.id.to_string());
        }
        self.message
            .as_ref()?
            .from
            .as_ref()
            .map(|user| user.id.to_string())
    }

    /// Chat to answer in. Callbacks fall back to the sender's private chat
    /// when the originating message is not attached.
    pub fn chat_id(&self) -> Option<i64> {
        if let Some(query) = &self.callback_query {
            return Some(
                query
                    .message
                    .as_ref()
                    .map_or(query.from.id, |message| message.chat.id),
            );
        }
        self.message.as_ref().map(|message| message.chat.id)
    }
}

impl User {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            is_bot: false,
            first_name: String::new(),
            username: None,
        }
    }
}

/// Message to send back through the transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub chat_id: i64,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<InlineKeyboardMarkup>,
}

impl OutgoingMessage {
    pub fn new(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            parse_mode: None,
            reply_markup: None,
        }
    }

    pub fn with_keyboard(mut self, keyboard: InlineKeyboardMarkup) -> Self {
        self.reply_markup = Some(keyboard);
        self
    }

    pub fn with_parse_mode(mut self, mode: impl Into<String>) -> Self {
        self.parse_mode = Some(mode.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

impl InlineKeyboardMarkup {
    /// Append a row of buttons
    pub fn row(mut self, buttons: impl IntoIterator<Item = InlineKeyboardButton>) -> Self {
        self.inline_keyboard.push(buttons.into_iter().collect());
        self
    }
}

/// Button whose `callback_data` comes back as a callback update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineKeyboardButton {
    pub fn new(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: callback_data.into(),
        }
    }
}
