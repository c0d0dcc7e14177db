//! Messaging account trait: the abstraction over the user's own account.
//!
//! Unlike a bot channel, an account can enumerate its dialogs, read chat
//! history, and list group members. Target discovery walks this graph to
//! find contacts; sending is always an explicit caller decision.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::error::AccountError;

/// A user as seen by the account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountUser {
    pub id: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,

    #[serde(default)]
    pub is_bot: bool,
}

impl AccountUser {
    /// Best human-readable name: first name, then username, then id.
    pub fn display_name(&self) -> String {
        self.first_name
            .clone()
            .or_else(|| self.username.as_ref().map(|u| format!("@{u}")))
            .unwrap_or_else(|| self.id.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

/// One dialog in the account's dialog list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dialog {
    /// Chat id; for private dialogs this equals the peer's user id
    pub chat_id: i64,

    pub kind: DialogKind,

    /// Group/channel title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// The peer, for private dialogs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer: Option<AccountUser>,

    /// Whether the account administers this group/channel
    #[serde(default)]
    pub is_admin: bool,
}

/// A single message from a chat history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,

    pub sender: AccountUser,

    /// Text body; `None` for media-only messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    pub date: DateTime<Utc>,
}

/// Recent history with a contact.
///
/// "No messages yet" and "could not fetch" are kept apart so the caller can
/// tell them apart in logs; both still render to a usable prompt value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum ChatHistory {
    Available(String),
    Empty,
    Unavailable(String),
}

/// Text used in place of a history that could not be fetched.
pub const HISTORY_UNAVAILABLE: &str = "История чата недоступна.";

impl ChatHistory {
    /// The value handed to the orchestrator.
    pub fn render(&self) -> String {
        match self {
            ChatHistory::Available(text) => text.clone(),
            ChatHistory::Empty => String::new(),
            ChatHistory::Unavailable(_) => HISTORY_UNAVAILABLE.to_string(),
        }
    }
}

/// A contact selected for outreach.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetUser {
    pub user_id: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,

    /// Descriptive text about the contact
    pub contact_info: String,

    pub history: ChatHistory,
}

impl TargetUser {
    pub fn chat_history(&self) -> String {
        self.history.render()
    }

    /// Label for logs: `@username` if known, else the id.
    pub fn label(&self) -> String {
        self.username
            .as_ref()
            .map(|u| format!("@{u}"))
            .unwrap_or_else(|| self.user_id.to_string())
    }
}

/// The messaging account consumed by target discovery and the campaign.
#[async_trait]
pub trait MessagingAccount: Send + Sync {
    /// The account owner.
    async fn me(&self) -> Result<AccountUser, AccountError>;

    /// All dialogs visible to the account.
    async fn dialogs(&self) -> Result<Vec<Dialog>, AccountError>;

    /// Up to `limit` most recent messages of a chat, newest first.
    async fn chat_history(&self, chat_id: i64, limit: usize)
        -> Result<Vec<ChatMessage>, AccountError>;

    /// Members of a group or channel.
    async fn chat_members(&self, chat_id: i64) -> Result<Vec<AccountUser>, AccountError>;

    /// Deliver a direct message.
    async fn send_message(&self, user_id: i64, text: &str) -> Result<(), AccountError>;
}
