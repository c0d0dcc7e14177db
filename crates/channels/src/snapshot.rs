//! Snapshot-backed messaging account.
//!
//! Reads an exported account (self user, dialogs, histories, members) from
//! a JSON file and serves it through [`MessagingAccount`]. Sent messages are
//! appended to a JSONL outbox instead of reaching a live network.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use outreach_core::account::{AccountUser, ChatMessage, Dialog, DialogKind, MessagingAccount};
use outreach_core::error::AccountError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// File name of the outbox written next to the snapshot.
pub const OUTBOX_FILE: &str = "outbox.jsonl";

/// An exported account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub me: AccountUser,

    #[serde(default)]
    pub dialogs: Vec<Dialog>,

    /// Messages per chat id, in any order
    #[serde(default)]
    pub histories: HashMap<i64, Vec<ChatMessage>>,

    /// Members per group/channel id
    #[serde(default)]
    pub members: HashMap<i64, Vec<AccountUser>>,

    /// Chats whose member list the account may not read
    #[serde(default)]
    pub forbidden_members: Vec<i64>,
}

/// One delivered message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxRecord {
    pub user_id: i64,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

pub struct SnapshotAccount {
    snapshot: AccountSnapshot,
    outbox: Option<PathBuf>,
    sent: Mutex<Vec<OutboxRecord>>,
}

impl SnapshotAccount {
    /// Keep the snapshot in memory only; sends are recorded but not written.
    pub fn from_snapshot(snapshot: AccountSnapshot) -> Self {
        Self {
            snapshot,
            outbox: None,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Load a snapshot file; the outbox goes next to it.
    pub async fn open(path: &Path) -> Result<Self, AccountError> {
        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
            AccountError::Unavailable(format!("cannot read {}: {e}", path.display()))
        })?;
        let snapshot: AccountSnapshot = serde_json::from_str(&json).map_err(|e| {
            AccountError::Unavailable(format!("invalid snapshot {}: {e}", path.display()))
        })?;

        let outbox = path
            .parent()
            .map(|dir| dir.join(OUTBOX_FILE))
            .unwrap_or_else(|| PathBuf::from(OUTBOX_FILE));

        info!(
            path = %path.display(),
            dialogs = snapshot.dialogs.len(),
            "Account snapshot loaded"
        );

        Ok(Self::from_snapshot(snapshot).with_outbox(outbox))
    }

    pub fn with_outbox(mut self, path: impl Into<PathBuf>) -> Self {
        self.outbox = Some(path.into());
        self
    }

    pub fn outbox(&self) -> Option<&Path> {
        self.outbox.as_deref()
    }

    /// Messages delivered through this instance.
    pub fn sent(&self) -> Vec<OutboxRecord> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }

    fn dialog(&self, chat_id: i64) -> Option<&Dialog> {
        self.snapshot.dialogs.iter().find(|d| d.chat_id == chat_id)
    }

    async fn append_outbox(&self, record: &OutboxRecord) -> Result<(), AccountError> {
        let Some(path) = &self.outbox else {
            return Ok(());
        };
        let failed = |reason: String| AccountError::DeliveryFailed {
            user_id: record.user_id,
            reason,
        };

        let mut line = serde_json::to_string(record).map_err(|e| failed(e.to_string()))?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| failed(format!("cannot open outbox: {e}")))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| failed(format!("cannot write outbox: {e}")))?;
        file.flush()
            .await
            .map_err(|e| failed(format!("cannot write outbox: {e}")))
    }
}

#[async_trait]
impl MessagingAccount for SnapshotAccount {
    async fn me(&self) -> Result<AccountUser, AccountError> {
        Ok(self.snapshot.me.clone())
    }

    async fn dialogs(&self) -> Result<Vec<Dialog>, AccountError> {
        Ok(self.snapshot.dialogs.clone())
    }

    async fn chat_history(
        &self,
        chat_id: i64,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, AccountError> {
        let Some(messages) = self.snapshot.histories.get(&chat_id) else {
            // A private dialog with no messages yet is not an error.
            return match self.dialog(chat_id) {
                Some(d) if d.kind == DialogKind::Private => Ok(Vec::new()),
                _ => Err(AccountError::NotFound(chat_id)),
            };
        };

        let mut newest_first = messages.clone();
        newest_first.sort_by(|a, b| b.date.cmp(&a.date));
        newest_first.truncate(limit);
        Ok(newest_first)
    }

    async fn chat_members(&self, chat_id: i64) -> Result<Vec<AccountUser>, AccountError> {
        if self.snapshot.forbidden_members.contains(&chat_id) {
            return Err(AccountError::Forbidden(format!(
                "member list of chat {chat_id} is not accessible"
            )));
        }
        match self.snapshot.members.get(&chat_id) {
            Some(members) => Ok(members.clone()),
            None if self.dialog(chat_id).is_some() => Ok(Vec::new()),
            None => Err(AccountError::NotFound(chat_id)),
        }
    }

    async fn send_message(&self, user_id: i64, text: &str) -> Result<(), AccountError> {
        let record = OutboxRecord {
            user_id,
            text: text.to_string(),
            sent_at: Utc::now(),
        };
        self.append_outbox(&record).await?;

        debug!(user_id, len = text.len(), "Message written to outbox");
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(record);
        }
        Ok(())
    }
}
