//! Target discovery: walks a messaging account and yields contacts to reach.
//!
//! Private dialogs come first, in dialog order, then members of groups the
//! account can see. Every contact is emitted at most once per walk (first
//! seen wins). Failures for one dialog or one contact are logged and
//! skipped; the walk only stops early if the account itself is unusable.

use futures::StreamExt;
use futures::stream::{self, BoxStream};
use outreach_config::AccountConfig;
use outreach_core::account::{
    AccountUser, ChatHistory, ChatMessage, Dialog, DialogKind, MessagingAccount, TargetUser,
};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Messages of history fetched per contact
    pub history_limit: usize,

    /// Also list members of groups, supergroups and administered channels
    pub include_groups: bool,

    /// Sender label for the account's own messages
    pub self_label: String,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            history_limit: 10,
            include_groups: true,
            self_label: "Я".into(),
        }
    }
}

impl From<&AccountConfig> for DiscoveryOptions {
    fn from(config: &AccountConfig) -> Self {
        Self {
            history_limit: config.history_limit,
            include_groups: config.include_groups,
            self_label: config.self_label.clone(),
        }
    }
}

pub struct TargetDiscovery {
    account: Arc<dyn MessagingAccount>,
    options: DiscoveryOptions,
}

impl TargetDiscovery {
    pub fn new(account: Arc<dyn MessagingAccount>, options: DiscoveryOptions) -> Self {
        Self { account, options }
    }

    /// A lazy walk over the account. Each call starts a fresh walk.
    pub fn targets(&self) -> BoxStream<'_, TargetUser> {
        stream::unfold(Walk::new(self), |mut walk| async move {
            let target = walk.next().await?;
            Some((target, walk))
        })
        .boxed()
    }

    /// Run a full walk and collect the unique targets.
    pub async fn discover(&self) -> Vec<TargetUser> {
        let targets: Vec<TargetUser> = self.targets().collect().await;
        info!(count = targets.len(), "Target discovery finished");
        targets
    }

    async fn history(&self, me: &AccountUser, chat_id: i64) -> ChatHistory {
        match self
            .account
            .chat_history(chat_id, self.options.history_limit)
            .await
        {
            Ok(messages) => render_history(&messages, me, &self.options.self_label),
            Err(e) => {
                debug!(chat_id, error = %e, "Chat history unavailable");
                ChatHistory::Unavailable(e.to_string())
            }
        }
    }
}

/// A contact found but not yet emitted.
struct Candidate {
    user: AccountUser,
    contact_info: String,
}

/// State of one walk.
struct Walk<'a> {
    discovery: &'a TargetDiscovery,
    me: Option<AccountUser>,
    started: bool,
    dialogs: VecDeque<Dialog>,
    pending: VecDeque<Candidate>,
    seen: HashSet<i64>,
}

impl<'a> Walk<'a> {
    fn new(discovery: &'a TargetDiscovery) -> Self {
        Self {
            discovery,
            me: None,
            started: false,
            dialogs: VecDeque::new(),
            pending: VecDeque::new(),
            seen: HashSet::new(),
        }
    }

    async fn start(&mut self) -> Option<()> {
        let account = &self.discovery.account;

        let me = match account.me().await {
            Ok(me) => me,
            Err(e) => {
                warn!(error = %e, "Cannot identify account owner; discovery aborted");
                return None;
            }
        };
        let dialogs = match account.dialogs().await {
            Ok(dialogs) => dialogs,
            Err(e) => {
                warn!(error = %e, "Cannot list dialogs; discovery aborted");
                return None;
            }
        };

        debug!(dialogs = dialogs.len(), "Walking dialogs");
        self.me = Some(me);
        self.dialogs = dialogs.into();
        Some(())
    }

    async fn next(&mut self) -> Option<TargetUser> {
        if !self.started {
            self.started = true;
            self.start().await?;
        }
        let me = self.me.clone()?;

        loop {
            if let Some(candidate) = self.pending.pop_front() {
                if !self.seen.insert(candidate.user.id) {
                    debug!(user_id = candidate.user.id, "Duplicate contact skipped");
                    continue;
                }
                let history = self.discovery.history(&me, candidate.user.id).await;
                return Some(TargetUser {
                    user_id: candidate.user.id,
                    username: candidate.user.username,
                    first_name: candidate.user.first_name,
                    contact_info: candidate.contact_info,
                    history,
                });
            }

            let dialog = self.dialogs.pop_front()?;
            self.expand(&dialog, &me).await;
        }
    }

    /// Queue the candidates one dialog contributes.
    async fn expand(&mut self, dialog: &Dialog, me: &AccountUser) {
        match dialog.kind {
            DialogKind::Private => {
                let Some(peer) = &dialog.peer else { return };
                if is_reachable_peer(peer, me) {
                    self.pending.push_back(Candidate {
                        user: peer.clone(),
                        contact_info: private_contact_info(peer),
                    });
                }
            }
            DialogKind::Group | DialogKind::Supergroup if self.discovery.options.include_groups => {
                self.queue_members(dialog, me).await;
            }
            DialogKind::Channel if self.discovery.options.include_groups && dialog.is_admin => {
                self.queue_members(dialog, me).await;
            }
            _ => {}
        }
    }

    async fn queue_members(&mut self, dialog: &Dialog, me: &AccountUser) {
        let title = dialog.title.as_deref().unwrap_or_default();
        match self.discovery.account.chat_members(dialog.chat_id).await {
            Ok(members) => {
                debug!(chat_id = dialog.chat_id, members = members.len(), "Group members listed");
                let contact_info = format!("Участник группы '{title}'");
                self.pending.extend(
                    members
                        .into_iter()
                        .filter(|m| !m.is_bot && m.id != me.id)
                        .map(|user| Candidate {
                            user,
                            contact_info: contact_info.clone(),
                        }),
                );
            }
            Err(e) => {
                warn!(chat_id = dialog.chat_id, title, error = %e, "Cannot list group members, skipping");
            }
        }
    }
}

fn is_reachable_peer(peer: &AccountUser, me: &AccountUser) -> bool {
    !peer.is_bot
        && peer.id != me.id
        && (has_text(&peer.username) || has_text(&peer.first_name))
}

fn has_text(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

fn private_contact_info(peer: &AccountUser) -> String {
    let name = peer
        .first_name
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| peer.display_name());
    match peer.username.as_deref().filter(|u| !u.trim().is_empty()) {
        Some(username) => format!("Имя: {name}, username: @{username}"),
        None => format!("Имя: {name}"),
    }
}

/// Oldest-first `"{sender}: {text}"` lines; media-only messages are skipped.
fn render_history(newest_first: &[ChatMessage], me: &AccountUser, self_label: &str) -> ChatHistory {
    let lines: Vec<String> = newest_first
        .iter()
        .rev()
        .filter_map(|m| {
            let text = m.text.as_deref().filter(|t| !t.trim().is_empty())?;
            let sender = if m.sender.id == me.id {
                self_label.to_string()
            } else {
                m.sender.display_name()
            };
            Some(format!("{sender}: {text}"))
        })
        .collect();

    if lines.is_empty() {
        ChatHistory::Empty
    } else {
        ChatHistory::Available(lines.join("\n"))
    }
}
