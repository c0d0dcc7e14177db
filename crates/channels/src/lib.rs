//! Messaging-account side of the outreach agent.
//!
//! - **Discovery**: walks any [`MessagingAccount`](outreach_core::MessagingAccount)
//!   and yields deduplicated [`TargetUser`](outreach_core::TargetUser)s
//! - **Snapshot**: an account served from an exported JSON snapshot, with a
//!   JSONL outbox for sent messages

pub mod discovery;
pub mod snapshot;

pub use discovery::{DiscoveryOptions, TargetDiscovery};
pub use snapshot::{AccountSnapshot, OUTBOX_FILE, OutboxRecord, SnapshotAccount};
