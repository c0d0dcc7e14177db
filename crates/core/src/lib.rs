//! # Outreach Core
//!
//! Domain types, traits, and error definitions for the referral outreach
//! agent. This crate performs no I/O; it defines the domain model that all
//! other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every seam is a trait here (`Retriever`, `Embedder`, `GenerationBackend`,
//! `MessagingAccount`). Implementations live in their respective crates,
//! which keeps tiers swappable and each one testable with a stub.

pub mod account;
pub mod error;
pub mod generation;
pub mod knowledge;

// Re-export key types at crate root for ergonomics
pub use account::{AccountUser, ChatHistory, ChatMessage, Dialog, DialogKind, MessagingAccount, TargetUser};
pub use error::{AccountError, GenerationError, RetrievalError};
pub use generation::{
    BackendInput, FAILURE_SENTINEL, Generation, GenerationBackend, GenerationRequest, TierAttempt,
    TierKind, is_failure_sentinel,
};
pub use knowledge::{Embedder, KnowledgeEntry, RetrievedContext, Retriever};
