//! Outreach campaign: discovery, generation and gated delivery, one
//! contact at a time.
//!
//! Per contact: generate → skip on the failure sentinel → send (only when
//! enabled) or log a dry run. The pacing pause sits between two contacts,
//! so a run never sleeps after its last one. Cancellation is honoured
//! before each contact and during the pause, never mid-generation.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use outreach_channels::TargetDiscovery;
use outreach_core::account::MessagingAccount;
use outreach_core::generation::TierKind;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::orchestrator::TieredOrchestrator;

#[derive(Debug, Clone)]
pub struct CampaignOptions {
    /// Pause between contacts
    pub pacing: Duration,

    /// Deliver messages; otherwise only log them
    pub send_enabled: bool,

    /// Stop after this many contacts
    pub limit: Option<usize>,
}

impl Default for CampaignOptions {
    fn default() -> Self {
        Self {
            pacing: Duration::from_secs(5),
            send_enabled: false,
            limit: None,
        }
    }
}

/// What happened to one contact.
#[derive(Debug, Clone, PartialEq)]
pub enum ContactStatus {
    /// Generated and delivered
    Sent,
    /// Generated, delivery disabled
    DryRun,
    /// Every tier failed; nothing sent
    Skipped,
    /// Generated, delivery failed
    SendFailed { reason: String },
}

#[derive(Debug, Clone)]
pub struct ContactOutcome {
    pub user_id: i64,
    pub label: String,
    pub tier: Option<TierKind>,
    pub message: String,
    pub status: ContactStatus,
}

#[derive(Debug, Clone, Default)]
pub struct CampaignReport {
    pub discovered: usize,
    pub generated: usize,
    pub skipped: usize,
    pub sent: usize,
    pub send_failures: usize,
    pub cancelled: bool,
    pub outcomes: Vec<ContactOutcome>,
}

pub struct Campaign {
    orchestrator: Arc<TieredOrchestrator>,
    discovery: TargetDiscovery,
    account: Arc<dyn MessagingAccount>,
    options: CampaignOptions,
}

impl Campaign {
    pub fn new(
        orchestrator: Arc<TieredOrchestrator>,
        discovery: TargetDiscovery,
        account: Arc<dyn MessagingAccount>,
        options: CampaignOptions,
    ) -> Self {
        Self {
            orchestrator,
            discovery,
            account,
            options,
        }
    }

    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> CampaignReport {
        let mut report = CampaignReport::default();
        let mut targets = self.discovery.targets();

        info!(
            send_enabled = self.options.send_enabled,
            pacing_secs = self.options.pacing.as_secs(),
            "Campaign started"
        );

        loop {
            if *shutdown.borrow() {
                report.cancelled = true;
                break;
            }
            if self.limit_reached(&report) {
                break;
            }
            let Some(target) = targets.next().await else {
                break;
            };
            if report.discovered > 0 && self.pause(&mut shutdown).await {
                report.cancelled = true;
                break;
            }
            report.discovered += 1;

            let label = target.label();
            info!(contact = %label, "Processing contact");

            let generation = self
                .orchestrator
                .generate(&target.contact_info, &target.chat_history())
                .await;

            let status = if generation.is_failure() {
                warn!(contact = %label, "Skipping delivery: all generation tiers failed");
                report.skipped += 1;
                ContactStatus::Skipped
            } else {
                report.generated += 1;
                self.deliver(target.user_id, &label, &generation.text, &mut report)
                    .await
            };

            report.outcomes.push(ContactOutcome {
                user_id: target.user_id,
                label,
                tier: generation.tier,
                message: generation.text,
                status,
            });
        }

        info!(
            discovered = report.discovered,
            generated = report.generated,
            skipped = report.skipped,
            sent = report.sent,
            send_failures = report.send_failures,
            cancelled = report.cancelled,
            "Campaign finished"
        );
        report
    }

    fn limit_reached(&self, report: &CampaignReport) -> bool {
        self.options
            .limit
            .is_some_and(|limit| report.discovered >= limit)
    }

    async fn deliver(
        &self,
        user_id: i64,
        label: &str,
        text: &str,
        report: &mut CampaignReport,
    ) -> ContactStatus {
        if !self.options.send_enabled {
            info!(contact = %label, "Dry run: message not sent");
            return ContactStatus::DryRun;
        }

        match self.account.send_message(user_id, text).await {
            Ok(()) => {
                info!(contact = %label, "Message sent");
                report.sent += 1;
                ContactStatus::Sent
            }
            Err(e) => {
                warn!(contact = %label, error = %e, "Message delivery failed");
                report.send_failures += 1;
                ContactStatus::SendFailed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Sleep for the pacing interval. Returns `true` if cancelled meanwhile.
    async fn pause(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        let sleep = tokio::time::sleep(self.options.pacing);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return *shutdown.borrow(),
                changed = shutdown.changed() => match changed {
                    Ok(()) if *shutdown.borrow() => return true,
                    Ok(()) => continue,
                    // Sender gone: nobody can cancel any more.
                    Err(_) => {
                        (&mut sleep).await;
                        return false;
                    }
                },
            }
        }
    }
}
