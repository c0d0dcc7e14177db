//! `outreach run`: discovery plus campaign over the configured account.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use outreach_agent::{Campaign, CampaignOptions, ContactStatus};
use outreach_channels::{DiscoveryOptions, SnapshotAccount, TargetDiscovery};
use outreach_core::account::MessagingAccount;
use tokio::sync::watch;
use tracing::info;

use crate::runtime::{Runtime, load_config};

pub async fn run(send: bool, limit: Option<usize>) -> anyhow::Result<()> {
    let config = load_config()?;

    if !config.has_account_credentials() {
        anyhow::bail!("TG_API_ID and TG_API_HASH are not set; target discovery skipped");
    }

    let snapshot = config.account.snapshot_file();
    let account = Arc::new(
        SnapshotAccount::open(&snapshot)
            .await
            .with_context(|| format!("cannot open account session {}", snapshot.display()))?,
    );
    let me = account.me().await.context("cannot identify account owner")?;
    println!("👤 Account: {}", me.display_name());

    let runtime = Runtime::build(&config);
    for warning in &runtime.warnings {
        println!("⚠️  {warning}");
    }

    let send_enabled = send && config.campaign.send_enabled;
    if send && !config.campaign.send_enabled {
        println!("⚠️  --send given but campaign.send_enabled = false; running dry");
    }

    let discovery = TargetDiscovery::new(account.clone(), DiscoveryOptions::from(&config.account));
    let campaign = Campaign::new(
        runtime.orchestrator.clone(),
        discovery,
        account,
        CampaignOptions {
            pacing: Duration::from_secs(config.campaign.pacing_secs),
            send_enabled,
            limit,
        },
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received; stopping after the current contact");
            let _ = shutdown_tx.send(true);
        }
    });

    let report = campaign.run(shutdown_rx).await;

    for outcome in &report.outcomes {
        println!("\n--- {} ---", outcome.label);
        match &outcome.status {
            ContactStatus::Skipped => println!("⏭️  Skipped: {}", outcome.message),
            ContactStatus::DryRun => println!("📝 (dry run)\n{}", outcome.message),
            ContactStatus::Sent => println!("✅ Sent\n{}", outcome.message),
            ContactStatus::SendFailed { reason } => println!("❌ Send failed: {reason}"),
        }
    }

    println!(
        "\n📊 {} contact(s): {} generated, {} skipped, {} sent, {} failed{}",
        report.discovered,
        report.generated,
        report.skipped,
        report.sent,
        report.send_failures,
        if report.cancelled { " (cancelled)" } else { "" }
    );
    if report.discovered == 0 && !report.cancelled {
        println!("   No target users found.");
    }
    Ok(())
}
