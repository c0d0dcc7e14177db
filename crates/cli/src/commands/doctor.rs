//! `outreach doctor`: diagnose configuration, credentials and index health.

use outreach_config::{AppConfig, EmbedderKind};
use outreach_knowledge::KnowledgeIndex;

pub async fn run() -> anyhow::Result<()> {
    println!("🩺 Outreach Doctor: System Diagnostics");
    println!("======================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  ⚠️  No config file, using defaults (run `outreach onboard`)");
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            return Ok(());
        }
    };

    // Tiers
    if !config.primary.enabled {
        println!("  ⏸️  Primary tier (GigaChat) disabled");
    } else if config.has_primary_credentials() {
        println!("  ✅ Primary tier (GigaChat) credentials set");
        if !config.primary.verify_tls {
            println!("  ⚠️  Primary tier TLS verification disabled");
        }
    } else {
        println!("  ⚠️  Primary tier (GigaChat): GIGACHAT_CREDENTIALS not set");
        issues += 1;
    }

    if !config.secondary.enabled {
        println!("  ⏸️  Secondary tier (Hugging Face) disabled");
    } else if config.has_secondary_credentials() {
        println!(
            "  ✅ Secondary tier (Hugging Face) token set, model {} ({})",
            config.secondary.model,
            config.secondary.task.as_str()
        );
    } else {
        println!("  ⚠️  Secondary tier (Hugging Face): HF_TOKEN not set");
        issues += 1;
    }
    println!("  ✅ Template tier always available");

    // Knowledge index
    match KnowledgeIndex::open(&config.knowledge.index_dir) {
        Ok(index) if index.is_empty() => {
            println!("  ⚠️  Knowledge index at {} is empty", index.dir().display());
            issues += 1;
        }
        Ok(index) => {
            println!(
                "  ✅ Knowledge index: {} item(s), {} ({} dims), built {}",
                index.len(),
                index.embedding_model(),
                index.dimensions(),
                index.created_at().format("%Y-%m-%d %H:%M")
            );
        }
        Err(e) => {
            println!("  ❌ Knowledge index: {e} (run `outreach ingest`)");
            issues += 1;
        }
    }
    if config.knowledge.embedder == EmbedderKind::Huggingface && !config.has_secondary_credentials()
    {
        println!("  ❌ Hugging Face embedder selected but HF_TOKEN not set");
        issues += 1;
    }

    // Account
    if config.has_account_credentials() {
        println!("  ✅ Account credentials (TG_API_ID / TG_API_HASH) set");
    } else {
        println!("  ⚠️  TG_API_ID / TG_API_HASH not set; `outreach run` will skip discovery");
        issues += 1;
    }
    let snapshot = config.account.snapshot_file();
    if snapshot.exists() {
        println!("  ✅ Account session found: {}", snapshot.display());
    } else {
        println!("  ⚠️  No account session at {}", snapshot.display());
        issues += 1;
    }
    if config.campaign.send_enabled {
        println!("  ⚠️  campaign.send_enabled = true: `outreach run --send` will deliver");
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
