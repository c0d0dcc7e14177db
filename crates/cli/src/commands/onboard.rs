//! `outreach onboard`: first-time setup.

use anyhow::Context;
use outreach_config::AppConfig;

pub async fn run() -> anyhow::Result<()> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("📣 Outreach: First-Time Setup");
    println!("=============================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)
            .with_context(|| format!("cannot create {}", config_dir.display()))?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())
        .with_context(|| format!("cannot write {}", config_path.display()))?;
    println!("✅ Created config.toml at: {}", config_path.display());

    println!("\n📝 Next steps:");
    println!("   1. export GIGACHAT_CREDENTIALS=...   (primary tier)");
    println!("   2. export HF_TOKEN=...               (secondary tier)");
    println!("   3. outreach ingest --source products.json");
    println!("   4. outreach generate --contact \"Анна, приватность данных\"");
    println!("   5. export TG_API_ID=... TG_API_HASH=... and place the account");
    println!(
        "      snapshot at {} before `outreach run`",
        AppConfig::default().account.snapshot_file().display()
    );
    println!("\n   Run `outreach doctor` to check everything.\n");

    Ok(())
}
