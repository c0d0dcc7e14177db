//! End-to-end integration tests for the outreach pipeline.
//!
//! These tests exercise ingestion, retrieval, tiered generation and the
//! campaign loop together, with upstream services simulated as down,
//! misbehaving, or healthy.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use outreach_agent::{Campaign, CampaignOptions, ContactStatus, TieredOrchestrator};
use outreach_channels::{
    AccountSnapshot, DiscoveryOptions, OUTBOX_FILE, OutboxRecord, SnapshotAccount, TargetDiscovery,
};
use outreach_config::AppConfig;
use outreach_core::account::{AccountUser, ChatMessage, Dialog, DialogKind};
use outreach_core::error::{GenerationError, RetrievalError};
use outreach_core::generation::{FAILURE_SENTINEL, TierKind, is_failure_sentinel};
use outreach_core::knowledge::{Embedder, Retriever};
use outreach_knowledge::{HashEmbedder, IndexRetriever, KnowledgeIndex, UnavailableRetriever, ingest_file};
use outreach_providers::{build_embedder, build_tiers};
use tokio::sync::watch;

// ── Fixtures ─────────────────────────────────────────────────────────────

const CLOUD_VAULT: &str = r#"[
    {
        "product_name": "CloudVault",
        "key_benefits": "шифрование end-to-end",
        "referral_link": "https://ref/cv",
        "target_audience": "пользователи облака"
    }
]"#;

const CATALOG: &str = r#"[
    {
        "product_name": "CloudVault",
        "key_benefits": "шифрование end-to-end для файлов",
        "referral_link": "https://ref/cv",
        "target_audience": "пользователи облака"
    },
    {
        "product_name": "TaskFlow",
        "key_benefits": "автоматическое планирование задач вместо Jira",
        "referral_link": "https://ref/tf",
        "target_audience": "стартапы и IT-команды"
    }
]"#;

/// Config whose network tiers point at a closed port.
fn offline_config(index_dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.primary.credentials = Some("Y2xpZW50OnNlY3JldA==".into());
    config.primary.auth_url = "http://127.0.0.1:1/api/v2/oauth".into();
    config.primary.base_url = "http://127.0.0.1:1/api/v1".into();
    config.primary.timeout_secs = 2;
    config.secondary.token = Some("hf_test".into());
    config.secondary.base_url = "http://127.0.0.1:1".into();
    config.secondary.timeout_secs = 2;
    config.knowledge.index_dir = index_dir.to_path_buf();
    config.knowledge.dimensions = 256;
    config
}

async fn ingest(dir: &Path, catalog: &str, config: &AppConfig) {
    let source = dir.join("products.json");
    std::fs::write(&source, catalog).unwrap();
    let embedder = build_embedder(config).unwrap();
    ingest_file(&source, &config.knowledge.index_dir, embedder.as_ref())
        .await
        .unwrap();
}

/// Wire the orchestrator the way the binary does.
fn orchestrator(config: &AppConfig) -> TieredOrchestrator {
    let retriever: Arc<dyn Retriever> = match KnowledgeIndex::open(&config.knowledge.index_dir) {
        Ok(index) => Arc::new(IndexRetriever::new(
            Arc::new(index),
            build_embedder(config).unwrap(),
        )),
        Err(e) => Arc::new(UnavailableRetriever::new(e)),
    };
    build_tiers(config)
        .tiers
        .into_iter()
        .fold(TieredOrchestrator::builder(retriever), |b, t| {
            b.tier(t.kind, t.backend)
        })
        .build()
}

fn user(id: i64, name: &str, username: &str) -> AccountUser {
    AccountUser {
        id,
        username: Some(username.into()),
        first_name: Some(name.into()),
        is_bot: false,
    }
}

fn private(peer: &AccountUser) -> Dialog {
    Dialog {
        chat_id: peer.id,
        kind: DialogKind::Private,
        title: None,
        peer: Some(peer.clone()),
        is_admin: false,
    }
}

// ── Tiered generation ────────────────────────────────────────────────────

#[tokio::test]
async fn template_fallback_when_every_network_tier_is_down() {
    let dir = tempfile::tempdir().unwrap();
    let config = offline_config(&dir.path().join("index"));
    ingest(dir.path(), CLOUD_VAULT, &config).await;

    let generation = orchestrator(&config)
        .generate(
            "Анна, приватность данных",
            "упоминает потерю файлов и шифрование",
        )
        .await;

    assert_eq!(generation.tier, Some(TierKind::Template));
    assert!(generation.text.contains("Анна"));
    assert!(
        generation.text.contains("CloudVault") || generation.text.contains("шифрование end-to-end")
    );
    assert!(generation.text.contains("https://ref/cv"));

    let kinds: Vec<TierKind> = generation.attempts.iter().map(|a| a.tier).collect();
    assert_eq!(
        kinds,
        vec![TierKind::Primary, TierKind::Secondary, TierKind::Template]
    );
    assert!(matches!(
        generation.attempts[0].outcome,
        Err(GenerationError::Network(_))
    ));
    assert!(matches!(
        generation.attempts[1].outcome,
        Err(GenerationError::Network(_))
    ));
}

#[tokio::test]
async fn missing_credentials_fall_through_without_network() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = offline_config(&dir.path().join("index"));
    config.primary.credentials = None;
    config.secondary.token = None;
    ingest(dir.path(), CLOUD_VAULT, &config).await;

    let plan = build_tiers(&config);
    assert_eq!(plan.warnings.len(), 2);

    let generation = orchestrator(&config).generate("Олег", "").await;
    assert_eq!(generation.tier, Some(TierKind::Template));
    assert!(generation.attempts[..2]
        .iter()
        .all(|a| matches!(a.outcome, Err(GenerationError::NotConfigured(_)))));
}

#[tokio::test]
async fn primary_output_is_returned_verbatim() {
    let mut server = mockito::Server::new_async().await;
    let expires_at = 4_102_444_800_000i64; // 2100-01-01
    let token = server
        .mock("POST", "/api/v2/oauth")
        .with_status(200)
        .with_body(
            serde_json::json!({"access_token": "tok", "expires_at": expires_at}).to_string(),
        )
        .create_async()
        .await;
    let chat = server
        .mock("POST", "/api/v1/chat/completions")
        .match_header("authorization", "Bearer tok")
        .with_status(200)
        .with_body(
            serde_json::json!({
                "choices": [{"message": {"role": "assistant",
                    "content": "Анна, слышал про потерю файлов? CloudVault шифрует всё: https://ref/cv"}}]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = offline_config(&dir.path().join("index"));
    config.primary.auth_url = format!("{}/api/v2/oauth", server.url());
    config.primary.base_url = format!("{}/api/v1", server.url());
    ingest(dir.path(), CLOUD_VAULT, &config).await;

    let text = orchestrator(&config)
        .generate_referral_message("Анна", "Анна: потеряла файлы")
        .await;
    assert_eq!(
        text,
        "Анна, слышал про потерю файлов? CloudVault шифрует всё: https://ref/cv"
    );

    token.assert_async().await;
    chat.assert_async().await;
}

#[tokio::test]
async fn secondary_rescues_rate_limited_primary() {
    let mut server = mockito::Server::new_async().await;
    let _token = server
        .mock("POST", "/api/v2/oauth")
        .with_status(429)
        .with_header("retry-after", "60")
        .create_async()
        .await;
    let _hf = server
        .mock("POST", "/models/facebook/bart-large-cnn")
        .with_status(200)
        .with_body(r#"[{"summary_text": "CloudVault защитит файлы: https://ref/cv"}]"#)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = offline_config(&dir.path().join("index"));
    config.primary.auth_url = format!("{}/api/v2/oauth", server.url());
    config.secondary.base_url = server.url();
    ingest(dir.path(), CLOUD_VAULT, &config).await;

    let generation = orchestrator(&config).generate("Анна", "").await;
    assert_eq!(generation.tier, Some(TierKind::Secondary));
    assert_eq!(generation.text, "CloudVault защитит файлы: https://ref/cv");
    assert_eq!(
        generation.attempts[0].outcome,
        Err(GenerationError::RateLimited {
            retry_after_secs: 60
        })
    );
}

#[tokio::test]
async fn missing_index_yields_sentinel() {
    let dir = tempfile::tempdir().unwrap();
    let config = offline_config(&dir.path().join("never-built"));

    let generation = orchestrator(&config)
        .generate("Анна, приватность данных", "")
        .await;
    assert!(generation.is_failure());
    assert_eq!(generation.text, FAILURE_SENTINEL);
    assert!(generation.attempts.iter().all(|a| matches!(
        a.outcome,
        Err(GenerationError::Retrieval(RetrievalError::IndexUnavailable(_)))
    )));
}

#[tokio::test]
async fn retrieval_picks_the_relevant_item() {
    let dir = tempfile::tempdir().unwrap();
    let config = offline_config(&dir.path().join("index"));
    ingest(dir.path(), CATALOG, &config).await;

    let text = orchestrator(&config)
        .generate_referral_message(
            "Олег, основатель стартапа",
            "Олег: мы до сих пор ведём планирование задач вручную в Jira",
        )
        .await;
    assert!(text.contains("TaskFlow"));
    assert!(text.contains("https://ref/tf"));
}

#[tokio::test]
async fn index_built_with_other_embedder_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let config = offline_config(&dir.path().join("index"));
    ingest(dir.path(), CLOUD_VAULT, &config).await;

    let index = Arc::new(KnowledgeIndex::open(&config.knowledge.index_dir).unwrap());
    let other: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(64));
    let retriever = IndexRetriever::new(index, other);
    assert!(matches!(
        retriever.retrieve("шифрование").await,
        Err(RetrievalError::IndexUnavailable(_))
    ));
}

// ── Campaign ─────────────────────────────────────────────────────────────

fn account_snapshot() -> AccountSnapshot {
    let me = user(1, "Владелец", "owner");
    let anna = user(10, "Анна", "anna");
    let oleg = user(11, "Олег", "oleg");

    AccountSnapshot {
        me: me.clone(),
        dialogs: vec![
            private(&anna),
            private(&oleg),
            Dialog {
                chat_id: -100,
                kind: DialogKind::Supergroup,
                title: Some("Приватность".into()),
                peer: None,
                is_admin: false,
            },
        ],
        histories: [(
            10,
            vec![ChatMessage {
                id: 1,
                sender: anna.clone(),
                text: Some("потеряла все файлы, нужно шифрование".into()),
                date: "2024-05-01T10:00:00Z".parse().unwrap(),
            }],
        )]
        .into(),
        members: [(-100, vec![me, anna, user(12, "Иван", "ivan")])].into(),
        forbidden_members: Vec::new(),
    }
}

#[tokio::test]
async fn campaign_delivers_template_messages_to_unique_contacts() {
    let dir = tempfile::tempdir().unwrap();
    let config = offline_config(&dir.path().join("index"));
    ingest(dir.path(), CLOUD_VAULT, &config).await;

    let snapshot_path = dir.path().join("my_account.json");
    std::fs::write(
        &snapshot_path,
        serde_json::to_string(&account_snapshot()).unwrap(),
    )
    .unwrap();
    let account = Arc::new(SnapshotAccount::open(&snapshot_path).await.unwrap());

    let discovery = TargetDiscovery::new(account.clone(), DiscoveryOptions::from(&config.account));
    let campaign = Campaign::new(
        Arc::new(orchestrator(&config)),
        discovery,
        account,
        CampaignOptions {
            pacing: Duration::ZERO,
            send_enabled: true,
            limit: None,
        },
    );

    let (_tx, rx) = watch::channel(false);
    let report = campaign.run(rx).await;

    assert_eq!(report.discovered, 3);
    assert_eq!(report.sent, 3);
    assert!(report
        .outcomes
        .iter()
        .all(|o| o.tier == Some(TierKind::Template) && o.status == ContactStatus::Sent));

    let outbox = std::fs::read_to_string(dir.path().join(OUTBOX_FILE)).unwrap();
    let records: Vec<OutboxRecord> = outbox
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    let ids: Vec<i64> = records.iter().map(|r| r.user_id).collect();
    assert_eq!(ids, vec![10, 11, 12]);
    assert!(records.iter().all(|r| r.text.contains("https://ref/cv")));
    assert!(records.iter().all(|r| !is_failure_sentinel(&r.text)));
    assert!(records[2].text.contains("Участник группы 'Приватность'"));
}

#[tokio::test]
async fn campaign_without_index_sends_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = offline_config(&dir.path().join("missing"));
    let account = Arc::new(SnapshotAccount::from_snapshot(account_snapshot()));

    let discovery = TargetDiscovery::new(account.clone(), DiscoveryOptions::default());
    let campaign = Campaign::new(
        Arc::new(orchestrator(&config)),
        discovery,
        account.clone(),
        CampaignOptions {
            pacing: Duration::ZERO,
            send_enabled: true,
            limit: None,
        },
    );

    let (_tx, rx) = watch::channel(false);
    let report = campaign.run(rx).await;
    assert_eq!(report.skipped, 3);
    assert_eq!(report.sent, 0);
    assert!(account.sent().is_empty());
}
