//! `outreach generate`: one orchestrated referral message.

use outreach_core::generation::{GenerationRequest, TierKind};

use crate::runtime::{Runtime, load_config};

pub async fn run(contact: String, history: String, show_context: bool) -> anyhow::Result<()> {
    let config = load_config()?;
    let runtime = Runtime::build(&config);

    for warning in &runtime.warnings {
        println!("⚠️  {warning}");
    }

    if show_context {
        print_context(&runtime, &contact, &history, config.knowledge.top_k).await;
    }

    let generation = runtime.orchestrator.generate(&contact, &history).await;

    for attempt in &generation.attempts {
        match &attempt.outcome {
            Ok(()) => println!("  ✅ {}", attempt.tier),
            Err(e) => println!("  ❌ {}: {e}", attempt.tier),
        }
    }

    match generation.tier {
        Some(tier) => {
            let note = if tier == TierKind::Template {
                " (template fallback)"
            } else {
                ""
            };
            println!("\n✉️  Message from {tier} tier{note}:\n");
            println!("{}", generation.text);
            Ok(())
        }
        None => {
            println!("\n{}", generation.text);
            anyhow::bail!("all generation tiers failed; nothing to send")
        }
    }
}

async fn print_context(runtime: &Runtime, contact: &str, history: &str, top_k: usize) {
    let Some(index) = &runtime.index else {
        println!("🔎 No knowledge index available");
        return;
    };
    let request = GenerationRequest::new(contact, history);
    println!("🔎 Query: {}", request.search_query);
    match index.search(&request.search_query, top_k).await {
        Ok(hits) => {
            for (i, hit) in hits.iter().enumerate() {
                println!("  {}. [{:.3}] {}", i + 1, hit.score, hit.text);
            }
        }
        Err(e) => println!("  ❌ {e}"),
    }
    println!();
}
