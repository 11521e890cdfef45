//! Walks one report through a short discussion against a running server.
//!
//! Usage: `client [report-id]`; the server address comes from `RELIEF_API_URL`.

use adapter::{ClientSettings, CommentController, EventBus, HttpStore, ReactionAggregator};
use anyhow::Context;
use domain::{CommentNode, ReactionKind, ReportEvent, ReportId, Session};
use std::sync::Arc;

fn print_node(node: &CommentNode, depth: usize) {
    println!(
        "{}- [{}] {}: {}",
        "  ".repeat(depth + 3),
        node.comment.id,
        node.comment.author_name,
        node.comment.text
    );
    for child in &node.children {
        print_node(child, depth + 1);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let report_id = ReportId::new(std::env::args().nth(1).unwrap_or_else(|| "demo-report".into()))
        .context("Invalid report id")?;
    let settings = ClientSettings::from_env();
    let session = Session::anonymous();
    println!("Relief client -> {} (session {})", settings.api_url, session.session_id());

    let store = Arc::new(HttpStore::new(&settings, &session)?);
    let bus = EventBus::new();
    let _log = bus.subscribe(&report_id, |event: &ReportEvent| {
        println!("   <- event: {}", event.name());
    });

    let comments = CommentController::new(report_id.clone(), session.clone(), store.clone(), bus.clone());
    let reactions = ReactionAggregator::new(report_id.clone(), session, store, bus);

    println!("\n[1/4] Loading thread...");
    let existing = comments.refresh().await?;
    println!("   -> {} comment(s) so far", existing);

    println!("\n[2/4] Posting a comment and a reply...");
    let root = comments
        .create("Road to the shelter is flooded past the bridge.", None)
        .await?;
    comments
        .create("Confirmed, take the north detour.", Some(&root.id))
        .await?;

    println!("\n[3/4] Reacting twice (second tap clears)...");
    let first = reactions.react(Some(ReactionKind::Care)).await?;
    println!("   -> care={} total={}", first.count(ReactionKind::Care), first.total);
    let second = reactions.react(Some(ReactionKind::Care)).await?;
    println!("   -> care={} total={}", second.count(ReactionKind::Care), second.total);

    println!("\n[4/4] Thread now:");
    comments.refresh().await?;
    for node in comments.tree().roots() {
        print_node(node, 0);
    }

    Ok(())
}
