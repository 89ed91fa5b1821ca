//! # seed
//!
//! Loads the settings, wires the engine over the in-memory adapters and
//! opens a welcome thread on every configured board. Prints the resulting
//! metrics exposition so a deployment can be smoke-tested end to end.

use anyhow::Context;
use configs::{Settings, SystemSettings};
use domains::{NewPost, Requester};
use prometheus_client::encoding::text::encode;
use prometheus_client::registry::Registry;
use services::{Collaborators, EngineMetrics, PostingEngine, SharedState, SiteSecrets};
use std::sync::Arc;
use storage_adapters::{
    InMemoryStore, InMemoryUserDirectory, MemorySearchIndex, NoopRssGenerator, UnknownLocation,
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing(system: &SystemSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&system.log_filter));
    let registry = tracing_subscriber::registry().with(filter);
    if system.log_json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading settings")?;
    init_tracing(&settings.system);

    let mut registry = Registry::default();
    let metrics = EngineMetrics::register(&mut registry);
    let store = Arc::new(InMemoryStore::new());
    let collab = Collaborators {
        store: Arc::clone(&store) as _,
        geo: Arc::new(UnknownLocation),
        search: Arc::new(MemorySearchIndex::new()),
        rss: Arc::new(NoopRssGenerator),
        users: Arc::new(InMemoryUserDirectory::new()),
    };
    let engine = PostingEngine::new(
        collab,
        SharedState::from_settings(&settings).with_metrics(metrics),
        SiteSecrets::from_settings(&settings),
        settings.boards(),
    );

    let boards = engine.boards().names();
    if boards.is_empty() {
        tracing::warn!("no boards configured; nothing to seed");
    }
    let seeder = Requester::anonymous("127.0.0.1");
    for name in &boards {
        let welcome = NewPost {
            subject: format!("Welcome to /{name}/"),
            text: "Read the rules before posting.".to_string(),
            ..NewPost::default()
        };
        let number = engine
            .create_thread(name, &seeder, welcome)
            .await
            .with_context(|| format!("seeding /{name}/"))?;
        tracing::info!(board = %name, number, "welcome thread created");
    }

    let stats = store.stats().await;
    tracing::info!(threads = stats.threads, posts = stats.posts, "seeding finished");

    let mut exposition = String::new();
    encode(&mut exposition, &registry).context("encoding metrics")?;
    println!("{exposition}");
    Ok(())
}
