#![allow(dead_code)]

mod auth;
mod cards;
mod classify;
mod email;
mod error;
mod model;
mod pipeline;
mod rate_limiters;
mod routes;
mod server_config;
mod store;
#[cfg(test)]
mod testing;

use std::{sync::Arc, time::Duration};

use mimalloc::MiMalloc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use auth::{oauth::GoogleOauth, token_manager::TokenManager};
use cards::DefaultCardFactory;
use classify::HttpClassifier;
use email::GmailConnector;
use pipeline::{
    collaborators::LogOnlyNotifier,
    context::ContextBuilder,
    correlator::CampaignCorrelator,
    curator::InboxCurator,
    orchestrator::MailboxPipeline,
};
use routes::AppRouter;
use server_config::cfg;
use store::memory::{
    MemoryCardStore, MemoryContactDirectory, MemoryCredentialStore, MemoryJobStore,
    MemoryMessageStore, MemorySyncStateStore,
};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

pub type HttpClient = reqwest::Client;

#[derive(Clone)]
pub struct ServerState {
    pub pipeline: Arc<MailboxPipeline>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::Layer::default().with_ansi(false))
        .init();

    let http_client = reqwest::ClientBuilder::new()
        .use_rustls_tls()
        .timeout(Duration::from_secs(30))
        .build()?;

    // In-memory backends by default. Real deployments implement the store
    // traits against the CRM database and wire them in here.
    let credentials = MemoryCredentialStore::new();
    let sync_states = MemorySyncStateStore::new();
    let messages = MemoryMessageStore::new();
    let cards = MemoryCardStore::new();
    let contacts = MemoryContactDirectory::new();
    let jobs = MemoryJobStore::new();
    tracing::warn!("Using in-memory stores; connected mailboxes will not survive a restart");

    let token_manager = Arc::new(TokenManager::new(
        credentials.clone(),
        Arc::new(GoogleOauth::new(http_client.clone())),
    ));

    let pipeline = Arc::new(MailboxPipeline::new(
        token_manager,
        Arc::new(GmailConnector::new(http_client.clone())),
        sync_states.clone(),
        messages.clone(),
        cards.clone(),
        ContextBuilder::new(contacts.clone()),
        CampaignCorrelator::new(cards.clone(), jobs.clone()),
        InboxCurator::new(Arc::new(LogOnlyNotifier)),
        Arc::new(HttpClassifier::new(http_client.clone())),
        Arc::new(DefaultCardFactory),
    ));

    let state = ServerState { pipeline };
    let router = AppRouter::create(state);

    let addr = format!("{}:{}", cfg.server.host, cfg.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("mailroom listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutdown signal received");
}
