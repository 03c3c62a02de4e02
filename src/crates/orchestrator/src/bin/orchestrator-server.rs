//! Orchestrator server binary
//!
//! Serves the scrape, task, prioritize and live progress endpoints.

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use llm::{GeminiClient, RemoteLlmConfig, TextGenerator};
use orchestrator::analysis::ResultAggregator;
use orchestrator::api::{create_router, AppState};
use orchestrator::config::{ServerConfig, StoreBackend};
use orchestrator::db::{
    DatabaseConnection, MemoryTaskRepository, SqliteTaskRepository, TaskRepository,
};
use orchestrator::execution::{ScrapeOrchestrator, TaskRunner};
use orchestrator::realtime::{ProgressBus, SubscriptionManager};
use orchestrator::services::ScrapeService;
use orchestrator::sources::{FetcherRegistry, RedditFetcher, SerpApiFetcher, SourceKind};
use orchestrator::store::TaskStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing/logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::load().context("failed to load server configuration")?;
    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .with_context(|| format!("invalid listen address {}", config.bind_address()))?;

    let (repo, store_fallback) = open_repository(&config).await;
    let bus = ProgressBus::new(config.realtime.channel_capacity);
    let store = TaskStore::new(repo, bus, config.retention());
    tracing::info!(backend = store.backend(), retention_secs = config.store.retention_secs, "Task store ready");

    let generator = build_generator(&config);
    let registry = build_registry(&config)?;
    tracing::info!(sources = ?registry.kinds(), "Source fetchers registered");

    let aggregator = generator
        .as_ref()
        .map(|g| ResultAggregator::new(Arc::clone(g), config.aggregator_settings()));
    let runner = TaskRunner::new(store.clone(), ScrapeOrchestrator::new(registry), aggregator)
        .with_max_search_urls(config.analysis.max_search_urls);
    let service = ScrapeService::new(runner, generator);
    let subscriptions = SubscriptionManager::new(store.clone(), config.subscription_settings());

    let purge = spawn_purge(store.clone(), Duration::from_secs(config.store.purge_interval_secs));

    let state = AppState::new(
        service,
        subscriptions,
        Duration::from_secs(config.realtime.keepalive_secs),
    )
    .with_store_fallback(store_fallback);
    let app = create_router(state);

    tracing::info!("Starting orchestrator server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    purge.abort();
    tracing::info!("Orchestrator server shut down gracefully");
    Ok(())
}

/// Open the configured repository. A SQLite store that cannot be opened,
/// migrated or checked falls back to memory; the flag reports that.
async fn open_repository(config: &ServerConfig) -> (Arc<dyn TaskRepository>, bool) {
    let memory = || -> Arc<dyn TaskRepository> { Arc::new(MemoryTaskRepository::new()) };
    if config.store.backend == StoreBackend::Memory {
        return (memory(), false);
    }

    let database_url = config.database_url();
    tracing::info!("Connecting to database: {}", database_url);
    let opened = async {
        let db = DatabaseConnection::new(&database_url).await?;
        db.run_migrations().await?;
        db.health_check().await?;
        Ok::<_, orchestrator::db::DatabaseError>(db)
    }
    .await;

    match opened {
        Ok(db) => {
            let repo: Arc<dyn TaskRepository> = Arc::new(SqliteTaskRepository::new(db.pool().clone()));
            (repo, false)
        }
        Err(e) => {
            tracing::error!(error = %e, "Store unavailable, falling back to in-memory tasks");
            (memory(), true)
        }
    }
}

fn build_generator(config: &ServerConfig) -> Option<Arc<dyn TextGenerator>> {
    let llm = &config.llm;
    let remote = match RemoteLlmConfig::from_env(&llm.api_key_env, llm.base_url.clone(), llm.model.clone()) {
        Ok(remote) => remote
            .with_timeout(Duration::from_secs(llm.timeout_secs))
            .with_tools(llm.enable_tools),
        Err(e) => {
            tracing::warn!(error = %e, "No generation API key, analysis is disabled");
            return None;
        }
    };

    match GeminiClient::new(remote) {
        Ok(client) => {
            tracing::info!(model = %llm.model, tools = llm.enable_tools, "Generation service configured");
            let client: Arc<dyn TextGenerator> = Arc::new(client);
            Some(client)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to build generation client, analysis is disabled");
            None
        }
    }
}

fn build_registry(config: &ServerConfig) -> anyhow::Result<FetcherRegistry> {
    let sources = &config.sources;
    let timeout = Duration::from_secs(sources.timeout_secs);
    let mut registry = FetcherRegistry::new();

    let reddit = RedditFetcher::new(sources.reddit_base_url.clone(), timeout)
        .context("failed to build Reddit fetcher")?;
    registry.register(SourceKind::Reddit, Arc::new(reddit));

    match std::env::var(&sources.serpapi_key_env) {
        Ok(key) if !key.trim().is_empty() => {
            let serpapi = Arc::new(
                SerpApiFetcher::new(key, sources.base_url.clone(), timeout, sources.play_reviews)
                    .context("failed to build SerpAPI fetcher")?,
            );
            for kind in SerpApiFetcher::kinds() {
                registry.register(kind, serpapi.clone());
            }
        }
        _ => tracing::warn!(
            env = %sources.serpapi_key_env,
            "No SerpAPI key, store and search sources will fail"
        ),
    }

    Ok(registry)
}

fn spawn_purge(store: TaskStore, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every.max(Duration::from_secs(1)));
        loop {
            ticker.tick().await;
            if let Err(e) = store.purge_expired().await {
                tracing::warn!(error = %e, "Purge of expired tasks failed");
            }
        }
    })
}

/// Signal for graceful shutdown (Ctrl-C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install CTRL-C signal handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received CTRL-C signal, shutting down");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, shutting down");
        }
    }
}
