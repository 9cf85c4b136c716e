//! Process roles.
//!
//! `server` runs the chat surface and the result router, `bot` runs the
//! quote workers, and `standalone` runs both over an in-process queue.

use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::bot::{QuoteLookup, QuoteWorker, StooqClient};
use crate::chat::{ChatService, MessageStore, ResultRouter, RoomHub};
use crate::config::Config;
use crate::db::{Database, SqliteMessageStore};
use crate::queue::{self, MemoryQueue, SharedTransport};
use crate::web::{AppState, WebServer};
use crate::Result;

/// Run the chat server until `shutdown` is cancelled.
///
/// Fails fast when the queue transport cannot be reached.
pub async fn run_server(config: &Config, shutdown: CancellationToken) -> Result<()> {
    let transport = queue::connect(&config.queue).await.map_err(|e| {
        error!(url = %config.queue.url, error = %e, "Queue transport unreachable");
        e
    })?;
    info!(url = %config.queue.url, "Connected to queue transport");

    serve(config, transport, shutdown).await
}

/// Run the quote bot until `shutdown` is cancelled.
pub async fn run_bot(config: &Config, shutdown: CancellationToken) -> Result<()> {
    let transport = queue::connect(&config.queue).await.map_err(|e| {
        error!(url = %config.queue.url, error = %e, "Queue transport unreachable");
        e
    })?;
    info!(url = %config.queue.url, "Connected to queue transport");

    let mut consumers = start_bot(config, transport).await?;
    info!(consumers = config.bot.consumers, "Quote bot running");

    tokio::select! {
        _ = shutdown.cancelled() => info!("Shutting down quote bot"),
        _ = async { while consumers.join_next().await.is_some() {} } => {
            warn!("All quote consumers stopped");
        }
    }

    consumers.shutdown().await;
    Ok(())
}

/// Run server and bot in one process over the in-memory queue.
pub async fn run_standalone(config: &Config, shutdown: CancellationToken) -> Result<()> {
    let transport: SharedTransport = Arc::new(MemoryQueue::new());
    info!("Running standalone with the in-memory queue");

    let mut consumers = start_bot(config, Arc::clone(&transport)).await?;
    let result = serve(config, transport, shutdown).await;

    consumers.shutdown().await;
    result
}

async fn start_bot(config: &Config, transport: SharedTransport) -> Result<JoinSet<()>> {
    let lookup: Arc<dyn QuoteLookup> = Arc::new(StooqClient::new(&config.quote)?);
    let worker = Arc::new(QuoteWorker::new(
        transport,
        lookup,
        config.queue.result_queue.clone(),
    ));

    let consumers = worker
        .spawn(&config.queue.request_queue, config.bot.consumers)
        .await?;
    Ok(consumers)
}

async fn serve(
    config: &Config,
    transport: SharedTransport,
    shutdown: CancellationToken,
) -> Result<()> {
    let db = Database::open(&config.database.path).await?;

    let hub = Arc::new(RoomHub::from_config(&config.hub));
    let store: Arc<dyn MessageStore> = Arc::new(SqliteMessageStore::new(db.pool().clone()));
    let chat = Arc::new(ChatService::new(
        Arc::clone(&hub),
        Arc::clone(&store),
        Arc::clone(&transport),
        config.queue.request_queue.clone(),
        &config.hub,
    ));

    let results = transport.consume(&config.queue.result_queue).await?;
    let router = ResultRouter::new(hub, store);
    let router_task = tokio::spawn(async move { router.run(results).await });

    let state = Arc::new(AppState::new(db, chat, &config.session));
    let server = WebServer::new(&config.server, state)?;
    let result = server.run(async move { shutdown.cancelled().await }).await;

    router_task.abort();
    result
}
