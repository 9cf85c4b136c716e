//! Web server for stockchat.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;

use crate::config::ServerConfig;
use crate::{ChatError, Result};

use super::router::{create_health_router, create_router, create_static_router};
use super::state::AppState;

/// Interval between expired session sweeps.
const SESSION_CLEANUP_INTERVAL_SECS: u64 = 3600;

/// Web server for the API and WebSocket endpoints.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
    /// Server configuration.
    config: ServerConfig,
}

impl WebServer {
    /// Create a new web server.
    pub fn new(config: &ServerConfig, app_state: Arc<AppState>) -> Result<Self> {
        let addr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|e| ChatError::Config(format!("invalid server address: {e}")))?;

        Ok(Self {
            addr,
            app_state,
            config: config.clone(),
        })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Start the session cleanup background task.
    fn start_session_cleanup_task(state: Arc<AppState>) {
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(SESSION_CLEANUP_INTERVAL_SECS));

            // Skip the first immediate tick
            interval.tick().await;

            loop {
                interval.tick().await;
                let removed = state.sessions.lock().await.cleanup();
                if removed > 0 {
                    tracing::info!(removed, "Cleaned up expired sessions");
                }
            }
        });
    }

    fn build_router(&self) -> Router {
        let mut router = create_router(self.app_state.clone(), &self.config.cors_origins)
            .merge(create_health_router());

        if self.config.serve_static {
            if let Some(static_router) = create_static_router(&self.config.static_path) {
                router = router.merge(static_router);
            }
        }

        router.layer(CompressionLayer::new())
    }

    /// Run the web server until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = self.build_router();

        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        Self::start_session_cleanup_task(self.app_state.clone());
        tracing::info!("Web server listening on http://{}", local_addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("Web server stopped");
        Ok(())
    }

    /// Run the server in the background and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> Result<SocketAddr> {
        let router = self.build_router();

        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        Self::start_session_cleanup_task(self.app_state.clone());
        tracing::info!("Web server listening on http://{}", local_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{ChatService, MemoryMessageStore, RoomHub};
    use crate::config::{HubConfig, SessionConfig};
    use crate::queue::MemoryQueue;
    use crate::Database;

    fn create_test_config() -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            ..ServerConfig::default()
        }
    }

    async fn create_test_state() -> Arc<AppState> {
        let db = Database::open_in_memory().await.unwrap();
        let hub_config = HubConfig::default();
        let chat = ChatService::new(
            Arc::new(RoomHub::from_config(&hub_config)),
            Arc::new(MemoryMessageStore::new()),
            Arc::new(MemoryQueue::new()),
            "stock_requests",
            &hub_config,
        );
        Arc::new(AppState::new(db, Arc::new(chat), &SessionConfig::default()))
    }

    #[tokio::test]
    async fn test_web_server_new() {
        let server = WebServer::new(&create_test_config(), create_test_state().await).unwrap();
        assert_eq!(server.addr().ip().to_string(), "127.0.0.1");
    }

    #[tokio::test]
    async fn test_web_server_invalid_host() {
        let config = ServerConfig {
            host: "not a host".to_string(),
            ..ServerConfig::default()
        };
        let result = WebServer::new(&config, create_test_state().await);
        assert!(matches!(result, Err(ChatError::Config(_))));
    }

    #[tokio::test]
    async fn test_web_server_run() {
        let server = WebServer::new(&create_test_config(), create_test_state().await).unwrap();
        let addr = server.run_with_addr().await.unwrap();

        let client = reqwest::Client::new();
        let resp = client
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .unwrap();

        assert!(resp.status().is_success());
        assert_eq!(resp.text().await.unwrap(), "OK");

        let resp = client
            .get(format!("http://{}/api/rooms", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 401);
    }
}
