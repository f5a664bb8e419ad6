//! HTTP Server
//!
//! Binds the listener and serves the router until shutdown.

use std::future::Future;

use tokio::net::TcpListener;

use crate::config::Config;
use crate::engine::Engine;
use crate::error::Result;

use super::router;

/// HTTP server for kvlog
pub struct Server {
    listen_addr: String,
    engine: Engine,
}

impl Server {
    /// Create a new server with the given config and engine
    pub fn new(config: &Config, engine: Engine) -> Self {
        Self {
            listen_addr: config.listen_addr.clone(),
            engine,
        }
    }

    /// Serve until the process exits
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Serve until `shutdown` resolves, then finish in-flight requests
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(&self.listen_addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "HTTP server listening");

        axum::serve(listener, router(self.engine))
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
