//! HTTP server with coordinated graceful shutdown

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use postbox_core::shutdown::ShutdownCoordinator;
use postbox_core::MessagingService;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::routes::api::build_router;
use crate::state::AppState;

pub struct ApiServer {
    state: Arc<AppState>,
    addr: SocketAddr,
}

impl ApiServer {
    pub fn new(service: Arc<MessagingService>, addr: SocketAddr) -> Self {
        let state = Arc::new(AppState::new(service));
        Self { state, addr }
    }

    /// Serve until `shutdown` fires, then drain within its timeout
    ///
    /// Open SSE streams never finish on their own, so shutdown first closes
    /// every broker subscription and only then waits for connections.
    pub async fn run(self, shutdown: Arc<ShutdownCoordinator>) -> Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        info!("Postbox API listening on {}", listener.local_addr()?);
        self.serve(listener, shutdown).await
    }

    /// Like [`ApiServer::run`] on an already bound listener
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: Arc<ShutdownCoordinator>,
    ) -> Result<()> {
        let broker = self.state.service.broker().clone();
        let router = build_router(self.state);

        let signal = {
            let shutdown = shutdown.clone();
            async move {
                shutdown.wait_for_shutdown().await;
                let closed = broker.close_all();
                info!(subscriptions = closed, "Closed live subscriptions");
            }
        };

        let server = axum::serve(listener, router)
            .with_graceful_shutdown(signal)
            .into_future();
        tokio::pin!(server);

        let drain_deadline = async {
            shutdown.wait_for_shutdown().await;
            tokio::time::sleep(shutdown.timeout()).await;
        };

        tokio::select! {
            result = &mut server => result?,
            _ = drain_deadline => {
                warn!(
                    timeout = ?shutdown.timeout(),
                    "Graceful shutdown timed out; dropping connections"
                );
            }
        }

        shutdown.complete().await;
        Ok(())
    }
}
