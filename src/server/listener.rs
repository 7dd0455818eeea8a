//! Signaling server
//!
//! Accepts WebSocket connections from viewers and spawns one
//! [`ViewerSession`] per connection.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;

use crate::error::Result;
use crate::hub::HubHandle;
use crate::ingest::{run_ingest, IngestSummary};
use crate::media::FrameSource;
use crate::server::config::RelayConfig;
use crate::session::{ViewerContext, ViewerSession};
use crate::signaling::WsSignaling;
use crate::transport::TransportFactory;

/// Relay server
pub struct RelayServer<F: TransportFactory> {
    config: Arc<RelayConfig>,
    factory: Arc<F>,
    hub: HubHandle,
    next_session_id: AtomicU64,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl<F: TransportFactory> RelayServer<F> {
    /// Create a server feeding viewers from `hub`
    pub fn new(config: RelayConfig, factory: F, hub: HubHandle) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Self {
            config: Arc::new(config),
            factory: Arc::new(factory),
            hub,
            next_session_id: AtomicU64::new(1),
            connection_semaphore,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Get the hub handle
    pub fn hub(&self) -> &HubHandle {
        &self.hub
    }

    /// Bind the signaling listener
    pub async fn bind(&self) -> Result<TcpListener> {
        let listener = TcpListener::bind(self.config.signaling_addr).await?;
        tracing::info!(
            addr = %listener.local_addr()?,
            path = %self.config.signaling_path,
            "Signaling server listening"
        );
        Ok(listener)
    }

    /// Run the server
    ///
    /// Only returns if binding fails; accept errors are logged and skipped.
    pub async fn run(&self) -> Result<()> {
        let listener = self.bind().await?;
        match self.accept_loop(&listener).await {}
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<Fut>(&self, shutdown: Fut) -> Result<()>
    where
        Fut: std::future::Future<Output = ()>,
    {
        let listener = self.bind().await?;
        self.serve_until(listener, shutdown).await
    }

    /// Serve an already bound listener until `shutdown` resolves
    pub async fn serve_until<Fut>(&self, listener: TcpListener, shutdown: Fut) -> Result<()>
    where
        Fut: std::future::Future<Output = ()>,
    {
        tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            never = self.accept_loop(&listener) => match never {},
        }
    }

    /// Serve viewers while broadcasting `source`
    ///
    /// Returns once the source is exhausted (the hub has been shut down and
    /// every viewer sees end-of-stream) or fails. The accept loop stops with
    /// it.
    pub async fn broadcast<S: FrameSource>(&self, source: S) -> Result<IngestSummary> {
        let listener = self.bind().await?;

        tokio::select! {
            result = run_ingest(source, self.hub.clone()) => result,
            never = self.accept_loop(&listener) => match never {},
        }
    }

    /// Accept viewers forever; a failed accept only costs that connection
    async fn accept_loop(&self, listener: &TcpListener) -> Infallible {
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        // Check connection limit; the permit lives as long as the session
        let permit = if let Some(ref sem) = self.connection_semaphore {
            match sem.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    return;
                }
            }
        } else {
            None
        };

        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            session_id = session_id,
            peer = %peer_addr,
            "New connection"
        );

        if let Err(e) = socket.set_nodelay(true) {
            tracing::debug!(error = %e, "Failed to set TCP_NODELAY");
        }

        let config = Arc::clone(&self.config);
        let factory = Arc::clone(&self.factory);
        let hub = self.hub.clone();

        tokio::spawn(async move {
            let _permit = permit;
            let ctx = ViewerContext::new(session_id).with_peer(peer_addr);

            if let Err(e) = serve_viewer(ctx, socket, config, factory, hub).await {
                tracing::debug!(
                    session_id = session_id,
                    error = %e,
                    "Viewer connection error"
                );
            }

            tracing::debug!(session_id = session_id, "Connection closed");
        });
    }
}

async fn serve_viewer<F: TransportFactory>(
    ctx: ViewerContext,
    socket: TcpStream,
    config: Arc<RelayConfig>,
    factory: Arc<F>,
    hub: HubHandle,
) -> Result<()> {
    let path = config.signaling_path.clone();
    let check_path = move |req: &Request, resp: Response| -> std::result::Result<Response, ErrorResponse> {
        if req.uri().path() == path {
            Ok(resp)
        } else {
            let mut reject = ErrorResponse::new(None);
            *reject.status_mut() = StatusCode::NOT_FOUND;
            Err(reject)
        }
    };

    let ws = match tokio::time::timeout(
        config.handshake_timeout,
        tokio_tungstenite::accept_hdr_async(socket, check_path),
    )
    .await
    {
        Ok(Ok(ws)) => ws,
        Ok(Err(e)) => {
            tracing::debug!(session_id = ctx.session_id, error = %e, "WebSocket handshake failed");
            return Ok(());
        }
        Err(_) => {
            tracing::debug!(session_id = ctx.session_id, "WebSocket handshake timed out");
            return Ok(());
        }
    };

    let (transport, events) = match factory.create(&config) {
        Ok(created) => created,
        Err(e) => {
            tracing::warn!(session_id = ctx.session_id, error = %e, "Failed to create media transport");
            let reason = CloseFrame {
                code: CloseCode::Error,
                reason: "media transport unavailable".into(),
            };
            let mut ws = ws;
            if let Err(close_err) = ws.close(Some(reason)).await {
                tracing::debug!(session_id = ctx.session_id, error = %close_err, "Close frame not sent");
            }
            return Err(e.into());
        }
    };

    ViewerSession::new(
        ctx,
        config.session.clone(),
        hub,
        WsSignaling::new(ws),
        transport,
        events,
    )
    .run()
    .await?;

    Ok(())
}
