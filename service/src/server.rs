//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Telnet server implementation
//!
//! The TelnetServer is the main entry point. It owns the TCP listener,
//! accepts connections, and hands them to the ConnectionManager.

use crate::{
    ConnectionManager, Result, ServerConfig, ServerHandler, ServerMetrics, ServerSnapshot,
    TelnetError,
};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Back-off after a failed `accept`
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

type Background = (CancellationToken, JoinHandle<Result<()>>);

/// Telnet server
///
/// A server is single use: once its accept loop has run and stopped it
/// cannot be started again.
///
/// # Example
///
/// ```no_run
/// use termgate_service::{BoxError, ServerConfig, TelnetServer, TerminalSession, handler_fn};
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let server = TelnetServer::new(ServerConfig::new("0.0.0.0", 2323))?;
///     let handler = handler_fn(|session: TerminalSession| async move {
///         session.send(&format!("Welcome, {}\n", session.terminal_type()));
///         Ok::<(), BoxError>(())
///     });
///
///     let cancel = CancellationToken::new();
///     server
///         .run(Arc::new(handler), |addr| println!("listening on {addr}"), cancel)
///         .await?;
///     Ok(())
/// }
/// ```
pub struct TelnetServer {
    /// Server configuration
    config: ServerConfig,
    /// Connection manager
    manager: Arc<ConnectionManager>,
    /// Server metrics
    metrics: Arc<ServerMetrics>,
    /// Actual bind address, known once listening
    bind_address: OnceLock<SocketAddr>,
    /// Server creation time
    started_at: Instant,
    /// Set while the accept loop runs
    running: Arc<AtomicBool>,
    /// Set by the first call to `run`, `serve` or `start`
    started: AtomicBool,
    /// Accept loop spawned by `start`
    background: Mutex<Option<Background>>,
}

impl TelnetServer {
    /// Create a new server with the given configuration
    ///
    /// Nothing is bound until [`run`](Self::run) or [`start`](Self::start).
    pub fn new(config: ServerConfig) -> Result<Self> {
        config.validate().map_err(TelnetError::InvalidConfig)?;

        let metrics = Arc::new(ServerMetrics::new());
        let manager = Arc::new(ConnectionManager::new(
            &config,
            metrics.clone(),
            CancellationToken::new(),
        ));

        Ok(Self {
            config,
            manager,
            metrics,
            bind_address: OnceLock::new(),
            started_at: Instant::now(),
            running: Arc::new(AtomicBool::new(false)),
            started: AtomicBool::new(false),
            background: Mutex::new(None),
        })
    }

    /// Bind, report the bound address through `ready`, and accept until
    /// `cancel` fires
    ///
    /// Returns after every connection has been closed, or after the
    /// configured shutdown timeout.
    pub async fn run<F>(
        &self,
        handler: Arc<dyn ServerHandler>,
        ready: F,
        cancel: CancellationToken,
    ) -> Result<()>
    where
        F: FnOnce(SocketAddr),
    {
        self.claim()?;
        let listener = self.bind().await?;
        ready(self.record_address(&listener)?);
        self.accept_loop().run(listener, handler, cancel).await
    }

    /// Accept on an already bound listener until `cancel` fires
    pub async fn serve(
        &self,
        listener: TcpListener,
        handler: Arc<dyn ServerHandler>,
        cancel: CancellationToken,
    ) -> Result<()> {
        self.claim()?;
        self.record_address(&listener)?;
        self.accept_loop().run(listener, handler, cancel).await
    }

    /// Bind and accept in a background task
    ///
    /// Returns the bound address. Stop the server with
    /// [`shutdown`](Self::shutdown).
    pub async fn start(&self, handler: Arc<dyn ServerHandler>) -> Result<SocketAddr> {
        self.claim()?;
        let listener = self.bind().await?;
        let address = self.record_address(&listener)?;

        let cancel = CancellationToken::new();
        let accept_loop = self.accept_loop();
        self.running.store(true, Ordering::SeqCst);
        let handle = tokio::spawn(accept_loop.run(listener, handler, cancel.clone()));
        *self.background() = Some((cancel, handle));

        Ok(address)
    }

    /// Stop a server started with [`start`](Self::start)
    ///
    /// Stops accepting, closes every connection and waits for the accept
    /// loop to finish.
    pub async fn shutdown(&self) -> Result<()> {
        let (cancel, handle) = self
            .background()
            .take()
            .ok_or(TelnetError::ServerNotRunning)?;

        info!("Shutting down Telnet server");
        cancel.cancel();
        match handle.await {
            Ok(result) => result,
            Err(error) => {
                warn!(%error, "Accept loop task failed");
                Ok(())
            }
        }
    }

    fn claim(&self) -> Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(TelnetError::ServerAlreadyRunning);
        }
        Ok(())
    }

    async fn bind(&self) -> Result<TcpListener> {
        let address = self.config.bind_address();
        TcpListener::bind(address.as_str())
            .await
            .map_err(|source| TelnetError::Bind { address, source })
    }

    fn record_address(&self, listener: &TcpListener) -> Result<SocketAddr> {
        let address = listener.local_addr()?;
        let _ = self.bind_address.set(address);
        info!(%address, "Telnet server listening");
        Ok(address)
    }

    fn background(&self) -> std::sync::MutexGuard<'_, Option<Background>> {
        self.background
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn accept_loop(&self) -> AcceptLoop {
        AcceptLoop {
            manager: self.manager.clone(),
            metrics: self.metrics.clone(),
            running: self.running.clone(),
            shutdown_timeout: self.config.shutdown_timeout,
        }
    }

    /// Check if the accept loop is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// The address the server is listening on, once bound
    pub fn bind_address(&self) -> Option<SocketAddr> {
        self.bind_address.get().copied()
    }

    /// Get the number of live connections
    pub fn connection_count(&self) -> usize {
        self.manager.connection_count()
    }

    /// Get a snapshot of the server state
    pub fn snapshot(&self) -> ServerSnapshot {
        ServerSnapshot {
            active_connections: self.manager.connection_count(),
            total_connections: self.metrics.total_connections(),
            bind_address: self.bind_address(),
            uptime: self.started_at.elapsed(),
            started_at: self.started_at,
        }
    }

    /// Get the server metrics
    pub fn metrics(&self) -> Arc<ServerMetrics> {
        self.metrics.clone()
    }

    /// Get the connection manager
    pub fn manager(&self) -> Arc<ConnectionManager> {
        self.manager.clone()
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

impl std::fmt::Debug for TelnetServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelnetServer")
            .field("bind_address", &self.bind_address())
            .field("running", &self.is_running())
            .field("connection_count", &self.connection_count())
            .field("uptime", &self.started_at.elapsed())
            .finish()
    }
}

impl Drop for TelnetServer {
    fn drop(&mut self) {
        if let Some((cancel, _)) = self.background().take() {
            warn!("TelnetServer dropped while still running");
            cancel.cancel();
        }
    }
}

/// State the accept loop needs, detached from the server so it can be spawned
struct AcceptLoop {
    manager: Arc<ConnectionManager>,
    metrics: Arc<ServerMetrics>,
    running: Arc<AtomicBool>,
    shutdown_timeout: Duration,
}

impl AcceptLoop {
    async fn run(
        self,
        listener: TcpListener,
        handler: Arc<dyn ServerHandler>,
        cancel: CancellationToken,
    ) -> Result<()> {
        self.running.store(true, Ordering::SeqCst);

        loop {
            let accepted = tokio::select! {
                _ = cancel.cancelled() => break,
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((socket, peer_addr)) => {
                    debug!(%peer_addr, "Accepted socket");
                    match self.manager.add_connection(socket, handler.clone()) {
                        Ok(_) => {}
                        Err(TelnetError::MaxConnectionsReached(limit)) => {
                            warn!(%peer_addr, limit, "Connection limit reached, dropping socket");
                        }
                        Err(error) => {
                            warn!(%peer_addr, %error, "Failed to register connection");
                            self.metrics.connection_error();
                        }
                    }
                }
                Err(error) => {
                    warn!(%error, "Failed to accept connection");
                    self.metrics.connection_error();
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                }
            }
        }

        info!("Stopped accepting connections");
        if let Err(error) = self.manager.shutdown(self.shutdown_timeout).await {
            warn!(%error, "Connections did not finish before the shutdown timeout");
        }
        drop(listener);
        self.running.store(false, Ordering::SeqCst);
        info!("Telnet server shutdown complete");
        Ok(())
    }
}
