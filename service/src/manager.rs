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

//! Connection manager implementation
//!
//! The ConnectionManager is responsible for:
//! - Registering accepted sockets and starting their negotiation
//! - Spawning and tracking connection workers and writers
//! - Broadcasting text to all connections
//! - Graceful shutdown coordination

use crate::render::renderer_for;
use crate::{
    ConnectionId, ConnectionInfo, ConnectionWorker, OutputSink, Renderer, Result, ServerConfig,
    ServerHandler, ServerMetrics, TelnetConnection, TelnetError,
};
use dashmap::DashMap;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use termgate_telnetcodec::TextEncoding;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

/// Result of a broadcast operation
#[derive(Debug, Clone, Default)]
pub struct BroadcastResult {
    /// Total number of connections attempted
    pub total: usize,
    /// Number of successful sends
    pub succeeded: usize,
    /// Number of failed sends
    pub failed: usize,
    /// Errors that occurred (ConnectionId and error message)
    pub errors: Vec<(ConnectionId, String)>,
}

impl BroadcastResult {
    /// Check if all broadcasts succeeded
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    /// Get the success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.succeeded as f64 / self.total as f64) * 100.0
        }
    }
}

/// Connection manager
pub struct ConnectionManager {
    /// Live connections (lock-free concurrent map)
    connections: Arc<DashMap<ConnectionId, TelnetConnection>>,
    /// Next connection ID (monotonically increasing)
    next_id: AtomicU64,
    /// Server metrics
    metrics: Arc<ServerMetrics>,
    /// Worker and writer tasks
    tracker: TaskTracker,
    /// Parent of every connection's cancellation token
    cancel: CancellationToken,
    /// Output encoding for new connections
    encoding: TextEncoding,
    /// Renderer shared by all connections
    renderer: Arc<dyn Renderer>,
    /// Connection limit
    max_connections: usize,
    /// Pending output allowed per connection, in bytes
    output_buffer_limit: usize,
    /// Input events queued per connection
    input_queue_capacity: usize,
}

impl ConnectionManager {
    /// Create a new connection manager
    ///
    /// Cancelling `cancel` closes every connection the manager owns.
    pub fn new(
        config: &ServerConfig,
        metrics: Arc<ServerMetrics>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            connections: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(1),
            metrics,
            tracker: TaskTracker::new(),
            cancel,
            encoding: config.encoding,
            renderer: renderer_for(config.style.as_ref()),
            max_connections: config.max_connections,
            output_buffer_limit: config.output_buffer_limit,
            input_queue_capacity: config.input_queue_capacity,
        }
    }

    /// Get the next connection ID
    fn next_connection_id(&self) -> ConnectionId {
        ConnectionId::new(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Register an accepted socket
    ///
    /// Sends the negotiation sequence and spawns the connection's worker and
    /// writer tasks. The connection is removed from the manager when its
    /// worker finishes.
    pub fn add_connection(
        &self,
        socket: TcpStream,
        handler: Arc<dyn ServerHandler>,
    ) -> Result<ConnectionId> {
        if self.connections.len() >= self.max_connections {
            self.metrics.connection_rejected();
            return Err(TelnetError::MaxConnectionsReached(self.max_connections));
        }

        let peer_addr = socket.peer_addr()?;
        let (reader, writer) = socket.into_split();
        let id = self.next_connection_id();

        let cancel = self.cancel.child_token();
        let (output, output_writer) = OutputSink::new(
            id,
            writer,
            self.encoding,
            self.output_buffer_limit,
            cancel.clone(),
            self.metrics.clone(),
        );
        let connection = TelnetConnection::new(
            id,
            peer_addr,
            self.encoding,
            self.renderer.clone(),
            output,
            cancel,
            self.input_queue_capacity,
        );

        self.connections.insert(id, connection.clone());
        self.metrics.connection_opened();
        info!(connection_id = %id, %peer_addr, "Connection accepted");

        connection.send_negotiation();
        self.tracker.spawn(output_writer.run());

        let worker =
            ConnectionWorker::new(connection.clone(), reader, handler, self.metrics.clone());
        let connections = self.connections.clone();
        let metrics = self.metrics.clone();
        self.tracker.spawn(async move {
            let start = Instant::now();
            if AssertUnwindSafe(worker.run()).catch_unwind().await.is_err() {
                error!(connection_id = %id, "Connection worker panicked");
                metrics.application_error();
                connection.close();
            }

            connections.remove(&id);
            metrics.connection_closed(start.elapsed());
        });

        Ok(id)
    }

    /// Close a connection
    ///
    /// The worker removes the entry once it has finished.
    pub fn close_connection(&self, id: ConnectionId) -> Result<()> {
        let connection = self
            .get_connection(id)
            .ok_or(TelnetError::ConnectionNotFound(id))?;
        connection.close();
        Ok(())
    }

    /// Get a connection by ID
    pub fn get_connection(&self, id: ConnectionId) -> Option<TelnetConnection> {
        self.connections.get(&id).map(|entry| entry.value().clone())
    }

    /// Get connection info
    pub fn connection_info(&self, id: ConnectionId) -> Option<ConnectionInfo> {
        self.connections.get(&id).map(|entry| entry.value().info())
    }

    /// Snapshot of all live connections
    pub fn connections(&self) -> Vec<TelnetConnection> {
        self.connections
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Get all connection IDs
    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.connections.iter().map(|entry| *entry.key()).collect()
    }

    /// Get all connection infos
    pub fn connection_infos(&self) -> Vec<ConnectionInfo> {
        self.connections
            .iter()
            .map(|entry| entry.value().info())
            .collect()
    }

    /// Get the number of live connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Send text to every connection
    pub fn broadcast(&self, text: &str) -> BroadcastResult {
        self.broadcast_filtered(text, |_| true)
    }

    /// Send text to the connections whose info matches `filter`
    pub fn broadcast_filtered<F>(&self, text: &str, filter: F) -> BroadcastResult
    where
        F: Fn(&ConnectionInfo) -> bool,
    {
        let mut result = BroadcastResult::default();
        for connection in self.connections() {
            if !filter(&connection.info()) {
                continue;
            }
            result.total += 1;
            if connection.is_closed() {
                result.failed += 1;
                result
                    .errors
                    .push((connection.id(), TelnetError::ConnectionClosed.to_string()));
            } else {
                connection.send(text);
                result.succeeded += 1;
            }
        }
        debug!(
            total = result.total,
            failed = result.failed,
            "Broadcast complete"
        );
        result
    }

    /// Close every connection and wait for their tasks to finish
    ///
    /// Returns [`TelnetError::Timeout`] if tasks are still running after
    /// `timeout`. They keep running and finish on their own.
    pub async fn shutdown(&self, timeout: Duration) -> Result<()> {
        self.cancel.cancel();
        self.tracker.close();
        if tokio::time::timeout(timeout, self.tracker.wait())
            .await
            .is_err()
        {
            warn!(
                remaining = self.tracker.len(),
                "Connection tasks still running after shutdown timeout"
            );
            return Err(TelnetError::Timeout);
        }
        info!("All connections closed");
        Ok(())
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("connection_count", &self.connection_count())
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BoxError, ConnectionState, TerminalSession, handler_fn};
    use async_trait::async_trait;
    use termgate_telnetcodec::consts::{IAC, SB, SE, option, ttype};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn create_test_connection() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client_task = tokio::spawn(async move { TcpStream::connect(addr).await.unwrap() });

        let (server, _) = listener.accept().await.unwrap();
        let client = client_task.await.unwrap();

        (server, client)
    }

    fn waiting_handler() -> Arc<dyn ServerHandler> {
        Arc::new(handler_fn(|mut session: TerminalSession| async move {
            while session.recv().await.is_some() {}
            Ok::<(), BoxError>(())
        }))
    }

    /// Hooks that misbehave around an otherwise idle session
    enum BadHooks {
        Panic,
        SlowDisconnect,
    }

    #[async_trait]
    impl ServerHandler for BadHooks {
        async fn interact(&self, mut session: TerminalSession) -> std::result::Result<(), BoxError> {
            while session.recv().await.is_some() {}
            Ok(())
        }

        async fn on_connect(&self, _id: ConnectionId, _conn: &TelnetConnection) {
            if matches!(self, BadHooks::Panic) {
                panic!("connect hook failed");
            }
        }

        async fn on_disconnect(&self, _id: ConnectionId, _conn: &TelnetConnection) {
            match self {
                BadHooks::Panic => panic!("disconnect hook failed"),
                BadHooks::SlowDisconnect => tokio::time::sleep(Duration::from_secs(30)).await,
            }
        }
    }

    fn manager(max_connections: usize) -> ConnectionManager {
        let config = ServerConfig::default().with_max_connections(max_connections);
        ConnectionManager::new(
            &config,
            Arc::new(ServerMetrics::new()),
            CancellationToken::new(),
        )
    }

    async fn wait_until_empty(manager: &ConnectionManager) {
        for _ in 0..200 {
            if manager.connection_count() == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("connections were never removed");
    }

    #[tokio::test]
    async fn test_manager_add_remove() {
        let manager = manager(10);
        let (server, mut client) = create_test_connection().await;

        let id = manager.add_connection(server, waiting_handler()).unwrap();
        assert_eq!(id, ConnectionId::new(1));
        assert_eq!(manager.connection_count(), 1);
        assert!(manager.get_connection(id).is_some());

        let mut negotiation = [0u8; 28];
        client.read_exact(&mut negotiation).await.unwrap();
        assert_eq!(&negotiation[..3], &[IAC, 253, option::LINEMODE]);

        manager.close_connection(id).unwrap();
        wait_until_empty(&manager).await;
        assert!(matches!(
            manager.close_connection(id),
            Err(TelnetError::ConnectionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_connection_limit() {
        let manager = manager(1);
        let (first, _first_client) = create_test_connection().await;
        let (second, _second_client) = create_test_connection().await;

        manager.add_connection(first, waiting_handler()).unwrap();
        let rejected = manager.add_connection(second, waiting_handler());
        assert!(matches!(
            rejected,
            Err(TelnetError::MaxConnectionsReached(1))
        ));
        assert_eq!(manager.metrics.snapshot().rejected_connections, 1);
    }

    #[tokio::test]
    async fn test_manager_broadcast() {
        let manager = manager(10);
        let mut clients = Vec::new();
        for _ in 0..3 {
            let (server, mut client) = create_test_connection().await;
            manager.add_connection(server, waiting_handler()).unwrap();
            let mut negotiation = [0u8; 28];
            client.read_exact(&mut negotiation).await.unwrap();
            clients.push(client);
        }

        let result = manager.broadcast("notice\n");
        assert_eq!(result.total, 3);
        assert!(result.all_succeeded());

        for client in &mut clients {
            let mut line = [0u8; 8];
            client.read_exact(&mut line).await.unwrap();
            assert_eq!(&line, b"notice\r\n");
        }

        manager.shutdown(Duration::from_secs(1)).await.unwrap();
        assert_eq!(manager.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_info_reflects_negotiation() {
        let manager = manager(10);
        let (server, mut client) = create_test_connection().await;
        let id = manager.add_connection(server, waiting_handler()).unwrap();

        let mut report = vec![IAC, SB, option::NAWS, 0, 100, 0, 40, IAC, SE];
        report.extend_from_slice(&[IAC, SB, option::TTYPE, ttype::IS]);
        report.extend_from_slice(b"xterm-256color");
        report.extend_from_slice(&[IAC, SE]);
        client.write_all(&report).await.unwrap();

        let mut info = manager.connection_info(id).unwrap();
        for _ in 0..200 {
            if info.state == ConnectionState::Running {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
            info = manager.connection_info(id).unwrap();
        }
        assert_eq!(info.state, ConnectionState::Running);
        assert_eq!(info.terminal_type.as_deref(), Some("xterm-256color"));
        assert_eq!(info.size.cols, 100);
        assert_eq!(info.size.rows, 40);
        assert_eq!(info.bytes_received, report.len() as u64);

        drop(client);
        wait_until_empty(&manager).await;
    }

    #[tokio::test]
    async fn test_panicking_hooks_release_connection() {
        let manager = manager(10);
        let (server, mut client) = create_test_connection().await;
        manager
            .add_connection(server, Arc::new(BadHooks::Panic))
            .unwrap();

        let mut report = vec![IAC, SB, option::TTYPE, ttype::IS];
        report.extend_from_slice(b"ansi");
        report.extend_from_slice(&[IAC, SE]);
        client.write_all(&report).await.unwrap();

        let mut received = Vec::new();
        tokio::time::timeout(Duration::from_secs(2), client.read_to_end(&mut received))
            .await
            .expect("socket should close after a hook panic")
            .unwrap();
        assert_eq!(received.len(), 28);
        wait_until_empty(&manager).await;

        let snapshot = manager.metrics.snapshot();
        assert_eq!(snapshot.active_connections, 0);
        assert_eq!(snapshot.application_errors, 2);
    }

    #[tokio::test]
    async fn test_shutdown_reports_timeout() {
        let manager = manager(10);
        let (server, _client) = create_test_connection().await;
        manager
            .add_connection(server, Arc::new(BadHooks::SlowDisconnect))
            .unwrap();

        let result = manager.shutdown(Duration::from_millis(50)).await;
        assert!(matches!(result, Err(TelnetError::Timeout)));
        assert_eq!(manager.connection_count(), 1);
    }
}
