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

//! Connection worker implementation
//!
//! The ConnectionWorker owns the read half of one socket and drives the
//! connection through its lifecycle:
//! - Negotiation, bounded by [`NEGOTIATION_TIMEOUT`]
//! - The application session, polled alongside socket reads
//! - Resource cleanup

use crate::{
    ConnectionState, InputEvent, NEGOTIATION_TIMEOUT, ServerHandler, ServerMetrics,
    TelnetConnection, TelnetError,
};
use bytes::BytesMut;
use futures::FutureExt;
use std::any::Any;
use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use termgate_telnetcodec::consts::DEFAULT_TERMINAL_TYPE;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

const READ_BUFFER_SIZE: usize = 4096;

/// Connection worker that manages a single connection's lifecycle
pub struct ConnectionWorker<R> {
    /// The connection being managed
    connection: TelnetConnection,
    /// Read half of the socket
    reader: R,
    /// Application handler
    handler: Arc<dyn ServerHandler>,
    /// Server metrics
    metrics: Arc<ServerMetrics>,
    /// How long to wait for a terminal type report
    negotiation_timeout: Duration,
}

impl<R> ConnectionWorker<R>
where
    R: AsyncRead + Unpin + Send,
{
    /// Create a new connection worker
    pub fn new(
        connection: TelnetConnection,
        reader: R,
        handler: Arc<dyn ServerHandler>,
        metrics: Arc<ServerMetrics>,
    ) -> Self {
        Self {
            connection,
            reader,
            handler,
            metrics,
            negotiation_timeout: NEGOTIATION_TIMEOUT,
        }
    }

    /// Run the worker until the connection closes
    ///
    /// On return the connection is `Closed` and the handler's
    /// `on_disconnect` hook has run.
    pub async fn run(self) {
        let span = info_span!(
            "connection",
            connection_id = %self.connection.id(),
            peer_addr = %self.connection.peer_addr()
        );
        self.lifecycle().instrument(span).await;
    }

    async fn lifecycle(self) {
        let ConnectionWorker {
            connection,
            mut reader,
            handler,
            metrics,
            negotiation_timeout,
        } = self;
        let cancel = connection.cancellation_token();
        let mut buffer = BytesMut::with_capacity(READ_BUFFER_SIZE);
        let mut io = SocketInput {
            connection: &connection,
            reader: &mut reader,
            buffer: &mut buffer,
            backlog: VecDeque::new(),
            metrics: &metrics,
        };

        if negotiate(&mut io, &cancel, negotiation_timeout).await {
            interact(&mut io, handler.as_ref(), &cancel).await;
        }

        connection.close();
        guard_hook(
            "on_disconnect",
            &metrics,
            handler.on_disconnect(connection.id(), &connection),
        )
        .await;
        debug!("Connection worker finished");
    }
}

impl<R> std::fmt::Debug for ConnectionWorker<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionWorker")
            .field("connection", &self.connection)
            .field("negotiation_timeout", &self.negotiation_timeout)
            .finish()
    }
}

/// Socket reads feeding one connection
struct SocketInput<'a, R> {
    connection: &'a TelnetConnection,
    reader: &'a mut R,
    buffer: &'a mut BytesMut,
    /// Parsed input waiting for room in the session's queue
    backlog: VecDeque<InputEvent>,
    metrics: &'a ServerMetrics,
}

impl<R> SocketInput<'_, R>
where
    R: AsyncRead + Unpin + Send,
{
    /// Deliver one pending input event, or read from the socket when none
    /// are pending. Returns `false` when the socket is done.
    ///
    /// The socket is not read while input is pending, so a session that
    /// falls behind pushes back on the client. Cancel safe.
    async fn step(&mut self) -> bool {
        if self.backlog.is_empty() {
            return self.pump().await;
        }
        match self.connection.reserve_input().await {
            Some(permit) => {
                if let Some(event) = self.backlog.pop_front() {
                    permit.send(event);
                }
            }
            None => {
                debug!(dropped = self.backlog.len(), "Input queue closed");
                self.backlog.clear();
            }
        }
        true
    }

    /// Read once and feed the parser. Returns `false` when the socket is done.
    async fn pump(&mut self) -> bool {
        match self.reader.read_buf(self.buffer).await {
            Ok(0) => {
                debug!("Client closed the connection");
                false
            }
            Ok(n) => {
                self.metrics.bytes_received(n as u64);
                self.connection.feed(&self.buffer[..n], &mut self.backlog);
                self.buffer.clear();
                true
            }
            Err(error) => {
                warn!(%error, "Socket read failed");
                self.metrics.connection_error();
                false
            }
        }
    }
}

/// Wait for the terminal type report or the negotiation deadline.
///
/// Returns `true` if the connection reached `Ready`.
async fn negotiate<R>(
    io: &mut SocketInput<'_, R>,
    cancel: &CancellationToken,
    timeout: Duration,
) -> bool
where
    R: AsyncRead + Unpin + Send,
{
    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    while io.connection.state() == ConnectionState::Negotiating {
        select! {
            _ = cancel.cancelled() => return false,
            _ = &mut deadline => {
                if io.connection.negotiation_timed_out() {
                    io.metrics.negotiation_timeout();
                    debug!("Negotiation timed out, assuming {}", DEFAULT_TERMINAL_TYPE);
                }
            }
            alive = io.step() => {
                if !alive {
                    return false;
                }
            }
        }
    }
    io.connection.state() == ConnectionState::Ready
}

/// Run the application while continuing to read from the socket.
async fn interact<R>(
    io: &mut SocketInput<'_, R>,
    handler: &dyn ServerHandler,
    cancel: &CancellationToken,
) where
    R: AsyncRead + Unpin + Send,
{
    let connection = io.connection.clone();
    let Some(session) = connection.start_session() else {
        return;
    };
    let id = connection.id();
    info!(
        terminal_type = %session.terminal_type(),
        size = %session.size(),
        "Session started"
    );
    if !guard_hook("on_connect", io.metrics, handler.on_connect(id, &connection)).await {
        return;
    }

    let application = AssertUnwindSafe(handler.interact(session)).catch_unwind();
    tokio::pin!(application);

    loop {
        select! {
            _ = cancel.cancelled() => {
                debug!("Session cancelled");
                return;
            }
            outcome = &mut application => {
                let failure = match outcome {
                    Ok(Ok(())) => None,
                    Ok(Err(error)) => Some(error.to_string()),
                    Err(panic) => Some(format!("panicked: {}", panic_message(panic.as_ref()))),
                };
                match failure {
                    None => debug!("Application finished"),
                    Some(message) => {
                        error!(error = %message, "Application failed");
                        io.metrics.application_error();
                        guard_hook(
                            "on_error",
                            io.metrics,
                            handler.on_error(id, &connection, TelnetError::Application(message)),
                        )
                        .await;
                    }
                }
                return;
            }
            alive = io.step() => {
                if !alive {
                    return;
                }
            }
        }
    }
}

/// Run a lifecycle hook, containing any panic it raises
///
/// Returns `false` if the hook panicked.
async fn guard_hook<F>(hook: &'static str, metrics: &ServerMetrics, future: F) -> bool
where
    F: Future<Output = ()>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(()) => true,
        Err(panic) => {
            error!(hook, panic = %panic_message(panic.as_ref()), "Handler hook panicked");
            metrics.application_error();
            false
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
