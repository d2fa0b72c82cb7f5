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

//! Telnet connection handle

use crate::{
    ConnectionId, ConnectionInfo, ConnectionState, InputEvent, OutputSink, Renderer,
    TerminalInput, TerminalSession,
};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Instant;
use termgate_telnetcodec::{
    TelnetEventSink, TelnetParser, TextEncoding, WindowSize, consts, negotiation_sequence,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace};

const ERASE_SCREEN: &[u8] = b"\x1b[2J\x1b[H";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Shared {
    id: ConnectionId,
    peer_addr: SocketAddr,
    created_at: Instant,
    encoding: TextEncoding,
    state: AtomicU8,
    size: AtomicU32,
    terminal_type: OnceLock<String>,
    parser: Mutex<TelnetParser>,
    input_tx: Mutex<Option<mpsc::Sender<InputEvent>>>,
    input_rx: Mutex<Option<mpsc::Receiver<InputEvent>>>,
    output: OutputSink,
    renderer: Arc<dyn Renderer>,
    cancel: CancellationToken,
    bytes_received: AtomicU64,
}

impl Shared {
    fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn advance(&self, from: ConnectionState, to: ConnectionState) -> bool {
        self.state
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn set_terminal_type(&self, terminal_type: String) {
        if let Err(ignored) = self.terminal_type.set(terminal_type) {
            debug!(connection_id = %self.id, terminal_type = %ignored, "Terminal type already known");
        }
    }
}

/// Routes parser events into connection state and pending input
struct EventRouter<'a> {
    shared: &'a Shared,
    events: &'a mut VecDeque<InputEvent>,
}

impl TelnetEventSink for EventRouter<'_> {
    fn on_data(&mut self, data: &[u8]) {
        self.events.push_back(InputEvent::Data(data.to_vec()));
    }

    fn on_window_size(&mut self, size: WindowSize) {
        self.shared.size.store(size.to_u32(), Ordering::Release);
        debug!(connection_id = %self.shared.id, %size, "Window size reported");
        if self.shared.state() == ConnectionState::Running {
            self.events.push_back(InputEvent::Resize(size));
        }
    }

    fn on_terminal_type(&mut self, terminal_type: String) {
        debug!(connection_id = %self.shared.id, %terminal_type, "Terminal type reported");
        self.shared.set_terminal_type(terminal_type);
        self.shared
            .advance(ConnectionState::Negotiating, ConnectionState::Ready);
    }
}

/// A Telnet connection
///
/// A cheap, cloneable handle. Every clone refers to the same connection and
/// all methods may be called from any task. The socket itself is owned by the
/// connection's worker and writer tasks.
#[derive(Clone)]
pub struct TelnetConnection {
    shared: Arc<Shared>,
}

impl TelnetConnection {
    /// Create a connection around an already split socket
    ///
    /// At most `input_capacity` input events are queued ahead of the session.
    pub(crate) fn new(
        id: ConnectionId,
        peer_addr: SocketAddr,
        encoding: TextEncoding,
        renderer: Arc<dyn Renderer>,
        output: OutputSink,
        cancel: CancellationToken,
        input_capacity: usize,
    ) -> Self {
        let (input_tx, input_rx) = mpsc::channel(input_capacity.max(1));
        Self {
            shared: Arc::new(Shared {
                id,
                peer_addr,
                created_at: Instant::now(),
                encoding,
                state: AtomicU8::new(ConnectionState::Negotiating.as_u8()),
                size: AtomicU32::new(WindowSize::default().to_u32()),
                terminal_type: OnceLock::new(),
                parser: Mutex::new(TelnetParser::new()),
                input_tx: Mutex::new(Some(input_tx)),
                input_rx: Mutex::new(Some(input_rx)),
                output,
                renderer,
                cancel,
                bytes_received: AtomicU64::new(0),
            }),
        }
    }

    /// Get the connection ID
    pub fn id(&self) -> ConnectionId {
        self.shared.id
    }

    /// Get the peer address
    pub fn peer_addr(&self) -> SocketAddr {
        self.shared.peer_addr
    }

    /// Get when the connection was created
    pub fn created_at(&self) -> Instant {
        self.shared.created_at
    }

    /// Text encoding used by this connection
    pub fn encoding(&self) -> TextEncoding {
        self.shared.encoding
    }

    /// Current state
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Whether the connection has been closed
    pub fn is_closed(&self) -> bool {
        self.state() == ConnectionState::Closed
    }

    /// Current terminal size, 80x24 until the client reports one
    pub fn size(&self) -> WindowSize {
        WindowSize::from_u32(self.shared.size.load(Ordering::Acquire))
    }

    /// Reported terminal type
    ///
    /// `None` while negotiating. After negotiation this is the client's
    /// report, or `VT100` if it never sent one.
    pub fn terminal_type(&self) -> Option<String> {
        self.shared.terminal_type.get().cloned()
    }

    /// Get bytes sent
    pub fn bytes_sent(&self) -> u64 {
        self.shared.output.bytes_flushed()
    }

    /// Get bytes received
    pub fn bytes_received(&self) -> u64 {
        self.shared.bytes_received.load(Ordering::Relaxed)
    }

    /// Get connection info snapshot
    pub fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            id: self.id(),
            state: self.state(),
            peer_addr: self.peer_addr(),
            size: self.size(),
            terminal_type: self.terminal_type(),
            created_at: self.created_at(),
            bytes_sent: self.bytes_sent(),
            bytes_received: self.bytes_received(),
        }
    }

    /// Render `text`, write it with newline translation and flush
    ///
    /// Does nothing once the connection is closed.
    pub fn send(&self, text: &str) {
        if self.is_closed() {
            return;
        }
        let rendered = self.shared.renderer.render(text);
        self.shared.output.write(&rendered);
        self.shared.output.flush();
    }

    /// Clear the screen and home the cursor
    ///
    /// Does nothing once the connection is closed.
    pub fn erase_screen(&self) {
        if self.is_closed() {
            return;
        }
        self.shared.output.write_raw(ERASE_SCREEN);
        self.shared.output.flush();
    }

    /// Close the connection
    ///
    /// Releases the input channel and the output sink and tells the worker
    /// to drop the socket. Safe to call any number of times from any task.
    #[instrument(skip(self), fields(connection_id = %self.shared.id))]
    pub fn close(&self) {
        let previous = self
            .shared
            .state
            .swap(ConnectionState::Closed.as_u8(), Ordering::AcqRel);
        if previous == ConnectionState::Closed.as_u8() {
            return;
        }
        lock(&self.shared.input_tx).take();
        lock(&self.shared.input_rx).take();
        self.shared.output.close();
        self.shared.cancel.cancel();
        info!(peer_addr = %self.shared.peer_addr, "Connection closed");
    }

    /// Token cancelled when this connection closes or the server stops
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shared.cancel.clone()
    }

    /// Route raw socket bytes through the parser
    ///
    /// Negotiation results are applied immediately. Input for the session is
    /// appended to `events` for delivery through [`reserve_input`](Self::reserve_input).
    pub(crate) fn feed(&self, raw: &[u8], events: &mut VecDeque<InputEvent>) {
        if self.is_closed() {
            return;
        }
        self.shared
            .bytes_received
            .fetch_add(raw.len() as u64, Ordering::Relaxed);
        trace!(connection_id = %self.shared.id, bytes = raw.len(), "Parsing input");
        let mut router = EventRouter {
            shared: &self.shared,
            events,
        };
        lock(&self.shared.parser).feed(raw, &mut router);
    }

    /// Wait for room in the input queue
    ///
    /// Returns `None` once the connection is closed or the session has
    /// dropped its input.
    pub(crate) async fn reserve_input(&self) -> Option<mpsc::OwnedPermit<InputEvent>> {
        let sender = lock(&self.shared.input_tx).clone()?;
        sender.reserve_owned().await.ok()
    }

    /// Write the option negotiation sequence
    pub(crate) fn send_negotiation(&self) {
        for frame in negotiation_sequence() {
            self.shared.output.write_frame(frame);
        }
        self.shared.output.flush();
    }

    /// Finish negotiation without a terminal type report
    ///
    /// Returns `true` if this call moved the connection to `Ready`.
    pub(crate) fn negotiation_timed_out(&self) -> bool {
        if self.state() != ConnectionState::Negotiating {
            return false;
        }
        self.shared
            .set_terminal_type(consts::DEFAULT_TERMINAL_TYPE.to_string());
        self.shared
            .advance(ConnectionState::Negotiating, ConnectionState::Ready)
    }

    /// Move from `Ready` to `Running` and hand out the session
    ///
    /// Returns `None` if the connection is not `Ready` or the session was
    /// already taken.
    pub(crate) fn start_session(&self) -> Option<TerminalSession> {
        if !self
            .shared
            .advance(ConnectionState::Ready, ConnectionState::Running)
        {
            return None;
        }
        let receiver = lock(&self.shared.input_rx).take()?;
        Some(TerminalSession::new(
            self.clone(),
            TerminalInput::new(receiver, self.shared.encoding),
        ))
    }
}

impl std::fmt::Debug for TelnetConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelnetConnection")
            .field("id", &self.shared.id)
            .field("peer_addr", &self.shared.peer_addr)
            .field("state", &self.state())
            .field("size", &self.size())
            .field("terminal_type", &self.shared.terminal_type.get())
            .finish()
    }
}
