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

//! Handler traits and implementations for the Telnet server

use crate::{BoxError, ConnectionId, TelnetConnection, TelnetError, TerminalSession};
use async_trait::async_trait;
use std::future::Future;

/// Server application trait
///
/// `interact` runs one session from the moment negotiation finishes until it
/// returns; the connection is then closed. The other methods are lifecycle
/// hooks with empty default implementations.
///
/// # Example
///
/// ```no_run
/// use termgate_service::{BoxError, ServerHandler, TerminalSession};
/// use async_trait::async_trait;
///
/// struct Greeter;
///
/// #[async_trait]
/// impl ServerHandler for Greeter {
///     async fn interact(&self, mut session: TerminalSession) -> Result<(), BoxError> {
///         session.send(&format!("Hello, {}!\n", session.terminal_type()));
///         while let Some(line) = session.read_line().await {
///             if line == "quit" {
///                 break;
///             }
///             session.send(&format!("{line}\n"));
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait ServerHandler: Send + Sync + 'static {
    /// Run the application for one session
    ///
    /// An `Err` or a panic is logged, reported to [`on_error`](Self::on_error)
    /// and closes only this connection.
    async fn interact(&self, session: TerminalSession) -> Result<(), BoxError>;

    /// Called when negotiation has finished, just before `interact`
    async fn on_connect(&self, _id: ConnectionId, _conn: &TelnetConnection) {}

    /// Called when the application fails
    ///
    /// The connection will be closed after this method returns.
    async fn on_error(&self, _id: ConnectionId, _conn: &TelnetConnection, _error: TelnetError) {}

    /// Called once the connection has been closed, for whatever reason
    async fn on_disconnect(&self, _id: ConnectionId, _conn: &TelnetConnection) {}
}

/// [`ServerHandler`] built from an async closure by [`handler_fn`]
pub struct FnHandler<F> {
    interact: F,
}

/// Build a handler from an async function of the session
///
/// ```no_run
/// use termgate_service::{BoxError, TerminalSession, handler_fn};
///
/// let handler = handler_fn(|session: TerminalSession| async move {
///     session.send("bye\n");
///     Ok::<(), BoxError>(())
/// });
/// ```
pub fn handler_fn<F, Fut>(interact: F) -> FnHandler<F>
where
    F: Fn(TerminalSession) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    FnHandler { interact }
}

#[async_trait]
impl<F, Fut> ServerHandler for FnHandler<F>
where
    F: Fn(TerminalSession) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    async fn interact(&self, session: TerminalSession) -> Result<(), BoxError> {
        (self.interact)(session).await
    }
}

impl<F> std::fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}
