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

//! Telnet Session Server
//!
//! An async Telnet server that negotiates terminal options with every client
//! and then hands each connection to the application as an isolated
//! [`TerminalSession`]:
//!
//! - Option negotiation (`LINEMODE`, `SGA`, `ECHO`, `NAWS`, `TTYPE`) with a
//!   500 ms fallback to `VT100` at 80x24
//! - Per-connection input channels carrying data and resize events in order
//! - Buffered, non-blocking output with newline translation
//! - Application failures and panics contained to their own connection
//! - Lock-free metrics and cancellation-driven shutdown
//!
//! # Architecture
//!
//! ```text
//! TelnetServer
//!     ↓
//! ConnectionManager
//!     ↓
//! ConnectionWorker → TelnetConnection → OutputSink → OutputWriter
//!     ↓
//! ServerHandler::interact(TerminalSession)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use termgate_service::{BoxError, ServerConfig, ServerHandler, TelnetServer, TerminalSession};
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl ServerHandler for Echo {
//!     async fn interact(&self, mut session: TerminalSession) -> Result<(), BoxError> {
//!         while let Some(line) = session.read_line().await {
//!             session.send(&format!("{line}\n"));
//!         }
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = TelnetServer::new(ServerConfig::new("127.0.0.1", 2323))?;
//!     server.start(Arc::new(Echo)).await?;
//!     tokio::signal::ctrl_c().await?;
//!     server.shutdown().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod connection;
mod error;
mod handler;
mod input;
mod manager;
mod metrics;
mod output;
mod render;
mod server;
mod session;
mod types;
mod worker;

pub use config::{
    DEFAULT_INPUT_QUEUE_CAPACITY, DEFAULT_OUTPUT_BUFFER_LIMIT, NEGOTIATION_TIMEOUT, ServerConfig,
};
pub use connection::TelnetConnection;
pub use error::{BoxError, Result, TelnetError};
pub use handler::{FnHandler, ServerHandler, handler_fn};
pub use input::{InputEvent, TerminalInput};
pub use manager::{BroadcastResult, ConnectionManager};
pub use self::metrics::{MetricsSnapshot, ServerMetrics};
pub use output::{OutputSink, OutputWriter};
pub use render::{Color, PlainRenderer, Renderer, StyledRenderer, TextStyle};
pub use server::TelnetServer;
pub use session::TerminalSession;
pub use termgate_telnetcodec::{TextEncoding, WindowSize};
pub use types::{ConnectionId, ConnectionInfo, ConnectionState, ServerSnapshot};
pub use worker::ConnectionWorker;
