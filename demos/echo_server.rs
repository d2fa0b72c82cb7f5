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

//! Echo Server Example
//!
//! A Telnet server that:
//! - Accepts connections on port 2323
//! - Greets each client with its negotiated terminal type and size
//! - Echoes keystrokes and completed lines, and reports window resizes
//! - Closes the session on `quit`
//!
//! ## Usage
//!
//! Run the server:
//! ```bash
//! RUST_LOG=debug cargo run --example echo_server
//! ```
//!
//! Connect with a telnet client:
//! ```bash
//! telnet localhost 2323
//! ```

use async_trait::async_trait;
use std::sync::Arc;
use termgate_service::{
    BoxError, Color, ConnectionId, InputEvent, ServerConfig, ServerHandler, TelnetConnection,
    TelnetError, TelnetServer, TerminalSession, TextStyle,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServerConfig::new("127.0.0.1", 2323)
        .with_max_connections(100)
        .with_style(TextStyle::new().with_foreground(Color::Green));
    let server = TelnetServer::new(config)?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl+C received, shutting down");
            }
            cancel.cancel();
        }
    });

    server
        .run(
            Arc::new(EchoHandler),
            |address| println!("Listening on {address}, connect with: telnet {address}"),
            cancel,
        )
        .await?;

    let metrics = server.metrics().snapshot();
    println!(
        "Served {} connections ({} bytes in, {} bytes out)",
        metrics.total_connections, metrics.bytes_received, metrics.bytes_sent
    );
    Ok(())
}

/// Line echo application
struct EchoHandler;

#[async_trait]
impl ServerHandler for EchoHandler {
    async fn interact(&self, mut session: TerminalSession) -> Result<(), BoxError> {
        session.erase_screen();
        session.send(&format!(
            "Welcome! Terminal {} at {}.\nType 'quit' to leave.\n> ",
            session.terminal_type(),
            session.size()
        ));

        // The server negotiated WILL ECHO, so keystrokes are echoed here.
        let mut line = String::new();
        while let Some(event) = session.recv().await {
            let bytes = match event {
                InputEvent::Resize(size) => {
                    session.send(&format!("\n[window is now {size}]\n> {line}"));
                    continue;
                }
                InputEvent::Data(bytes) => bytes,
            };
            for ch in String::from_utf8_lossy(&bytes).chars() {
                match ch {
                    '\r' => {
                        if line.trim() == "quit" {
                            session.send("\nGoodbye!\n");
                            return Ok(());
                        }
                        session.send(&format!("\n{line}\n> "));
                        line.clear();
                    }
                    '\x08' | '\x7f' => {
                        if line.pop().is_some() {
                            session.send("\x08 \x08");
                        }
                    }
                    ch if ch.is_control() => {}
                    ch => {
                        line.push(ch);
                        session.send(ch.encode_utf8(&mut [0u8; 4]));
                    }
                }
            }
        }
        Ok(())
    }

    async fn on_connect(&self, id: ConnectionId, conn: &TelnetConnection) {
        info!(%id, peer = %conn.peer_addr(), "Client connected");
    }

    async fn on_error(&self, id: ConnectionId, _conn: &TelnetConnection, err: TelnetError) {
        error!(%id, %err, "Session failed");
    }

    async fn on_disconnect(&self, id: ConnectionId, _conn: &TelnetConnection) {
        info!(%id, "Client disconnected");
    }
}
