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

//! Configuration tests

use std::sync::Arc;
use std::time::Duration;
use termgate_service::{
    BoxError, Color, ServerConfig, TelnetError, TelnetServer, TerminalSession, TextEncoding,
    TextStyle, handler_fn,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

#[test]
fn test_server_config_defaults() {
    let config = ServerConfig::default();

    assert_eq!(config.host, "127.0.0.1");
    assert_eq!(config.port, 23);
    assert_eq!(config.encoding, TextEncoding::Utf8);
    assert_eq!(config.max_connections, 1000);
    assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
    assert!(config.style.is_none());
}

#[test]
fn test_server_config_builder() {
    let config = ServerConfig::new("10.0.0.1", 2323)
        .with_encoding(TextEncoding::Latin1)
        .with_style(TextStyle::new().underline())
        .with_max_connections(8)
        .with_shutdown_timeout(Duration::from_millis(250))
        .with_output_buffer_limit(64 * 1024)
        .with_input_queue_capacity(16);

    assert_eq!(config.bind_address(), "10.0.0.1:2323");
    assert_eq!(config.output_buffer_limit, 64 * 1024);
    assert_eq!(config.input_queue_capacity, 16);
    assert_eq!(config.encoding, TextEncoding::Latin1);
    assert_eq!(config.max_connections, 8);
    assert_eq!(config.shutdown_timeout, Duration::from_millis(250));
}

#[test]
fn test_invalid_configs_refused_by_server() {
    for config in [
        ServerConfig::new("", 23),
        ServerConfig::new("127.0.0.1", 0),
        ServerConfig::default().with_max_connections(0),
        ServerConfig::default().with_shutdown_timeout(Duration::ZERO),
        ServerConfig::default().with_output_buffer_limit(0),
        ServerConfig::default().with_input_queue_capacity(0),
    ] {
        assert!(matches!(
            TelnetServer::new(config),
            Err(TelnetError::InvalidConfig(_))
        ));
    }
}

async fn first_line(config: ServerConfig, terminal: &str) -> Vec<u8> {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let server = Arc::new(TelnetServer::new(config).unwrap());
    let handler = Arc::new(handler_fn(|session: TerminalSession| async move {
        session.send("caf\u{e9}\n");
        Ok::<(), BoxError>(())
    }));
    let cancel = CancellationToken::new();
    let task = tokio::spawn({
        let server = server.clone();
        let cancel = cancel.clone();
        async move { server.serve(listener, handler, cancel).await }
    });

    let mut client = TcpStream::connect(address).await.unwrap();
    let mut report = vec![255, 250, 24, 0];
    report.extend_from_slice(terminal.as_bytes());
    report.extend_from_slice(&[255, 240]);
    client.write_all(&report).await.unwrap();

    let mut received = Vec::new();
    client.read_to_end(&mut received).await.unwrap();
    cancel.cancel();
    task.await.unwrap().unwrap();
    received.split_off(28)
}

#[tokio::test]
async fn test_latin1_encoding_on_the_wire() {
    let config = ServerConfig::default().with_encoding(TextEncoding::Latin1);
    assert_eq!(first_line(config, "ansi").await, b"caf\xE9\r\n".to_vec());
}

#[tokio::test]
async fn test_style_applied_to_output() {
    let config = ServerConfig::default().with_style(TextStyle::new().with_foreground(Color::Red));
    let received = first_line(config, "ansi").await;
    let text = String::from_utf8(received).unwrap();
    assert!(text.starts_with("\x1b["));
    assert!(text.contains("caf\u{e9}\r\n"));
    assert!(text.ends_with("\x1b[0m"));
}
