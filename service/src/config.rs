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

//! Server configuration

use crate::TextStyle;
use std::time::Duration;
use termgate_telnetcodec::TextEncoding;

/// How long a new connection may spend negotiating before it is treated as
/// ready with fallback values.
pub const NEGOTIATION_TIMEOUT: Duration = Duration::from_millis(500);

/// Default cap on flushed output waiting for a slow client, in bytes
pub const DEFAULT_OUTPUT_BUFFER_LIMIT: usize = 1024 * 1024;

/// Default number of input events queued ahead of the session
pub const DEFAULT_INPUT_QUEUE_CAPACITY: usize = 256;

/// Server configuration
///
/// This structure contains all configuration options for the Telnet server.
/// Use the builder pattern methods to customize the configuration. The
/// configuration is fixed once the server is constructed.
///
/// # Example
///
/// ```
/// use termgate_service::{Color, ServerConfig, TextStyle};
/// use std::time::Duration;
///
/// let config = ServerConfig::new("0.0.0.0", 2323)
///     .with_max_connections(500)
///     .with_style(TextStyle::new().with_foreground(Color::Green))
///     .with_shutdown_timeout(Duration::from_secs(2));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host name or address to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Encoding used for text sent to and read from clients
    pub encoding: TextEncoding,

    /// Style applied to application output by the default renderer
    ///
    /// When `None`, output is sent unstyled.
    pub style: Option<TextStyle>,

    /// Maximum number of concurrent connections
    pub max_connections: usize,

    /// Timeout for graceful shutdown
    ///
    /// After cancellation the server waits this long for connections to
    /// finish their cleanup before returning.
    pub shutdown_timeout: Duration,

    /// Flushed bytes a connection may have waiting on the socket
    ///
    /// A client that stops reading is disconnected once its pending output
    /// would exceed this limit.
    pub output_buffer_limit: usize,

    /// Input events buffered between the socket and the session
    ///
    /// When the queue is full the connection stops reading from its socket
    /// until the session catches up.
    pub input_queue_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 23,
            encoding: TextEncoding::Utf8,
            style: None,
            max_connections: 1000,
            shutdown_timeout: Duration::from_secs(1),
            output_buffer_limit: DEFAULT_OUTPUT_BUFFER_LIMIT,
            input_queue_capacity: DEFAULT_INPUT_QUEUE_CAPACITY,
        }
    }
}

impl ServerConfig {
    /// Create a new configuration with the given host and port
    ///
    /// All other settings will use their default values.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Set the host to bind to
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port to bind to
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the text encoding
    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Set the output style
    pub fn with_style(mut self, style: TextStyle) -> Self {
        self.style = Some(style);
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the shutdown timeout duration
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Set the pending output limit in bytes
    pub fn with_output_buffer_limit(mut self, limit: usize) -> Self {
        self.output_buffer_limit = limit;
        self
    }

    /// Set the input queue capacity in events
    pub fn with_input_queue_capacity(mut self, capacity: usize) -> Self {
        self.input_queue_capacity = capacity;
        self
    }

    /// The `host:port` string handed to the resolver when binding
    pub fn bind_address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Validate the configuration
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("host must not be empty".to_string());
        }

        if self.port == 0 {
            return Err("port must be between 1 and 65535".to_string());
        }

        if self.max_connections == 0 {
            return Err("max_connections must be greater than 0".to_string());
        }

        if self.shutdown_timeout.is_zero() {
            return Err("shutdown_timeout must be greater than 0".to_string());
        }

        if self.output_buffer_limit == 0 {
            return Err("output_buffer_limit must be greater than 0".to_string());
        }

        if self.input_queue_capacity == 0 {
            return Err("input_queue_capacity must be greater than 0".to_string());
        }

        Ok(())
    }
}
