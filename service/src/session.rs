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

use crate::{ConnectionId, InputEvent, TelnetConnection, TerminalInput};
use termgate_telnetcodec::WindowSize;

/// One client's interactive session, handed to the application
///
/// Pairs the connection handle with the connection's private input channel.
#[derive(Debug)]
pub struct TerminalSession {
    connection: TelnetConnection,
    input: TerminalInput,
}

impl TerminalSession {
    pub(crate) fn new(connection: TelnetConnection, input: TerminalInput) -> Self {
        Self { connection, input }
    }

    /// Connection ID
    pub fn id(&self) -> ConnectionId {
        self.connection.id()
    }

    /// Handle for output and connection state
    pub fn connection(&self) -> &TelnetConnection {
        &self.connection
    }

    /// This session's input channel
    pub fn input(&mut self) -> &mut TerminalInput {
        &mut self.input
    }

    /// Split into the connection handle and the input channel
    pub fn into_parts(self) -> (TelnetConnection, TerminalInput) {
        (self.connection, self.input)
    }

    /// Current terminal size
    pub fn size(&self) -> WindowSize {
        self.connection.size()
    }

    /// Negotiated terminal type
    pub fn terminal_type(&self) -> String {
        self.connection
            .terminal_type()
            .unwrap_or_else(|| termgate_telnetcodec::consts::DEFAULT_TERMINAL_TYPE.to_string())
    }

    /// See [`TelnetConnection::send`]
    pub fn send(&self, text: &str) {
        self.connection.send(text);
    }

    /// See [`TelnetConnection::erase_screen`]
    pub fn erase_screen(&self) {
        self.connection.erase_screen();
    }

    /// See [`TerminalInput::recv`]
    pub async fn recv(&mut self) -> Option<InputEvent> {
        self.input.recv().await
    }

    /// See [`TerminalInput::read_line`]
    pub async fn read_line(&mut self) -> Option<String> {
        self.input.read_line().await
    }
}
