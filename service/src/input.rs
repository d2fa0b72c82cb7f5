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

//! Session input channel

use std::collections::VecDeque;
use termgate_telnetcodec::{TextEncoding, WindowSize, consts};
use tokio::sync::mpsc;

/// Something the client did, in arrival order
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputEvent {
    /// Decoded bytes typed or pasted by the client
    Data(Vec<u8>),
    /// The client's window changed size while the session was running
    Resize(WindowSize),
}

/// The receiving end of a connection's input channel
///
/// Only the session that owns it sees this connection's input. `recv`
/// returns `None` once the connection is closed.
#[derive(Debug)]
pub struct TerminalInput {
    receiver: mpsc::Receiver<InputEvent>,
    encoding: TextEncoding,
    pending: VecDeque<u8>,
    line: Vec<u8>,
    after_cr: bool,
}

impl TerminalInput {
    pub(crate) fn new(receiver: mpsc::Receiver<InputEvent>, encoding: TextEncoding) -> Self {
        Self {
            receiver,
            encoding,
            pending: VecDeque::new(),
            line: Vec::new(),
            after_cr: false,
        }
    }

    /// Wait for the next input event
    ///
    /// Bytes left over from an earlier [`read_line`](Self::read_line) are
    /// returned first.
    pub async fn recv(&mut self) -> Option<InputEvent> {
        if !self.pending.is_empty() {
            return Some(InputEvent::Data(self.pending.drain(..).collect()));
        }
        self.receiver.recv().await
    }

    /// Read one line of text without its terminator
    ///
    /// A line ends at CR or LF. The LF or NUL following a CR is swallowed.
    /// Resize events seen while waiting are skipped. At end of input a
    /// partial line is returned once, then `None`.
    pub async fn read_line(&mut self) -> Option<String> {
        loop {
            while let Some(byte) = self.pending.pop_front() {
                if std::mem::take(&mut self.after_cr) && (byte == consts::LF || byte == consts::NUL) {
                    continue;
                }
                match byte {
                    consts::CR => {
                        self.after_cr = true;
                        return Some(self.finish_line());
                    }
                    consts::LF => return Some(self.finish_line()),
                    byte => self.line.push(byte),
                }
            }
            match self.receiver.recv().await {
                Some(InputEvent::Data(bytes)) => self.pending.extend(bytes),
                Some(InputEvent::Resize(_)) => {}
                None if self.line.is_empty() => return None,
                None => return Some(self.finish_line()),
            }
        }
    }

    fn finish_line(&mut self) -> String {
        let line = self.encoding.decode(&self.line);
        self.line.clear();
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> (mpsc::Sender<InputEvent>, TerminalInput) {
        let (tx, rx) = mpsc::channel(16);
        (tx, TerminalInput::new(rx, TextEncoding::Utf8))
    }

    #[tokio::test]
    async fn test_read_line_handles_terminators() {
        let (tx, mut input) = input();
        tx.try_send(InputEvent::Data(b"one\r\ntwo\r\0three\nfo".to_vec())).unwrap();
        tx.try_send(InputEvent::Resize(WindowSize::new(90, 30))).unwrap();
        tx.try_send(InputEvent::Data(b"ur\r".to_vec())).unwrap();
        drop(tx);

        assert_eq!(input.read_line().await.as_deref(), Some("one"));
        assert_eq!(input.read_line().await.as_deref(), Some("two"));
        assert_eq!(input.read_line().await.as_deref(), Some("three"));
        assert_eq!(input.read_line().await.as_deref(), Some("four"));
        assert_eq!(input.read_line().await, None);
    }

    #[tokio::test]
    async fn test_cr_lf_split_across_events() {
        let (tx, mut input) = input();
        tx.try_send(InputEvent::Data(b"ab\r".to_vec())).unwrap();
        tx.try_send(InputEvent::Data(b"\ncd\n".to_vec())).unwrap();
        assert_eq!(input.read_line().await.as_deref(), Some("ab"));
        assert_eq!(input.read_line().await.as_deref(), Some("cd"));
    }

    #[tokio::test]
    async fn test_partial_line_at_close() {
        let (tx, mut input) = input();
        tx.try_send(InputEvent::Data(b"bye".to_vec())).unwrap();
        drop(tx);
        assert_eq!(input.read_line().await.as_deref(), Some("bye"));
        assert_eq!(input.read_line().await, None);
    }

    #[tokio::test]
    async fn test_recv_returns_leftovers_first() {
        let (tx, mut input) = input();
        tx.try_send(InputEvent::Data(b"x\ny".to_vec())).unwrap();
        tx.try_send(InputEvent::Resize(WindowSize::new(10, 10))).unwrap();
        assert_eq!(input.read_line().await.as_deref(), Some("x"));
        assert_eq!(input.recv().await, Some(InputEvent::Data(b"y".to_vec())));
        assert_eq!(
            input.recv().await,
            Some(InputEvent::Resize(WindowSize::new(10, 10)))
        );
    }
}
