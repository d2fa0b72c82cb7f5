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

//! Incremental Telnet stream parser

use crate::{NegotiationVerb, TelnetEventSink, TelnetOption, WindowSize, consts};
use tracing::{debug, trace, warn};

///
/// Position of the parser within the Telnet command grammar.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ParserState {
    /// Plain data
    #[default]
    Normal,
    /// Previous byte was `IAC`
    SawIac,
    /// Saw `IAC <verb>`, waiting for the option byte
    AwaitingOptionArgument(NegotiationVerb),
    /// Inside `IAC SB ... `, collecting the payload
    InSubnegotiation,
    /// Saw `IAC` inside a subnegotiation
    SubnegotiationSawIac,
}

///
/// Byte-stream state machine that decodes the client side of a Telnet session.
///
/// The parser is fed arbitrary chunks as they arrive from the socket. Commands
/// split across chunk boundaries are reassembled; feeding never fails and never
/// blocks. Negotiation replies from the client (`DO`/`DONT`/`WILL`/`WONT`) are
/// logged and not answered.
///
/// # Example
/// ```
/// use termgate_telnetcodec::{TelnetEvent, TelnetParser, WindowSize};
///
/// let mut parser = TelnetParser::new();
/// let mut events = Vec::new();
/// parser.feed(b"hi\xFF\xFA\x1F\x00", &mut events);
/// parser.feed(b"\x50\x00\x18\xFF\xF0", &mut events);
/// assert_eq!(
///     events,
///     vec![
///         TelnetEvent::Data(b"hi".to_vec()),
///         TelnetEvent::WindowSize(WindowSize::new(80, 24)),
///     ]
/// );
/// ```
#[derive(Debug, Default)]
pub struct TelnetParser {
    state: ParserState,
    subnegotiation: Vec<u8>,
    overflowed: bool,
}

impl TelnetParser {
    /// Creates a parser in the [`ParserState::Normal`] state.
    pub fn new() -> Self {
        TelnetParser {
            state: ParserState::Normal,
            subnegotiation: Vec::with_capacity(64),
            overflowed: false,
        }
    }

    /// Current grammar position.
    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Discards any partial command and returns to [`ParserState::Normal`].
    pub fn reset(&mut self) {
        self.state = ParserState::Normal;
        self.subnegotiation.clear();
        self.overflowed = false;
    }

    /// Parses `bytes`, reporting decoded events to `sink` in stream order.
    ///
    /// Contiguous data bytes within `bytes` are delivered as a single
    /// `on_data` call. An escaped `IAC IAC` is delivered as its own one-byte
    /// run.
    pub fn feed<S: TelnetEventSink + ?Sized>(&mut self, bytes: &[u8], sink: &mut S) {
        let mut index = 0;
        while index < bytes.len() {
            index += self.step(&bytes[index..], sink);
        }
    }

    /// Advances over the front of `input`, returning how many bytes were consumed.
    ///
    /// In [`ParserState::Normal`] the whole data run up to and including the
    /// next `IAC` is consumed; every other state consumes a single byte.
    fn step<S: TelnetEventSink + ?Sized>(&mut self, input: &[u8], sink: &mut S) -> usize {
        let Some(&byte) = input.first() else {
            return 0;
        };
        match self.state {
            ParserState::Normal => {
                let end = input
                    .iter()
                    .position(|&b| b == consts::IAC)
                    .unwrap_or(input.len());
                if end > 0 {
                    sink.on_data(&input[..end]);
                }
                if end == input.len() {
                    return end;
                }
                self.state = ParserState::SawIac;
                return end + 1;
            }
            ParserState::SawIac => {
                self.state = ParserState::Normal;
                match byte {
                    consts::IAC => sink.on_data(&[consts::IAC]),
                    consts::SB => {
                        self.subnegotiation.clear();
                        self.overflowed = false;
                        self.state = ParserState::InSubnegotiation;
                    }
                    consts::NOP => trace!("Received NOP"),
                    other => match NegotiationVerb::from_u8(other) {
                        Some(verb) => self.state = ParserState::AwaitingOptionArgument(verb),
                        None => debug!("Ignoring unknown command {:#X}", other),
                    },
                }
            }
            ParserState::AwaitingOptionArgument(verb) => {
                self.state = ParserState::Normal;
                debug!("Client replied {} {}", verb, TelnetOption::from_u8(byte));
            }
            ParserState::InSubnegotiation => {
                if byte == consts::IAC {
                    self.state = ParserState::SubnegotiationSawIac;
                } else {
                    self.push_subnegotiation(byte);
                }
            }
            ParserState::SubnegotiationSawIac => {
                if byte == consts::SE {
                    self.state = ParserState::Normal;
                    self.dispatch_subnegotiation(sink);
                } else {
                    self.state = ParserState::InSubnegotiation;
                    self.push_subnegotiation(byte);
                }
            }
        }
        1
    }

    fn push_subnegotiation(&mut self, byte: u8) {
        if self.subnegotiation.len() < consts::MAX_SUBNEGOTIATION_LENGTH {
            self.subnegotiation.push(byte);
        } else if !self.overflowed {
            self.overflowed = true;
            warn!(
                "Subnegotiation exceeded {} bytes, dropping the remainder",
                consts::MAX_SUBNEGOTIATION_LENGTH
            );
        }
    }

    fn dispatch_subnegotiation<S: TelnetEventSink + ?Sized>(&mut self, sink: &mut S) {
        let Some((&option, payload)) = self.subnegotiation.split_first() else {
            debug!("Ignoring empty subnegotiation");
            return;
        };
        match TelnetOption::from_u8(option) {
            TelnetOption::NAWS => match WindowSize::decode(payload) {
                Some(size) => sink.on_window_size(size),
                None => warn!(
                    "Ignoring NAWS subnegotiation of {} bytes, expected {}",
                    self.subnegotiation.len(),
                    WindowSize::ENCODED_LEN + 1
                ),
            },
            TelnetOption::TTYPE => sink.on_terminal_type(decode_terminal_type(payload)),
            other => debug!(
                "Ignoring subnegotiation for {} ({} bytes)",
                other,
                payload.len()
            ),
        }
        self.subnegotiation.clear();
    }
}

/// `IS <name>`, falling back to [`consts::DEFAULT_TERMINAL_TYPE`].
fn decode_terminal_type(payload: &[u8]) -> String {
    match payload.split_first() {
        Some((&consts::ttype::IS, name)) => match std::str::from_utf8(name) {
            Ok(name) if !name.is_empty() => name.to_string(),
            Ok(_) => consts::DEFAULT_TERMINAL_TYPE.to_string(),
            Err(error) => {
                debug!("Terminal type is not UTF-8: {}", error);
                consts::DEFAULT_TERMINAL_TYPE.to_string()
            }
        },
        _ => {
            debug!("Terminal type report without IS marker");
            consts::DEFAULT_TERMINAL_TYPE.to_string()
        }
    }
}
