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

//! # Termgate Telnet Protocol Codec
//!
//! The server side of the Telnet protocol (RFC 854) as used by Termgate: an
//! incremental parser for client traffic and an encoder for server traffic.
//!
//! ## Overview
//!
//! - **Parsing**: [`TelnetParser`] is a five-state machine fed raw socket
//!   chunks. It collapses `IAC IAC`, swallows negotiation replies and decodes
//!   the two subnegotiations the server cares about:
//!   - NAWS window size reports ([`WindowSize`], clamped to 1..=500 per axis)
//!   - TTYPE terminal type reports (falling back to `VT100`)
//! - **Encoding**: [`NvtEncoder`] implements [`Encoder`] for text (LF to CRLF
//!   translation in a chosen [`TextEncoding`]) and for [`TelnetFrame`]s.
//! - **Negotiation**: [`negotiation_sequence`] is the fixed set of frames sent
//!   to every new client.
//!
//! Decoded events are pushed into a [`TelnetEventSink`]. `Vec<TelnetEvent>`
//! implements the sink, which is convenient for tests and small tools.
//!
//! ## Usage Example
//!
//! ```rust
//! use bytes::BytesMut;
//! use termgate_telnetcodec::{NvtEncoder, TelnetEvent, TelnetParser, negotiation_sequence};
//! use tokio_util::codec::Encoder;
//!
//! let mut encoder = NvtEncoder::default();
//! let mut out = BytesMut::new();
//! for frame in negotiation_sequence() {
//!     encoder.encode(frame, &mut out).unwrap();
//! }
//! encoder.encode("welcome\n", &mut out).unwrap();
//! assert!(out.ends_with(b"welcome\r\n"));
//!
//! let mut parser = TelnetParser::new();
//! let mut events = Vec::new();
//! parser.feed(b"\xFF\xFB\x1Fls\r\n", &mut events);
//! assert_eq!(events, vec![TelnetEvent::Data(b"ls\r\n".to_vec())]);
//! ```
//!
//! ## Thread Safety
//!
//! [`TelnetParser`] is plain mutable state. Each connection owns its own and
//! guards it if it must be shared.
//!
//! ## Related RFCs
//!
//! - RFC 854: Telnet Protocol Specification
//! - RFC 857: Telnet Echo Option
//! - RFC 858: Telnet Suppress Go Ahead Option
//! - RFC 1073: Telnet Window Size Option
//! - RFC 1091: Telnet Terminal-Type Option
//! - RFC 1184: Telnet Linemode Option

#![warn(
    clippy::cargo,
    missing_docs,
    clippy::pedantic,
    future_incompatible,
    rust_2018_idioms
)]
#![allow(
    clippy::option_if_let_else,
    clippy::module_name_repetitions,
    clippy::missing_errors_doc
)]

pub mod consts;
mod encoder;
mod event;
mod frame;
pub mod naws;
mod options;
mod parser;

pub use self::encoder::{NvtEncoder, TextEncoding};
pub use self::event::{TelnetEvent, TelnetEventSink};
pub use self::frame::{TelnetFrame, negotiation_sequence};
pub use self::naws::WindowSize;
pub use self::options::{NegotiationVerb, TelnetOption};
pub use self::parser::{ParserState, TelnetParser};
pub use tokio_util::codec::Encoder;
