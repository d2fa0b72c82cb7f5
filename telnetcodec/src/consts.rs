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

//! Telnet protocol byte values

/// Interpret As Command
pub const IAC: u8 = 255;
/// Demand the other party stop performing an option
pub const DONT: u8 = 254;
/// Request the other party perform an option
pub const DO: u8 = 253;
/// Refuse to perform an option
pub const WONT: u8 = 252;
/// Offer to perform an option
pub const WILL: u8 = 251;
/// Subnegotiation Begin
pub const SB: u8 = 250;
/// Subnegotiation End
pub const SE: u8 = 240;
/// No Operation
pub const NOP: u8 = 0;

/// Carriage Return
pub const CR: u8 = b'\r';
/// Line Feed
pub const LF: u8 = b'\n';
/// Null
pub const NUL: u8 = 0;

/// Maximum number of bytes retained for a single subnegotiation payload.
///
/// Bytes arriving after the buffer is full are dropped until the closing
/// `IAC SE`.
pub const MAX_SUBNEGOTIATION_LENGTH: usize = 1024;

/// Smallest terminal dimension accepted from a NAWS report.
pub const MIN_WINDOW_DIMENSION: u16 = 1;

/// Largest terminal dimension accepted from a NAWS report.
pub const MAX_WINDOW_DIMENSION: u16 = 500;

/// Terminal type assumed when the client never reports one, or reports one
/// we cannot decode.
pub const DEFAULT_TERMINAL_TYPE: &str = "VT100";

/// Telnet option codes
pub mod option {
    /// Echo [RFC857](https://tools.ietf.org/html/rfc857)
    pub const ECHO: u8 = 1;
    /// Suppress Go Ahead [RFC858](https://tools.ietf.org/html/rfc858)
    pub const SGA: u8 = 3;
    /// Terminal Type [RFC1091](https://tools.ietf.org/html/rfc1091)
    pub const TTYPE: u8 = 24;
    /// Negotiate About Window Size [RFC1073](https://tools.ietf.org/html/rfc1073)
    pub const NAWS: u8 = 31;
    /// Linemode [RFC1184](https://tools.ietf.org/html/rfc1184)
    pub const LINEMODE: u8 = 34;
}

/// TTYPE subnegotiation codes
pub mod ttype {
    /// Terminal type follows
    pub const IS: u8 = 0;
    /// Request the terminal type
    pub const SEND: u8 = 1;
}

/// LINEMODE subnegotiation codes
pub mod linemode {
    /// MODE sub-option
    pub const MODE: u8 = 1;
    /// Character-at-a-time mode (no EDIT, no TRAPSIG)
    pub const MODE_CHARACTER: u8 = 0;
}
