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

use crate::{NegotiationVerb, TelnetOption, consts};

///
/// Protocol frames the server sends to a client.
///
/// Encoded through [`NvtEncoder`](crate::NvtEncoder).
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TelnetFrame {
    /// `IAC DO <option>`
    Do(TelnetOption),
    /// `IAC DONT <option>`
    Dont(TelnetOption),
    /// `IAC WILL <option>`
    Will(TelnetOption),
    /// `IAC WONT <option>`
    Wont(TelnetOption),
    /// `IAC SB <option> <payload> IAC SE`, with `IAC` bytes in the payload doubled
    Subnegotiate(TelnetOption, Vec<u8>),
}

impl TelnetFrame {
    /// Builds a negotiation frame from its verb.
    pub fn negotiate(verb: NegotiationVerb, option: TelnetOption) -> Self {
        match verb {
            NegotiationVerb::Do => TelnetFrame::Do(option),
            NegotiationVerb::Dont => TelnetFrame::Dont(option),
            NegotiationVerb::Will => TelnetFrame::Will(option),
            NegotiationVerb::Wont => TelnetFrame::Wont(option),
        }
    }

    /// Number of bytes this frame occupies on the wire.
    pub fn len(&self) -> usize {
        match self {
            TelnetFrame::Subnegotiate(_, payload) => {
                5 + payload.len() + payload.iter().filter(|&&b| b == consts::IAC).count()
            }
            _ => 3,
        }
    }

    /// Frames are never empty.
    pub fn is_empty(&self) -> bool {
        false
    }
}

///
/// The frames written to every new connection, in order.
///
/// Requests character-at-a-time linemode, offers to suppress go-ahead and to
/// echo, then asks for window size and terminal type reports.
///
pub fn negotiation_sequence() -> [TelnetFrame; 7] {
    [
        TelnetFrame::Do(TelnetOption::Linemode),
        TelnetFrame::Will(TelnetOption::SuppressGoAhead),
        TelnetFrame::Subnegotiate(
            TelnetOption::Linemode,
            vec![consts::linemode::MODE, consts::linemode::MODE_CHARACTER],
        ),
        TelnetFrame::Will(TelnetOption::Echo),
        TelnetFrame::Do(TelnetOption::NAWS),
        TelnetFrame::Do(TelnetOption::TTYPE),
        TelnetFrame::Subnegotiate(TelnetOption::TTYPE, vec![consts::ttype::SEND]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_order_is_fixed() {
        let frames = negotiation_sequence();
        assert_eq!(frames[0], TelnetFrame::Do(TelnetOption::Linemode));
        assert_eq!(frames[3], TelnetFrame::Will(TelnetOption::Echo));
        assert_eq!(
            frames[6],
            TelnetFrame::Subnegotiate(TelnetOption::TTYPE, vec![consts::ttype::SEND])
        );
    }

    #[test]
    fn length_counts_escaped_payload() {
        assert_eq!(TelnetFrame::Will(TelnetOption::Echo).len(), 3);
        assert_eq!(
            TelnetFrame::Subnegotiate(TelnetOption::NAWS, vec![0, 0xFF, 0, 24]).len(),
            10
        );
    }

    #[test]
    fn negotiate_maps_verbs() {
        assert_eq!(
            TelnetFrame::negotiate(NegotiationVerb::Wont, TelnetOption::Echo),
            TelnetFrame::Wont(TelnetOption::Echo)
        );
    }
}
