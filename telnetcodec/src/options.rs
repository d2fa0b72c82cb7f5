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

use crate::consts;

///
/// Telnet options understood by the server.
///
/// Anything else is carried through as [`TelnetOption::Unknown`] so it can be
/// logged without losing the original code.
///
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TelnetOption {
    /// [`consts::option::ECHO`] Telnet Echo Option [RFC857](https://tools.ietf.org/html/rfc857)
    Echo,
    /// [`consts::option::SGA`] Suppress Go ahead [RFC858](https://tools.ietf.org/html/rfc858)
    SuppressGoAhead,
    /// [`consts::option::TTYPE`] Terminal Type [RFC1091](http://www.iana.org/go/rfc1091)
    TTYPE,
    /// [`consts::option::NAWS`] Negotiate About Window Size [RFC1073](http://www.iana.org/go/rfc1073)
    NAWS,
    /// [`consts::option::LINEMODE`] Linemode [RFC1184](http://www.iana.org/go/rfc1184)
    Linemode,
    /// Any option code not listed above
    Unknown(u8),
}

impl TelnetOption {
    /// Wire value of this option
    pub fn to_u8(&self) -> u8 {
        match self {
            TelnetOption::Echo => consts::option::ECHO,
            TelnetOption::SuppressGoAhead => consts::option::SGA,
            TelnetOption::TTYPE => consts::option::TTYPE,
            TelnetOption::NAWS => consts::option::NAWS,
            TelnetOption::Linemode => consts::option::LINEMODE,
            TelnetOption::Unknown(byte) => *byte,
        }
    }

    /// Option for a wire value
    pub fn from_u8(byte: u8) -> Self {
        match byte {
            consts::option::ECHO => TelnetOption::Echo,
            consts::option::SGA => TelnetOption::SuppressGoAhead,
            consts::option::TTYPE => TelnetOption::TTYPE,
            consts::option::NAWS => TelnetOption::NAWS,
            consts::option::LINEMODE => TelnetOption::Linemode,
            byte => TelnetOption::Unknown(byte),
        }
    }
}

impl std::fmt::Display for TelnetOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TelnetOption::Echo => write!(f, "Echo"),
            TelnetOption::SuppressGoAhead => write!(f, "SuppressGoAhead"),
            TelnetOption::TTYPE => write!(f, "TTYPE"),
            TelnetOption::NAWS => write!(f, "NAWS"),
            TelnetOption::Linemode => write!(f, "Linemode"),
            TelnetOption::Unknown(byte) => write!(f, "Unknown({byte})"),
        }
    }
}

impl From<u8> for TelnetOption {
    fn from(byte: u8) -> Self {
        Self::from_u8(byte)
    }
}

impl From<TelnetOption> for u8 {
    fn from(option: TelnetOption) -> Self {
        option.to_u8()
    }
}

///
/// Option negotiation verbs (`DO`, `DONT`, `WILL`, `WONT`).
///
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum NegotiationVerb {
    /// Request the other party perform an option
    Do,
    /// Demand the other party stop performing an option
    Dont,
    /// Offer to perform an option
    Will,
    /// Refuse to perform an option
    Wont,
}

impl NegotiationVerb {
    /// Verb for a command byte, if it is one of the four negotiation commands
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            consts::DO => Some(NegotiationVerb::Do),
            consts::DONT => Some(NegotiationVerb::Dont),
            consts::WILL => Some(NegotiationVerb::Will),
            consts::WONT => Some(NegotiationVerb::Wont),
            _ => None,
        }
    }

    /// Wire value of this verb
    pub fn to_u8(&self) -> u8 {
        match self {
            NegotiationVerb::Do => consts::DO,
            NegotiationVerb::Dont => consts::DONT,
            NegotiationVerb::Will => consts::WILL,
            NegotiationVerb::Wont => consts::WONT,
        }
    }
}

impl std::fmt::Display for NegotiationVerb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NegotiationVerb::Do => write!(f, "DO"),
            NegotiationVerb::Dont => write!(f, "DONT"),
            NegotiationVerb::Will => write!(f, "WILL"),
            NegotiationVerb::Wont => write!(f, "WONT"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_codes_match_assignments() {
        assert_eq!(TelnetOption::Echo.to_u8(), 1);
        assert_eq!(TelnetOption::SuppressGoAhead.to_u8(), 3);
        assert_eq!(TelnetOption::TTYPE.to_u8(), 24);
        assert_eq!(TelnetOption::NAWS.to_u8(), 31);
        assert_eq!(TelnetOption::Linemode.to_u8(), 34);
    }

    #[test]
    fn unknown_option_keeps_code() {
        let option = TelnetOption::from_u8(200);
        assert_eq!(option, TelnetOption::Unknown(200));
        assert_eq!(u8::from(option), 200);
        assert_eq!(option.to_string(), "Unknown(200)");
    }

    #[test]
    fn verbs_only_cover_negotiation_commands() {
        assert_eq!(NegotiationVerb::from_u8(253), Some(NegotiationVerb::Do));
        assert_eq!(NegotiationVerb::from_u8(254), Some(NegotiationVerb::Dont));
        assert_eq!(NegotiationVerb::from_u8(251), Some(NegotiationVerb::Will));
        assert_eq!(NegotiationVerb::from_u8(252), Some(NegotiationVerb::Wont));
        assert_eq!(NegotiationVerb::from_u8(consts::SB), None);
        assert_eq!(NegotiationVerb::Wont.to_string(), "WONT");
    }
}
