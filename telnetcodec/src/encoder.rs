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

//! Network Virtual Terminal output encoding

use crate::{TelnetFrame, consts};
use bytes::{BufMut, BytesMut};
use tokio_util::codec::Encoder;

///
/// Character encoding used to turn text into bytes on the wire and back.
///
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TextEncoding {
    /// UTF-8
    #[default]
    Utf8,
    /// ISO-8859-1. Characters outside the range are sent as `?`.
    Latin1,
}

impl TextEncoding {
    /// Appends the encoded form of `text` to `dst` without any translation.
    pub fn encode_into(&self, text: &str, dst: &mut BytesMut) {
        match self {
            TextEncoding::Utf8 => dst.put_slice(text.as_bytes()),
            TextEncoding::Latin1 => {
                dst.reserve(text.len());
                for ch in text.chars() {
                    dst.put_u8(u8::try_from(u32::from(ch)).unwrap_or(b'?'));
                }
            }
        }
    }

    /// Decodes received bytes into text. Invalid UTF-8 is replaced, Latin-1
    /// never fails.
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            TextEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            TextEncoding::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
        }
    }
}

impl std::fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextEncoding::Utf8 => write!(f, "UTF-8"),
            TextEncoding::Latin1 => write!(f, "ISO-8859-1"),
        }
    }
}

impl std::str::FromStr for TextEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(TextEncoding::Utf8),
            "latin1" | "latin-1" | "iso-8859-1" => Ok(TextEncoding::Latin1),
            other => Err(format!("unsupported text encoding '{other}'")),
        }
    }
}

///
/// Encoder for server-to-client traffic.
///
/// Text frames have every `\n` turned into `\r\n` (an existing `\r\n` becomes
/// `\r\r\n`) and are then encoded with the configured [`TextEncoding`]. A
/// literal `0xFF` produced by the encoding is doubled. Protocol frames are
/// written as-is.
///
#[derive(Clone, Copy, Debug, Default)]
pub struct NvtEncoder {
    encoding: TextEncoding,
}

impl NvtEncoder {
    /// Creates an encoder for the given text encoding.
    pub fn new(encoding: TextEncoding) -> Self {
        NvtEncoder { encoding }
    }

    /// Text encoding in use.
    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    fn put_escaped(dst: &mut BytesMut, bytes: &[u8]) {
        for &byte in bytes {
            if byte == consts::IAC {
                dst.put_u8(consts::IAC);
            }
            dst.put_u8(byte);
        }
    }
}

impl Encoder<&str> for NvtEncoder {
    type Error = std::io::Error;

    fn encode(&mut self, item: &str, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let mut encoded = BytesMut::with_capacity(item.len());
        self.encoding.encode_into(item, &mut encoded);
        dst.reserve(encoded.len() + encoded.len() / 8);
        for &byte in encoded.iter() {
            match byte {
                consts::LF => {
                    dst.put_u8(consts::CR);
                    dst.put_u8(consts::LF);
                }
                consts::IAC => {
                    dst.put_u8(consts::IAC);
                    dst.put_u8(consts::IAC);
                }
                byte => dst.put_u8(byte),
            }
        }
        Ok(())
    }
}

impl Encoder<TelnetFrame> for NvtEncoder {
    type Error = std::io::Error;

    fn encode(&mut self, item: TelnetFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.len());
        match item {
            TelnetFrame::Do(option) => dst.put_slice(&[consts::IAC, consts::DO, option.to_u8()]),
            TelnetFrame::Dont(option) => {
                dst.put_slice(&[consts::IAC, consts::DONT, option.to_u8()]);
            }
            TelnetFrame::Will(option) => {
                dst.put_slice(&[consts::IAC, consts::WILL, option.to_u8()]);
            }
            TelnetFrame::Wont(option) => {
                dst.put_slice(&[consts::IAC, consts::WONT, option.to_u8()]);
            }
            TelnetFrame::Subnegotiate(option, payload) => {
                dst.put_slice(&[consts::IAC, consts::SB, option.to_u8()]);
                Self::put_escaped(dst, &payload);
                dst.put_slice(&[consts::IAC, consts::SE]);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TelnetOption;

    fn encode_text(encoding: TextEncoding, text: &str) -> Vec<u8> {
        let mut encoder = NvtEncoder::new(encoding);
        let mut dst = BytesMut::new();
        encoder.encode(text, &mut dst).unwrap();
        dst.to_vec()
    }

    #[test]
    fn line_feeds_become_crlf() {
        assert_eq!(encode_text(TextEncoding::Utf8, "a\nb\n"), b"a\r\nb\r\n");
    }

    #[test]
    fn existing_crlf_gains_extra_cr() {
        assert_eq!(encode_text(TextEncoding::Utf8, "x\r\n"), b"x\r\r\n");
    }

    #[test]
    fn latin1_substitutes_and_escapes() {
        assert_eq!(encode_text(TextEncoding::Latin1, "é☃"), vec![0xE9, b'?']);
        assert_eq!(encode_text(TextEncoding::Latin1, "ÿ"), vec![0xFF, 0xFF]);
    }

    #[test]
    fn subnegotiation_payload_is_escaped() {
        let mut encoder = NvtEncoder::default();
        let mut dst = BytesMut::new();
        encoder
            .encode(
                TelnetFrame::Subnegotiate(TelnetOption::NAWS, vec![0x01, 0xFF, 0x00, 0x18]),
                &mut dst,
            )
            .unwrap();
        assert_eq!(
            dst.as_ref(),
            &[255, 250, 31, 0x01, 0xFF, 0xFF, 0x00, 0x18, 255, 240]
        );
    }

    #[test]
    fn encoding_names_parse() {
        assert_eq!("UTF-8".parse::<TextEncoding>(), Ok(TextEncoding::Utf8));
        assert_eq!("latin1".parse::<TextEncoding>(), Ok(TextEncoding::Latin1));
        assert!("ebcdic".parse::<TextEncoding>().is_err());
    }

    #[test]
    fn decode_round_trips_latin1() {
        assert_eq!(TextEncoding::Latin1.decode(&[0x63, 0xE9]), "cé");
        assert_eq!(TextEncoding::Utf8.decode(&[0x66, 0xFF]), "f\u{FFFD}");
    }
}
