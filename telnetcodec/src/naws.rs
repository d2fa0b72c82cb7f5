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

//! Negotiate About Window Size
//!

use crate::consts;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

/// Terminal window dimensions reported through NAWS.
///
/// Both axes are kept within
/// [`MIN_WINDOW_DIMENSION`](consts::MIN_WINDOW_DIMENSION)..=[`MAX_WINDOW_DIMENSION`](consts::MAX_WINDOW_DIMENSION)
/// when built through [`WindowSize::clamped`] or [`WindowSize::decode`].
///
/// # Format
/// The window size travels as four bytes in big-endian format:
/// - 2 bytes for columns (width)
/// - 2 bytes for rows (height)
///
/// # Example
/// ```
/// use termgate_telnetcodec::WindowSize;
///
/// let size = WindowSize::decode(&[0x00, 0x50, 0x00, 0x18]).unwrap();
/// assert_eq!(size.cols, 80);
/// assert_eq!(size.rows, 24);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WindowSize {
    /// The number of columns (characters) in the terminal window
    pub cols: u16,
    /// The number of rows (lines) in the terminal window
    pub rows: u16,
}

impl WindowSize {
    /// Encoded length of a NAWS payload, excluding the option byte.
    pub const ENCODED_LEN: usize = 4;

    /// Creates a new `WindowSize` with the given columns and rows, unchecked.
    pub fn new(cols: u16, rows: u16) -> Self {
        WindowSize { cols, rows }
    }

    /// Creates a `WindowSize` with each axis clamped into the accepted range.
    ///
    /// A reported `0` becomes `1`; anything above `500` becomes `500`.
    pub fn clamped(cols: u16, rows: u16) -> Self {
        WindowSize {
            cols: clamp_dimension(cols),
            rows: clamp_dimension(rows),
        }
    }

    /// Decodes the four NAWS bytes that follow the option byte.
    ///
    /// Returns `None` unless `payload` is exactly four bytes long. The result
    /// is clamped.
    pub fn decode(payload: &[u8]) -> Option<WindowSize> {
        if payload.len() != Self::ENCODED_LEN {
            return None;
        }
        let mut reader = payload;
        let cols = reader.read_u16::<BigEndian>().ok()?;
        let rows = reader.read_u16::<BigEndian>().ok()?;
        Some(WindowSize::clamped(cols, rows))
    }

    /// Writes this `WindowSize` as two big-endian u16 values, columns first.
    pub fn write<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<usize> {
        writer.write_u16::<BigEndian>(self.cols)?;
        writer.write_u16::<BigEndian>(self.rows)?;
        Ok(Self::ENCODED_LEN)
    }

    /// Packs both axes into one `u32` (columns in the high half).
    pub fn to_u32(&self) -> u32 {
        (u32::from(self.cols) << 16) | u32::from(self.rows)
    }

    /// Inverse of [`WindowSize::to_u32`].
    pub fn from_u32(packed: u32) -> Self {
        WindowSize {
            cols: (packed >> 16) as u16,
            rows: (packed & 0xFFFF) as u16,
        }
    }
}

fn clamp_dimension(value: u16) -> u16 {
    value.clamp(consts::MIN_WINDOW_DIMENSION, consts::MAX_WINDOW_DIMENSION)
}

impl Default for WindowSize {
    /// The traditional 80x24 terminal.
    fn default() -> Self {
        WindowSize { cols: 80, rows: 24 }
    }
}

impl std::fmt::Display for WindowSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.cols, self.rows)
    }
}
