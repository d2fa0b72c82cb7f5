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

//! Output rendering
//!
//! A [`Renderer`] turns the text an application sends into the text written
//! to the terminal, before newline translation and encoding.

use std::borrow::Cow;
use std::fmt::Write;
use std::sync::Arc;

/// Terminal text renderer
pub trait Renderer: Send + Sync + 'static {
    /// Render application text for the terminal
    fn render<'a>(&self, text: &'a str) -> Cow<'a, str>;
}

/// Passes text through unchanged
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainRenderer;

impl Renderer for PlainRenderer {
    fn render<'a>(&self, text: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(text)
    }
}

/// Wraps text in an SGR style and a trailing reset
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StyledRenderer {
    prefix: String,
}

impl StyledRenderer {
    /// Create a renderer for the given style
    pub fn new(style: TextStyle) -> Self {
        Self {
            prefix: style.sgr_sequence(),
        }
    }
}

impl Renderer for StyledRenderer {
    fn render<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if self.prefix.is_empty() || text.is_empty() {
            return Cow::Borrowed(text);
        }
        let mut out = String::with_capacity(self.prefix.len() + text.len() + 4);
        out.push_str(&self.prefix);
        out.push_str(text);
        out.push_str(SGR_RESET);
        Cow::Owned(out)
    }
}

/// Renderer for an optional configured style
pub(crate) fn renderer_for(style: Option<&TextStyle>) -> Arc<dyn Renderer> {
    match style {
        Some(style) => Arc::new(StyledRenderer::new(style.clone())),
        None => Arc::new(PlainRenderer),
    }
}

const SGR_RESET: &str = "\x1b[0m";

/// ANSI color
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Color {
    /// Black - Color #0 (FG `30`, BG `40`).
    Black,
    /// Red - Color #1 (FG `31`, BG `41`).
    Red,
    /// Green - Color #2 (FG `32`, BG `42`).
    Green,
    /// Yellow - Color #3 (FG `33`, BG `43`).
    Yellow,
    /// Blue - Color #4 (FG `34`, BG `44`).
    Blue,
    /// Purple - Color #5 (FG `35`, BG `45`).
    Purple,
    /// Cyan - Color #6 (FG `36`, BG `46`).
    Cyan,
    /// White - Color #7 (FG `37`, BG `47`).
    White,
    /// A color number from the 256-color palette.
    Fixed(u8),
    /// A 24-bit RGB color.
    RGB(u8, u8, u8),
}

impl Color {
    fn write_sgr(&self, out: &mut String, base: u8) {
        let basic = match self {
            Color::Black => 0,
            Color::Red => 1,
            Color::Green => 2,
            Color::Yellow => 3,
            Color::Blue => 4,
            Color::Purple => 5,
            Color::Cyan => 6,
            Color::White => 7,
            Color::Fixed(n) => {
                let _ = write!(out, "{};5;{}", base + 8, n);
                return;
            }
            Color::RGB(r, g, b) => {
                let _ = write!(out, "{};2;{};{};{}", base + 8, r, g, b);
                return;
            }
        };
        let _ = write!(out, "{}", base + basic);
    }
}

/// Text style applied by [`StyledRenderer`]
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TextStyle {
    /// Bold intensity (`1`)
    pub bold: bool,
    /// Underline (`4`)
    pub underline: bool,
    /// Foreground color
    pub foreground: Option<Color>,
    /// Background color
    pub background: Option<Color>,
}

impl TextStyle {
    /// An empty style
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable bold
    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    /// Enable underline
    pub fn underline(mut self) -> Self {
        self.underline = true;
        self
    }

    /// Set the foreground color
    pub fn with_foreground(mut self, color: Color) -> Self {
        self.foreground = Some(color);
        self
    }

    /// Set the background color
    pub fn with_background(mut self, color: Color) -> Self {
        self.background = Some(color);
        self
    }

    /// The `CSI ... m` sequence selecting this style, or an empty string when
    /// nothing is set
    pub fn sgr_sequence(&self) -> String {
        let mut params = String::new();
        let separate = |params: &mut String| {
            if !params.is_empty() {
                params.push(';');
            }
        };
        if self.bold {
            separate(&mut params);
            params.push('1');
        }
        if self.underline {
            separate(&mut params);
            params.push('4');
        }
        if let Some(color) = self.foreground {
            separate(&mut params);
            color.write_sgr(&mut params, 30);
        }
        if let Some(color) = self.background {
            separate(&mut params);
            color.write_sgr(&mut params, 40);
        }
        if params.is_empty() {
            params
        } else {
            format!("\x1b[{params}m")
        }
    }
}
