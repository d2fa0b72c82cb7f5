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

use crate::WindowSize;

///
/// `TelnetEvent` is a decoded, user-facing event produced by [`TelnetParser`](crate::TelnetParser).
///
/// Negotiation replies and unknown commands never surface here; the parser
/// logs and drops them.
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TelnetEvent {
    /// A run of application data bytes, with `IAC IAC` already collapsed
    Data(Vec<u8>),
    /// The client reported its window size through NAWS
    WindowSize(WindowSize),
    /// The client reported its terminal type through TTYPE
    TerminalType(String),
}

///
/// Receiver for the events decoded by [`TelnetParser::feed`](crate::TelnetParser::feed).
///
/// Callbacks are invoked synchronously and in stream order.
///
pub trait TelnetEventSink {
    /// Application data
    fn on_data(&mut self, data: &[u8]);

    /// A clamped NAWS report
    fn on_window_size(&mut self, size: WindowSize);

    /// A TTYPE report, or the fallback name when the report was unusable
    fn on_terminal_type(&mut self, terminal_type: String);
}

impl TelnetEventSink for Vec<TelnetEvent> {
    fn on_data(&mut self, data: &[u8]) {
        self.push(TelnetEvent::Data(data.to_vec()));
    }

    fn on_window_size(&mut self, size: WindowSize) {
        self.push(TelnetEvent::WindowSize(size));
    }

    fn on_terminal_type(&mut self, terminal_type: String) {
        self.push(TelnetEvent::TerminalType(terminal_type));
    }
}

impl<S: TelnetEventSink + ?Sized> TelnetEventSink for &mut S {
    fn on_data(&mut self, data: &[u8]) {
        (**self).on_data(data);
    }

    fn on_window_size(&mut self, size: WindowSize) {
        (**self).on_window_size(size);
    }

    fn on_terminal_type(&mut self, terminal_type: String) {
        (**self).on_terminal_type(terminal_type);
    }
}
