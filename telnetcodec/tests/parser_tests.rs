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

//! Stream-level tests for the Telnet parser

use proptest::prelude::*;
use termgate_telnetcodec::consts::{self, IAC, SB, SE, option};
use termgate_telnetcodec::{ParserState, TelnetEvent, TelnetParser, WindowSize};

// ============================================================================
// Helper Functions
// ============================================================================

fn feed_chunks(chunks: &[&[u8]]) -> Vec<TelnetEvent> {
    let mut parser = TelnetParser::new();
    let mut events = Vec::new();
    for chunk in chunks {
        parser.feed(chunk, &mut events);
    }
    events
}

/// Joins adjacent data runs so streams chunked differently compare equal.
fn coalesce(events: Vec<TelnetEvent>) -> Vec<TelnetEvent> {
    let mut merged: Vec<TelnetEvent> = Vec::new();
    for event in events {
        match (merged.last_mut(), event) {
            (Some(TelnetEvent::Data(tail)), TelnetEvent::Data(more)) => tail.extend(more),
            (_, event) => merged.push(event),
        }
    }
    merged
}

fn naws(cols: u16, rows: u16) -> Vec<u8> {
    let mut bytes = vec![IAC, SB, option::NAWS];
    for byte in cols.to_be_bytes().into_iter().chain(rows.to_be_bytes()) {
        bytes.push(byte);
        if byte == IAC {
            bytes.push(IAC);
        }
    }
    bytes.extend_from_slice(&[IAC, SE]);
    bytes
}

fn ttype(name: &str) -> Vec<u8> {
    let mut bytes = vec![IAC, SB, option::TTYPE, consts::ttype::IS];
    bytes.extend_from_slice(name.as_bytes());
    bytes.extend_from_slice(&[IAC, SE]);
    bytes
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn naws_80_by_24_produces_single_event() {
    let events = feed_chunks(&[&[IAC, SB, option::NAWS, 0, 80, 0, 24, IAC, SE]]);
    assert_eq!(events, vec![TelnetEvent::WindowSize(WindowSize::new(80, 24))]);
}

#[test]
fn naws_clamps_zero_and_huge_values() {
    let events = feed_chunks(&[&naws(0, 9999)]);
    assert_eq!(events, vec![TelnetEvent::WindowSize(WindowSize::new(1, 500))]);
}

#[test]
fn typical_client_handshake() {
    let mut stream = vec![
        IAC, consts::WILL, option::NAWS,
        IAC, consts::WILL, option::TTYPE,
        IAC, consts::DO, option::ECHO,
        IAC, consts::DO, option::SGA,
        IAC, consts::WONT, option::LINEMODE,
    ];
    stream.extend(naws(120, 40));
    stream.extend(ttype("xterm"));
    stream.extend_from_slice(b"login\r\n");

    let events = feed_chunks(&[&stream]);
    assert_eq!(
        events,
        vec![
            TelnetEvent::WindowSize(WindowSize::new(120, 40)),
            TelnetEvent::TerminalType("xterm".to_string()),
            TelnetEvent::Data(b"login\r\n".to_vec()),
        ]
    );
}

#[test]
fn byte_at_a_time_delivery() {
    let mut stream = b"ab".to_vec();
    stream.extend(naws(100, 30));
    stream.extend_from_slice(&[IAC, IAC, b'c']);
    let chunks: Vec<&[u8]> = stream.chunks(1).collect();

    let events = coalesce(feed_chunks(&chunks));
    assert_eq!(
        events,
        vec![
            TelnetEvent::Data(b"ab".to_vec()),
            TelnetEvent::WindowSize(WindowSize::new(100, 30)),
            TelnetEvent::Data(vec![0xFF, b'c']),
        ]
    );
}

#[test]
fn iac_inside_subnegotiation_not_followed_by_se_is_literal() {
    let events = feed_chunks(&[&[IAC, SB, option::NAWS, 0, 80, IAC, 7, 0, IAC, SE]]);
    // payload is 0, 80, 7, 0 once the lone IAC is dropped
    assert_eq!(events, vec![TelnetEvent::WindowSize(WindowSize::new(80, 500))]);
}

#[test]
fn parser_returns_to_normal_after_oversized_payload() {
    let mut parser = TelnetParser::new();
    let mut events = Vec::new();
    let mut stream = vec![IAC, SB, option::TTYPE, consts::ttype::IS];
    stream.extend(std::iter::repeat_n(b'v', consts::MAX_SUBNEGOTIATION_LENGTH * 2));
    stream.extend_from_slice(&[IAC, SE]);
    parser.feed(&stream, &mut events);

    assert_eq!(parser.state(), ParserState::Normal);
    match events.as_slice() {
        [TelnetEvent::TerminalType(name)] => {
            assert_eq!(name.len(), consts::MAX_SUBNEGOTIATION_LENGTH - 2);
        }
        other => panic!("unexpected events {other:?}"),
    }
}

// ============================================================================
// Fragmentation Properties
// ============================================================================

fn token() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        proptest::collection::vec(0u8..=254, 1..16),
        Just(vec![IAC, IAC]),
        (251u8..=254, any::<u8>()).prop_map(|(verb, opt)| vec![IAC, verb, opt]),
        Just(vec![IAC, consts::NOP]),
        (any::<u16>(), any::<u16>()).prop_map(|(c, r)| naws(c, r)),
        "[a-zA-Z0-9-]{0,12}".prop_map(|name| ttype(&name)),
        proptest::collection::vec(0u8..=254, 0..8).prop_map(|payload| {
            let mut bytes = vec![IAC, SB, 200];
            bytes.extend(payload);
            bytes.extend_from_slice(&[IAC, SE]);
            bytes
        }),
    ]
}

fn stream_and_cuts() -> impl Strategy<Value = (Vec<u8>, Vec<usize>)> {
    proptest::collection::vec(token(), 0..12)
        .prop_map(|tokens| tokens.concat())
        .prop_flat_map(|stream| {
            let len = stream.len();
            (
                Just(stream),
                proptest::collection::vec(0..=len, 0..8),
            )
        })
}

proptest! {
    #[test]
    fn chunking_never_changes_events((stream, mut cuts) in stream_and_cuts()) {
        cuts.sort_unstable();
        let mut chunks: Vec<&[u8]> = Vec::new();
        let mut start = 0;
        for cut in cuts {
            chunks.push(&stream[start..cut]);
            start = cut;
        }
        chunks.push(&stream[start..]);

        let whole = coalesce(feed_chunks(&[&stream]));
        let split = coalesce(feed_chunks(&chunks));
        prop_assert_eq!(whole, split);
    }

    #[test]
    fn window_sizes_always_within_bounds(cols in any::<u16>(), rows in any::<u16>()) {
        let events = feed_chunks(&[&naws(cols, rows)]);
        prop_assert_eq!(events.len(), 1);
        if let TelnetEvent::WindowSize(size) = &events[0] {
            prop_assert!((1..=500).contains(&size.cols));
            prop_assert!((1..=500).contains(&size.rows));
        } else {
            prop_assert!(false, "expected a window size event");
        }
    }
}
