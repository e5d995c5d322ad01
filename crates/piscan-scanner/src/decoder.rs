// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Turns batches of input events into barcode text.

use crate::event::InputEvent;
use crate::keycodes::{self, KEY_ENTER, KEY_RESERVED};

/// Text decoded from one batch of events
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedFragment {
    /// Characters typed in the batch, up to the terminator if there was one
    pub text: String,
    /// Whether the batch contained the terminator that ends a scan
    pub complete: bool,
}

impl DecodedFragment {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && !self.complete
    }
}

/// Decode a batch of events in order.
///
/// Only fresh key presses count. Enter ends the scan and nothing after it in
/// the batch is looked at; the reserved code 0 is skipped; every other code
/// goes through the keycode table.
pub fn decode_events(events: &[InputEvent]) -> DecodedFragment {
    let mut text = String::new();

    for event in events.iter().filter(|e| e.is_key_press()) {
        match event.code {
            KEY_ENTER => return DecodedFragment { text, complete: true },
            KEY_RESERVED => continue,
            code => text.push(keycodes::lookup(code)),
        }
    }

    DecodedFragment {
        text,
        complete: false,
    }
}
