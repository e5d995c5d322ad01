// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

// Wire format of Linux input events (`struct input_event`)
//
// See: include/uapi/linux/input.h
// Layout: struct timeval, then type (u16), code (u16), value (s32), host byte order.
// The timeval fields are `long`-sized, so the record is 24 bytes on 64-bit
// targets and 16 bytes on 32-bit ones.

use byteorder::{NativeEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Read, Write};
use std::str::FromStr;

/// Synchronization event type
pub const EV_SYN: u16 = 0x00;
/// Key event type
pub const EV_KEY: u16 = 0x01;

/// Key event values
pub const KEY_RELEASE: i32 = 0;
pub const KEY_PRESS: i32 = 1;
pub const KEY_REPEAT: i32 = 2;

/// Size in bytes of one record in the wide (64-bit) layout
pub const WIDE_RECORD_SIZE: usize = 24;
/// Size in bytes of one record in the compact (32-bit) layout
pub const COMPACT_RECORD_SIZE: usize = 16;

/// Binary layout of `struct input_event` on a given kernel ABI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLayout {
    /// 64-bit `tv_sec`/`tv_usec` (x86_64, aarch64, ...)
    Wide,
    /// 32-bit `tv_sec`/`tv_usec` (armv7, i686, ...)
    Compact,
}

impl EventLayout {
    /// Layout used by the kernel this binary was built for
    pub const fn native() -> Self {
        if cfg!(target_pointer_width = "64") {
            EventLayout::Wide
        } else {
            EventLayout::Compact
        }
    }

    /// Size of one record in bytes, padding included
    pub const fn record_size(self) -> usize {
        match self {
            EventLayout::Wide => WIDE_RECORD_SIZE,
            EventLayout::Compact => COMPACT_RECORD_SIZE,
        }
    }
}

impl Default for EventLayout {
    fn default() -> Self {
        Self::native()
    }
}

impl fmt::Display for EventLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventLayout::Wide => write!(f, "wide"),
            EventLayout::Compact => write!(f, "compact"),
        }
    }
}

impl FromStr for EventLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "wide" | "64" => Ok(EventLayout::Wide),
            "compact" | "32" => Ok(EventLayout::Compact),
            "native" => Ok(EventLayout::native()),
            _ => Err(format!(
                "Invalid event layout: {}. Use 'wide', 'compact' or 'native'",
                s
            )),
        }
    }
}

/// Kernel timestamp of an event (`struct timeval`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventTime {
    pub sec: i64,
    pub usec: i64,
}

impl EventTime {
    pub const ZERO: EventTime = EventTime { sec: 0, usec: 0 };

    pub fn new(sec: i64, usec: i64) -> Self {
        Self { sec, usec }
    }

    /// True when both fields are zero, which marks unfilled buffer space
    /// rather than a kernel-generated event
    pub fn is_zero(&self) -> bool {
        self.sec == 0 && self.usec == 0
    }
}

/// A single input event record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub time: EventTime,
    pub event_type: u16,
    pub code: u16,
    pub value: i32,
}

impl InputEvent {
    pub fn new(time: EventTime, event_type: u16, code: u16, value: i32) -> Self {
        Self {
            time,
            event_type,
            code,
            value,
        }
    }

    /// Key event with the given code and value
    pub fn key(time: EventTime, code: u16, value: i32) -> Self {
        Self::new(time, EV_KEY, code, value)
    }

    /// `SYN_REPORT` marker closing an event frame
    pub fn syn(time: EventTime) -> Self {
        Self::new(time, EV_SYN, 0, 0)
    }

    /// True for a fresh key press (not a release or auto-repeat)
    pub fn is_key_press(&self) -> bool {
        self.event_type == EV_KEY && self.value == KEY_PRESS
    }

    /// Write the record in the given layout
    pub fn write_to<W: Write>(&self, mut w: W, layout: EventLayout) -> io::Result<()> {
        match layout {
            EventLayout::Wide => {
                w.write_i64::<NativeEndian>(self.time.sec)?;
                w.write_i64::<NativeEndian>(self.time.usec)?;
            }
            EventLayout::Compact => {
                w.write_i32::<NativeEndian>(self.time.sec as i32)?;
                w.write_i32::<NativeEndian>(self.time.usec as i32)?;
            }
        }
        w.write_u16::<NativeEndian>(self.event_type)?;
        w.write_u16::<NativeEndian>(self.code)?;
        w.write_i32::<NativeEndian>(self.value)?;
        Ok(())
    }

    /// Read one record in the given layout
    pub fn read_from<R: Read>(mut r: R, layout: EventLayout) -> io::Result<Self> {
        let time = match layout {
            EventLayout::Wide => {
                let sec = r.read_i64::<NativeEndian>()?;
                let usec = r.read_i64::<NativeEndian>()?;
                EventTime { sec, usec }
            }
            EventLayout::Compact => {
                let sec = r.read_i32::<NativeEndian>()? as i64;
                let usec = r.read_i32::<NativeEndian>()? as i64;
                EventTime { sec, usec }
            }
        };
        let event_type = r.read_u16::<NativeEndian>()?;
        let code = r.read_u16::<NativeEndian>()?;
        let value = r.read_i32::<NativeEndian>()?;

        Ok(Self {
            time,
            event_type,
            code,
            value,
        })
    }

    /// Encode a sequence of records into one contiguous buffer
    pub fn encode_all(events: &[InputEvent], layout: EventLayout) -> Vec<u8> {
        let mut buf = Vec::with_capacity(events.len() * layout.record_size());
        for event in events {
            // Writing into a Vec cannot fail
            let _ = event.write_to(&mut buf, layout);
        }
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_record_sizes() {
        let ev = InputEvent::key(EventTime::new(1, 2), 30, KEY_PRESS);

        let mut wide = Vec::new();
        ev.write_to(&mut wide, EventLayout::Wide).unwrap();
        assert_eq!(wide.len(), WIDE_RECORD_SIZE);

        let mut compact = Vec::new();
        ev.write_to(&mut compact, EventLayout::Compact).unwrap();
        assert_eq!(compact.len(), COMPACT_RECORD_SIZE);
    }

    #[test]
    fn test_wide_field_offsets() {
        // Hand-built record: the decoder must not depend on in-memory struct layout
        let mut raw = Vec::new();
        raw.extend_from_slice(&1_700_000_000i64.to_ne_bytes());
        raw.extend_from_slice(&250_000i64.to_ne_bytes());
        raw.extend_from_slice(&EV_KEY.to_ne_bytes());
        raw.extend_from_slice(&0x1eu16.to_ne_bytes());
        raw.extend_from_slice(&KEY_PRESS.to_ne_bytes());

        let ev = InputEvent::read_from(Cursor::new(raw), EventLayout::Wide).unwrap();
        assert_eq!(ev.time, EventTime::new(1_700_000_000, 250_000));
        assert_eq!(ev.event_type, EV_KEY);
        assert_eq!(ev.code, 0x1e);
        assert_eq!(ev.value, KEY_PRESS);
    }

    #[test]
    fn test_compact_field_offsets() {
        let mut raw = Vec::new();
        raw.extend_from_slice(&42i32.to_ne_bytes());
        raw.extend_from_slice(&7i32.to_ne_bytes());
        raw.extend_from_slice(&EV_KEY.to_ne_bytes());
        raw.extend_from_slice(&28u16.to_ne_bytes());
        raw.extend_from_slice(&KEY_RELEASE.to_ne_bytes());

        let ev = InputEvent::read_from(Cursor::new(raw), EventLayout::Compact).unwrap();
        assert_eq!(ev.time, EventTime::new(42, 7));
        assert_eq!(ev.code, 28);
        assert_eq!(ev.value, KEY_RELEASE);
    }

    #[test]
    fn test_short_input_is_unexpected_eof() {
        let raw = vec![0u8; WIDE_RECORD_SIZE - 1];
        let err = InputEvent::read_from(Cursor::new(raw), EventLayout::Wide).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_is_key_press() {
        let t = EventTime::new(1, 0);
        assert!(InputEvent::key(t, 2, KEY_PRESS).is_key_press());
        assert!(!InputEvent::key(t, 2, KEY_RELEASE).is_key_press());
        assert!(!InputEvent::key(t, 2, KEY_REPEAT).is_key_press());
        assert!(!InputEvent::new(t, EV_SYN, 2, KEY_PRESS).is_key_press());
    }

    #[test]
    fn test_layout_from_str() {
        assert_eq!("wide".parse::<EventLayout>().unwrap(), EventLayout::Wide);
        assert_eq!("Compact".parse::<EventLayout>().unwrap(), EventLayout::Compact);
        assert_eq!("native".parse::<EventLayout>().unwrap(), EventLayout::native());
        assert!("big".parse::<EventLayout>().is_err());
        assert_eq!(EventLayout::Compact.to_string(), "compact");
    }

    #[test]
    fn test_zero_time() {
        assert!(EventTime::ZERO.is_zero());
        assert!(!EventTime::new(0, 1).is_zero());
        assert!(!EventTime::new(1, 0).is_zero());
    }
}
