// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Barcode scanner decoder for Linux input event devices
//!
//! USB barcode scanners usually present themselves as keyboards: every
//! character of a barcode arrives as a key press/release pair on a
//! `/dev/input/eventN` node, followed by Enter. This crate reads those raw
//! `struct input_event` records and reassembles the barcodes.
//!
//! ```text
//! device ─► RecordReader ─► [InputEvent] ─► decode_events ─► DecodedFragment
//!                                                               │
//!                                     ScanHandler ◄── ScanAccumulator
//! ```
//!
//! # Example
//! ```no_run
//! use piscan_scanner::{handler_fn, scan_device, ReaderConfig, StopHandle};
//! use std::ops::ControlFlow;
//!
//! fn main() -> piscan_scanner::Result<()> {
//!     let handler = handler_fn(
//!         |barcode| println!("barcode: {barcode}"),
//!         |err| {
//!             eprintln!("{err}");
//!             ControlFlow::Continue(())
//!         },
//!     );
//!     scan_device("/dev/input/event0", ReaderConfig::default(), false, handler, StopHandle::new())?;
//!     Ok(())
//! }
//! ```

pub mod accumulator;
pub mod decoder;
pub mod error;
pub mod event;
pub mod keycodes;
pub mod reader;

pub use accumulator::{
    handler_fn, ChannelHandler, FnHandler, LoopExit, LoopSummary, ScanAccumulator, ScanHandler,
    ScanLoop, StopHandle,
};
pub use decoder::{decode_events, DecodedFragment};
pub use error::{Error, Result};
pub use event::{EventLayout, EventTime, InputEvent, EV_KEY, EV_SYN, KEY_PRESS, KEY_RELEASE, KEY_REPEAT};
pub use reader::{parse_records, ReadOutcome, ReaderConfig, RecordReader, DEFAULT_CAPACITY, DEFAULT_DEVICE};

use std::path::Path;
use tracing::info;

/// Open a scanner device and run the scan loop on it
///
/// Failing to open (or, with `exclusive`, to grab) the device is returned
/// before any event is read. Once running, the loop only returns when `stop`
/// is raised, the handler breaks, or the device stops producing data.
pub fn scan_device<P, H>(
    path: P,
    config: ReaderConfig,
    exclusive: bool,
    handler: H,
    stop: StopHandle,
) -> Result<LoopSummary>
where
    P: AsRef<Path>,
    H: ScanHandler,
{
    let path = path.as_ref();
    let reader = if exclusive {
        RecordReader::open_exclusive(path, config)?
    } else {
        RecordReader::open(path, config)?
    };

    info!(
        device = %path.display(),
        layout = %config.layout,
        exclusive,
        "Listening for scans"
    );

    let mut scan_loop = ScanLoop::new(reader, handler).with_stop_handle(stop);
    Ok(scan_loop.run())
}
