// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

// Scan accumulation and the read/decode/dispatch loop
//
// The loop owns the scan buffer and the device reader. Completed barcodes and
// read errors go to a ScanHandler through separate methods, synchronously.

use crate::decoder::{decode_events, DecodedFragment};
use crate::error::Error;
use crate::reader::{ReadOutcome, RecordReader};
use std::io::Read;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use tracing::{debug, warn};

/// Buffer holding the barcode currently being typed
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanAccumulator {
    buffer: String,
}

impl ScanAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a decoded fragment.
    ///
    /// When the fragment ends the scan, the whole buffer is returned and the
    /// accumulator starts over empty.
    pub fn push(&mut self, fragment: DecodedFragment) -> Option<String> {
        self.buffer.push_str(&fragment.text);
        if fragment.complete {
            Some(std::mem::take(&mut self.buffer))
        } else {
            None
        }
    }

    /// Characters received since the last completed scan
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drop the unfinished scan, returning what had been collected
    pub fn discard(&mut self) -> String {
        std::mem::take(&mut self.buffer)
    }
}

/// Receiver of scan loop output
pub trait ScanHandler {
    /// Called once per terminator with the completed barcode
    fn on_scan(&mut self, barcode: String) -> ControlFlow<()>;

    /// Called for each failed read; the scan buffer is left as it was
    fn on_read_error(&mut self, error: &Error) -> ControlFlow<()>;
}

impl<H: ScanHandler + ?Sized> ScanHandler for &mut H {
    fn on_scan(&mut self, barcode: String) -> ControlFlow<()> {
        (**self).on_scan(barcode)
    }

    fn on_read_error(&mut self, error: &Error) -> ControlFlow<()> {
        (**self).on_read_error(error)
    }
}

/// [`ScanHandler`] built from a completion closure and an error closure
pub struct FnHandler<S, E> {
    on_scan: S,
    on_error: E,
}

/// Build a handler from two closures
///
/// The completion closure cannot stop the loop; the error closure decides
/// whether the loop continues after a failed read.
pub fn handler_fn<S, E>(on_scan: S, on_error: E) -> FnHandler<S, E>
where
    S: FnMut(String),
    E: FnMut(&Error) -> ControlFlow<()>,
{
    FnHandler { on_scan, on_error }
}

impl<S, E> ScanHandler for FnHandler<S, E>
where
    S: FnMut(String),
    E: FnMut(&Error) -> ControlFlow<()>,
{
    fn on_scan(&mut self, barcode: String) -> ControlFlow<()> {
        (self.on_scan)(barcode);
        ControlFlow::Continue(())
    }

    fn on_read_error(&mut self, error: &Error) -> ControlFlow<()> {
        (self.on_error)(error)
    }
}

/// Handler pushing completed barcodes onto a channel
///
/// Decouples the loop from slow consumers. The loop stops once the receiving
/// side is gone. Read errors are logged and tolerated.
pub struct ChannelHandler {
    tx: Sender<String>,
}

impl ChannelHandler {
    pub fn new(tx: Sender<String>) -> Self {
        Self { tx }
    }
}

impl ScanHandler for ChannelHandler {
    fn on_scan(&mut self, barcode: String) -> ControlFlow<()> {
        if self.tx.send(barcode).is_err() {
            debug!("Barcode receiver dropped, stopping scan loop");
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    }

    fn on_read_error(&mut self, error: &Error) -> ControlFlow<()> {
        warn!("{}", error);
        ControlFlow::Continue(())
    }
}

/// Cooperative stop signal for a [`ScanLoop`]
///
/// Checked before every read. A read that is already blocked finishes first.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Why a scan loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The stop handle was raised
    Stopped,
    /// The source returned zero bytes
    EndOfStream,
    /// A handler returned `ControlFlow::Break`
    HandlerStopped,
}

/// Outcome of [`ScanLoop::run`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopSummary {
    pub exit: LoopExit,
    /// Barcodes delivered to the handler
    pub scans: u64,
    /// Failed reads reported to the handler
    pub read_errors: u64,
    /// Unterminated input left in the buffer at end of stream
    pub discarded: String,
}

/// Blocking read/decode/dispatch loop over one device
pub struct ScanLoop<R, H> {
    reader: RecordReader<R>,
    handler: H,
    accumulator: ScanAccumulator,
    stop: StopHandle,
    scans: u64,
    read_errors: u64,
}

impl<R: Read, H: ScanHandler> ScanLoop<R, H> {
    pub fn new(reader: RecordReader<R>, handler: H) -> Self {
        Self {
            reader,
            handler,
            accumulator: ScanAccumulator::new(),
            stop: StopHandle::new(),
            scans: 0,
            read_errors: 0,
        }
    }

    /// Use an externally created stop handle
    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    pub fn accumulator(&self) -> &ScanAccumulator {
        &self.accumulator
    }

    /// Run one read/decode/dispatch iteration
    ///
    /// Returns `Some` when the loop should end.
    pub fn step(&mut self) -> Option<LoopExit> {
        if self.stop.is_stopped() {
            return Some(LoopExit::Stopped);
        }

        let events = match self.reader.read_batch() {
            Ok(ReadOutcome::Events(events)) => events,
            Ok(ReadOutcome::EndOfStream) => return Some(LoopExit::EndOfStream),
            Err(err) => {
                self.read_errors += 1;
                debug!(
                    pending = self.accumulator.pending().len(),
                    "Read failed, keeping scan buffer"
                );
                return match self.handler.on_read_error(&err) {
                    ControlFlow::Continue(()) => None,
                    ControlFlow::Break(()) => Some(LoopExit::HandlerStopped),
                };
            }
        };

        let fragment = decode_events(&events);
        if let Some(barcode) = self.accumulator.push(fragment) {
            self.scans += 1;
            debug!(barcode = %barcode, "Scan complete");
            if self.handler.on_scan(barcode).is_break() {
                return Some(LoopExit::HandlerStopped);
            }
        }

        None
    }

    /// Run until stopped, the source ends or a handler breaks
    pub fn run(&mut self) -> LoopSummary {
        let exit = loop {
            if let Some(exit) = self.step() {
                break exit;
            }
        };

        let discarded = if exit == LoopExit::EndOfStream {
            self.accumulator.discard()
        } else {
            String::new()
        };
        if !discarded.is_empty() {
            warn!(
                discarded = %discarded,
                "Input ended in the middle of a scan; dropping unterminated characters"
            );
        }

        debug!(
            ?exit,
            scans = self.scans,
            read_errors = self.read_errors,
            "Scan loop finished"
        );

        LoopSummary {
            exit,
            scans: self.scans,
            read_errors: self.read_errors,
            discarded,
        }
    }
}
