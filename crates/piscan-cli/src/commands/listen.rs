// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! `piscan listen`: read barcodes from a scanner device

use super::print_barcode;
use crate::config::ScannerConfig;
use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use piscan_local_db::ScanStore;
use piscan_scanner::{scan_device, Error, LoopSummary, ReaderConfig, ScanHandler, StopHandle};
use std::io::{self, Write};
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{error, info, warn};

/// Delay after the first of a run of failed reads
const BACKOFF_START: Duration = Duration::from_millis(100);

/// Longest delay between retries of a failing device
const BACKOFF_MAX: Duration = Duration::from_secs(5);

/// How often the main thread checks on the listener thread
const WORKER_POLL: Duration = Duration::from_millis(200);

#[derive(Args, Debug, Clone, Default)]
#[command(about = "Listen to a barcode scanner and record every scan")]
pub struct ListenArgs {
    /// Input event device of the scanner
    #[arg(long, env = "PISCAN_DEVICE", help = "Scanner device (default: /dev/input/event0)")]
    pub device: Option<PathBuf>,

    /// Take exclusive access so scans do not reach other applications
    #[arg(long, help = "Grab the device exclusively")]
    pub grab: bool,

    /// SQLite database receiving the scans
    #[arg(long, env = "PISCAN_DB", help = "Scan database path")]
    pub db: Option<PathBuf>,

    /// Do not record scans; wins over --db and PISCAN_DB
    #[arg(long, help = "Print scans without recording them")]
    pub no_store: bool,

    /// Keep listening after a failed read, retrying with a growing delay
    #[arg(long, help = "Retry failed reads instead of exiting")]
    pub tolerate_read_errors: bool,
}

/// Listener settings after merging flags, environment and config file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenSettings {
    pub device: PathBuf,
    pub reader: ReaderConfig,
    pub grab: bool,
    pub db: Option<PathBuf>,
    pub stop_on_read_error: bool,
}

impl ListenArgs {
    pub fn settings(&self, config: &ScannerConfig) -> Result<ListenSettings> {
        let db = if self.no_store {
            None
        } else {
            match &self.db {
                Some(path) => Some(path.clone()),
                None => Some(config.db_path_or_default()?),
            }
        };

        let stop_on_read_error =
            !self.tolerate_read_errors && config.stop_on_read_error.unwrap_or(true);

        Ok(ListenSettings {
            device: self.device.clone().unwrap_or_else(|| config.device_or_default()),
            reader: config.reader_config(),
            grab: self.grab || config.grab.unwrap_or(false),
            db,
            stop_on_read_error,
        })
    }

    /// Listen until Ctrl-C, end of input or a fatal read error
    pub fn run(self, config: &ScannerConfig) -> Result<()> {
        let settings = self.settings(config)?;
        let stop = StopHandle::new();

        let (tx, rx) = mpsc::channel();
        let interrupt_tx = tx.clone();
        let interrupt_stop = stop.clone();
        ctrlc::set_handler(move || {
            interrupt_stop.stop();
            let _ = interrupt_tx.send(ListenEvent::Interrupted);
        })
        .context("Failed to install Ctrl-C handler")?;

        // A blocking device read only returns on the next key event, so the
        // loop runs on its own thread and Ctrl-C ends the command right away.
        let worker = thread::Builder::new()
            .name("piscan-listen".to_string())
            .spawn(move || {
                let stdout = io::stdout();
                let mut out = stdout.lock();
                let result = listen(&settings, stop, &mut out);
                let _ = tx.send(ListenEvent::Finished(result));
            })
            .context("Failed to start listener thread")?;

        wait_for_listener(&rx, worker)
    }
}

pub(crate) enum ListenEvent {
    Interrupted,
    Finished(Result<LoopSummary>),
}

/// Block until the listener reports, is interrupted or dies
pub(crate) fn wait_for_listener(rx: &Receiver<ListenEvent>, worker: JoinHandle<()>) -> Result<()> {
    let mut worker = Some(worker);
    loop {
        match rx.recv_timeout(WORKER_POLL) {
            Ok(ListenEvent::Interrupted) => {
                info!("Interrupted, stopping listener");
                return Ok(());
            }
            Ok(ListenEvent::Finished(result)) => {
                let summary = result?;
                info!(
                    exit = ?summary.exit,
                    scans = summary.scans,
                    read_errors = summary.read_errors,
                    "Listener finished"
                );
                return Ok(());
            }
            Err(RecvTimeoutError::Timeout) => {
                // A worker that finished normally has already queued its result
                if worker.as_ref().is_some_and(|w| w.is_finished()) {
                    if let Some(handle) = worker.take() {
                        if handle.join().is_err() {
                            bail!("Listener thread panicked");
                        }
                    }
                }
            }
            Err(RecvTimeoutError::Disconnected) => bail!("Listener thread exited unexpectedly"),
        }
    }
}

/// Retry delay and log throttling for a run of failed reads
#[derive(Debug, Default)]
pub(crate) struct ReadErrorBackoff {
    consecutive: u32,
}

impl ReadErrorBackoff {
    pub(crate) fn reset(&mut self) {
        self.consecutive = 0;
    }

    /// Count a failure and return the delay before the next read
    pub(crate) fn failed(&mut self) -> Duration {
        self.consecutive = self.consecutive.saturating_add(1);
        let doublings = (self.consecutive - 1).min(16);
        BACKOFF_START.saturating_mul(1 << doublings).min(BACKOFF_MAX)
    }

    /// Log the 1st, 2nd, 4th, 8th... failure of a run
    pub(crate) fn should_log(&self) -> bool {
        self.consecutive.is_power_of_two()
    }
}

/// Prints, logs and records scans; applies the read error policy
struct ListenHandler<'a, W> {
    out: &'a mut W,
    store: Option<ScanStore>,
    stop_on_read_error: bool,
    backoff: ReadErrorBackoff,
    fatal: Option<String>,
}

impl<W: Write> ScanHandler for ListenHandler<'_, W> {
    fn on_scan(&mut self, barcode: String) -> ControlFlow<()> {
        self.backoff.reset();
        info!(barcode = %barcode, "Scan received");
        print_barcode(&mut *self.out, &barcode);
        if let Some(store) = &self.store {
            if let Err(err) = store.record(&barcode) {
                warn!("Failed to record scan {}: {}", barcode, err);
            }
        }
        ControlFlow::Continue(())
    }

    fn on_read_error(&mut self, err: &Error) -> ControlFlow<()> {
        if self.stop_on_read_error {
            error!("{}", err);
            self.fatal = Some(err.to_string());
            return ControlFlow::Break(());
        }

        let delay = self.backoff.failed();
        if self.backoff.should_log() {
            warn!(
                consecutive = self.backoff.consecutive,
                retry_in_ms = delay.as_millis() as u64,
                "{}",
                err
            );
        }
        thread::sleep(delay);
        ControlFlow::Continue(())
    }
}

/// Run the scan loop on the configured device
///
/// Each completed barcode is logged, printed to `out` and, when a database is
/// configured, recorded. A failed insert is logged and does not stop the loop.
pub fn listen<W: Write>(
    settings: &ListenSettings,
    stop: StopHandle,
    out: &mut W,
) -> Result<LoopSummary> {
    let store = match &settings.db {
        Some(path) => Some(
            ScanStore::open(path)
                .with_context(|| format!("Failed to open scan database {}", path.display()))?,
        ),
        None => None,
    };

    let mut handler = ListenHandler {
        out,
        store,
        stop_on_read_error: settings.stop_on_read_error,
        backoff: ReadErrorBackoff::default(),
        fatal: None,
    };

    let summary = scan_device(&settings.device, settings.reader, settings.grab, &mut handler, stop)
        .context("Failed to start listening")?;

    match handler.fatal {
        Some(err) => Err(anyhow!(err).context(format!(
            "Stopped listening on {}",
            settings.device.display()
        ))),
        None => Ok(summary),
    }
}
