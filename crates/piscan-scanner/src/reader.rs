// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

// Record reader for input event devices
//
// Performs one bounded, blocking read per call and parses the bytes actually
// delivered into input event records.

use crate::error::{Error, Result};
use crate::event::{EventLayout, InputEvent};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Device opened when no path is configured
pub const DEFAULT_DEVICE: &str = "/dev/input/event0";

/// Records requested per read
pub const DEFAULT_CAPACITY: usize = 16;

/// Parsing options for a [`RecordReader`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Binary layout of the records on the wire
    pub layout: EventLayout,
    /// Maximum number of records fetched by a single read
    pub capacity: usize,
    /// Drop the first record with an all-zero timestamp and everything after it
    pub stop_at_zero_timestamp: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            layout: EventLayout::native(),
            capacity: DEFAULT_CAPACITY,
            stop_at_zero_timestamp: true,
        }
    }
}

impl ReaderConfig {
    /// Size in bytes of the read buffer
    pub fn buffer_len(&self) -> usize {
        self.layout.record_size() * self.capacity.max(1)
    }

    /// Same settings with reads limited to a single record
    pub fn one_record_per_read(self) -> Self {
        Self { capacity: 1, ..self }
    }
}

/// Result of one read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Records parsed from the bytes delivered, possibly none
    Events(Vec<InputEvent>),
    /// The source returned zero bytes
    EndOfStream,
}

/// Reads batches of input event records from a byte source
pub struct RecordReader<R> {
    source: R,
    config: ReaderConfig,
    buf: Vec<u8>,
}

impl RecordReader<File> {
    /// Open an input device for reading
    pub fn open<P: AsRef<Path>>(path: P, config: ReaderConfig) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let is_capture = file.metadata().map(|m| m.is_file()).map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })?;

        // A device read returns only the events queued so far; a file read
        // fills the whole buffer, which would put the next scan behind Enter
        let config = if is_capture {
            debug!("Opened capture file {}, reading one record at a time", path.display());
            config.one_record_per_read()
        } else {
            debug!("Opened input device {}", path.display());
            config
        };
        Ok(Self::new(file, config))
    }

    /// Open an input device and grab it, so its keystrokes stop reaching
    /// other readers such as the console
    pub fn open_exclusive<P: AsRef<Path>>(path: P, config: ReaderConfig) -> Result<Self> {
        let path = path.as_ref();
        let reader = Self::open(path, config)?;
        grab_device(&reader.source).map_err(|source| Error::Grab {
            path: PathBuf::from(path),
            source,
        })?;
        debug!("Grabbed input device {}", path.display());
        Ok(reader)
    }
}

impl<R: Read> RecordReader<R> {
    pub fn new(source: R, config: ReaderConfig) -> Self {
        let buf = vec![0u8; config.buffer_len()];
        Self {
            source,
            config,
            buf,
        }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Perform one blocking read and parse the delivered bytes
    ///
    /// Interrupted reads are retried. Any other I/O failure is returned as
    /// [`Error::Read`]; the reader stays usable afterwards.
    pub fn read_batch(&mut self) -> Result<ReadOutcome> {
        let n = loop {
            match self.source.read(&mut self.buf) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Read(e)),
            }
        };

        if n == 0 {
            return Ok(ReadOutcome::EndOfStream);
        }

        Ok(ReadOutcome::Events(parse_records(
            &self.buf[..n],
            self.config.layout,
            self.config.stop_at_zero_timestamp,
        )))
    }
}

/// Parse a byte slice into records
///
/// Bytes after the last complete record are discarded. With
/// `stop_at_zero_timestamp`, parsing ends at the first record whose timestamp is
/// all-zero; the kernel stamps every real event, so such a record is buffer
/// padding.
pub fn parse_records(
    bytes: &[u8],
    layout: EventLayout,
    stop_at_zero_timestamp: bool,
) -> Vec<InputEvent> {
    let size = layout.record_size();
    let mut events = Vec::with_capacity(bytes.len() / size);
    let mut chunks = bytes.chunks_exact(size);

    for chunk in &mut chunks {
        let Ok(event) = InputEvent::read_from(chunk, layout) else {
            break;
        };
        if stop_at_zero_timestamp && event.time.is_zero() {
            trace!(kept = events.len(), "Truncating batch at zero-timestamp record");
            return events;
        }
        events.push(event);
    }

    let tail = chunks.remainder().len();
    if tail > 0 {
        trace!(tail, "Dropping incomplete trailing record bytes");
    }

    events
}

#[cfg(target_os = "linux")]
fn grab_device(file: &File) -> io::Result<()> {
    use std::os::fd::AsRawFd;

    // _IOW('E', 0x90, int)
    const EVIOCGRAB: u32 = 0x4004_4590;

    // SAFETY: the fd is open for the lifetime of `file` and EVIOCGRAB takes an int by value.
    let result = unsafe { libc::ioctl(file.as_raw_fd(), EVIOCGRAB as _, 1 as libc::c_int) };
    if result < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn grab_device(_file: &File) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "exclusive grab requires a Linux evdev device",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventTime, KEY_PRESS, KEY_RELEASE};
    use std::io::Cursor;

    fn t(sec: i64) -> EventTime {
        EventTime::new(sec, 0)
    }

    #[test]
    fn test_parse_complete_records() {
        let events = vec![
            InputEvent::key(t(1), 2, KEY_PRESS),
            InputEvent::key(t(1), 2, KEY_RELEASE),
            InputEvent::syn(t(1)),
        ];
        let bytes = InputEvent::encode_all(&events, EventLayout::Wide);
        assert_eq!(parse_records(&bytes, EventLayout::Wide, true), events);
    }

    #[test]
    fn test_parse_drops_partial_tail() {
        let events = vec![InputEvent::key(t(1), 2, KEY_PRESS)];
        let mut bytes = InputEvent::encode_all(&events, EventLayout::Compact);
        bytes.extend_from_slice(&[0xAA; 7]);

        let parsed = parse_records(&bytes, EventLayout::Compact, true);
        assert_eq!(parsed, events);
    }

    #[test]
    fn test_parse_truncates_at_zero_timestamp() {
        let events = vec![
            InputEvent::key(t(5), 2, KEY_PRESS),
            InputEvent::key(EventTime::ZERO, 3, KEY_PRESS),
            InputEvent::key(t(5), 4, KEY_PRESS),
        ];
        let bytes = InputEvent::encode_all(&events, EventLayout::Wide);

        let parsed = parse_records(&bytes, EventLayout::Wide, true);
        assert_eq!(parsed, events[..1].to_vec());

        let untruncated = parse_records(&bytes, EventLayout::Wide, false);
        assert_eq!(untruncated, events);
    }

    #[test]
    fn test_parse_fewer_bytes_than_one_record() {
        let parsed = parse_records(&[1, 2, 3], EventLayout::Wide, true);
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_read_batch_and_end_of_stream() {
        let events = vec![
            InputEvent::key(t(1), 0x1e, KEY_PRESS),
            InputEvent::key(t(1), 0x1e, KEY_RELEASE),
        ];
        let bytes = InputEvent::encode_all(&events, EventLayout::Wide);
        let mut reader = RecordReader::new(Cursor::new(bytes), ReaderConfig {
            layout: EventLayout::Wide,
            ..ReaderConfig::default()
        });

        assert_eq!(reader.read_batch().unwrap(), ReadOutcome::Events(events));
        assert_eq!(reader.read_batch().unwrap(), ReadOutcome::EndOfStream);
    }

    #[test]
    fn test_read_is_bounded_by_capacity() {
        let events: Vec<_> = (0..5).map(|i| InputEvent::key(t(1), 2 + i, KEY_PRESS)).collect();
        let bytes = InputEvent::encode_all(&events, EventLayout::Wide);
        let config = ReaderConfig {
            layout: EventLayout::Wide,
            capacity: 2,
            stop_at_zero_timestamp: true,
        };
        let mut reader = RecordReader::new(Cursor::new(bytes), config);

        let mut seen = Vec::new();
        while let ReadOutcome::Events(batch) = reader.read_batch().unwrap() {
            assert!(batch.len() <= 2);
            seen.extend(batch);
        }
        assert_eq!(seen, events);
    }

    #[test]
    fn test_open_missing_device_is_startup_error() {
        let err = RecordReader::open("/nonexistent/input/event99", ReaderConfig::default())
            .err()
            .unwrap();
        assert!(err.is_startup());
        assert!(matches!(err, Error::Open { .. }));
    }

    #[test]
    fn test_capture_file_is_read_one_record_at_a_time() {
        use std::io::Write;

        let events: Vec<_> = (0..3).map(|i| InputEvent::key(t(1), 2 + i, KEY_PRESS)).collect();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&InputEvent::encode_all(&events, EventLayout::native()))
            .unwrap();
        file.flush().unwrap();

        let mut reader = RecordReader::open(file.path(), ReaderConfig::default()).unwrap();
        assert_eq!(reader.config().capacity, 1);
        assert_eq!(reader.config().buffer_len(), EventLayout::native().record_size());

        for event in &events {
            assert_eq!(reader.read_batch().unwrap(), ReadOutcome::Events(vec![*event]));
        }
        assert_eq!(reader.read_batch().unwrap(), ReadOutcome::EndOfStream);
    }

    #[test]
    fn test_default_config() {
        let config = ReaderConfig::default();
        assert_eq!(config.capacity, DEFAULT_CAPACITY);
        assert!(config.stop_at_zero_timestamp);
        assert_eq!(config.buffer_len(), config.layout.record_size() * 16);
    }
}
