//! Raw reads against a named Windows event log.
//!
//! Records are copied into an owned byte buffer and exposed verbatim; the
//! binary record layout (ids, timestamps, strings, SIDs) is not decoded.

use std::io::{self, Write};

use log::debug;

use crate::error::EventLogError;
use crate::sys::{EventLogApi, RawLogHandle};

pub const EVENTLOG_SEQUENTIAL_READ: u32 = 0x0001;
pub const EVENTLOG_SEEK_READ: u32 = 0x0002;
pub const EVENTLOG_FORWARDS_READ: u32 = 0x0004;
pub const EVENTLOG_BACKWARDS_READ: u32 = 0x0008;

/// Hard upper bound on the read buffer size.
pub const MAX_BUFFER_SIZE: u32 = 0x7ffff;
/// Buffer size configured on a freshly opened log.
pub const MAX_DEFAULT_BUFFER_SIZE: u32 = 0x10000;

/// An open connection to a named event log.
///
/// Exclusively owns its native handle and read buffer; the buffer length is
/// always `buffer_size + 1` and `buffer_size` never exceeds
/// [`MAX_BUFFER_SIZE`]. The handle is released on drop.
pub struct EventLog<'a> {
    api: &'a dyn EventLogApi,
    handle: RawLogHandle,
    buffer_size: u32,
    buffer: Vec<u8>,
    read_flags: u32,
    min_read: u32,
}

impl<'a> EventLog<'a> {
    /// Opens the named log on the local machine.
    pub fn open(api: &'a dyn EventLogApi, source: &str) -> Result<Self, EventLogError> {
        Self::open_remote(api, "", source)
    }

    /// Opens the named log on `host`; an empty host means the local machine.
    pub fn open_remote(
        api: &'a dyn EventLogApi,
        host: &str,
        source: &str,
    ) -> Result<Self, EventLogError> {
        if source.is_empty() {
            return Err(EventLogError::InvalidArgument(
                "event log source must not be empty",
            ));
        }
        let host = if host.is_empty() { None } else { Some(host) };
        let handle = api.open(host, source)?;
        Ok(Self {
            api,
            handle,
            buffer_size: MAX_DEFAULT_BUFFER_SIZE,
            buffer: vec![0u8; MAX_DEFAULT_BUFFER_SIZE as usize + 1],
            read_flags: 0,
            min_read: 0,
        })
    }

    pub fn handle(&self) -> RawLogHandle {
        self.handle
    }

    pub fn buffer_size(&self) -> u32 {
        self.buffer_size
    }

    pub fn read_flags(&self) -> u32 {
        self.read_flags
    }

    /// Minimum buffer size the OS reported as needed for the next record on
    /// the last read. The caller resizes and reissues manually; no read
    /// retries on its own.
    pub fn min_read(&self) -> u32 {
        self.min_read
    }

    /// Raw access to the bytes of the last read.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Reallocates the read buffer to `size + 1` bytes, discarding previous
    /// content. Sizes above [`MAX_BUFFER_SIZE`] are rejected and leave the
    /// buffer untouched.
    pub fn set_buffer_size(&mut self, size: u32) -> bool {
        if size <= MAX_BUFFER_SIZE {
            self.buffer_size = size;
            self.buffer = vec![0u8; size as usize + 1];
            true
        } else {
            false
        }
    }

    /// Stores the flag bitmask for subsequent reads, verbatim. Always
    /// succeeds. `EVENTLOG_SEQUENTIAL_READ | EVENTLOG_BACKWARDS_READ` reads
    /// most recent first.
    pub fn set_read_flags(&mut self, flags: u32) -> bool {
        self.read_flags = flags;
        true
    }

    /// Issues exactly one native read with the current flags into the
    /// internal buffer, up to `buffer_size` bytes, and records the
    /// minimum-bytes-needed value into [`min_read`](Self::min_read).
    ///
    /// The requested byte count stays local to the call and the transferred
    /// count is not reported back;
    /// [`read_event_log_checked`](Self::read_event_log_checked) surfaces
    /// both. Errors are logged only.
    pub fn read_event_log(&mut self, offset: u32, read: u32) {
        let _ = read;
        let status = self.api.read(
            self.handle,
            self.read_flags,
            offset,
            &mut self.buffer,
            self.buffer_size,
        );
        self.min_read = status.min_bytes_needed;
        if let Some(err) = status.error {
            debug!("read event log failed: {}", err);
        }
    }

    /// Same single native read, but propagates the OS error and returns the
    /// number of bytes transferred.
    pub fn read_event_log_checked(&mut self, offset: u32) -> Result<u32, EventLogError> {
        let status = self.api.read(
            self.handle,
            self.read_flags,
            offset,
            &mut self.buffer,
            self.buffer_size,
        );
        self.min_read = status.min_bytes_needed;
        match status.error {
            Some(err) => Err(err),
            None => Ok(status.bytes_read),
        }
    }

    /// Dumps `buffer[offset .. offset + read)` to stdout, one byte per
    /// character. A raw diagnostic dump, not a structured decode.
    pub fn print(&self, offset: usize, read: usize) {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        let _ = self.dump_to(&mut out, offset, read);
    }

    /// Writes `read` bytes starting at `offset` as characters, stopping
    /// silently once the index passes the configured buffer size. Returns the
    /// number of bytes written.
    pub fn dump_to<W: Write>(&self, out: &mut W, offset: usize, read: usize) -> io::Result<usize> {
        let mut written = 0;
        for i in 0..read {
            let idx = offset + i;
            if idx > self.buffer_size as usize {
                break;
            }
            write!(out, "{}", self.buffer[idx] as char)?;
            written += 1;
        }
        Ok(written)
    }
}

impl Drop for EventLog<'_> {
    fn drop(&mut self) {
        if self.handle != 0 {
            self.api.close(self.handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sys::ReadStatus;
    use std::cell::RefCell;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct ReadCall {
        handle: RawLogHandle,
        flags: u32,
        record_offset: u32,
        capacity: u32,
    }

    #[derive(Default)]
    struct FakeApi {
        fill: Vec<u8>,
        min_bytes_needed: u32,
        error: Option<EventLogError>,
        reads: RefCell<Vec<ReadCall>>,
        closed: RefCell<Vec<RawLogHandle>>,
    }

    impl EventLogApi for FakeApi {
        fn open(&self, _host: Option<&str>, _source: &str) -> Result<RawLogHandle, EventLogError> {
            Ok(42)
        }

        fn read(
            &self,
            handle: RawLogHandle,
            flags: u32,
            record_offset: u32,
            buffer: &mut [u8],
            capacity: u32,
        ) -> ReadStatus {
            self.reads.borrow_mut().push(ReadCall {
                handle,
                flags,
                record_offset,
                capacity,
            });
            let n = self.fill.len().min(buffer.len());
            buffer[..n].copy_from_slice(&self.fill[..n]);
            ReadStatus {
                bytes_read: n as u32,
                min_bytes_needed: self.min_bytes_needed,
                error: self.error.clone(),
            }
        }

        fn close(&self, handle: RawLogHandle) {
            self.closed.borrow_mut().push(handle);
        }
    }

    #[test]
    fn open_rejects_empty_source() {
        let api = FakeApi::default();
        let result = EventLog::open(&api, "");
        assert!(matches!(result, Err(EventLogError::InvalidArgument(_))));
        assert!(api.reads.borrow().is_empty());
    }

    #[test]
    fn open_configures_default_buffer_and_flags() {
        let api = FakeApi::default();
        let log = EventLog::open(&api, "Application").unwrap();
        assert_eq!(log.handle(), 42);
        assert_eq!(log.buffer_size(), MAX_DEFAULT_BUFFER_SIZE);
        assert_eq!(log.buffer().len(), MAX_DEFAULT_BUFFER_SIZE as usize + 1);
        assert_eq!(log.read_flags(), 0);
        assert_eq!(log.min_read(), 0);
    }

    #[test]
    fn buffer_resize_accepts_everything_up_to_the_maximum() {
        let api = FakeApi::default();
        let mut log = EventLog::open(&api, "Application").unwrap();
        for size in [0, 1, 4096, MAX_BUFFER_SIZE] {
            assert!(log.set_buffer_size(size));
            assert_eq!(log.buffer_size(), size);
            assert_eq!(log.buffer().len(), size as usize + 1);
        }
    }

    #[test]
    fn oversized_resize_is_rejected_and_leaves_state_untouched() {
        let api = FakeApi::default();
        let mut log = EventLog::open(&api, "Application").unwrap();
        assert!(log.set_buffer_size(512));
        assert!(!log.set_buffer_size(MAX_BUFFER_SIZE + 1));
        assert!(!log.set_buffer_size(u32::MAX));
        assert_eq!(log.buffer_size(), 512);
        assert_eq!(log.buffer().len(), 513);
    }

    #[test]
    fn read_flags_are_stored_verbatim() {
        let api = FakeApi::default();
        let mut log = EventLog::open(&api, "Application").unwrap();
        for flags in [
            EVENTLOG_SEQUENTIAL_READ | EVENTLOG_BACKWARDS_READ,
            EVENTLOG_SEEK_READ | EVENTLOG_FORWARDS_READ,
            0xffff_0003,
            0,
        ] {
            assert!(log.set_read_flags(flags));
            assert_eq!(log.read_flags(), flags);
        }
    }

    #[test]
    fn read_issues_exactly_one_native_call() {
        let api = FakeApi::default();
        let mut log = EventLog::open(&api, "Application").unwrap();
        log.set_read_flags(EVENTLOG_SEQUENTIAL_READ | EVENTLOG_BACKWARDS_READ);
        log.read_event_log(0, 1000);
        let reads = api.reads.borrow();
        assert_eq!(reads.len(), 1);
        assert_eq!(
            reads[0],
            ReadCall {
                handle: 42,
                flags: 0x0009,
                record_offset: 0,
                capacity: MAX_DEFAULT_BUFFER_SIZE,
            }
        );
    }

    #[test]
    fn read_records_min_bytes_needed_even_on_failure() {
        let api = FakeApi {
            min_bytes_needed: 1234,
            error: Some(EventLogError::Os(122)),
            ..FakeApi::default()
        };
        let mut log = EventLog::open(&api, "Application").unwrap();
        log.read_event_log(0, 1000);
        assert_eq!(log.min_read(), 1234);
        // Not retried on the caller's behalf.
        assert_eq!(api.reads.borrow().len(), 1);
    }

    #[test]
    fn checked_read_returns_transferred_bytes() {
        let api = FakeApi {
            fill: b"hello".to_vec(),
            ..FakeApi::default()
        };
        let mut log = EventLog::open(&api, "Application").unwrap();
        assert_eq!(log.read_event_log_checked(0).unwrap(), 5);
        assert_eq!(&log.buffer()[..5], b"hello");
    }

    #[test]
    fn checked_read_surfaces_os_errors() {
        let api = FakeApi {
            error: Some(EventLogError::Os(1722)),
            min_bytes_needed: 64,
            ..FakeApi::default()
        };
        let mut log = EventLog::open(&api, "Application").unwrap();
        assert_eq!(log.read_event_log_checked(0), Err(EventLogError::Os(1722)));
        assert_eq!(log.min_read(), 64);
    }

    #[test]
    fn dump_stops_at_the_buffer_size_boundary() {
        let api = FakeApi {
            fill: b"abcdefgh".to_vec(),
            ..FakeApi::default()
        };
        let mut log = EventLog::open(&api, "Application").unwrap();
        log.set_buffer_size(4);
        log.read_event_log(0, 8);
        let mut out = Vec::new();
        let written = log.dump_to(&mut out, 0, 100).unwrap();
        // Indices 0..=4 are in range for a 4-byte buffer size.
        assert_eq!(written, 5);
        assert_eq!(out, b"abcde");
    }

    #[test]
    fn dump_with_offset_past_the_buffer_writes_nothing() {
        let api = FakeApi::default();
        let mut log = EventLog::open(&api, "Application").unwrap();
        log.set_buffer_size(4);
        let mut out = Vec::new();
        assert_eq!(log.dump_to(&mut out, 5, 10).unwrap(), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn drop_releases_the_native_handle() {
        let api = FakeApi::default();
        {
            let _log = EventLog::open(&api, "Application").unwrap();
        }
        assert_eq!(*api.closed.borrow(), vec![42]);
    }
}
