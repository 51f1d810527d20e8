//! Native binding table for the advapi32 event log entry points.
//!
//! The production implementation is [`Win32Api`]; readers take the table by
//! reference so tests can substitute a recording stub.

use crate::error::EventLogError;

/// Raw native event log handle. Zero is never a valid open handle.
pub type RawLogHandle = isize;

/// Outcome of a single native read call. `min_bytes_needed` is only
/// meaningful when the supplied buffer was too small for the next record.
#[derive(Debug, Clone, Default)]
pub struct ReadStatus {
    pub bytes_read: u32,
    pub min_bytes_needed: u32,
    pub error: Option<EventLogError>,
}

/// Process-wide binding table over the native event log calls, constructed
/// once at startup and passed by reference to each reader.
pub trait EventLogApi {
    /// Opens the named log. A `None` host means the local machine.
    fn open(&self, host: Option<&str>, source: &str) -> Result<RawLogHandle, EventLogError>;

    /// Issues one read into `buffer`, up to `capacity` bytes. The caller
    /// guarantees `capacity <= buffer.len()`.
    fn read(
        &self,
        handle: RawLogHandle,
        flags: u32,
        record_offset: u32,
        buffer: &mut [u8],
        capacity: u32,
    ) -> ReadStatus;

    /// Releases the handle.
    fn close(&self, handle: RawLogHandle);
}

/// UTF-16, NUL-terminated.
pub(crate) fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Direct bindings via the `windows` crate.
pub struct Win32Api;

impl Win32Api {
    pub fn new() -> Self {
        Self
    }
}

impl Default for Win32Api {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps a `windows` crate error into the binding taxonomy: code 0 means the
/// call failed without an OS error code, 997 is the pending status, anything
/// else passes through raw.
#[cfg(target_os = "windows")]
fn win32_error(err: windows::core::Error) -> EventLogError {
    use crate::error::Win32ErrorKind;

    let code = err.code().0 as u32 & 0xFFFF;
    match Win32ErrorKind::from_code(code) {
        Win32ErrorKind::Success => {
            EventLogError::InvalidArgument("native call failed without an OS error code")
        }
        Win32ErrorKind::Pending => EventLogError::Pending,
        Win32ErrorKind::Other(code) => EventLogError::Os(code),
    }
}

impl EventLogApi for Win32Api {
    fn open(&self, host: Option<&str>, source: &str) -> Result<RawLogHandle, EventLogError> {
        #[cfg(target_os = "windows")]
        {
            use windows::core::PCWSTR;
            use windows::Win32::System::EventLog::OpenEventLogW;

            let host_wide = host.map(to_wide);
            let source_wide = to_wide(source);
            let host_ptr = host_wide
                .as_ref()
                .map_or(PCWSTR::null(), |w| PCWSTR::from_raw(w.as_ptr()));
            // SAFETY: both strings are NUL-terminated and outlive the call.
            let handle =
                unsafe { OpenEventLogW(host_ptr, PCWSTR::from_raw(source_wide.as_ptr())) }
                    .map_err(win32_error)?;
            if handle.0 == 0 {
                return Err(EventLogError::InvalidArgument(
                    "OpenEventLogW returned a null handle",
                ));
            }
            Ok(handle.0)
        }
        #[cfg(not(target_os = "windows"))]
        {
            let _ = (host, source);
            log::warn!("event log access is only available on Windows");
            Err(EventLogError::Os(crate::error::ERROR_CALL_NOT_IMPLEMENTED))
        }
    }

    fn read(
        &self,
        handle: RawLogHandle,
        flags: u32,
        record_offset: u32,
        buffer: &mut [u8],
        capacity: u32,
    ) -> ReadStatus {
        debug_assert!(capacity as usize <= buffer.len());
        #[cfg(target_os = "windows")]
        {
            use std::ffi::c_void;
            use windows::Win32::System::EventLog::{
                EventLogHandle, ReadEventLogW, READ_EVENT_LOG_READ_FLAGS,
            };

            let mut bytes_read = 0u32;
            let mut min_bytes_needed = 0u32;
            // SAFETY: the buffer outlives the call and capacity never exceeds
            // its length.
            let result = unsafe {
                ReadEventLogW(
                    EventLogHandle(handle),
                    READ_EVENT_LOG_READ_FLAGS(flags),
                    record_offset,
                    buffer.as_mut_ptr() as *mut c_void,
                    capacity,
                    &mut bytes_read,
                    &mut min_bytes_needed,
                )
            };
            ReadStatus {
                bytes_read,
                min_bytes_needed,
                error: result.err().map(win32_error),
            }
        }
        #[cfg(not(target_os = "windows"))]
        {
            let _ = (handle, flags, record_offset, buffer, capacity);
            log::warn!("event log access is only available on Windows");
            ReadStatus {
                bytes_read: 0,
                min_bytes_needed: 0,
                error: Some(EventLogError::Os(crate::error::ERROR_CALL_NOT_IMPLEMENTED)),
            }
        }
    }

    fn close(&self, handle: RawLogHandle) {
        #[cfg(target_os = "windows")]
        {
            use windows::Win32::System::EventLog::{CloseEventLog, EventLogHandle};

            // SAFETY: the handle came from OpenEventLogW and is closed once.
            if let Err(err) = unsafe { CloseEventLog(EventLogHandle(handle)) } {
                log::debug!("CloseEventLog failed: {}", err);
            }
        }
        #[cfg(not(target_os = "windows"))]
        {
            let _ = handle;
        }
    }
}
