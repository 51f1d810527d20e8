//! Minimal binding to the Windows Event Log subsystem.
//!
//! Two shallow pieces: a registrar that checks for and installs the
//! registry-based event source descriptor, and a reader that opens a named
//! log and issues raw bounded reads into an owned buffer. Bytes are exposed
//! verbatim; the binary event-record layout is not decoded.

pub mod error;
pub mod reader;
pub mod registrar;
pub mod sys;
pub mod types;

pub use error::{EventLogError, Win32ErrorKind};
pub use reader::{
    EventLog, EVENTLOG_BACKWARDS_READ, EVENTLOG_FORWARDS_READ, EVENTLOG_SEEK_READ,
    EVENTLOG_SEQUENTIAL_READ, MAX_BUFFER_SIZE, MAX_DEFAULT_BUFFER_SIZE,
};
pub use registrar::{Registrar, SourceRegistry, SourceSpec, WindowsRegistry};
pub use sys::{EventLogApi, RawLogHandle, ReadStatus, Win32Api};
