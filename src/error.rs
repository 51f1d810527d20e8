use std::fmt;

/// `ERROR_IO_PENDING`, the one status code the binding keeps as a dedicated value.
pub const ERROR_IO_PENDING: u32 = 997;

/// `ERROR_CALL_NOT_IMPLEMENTED`, reported by the native layer on non-Windows builds.
pub const ERROR_CALL_NOT_IMPLEMENTED: u32 = 120;

/// Classification of a raw Win32 status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Win32ErrorKind {
    Success,
    Pending,
    Other(u32),
}

impl Win32ErrorKind {
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => Self::Success,
            ERROR_IO_PENDING => Self::Pending,
            code => Self::Other(code),
        }
    }
}

/// Errors surfaced by the event log binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventLogError {
    /// Empty source name, or a native call that failed without setting an OS
    /// error code.
    InvalidArgument(&'static str),
    /// The operation-pending status (code 997).
    Pending,
    /// Any other OS error code, passed through unchanged.
    Os(u32),
}

impl fmt::Display for EventLogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Self::Pending => write!(f, "operation pending (OS error {ERROR_IO_PENDING})"),
            Self::Os(code) => write!(f, "OS error {code}"),
        }
    }
}

impl std::error::Error for EventLogError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_success_pending_and_other() {
        assert_eq!(Win32ErrorKind::from_code(0), Win32ErrorKind::Success);
        assert_eq!(Win32ErrorKind::from_code(997), Win32ErrorKind::Pending);
        assert_eq!(Win32ErrorKind::from_code(5), Win32ErrorKind::Other(5));
        assert_eq!(Win32ErrorKind::from_code(122), Win32ErrorKind::Other(122));
    }

    #[test]
    fn display_keeps_the_raw_code_visible() {
        assert_eq!(EventLogError::Os(1722).to_string(), "OS error 1722");
        assert_eq!(
            EventLogError::Pending.to_string(),
            "operation pending (OS error 997)"
        );
        assert!(EventLogError::InvalidArgument("empty source")
            .to_string()
            .contains("empty source"));
    }
}
