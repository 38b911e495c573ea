//! Error types for the mioty AT client.
//!
//! All fallible operations across the workspace return [`Result<T>`], which
//! uses [`Error`] as the error type. Transport failures, modem-reported
//! faults, and local protocol violations are all captured here, and each
//! variant maps to exactly one [`ReturnCode`] via [`Error::return_code`].

use crate::code::ReturnCode;

/// The error type for all mioty AT client operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The modem answered with a MAC or AT error status line.
    ///
    /// Also carries the two label-not-found fallbacks
    /// ([`ReturnCode::Err`] and [`ReturnCode::AtError`]).
    #[error("modem reported {0}")]
    Modem(ReturnCode),

    /// The transport failed while a response was being collected.
    #[error("transport read failed: {0}")]
    ReadFailed(String),

    /// The response did not fit in the fixed-capacity response buffer.
    #[error("response exceeds {capacity} byte buffer")]
    ResponseOverflow { capacity: usize },

    /// No status line arrived within the configured number of empty reads.
    #[error("no response after {polls} empty reads")]
    NoResponse { polls: u32 },

    /// The response carried a success status line but its payload was unusable.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The caller-supplied buffer cannot hold the returned payload.
    #[error("buffer too small: need {needed} bytes, have {capacity}")]
    BufferTooSmall { needed: usize, capacity: usize },

    /// A binary payload is longer than the two-digit length field allows.
    #[error("payload of {len} bytes exceeds the {max} byte limit")]
    PayloadTooLong { len: usize, max: usize },

    /// A transport-level error other than a read failure (open, write).
    #[error("transport error: {0}")]
    Transport(String),

    /// An invalid parameter was passed to a client operation.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Timed out waiting for data from the transport.
    ///
    /// Transports return this from `receive` when nothing arrived in time;
    /// the response collector treats it as an empty read.
    #[error("timeout waiting for data")]
    Timeout,

    /// No connection to the modem has been established.
    #[error("not connected")]
    NotConnected,

    /// The connection to the modem was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The single [`ReturnCode`] this error stands for.
    pub fn return_code(&self) -> ReturnCode {
        match self {
            Error::Modem(code) => *code,
            Error::ReadFailed(_) => ReturnCode::ReadFailed,
            Error::ResponseOverflow { .. } => ReturnCode::ResponseOverflow,
            Error::NoResponse { .. } => ReturnCode::NoResponse,
            Error::MalformedResponse(_) => ReturnCode::MalformedResponse,
            Error::BufferTooSmall { .. } => ReturnCode::BufferSizeInsufficient,
            Error::PayloadTooLong { .. } => ReturnCode::ArgumentSizeMismatch,
            Error::Transport(_)
            | Error::InvalidParameter(_)
            | Error::Timeout
            | Error::NotConnected
            | Error::ConnectionLost
            | Error::Io(_) => ReturnCode::Err,
        }
    }
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_modem() {
        let e = Error::Modem(ReturnCode::MacNodeNotAttached);
        assert_eq!(e.to_string(), "modem reported node not attached (6)");
    }

    #[test]
    fn error_display_read_failed() {
        let e = Error::ReadFailed("connection lost".into());
        assert_eq!(e.to_string(), "transport read failed: connection lost");
    }

    #[test]
    fn error_display_overflow() {
        let e = Error::ResponseOverflow { capacity: 512 };
        assert_eq!(e.to_string(), "response exceeds 512 byte buffer");
    }

    #[test]
    fn error_display_payload_too_long() {
        let e = Error::PayloadTooLong { len: 120, max: 99 };
        assert_eq!(e.to_string(), "payload of 120 bytes exceeds the 99 byte limit");
    }

    #[test]
    fn return_code_of_modem_error_is_verbatim() {
        let e = Error::Modem(ReturnCode::AtParamOutOfBounds);
        assert_eq!(e.return_code(), ReturnCode::AtParamOutOfBounds);
        assert_eq!(e.return_code().as_u8(), 19);
    }

    #[test]
    fn return_code_of_local_errors() {
        assert_eq!(
            Error::ReadFailed(String::new()).return_code(),
            ReturnCode::ReadFailed
        );
        assert_eq!(
            Error::ResponseOverflow { capacity: 1 }.return_code(),
            ReturnCode::ResponseOverflow
        );
        assert_eq!(
            Error::NoResponse { polls: 3 }.return_code(),
            ReturnCode::NoResponse
        );
        assert_eq!(
            Error::BufferTooSmall {
                needed: 4,
                capacity: 2
            }
            .return_code(),
            ReturnCode::BufferSizeInsufficient
        );
        assert_eq!(Error::NotConnected.return_code(), ReturnCode::Err);
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broken");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
        assert!(e.to_string().contains("pipe broken"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
