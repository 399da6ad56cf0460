use std::fmt::{self, Debug, Display};
use std::io;

pub type Error = Box<dyn std::error::Error + Send + Sync + 'static>;

pub struct DisplayError(Error);

impl Debug for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<T: Into<Error>> From<T> for DisplayError {
    fn from(display: T) -> Self {
        DisplayError(display.into())
    }
}

/// Error kinds reported by a [`Connector`](crate::Connector), either as
/// [`Event::ErrorOccurred`](crate::Event::ErrorOccurred) or as the `Err` side of its synchronous operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum SocketError {
    #[error("operation not permitted in the current state")]
    InvalidState,
    #[error("host not found")]
    HostNotFound,
    #[error("connection refused")]
    ConnectionRefused,
    #[error("unknown socket error")]
    UnknownSocketError,
    #[error("operation timed out")]
    SocketTimeout,
}

pub trait IoErrorExt {
    fn connect_status(&self) -> ConnectStatus;
}

impl IoErrorExt for io::Error {
    fn connect_status(&self) -> ConnectStatus {
        match self.raw_os_error() {
            Some(libc::EINPROGRESS) => ConnectStatus::InProgress,
            Some(libc::EINTR) => ConnectStatus::Interrupted,
            _ if self.kind() == io::ErrorKind::Interrupted => ConnectStatus::Interrupted,
            _ => ConnectStatus::Failed,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConnectStatus {
    /// Non-blocking connect started; completion is signalled by writability.
    InProgress,
    Interrupted,
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_connect_errors() {
        let in_progress = io::Error::from_raw_os_error(libc::EINPROGRESS);
        assert_eq!(in_progress.connect_status(), ConnectStatus::InProgress);

        let interrupted = io::Error::from_raw_os_error(libc::EINTR);
        assert_eq!(interrupted.connect_status(), ConnectStatus::Interrupted);

        let refused = io::Error::from_raw_os_error(libc::ECONNREFUSED);
        assert_eq!(refused.connect_status(), ConnectStatus::Failed);

        let other = io::Error::new(io::ErrorKind::Other, "nope");
        assert_eq!(other.connect_status(), ConnectStatus::Failed);
    }

    #[test]
    fn display_error_prints_message() {
        let e = DisplayError::from(SocketError::HostNotFound);
        assert_eq!(format!("{:?}", e), "host not found");
    }
}
