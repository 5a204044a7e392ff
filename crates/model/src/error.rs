use std::fmt::{self, Display};

/// The kind of error that occurred while delivering a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request never got a response (connection refused, reset, etc.).
    Network,
    /// The backend answered with a non-2xx status code.
    Status(u16),
    /// The backend answered, but the payload could not be understood.
    Malformed,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Network => write!(f, "network error"),
            ErrorKind::Status(code) => write!(f, "unexpected status {code}"),
            ErrorKind::Malformed => write!(f, "malformed response"),
        }
    }
}
