use crate::host::HostError;
use std::path::PathBuf;

/// Result type alias for fatal engine failures
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors.
///
/// These are never folded into the diagnostic list: a run that hits one of
/// them produces neither a schema nor diagnostics.
#[derive(Debug)]
pub enum Error {
    IoError(std::io::Error),
    ParseError { file: PathBuf, message: String },
    /// The type-resolution service failed to answer a query.
    HostError(HostError),
    /// An invariant the engine relies on was violated.
    Internal(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::IoError(e) => write!(f, "IO error: {}", e),
            Error::ParseError { file, message } => {
                write!(f, "parse error in {}: {}", file.display(), message)
            }
            Error::HostError(e) => write!(f, "type host failure: {}", e),
            Error::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            Error::HostError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<HostError> for Error {
    fn from(err: HostError) -> Self {
        Error::HostError(err)
    }
}
