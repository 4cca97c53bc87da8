use std::{
    error::Error,
    fmt::{self, Display},
    time::Duration,
};

use thiserror::Error;

use crate::{Procedure, StatusKind};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The result of an NFS client operation.
pub type NfsResult<T> = Result<T, NfsError>;

/// An error that occurred during an NFS client operation.
#[derive(pretty_error_debug::Debug, Error)]
pub enum NfsError {
    /// The session has no open channel.
    #[error("NFS client not connected")]
    NotConnected,

    /// The session is connected but no export is mounted.
    #[error("NFS device not mounted")]
    NotMounted,

    /// The server answered with a non-success status.
    #[error("{procedure}: {kind} (status {code})")]
    Status {
        /// The procedure that failed
        procedure: Procedure,

        /// The typed kind the status maps to
        kind: StatusKind,

        /// The raw status code sent by the server
        code: u32,
    },

    /// The channel returned no response object for the call.
    #[error("{0}: failure")]
    GeneralFailure(Procedure),

    /// The call did not complete within the session timeout.
    ///
    /// This is reported separately from [`GeneralFailure`](NfsError::GeneralFailure) rather than
    /// folded into it. Callers that treat every transport failure alike should match on
    /// [`is_transport`](NfsError::is_transport) instead of a single variant.
    #[error("{procedure}: timed out after {timeout:?}")]
    Timeout {
        /// The procedure that timed out
        procedure: Procedure,

        /// The timeout that elapsed
        timeout: Duration,
    },

    /// The connector could not establish a channel.
    #[error("connection failed: {0}")]
    Connect(AnyError),

    /// The caller's buffer cannot hold the requested byte count.
    #[error("buffer too small: {count} bytes requested, capacity is {capacity}")]
    BufferTooSmall {
        /// The number of bytes requested
        count: usize,

        /// The capacity of the caller's buffer
        capacity: usize,
    },

    /// The path cannot be used for the operation.
    #[error("invalid path: {0:?}")]
    InvalidPath(String),

    /// The server issued a handle longer than the protocol allows.
    #[error("invalid file handle length: {0}")]
    InvalidHandle(usize),

    /// Custom error.
    #[error(transparent)]
    Custom(#[from] AnyError),
}

/// An error that can represent any error.
#[derive(Debug)]
pub struct AnyError {
    error: anyhow::Error,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl NfsError {
    /// Creates a new `Err` result.
    pub fn custom(error: impl Into<anyhow::Error>) -> NfsError {
        NfsError::Custom(AnyError {
            error: error.into(),
        })
    }

    /// Creates a connection error from a connector failure.
    pub fn connect(error: impl Into<anyhow::Error>) -> NfsError {
        NfsError::Connect(AnyError {
            error: error.into(),
        })
    }

    /// Returns the status kind if this error came from a server status code.
    pub fn kind(&self) -> Option<StatusKind> {
        match self {
            NfsError::Status { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Returns the procedure the error is attributed to, if any.
    pub fn procedure(&self) -> Option<Procedure> {
        match self {
            NfsError::Status { procedure, .. }
            | NfsError::GeneralFailure(procedure)
            | NfsError::Timeout { procedure, .. } => Some(*procedure),
            _ => None,
        }
    }

    /// Returns `true` if the error is a transport failure rather than a server answer.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            NfsError::GeneralFailure(_) | NfsError::Timeout { .. } | NfsError::Connect(_)
        )
    }

    /// Returns `true` if the session was in the wrong state for the operation.
    pub fn is_connection_state(&self) -> bool {
        matches!(self, NfsError::NotConnected | NfsError::NotMounted)
    }

    /// Returns `true` if the server reported that the entry does not exist.
    pub fn is_not_found(&self) -> bool {
        self.kind() == Some(StatusKind::NotFound)
    }
}

impl AnyError {
    /// Downcasts the error to a `T`.
    pub fn downcast<T>(&self) -> Option<&T>
    where
        T: Display + fmt::Debug + Send + Sync + 'static,
    {
        self.error.downcast_ref::<T>()
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl PartialEq for AnyError {
    fn eq(&self, other: &Self) -> bool {
        self.error.to_string() == other.error.to_string()
    }
}

impl Display for AnyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl Error for AnyError {}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
