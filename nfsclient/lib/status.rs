//! Mapping of wire status codes onto typed error kinds.

use std::fmt::{self, Display};

use nfsserve::nfs::nfsstat3;

use crate::{NfsError, NfsResult, Procedure};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The closed set of error kinds a server status code maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    /// No such file or directory
    NotFound,

    /// The caller lacks the rights for the operation
    PermissionDenied,

    /// The target already exists
    AlreadyExists,

    /// A directory operation was given a non-directory
    NotADirectory,

    /// A non-directory operation was given a directory
    IsADirectory,

    /// The server is out of space or quota
    NoSpace,

    /// The handle no longer refers to a live object
    StaleHandle,

    /// A hard I/O error on the server
    IoError,

    /// The server does not support the operation
    NotSupported,

    /// An argument was rejected by the server
    InvalidArgument,

    /// A name exceeded the server's limit
    NameTooLong,

    /// A directory to be removed still has entries
    NotEmpty,

    /// A modification was attempted on a read-only export
    ReadOnlyFilesystem,

    /// Any status outside the known set
    Unknown,
}

/// Status codes returned by the MOUNT program.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountStatus {
    /// Success
    Ok = 0,

    /// Not owner
    Perm = 1,

    /// No such file or directory
    NoEnt = 2,

    /// I/O error
    Io = 5,

    /// Permission denied
    Access = 13,

    /// Not a directory
    NotDir = 20,

    /// Invalid argument
    Inval = 22,

    /// Filename too long
    NameTooLong = 63,

    /// Operation not supported
    NotSupp = 10004,

    /// A failure on the server
    ServerFault = 10006,
}

//--------------------------------------------------------------------------------------------------
// Traits
//--------------------------------------------------------------------------------------------------

/// A status code carried by every reply of a program.
pub trait StatusCode: Copy {
    /// Returns `true` if the status reports success.
    fn is_ok(&self) -> bool;

    /// Returns the raw numeric code.
    fn code(&self) -> u32;

    /// Returns the typed kind for the status.
    fn kind(&self) -> StatusKind;

    /// Builds the error reported when `procedure` answers with this status.
    fn to_error(self, procedure: Procedure) -> NfsError {
        NfsError::Status {
            procedure,
            kind: self.kind(),
            code: self.code(),
        }
    }

    /// Converts the status into a result, attributing failures to `procedure`.
    fn check(self, procedure: Procedure) -> NfsResult<()> {
        if self.is_ok() {
            return Ok(());
        }

        Err(self.to_error(procedure))
    }
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl MountStatus {
    /// Decodes a raw MOUNT status, returning `None` for codes outside the protocol.
    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            0 => MountStatus::Ok,
            1 => MountStatus::Perm,
            2 => MountStatus::NoEnt,
            5 => MountStatus::Io,
            13 => MountStatus::Access,
            20 => MountStatus::NotDir,
            22 => MountStatus::Inval,
            63 => MountStatus::NameTooLong,
            10004 => MountStatus::NotSupp,
            10006 => MountStatus::ServerFault,
            _ => return None,
        })
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl StatusCode for nfsstat3 {
    fn is_ok(&self) -> bool {
        matches!(self, nfsstat3::NFS3_OK)
    }

    fn code(&self) -> u32 {
        *self as u32
    }

    fn kind(&self) -> StatusKind {
        match self {
            nfsstat3::NFS3ERR_PERM | nfsstat3::NFS3ERR_ACCES => StatusKind::PermissionDenied,
            nfsstat3::NFS3ERR_NOENT => StatusKind::NotFound,
            nfsstat3::NFS3ERR_IO | nfsstat3::NFS3ERR_NXIO => StatusKind::IoError,
            nfsstat3::NFS3ERR_EXIST => StatusKind::AlreadyExists,
            nfsstat3::NFS3ERR_NOTDIR => StatusKind::NotADirectory,
            nfsstat3::NFS3ERR_ISDIR => StatusKind::IsADirectory,
            nfsstat3::NFS3ERR_INVAL => StatusKind::InvalidArgument,
            nfsstat3::NFS3ERR_NOSPC | nfsstat3::NFS3ERR_DQUOT => StatusKind::NoSpace,
            nfsstat3::NFS3ERR_ROFS => StatusKind::ReadOnlyFilesystem,
            nfsstat3::NFS3ERR_NAMETOOLONG => StatusKind::NameTooLong,
            nfsstat3::NFS3ERR_NOTEMPTY => StatusKind::NotEmpty,
            nfsstat3::NFS3ERR_STALE | nfsstat3::NFS3ERR_BADHANDLE => StatusKind::StaleHandle,
            nfsstat3::NFS3ERR_NOTSUPP => StatusKind::NotSupported,
            _ => StatusKind::Unknown,
        }
    }
}

impl StatusCode for MountStatus {
    fn is_ok(&self) -> bool {
        matches!(self, MountStatus::Ok)
    }

    fn code(&self) -> u32 {
        *self as u32
    }

    fn kind(&self) -> StatusKind {
        match self {
            MountStatus::Perm | MountStatus::Access => StatusKind::PermissionDenied,
            MountStatus::NoEnt => StatusKind::NotFound,
            MountStatus::Io => StatusKind::IoError,
            MountStatus::NotDir => StatusKind::NotADirectory,
            MountStatus::Inval => StatusKind::InvalidArgument,
            MountStatus::NameTooLong => StatusKind::NameTooLong,
            MountStatus::NotSupp => StatusKind::NotSupported,
            MountStatus::Ok | MountStatus::ServerFault => StatusKind::Unknown,
        }
    }
}

impl Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let description = match self {
            StatusKind::NotFound => "not found",
            StatusKind::PermissionDenied => "permission denied",
            StatusKind::AlreadyExists => "already exists",
            StatusKind::NotADirectory => "not a directory",
            StatusKind::IsADirectory => "is a directory",
            StatusKind::NoSpace => "no space left on device",
            StatusKind::StaleHandle => "stale file handle",
            StatusKind::IoError => "I/O error",
            StatusKind::NotSupported => "operation not supported",
            StatusKind::InvalidArgument => "invalid argument",
            StatusKind::NameTooLong => "name too long",
            StatusKind::NotEmpty => "directory not empty",
            StatusKind::ReadOnlyFilesystem => "read-only filesystem",
            StatusKind::Unknown => "unknown error",
        };

        write!(f, "{}", description)
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
