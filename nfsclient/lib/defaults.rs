use std::time::Duration;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// The default NFS port number to connect to.
pub const DEFAULT_NFS_PORT: u16 = 2049;

/// The default time a single call may take before it is abandoned.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);

/// The default upper bound, in bytes, of a single READDIR reply.
pub const DEFAULT_READDIR_MAX_BYTES: u32 = 4096;

/// The default user id presented to the server.
pub const DEFAULT_UID: u32 = 0;

/// The default group id presented to the server.
pub const DEFAULT_GID: u32 = 0;

/// The name that refers to the directory itself; looked up to resolve the export root.
pub const ROOT_MARKER: &str = ".";

/// The canonical path separator accepted by the session.
pub const PATH_SEPARATOR: char = '/';
