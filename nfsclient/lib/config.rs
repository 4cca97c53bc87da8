use std::{
    fmt::{self, Display},
    time::Duration,
};

use getset::{CopyGetters, Getters};
use typed_builder::TypedBuilder;

use crate::defaults::{
    DEFAULT_CALL_TIMEOUT, DEFAULT_GID, DEFAULT_NFS_PORT, DEFAULT_READDIR_MAX_BYTES, DEFAULT_UID,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The transport a channel is established over.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// Stream transport.
    #[default]
    Tcp,

    /// Datagram transport.
    Udp,
}

/// Options used to establish a session with an NFS server.
///
/// The identity (`uid` / `gid`) is presented to the server with every call and is also the
/// ownership requested for items the session creates.
///
/// ## Examples
///
/// ```rust
/// use std::time::Duration;
/// use nfsclient::{ConnectOptions, Transport};
///
/// let options = ConnectOptions::builder()
///     .host("10.0.0.5")
///     .uid(1000)
///     .gid(1000)
///     .timeout(Duration::from_secs(5))
///     .build();
///
/// assert_eq!(options.get_port(), 2049);
/// assert_eq!(options.get_transport(), Transport::Tcp);
/// ```
#[derive(Debug, Clone, TypedBuilder, Getters, CopyGetters, PartialEq, Eq)]
pub struct ConnectOptions {
    /// The server address.
    #[builder(setter(into))]
    #[getset(get = "pub with_prefix")]
    host: String,

    /// The NFS program port.
    #[builder(default = DEFAULT_NFS_PORT)]
    #[getset(get_copy = "pub with_prefix")]
    port: u16,

    /// The MOUNT program port. `None` lets the connector discover it.
    #[builder(default, setter(strip_option))]
    #[getset(get_copy = "pub with_prefix")]
    mount_port: Option<u16>,

    /// The transport to use for both programs.
    #[builder(default)]
    #[getset(get_copy = "pub with_prefix")]
    transport: Transport,

    /// Whether the connector should bind a privileged source port.
    #[builder(default)]
    #[getset(get_copy = "pub with_prefix")]
    secure_port: bool,

    /// The user id of the session identity.
    #[builder(default = DEFAULT_UID)]
    #[getset(get_copy = "pub with_prefix")]
    uid: u32,

    /// The group id of the session identity.
    #[builder(default = DEFAULT_GID)]
    #[getset(get_copy = "pub with_prefix")]
    gid: u32,

    /// How long a single call may take.
    #[builder(default = DEFAULT_CALL_TIMEOUT)]
    timeout: Duration,

    /// The upper bound, in bytes, requested for each directory listing page.
    #[builder(default = DEFAULT_READDIR_MAX_BYTES)]
    #[getset(get_copy = "pub with_prefix")]
    readdir_max_bytes: u32,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ConnectOptions {
    /// Returns the per-call timeout.
    ///
    /// A zero timeout is treated as unset and replaced with the default.
    pub fn get_timeout(&self) -> Duration {
        if self.timeout.is_zero() {
            DEFAULT_CALL_TIMEOUT
        } else {
            self.timeout
        }
    }

    /// Returns the `host:port` address of the NFS program.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Tcp => write!(f, "tcp"),
            Transport::Udp => write!(f, "udp"),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
