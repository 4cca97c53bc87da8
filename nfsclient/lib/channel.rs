use async_trait::async_trait;
use nfsserve::nfs::{diropargs3, fattr3, nfs_fh3};

use crate::{
    ConnectOptions, CreateArgs, ExportList, LookupOk, MkdirArgs, MountStatus, NfsResult,
    ReadArgs, ReadDirArgs, ReadDirOk, ReadOk, RenameArgs, Reply, SetAttrArgs, WriteArgs, WriteOk,
};

//--------------------------------------------------------------------------------------------------
// Traits
//--------------------------------------------------------------------------------------------------

/// A request/response transport to one NFS server.
///
/// The channel encodes arguments, decodes results and carries the AUTH_UNIX identity it was
/// established with. It exposes one method per procedure the session issues. Every method
/// returns `None` when no response object was received, `Some(Err(status))` when the server
/// answered with a failure status and `Some(Ok(_))` otherwise.
///
/// A channel is used by exactly one session and is never called concurrently.
#[async_trait]
pub trait RpcChannel: Send {
    /// MOUNTPROC3_MNT: mounts `dirpath` and returns the export's root handle.
    async fn mount(&mut self, dirpath: &str) -> Reply<nfs_fh3, MountStatus>;

    /// MOUNTPROC3_UMNT: removes the server's mount entry for `dirpath`.
    ///
    /// The procedure has no status; `Some(())` only confirms a response arrived.
    async fn unmount(&mut self, dirpath: &str) -> Option<()>;

    /// MOUNTPROC3_EXPORT: returns the server's linked export list.
    async fn export(&mut self) -> Option<ExportList>;

    /// NFSPROC3_GETATTR: returns the attributes of `object`.
    async fn getattr(&mut self, object: nfs_fh3) -> Reply<fattr3>;

    /// NFSPROC3_SETATTR: changes attributes of an object.
    async fn setattr(&mut self, args: SetAttrArgs) -> Reply<()>;

    /// NFSPROC3_LOOKUP: looks up a name in a directory.
    async fn lookup(&mut self, what: diropargs3) -> Reply<LookupOk>;

    /// NFSPROC3_READ: reads from a file.
    async fn read(&mut self, args: ReadArgs) -> Reply<ReadOk>;

    /// NFSPROC3_WRITE: writes to a file.
    async fn write(&mut self, args: WriteArgs) -> Reply<WriteOk>;

    /// NFSPROC3_CREATE: creates a regular file, returning its handle if the server sent one.
    async fn create(&mut self, args: CreateArgs) -> Reply<Option<nfs_fh3>>;

    /// NFSPROC3_MKDIR: creates a directory, returning its handle if the server sent one.
    async fn mkdir(&mut self, args: MkdirArgs) -> Reply<Option<nfs_fh3>>;

    /// NFSPROC3_REMOVE: removes a non-directory entry.
    async fn remove(&mut self, object: diropargs3) -> Reply<()>;

    /// NFSPROC3_RMDIR: removes an empty directory.
    async fn rmdir(&mut self, object: diropargs3) -> Reply<()>;

    /// NFSPROC3_RENAME: moves an entry between directories.
    async fn rename(&mut self, args: RenameArgs) -> Reply<()>;

    /// NFSPROC3_READDIR: returns one page of a directory listing.
    async fn readdir(&mut self, args: ReadDirArgs) -> Reply<ReadDirOk>;

    /// Releases the transport. Called once when the session disconnects.
    async fn close(&mut self) {}
}

/// Establishes channels to a server.
///
/// The connector owns address resolution, transport selection, privileged source ports and the
/// identity setup described by [`ConnectOptions`].
#[async_trait]
pub trait Connector: Send + Sync {
    /// The channel type produced by this connector.
    type Channel: RpcChannel;

    /// Opens a channel to the server described by `options`.
    ///
    /// ## Errors
    ///
    /// Returns [`NfsError::Connect`](crate::NfsError::Connect) if the server cannot be reached.
    async fn connect(&self, options: &ConnectOptions) -> NfsResult<Self::Channel>;
}
