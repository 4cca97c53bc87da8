//! Procedure identifiers and the argument and reply shapes exchanged with a channel.
//!
//! Wire primitives (`nfs_fh3`, `fattr3`, `sattr3`, ...) are taken from [`nfsserve::nfs`]; the
//! composite shapes below only group them per procedure.

use std::fmt::{self, Display};

use nfsserve::nfs::{
    cookie3, cookieverf3, count3, createverf3, diropargs3, fattr3, fileid3, filename3, nfs_fh3,
    nfsstat3, nfstime3, offset3, sattr3, set_atime, set_gid3, set_mode3, set_mtime, set_size3,
    set_uid3,
};
use typed_builder::TypedBuilder;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The result of a single channel call.
///
/// `None` means the transport produced no response object at all. `Some(Err(_))` carries the
/// status the server answered with.
pub type Reply<T, S = nfsstat3> = Option<Result<T, S>>;

/// The head of a linked export list; `None` when the server exports nothing.
pub type ExportList = Option<Box<ExportNode>>;

/// The RPC program a procedure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Program {
    /// The NFS program (100003, version 3).
    FileAccess,

    /// The MOUNT program (100005, version 3).
    MountControl,
}

/// Every procedure the session issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Procedure {
    /// MOUNTPROC3_MNT
    Mount,

    /// MOUNTPROC3_UMNT
    Unmount,

    /// MOUNTPROC3_EXPORT
    Export,

    /// NFSPROC3_GETATTR
    GetAttr,

    /// NFSPROC3_SETATTR
    SetAttr,

    /// NFSPROC3_LOOKUP
    Lookup,

    /// NFSPROC3_READ
    Read,

    /// NFSPROC3_WRITE
    Write,

    /// NFSPROC3_CREATE
    Create,

    /// NFSPROC3_MKDIR
    Mkdir,

    /// NFSPROC3_REMOVE
    Remove,

    /// NFSPROC3_RMDIR
    Rmdir,

    /// NFSPROC3_RENAME
    Rename,

    /// NFSPROC3_READDIR
    ReadDir,
}

/// How the server must commit written data before replying.
#[repr(u32)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum StableHow {
    /// The server may reply before the data reaches stable storage.
    #[default]
    Unstable = 0,

    /// File data must be committed; metadata may lag.
    DataSync = 1,

    /// File data and metadata must be committed.
    FileSync = 2,
}

/// How CREATE treats an existing entry of the same name.
#[repr(u32)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CreateMode {
    /// Create or truncate without checking for an existing entry.
    #[default]
    Unchecked = 0,

    /// Fail with `EXIST` if the entry exists.
    Guarded = 1,

    /// Create atomically, identified by the creation verifier.
    Exclusive = 2,
}

/// The ctime check SETATTR performs before applying changes.
#[derive(Debug, Default, Clone, Copy)]
pub enum SetAttrGuard {
    /// Apply unconditionally.
    #[default]
    None,

    /// Apply only if the object's ctime still equals this value.
    ObjCtime(nfstime3),
}

/// A successful LOOKUP.
#[derive(Debug, Clone)]
pub struct LookupOk {
    /// Handle of the entry that was found.
    pub handle: nfs_fh3,

    /// Attributes of the entry.
    pub attributes: fattr3,
}

/// Arguments of SETATTR.
#[derive(Debug, Clone)]
pub struct SetAttrArgs {
    /// The object to change.
    pub object: nfs_fh3,

    /// The changes to apply.
    pub attributes: sattr3,

    /// Optional ctime check the server performs before applying the changes.
    pub guard: SetAttrGuard,
}

/// Arguments of READDIR.
#[derive(Debug, Clone)]
pub struct ReadDirArgs {
    /// The directory being listed.
    pub dir: nfs_fh3,

    /// Where to continue from; `0` starts at the beginning.
    pub cookie: cookie3,

    /// The verifier returned with the previous page; zero for the first page.
    pub cookieverf: cookieverf3,

    /// Upper bound on the reply size in bytes.
    pub count: count3,
}

/// A single directory entry of a READDIR page.
#[derive(Debug, Clone)]
pub struct DirEntry {
    /// The entry's file id.
    pub fileid: fileid3,

    /// The entry's name.
    pub name: filename3,

    /// The cookie to continue after this entry.
    pub cookie: cookie3,
}

/// A successful READDIR page.
#[derive(Debug, Clone, Default)]
pub struct ReadDirOk {
    /// Entries in server order.
    pub entries: Vec<DirEntry>,

    /// The verifier to present with the next page.
    pub cookieverf: cookieverf3,

    /// Whether this page ends the listing.
    pub eof: bool,
}

/// Arguments of READ.
#[derive(Debug, Clone)]
pub struct ReadArgs {
    /// The file to read.
    pub file: nfs_fh3,

    /// Byte offset to start at.
    pub offset: offset3,

    /// Number of bytes requested.
    pub count: count3,
}

/// A successful READ.
#[derive(Debug, Clone, Default)]
pub struct ReadOk {
    /// The bytes read; may be shorter than requested.
    pub data: Vec<u8>,

    /// Whether the read reached the end of the file.
    pub eof: bool,
}

/// Arguments of WRITE.
#[derive(Debug, Clone)]
pub struct WriteArgs {
    /// The file to write.
    pub file: nfs_fh3,

    /// Byte offset to start at.
    pub offset: offset3,

    /// Number of bytes to write.
    pub count: count3,

    /// The commitment requested from the server.
    pub stable: StableHow,

    /// The bytes to write; exactly `count` long.
    pub data: Vec<u8>,
}

/// A successful WRITE.
#[derive(Debug, Clone, Copy)]
pub struct WriteOk {
    /// Number of bytes the server accepted.
    pub count: count3,

    /// The commitment the server actually applied.
    pub committed: StableHow,
}

/// How CREATE should behave when the name exists.
#[derive(Debug, Clone, Copy)]
pub struct CreateHow {
    /// UNCHECKED, GUARDED or EXCLUSIVE.
    pub mode: CreateMode,

    /// Initial attributes; ignored by the server for EXCLUSIVE.
    pub attributes: sattr3,

    /// The creation verifier; only meaningful for EXCLUSIVE.
    pub verifier: createverf3,
}

/// Arguments of CREATE.
#[derive(Debug, Clone)]
pub struct CreateArgs {
    /// Parent directory and new name.
    pub location: diropargs3,

    /// Creation semantics.
    pub how: CreateHow,
}

/// Arguments of MKDIR.
#[derive(Debug, Clone)]
pub struct MkdirArgs {
    /// Parent directory and new name.
    pub location: diropargs3,

    /// Initial attributes.
    pub attributes: sattr3,
}

/// Arguments of RENAME.
#[derive(Debug, Clone)]
pub struct RenameArgs {
    /// Source directory and name.
    pub from: diropargs3,

    /// Target directory and name.
    pub to: diropargs3,
}

/// A node of the export list returned by MOUNTPROC3_EXPORT.
///
/// The list is linked: each node points to the next export until a terminal `None`.
#[derive(Debug, Clone, Default)]
pub struct ExportNode {
    /// The exported directory path.
    pub dir: Vec<u8>,

    /// Client groups allowed to mount the export.
    pub groups: Option<Box<GroupNode>>,

    /// The next export.
    pub next: Option<Box<ExportNode>>,
}

/// A node of an export's group list.
#[derive(Debug, Clone, Default)]
pub struct GroupNode {
    /// The group name.
    pub name: Vec<u8>,

    /// The next group.
    pub next: Option<Box<GroupNode>>,
}

/// A materialized export entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    /// The exported directory path.
    pub directory: String,

    /// Client groups allowed to mount it, in server order.
    pub groups: Vec<String>,
}

/// A time attribute change.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TimeChange {
    /// Leave the time alone.
    #[default]
    Unchanged,

    /// Let the server stamp its own current time.
    ServerTime,

    /// Set an explicit time, in whole seconds since the Unix epoch.
    ClientTime(u32),
}

/// Attribute changes requested by CREATE, MKDIR or SETATTR.
///
/// Every field is optional; unset fields translate to the protocol's "do not apply" form only
/// when the wire value is built.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, TypedBuilder)]
pub struct SetAttributes {
    /// Permission bits.
    #[builder(default, setter(strip_option))]
    pub mode: Option<u32>,

    /// Owning user.
    #[builder(default, setter(strip_option))]
    pub uid: Option<u32>,

    /// Owning group.
    #[builder(default, setter(strip_option))]
    pub gid: Option<u32>,

    /// File size in bytes.
    #[builder(default, setter(strip_option))]
    pub size: Option<u64>,

    /// Access time.
    #[builder(default)]
    pub atime: TimeChange,

    /// Modification time.
    #[builder(default)]
    pub mtime: TimeChange,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Procedure {
    /// Returns the program the procedure belongs to.
    pub fn program(&self) -> Program {
        match self {
            Procedure::Mount | Procedure::Unmount | Procedure::Export => Program::MountControl,
            _ => Program::FileAccess,
        }
    }

    /// Returns the procedure number within its program (RFC 1813).
    pub fn number(&self) -> u32 {
        match self {
            Procedure::Mount => 1,
            Procedure::Unmount => 3,
            Procedure::Export => 5,
            Procedure::GetAttr => 1,
            Procedure::SetAttr => 2,
            Procedure::Lookup => 3,
            Procedure::Read => 6,
            Procedure::Write => 7,
            Procedure::Create => 8,
            Procedure::Mkdir => 9,
            Procedure::Remove => 12,
            Procedure::Rmdir => 13,
            Procedure::Rename => 14,
            Procedure::ReadDir => 16,
        }
    }
}

impl Program {
    /// Returns the ONC RPC program number.
    pub fn number(&self) -> u32 {
        match self {
            Program::FileAccess => 100003,
            Program::MountControl => 100005,
        }
    }
}

impl ExportNode {
    /// Iterates over the linked exports starting at this node.
    pub fn iter(&self) -> impl Iterator<Item = &ExportNode> {
        std::iter::successors(Some(self), |node| node.next.as_deref())
    }

    /// Iterates over the groups of this export.
    pub fn groups(&self) -> impl Iterator<Item = &GroupNode> {
        std::iter::successors(self.groups.as_deref(), |node| node.next.as_deref())
    }

    /// Builds a linked export list from an ordered sequence of `(dir, groups)` pairs.
    pub fn from_exports<D, G>(exports: impl IntoIterator<Item = (D, G)>) -> ExportList
    where
        D: Into<Vec<u8>>,
        G: IntoIterator,
        G::Item: Into<Vec<u8>>,
    {
        let nodes: Vec<_> = exports
            .into_iter()
            .map(|(dir, groups)| ExportNode {
                dir: dir.into(),
                groups: GroupNode::from_names(groups),
                next: None,
            })
            .collect();

        nodes.into_iter().rev().fold(None, |next, mut node| {
            node.next = next;
            Some(Box::new(node))
        })
    }
}

impl GroupNode {
    /// Builds a linked group list from an ordered sequence of names.
    pub fn from_names<N>(names: impl IntoIterator<Item = N>) -> Option<Box<Self>>
    where
        N: Into<Vec<u8>>,
    {
        let names: Vec<Vec<u8>> = names.into_iter().map(Into::into).collect();
        names.into_iter().rev().fold(None, |next, name| {
            Some(Box::new(GroupNode { name, next }))
        })
    }
}

impl Export {
    /// Materializes a linked export list into an ordered sequence.
    pub fn collect(list: Option<&ExportNode>) -> Vec<Export> {
        list.map(|head| head.iter().map(Export::from).collect())
            .unwrap_or_default()
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Display for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Procedure::Mount => "MOUNTPROC3_MNT",
            Procedure::Unmount => "MOUNTPROC3_UMNT",
            Procedure::Export => "MOUNTPROC3_EXPORT",
            Procedure::GetAttr => "NFSPROC3_GETATTR",
            Procedure::SetAttr => "NFSPROC3_SETATTR",
            Procedure::Lookup => "NFSPROC3_LOOKUP",
            Procedure::Read => "NFSPROC3_READ",
            Procedure::Write => "NFSPROC3_WRITE",
            Procedure::Create => "NFSPROC3_CREATE",
            Procedure::Mkdir => "NFSPROC3_MKDIR",
            Procedure::Remove => "NFSPROC3_REMOVE",
            Procedure::Rmdir => "NFSPROC3_RMDIR",
            Procedure::Rename => "NFSPROC3_RENAME",
            Procedure::ReadDir => "NFSPROC3_READDIR",
        };

        write!(f, "{}", name)
    }
}

impl From<&ExportNode> for Export {
    fn from(node: &ExportNode) -> Self {
        Export {
            directory: String::from_utf8_lossy(&node.dir).into_owned(),
            groups: node
                .groups()
                .map(|group| String::from_utf8_lossy(&group.name).into_owned())
                .collect(),
        }
    }
}

impl From<TimeChange> for set_atime {
    fn from(change: TimeChange) -> Self {
        match change {
            TimeChange::Unchanged => set_atime::DONT_CHANGE,
            TimeChange::ServerTime => set_atime::SET_TO_SERVER_TIME,
            TimeChange::ClientTime(seconds) => set_atime::SET_TO_CLIENT_TIME(nfstime3 {
                seconds,
                nseconds: 0,
            }),
        }
    }
}

impl From<TimeChange> for set_mtime {
    fn from(change: TimeChange) -> Self {
        match change {
            TimeChange::Unchanged => set_mtime::DONT_CHANGE,
            TimeChange::ServerTime => set_mtime::SET_TO_SERVER_TIME,
            TimeChange::ClientTime(seconds) => set_mtime::SET_TO_CLIENT_TIME(nfstime3 {
                seconds,
                nseconds: 0,
            }),
        }
    }
}

impl From<SetAttributes> for sattr3 {
    fn from(attributes: SetAttributes) -> Self {
        sattr3 {
            mode: attributes.mode.map_or(set_mode3::Void, set_mode3::mode),
            uid: attributes.uid.map_or(set_uid3::Void, set_uid3::uid),
            gid: attributes.gid.map_or(set_gid3::Void, set_gid3::gid),
            size: attributes.size.map_or(set_size3::Void, set_size3::size),
            atime: attributes.atime.into(),
            mtime: attributes.mtime.into(),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
