use std::fmt::{self, Display};

use chrono::{DateTime, TimeZone, Utc};
use getset::{CopyGetters, Getters};
use nfsserve::nfs::{fattr3, ftype3, nfstime3};

use crate::Handle;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

const S_IRUSR: u32 = 0o400; // user has read permission
const S_IWUSR: u32 = 0o200; // user has write permission
const S_IXUSR: u32 = 0o100; // user has execute permission
const S_IRWXU: u32 = 0o700;

const S_IRGRP: u32 = 0o040; // group has read permission
const S_IWGRP: u32 = 0o020; // group has write permission
const S_IXGRP: u32 = 0o010; // group has execute permission
const S_IRWXG: u32 = 0o070;

const S_IROTH: u32 = 0o004; // others have read permission
const S_IWOTH: u32 = 0o002; // others have write permission
const S_IXOTH: u32 = 0o001; // others have execute permission
const S_IRWXO: u32 = 0o007;

const S_IPERM: u32 = 0o777; // mask for permission bits

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The type of a filesystem object as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemType {
    /// Regular file
    RegularFile,

    /// Directory
    Directory,

    /// Symbolic link
    SymbolicLink,

    /// Character special device
    CharDevice,

    /// Block special device
    BlockDevice,

    /// Socket
    Socket,

    /// Named pipe
    Fifo,
}

/// User permission flags (bits 8-6)
///
/// ```text
/// 8 7 6
/// r w x
/// ```
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum User {
    /// Read permission
    R = S_IRUSR,

    /// Write permission
    W = S_IWUSR,

    /// Execute permission
    X = S_IXUSR,

    /// Read + Write
    RW = S_IRUSR | S_IWUSR,

    /// Read + Execute
    RX = S_IRUSR | S_IXUSR,

    /// Write + Execute
    WX = S_IWUSR | S_IXUSR,

    /// Read + Write + Execute
    RWX = S_IRWXU,

    /// No permissions
    None = 0,
}

/// Group permission flags (bits 5-3)
///
/// ```text
/// 5 4 3
/// r w x
/// ```
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Group {
    /// Read permission
    R = S_IRGRP,

    /// Write permission
    W = S_IWGRP,

    /// Execute permission
    X = S_IXGRP,

    /// Read + Write
    RW = S_IRGRP | S_IWGRP,

    /// Read + Execute
    RX = S_IRGRP | S_IXGRP,

    /// Write + Execute
    WX = S_IWGRP | S_IXGRP,

    /// Read + Write + Execute
    RWX = S_IRWXG,

    /// No permissions
    None = 0,
}

/// Other permission flags (bits 2-0)
///
/// ```text
/// 2 1 0
/// r w x
/// ```
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Other {
    /// Read permission
    R = S_IROTH,

    /// Write permission
    W = S_IWOTH,

    /// Execute permission
    X = S_IXOTH,

    /// Read + Write
    RW = S_IROTH | S_IWOTH,

    /// Read + Execute
    RX = S_IROTH | S_IXOTH,

    /// Write + Execute
    WX = S_IWOTH | S_IXOTH,

    /// Read + Write + Execute
    RWX = S_IRWXO,

    /// No permissions
    None = 0,
}

/// The access rights of an item, split into its user, group and other triads.
///
/// Triads combine with `|`:
/// ```rust
/// use nfsclient::{User, Group, Other};
///
/// // rwxr-xr-x (0o755)
/// let mode = User::RWX | Group::RX | Other::RX;
/// assert_eq!(u32::from(mode), 0o755);
/// ```
///
/// On the wire the mode occupies the lower 9 bits:
/// ```text
/// user  group  other
/// rwx   rwx    rwx
/// ```
#[derive(Debug, Clone, Copy, CopyGetters, PartialEq, Eq, Hash)]
#[getset(get_copy = "pub with_prefix")]
pub struct PermissionMode {
    user: User,
    group: Group,
    other: Other,
}

/// Attributes of a filesystem object, translated from the server's attribute block.
///
/// Timestamps carry whole seconds only; the sub-second part sent by the server is dropped.
#[derive(Debug, Clone, Getters, CopyGetters, PartialEq, Eq)]
pub struct ItemAttributes {
    /// When the item's attributes last changed
    #[getset(get = "pub with_prefix")]
    created_at: DateTime<Utc>,

    /// When the item was last read
    #[getset(get = "pub with_prefix")]
    accessed_at: DateTime<Utc>,

    /// When the item's content was last modified
    #[getset(get = "pub with_prefix")]
    modified_at: DateTime<Utc>,

    /// The type of the item
    #[getset(get_copy = "pub with_prefix")]
    item_type: ItemType,

    /// The access rights of the item
    #[getset(get_copy = "pub with_prefix")]
    mode: PermissionMode,

    /// Size of the item in bytes
    #[getset(get_copy = "pub with_prefix")]
    size: u64,

    /// The handle the item was resolved to
    #[getset(get = "pub with_prefix")]
    handle: Handle,

    /// User ID of the owner
    #[getset(get_copy = "pub with_prefix")]
    uid: u32,

    /// Group ID of the owner
    #[getset(get_copy = "pub with_prefix")]
    gid: u32,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ItemAttributes {
    /// Translates a wire attribute block and the handle it belongs to.
    pub fn from_wire(attributes: &fattr3, handle: Handle) -> Self {
        Self {
            created_at: to_datetime(attributes.ctime),
            accessed_at: to_datetime(attributes.atime),
            modified_at: to_datetime(attributes.mtime),
            item_type: ItemType::from(attributes.ftype),
            mode: PermissionMode::from(attributes.mode),
            size: attributes.size,
            handle,
            uid: attributes.uid,
            gid: attributes.gid,
        }
    }

    /// Returns `true` if the item is a directory.
    pub fn is_directory(&self) -> bool {
        self.item_type == ItemType::Directory
    }
}

impl PermissionMode {
    /// Creates a mode from its three triads.
    pub fn new(user: User, group: Group, other: Other) -> Self {
        Self { user, group, other }
    }

    /// Creates a mode from octal digits, e.g. `(7, 5, 5)` for `rwxr-xr-x`.
    ///
    /// Bits above the low three of each digit are ignored.
    pub fn from_octal(user: u8, group: u8, other: u8) -> Self {
        let bits = ((u32::from(user) & 0o7) << 6)
            | ((u32::from(group) & 0o7) << 3)
            | (u32::from(other) & 0o7);
        Self::from(bits)
    }

    /// Full access for owner, group and others (`rwxrwxrwx`).
    pub fn all() -> Self {
        Self::new(User::RWX, Group::RWX, Other::RWX)
    }

    /// Returns the user triad as an octal digit.
    pub fn user_access(&self) -> u8 {
        ((self.user as u32) >> 6) as u8
    }

    /// Returns the group triad as an octal digit.
    pub fn group_access(&self) -> u8 {
        ((self.group as u32) >> 3) as u8
    }

    /// Returns the other triad as an octal digit.
    pub fn other_access(&self) -> u8 {
        self.other as u8
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

fn to_datetime(time: nfstime3) -> DateTime<Utc> {
    Utc.timestamp_opt(i64::from(time.seconds), 0)
        .single()
        .unwrap_or_default()
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl From<ftype3> for ItemType {
    fn from(ftype: ftype3) -> Self {
        match ftype {
            ftype3::NF3REG => ItemType::RegularFile,
            ftype3::NF3DIR => ItemType::Directory,
            ftype3::NF3BLK => ItemType::BlockDevice,
            ftype3::NF3CHR => ItemType::CharDevice,
            ftype3::NF3LNK => ItemType::SymbolicLink,
            ftype3::NF3SOCK => ItemType::Socket,
            ftype3::NF3FIFO => ItemType::Fifo,
        }
    }
}

impl From<ItemType> for ftype3 {
    fn from(item_type: ItemType) -> Self {
        match item_type {
            ItemType::RegularFile => ftype3::NF3REG,
            ItemType::Directory => ftype3::NF3DIR,
            ItemType::BlockDevice => ftype3::NF3BLK,
            ItemType::CharDevice => ftype3::NF3CHR,
            ItemType::SymbolicLink => ftype3::NF3LNK,
            ItemType::Socket => ftype3::NF3SOCK,
            ItemType::Fifo => ftype3::NF3FIFO,
        }
    }
}

impl From<u32> for PermissionMode {
    fn from(mode: u32) -> Self {
        let mode = mode & S_IPERM;
        PermissionMode {
            user: match mode & S_IRWXU {
                S_IRWXU => User::RWX,
                0o600 => User::RW,
                0o500 => User::RX,
                0o300 => User::WX,
                S_IRUSR => User::R,
                S_IWUSR => User::W,
                S_IXUSR => User::X,
                _ => User::None,
            },
            group: match mode & S_IRWXG {
                S_IRWXG => Group::RWX,
                0o060 => Group::RW,
                0o050 => Group::RX,
                0o030 => Group::WX,
                S_IRGRP => Group::R,
                S_IWGRP => Group::W,
                S_IXGRP => Group::X,
                _ => Group::None,
            },
            other: match mode & S_IRWXO {
                S_IRWXO => Other::RWX,
                0o006 => Other::RW,
                0o005 => Other::RX,
                0o003 => Other::WX,
                S_IROTH => Other::R,
                S_IWOTH => Other::W,
                S_IXOTH => Other::X,
                _ => Other::None,
            },
        }
    }
}

impl From<PermissionMode> for u32 {
    fn from(mode: PermissionMode) -> Self {
        mode.user as u32 | mode.group as u32 | mode.other as u32
    }
}

impl Default for PermissionMode {
    fn default() -> Self {
        Self::all()
    }
}

impl From<User> for PermissionMode {
    fn from(user: User) -> Self {
        PermissionMode::new(user, Group::None, Other::None)
    }
}

impl From<Group> for PermissionMode {
    fn from(group: Group) -> Self {
        PermissionMode::new(User::None, group, Other::None)
    }
}

impl From<Other> for PermissionMode {
    fn from(other: Other) -> Self {
        PermissionMode::new(User::None, Group::None, other)
    }
}

impl std::ops::BitOr<Group> for User {
    type Output = PermissionMode;

    fn bitor(self, rhs: Group) -> Self::Output {
        PermissionMode::new(self, rhs, Other::None)
    }
}

impl std::ops::BitOr<Other> for User {
    type Output = PermissionMode;

    fn bitor(self, rhs: Other) -> Self::Output {
        PermissionMode::new(self, Group::None, rhs)
    }
}

impl std::ops::BitOr<Other> for Group {
    type Output = PermissionMode;

    fn bitor(self, rhs: Other) -> Self::Output {
        PermissionMode::new(User::None, self, rhs)
    }
}

impl std::ops::BitOr<User> for PermissionMode {
    type Output = PermissionMode;

    fn bitor(self, rhs: User) -> Self::Output {
        PermissionMode { user: rhs, ..self }
    }
}

impl std::ops::BitOr<Group> for PermissionMode {
    type Output = PermissionMode;

    fn bitor(self, rhs: Group) -> Self::Output {
        PermissionMode { group: rhs, ..self }
    }
}

impl std::ops::BitOr<Other> for PermissionMode {
    type Output = PermissionMode;

    fn bitor(self, rhs: Other) -> Self::Output {
        PermissionMode { other: rhs, ..self }
    }
}

impl Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemType::RegularFile => write!(f, "-"),
            ItemType::Directory => write!(f, "d"),
            ItemType::SymbolicLink => write!(f, "l"),
            ItemType::CharDevice => write!(f, "c"),
            ItemType::BlockDevice => write!(f, "b"),
            ItemType::Socket => write!(f, "s"),
            ItemType::Fifo => write!(f, "p"),
        }
    }
}

impl Display for PermissionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bits = u32::from(*self);
        let flags = [
            (S_IRUSR, 'r'),
            (S_IWUSR, 'w'),
            (S_IXUSR, 'x'),
            (S_IRGRP, 'r'),
            (S_IWGRP, 'w'),
            (S_IXGRP, 'x'),
            (S_IROTH, 'r'),
            (S_IWOTH, 'w'),
            (S_IXOTH, 'x'),
        ];

        for (bit, flag) in flags {
            write!(f, "{}", if bits & bit != 0 { flag } else { '-' })?;
        }

        Ok(())
    }
}

impl Display for ItemAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "created: {}, accessed: {}, modified: {}, type: {}, mode: {}{}, size: {}, uid: {}, gid: {}, handle: {}",
            self.created_at,
            self.accessed_at,
            self.modified_at,
            self.item_type,
            self.item_type,
            self.mode,
            self.size,
            self.uid,
            self.gid,
            self.handle
        )
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
