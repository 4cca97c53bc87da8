use std::fmt::{self, Display};

use nfsserve::nfs::{nfs_fh3, NFS3_FHSIZE};

use crate::{NfsError, NfsResult};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// An opaque, server-issued file handle.
///
/// Handles are only meaningful within the session that obtained them. The bytes are owned by the
/// handle and cannot be modified after creation; every conversion to or from the wire form copies
/// them.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Handle(Box<[u8]>);

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Handle {
    /// Creates a handle from a copy of the given bytes.
    ///
    /// ## Errors
    ///
    /// Returns [`NfsError::InvalidHandle`] if the bytes exceed the protocol's handle size limit.
    pub fn new(bytes: impl AsRef<[u8]>) -> NfsResult<Self> {
        let bytes = bytes.as_ref();
        if bytes.len() > NFS3_FHSIZE as usize {
            return Err(NfsError::InvalidHandle(bytes.len()));
        }

        Ok(Self(bytes.into()))
    }

    /// Returns the handle bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length of the handle in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the handle has no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the wire form of the handle.
    pub fn to_wire(&self) -> nfs_fh3 {
        nfs_fh3 {
            data: self.0.to_vec(),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl TryFrom<&nfs_fh3> for Handle {
    type Error = NfsError;

    fn try_from(fh: &nfs_fh3) -> Result<Self, Self::Error> {
        Handle::new(&fh.data)
    }
}

impl TryFrom<nfs_fh3> for Handle {
    type Error = NfsError;

    fn try_from(fh: nfs_fh3) -> Result<Self, Self::Error> {
        Handle::try_from(&fh)
    }
}

impl From<&Handle> for nfs_fh3 {
    fn from(handle: &Handle) -> Self {
        handle.to_wire()
    }
}

impl AsRef<[u8]> for Handle {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode_upper(&self.0))
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
