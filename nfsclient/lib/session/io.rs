use crate::{
    Handle, NfsError, NfsResult, Procedure, ReadArgs, RpcChannel, StableHow, WriteArgs,
};

use super::session::{settle, CachedHandle, NfsSession};

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

/// Offset based reads and writes through the single-slot handle cache.
///
/// The session remembers the handle of the last path it read or wrote. A later read or write of
/// exactly the same path string reuses that handle without a lookup. The cache has no expiry or
/// change detection; call [`complete_io`](NfsSession::complete_io) when the file may have been
/// replaced behind the session's back.
impl<C> NfsSession<C>
where
    C: RpcChannel,
{
    /// Reads up to `count` bytes at `offset` of the file at `path` into the start of `buffer`.
    ///
    /// Returns the number of bytes read, which is smaller than `count` near the end of the file.
    ///
    /// ## Errors
    ///
    /// Returns [`NfsError::BufferTooSmall`] before any call is made if `buffer` cannot hold
    /// `count` bytes. If resolving `path` fails the cache is left as it was.
    pub async fn read(
        &mut self,
        path: &str,
        offset: u64,
        count: u32,
        buffer: &mut [u8],
    ) -> NfsResult<usize> {
        self.ensure_mounted()?;
        check_capacity(count, buffer.len())?;

        let file = self.io_handle(path).await?;
        tracing::trace!("read: {} at {}, count: {}", path, offset, count);

        let args = ReadArgs {
            file: file.to_wire(),
            offset,
            count,
        };

        let timeout = self.timeout();
        let read = settle(Procedure::Read, timeout, self.channel()?.read(args)).await?;

        let len = read.data.len().min(count as usize);
        buffer[..len].copy_from_slice(&read.data[..len]);
        Ok(len)
    }

    /// Writes the first `count` bytes of `buffer` at `offset` of the file at `path`.
    ///
    /// Returns the number of bytes the server accepted, which may be less than `count`. The rest
    /// is not retried. `buffer` is never modified.
    ///
    /// ## Errors
    ///
    /// Returns [`NfsError::BufferTooSmall`] before any call is made if `buffer` is shorter than
    /// `count`.
    pub async fn write(
        &mut self,
        path: &str,
        offset: u64,
        count: u32,
        buffer: &[u8],
    ) -> NfsResult<u32> {
        self.ensure_mounted()?;
        check_capacity(count, buffer.len())?;

        let file = self.io_handle(path).await?;
        tracing::debug!("write: {} at {}, count: {}", path, offset, count);

        let args = WriteArgs {
            file: file.to_wire(),
            offset,
            count,
            stable: StableHow::Unstable,
            data: buffer[..count as usize].to_vec(),
        };

        let timeout = self.timeout();
        let written = settle(Procedure::Write, timeout, self.channel()?.write(args)).await?;
        Ok(written.count)
    }

    /// Forgets the cached path and handle.
    pub fn complete_io(&mut self) {
        if let Some(cache) = self.cache.take() {
            tracing::trace!("dropping cached handle for {}", cache.path);
        }
    }

    /// Returns the handle for `path`, from the cache when the path matches exactly.
    async fn io_handle(&mut self, path: &str) -> NfsResult<Handle> {
        if let Some(cache) = self.cache.as_ref().filter(|cache| cache.path == path) {
            return Ok(cache.handle.clone());
        }

        let attributes = self.get_item_attributes(path).await?;
        let handle = attributes.get_handle().clone();
        self.cache = Some(CachedHandle {
            path: path.to_string(),
            handle: handle.clone(),
        });

        Ok(handle)
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

fn check_capacity(count: u32, capacity: usize) -> NfsResult<()> {
    let count = count as usize;
    if count > capacity {
        return Err(NfsError::BufferTooSmall { count, capacity });
    }

    Ok(())
}
