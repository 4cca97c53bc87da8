use nfsserve::nfs::{diropargs3, filename3};

use crate::{
    defaults::ROOT_MARKER, Handle, ItemAttributes, ItemPath, NfsError, NfsResult, Procedure,
    RpcChannel,
};

use super::session::{settle, NfsSession};

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

/// Path resolution.
impl<C> NfsSession<C>
where
    C: RpcChannel,
{
    /// Returns the attributes of the item at `path`.
    ///
    /// The path is walked from the export root with one lookup per segment. An empty path, or
    /// `/`, resolves the root itself.
    ///
    /// ## Errors
    ///
    /// Returns [`NfsError::NotMounted`] outside the `Mounted` state, or the status error of the
    /// first lookup that fails. No partial result is returned.
    pub async fn get_item_attributes(&mut self, path: &str) -> NfsResult<ItemAttributes> {
        let path = self.item_path(path)?;
        self.resolve(&path).await
    }

    /// Returns `true` if `path` names a directory.
    pub async fn is_directory(&mut self, path: &str) -> NfsResult<bool> {
        Ok(self.get_item_attributes(path).await?.is_directory())
    }

    /// Looks up a single `name` in the directory identified by `directory`.
    pub async fn lookup(&mut self, name: &str, directory: &Handle) -> NfsResult<ItemAttributes> {
        self.ensure_mounted()?;
        if name.is_empty() {
            return Err(NfsError::InvalidPath(name.to_string()));
        }

        self.lookup_in(directory, filename3::from(name.as_bytes()))
            .await
    }

    /// Returns the current attributes of the object identified by `handle`.
    pub async fn get_attributes(&mut self, handle: &Handle) -> NfsResult<ItemAttributes> {
        self.ensure_mounted()?;
        tracing::trace!("getattr: handle: {}", handle);

        let timeout = self.timeout();
        let attributes = settle(
            Procedure::GetAttr,
            timeout,
            self.channel()?.getattr(handle.to_wire()),
        )
        .await?;

        Ok(ItemAttributes::from_wire(&attributes, handle.clone()))
    }

    /// Walks `path` from the export root.
    pub(super) async fn resolve(&mut self, path: &ItemPath) -> NfsResult<ItemAttributes> {
        let root = self.ensure_mounted()?.root.clone();

        let Some((first, rest)) = path.segments().split_first() else {
            return self
                .lookup_in(&root, filename3::from(ROOT_MARKER.as_bytes()))
                .await;
        };

        let mut attributes = self.lookup_in(&root, first.to_filename()).await?;
        for segment in rest {
            let cursor = attributes.get_handle().clone();
            attributes = self.lookup_in(&cursor, segment.to_filename()).await?;
        }

        Ok(attributes)
    }

    async fn lookup_in(&mut self, dir: &Handle, name: filename3) -> NfsResult<ItemAttributes> {
        tracing::trace!(
            "lookup: dir: {}, name: {}",
            dir,
            String::from_utf8_lossy(&name.0)
        );

        let timeout = self.timeout();
        let what = diropargs3 {
            dir: dir.to_wire(),
            name,
        };
        let found = settle(Procedure::Lookup, timeout, self.channel()?.lookup(what)).await?;

        let handle = Handle::try_from(found.handle)?;
        Ok(ItemAttributes::from_wire(&found.attributes, handle))
    }
}
