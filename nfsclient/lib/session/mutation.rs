use nfsserve::nfs::diropargs3;

use crate::{
    CreateArgs, CreateHow, CreateMode, Handle, MkdirArgs, NfsResult, PathSegment, PermissionMode,
    Procedure, RenameArgs, RpcChannel, SetAttrArgs, SetAttrGuard, SetAttributes,
};

use super::session::{settle, NfsSession};

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

/// Create, delete, rename and resize.
impl<C> NfsSession<C>
where
    C: RpcChannel,
{
    /// Creates a directory at `path` with access rights `mode`.
    ///
    /// The directory is owned by the session's uid and gid; its timestamps are left to the
    /// server.
    ///
    /// ## Errors
    ///
    /// Fails with a `NotFound` status error if the parent directory does not exist.
    pub async fn create_directory(&mut self, path: &str, mode: PermissionMode) -> NfsResult<()> {
        let (parent, name) = self.resolve_parent(path).await?;
        tracing::debug!("mkdir: {} (mode {})", path, mode);

        let args = MkdirArgs {
            location: location(&parent, &name),
            attributes: SetAttributes::builder()
                .mode(u32::from(mode))
                .uid(self.get_options().get_uid())
                .gid(self.get_options().get_gid())
                .build()
                .into(),
        };

        let timeout = self.timeout();
        settle(Procedure::Mkdir, timeout, self.channel()?.mkdir(args)).await?;
        Ok(())
    }

    /// Removes the empty directory at `path`.
    pub async fn delete_directory(&mut self, path: &str) -> NfsResult<()> {
        let (parent, name) = self.resolve_parent(path).await?;
        tracing::debug!("rmdir: {}", path);

        let timeout = self.timeout();
        settle(
            Procedure::Rmdir,
            timeout,
            self.channel()?.rmdir(location(&parent, &name)),
        )
        .await
    }

    /// Removes the file at `path`.
    pub async fn delete_file(&mut self, path: &str) -> NfsResult<()> {
        let (parent, name) = self.resolve_parent(path).await?;
        tracing::debug!("remove: {}", path);

        let timeout = self.timeout();
        settle(
            Procedure::Remove,
            timeout,
            self.channel()?.remove(location(&parent, &name)),
        )
        .await
    }

    /// Creates an empty regular file at `path` with access rights `mode`.
    ///
    /// Creation is unchecked: an existing file of the same name is not an error. The file is
    /// owned by the session's uid and gid and starts with size zero.
    pub async fn create_file(&mut self, path: &str, mode: PermissionMode) -> NfsResult<()> {
        let (parent, name) = self.resolve_parent(path).await?;
        tracing::debug!("create: {} (mode {})", path, mode);

        let args = CreateArgs {
            location: location(&parent, &name),
            how: CreateHow {
                mode: CreateMode::Unchecked,
                attributes: SetAttributes::builder()
                    .mode(u32::from(mode))
                    .uid(self.get_options().get_uid())
                    .gid(self.get_options().get_gid())
                    .size(0)
                    .build()
                    .into(),
                verifier: Default::default(),
            },
        };

        let timeout = self.timeout();
        settle(Procedure::Create, timeout, self.channel()?.create(args)).await?;
        Ok(())
    }

    /// Moves `old_name` in directory `old_directory` to `new_name` in `new_directory`.
    ///
    /// Both directories are resolved in full before the rename is sent; if either fails nothing
    /// is renamed.
    pub async fn move_item(
        &mut self,
        old_directory: &str,
        old_name: &str,
        new_directory: &str,
        new_name: &str,
    ) -> NfsResult<()> {
        let from_path = self.item_path(old_directory)?;
        let to_path = self.item_path(new_directory)?;
        let old_name = PathSegment::try_from(old_name)?;
        let new_name = PathSegment::try_from(new_name)?;

        let from = self.resolve(&from_path).await?;
        let to = self.resolve(&to_path).await?;

        tracing::debug!(
            "rename: {}/{} -> {}/{}",
            from_path,
            old_name,
            to_path,
            new_name
        );

        let args = RenameArgs {
            from: location(from.get_handle(), &old_name),
            to: location(to.get_handle(), &new_name),
        };

        let timeout = self.timeout();
        settle(Procedure::Rename, timeout, self.channel()?.rename(args)).await
    }

    /// Truncates or extends the file at `path` to `size` bytes.
    ///
    /// The current mode is sent back unchanged, owner and group are not touched, timestamps are
    /// left to the server and no ctime guard is used.
    pub async fn set_file_size(&mut self, path: &str, size: u64) -> NfsResult<()> {
        let attributes = self.get_item_attributes(path).await?;
        tracing::debug!("setattr: {} (size {})", path, size);

        let args = SetAttrArgs {
            object: attributes.get_handle().to_wire(),
            attributes: SetAttributes::builder()
                .mode(u32::from(attributes.get_mode()))
                .size(size)
                .build()
                .into(),
            guard: SetAttrGuard::None,
        };

        let timeout = self.timeout();
        settle(Procedure::SetAttr, timeout, self.channel()?.setattr(args)).await
    }

    /// Resolves the parent directory of `path` and returns its handle with the leaf name.
    async fn resolve_parent(&mut self, path: &str) -> NfsResult<(Handle, PathSegment)> {
        let (parent, name) = self.item_path(path)?.split_leaf()?;
        let parent = self.resolve(&parent).await?;
        Ok((parent.get_handle().clone(), name))
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

fn location(dir: &Handle, name: &PathSegment) -> diropargs3 {
    diropargs3 {
        dir: dir.to_wire(),
        name: name.to_filename(),
    }
}
