use std::{future::Future, time::Duration};

use getset::Getters;

use crate::{
    defaults::PATH_SEPARATOR, Connector, ConnectOptions, Export, Handle, ItemPath, NfsError,
    NfsResult, Procedure, Reply, RpcChannel, StatusCode,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A session with one NFS server.
///
/// The session moves through three states:
///
/// ```text
/// Disconnected --connect--> Connected --mount_device--> Mounted
///      ^                      ^   |                        |
///      |                      |   +------unmount_device----+
///      +------disconnect------+----------------------------+
/// ```
///
/// Listing exports needs at least `Connected`; every item operation needs `Mounted`. State is
/// checked before any call is issued, so an operation in the wrong state never reaches the
/// server.
///
/// Operations take `&mut self`: a session issues one call at a time and is not meant to be
/// shared between tasks.
#[derive(Getters)]
pub struct NfsSession<C> {
    /// The options the session connects with.
    #[getset(get = "pub with_prefix")]
    options: ConnectOptions,

    pub(super) channel: Option<C>,
    pub(super) mount: Option<MountPoint>,
    pub(super) cache: Option<CachedHandle>,
}

/// The lifecycle state of a [`NfsSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No channel is open.
    Disconnected,

    /// A channel is open but no export is mounted.
    Connected,

    /// An export is mounted and its root handle is known.
    Mounted,
}

/// The mounted export.
#[derive(Debug, Clone)]
pub(super) struct MountPoint {
    pub(super) export: String,
    pub(super) prefix: ItemPath,
    pub(super) root: Handle,
}

/// The single-slot read/write cache.
#[derive(Debug, Clone)]
pub(super) struct CachedHandle {
    pub(super) path: String,
    pub(super) handle: Handle,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl<C> NfsSession<C>
where
    C: RpcChannel,
{
    /// Creates a disconnected session.
    pub fn new(options: ConnectOptions) -> Self {
        Self {
            options,
            channel: None,
            mount: None,
            cache: None,
        }
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> SessionState {
        match (&self.channel, &self.mount) {
            (None, _) => SessionState::Disconnected,
            (Some(_), None) => SessionState::Connected,
            (Some(_), Some(_)) => SessionState::Mounted,
        }
    }

    /// Returns the name of the mounted export.
    pub fn mounted_export(&self) -> Option<&str> {
        self.mount.as_ref().map(|mount| mount.export.as_str())
    }

    /// Returns the root handle of the mounted export.
    pub fn root_handle(&self) -> Option<&Handle> {
        self.mount.as_ref().map(|mount| &mount.root)
    }

    /// Returns the path held by the read/write cache.
    pub fn cached_path(&self) -> Option<&str> {
        self.cache.as_ref().map(|cache| cache.path.as_str())
    }

    /// Opens a channel using `connector`.
    ///
    /// A session that is already connected is disconnected first.
    ///
    /// ## Errors
    ///
    /// Returns [`NfsError::Connect`] if the connector fails or does not finish within the
    /// configured timeout.
    pub async fn connect<K>(&mut self, connector: &K) -> NfsResult<()>
    where
        K: Connector<Channel = C>,
    {
        if self.channel.is_some() {
            self.disconnect().await;
        }

        let timeout = self.options.get_timeout();
        let channel = tokio::time::timeout(timeout, connector.connect(&self.options))
            .await
            .map_err(|_| {
                tracing::warn!("connect to {} timed out after {:?}", self.options.address(), timeout);
                NfsError::connect(anyhow::anyhow!("timed out after {:?}", timeout))
            })??;

        tracing::debug!(
            "connected to {} over {} as {}:{}",
            self.options.address(),
            self.options.get_transport(),
            self.options.get_uid(),
            self.options.get_gid()
        );

        self.channel = Some(channel);
        Ok(())
    }

    /// Closes the channel and clears the mount and the read/write cache.
    ///
    /// Disconnecting does not send an unmount request. Calling it on a disconnected session
    /// does nothing.
    pub async fn disconnect(&mut self) {
        self.mount = None;
        self.cache = None;

        if let Some(mut channel) = self.channel.take() {
            channel.close().await;
            tracing::debug!("disconnected from {}", self.options.address());
        }
    }

    /// Returns the names of the exports the server offers, in server order.
    ///
    /// ## Errors
    ///
    /// Returns [`NfsError::NotConnected`] if no channel is open.
    pub async fn get_exported_devices(&mut self) -> NfsResult<Vec<String>> {
        let exports = self.get_exports().await?;
        Ok(exports.into_iter().map(|export| export.directory).collect())
    }

    /// Returns the exports the server offers together with their allowed client groups.
    pub async fn get_exports(&mut self) -> NfsResult<Vec<Export>> {
        self.ensure_connected()?;

        let timeout = self.timeout();
        let list = deliver(Procedure::Export, timeout, self.channel()?.export()).await?;
        let exports = Export::collect(list.as_deref());

        tracing::trace!("export: {} entries", exports.len());
        Ok(exports)
    }

    /// Mounts `export` and captures its root handle.
    ///
    /// Mounting while already mounted releases the previous mount locally, without an unmount
    /// request, and always clears the read/write cache. If the server refuses the mount the
    /// session is left `Connected`. An invalid export name is rejected before anything changes.
    ///
    /// ## Errors
    ///
    /// Returns [`NfsError::NotConnected`] if no channel is open, [`NfsError::InvalidPath`] before
    /// any call if `export` has a `..` segment or a NUL byte, or a status error if the server refuses the
    /// mount.
    pub async fn mount_device(&mut self, export: &str) -> NfsResult<()> {
        self.ensure_connected()?;
        let prefix = ItemPath::parse(export)?;

        if let Some(previous) = self.mount.take() {
            tracing::debug!("releasing mount of {} for remount", previous.export);
        }
        self.cache = None;

        let timeout = self.timeout();
        let fh = settle(Procedure::Mount, timeout, self.channel()?.mount(export)).await?;
        let root = Handle::try_from(fh)?;

        tracing::debug!("mounted {} with root handle {}", export, root);
        self.mount = Some(MountPoint {
            export: export.to_string(),
            prefix,
            root,
        });

        Ok(())
    }

    /// Unmounts the mounted export and returns the session to `Connected`.
    ///
    /// The mount and the read/write cache are cleared before the request is sent, so they are
    /// gone even if the request fails. Calling it on a connected session with nothing mounted
    /// does nothing.
    pub async fn unmount_device(&mut self) -> NfsResult<()> {
        self.ensure_connected()?;

        let Some(mount) = self.mount.take() else {
            return Ok(());
        };
        self.cache = None;

        let timeout = self.timeout();
        deliver(
            Procedure::Unmount,
            timeout,
            self.channel()?.unmount(&mount.export),
        )
        .await?;

        tracing::debug!("unmounted {}", mount.export);
        Ok(())
    }

    pub(super) fn timeout(&self) -> Duration {
        self.options.get_timeout()
    }

    pub(super) fn channel(&mut self) -> NfsResult<&mut C> {
        self.channel.as_mut().ok_or(NfsError::NotConnected)
    }

    pub(super) fn ensure_connected(&self) -> NfsResult<()> {
        if self.channel.is_none() {
            return Err(NfsError::NotConnected);
        }

        Ok(())
    }

    pub(super) fn ensure_mounted(&self) -> NfsResult<&MountPoint> {
        self.ensure_connected()?;
        self.mount.as_ref().ok_or(NfsError::NotMounted)
    }

    /// Parses `path` relative to the export root.
    ///
    /// An absolute path that starts with the export name has it stripped. Relative paths are
    /// always walked as given.
    pub(super) fn item_path(&self, path: &str) -> NfsResult<ItemPath> {
        let mount = self.ensure_mounted()?;
        let parsed = ItemPath::parse(path)?;
        if !path.starts_with(PATH_SEPARATOR) {
            return Ok(parsed);
        }

        Ok(parsed.strip_prefix(&mount.prefix))
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Awaits `call` under `timeout`, mapping a missing response and an elapsed timeout to transport
/// errors.
pub(super) async fn deliver<T>(
    procedure: Procedure,
    timeout: Duration,
    call: impl Future<Output = Option<T>>,
) -> NfsResult<T> {
    match tokio::time::timeout(timeout, call).await {
        Ok(Some(reply)) => Ok(reply),
        Ok(None) => {
            tracing::warn!("{}: no response from server", procedure);
            Err(NfsError::GeneralFailure(procedure))
        }
        Err(_) => {
            tracing::warn!("{}: timed out after {:?}", procedure, timeout);
            Err(NfsError::Timeout { procedure, timeout })
        }
    }
}

/// Like [`deliver`], and additionally maps a failure status to a status error.
pub(super) async fn settle<T, S>(
    procedure: Procedure,
    timeout: Duration,
    call: impl Future<Output = Reply<T, S>>,
) -> NfsResult<T>
where
    S: StatusCode,
{
    deliver(procedure, timeout, call)
        .await?
        .map_err(|status| status.to_error(procedure))
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl<C> std::fmt::Debug for NfsSession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NfsSession")
            .field("options", &self.options)
            .field("connected", &self.channel.is_some())
            .field("mount", &self.mount)
            .field("cache", &self.cache)
            .finish()
    }
}
