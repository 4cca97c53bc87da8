//! An in-memory NFS server that answers channel calls directly, for driving sessions in tests.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use async_trait::async_trait;
use nfsclient::{
    ConnectOptions, Connector, CreateArgs, DirEntry, ExportList, ExportNode, LookupOk, MkdirArgs,
    MountStatus, NfsError, NfsResult, NfsSession, Procedure, ReadArgs, ReadDirArgs, ReadDirOk,
    ReadOk, RenameArgs, Reply, RpcChannel, SetAttrArgs, StableHow, WriteArgs, WriteOk,
};
use nfsserve::nfs::{
    cookieverf3, diropargs3, fattr3, filename3, ftype3, nfs_fh3, nfsstat3, nfstime3, set_gid3,
    set_mode3, set_size3, set_uid3, specdata3,
};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// The export every test mounts.
pub const EXPORT: &str = "/export/home";

/// The verifier the server hands out with every READDIR page.
pub const COOKIE_VERIFIER: cookieverf3 = [0x5a; 8];

const ROOT_ID: u64 = 1;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A failure forced onto a procedure.
#[derive(Debug, Clone)]
pub enum Failure {
    /// Answer with a status code.
    Status(nfsstat3),

    /// Produce no response object.
    NoResponse,

    /// Answer normally after a delay.
    Delay(Duration),
}

/// A failure that applies once a procedure has been called `after` times.
#[derive(Debug, Clone)]
pub struct Injection {
    pub after: usize,
    pub failure: Failure,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Directory(Vec<u64>),
    File(Vec<u8>),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub parent: u64,
    pub kind: NodeKind,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
}

/// Everything the server knows and records.
#[derive(Debug, Default)]
pub struct ServerState {
    pub nodes: HashMap<u64, Node>,
    pub next_id: u64,
    pub exports: Vec<(String, Vec<String>)>,
    pub calls: HashMap<Procedure, usize>,
    pub failures: HashMap<Procedure, Injection>,
    pub page_size: usize,
    pub write_limit: Option<usize>,
    pub connected_as: Option<(u32, u32)>,
    pub last_mkdir: Option<MkdirArgs>,
    pub last_create: Option<CreateArgs>,
    pub last_setattr: Option<SetAttrArgs>,
    pub last_write: Option<WriteArgs>,
    pub readdir_requests: Vec<(u64, cookieverf3, u32)>,
    pub unmounted: Vec<String>,
    pub closed: bool,
}

/// The server, shared between the test and the session's channel.
#[derive(Debug, Clone)]
pub struct MemoryServer {
    state: Arc<Mutex<ServerState>>,
}

/// Hands out channels to a [`MemoryServer`].
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    pub server: MemoryServer,
    pub refuse: bool,
}

enum Intercept {
    Proceed,
    Drop,
    Status(nfsstat3),
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl MemoryServer {
    /// Creates a server with an empty root directory, two exports and three entries per page.
    pub fn new() -> Self {
        let mut state = ServerState {
            next_id: ROOT_ID + 1,
            page_size: 3,
            exports: vec![
                (EXPORT.to_string(), vec!["staff".to_string()]),
                ("/export/media".to_string(), vec![]),
            ],
            ..Default::default()
        };

        state.nodes.insert(
            ROOT_ID,
            Node {
                name: String::new(),
                parent: ROOT_ID,
                kind: NodeKind::Directory(Vec::new()),
                mode: 0o755,
                uid: 0,
                gid: 0,
            },
        );

        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap()
    }

    /// Creates every missing directory along `path`.
    pub fn add_dir(&self, path: &str) -> u64 {
        let mut state = self.state();
        let mut current = ROOT_ID;
        for name in segments(path) {
            current = match state.child(current, name.as_bytes()) {
                Some(id) => id,
                None => state.insert(current, name, NodeKind::Directory(Vec::new()), 0o755),
            };
        }

        current
    }

    /// Creates a file at `path`, creating missing parent directories.
    pub fn add_file(&self, path: &str, content: &[u8]) -> u64 {
        let (parent, name) = split(path);
        let parent = self.add_dir(&parent);
        self.state()
            .insert(parent, &name, NodeKind::File(content.to_vec()), 0o644)
    }

    pub fn find(&self, path: &str) -> Option<u64> {
        let state = self.state();
        let found = segments(path).try_fold(ROOT_ID, |dir, name| state.child(dir, name.as_bytes()));
        found
    }

    pub fn content(&self, path: &str) -> Option<Vec<u8>> {
        let id = self.find(path)?;
        match &self.state().nodes.get(&id)?.kind {
            NodeKind::File(data) => Some(data.clone()),
            NodeKind::Directory(_) => None,
        }
    }

    pub fn node(&self, path: &str) -> Option<Node> {
        let id = self.find(path)?;
        self.state().nodes.get(&id).cloned()
    }

    /// Removes the entry at `path` behind the session's back.
    pub fn remove(&self, path: &str) {
        if let Some(id) = self.find(path) {
            let mut state = self.state();
            state.detach(id);
            state.nodes.remove(&id);
        }
    }

    pub fn handle(&self, path: &str) -> Option<nfs_fh3> {
        self.find(path).map(to_fh)
    }

    pub fn calls(&self, procedure: Procedure) -> usize {
        self.state().calls.get(&procedure).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.state().calls.values().sum()
    }

    pub fn fail(&self, procedure: Procedure, failure: Failure) {
        self.fail_after(procedure, 0, failure);
    }

    pub fn fail_after(&self, procedure: Procedure, after: usize, failure: Failure) {
        self.state()
            .failures
            .insert(procedure, Injection { after, failure });
    }

    pub fn clear_failures(&self) {
        self.state().failures.clear();
    }

    pub fn set_page_size(&self, page_size: usize) {
        self.state().page_size = page_size;
    }

    pub fn set_write_limit(&self, limit: usize) {
        self.state().write_limit = Some(limit);
    }

    pub fn connector(&self) -> MemoryConnector {
        MemoryConnector {
            server: self.clone(),
            refuse: false,
        }
    }

    async fn intercept(&self, procedure: Procedure) -> Intercept {
        let failure = {
            let mut state = self.state();
            let seen = state.calls.entry(procedure).or_insert(0);
            let index = *seen;
            *seen += 1;

            state
                .failures
                .get(&procedure)
                .filter(|injection| index >= injection.after)
                .map(|injection| injection.failure.clone())
        };

        match failure {
            None => Intercept::Proceed,
            Some(Failure::NoResponse) => Intercept::Drop,
            Some(Failure::Status(status)) => Intercept::Status(status),
            Some(Failure::Delay(delay)) => {
                tokio::time::sleep(delay).await;
                Intercept::Proceed
            }
        }
    }
}

impl ServerState {
    fn child(&self, dir: u64, name: &[u8]) -> Option<u64> {
        match &self.nodes.get(&dir)?.kind {
            NodeKind::Directory(children) => children
                .iter()
                .copied()
                .find(|id| self.nodes[id].name.as_bytes() == name),
            NodeKind::File(_) => None,
        }
    }

    fn insert(&mut self, parent: u64, name: &str, kind: NodeKind, mode: u32) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.nodes.insert(
            id,
            Node {
                name: name.to_string(),
                parent,
                kind,
                mode,
                uid: 0,
                gid: 0,
            },
        );

        if let Some(Node {
            kind: NodeKind::Directory(children),
            ..
        }) = self.nodes.get_mut(&parent)
        {
            children.push(id);
        }

        id
    }

    fn detach(&mut self, id: u64) {
        let parent = self.nodes[&id].parent;
        if let Some(Node {
            kind: NodeKind::Directory(children),
            ..
        }) = self.nodes.get_mut(&parent)
        {
            children.retain(|child| *child != id);
        }
    }

    fn node_id(&self, fh: &nfs_fh3) -> Result<u64, nfsstat3> {
        let bytes: [u8; 8] = fh
            .data
            .as_slice()
            .try_into()
            .map_err(|_| nfsstat3::NFS3ERR_BADHANDLE)?;
        let id = u64::from_be_bytes(bytes);
        if self.nodes.contains_key(&id) {
            Ok(id)
        } else {
            Err(nfsstat3::NFS3ERR_STALE)
        }
    }

    fn directory(&self, fh: &nfs_fh3) -> Result<u64, nfsstat3> {
        let id = self.node_id(fh)?;
        match self.nodes[&id].kind {
            NodeKind::Directory(_) => Ok(id),
            NodeKind::File(_) => Err(nfsstat3::NFS3ERR_NOTDIR),
        }
    }

    fn file_mut(&mut self, fh: &nfs_fh3) -> Result<&mut Vec<u8>, nfsstat3> {
        let id = self.node_id(fh)?;
        match &mut self.nodes.get_mut(&id).ok_or(nfsstat3::NFS3ERR_STALE)?.kind {
            NodeKind::File(data) => Ok(data),
            NodeKind::Directory(_) => Err(nfsstat3::NFS3ERR_ISDIR),
        }
    }

    fn attributes(&self, id: u64) -> fattr3 {
        let node = &self.nodes[&id];
        let (ftype, size, nlink) = match &node.kind {
            NodeKind::Directory(_) => (ftype3::NF3DIR, 4096, 2),
            NodeKind::File(data) => (ftype3::NF3REG, data.len() as u64, 1),
        };

        fattr3 {
            ftype,
            mode: node.mode,
            nlink,
            uid: node.uid,
            gid: node.gid,
            size,
            used: size,
            rdev: specdata3::default(),
            fsid: 1,
            fileid: id,
            atime: nfstime3 {
                seconds: 1_700_000_000 + id as u32,
                nseconds: 123_456_789,
            },
            mtime: nfstime3 {
                seconds: 1_690_000_000 + id as u32,
                nseconds: 987_654_321,
            },
            ctime: nfstime3 {
                seconds: 1_600_000_000,
                nseconds: 1,
            },
        }
    }

    fn make(
        &mut self,
        location: &diropargs3,
        kind: NodeKind,
        mode: set_mode3,
        uid: set_uid3,
        gid: set_gid3,
    ) -> Result<u64, nfsstat3> {
        let parent = self.directory(&location.dir)?;
        let name = String::from_utf8_lossy(&location.name.0).into_owned();
        let id = self.insert(parent, &name, kind, 0o644);

        let node = self.nodes.get_mut(&id).ok_or(nfsstat3::NFS3ERR_SERVERFAULT)?;
        if let set_mode3::mode(mode) = mode {
            node.mode = mode;
        }
        if let set_uid3::uid(uid) = uid {
            node.uid = uid;
        }
        if let set_gid3::gid(gid) = gid {
            node.gid = gid;
        }

        Ok(id)
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Connects and mounts [`EXPORT`] as uid 1000, gid 100.
pub async fn mounted_session(server: &MemoryServer) -> anyhow::Result<NfsSession<MemoryServer>> {
    let mut session = connected_session(server).await?;
    session.mount_device(EXPORT).await?;
    Ok(session)
}

/// Connects as uid 1000, gid 100 without mounting.
pub async fn connected_session(
    server: &MemoryServer,
) -> anyhow::Result<NfsSession<MemoryServer>> {
    let options = ConnectOptions::builder()
        .host("127.0.0.1")
        .uid(1000)
        .gid(100)
        .timeout(Duration::from_secs(2))
        .build();

    let mut session = NfsSession::new(options);
    session.connect(&server.connector()).await?;
    Ok(session)
}

pub fn to_fh(id: u64) -> nfs_fh3 {
    nfs_fh3 {
        data: id.to_be_bytes().to_vec(),
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

fn split(path: &str) -> (String, String) {
    let mut names: Vec<&str> = segments(path).collect();
    let name = names.pop().unwrap_or_default().to_string();
    (names.join("/"), name)
}

macro_rules! intercept {
    ($server:expr, $procedure:expr) => {
        match $server.intercept($procedure).await {
            Intercept::Proceed => {}
            Intercept::Drop => return None,
            Intercept::Status(status) => return Some(Err(status)),
        }
    };
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

#[async_trait]
impl RpcChannel for MemoryServer {
    async fn mount(&mut self, dirpath: &str) -> Reply<nfs_fh3, MountStatus> {
        match self.intercept(Procedure::Mount).await {
            Intercept::Proceed => {}
            Intercept::Drop => return None,
            Intercept::Status(status) => {
                let status =
                    MountStatus::from_code(status as u32).unwrap_or(MountStatus::ServerFault);
                return Some(Err(status));
            }
        }

        let state = self.state();
        if state.exports.iter().any(|(dir, _)| dir == dirpath) {
            Some(Ok(to_fh(ROOT_ID)))
        } else {
            Some(Err(MountStatus::NoEnt))
        }
    }

    async fn unmount(&mut self, dirpath: &str) -> Option<()> {
        if !matches!(self.intercept(Procedure::Unmount).await, Intercept::Proceed) {
            return None;
        }

        self.state().unmounted.push(dirpath.to_string());
        Some(())
    }

    async fn export(&mut self) -> Option<ExportList> {
        if !matches!(self.intercept(Procedure::Export).await, Intercept::Proceed) {
            return None;
        }

        let exports = self.state().exports.clone();
        Some(ExportNode::from_exports(exports))
    }

    async fn getattr(&mut self, object: nfs_fh3) -> Reply<fattr3> {
        intercept!(self, Procedure::GetAttr);

        let state = self.state();
        Some(state.node_id(&object).map(|id| state.attributes(id)))
    }

    async fn setattr(&mut self, args: SetAttrArgs) -> Reply<()> {
        intercept!(self, Procedure::SetAttr);

        let mut state = self.state();
        state.last_setattr = Some(args.clone());

        let result = (|| -> Result<(), nfsstat3> {
            if let set_size3::size(size) = args.attributes.size {
                state.file_mut(&args.object)?.resize(size as usize, 0);
            }

            let id = state.node_id(&args.object)?;
            let node = state.nodes.get_mut(&id).ok_or(nfsstat3::NFS3ERR_STALE)?;
            if let set_mode3::mode(mode) = args.attributes.mode {
                node.mode = mode;
            }
            if let set_uid3::uid(uid) = args.attributes.uid {
                node.uid = uid;
            }
            if let set_gid3::gid(gid) = args.attributes.gid {
                node.gid = gid;
            }

            Ok(())
        })();

        Some(result)
    }

    async fn lookup(&mut self, what: diropargs3) -> Reply<LookupOk> {
        intercept!(self, Procedure::Lookup);

        let state = self.state();
        let result = state.directory(&what.dir).and_then(|dir| {
            let id = match what.name.0.as_slice() {
                b"." => dir,
                b".." => state.nodes[&dir].parent,
                name => state.child(dir, name).ok_or(nfsstat3::NFS3ERR_NOENT)?,
            };

            Ok(LookupOk {
                handle: to_fh(id),
                attributes: state.attributes(id),
            })
        });

        Some(result)
    }

    async fn read(&mut self, args: ReadArgs) -> Reply<ReadOk> {
        intercept!(self, Procedure::Read);

        let mut state = self.state();
        let result = state.file_mut(&args.file).map(|data| {
            let start = (args.offset as usize).min(data.len());
            let end = (start + args.count as usize).min(data.len());
            ReadOk {
                data: data[start..end].to_vec(),
                eof: end == data.len(),
            }
        });

        Some(result)
    }

    async fn write(&mut self, args: WriteArgs) -> Reply<WriteOk> {
        intercept!(self, Procedure::Write);

        let mut state = self.state();
        state.last_write = Some(args.clone());
        let limit = state
            .write_limit
            .unwrap_or(args.data.len())
            .min(args.data.len());

        let result = state.file_mut(&args.file).map(|data| {
            let start = args.offset as usize;
            let end = start + limit;
            if data.len() < end {
                data.resize(end, 0);
            }
            data[start..end].copy_from_slice(&args.data[..limit]);

            WriteOk {
                count: limit as u32,
                committed: StableHow::FileSync,
            }
        });

        Some(result)
    }

    async fn create(&mut self, args: CreateArgs) -> Reply<Option<nfs_fh3>> {
        intercept!(self, Procedure::Create);

        let mut state = self.state();
        state.last_create = Some(args.clone());

        let result = state.directory(&args.location.dir).and_then(|dir| {
            let attributes = args.how.attributes;
            match state.child(dir, &args.location.name.0) {
                Some(id) => {
                    if let set_size3::size(size) = attributes.size {
                        state.file_mut(&to_fh(id))?.resize(size as usize, 0);
                    }
                    Ok(Some(to_fh(id)))
                }
                None => state
                    .make(
                        &args.location,
                        NodeKind::File(Vec::new()),
                        attributes.mode,
                        attributes.uid,
                        attributes.gid,
                    )
                    .map(|id| Some(to_fh(id))),
            }
        });

        Some(result)
    }

    async fn mkdir(&mut self, args: MkdirArgs) -> Reply<Option<nfs_fh3>> {
        intercept!(self, Procedure::Mkdir);

        let mut state = self.state();
        state.last_mkdir = Some(args.clone());

        let result = state.directory(&args.location.dir).and_then(|dir| {
            if state.child(dir, &args.location.name.0).is_some() {
                return Err(nfsstat3::NFS3ERR_EXIST);
            }

            let attributes = args.attributes;
            state
                .make(
                    &args.location,
                    NodeKind::Directory(Vec::new()),
                    attributes.mode,
                    attributes.uid,
                    attributes.gid,
                )
                .map(|id| Some(to_fh(id)))
        });

        Some(result)
    }

    async fn remove(&mut self, object: diropargs3) -> Reply<()> {
        intercept!(self, Procedure::Remove);

        let mut state = self.state();
        let result = state.directory(&object.dir).and_then(|dir| {
            let id = state
                .child(dir, &object.name.0)
                .ok_or(nfsstat3::NFS3ERR_NOENT)?;
            if let NodeKind::Directory(_) = state.nodes[&id].kind {
                return Err(nfsstat3::NFS3ERR_ISDIR);
            }

            state.detach(id);
            state.nodes.remove(&id);
            Ok(())
        });

        Some(result)
    }

    async fn rmdir(&mut self, object: diropargs3) -> Reply<()> {
        intercept!(self, Procedure::Rmdir);

        let mut state = self.state();
        let result = state.directory(&object.dir).and_then(|dir| {
            let id = state
                .child(dir, &object.name.0)
                .ok_or(nfsstat3::NFS3ERR_NOENT)?;
            match &state.nodes[&id].kind {
                NodeKind::File(_) => return Err(nfsstat3::NFS3ERR_NOTDIR),
                NodeKind::Directory(children) if !children.is_empty() => {
                    return Err(nfsstat3::NFS3ERR_NOTEMPTY)
                }
                NodeKind::Directory(_) => {}
            }

            state.detach(id);
            state.nodes.remove(&id);
            Ok(())
        });

        Some(result)
    }

    async fn rename(&mut self, args: RenameArgs) -> Reply<()> {
        intercept!(self, Procedure::Rename);

        let mut state = self.state();
        let result = (|| -> Result<(), nfsstat3> {
            let from_dir = state.directory(&args.from.dir)?;
            let to_dir = state.directory(&args.to.dir)?;
            let id = state
                .child(from_dir, &args.from.name.0)
                .ok_or(nfsstat3::NFS3ERR_NOENT)?;

            if let Some(existing) = state.child(to_dir, &args.to.name.0) {
                state.detach(existing);
                state.nodes.remove(&existing);
            }

            state.detach(id);
            let node = state.nodes.get_mut(&id).ok_or(nfsstat3::NFS3ERR_STALE)?;
            node.name = String::from_utf8_lossy(&args.to.name.0).into_owned();
            node.parent = to_dir;
            if let Some(Node {
                kind: NodeKind::Directory(children),
                ..
            }) = state.nodes.get_mut(&to_dir)
            {
                children.push(id);
            }

            Ok(())
        })();

        Some(result)
    }

    async fn readdir(&mut self, args: ReadDirArgs) -> Reply<ReadDirOk> {
        intercept!(self, Procedure::ReadDir);

        let mut state = self.state();
        state
            .readdir_requests
            .push((args.cookie, args.cookieverf, args.count));

        let result = state.directory(&args.dir).and_then(|dir| {
            if args.cookie != 0 && args.cookieverf != COOKIE_VERIFIER {
                return Err(nfsstat3::NFS3ERR_BAD_COOKIE);
            }

            let NodeKind::Directory(children) = &state.nodes[&dir].kind else {
                return Err(nfsstat3::NFS3ERR_NOTDIR);
            };

            let start = (args.cookie as usize).min(children.len());
            let page_size = if state.page_size == 0 {
                children.len()
            } else {
                state.page_size
            };
            let end = (start + page_size).min(children.len());

            let entries = children[start..end]
                .iter()
                .enumerate()
                .map(|(offset, id)| DirEntry {
                    fileid: *id,
                    name: filename3::from(state.nodes[id].name.as_bytes()),
                    cookie: (start + offset + 1) as u64,
                })
                .collect();

            Ok(ReadDirOk {
                entries,
                cookieverf: COOKIE_VERIFIER,
                eof: end == children.len(),
            })
        });

        Some(result)
    }

    async fn close(&mut self) {
        self.state().closed = true;
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    type Channel = MemoryServer;

    async fn connect(&self, options: &ConnectOptions) -> NfsResult<MemoryServer> {
        if self.refuse {
            return Err(NfsError::connect(anyhow::anyhow!(
                "connection refused by {}",
                options.address()
            )));
        }

        self.server.state().connected_as = Some((options.get_uid(), options.get_gid()));
        Ok(self.server.clone())
    }
}
