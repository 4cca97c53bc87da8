//! `nfsclient` is an NFS version 3 client library.
//!
//! A [`NfsSession`] mounts one export of a remote server and performs path-based directory
//! and file operations against it without any operating system mount support. The session
//! speaks to the server through an [`RpcChannel`] produced by a [`Connector`], which owns the
//! RPC transport and the XDR encoding.
//!
//! ```rust,ignore
//! use nfsclient::{ConnectOptions, NfsSession, PermissionMode};
//!
//! let options = ConnectOptions::builder().host("10.0.0.5").uid(1000).gid(1000).build();
//! let mut session = NfsSession::new(options);
//!
//! session.connect(&connector).await?;
//! for export in session.get_exported_devices().await? {
//!     println!("{export}");
//! }
//!
//! session.mount_device("/export/home").await?;
//! session.create_directory("/reports", PermissionMode::default()).await?;
//! let names = session.get_item_list("/").await?;
//! ```

#![warn(missing_docs)]
#![allow(clippy::module_inception)]

mod attributes;
mod channel;
mod config;
pub mod defaults;
mod error;
mod handle;
mod path;
mod protocol;
mod session;
mod status;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use attributes::*;
pub use channel::*;
pub use config::*;
pub use error::*;
pub use handle::*;
pub use path::*;
pub use protocol::*;
pub use session::*;
pub use status::*;
