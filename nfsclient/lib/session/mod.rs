//! The NFS session: connection and mount state plus every path and handle operation.

mod io;
mod listing;
mod mutation;
mod resolve;
mod session;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use session::*;
