//! Bundles the server's resolved configuration, replacing module-level
//! globals with an explicit value tests can instantiate independently.
//! The server is otherwise stateless across requests: this struct carries
//! only configuration, never per-file session state.

use std::path::PathBuf;

use tokio::sync::Notify;

pub struct ServerContext {
    pub root: PathBuf,
    pub blocksize: u64,
    /// Notified by the `shutdown` handler; the main loop awaits it to drive
    /// graceful shutdown of the HTTP server.
    pub shutdown: Notify,
}

impl ServerContext {
    pub fn new(root: PathBuf, blocksize: u64) -> Self {
        Self {
            root,
            blocksize,
            shutdown: Notify::new(),
        }
    }
}
