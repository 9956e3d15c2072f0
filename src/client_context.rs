//! Bundles the client's resolved configuration and per-run state, replacing
//! module-level globals with an explicit value so tests can spin up
//! independent instances.

use std::path::PathBuf;
use std::time::Duration;

use crate::client_remote::RemoteClient;

pub struct ClientContext {
    pub root: PathBuf,
    pub remote: RemoteClient,
    pub updatemax: Duration,
}

impl ClientContext {
    pub fn new(root: PathBuf, server: &str, updatemax: Duration, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            root,
            remote: RemoteClient::new(server, timeout)?,
            updatemax,
        })
    }
}
