pub mod checksum;
pub mod client_buffer;
pub mod client_context;
pub mod client_events;
pub mod client_reconciler;
pub mod client_remote;
pub mod client_watcher;
pub mod logging;
pub mod relpath;
pub mod server_blockstore;
pub mod server_context;
pub mod server_handlers;
pub mod wire;
