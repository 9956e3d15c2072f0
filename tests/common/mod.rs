use std::path::PathBuf;
use std::sync::Arc;

use dirsync::server_context::ServerContext;
use dirsync::server_handlers::build_router;
use tokio::net::TcpListener;

/// Spins up a real server on an ephemeral port and returns its base URL
/// (`127.0.0.1:PORT`, matching the `--server host:port` CLI form) together
/// with the destination root it was given.
pub async fn spawn_server(root: PathBuf, blocksize: u64) -> String {
    let ctx = Arc::new(ServerContext::new(root, blocksize));
    let router = build_router(ctx);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    addr.to_string()
}

pub fn tmp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(name);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
