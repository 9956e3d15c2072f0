use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use dirsync::logging;
use dirsync::server_context::ServerContext;
use dirsync::server_handlers::build_router;

/// Directory synchronisation server.
#[derive(Parser)]
#[command(name = "dirsync-server", version, about = "Directory synchronisation server")]
struct Args {
    /// Interface to listen on, host[:port].
    #[arg(short = 'i', long, default_value = "localhost:5000")]
    interface: String,
    /// Block size used by the checksum producer and block-write engine, in bytes.
    #[arg(short = 'b', long, default_value_t = 262_144)]
    blocksize: u64,
    /// Destination directory, created if absent.
    #[arg(default_value = "Storage")]
    directory: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    std::fs::create_dir_all(&args.directory)
        .with_context(|| format!("create {}", args.directory.display()))?;
    let root = args
        .directory
        .canonicalize()
        .context("resolve directory")?;

    logging::init_log_file(&logging::default_log_file_path("dirsync-server"))
        .context("init log file")?;
    logging::info_kv(
        "server start",
        &[
            ("interface", args.interface.as_str()),
            ("blocksize", &args.blocksize.to_string()),
            ("directory", &root.display().to_string()),
        ],
    );

    let ctx = Arc::new(ServerContext::new(root, args.blocksize));
    let router = build_router(ctx.clone());

    let addr = resolve_interface(&args.interface);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {addr}"))?;

    println!("Server: Listening on {addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(ctx))
        .await
        .context("serve")?;

    Ok(())
}

async fn shutdown_signal(ctx: Arc<ServerContext>) {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = ctx.shutdown.notified() => {}
    }
}

fn resolve_interface(interface: &str) -> String {
    if interface.contains(':') {
        interface.to_string()
    } else {
        format!("{interface}:5000")
    }
}
