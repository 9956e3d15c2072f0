use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use dirsync::client_buffer::UpdateBuffer;
use dirsync::client_context::ClientContext;
use dirsync::client_events::{classify, Action};
use dirsync::client_reconciler::reconcile;
use dirsync::client_watcher::watch;
use dirsync::logging;
use dirsync::relpath::RelPath;

/// Directory synchronisation client.
#[derive(Parser)]
#[command(name = "dirsync-client", version, about = "Directory synchronisation client")]
struct Args {
    /// Server host:port.
    #[arg(short = 's', long, default_value = "localhost:5000")]
    server: String,
    /// Only update a file once per interval, in seconds.
    #[arg(short = 'u', long, default_value_t = 60)]
    updatemax: u64,
    /// Per-request HTTP timeout, in seconds.
    #[arg(long, default_value_t = 10)]
    timeout: u64,
    /// Directory to synchronise.
    directory: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if !args.directory.is_dir() {
        eprintln!(
            "Client: Directory does not exist: {}",
            args.directory.display()
        );
        std::process::exit(1);
    }
    let root = args
        .directory
        .canonicalize()
        .context("resolve directory")?;

    logging::init_log_file(&logging::default_log_file_path("dirsync-client"))
        .context("init log file")?;
    logging::info_kv(
        "client start",
        &[
            ("server", args.server.as_str()),
            ("updatemax", &args.updatemax.to_string()),
        ],
    );

    let ctx = ClientContext::new(
        root.clone(),
        &args.server,
        Duration::from_secs(args.updatemax),
        Duration::from_secs(args.timeout),
    )?;

    println!("Client: Waiting for server to start...");
    ctx.remote.wait_for_server().await?;

    reconcile(&ctx).await.context("initial reconciliation")?;

    let (_watcher, mut events) = watch(&root, 1024)?;
    let mut buffer = UpdateBuffer::new();
    let mut ticker = tokio::time::interval(Duration::from_secs(1));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("Client: Terminated by the user");
                break;
            }
            _ = ticker.tick() => {
                flush_due_entries(&ctx, &mut buffer, &root).await;
            }
            maybe_event = events.recv() => {
                match maybe_event {
                    Some(raw) => {
                        if let Some(action) = classify(&root, raw) {
                            handle_action(&ctx, &mut buffer, action).await;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    Ok(())
}

async fn flush_due_entries(ctx: &ClientContext, buffer: &mut UpdateBuffer, root: &std::path::Path) {
    let now = std::time::Instant::now();
    let due = buffer.tick(now, ctx.updatemax);
    for abs_path in due {
        let Ok(rel) = RelPath::from_abs(root, &abs_path) else {
            continue;
        };
        if let Err(e) = ctx.remote.upload(&abs_path, &rel).await {
            logging::error(format!("upload failed for {rel}: {e:#}"));
        }
    }
}

async fn handle_action(ctx: &ClientContext, buffer: &mut UpdateBuffer, action: Action) {
    match action {
        Action::CreateDir(rel) => {
            if let Err(e) = ctx.remote.create_dir(&rel).await {
                logging::error(format!("createdir failed for {rel}: {e:#}"));
            }
        }
        Action::DeleteObject { abs_path, rel_path } => {
            buffer.remove(&abs_path);
            if let Err(e) = ctx.remote.delete_object(&rel_path).await {
                logging::error(format!("deleteobject failed for {rel_path}: {e:#}"));
            }
        }
        Action::ModifyFile { abs_path, rel_path } => {
            let now = std::time::Instant::now();
            let upload_now = buffer.on_modify(now, abs_path.clone());
            if upload_now {
                if let Err(e) = ctx.remote.upload(&abs_path, &rel_path).await {
                    logging::error(format!("upload failed for {rel_path}: {e:#}"));
                }
            }
        }
        Action::Rename {
            old_abs_path,
            new_abs_path,
            old,
            new,
        } => {
            if let Err(e) = ctx.remote.rename_object(&old, &new).await {
                logging::error(format!("renameobject failed for {old} -> {new}: {e:#}"));
            }
            buffer.rename(&old_abs_path, new_abs_path);
        }
    }
}
