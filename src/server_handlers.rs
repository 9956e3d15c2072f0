//! Request dispatcher: binds the URL templates to handlers. Each route
//! lives under exactly the version prefix the wire contract assigns it —
//! `filesums`/`copyblock` under `/api/v1.1/`, everything else under
//! `/api/v1.0/` — rather than duplicating every route under both.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use bytes::Bytes;

use crate::checksum;
use crate::logging;
use crate::relpath::RelPath;
use crate::server_blockstore;
use crate::server_context::ServerContext;
use crate::wire::{CopyBlockQuery, CopyFileQuery, ErrorBody, FileTimesNanos, RenameQuery, StatRecord};

pub fn build_router(ctx: Arc<ServerContext>) -> Router {
    let v10 = Router::new()
        .route("/", get(probe))
        .route("/direxists/*p", get(direxists))
        .route("/createdir/*p", post(createdir))
        .route("/checkfile/*p", get(checkfile))
        .route("/copyfile/*p", post(copyfile))
        .route("/deleteobject/*p", delete(deleteobject))
        .route("/renameobject/*p", put(renameobject))
        .route("/shutdown", post(shutdown));

    let v11 = Router::new()
        .route("/", get(probe))
        .route("/filesums/*p", get(filesums))
        .route("/copyblock/*p", post(copyblock));

    Router::new()
        .nest("/api/v1.0", v10)
        .nest("/api/v1.1", v11)
        .with_state(ctx)
}

async fn probe() -> impl IntoResponse {
    StatusCode::OK
}

fn resolve(ctx: &ServerContext, raw: &str) -> Result<PathBuf, Response> {
    let rel = RelPath::parse(raw).map_err(|e| bad_request(&e.to_string()))?;
    rel.resolve_under(&ctx.root)
        .map_err(|e| bad_request(&e.to_string()))
}

fn bad_request(msg: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorBody { error: msg.to_string() })).into_response()
}

fn forbidden(msg: &str) -> Response {
    (StatusCode::FORBIDDEN, Json(ErrorBody { error: msg.to_string() })).into_response()
}

async fn direxists(State(ctx): State<Arc<ServerContext>>, Path(p): Path<String>) -> Response {
    let path = match resolve(&ctx, &p) {
        Ok(path) => path,
        Err(resp) => return resp,
    };
    if server_blockstore::dir_exists(&path) {
        StatusCode::OK.into_response()
    } else {
        StatusCode::GONE.into_response()
    }
}

async fn createdir(State(ctx): State<Arc<ServerContext>>, Path(p): Path<String>) -> Response {
    let path = match resolve(&ctx, &p) {
        Ok(path) => path,
        Err(resp) => return resp,
    };
    match server_blockstore::create_dir_recursive(&path) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => {
            logging::error(format!("createdir failed for {p}: {e:#}"));
            forbidden(&e.to_string())
        }
    }
}

async fn checkfile(State(ctx): State<Arc<ServerContext>>, Path(p): Path<String>) -> Response {
    let path = match resolve(&ctx, &p) {
        Ok(path) => path,
        Err(resp) => return resp,
    };
    let meta = match std::fs::metadata(&path) {
        Ok(meta) if meta.is_file() => meta,
        _ => return StatusCode::GONE.into_response(),
    };
    let mtime = meta
        .modified()
        .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
    let stat = StatRecord {
        size: meta.len(),
        mtime_ns: FileTimesNanos::from_system_times(std::time::SystemTime::UNIX_EPOCH, mtime)
            .mtime_ns,
    };
    (StatusCode::OK, Json(stat)).into_response()
}

async fn filesums(State(ctx): State<Arc<ServerContext>>, Path(p): Path<String>) -> Response {
    let path = match resolve(&ctx, &p) {
        Ok(path) => path,
        Err(resp) => return resp,
    };
    match checksum::file_sums(&path, ctx.blocksize) {
        Ok(sums) => (StatusCode::OK, Json(sums)).into_response(),
        Err(e) => {
            logging::error(format!("filesums failed for {p}: {e:#}"));
            forbidden(&e.to_string())
        }
    }
}

async fn copyfile(
    State(ctx): State<Arc<ServerContext>>,
    Path(p): Path<String>,
    Query(q): Query<CopyFileQuery>,
    body: Bytes,
) -> Response {
    let path = match resolve(&ctx, &p) {
        Ok(path) => path,
        Err(resp) => return resp,
    };
    println!("Server: Copying file: {p}");
    logging::info(format!("Copying file: {p}"));

    let times = times_from(q.atime_ns, q.mtime_ns);
    match server_blockstore::copy_whole_file(&path, &body, times) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => {
            logging::error(format!("copyfile failed for {p}: {e:#}"));
            forbidden(&e.to_string())
        }
    }
}

async fn copyblock(
    State(ctx): State<Arc<ServerContext>>,
    Path(p): Path<String>,
    Query(q): Query<CopyBlockQuery>,
    body: Bytes,
) -> Response {
    let path = match resolve(&ctx, &p) {
        Ok(path) => path,
        Err(resp) => return resp,
    };
    let times = times_from(q.atime_ns, q.mtime_ns);
    match server_blockstore::write_block(&path, q.offset, &body, q.filesize, times) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => {
            logging::error(format!("copyblock failed for {p}: {e:#}"));
            forbidden(&e.to_string())
        }
    }
}

async fn deleteobject(State(ctx): State<Arc<ServerContext>>, Path(p): Path<String>) -> Response {
    let path = match resolve(&ctx, &p) {
        Ok(path) => path,
        Err(resp) => return resp,
    };
    println!("Server: Deleting: {p}");
    logging::info(format!("Deleting: {p}"));
    match server_blockstore::delete_object(&path) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => {
            logging::error(format!("deleteobject failed for {p}: {e:#}"));
            forbidden(&e.to_string())
        }
    }
}

/// `newname` arrives as a query parameter containing a relative path that's
/// already been percent-decoded exactly once by the extractor — it is not
/// decoded a second time.
async fn renameobject(
    State(ctx): State<Arc<ServerContext>>,
    Path(p): Path<String>,
    Query(q): Query<RenameQuery>,
) -> Response {
    let from = match resolve(&ctx, &p) {
        Ok(path) => path,
        Err(resp) => return resp,
    };
    let to = match resolve(&ctx, &q.newname) {
        Ok(path) => path,
        Err(resp) => return resp,
    };
    println!("Server: Renaming: {p} to {}", q.newname);
    logging::info(format!("Renaming: {p} to {}", q.newname));
    match server_blockstore::rename_object(&from, &to) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => {
            logging::error(format!("renameobject failed for {p}: {e:#}"));
            forbidden(&e.to_string())
        }
    }
}

async fn shutdown(State(ctx): State<Arc<ServerContext>>) -> Response {
    ctx.shutdown.notify_waiters();
    StatusCode::OK.into_response()
}

fn times_from(atime_ns: Option<u64>, mtime_ns: Option<u64>) -> Option<(u64, u64)> {
    match (atime_ns, mtime_ns) {
        (Some(a), Some(m)) => Some((a, m)),
        _ => None,
    }
}
