//! Wire types shared by the client and the server: JSON payloads and query
//! parameter shapes for the `/api/v1.0/` and `/api/v1.1/` routes.
//!
//! The stat record is pinned to an explicit `{"Size":…, "Mtime":…}` schema
//! rather than the positional stat-tuple transit of the original
//! implementation, which was a source-language artefact.

use serde::{Deserialize, Serialize};

/// Identity tuple returned by `checkfile`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatRecord {
    #[serde(rename = "Size")]
    pub size: u64,
    /// Modification time in whole nanoseconds since the Unix epoch.
    #[serde(rename = "Mtime")]
    pub mtime_ns: u64,
}

/// Response body of `GET filesums/<p>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSums {
    #[serde(rename = "Blocksize")]
    pub blocksize: u64,
    #[serde(rename = "Checksums")]
    pub checksums: Vec<String>,
}

/// Query parameters accepted by `POST copyblock/<p>`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CopyBlockQuery {
    pub offset: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filesize: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atime_ns: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtime_ns: Option<u64>,
}

/// Query parameters accepted by `POST copyfile/<p>`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CopyFileQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atime_ns: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtime_ns: Option<u64>,
}

/// Query parameters accepted by `PUT renameobject/<p>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameQuery {
    pub newname: String,
}

/// JSON error body the server returns on 403/400.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// A pair of access/modification times carried through the upload procedure,
/// in whole nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileTimesNanos {
    pub atime_ns: u64,
    pub mtime_ns: u64,
}

impl FileTimesNanos {
    pub fn from_system_times(atime: std::time::SystemTime, mtime: std::time::SystemTime) -> Self {
        Self {
            atime_ns: to_unix_nanos(atime),
            mtime_ns: to_unix_nanos(mtime),
        }
    }
}

fn to_unix_nanos(t: std::time::SystemTime) -> u64 {
    t.duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
