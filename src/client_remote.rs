//! Issues the protocol calls against a `dirsync-server` and implements the
//! two-tier block-diff upload procedure, with the v1.0 whole-file fallback
//! for servers that don't serve `filesums`.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::checksum::hex_sha1;
use crate::relpath::RelPath;
use crate::wire::{CopyBlockQuery, CopyFileQuery, FileSums, FileTimesNanos, StatRecord};

#[derive(Clone)]
pub struct RemoteClient {
    base: String,
    http: reqwest::Client,
}

impl RemoteClient {
    pub fn new(server: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build http client")?;
        Ok(Self {
            base: format!("http://{server}"),
            http,
        })
    }

    fn url(&self, version: &str, segment: &str, p: &RelPath) -> String {
        format!(
            "{}/api/{version}/{segment}/{}",
            self.base,
            encode_path(p)
        )
    }

    /// Blocks until the server answers any request at all, retrying every
    /// `POLL_TIME` on connect/timeout errors: any response, including an
    /// error status, means the server is up.
    pub async fn wait_for_server(&self) -> Result<()> {
        let probe_url = format!("{}/api/v1.0/", self.base);
        loop {
            match self.http.get(&probe_url).send().await {
                Ok(_) => return Ok(()),
                Err(e) if e.is_connect() || e.is_timeout() => {
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
                Err(e) => return Err(e).context("probe server"),
            }
        }
    }

    pub async fn dir_exists(&self, p: &RelPath) -> Result<bool> {
        let resp = self
            .http
            .get(self.url("v1.0", "direxists", p))
            .send()
            .await
            .context("direxists request")?;
        if resp.status().is_success() {
            return Ok(true);
        }
        if resp.status() == StatusCode::GONE {
            return Ok(false);
        }
        map_status(resp, "direxists").await?;
        Ok(false)
    }

    pub async fn create_dir(&self, p: &RelPath) -> Result<()> {
        let resp = self
            .http
            .post(self.url("v1.0", "createdir", p))
            .send()
            .await
            .context("createdir request")?;
        map_status(resp, "createdir").await
    }

    /// Compares local `(size, mtime)` against the server's stat record.
    /// Returns `false` (not `410`, an error) for a local I/O failure — the
    /// caller treats this the same as "not present on server" by reuploading.
    pub async fn check_file(&self, local: &Path, remote: &RelPath) -> Result<bool> {
        let resp = self
            .http
            .get(self.url("v1.0", "checkfile", remote))
            .send()
            .await
            .context("checkfile request")?;
        if resp.status() == StatusCode::GONE {
            return Ok(false);
        }
        let stat: StatRecord = map_error(resp, "checkfile").await?;
        let meta = std::fs::metadata(local).with_context(|| format!("stat {}", local.display()))?;
        let local_mtime_ns = FileTimesNanos::from_system_times(
            meta.accessed().unwrap_or(std::time::SystemTime::UNIX_EPOCH),
            meta.modified()?,
        )
        .mtime_ns;
        Ok(stat.size == meta.len() && stat.mtime_ns == local_mtime_ns)
    }

    pub async fn delete_object(&self, p: &RelPath) -> Result<()> {
        let resp = self
            .http
            .delete(self.url("v1.0", "deleteobject", p))
            .send()
            .await
            .context("deleteobject request")?;
        map_status(resp, "deleteobject").await
    }

    pub async fn rename_object(&self, old: &RelPath, new: &RelPath) -> Result<()> {
        let resp = self
            .http
            .put(self.url("v1.0", "renameobject", old))
            .query(&[("newname", new.as_str())])
            .send()
            .await
            .context("renameobject request")?;
        map_status(resp, "renameobject").await
    }

    /// Implements the two-tier upload negotiation: block-diff with SHA-1
    /// checksums when the server supports it, whole-file otherwise.
    pub async fn upload(&self, local: &Path, remote: &RelPath) -> Result<()> {
        let sums_url = self.url("v1.1", "filesums", remote);
        let resp = self
            .http
            .get(&sums_url)
            .send()
            .await
            .context("filesums request")?;

        if resp.status().is_success() {
            let sums: FileSums = resp.json().await.context("parse filesums response")?;
            self.upload_blocks(local, remote, sums).await
        } else if resp.status() == StatusCode::NOT_FOUND {
            self.upload_whole_file(local, remote).await
        } else {
            map_status(resp, "filesums").await
        }
    }

    async fn upload_blocks(&self, local: &Path, remote: &RelPath, sums: FileSums) -> Result<()> {
        let blocksize = sums.blocksize.max(1);
        let mut file =
            File::open(local).with_context(|| format!("open {}", local.display()))?;
        let mut buf = vec![0u8; blocksize as usize];

        let mut block_index: u64 = 0;
        let mut last_sent = false;

        loop {
            let n = read_chunk(&mut file, &mut buf)?;
            if n == 0 {
                break;
            }
            let data = &buf[..n];
            let last = (n as u64) < blocksize;

            let matches = (block_index as usize) < sums.checksums.len()
                && sums.checksums[block_index as usize] == hex_sha1(data);

            if !matches {
                let mut query = CopyBlockQuery {
                    offset: block_index * blocksize,
                    ..Default::default()
                };
                if last {
                    let times = local_file_times(local)?;
                    query.filesize = Some(std::fs::metadata(local)?.len());
                    query.atime_ns = Some(times.atime_ns);
                    query.mtime_ns = Some(times.mtime_ns);
                    last_sent = true;
                }
                let resp = self
                    .http
                    .post(self.url("v1.1", "copyblock", remote))
                    .query(&query)
                    .body(data.to_vec())
                    .send()
                    .await
                    .context("copyblock request")?;
                map_status(resp, "copyblock").await?;
            }

            block_index += 1;
        }

        if !last_sent {
            let times = local_file_times(local)?;
            let query = CopyBlockQuery {
                offset: block_index * blocksize,
                filesize: Some(std::fs::metadata(local)?.len()),
                atime_ns: Some(times.atime_ns),
                mtime_ns: Some(times.mtime_ns),
            };
            let resp = self
                .http
                .post(self.url("v1.1", "copyblock", remote))
                .query(&query)
                .send()
                .await
                .context("copyblock request")?;
            map_status(resp, "copyblock").await?;
        }

        Ok(())
    }

    async fn upload_whole_file(&self, local: &Path, remote: &RelPath) -> Result<()> {
        println!("Server: Copying file: {remote}");
        crate::logging::info(format!("Copying file: {remote}"));

        let times = local_file_times(local)?;
        let data = tokio::fs::read(local)
            .await
            .with_context(|| format!("read {}", local.display()))?;

        let query = CopyFileQuery {
            atime_ns: Some(times.atime_ns),
            mtime_ns: Some(times.mtime_ns),
        };
        let resp = self
            .http
            .post(self.url("v1.0", "copyfile", remote))
            .query(&query)
            .body(data)
            .send()
            .await
            .context("copyfile request")?;
        map_status(resp, "copyfile").await
    }
}

fn local_file_times(local: &Path) -> Result<FileTimesNanos> {
    let meta = std::fs::metadata(local).with_context(|| format!("stat {}", local.display()))?;
    let atime = meta
        .accessed()
        .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
    let mtime = meta.modified()?;
    Ok(FileTimesNanos::from_system_times(atime, mtime))
}

/// Reads up to `buf.len()` bytes, short only at EOF.
fn read_chunk(file: &mut File, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..]).context("read block")?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

fn encode_path(p: &RelPath) -> String {
    p.as_str()
        .split('/')
        .map(|seg| utf8_percent_encode(seg, NON_ALPHANUMERIC).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

async fn map_error<T: DeserializeOwned>(resp: Response, op: &str) -> Result<T> {
    let status = resp.status();
    if status.is_success() {
        return resp.json::<T>().await.with_context(|| format!("parse {op} response"));
    }
    let text = resp.text().await.unwrap_or_default();
    anyhow::bail!("{op} failed: {status} {text}")
}

async fn map_status(resp: Response, op: &str) -> Result<()> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    let text = resp.text().await.unwrap_or_default();
    anyhow::bail!("{op} failed: {status} {text}")
}
