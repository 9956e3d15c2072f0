//! Per-block SHA-1 checksum vectors, used by the server's checksum producer
//! and exercised from the client's diff loop via the same block size.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use sha1::{Digest, Sha1};

use crate::wire::FileSums;

/// Computes the checksum vector of `path` at `blocksize`. A missing file
/// yields an empty vector (mirrors spec behaviour for `filesums` on an
/// absent destination).
pub fn file_sums(path: &Path, blocksize: u64) -> Result<FileSums> {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(FileSums {
                blocksize,
                checksums: Vec::new(),
            })
        }
        Err(e) => return Err(e).with_context(|| format!("open {}", path.display())),
    };

    let mut checksums = Vec::new();
    let mut buf = vec![0u8; blocksize as usize];
    loop {
        let n = read_full_or_partial(&mut file, &mut buf)?;
        if n == 0 {
            break;
        }
        checksums.push(hex_sha1(&buf[..n]));
        if n < buf.len() {
            break;
        }
    }
    Ok(FileSums {
        blocksize,
        checksums,
    })
}

/// Hex-encoded SHA-1 digest of `data`.
pub fn hex_sha1(data: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(data);
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Reads up to `buf.len()` bytes, returning fewer only at EOF (unlike a
/// single `Read::read` call, which may return short reads for reasons other
/// than EOF).
fn read_full_or_partial(file: &mut File, buf: &mut [u8]) -> Result<usize> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn file_sums_of_missing_file_is_empty() {
        let path = std::env::temp_dir().join("dirsync-checksum-missing-does-not-exist");
        let _ = std::fs::remove_file(&path);
        let sums = file_sums(&path, 4).unwrap();
        assert!(sums.checksums.is_empty());
        assert_eq!(sums.blocksize, 4);
    }

    #[test]
    fn file_sums_matches_block_count() {
        let path = std::env::temp_dir().join("dirsync-checksum-test-file");
        let mut f = File::create(&path).unwrap();
        f.write_all(b"abcdefghij").unwrap();
        drop(f);

        let sums = file_sums(&path, 4).unwrap();
        // 10 bytes / 4-byte blocks = 3 blocks (4, 4, 2)
        assert_eq!(sums.checksums.len(), 3);
        assert_eq!(sums.checksums[0], hex_sha1(b"abcd"));
        assert_eq!(sums.checksums[1], hex_sha1(b"efgh"));
        assert_eq!(sums.checksums[2], hex_sha1(b"ij"));
    }

    #[test]
    fn file_sums_exact_multiple_of_blocksize() {
        let path = std::env::temp_dir().join("dirsync-checksum-exact-multiple");
        let mut f = File::create(&path).unwrap();
        f.write_all(b"abcdefgh").unwrap();
        drop(f);

        let sums = file_sums(&path, 4).unwrap();
        assert_eq!(sums.checksums.len(), 2);
    }
}
