//! File-backed ledger for local use.
//!
//! The whole key space is kept in one JSON object mapping each key to the
//! base64 encoding of its value. A missing file is an empty ledger.
//!
//! Every write is a read-modify-write of the whole image, so writers on the
//! same path take an exclusive advisory lock on a sibling `.lock` file for
//! the duration. The lock is per open file, which covers separate processes
//! as well as separate `FileLedger` instances in one process. The new image
//! goes to a uniquely named temp file in the same directory and is renamed
//! over the old one, so readers never see a partial image and take no lock.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use base64::Engine;
use fs2::FileExt;
use tracing::debug;

use crate::gateway::LedgerGateway;
use crate::{LedgerError, Result};

type Image = BTreeMap<String, String>;

/// Ledger persisted to a single JSON file.
#[derive(Clone, Debug)]
pub struct FileLedger {
    path: PathBuf,
}

impl FileLedger {
    /// Open (lazily) a ledger stored at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the ledger image.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling file writers lock while they rewrite the image.
    pub fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        self.path.with_file_name(name)
    }

    fn parent_dir(&self) -> &Path {
        parent_dir(&self.path)
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn parse_image(content: &[u8]) -> Result<Image> {
    if content.is_empty() {
        return Ok(Image::new());
    }
    serde_json::from_slice(content).map_err(|e| LedgerError::Serialization(e.to_string()))
}

fn load_blocking(path: &Path) -> Result<Image> {
    match std::fs::read(path) {
        Ok(bytes) => parse_image(&bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Image::new()),
        Err(e) => Err(LedgerError::Io(e)),
    }
}

fn store_blocking(path: &Path, image: &Image) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(image)
        .map_err(|e| LedgerError::Serialization(e.to_string()))?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent_dir(path))?;
    tmp.write_all(&bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| LedgerError::Io(e.error))?;
    Ok(())
}

/// Insert one key under the writer lock. Blocks the calling thread.
fn set_blocking(path: &Path, lock_path: &Path, key: &str, encoded: String) -> Result<()> {
    let lock = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(lock_path)?;
    lock.lock_exclusive()?;

    let result = load_blocking(path).and_then(|mut image| {
        image.insert(key.to_string(), encoded);
        store_blocking(path, &image)
    });
    // Closing the handle releases the lock.
    drop(lock);
    result
}

impl LedgerGateway for FileLedger {
    async fn is_available(&self) -> Result<bool> {
        Ok(tokio::fs::metadata(self.parent_dir())
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false))
    }

    async fn get_data(&self, key: &str) -> Result<Vec<u8>> {
        let image = match tokio::fs::read(&self.path).await {
            Ok(bytes) => parse_image(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Image::new(),
            Err(e) => return Err(LedgerError::Io(e)),
        };
        match image.get(key) {
            Some(encoded) => base64::engine::general_purpose::STANDARD
                .decode(encoded)
                .map_err(|e| LedgerError::Serialization(format!("value of '{key}': {e}"))),
            None => Ok(Vec::new()),
        }
    }

    async fn set_data(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let len = value.len();
        let encoded = base64::engine::general_purpose::STANDARD.encode(&value);
        let path = self.path.clone();
        let lock_path = self.lock_path();
        let owned_key = key.to_string();

        let outcome = tokio::task::spawn_blocking(move || {
            set_blocking(&path, &lock_path, &owned_key, encoded)
        })
        .await;
        let reason = match outcome {
            Ok(Ok(())) => {
                debug!(key, len, path = ?self.path, "ledger set");
                return Ok(());
            }
            Ok(Err(e)) => e.to_string(),
            Err(join) => format!("writer task failed: {join}"),
        };
        Err(LedgerError::Write {
            key: key.to_string(),
            reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_empty_ledger() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ledger = FileLedger::new(dir.path().join("ledger.json"));
        assert!(ledger.get_data("anything").await.expect("get").is_empty());
        assert!(ledger.is_available().await.expect("available"));
    }

    #[tokio::test]
    async fn test_values_persist_across_instances() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ledger.json");

        let first = FileLedger::new(&path);
        first
            .set_data("attribution_keys", b"[\"a\"]".to_vec())
            .await
            .expect("set");
        first
            .set_data("attribution_a", vec![0xff, 0x00, 0x10])
            .await
            .expect("set binary");

        let second = FileLedger::new(&path);
        assert_eq!(
            second.get_data("attribution_keys").await.expect("get"),
            b"[\"a\"]".to_vec()
        );
        assert_eq!(
            second.get_data("attribution_a").await.expect("get"),
            vec![0xff, 0x00, 0x10]
        );
    }

    #[tokio::test]
    async fn test_unavailable_without_parent_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ledger = FileLedger::new(dir.path().join("missing").join("ledger.json"));
        assert!(!ledger.is_available().await.expect("available"));
        let result = ledger.set_data("k", vec![1]).await;
        assert!(matches!(result, Err(LedgerError::Write { .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_keep_unrelated_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ledger.json");

        for round in 0..25 {
            let a = FileLedger::new(&path);
            let b = FileLedger::new(&path);
            let key_a = format!("attribution_a{round}");
            let key_b = format!("attribution_b{round}");
            let (ra, rb) = tokio::join!(
                tokio::spawn({
                    let key = key_a.clone();
                    async move { a.set_data(&key, vec![1]).await }
                }),
                tokio::spawn({
                    let key = key_b.clone();
                    async move { b.set_data(&key, vec![2]).await }
                }),
            );
            ra.expect("join a").expect("set a");
            rb.expect("join b").expect("set b");
        }

        let reader = FileLedger::new(&path);
        for round in 0..25 {
            assert_eq!(
                reader.get_data(&format!("attribution_a{round}")).await.expect("get"),
                vec![1],
                "lost attribution_a{round}"
            );
            assert_eq!(
                reader.get_data(&format!("attribution_b{round}")).await.expect("get"),
                vec![2],
                "lost attribution_b{round}"
            );
        }
    }

    #[tokio::test]
    async fn test_writes_leave_no_temp_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ledger = FileLedger::new(dir.path().join("ledger.json"));
        ledger.set_data("k", vec![1]).await.expect("set");
        ledger.set_data("k", vec![2]).await.expect("set");

        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .expect("read_dir")
            .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["ledger.json", "ledger.json.lock"]);
        assert_eq!(ledger.lock_path(), dir.path().join("ledger.json.lock"));
    }

    #[tokio::test]
    async fn test_corrupt_image_is_serialization_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ledger.json");
        std::fs::write(&path, b"not json").expect("write");
        let ledger = FileLedger::new(&path);
        assert!(matches!(
            ledger.get_data("k").await,
            Err(LedgerError::Serialization(_))
        ));
    }
}
