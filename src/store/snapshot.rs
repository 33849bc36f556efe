//! Flat JSON snapshots: loaded whole at startup, written whole at shutdown.
//!
//! A dump writes a sibling `*.tmp` file and renames it over the target, so an
//! interrupted dump leaves the previous snapshot in place. Nothing else is
//! transactional: whatever changed after the last dump is lost on a crash.

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::{
    ffi::OsString,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, error, info, warn};

/// A store that can write its primary map back to durable storage.
#[async_trait]
pub trait Snapshot: Send + Sync + 'static {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    /// Serialize the current primary map, overwriting the previous snapshot.
    async fn dump(&self) -> Result<()>;
}

/// Read a snapshot into a fresh collection.
///
/// A missing or zero-length file yields `T::default()`.
///
/// # Errors
/// Returns [`Error::PersistenceRead`] if the file exists but cannot be read and
/// [`Error::PersistenceCorrupt`] if its content does not parse.
pub fn load<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            info!(path = %path.display(), "no snapshot found, starting empty");
            return Ok(T::default());
        }
        Err(source) => {
            return Err(Error::PersistenceRead {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if raw.iter().all(u8::is_ascii_whitespace) {
        warn!(path = %path.display(), "snapshot is empty, starting empty");
        return Ok(T::default());
    }

    serde_json::from_slice(&raw).map_err(|source| Error::PersistenceCorrupt {
        path: path.to_path_buf(),
        source,
    })
}

/// Write `value` to `path` as pretty JSON.
///
/// # Errors
/// Returns [`Error::PersistenceWriteFailed`] if serialization or any file
/// operation fails.
pub async fn dump<T>(path: &Path, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
{
    let write_failed = |source: std::io::Error| Error::PersistenceWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|err| write_failed(std::io::Error::new(ErrorKind::InvalidData, err)))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(write_failed)?;
    }

    let tmp = temp_path(path);
    tokio::fs::write(&tmp, &bytes).await.map_err(write_failed)?;
    tokio::fs::rename(&tmp, path).await.map_err(write_failed)?;

    debug!(path = %path.display(), bytes = bytes.len(), "snapshot written");

    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(|| OsString::from("snapshot"), ToOwned::to_owned);
    name.push(".tmp");
    path.with_file_name(name)
}

/// Spawn a task that waits for the shutdown flag, then dumps `store` once.
///
/// A dropped sender counts as shutdown. Dump failures are logged and swallowed
/// so they never block process exit; await the handle to know the dump ran.
pub fn dump_on_shutdown<S>(store: Arc<S>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()>
where
    S: Snapshot + ?Sized,
{
    tokio::spawn(async move {
        if shutdown.wait_for(|stop| *stop).await.is_err() {
            debug!(store = store.name(), "shutdown sender dropped");
        }

        match store.dump().await {
            Ok(()) => info!(store = store.name(), "snapshot dumped"),
            Err(err) => error!(store = store.name(), "snapshot dump failed: {err}"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn missing_file_is_empty_state() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let map: BTreeMap<String, String> = load(&dir.path().join("absent.json"))?;
        assert!(map.is_empty());
        Ok(())
    }

    #[test]
    fn blank_file_is_empty_state() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("blank.json");
        fs::write(&path, "\n")?;
        let map: BTreeMap<String, String> = load(&path)?;
        assert!(map.is_empty());
        Ok(())
    }

    #[test]
    fn malformed_file_is_corrupt() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("broken.json");
        fs::write(&path, "{\"a\": ")?;
        let result: Result<BTreeMap<String, String>> = load(&path);
        assert!(matches!(result, Err(Error::PersistenceCorrupt { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn dump_overwrites_and_leaves_no_temp_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("map.json");

        let mut map = BTreeMap::new();
        map.insert("k".to_string(), "v1".to_string());
        dump(&path, &map).await?;

        map.insert("k".to_string(), "v2".to_string());
        dump(&path, &map).await?;

        let loaded: BTreeMap<String, String> = load(&path)?;
        assert_eq!(loaded.get("k").map(String::as_str), Some("v2"));
        assert!(!temp_path(&path).exists());
        Ok(())
    }

    struct Counting(AtomicUsize);

    #[async_trait]
    impl Snapshot for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn dump(&self) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn dump_on_shutdown_waits_for_signal() -> anyhow::Result<()> {
        let store = Arc::new(Counting(AtomicUsize::new(0)));
        let (tx, rx) = watch::channel(false);
        let handle = dump_on_shutdown(store.clone(), rx);

        tokio::task::yield_now().await;
        assert_eq!(store.0.load(Ordering::SeqCst), 0);

        tx.send(true)?;
        handle.await?;
        assert_eq!(store.0.load(Ordering::SeqCst), 1);
        Ok(())
    }
}
