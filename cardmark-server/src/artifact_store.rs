//! Short-lived storage for rendered cards.
//!
//! Cards are written to a directory and served back until their TTL runs out.
//! Expiry is read from each file's mtime, so the store keeps no index and
//! survives restarts. A janitor task sweeps expired files on an interval.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

const ARTIFACT_EXTENSION: &str = "jpg";

/// Errors from the artifact store
#[derive(Debug, Error)]
pub enum ArtifactStoreError {
    #[error("invalid artifact id: {0}")]
    InvalidId(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Directory-backed card store with time-based expiry.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    ttl: Duration,
}

impl ArtifactStore {
    /// Open (and create if needed) the store directory.
    pub async fn open(dir: impl Into<PathBuf>, ttl: Duration) -> Result<Self, ArtifactStoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir, ttl })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, ArtifactStoreError> {
        // Only ids we issued are accepted; this also rules out path traversal.
        let id = Uuid::parse_str(id).map_err(|_| ArtifactStoreError::InvalidId(id.to_string()))?;
        Ok(self.dir.join(format!("{}.{}", id, ARTIFACT_EXTENSION)))
    }

    /// Store a card and return its id.
    pub async fn put(&self, bytes: &[u8]) -> Result<String, ArtifactStoreError> {
        let id = Uuid::new_v4().to_string();
        let path = self.path_for(&id)?;
        tokio::fs::write(&path, bytes).await?;
        debug!(artifact_id = %id, bytes = bytes.len(), "Artifact stored");
        Ok(id)
    }

    /// Fetch a card while it is alive.
    pub async fn get(&self, id: &str) -> Result<Option<Vec<u8>>, ArtifactStoreError> {
        let path = self.path_for(id)?;
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if self.is_expired(&metadata) {
            remove_quietly(&path).await;
            return Ok(None);
        }

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            // Swept between the metadata read and now
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete every expired card. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "Artifact sweep could not list directory");
                return 0;
            }
        };

        let mut removed = 0;
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Artifact sweep aborted");
                    break;
                }
            };

            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(ARTIFACT_EXTENSION) {
                continue;
            }
            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            if self.is_expired(&metadata) && remove_quietly(&path).await {
                removed += 1;
            }
        }

        if removed > 0 {
            info!(removed, "Expired artifacts purged");
        }
        removed
    }

    /// Run [`purge_expired`](Self::purge_expired) every `interval` until aborted.
    pub fn spawn_janitor(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                self.purge_expired().await;
            }
        })
    }

    fn is_expired(&self, metadata: &std::fs::Metadata) -> bool {
        let age = metadata
            .modified()
            .ok()
            .and_then(|mtime| mtime.elapsed().ok())
            .unwrap_or_default();
        age >= self.ttl
    }
}

async fn remove_quietly(path: &Path) -> bool {
    match tokio::fs::remove_file(path).await {
        Ok(()) => true,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to delete expired artifact");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path(), Duration::from_secs(60))
            .await
            .unwrap();

        let id = store.put(b"card bytes").await.unwrap();
        assert_eq!(store.get(&id).await.unwrap().as_deref(), Some(&b"card bytes"[..]));
    }

    #[tokio::test]
    async fn test_unknown_id_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path(), Duration::from_secs(60))
            .await
            .unwrap();

        let id = Uuid::new_v4().to_string();
        assert!(store.get(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rejects_non_uuid_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path(), Duration::from_secs(60))
            .await
            .unwrap();

        assert!(matches!(
            store.get("../../etc/passwd").await,
            Err(ArtifactStoreError::InvalidId(_))
        ));
    }

    #[tokio::test]
    async fn test_expired_artifacts_are_purged() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path(), Duration::ZERO).await.unwrap();

        let id = store.put(b"short lived").await.unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"not ours").unwrap();

        assert_eq!(store.purge_expired().await, 1);
        assert!(store.get(&id).await.unwrap().is_none());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[tokio::test]
    async fn test_get_hides_expired_before_sweep() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path(), Duration::ZERO).await.unwrap();

        let id = store.put(b"gone").await.unwrap();
        assert!(store.get(&id).await.unwrap().is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_janitor_sweeps_on_interval() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(ArtifactStore::open(dir.path(), Duration::ZERO).await.unwrap());
        store.put(b"a").await.unwrap();
        store.put(b"b").await.unwrap();

        let janitor = store.clone().spawn_janitor(Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(200)).await;
        janitor.abort();

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_sweep_of_missing_directory_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path().join("cards"), Duration::ZERO)
            .await
            .unwrap();
        std::fs::remove_dir_all(store.dir()).unwrap();

        assert_eq!(store.purge_expired().await, 0);
    }
}
