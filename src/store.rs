// Durable storage for the metrics document
//
// Reads tolerate a missing or corrupt file by falling back to an empty
// document. Writes go to a sibling temp file which is fsynced and then
// renamed over the canonical path, so readers only ever see a complete file.

use crate::errors::{MetricsError, MetricsResult};
use crate::metrics::STORE_ERRORS;
use crate::model::MetricsDocument;
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

// Distinguishes temp files of concurrent saves within this process
static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

pub struct MetricsStore {
    path: PathBuf,
}

impl MetricsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted document, or a fresh one if the file is missing,
    /// unreadable or malformed.
    pub async fn load(&self) -> MetricsDocument {
        match self.read().await {
            Ok(doc) => doc,
            Err(MetricsError::Io(err)) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %self.path.display(),
                    "metrics file not found; starting empty document"
                );
                MetricsDocument::empty(Utc::now())
            }
            Err(err) => {
                STORE_ERRORS.with_label_values(&["load"]).inc();
                warn!(
                    path = %self.path.display(),
                    error = %err,
                    "metrics file unreadable; starting empty document"
                );
                MetricsDocument::empty(Utc::now())
            }
        }
    }

    async fn read(&self) -> MetricsResult<MetricsDocument> {
        let raw = tokio::fs::read(&self.path).await?;
        Ok(serde_json::from_slice(&raw)?)
    }

    /// Persist `doc` with an atomic replace of the canonical file.
    pub async fn save(&self, doc: &MetricsDocument) -> MetricsResult<()> {
        let tmp = self.temp_path();

        let bytes = match self.write_replace(&tmp, doc).await {
            Ok(bytes) => bytes,
            Err(source) => {
                STORE_ERRORS.with_label_values(&["save"]).inc();
                error!(
                    path = %self.path.display(),
                    error = %source,
                    "failed to persist metrics document; update lost"
                );
                // best effort, the canonical file is untouched
                let _ = tokio::fs::remove_file(&tmp).await;
                return Err(MetricsError::Persist {
                    path: self.path.display().to_string(),
                    source,
                });
            }
        };

        debug!(
            path = %self.path.display(),
            requests = doc.requests.len(),
            bytes = bytes,
            "metrics document saved"
        );
        Ok(())
    }

    async fn write_replace(&self, tmp: &Path, doc: &MetricsDocument) -> std::io::Result<usize> {
        let json = serde_json::to_vec_pretty(doc).map_err(std::io::Error::from)?;
        self.ensure_parent().await?;
        let mut file = tokio::fs::File::create(tmp).await?;
        file.write_all(&json).await?;
        file.write_all(b"\n").await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(tmp, &self.path).await?;
        Ok(json.len() + 1)
    }

    /// Check that the document is readable or can be created. Read only:
    /// directories are created by `save`, never here.
    pub async fn probe(&self) -> MetricsResult<()> {
        match tokio::fs::metadata(&self.path).await {
            Ok(meta) if meta.is_dir() => {
                return Err(MetricsError::Unavailable(format!(
                    "{} is a directory",
                    self.path.display()
                )))
            }
            Ok(_) => return Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }

        // Nothing saved yet: the closest existing ancestor must be a directory
        let mut dir = self.path.parent();
        while let Some(current) = dir.filter(|d| !d.as_os_str().is_empty()) {
            match tokio::fs::metadata(current).await {
                Ok(meta) if meta.is_dir() => return Ok(()),
                Ok(_) => {
                    return Err(MetricsError::Unavailable(format!(
                        "{} is not a directory",
                        current.display()
                    )))
                }
                Err(err) if err.kind() == ErrorKind::NotFound => dir = current.parent(),
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    async fn ensure_parent(&self) -> std::io::Result<()> {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => tokio::fs::create_dir_all(dir).await,
            _ => Ok(()),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "metrics".to_string());
        let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
        self.path
            .with_file_name(format!(".{name}.{}.{seq}.tmp", std::process::id()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AccuracyOutcome, RequestRecord};
    use tempfile::TempDir;

    fn sample_doc() -> MetricsDocument {
        let mut doc = MetricsDocument::empty(Utc::now());
        doc.push_request(
            RequestRecord {
                endpoint: "/search".into(),
                latency_ms: 12.5,
                status_code: 200,
                timestamp: Utc::now(),
            },
            1000,
        );
        doc.accuracy.increment(AccuracyOutcome::Incorrect);
        doc
    }

    #[tokio::test]
    async fn missing_file_yields_empty_document() {
        let dir = TempDir::new().unwrap();
        let store = MetricsStore::new(dir.path().join("metrics.json"));
        let doc = store.load().await;
        assert!(doc.requests.is_empty());
        assert_eq!(doc.accuracy.total(), Some(0));
    }

    #[tokio::test]
    async fn save_then_load_roundtrips() {
        let dir = TempDir::new().unwrap();
        let store = MetricsStore::new(dir.path().join("nested/deeper/metrics.json"));
        let doc = sample_doc();
        store.save(&doc).await.unwrap();
        assert_eq!(store.load().await, doc);
    }

    #[tokio::test]
    async fn corrupt_file_is_treated_as_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metrics.json");
        std::fs::write(&path, b"{\"requests\": [ {\"endpoint\": ").unwrap();
        let store = MetricsStore::new(&path);
        let doc = store.load().await;
        assert!(doc.requests.is_empty());
        assert_eq!(doc.accuracy.correct, 0);
    }

    #[tokio::test]
    async fn save_leaves_no_temp_file_behind() {
        let dir = TempDir::new().unwrap();
        let store = MetricsStore::new(dir.path().join("metrics.json"));
        store.save(&sample_doc()).await.unwrap();
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["metrics.json".to_string()]);
    }

    #[tokio::test]
    async fn interrupted_write_keeps_previous_document() {
        let dir = TempDir::new().unwrap();
        let store = MetricsStore::new(dir.path().join("metrics.json"));
        let doc = sample_doc();
        store.save(&doc).await.unwrap();

        // A crash between temp write and rename leaves only a partial temp file
        std::fs::write(store.temp_path(), b"{\"requests\": [").unwrap();

        assert_eq!(store.load().await, doc);
    }

    #[tokio::test]
    async fn failed_save_is_counted_and_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metrics.json");
        // A non-empty directory at the canonical path makes the rename fail
        std::fs::create_dir_all(path.join("occupied")).unwrap();
        let store = MetricsStore::new(&path);

        let failures = STORE_ERRORS.with_label_values(&["save"]);
        let before = failures.get();
        let err = store.save(&sample_doc()).await.unwrap_err();
        assert!(matches!(err, MetricsError::Persist { .. }));
        assert!(failures.get() >= before + 1);

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["metrics.json".to_string()]);
        assert!(path.join("occupied").is_dir());
    }

    #[tokio::test]
    async fn temp_paths_are_unique_per_save() {
        let store = MetricsStore::new("/var/lib/metrics/m.json");
        let first = store.temp_path();
        let second = store.temp_path();
        assert_ne!(first, second);
        assert_eq!(first.parent(), store.path().parent());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_saves_from_two_stores_on_one_file_succeed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("m.json");
        let doc = sample_doc();

        let mut handles = Vec::new();
        for _ in 0..2 {
            let store = std::sync::Arc::new(MetricsStore::new(&path));
            for _ in 0..50 {
                let store = store.clone();
                let doc = doc.clone();
                handles.push(tokio::spawn(async move { store.save(&doc).await }));
            }
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(MetricsStore::new(&path).load().await, doc);
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[tokio::test]
    async fn probe_rejects_directory_in_place_of_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metrics.json");
        let store = MetricsStore::new(&path);
        assert!(store.probe().await.is_ok());
        std::fs::create_dir(&path).unwrap();
        assert!(matches!(store.probe().await, Err(MetricsError::Unavailable(_))));
    }

    #[tokio::test]
    async fn probe_does_not_create_directories() {
        let dir = TempDir::new().unwrap();
        let store = MetricsStore::new(dir.path().join("a/b/metrics.json"));
        assert!(store.probe().await.is_ok());
        assert!(!dir.path().join("a").exists());
    }

    #[tokio::test]
    async fn probe_rejects_file_in_place_of_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a"), b"not a dir").unwrap();
        let store = MetricsStore::new(dir.path().join("a/b/metrics.json"));
        assert!(store.probe().await.is_err());
    }
}
