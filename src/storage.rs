use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use tokio::{fs, io::AsyncWriteExt};
use uuid::Uuid;

const WRITE_CHUNK_BYTES: usize = 64 * 1024;

/// Location and identity of a successfully stored object.
#[derive(Debug, Clone)]
pub struct StoredFile {
    /// Publicly reachable URL for the object.
    pub url: String,
    /// Generated name the object was stored under.
    pub stored_name: String,
    /// Store-relative path, usable with [`FileStore::remove`].
    pub path: String,
    pub size: u64,
}

/// Callback fed fractional progress in `[0.0, 1.0]` while an object is written.
pub type ProgressFn<'a> = &'a (dyn Fn(f32) + Send + Sync);

/// Object store accepting a file plus a destination path prefix.
///
/// The production implementation is [`DiskStore`]; tests substitute their own.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn put(
        &self,
        prefix: &str,
        original_name: &str,
        bytes: &[u8],
        progress: ProgressFn<'_>,
    ) -> Result<StoredFile>;

    async fn remove(&self, path: &str) -> Result<()>;
}

/// File store backed by a local directory tree, serving objects from a
/// configured public base URL.
#[derive(Clone)]
pub struct DiskStore {
    root: PathBuf,
    public_base_url: String,
}

impl DiskStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    /// Collision-free stored name: `<millis>-<random>.<ext>`.
    fn generate_stored_name(original_name: &str) -> String {
        let extension = original_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty());

        let stem = format!(
            "{}-{}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple()
        );

        match extension {
            Some(ext) => format!("{stem}.{}", sanitize_filename::sanitize(ext)),
            None => stem,
        }
    }
}

#[async_trait]
impl FileStore for DiskStore {
    async fn put(
        &self,
        prefix: &str,
        original_name: &str,
        bytes: &[u8],
        progress: ProgressFn<'_>,
    ) -> Result<StoredFile> {
        let stored_name = Self::generate_stored_name(original_name);
        let dir = self.root.join(prefix);
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("failed to create storage directory {}", dir.display()))?;

        let target = dir.join(&stored_name);
        let mut file = fs::File::create(&target)
            .await
            .with_context(|| format!("failed to create {}", target.display()))?;

        let total = bytes.len();
        let mut written = 0usize;
        for chunk in bytes.chunks(WRITE_CHUNK_BYTES) {
            file.write_all(chunk)
                .await
                .with_context(|| format!("failed to write {}", target.display()))?;
            written += chunk.len();
            progress(written as f32 / total.max(1) as f32);
        }
        file.flush()
            .await
            .with_context(|| format!("failed to flush {}", target.display()))?;

        if total == 0 {
            progress(1.0);
        }

        let path = format!("{prefix}/{stored_name}");
        let url = format!("{}/{path}", self.public_base_url.trim_end_matches('/'));

        Ok(StoredFile {
            url,
            stored_name,
            path,
            size: total as u64,
        })
    }

    async fn remove(&self, path: &str) -> Result<()> {
        let target = self.root.join(path);
        fs::remove_file(&target)
            .await
            .with_context(|| format!("failed to remove {}", target.display()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn put_writes_bytes_and_reports_progress() {
        let dir = tempdir().expect("tempdir");
        let store = DiskStore::new(dir.path(), "http://localhost:8080/files");

        let body = vec![7u8; 200 * 1024];
        let fractions = Mutex::new(Vec::new());
        let stored = store
            .put("topic-resources/abc", "lecture one.mp4", &body, &|f| {
                fractions.lock().unwrap().push(f);
            })
            .await
            .expect("put succeeds");

        assert_eq!(stored.size, body.len() as u64);
        assert!(stored.stored_name.ends_with(".mp4"));
        assert_eq!(stored.path, format!("topic-resources/abc/{}", stored.stored_name));
        assert_eq!(
            stored.url,
            format!("http://localhost:8080/files/{}", stored.path)
        );

        let fractions = fractions.into_inner().unwrap();
        assert!(fractions.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(*fractions.last().expect("at least one callback"), 1.0);

        let on_disk = std::fs::read(dir.path().join(&stored.path)).expect("file exists");
        assert_eq!(on_disk.len(), body.len());
    }

    #[tokio::test]
    async fn empty_file_still_completes() {
        let dir = tempdir().expect("tempdir");
        let store = DiskStore::new(dir.path(), "http://localhost:8080/files");

        let fractions = Mutex::new(Vec::new());
        let stored = store
            .put("topic-resources/abc", "empty.txt", &[], &|f| {
                fractions.lock().unwrap().push(f);
            })
            .await
            .expect("put succeeds");

        assert_eq!(stored.size, 0);
        assert_eq!(fractions.into_inner().unwrap(), vec![1.0]);
    }

    #[tokio::test]
    async fn remove_deletes_the_object() {
        let dir = tempdir().expect("tempdir");
        let store = DiskStore::new(dir.path(), "http://localhost:8080/files");

        let stored = store
            .put("topic-resources/abc", "notes.pdf", b"pdf bytes", &|_| {})
            .await
            .expect("put succeeds");
        store.remove(&stored.path).await.expect("remove succeeds");

        assert!(!dir.path().join(&stored.path).exists());
    }

    #[test]
    fn stored_names_keep_only_a_sanitized_extension() {
        let name = DiskStore::generate_stored_name("../../etc/passwd.PDF");
        assert!(name.ends_with(".pdf"));

        let bare = DiskStore::generate_stored_name("README");
        assert!(!bare.contains('.'));
    }
}
