use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    modules::ServiceError,
    storage::{FileStore, StoredFile},
};

use super::{CreateResourceData, Resource, ResourceType};

/// Extensions accepted for topic uploads; anything else fails per file.
const ALLOWED_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "pdf", "mp4", "avi", "mov", "webm", "mp3", "wav", "ogg",
    "m4a", "txt", "md", "doc", "docx", "ppt", "pptx", "xls", "xlsx", "csv",
];

/// One file taken off the wire, held in memory until stored.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub original_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl IncomingFile {
    fn resource_type(&self) -> ResourceType {
        self.content_type
            .as_deref()
            .and_then(ResourceType::from_mime)
            .unwrap_or_else(|| ResourceType::from_file_name(&self.original_name))
    }

    fn extension(&self) -> String {
        self.original_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Uploading,
    Completed,
    Error,
}

/// Ephemeral per-file progress, keyed by a generated file id. Lives only for
/// the duration of an upload batch.
#[derive(Debug, Clone, Serialize)]
pub struct UploadProgress {
    pub file_id: Uuid,
    pub file_name: String,
    /// Percentage, 0–100.
    pub progress: u8,
    pub status: UploadStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Sink the orchestrator re-emits progress events through.
pub type ProgressSink<'a> = &'a (dyn Fn(UploadProgress) + Send + Sync);

/// Persists resource metadata for a stored upload. Implemented by the
/// resource gateway; tests substitute an in-memory writer.
#[async_trait]
pub trait ResourceWriter: Send + Sync {
    async fn create_uploaded(
        &self,
        topic_id: Uuid,
        user_id: Uuid,
        file: &IncomingFile,
        stored: &StoredFile,
    ) -> Result<Resource, ServiceError>;
}

#[async_trait]
impl ResourceWriter for super::ResourceService {
    async fn create_uploaded(
        &self,
        topic_id: Uuid,
        user_id: Uuid,
        file: &IncomingFile,
        stored: &StoredFile,
    ) -> Result<Resource, ServiceError> {
        let data = CreateResourceData {
            title: file.original_name.clone(),
            description: Some(format!("Uploaded file: {}", file.original_name)),
            kind: file.resource_type(),
            url: None,
            tags: Vec::new(),
            video_metadata: None,
        };

        self.create(
            data,
            topic_id,
            user_id,
            Some(stored.url.clone()),
            Some(stored.stored_name.clone()),
            Some(stored.size as i64),
        )
        .await
    }
}

/// Drives one-or-many file uploads: storage first, then a metadata record per
/// file, with per-file progress and per-file failure isolation.
pub struct UploadOrchestrator {
    store: Arc<dyn FileStore>,
    writer: Arc<dyn ResourceWriter>,
    progress: Mutex<HashMap<Uuid, UploadProgress>>,
    max_file_bytes: u64,
}

impl UploadOrchestrator {
    pub fn new(
        store: Arc<dyn FileStore>,
        writer: Arc<dyn ResourceWriter>,
        max_file_bytes: u64,
    ) -> Self {
        Self {
            store,
            writer,
            progress: Mutex::new(HashMap::new()),
            max_file_bytes,
        }
    }

    /// Upload a batch sequentially. A failed file gets a terminal `error`
    /// event and the batch moves on; only successfully created resources are
    /// returned. Progress state is cleared once the batch settles.
    pub async fn upload_batch(
        &self,
        topic_id: Uuid,
        user_id: Uuid,
        files: Vec<IncomingFile>,
        on_progress: ProgressSink<'_>,
    ) -> Vec<Resource> {
        let mut created = Vec::new();
        let prefix = format!("topic-resources/{topic_id}");

        for file in &files {
            let file_id = Uuid::new_v4();

            if let Err(message) = self.validate(file) {
                self.emit_error(file_id, &file.original_name, message, on_progress);
                continue;
            }

            self.emit(
                UploadProgress {
                    file_id,
                    file_name: file.original_name.clone(),
                    progress: 0,
                    status: UploadStatus::Uploading,
                    error: None,
                },
                on_progress,
            );

            let stored = match self
                .store
                .put(&prefix, &file.original_name, &file.bytes, &|fraction| {
                    self.emit(
                        UploadProgress {
                            file_id,
                            file_name: file.original_name.clone(),
                            progress: (fraction.clamp(0.0, 1.0) * 100.0).round() as u8,
                            status: UploadStatus::Uploading,
                            error: None,
                        },
                        on_progress,
                    );
                })
                .await
            {
                Ok(stored) => stored,
                Err(err) => {
                    error!(?err, file = %file.original_name, "storage upload failed");
                    self.emit_error(
                        file_id,
                        &file.original_name,
                        format!("Upload failed: {err}"),
                        on_progress,
                    );
                    continue;
                }
            };

            match self
                .writer
                .create_uploaded(topic_id, user_id, file, &stored)
                .await
            {
                Ok(resource) => {
                    self.emit(
                        UploadProgress {
                            file_id,
                            file_name: file.original_name.clone(),
                            progress: 100,
                            status: UploadStatus::Completed,
                            error: None,
                        },
                        on_progress,
                    );
                    created.push(resource);
                }
                Err(err) => {
                    error!(
                        error = %err,
                        file = %file.original_name,
                        "failed to persist resource metadata after upload"
                    );
                    self.emit_error(
                        file_id,
                        &file.original_name,
                        err.to_string(),
                        on_progress,
                    );
                }
            }
        }

        info!(
            %topic_id,
            total = files.len(),
            created = created.len(),
            "upload batch settled"
        );
        self.lock_progress().clear();
        created
    }

    /// Snapshot of in-flight progress; empty between batches.
    pub fn active_progress(&self) -> Vec<UploadProgress> {
        self.lock_progress().values().cloned().collect()
    }

    fn validate(&self, file: &IncomingFile) -> Result<(), String> {
        if file.bytes.len() as u64 > self.max_file_bytes {
            return Err(format!(
                "File size must be less than {}MB",
                self.max_file_bytes / (1024 * 1024)
            ));
        }
        let extension = file.extension();
        if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
            return Err("File type not supported".to_string());
        }
        Ok(())
    }

    fn emit(&self, event: UploadProgress, on_progress: ProgressSink<'_>) {
        self.lock_progress().insert(event.file_id, event.clone());
        on_progress(event);
    }

    fn emit_error(
        &self,
        file_id: Uuid,
        file_name: &str,
        message: String,
        on_progress: ProgressSink<'_>,
    ) {
        self.emit(
            UploadProgress {
                file_id,
                file_name: file_name.to_string(),
                progress: 0,
                status: UploadStatus::Error,
                error: Some(message),
            },
            on_progress,
        );
    }

    fn lock_progress(&self) -> MutexGuard<'_, HashMap<Uuid, UploadProgress>> {
        self.progress.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::anyhow;
    use chrono::Utc;

    use super::*;
    use crate::storage::ProgressFn;

    /// Store that fails the nth `put` (0-based) and reports two progress ticks
    /// for every success.
    struct FlakyStore {
        fail_on: Option<usize>,
        calls: AtomicUsize,
    }

    impl FlakyStore {
        fn new(fail_on: Option<usize>) -> Self {
            Self {
                fail_on,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl FileStore for FlakyStore {
        async fn put(
            &self,
            prefix: &str,
            original_name: &str,
            bytes: &[u8],
            progress: ProgressFn<'_>,
        ) -> anyhow::Result<StoredFile> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if Some(call) == self.fail_on {
                return Err(anyhow!("storage rejected the object"));
            }
            progress(0.5);
            progress(1.0);
            Ok(StoredFile {
                url: format!("http://files.test/{prefix}/{original_name}"),
                stored_name: original_name.to_string(),
                path: format!("{prefix}/{original_name}"),
                size: bytes.len() as u64,
            })
        }

        async fn remove(&self, _path: &str) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct RecordingWriter {
        fail: bool,
    }

    #[async_trait]
    impl ResourceWriter for RecordingWriter {
        async fn create_uploaded(
            &self,
            topic_id: Uuid,
            user_id: Uuid,
            file: &IncomingFile,
            stored: &StoredFile,
        ) -> Result<Resource, ServiceError> {
            if self.fail {
                return Err(ServiceError::Backend(anyhow!("insert failed")));
            }
            let now = Utc::now();
            Ok(Resource {
                id: Uuid::new_v4(),
                title: file.original_name.clone(),
                description: String::new(),
                kind: file.resource_type(),
                url: stored.url.clone(),
                file_name: stored.stored_name.clone(),
                file_path: stored.path.clone(),
                topic_id: Some(topic_id),
                uploaded_by: Some(user_id),
                size: stored.size as i64,
                downloads: 0,
                tags: Vec::new(),
                video_metadata: None,
                is_active: true,
                created_at: now,
                updated_at: now,
                uploaded_by_user: None,
            })
        }
    }

    fn file(name: &str) -> IncomingFile {
        IncomingFile {
            original_name: name.to_string(),
            content_type: None,
            bytes: b"content".to_vec(),
        }
    }

    fn orchestrator(fail_on: Option<usize>, writer_fails: bool) -> UploadOrchestrator {
        UploadOrchestrator::new(
            Arc::new(FlakyStore::new(fail_on)),
            Arc::new(RecordingWriter { fail: writer_fails }),
            1024,
        )
    }

    fn collect_events(events: &Mutex<Vec<UploadProgress>>) -> impl Fn(UploadProgress) + Send + Sync + '_ {
        move |event| {
            events
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event);
        }
    }

    #[tokio::test]
    async fn failed_file_does_not_abort_the_batch() {
        let orchestrator = orchestrator(Some(1), false);
        let events = Mutex::new(Vec::new());

        let created = orchestrator
            .upload_batch(
                Uuid::new_v4(),
                Uuid::new_v4(),
                vec![file("a.pdf"), file("b.pdf"), file("c.pdf")],
                &collect_events(&events),
            )
            .await;

        assert_eq!(created.len(), 2);
        assert_eq!(created[0].title, "a.pdf");
        assert_eq!(created[1].title, "c.pdf");

        let events = events.into_inner().unwrap();
        let failure = events
            .iter()
            .find(|event| event.status == UploadStatus::Error)
            .expect("the failed file emits a terminal error event");
        assert_eq!(failure.file_name, "b.pdf");
        assert!(!failure.error.as_deref().unwrap_or_default().is_empty());

        assert!(orchestrator.active_progress().is_empty());
    }

    #[tokio::test]
    async fn completions_arrive_in_input_order() {
        let orchestrator = orchestrator(None, false);
        let events = Mutex::new(Vec::new());

        let created = orchestrator
            .upload_batch(
                Uuid::new_v4(),
                Uuid::new_v4(),
                vec![file("first.pdf"), file("second.pdf")],
                &collect_events(&events),
            )
            .await;

        assert_eq!(created.len(), 2);

        let completions: Vec<_> = events
            .into_inner()
            .unwrap()
            .into_iter()
            .filter(|event| event.status == UploadStatus::Completed)
            .map(|event| event.file_name)
            .collect();
        assert_eq!(completions, vec!["first.pdf", "second.pdf"]);
    }

    #[tokio::test]
    async fn metadata_failure_is_isolated_like_storage_failure() {
        let orchestrator = orchestrator(None, true);
        let events = Mutex::new(Vec::new());

        let created = orchestrator
            .upload_batch(
                Uuid::new_v4(),
                Uuid::new_v4(),
                vec![file("a.pdf")],
                &collect_events(&events),
            )
            .await;

        assert!(created.is_empty());
        let events = events.into_inner().unwrap();
        assert_eq!(events.last().map(|e| e.status), Some(UploadStatus::Error));
        assert!(orchestrator.active_progress().is_empty());
    }

    #[tokio::test]
    async fn oversized_file_fails_validation_without_touching_storage() {
        let orchestrator = UploadOrchestrator::new(
            Arc::new(FlakyStore::new(None)),
            Arc::new(RecordingWriter { fail: false }),
            4,
        );
        let events = Mutex::new(Vec::new());

        let created = orchestrator
            .upload_batch(
                Uuid::new_v4(),
                Uuid::new_v4(),
                vec![file("huge.pdf")],
                &collect_events(&events),
            )
            .await;

        assert!(created.is_empty());
        let events = events.into_inner().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status, UploadStatus::Error);
        assert!(
            events[0]
                .error
                .as_deref()
                .unwrap_or_default()
                .contains("File size")
        );
    }

    #[tokio::test]
    async fn unsupported_extension_is_rejected_per_file() {
        let orchestrator = orchestrator(None, false);
        let events = Mutex::new(Vec::new());

        let created = orchestrator
            .upload_batch(
                Uuid::new_v4(),
                Uuid::new_v4(),
                vec![file("malware.exe"), file("notes.txt")],
                &collect_events(&events),
            )
            .await;

        assert_eq!(created.len(), 1);
        assert_eq!(created[0].title, "notes.txt");

        let events = events.into_inner().unwrap();
        assert_eq!(events[0].status, UploadStatus::Error);
        assert_eq!(
            events[0].error.as_deref(),
            Some("File type not supported")
        );
    }

    #[tokio::test]
    async fn storage_progress_is_rescaled_to_percentages() {
        let orchestrator = orchestrator(None, false);
        let events = Mutex::new(Vec::new());

        orchestrator
            .upload_batch(
                Uuid::new_v4(),
                Uuid::new_v4(),
                vec![file("a.pdf")],
                &collect_events(&events),
            )
            .await;

        let percentages: Vec<_> = events
            .into_inner()
            .unwrap()
            .into_iter()
            .map(|event| event.progress)
            .collect();
        assert_eq!(percentages, vec![0, 50, 100, 100]);
    }
}
