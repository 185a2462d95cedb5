use std::time::Duration;

use anyhow::anyhow;
use axum::{
    Json, Router,
    extract::{Multipart, Path as AxumPath, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tokio::time::sleep;
use tracing::warn;
use uuid::Uuid;

pub mod uploads;

use crate::{
    modules::ServiceError,
    notify::{Notifier, ResourceNotification},
    utils::video::{self, VideoMetadata},
    web::{ApiMessage, AppState, json_error, read_upload_form, service_error},
};

use uploads::UploadStatus;

const UPDATE_MAX_ATTEMPTS: u32 = 3;
const UPDATE_RETRY_DELAY_MS: u64 = 1000;
const UPDATE_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(15);

const RESOURCE_COLUMNS: &str = "r.id, r.title, r.description, r.type AS kind, r.url, \
     r.file_name, r.file_path, r.topic_id, r.uploaded_by, r.size, r.downloads, r.tags, \
     r.video_metadata, r.is_active, r.created_at, r.updated_at, \
     u.first_name AS uploader_first_name, u.last_name AS uploader_last_name, \
     u.email AS uploader_email";

/// Kinds of learning assets a topic can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Pdf,
    Video,
    VideoLink,
    Audio,
    Image,
    Link,
    Document,
    Presentation,
    Spreadsheet,
    Text,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Pdf => "pdf",
            ResourceType::Video => "video",
            ResourceType::VideoLink => "video_link",
            ResourceType::Audio => "audio",
            ResourceType::Image => "image",
            ResourceType::Link => "link",
            ResourceType::Document => "document",
            ResourceType::Presentation => "presentation",
            ResourceType::Spreadsheet => "spreadsheet",
            ResourceType::Text => "text",
        }
    }

    /// Parse a stored type string, falling back to `document` for anything
    /// the enumeration does not know.
    pub fn from_db(value: &str) -> Self {
        match value {
            "pdf" => ResourceType::Pdf,
            "video" => ResourceType::Video,
            "video_link" => ResourceType::VideoLink,
            "audio" => ResourceType::Audio,
            "image" => ResourceType::Image,
            "link" => ResourceType::Link,
            "presentation" => ResourceType::Presentation,
            "spreadsheet" => ResourceType::Spreadsheet,
            "text" => ResourceType::Text,
            _ => ResourceType::Document,
        }
    }

    pub fn from_mime(content_type: &str) -> Option<Self> {
        let parsed: mime::Mime = content_type.parse().ok()?;
        let top = parsed.type_();

        if top == mime::IMAGE {
            Some(ResourceType::Image)
        } else if top == mime::VIDEO {
            Some(ResourceType::Video)
        } else if top == mime::AUDIO {
            Some(ResourceType::Audio)
        } else if top == mime::TEXT {
            Some(ResourceType::Text)
        } else {
            let essence = parsed.essence_str();
            if essence == "application/pdf" {
                Some(ResourceType::Pdf)
            } else if essence.contains("word") || essence.contains("document") {
                Some(ResourceType::Document)
            } else if essence.contains("powerpoint") || essence.contains("presentation") {
                Some(ResourceType::Presentation)
            } else if essence.contains("excel") || essence.contains("spreadsheet") {
                Some(ResourceType::Spreadsheet)
            } else {
                None
            }
        }
    }

    pub fn from_file_name(name: &str) -> Self {
        let extension = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => ResourceType::Pdf,
            "mp4" | "avi" | "mov" | "wmv" | "webm" | "mkv" => ResourceType::Video,
            "mp3" | "wav" | "ogg" | "m4a" => ResourceType::Audio,
            "jpg" | "jpeg" | "png" | "gif" | "bmp" | "webp" => ResourceType::Image,
            "doc" | "docx" => ResourceType::Document,
            "ppt" | "pptx" => ResourceType::Presentation,
            "xls" | "xlsx" | "csv" => ResourceType::Spreadsheet,
            "txt" | "md" => ResourceType::Text,
            _ => ResourceType::Document,
        }
    }
}

/// Uploader identity joined onto a resource row.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceUploader {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl ResourceUploader {
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() {
            self.email.clone()
        } else {
            name.to_string()
        }
    }
}

/// A learning asset attached to a topic.
#[derive(Debug, Clone, Serialize)]
pub struct Resource {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: ResourceType,
    pub url: String,
    pub file_name: String,
    pub file_path: String,
    pub topic_id: Option<Uuid>,
    pub uploaded_by: Option<Uuid>,
    pub size: i64,
    pub downloads: i32,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_metadata: Option<VideoMetadata>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_by_user: Option<ResourceUploader>,
}

/// Caller-supplied fields for a new resource record.
#[derive(Debug, Clone)]
pub struct CreateResourceData {
    pub title: String,
    pub description: Option<String>,
    pub kind: ResourceType,
    pub url: Option<String>,
    pub tags: Vec<String>,
    pub video_metadata: Option<VideoMetadata>,
}

/// Partial update; absent fields keep their stored values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateResourceData {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Gateway for topic resource CRUD against the backing store.
#[derive(Clone)]
pub struct ResourceService {
    pool: PgPool,
    notifier: Notifier,
}

impl ResourceService {
    pub fn new(pool: PgPool, notifier: Notifier) -> Self {
        Self { pool, notifier }
    }

    /// Active resources for a topic, newest first, joined with uploader identity.
    pub async fn list(&self, topic_id: Uuid) -> Result<Vec<Resource>, ServiceError> {
        let rows = sqlx::query_as::<_, ResourceRow>(&format!(
            "SELECT {RESOURCE_COLUMNS} FROM topic_resources r \
             LEFT JOIN users u ON u.id = r.uploaded_by \
             WHERE r.topic_id = $1 AND r.is_active = TRUE \
             ORDER BY r.created_at DESC"
        ))
        .bind(topic_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ResourceRow::into_resource).collect())
    }

    /// A user's own active uploads, newest first.
    pub async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Resource>, ServiceError> {
        let rows = sqlx::query_as::<_, ResourceRow>(&format!(
            "SELECT {RESOURCE_COLUMNS} FROM topic_resources r \
             LEFT JOIN users u ON u.id = r.uploaded_by \
             WHERE r.uploaded_by = $1 AND r.is_active = TRUE \
             ORDER BY r.created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ResourceRow::into_resource).collect())
    }

    /// Fetch a single resource by id, bypassing the active filter.
    pub async fn get(&self, resource_id: Uuid) -> Result<Resource, ServiceError> {
        let row = sqlx::query_as::<_, ResourceRow>(&format!(
            "SELECT {RESOURCE_COLUMNS} FROM topic_resources r \
             LEFT JOIN users u ON u.id = r.uploaded_by \
             WHERE r.id = $1"
        ))
        .bind(resource_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ServiceError::NotFound("Resource"))?;

        Ok(row.into_resource())
    }

    /// Insert a resource row and return the mapped resource. On success, topic
    /// subscribers are notified asynchronously; a notification failure is
    /// logged and does not fail the create.
    pub async fn create(
        &self,
        data: CreateResourceData,
        topic_id: Uuid,
        user_id: Uuid,
        url: Option<String>,
        file_name: Option<String>,
        file_size: Option<i64>,
    ) -> Result<Resource, ServiceError> {
        let effective_url = url
            .clone()
            .or_else(|| data.url.clone())
            .unwrap_or_default();
        let file_path = match (&url, &file_name) {
            (Some(_), Some(name)) => format!("topic-resources/{topic_id}/{name}"),
            _ => String::new(),
        };
        let metadata = data
            .video_metadata
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|err| ServiceError::Backend(anyhow!(err)))?;

        let resource_id: Uuid = sqlx::query_scalar(
            "INSERT INTO topic_resources \
             (id, title, description, type, url, file_name, file_path, topic_id, uploaded_by, \
              size, tags, video_metadata, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, TRUE) \
             RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(&data.title)
        .bind(data.description.as_deref().unwrap_or_default())
        .bind(data.kind.as_str())
        .bind(&effective_url)
        .bind(file_name.as_deref().unwrap_or_default())
        .bind(&file_path)
        .bind(topic_id)
        .bind(user_id)
        .bind(file_size)
        .bind(&data.tags)
        .bind(metadata)
        .fetch_one(&self.pool)
        .await?;

        let resource = self.get(resource_id).await?;

        let author_name = resource
            .uploaded_by_user
            .as_ref()
            .map(ResourceUploader::display_name)
            .unwrap_or_else(|| "Unknown".to_string());
        self.notifier.notify_new_resource(ResourceNotification {
            topic_id,
            resource_id: resource.id,
            resource_title: resource.title.clone(),
            resource_type: resource.kind.as_str().to_string(),
            author_name,
        });

        Ok(resource)
    }

    /// Update title/description/tags with bounded retry: up to three attempts
    /// with exponential backoff and a per-attempt timeout.
    pub async fn update(
        &self,
        resource_id: Uuid,
        changes: UpdateResourceData,
    ) -> Result<Resource, ServiceError> {
        let mut attempt = 0;
        let mut last_error = None;

        while attempt < UPDATE_MAX_ATTEMPTS {
            attempt += 1;

            match tokio::time::timeout(
                UPDATE_ATTEMPT_TIMEOUT,
                self.apply_update(resource_id, &changes),
            )
            .await
            {
                Ok(Ok(resource)) => return Ok(resource),
                // A missing row will not appear on retry.
                Ok(Err(err @ ServiceError::NotFound(_))) => return Err(err),
                Ok(Err(err)) => {
                    warn!(
                        %resource_id,
                        attempt,
                        max_attempts = UPDATE_MAX_ATTEMPTS,
                        error = %err,
                        "resource update failed, will retry"
                    );
                    last_error = Some(err);
                }
                Err(_) => {
                    warn!(
                        %resource_id,
                        attempt,
                        max_attempts = UPDATE_MAX_ATTEMPTS,
                        "resource update attempt timed out"
                    );
                    last_error = Some(ServiceError::Backend(anyhow!(
                        "resource update timed out after {}s",
                        UPDATE_ATTEMPT_TIMEOUT.as_secs()
                    )));
                }
            }

            if attempt < UPDATE_MAX_ATTEMPTS {
                let delay = UPDATE_RETRY_DELAY_MS * 2_u64.pow(attempt - 1);
                sleep(Duration::from_millis(delay)).await;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ServiceError::Backend(anyhow!(
                "resource update failed after {UPDATE_MAX_ATTEMPTS} attempts"
            ))
        }))
    }

    async fn apply_update(
        &self,
        resource_id: Uuid,
        changes: &UpdateResourceData,
    ) -> Result<Resource, ServiceError> {
        let updated = sqlx::query(
            "UPDATE topic_resources SET \
             title = COALESCE($2, title), \
             description = COALESCE($3, description), \
             tags = COALESCE($4, tags), \
             updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(resource_id)
        .bind(changes.title.as_deref())
        .bind(changes.description.as_deref())
        .bind(changes.tags.as_deref())
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(ServiceError::NotFound("Resource"));
        }

        self.get(resource_id).await
    }

    /// Flip the active flag off; the row itself is never removed.
    pub async fn soft_delete(&self, resource_id: Uuid) -> Result<(), ServiceError> {
        let updated = sqlx::query(
            "UPDATE topic_resources SET is_active = FALSE, updated_at = NOW() WHERE id = $1",
        )
        .bind(resource_id)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(ServiceError::NotFound("Resource"));
        }
        Ok(())
    }

    /// Read-then-write increment. Two concurrent increments can lose one
    /// update; the backing store offers no atomic counter at this seam.
    pub async fn increment_downloads(&self, resource_id: Uuid) -> Result<(), ServiceError> {
        let downloads: i32 =
            sqlx::query_scalar("SELECT downloads FROM topic_resources WHERE id = $1")
                .bind(resource_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(ServiceError::NotFound("Resource"))?;

        sqlx::query("UPDATE topic_resources SET downloads = $2 WHERE id = $1")
            .bind(resource_id)
            .bind(downloads + 1)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Validate and classify a video URL, then create a `video_link` resource
    /// carrying the derived platform metadata.
    pub async fn create_video_link(
        &self,
        topic_id: Uuid,
        url: &str,
        title: &str,
        description: Option<String>,
        user_id: Uuid,
    ) -> Result<Resource, ServiceError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ServiceError::validation("Please enter a video URL"));
        }
        if !video::is_valid_video_url(url) {
            return Err(ServiceError::validation(
                "Please enter a valid video URL (YouTube, Vimeo, or direct video file)",
            ));
        }
        let title = title.trim();
        if title.is_empty() {
            return Err(ServiceError::validation(
                "Please enter a title for the video",
            ));
        }

        let metadata = video::classify(url);

        self.create(
            CreateResourceData {
                title: title.to_string(),
                description,
                kind: ResourceType::VideoLink,
                url: Some(url.to_string()),
                tags: Vec::new(),
                video_metadata: Some(metadata),
            },
            topic_id,
            user_id,
            None,
            None,
            None,
        )
        .await
    }
}

/// Raw row shape. Every non-key column is optional; [`into_resource`]
/// supplies defaults so the external shape is never trusted directly.
///
/// [`into_resource`]: ResourceRow::into_resource
#[derive(sqlx::FromRow)]
struct ResourceRow {
    id: Uuid,
    title: Option<String>,
    description: Option<String>,
    kind: Option<String>,
    url: Option<String>,
    file_name: Option<String>,
    file_path: Option<String>,
    topic_id: Option<Uuid>,
    uploaded_by: Option<Uuid>,
    size: Option<i64>,
    downloads: Option<i32>,
    tags: Option<Vec<String>>,
    video_metadata: Option<serde_json::Value>,
    is_active: Option<bool>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    uploader_first_name: Option<String>,
    uploader_last_name: Option<String>,
    uploader_email: Option<String>,
}

impl ResourceRow {
    fn into_resource(self) -> Resource {
        let kind = self
            .kind
            .as_deref()
            .map(ResourceType::from_db)
            .unwrap_or(ResourceType::Document);
        let url = self.url.unwrap_or_default();

        let mut video_metadata = self
            .video_metadata
            .and_then(|value| serde_json::from_value::<VideoMetadata>(value).ok());
        // A video_link always carries platform metadata; reclassify the URL
        // when a row predates the column.
        if kind == ResourceType::VideoLink && video_metadata.is_none() {
            video_metadata = Some(video::classify(&url));
        }

        let uploaded_by_user = self.uploaded_by.map(|id| ResourceUploader {
            id,
            first_name: self.uploader_first_name.unwrap_or_default(),
            last_name: self.uploader_last_name.unwrap_or_default(),
            email: self.uploader_email.unwrap_or_default(),
        });

        Resource {
            id: self.id,
            title: self.title.unwrap_or_else(|| "Untitled".to_string()),
            description: self.description.unwrap_or_default(),
            kind,
            url,
            file_name: self.file_name.unwrap_or_default(),
            file_path: self.file_path.unwrap_or_default(),
            topic_id: self.topic_id,
            uploaded_by: self.uploaded_by,
            size: self.size.unwrap_or(0),
            downloads: self.downloads.unwrap_or(0),
            tags: self.tags.unwrap_or_default(),
            video_metadata,
            is_active: self.is_active.unwrap_or(true),
            created_at: self.created_at.unwrap_or_else(Utc::now),
            updated_at: self.updated_at.unwrap_or_else(Utc::now),
            uploaded_by_user,
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/topics/:topic_id/resources",
            get(list_resources).post(upload_resources),
        )
        .route(
            "/api/topics/:topic_id/resources/video-link",
            post(create_video_link),
        )
        .route(
            "/api/resources/:id",
            get(get_resource)
                .patch(update_resource)
                .delete(delete_resource),
        )
        .route("/api/resources/:id/downloads", post(record_download))
        .route("/api/users/:user_id/resources", get(list_user_resources))
        .route("/api/uploads/progress", get(upload_progress))
}

async fn list_resources(
    State(state): State<AppState>,
    AxumPath(topic_id): AxumPath<Uuid>,
) -> Result<Json<Vec<Resource>>, (StatusCode, Json<ApiMessage>)> {
    state
        .resources()
        .list(topic_id)
        .await
        .map(Json)
        .map_err(|err| service_error(err, "Failed to load topic resources."))
}

async fn list_user_resources(
    State(state): State<AppState>,
    AxumPath(user_id): AxumPath<Uuid>,
) -> Result<Json<Vec<Resource>>, (StatusCode, Json<ApiMessage>)> {
    state
        .resources()
        .list_by_user(user_id)
        .await
        .map(Json)
        .map_err(|err| service_error(err, "Failed to load user resources."))
}

async fn get_resource(
    State(state): State<AppState>,
    AxumPath(resource_id): AxumPath<Uuid>,
) -> Result<Json<Resource>, (StatusCode, Json<ApiMessage>)> {
    state
        .resources()
        .get(resource_id)
        .await
        .map(Json)
        .map_err(|err| service_error(err, "Failed to load the resource."))
}

#[derive(Serialize)]
struct UploadFailure {
    file_name: String,
    error: String,
}

#[derive(Serialize)]
struct UploadResponse {
    created: Vec<Resource>,
    failures: Vec<UploadFailure>,
}

async fn upload_resources(
    State(state): State<AppState>,
    AxumPath(topic_id): AxumPath<Uuid>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, (StatusCode, Json<ApiMessage>)> {
    let form = read_upload_form(multipart)
        .await
        .map_err(|err| json_error(StatusCode::BAD_REQUEST, err.message().to_string()))?;

    let user_id = form
        .first_text("uploaded_by")
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
        .ok_or_else(|| {
            json_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                "A valid `uploaded_by` user id is required.",
            )
        })?;

    if form.files.is_empty() {
        return Err(json_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Select at least one file to upload.",
        ));
    }

    let failures = std::sync::Mutex::new(Vec::new());
    let created = state
        .uploader()
        .upload_batch(topic_id, user_id, form.files, &|event| {
            if event.status == UploadStatus::Error {
                failures
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .push(UploadFailure {
                        file_name: event.file_name,
                        error: event.error.unwrap_or_default(),
                    });
            }
        })
        .await;

    let failures = failures
        .into_inner()
        .unwrap_or_else(std::sync::PoisonError::into_inner);

    Ok(Json(UploadResponse { created, failures }))
}

async fn upload_progress(
    State(state): State<AppState>,
) -> Json<Vec<uploads::UploadProgress>> {
    Json(state.uploader().active_progress())
}

#[derive(Deserialize)]
struct CreateVideoLinkRequest {
    url: String,
    title: String,
    #[serde(default)]
    description: Option<String>,
    uploaded_by: Uuid,
}

async fn create_video_link(
    State(state): State<AppState>,
    AxumPath(topic_id): AxumPath<Uuid>,
    Json(request): Json<CreateVideoLinkRequest>,
) -> Result<(StatusCode, Json<Resource>), (StatusCode, Json<ApiMessage>)> {
    state
        .resources()
        .create_video_link(
            topic_id,
            &request.url,
            &request.title,
            request.description,
            request.uploaded_by,
        )
        .await
        .map(|resource| (StatusCode::CREATED, Json(resource)))
        .map_err(|err| service_error(err, "Failed to add video link."))
}

async fn update_resource(
    State(state): State<AppState>,
    AxumPath(resource_id): AxumPath<Uuid>,
    Json(changes): Json<UpdateResourceData>,
) -> Result<Json<Resource>, (StatusCode, Json<ApiMessage>)> {
    state
        .resources()
        .update(resource_id, changes)
        .await
        .map(Json)
        .map_err(|err| service_error(err, "Failed to update the resource."))
}

async fn delete_resource(
    State(state): State<AppState>,
    AxumPath(resource_id): AxumPath<Uuid>,
) -> Result<StatusCode, (StatusCode, Json<ApiMessage>)> {
    state
        .resources()
        .soft_delete(resource_id)
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(|err| service_error(err, "Failed to delete the resource."))
}

async fn record_download(
    State(state): State<AppState>,
    AxumPath(resource_id): AxumPath<Uuid>,
) -> Result<StatusCode, (StatusCode, Json<ApiMessage>)> {
    state
        .resources()
        .increment_downloads(resource_id)
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(|err| service_error(err, "Failed to record the download."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::video::VideoPlatform;

    fn bare_row(id: Uuid) -> ResourceRow {
        ResourceRow {
            id,
            title: None,
            description: None,
            kind: None,
            url: None,
            file_name: None,
            file_path: None,
            topic_id: None,
            uploaded_by: None,
            size: None,
            downloads: None,
            tags: None,
            video_metadata: None,
            is_active: None,
            created_at: None,
            updated_at: None,
            uploader_first_name: None,
            uploader_last_name: None,
            uploader_email: None,
        }
    }

    #[test]
    fn mapping_defaults_every_optional_field() {
        let id = Uuid::new_v4();
        let resource = bare_row(id).into_resource();

        assert_eq!(resource.id, id);
        assert_eq!(resource.title, "Untitled");
        assert_eq!(resource.description, "");
        assert_eq!(resource.kind, ResourceType::Document);
        assert_eq!(resource.url, "");
        assert_eq!(resource.size, 0);
        assert_eq!(resource.downloads, 0);
        assert!(resource.tags.is_empty());
        assert!(resource.is_active);
        assert!(resource.uploaded_by_user.is_none());
        // Timestamps default to "now", never an invalid date.
        assert!(resource.created_at <= Utc::now());
    }

    #[test]
    fn unknown_type_strings_fall_back_to_document() {
        let mut row = bare_row(Uuid::new_v4());
        row.kind = Some("hologram".to_string());

        assert_eq!(row.into_resource().kind, ResourceType::Document);
    }

    #[test]
    fn video_link_rows_backfill_platform_metadata() {
        let mut row = bare_row(Uuid::new_v4());
        row.kind = Some("video_link".to_string());
        row.url = Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string());

        let resource = row.into_resource();
        let metadata = resource.video_metadata.expect("metadata backfilled");
        assert_eq!(metadata.platform, VideoPlatform::Youtube);
    }

    #[test]
    fn stored_metadata_wins_over_reclassification() {
        let mut row = bare_row(Uuid::new_v4());
        row.kind = Some("video_link".to_string());
        row.url = Some("https://vimeo.com/12345".to_string());
        row.video_metadata = Some(serde_json::json!({
            "platform": "vimeo",
            "title": "Guest lecture",
        }));

        let metadata = row.into_resource().video_metadata.expect("metadata kept");
        assert_eq!(metadata.platform, VideoPlatform::Vimeo);
        assert_eq!(metadata.title.as_deref(), Some("Guest lecture"));
    }

    #[test]
    fn uploader_join_maps_to_display_identity() {
        let mut row = bare_row(Uuid::new_v4());
        let uploader_id = Uuid::new_v4();
        row.uploaded_by = Some(uploader_id);
        row.uploader_first_name = Some("Thandi".to_string());
        row.uploader_last_name = Some("Nkosi".to_string());
        row.uploader_email = Some("thandi@example.edu".to_string());

        let resource = row.into_resource();
        let uploader = resource.uploaded_by_user.expect("uploader mapped");
        assert_eq!(uploader.id, uploader_id);
        assert_eq!(uploader.display_name(), "Thandi Nkosi");
    }

    #[test]
    fn uploader_display_name_falls_back_to_email() {
        let uploader = ResourceUploader {
            id: Uuid::new_v4(),
            first_name: String::new(),
            last_name: String::new(),
            email: "tutor@example.edu".to_string(),
        };

        assert_eq!(uploader.display_name(), "tutor@example.edu");
    }

    #[test]
    fn mime_types_map_to_resource_kinds() {
        assert_eq!(
            ResourceType::from_mime("application/pdf"),
            Some(ResourceType::Pdf)
        );
        assert_eq!(
            ResourceType::from_mime("video/mp4"),
            Some(ResourceType::Video)
        );
        assert_eq!(
            ResourceType::from_mime(
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            ),
            Some(ResourceType::Document)
        );
        assert_eq!(ResourceType::from_mime("application/zip"), None);
        assert_eq!(ResourceType::from_mime("garbage"), None);
    }

    #[test]
    fn file_names_map_to_resource_kinds() {
        assert_eq!(
            ResourceType::from_file_name("lecture.MP4"),
            ResourceType::Video
        );
        assert_eq!(ResourceType::from_file_name("notes.pdf"), ResourceType::Pdf);
        assert_eq!(
            ResourceType::from_file_name("mystery.bin"),
            ResourceType::Document
        );
    }

    #[test]
    fn type_strings_round_trip() {
        for kind in [
            ResourceType::Pdf,
            ResourceType::VideoLink,
            ResourceType::Spreadsheet,
        ] {
            assert_eq!(ResourceType::from_db(kind.as_str()), kind);
        }
    }
}
