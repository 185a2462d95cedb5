use std::collections::HashMap;

use axum::extract::Multipart;

use crate::modules::resources::uploads::IncomingFile;

/// Files accepted per multipart batch.
const MAX_BATCH_FILES: usize = 10;

/// Error returned while reading a multipart upload form.
#[derive(Debug)]
pub struct UploadFormError {
    message: String,
}

impl UploadFormError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for UploadFormError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for UploadFormError {}

/// Parsed multipart form: in-memory files plus any plain text fields.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub files: Vec<IncomingFile>,
    pub text_fields: HashMap<String, Vec<String>>,
}

impl UploadForm {
    pub fn first_text(&self, field_name: &str) -> Option<&str> {
        self.text_fields
            .get(field_name)
            .and_then(|values| values.first().map(|value| value.as_str()))
    }
}

/// Read a multipart form, collecting `files` entries into memory. File
/// validation (size, extension) is the upload orchestrator's job; this layer
/// only enforces the batch shape.
pub async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, UploadFormError> {
    let mut form = UploadForm::default();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|err| UploadFormError::new(format!("failed to parse the upload form: {err}")))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        if field.file_name().is_none() {
            let value = field.text().await.map_err(|err| {
                UploadFormError::new(format!("failed to read field `{field_name}`: {err}"))
            })?;
            form.text_fields.entry(field_name).or_default().push(value);
            continue;
        }

        if field_name != "files" {
            return Err(UploadFormError::new(format!(
                "unsupported file field: `{field_name}`"
            )));
        }

        if form.files.len() >= MAX_BATCH_FILES {
            return Err(UploadFormError::new(format!(
                "too many files in one batch (limit {MAX_BATCH_FILES})"
            )));
        }

        let original_name = field.file_name().unwrap_or("upload.bin").to_string();
        let content_type = field.content_type().map(|value| value.to_string());

        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(|err| {
            UploadFormError::new(format!("failed to read upload data: {err}"))
        })? {
            bytes.extend_from_slice(&chunk);
        }

        form.files.push(IncomingFile {
            original_name,
            content_type,
            bytes,
        });
    }

    Ok(form)
}
