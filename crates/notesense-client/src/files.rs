//! Attachment uploads to the `/files` service.

use std::path::Path;

use async_trait::async_trait;
use futures::future::try_join_all;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tracing::field::Empty;
use tracing::{debug, instrument};

use notesense_core::defaults;
use notesense_core::{Error, FileUploader, Result, Session, UploadedFile};

use crate::config::ClientConfig;
use crate::http::{build_client, decode, send_authorized};

/// Multipart upload client for note attachments.
#[derive(Debug, Clone)]
pub struct FileClient {
    client: Client,
    base_url: String,
    session: Session,
}

impl FileClient {
    pub fn new(config: &ClientConfig, session: Session) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            client: build_client(config.upload_timeout_secs)?,
            base_url: config.files_url.trim_end_matches('/').to_string(),
            session,
        })
    }
}

/// MIME type for the extensions the upload service classifies.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "txt" => "text/plain",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl FileUploader for FileClient {
    #[instrument(skip(self), fields(op = "upload", request_id = Empty, status = Empty, duration_ms = Empty))]
    async fn upload(&self, path: &Path) -> Result<UploadedFile> {
        let meta = tokio::fs::metadata(path).await?;
        if !meta.is_file() {
            return Err(Error::InvalidInput(format!(
                "not a regular file: {}",
                path.display()
            )));
        }
        if meta.len() > defaults::MAX_UPLOAD_BYTES {
            return Err(Error::InvalidInput(format!(
                "{} is {} bytes; uploads are limited to {} bytes",
                path.display(),
                meta.len(),
                defaults::MAX_UPLOAD_BYTES
            )));
        }

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        let bytes = tokio::fs::read(path).await?;
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime_for_path(path))
            .map_err(|e| Error::InvalidInput(format!("Failed to create multipart: {e}")))?;
        let form = Form::new().part("file", part);

        let request = self
            .client
            .post(format!("{}/files", self.base_url))
            .multipart(form);
        let response = send_authorized(&self.session, request).await?;
        let uploaded: UploadedFile = decode(response).await?;
        debug!(file_id = %uploaded.id, kind = ?uploaded.kind, "File uploaded");
        Ok(uploaded)
    }

    /// Uploads run concurrently; the first failure fails the batch.
    async fn upload_many(&self, paths: &[&Path]) -> Result<Vec<UploadedFile>> {
        try_join_all(paths.iter().map(|path| self.upload(path))).await
    }
}
