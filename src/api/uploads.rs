use reqwest::multipart::{Form, Part};
use std::path::Path;
use tracing::debug;

use super::api_types::ApiUploadedFiles;
use super::gateway::HttpGateway;
use super::types::UploadedFile;
use crate::error::{ApiError, ApiResult};

pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";
pub const DEFAULT_AUDIO_MIME: &str = "audio/m4a";
const DEFAULT_FILE_MIME: &str = "application/octet-stream";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
  Image,
  Audio,
  Other,
}

impl MediaKind {
  fn default_mime(self) -> &'static str {
    match self {
      MediaKind::Image => DEFAULT_IMAGE_MIME,
      MediaKind::Audio => DEFAULT_AUDIO_MIME,
      MediaKind::Other => DEFAULT_FILE_MIME,
    }
  }
}

/// MIME type from the file extension, falling back to the kind's default.
pub fn guess_mime(path: &Path, kind: MediaKind) -> &'static str {
  let ext = path
    .extension()
    .and_then(|e| e.to_str())
    .map(|e| e.to_ascii_lowercase());
  match ext.as_deref() {
    Some("jpg" | "jpeg") => "image/jpeg",
    Some("png") => "image/png",
    Some("gif") => "image/gif",
    Some("webp") => "image/webp",
    Some("heic") => "image/heic",
    Some("m4a") => "audio/m4a",
    Some("mp3") => "audio/mpeg",
    Some("wav") => "audio/wav",
    Some("aac") => "audio/aac",
    Some("caf") => "audio/x-caf",
    Some("pdf") => "application/pdf",
    _ => kind.default_mime(),
  }
}

#[derive(Clone)]
pub struct UploadApi {
  gateway: HttpGateway,
}

impl UploadApi {
  pub fn new(gateway: HttpGateway) -> Self {
    Self { gateway }
  }

  pub async fn upload_image(&self, path: &Path) -> ApiResult<UploadedFile> {
    let form = Form::new().part("file", file_part(path, MediaKind::Image).await?);
    self.gateway.upload("/upload/image", form).await
  }

  pub async fn upload_audio(&self, path: &Path) -> ApiResult<UploadedFile> {
    let form = Form::new().part("file", file_part(path, MediaKind::Audio).await?);
    self.gateway.upload("/upload/audio", form).await
  }

  pub async fn upload_files(&self, paths: &[&Path]) -> ApiResult<Vec<UploadedFile>> {
    if paths.is_empty() {
      return Err(ApiError::validation("Choose at least one file"));
    }
    let mut form = Form::new();
    for path in paths {
      form = form.part("files", file_part(path, MediaKind::Other).await?);
    }
    let files: ApiUploadedFiles = self.gateway.upload("/upload/files", form).await?;
    Ok(files.into_files())
  }
}

async fn file_part(path: &Path, kind: MediaKind) -> ApiResult<Part> {
  let bytes = tokio::fs::read(path)
    .await
    .map_err(|e| ApiError::validation(format!("Could not read {}: {}", path.display(), e)))?;
  let file_name = path
    .file_name()
    .and_then(|n| n.to_str())
    .unwrap_or("upload")
    .to_string();
  let mime = guess_mime(path, kind);
  debug!(file = %path.display(), mime, size = bytes.len(), "uploading");

  Part::bytes(bytes)
    .file_name(file_name)
    .mime_str(mime)
    .map_err(|e| ApiError::Decode(e.to_string()))
}
