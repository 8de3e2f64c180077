use std::{fmt, str::FromStr};

use actix_multipart::form::{tempfile::TempFile, text::Text, MultipartForm};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

// ───── Categories ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FileCategory {
    ProfilePicture,
    Resume,
    #[default]
    Document,
}

impl FileCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileCategory::ProfilePicture => "profile_picture",
            FileCategory::Resume => "resume",
            FileCategory::Document => "document",
        }
    }

    /// Directory under the uploads root holding this category's files.
    pub fn storage_dir(&self) -> &'static str {
        match self {
            FileCategory::ProfilePicture => "profile-pictures",
            FileCategory::Resume => "resumes",
            FileCategory::Document => "documents",
        }
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FileCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "profile_picture" | "profile_pic" | "avatar" => Ok(FileCategory::ProfilePicture),
            "resume" => Ok(FileCategory::Resume),
            "document" => Ok(FileCategory::Document),
            other => Err(format!("Unknown file type: {}", other)),
        }
    }
}

// ───── Database Models ───────────────────────────────────────────────

/// Row of the legacy `files` table. `file_data` carries the encoded metadata blob.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FileRow {
    pub file_id: Uuid,
    pub file_data: String,
    pub file_path: String,
}

#[derive(Debug, Clone)]
pub struct FileRowInsert {
    pub file_id: Uuid,
    pub file_data: String,
    pub file_path: String,
}

/// Decoded content of `files.file_data`.
#[derive(Debug, Clone, PartialEq)]
pub struct FileMetadata {
    pub user_id: Uuid,
    pub category: FileCategory,
    pub size: u64,
    pub mime_type: String,
    pub created_at: DateTime<Utc>,
    pub has_thumbnail: bool,
}

/// Fully reconstructed file record.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category: FileCategory,
    pub size: u64,
    pub mime_type: String,
    pub created_at: DateTime<Utc>,
    pub file_path: String,
    pub thumbnail_path: Option<String>,
}

impl FileRecord {
    pub fn content_url(&self) -> String {
        content_url(&self.id)
    }

    pub fn file_name(&self) -> &str {
        self.file_path
            .rsplit('/')
            .next()
            .unwrap_or(self.file_path.as_str())
    }
}

pub fn content_url(id: &Uuid) -> String {
    format!("/api/files/{}/content", id)
}

// ───── Content access ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FileVariant {
    #[default]
    Original,
    Thumbnail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Inline,
    Attachment,
}

#[derive(Debug)]
pub struct FileContent {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub file_name: String,
    pub disposition: Disposition,
}

/// Upload accepted by the file service, already read into memory.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub file_name: Option<String>,
}

// ───── API Models ───────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecordResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub file_type: FileCategory,
    pub file_size: u64,
    pub mime_type: String,
    pub file_name: String,
    pub created_at: DateTime<Utc>,
    pub url: String,
    pub thumbnail_url: Option<String>,
}

impl From<FileRecord> for FileRecordResponse {
    fn from(record: FileRecord) -> Self {
        let url = record.content_url();
        let thumbnail_url = record
            .thumbnail_path
            .as_ref()
            .map(|_| format!("{}?variant=thumbnail", url));

        Self {
            id: record.id,
            user_id: record.user_id,
            file_type: record.category,
            file_size: record.size,
            mime_type: record.mime_type.clone(),
            file_name: record.file_name().to_string(),
            created_at: record.created_at,
            url,
            thumbnail_url,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FileDeletedResponse {
    pub id: Uuid,
    pub deleted: bool,
}

// ───── Input & Validation ───────────────────────────────────────────

#[derive(Debug, MultipartForm)]
pub struct FileUploadForm {
    #[multipart(rename = "type")]
    pub file_type: Text<String>,

    #[multipart(limit = "12MB")]
    pub file: Option<TempFile>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct FileListQuery {
    #[serde(rename = "type")]
    pub file_type: Option<String>,

    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: i64,

    #[serde(default)]
    #[validate(range(min = 0, message = "Offset cannot be negative"))]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Deserialize, Default)]
pub struct ContentQuery {
    #[serde(default)]
    pub variant: FileVariant,
}
