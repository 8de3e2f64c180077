//! Codec for the `files.file_data` column.
//!
//! The legacy `files` table only has an id, a path and one short text column, so
//! everything else about a file is packed into that column as a compact JSON
//! object with single-letter keys. On read the full MIME type is rebuilt from the
//! stored subtype and the thumbnail path from the `thumb_` naming convention.

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::file::{FileCategory, FileMetadata, FileRecord, FileRow};

/// Capacity of `files.file_data` (VARCHAR(255)).
pub const METADATA_COLUMN_CAPACITY: usize = 255;

pub const THUMBNAIL_PREFIX: &str = "thumb_";

const IMAGE_SUBTYPES: [&str; 5] = ["jpeg", "jpg", "png", "gif", "webp"];
const DEFAULT_SUBTYPE: &str = "octet-stream";

#[derive(Debug, Display)]
pub enum FileMetadataError {
    #[display("Malformed file metadata: {_0}")]
    Malformed(String),

    #[display("Encoded file metadata is {_0} characters, column holds 255")]
    TooLong(usize),
}

impl std::error::Error for FileMetadataError {}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
struct StoredMetadata {
    #[serde(rename = "u")]
    user_id: Uuid,
    #[serde(rename = "t")]
    file_type: FileCategory,
    #[serde(rename = "s")]
    size: u64,
    #[serde(rename = "m")]
    mime_subtype: String,
    #[serde(rename = "c", with = "compact_time")]
    created: DateTime<Utc>,
    #[serde(rename = "h")]
    thumbnail: bool,
}

impl Default for StoredMetadata {
    fn default() -> Self {
        Self {
            user_id: Uuid::nil(),
            file_type: FileCategory::default(),
            size: 0,
            mime_subtype: DEFAULT_SUBTYPE.to_string(),
            created: DateTime::<Utc>::UNIX_EPOCH,
            thumbnail: false,
        }
    }
}

/// Whole-second RFC 3339 in UTC: short, and sorts lexically in SQL.
mod compact_time {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

/// Serializes metadata into the compact column format.
pub fn encode(metadata: &FileMetadata) -> Result<String, FileMetadataError> {
    let stored = StoredMetadata {
        user_id: metadata.user_id,
        file_type: metadata.category,
        size: metadata.size,
        mime_subtype: mime_subtype(&metadata.mime_type).to_string(),
        created: metadata.created_at,
        thumbnail: metadata.has_thumbnail,
    };

    let encoded = serde_json::to_string(&stored)
        .map_err(|e| FileMetadataError::Malformed(e.to_string()))?;
    if encoded.len() > METADATA_COLUMN_CAPACITY {
        return Err(FileMetadataError::TooLong(encoded.len()));
    }
    Ok(encoded)
}

/// Parses the column format. Missing keys fall back to defaults.
pub fn decode(raw: &str) -> Result<FileMetadata, FileMetadataError> {
    let stored: StoredMetadata = serde_json::from_str(raw)
        .map_err(|e| FileMetadataError::Malformed(e.to_string()))?;

    Ok(FileMetadata {
        user_id: stored.user_id,
        category: stored.file_type,
        size: stored.size,
        mime_type: mime_from_subtype(&stored.mime_subtype),
        created_at: stored.created,
        has_thumbnail: stored.thumbnail,
    })
}

/// `image/jpeg` -> `jpeg`. Parameters such as `; charset=utf-8` are dropped.
pub fn mime_subtype(mime_type: &str) -> &str {
    let essence = mime_type.split(';').next().unwrap_or("").trim();
    match essence.split_once('/') {
        Some((_, subtype)) if !subtype.is_empty() => subtype,
        _ if !essence.is_empty() => essence,
        _ => DEFAULT_SUBTYPE,
    }
}

pub fn mime_from_subtype(subtype: &str) -> String {
    let subtype = subtype.trim().to_lowercase();
    if subtype.is_empty() {
        return format!("application/{}", DEFAULT_SUBTYPE);
    }
    if IMAGE_SUBTYPES.contains(&subtype.as_str()) {
        let normalized = if subtype == "jpg" { "jpeg" } else { subtype.as_str() };
        return format!("image/{}", normalized);
    }
    if subtype == "plain" {
        return "text/plain".to_string();
    }
    format!("application/{}", subtype)
}

/// `profile-pictures/abc.jpg` -> `profile-pictures/thumb_abc.jpg`.
pub fn thumbnail_path(file_path: &str) -> String {
    match file_path.rsplit_once('/') {
        Some((dir, name)) => format!("{}/{}{}", dir, THUMBNAIL_PREFIX, name),
        None => format!("{}{}", THUMBNAIL_PREFIX, file_path),
    }
}

impl FileRecord {
    pub fn from_row(row: FileRow) -> Result<Self, FileMetadataError> {
        let metadata = decode(&row.file_data)?;
        let thumbnail_path = metadata
            .has_thumbnail
            .then(|| thumbnail_path(&row.file_path));

        Ok(FileRecord {
            id: row.file_id,
            user_id: metadata.user_id,
            category: metadata.category,
            size: metadata.size,
            mime_type: metadata.mime_type,
            created_at: metadata.created_at,
            file_path: row.file_path,
            thumbnail_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> FileMetadata {
        FileMetadata {
            user_id: Uuid::parse_str("5b1f7c9e-0d1a-4a43-9b36-2f8d9a0c1e77").unwrap(),
            category: FileCategory::ProfilePicture,
            size: 48_213,
            mime_type: "image/jpeg".into(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 33).unwrap(),
            has_thumbnail: true,
        }
    }

    #[test]
    fn encode_uses_short_keys() {
        let encoded = encode(&sample()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&encoded).unwrap();

        assert_eq!(json["u"], "5b1f7c9e-0d1a-4a43-9b36-2f8d9a0c1e77");
        assert_eq!(json["t"], "profile_picture");
        assert_eq!(json["s"], 48_213);
        assert_eq!(json["m"], "jpeg");
        assert_eq!(json["c"], "2024-03-09T14:05:33Z");
        assert_eq!(json["h"], true);
        assert!(encoded.len() <= METADATA_COLUMN_CAPACITY);
    }

    #[test]
    fn decode_restores_full_mime_type() {
        let decoded = decode(&encode(&sample()).unwrap()).unwrap();
        assert_eq!(decoded, sample());
    }

    #[test]
    fn decode_defaults_missing_fields() {
        let decoded = decode(r#"{"m":"pdf"}"#).unwrap();
        assert_eq!(decoded.user_id, Uuid::nil());
        assert_eq!(decoded.category, FileCategory::Document);
        assert_eq!(decoded.size, 0);
        assert_eq!(decoded.mime_type, "application/pdf");
        assert_eq!(decoded.created_at, DateTime::<Utc>::UNIX_EPOCH);
        assert!(!decoded.has_thumbnail);

        let empty = decode("{}").unwrap();
        assert_eq!(empty.mime_type, "application/octet-stream");
    }

    #[test]
    fn decode_rejects_malformed_json() {
        assert!(matches!(decode("{\"u\":"), Err(FileMetadataError::Malformed(_))));
        assert!(matches!(decode("not json"), Err(FileMetadataError::Malformed(_))));
        assert!(matches!(decode(r#"{"t":"spreadsheet"}"#), Err(FileMetadataError::Malformed(_))));
    }

    #[test]
    fn encode_rejects_values_that_overflow_the_column() {
        let mut metadata = sample();
        metadata.mime_type = format!("application/{}", "x".repeat(300));
        assert!(matches!(encode(&metadata), Err(FileMetadataError::TooLong(_))));
    }

    #[test]
    fn long_office_subtype_still_fits() {
        let mut metadata = sample();
        metadata.category = FileCategory::Resume;
        metadata.size = 9_999_999;
        metadata.has_thumbnail = false;
        metadata.mime_type =
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document".into();

        let decoded = decode(&encode(&metadata).unwrap()).unwrap();
        assert_eq!(decoded.mime_type, metadata.mime_type);
    }

    #[test]
    fn subtype_mapping() {
        assert_eq!(mime_subtype("image/png"), "png");
        assert_eq!(mime_subtype("text/plain; charset=utf-8"), "plain");
        assert_eq!(mime_subtype(""), "octet-stream");

        assert_eq!(mime_from_subtype("png"), "image/png");
        assert_eq!(mime_from_subtype("jpg"), "image/jpeg");
        assert_eq!(mime_from_subtype("plain"), "text/plain");
        assert_eq!(mime_from_subtype("msword"), "application/msword");
    }

    #[test]
    fn thumbnail_path_prefixes_file_name() {
        assert_eq!(thumbnail_path("profile-pictures/abc.jpg"), "profile-pictures/thumb_abc.jpg");
        assert_eq!(thumbnail_path("abc.jpg"), "thumb_abc.jpg");
    }

    #[test]
    fn record_from_row_builds_thumbnail_path() {
        let row = FileRow {
            file_id: Uuid::new_v4(),
            file_data: encode(&sample()).unwrap(),
            file_path: "profile-pictures/abc.jpg".into(),
        };
        let record = FileRecord::from_row(row.clone()).unwrap();
        assert_eq!(record.id, row.file_id);
        assert_eq!(record.thumbnail_path.as_deref(), Some("profile-pictures/thumb_abc.jpg"));
        assert_eq!(record.mime_type, "image/jpeg");
    }
}
