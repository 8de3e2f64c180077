use derive_more::Display;

use crate::entities::file::{FileCategory, IncomingFile};

const MIB: usize = 1024 * 1024;

const IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

const RESUME_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

const DOCUMENT_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "text/plain",
    "image/jpeg",
    "image/png",
];

#[derive(Debug, Clone, Copy)]
pub struct UploadPolicy {
    pub max_bytes: usize,
    pub allowed_types: &'static [&'static str],
}

impl FileCategory {
    pub fn upload_policy(&self) -> UploadPolicy {
        match self {
            FileCategory::ProfilePicture => UploadPolicy { max_bytes: 5 * MIB, allowed_types: IMAGE_TYPES },
            FileCategory::Resume => UploadPolicy { max_bytes: 5 * MIB, allowed_types: RESUME_TYPES },
            FileCategory::Document => UploadPolicy { max_bytes: 10 * MIB, allowed_types: DOCUMENT_TYPES },
        }
    }
}

#[derive(Debug, Display, PartialEq)]
pub enum UploadError {
    #[display("No file uploaded")]
    NoFile,

    #[display("File is too large for {category}: {size} bytes (max {max_bytes} bytes)")]
    TooLarge {
        category: FileCategory,
        size: usize,
        max_bytes: usize,
    },

    #[display("File type {mime_type} is not allowed for {category}")]
    UnsupportedType {
        category: FileCategory,
        mime_type: String,
    },

    #[display("File content does not match its declared type {claimed} (detected {detected})")]
    ContentMismatch {
        claimed: String,
        detected: String,
    },
}

impl std::error::Error for UploadError {}

/// Checks an upload against its category policy and returns the effective MIME type.
pub fn validate_upload(
    category: FileCategory,
    file: Option<&IncomingFile>,
) -> Result<String, UploadError> {
    let file = match file {
        Some(f) if !f.bytes.is_empty() => f,
        _ => return Err(UploadError::NoFile),
    };

    let policy = category.upload_policy();
    if file.bytes.len() > policy.max_bytes {
        return Err(UploadError::TooLarge {
            category,
            size: file.bytes.len(),
            max_bytes: policy.max_bytes,
        });
    }

    let detected = infer::get(&file.bytes).map(|kind| kind.mime_type());
    let mime_type = match file.content_type.as_deref().map(normalize_mime) {
        Some(claimed) if !claimed.is_empty() && claimed != "application/octet-stream" => claimed,
        _ => detected.unwrap_or("application/octet-stream").to_string(),
    };

    if !policy.allowed_types.contains(&mime_type.as_str()) {
        return Err(UploadError::UnsupportedType { category, mime_type });
    }

    // Plain text has no signature, and undetectable content is taken at its word.
    if mime_type != "text/plain" {
        if let Some(detected) = detected {
            if !is_compatible(&mime_type, detected) {
                tracing::warn!(claimed = %mime_type, detected = %detected, "upload content type mismatch");
                return Err(UploadError::ContentMismatch {
                    claimed: mime_type,
                    detected: detected.to_string(),
                });
            }
        }
    }

    Ok(mime_type)
}

fn normalize_mime(raw: &str) -> String {
    let essence = raw.split(';').next().unwrap_or("").trim().to_lowercase();
    match essence.as_str() {
        "image/jpg" | "image/pjpeg" => "image/jpeg".to_string(),
        _ => essence,
    }
}

fn is_compatible(claimed: &str, detected: &str) -> bool {
    claimed == detected
        // Legacy .doc files are OLE containers and may be reported generically.
        || (claimed == "application/msword" && detected == "application/x-ole-storage")
        // Older detectors report .docx as a plain zip archive.
        || (claimed.starts_with("application/vnd.openxmlformats") && detected == "application/zip")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];
    const PDF_MAGIC: &[u8] = b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n";

    fn incoming(bytes: &[u8], content_type: Option<&str>) -> IncomingFile {
        IncomingFile {
            bytes: bytes.to_vec(),
            content_type: content_type.map(str::to_string),
            file_name: None,
        }
    }

    #[test]
    fn rejects_missing_or_empty_file() {
        assert_eq!(validate_upload(FileCategory::Resume, None), Err(UploadError::NoFile));
        let empty = incoming(&[], Some("application/pdf"));
        assert_eq!(validate_upload(FileCategory::Resume, Some(&empty)), Err(UploadError::NoFile));
    }

    #[test]
    fn enforces_per_category_size_ceiling() {
        let mut bytes = PDF_MAGIC.to_vec();
        bytes.resize(6 * MIB, b' ');
        let file = incoming(&bytes, Some("application/pdf"));

        let err = validate_upload(FileCategory::Resume, Some(&file)).unwrap_err();
        assert!(matches!(err, UploadError::TooLarge { max_bytes, .. } if max_bytes == 5 * MIB));

        // Documents allow up to 10 MiB.
        assert_eq!(
            validate_upload(FileCategory::Document, Some(&file)),
            Ok("application/pdf".to_string())
        );
    }

    #[test]
    fn enforces_allow_list() {
        let file = incoming(PDF_MAGIC, Some("application/pdf"));
        let err = validate_upload(FileCategory::ProfilePicture, Some(&file)).unwrap_err();
        assert_eq!(
            err,
            UploadError::UnsupportedType {
                category: FileCategory::ProfilePicture,
                mime_type: "application/pdf".into(),
            }
        );
        assert!(err.to_string().contains("profile_picture"));
    }

    #[test]
    fn detects_spoofed_content() {
        let file = incoming(PDF_MAGIC, Some("image/png"));
        let err = validate_upload(FileCategory::ProfilePicture, Some(&file)).unwrap_err();
        assert!(matches!(err, UploadError::ContentMismatch { .. }));
    }

    #[test]
    fn falls_back_to_detected_type_when_none_claimed() {
        let file = incoming(PNG_MAGIC, None);
        assert_eq!(
            validate_upload(FileCategory::ProfilePicture, Some(&file)),
            Ok("image/png".to_string())
        );
    }

    #[test]
    fn normalizes_jpg_alias_and_accepts_plain_text() {
        let text = incoming(b"Objective: backend role", Some("text/plain; charset=utf-8"));
        assert_eq!(validate_upload(FileCategory::Document, Some(&text)), Ok("text/plain".to_string()));

        let jpeg = incoming(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F', b'I', b'F'], Some("image/jpg"));
        assert_eq!(
            validate_upload(FileCategory::ProfilePicture, Some(&jpeg)),
            Ok("image/jpeg".to_string())
        );
    }
}
