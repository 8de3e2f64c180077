use uuid::Uuid;

use crate::entities::file::FileCategory;

/// File extension used on disk for a stored MIME type.
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "application/pdf" => "pdf",
        "application/msword" => "doc",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => "docx",
        "text/plain" => "txt",
        _ => "bin",
    }
}

/// `<category dir>/<id>.<ext>`, relative to the uploads root.
pub fn stored_path(category: FileCategory, id: &Uuid, mime_type: &str) -> String {
    format!("{}/{}.{}", category.storage_dir(), id, extension_for_mime(mime_type))
}

/// Value for `Content-Disposition`, with an RFC 5987 encoded name.
pub fn content_disposition(inline: bool, file_name: &str) -> String {
    let kind = if inline { "inline" } else { "attachment" };
    let ascii: String = file_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || "._-".contains(c) { c } else { '_' })
        .collect();

    format!(
        "{}; filename=\"{}\"; filename*=UTF-8''{}",
        kind,
        ascii,
        urlencoding::encode(file_name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_path_uses_category_directory() {
        let id = Uuid::nil();
        assert_eq!(
            stored_path(FileCategory::Resume, &id, "application/pdf"),
            "resumes/00000000-0000-0000-0000-000000000000.pdf"
        );
        assert!(stored_path(FileCategory::ProfilePicture, &id, "image/jpeg").starts_with("profile-pictures/"));
    }

    #[test]
    fn unknown_types_get_bin_extension() {
        assert_eq!(extension_for_mime("application/x-unknown"), "bin");
    }

    #[test]
    fn disposition_encodes_non_ascii_names() {
        let header = content_disposition(false, "résumé v2.pdf");
        assert!(header.starts_with("attachment; "));
        assert!(header.contains("filename=\"r_sum__v2.pdf\""));
        assert!(header.contains("filename*=UTF-8''r%C3%A9sum%C3%A9%20v2.pdf"));

        assert!(content_disposition(true, "a.png").starts_with("inline; "));
    }
}
