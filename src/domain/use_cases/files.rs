use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use uuid::Uuid;

use crate::domain::file_metadata::{self, thumbnail_path};
use crate::domain::upload_policy::{validate_upload, UploadError};
use crate::entities::file::{
    content_url, Disposition, FileCategory, FileContent, FileMetadata, FileRecord, FileRowInsert,
    FileVariant, IncomingFile,
};
use crate::errors::AppError;
use crate::imaging::generate_variants;
use crate::repositories::{file::FileRepository, profile::ProfileRepository};
use crate::storage::FileStorage;
use crate::utils::file_names::stored_path;

/// How many stale profile pictures are swept per upload.
const PROFILE_PICTURE_SWEEP: i64 = 100;

#[derive(Clone)]
pub struct FileHandler {
    pub file_repo: Arc<dyn FileRepository>,
    pub profile_repo: Arc<dyn ProfileRepository>,
    pub storage: Arc<dyn FileStorage>,
}

impl FileHandler {
    pub fn new(
        file_repo: Arc<dyn FileRepository>,
        profile_repo: Arc<dyn ProfileRepository>,
        storage: Arc<dyn FileStorage>,
    ) -> Self {
        FileHandler { file_repo, profile_repo, storage }
    }

    /// Validates, stores and records an upload.
    ///
    /// Profile pictures are resized into a primary image and a thumbnail, and
    /// become the user's current picture. Older pictures are removed.
    pub async fn upload(
        &self,
        user_id: &Uuid,
        category: FileCategory,
        file: Option<IncomingFile>,
    ) -> Result<FileRecord, AppError> {
        let mime_type = validate_upload(category, file.as_ref())?;
        let file = file.ok_or(UploadError::NoFile)?;

        let id = Uuid::new_v4();
        let created_at = Utc::now().trunc_subsecs(0);

        let (mime_type, primary, thumbnail) = if category == FileCategory::ProfilePicture {
            let variants = generate_variants(file.bytes, &mime_type).await;
            (variants.mime_type, variants.primary, Some(variants.thumbnail))
        } else {
            (mime_type, file.bytes, None)
        };

        let file_path = stored_path(category, &id, &mime_type);
        let thumb_path = thumbnail.as_ref().map(|_| thumbnail_path(&file_path));

        let metadata = FileMetadata {
            user_id: *user_id,
            category,
            size: primary.len() as u64,
            mime_type: mime_type.clone(),
            created_at,
            has_thumbnail: thumb_path.is_some(),
        };
        // Encoded before anything touches disk so an oversized blob leaves no files.
        let file_data = file_metadata::encode(&metadata)?;

        self.storage.put(&file_path, &primary).await?;
        let mut written = vec![file_path.clone()];

        if let (Some(path), Some(bytes)) = (&thumb_path, &thumbnail) {
            if let Err(e) = self.storage.put(path, bytes).await {
                self.remove_quietly(&written).await;
                return Err(e.into());
            }
            written.push(path.clone());
        }

        let insert = FileRowInsert {
            file_id: id,
            file_data,
            file_path: file_path.clone(),
        };
        if let Err(e) = self.file_repo.insert_file(&insert).await {
            self.remove_quietly(&written).await;
            return Err(e);
        }

        let record = FileRecord {
            id,
            user_id: *user_id,
            category,
            size: metadata.size,
            mime_type,
            created_at,
            file_path,
            thumbnail_path: thumb_path,
        };

        if category == FileCategory::ProfilePicture {
            if let Err(e) = self.replace_profile_picture(user_id, &record).await {
                if let Err(rollback) = self.file_repo.delete_file(&id, user_id).await {
                    tracing::warn!(file_id = %id, error = %rollback, "failed to roll back file record");
                }
                self.remove_quietly(&written).await;
                return Err(e);
            }
        }

        tracing::info!(
            file_id = %record.id,
            user_id = %user_id,
            category = %category,
            size = record.size,
            original_name = file.file_name.as_deref().unwrap_or("-"),
            "file uploaded"
        );
        Ok(record)
    }

    pub async fn list(
        &self,
        user_id: &Uuid,
        category: Option<FileCategory>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<FileRecord>, AppError> {
        let rows = self.file_repo.list_files(user_id, category, limit, offset).await?;
        rows.into_iter()
            .map(|row| FileRecord::from_row(row).map_err(AppError::from))
            .collect()
    }

    pub async fn get(&self, user_id: &Uuid, file_id: &Uuid) -> Result<FileRecord, AppError> {
        let row = self
            .file_repo
            .get_file(file_id, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("File".to_string()))?;

        Ok(FileRecord::from_row(row)?)
    }

    pub async fn read_content(
        &self,
        user_id: &Uuid,
        file_id: &Uuid,
        variant: FileVariant,
    ) -> Result<FileContent, AppError> {
        let record = self.get(user_id, file_id).await?;

        let path = match variant {
            FileVariant::Original => record.file_path.clone(),
            FileVariant::Thumbnail => record
                .thumbnail_path
                .clone()
                .ok_or_else(|| AppError::NotFound("Thumbnail".to_string()))?,
        };

        let bytes = self.storage.read(&path).await?;
        let disposition = if record.mime_type.starts_with("image/") {
            Disposition::Inline
        } else {
            Disposition::Attachment
        };
        let file_name = path.rsplit('/').next().unwrap_or(path.as_str()).to_string();

        Ok(FileContent {
            bytes,
            mime_type: record.mime_type,
            file_name,
            disposition,
        })
    }

    /// Removes the record first; clearing the profile link and on-disk cleanup are best effort.
    pub async fn delete(&self, user_id: &Uuid, file_id: &Uuid) -> Result<(), AppError> {
        let record = self.get(user_id, file_id).await?;
        self.file_repo.delete_file(file_id, user_id).await?;

        if record.category == FileCategory::ProfilePicture {
            if let Err(e) = self
                .profile_repo
                .clear_profile_picture(user_id, &record.content_url())
                .await
            {
                tracing::warn!(file_id = %file_id, user_id = %user_id, error = %e, "failed to clear profile picture link");
            }
        }

        self.remove_quietly(&stored_paths(&record)).await;

        tracing::info!(file_id = %file_id, user_id = %user_id, "file deleted");
        Ok(())
    }

    async fn replace_profile_picture(&self, user_id: &Uuid, current: &FileRecord) -> Result<(), AppError> {
        self.profile_repo
            .set_profile_picture(user_id, &content_url(&current.id))
            .await?;

        let previous = match self
            .file_repo
            .list_files(user_id, Some(FileCategory::ProfilePicture), PROFILE_PICTURE_SWEEP, 0)
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "failed to list previous profile pictures");
                return Ok(());
            }
        };

        for row in previous.into_iter().filter(|row| row.file_id != current.id) {
            let old_id = row.file_id;
            let paths = match FileRecord::from_row(row.clone()) {
                Ok(old) => stored_paths(&old),
                Err(_) => vec![row.file_path],
            };

            match self.file_repo.delete_file(&old_id, user_id).await {
                Ok(()) | Err(AppError::NotFound(_)) => self.remove_quietly(&paths).await,
                Err(e) => {
                    tracing::warn!(file_id = %old_id, error = %e, "failed to remove previous profile picture record");
                }
            }
        }

        Ok(())
    }

    async fn remove_quietly(&self, paths: &[String]) {
        for path in paths {
            if let Err(e) = self.storage.delete(path).await {
                tracing::warn!(path = %path, error = %e, "failed to remove stored file");
            }
        }
    }
}

fn stored_paths(record: &FileRecord) -> Vec<String> {
    let mut paths = vec![record.file_path.clone()];
    paths.extend(record.thumbnail_path.clone());
    paths
}
