#![allow(dead_code)]

use std::{collections::HashMap, path::PathBuf, sync::Arc};

use async_trait::async_trait;
use ats_backend::{
    auth::jwt::JwtService,
    entities::file::{FileCategory, FileRow, FileRowInsert},
    errors::AppError,
    file_metadata,
    repositories::{file::FileRepository, profile::ProfileRepository},
    settings::{AppConfig, AppEnvironment},
    storage::LocalDiskStorage,
    use_cases::files::FileHandler,
    AppState,
};
use parking_lot::Mutex;
use uuid::Uuid;

pub const BOUNDARY: &str = "----ats-test-boundary";

pub fn test_config(uploads_dir: PathBuf) -> AppConfig {
    AppConfig {
        env: AppEnvironment::Testing,
        name: "ATS-Files-API".into(),
        port: 0,
        host: "127.0.0.1".into(),
        worker_count: 1,
        database_url: "postgres://unused".into(),
        frontend_origin: "http://localhost:3000".into(),
        jwt_secret: "integration-test-secret-of-at-least-32-chars".into(),
        jwt_expiration_minutes: 15,
        uploads_dir,
        run_migrations: false,
    }
}

/// `files` table kept in memory, scoped by the owner encoded in `file_data`.
#[derive(Default)]
pub struct InMemoryFileRepo {
    pub rows: Mutex<Vec<FileRow>>,
}

impl InMemoryFileRepo {
    fn owned_by(row: &FileRow, user_id: &Uuid) -> bool {
        file_metadata::decode(&row.file_data)
            .map(|m| m.user_id == *user_id)
            .unwrap_or(false)
    }
}

#[async_trait]
impl FileRepository for InMemoryFileRepo {
    async fn check_connection(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn insert_file(&self, file: &FileRowInsert) -> Result<Uuid, AppError> {
        if file.file_data.len() > file_metadata::METADATA_COLUMN_CAPACITY {
            return Err(AppError::InternalError("value too long for type character varying(255)".into()));
        }
        self.rows.lock().push(FileRow {
            file_id: file.file_id,
            file_data: file.file_data.clone(),
            file_path: file.file_path.clone(),
        });
        Ok(file.file_id)
    }

    async fn get_file(&self, id: &Uuid, user_id: &Uuid) -> Result<Option<FileRow>, AppError> {
        Ok(self
            .rows
            .lock()
            .iter()
            .find(|row| row.file_id == *id && Self::owned_by(row, user_id))
            .cloned())
    }

    async fn list_files(
        &self,
        user_id: &Uuid,
        category: Option<FileCategory>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<FileRow>, AppError> {
        let mut rows: Vec<(FileRow, chrono::DateTime<chrono::Utc>)> = self
            .rows
            .lock()
            .iter()
            .filter_map(|row| {
                let meta = file_metadata::decode(&row.file_data).ok()?;
                let matches = meta.user_id == *user_id && category.is_none_or(|c| c == meta.category);
                matches.then(|| (row.clone(), meta.created_at))
            })
            .collect();

        rows.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.file_id.cmp(&b.0.file_id)));

        Ok(rows
            .into_iter()
            .map(|(row, _)| row)
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn delete_file(&self, id: &Uuid, user_id: &Uuid) -> Result<(), AppError> {
        let mut rows = self.rows.lock();
        let before = rows.len();
        rows.retain(|row| !(row.file_id == *id && Self::owned_by(row, user_id)));

        if rows.len() == before {
            return Err(AppError::NotFound("File not found".to_string()));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryProfileRepo {
    pub pictures: Mutex<HashMap<Uuid, String>>,
}

#[async_trait]
impl ProfileRepository for InMemoryProfileRepo {
    async fn set_profile_picture(&self, user_id: &Uuid, link: &str) -> Result<(), AppError> {
        self.pictures.lock().insert(*user_id, link.to_string());
        Ok(())
    }

    async fn clear_profile_picture(&self, user_id: &Uuid, link: &str) -> Result<bool, AppError> {
        let mut pictures = self.pictures.lock();
        if pictures.get(user_id).map(String::as_str) == Some(link) {
            pictures.remove(user_id);
            return Ok(true);
        }
        Ok(false)
    }

    async fn get_profile_picture(&self, user_id: &Uuid) -> Result<Option<String>, AppError> {
        Ok(self.pictures.lock().get(user_id).cloned())
    }
}

pub struct TestContext {
    pub config: AppConfig,
    pub files: Arc<InMemoryFileRepo>,
    pub profiles: Arc<InMemoryProfileRepo>,
    pub uploads_dir: PathBuf,
    pub state: actix_web::web::Data<AppState>,
}

impl TestContext {
    pub fn new() -> Self {
        let uploads_dir = std::env::temp_dir().join(format!("ats-uploads-{}", Uuid::new_v4()));
        let config = test_config(uploads_dir.clone());

        let files = Arc::new(InMemoryFileRepo::default());
        let profiles = Arc::new(InMemoryProfileRepo::default());
        let handler = FileHandler::new(
            files.clone(),
            profiles.clone(),
            Arc::new(LocalDiskStorage::new(uploads_dir.clone())),
        );

        let state = actix_web::web::Data::new(AppState::with_parts(&config, handler));

        TestContext { config, files, profiles, uploads_dir, state }
    }

    pub fn token_for(&self, user_id: &Uuid) -> String {
        JwtService::new(&self.config)
            .create_jwt(user_id, "candidate@example.com")
            .expect("token")
    }

    pub fn bearer(&self, user_id: &Uuid) -> (&'static str, String) {
        ("Authorization", format!("Bearer {}", self.token_for(user_id)))
    }

    pub fn stored(&self, rel_path: &str) -> bool {
        self.uploads_dir.join(rel_path).exists()
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.uploads_dir);
    }
}

/// Builds a `multipart/form-data` body with a `type` field and an optional file part.
pub fn multipart_body(file_type: &str, file: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"type\"\r\nContent-Type: text/plain\r\n\r\n{file_type}\r\n"
        )
        .as_bytes(),
    );

    if let Some((file_name, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_content_type() -> (&'static str, String) {
    ("Content-Type", format!("multipart/form-data; boundary={BOUNDARY}"))
}

/// Initializes the app the way `main` wires it, minus CORS and request logging.
#[macro_export]
macro_rules! test_app {
    ($ctx:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data($ctx.state.clone())
                .wrap(ats_backend::middlewares::auth::AuthMiddleware)
                .wrap(actix_web::middleware::NormalizePath::trim())
                .configure(ats_backend::routes::configure_routes),
        )
        .await
    };
}
