use std::sync::Arc;

mod domain;
mod interfaces;
mod infrastructure;
pub mod errors;
pub mod settings;
pub mod constants;
pub mod graceful_shutdown;

pub use domain::{entities, file_metadata, upload_policy, use_cases};
pub use interfaces::{handlers, middlewares, repositories, routes};
pub use infrastructure::{auth, db, imaging, storage, utils};

use auth::jwt::JwtService;
use repositories::{
    file::FileRepository,
    profile::ProfileRepository,
    sqlx_repo::{SqlxFileRepo, SqlxProfileRepo},
};
use storage::{FileStorage, LocalDiskStorage};
use use_cases::files::FileHandler;

pub struct AppState {
    pub file_handler: FileHandler,
    pub token_service: JwtService,
}

impl AppState {
    pub fn new(config: &settings::AppConfig, pool: sqlx::PgPool) -> Self {
        let file_repo: Arc<dyn FileRepository> = Arc::new(SqlxFileRepo::new(pool.clone()));
        let profile_repo: Arc<dyn ProfileRepository> = Arc::new(SqlxProfileRepo::new(pool));
        let storage: Arc<dyn FileStorage> = Arc::new(LocalDiskStorage::new(config.uploads_dir.clone()));

        Self::with_parts(config, FileHandler::new(file_repo, profile_repo, storage))
    }

    /// Builds the state around an existing handler, e.g. one backed by in-memory stores.
    pub fn with_parts(config: &settings::AppConfig, file_handler: FileHandler) -> Self {
        AppState {
            file_handler,
            token_service: JwtService::new(config),
        }
    }
}
