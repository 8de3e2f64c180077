use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    entities::file::{FileCategory, FileRow, FileRowInsert},
    errors::AppError,
    repositories::sqlx_repo::SqlxFileRepo,
};

/// Persistence for the legacy `files` table.
///
/// Ownership and category live inside the encoded `file_data` blob, so every
/// query scopes through `file_data_json(file_data)`. Rows whose blob is not
/// JSON have no owner and are never returned.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileRepository: Send + Sync {
    async fn check_connection(&self) -> Result<(), AppError>;
    async fn insert_file(&self, file: &FileRowInsert) -> Result<Uuid, AppError>;
    async fn get_file(&self, id: &Uuid, user_id: &Uuid) -> Result<Option<FileRow>, AppError>;
    async fn list_files(
        &self,
        user_id: &Uuid,
        category: Option<FileCategory>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<FileRow>, AppError>;
    async fn delete_file(&self, id: &Uuid, user_id: &Uuid) -> Result<(), AppError>;
}

const GET_FILE_SQL: &str = r#"
    SELECT file_id, file_data, file_path
    FROM files
    WHERE file_id = $1
      AND file_data_json(file_data) ->> 'u' = $2
"#;

const LIST_FILES_SQL: &str = r#"
    SELECT file_id, file_data, file_path
    FROM files
    WHERE file_data_json(file_data) ->> 'u' = $1
      AND ($2::text IS NULL OR file_data_json(file_data) ->> 't' = $2)
    ORDER BY file_data_json(file_data) ->> 'c' DESC, file_id
    LIMIT $3 OFFSET $4
"#;

const DELETE_FILE_SQL: &str = r#"
    DELETE FROM files
    WHERE file_id = $1
      AND file_data_json(file_data) ->> 'u' = $2
"#;

impl SqlxFileRepo {
    pub fn new(pool: sqlx::PgPool) -> Self {
        SqlxFileRepo { pool }
    }
}

#[async_trait]
impl FileRepository for SqlxFileRepo {
    async fn check_connection(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(AppError::from)
    }

    async fn insert_file(&self, file: &FileRowInsert) -> Result<Uuid, AppError> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO files (file_id, file_data, file_path)
            VALUES ($1, $2, $3)
            RETURNING file_id
            "#,
        )
        .bind(file.file_id)
        .bind(&file.file_data)
        .bind(&file.file_path)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn get_file(&self, id: &Uuid, user_id: &Uuid) -> Result<Option<FileRow>, AppError> {
        sqlx::query_as::<_, FileRow>(GET_FILE_SQL)
        .bind(id)
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn list_files(
        &self,
        user_id: &Uuid,
        category: Option<FileCategory>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<FileRow>, AppError> {
        sqlx::query_as::<_, FileRow>(LIST_FILES_SQL)
        .bind(user_id.to_string())
        .bind(category.map(|c| c.as_str()))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn delete_file(&self, id: &Uuid, user_id: &Uuid) -> Result<(), AppError> {
        let result = sqlx::query(DELETE_FILE_SQL)
        .bind(id)
        .bind(user_id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("File not found".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIGRATION: &str = include_str!("../../../migrations/0001_init.sql");

    #[test]
    fn scoped_queries_never_cast_raw_blobs() {
        for sql in [GET_FILE_SQL, LIST_FILES_SQL, DELETE_FILE_SQL] {
            assert!(!sql.contains("file_data::jsonb"), "raw cast in {sql}");
            assert!(sql.contains("file_data_json(file_data) ->> 'u'"), "unscoped query {sql}");
        }
        assert_eq!(LIST_FILES_SQL.matches("file_data_json(file_data)").count(), 3);
    }

    #[test]
    fn migration_defines_tolerant_cast_for_owner_index() {
        assert!(MIGRATION.contains("FUNCTION file_data_json(raw TEXT) RETURNS JSONB"));
        assert!(MIGRATION.contains("EXCEPTION WHEN others THEN"));
        assert!(!MIGRATION.contains("file_data::jsonb"));
        assert!(MIGRATION.contains("ON files ((file_data_json(file_data) ->> 'u'))"));
    }
}
