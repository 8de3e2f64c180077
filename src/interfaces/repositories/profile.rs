use async_trait::async_trait;
use uuid::Uuid;

use crate::{errors::AppError, repositories::sqlx_repo::SqlxProfileRepo};

/// The slice of the profile table the file service owns: the picture link.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Points the profile picture at `link`, creating the profile row if needed.
    async fn set_profile_picture(&self, user_id: &Uuid, link: &str) -> Result<(), AppError>;

    /// Clears the picture only if it still points at `link`.
    async fn clear_profile_picture(&self, user_id: &Uuid, link: &str) -> Result<bool, AppError>;

    async fn get_profile_picture(&self, user_id: &Uuid) -> Result<Option<String>, AppError>;
}

impl SqlxProfileRepo {
    pub fn new(pool: sqlx::PgPool) -> Self {
        SqlxProfileRepo { pool }
    }
}

#[async_trait]
impl ProfileRepository for SqlxProfileRepo {
    async fn set_profile_picture(&self, user_id: &Uuid, link: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO profiles (user_id, profile_picture)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE
            SET
                profile_picture = EXCLUDED.profile_picture,
                updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(link)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                AppError::NotFound("User not found".to_string())
            }
            _ => AppError::from(e),
        })?;

        Ok(())
    }

    async fn clear_profile_picture(&self, user_id: &Uuid, link: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET
                profile_picture = NULL,
                updated_at = NOW()
            WHERE user_id = $1 AND profile_picture = $2
            "#,
        )
        .bind(user_id)
        .bind(link)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_profile_picture(&self, user_id: &Uuid) -> Result<Option<String>, AppError> {
        let link: Option<Option<String>> = sqlx::query_scalar(
            "SELECT profile_picture FROM profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(link.flatten())
    }
}
