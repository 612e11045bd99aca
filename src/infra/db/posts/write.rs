use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{CreatePostParams, RepoError, UpdatePostParams};
use crate::domain::entities::PostRecord;

use super::PostgresRepositories;
use super::types::{POST_COLUMNS, PostRow};
use crate::infra::db::map_sqlx_error;

impl PostgresRepositories {
    pub(super) async fn insert_post(
        &self,
        params: CreatePostParams,
    ) -> Result<PostRecord, RepoError> {
        let CreatePostParams {
            title,
            content,
            created_at,
            updated_at,
        } = params;

        let id = Uuid::new_v4();
        let sql = format!(
            "INSERT INTO posts (id, title, content, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {POST_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .bind(title)
            .bind(content)
            .bind(created_at)
            .bind(updated_at)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(PostRecord::from(row))
    }

    /// Single-statement update; `updated_at` always moves forward even when
    /// two updates land within the same clock tick.
    pub(super) async fn update_post(
        &self,
        params: UpdatePostParams,
    ) -> Result<Option<PostRecord>, RepoError> {
        let UpdatePostParams { id, title, content } = params;

        let now = OffsetDateTime::now_utc();
        let sql = format!(
            "UPDATE posts \
             SET title = $2, \
                 content = $3, \
                 updated_at = GREATEST($4, updated_at + INTERVAL '1 microsecond') \
             WHERE id = $1 \
             RETURNING {POST_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .bind(title)
            .bind(content)
            .bind(now)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }

    pub(super) async fn delete_post(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        let sql = format!("DELETE FROM posts WHERE id = $1 RETURNING {POST_COLUMNS}");
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }
}
