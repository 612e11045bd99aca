use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::application::pagination::Paginator;
use crate::application::repos::{
    CreatePostParams, PostPage, PostsRepo, RepoError, UpdatePostParams,
};
use crate::domain::entities::PostRecord;

use super::PostgresRepositories;
use super::types::{POST_COLUMNS, PostPageRow, PostRow};
use crate::infra::db::map_sqlx_error;

/// Title lexemes (weight A) count ten times as much as content lexemes
/// (weight D). Array order is {D, C, B, A}.
const SEARCH_RANK_WEIGHTS: &str = "'{0.1, 0, 0, 1.0}'::real[]";
const SEARCH_CONFIG: &str = "'english'";

impl PostgresRepositories {
    /// Count and slice in one statement so the total and the page agree.
    fn build_page_query<'q>(page: &Paginator, search: &'q str) -> QueryBuilder<'q, Postgres> {
        let offset = i64::try_from(page.offset()).unwrap_or(i64::MAX);
        let limit = i64::from(page.size());

        let mut qb = QueryBuilder::new("WITH matched AS (SELECT p.id, p.title, p.content, ");
        qb.push("p.created_at, p.updated_at, ");

        if search.is_empty() {
            qb.push("NULL::real AS rank FROM posts p");
        } else {
            qb.push("ts_rank(");
            qb.push(SEARCH_RANK_WEIGHTS);
            qb.push(", p.search_vector, q.query) AS rank FROM posts p, websearch_to_tsquery(");
            qb.push(SEARCH_CONFIG);
            qb.push(", ");
            qb.push_bind(search);
            qb.push(") AS q(query) WHERE p.search_vector @@ q.query");
        }

        let order = if search.is_empty() {
            "m.created_at DESC, m.id DESC"
        } else {
            "m.rank DESC, m.created_at DESC, m.id DESC"
        };

        qb.push("), page AS (SELECT m.*, ROW_NUMBER() OVER (ORDER BY ");
        qb.push(order);
        qb.push(") AS position FROM matched m ORDER BY ");
        qb.push(order);
        qb.push(" OFFSET ");
        qb.push_bind(offset);
        qb.push(" LIMIT ");
        qb.push_bind(limit);
        qb.push(
            ") SELECT (SELECT COUNT(*) FROM matched) AS total_count, \
             page.id, page.title, page.content, page.created_at, page.updated_at \
             FROM (SELECT 1) AS anchor LEFT JOIN page ON TRUE \
             ORDER BY page.position",
        );

        qb
    }

    fn convert_count(value: i64) -> Result<u64, RepoError> {
        value
            .try_into()
            .map_err(|_| RepoError::from_persistence("count exceeds supported range"))
    }
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn find_paginated(&self, page: &Paginator, search: &str) -> Result<PostPage, RepoError> {
        let mut qb = Self::build_page_query(page, search);
        let rows = qb
            .build_query_as::<PostPageRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let Some(first) = rows.first() else {
            return Ok(PostPage::empty());
        };
        let total = Self::convert_count(first.total_count)?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(record) = row.into_record()? {
                items.push(record);
            }
        }

        Ok(PostPage::new(items, total))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1");
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }

    async fn create(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        self.insert_post(params).await
    }

    async fn update_by_id(
        &self,
        params: UpdatePostParams,
    ) -> Result<Option<PostRecord>, RepoError> {
        self.update_post(params).await
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        self.delete_post(id).await
    }
}
