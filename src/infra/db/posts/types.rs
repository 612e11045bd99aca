use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::RepoError;
use crate::domain::entities::PostRecord;

pub(crate) const POST_COLUMNS: &str = "id, title, content, created_at, updated_at";

#[derive(sqlx::FromRow)]
pub(crate) struct PostRow {
    pub(crate) id: Uuid,
    pub(crate) title: String,
    pub(crate) content: String,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) updated_at: OffsetDateTime,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            content: row.content,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// One row of the combined count-and-slice query.
///
/// The total is repeated on every row; a page past the end yields a single
/// row whose post columns are all NULL.
#[derive(sqlx::FromRow)]
pub(crate) struct PostPageRow {
    pub(crate) total_count: i64,
    pub(crate) id: Option<Uuid>,
    pub(crate) title: Option<String>,
    pub(crate) content: Option<String>,
    pub(crate) created_at: Option<OffsetDateTime>,
    pub(crate) updated_at: Option<OffsetDateTime>,
}

impl PostPageRow {
    pub(crate) fn into_record(self) -> Result<Option<PostRecord>, RepoError> {
        let Some(id) = self.id else {
            return Ok(None);
        };

        match (self.title, self.content, self.created_at, self.updated_at) {
            (Some(title), Some(content), Some(created_at), Some(updated_at)) => {
                Ok(Some(PostRecord {
                    id,
                    title,
                    content,
                    created_at,
                    updated_at,
                }))
            }
            _ => Err(RepoError::Integrity {
                message: format!("post `{id}` returned with missing columns"),
            }),
        }
    }
}
