//! Domain entities mirrored from persistent storage.

use time::OffsetDateTime;
use uuid::Uuid;

/// A persisted blog post.
///
/// `id` is assigned by the store on insert and never changes afterwards.
/// `updated_at` is always at or after `created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct PostRecord {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}
