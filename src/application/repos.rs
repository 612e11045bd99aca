//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::Paginator;
use crate::domain::entities::PostRecord;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// One page of posts together with the number of posts matching the query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostPage {
    pub items: Vec<PostRecord>,
    pub total: u64,
}

impl PostPage {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(items: Vec<PostRecord>, total: u64) -> Self {
        Self { items, total }
    }
}

/// Insert payload; the store assigns the identifier and persists the
/// timestamps exactly as given.
#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub title: String,
    pub content: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: Uuid,
    pub title: String,
    pub content: String,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    /// Fetch the page described by `page` together with the total match count.
    ///
    /// An empty `search` lists every post newest first; otherwise posts are
    /// matched against the weighted full-text index and ordered by relevance.
    /// Both values come from a single query.
    async fn find_paginated(&self, page: &Paginator, search: &str)
    -> Result<PostPage, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError>;

    async fn create(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    /// Replace title and content and bump `updated_at`, returning the post as
    /// it is after the update. Unknown ids yield `Ok(None)`.
    async fn update_by_id(&self, params: UpdatePostParams)
    -> Result<Option<PostRecord>, RepoError>;

    /// Remove a post, returning the snapshot taken just before deletion.
    async fn delete_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError>;
}

#[async_trait]
pub trait HealthRepo: Send + Sync {
    async fn health_check(&self) -> Result<(), RepoError>;
}
