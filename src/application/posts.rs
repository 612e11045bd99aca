use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::Paginator;
use crate::application::repos::{CreatePostParams, PostsRepo, RepoError, UpdatePostParams};
use crate::domain::entities::PostRecord;
use crate::domain::posts::{PostDraft, PostValidationError, parse_post_id};

pub const LISTING_PAGE_SIZE: u32 = 4;
pub const SEARCH_PAGE_SIZE: u32 = 4;
pub const MIN_SEARCH_CHARS: usize = 3;

#[derive(Debug, Error)]
pub enum PostServiceError {
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Error)]
pub enum PostWriteError {
    #[error(transparent)]
    Validation(#[from] PostValidationError),
    #[error(transparent)]
    Service(#[from] PostServiceError),
}

impl From<RepoError> for PostWriteError {
    fn from(err: RepoError) -> Self {
        Self::Service(PostServiceError::Repo(err))
    }
}

/// A page of posts ready to render.
#[derive(Debug, Clone)]
pub struct PostListing {
    pub posts: Vec<PostRecord>,
    pub paginator: Paginator,
    pub search: String,
}

#[derive(Debug, Clone)]
pub enum ListingOutcome {
    Render(PostListing),
    /// The requested page must be normalised; `None` means the first page.
    Redirect { page: Option<u64> },
}

#[derive(Debug, Clone)]
pub enum SearchOutcome {
    Render(PostListing),
    Redirect { query: String, page: Option<u64> },
    QueryTooShort,
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostsRepo>,
    operation_timeout: Duration,
}

impl PostService {
    pub fn new(posts: Arc<dyn PostsRepo>, operation_timeout: Duration) -> Self {
        Self {
            posts,
            operation_timeout,
        }
    }

    /// Home feed, newest first.
    pub async fn listing(
        &self,
        page_token: Option<&str>,
    ) -> Result<ListingOutcome, PostServiceError> {
        let Ok(paginator) = Paginator::new(page_token.unwrap_or_default(), LISTING_PAGE_SIZE)
        else {
            counter!("bulletin_listing_redirect_total", "flow" => "home").increment(1);
            return Ok(ListingOutcome::Redirect { page: None });
        };

        match self.load_page(paginator, String::new()).await? {
            Ok(listing) => Ok(ListingOutcome::Render(listing)),
            Err(page) => {
                counter!("bulletin_listing_redirect_total", "flow" => "home").increment(1);
                Ok(ListingOutcome::Redirect { page: Some(page) })
            }
        }
    }

    /// Full-text search ordered by relevance.
    pub async fn search(
        &self,
        query: Option<&str>,
        page_token: Option<&str>,
    ) -> Result<SearchOutcome, PostServiceError> {
        let raw_query = query.unwrap_or_default();
        let cleaned = strip_nul(raw_query);
        let trimmed = cleaned.trim();
        if trimmed.chars().count() < MIN_SEARCH_CHARS {
            return Ok(SearchOutcome::QueryTooShort);
        }

        counter!("bulletin_search_total").increment(1);

        let Ok(paginator) = Paginator::new(page_token.unwrap_or_default(), SEARCH_PAGE_SIZE) else {
            counter!("bulletin_listing_redirect_total", "flow" => "search").increment(1);
            return Ok(SearchOutcome::Redirect {
                query: raw_query.to_string(),
                page: None,
            });
        };

        match self.load_page(paginator, trimmed.to_string()).await? {
            Ok(mut listing) => {
                listing.search = raw_query.to_string();
                Ok(SearchOutcome::Render(listing))
            }
            Err(page) => {
                counter!("bulletin_listing_redirect_total", "flow" => "search").increment(1);
                Ok(SearchOutcome::Redirect {
                    query: raw_query.to_string(),
                    page: Some(page),
                })
            }
        }
    }

    /// Run the paginated query; `Err(page)` carries the page to redirect to.
    async fn load_page(
        &self,
        mut paginator: Paginator,
        search: String,
    ) -> Result<Result<PostListing, u64>, PostServiceError> {
        let page = self
            .with_timeout(self.posts.find_paginated(&paginator, &search))
            .await?;

        paginator.apply_total_count(page.total);
        if paginator.needs_redirect() {
            return Ok(Err(paginator.page()));
        }

        Ok(Ok(PostListing {
            posts: page.items,
            paginator,
            search,
        }))
    }

    pub async fn find(&self, id_token: &str) -> Result<Option<PostRecord>, PostServiceError> {
        let Some(id) = parse_post_id(id_token) else {
            return Ok(None);
        };
        self.find_by_id(id).await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, PostServiceError> {
        Ok(self.with_timeout(self.posts.find_by_id(id)).await?)
    }

    pub async fn create(&self, draft: PostDraft) -> Result<PostRecord, PostWriteError> {
        draft.validate()?;

        let now = now_utc_micros();
        let record = self
            .with_timeout(self.posts.create(CreatePostParams {
                title: draft.title,
                content: draft.content,
                created_at: now,
                updated_at: now,
            }))
            .await?;
        Ok(record)
    }

    /// `Ok(None)` when the post does not exist; updates never insert.
    pub async fn update(
        &self,
        id: Uuid,
        draft: PostDraft,
    ) -> Result<Option<PostRecord>, PostWriteError> {
        draft.validate()?;

        let record = self
            .with_timeout(self.posts.update_by_id(UpdatePostParams {
                id,
                title: draft.title,
                content: draft.content,
            }))
            .await?;
        Ok(record)
    }

    pub async fn delete(&self, id_token: &str) -> Result<Option<PostRecord>, PostServiceError> {
        let Some(id) = parse_post_id(id_token) else {
            return Ok(None);
        };
        Ok(self.with_timeout(self.posts.delete_by_id(id)).await?)
    }

    async fn with_timeout<T>(
        &self,
        operation: impl Future<Output = Result<T, RepoError>>,
    ) -> Result<T, RepoError> {
        match tokio::time::timeout(self.operation_timeout, operation).await {
            Ok(result) => result,
            Err(_) => {
                counter!("bulletin_store_timeout_total").increment(1);
                Err(RepoError::Timeout)
            }
        }
    }
}

/// Text columns and tsquery input reject U+0000.
fn strip_nul(text: &str) -> String {
    text.chars().filter(|ch| *ch != '\0').collect()
}

/// Current time at the precision the store persists.
fn now_utc_micros() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now.replace_nanosecond(now.nanosecond() / 1_000 * 1_000)
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_are_truncated_to_microseconds() {
        let now = now_utc_micros();
        assert_eq!(now.nanosecond() % 1_000, 0);
    }

    #[test]
    fn nul_characters_are_removed_from_search_text() {
        assert_eq!(strip_nul("ab\0c\0"), "abc");
        assert_eq!(strip_nul("plain text"), "plain text");
    }
}
