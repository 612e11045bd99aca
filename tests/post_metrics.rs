use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics_util::debugging::DebuggingRecorder;
use uuid::Uuid;

use bulletin::application::pagination::Paginator;
use bulletin::application::posts::{ListingOutcome, PostService, SearchOutcome};
use bulletin::application::repos::{
    CreatePostParams, PostPage, PostsRepo, RepoError, UpdatePostParams,
};
use bulletin::domain::entities::PostRecord;

/// Reports a fixed total and stalls lookups by id.
struct FixedTotal {
    total: u64,
}

#[async_trait]
impl PostsRepo for FixedTotal {
    async fn find_paginated(
        &self,
        _page: &Paginator,
        _search: &str,
    ) -> Result<PostPage, RepoError> {
        Ok(PostPage::new(Vec::new(), self.total))
    }

    async fn find_by_id(&self, _id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        tokio::time::sleep(Duration::from_millis(200)).await;
        Ok(None)
    }

    async fn create(&self, _params: CreatePostParams) -> Result<PostRecord, RepoError> {
        Err(RepoError::from_persistence("read-only store"))
    }

    async fn update_by_id(
        &self,
        _params: UpdatePostParams,
    ) -> Result<Option<PostRecord>, RepoError> {
        Ok(None)
    }

    async fn delete_by_id(&self, _id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        Ok(None)
    }
}

#[tokio::test]
async fn post_flows_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let service = PostService::new(
        Arc::new(FixedTotal { total: 9 }),
        Duration::from_millis(10),
    );

    let outcome = service.listing(Some("99")).await.expect("listing");
    assert!(matches!(outcome, ListingOutcome::Redirect { page: Some(3) }));

    let outcome = service
        .search(Some("query"), Some("first"))
        .await
        .expect("search");
    assert!(matches!(outcome, SearchOutcome::Redirect { page: None, .. }));

    let err = service
        .find_by_id(Uuid::new_v4())
        .await
        .expect_err("slow lookup times out");
    assert!(err.to_string().contains("timeout"));

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "bulletin_listing_redirect_total",
        "bulletin_search_total",
        "bulletin_store_timeout_total",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
