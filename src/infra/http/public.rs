use std::sync::Arc;

use axum::{
    Form, Router,
    extract::{Path, Query, State, rejection::FormRejection},
    http::{HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{get, head, post},
};
use serde::Deserialize;

use crate::{
    application::{
        error::HttpError,
        posts::{ListingOutcome, PostService, PostWriteError, SearchOutcome},
        repos::HealthRepo,
    },
    domain::{entities::PostRecord, posts::PostDraft, posts::parse_post_id},
    presentation::views::{
        ErrorPageView, ErrorTemplate, HOME_PATH, IndexContext, IndexTemplate, LayoutContext,
        PostDetailContext, PostFormContext, PostFormTemplate, PostTemplate, listing_href,
        post_href, render_template_response,
    },
};

use super::{
    HX_PUSH_URL_HEADER, db_health_response,
    middleware::{log_responses, set_request_context},
};

const SEARCH_TOO_SHORT_MESSAGE: &str = "Search query must be at least 3 characters";
const INVALID_FORM_MESSAGE: &str = "invalid input";

#[derive(Clone)]
pub struct HttpState {
    pub posts: Arc<PostService>,
    pub health: Arc<dyn HealthRepo>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/search", get(search))
        .route("/posts/new", get(new_post_form).post(create_post))
        .route("/posts/{id}", get(view_post))
        .route("/posts/{id}/edit", get(edit_post_form).post(update_post))
        .route("/posts/{id}/delete", post(delete_post))
        .route("/health", head(liveness))
        .route("/_health/db", get(db_health))
        .fallback(fallback)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListingQuery {
    page: Option<String>,
    q: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PostForm {
    title: String,
    content: String,
}

async fn home(
    State(state): State<HttpState>,
    Query(query): Query<ListingQuery>,
) -> Result<Response, HttpError> {
    match state.posts.listing(query.page.as_deref()).await? {
        ListingOutcome::Redirect { page } => {
            Ok(Redirect::temporary(&listing_href(None, page)).into_response())
        }
        ListingOutcome::Render(listing) => {
            let content = IndexContext::from_listing(&listing, None);
            let view = LayoutContext::new("Home", "", content);
            Ok(render_template_response(IndexTemplate { view }, StatusCode::OK))
        }
    }
}

async fn search(
    State(state): State<HttpState>,
    Query(query): Query<ListingQuery>,
) -> Result<Response, HttpError> {
    let raw_query = query.q.as_deref().unwrap_or_default();

    match state
        .posts
        .search(query.q.as_deref(), query.page.as_deref())
        .await?
    {
        SearchOutcome::QueryTooShort => {
            let view = LayoutContext::new(
                "Search",
                raw_query,
                ErrorPageView::new(SEARCH_TOO_SHORT_MESSAGE),
            );
            Ok(render_template_response(
                ErrorTemplate { view },
                StatusCode::OK,
            ))
        }
        SearchOutcome::Redirect { query, page } => {
            Ok(Redirect::temporary(&listing_href(Some(&query), page)).into_response())
        }
        SearchOutcome::Render(listing) => {
            let content = IndexContext::from_listing(&listing, Some(listing.search.as_str()));
            let view = LayoutContext::new("Search", raw_query, content);
            Ok(render_template_response(IndexTemplate { view }, StatusCode::OK))
        }
    }
}

async fn view_post(
    State(state): State<HttpState>,
    Path(id): Path<String>,
) -> Result<Response, HttpError> {
    let post = state
        .posts
        .find(&id)
        .await?
        .ok_or_else(|| post_not_found("infra::http::public::view_post", &id))?;

    Ok(render_post(&post))
}

async fn new_post_form() -> Response {
    render_form(PostFormContext::create())
}

async fn create_post(
    State(state): State<HttpState>,
    form: Result<Form<PostForm>, FormRejection>,
) -> Result<Response, HttpError> {
    let Ok(Form(form)) = form else {
        return Ok(render_form(
            PostFormContext::create().with_error(INVALID_FORM_MESSAGE),
        ));
    };

    let draft = PostDraft::new(form.title.clone(), form.content.clone());
    match state.posts.create(draft).await {
        Ok(post) => Ok(render_pushed_post(&post)),
        Err(PostWriteError::Validation(err)) => Ok(render_form(
            PostFormContext::create()
                .with_values(form.title, form.content)
                .with_error(err.to_string()),
        )),
        Err(err) => Err(err.into()),
    }
}

async fn edit_post_form(
    State(state): State<HttpState>,
    Path(id): Path<String>,
) -> Result<Response, HttpError> {
    let post = state
        .posts
        .find(&id)
        .await?
        .ok_or_else(|| post_not_found("infra::http::public::edit_post_form", &id))?;

    Ok(render_form(
        PostFormContext::update(post.id).with_values(post.title, post.content),
    ))
}

async fn update_post(
    State(state): State<HttpState>,
    Path(id): Path<String>,
    form: Result<Form<PostForm>, FormRejection>,
) -> Result<Response, HttpError> {
    let post_id = parse_post_id(&id)
        .ok_or_else(|| post_not_found("infra::http::public::update_post", &id))?;

    let Ok(Form(form)) = form else {
        return Ok(render_form(
            PostFormContext::update(post_id).with_error(INVALID_FORM_MESSAGE),
        ));
    };

    let draft = PostDraft::new(form.title.clone(), form.content.clone());
    match state.posts.update(post_id, draft).await {
        Ok(Some(post)) => Ok(render_pushed_post(&post)),
        Ok(None) => Err(post_not_found("infra::http::public::update_post", &id)),
        Err(PostWriteError::Validation(err)) => Ok(render_form(
            PostFormContext::update(post_id)
                .with_values(form.title, form.content)
                .with_error(err.to_string()),
        )),
        Err(err) => Err(err.into()),
    }
}

async fn delete_post(
    State(state): State<HttpState>,
    Path(id): Path<String>,
) -> Result<Response, HttpError> {
    state
        .posts
        .delete(&id)
        .await?
        .ok_or_else(|| post_not_found("infra::http::public::delete_post", &id))?;

    Ok(Redirect::to(HOME_PATH).into_response())
}

async fn liveness() -> StatusCode {
    StatusCode::OK
}

async fn db_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.health.health_check().await)
}

async fn fallback() -> HttpError {
    HttpError::not_found("infra::http::public::fallback", "no route matched")
}

fn post_not_found(source: &'static str, id: &str) -> HttpError {
    HttpError::not_found(source, format!("post `{id}` not found"))
}

fn render_post(post: &PostRecord) -> Response {
    let view = LayoutContext::new(post.title.clone(), "", PostDetailContext::from(post));
    render_template_response(PostTemplate { view }, StatusCode::OK)
}

/// Render a freshly written post and point the browser history at it.
fn render_pushed_post(post: &PostRecord) -> Response {
    let mut response = render_post(post);
    if !response.status().is_success() {
        return response;
    }
    if let Ok(value) = HeaderValue::from_str(&post_href(post.id)) {
        response.headers_mut().insert(HX_PUSH_URL_HEADER, value);
    }
    response
}

fn render_form(content: PostFormContext) -> Response {
    let view = LayoutContext::new(content.heading.clone(), "", content);
    render_template_response(PostFormTemplate { view }, StatusCode::OK)
}
